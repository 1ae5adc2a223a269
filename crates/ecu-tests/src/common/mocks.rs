// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! A scripted Modbus transport for exercising devices without hardware.
//!
//! ## Design Principles
//!
//! - Registers answered from an in-memory map
//! - Every call recorded for verification
//! - Failure injection per address, per connect, or for every read

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use ecu_modbus::codec::encode_value;
use ecu_modbus::{
    ConnectionError, DataType, ModbusError, ModbusResult, ProtocolError, RegisterClass,
    SharedTransport, Transport, TransportState, Value,
};

// =============================================================================
// Recorded Calls
// =============================================================================

/// A recorded register read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCall {
    /// Register bank.
    pub register_class: RegisterClass,
    /// Unit id sent with the request.
    pub unit: u8,
    /// Start address.
    pub address: u16,
    /// Requested register count.
    pub count: u16,
}

/// A recorded register write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteCall {
    /// Unit id sent with the request.
    pub unit: u8,
    /// Start address.
    pub address: u16,
    /// Written words.
    pub values: Vec<u16>,
}

// =============================================================================
// ScriptedTransport
// =============================================================================

/// In-memory transport answering from a register map.
///
/// Unmapped registers read as `fill` (zero unless changed).
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    holding: HashMap<u16, u16>,
    input: HashMap<u16, u16>,
    fill: u16,
    connected: bool,
    refuse_connect: bool,
    short_answers: bool,
    fail_reads_at: HashSet<u16>,

    /// Number of connect calls.
    pub connects: u32,
    /// Number of disconnect calls.
    pub disconnects: u32,
    /// Reads in call order.
    pub reads: Vec<ReadCall>,
    /// Writes in call order.
    pub writes: Vec<WriteCall>,
}

impl ScriptedTransport {
    /// Creates a disconnected transport with no registers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts in the connected state.
    pub fn connected(mut self) -> Self {
        self.connected = true;
        self
    }

    /// Makes every connect attempt fail.
    pub fn refuse_connect(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    /// Answers every read with one register fewer than requested.
    pub fn short_answers(mut self) -> Self {
        self.short_answers = true;
        self
    }

    /// Fails reads starting at `address`.
    pub fn fail_reads_at(mut self, address: u16) -> Self {
        self.fail_reads_at.insert(address);
        self
    }

    /// Sets the value of unmapped registers.
    pub fn fill(mut self, word: u16) -> Self {
        self.fill = word;
        self
    }

    /// Sets consecutive holding registers from `address`.
    pub fn holding(mut self, address: u16, words: &[u16]) -> Self {
        self.set_holding(address, words);
        self
    }

    /// Sets consecutive input registers from `address`.
    pub fn input(mut self, address: u16, words: &[u16]) -> Self {
        for (offset, word) in (0u16..).zip(words) {
            self.input.insert(address.wrapping_add(offset), *word);
        }
        self
    }

    /// Stores `text` in `word_length` holding registers from `address`.
    ///
    /// # Panics
    ///
    /// Panics if the text does not fit.
    pub fn text(mut self, address: u16, word_length: u16, text: &str) -> Self {
        let words = encode_value(&Value::Text(text.to_string()), DataType::String, word_length)
            .unwrap_or_else(|e| panic!("cannot script '{text}': {e}"));
        self.set_holding(address, &words);
        self
    }

    /// Wraps the transport for sharing with devices.
    ///
    /// The returned `Rc` keeps access to the recorded calls.
    pub fn shared(self) -> (Rc<RefCell<Self>>, SharedTransport) {
        let transport = Rc::new(RefCell::new(self));
        let shared: SharedTransport = transport.clone();
        (transport, shared)
    }

    /// Sets consecutive holding registers in place.
    pub fn set_holding(&mut self, address: u16, words: &[u16]) {
        for (offset, word) in (0u16..).zip(words) {
            self.holding.insert(address.wrapping_add(offset), *word);
        }
    }

    /// Returns a holding register, or `None` if unmapped.
    pub fn holding_register(&self, address: u16) -> Option<u16> {
        self.holding.get(&address).copied()
    }

    /// Reads recorded at `address`.
    pub fn reads_at(&self, address: u16) -> usize {
        self.reads.iter().filter(|r| r.address == address).count()
    }

    fn answer(&self, bank: &HashMap<u16, u16>, address: u16, count: u16) -> Vec<u16> {
        let served = if self.short_answers { count.saturating_sub(1) } else { count };
        (0..served)
            .map(|i| bank.get(&address.wrapping_add(i)).copied().unwrap_or(self.fill))
            .collect()
    }

    fn read(&mut self, register_class: RegisterClass, unit: u8, address: u16, count: u16) -> ModbusResult<Vec<u16>> {
        self.reads.push(ReadCall {
            register_class,
            unit,
            address,
            count,
        });

        if !self.connected {
            return Err(ModbusError::not_connected());
        }
        if self.fail_reads_at.contains(&address) {
            return Err(ProtocolError::unexpected(format!("scripted failure at {address:#06x}")).into());
        }

        Ok(match register_class {
            RegisterClass::Holding => self.answer(&self.holding, address, count),
            RegisterClass::Input => self.answer(&self.input, address, count),
        })
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self) -> ModbusResult<()> {
        self.connects += 1;
        if self.refuse_connect {
            return Err(ModbusError::connection(ConnectionError::refused("scripted", 502)));
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) -> ModbusResult<()> {
        self.disconnects += 1;
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn state(&self) -> TransportState {
        if self.connected {
            TransportState::Connected
        } else {
            TransportState::Disconnected
        }
    }

    fn read_holding_registers(&mut self, unit: u8, address: u16, count: u16) -> ModbusResult<Vec<u16>> {
        self.read(RegisterClass::Holding, unit, address, count)
    }

    fn read_input_registers(&mut self, unit: u8, address: u16, count: u16) -> ModbusResult<Vec<u16>> {
        self.read(RegisterClass::Input, unit, address, count)
    }

    fn write_multiple_registers(&mut self, unit: u8, address: u16, values: &[u16]) -> ModbusResult<()> {
        self.writes.push(WriteCall {
            unit,
            address,
            values: values.to_vec(),
        });
        if !self.connected {
            return Err(ModbusError::not_connected());
        }
        self.set_holding(address, values);
        Ok(())
    }

    fn display_name(&self) -> String {
        "scripted".to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_reads() {
        let mut transport = ScriptedTransport::new().connected().holding(10, &[1, 2]).fill(0xFFFF);

        assert_eq!(transport.read_holding_registers(1, 10, 3).unwrap(), vec![1, 2, 0xFFFF]);
        assert_eq!(transport.reads.len(), 1);
        assert_eq!(transport.reads_at(10), 1);
    }

    #[test]
    fn test_short_answers_and_failures() {
        let mut transport = ScriptedTransport::new().connected().short_answers().fail_reads_at(5);

        assert_eq!(transport.read_holding_registers(1, 0, 4).unwrap().len(), 3);
        assert!(transport.read_holding_registers(1, 5, 1).is_err());
    }

    #[test]
    fn test_connect_refused() {
        let mut transport = ScriptedTransport::new().refuse_connect();

        assert!(transport.connect().is_err());
        assert!(!transport.is_connected());
        assert!(transport.read_holding_registers(1, 0, 1).is_err());
        assert_eq!(transport.connects, 1);
    }

    #[test]
    fn test_write_updates_registers() {
        let mut transport = ScriptedTransport::new().connected();
        transport.write_multiple_registers(3, 100, &[7, 8]).unwrap();

        assert_eq!(transport.holding_register(101), Some(8));
        assert_eq!(transport.writes[0].unit, 3);
    }
}
