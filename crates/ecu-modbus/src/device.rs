// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Device facade: named field access over a register client.
//!
//! A [`Device`] pairs a [`RegisterClient`] with a [`Catalog`] and exposes
//! reads and writes by field name. [`Inverter`] owns the transport and
//! discovers [`Meter`]s, which address the same transport through a
//! non-owning handle.
//!
//! ```text
//! Inverter ── read_all ──► BatchPlanner ──► RegisterClient ──► RegisterCursor ──► Readings
//!    │
//!    └── meters() ── probe 0x9cfc / 0x9daa ──► Meter1 (offset 0x000), Meter2 (offset 0x0ae)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use ecu_modbus::{Inverter, TcpConfig, RegisterClass};
//!
//! let inverter = Inverter::tcp(TcpConfig::with_port("192.168.1.50", 502));
//! inverter.connect()?;
//!
//! let readings = inverter.read_all(RegisterClass::Holding);
//! for (label, meter) in inverter.meters() {
//!     println!("{label}: {:?}", meter.read_all(RegisterClass::Holding));
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;

use crate::catalog::{Catalog, FieldDescriptor};
use crate::client::{
    share, RegisterClient, RetryConfig, RtuTransport, SharedTransport, TcpTransport,
    TransportHandle,
};
use crate::codec::{decode_field, encode_field, RegisterCursor};
use crate::error::{ModbusError, ModbusResult, OperationError};
use crate::planner::{BatchPlanner, RegisterSpan};
use crate::registers::{inverter_catalog, meter_catalog, METER_PROBES, METER_REGISTER_OFFSETS};
use crate::types::{ConnectionConfig, RegisterClass, RtuConfig, TcpConfig};
use crate::value::{Readings, Snapshot, Value};

// =============================================================================
// Device
// =============================================================================

/// A logical Modbus device: one unit on a transport, described by a catalog.
pub struct Device {
    /// Device name used in logs and `Display`.
    name: String,
    /// Register client for this unit.
    client: RegisterClient,
    /// Register fields of this device.
    catalog: Catalog,
}

impl Device {
    /// Creates a device.
    pub fn new(name: impl Into<String>, client: RegisterClient, catalog: Catalog) -> Self {
        Self {
            name: name.into(),
            client,
            catalog,
        }
    }

    /// Returns the device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the register catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Returns the register client.
    pub fn client(&self) -> &RegisterClient {
        &self.client
    }

    /// Looks up a field by name.
    pub fn field(&self, name: &str) -> ModbusResult<&FieldDescriptor> {
        self.catalog
            .get(name)
            .ok_or_else(|| ModbusError::unknown_field(name))
    }

    // =========================================================================
    // Connection Management
    // =========================================================================

    /// Connects the transport.
    pub fn connect(&self) -> ModbusResult<()> {
        self.client.connect()
    }

    /// Disconnects the transport.
    pub fn disconnect(&self) -> ModbusResult<()> {
        self.client.disconnect()
    }

    /// Returns `true` if the transport is connected. Never blocks on I/O.
    pub fn connected(&self) -> bool {
        self.client.is_connected()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Reads one field by name.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if the name is not in the catalog. Transport
    /// failures are not errors: the value comes back absent.
    pub fn read(&self, name: &str) -> ModbusResult<Readings> {
        let field = self.field(name)?;
        Ok(Readings::single(field.name(), self.read_field(field)))
    }

    /// Reads one field, which need not belong to the catalog.
    pub fn read_field(&self, field: &FieldDescriptor) -> Value {
        let span = RegisterSpan::of(field);
        let Some(words) = self
            .client
            .read_registers(field.register_class(), span.offset, span.length)
        else {
            return Value::Absent;
        };

        match decode_field(&words, field) {
            Ok(value) => value,
            Err(error) => {
                error.log(field.name());
                Value::Absent
            }
        }
    }

    /// Reads every field of `register_class`, one request per batch.
    ///
    /// Batches are read in ascending id order. A batch whose read fails
    /// contributes no entries.
    pub fn read_all(&self, register_class: RegisterClass) -> Readings {
        let mut readings = Readings::new();

        for batch in BatchPlanner::plan(&self.catalog, register_class) {
            let Some(words) =
                self.client
                    .read_registers(register_class, batch.span.offset, batch.span.length)
            else {
                tracing::debug!(
                    device = %self.name,
                    batch_id = batch.batch_id,
                    offset = batch.span.offset,
                    length = batch.span.length,
                    "Batch unavailable, skipping its fields"
                );
                continue;
            };

            let mut cursor = RegisterCursor::new(&words, batch.span.offset);
            for field in batch.fields {
                match cursor.decode(field) {
                    Ok(value) => readings.insert(field.name(), value),
                    Err(error) => {
                        error.log(field.name());
                        break;
                    }
                }
            }
        }

        readings
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Writes one field by name.
    ///
    /// # Errors
    ///
    /// - Lookup error if the name is not in the catalog.
    /// - [`OperationError::ReadOnly`] if the field is not a holding register.
    /// - Conversion errors if the value does not fit the field.
    /// - The transport's failure, unchanged.
    pub fn write(&self, name: &str, value: &Value) -> ModbusResult<()> {
        let field = self.field(name)?;

        if !field.register_class().is_writable() {
            return Err(OperationError::read_only(field.name(), field.register_class().name()).into());
        }

        let words = encode_field(value, field)?;

        tracing::debug!(
            device = %self.name,
            field = field.name(),
            address = field.address(),
            value = %value,
            "Writing field"
        );

        self.client.write_registers(field.address(), &words)
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, retries={}, unit={:#x})",
            self.name,
            self.client.display_name(),
            self.client.retry_config().max_attempts,
            self.client.unit_id()
        )
    }
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("name", &self.name)
            .field("client", &self.client)
            .field("fields", &self.catalog.len())
            .finish()
    }
}

// =============================================================================
// Inverter
// =============================================================================

/// The ECU's inverter device. Owns the transport.
#[derive(Debug)]
pub struct Inverter {
    device: Device,
}

impl Inverter {
    /// Creates an inverter over a shared transport with the reference catalog.
    pub fn new(transport: SharedTransport, unit_id: u8, retry: RetryConfig) -> Self {
        Self::with_catalog(transport, unit_id, retry, inverter_catalog())
    }

    /// Creates an inverter with a custom catalog.
    pub fn with_catalog(
        transport: SharedTransport,
        unit_id: u8,
        retry: RetryConfig,
        catalog: Catalog,
    ) -> Self {
        let client = RegisterClient::with_retry(TransportHandle::Owned(transport), unit_id, retry);
        Self {
            device: Device::new("Inverter", client, catalog),
        }
    }

    /// Creates an inverter from a validated connection configuration.
    pub fn from_config(config: &ConnectionConfig) -> ModbusResult<Self> {
        config.validate()?;
        Ok(match config {
            ConnectionConfig::Tcp(tcp) => Self::tcp(tcp.clone()),
            ConnectionConfig::Rtu(rtu) => Self::rtu(rtu.clone()),
        })
    }

    /// Creates an inverter on Modbus TCP.
    pub fn tcp(config: TcpConfig) -> Self {
        let unit_id = config.unit_id;
        let retry = RetryConfig::new(config.retries);
        Self::new(share(TcpTransport::new(config)), unit_id, retry)
    }

    /// Creates an inverter on Modbus RTU.
    pub fn rtu(config: RtuConfig) -> Self {
        let unit_id = config.unit_id;
        let retry = RetryConfig::new(config.retries);
        Self::new(share(RtuTransport::new(config)), unit_id, retry)
    }

    /// Returns the underlying device.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Probes the meter DID registers and returns the meters that answer.
    ///
    /// Meters share this inverter's transport, unit id and retry budget.
    pub fn meters(&self) -> BTreeMap<String, Meter> {
        let mut meters = BTreeMap::new();

        for (index, probe) in METER_PROBES.iter().enumerate() {
            let did = self.device.read_field(probe);
            if !did.is_truthy() {
                continue;
            }

            let transport = self.device.client.transport().downgrade();
            let meter = Meter::new(index, transport, self.unit_id(), self.retry());
            tracing::debug!(
                meter = %meter.name(),
                did = %did,
                offset = meter.offset(),
                "Discovered meter"
            );
            meters.insert(meter.name().to_string(), meter);
        }

        meters
    }

    /// Reads the inverter and every discovered meter.
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::new(self.read_all(RegisterClass::Holding));
        for (label, meter) in self.meters() {
            snapshot.add_meter(label, meter.read_all(RegisterClass::Holding));
        }
        snapshot
    }

    fn unit_id(&self) -> u8 {
        self.device.client.unit_id()
    }

    fn retry(&self) -> RetryConfig {
        self.device.client.retry_config().clone()
    }
}

impl Deref for Inverter {
    type Target = Device;

    fn deref(&self) -> &Device {
        &self.device
    }
}

impl fmt::Display for Inverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.device.fmt(f)
    }
}

// =============================================================================
// Meter
// =============================================================================

/// A meter attached to the ECU, reached through the inverter's transport.
#[derive(Debug)]
pub struct Meter {
    device: Device,
    offset: u16,
}

impl Meter {
    /// Creates the meter at `index` in discovery order.
    ///
    /// # Panics
    ///
    /// Panics if `index` has no known register offset.
    pub fn new(index: usize, transport: TransportHandle, unit_id: u8, retry: RetryConfig) -> Self {
        let Some(&offset) = METER_REGISTER_OFFSETS.get(index) else {
            panic!("no register offset for meter index {index}");
        };
        let client = RegisterClient::with_retry(transport, unit_id, retry);
        Self {
            device: Device::new(format!("Meter{}", index + 1), client, meter_catalog(index)),
            offset,
        }
    }

    /// Returns the address offset applied to the meter template.
    pub fn offset(&self) -> u16 {
        self.offset
    }

    /// Returns the underlying device.
    pub fn device(&self) -> &Device {
        &self.device
    }
}

impl Deref for Meter {
    type Target = Device;

    fn deref(&self) -> &Device {
        &self.device
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.device.fmt(f)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{RetryStrategy, Transport, TransportState};
    use crate::types::DataType;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::rc::Rc;

    /// In-memory register bank.
    #[derive(Default)]
    struct Bank {
        holding: HashMap<u16, u16>,
        fail_at: Option<u16>,
        reads: Vec<(u16, u16)>,
        writes: Vec<(u16, Vec<u16>)>,
    }

    impl Transport for Bank {
        fn connect(&mut self) -> ModbusResult<()> {
            Ok(())
        }

        fn disconnect(&mut self) -> ModbusResult<()> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }

        fn state(&self) -> TransportState {
            TransportState::Connected
        }

        fn read_holding_registers(&mut self, _: u8, address: u16, count: u16) -> ModbusResult<Vec<u16>> {
            self.reads.push((address, count));
            if self.fail_at == Some(address) {
                return Err(ModbusError::not_connected());
            }
            Ok((0..count)
                .map(|i| self.holding.get(&(address + i)).copied().unwrap_or(0))
                .collect())
        }

        fn read_input_registers(&mut self, _: u8, _: u16, count: u16) -> ModbusResult<Vec<u16>> {
            Ok(vec![0; usize::from(count)])
        }

        fn write_multiple_registers(&mut self, _: u8, address: u16, values: &[u16]) -> ModbusResult<()> {
            self.writes.push((address, values.to_vec()));
            Ok(())
        }

        fn display_name(&self) -> String {
            "bank".to_string()
        }
    }

    fn inverter(bank: Bank, catalog: Catalog) -> (Rc<RefCell<Bank>>, Inverter) {
        let shared = Rc::new(RefCell::new(bank));
        let transport: SharedTransport = shared.clone();
        let retry = RetryConfig::new(2).with_strategy(RetryStrategy::Immediate);
        (shared, Inverter::with_catalog(transport, 1, retry, catalog))
    }

    fn small_catalog() -> Catalog {
        Catalog::new(vec![
            FieldDescriptor::new("a", 10, DataType::UInt16, 1),
            FieldDescriptor::new("b", 12, DataType::Int16, 1),
            FieldDescriptor::new("c", 20, DataType::UInt32, 2),
            FieldDescriptor::new("d", 30, DataType::UInt16, 1).input(),
        ])
    }

    #[test]
    fn test_read_single_field() {
        let mut bank = Bank::default();
        bank.holding.insert(12, 0xFFFE);
        let (shared, inv) = inverter(bank, small_catalog());

        let readings = inv.read("b").unwrap();
        assert_eq!(readings.get("b"), Some(&Value::Int(-2)));
        assert_eq!(shared.borrow().reads, vec![(12, 1)]);
    }

    #[test]
    fn test_read_unknown_field() {
        let (_, inv) = inverter(Bank::default(), small_catalog());
        assert!(inv.read("nope").unwrap_err().is_lookup());
        assert!(inv.write("nope", &Value::UInt(1)).unwrap_err().is_lookup());
    }

    #[test]
    fn test_read_all_skips_gaps_and_failed_batches() {
        let mut bank = Bank::default();
        bank.holding.insert(10, 7);
        bank.holding.insert(11, 99);
        bank.holding.insert(12, 5);
        bank.fail_at = Some(20);
        let (_, inv) = inverter(bank, small_catalog());

        let readings = inv.read_all(RegisterClass::Holding);
        let names: Vec<&str> = readings.names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(readings.get("a"), Some(&Value::UInt(7)));
        assert_eq!(readings.get("b"), Some(&Value::Int(5)));
    }

    #[test]
    fn test_write_holding_and_reject_input() {
        let (shared, inv) = inverter(Bank::default(), small_catalog());

        inv.write("c", &Value::UInt(0x0001_0002)).unwrap();
        assert_eq!(shared.borrow().writes, vec![(20, vec![1, 2])]);

        let err = inv.write("d", &Value::UInt(1)).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_discovery_and_display() {
        let mut bank = Bank::default();
        bank.holding.insert(0x9cfc, 201);
        bank.holding.insert(0x9daa, 0xFFFF);
        let (_, inv) = inverter(bank, Catalog::empty());

        let meters = inv.meters();
        assert_eq!(meters.keys().collect::<Vec<_>>(), vec!["Meter1"]);
        let meter = &meters["Meter1"];
        assert_eq!(meter.offset(), 0);
        assert!(meter.connected());
        assert_eq!(meter.to_string(), "Meter1(bank, retries=2, unit=0x1)");
        assert_eq!(inv.to_string(), "Inverter(bank, retries=2, unit=0x1)");
    }

    #[test]
    fn test_meter_outlived_by_inverter() {
        let mut bank = Bank::default();
        bank.holding.insert(0x9cfc, 1);
        let (shared, inv) = inverter(bank, Catalog::empty());
        let meters = inv.meters();
        drop(inv);
        drop(shared);

        let meter = &meters["Meter1"];
        assert!(!meter.connected());
        assert!(meter.read_all(RegisterClass::Holding).is_empty());
    }
}
