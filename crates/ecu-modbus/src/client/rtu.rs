// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus RTU over an RS485 adapter, using `tokio-serial` for the port and
//! the blocking `tokio-modbus` client for framing.
//!
//! ```rust,ignore
//! use ecu_modbus::client::{RtuTransport, Transport};
//! use ecu_modbus::types::RtuConfig;
//!
//! let mut line = RtuTransport::new(RtuConfig::new("/dev/ttyUSB0").with_baud_rate(9600));
//! line.connect()?;
//! let words = line.read_holding_registers(1, 0x9c42, 2)?;
//! ```

use std::io::ErrorKind;

use tokio_modbus::client::sync::{self, Reader, Writer};
use tokio_modbus::prelude::Slave;
use tokio_serial::SerialPortBuilder;

use crate::error::{ConnectionError, ModbusError, ModbusResult, TimeoutError};
use crate::types::{DataBits, Parity, RtuConfig, StopBits};

use super::session::Session;
use super::transport::{Transport, TransportState};

/// Serial line shared by every unit wired to it.
///
/// A reply that never arrives keeps the port open; other failures close it.
pub struct RtuTransport {
    config: RtuConfig,
    session: Session,
}

impl RtuTransport {
    pub fn new(config: RtuConfig) -> Self {
        Self {
            config,
            session: Session::serial(),
        }
    }

    /// `device` at 115200 8N1.
    pub fn simple(device: impl Into<String>) -> Self {
        Self::new(RtuConfig::new(device))
    }

    pub fn config(&self) -> &RtuConfig {
        &self.config
    }

    fn call<T>(
        &mut self,
        operation: &'static str,
        function_code: u8,
        unit: u8,
        request: impl FnOnce(&mut sync::Context) -> tokio_modbus::Result<T>,
    ) -> ModbusResult<T> {
        let config = &self.config;
        self.session
            .call(operation, function_code, unit, request, |io| io_failure(config, io, operation))
    }
}

/// Port settings in `tokio-serial` terms.
fn port_builder(config: &RtuConfig) -> SerialPortBuilder {
    let data_bits = match config.data_bits {
        DataBits::Seven => tokio_serial::DataBits::Seven,
        DataBits::Eight => tokio_serial::DataBits::Eight,
    };
    let parity = match config.parity {
        Parity::None => tokio_serial::Parity::None,
        Parity::Odd => tokio_serial::Parity::Odd,
        Parity::Even => tokio_serial::Parity::Even,
    };
    let stop_bits = match config.stop_bits {
        StopBits::One => tokio_serial::StopBits::One,
        StopBits::Two => tokio_serial::StopBits::Two,
    };

    tokio_serial::new(&config.device, config.baud_rate)
        .data_bits(data_bits)
        .parity(parity)
        .stop_bits(stop_bits)
}

fn port_failure(config: &RtuConfig, error: std::io::Error) -> ConnectionError {
    match error.kind() {
        ErrorKind::NotFound => ConnectionError::serial_not_found(&config.device),
        ErrorKind::PermissionDenied => ConnectionError::serial_access_denied(&config.device),
        _ => ConnectionError::serial_configuration(&config.device, error.to_string()),
    }
}

fn io_failure(config: &RtuConfig, error: std::io::Error, operation: &str) -> ModbusError {
    match error.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => TimeoutError::read(config.timeout).into(),
        ErrorKind::NotFound | ErrorKind::PermissionDenied => port_failure(config, error).into(),
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::UnexpectedEof => {
            ConnectionError::closed(Some(format!("{} went away", config.device))).into()
        }
        _ => ConnectionError::io(operation, error).into(),
    }
}

impl Transport for RtuTransport {
    fn connect(&mut self) -> ModbusResult<()> {
        let config = &self.config;
        let opened = self.session.open(|| {
            sync::rtu::connect_slave_with_timeout(&port_builder(config), Slave(config.unit_id), Some(config.timeout))
                .map_err(|e| port_failure(config, e).into())
        })?;

        if opened {
            tracing::info!(
                device = %self.config.device,
                baud_rate = self.config.baud_rate,
                unit_id = self.config.unit_id,
                "Opened Modbus RTU port"
            );
        }
        Ok(())
    }

    fn disconnect(&mut self) -> ModbusResult<()> {
        if self.session.close() {
            tracing::debug!(device = %self.config.device, "Closed Modbus RTU port");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.session.is_open()
    }

    fn state(&self) -> TransportState {
        self.session.state()
    }

    fn read_holding_registers(&mut self, unit: u8, address: u16, count: u16) -> ModbusResult<Vec<u16>> {
        self.call("read_holding_registers", 0x03, unit, |ctx| ctx.read_holding_registers(address, count))
    }

    fn read_input_registers(&mut self, unit: u8, address: u16, count: u16) -> ModbusResult<Vec<u16>> {
        self.call("read_input_registers", 0x04, unit, |ctx| ctx.read_input_registers(address, count))
    }

    fn write_multiple_registers(&mut self, unit: u8, address: u16, values: &[u16]) -> ModbusResult<()> {
        self.call("write_multiple_registers", 0x10, unit, |ctx| ctx.write_multiple_registers(address, values))
    }

    fn display_name(&self) -> String {
        self.config.to_string()
    }
}

impl std::fmt::Debug for RtuTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RtuTransport")
            .field("device", &self.config.device)
            .field("baud_rate", &self.config.baud_rate)
            .field("unit_id", &self.config.unit_id)
            .field("session", &self.session)
            .finish()
    }
}
