// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus TCP, through the blocking client of `tokio-modbus`.
//!
//! Any failed request other than an exception reply closes the socket; the
//! register client reconnects on its next attempt.

use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs};

use tokio_modbus::client::sync::{self, Reader, Writer};
use tokio_modbus::prelude::Slave;

use crate::error::{ConnectionError, ModbusError, ModbusResult, TimeoutError};
use crate::types::TcpConfig;

use super::session::Session;
use super::transport::{Transport, TransportState};

/// Socket to an ECU (or any Modbus TCP server).
///
/// ```rust,ignore
/// use ecu_modbus::client::{TcpTransport, Transport};
/// use ecu_modbus::types::TcpConfig;
///
/// let mut ecu = TcpTransport::new(TcpConfig::new("192.168.1.50"));
/// ecu.connect()?;
/// let words = ecu.read_holding_registers(1, 0x9c42, 2)?;
/// ```
pub struct TcpTransport {
    config: TcpConfig,
    session: Session,
}

impl TcpTransport {
    pub fn new(config: TcpConfig) -> Self {
        Self {
            config,
            session: Session::socket(),
        }
    }

    /// `host:port` with every other setting at its default.
    pub fn simple(host: impl Into<String>, port: u16) -> Self {
        Self::new(TcpConfig::new(host).with_port(port))
    }

    pub fn config(&self) -> &TcpConfig {
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

/// First address for `host:port`; literal IPs skip the resolver.
fn resolve(config: &TcpConfig) -> ModbusResult<SocketAddr> {
    if let Ok(address) = config.socket_addr().parse::<SocketAddr>() {
        return Ok(address);
    }

    (config.host.as_str(), config.port)
        .to_socket_addrs()
        .map_err(|e| ConnectionError::dns_failed(&config.host, Some(e)))?
        .next()
        .ok_or_else(|| ConnectionError::dns_failed(&config.host, None).into())
}

fn connect_failure(config: &TcpConfig, error: std::io::Error) -> ModbusError {
    let failure = if matches!(error.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) {
        ConnectionError::timed_out(&config.host, config.port, config.timeout)
    } else {
        ConnectionError::refused_with(&config.host, config.port, error)
    };
    failure.into()
}

fn io_failure(config: &TcpConfig, error: std::io::Error, operation: &str) -> ModbusError {
    match error.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => TimeoutError::read(config.timeout).into(),
        ErrorKind::ConnectionRefused => ConnectionError::refused(&config.host, config.port).into(),
        ErrorKind::NotConnected
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof => ConnectionError::from(error).into(),
        _ => ConnectionError::io(operation, error).into(),
    }
}

impl Transport for TcpTransport {
    fn connect(&mut self) -> ModbusResult<()> {
        let config = &self.config;
        let opened = self.session.open(|| {
            let address = resolve(config)?;
            sync::tcp::connect_slave_with_timeout(address, Slave(config.unit_id), Some(config.timeout))
                .map_err(|e| connect_failure(config, e))
        })?;

        if opened {
            tracing::info!(
                host = %self.config.host,
                port = self.config.port,
                unit_id = self.config.unit_id,
                "Opened Modbus TCP socket"
            );
        }
        Ok(())
    }

    fn disconnect(&mut self) -> ModbusResult<()> {
        if self.session.close() {
            tracing::debug!(host = %self.config.host, port = self.config.port, "Closed Modbus TCP socket");
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

impl std::fmt::Debug for TcpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpTransport")
            .field("address", &self.config.socket_addr())
            .field("unit_id", &self.config.unit_id)
            .field("session", &self.session)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_closed() {
        let ecu = TcpTransport::simple("127.0.0.1", 1502);
        assert_eq!(ecu.config().port, 1502);
        assert_eq!(ecu.state(), TransportState::Disconnected);
        assert!(!ecu.is_connected());
    }

    #[test]
    fn test_display_name() {
        let ecu = TcpTransport::new(TcpConfig::new("ecu.local").with_timeout(Duration::from_millis(1500)));
        assert_eq!(ecu.display_name(), "ecu.local:502, TCP: timeout=1s 500ms");
    }

    #[test]
    fn test_literal_address_skips_resolver() {
        let config = TcpConfig::new("10.0.0.7").with_port(1502);
        assert_eq!(resolve(&config).unwrap(), "10.0.0.7:1502".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_io_failures_classified() {
        let config = TcpConfig::new("10.0.0.7");
        let timeout = io_failure(&config, ErrorKind::TimedOut.into(), "read_holding_registers");
        assert!(matches!(timeout, ModbusError::Timeout(_)));

        let refused = connect_failure(&config, ErrorKind::ConnectionRefused.into());
        assert!(matches!(refused, ModbusError::Connection(ConnectionError::Refused { .. })));
    }

    #[test]
    fn test_request_while_closed() {
        let mut ecu = TcpTransport::simple("127.0.0.1", 502);
        let err = ecu.read_holding_registers(1, 0, 1).unwrap_err();
        assert!(matches!(err, ModbusError::Connection(ConnectionError::NotConnected)));
        assert!(ecu.disconnect().is_ok());
    }

    #[test]
    fn test_debug_shows_address_and_state() {
        let debug = format!("{:?}", TcpTransport::simple("127.0.0.1", 502));
        assert!(debug.contains("127.0.0.1:502"));
        assert!(debug.contains("disconnected"));
    }
}
