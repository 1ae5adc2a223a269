// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The live tokio-modbus context behind a TCP or RTU transport.
//!
//! Both transports keep the same bookkeeping: an optional context, a
//! [`TransportState`], and the rule for whether a failed request costs the
//! link. Only opening the link and classifying I/O failures differ.

use tokio_modbus::client::sync::Context;
use tokio_modbus::prelude::{Slave, SlaveContext};

use crate::error::{ModbusError, ModbusResult, ProtocolError};

use super::transport::{exception_error, TransportState};

pub(super) struct Session {
    context: Option<Context>,
    state: TransportState,
    /// Serial lines survive a missed reply; sockets are reopened.
    keep_after_timeout: bool,
}

impl Session {
    pub(super) fn socket() -> Self {
        Self::with_timeout_policy(false)
    }

    pub(super) fn serial() -> Self {
        Self::with_timeout_policy(true)
    }

    fn with_timeout_policy(keep_after_timeout: bool) -> Self {
        Self {
            context: None,
            state: TransportState::Disconnected,
            keep_after_timeout,
        }
    }

    pub(super) fn state(&self) -> TransportState {
        self.state
    }

    pub(super) fn is_open(&self) -> bool {
        self.state == TransportState::Connected
    }

    /// Runs `connect` unless a context is already live.
    ///
    /// Returns whether a new context was made.
    pub(super) fn open(&mut self, connect: impl FnOnce() -> ModbusResult<Context>) -> ModbusResult<bool> {
        if self.is_open() {
            return Ok(false);
        }

        self.state = TransportState::Connecting;
        match connect() {
            Ok(context) => {
                self.context = Some(context);
                self.state = TransportState::Connected;
                Ok(true)
            }
            Err(error) => {
                self.context = None;
                self.state = TransportState::Error;
                Err(error)
            }
        }
    }

    /// Drops the context. Returns whether one was live.
    pub(super) fn close(&mut self) -> bool {
        self.state = TransportState::Disconnected;
        self.context.take().is_some()
    }

    /// Addresses `unit` and runs one request.
    ///
    /// An exception reply leaves the link alone. Any other failure is turned
    /// into a [`ModbusError`] (`io_failure` handles the I/O kinds) and drops
    /// the link, except a timeout on a serial line.
    pub(super) fn call<T>(
        &mut self,
        operation: &'static str,
        function_code: u8,
        unit: u8,
        request: impl FnOnce(&mut Context) -> tokio_modbus::Result<T>,
        io_failure: impl FnOnce(std::io::Error) -> ModbusError,
    ) -> ModbusResult<T> {
        let context = self.context.as_mut().ok_or_else(ModbusError::not_connected)?;
        context.set_slave(Slave(unit));

        let failure = match request(context) {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(exception)) => return Err(exception_error(function_code, exception)),
            Err(tokio_modbus::Error::Transport(io)) => io_failure(io),
            Err(tokio_modbus::Error::Protocol(protocol)) => {
                ProtocolError::unexpected(format!("{operation}: {protocol}")).into()
            }
        };

        let timed_out = matches!(failure, ModbusError::Timeout(_));
        if !(timed_out && self.keep_after_timeout) {
            self.context = None;
            self.state = TransportState::Error;
        }
        Err(failure)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.state.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConnectionError;
    use tokio_modbus::client::sync::Reader;

    #[test]
    fn test_failed_open_marks_error() {
        let mut session = Session::socket();
        let result = session.open(|| Err(ConnectionError::refused("10.0.0.9", 502).into()));

        assert!(result.is_err());
        assert_eq!(session.state(), TransportState::Error);
        assert!(!session.is_open());
    }

    #[test]
    fn test_call_needs_open_context() {
        let mut session = Session::serial();
        let result = session.call(
            "read_holding_registers",
            0x03,
            1,
            |ctx| ctx.read_holding_registers(0, 1),
            |io| ConnectionError::from(io).into(),
        );

        assert!(matches!(result, Err(ModbusError::Connection(ConnectionError::NotConnected))));
        assert_eq!(session.state(), TransportState::Disconnected);
    }

    #[test]
    fn test_close_reports_whether_open() {
        let mut session = Session::socket();
        assert!(!session.close());
        assert_eq!(session.state(), TransportState::Disconnected);
        assert_eq!(format!("{session:?}"), "disconnected");
    }
}
