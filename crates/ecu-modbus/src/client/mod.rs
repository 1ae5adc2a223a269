// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Blocking register access shared by inverters and meters.
//!
//! Layers, top to bottom:
//!
//! ```text
//!   Inverter / Meter        named fields, batch plans, decoding
//!          |
//!   RegisterClient          unit id, attempt budget, reconnect pause
//!          |
//!   TransportHandle         owned Rc or borrowed Weak
//!          |
//!   TcpTransport | RtuTransport   (tokio-modbus sync contexts)
//! ```
//!
//! One TCP socket or serial line may be shared by several clients; each
//! client carries its own unit id and the transport is borrowed only for
//! the duration of a single request.
//!
//! ```rust,ignore
//! use ecu_modbus::client::{share, RegisterClient, TcpTransport};
//! use ecu_modbus::types::RegisterClass;
//!
//! let line = share(TcpTransport::simple("192.168.1.50", 502));
//! let client = RegisterClient::new(line.into(), 1);
//!
//! client.connect()?;
//! let words = client.read_registers(RegisterClass::Holding, 0x9c42, 2);
//! ```

mod retry;
mod rtu;
mod session;
mod tcp;
mod transport;

pub use retry::{ExponentialBackoff, RetryConfig, RetryStrategy};
pub use rtu::RtuTransport;
pub use tcp::TcpTransport;
pub use transport::{share, SharedTransport, Transport, TransportHandle, TransportState};

use std::cell::Cell;

use crate::error::{ModbusResult, OperationError, ProtocolError};
use crate::types::{RegisterClass, MAX_READ_REGISTERS, MAX_WRITE_REGISTERS};

// =============================================================================
// RegisterClient
// =============================================================================

/// Reads and writes the registers of one unit id.
///
/// Reads never fail loudly: each of the `max_attempts` tries either
/// reconnects a dropped transport (pausing afterwards) or issues the
/// request, and a transport error or a reply of the wrong length spends
/// the try. When nothing is left the read yields `None`. Writes go out
/// once and return their error.
pub struct RegisterClient {
    transport: TransportHandle,
    unit_id: u8,
    retry_config: RetryConfig,
    tally: Cell<RequestTally>,
}

impl RegisterClient {
    /// Client using [`RetryConfig::default`].
    pub fn new(transport: TransportHandle, unit_id: u8) -> Self {
        Self::with_retry(transport, unit_id, RetryConfig::default())
    }

    /// Client with an explicit attempt budget.
    pub fn with_retry(transport: TransportHandle, unit_id: u8, retry_config: RetryConfig) -> Self {
        Self {
            transport,
            unit_id,
            retry_config,
            tally: Cell::new(RequestTally::default()),
        }
    }

    /// Unit id placed in every request.
    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn transport(&self) -> &TransportHandle {
        &self.transport
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    /// Requests, failures, retries and connects since the client was made.
    pub fn tally(&self) -> RequestTally {
        self.tally.get()
    }

    /// Transport label, e.g. `10.0.0.5:502, TCP: timeout=2s`.
    pub fn display_name(&self) -> String {
        self.transport.display_name()
    }

    fn count(&self, bump: impl FnOnce(&mut RequestTally)) {
        let mut tally = self.tally.get();
        bump(&mut tally);
        self.tally.set(tally);
    }

    // =========================================================================
    // Connection Management
    // =========================================================================

    /// Opens the transport if it is not open yet.
    pub fn connect(&self) -> ModbusResult<()> {
        self.with_transport(|transport| transport.connect())?;
        self.count(|tally| tally.connects += 1);
        Ok(())
    }

    /// Closes the transport and logs the request tally.
    pub fn disconnect(&self) -> ModbusResult<()> {
        let tally = self.tally.get();
        tracing::debug!(
            transport = %self.display_name(),
            unit_id = self.unit_id,
            requests = tally.requests,
            failures = tally.failures,
            retries = tally.retries,
            connects = tally.connects,
            "Closing register client"
        );
        self.with_transport(|transport| transport.disconnect())
    }

    /// False for a released transport or one borrowed elsewhere right now.
    pub fn is_connected(&self) -> bool {
        match self.transport.get() {
            Ok(shared) => shared.try_borrow().is_ok_and(|t| t.is_connected()),
            Err(_) => false,
        }
    }

    // =========================================================================
    // Register Operations
    // =========================================================================

    /// Reads `count` registers starting at `address`.
    ///
    /// Returns `None` when the count is out of range or every attempt failed.
    pub fn read_registers(
        &self,
        register_class: RegisterClass,
        address: u16,
        count: u16,
    ) -> Option<Vec<u16>> {
        if let Err(error) = Self::validate_read_count(count) {
            error.log("read_registers");
            return None;
        }

        let max_attempts = self.retry_config.max_attempts.max(1);

        for attempt in 0..max_attempts {
            if attempt > 0 {
                self.count(|tally| tally.retries += 1);
            }

            if !self.is_connected() {
                match self.connect() {
                    Ok(()) => tracing::debug!(
                        transport = %self.display_name(),
                        attempt = attempt + 1,
                        "Reconnected before register read"
                    ),
                    Err(error) => tracing::debug!(
                        attempt = attempt + 1,
                        max_attempts,
                        error = %error,
                        "Reconnect failed"
                    ),
                }
                std::thread::sleep(self.retry_config.strategy.delay(attempt));
                continue;
            }

            let result = self
                .with_transport(|transport| {
                    transport.read_registers(register_class, self.unit_id, address, count)
                })
                .and_then(|words| {
                    if words.len() == usize::from(count) {
                        Ok(words)
                    } else {
                        Err(ProtocolError::count_mismatch(address, count, words.len()).into())
                    }
                });

            self.count(|tally| tally.requests += 1);
            match result {
                Ok(words) => return Some(words),
                Err(error) => {
                    self.count(|tally| tally.failures += 1);
                    tracing::debug!(
                        register_class = register_class.short_name(),
                        address,
                        count,
                        attempt = attempt + 1,
                        max_attempts,
                        error = %error,
                        "Register read attempt failed"
                    );
                }
            }
        }

        tracing::warn!(
            register_class = register_class.short_name(),
            address,
            count,
            unit_id = self.unit_id,
            max_attempts,
            "Register read gave up after exhausting retries"
        );
        None
    }

    /// Writes holding registers starting at `address`.
    ///
    /// A write is attempted once; a disconnected transport is connected first.
    pub fn write_registers(&self, address: u16, values: &[u16]) -> ModbusResult<()> {
        let max = MAX_WRITE_REGISTERS;
        let count = u16::try_from(values.len()).unwrap_or(u16::MAX);
        if count == 0 || count > max {
            return Err(OperationError::too_many_registers(count, max).into());
        }

        if !self.is_connected() {
            self.connect()?;
        }

        let result = self.with_transport(|transport| {
            transport.write_multiple_registers(self.unit_id, address, values)
        });
        self.count(|tally| tally.requests += 1);
        if let Err(error) = &result {
            self.count(|tally| tally.failures += 1);
            error.log("write_registers");
        }
        result
    }

    fn validate_read_count(count: u16) -> ModbusResult<()> {
        if count == 0 || count > MAX_READ_REGISTERS {
            return Err(OperationError::too_many_registers(count, MAX_READ_REGISTERS).into());
        }
        Ok(())
    }

    /// Borrows the transport for one request.
    fn with_transport<R>(
        &self,
        operation: impl FnOnce(&mut dyn Transport) -> ModbusResult<R>,
    ) -> ModbusResult<R> {
        let shared = self.transport.get()?;
        let mut transport = shared
            .try_borrow_mut()
            .map_err(|_| OperationError::not_supported("re-entrant transport access"))?;
        operation(&mut *transport)
    }
}

impl std::fmt::Debug for RegisterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterClient")
            .field("transport", &self.transport)
            .field("unit_id", &self.unit_id)
            .field("max_attempts", &self.retry_config.max_attempts)
            .finish()
    }
}

// =============================================================================
// RequestTally
// =============================================================================

/// Running counts kept by a [`RegisterClient`].
///
/// Every read attempt that reaches the wire and every write is a request;
/// reconnect-only attempts are not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestTally {
    pub requests: u64,
    pub failures: u64,
    pub retries: u64,
    pub connects: u64,
}

// =============================================================================
// Tests
// =============================================================================
