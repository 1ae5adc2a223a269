// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The blocking request interface behind every register client, and the
//! handles through which an inverter and its meters share one line.
//!
//! ```text
//! Inverter ---- TransportHandle::Owned ----+
//!                                          v
//!                              Rc<RefCell<dyn Transport>>
//!                                          ^
//! Meter1   ---- TransportHandle::Borrowed -+ (Weak)
//! ```

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tokio_modbus::ExceptionCode;

use crate::error::{ConnectionError, ModbusError, ModbusResult, ProtocolError};
use crate::types::RegisterClass;

// =============================================================================
// TransportState
// =============================================================================

/// Where a transport is in its connect cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// The last connect or request broke the link.
    Error,
}

impl TransportState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Transport
// =============================================================================

/// A Modbus link that blocks on every call.
///
/// Calls return once the device answers, the request fails, or the
/// configured timeout runs out. The unit id travels with each request, so
/// one TCP socket or RS485 line can serve several units.
///
/// [`TcpTransport`](super::tcp::TcpTransport) and
/// [`RtuTransport`](super::rtu::RtuTransport) are the two implementations;
/// tests substitute their own.
pub trait Transport {
    /// Opens the link. Already open is fine.
    fn connect(&mut self) -> ModbusResult<()>;

    /// Drops the link. Already closed is fine.
    fn disconnect(&mut self) -> ModbusResult<()>;

    /// Cheap state check; never touches the wire.
    fn is_connected(&self) -> bool;

    fn state(&self) -> TransportState;

    /// Function 0x03.
    fn read_holding_registers(&mut self, unit: u8, address: u16, count: u16)
    -> ModbusResult<Vec<u16>>;

    /// Function 0x04.
    fn read_input_registers(&mut self, unit: u8, address: u16, count: u16)
    -> ModbusResult<Vec<u16>>;

    /// Function 0x10.
    fn write_multiple_registers(&mut self, unit: u8, address: u16, values: &[u16])
    -> ModbusResult<()>;

    /// Picks function 0x03 or 0x04 from `register_class`.
    fn read_registers(
        &mut self,
        register_class: RegisterClass,
        unit: u8,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<u16>> {
        if register_class == RegisterClass::Input {
            self.read_input_registers(unit, address, count)
        } else {
            self.read_holding_registers(unit, address, count)
        }
    }

    /// Label used in logs, e.g. `/dev/ttyUSB0, RTU: stopbits=1, parity=N, baud=9600, timeout=2s`.
    fn display_name(&self) -> String;
}

/// Turns a device exception reply into a protocol error.
pub(crate) fn exception_error(function_code: u8, exception: ExceptionCode) -> ModbusError {
    let exception_code = match exception {
        ExceptionCode::IllegalFunction => 0x01,
        ExceptionCode::IllegalDataAddress => 0x02,
        ExceptionCode::IllegalDataValue => 0x03,
        ExceptionCode::ServerDeviceFailure => 0x04,
        ExceptionCode::Acknowledge => 0x05,
        ExceptionCode::ServerDeviceBusy => 0x06,
        ExceptionCode::MemoryParityError => 0x08,
        ExceptionCode::GatewayPathUnavailable => 0x0A,
        ExceptionCode::GatewayTargetDevice => 0x0B,
        #[allow(unreachable_patterns)]
        _ => 0xFF,
    };
    ProtocolError::exception_response(function_code, exception_code).into()
}

// =============================================================================
// Shared Handles
// =============================================================================

/// One line, shared by every device that talks over it.
pub type SharedTransport = Rc<RefCell<dyn Transport>>;

/// Puts `transport` behind the shared handle type.
pub fn share<T: Transport + 'static>(transport: T) -> SharedTransport {
    Rc::new(RefCell::new(transport))
}

/// A device's reference to its transport.
///
/// The device that created the transport owns it. Devices derived from it
/// (meters) hold a weak reference and fail with
/// [`ConnectionError::TransportReleased`] once the owner is gone.
#[derive(Clone)]
pub enum TransportHandle {
    /// Owning reference.
    Owned(SharedTransport),
    /// Non-owning reference to another device's transport.
    Borrowed(Weak<RefCell<dyn Transport>>),
}

impl TransportHandle {
    /// Returns the transport, or an error if its owner has been dropped.
    pub fn get(&self) -> ModbusResult<SharedTransport> {
        match self {
            Self::Owned(shared) => Ok(Rc::clone(shared)),
            Self::Borrowed(weak) => weak
                .upgrade()
                .ok_or_else(|| ConnectionError::TransportReleased.into()),
        }
    }

    /// Returns a non-owning handle to the same transport.
    pub fn downgrade(&self) -> Self {
        match self {
            Self::Owned(shared) => Self::Borrowed(Rc::downgrade(shared)),
            Self::Borrowed(weak) => Self::Borrowed(weak.clone()),
        }
    }

    /// Returns `true` if this handle owns the transport.
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Returns the transport's display name, or a placeholder once released.
    pub fn display_name(&self) -> String {
        match self.get() {
            Ok(shared) => shared
                .try_borrow()
                .map(|t| t.display_name())
                .unwrap_or_else(|_| "<busy>".to_string()),
            Err(_) => "<released>".to_string(),
        }
    }
}

impl From<SharedTransport> for TransportHandle {
    fn from(shared: SharedTransport) -> Self {
        Self::Owned(shared)
    }
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_owned() { "Owned" } else { "Borrowed" };
        f.debug_tuple(kind).field(&self.display_name()).finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
