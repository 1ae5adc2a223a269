// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for register access, decoding and device operations.
//!
//! Failures fall into two groups. Transport failures (connection, protocol,
//! timeout) are recovered by the retry loop in [`crate::client`] and, for
//! reads, degrade into absent values instead of reaching the caller. Caller
//! mistakes (unknown field, write to a read-only class, a value the field
//! cannot hold) are returned immediately.
//!
//! Every error carries a stable [`ErrorCode`] of the form `MB-CCNN`, where
//! `CC` is the category below and `NN` the variant within it:
//!
//! ```text
//! 01 Connection     socket, serial port, shared transport
//! 02 Protocol       exception replies (NN = exception code), short replies
//! 03 Operation      unknown field, read-only or unsupported writes
//! 04 Conversion     values that do not fit a field
//! 05 Configuration  settings and register catalog entries
//! 06 Timeout        request deadlines
//! ```
//!
//! ```
//! use ecu_modbus::error::{ErrorSeverity, ModbusError};
//!
//! let error = ModbusError::unknown_field("power_dc");
//! assert!(error.is_lookup());
//! assert_eq!(error.error_code().to_string(), "MB-0303");
//! assert_eq!(error.severity(), ErrorSeverity::Error);
//! ```

use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;
use tracing::Level;

/// Short alias for fallible results in this crate.
pub type ModbusResult<T> = Result<T, ModbusError>;

type Hints = &'static [&'static str];

// =============================================================================
// ModbusError
// =============================================================================

/// Any failure raised while talking to an ECU.
#[derive(Debug, Error)]
pub enum ModbusError {
    /// The link to the device could not be used.
    #[error("{0}")]
    Connection(#[from] ConnectionError),

    /// The device answered, but not with what was asked for.
    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    /// The caller asked for something the device facade does not allow.
    #[error("{0}")]
    Operation(#[from] OperationError),

    /// A value could not be encoded for its field.
    #[error("{0}")]
    Conversion(#[from] ConversionError),

    /// Settings or catalog entries are invalid.
    #[error("{0}")]
    Configuration(#[from] ConfigurationError),

    /// A request ran past its deadline.
    #[error("{0}")]
    Timeout(#[from] TimeoutError),
}

impl ModbusError {
    /// Wraps a [`ConnectionError`].
    pub fn connection(error: ConnectionError) -> Self {
        Self::Connection(error)
    }

    /// Wraps a [`ProtocolError`].
    pub fn protocol(error: ProtocolError) -> Self {
        Self::Protocol(error)
    }

    /// Wraps an [`OperationError`].
    pub fn operation(error: OperationError) -> Self {
        Self::Operation(error)
    }

    /// Wraps a [`ConversionError`].
    pub fn conversion(error: ConversionError) -> Self {
        Self::Conversion(error)
    }

    /// Wraps a [`ConfigurationError`].
    pub fn configuration(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }

    /// Wraps a [`TimeoutError`].
    pub fn timeout(error: TimeoutError) -> Self {
        Self::Timeout(error)
    }

    /// The transport has no open link.
    pub fn not_connected() -> Self {
        ConnectionError::NotConnected.into()
    }

    /// `name` is not in the device catalog.
    pub fn unknown_field(name: impl Into<String>) -> Self {
        OperationError::unknown_field(name).into()
    }

    /// A value variant that the field's data type cannot take.
    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        ConversionError::type_mismatch(expected, actual).into()
    }

    /// `true` for a field name missing from the catalog.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::Operation(OperationError::UnknownField { .. }))
    }

    /// `true` for a write the field can never accept.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::Operation(OperationError::ReadOnly { .. } | OperationError::NotSupported { .. })
        )
    }

    /// `true` when repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        use ConnectionError as C;

        match self {
            Self::Connection(
                C::SerialPortNotFound { .. }
                | C::SerialPortAccessDenied { .. }
                | C::SerialConfigurationFailed { .. }
                | C::TransportReleased,
            ) => false,
            Self::Connection(C::Io { source, .. }) => matches!(
                source.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::Interrupted
            ),
            Self::Connection(_) => true,
            // Acknowledge, busy, and gateway target silent.
            Self::Protocol(ProtocolError::ExceptionResponse { exception_code, .. }) => {
                matches!(exception_code, 0x05 | 0x06 | 0x0B)
            }
            Self::Protocol(_) | Self::Timeout(_) => true,
            Self::Operation(_) | Self::Conversion(_) | Self::Configuration(_) => false,
        }
    }

    /// How loudly this error should be reported.
    pub fn severity(&self) -> ErrorSeverity {
        use ConnectionError as C;

        match self {
            Self::Connection(C::NotConnected | C::TimedOut { .. } | C::Closed { .. }) => {
                ErrorSeverity::Warning
            }
            Self::Connection(C::SerialPortAccessDenied { .. }) => ErrorSeverity::Critical,
            Self::Connection(_) => ErrorSeverity::Error,
            Self::Protocol(ProtocolError::ExceptionResponse { exception_code, .. }) => {
                match exception_code {
                    0x05 | 0x06 => ErrorSeverity::Warning,
                    0x01..=0x03 => ErrorSeverity::Error,
                    _ => ErrorSeverity::Critical,
                }
            }
            Self::Protocol(_) | Self::Timeout(_) => ErrorSeverity::Warning,
            Self::Operation(OperationError::ReadOnly { .. }) => ErrorSeverity::Warning,
            Self::Operation(_) | Self::Conversion(_) => ErrorSeverity::Error,
            Self::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// Stable `MB-CCNN` code.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Connection(e) => ErrorCode::new(1, e.code()),
            Self::Protocol(e) => ErrorCode::new(2, e.code()),
            Self::Operation(e) => ErrorCode::new(3, e.code()),
            Self::Conversion(e) => ErrorCode::new(4, e.code()),
            Self::Configuration(e) => ErrorCode::new(5, e.code()),
            Self::Timeout(e) => ErrorCode::new(6, e.code()),
        }
    }

    /// Lowercase category name, used as a log field.
    pub fn category(&self) -> &'static str {
        const NAMES: [&str; 6] = [
            "connection",
            "protocol",
            "operation",
            "conversion",
            "configuration",
            "timeout",
        ];
        NAMES[usize::from(self.error_code().category - 1)]
    }

    /// Suggestions printed below the error by the CLI.
    pub fn recovery_hints(&self) -> Hints {
        match self {
            Self::Connection(e) => e.hints(),
            Self::Protocol(e) => e.hints(),
            Self::Operation(e) => e.hints(),
            Self::Conversion(e) => e.hints(),
            Self::Configuration(e) => e.hints(),
            Self::Timeout(_) => &[
                "The ECU answers slowly while it polls its inverters",
                "Raise the request timeout",
            ],
        }
    }

    /// Level at which [`ModbusError::log`] reports this error.
    pub fn tracing_level(&self) -> Level {
        self.severity().to_tracing_level()
    }

    /// Emits one structured event for this error.
    ///
    /// `context` names what was being done, e.g. a field or operation.
    pub fn log(&self, context: &str) {
        let code = self.error_code();

        macro_rules! emit {
            ($macro:ident) => {
                tracing::$macro!(
                    error_code = %code,
                    category = self.category(),
                    context,
                    retryable = self.is_retryable(),
                    "{}",
                    self
                )
            };
        }

        match self.tracing_level() {
            Level::ERROR => emit!(error),
            Level::WARN => emit!(warn),
            _ => emit!(debug),
        }
    }
}

// =============================================================================
// Connection
// =============================================================================

/// Failures opening or using the link to the ECU.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The ECU refused the TCP connection.
    #[error("ECU at {host}:{port} refused the connection")]
    Refused {
        /// Host that was dialled.
        host: String,
        /// Port that was dialled.
        port: u16,
        /// OS error, when there is one.
        #[source]
        source: Option<io::Error>,
    },

    /// No TCP handshake within the configured timeout.
    #[error("no answer from {host}:{port} within {duration:?}")]
    TimedOut {
        /// Host that was dialled.
        host: String,
        /// Port that was dialled.
        port: u16,
        /// Configured timeout.
        duration: Duration,
    },

    /// The host name did not resolve to any address.
    #[error("cannot resolve '{hostname}'")]
    DnsResolutionFailed {
        /// Name given in the configuration.
        hostname: String,
        /// Resolver error, when there is one.
        #[source]
        source: Option<io::Error>,
    },

    /// The serial device path does not exist.
    #[error("no serial device at {port}")]
    SerialPortNotFound {
        /// Device path.
        port: String,
    },

    /// The serial device exists but cannot be opened.
    #[error("permission denied opening {port}")]
    SerialPortAccessDenied {
        /// Device path.
        port: String,
    },

    /// The serial device rejected the line settings.
    #[error("cannot configure {port}: {message}")]
    SerialConfigurationFailed {
        /// Device path.
        port: String,
        /// Driver message.
        message: String,
    },

    /// The peer or the network dropped the link.
    #[error("link closed{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Closed {
        /// What closed it, if known.
        reason: Option<String>,
    },

    /// A request was issued with no open link.
    #[error("not connected")]
    NotConnected,

    /// A meter outlived the inverter that owns its transport.
    #[error("shared transport was released by its owning device")]
    TransportReleased,

    /// Any other I/O failure.
    #[error("{message}: I/O failure")]
    Io {
        /// Operation in progress.
        message: String,
        /// OS error.
        #[source]
        source: io::Error,
    },
}

impl ConnectionError {
    /// Refused TCP connection.
    pub fn refused(host: impl Into<String>, port: u16) -> Self {
        Self::Refused {
            host: host.into(),
            port,
            source: None,
        }
    }

    /// Refused TCP connection with the OS error attached.
    pub fn refused_with(host: impl Into<String>, port: u16, source: io::Error) -> Self {
        Self::Refused {
            host: host.into(),
            port,
            source: Some(source),
        }
    }

    /// TCP handshake timeout.
    pub fn timed_out(host: impl Into<String>, port: u16, duration: Duration) -> Self {
        Self::TimedOut {
            host: host.into(),
            port,
            duration,
        }
    }

    /// Unresolvable host name.
    pub fn dns_failed(hostname: impl Into<String>, source: Option<io::Error>) -> Self {
        Self::DnsResolutionFailed {
            hostname: hostname.into(),
            source,
        }
    }

    /// Missing serial device.
    pub fn serial_not_found(port: impl Into<String>) -> Self {
        Self::SerialPortNotFound { port: port.into() }
    }

    /// Serial device without permission.
    pub fn serial_access_denied(port: impl Into<String>) -> Self {
        Self::SerialPortAccessDenied { port: port.into() }
    }

    /// Serial device that rejected its line settings.
    pub fn serial_configuration(port: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SerialConfigurationFailed {
            port: port.into(),
            message: message.into(),
        }
    }

    /// Dropped link.
    pub fn closed(reason: Option<String>) -> Self {
        Self::Closed { reason }
    }

    /// Uncategorized I/O failure during `message`.
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    fn code(&self) -> u8 {
        match self {
            Self::Refused { .. } => 1,
            Self::TimedOut { .. } => 2,
            Self::DnsResolutionFailed { .. } => 3,
            Self::SerialPortNotFound { .. } => 5,
            Self::SerialPortAccessDenied { .. } => 6,
            Self::SerialConfigurationFailed { .. } => 7,
            Self::Closed { .. } => 8,
            Self::NotConnected => 9,
            Self::Io { .. } => 10,
            Self::TransportReleased => 11,
        }
    }

    fn hints(&self) -> Hints {
        match self {
            Self::Refused { .. } => &[
                "Check that the ECU is powered on and on the network",
                "Modbus TCP normally listens on port 502",
                "Modbus TCP must be enabled in the ECU web interface",
            ],
            Self::TimedOut { .. } => &[
                "Ping the ECU to confirm it is reachable",
                "Raise the connection timeout",
            ],
            Self::DnsResolutionFailed { .. } => &[
                "Check the spelling of the host name",
                "Use the ECU's IP address instead",
            ],
            Self::SerialPortNotFound { .. } => &[
                "Check the device path, e.g. /dev/ttyUSB0",
                "Make sure the RS485 adapter is plugged in",
            ],
            Self::SerialPortAccessDenied { .. } => &[
                "On Linux, add your user to the 'dialout' group",
            ],
            Self::SerialConfigurationFailed { .. } => &[
                "Baud rate, parity and stop bits must match the ECU",
            ],
            Self::Closed { .. } | Self::Io { .. } => &[
                "The ECU or the network dropped the link",
                "Run the command again",
            ],
            Self::NotConnected => &["Connect before issuing requests"],
            Self::TransportReleased => {
                &["Keep the inverter alive for as long as its meters are in use"]
            }
        }
    }
}

impl From<io::Error> for ConnectionError {
    fn from(error: io::Error) -> Self {
        use io::ErrorKind as K;

        match error.kind() {
            K::NotConnected => Self::NotConnected,
            K::ConnectionReset | K::ConnectionAborted | K::BrokenPipe | K::UnexpectedEof => {
                Self::closed(Some(error.to_string()))
            }
            _ => Self::io(error.to_string(), error),
        }
    }
}

// =============================================================================
// Protocol
// =============================================================================

/// Replies that do not answer the request.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The device answered with a Modbus exception.
    #[error("device rejected function {function_code:#04x}: {exception_name} (exception {exception_code})")]
    ExceptionResponse {
        /// Function code of the request.
        function_code: u8,
        /// Exception code of the reply.
        exception_code: u8,
        /// Readable form of `exception_code`.
        exception_name: String,
    },

    /// The reply carried a different number of registers than requested.
    #[error("short reply at {address:#06x}: asked for {expected} registers, got {actual}")]
    CountMismatch {
        /// Start address of the request.
        address: u16,
        /// Requested register count.
        expected: u16,
        /// Received register count.
        actual: usize,
    },

    /// Anything else the client library could not make sense of.
    #[error("malformed reply: {message}")]
    UnexpectedResponse {
        /// Library message.
        message: String,
    },
}

impl ProtocolError {
    /// Exception reply to `function_code`.
    pub fn exception_response(function_code: u8, exception_code: u8) -> Self {
        let exception_name = match exception_code {
            0x01 => "illegal function",
            0x02 => "illegal data address",
            0x03 => "illegal data value",
            0x04 => "server device failure",
            0x05 => "acknowledge",
            0x06 => "server device busy",
            0x08 => "memory parity error",
            0x0A => "gateway path unavailable",
            0x0B => "gateway target did not respond",
            _ => "unknown exception",
        };
        Self::ExceptionResponse {
            function_code,
            exception_code,
            exception_name: exception_name.to_string(),
        }
    }

    /// Reply of `actual` registers to a request for `expected` at `address`.
    pub fn count_mismatch(address: u16, expected: u16, actual: usize) -> Self {
        Self::CountMismatch {
            address,
            expected,
            actual,
        }
    }

    /// Unparseable reply.
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            message: message.into(),
        }
    }

    fn code(&self) -> u8 {
        match self {
            Self::ExceptionResponse { exception_code, .. } => *exception_code,
            Self::CountMismatch { .. } => 22,
            Self::UnexpectedResponse { .. } => 28,
        }
    }

    fn hints(&self) -> Hints {
        match self {
            Self::ExceptionResponse {
                exception_code: 0x02,
                ..
            } => &[
                "The ECU does not map this address",
                "Meters and inverters answer on different units",
            ],
            Self::ExceptionResponse {
                exception_code: 0x06,
                ..
            } => &["The ECU is busy, try again shortly"],
            Self::ExceptionResponse { .. } => &["The ECU rejected the request"],
            Self::CountMismatch { .. } => &[
                "The reply was truncated",
                "On RS485, check termination and cabling",
            ],
            Self::UnexpectedResponse { .. } => &["Another Modbus master may share the line"],
        }
    }
}

// =============================================================================
// Operation
// =============================================================================

/// Requests the device facade refuses before touching the transport.
#[derive(Debug, Error)]
pub enum OperationError {
    /// No field with this name.
    #[error("Unknown field: '{name}'")]
    UnknownField {
        /// Requested name.
        name: String,
    },

    /// A single write wider than the protocol allows.
    #[error("cannot write {count} registers at once (limit {max})")]
    TooManyRegisters {
        /// Requested count.
        count: u16,
        /// Protocol limit.
        max: u16,
    },

    /// The field lives in a register class that cannot be written.
    #[error("Field '{name}' is a read-only {register_class} register")]
    ReadOnly {
        /// Field name.
        name: String,
        /// Its register class.
        register_class: String,
    },

    /// The field's data type has no write form.
    #[error("{operation} is not supported")]
    NotSupported {
        /// What was attempted.
        operation: String,
    },
}

impl OperationError {
    /// Lookup failure for `name`.
    pub fn unknown_field(name: impl Into<String>) -> Self {
        Self::UnknownField { name: name.into() }
    }

    /// Write of `count` registers above `max`.
    pub fn too_many_registers(count: u16, max: u16) -> Self {
        Self::TooManyRegisters { count, max }
    }

    /// Write to a field of a read-only class.
    pub fn read_only(name: impl Into<String>, register_class: impl Into<String>) -> Self {
        Self::ReadOnly {
            name: name.into(),
            register_class: register_class.into(),
        }
    }

    /// Operation with no implementation for this field.
    pub fn not_supported(operation: impl Into<String>) -> Self {
        Self::NotSupported {
            operation: operation.into(),
        }
    }

    fn code(&self) -> u8 {
        match self {
            Self::UnknownField { .. } => 3,
            Self::TooManyRegisters { .. } => 4,
            Self::ReadOnly { .. } => 5,
            Self::NotSupported { .. } => 6,
        }
    }

    fn hints(&self) -> Hints {
        match self {
            Self::UnknownField { .. } => &[
                "Run the `fields` command to list known names",
                "Names are case-sensitive",
            ],
            Self::TooManyRegisters { .. } => &["A single write covers at most 123 registers"],
            Self::ReadOnly { .. } => &["Only holding registers can be written"],
            Self::NotSupported { .. } => &[
                "Energy accumulators are counters kept by the device",
            ],
        }
    }
}

// =============================================================================
// Conversion
// =============================================================================

/// Values that cannot be encoded into their field.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The value variant does not match the field's data type.
    #[error("{actual} value given for a {expected} field")]
    TypeMismatch {
        /// Data type of the field.
        expected: String,
        /// Variant of the value.
        actual: String,
    },

    /// Fewer registers than the data type needs.
    #[error("{expected} registers needed, {actual} available")]
    InsufficientData {
        /// Registers needed.
        expected: usize,
        /// Registers available.
        actual: usize,
    },

    /// Text longer than the field.
    #[error("text of {actual} bytes does not fit a {expected}-byte field")]
    ExcessData {
        /// Field width in bytes.
        expected: usize,
        /// Text length in bytes.
        actual: usize,
    },

    /// A number outside the data type's range.
    #[error("{value} is out of range for {target_type}")]
    Overflow {
        /// Rejected number.
        value: String,
        /// Data type of the field.
        target_type: String,
    },

    /// Command-line text that does not parse as the field's type.
    #[error("'{input}' is not a valid {target_type}")]
    InvalidInput {
        /// Rejected text.
        input: String,
        /// Data type of the field.
        target_type: String,
    },
}

impl ConversionError {
    /// Value variant `actual` for a field of type `expected`.
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Decode with too few registers.
    pub fn insufficient_data(expected: usize, actual: usize) -> Self {
        Self::InsufficientData { expected, actual }
    }

    /// Text of `actual` bytes for an `expected`-byte field.
    pub fn excess_data(expected: usize, actual: usize) -> Self {
        Self::ExcessData { expected, actual }
    }

    /// Out-of-range number.
    pub fn overflow(value: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self::Overflow {
            value: value.into(),
            target_type: target_type.into(),
        }
    }

    /// Unparseable text.
    pub fn invalid_input(input: impl Into<String>, target_type: impl Into<String>) -> Self {
        Self::InvalidInput {
            input: input.into(),
            target_type: target_type.into(),
        }
    }

    fn code(&self) -> u8 {
        match self {
            Self::TypeMismatch { .. } => 1,
            Self::InsufficientData { .. } => 2,
            Self::ExcessData { .. } => 3,
            Self::Overflow { .. } => 5,
            Self::InvalidInput { .. } => 6,
        }
    }

    fn hints(&self) -> Hints {
        match self {
            Self::TypeMismatch { .. } | Self::InvalidInput { .. } => {
                &["The `fields` command shows each field's data type"]
            }
            Self::InsufficientData { .. } => &["32- and 64-bit types span several registers"],
            Self::ExcessData { .. } => &["Shorten the text"],
            Self::Overflow { .. } => &["Pick a value within the register's range"],
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Invalid connection settings or register catalog entries.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Host that is not a usable address or name.
    #[error("bad host '{address}': {reason}")]
    InvalidHost {
        /// Given host.
        address: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Port that cannot be dialled.
    #[error("bad port {port}: {reason}")]
    InvalidPort {
        /// Given port.
        port: u16,
        /// What is wrong with it.
        reason: String,
    },

    /// Unit id outside the addressable range.
    #[error("unit id {unit_id} is outside 1-247")]
    InvalidUnitId {
        /// Given unit id.
        unit_id: u8,
    },

    /// Baud rate of zero.
    #[error("bad baud rate {baud_rate}")]
    InvalidBaudRate {
        /// Given baud rate.
        baud_rate: u32,
    },

    /// Unusable timeout.
    #[error("bad timeout {duration:?}: {reason}")]
    InvalidTimeout {
        /// Given timeout.
        duration: Duration,
        /// What is wrong with it.
        reason: String,
    },

    /// Unusable attempt budget.
    #[error("bad retry count {retries}: {reason}")]
    InvalidRetries {
        /// Given count.
        retries: u32,
        /// What is wrong with it.
        reason: String,
    },

    /// A required setting is absent.
    #[error("'{field}' is required")]
    MissingField {
        /// Setting name.
        field: String,
    },

    /// Register class name that is neither holding nor input.
    #[error("unknown register class '{value}'")]
    InvalidRegisterClass {
        /// Given name.
        value: String,
    },

    /// Data type name outside the supported set.
    #[error("unknown data type '{data_type}'")]
    InvalidDataType {
        /// Given name.
        data_type: String,
    },

    /// A catalog entry that breaks a catalog rule.
    #[error("register table entry '{field}': {reason}")]
    InvalidCatalog {
        /// Offending field.
        field: String,
        /// Broken rule.
        reason: String,
    },
}

impl ConfigurationError {
    /// Bad host.
    pub fn invalid_host(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHost {
            address: address.into(),
            reason: reason.into(),
        }
    }

    /// Bad port.
    pub fn invalid_port(port: u16, reason: impl Into<String>) -> Self {
        Self::InvalidPort {
            port,
            reason: reason.into(),
        }
    }

    /// Bad unit id.
    pub fn invalid_unit_id(unit_id: u8) -> Self {
        Self::InvalidUnitId { unit_id }
    }

    /// Bad timeout.
    pub fn invalid_timeout(duration: Duration, reason: impl Into<String>) -> Self {
        Self::InvalidTimeout {
            duration,
            reason: reason.into(),
        }
    }

    /// Missing setting.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }

    /// Unknown register class name.
    pub fn invalid_register_class(value: impl Into<String>) -> Self {
        Self::InvalidRegisterClass { value: value.into() }
    }

    /// Unknown data type name.
    pub fn invalid_data_type(data_type: impl Into<String>) -> Self {
        Self::InvalidDataType {
            data_type: data_type.into(),
        }
    }

    /// Catalog rule violation by `field`.
    pub fn invalid_catalog(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCatalog {
            field: field.into(),
            reason: reason.into(),
        }
    }

    fn code(&self) -> u8 {
        match self {
            Self::InvalidHost { .. } => 1,
            Self::InvalidPort { .. } => 2,
            Self::InvalidUnitId { .. } => 3,
            Self::InvalidBaudRate { .. } => 4,
            Self::InvalidTimeout { .. } => 5,
            Self::MissingField { .. } => 6,
            Self::InvalidRegisterClass { .. } => 7,
            Self::InvalidDataType { .. } => 8,
            Self::InvalidRetries { .. } => 9,
            Self::InvalidCatalog { .. } => 10,
        }
    }

    fn hints(&self) -> Hints {
        match self {
            Self::InvalidHost { .. } => &["Give an IP address or a host name such as 'ecu.local'"],
            Self::InvalidPort { .. } => &["Modbus TCP normally listens on port 502"],
            Self::InvalidUnitId { .. } => &["The ECU inverter normally answers on unit 1 (range 1-247)"],
            Self::InvalidBaudRate { .. } => &["The ECU serial port usually runs at 9600 or 19200 baud"],
            Self::InvalidTimeout { .. } => &["Use a positive timeout such as '2s'"],
            Self::InvalidRetries { .. } => &["At least one attempt is required"],
            Self::MissingField { .. } => &["Set it in the configuration file, the environment, or a flag"],
            Self::InvalidRegisterClass { .. } => &["Register classes are 'holding' and 'input'"],
            Self::InvalidDataType { .. } => &[
                "Data types are uint16, uint32, uint64, int16, scale, acc32, float32, sefloat and string",
            ],
            Self::InvalidCatalog { .. } => &["Fix the register table"],
        }
    }
}

// =============================================================================
// Timeout
// =============================================================================

/// Deadlines that expired mid-request.
#[derive(Debug, Error)]
pub enum TimeoutError {
    /// No reply to a request within the timeout.
    #[error("no reply within {duration:?}")]
    Read {
        /// Configured timeout.
        duration: Duration,
    },
}

impl TimeoutError {
    /// Request deadline of `duration` expired.
    pub fn read(duration: Duration) -> Self {
        Self::Read { duration }
    }

    /// Configured timeout that expired.
    pub fn duration(&self) -> Duration {
        match self {
            Self::Read { duration } => *duration,
        }
    }

    fn code(&self) -> u8 {
        match self {
            Self::Read { .. } => 2,
        }
    }
}

// =============================================================================
// Severity and codes
// =============================================================================

/// How loudly an error is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Transient; usually recovered by a retry.
    Warning,
    /// The request failed.
    Error,
    /// Nothing will work until the setup is fixed.
    Critical,
}

impl ErrorSeverity {
    /// Level used when logging.
    pub fn to_tracing_level(self) -> Level {
        match self {
            Self::Warning => Level::WARN,
            Self::Error | Self::Critical => Level::ERROR,
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category and number of an error, shown as `MB-CCNN`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    /// 1 connection, 2 protocol, 3 operation, 4 conversion, 5 configuration, 6 timeout.
    pub category: u8,
    /// Variant within the category.
    pub code: u8,
}

impl ErrorCode {
    /// Code `code` in `category`.
    pub const fn new(category: u8, code: u8) -> Self {
        Self { category, code }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MB-{:02X}{:02X}", self.category, self.code)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_retry_classes() {
        let retryable = |e: ConnectionError| ModbusError::from(e).is_retryable();

        assert!(retryable(ConnectionError::refused("ecu", 502)));
        assert!(retryable(ConnectionError::timed_out("ecu", 502, Duration::from_secs(2))));
        assert!(retryable(ConnectionError::NotConnected));
        assert!(!retryable(ConnectionError::serial_access_denied("/dev/ttyUSB0")));
        assert!(!retryable(ConnectionError::TransportReleased));
        assert!(retryable(ConnectionError::io(
            "read",
            io::Error::new(io::ErrorKind::ConnectionReset, "reset")
        )));
        assert!(!retryable(ConnectionError::io(
            "read",
            io::Error::new(io::ErrorKind::InvalidData, "garbage")
        )));
    }

    #[test]
    fn test_io_error_mapping() {
        let closed: ConnectionError = io::Error::new(io::ErrorKind::BrokenPipe, "pipe").into();
        assert!(matches!(closed, ConnectionError::Closed { reason: Some(_) }));

        let idle: ConnectionError = io::Error::new(io::ErrorKind::NotConnected, "gone").into();
        assert!(matches!(idle, ConnectionError::NotConnected));

        let other: ConnectionError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert!(matches!(other, ConnectionError::Io { .. }));
    }

    #[test]
    fn test_exception_response() {
        let busy = ModbusError::from(ProtocolError::exception_response(0x03, 0x06));
        assert!(busy.is_retryable());
        assert_eq!(busy.severity(), ErrorSeverity::Warning);
        assert_eq!(busy.error_code().to_string(), "MB-0206");
        assert!(busy.to_string().contains("server device busy"));

        let address = ModbusError::from(ProtocolError::exception_response(0x03, 0x02));
        assert!(!address.is_retryable());
        assert!(address.recovery_hints().iter().any(|h| h.contains("units")));

        let odd = ProtocolError::exception_response(0x03, 0x42);
        assert!(odd.to_string().contains("unknown exception"));
    }

    #[test]
    fn test_count_mismatch() {
        let error = ModbusError::from(ProtocolError::count_mismatch(0x9c42, 67, 12));
        let message = error.to_string();

        assert!(message.contains("0x9c42"));
        assert!(message.contains("67"));
        assert!(message.contains("12"));
        assert!(error.is_retryable());
        assert_eq!(error.error_code().to_string(), "MB-0216");
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::new(1, 5).to_string(), "MB-0105");
        assert_eq!(ModbusError::unknown_field("x").error_code().to_string(), "MB-0303");
        assert_eq!(
            ModbusError::from(ConnectionError::TransportReleased).error_code(),
            ErrorCode::new(1, 11)
        );
    }

    #[test]
    fn test_lookup_and_unsupported_predicates() {
        let lookup = ModbusError::unknown_field("power_dc");
        assert!(lookup.is_lookup());
        assert!(!lookup.is_unsupported());
        assert_eq!(lookup.to_string(), "Unknown field: 'power_dc'");

        let read_only = ModbusError::operation(OperationError::read_only("l1_current", "input"));
        assert!(read_only.is_unsupported());
        assert!(!read_only.is_lookup());
        assert_eq!(read_only.severity(), ErrorSeverity::Warning);

        let acc = ModbusError::operation(OperationError::not_supported("encode acc32"));
        assert!(acc.is_unsupported());
        assert!(!acc.is_retryable());
    }

    #[test]
    fn test_timeout() {
        let timeout = TimeoutError::read(Duration::from_secs(2));
        assert_eq!(timeout.duration(), Duration::from_secs(2));

        let error = ModbusError::timeout(timeout);
        assert!(error.is_retryable());
        assert_eq!(error.severity(), ErrorSeverity::Warning);
        assert_eq!(error.category(), "timeout");
        assert_eq!(error.tracing_level(), Level::WARN);
    }

    #[test]
    fn test_recovery_hints() {
        let refused = ModbusError::from(ConnectionError::refused("ecu", 502));
        assert!(refused.recovery_hints().iter().any(|h| h.contains("powered on")));

        let lookup = ModbusError::unknown_field("nope");
        assert!(lookup.recovery_hints().iter().any(|h| h.contains("fields")));

        let unit = ModbusError::from(ConfigurationError::invalid_unit_id(0));
        assert!(unit.to_string().contains("1-247"));
        assert!(unit.recovery_hints().iter().any(|h| h.contains("247")));
    }

    #[test]
    fn test_severity() {
        assert_eq!(ModbusError::not_connected().severity(), ErrorSeverity::Warning);
        assert_eq!(
            ModbusError::from(ConnectionError::serial_access_denied("/dev/ttyUSB0")).severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(
            ModbusError::from(ConfigurationError::missing_field("host")).severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(ErrorSeverity::Critical.to_tracing_level(), Level::ERROR);
        assert_eq!(ErrorSeverity::Warning.to_string(), "warning");
    }

    #[test]
    fn test_conversion() {
        let error = ModbusError::type_mismatch("int16", "text");
        assert!(error.to_string().contains("int16"));
        assert!(error.to_string().contains("text"));
        assert!(!error.is_retryable());
        assert_eq!(error.category(), "conversion");
    }

    #[test]
    fn test_category_names() {
        assert_eq!(ModbusError::not_connected().category(), "connection");
        assert_eq!(
            ModbusError::from(ProtocolError::unexpected("junk")).category(),
            "protocol"
        );
        assert_eq!(
            ModbusError::from(ConfigurationError::invalid_data_type("u8")).category(),
            "configuration"
        );
    }

    #[test]
    fn test_closed_message_includes_reason() {
        let error = ConnectionError::closed(Some("reset by peer".to_string()));
        assert_eq!(error.to_string(), "link closed: reset by peer");
        assert_eq!(ConnectionError::closed(None).to_string(), "link closed");
    }
}
