// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Register and connection types.
//!
//! - **RegisterClass**: the two 16-bit Modbus register banks
//! - **DataType**: SunSpec register encodings
//! - **TargetType**: the semantic type a decoded value is delivered as
//! - **TcpConfig** / **RtuConfig**: connection settings
//! - **ConnectionConfig**: tagged union of the two, as found in config files
//!
//! # Examples
//!
//! ```
//! use ecu_modbus::types::{DataType, RegisterClass, TcpConfig};
//!
//! assert_eq!(DataType::Acc32.fixed_width(), Some(2));
//! assert!(RegisterClass::Holding.is_writable());
//!
//! let config = TcpConfig::new("192.168.1.50").with_unit_id(1);
//! config.validate().unwrap();
//! assert_eq!(config.socket_addr(), "192.168.1.50:502");
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, ModbusError};

/// Registers a single read request may cover (function codes 3 and 4).
pub const MAX_READ_REGISTERS: u16 = 125;

/// Registers a single write request may cover (function code 16).
pub const MAX_WRITE_REGISTERS: u16 = 123;

// =============================================================================
// RegisterClass
// =============================================================================

/// Modbus 16-bit register bank.
///
/// Holding registers are read with function 3 and written with function 16;
/// input registers are read with function 4 and never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterClass {
    /// Read/write bank. Every ECU field lives here.
    #[default]
    Holding,
    /// Read-only bank.
    Input,
}

impl RegisterClass {
    /// Whether fields of this class accept writes.
    #[inline]
    pub const fn is_writable(&self) -> bool {
        matches!(self, Self::Holding)
    }

    /// "HR" or "IR", for log fields.
    pub const fn short_name(&self) -> &'static str {
        match self {
            Self::Holding => "HR",
            Self::Input => "IR",
        }
    }

    /// "holding" or "input".
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Holding => "holding",
            Self::Input => "input",
        }
    }
}

impl fmt::Display for RegisterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RegisterClass {
    type Err = ModbusError;

    /// Accepts the names above, the short names, and the "4x"/"3x" prefixes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        match lower.trim_end_matches("_register") {
            "holding" | "hr" | "4x" => Ok(Self::Holding),
            "input" | "ir" | "3x" => Ok(Self::Input),
            _ => Err(ConfigurationError::invalid_register_class(s).into()),
        }
    }
}

// =============================================================================
// DataType
// =============================================================================

/// SunSpec register encodings.
///
/// Every multi-register type is big-endian in both byte and word order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// One register, unsigned.
    #[default]
    UInt16,
    /// Two registers, unsigned.
    UInt32,
    /// Four registers, unsigned.
    UInt64,
    /// One register, two's complement.
    Int16,
    /// Signed power-of-ten exponent paired with a measurement.
    ///
    /// Encoded exactly like [`DataType::Int16`].
    Scale,
    /// Two-register energy counter; zero means not accumulated.
    Acc32,
    /// Two registers, IEEE 754 single precision.
    Float32,
    /// Two registers, SunSpec float with an all-ones sentinel.
    Sefloat,
    /// Text, two bytes per register, length given by the field.
    String,
}

impl DataType {
    /// Every encoding, in declaration order.
    pub const ALL: [DataType; 9] = [
        Self::UInt16,
        Self::UInt32,
        Self::UInt64,
        Self::Int16,
        Self::Scale,
        Self::Acc32,
        Self::Float32,
        Self::Sefloat,
        Self::String,
    ];

    /// Register width, or `None` for strings whose width is the field's.
    #[inline]
    pub const fn fixed_width(&self) -> Option<u16> {
        match self {
            Self::UInt16 | Self::Int16 | Self::Scale => Some(1),
            Self::UInt32 | Self::Acc32 | Self::Float32 | Self::Sefloat => Some(2),
            Self::UInt64 => Some(4),
            Self::String => None,
        }
    }

    /// Accumulators are device-maintained and have no write form.
    #[inline]
    pub const fn is_encodable(&self) -> bool {
        !matches!(self, Self::Acc32)
    }

    /// Target used when a field does not name one.
    pub const fn default_target(&self) -> TargetType {
        match self {
            Self::Float32 | Self::Sefloat => TargetType::Float,
            Self::String => TargetType::Text,
            _ => TargetType::Integer,
        }
    }

    /// Lowercase name, as written in register tables.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UInt16 => "uint16",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Int16 => "int16",
            Self::Scale => "scale",
            Self::Acc32 => "acc32",
            Self::Float32 => "float32",
            Self::Sefloat => "sefloat",
            Self::String => "string",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = ModbusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        let canonical = match lower.as_str() {
            "u16" => "uint16",
            "u32" => "uint32",
            "u64" => "uint64",
            "i16" => "int16",
            "sunssf" => "scale",
            "f32" => "float32",
            "str" => "string",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|ty| ty.name() == canonical)
            .ok_or_else(|| ConfigurationError::invalid_data_type(s).into())
    }
}

// =============================================================================
// TargetType
// =============================================================================

/// Semantic type a field is delivered as after decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    /// Whole number.
    Integer,
    /// Floating-point number.
    Float,
    /// Text.
    Text,
}

impl TargetType {
    /// "integer", "float" or "text".
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// Connection settings
// =============================================================================

mod defaults {
    use std::time::Duration;

    pub(super) fn port() -> u16 {
        502
    }

    pub(super) fn unit_id() -> u8 {
        1
    }

    pub(super) fn timeout() -> Duration {
        Duration::from_secs(2)
    }

    pub(super) fn retries() -> u32 {
        3
    }

    pub(super) fn baud_rate() -> u32 {
        115_200
    }
}

const STANDARD_BAUD_RATES: [u32; 10] = [1200, 2400, 4800, 9600, 14400, 19200, 38400, 57600, 115_200, 230_400];

/// Rules shared by both transports.
fn check_request_settings(unit_id: u8, timeout: Duration, retries: u32) -> Result<(), ModbusError> {
    if !(1..=247).contains(&unit_id) {
        return Err(ConfigurationError::invalid_unit_id(unit_id).into());
    }
    if timeout.is_zero() {
        return Err(ConfigurationError::invalid_timeout(timeout, "must be positive").into());
    }
    if retries == 0 {
        return Err(ConfigurationError::InvalidRetries {
            retries,
            reason: "at least one attempt is required".to_string(),
        }
        .into());
    }
    Ok(())
}

/// Modbus TCP settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TcpConfig {
    /// ECU address or host name.
    pub host: String,

    /// Default 502.
    #[serde(default = "defaults::port")]
    pub port: u16,

    /// Default 1.
    #[serde(default = "defaults::unit_id")]
    pub unit_id: u8,

    /// Connect and response deadline, default 2s.
    #[serde(default = "defaults::timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Attempts per register read, default 3.
    #[serde(default = "defaults::retries")]
    pub retries: u32,
}

impl TcpConfig {
    /// Settings for `host` with every other value at its default.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    /// Replaces the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Replaces the unit id.
    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Replaces the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the attempt budget.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// `host:port`, ready for name resolution.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Checks host, port, unit id, timeout and attempt budget.
    pub fn validate(&self) -> Result<(), ModbusError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ConfigurationError::missing_field("host").into());
        }
        if host.contains(char::is_whitespace) {
            return Err(ConfigurationError::invalid_host(&self.host, "contains whitespace").into());
        }
        if self.port == 0 {
            return Err(ConfigurationError::invalid_port(0, "port 0 cannot be dialled").into());
        }
        check_request_settings(self.unit_id, self.timeout, self.retries)
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: defaults::port(),
            unit_id: defaults::unit_id(),
            timeout: defaults::timeout(),
            retries: defaults::retries(),
        }
    }
}

impl fmt::Display for TcpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, TCP: timeout={}",
            self.socket_addr(),
            humantime::format_duration(self.timeout)
        )
    }
}

/// Modbus RTU settings for the ECU's RS485 port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RtuConfig {
    /// Serial device, e.g. "/dev/ttyUSB0" or "COM3".
    pub device: String,

    /// Default 115200.
    #[serde(default = "defaults::baud_rate")]
    pub baud_rate: u32,

    /// Default 8.
    #[serde(default)]
    pub data_bits: DataBits,

    /// Default none.
    #[serde(default)]
    pub parity: Parity,

    /// Default 1.
    #[serde(default)]
    pub stop_bits: StopBits,

    /// Default 1.
    #[serde(default = "defaults::unit_id")]
    pub unit_id: u8,

    /// Response deadline, default 2s.
    #[serde(default = "defaults::timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Attempts per register read, default 3.
    #[serde(default = "defaults::retries")]
    pub retries: u32,
}

impl RtuConfig {
    /// Settings for `device` at 115200 8N1.
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Self::default()
        }
    }

    /// Replaces the baud rate.
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Replaces the framing.
    pub fn with_framing(mut self, data_bits: DataBits, parity: Parity, stop_bits: StopBits) -> Self {
        self.data_bits = data_bits;
        self.parity = parity;
        self.stop_bits = stop_bits;
        self
    }

    /// Replaces the unit id.
    pub fn with_unit_id(mut self, unit_id: u8) -> Self {
        self.unit_id = unit_id;
        self
    }

    /// Replaces the attempt budget.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Checks device, baud rate, unit id, timeout and attempt budget.
    pub fn validate(&self) -> Result<(), ModbusError> {
        if self.device.trim().is_empty() {
            return Err(ConfigurationError::missing_field("device").into());
        }
        if !STANDARD_BAUD_RATES.contains(&self.baud_rate) {
            return Err(ConfigurationError::InvalidBaudRate {
                baud_rate: self.baud_rate,
            }
            .into());
        }
        check_request_settings(self.unit_id, self.timeout, self.retries)
    }
}

impl Default for RtuConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            baud_rate: defaults::baud_rate(),
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            unit_id: defaults::unit_id(),
            timeout: defaults::timeout(),
            retries: defaults::retries(),
        }
    }
}

impl fmt::Display for RtuConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, RTU: stopbits={}, parity={}, baud={}, timeout={}",
            self.device,
            self.stop_bits,
            self.parity,
            self.baud_rate,
            humantime::format_duration(self.timeout)
        )
    }
}

/// Serial character size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DataBits {
    /// 7 bits.
    #[serde(alias = "7")]
    Seven,
    /// 8 bits.
    #[default]
    #[serde(alias = "8")]
    Eight,
}

/// Serial parity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    /// No parity bit.
    #[default]
    #[serde(alias = "N")]
    None,
    /// Odd parity.
    #[serde(alias = "O")]
    Odd,
    /// Even parity.
    #[serde(alias = "E")]
    Even,
}

/// Serial stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StopBits {
    /// One stop bit.
    #[default]
    #[serde(alias = "1")]
    One,
    /// Two stop bits.
    #[serde(alias = "2")]
    Two,
}

impl fmt::Display for DataBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Seven => "7",
            Self::Eight => "8",
        })
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "N",
            Self::Odd => "O",
            Self::Even => "E",
        })
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::One => "1",
            Self::Two => "2",
        })
    }
}

// =============================================================================
// ConnectionConfig
// =============================================================================

/// How to reach the ECU: `type: tcp` or `type: rtu` in config files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionConfig {
    /// Ethernet.
    Tcp(TcpConfig),
    /// RS485.
    Rtu(RtuConfig),
}

impl ConnectionConfig {
    /// Whether this is the TCP variant.
    pub const fn is_tcp(&self) -> bool {
        matches!(self, Self::Tcp(_))
    }

    /// Unit id of the inverter.
    pub fn unit_id(&self) -> u8 {
        match self {
            Self::Tcp(TcpConfig { unit_id, .. }) | Self::Rtu(RtuConfig { unit_id, .. }) => *unit_id,
        }
    }

    /// Request deadline.
    pub fn timeout(&self) -> Duration {
        match self {
            Self::Tcp(TcpConfig { timeout, .. }) | Self::Rtu(RtuConfig { timeout, .. }) => *timeout,
        }
    }

    /// Attempts per register read.
    pub fn retries(&self) -> u32 {
        match self {
            Self::Tcp(TcpConfig { retries, .. }) | Self::Rtu(RtuConfig { retries, .. }) => *retries,
        }
    }

    /// Validates the active variant.
    pub fn validate(&self) -> Result<(), ModbusError> {
        match self {
            Self::Tcp(tcp) => tcp.validate(),
            Self::Rtu(rtu) => rtu.validate(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::Tcp(TcpConfig::default())
    }
}

impl fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp(tcp) => tcp.fmt(f),
            Self::Rtu(rtu) => rtu.fmt(f),
        }
    }
}

impl From<TcpConfig> for ConnectionConfig {
    fn from(config: TcpConfig) -> Self {
        Self::Tcp(config)
    }
}

impl From<RtuConfig> for ConnectionConfig {
    fn from(config: RtuConfig) -> Self {
        Self::Rtu(config)
    }
}

// =============================================================================
// Tests
// =============================================================================
