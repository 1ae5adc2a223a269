// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions.
//!
//! # Schema Structure
//!
//! ```text
//! EcuConfig
//! ├── connection: ConnectionConfig   (type: tcp | rtu)
//! ├── logging: LoggingConfig
//! └── output: OutputConfig
//! ```
//!
//! # Example
//!
//! ```yaml
//! connection:
//!   type: tcp
//!   host: 192.168.1.50
//!   port: 502
//!   unit_id: 1
//!   timeout: 2s
//!   retries: 3
//! logging:
//!   level: info
//!   format: text
//! output:
//!   format: json
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use ecu_modbus::{ConnectionConfig, RtuConfig, TcpConfig};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EcuConfig {
    /// Modbus connection to the ECU.
    #[serde(default)]
    pub connection: ConnectionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Output configuration.
    #[serde(default)]
    pub output: OutputConfig,
}

impl EcuConfig {
    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.connection
            .validate()
            .map_err(|e| ConfigError::validation("connection", e.to_string()))?;

        Ok(())
    }
}

// =============================================================================
// Connection Overrides
// =============================================================================

/// Connection settings supplied outside the configuration file.
///
/// A host selects TCP and a device selects RTU; unit id, timeout and retries
/// carry over when the transport changes. The port only applies to TCP and
/// the baud rate only to RTU.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionOverrides {
    /// TCP host.
    pub host: Option<String>,
    /// TCP port.
    pub port: Option<u16>,
    /// Serial device path.
    pub device: Option<String>,
    /// Serial baud rate.
    pub baud_rate: Option<u32>,
    /// Modbus unit id.
    pub unit_id: Option<u8>,
    /// Response timeout.
    pub timeout: Option<Duration>,
    /// Attempts per read.
    pub retries: Option<u32>,
}

impl ConnectionOverrides {
    /// Returns `true` if no override is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the overrides to `connection`.
    pub fn apply(&self, connection: &mut ConnectionConfig) {
        let unit_id = connection.unit_id();
        let timeout = connection.timeout();
        let retries = connection.retries();

        if let Some(host) = &self.host {
            if let ConnectionConfig::Tcp(tcp) = connection {
                tcp.host = host.clone();
            } else {
                *connection = ConnectionConfig::Tcp(TcpConfig {
                    host: host.clone(),
                    unit_id,
                    timeout,
                    retries,
                    ..TcpConfig::default()
                });
            }
        }

        if let Some(device) = &self.device {
            if let ConnectionConfig::Rtu(rtu) = connection {
                rtu.device = device.clone();
            } else {
                *connection = ConnectionConfig::Rtu(RtuConfig {
                    device: device.clone(),
                    unit_id,
                    timeout,
                    retries,
                    ..RtuConfig::default()
                });
            }
        }

        match connection {
            ConnectionConfig::Tcp(tcp) => {
                if let Some(port) = self.port {
                    tcp.port = port;
                }
                if let Some(unit_id) = self.unit_id {
                    tcp.unit_id = unit_id;
                }
                if let Some(timeout) = self.timeout {
                    tcp.timeout = timeout;
                }
                if let Some(retries) = self.retries {
                    tcp.retries = retries;
                }
            }
            ConnectionConfig::Rtu(rtu) => {
                if let Some(baud_rate) = self.baud_rate {
                    rtu.baud_rate = baud_rate;
                }
                if let Some(unit_id) = self.unit_id {
                    rtu.unit_id = unit_id;
                }
                if let Some(timeout) = self.timeout {
                    rtu.timeout = timeout;
                }
                if let Some(retries) = self.retries {
                    rtu.retries = retries;
                }
            }
        }
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    Info,
    /// Warning level.
    #[default]
    #[serde(alias = "warning")]
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the filter directive for this level.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigError::validation("logging.level", format!("unknown level '{other}'"))),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// Compact lines.
    Compact,
    /// JSON lines.
    Json,
}

impl LogFormat {
    /// Returns the format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Text => "text",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigError::validation("logging.format", format!("unknown format '{other}'"))),
        }
    }
}

// =============================================================================
// Output Configuration
// =============================================================================

/// Output configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Snapshot rendering.
    #[serde(default)]
    pub format: OutputFormat,
}

/// Snapshot rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable report with scaled values.
    #[default]
    Text,
    /// Pretty-printed JSON with raw values.
    Json,
}

impl OutputFormat {
    /// Returns the format name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(ConfigError::validation("output.format", format!("unknown format '{other}'"))),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_needs_a_host() {
        let config = EcuConfig::default();
        assert!(config.connection.is_tcp());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Validation { ref field, .. }) if field == "connection"
        ));
    }

    #[test]
    fn test_overrides_on_tcp() {
        let mut connection = ConnectionConfig::Tcp(TcpConfig::new("old"));
        let overrides = ConnectionOverrides {
            host: Some("10.0.0.9".to_string()),
            port: Some(1502),
            baud_rate: Some(9600),
            unit_id: Some(3),
            ..Default::default()
        };
        overrides.apply(&mut connection);

        let ConnectionConfig::Tcp(tcp) = connection else {
            panic!("expected tcp");
        };
        assert_eq!(tcp.host, "10.0.0.9");
        assert_eq!(tcp.port, 1502);
        assert_eq!(tcp.unit_id, 3);
    }

    #[test]
    fn test_device_override_switches_to_rtu() {
        let mut connection = ConnectionConfig::Tcp(TcpConfig {
            host: "ecu".to_string(),
            unit_id: 5,
            retries: 7,
            ..TcpConfig::default()
        });
        let overrides = ConnectionOverrides {
            device: Some("/dev/ttyUSB0".to_string()),
            baud_rate: Some(9600),
            ..Default::default()
        };
        overrides.apply(&mut connection);

        let ConnectionConfig::Rtu(rtu) = connection else {
            panic!("expected rtu");
        };
        assert_eq!(rtu.device, "/dev/ttyUSB0");
        assert_eq!(rtu.baud_rate, 9600);
        assert_eq!(rtu.unit_id, 5);
        assert_eq!(rtu.retries, 7);
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("verbose".parse::<LogLevel>().is_err());
        assert!(ConnectionOverrides::default().is_empty());
    }
}
