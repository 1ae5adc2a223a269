// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Failures that end an `ecu` run, their exit codes and how they are
//! printed.
//!
//! | code | meaning                                        |
//! |------|------------------------------------------------|
//! | 1    | configuration missing or invalid               |
//! | 2    | unknown field, read-only or unsupported write  |
//! | 3    | device unreachable, protocol or output failure |

use ecu_config::ConfigError;
use ecu_modbus::ModbusError;
use thiserror::Error;

pub type BinResult<T> = Result<T, BinError>;

/// Why a command did not complete.
#[derive(Debug, Error)]
pub enum BinError {
    /// Settings that make no sense together, found by the binary itself.
    #[error("bad configuration: {0}")]
    Configuration(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Modbus(#[from] ModbusError),

    /// Rendering a report as JSON failed.
    #[error("cannot encode output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Runtime(String),

    /// `message` explains what was being attempted; `source` is why it failed.
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime(message.into())
    }

    /// Wraps `self` under a higher-level `message`.
    pub fn with_context(self, message: impl Into<String>) -> Self {
        Self::Context {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Context { source, .. } => source.exit_code(),
            Self::Configuration(_) | Self::Config(_) => 1,
            Self::Modbus(error) if error.is_lookup() || error.is_unsupported() => 2,
            Self::Modbus(_) | Self::Json(_) | Self::Runtime(_) => 3,
        }
    }

    /// The device error at the bottom of the context chain, if any.
    fn device_error(&self) -> Option<&ModbusError> {
        match self {
            Self::Modbus(error) => Some(error),
            Self::Context { source, .. } => source.device_error(),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Runtime(format!("{err:#}"))
    }
}

// =============================================================================
// Reporting
// =============================================================================

/// Writes `error`, every cause under it and any recovery hints to stderr.
pub fn report_error(error: &BinError) {
    eprintln!("error: {error}");

    let mut cause = std::error::Error::source(error);
    while let Some(inner) = cause {
        eprintln!("  because: {inner}");
        cause = inner.source();
    }

    if let Some(device) = error.device_error() {
        eprintln!("  [{}]", device.error_code());
        for hint in device.recovery_hints() {
            eprintln!("  hint: {hint}");
        }
    }
}

/// [`report_error`], then exits with [`BinError::exit_code`].
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecu_modbus::OperationError;

    #[test]
    fn test_context_keeps_exit_code_and_source() {
        let err = BinError::config("unit id 0").with_context("cannot build connection");
        assert_eq!(err.to_string(), "cannot build connection");
        assert_eq!(
            std::error::Error::source(&err).map(ToString::to_string),
            Some("bad configuration: unit id 0".to_string())
        );
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_exit_codes_by_kind() {
        assert_eq!(BinError::runtime("boom").exit_code(), 3);

        let lookup = BinError::from(ModbusError::unknown_field("nope"));
        assert_eq!(lookup.exit_code(), 2);

        let read_only = BinError::from(ModbusError::operation(OperationError::read_only("status", "input")));
        assert_eq!(read_only.exit_code(), 2);
        assert_eq!(read_only.with_context("set failed").exit_code(), 2);
    }

    #[test]
    fn test_device_error_found_through_context() {
        let err = BinError::from(ModbusError::unknown_field("nope")).with_context("get failed");
        assert!(err.device_error().is_some_and(ModbusError::is_lookup));
        assert!(BinError::runtime("x").device_error().is_none());
    }

    #[test]
    fn test_anyhow_conversion() {
        let err = BinError::from(anyhow::anyhow!("inner").context("outer"));
        assert_eq!(err.to_string(), "outer: inner");
    }
}
