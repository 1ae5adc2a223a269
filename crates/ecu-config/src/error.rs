// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Errors raised while locating, parsing, overriding and validating settings.

use std::path::PathBuf;
use thiserror::Error;

/// Why a configuration could not be produced.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but its contents do not deserialize.
    #[error("{}: {message}", .path.display())]
    Parse {
        /// File that was read.
        path: PathBuf,
        /// Deserializer message.
        message: String,
    },

    /// The merged settings break a rule.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Section or setting at fault.
        field: String,
        /// Broken rule.
        message: String,
    },

    /// The file could not be read.
    #[error("cannot read {}", .path.display())]
    Io {
        /// File that was opened.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// An override variable holds a value of the wrong shape.
    #[error("{name}: {message}")]
    InvalidEnvVar {
        /// Variable name, prefix included.
        name: String,
        /// What was expected.
        message: String,
    },

    /// No file at the given path.
    #[error("no configuration file at {}", .path.display())]
    FileNotFound {
        /// Path that was given.
        path: PathBuf,
    },

    /// File extension other than yaml, yml, toml or json.
    #[error("cannot tell the format of {format} files")]
    UnsupportedFormat {
        /// Extension that was found.
        format: String,
    },

    /// Text that does not deserialize, before a path is known.
    #[error("malformed configuration: {message}")]
    Serialization {
        /// Deserializer message.
        message: String,
    },
}

impl ConfigError {
    /// Deserialization failure in the file at `path`.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Rule violation in `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Read failure for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Badly shaped override variable.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Missing file.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Unknown file extension.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Deserialization failure of in-memory text.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }
}

/// Short alias for fallible results in this crate.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_culprit() {
        let error = ConfigError::validation("connection", "unit id out of range");
        assert_eq!(error.to_string(), "invalid connection: unit id out of range");

        let error = ConfigError::invalid_env_var("ECU_PORT", "expected a port number");
        assert_eq!(error.to_string(), "ECU_PORT: expected a port number");

        let error = ConfigError::parse("/etc/ecu.yaml", "bad indentation");
        assert_eq!(error.to_string(), "/etc/ecu.yaml: bad indentation");
    }

    #[test]
    fn test_io_error_keeps_source() {
        let error = ConfigError::io(
            "ecu.yaml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );

        assert_eq!(error.to_string(), "cannot read ecu.yaml");
        assert_eq!(std::error::Error::source(&error).map(ToString::to_string), Some("denied".to_string()));
    }
}
