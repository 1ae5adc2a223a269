// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Settings for the `ecu` client: which link to open, how to log and how
//! to print results.
//!
//! A file in YAML, TOML or JSON is read by [`ConfigLoader`], which fills
//! `${VAR}` / `${VAR:default}` placeholders, applies `ECU_*` overrides and
//! validates the result:
//!
//! ```yaml
//! connection:
//!   type: tcp
//!   host: "${ECU_ADDRESS:192.168.1.50}"
//!   unit_id: 1
//! logging:
//!   level: info
//! output:
//!   format: json
//! ```
//!
//! ```no_run
//! let config = ecu_config::load_config("ecu.yaml")?;
//! println!("{}", config.connection);
//! # Ok::<(), ecu_config::ConfigError>(())
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader, EnvLookup};
pub use schema::{
    ConnectionOverrides, EcuConfig, LogFormat, LogLevel, LoggingConfig, OutputConfig, OutputFormat,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
