// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! CLI command implementations.
//!
//! - `snapshot`: Read every field of the inverter and its meters
//! - `get`: Read single fields
//! - `set`: Write a holding register field
//! - `fields`: List the register catalog
//! - `validate`: Validate the configuration
//! - `version`: Show version information

mod fields;
mod get;
mod set;
mod snapshot;
mod validate;
mod version;

pub use fields::fields;
pub use get::get;
pub use set::set;
pub use snapshot::snapshot;
pub use validate::validate;
pub use version::version;

use ecu_config::{ConfigLoader, EcuConfig};
use ecu_modbus::Inverter;
use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::error::{BinError, BinResult};
use crate::logging::init_logging;

/// Executes the appropriate command based on CLI arguments.
pub fn execute(cli: Cli) -> BinResult<()> {
    match cli.effective_command() {
        Commands::Version => {
            init_cli_logging(&cli, None);
            version::version(&cli)
        }
        Commands::Fields(args) => {
            init_cli_logging(&cli, None);
            fields::fields(&cli, args)
        }
        Commands::Validate(args) => {
            init_cli_logging(&cli, None);
            validate::validate(&cli, args)
        }
        Commands::Snapshot(args) => {
            let config = resolve_config(&cli)?;
            init_cli_logging(&cli, Some(&config));
            snapshot::snapshot(&config, args)
        }
        Commands::Get(args) => {
            let config = resolve_config(&cli)?;
            init_cli_logging(&cli, Some(&config));
            get::get(&config, args)
        }
        Commands::Set(args) => {
            let config = resolve_config(&cli)?;
            init_cli_logging(&cli, Some(&config));
            set::set(&config, args)
        }
    }
}

/// Builds the effective configuration.
///
/// File (if any), then `ECU_*` environment variables, then command-line flags.
pub fn resolve_config(cli: &Cli) -> BinResult<EcuConfig> {
    resolve_config_with(cli, &ConfigLoader::new())
}

/// Builds the effective configuration with a custom loader.
pub fn resolve_config_with(cli: &Cli, loader: &ConfigLoader) -> BinResult<EcuConfig> {
    let mut config = match &cli.config {
        Some(path) => loader.parse(path)?,
        None => loader.defaults()?,
    };

    cli.overrides().apply(&mut config.connection);
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }

    config.validate().map_err(|e| {
        BinError::from(e).with_context("No usable connection (use -c, --host or --device)")
    })?;
    Ok(config)
}

/// Creates the inverter and opens its transport.
pub(crate) fn open_inverter(config: &EcuConfig) -> BinResult<Inverter> {
    let inverter = Inverter::from_config(&config.connection)?;
    inverter
        .connect()
        .map_err(|e| BinError::from(e).with_context(format!("Cannot reach {}", config.connection)))?;

    debug!(inverter = %inverter, "Connected");
    Ok(inverter)
}

fn init_cli_logging(cli: &Cli, config: Option<&EcuConfig>) {
    let defaults = EcuConfig::default();
    let logging = &config.unwrap_or(&defaults).logging;

    let level = cli.effective_log_level().unwrap_or(logging.level.as_str());
    let format = cli.log_format.map(Into::into).unwrap_or(logging.format);
    init_logging(level, format);
}

// =============================================================================
// Tests
// =============================================================================
