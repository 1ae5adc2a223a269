// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command-line surface of `ecu`.
//!
//! Connection flags are global so they can follow any subcommand; without a
//! subcommand `ecu` takes a snapshot.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use ecu_config::ConnectionOverrides;

/// ECU - Modbus telemetry client for APsystems inverters
///
/// Reads SunSpec registers from an APsystems ECU over Modbus TCP or RTU,
/// including any meters attached to it.
#[derive(Parser, Debug)]
#[command(
    name = "ecu",
    version = ecu_modbus::VERSION,
    about = "Modbus TCP/RTU telemetry client for APsystems ECU inverters",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    /// Configuration file path (YAML, TOML or JSON)
    #[arg(short, long, env = "ECU_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Modbus TCP host
    #[arg(long, global = true, conflicts_with = "device")]
    pub host: Option<String>,

    /// Modbus TCP port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Serial device for Modbus RTU
    #[arg(long, global = true)]
    pub device: Option<String>,

    /// Serial baud rate
    #[arg(long, global = true)]
    pub baud: Option<u32>,

    /// Modbus unit id
    #[arg(long, global = true)]
    pub unit: Option<u8>,

    /// Response timeout (e.g. "500ms", "2s")
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Attempts per register read
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// trace, debug, info, warn or error; `RUST_LOG` wins when set
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Log format
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Same as `--log-level warn`
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Same as `--log-level debug`
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Read every inverter field and every meter found behind it
    Snapshot(SnapshotArgs),

    /// Read one or more fields by name
    Get(GetArgs),

    /// Write a value to a holding register field
    Set(SetArgs),

    /// List the inverter register catalog
    Fields(FieldsArgs),

    /// Check the merged configuration without contacting the ECU
    Validate(ValidateArgs),

    /// Print crate versions and platform
    Version,
}

#[derive(Args, Debug, Default, Clone)]
pub struct SnapshotArgs {
    /// Output format (defaults to the configured output format)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Skip meter discovery
    #[arg(long)]
    pub no_meters: bool,
}

#[derive(Args, Debug, Clone)]
pub struct GetArgs {
    /// Field names
    #[arg(required = true)]
    pub names: Vec<String>,

    /// Output format (defaults to the configured output format)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,
}

#[derive(Args, Debug, Clone)]
pub struct SetArgs {
    /// Field name
    pub name: String,

    /// Value, parsed according to the field's target type
    #[arg(allow_hyphen_values = true)]
    pub value: String,
}

#[derive(Args, Debug, Default, Clone)]
pub struct FieldsArgs {
    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Include the merged configuration in the output
    #[arg(short, long)]
    pub show_config: bool,

    #[arg(short, long, default_value = "text")]
    pub format: ValidateFormat,
}

/// `--log-format` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per event
    Json,
    /// Single-line events without targets
    Compact,
}

impl From<LogFormat> for ecu_config::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Text => ecu_config::LogFormat::Text,
            LogFormat::Json => ecu_config::LogFormat::Json,
            LogFormat::Compact => ecu_config::LogFormat::Compact,
        }
    }
}

/// How readings are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report with scaled values
    #[default]
    Text,
    /// JSON with raw register values
    Json,
}

impl From<OutputFormat> for ecu_config::OutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ecu_config::OutputFormat::Text,
            OutputFormat::Json => ecu_config::OutputFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ValidateFormat {
    #[default]
    Text,
    Json,
    Yaml,
}

impl Cli {
    /// Parses `std::env::args`, exiting on `--help` or bad input.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand given, or a default snapshot.
    pub fn effective_command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Snapshot(SnapshotArgs::default()))
    }

    /// Connection settings given on the command line.
    pub fn overrides(&self) -> ConnectionOverrides {
        ConnectionOverrides {
            host: self.host.clone(),
            port: self.port,
            device: self.device.clone(),
            baud_rate: self.baud,
            unit_id: self.unit,
            timeout: self.timeout,
            retries: self.retries,
        }
    }

    /// `-q` and `-v` before `--log-level`; `None` defers to the config.
    pub fn effective_log_level(&self) -> Option<&str> {
        if self.quiet {
            Some("warn")
        } else if self.verbose {
            Some("debug")
        } else {
            self.log_level.as_deref()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command() {
        let cli = Cli::parse_from(["ecu"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.effective_command(), Commands::Snapshot(_)));
    }

    #[test]
    fn test_snapshot_format() {
        let cli = Cli::parse_from(["ecu", "snapshot", "--format", "json"]);
        if let Some(Commands::Snapshot(args)) = cli.command {
            assert_eq!(args.format, Some(OutputFormat::Json));
        } else {
            panic!("Expected Snapshot command");
        }
    }

    #[test]
    fn test_get_command() {
        let cli = Cli::parse_from(["ecu", "get", "power_ac", "status"]);
        if let Some(Commands::Get(args)) = cli.command {
            assert_eq!(args.names, vec!["power_ac", "status"]);
        } else {
            panic!("Expected Get command");
        }
    }

    #[test]
    fn test_set_accepts_negative_values() {
        let cli = Cli::parse_from(["ecu", "set", "power_ac_scale", "-1"]);
        if let Some(Commands::Set(args)) = cli.command {
            assert_eq!(args.name, "power_ac_scale");
            assert_eq!(args.value, "-1");
        } else {
            panic!("Expected Set command");
        }
    }

    #[test]
    fn test_connection_overrides() {
        let cli = Cli::parse_from([
            "ecu", "--host", "10.0.0.5", "--port", "1502", "--unit", "2", "--timeout", "750ms",
        ]);
        let overrides = cli.overrides();

        assert_eq!(overrides.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(overrides.port, Some(1502));
        assert_eq!(overrides.unit_id, Some(2));
        assert_eq!(overrides.timeout, Some(Duration::from_millis(750)));
        assert!(overrides.device.is_none());
    }

    #[test]
    fn test_host_conflicts_with_device() {
        let result = Cli::try_parse_from(["ecu", "--host", "ecu", "--device", "/dev/ttyUSB0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level_flags() {
        assert_eq!(Cli::parse_from(["ecu"]).effective_log_level(), None);
        assert_eq!(Cli::parse_from(["ecu", "-l", "trace"]).effective_log_level(), Some("trace"));
        assert_eq!(Cli::parse_from(["ecu", "-q"]).effective_log_level(), Some("warn"));
        assert_eq!(Cli::parse_from(["ecu", "-v"]).effective_log_level(), Some("debug"));
    }

    #[test]
    fn test_config_path() {
        let cli = Cli::parse_from(["ecu", "validate", "-c", "/etc/ecu/ecu.yaml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/ecu/ecu.yaml")));
    }
}
