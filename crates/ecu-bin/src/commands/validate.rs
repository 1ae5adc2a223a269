// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use ecu_config::EcuConfig;
use ecu_modbus::ConnectionConfig;

use crate::cli::{Cli, ValidateArgs, ValidateFormat};
use crate::commands::resolve_config;
use crate::error::{BinError, BinResult};

/// Executes the `validate` command to validate configuration.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    if let Some(path) = &cli.config {
        if !path.exists() {
            return Err(BinError::Configuration(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
    }

    let config = resolve_config(cli).map_err(|e| e.with_context("Configuration validation failed"))?;
    let source = cli
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(environment and flags)".to_string());
    let warnings = collect_warnings(&config);

    match args.format {
        ValidateFormat::Text => {
            println!("✓ Configuration is valid: {}", source);
            println!();
            println!("Summary:");
            println!("  Connection: {}", config.connection);
            println!("  Unit ID: {}", config.connection.unit_id());
            println!("  Attempts per read: {}", config.connection.retries());
            println!("  Log level: {}", config.logging.level);
            println!("  Output: {}", config.output.format.as_str());

            if !warnings.is_empty() {
                println!();
                println!("Warnings:");
                for warning in &warnings {
                    println!("  ⚠ {}", warning);
                }
            }

            if args.show_config {
                println!();
                println!("Parsed configuration:");
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
        ValidateFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": source,
                "summary": {
                    "transport": transport_name(&config.connection),
                    "connection": config.connection.to_string(),
                    "unit_id": config.connection.unit_id(),
                    "retries": config.connection.retries(),
                    "log_level": config.logging.level.as_str(),
                    "output_format": config.output.format.as_str(),
                },
                "warnings": warnings,
                "config": if args.show_config { Some(&config) } else { None },
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        ValidateFormat::Yaml => {
            println!("valid: true");
            println!("config_path: {}", source);
            println!("transport: {}", transport_name(&config.connection));
            println!("connection: \"{}\"", config.connection);
            println!("unit_id: {}", config.connection.unit_id());
            println!("retries: {}", config.connection.retries());
            if !warnings.is_empty() {
                println!("warnings:");
                for warning in &warnings {
                    println!("  - \"{}\"", warning);
                }
            }
        }
    }

    Ok(())
}

fn transport_name(connection: &ConnectionConfig) -> &'static str {
    if connection.is_tcp() { "tcp" } else { "rtu" }
}

fn collect_warnings(config: &EcuConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.connection.retries() == 1 {
        warnings.push("A single attempt per read leaves no room for reconnects".to_string());
    }
    if config.connection.timeout().as_secs() >= 30 {
        warnings.push(format!(
            "Timeout of {}s makes an unreachable device block for a long time",
            config.connection.timeout().as_secs()
        ));
    }
    if let ConnectionConfig::Tcp(tcp) = &config.connection {
        if tcp.port != 502 {
            warnings.push(format!("Non-standard Modbus TCP port {}", tcp.port));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecu_modbus::TcpConfig;

    #[test]
    fn test_collect_warnings() {
        let mut config = EcuConfig::default();
        config.connection = TcpConfig::new("ecu").into();
        assert!(collect_warnings(&config).is_empty());

        config.connection = TcpConfig {
            host: "ecu".to_string(),
            port: 1502,
            retries: 1,
            ..TcpConfig::default()
        }
        .into();
        assert_eq!(collect_warnings(&config).len(), 2);
    }
}
