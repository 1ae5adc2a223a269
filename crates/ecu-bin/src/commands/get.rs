// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `get` command.

use ecu_config::{EcuConfig, OutputFormat};
use ecu_modbus::Readings;

use crate::cli::GetArgs;
use crate::commands::open_inverter;
use crate::error::BinResult;
use crate::report::render_readings;

/// Executes the `get` command to read fields by name.
///
/// Unknown names fail before any register is read.
pub fn get(config: &EcuConfig, args: GetArgs) -> BinResult<()> {
    let inverter = open_inverter(config)?;
    for name in &args.names {
        inverter.field(name)?;
    }

    let mut readings = Readings::new();
    for name in &args.names {
        readings.merge(inverter.read(name)?);
    }

    match args.format.map(Into::into).unwrap_or(config.output.format) {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&readings)?),
        OutputFormat::Text => print!("{}", render_readings("Inverter", inverter.catalog(), &readings)),
    }

    inverter.disconnect()?;
    Ok(())
}
