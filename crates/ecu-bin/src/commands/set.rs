// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `set` command.

use ecu_config::EcuConfig;
use ecu_modbus::Value;
use tracing::info;

use crate::cli::SetArgs;
use crate::commands::open_inverter;
use crate::error::BinResult;

/// Executes the `set` command to write one field.
pub fn set(config: &EcuConfig, args: SetArgs) -> BinResult<()> {
    let inverter = open_inverter(config)?;

    let field = *inverter.field(&args.name)?;
    let value = Value::parse(&args.value, field.target_type())?;
    inverter.write(&args.name, &value)?;

    info!(field = %args.name, value = %value, "Field written");
    println!("{} = {}", args.name, value);

    inverter.disconnect()?;
    Ok(())
}
