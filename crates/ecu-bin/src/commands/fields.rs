// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `fields` command.

use ecu_modbus::registers::{inverter_catalog, METER_PROBES};
use ecu_modbus::FieldDescriptor;

use crate::cli::{Cli, FieldsArgs, OutputFormat};
use crate::error::BinResult;

/// Executes the `fields` command to list the register catalog.
pub fn fields(_cli: &Cli, args: FieldsArgs) -> BinResult<()> {
    let catalog = inverter_catalog();

    match args.format {
        OutputFormat::Text => {
            print!("{}", render_table(&catalog));
            println!();
            println!("Meter probes:");
            print!("{}", render_table(METER_PROBES));
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "fields": catalog.iter().collect::<Vec<_>>(),
                "meter_probes": METER_PROBES,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn render_table<'a>(fields: impl IntoIterator<Item = &'a FieldDescriptor>) -> String {
    let mut out = format!(
        "{:<22} {:>7} {:>4} {:<8} {:<8} {:>5}  {:<12} {}\n",
        "NAME", "ADDRESS", "LEN", "TYPE", "CLASS", "BATCH", "UNIT", "LABEL"
    );
    for field in fields {
        out.push_str(&format!(
            "{:<22} {:>#7x} {:>4} {:<8} {:<8} {:>5}  {:<12} {}\n",
            field.name(),
            field.address(),
            field.word_length(),
            field.data_type().name(),
            field.register_class().name(),
            field.batch_id(),
            field.unit_str(),
            field.display_label(),
        ));
    }
    out
}
