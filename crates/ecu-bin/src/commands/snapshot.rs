// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `snapshot` command.

use ecu_config::{EcuConfig, OutputFormat};
use ecu_modbus::registers::meter_catalog;
use ecu_modbus::{RegisterClass, Snapshot};
use tracing::info;

use crate::cli::SnapshotArgs;
use crate::commands::open_inverter;
use crate::error::BinResult;
use crate::report::render_snapshot;

/// Executes the `snapshot` command.
pub fn snapshot(config: &EcuConfig, args: SnapshotArgs) -> BinResult<()> {
    let inverter = open_inverter(config)?;

    let snapshot = if args.no_meters {
        Snapshot::new(inverter.read_all(RegisterClass::Holding))
    } else {
        inverter.snapshot()
    };
    info!(
        fields = snapshot.readings.len(),
        meters = snapshot.meters.len(),
        "Snapshot complete"
    );

    let format = args.format.map(Into::into).unwrap_or(config.output.format);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Text => print!("{}", render_snapshot(&snapshot, inverter.catalog(), &meter_catalog(0))),
    }

    inverter.disconnect()?;
    Ok(())
}
