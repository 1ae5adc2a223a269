// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! ECU - Modbus telemetry client for APsystems inverters
//!
//! Main binary entry point.

use ecu_bin::cli::Cli;
use ecu_bin::commands::execute;
use ecu_bin::error::report_error_and_exit;

fn main() {
    let cli = Cli::parse_args();

    if let Err(error) = execute(cli) {
        report_error_and_exit(error);
    }
}
