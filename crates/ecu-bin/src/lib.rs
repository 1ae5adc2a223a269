// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `ecu` command: reads and writes APsystems inverters over Modbus.
//!
//! `main.rs` parses [`cli::Cli`], hands it to [`commands::execute`] and turns
//! a [`BinError`] into an exit status. Commands resolve an
//! [`ecu_config::EcuConfig`] (file, then `ECU_*` variables, then flags),
//! open an [`ecu_modbus::Inverter`] and print through [`report`].
//!
//! ```bash
//! ecu --host 192.168.1.50                          # snapshot, text
//! ecu -c /etc/ecu/ecu.yaml snapshot --format json
//! ecu --device /dev/ttyUSB0 --baud 9600 get power_ac status
//! ecu -c ecu.yaml validate
//! ```

#![deny(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod report;

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
