// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Integration suites for the ECU client and the helpers they share.
//!
//! `tests/integration_device.rs` drives [`Inverter`](ecu_modbus::Inverter)
//! and [`Meter`](ecu_modbus::Meter) over a [`ScriptedTransport`]
//! (batching, sentinels, retries, writes, meter discovery, snapshots).
//! `tests/integration_config.rs` covers file formats, placeholders,
//! `ECU_*` overrides and validation.
//!
//! ```rust,ignore
//! use ecu_tests::prelude::*;
//!
//! let (transport, inverter) = EcuFixtures::inverter(EcuFixtures::transport(), 3);
//! inverter.read("power_ac").unwrap().assert_value("power_ac", &Value::Int(283));
//! assert_eq!(transport.borrow().reads.len(), 1);
//! ```
//!
//! [`ScriptedTransport`]: common::ScriptedTransport

#![deny(unsafe_code)]

pub mod common;

/// Prelude for writing integration tests.
pub mod prelude {
    pub use crate::common::{
        assert_error_category, assert_lookup_error, assert_unsupported, init_test_logging, temp_test_dir,
        ConfigFixtures, EcuFixtures, ReadCall, ReadingsAssertions, ScriptedTransport, WriteCall,
        INT16_NOT_IMPLEMENTED, UINT16_NOT_IMPLEMENTED, UNIT_ID,
    };
    pub use ecu_modbus::{Inverter, Meter, ModbusError, Readings, RegisterClass, Value};
}
