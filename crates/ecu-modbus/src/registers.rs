// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Register map of the APsystems ECU.
//!
//! All fields are holding registers. Batch 1 is the SunSpec common block,
//! batch 2 the inverter block. Registers the ECU leaves unpopulated (L2/L3
//! phases, DC side, vendor status) are not listed; the read cursor skips
//! over them.
//!
//! ```text
//! 0x9c42 ┌──────────────────────┐
//!        │ common block  (1)    │  DID, manufacturer, model, version, serial
//! 0x9c85 ├──────────────────────┤
//!        │ inverter block (2)   │  AC measurements, energy, temperature, status
//! 0x9cad └──────────────────────┘
//! 0x9cfc   meter 1 DID probe
//! 0x9daa   meter 2 DID probe
//! ```

use crate::catalog::{Catalog, FieldDescriptor};
use crate::types::DataType;

/// Inverter register fields.
pub const INVERTER_REGISTERS: &[FieldDescriptor] = &[
    // Common block
    FieldDescriptor::new("c_did", 0x9c42, DataType::UInt16, 1).label("SunSpec DID"),
    FieldDescriptor::new("c_length", 0x9c43, DataType::UInt16, 1)
        .label("SunSpec Length")
        .unit("16Bit Words"),
    FieldDescriptor::string("c_manufacturer", 0x9c44, 16, 1).label("Manufacturer"),
    FieldDescriptor::string("c_model", 0x9c54, 16, 1).label("Model"),
    FieldDescriptor::string("c_version", 0x9c6c, 8, 1).label("Version"),
    FieldDescriptor::string("c_serialnumber", 0x9c74, 16, 1).label("Serial"),
    FieldDescriptor::new("c_deviceaddress", 0x9c84, DataType::UInt16, 1).label("Modbus ID"),
    // Inverter block
    FieldDescriptor::new("c_sunspec_did", 0x9c85, DataType::UInt16, 2).label("SunSpec DID"),
    FieldDescriptor::new("c_sunspec_length", 0x9c86, DataType::UInt16, 2)
        .label("Length")
        .unit("16Bit Words"),
    FieldDescriptor::new("current", 0x9c88, DataType::UInt16, 2)
        .label("Current")
        .unit("A"),
    FieldDescriptor::new("l1_current", 0x9c89, DataType::UInt16, 2)
        .label("L1 Current")
        .unit("A"),
    FieldDescriptor::new("current_scale", 0x9c8c, DataType::Scale, 2)
        .label("Current Scale Factor"),
    FieldDescriptor::new("l1n_voltage", 0x9c90, DataType::UInt16, 2)
        .label("L1-N Voltage")
        .unit("V"),
    FieldDescriptor::new("voltage_scale", 0x9c93, DataType::Scale, 2)
        .label("Voltage Scale Factor"),
    FieldDescriptor::new("power_ac", 0x9c94, DataType::Int16, 2)
        .label("Power")
        .unit("W"),
    FieldDescriptor::new("power_ac_scale", 0x9c95, DataType::Scale, 2)
        .label("Power Scale Factor"),
    FieldDescriptor::new("frequency", 0x9c96, DataType::UInt16, 2)
        .label("Frequency")
        .unit("Hz"),
    FieldDescriptor::new("frequency_scale", 0x9c97, DataType::Scale, 2)
        .label("Frequency Scale Factor"),
    FieldDescriptor::new("power_apparent", 0x9c98, DataType::Int16, 2)
        .label("Power (Apparent)")
        .unit("VA"),
    FieldDescriptor::new("power_apparent_scale", 0x9c99, DataType::Scale, 2)
        .label("Power (Apparent) Scale Factor"),
    FieldDescriptor::new("power_reactive", 0x9c9a, DataType::Int16, 2)
        .label("Power (Reactive)")
        .unit("VAR"),
    FieldDescriptor::new("power_reactive_scale", 0x9c9b, DataType::Scale, 2)
        .label("Power (Reactive) Scale Factor"),
    FieldDescriptor::new("power_factor", 0x9c9c, DataType::Int16, 2)
        .label("Power Factor")
        .unit("cos φ"),
    FieldDescriptor::new("power_factor_scale", 0x9c9d, DataType::Scale, 2)
        .label("Power Factor Scale Factor"),
    FieldDescriptor::new("energy_total", 0x9c9e, DataType::Acc32, 2)
        .label("Total Energy")
        .unit("Wh"),
    FieldDescriptor::new("energy_total_scale", 0x9ca0, DataType::Scale, 2)
        .label("Total Energy Scale Factor"),
    FieldDescriptor::new("temperature", 0x9ca7, DataType::Int16, 2)
        .label("Temperature")
        .unit("°C"),
    FieldDescriptor::new("temperature_scale", 0x9cab, DataType::Scale, 2)
        .label("Temperature Scale Factor"),
    FieldDescriptor::new("status", 0x9cac, DataType::UInt16, 2).label("Status"),
];

/// Meter register template, relative to the meter's offset.
///
/// The ECU publishes no meter fields beyond the DID probes.
pub const METER_REGISTERS: &[FieldDescriptor] = &[];

/// DID registers probed on the inverter to detect meters, in meter order.
pub const METER_PROBES: &[FieldDescriptor] = &[
    FieldDescriptor::new("meter1_did", 0x9cfc, DataType::UInt16, 1).label("Meter 1 DID"),
    FieldDescriptor::new("meter2_did", 0x9daa, DataType::UInt16, 1).label("Meter 2 DID"),
];

/// Address offset of each meter's register block, in meter order.
pub const METER_REGISTER_OFFSETS: [u16; 3] = [0x000, 0x0ae, 0x15c];

/// Builds the inverter catalog.
pub fn inverter_catalog() -> Catalog {
    Catalog::new(INVERTER_REGISTERS)
}

/// Builds the catalog of the meter at `index`.
pub fn meter_catalog(index: usize) -> Catalog {
    let offset = METER_REGISTER_OFFSETS.get(index).copied().unwrap_or_default();
    match Catalog::new(METER_REGISTERS).offset(offset) {
        Ok(catalog) => catalog,
        Err(err) => panic!("invalid meter catalog: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::{BatchPlanner, RegisterSpan};
    use crate::types::RegisterClass;

    #[test]
    fn test_inverter_catalog_is_valid() {
        let catalog = inverter_catalog();
        assert_eq!(catalog.len(), INVERTER_REGISTERS.len());
        assert_eq!(catalog.get("c_model").map(|f| f.word_length()), Some(16));
        assert_eq!(catalog.get("energy_total").map(|f| f.word_length()), Some(2));
    }

    #[test]
    fn test_inverter_plan() {
        let catalog = inverter_catalog();
        let plan = BatchPlanner::plan(&catalog, RegisterClass::Holding);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].span, RegisterSpan { offset: 0x9c42, length: 0x43 });
        assert_eq!(plan[1].span, RegisterSpan { offset: 0x9c85, length: 0x28 });
        assert!(BatchPlanner::plan(&catalog, RegisterClass::Input).is_empty());
    }

    #[test]
    fn test_meter_probes_line_up_with_offsets() {
        assert!(METER_PROBES.len() <= METER_REGISTER_OFFSETS.len());
        assert_eq!(
            METER_PROBES[1].address() - METER_PROBES[0].address(),
            METER_REGISTER_OFFSETS[1]
        );
        assert!(meter_catalog(2).is_empty());
    }
}
