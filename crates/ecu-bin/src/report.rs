// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Human-readable rendering of readings.
//!
//! ```text
//! Inverter
//!   Identification
//!     Manufacturer                   APsystems
//!     SunSpec DID                    Single Phase Inverter (101)
//!   Status
//!     Status                         Producing
//!   Measurements
//!     Power                          235.0 W
//!     Temperature                    n/a
//! ```
//!
//! Measurements are shown as `raw * 10^scale`, where the scale factor is the
//! `<name>_scale` field or, failing that, the scale of the name's last
//! `_`-separated word (`l1_current` uses `current_scale`).

use std::fmt::Write;

use ecu_modbus::{Catalog, DataType, FieldDescriptor, InverterStatus, Readings, Snapshot, SunspecDid, Value};

const LABEL_WIDTH: usize = 30;

/// Renders an inverter snapshot and its meters.
pub fn render_snapshot(snapshot: &Snapshot, inverter: &Catalog, meter: &Catalog) -> String {
    let mut out = render_readings("Inverter", inverter, &snapshot.readings);
    for (label, readings) in &snapshot.meters {
        out.push('\n');
        out.push_str(&render_readings(label, meter, readings));
    }
    out
}

/// Renders one device's readings grouped into sections.
///
/// Readings without a catalog entry are listed under their raw name.
pub fn render_readings(title: &str, catalog: &Catalog, readings: &Readings) -> String {
    let mut identification = Vec::new();
    let mut status = Vec::new();
    let mut measurements = Vec::new();

    for (name, value) in readings.iter() {
        match catalog.get(name) {
            Some(field) if field.data_type() == DataType::Scale => {}
            Some(field) => {
                let line = (field.display_label(), render_field(field, value, catalog, readings));
                match section_of(field) {
                    Section::Identification => identification.push(line),
                    Section::Status => status.push(line),
                    Section::Measurement => measurements.push(line),
                }
            }
            None => measurements.push((name, value.to_string())),
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{title}");
    for (heading, lines) in [
        ("Identification", identification),
        ("Status", status),
        ("Measurements", measurements),
    ] {
        if lines.is_empty() {
            continue;
        }
        let _ = writeln!(out, "  {heading}");
        for (label, text) in lines {
            let _ = writeln!(out, "    {label:<LABEL_WIDTH$} {text}");
        }
    }
    out
}

/// Applies a scale factor, formatting with as many decimals as it removes.
///
/// Returns `None` unless both values are numeric.
pub fn scaled(value: &Value, scale: &Value) -> Option<String> {
    let raw = value.as_f64()?;
    let exponent = i32::try_from(scale.as_i64()?).ok()?;
    let decimals = usize::try_from(-exponent).unwrap_or(0);
    Some(format!("{:.*}", decimals, raw * 10f64.powi(exponent)))
}

// =============================================================================
// Internals
// =============================================================================

enum Section {
    Identification,
    Status,
    Measurement,
}

fn section_of(field: &FieldDescriptor) -> Section {
    let name = field.name();
    if name == "status" {
        Section::Status
    } else if field.data_type() == DataType::String || name.starts_with("c_") || name.ends_with("_did") {
        Section::Identification
    } else {
        Section::Measurement
    }
}

fn render_field(field: &FieldDescriptor, value: &Value, catalog: &Catalog, readings: &Readings) -> String {
    if value.is_absent() {
        return value.to_string();
    }

    let name = field.name();
    if name.ends_with("did") {
        if let Some(did) = value.as_u64().and_then(SunspecDid::from_code) {
            return format!("{did} ({})", did.code());
        }
    }
    if name == "status" {
        if let Some(status) = value.as_u64().and_then(InverterStatus::from_code) {
            return status.to_string();
        }
    }

    let text = scale_of(name, catalog, readings)
        .and_then(|scale| scaled(value, scale))
        .unwrap_or_else(|| value.to_string());
    match field.unit_str() {
        "" => text,
        unit => format!("{text} {unit}"),
    }
}

fn scale_of<'a>(name: &str, catalog: &Catalog, readings: &'a Readings) -> Option<&'a Value> {
    let own = format!("{name}_scale");
    let shared = name.rsplit('_').next().map(|word| format!("{word}_scale"));

    [Some(own), shared]
        .into_iter()
        .flatten()
        .find(|candidate| catalog.get(candidate).is_some_and(|f| f.data_type() == DataType::Scale))
        .and_then(|candidate| readings.get(&candidate))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ecu_modbus::registers::inverter_catalog;

    fn readings(entries: &[(&str, Value)]) -> Readings {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn test_scaled() {
        assert_eq!(scaled(&Value::Int(2350), &Value::Int(-1)).as_deref(), Some("235.0"));
        assert_eq!(scaled(&Value::UInt(5), &Value::Int(2)).as_deref(), Some("500"));
        assert_eq!(scaled(&Value::UInt(5), &Value::Absent), None);
        assert_eq!(scaled(&Value::Absent, &Value::Int(0)), None);
    }

    #[test]
    fn test_render_inverter() {
        let catalog = inverter_catalog();
        let readings = readings(&[
            ("c_did", Value::UInt(1)),
            ("c_manufacturer", Value::Text("APsystems".into())),
            ("l1_current", Value::UInt(123)),
            ("current_scale", Value::Int(-2)),
            ("power_ac", Value::Int(2350)),
            ("power_ac_scale", Value::Int(-1)),
            ("c_sunspec_did", Value::UInt(101)),
            ("temperature", Value::Absent),
            ("status", Value::UInt(4)),
        ]);

        let text = render_readings("Inverter", &catalog, &readings);

        assert!(text.starts_with("Inverter\n  Identification\n"));
        assert!(text.contains("APsystems"));
        assert!(text.contains("Single Phase Inverter (101)"));
        assert!(text.contains("1.23 A"));
        assert!(text.contains("235.0 W"));
        assert!(text.contains("Producing"));
        assert!(!text.contains("Scale Factor"));

        let temperature = text.lines().find(|l| l.contains("Temperature")).unwrap();
        assert!(temperature.ends_with("n/a"));
    }

    #[test]
    fn test_render_snapshot_with_meter() {
        let catalog = inverter_catalog();
        let mut snapshot = Snapshot::new(readings(&[("power_ac", Value::Int(10))]));
        snapshot.add_meter("Meter1", readings(&[("m_ac_power", Value::Int(-5))]));

        let text = render_snapshot(&snapshot, &catalog, &Catalog::empty());

        assert!(text.contains("\nMeter1\n  Measurements\n"));
        assert!(text.contains("m_ac_power"));
        assert!(text.contains("-5"));
    }
}
