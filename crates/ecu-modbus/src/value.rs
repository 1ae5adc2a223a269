// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Decoded values and result mappings.
//!
//! ```text
//! ┌──────────┐  decode   ┌───────┐  insert   ┌──────────┐  meters   ┌──────────┐
//! │ [u16]    │ ────────► │ Value │ ────────► │ Readings │ ────────► │ Snapshot │
//! └──────────┘           └───────┘           └──────────┘           └──────────┘
//! ```
//!
//! [`Value::Absent`] is the single marker for "the device reports no value
//! here". It serializes as `null` and is never equal to a genuine zero.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::error::{ConversionError, ModbusError, ModbusResult};
use crate::types::TargetType;

// =============================================================================
// Value
// =============================================================================

/// A decoded register value.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Signed integer.
    Int(i64),
    /// Unsigned integer.
    UInt(u64),
    /// Floating-point number.
    Float(f64),
    /// Text.
    Text(String),
    /// Sentinel or unavailable value.
    #[default]
    Absent,
}

impl Value {
    /// Returns `true` if this is the absent marker.
    #[inline]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Returns `false` for absent, zero and empty text.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Int(v) => *v != 0,
            Self::UInt(v) => *v != 0,
            Self::Float(v) => *v != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::Absent => false,
        }
    }

    /// Returns the value as `i64` if it is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the value as `u64` if it is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Int(v) => u64::try_from(*v).ok(),
            Self::UInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `f64` for any numeric variant.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::UInt(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the variant name.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Absent => "absent",
        }
    }

    /// Converts this value to the given target type.
    ///
    /// Floats truncate toward zero when converted to integers; NaN and the
    /// infinities have no integer form and become absent. Numbers are
    /// formatted when converted to text. Absent stays absent.
    pub fn into_target(self, target: TargetType) -> Value {
        match (target, self) {
            (_, Self::Absent) => Self::Absent,
            (TargetType::Integer, Self::Float(f)) if !f.is_finite() => Self::Absent,
            (TargetType::Integer, Self::Float(f)) => Self::Int(f.trunc() as i64),
            (TargetType::Float, Self::Int(v)) => Self::Float(v as f64),
            (TargetType::Float, Self::UInt(v)) => Self::Float(v as f64),
            (TargetType::Text, Self::Text(s)) => Self::Text(s),
            (TargetType::Text, other) => Self::Text(other.to_string()),
            (_, other) => other,
        }
    }

    /// Parses user input into a value of the given target type.
    ///
    /// ```
    /// use ecu_modbus::types::TargetType;
    /// use ecu_modbus::value::Value;
    ///
    /// assert_eq!(Value::parse("-12", TargetType::Integer).unwrap(), Value::Int(-12));
    /// assert_eq!(Value::parse("50", TargetType::Integer).unwrap(), Value::UInt(50));
    /// assert!(Value::parse("abc", TargetType::Float).is_err());
    /// ```
    pub fn parse(input: &str, target: TargetType) -> ModbusResult<Value> {
        let trimmed = input.trim();
        let invalid = || ModbusError::from(ConversionError::invalid_input(input, target.name()));

        match target {
            TargetType::Integer => {
                if let Ok(v) = trimmed.parse::<u64>() {
                    Ok(Self::UInt(v))
                } else {
                    trimmed.parse::<i64>().map(Self::Int).map_err(|_| invalid())
                }
            }
            TargetType::Float => trimmed
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Self::Float)
                .ok_or_else(invalid),
            TargetType::Text => Ok(Self::Text(input.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Absent => f.write_str("n/a"),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Self::UInt(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Self::UInt(u64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Absent, Into::into)
    }
}

// =============================================================================
// Readings
// =============================================================================

/// Field name to value mapping that preserves insertion order.
///
/// Serializes as a map, so JSON output follows catalog order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Readings {
    entries: Vec<(String, Value)>,
}

impl Readings {
    /// Creates an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mapping with a single entry.
    pub fn single(name: impl Into<String>, value: Value) -> Self {
        let mut readings = Self::new();
        readings.insert(name, value);
        readings
    }

    /// Inserts a value, replacing an existing entry of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Returns the value for a field.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns `true` if the field is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Appends all entries of `other`.
    pub fn merge(&mut self, other: Readings) {
        for (name, value) in other.entries {
            self.insert(name, value);
        }
    }

    /// Returns an iterator over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns the field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Readings {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(String, Value)> for Readings {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut readings = Self::new();
        for (name, value) in iter {
            readings.insert(name, value);
        }
        readings
    }
}

impl Serialize for Readings {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// =============================================================================
// Snapshot
// =============================================================================

/// Full telemetry snapshot: inverter readings plus readings per meter.
///
/// Serializes as the inverter's fields followed by a `"meters"` object.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Inverter readings.
    pub readings: Readings,
    /// Meter readings keyed by label ("Meter1", ...).
    pub meters: BTreeMap<String, Readings>,
}

impl Snapshot {
    /// Creates a snapshot from inverter readings.
    pub fn new(readings: Readings) -> Self {
        Self {
            readings,
            meters: BTreeMap::new(),
        }
    }

    /// Adds the readings of a meter.
    pub fn add_meter(&mut self, label: impl Into<String>, readings: Readings) {
        self.meters.insert(label.into(), readings);
    }

    /// Returns an inverter value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.readings.get(name)
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.readings.len() + 1))?;
        for (name, value) in self.readings.iter() {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("meters", &self.meters)?;
        map.end()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::Absent.is_truthy());
        assert!(!Value::UInt(0).is_truthy());
        assert!(!Value::Text(String::new()).is_truthy());
        assert!(Value::UInt(1).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(Value::Text("ACME".into()).is_truthy());
    }

    #[test]
    fn test_absent_differs_from_zero() {
        assert_ne!(Value::Absent, Value::UInt(0));
        assert_ne!(Value::Absent, Value::Float(0.0));
        assert!(Value::Absent.is_absent());
        assert!(!Value::UInt(0).is_absent());
    }

    #[test]
    fn test_into_target() {
        assert_eq!(Value::Float(12.9).into_target(TargetType::Integer), Value::Int(12));
        assert_eq!(Value::Float(-12.9).into_target(TargetType::Integer), Value::Int(-12));
        assert_eq!(Value::UInt(3).into_target(TargetType::Float), Value::Float(3.0));
        assert_eq!(Value::Int(-5).into_target(TargetType::Text), Value::Text("-5".into()));
        assert_eq!(Value::Absent.into_target(TargetType::Text), Value::Absent);
    }

    #[test]
    fn test_non_finite_float_has_no_integer_form() {
        assert_eq!(Value::Float(f64::NAN).into_target(TargetType::Integer), Value::Absent);
        assert_eq!(Value::Float(f64::INFINITY).into_target(TargetType::Integer), Value::Absent);
        assert_eq!(Value::Float(f64::NEG_INFINITY).into_target(TargetType::Integer), Value::Absent);
        assert!(matches!(Value::Float(f64::NAN).into_target(TargetType::Float), Value::Float(f) if f.is_nan()));
    }

    #[test]
    fn test_parse() {
        assert_eq!(Value::parse(" 42 ", TargetType::Integer).unwrap(), Value::UInt(42));
        assert_eq!(Value::parse("-3", TargetType::Integer).unwrap(), Value::Int(-3));
        assert_eq!(Value::parse("1.5", TargetType::Float).unwrap(), Value::Float(1.5));
        assert_eq!(
            Value::parse("ECU-R", TargetType::Text).unwrap(),
            Value::Text("ECU-R".into())
        );

        let err = Value::parse("1.5", TargetType::Integer).unwrap_err();
        assert!(matches!(
            err,
            ModbusError::Conversion(ConversionError::InvalidInput { .. })
        ));
        assert!(Value::parse("NaN", TargetType::Float).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::UInt(7).to_string(), "7");
        assert_eq!(Value::Absent.to_string(), "n/a");
        assert_eq!(Value::Text("APsystems".into()).to_string(), "APsystems");
    }

    #[test]
    fn test_readings_insert_replaces_in_place() {
        let mut readings = Readings::new();
        readings.insert("a", Value::UInt(1));
        readings.insert("b", Value::UInt(2));
        readings.insert("a", Value::UInt(3));

        assert_eq!(readings.len(), 2);
        assert_eq!(readings.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(readings.get("a"), Some(&Value::UInt(3)));
    }

    #[test]
    fn test_readings_merge_preserves_order() {
        let mut first = Readings::single("c_did", Value::UInt(1));
        let mut second = Readings::new();
        second.insert("status", Value::UInt(4));
        second.insert("power_ac", Value::Int(230));
        first.merge(second);

        assert_eq!(
            first.names().collect::<Vec<_>>(),
            vec!["c_did", "status", "power_ac"]
        );
    }

    #[test]
    fn test_readings_serialize_in_order() {
        let mut readings = Readings::new();
        readings.insert("z", Value::UInt(1));
        readings.insert("a", Value::Absent);
        readings.insert("m", Value::Text("x".into()));

        let json = serde_json::to_string(&readings).unwrap();
        assert_eq!(json, r#"{"z":1,"a":null,"m":"x"}"#);
    }

    #[test]
    fn test_snapshot_serialize() {
        let mut snapshot = Snapshot::new(Readings::single("c_did", Value::UInt(1)));
        snapshot.add_meter("Meter1", Readings::single("c_did", Value::UInt(203)));

        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"c_did":1,"meters":{"Meter1":{"c_did":203}}}"#);
    }
}
