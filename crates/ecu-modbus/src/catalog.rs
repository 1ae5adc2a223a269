// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Field descriptors and validated register catalogs.
//!
//! A [`FieldDescriptor`] names one register field of a device model. A
//! [`Catalog`] is an ordered, validated set of descriptors:
//!
//! ```text
//! Catalog
//! ├── names are unique
//! ├── STRING fields target text and span at least one register
//! ├── scalar fields span exactly their data type's width
//! ├── fields end inside the 16-bit address space
//! └── per register class:
//!     ├── batch ids are dense, starting at 1
//!     ├── fields of one batch do not overlap
//!     └── a batch spans at most 125 registers
//! ```
//!
//! Catalogs are static configuration. A catalog that breaks one of these rules
//! is a build-time defect, so [`Catalog::new`] panics; [`Catalog::try_new`]
//! reports the violation instead.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::error::{ConfigurationError, ModbusResult};
use crate::types::{DataType, RegisterClass, TargetType, MAX_READ_REGISTERS};

// =============================================================================
// FieldDescriptor
// =============================================================================

/// Immutable description of one register field.
///
/// # Examples
///
/// ```
/// use ecu_modbus::catalog::FieldDescriptor;
/// use ecu_modbus::types::{DataType, RegisterClass};
///
/// const POWER: FieldDescriptor = FieldDescriptor::new("power_ac", 0x9c94, DataType::Int16, 2)
///     .label("Power")
///     .unit("W");
///
/// assert_eq!(POWER.word_length(), 1);
/// assert_eq!(POWER.register_class(), RegisterClass::Holding);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FieldDescriptor {
    name: &'static str,
    address: u16,
    word_length: u16,
    register_class: RegisterClass,
    data_type: DataType,
    target_type: TargetType,
    label: &'static str,
    unit: &'static str,
    batch_id: u16,
}

impl FieldDescriptor {
    /// Creates a holding-register field of a fixed-width data type.
    ///
    /// The word length and target type follow from `data_type`.
    pub const fn new(name: &'static str, address: u16, data_type: DataType, batch_id: u16) -> Self {
        let word_length = match data_type.fixed_width() {
            Some(width) => width,
            None => 0,
        };

        Self {
            name,
            address,
            word_length,
            register_class: RegisterClass::Holding,
            data_type,
            target_type: data_type.default_target(),
            label: "",
            unit: "",
            batch_id,
        }
    }

    /// Creates a holding-register STRING field of `word_length` registers.
    pub const fn string(name: &'static str, address: u16, word_length: u16, batch_id: u16) -> Self {
        Self::new(name, address, DataType::String, batch_id).length(word_length)
    }

    /// Moves the field to the input register bank.
    pub const fn input(mut self) -> Self {
        self.register_class = RegisterClass::Input;
        self
    }

    /// Sets the presentation label.
    pub const fn label(mut self, label: &'static str) -> Self {
        self.label = label;
        self
    }

    /// Sets the unit string.
    pub const fn unit(mut self, unit: &'static str) -> Self {
        self.unit = unit;
        self
    }

    /// Sets the decode target type.
    pub const fn target(mut self, target_type: TargetType) -> Self {
        self.target_type = target_type;
        self
    }

    /// Overrides the word length.
    pub const fn length(mut self, word_length: u16) -> Self {
        self.word_length = word_length;
        self
    }

    /// Returns a copy shifted by `offset` registers, or `None` on overflow.
    pub const fn checked_offset(self, offset: u16) -> Option<Self> {
        match self.address.checked_add(offset) {
            Some(address) => {
                let mut shifted = self;
                shifted.address = address;
                Some(shifted)
            }
            None => None,
        }
    }

    /// Field name.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Start address.
    #[inline]
    pub const fn address(&self) -> u16 {
        self.address
    }

    /// Number of registers.
    #[inline]
    pub const fn word_length(&self) -> u16 {
        self.word_length
    }

    /// One past the last register, widened so it cannot overflow.
    #[inline]
    pub const fn end(&self) -> u32 {
        self.address as u32 + self.word_length as u32
    }

    /// Register class.
    #[inline]
    pub const fn register_class(&self) -> RegisterClass {
        self.register_class
    }

    /// Data type.
    #[inline]
    pub const fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Target type.
    #[inline]
    pub const fn target_type(&self) -> TargetType {
        self.target_type
    }

    /// Label, falling back to the name.
    pub const fn display_label(&self) -> &'static str {
        if self.label.is_empty() { self.name } else { self.label }
    }

    /// Unit string (may be empty).
    #[inline]
    pub const fn unit_str(&self) -> &'static str {
        self.unit
    }

    /// Batch id.
    #[inline]
    pub const fn batch_id(&self) -> u16 {
        self.batch_id
    }

    /// Returns `true` if the field can be written.
    #[inline]
    pub const fn is_writable(&self) -> bool {
        self.register_class.is_writable() && self.data_type.is_encodable()
    }

    fn overlaps(&self, other: &Self) -> bool {
        u32::from(self.address) < other.end() && u32::from(other.address) < self.end()
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Ordered, validated set of field descriptors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    fields: Vec<FieldDescriptor>,
}

impl Catalog {
    /// Builds a catalog, panicking on an invalid one.
    ///
    /// # Panics
    ///
    /// Panics if the descriptors violate a catalog rule. Use
    /// [`Catalog::try_new`] for catalogs that do not come from static tables.
    pub fn new(fields: impl Into<Vec<FieldDescriptor>>) -> Self {
        match Self::try_new(fields) {
            Ok(catalog) => catalog,
            Err(err) => panic!("invalid register catalog: {err}"),
        }
    }

    /// Builds a catalog, reporting the first violated rule.
    pub fn try_new(fields: impl Into<Vec<FieldDescriptor>>) -> ModbusResult<Self> {
        let fields = fields.into();
        validate(&fields)?;
        Ok(Self { fields })
    }

    /// Creates an empty catalog.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the descriptor for `name`.
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns an iterator over descriptors in catalog order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    /// Returns the field names in catalog order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if the catalog has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns a copy of this catalog with every address shifted by `offset`.
    pub fn offset(&self, offset: u16) -> ModbusResult<Self> {
        let fields = self
            .fields
            .iter()
            .map(|f| {
                f.checked_offset(offset).ok_or_else(|| {
                    ConfigurationError::invalid_catalog(
                        f.name,
                        format!("address {:#06x} + offset {offset:#06x} overflows", f.address),
                    )
                    .into()
                })
            })
            .collect::<ModbusResult<Vec<_>>>()?;

        Self::try_new(fields)
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

// =============================================================================
// Validation
// =============================================================================

fn validate(fields: &[FieldDescriptor]) -> ModbusResult<()> {
    let invalid = |field: &FieldDescriptor, reason: String| -> ModbusResult<()> {
        Err(ConfigurationError::invalid_catalog(field.name, reason).into())
    };

    let mut names = HashSet::with_capacity(fields.len());
    for field in fields {
        if !names.insert(field.name) {
            return invalid(field, "duplicate field name".to_string());
        }

        match field.data_type.fixed_width() {
            None if field.target_type != TargetType::Text => {
                return invalid(field, "string fields must target text".to_string());
            }
            None if field.word_length == 0 => {
                return invalid(field, "string fields need at least one register".to_string());
            }
            Some(width) if width != field.word_length => {
                return invalid(
                    field,
                    format!(
                        "{} spans {width} registers, not {}",
                        field.data_type, field.word_length
                    ),
                );
            }
            _ => {}
        }

        if field.end() > 0x1_0000 {
            return invalid(field, "field ends past the 16-bit address space".to_string());
        }

        if field.batch_id == 0 {
            return invalid(field, "batch ids start at 1".to_string());
        }
    }

    for class in [RegisterClass::Holding, RegisterClass::Input] {
        let mut batches: BTreeMap<u16, Vec<&FieldDescriptor>> = BTreeMap::new();
        for field in fields.iter().filter(|f| f.register_class == class) {
            batches.entry(field.batch_id).or_default().push(field);
        }

        for (expected, (batch_id, members)) in (1u16..).zip(&batches) {
            if *batch_id != expected {
                return invalid(
                    members[0],
                    format!("{class} batch ids skip from {} to {batch_id}", expected - 1),
                );
            }

            for (i, a) in members.iter().enumerate() {
                if let Some(b) = members[i + 1..].iter().find(|b| a.overlaps(b)) {
                    return invalid(b, format!("overlaps '{}' in batch {batch_id}", a.name));
                }
            }

            let start = members.iter().map(|f| u32::from(f.address)).min().unwrap_or(0);
            let end = members.iter().map(|f| f.end()).max().unwrap_or(0);
            let max = u32::from(MAX_READ_REGISTERS);
            if end - start > max {
                return invalid(
                    members[0],
                    format!("batch {batch_id} spans {} registers (maximum: {max})", end - start),
                );
            }
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModbusError;

    fn reason(result: ModbusResult<Catalog>) -> String {
        match result {
            Err(ModbusError::Configuration(ConfigurationError::InvalidCatalog { reason, .. })) => {
                reason
            }
            other => panic!("expected catalog error, got {other:?}"),
        }
    }

    #[test]
    fn test_descriptor_builders() {
        let field = FieldDescriptor::string("c_model", 0x9c54, 16, 1).label("Model");
        assert_eq!(field.word_length(), 16);
        assert_eq!(field.target_type(), TargetType::Text);
        assert_eq!(field.display_label(), "Model");
        assert_eq!(field.end(), 0x9c64);

        let energy = FieldDescriptor::new("energy_total", 0x9c9e, DataType::Acc32, 2).unit("Wh");
        assert_eq!(energy.word_length(), 2);
        assert_eq!(energy.display_label(), "energy_total");
        assert!(!energy.is_writable());

        let input = FieldDescriptor::new("x", 0, DataType::UInt16, 1).input();
        assert_eq!(input.register_class(), RegisterClass::Input);
        assert!(!input.is_writable());
    }

    #[test]
    fn test_checked_offset() {
        let field = FieldDescriptor::new("did", 0x9cfc, DataType::UInt16, 1);
        assert_eq!(field.checked_offset(0x0ae).unwrap().address(), 0x9daa);
        assert!(field.checked_offset(0x7000).is_none());
    }

    #[test]
    fn test_valid_catalog() {
        let catalog = Catalog::new(vec![
            FieldDescriptor::new("a", 10, DataType::UInt16, 1),
            FieldDescriptor::new("b", 11, DataType::UInt32, 1),
            FieldDescriptor::new("c", 20, DataType::UInt16, 2),
            FieldDescriptor::new("d", 10, DataType::UInt16, 1).input(),
        ]);

        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.names().collect::<Vec<_>>(), vec!["a", "b", "c", "d"]);
        assert_eq!(catalog.get("b").map(|f| f.address()), Some(11));
        assert!(catalog.get("missing").is_none());
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let result = Catalog::try_new(vec![
            FieldDescriptor::new("a", 10, DataType::UInt16, 1),
            FieldDescriptor::new("a", 11, DataType::UInt16, 1),
        ]);
        assert_eq!(reason(result), "duplicate field name");
    }

    #[test]
    fn test_rejects_overlap_within_batch() {
        let result = Catalog::try_new(vec![
            FieldDescriptor::new("a", 10, DataType::UInt32, 1),
            FieldDescriptor::new("b", 11, DataType::UInt16, 1),
        ]);
        assert!(reason(result).contains("overlaps 'a'"));
    }

    #[test]
    fn test_allows_overlap_across_classes() {
        let result = Catalog::try_new(vec![
            FieldDescriptor::new("a", 10, DataType::UInt32, 1),
            FieldDescriptor::new("b", 11, DataType::UInt16, 1).input(),
        ]);
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_batch_gap() {
        let result = Catalog::try_new(vec![
            FieldDescriptor::new("a", 10, DataType::UInt16, 1),
            FieldDescriptor::new("b", 20, DataType::UInt16, 3),
        ]);
        assert!(reason(result).contains("skip from 1 to 3"));
    }

    #[test]
    fn test_rejects_width_mismatch() {
        let result = Catalog::try_new(vec![
            FieldDescriptor::new("a", 10, DataType::UInt32, 1).length(1),
        ]);
        assert!(reason(result).contains("spans 2 registers"));
    }

    #[test]
    fn test_rejects_string_with_numeric_target() {
        let result = Catalog::try_new(vec![
            FieldDescriptor::string("s", 10, 4, 1).target(TargetType::Integer),
        ]);
        assert_eq!(reason(result), "string fields must target text");
    }

    #[test]
    fn test_rejects_oversized_batch() {
        let result = Catalog::try_new(vec![
            FieldDescriptor::new("a", 0, DataType::UInt16, 1),
            FieldDescriptor::new("b", 125, DataType::UInt16, 1),
        ]);
        assert!(reason(result).contains("126 registers"));
    }

    #[test]
    fn test_rejects_address_overflow() {
        let result = Catalog::try_new(vec![FieldDescriptor::new(
            "a",
            0xffff,
            DataType::UInt32,
            1,
        )]);
        assert!(reason(result).contains("address space"));
    }

    #[test]
    #[should_panic(expected = "invalid register catalog")]
    fn test_new_panics_on_invalid_catalog() {
        let _ = Catalog::new(vec![FieldDescriptor::new("a", 0, DataType::UInt16, 2)]);
    }

    #[test]
    fn test_offset() {
        let catalog = Catalog::new(vec![
            FieldDescriptor::new("a", 0x9c42, DataType::UInt16, 1),
            FieldDescriptor::string("b", 0x9c44, 16, 1),
        ]);
        let shifted = catalog.offset(0x15c).unwrap();
        assert_eq!(shifted.get("a").map(|f| f.address()), Some(0x9d9e));
        assert_eq!(shifted.get("b").map(|f| f.address()), Some(0x9da0));

        assert!(catalog.offset(0x7000).is_err());
        assert!(Catalog::empty().offset(0x15c).unwrap().is_empty());
    }
}
