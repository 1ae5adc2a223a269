// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Batch read planning.
//!
//! The planner turns a catalog into one contiguous read per batch:
//!
//! ```text
//! Catalog (class = holding)
//!   batch 1: c_did@0x9c42 .. c_deviceaddress@0x9c84   ──►  ReadBatch { 0x9c42, len 67 }
//!   batch 2: c_sunspec_did@0x9c85 .. status@0x9cac    ──►  ReadBatch { 0x9c85, len 40 }
//!   batch 3: (none)                                   ──►  stop
//! ```
//!
//! Batch ids are visited in ascending order from 1 and planning stops at the
//! first id with no members. The planner performs no I/O.

use crate::catalog::{Catalog, FieldDescriptor};
use crate::types::RegisterClass;

// =============================================================================
// RegisterSpan
// =============================================================================

/// Contiguous register range `[offset, offset + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterSpan {
    /// First register address.
    pub offset: u16,
    /// Number of registers.
    pub length: u16,
}

impl RegisterSpan {
    /// Span of a single field.
    pub const fn of(field: &FieldDescriptor) -> Self {
        Self {
            offset: field.address(),
            length: field.word_length(),
        }
    }

    /// Minimal span covering every field, or `None` for an empty set.
    pub fn covering<'a, I>(fields: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a FieldDescriptor>,
    {
        let (start, end) = fields.into_iter().fold(None::<(u32, u32)>, |acc, f| {
            let (start, end) = acc.unwrap_or((u32::MAX, 0));
            Some((start.min(u32::from(f.address())), end.max(f.end())))
        })?;

        Some(Self {
            offset: u16::try_from(start).ok()?,
            length: u16::try_from(end - start).ok()?,
        })
    }

    /// One past the last register.
    pub const fn end(&self) -> u32 {
        self.offset as u32 + self.length as u32
    }
}

// =============================================================================
// ReadBatch
// =============================================================================

/// One planned read: a span and the fields decoded from it.
#[derive(Debug, Clone)]
pub struct ReadBatch<'a> {
    /// Batch id shared by the fields.
    pub batch_id: u16,
    /// Register class of every field.
    pub register_class: RegisterClass,
    /// Registers to read.
    pub span: RegisterSpan,
    /// Fields in ascending address order.
    pub fields: Vec<&'a FieldDescriptor>,
}

// =============================================================================
// BatchPlanner
// =============================================================================

/// Plans batched reads over a catalog.
pub struct BatchPlanner;

impl BatchPlanner {
    /// Plans the reads for one register class.
    ///
    /// Returns an empty plan if the catalog has no fields of `register_class`.
    pub fn plan(catalog: &Catalog, register_class: RegisterClass) -> Vec<ReadBatch<'_>> {
        let mut batches = Vec::new();

        for batch_id in 1u16.. {
            let mut fields: Vec<&FieldDescriptor> = catalog
                .iter()
                .filter(|f| f.register_class() == register_class && f.batch_id() == batch_id)
                .collect();

            let Some(span) = RegisterSpan::covering(fields.iter().copied()) else {
                break;
            };

            fields.sort_by_key(|f| f.address());
            batches.push(ReadBatch {
                batch_id,
                register_class,
                span,
                fields,
            });
        }

        batches
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DataType;

    #[test]
    fn test_span_covers_batch() {
        let fields = [
            FieldDescriptor::new("a", 10, DataType::UInt16, 1),
            FieldDescriptor::new("b", 11, DataType::UInt32, 1),
            FieldDescriptor::new("c", 20, DataType::UInt16, 1),
        ];

        let span = RegisterSpan::covering(&fields).unwrap();
        assert_eq!(span, RegisterSpan { offset: 10, length: 11 });
        assert_eq!(span.end(), 21);
    }

    #[test]
    fn test_span_single_field() {
        let field = FieldDescriptor::string("c_model", 0x9c54, 16, 1);
        let span = RegisterSpan::covering([&field]).unwrap();
        assert_eq!(span, RegisterSpan::of(&field));
        assert_eq!(span, RegisterSpan { offset: 0x9c54, length: 16 });
    }

    #[test]
    fn test_span_empty() {
        assert!(RegisterSpan::covering(std::iter::empty::<&FieldDescriptor>()).is_none());
    }

    #[test]
    fn test_plan_ascending_batches() {
        let catalog = Catalog::new(vec![
            FieldDescriptor::new("late", 50, DataType::UInt16, 2),
            FieldDescriptor::new("b", 12, DataType::UInt16, 1),
            FieldDescriptor::new("a", 10, DataType::UInt32, 1),
        ]);

        let plan = BatchPlanner::plan(&catalog, RegisterClass::Holding);
        assert_eq!(plan.len(), 2);

        assert_eq!(plan[0].batch_id, 1);
        assert_eq!(plan[0].span, RegisterSpan { offset: 10, length: 3 });
        let names: Vec<_> = plan[0].fields.iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["a", "b"]);

        assert_eq!(plan[1].batch_id, 2);
        assert_eq!(plan[1].span, RegisterSpan { offset: 50, length: 1 });
    }

    #[test]
    fn test_plan_filters_register_class() {
        let catalog = Catalog::new(vec![
            FieldDescriptor::new("hr", 10, DataType::UInt16, 1),
            FieldDescriptor::new("ir", 30, DataType::UInt16, 1).input(),
        ]);

        let plan = BatchPlanner::plan(&catalog, RegisterClass::Input);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].register_class, RegisterClass::Input);
        assert_eq!(plan[0].fields[0].name(), "ir");
    }

    #[test]
    fn test_plan_empty_catalog() {
        assert!(BatchPlanner::plan(&Catalog::empty(), RegisterClass::Holding).is_empty());

        let inputs_only = Catalog::new(vec![
            FieldDescriptor::new("ir", 30, DataType::UInt16, 1).input(),
        ]);
        assert!(BatchPlanner::plan(&inputs_only, RegisterClass::Holding).is_empty());
    }
}
