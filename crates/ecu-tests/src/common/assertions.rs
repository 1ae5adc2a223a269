// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Custom Test Assertions
//!
//! Domain-specific assertion helpers with informative failure messages.

use ecu_modbus::{ModbusError, ModbusResult, Readings, Value};

// =============================================================================
// Readings Assertions
// =============================================================================

/// Assertion extensions for Readings.
pub trait ReadingsAssertions {
    /// Assert that `name` is present with `expected`.
    fn assert_value(&self, name: &str, expected: &Value);

    /// Assert that `name` is present and numerically close to `expected`.
    fn assert_value_approx(&self, name: &str, expected: f64, tolerance: f64);

    /// Assert that `name` is present and absent-valued.
    fn assert_absent(&self, name: &str);

    /// Assert that `name` is not in the readings at all.
    fn assert_omitted(&self, name: &str);

    /// Assert that `names` appear in this relative order.
    fn assert_order(&self, names: &[&str]);
}

impl ReadingsAssertions for Readings {
    fn assert_value(&self, name: &str, expected: &Value) {
        match self.get(name) {
            Some(actual) => assert_eq!(actual, expected, "Unexpected value for '{}'", name),
            None => panic!("Expected '{}' in readings, got {:?}", name, self.names().collect::<Vec<_>>()),
        }
    }

    fn assert_value_approx(&self, name: &str, expected: f64, tolerance: f64) {
        let actual = self
            .get(name)
            .and_then(Value::as_f64)
            .unwrap_or_else(|| panic!("Expected numeric '{}' in readings", name));
        assert!(
            (actual - expected).abs() <= tolerance,
            "Value for '{}' is {}, expected {} ± {}",
            name,
            actual,
            expected,
            tolerance
        );
    }

    fn assert_absent(&self, name: &str) {
        self.assert_value(name, &Value::Absent);
    }

    fn assert_omitted(&self, name: &str) {
        assert!(
            !self.contains(name),
            "Expected '{}' to be omitted, but found {:?}",
            name,
            self.get(name)
        );
    }

    fn assert_order(&self, names: &[&str]) {
        let order: Vec<&str> = self.names().collect();
        let positions: Vec<usize> = names
            .iter()
            .map(|name| {
                order
                    .iter()
                    .position(|n| n == name)
                    .unwrap_or_else(|| panic!("Expected '{}' in readings", name))
            })
            .collect();
        assert!(
            positions.windows(2).all(|w| w[0] < w[1]),
            "Expected order {:?}, readings are ordered {:?}",
            names,
            order
        );
    }
}

// =============================================================================
// Error Assertions
// =============================================================================

/// Assert that `result` failed with a lookup error.
pub fn assert_lookup_error<T: std::fmt::Debug>(result: ModbusResult<T>) {
    match result {
        Err(ref e) if e.is_lookup() => {}
        other => panic!("Expected lookup error, got {:?}", other),
    }
}

/// Assert that `result` failed with an unsupported-operation error.
pub fn assert_unsupported<T: std::fmt::Debug>(result: ModbusResult<T>) {
    match result {
        Err(ref e) if e.is_unsupported() => {}
        other => panic!("Expected unsupported-operation error, got {:?}", other),
    }
}

/// Assert that `error` belongs to `category` (1=connection, 2=protocol,
/// 3=operation, 4=conversion, 5=config, 6=timeout).
pub fn assert_error_category(error: &ModbusError, category: u8) {
    let code = error.error_code();
    assert_eq!(
        code.category, category,
        "Expected category {}, got {} ({})",
        category, code, error
    );
}
