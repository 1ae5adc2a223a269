// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Register codec.
//!
//! Converts raw 16-bit register words to [`Value`]s and back. Byte order and
//! word order are both big-endian:
//!
//! ```text
//! UINT32 0x12345678  ->  [0x1234, 0x5678]
//! STRING "ACME"      ->  [0x4143, 0x4D45, 0x0000, ...]
//! ```
//!
//! Every data type reserves one raw pattern meaning "not implemented". The
//! pattern is compared on raw bits, before sign or float interpretation, and
//! decodes to [`Value::Absent`]:
//!
//! | Type            | Sentinel           |
//! |-----------------|--------------------|
//! | UINT16          | `0xFFFF`           |
//! | UINT32          | `0xFFFFFFFF`       |
//! | UINT64          | `0xFFFFFFFFFFFFFFFF` |
//! | INT16 / SCALE   | `0x8000`           |
//! | ACC32           | `0x00000000`       |
//! | FLOAT32         | `0x7FC00000`       |
//! | SEFLOAT         | `0xFFFFFFFF`       |
//! | STRING          | empty after trim   |
//!
//! Encoding never produces sentinels on purpose; it writes what it is given.

use crate::catalog::FieldDescriptor;
use crate::error::{ConfigurationError, ConversionError, ModbusError, ModbusResult, OperationError};
use crate::types::{DataType, TargetType};
use crate::value::Value;

// =============================================================================
// Sentinels
// =============================================================================

const UINT16_NOT_IMPLEMENTED: u16 = 0xFFFF;
const INT16_NOT_IMPLEMENTED: u16 = 0x8000;
const UINT32_NOT_IMPLEMENTED: u32 = 0xFFFF_FFFF;
const ACC32_NOT_IMPLEMENTED: u32 = 0x0000_0000;
const FLOAT32_NOT_IMPLEMENTED: u32 = 0x7FC0_0000;
const SEFLOAT_NOT_IMPLEMENTED: u32 = 0xFFFF_FFFF;
const UINT64_NOT_IMPLEMENTED: u64 = 0xFFFF_FFFF_FFFF_FFFF;

/// Returns the raw "not implemented" pattern of a numeric type.
///
/// Strings have no raw pattern; they are absent when empty after trimming.
pub const fn sentinel(data_type: DataType) -> Option<u64> {
    match data_type {
        DataType::UInt16 => Some(UINT16_NOT_IMPLEMENTED as u64),
        DataType::Int16 | DataType::Scale => Some(INT16_NOT_IMPLEMENTED as u64),
        DataType::UInt32 => Some(UINT32_NOT_IMPLEMENTED as u64),
        DataType::Acc32 => Some(ACC32_NOT_IMPLEMENTED as u64),
        DataType::Float32 => Some(FLOAT32_NOT_IMPLEMENTED as u64),
        DataType::Sefloat => Some(SEFLOAT_NOT_IMPLEMENTED as u64),
        DataType::UInt64 => Some(UINT64_NOT_IMPLEMENTED),
        DataType::String => None,
    }
}

// =============================================================================
// Decode
// =============================================================================

/// Returns the number of registers a field consumes when decoded.
///
/// Scalars consume their type's fixed width; strings consume `word_length`.
#[inline]
pub const fn consumed_width(data_type: DataType, word_length: u16) -> u16 {
    match data_type.fixed_width() {
        Some(width) => width,
        None => word_length,
    }
}

/// Decodes one value from the start of `words`.
///
/// # Errors
///
/// Returns [`ConversionError::InsufficientData`] if `words` is shorter than
/// the field.
///
/// # Examples
///
/// ```
/// use ecu_modbus::codec::decode_value;
/// use ecu_modbus::types::{DataType, TargetType};
/// use ecu_modbus::value::Value;
///
/// let value = decode_value(&[0xFF9C], DataType::Int16, 1, TargetType::Integer).unwrap();
/// assert_eq!(value, Value::Int(-100));
///
/// let absent = decode_value(&[0x8000], DataType::Scale, 1, TargetType::Integer).unwrap();
/// assert!(absent.is_absent());
/// ```
pub fn decode_value(
    words: &[u16],
    data_type: DataType,
    word_length: u16,
    target: TargetType,
) -> ModbusResult<Value> {
    let width = usize::from(consumed_width(data_type, word_length));
    if words.len() < width {
        return Err(ConversionError::insufficient_data(width, words.len()).into());
    }
    let words = &words[..width];

    let value = match data_type {
        DataType::UInt16 => match words[0] {
            UINT16_NOT_IMPLEMENTED => Value::Absent,
            raw => Value::UInt(u64::from(raw)),
        },
        DataType::Int16 | DataType::Scale => match words[0] {
            INT16_NOT_IMPLEMENTED => Value::Absent,
            raw => Value::Int(i64::from(raw as i16)),
        },
        DataType::UInt32 => match join_u32(words) {
            UINT32_NOT_IMPLEMENTED => Value::Absent,
            raw => Value::UInt(u64::from(raw)),
        },
        DataType::Acc32 => match join_u32(words) {
            ACC32_NOT_IMPLEMENTED => Value::Absent,
            raw => Value::UInt(u64::from(raw)),
        },
        DataType::UInt64 => match join_u64(words) {
            UINT64_NOT_IMPLEMENTED => Value::Absent,
            raw => Value::UInt(raw),
        },
        DataType::Float32 => match join_u32(words) {
            FLOAT32_NOT_IMPLEMENTED => Value::Absent,
            raw => Value::Float(f64::from(f32::from_bits(raw))),
        },
        DataType::Sefloat => match join_u32(words) {
            SEFLOAT_NOT_IMPLEMENTED => Value::Absent,
            raw => Value::Float(f64::from(f32::from_bits(raw))),
        },
        DataType::String => {
            let text = decode_string(words);
            if text.is_empty() {
                Value::Absent
            } else {
                Value::Text(text)
            }
        }
    };

    Ok(value.into_target(target))
}

/// Decodes a field descriptor from the start of `words`.
#[inline]
pub fn decode_field(words: &[u16], field: &FieldDescriptor) -> ModbusResult<Value> {
    decode_value(words, field.data_type(), field.word_length(), field.target_type())
}

fn join_u32(words: &[u16]) -> u32 {
    (u32::from(words[0]) << 16) | u32::from(words[1])
}

fn join_u64(words: &[u16]) -> u64 {
    words.iter().fold(0u64, |acc, w| (acc << 16) | u64::from(*w))
}

/// Decodes UTF-8 skipping invalid sequences, removes NULs, then trims
/// trailing whitespace.
fn decode_string(words: &[u16]) -> String {
    let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_be_bytes()).collect();

    let mut text = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        text.extend(chunk.valid().chars().filter(|c| *c != '\0'));
    }
    text.truncate(text.trim_end().len());
    text
}

// =============================================================================
// RegisterCursor
// =============================================================================

/// Sequential decoder over a contiguous block of registers.
///
/// The cursor tracks the absolute address of the next unread register. A
/// field that starts beyond it causes the gap to be skipped first, so fields
/// left out of the catalog do not shift the ones after them.
///
/// ```text
/// base = 0x9c85
/// words:   [did][len][ -- ][cur][l1 ]...
/// fields:   did  len        cur  l1
///                      ^ skipped
/// ```
#[derive(Debug, Clone)]
pub struct RegisterCursor<'a> {
    words: &'a [u16],
    base: u16,
    position: usize,
}

impl<'a> RegisterCursor<'a> {
    /// Creates a cursor over `words` read starting at `base_address`.
    pub fn new(words: &'a [u16], base_address: u16) -> Self {
        Self {
            words,
            base: base_address,
            position: 0,
        }
    }

    /// Absolute address of the next unread register.
    pub fn address(&self) -> u32 {
        u32::from(self.base) + self.position as u32
    }

    /// Number of registers not yet consumed.
    pub fn remaining(&self) -> usize {
        self.words.len().saturating_sub(self.position)
    }

    /// Decodes `field`, skipping registers up to its address.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::InvalidCatalog`] if `field` starts before the
    ///   cursor (fields must be visited in address order without overlap).
    /// - [`ConversionError::InsufficientData`] if the block ends early.
    pub fn decode(&mut self, field: &FieldDescriptor) -> ModbusResult<Value> {
        let target = u32::from(field.address());
        let current = self.address();

        if target < current {
            return Err(ConfigurationError::invalid_catalog(
                field.name(),
                format!("address {target:#06x} is behind the read cursor at {current:#06x}"),
            )
            .into());
        }

        let start = self.position + (target - current) as usize;
        let width = usize::from(consumed_width(field.data_type(), field.word_length()));
        let available = self.words.get(start..).unwrap_or_default();

        let value = decode_field(available, field)?;
        self.position = start + width;
        Ok(value)
    }
}

// =============================================================================
// Encode
// =============================================================================

/// Encodes `value` into the registers of a field of `data_type`.
///
/// # Errors
///
/// - [`OperationError::NotSupported`] for ACC32, which is never written.
/// - [`ConversionError::TypeMismatch`] if the value variant does not fit the type.
/// - [`ConversionError::Overflow`] if the number is out of range.
/// - [`ConversionError::ExcessData`] if a string is longer than the field.
///
/// # Examples
///
/// ```
/// use ecu_modbus::codec::encode_value;
/// use ecu_modbus::types::DataType;
/// use ecu_modbus::value::Value;
///
/// let words = encode_value(&Value::UInt(0x12345678), DataType::UInt32, 2).unwrap();
/// assert_eq!(words, vec![0x1234, 0x5678]);
/// ```
pub fn encode_value(value: &Value, data_type: DataType, word_length: u16) -> ModbusResult<Vec<u16>> {
    match data_type {
        DataType::UInt16 => {
            let n: u16 = integer(value, data_type)?;
            Ok(vec![n])
        }
        DataType::Int16 | DataType::Scale => {
            let n: i16 = integer(value, data_type)?;
            Ok(vec![n as u16])
        }
        DataType::UInt32 => {
            let n: u32 = integer(value, data_type)?;
            Ok(split_u32(n))
        }
        DataType::UInt64 => {
            let n: u64 = integer(value, data_type)?;
            Ok(n.to_be_bytes()
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect())
        }
        DataType::Float32 | DataType::Sefloat => {
            let n = float(value, data_type)?;
            Ok(split_u32(n.to_bits()))
        }
        DataType::String => match value {
            Value::Text(text) => encode_string(text, word_length),
            other => Err(ModbusError::type_mismatch("text", other.type_name())),
        },
        DataType::Acc32 => Err(OperationError::not_supported(format!(
            "encoding {data_type} values"
        ))
        .into()),
    }
}

/// Encodes `value` for a field descriptor.
#[inline]
pub fn encode_field(value: &Value, field: &FieldDescriptor) -> ModbusResult<Vec<u16>> {
    encode_value(value, field.data_type(), field.word_length())
}

fn split_u32(n: u32) -> Vec<u16> {
    vec![(n >> 16) as u16, n as u16]
}

fn integer<T: TryFrom<i128>>(value: &Value, data_type: DataType) -> ModbusResult<T> {
    let wide = match value {
        Value::Int(v) => i128::from(*v),
        Value::UInt(v) => i128::from(*v),
        other => return Err(ModbusError::type_mismatch(data_type.name(), other.type_name())),
    };

    T::try_from(wide).map_err(|_| ConversionError::overflow(wide.to_string(), data_type.name()).into())
}

fn float(value: &Value, data_type: DataType) -> ModbusResult<f32> {
    let wide = match value {
        Value::Float(v) => *v,
        Value::Int(v) => *v as f64,
        Value::UInt(v) => *v as f64,
        other => return Err(ModbusError::type_mismatch(data_type.name(), other.type_name())),
    };

    let narrow = wide as f32;
    if wide.is_finite() && narrow.is_infinite() {
        return Err(ConversionError::overflow(wide.to_string(), data_type.name()).into());
    }
    Ok(narrow)
}

fn encode_string(text: &str, word_length: u16) -> ModbusResult<Vec<u16>> {
    let capacity = usize::from(word_length) * 2;
    let bytes = text.as_bytes();
    if bytes.len() > capacity {
        return Err(ConversionError::excess_data(capacity, bytes.len()).into());
    }

    let mut padded = bytes.to_vec();
    padded.resize(capacity, 0);
    Ok(padded
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(words: &[u16], data_type: DataType) -> Value {
        let length = data_type.fixed_width().unwrap_or(words.len() as u16);
        decode_value(words, data_type, length, data_type.default_target()).unwrap()
    }

    fn words_of(text: &[u8]) -> Vec<u16> {
        text.chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], *pair.get(1).unwrap_or(&0)]))
            .collect()
    }

    #[test]
    fn test_sentinels_decode_absent() {
        let cases: &[(DataType, &[u16])] = &[
            (DataType::UInt16, &[0xFFFF]),
            (DataType::Int16, &[0x8000]),
            (DataType::Scale, &[0x8000]),
            (DataType::UInt32, &[0xFFFF, 0xFFFF]),
            (DataType::Acc32, &[0x0000, 0x0000]),
            (DataType::Float32, &[0x7FC0, 0x0000]),
            (DataType::Sefloat, &[0xFFFF, 0xFFFF]),
            (DataType::UInt64, &[0xFFFF, 0xFFFF, 0xFFFF, 0xFFFF]),
            (DataType::String, &[0x0000, 0x2020]),
        ];

        for (data_type, words) in cases {
            assert_eq!(decode(words, *data_type), Value::Absent, "{data_type}");
        }
    }

    #[test]
    fn test_boundary_values() {
        assert_eq!(decode(&[0x0000], DataType::UInt16), Value::UInt(0));
        assert_eq!(decode(&[0xFFFE], DataType::UInt16), Value::UInt(65534));
        assert_eq!(decode(&[0x7FFF], DataType::Int16), Value::Int(32767));
        assert_eq!(decode(&[0x8001], DataType::Int16), Value::Int(-32767));
        assert_eq!(decode(&[0xFFFF], DataType::Int16), Value::Int(-1));
        assert_eq!(decode(&[0x0000], DataType::Scale), Value::Int(0));
        assert_eq!(decode(&[0xFFFE], DataType::Scale), Value::Int(-2));
        assert_eq!(decode(&[0x0000, 0x0000], DataType::UInt32), Value::UInt(0));
        assert_eq!(
            decode(&[0xFFFF, 0xFFFE], DataType::UInt32),
            Value::UInt(0xFFFF_FFFE)
        );
        assert_eq!(decode(&[0x0000, 0x0001], DataType::Acc32), Value::UInt(1));
        assert_eq!(
            decode(&[0x0001, 0x0002, 0x0003, 0x0004], DataType::UInt64),
            Value::UInt(0x0001_0002_0003_0004)
        );
        assert_eq!(
            decode(&[0x0000, 0x0000, 0x0000, 0x0000], DataType::UInt64),
            Value::UInt(0)
        );
    }

    #[test]
    fn test_float_decode() {
        assert_eq!(decode(&[0x4248, 0x0000], DataType::Float32), Value::Float(50.0));
        assert_eq!(decode(&[0xC120, 0x0000], DataType::Sefloat), Value::Float(-10.0));
        assert_eq!(decode(&[0x0000, 0x0000], DataType::Float32), Value::Float(0.0));
        // The SEFLOAT sentinel differs from FLOAT32, so NaN bits are a value.
        assert!(matches!(
            decode(&[0x7FC0, 0x0000], DataType::Sefloat),
            Value::Float(f) if f.is_nan()
        ));
    }

    #[test]
    fn test_int16_sentinel_compares_raw_bits() {
        // -32768 is the sentinel; -32767 is a value.
        assert_eq!(decode(&[0x8000], DataType::Int16), Value::Absent);
        assert_eq!(decode(&[0x8001], DataType::Int16), Value::Int(-32767));
    }

    #[test]
    fn test_string_strips_nul_and_whitespace() {
        assert_eq!(
            decode(&words_of(b"ACME\0\0\0\0"), DataType::String),
            Value::Text("ACME".into())
        );
        assert_eq!(
            decode(&words_of(b"ECU-R  \0\0\0"), DataType::String),
            Value::Text("ECU-R".into())
        );
        assert_eq!(
            decode(&words_of(b"  lead"), DataType::String),
            Value::Text("  lead".into())
        );
    }

    #[test]
    fn test_string_drops_invalid_utf8() {
        assert_eq!(
            decode(&words_of(b"AB\xFFCD\0"), DataType::String),
            Value::Text("ABCD".into())
        );
        assert_eq!(
            decode(&words_of("°C\0\0".as_bytes()), DataType::String),
            Value::Text("°C".into())
        );
    }

    #[test]
    fn test_nul_inside_multibyte_sequence_does_not_join_it() {
        // 0xC3 0xA9 is "é" only when adjacent.
        assert_eq!(
            decode(&[0xC300, 0xA900], DataType::String),
            Value::Text(String::new())
        );
    }

    #[test]
    fn test_scalar_ignores_extra_words() {
        let value = decode_value(&[0x0001, 0xFFFF], DataType::UInt16, 1, TargetType::Integer);
        assert_eq!(value.unwrap(), Value::UInt(1));
    }

    #[test]
    fn test_insufficient_data() {
        let err = decode_value(&[0x0001], DataType::UInt32, 2, TargetType::Integer).unwrap_err();
        assert!(matches!(
            err,
            ModbusError::Conversion(ConversionError::InsufficientData { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_target_conversion() {
        let text = decode_value(&[0x0065], DataType::UInt16, 1, TargetType::Text).unwrap();
        assert_eq!(text, Value::Text("101".into()));

        let float = decode_value(&[0x0010], DataType::UInt16, 1, TargetType::Float).unwrap();
        assert_eq!(float, Value::Float(16.0));

        let int = decode_value(&[0x4248, 0x0000], DataType::Float32, 2, TargetType::Integer)
            .unwrap();
        assert_eq!(int, Value::Int(50));
    }

    #[test]
    fn test_cursor_skips_gap() {
        // Three registers read from 100; the field at 101 is not in the set.
        let words = [0x0001, 0x0BAD, 0x0003];
        let first = FieldDescriptor::new("first", 100, DataType::UInt16, 1);
        let third = FieldDescriptor::new("third", 102, DataType::UInt16, 1);

        let mut cursor = RegisterCursor::new(&words, 100);
        assert_eq!(cursor.decode(&first).unwrap(), Value::UInt(1));
        assert_eq!(cursor.address(), 101);
        assert_eq!(cursor.decode(&third).unwrap(), Value::UInt(3));
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_cursor_rejects_backwards_field() {
        let words = [0x0001, 0x0002];
        let a = FieldDescriptor::new("a", 11, DataType::UInt16, 1);
        let b = FieldDescriptor::new("b", 10, DataType::UInt16, 1);

        let mut cursor = RegisterCursor::new(&words, 10);
        cursor.decode(&a).unwrap();
        assert!(cursor.decode(&b).is_err());
    }

    #[test]
    fn test_cursor_short_block() {
        let words = [0x0001];
        let field = FieldDescriptor::new("wide", 10, DataType::UInt32, 1);
        let mut cursor = RegisterCursor::new(&words, 10);
        assert!(cursor.decode(&field).is_err());

        let beyond = FieldDescriptor::new("beyond", 20, DataType::UInt16, 1);
        assert!(cursor.decode(&beyond).is_err());
    }

    #[test]
    fn test_encode_integers() {
        assert_eq!(encode_value(&Value::UInt(502), DataType::UInt16, 1).unwrap(), vec![502]);
        assert_eq!(encode_value(&Value::Int(-2), DataType::Scale, 1).unwrap(), vec![0xFFFE]);
        assert_eq!(
            encode_value(&Value::UInt(u64::MAX - 1), DataType::UInt64, 4).unwrap(),
            vec![0xFFFF, 0xFFFF, 0xFFFF, 0xFFFE]
        );
    }

    #[test]
    fn test_encode_float() {
        assert_eq!(
            encode_value(&Value::Float(50.0), DataType::Float32, 2).unwrap(),
            vec![0x4248, 0x0000]
        );
        assert_eq!(
            encode_value(&Value::UInt(50), DataType::Sefloat, 2).unwrap(),
            vec![0x4248, 0x0000]
        );
        assert!(encode_value(&Value::Float(1e300), DataType::Float32, 2).is_err());
    }

    #[test]
    fn test_encode_string_pads_with_nul() {
        let words = encode_value(&Value::Text("ACME".into()), DataType::String, 4).unwrap();
        assert_eq!(words, words_of(b"ACME\0\0\0\0"));
    }

    #[test]
    fn test_encode_errors() {
        let overflow = encode_value(&Value::UInt(70_000), DataType::UInt16, 1).unwrap_err();
        assert!(matches!(overflow, ModbusError::Conversion(ConversionError::Overflow { .. })));

        let negative = encode_value(&Value::Int(-1), DataType::UInt32, 2).unwrap_err();
        assert!(matches!(negative, ModbusError::Conversion(ConversionError::Overflow { .. })));

        let mismatch = encode_value(&Value::Text("x".into()), DataType::UInt16, 1).unwrap_err();
        assert!(matches!(
            mismatch,
            ModbusError::Conversion(ConversionError::TypeMismatch { .. })
        ));

        let absent = encode_value(&Value::Absent, DataType::Int16, 1).unwrap_err();
        assert!(matches!(absent, ModbusError::Conversion(ConversionError::TypeMismatch { .. })));

        let long = encode_value(&Value::Text("too long".into()), DataType::String, 2).unwrap_err();
        assert!(matches!(
            long,
            ModbusError::Conversion(ConversionError::ExcessData { expected: 4, actual: 8 })
        ));

        let acc = encode_value(&Value::UInt(1), DataType::Acc32, 2).unwrap_err();
        assert!(acc.is_unsupported());
    }

    #[test]
    fn test_round_trip_representative_values() {
        let cases = [
            (Value::UInt(0), DataType::UInt16, 1),
            (Value::UInt(65534), DataType::UInt16, 1),
            (Value::Int(-32767), DataType::Int16, 1),
            (Value::Int(32767), DataType::Int16, 1),
            (Value::Int(-3), DataType::Scale, 1),
            (Value::UInt(4_000_000_000), DataType::UInt32, 2),
            (Value::UInt(1 << 40), DataType::UInt64, 4),
            (Value::Float(-273.5), DataType::Float32, 2),
            (Value::Float(0.25), DataType::Sefloat, 2),
            (Value::Text("APsystems".into()), DataType::String, 16),
        ];

        for (value, data_type, length) in cases {
            let words = encode_value(&value, data_type, length).unwrap();
            let decoded = decode_value(&words, data_type, length, data_type.default_target()).unwrap();
            assert_eq!(decoded, value, "{data_type}");
        }
    }

    #[test]
    fn test_sentinel_table() {
        assert_eq!(sentinel(DataType::Scale), Some(0x8000));
        assert_eq!(sentinel(DataType::Acc32), Some(0));
        assert_eq!(sentinel(DataType::String), None);
    }
}
