//! Constant value encoding for `Constant` rows.
//!
//! A constant's blob holds the little-endian raw bytes of the primitive
//! value; strings are UTF-16LE, null references are four zero bytes. The
//! declared element type travels into the row unchanged; disagreements
//! between it and the value's actual kind are tolerated with a warning.

use crate::{
    metadata::{model::ConstantValue, signatures::ELEMENT_TYPE},
    Warning,
};

fn natural_element_type(value: &ConstantValue) -> u8 {
    match value {
        ConstantValue::Boolean(_) => ELEMENT_TYPE::BOOLEAN,
        ConstantValue::Char(_) => ELEMENT_TYPE::CHAR,
        ConstantValue::I1(_) => ELEMENT_TYPE::I1,
        ConstantValue::U1(_) => ELEMENT_TYPE::U1,
        ConstantValue::I2(_) => ELEMENT_TYPE::I2,
        ConstantValue::U2(_) => ELEMENT_TYPE::U2,
        ConstantValue::I4(_) => ELEMENT_TYPE::I4,
        ConstantValue::U4(_) => ELEMENT_TYPE::U4,
        ConstantValue::I8(_) => ELEMENT_TYPE::I8,
        ConstantValue::U8(_) => ELEMENT_TYPE::U8,
        ConstantValue::R4(_) => ELEMENT_TYPE::R4,
        ConstantValue::R8(_) => ELEMENT_TYPE::R8,
        ConstantValue::String(_) => ELEMENT_TYPE::STRING,
        ConstantValue::Null => ELEMENT_TYPE::CLASS,
    }
}

fn value_kind(value: &ConstantValue) -> &'static str {
    match value {
        ConstantValue::Boolean(_) => "boolean",
        ConstantValue::Char(_) => "char",
        ConstantValue::I1(_) => "i1",
        ConstantValue::U1(_) => "u1",
        ConstantValue::I2(_) => "i2",
        ConstantValue::U2(_) => "u2",
        ConstantValue::I4(_) => "i4",
        ConstantValue::U4(_) => "u4",
        ConstantValue::I8(_) => "i8",
        ConstantValue::U8(_) => "u8",
        ConstantValue::R4(_) => "r4",
        ConstantValue::R8(_) => "r8",
        ConstantValue::String(_) => "string",
        ConstantValue::Null => "null",
    }
}

fn value_bytes(value: &ConstantValue) -> Vec<u8> {
    match value {
        ConstantValue::Boolean(v) => vec![u8::from(*v)],
        ConstantValue::Char(v) => v.to_le_bytes().to_vec(),
        ConstantValue::I1(v) => v.to_le_bytes().to_vec(),
        ConstantValue::U1(v) => v.to_le_bytes().to_vec(),
        ConstantValue::I2(v) => v.to_le_bytes().to_vec(),
        ConstantValue::U2(v) => v.to_le_bytes().to_vec(),
        ConstantValue::I4(v) => v.to_le_bytes().to_vec(),
        ConstantValue::U4(v) => v.to_le_bytes().to_vec(),
        ConstantValue::I8(v) => v.to_le_bytes().to_vec(),
        ConstantValue::U8(v) => v.to_le_bytes().to_vec(),
        ConstantValue::R4(v) => v.to_le_bytes().to_vec(),
        ConstantValue::R8(v) => v.to_le_bytes().to_vec(),
        ConstantValue::String(v) => v.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        ConstantValue::Null => vec![0, 0, 0, 0],
    }
}

fn is_known_constant_type(element_type: u8) -> bool {
    matches!(
        element_type,
        ELEMENT_TYPE::BOOLEAN
            | ELEMENT_TYPE::CHAR
            | ELEMENT_TYPE::I1
            | ELEMENT_TYPE::U1
            | ELEMENT_TYPE::I2
            | ELEMENT_TYPE::U2
            | ELEMENT_TYPE::I4
            | ELEMENT_TYPE::U4
            | ELEMENT_TYPE::I8
            | ELEMENT_TYPE::U8
            | ELEMENT_TYPE::R4
            | ELEMENT_TYPE::R8
            | ELEMENT_TYPE::STRING
            | ELEMENT_TYPE::CLASS
    )
}

/// Encodes a constant's blob bytes.
///
/// Returns the bytes and an optional warning: a declared/actual kind
/// mismatch keeps the value's own encoding, an unrecognized declared type
/// falls back to eight zero bytes.
pub fn encode_constant(declared: u8, value: &ConstantValue) -> (Vec<u8>, Option<Warning>) {
    if !is_known_constant_type(declared) {
        return (
            vec![0; 8],
            Some(Warning::UnknownConstantType { declared }),
        );
    }

    let warning = (natural_element_type(value) != declared).then(|| Warning::ConstantTypeMismatch {
        declared,
        value_kind: value_kind(value),
    });

    (value_bytes(value), warning)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_widths() {
        let cases: [(ConstantValue, usize); 10] = [
            (ConstantValue::Boolean(true), 1),
            (ConstantValue::Char(0x41), 2),
            (ConstantValue::I1(-1), 1),
            (ConstantValue::U2(7), 2),
            (ConstantValue::I4(42), 4),
            (ConstantValue::U4(42), 4),
            (ConstantValue::I8(-9), 8),
            (ConstantValue::U8(9), 8),
            (ConstantValue::R4(1.5), 4),
            (ConstantValue::R8(2.5), 8),
        ];
        for (value, width) in cases {
            let declared = natural_element_type(&value);
            let (bytes, warning) = encode_constant(declared, &value);
            assert_eq!(bytes.len(), width, "{value:?}");
            assert!(warning.is_none());
        }
    }

    #[test]
    fn little_endian_layout() {
        let (bytes, _) = encode_constant(ELEMENT_TYPE::I4, &ConstantValue::I4(0x0102_0304));
        assert_eq!(bytes, [0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn string_is_utf16le() {
        let (bytes, warning) =
            encode_constant(ELEMENT_TYPE::STRING, &ConstantValue::String("Hi".into()));
        assert_eq!(bytes, [0x48, 0x00, 0x69, 0x00]);
        assert!(warning.is_none());
    }

    #[test]
    fn null_is_four_zero_bytes() {
        let (bytes, warning) = encode_constant(ELEMENT_TYPE::CLASS, &ConstantValue::Null);
        assert_eq!(bytes, [0, 0, 0, 0]);
        assert!(warning.is_none());
    }

    #[test]
    fn mismatch_warns_but_encodes_value() {
        let (bytes, warning) =
            encode_constant(ELEMENT_TYPE::I4, &ConstantValue::String("oops".into()));
        assert_eq!(bytes.len(), 8);
        assert!(matches!(
            warning,
            Some(Warning::ConstantTypeMismatch {
                declared: 0x08,
                value_kind: "string",
            })
        ));
    }

    #[test]
    fn unknown_declared_type_emits_eight_zeros() {
        let (bytes, warning) = encode_constant(0x1D, &ConstantValue::I4(1));
        assert_eq!(bytes, [0; 8]);
        assert!(matches!(
            warning,
            Some(Warning::UnknownConstantType { declared: 0x1D })
        ));
    }
}
