use std::fmt;

use crate::io::{decode_fixed_str, encode_fixed_str, Decodeable, Encodeable};

/// Schema-level field type. A fixed-width string carries its width so that
/// `TupleDesc::tuple_size` can be computed without looking at any data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Int,
    String(usize),
}

impl FieldType {
    pub fn byte_len(&self) -> usize {
        match self {
            FieldType::Int => 4,
            FieldType::String(width) => *width,
        }
    }

    /// Parses the catalog schema-file grammar's type token (case-insensitive
    /// `int`/`string`); the width for a string column is supplied out of
    /// band by the catalog since the grammar itself does not encode it.
    pub fn parse(token: &str, string_width: usize) -> Option<FieldType> {
        match token.to_ascii_lowercase().as_str() {
            "int" => Some(FieldType::Int),
            "string" => Some(FieldType::String(string_width)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::String(w) => write!(f, "string({})", w),
        }
    }
}

/// A single typed value. `Int` carries the raw i32 used as the B+ tree key
/// field throughout the index layer; `Str` carries a fixed-width string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Int(i32),
    Str(String),
}

impl Field {
    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Int(_) => FieldType::Int,
            Field::Str(s) => FieldType::String(s.len()),
        }
    }

    pub fn as_int(&self) -> i32 {
        match self {
            Field::Int(v) => *v,
            Field::Str(_) => panic!("field is not an int"),
        }
    }

    pub fn encode(&self, ty: FieldType) -> Vec<u8> {
        match (self, ty) {
            (Field::Int(v), FieldType::Int) => v.encode(),
            (Field::Str(s), FieldType::String(width)) => encode_fixed_str(s, width),
            _ => panic!("field/type mismatch"),
        }
    }

    pub fn decode(ty: FieldType, bytes: &[u8]) -> Field {
        match ty {
            FieldType::Int => Field::Int(i32::decode(bytes)),
            FieldType::String(_) => Field::Str(decode_fixed_str(bytes)),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Field::Int(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_field_round_trip() {
        let f = Field::Int(7);
        let bytes = f.encode(FieldType::Int);
        assert_eq!(Field::decode(FieldType::Int, &bytes), f);
    }

    #[test]
    fn test_string_field_round_trip() {
        let f = Field::Str("abc".to_string());
        let bytes = f.encode(FieldType::String(8));
        assert_eq!(bytes.len(), 8);
        assert_eq!(Field::decode(FieldType::String(8), &bytes), f);
    }
}
