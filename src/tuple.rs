use std::fmt;

use crate::field::{Field, FieldType};
use crate::page_id::PageId;

/// Identifies the physical slot a tuple occupies: which page, and which
/// slot index within that page's header bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_id: PageId,
    pub slot_index: usize,
}

impl RecordId {
    pub fn new(page_id: PageId, slot_index: usize) -> Self {
        Self { page_id, slot_index }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.page_id, self.slot_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleDesc {
    pub fields: Vec<(String, FieldType)>,
}

impl TupleDesc {
    pub fn new(fields: Vec<(String, FieldType)>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total on-disk byte length of one tuple under this schema.
    pub fn tuple_size(&self) -> usize {
        self.fields.iter().map(|(_, ty)| ty.byte_len()).sum()
    }

    pub fn field_type(&self, i: usize) -> FieldType {
        self.fields[i].1
    }

    pub fn field_name(&self, i: usize) -> &str {
        &self.fields[i].0
    }

    pub fn merge(a: &TupleDesc, b: &TupleDesc) -> TupleDesc {
        let mut fields = a.fields.clone();
        fields.extend(b.fields.clone());
        TupleDesc { fields }
    }
}

/// Builds the single-int-column-repeated-`width`-times schema used
/// throughout the B+ tree structural tests, naming columns `field{i}`.
pub fn simple_int_tuple_desc(width: usize, name_prefix: &str) -> TupleDesc {
    let fields = (0..width)
        .map(|i| (format!("{}{}", name_prefix, i), FieldType::Int))
        .collect();
    TupleDesc::new(fields)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tuple {
    pub scheme: TupleDesc,
    fields: Vec<Field>,
    pub record_id: Option<RecordId>,
}

impl Tuple {
    pub fn new(scheme: TupleDesc, fields: Vec<Field>) -> Self {
        assert_eq!(scheme.len(), fields.len());
        Self {
            scheme,
            fields,
            record_id: None,
        }
    }

    /// Parses a tuple out of its on-disk byte representation per `scheme`.
    pub fn from_bytes(scheme: TupleDesc, bytes: &[u8]) -> Self {
        let mut fields = Vec::with_capacity(scheme.len());
        let mut start = 0;
        for i in 0..scheme.len() {
            let ty = scheme.field_type(i);
            let end = start + ty.byte_len();
            fields.push(Field::decode(ty, &bytes[start..end]));
            start = end;
        }
        Self {
            scheme,
            fields,
            record_id: None,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.scheme.tuple_size());
        for (field, (_, ty)) in self.fields.iter().zip(self.scheme.fields.iter()) {
            out.extend(field.encode(*ty));
        }
        out
    }

    pub fn new_int_tuple(value: i32, width: usize) -> Tuple {
        let scheme = simple_int_tuple_desc(width, "field");
        let fields = (0..width).map(|_| Field::Int(value)).collect();
        Tuple::new(scheme, fields)
    }

    pub fn get_field(&self, i: usize) -> &Field {
        &self.fields[i]
    }

    pub fn set_field(&mut self, i: usize, value: Field) {
        self.fields[i] = value;
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let joined: Vec<String> = self.fields.iter().map(|c| c.to_string()).collect();
        write!(f, "{{{}}}", joined.join(", "))
    }
}

/// A tuple returned by a page iterator, additionally carrying the
/// `RecordId` it was read from.
#[derive(Debug, Clone)]
pub struct WrappedTuple {
    pub tuple: Tuple,
    pub record_id: RecordId,
}

impl WrappedTuple {
    pub fn new(mut tuple: Tuple, page_id: PageId, slot_index: usize) -> Self {
        let record_id = RecordId::new(page_id, slot_index);
        tuple.record_id = Some(record_id);
        Self { tuple, record_id }
    }

    pub fn get_field(&self, i: usize) -> &Field {
        self.tuple.get_field(i)
    }
}

impl std::ops::Deref for WrappedTuple {
    type Target = Tuple;
    fn deref(&self) -> &Tuple {
        &self.tuple
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::init_log;
    use log::info;

    #[test]
    fn test_tuple_round_trip() {
        init_log();
        let t = Tuple::new_int_tuple(35, 2);
        let bytes = t.to_bytes();
        let back = Tuple::from_bytes(t.scheme.clone(), &bytes);
        info!("tuple: {}, back: {}", t, back);
        assert_eq!(t, back);
    }

    #[test]
    fn test_mixed_schema() {
        let scheme = TupleDesc::new(vec![
            ("id".to_string(), FieldType::Int),
            ("name".to_string(), FieldType::String(8)),
        ]);
        let t = Tuple::new(scheme.clone(), vec![Field::Int(1), Field::Str("bob".to_string())]);
        let bytes = t.to_bytes();
        assert_eq!(bytes.len(), scheme.tuple_size());
        let back = Tuple::from_bytes(scheme, &bytes);
        assert_eq!(t, back);
    }
}
