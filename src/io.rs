//! Byte-level (de)serialization used by every on-disk page layout.
//!
//! A type knows how to turn itself into bytes and how to read itself back
//! out of a byte slice. All integers are little-endian.

use bit_vec::BitVec;

pub trait Encodeable {
    fn encode(&self) -> Vec<u8>;
}

pub trait Decodeable: Sized {
    fn decode(bytes: &[u8]) -> Self;
}

macro_rules! impl_int_serialization {
    ($t:ty) => {
        impl Encodeable for $t {
            fn encode(&self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }
        }

        impl Decodeable for $t {
            fn decode(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(&bytes[..std::mem::size_of::<$t>()]);
                <$t>::from_le_bytes(buf)
            }
        }
    };
}

impl_int_serialization!(u8);
impl_int_serialization!(u16);
impl_int_serialization!(u32);
impl_int_serialization!(u64);
impl_int_serialization!(i32);
impl_int_serialization!(i64);

impl Encodeable for bool {
    fn encode(&self) -> Vec<u8> {
        vec![if *self { 1 } else { 0 }]
    }
}

impl Decodeable for bool {
    fn decode(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }
}

/// Bit-vectors are encoded as a u16 bit-length prefix followed by the packed
/// bytes, so a header bitmap's exact slot count round-trips even when it is
/// not a multiple of 8.
impl Encodeable for BitVec<u32> {
    fn encode(&self) -> Vec<u8> {
        let mut out = (self.len() as u16).encode();
        out.extend(self.to_bytes());
        out
    }
}

impl Decodeable for BitVec<u32> {
    fn decode(bytes: &[u8]) -> Self {
        let len = u16::decode(&bytes[0..2]) as usize;
        let mut bv = BitVec::from_bytes(&bytes[2..]);
        bv.truncate(len);
        bv
    }
}

/// Fixed-width byte buffer, padded with zeroes on encode and trimmed of
/// trailing NULs on decode — used by the fixed-width string field type.
pub fn encode_fixed_str(s: &str, width: usize) -> Vec<u8> {
    let mut bytes = s.as_bytes().to_vec();
    bytes.truncate(width);
    bytes.resize(width, 0);
    bytes
}

pub fn decode_fixed_str(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

/// Writer that accumulates encoded fields and pads the result to a fixed
/// page size.
pub struct PageWriter {
    buf: Vec<u8>,
}

impl PageWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn write<T: Encodeable>(&mut self, value: &T) -> &mut Self {
        self.buf.extend(value.encode());
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn to_padded_bytes(mut self, page_size: usize) -> Vec<u8> {
        assert!(self.buf.len() <= page_size, "encoded page exceeds page size");
        self.buf.resize(page_size, 0);
        self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl Default for PageWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_round_trip() {
        let v: i32 = -42;
        let bytes = v.encode();
        assert_eq!(i32::decode(&bytes), v);
    }

    #[test]
    fn test_bitvec_round_trip() {
        let mut bv: BitVec<u32> = BitVec::from_elem(13, false);
        bv.set(3, true);
        bv.set(12, true);
        let bytes = bv.encode();
        let back = BitVec::<u32>::decode(&bytes);
        assert_eq!(back.len(), 13);
        assert_eq!(back.get(3), Some(true));
        assert_eq!(back.get(12), Some(true));
        assert_eq!(back.get(4), Some(false));
    }

    #[test]
    fn test_fixed_str_round_trip() {
        let encoded = encode_fixed_str("hi", 8);
        assert_eq!(encoded.len(), 8);
        assert_eq!(decode_fixed_str(&encoded), "hi");
    }
}
