//! TLV primitives for advertisement wire records.
//!
//! Type and length fields are variable-length numbers. Encoding goes
//! back to front: children are prepended first and their parent's length
//! and type last, so the size of a record is known when its header is
//! written.

use bytes::{Buf, BufMut, Bytes};
use thiserror::Error;

pub const NAME: u64 = 7;
pub const GENERIC_NAME_COMPONENT: u64 = 8;

pub const LSA: u64 = 128;
pub const SEQUENCE_NUMBER: u64 = 130;
pub const ADJACENCY_LSA: u64 = 131;
pub const ADJACENCY: u64 = 132;
pub const COORDINATE_LSA: u64 = 133;
pub const HYPERBOLIC_RADIUS: u64 = 135;
pub const HYPERBOLIC_ANGLE: u64 = 136;
pub const NAME_LSA: u64 = 137;
pub const EXPIRATION_TIME: u64 = 139;
pub const COST: u64 = 140;
pub const PREFIX_COST: u64 = 150;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TlvError {
    #[error("Buffer too short to read {0}")]
    Truncated(&'static str),

    #[error("TLV length {declared} exceeds the {available} remaining bytes")]
    LengthOverflow { declared: u64, available: usize },

    #[error("{0} trailing bytes after TLV element")]
    TrailingBytes(usize),

    #[error("Invalid length {0} for a non-negative integer")]
    InvalidNonNegativeInteger(usize),

    #[error("Invalid length {0} for a double")]
    InvalidDouble(usize),
}

/// One decoded TLV element. `wire` covers the header and value, `value` only the value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    tlv_type: u64,
    wire: Bytes,
    value: Bytes,
}

impl Block {
    /// Decode a buffer that must hold exactly one TLV element.
    pub fn decode(wire: Bytes) -> Result<Self, TlvError> {
        let mut cursor = wire;
        let block = Self::read(&mut cursor)?;
        if cursor.has_remaining() {
            return Err(TlvError::TrailingBytes(cursor.remaining()));
        }
        Ok(block)
    }

    fn read(cursor: &mut Bytes) -> Result<Self, TlvError> {
        let start = cursor.clone();
        let tlv_type = read_var_number(cursor)?;
        let length = read_var_number(cursor)?;
        if length > cursor.remaining() as u64 {
            return Err(TlvError::LengthOverflow {
                declared: length,
                available: cursor.remaining(),
            });
        }
        let length = length as usize;
        let header_len = start.len() - cursor.len();
        let value = cursor.split_to(length);
        let wire = start.slice(..header_len + length);

        Ok(Self { tlv_type, wire, value })
    }

    /// Parse the value as a sequence of nested elements.
    pub fn elements(&self) -> Result<Vec<Block>, TlvError> {
        let mut cursor = self.value.clone();
        let mut elements = Vec::new();
        while cursor.has_remaining() {
            elements.push(Self::read(&mut cursor)?);
        }
        Ok(elements)
    }

    pub fn tlv_type(&self) -> u64 {
        self.tlv_type
    }

    pub fn wire(&self) -> &Bytes {
        &self.wire
    }

    pub fn value(&self) -> &Bytes {
        &self.value
    }
}

pub fn read_var_number(cursor: &mut Bytes) -> Result<u64, TlvError> {
    if !cursor.has_remaining() {
        return Err(TlvError::Truncated("a varnumber"));
    }
    let width = match cursor.get_u8() {
        253 => 2,
        254 => 4,
        255 => 8,
        n => return Ok(n as u64),
    };
    if cursor.remaining() < width {
        return Err(TlvError::Truncated("a varnumber"));
    }
    Ok(match width {
        2 => cursor.get_u16() as u64,
        4 => cursor.get_u32() as u64,
        _ => cursor.get_u64(),
    })
}

pub fn read_non_negative_integer(value: &Bytes) -> Result<u64, TlvError> {
    let mut cursor = value.clone();
    match value.len() {
        1 => Ok(cursor.get_u8() as u64),
        2 => Ok(cursor.get_u16() as u64),
        4 => Ok(cursor.get_u32() as u64),
        8 => Ok(cursor.get_u64()),
        len => Err(TlvError::InvalidNonNegativeInteger(len)),
    }
}

pub fn read_double(value: &Bytes) -> Result<f64, TlvError> {
    if value.len() != 8 {
        return Err(TlvError::InvalidDouble(value.len()));
    }
    Ok(value.clone().get_f64())
}

fn var_number_bytes(n: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(9);
    if n < 253 {
        buf.put_u8(n as u8);
    } else if n <= u16::MAX as u64 {
        buf.put_u8(253);
        buf.put_u16(n as u16);
    } else if n <= u32::MAX as u64 {
        buf.put_u8(254);
        buf.put_u32(n as u32);
    } else {
        buf.put_u8(255);
        buf.put_u64(n);
    }
    buf
}

fn non_negative_integer_bytes(n: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(8);
    if n <= u8::MAX as u64 {
        buf.put_u8(n as u8);
    } else if n <= u16::MAX as u64 {
        buf.put_u16(n as u16);
    } else if n <= u32::MAX as u64 {
        buf.put_u32(n as u32);
    } else {
        buf.put_u64(n);
    }
    buf
}

/// Back-to-front TLV builder. Every `prepend_*` call returns the number
/// of bytes it added so callers can total up their record length.
#[derive(Debug, Default)]
pub struct Encoder {
    reversed: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prepend_bytes(&mut self, bytes: &[u8]) -> usize {
        self.reversed.extend(bytes.iter().rev());
        bytes.len()
    }

    pub fn prepend_var_number(&mut self, n: u64) -> usize {
        self.prepend_bytes(&var_number_bytes(n))
    }

    /// Prepend the length and type of a record whose value is already in the buffer.
    pub fn prepend_header(&mut self, tlv_type: u64, length: usize) -> usize {
        self.prepend_var_number(length as u64) + self.prepend_var_number(tlv_type)
    }

    pub fn prepend_block(&mut self, tlv_type: u64, value: &[u8]) -> usize {
        let length = self.prepend_bytes(value);
        length + self.prepend_header(tlv_type, length)
    }

    pub fn prepend_non_negative_integer_block(&mut self, tlv_type: u64, n: u64) -> usize {
        self.prepend_block(tlv_type, &non_negative_integer_bytes(n))
    }

    pub fn prepend_double_block(&mut self, tlv_type: u64, value: f64) -> usize {
        self.prepend_block(tlv_type, &value.to_be_bytes())
    }

    pub fn len(&self) -> usize {
        self.reversed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reversed.is_empty()
    }

    pub fn finish(self) -> Bytes {
        let mut bytes = self.reversed;
        bytes.reverse();
        Bytes::from(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_number_widths() {
        assert_eq!(var_number_bytes(252), vec![252]);
        assert_eq!(var_number_bytes(253), vec![253, 0, 253]);
        assert_eq!(var_number_bytes(0x1_0000), vec![254, 0, 1, 0, 0]);
        assert_eq!(var_number_bytes(0x1_0000_0000).len(), 9);

        let mut cursor = Bytes::from(vec![253, 0x01, 0x00]);
        assert_eq!(read_var_number(&mut cursor).unwrap(), 256);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_encoder_builds_back_to_front() {
        let mut encoder = Encoder::new();
        let mut length = encoder.prepend_non_negative_integer_block(COST, 300);
        length += encoder.prepend_block(NAME, &[]);
        encoder.prepend_header(PREFIX_COST, length);

        let wire = encoder.finish();
        assert_eq!(&wire[..], &[150, 6, 7, 0, 140, 2, 0x01, 0x2c]);

        let block = Block::decode(wire).unwrap();
        assert_eq!(block.tlv_type(), PREFIX_COST);
        let elements = block.elements().unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0].tlv_type(), NAME);
        assert_eq!(read_non_negative_integer(elements[1].value()).unwrap(), 300);
    }

    #[test]
    fn test_decode_rejects_length_overflow() {
        let err = Block::decode(Bytes::from_static(&[137, 5, 1, 2])).unwrap_err();
        assert_eq!(err, TlvError::LengthOverflow { declared: 5, available: 2 });
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let err = Block::decode(Bytes::from_static(&[7, 0, 0xff])).unwrap_err();
        assert_eq!(err, TlvError::TrailingBytes(1));
    }

    #[test]
    fn test_decode_rejects_truncated_header() {
        let err = Block::decode(Bytes::from_static(&[253, 0])).unwrap_err();
        assert_eq!(err, TlvError::Truncated("a varnumber"));
        assert!(Block::decode(Bytes::new()).is_err());
    }

    #[test]
    fn test_non_negative_integer_rejects_odd_width() {
        let value = Bytes::from_static(&[0, 0, 1]);
        assert_eq!(
            read_non_negative_integer(&value),
            Err(TlvError::InvalidNonNegativeInteger(3))
        );
    }
}
