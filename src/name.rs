use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::tlv::{self, Block, Encoder, TlvError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("Name URI must start with '/': {0:?}")]
    NotAbsolute(String),

    #[error("Invalid name component {0:?}")]
    InvalidComponent(String),

    #[error("Unexpected TLV type {0} in name")]
    UnexpectedType(u64),

    #[error(transparent)]
    Tlv(#[from] TlvError),
}

/// Name component: a TLV type and an opaque value.
///
/// Ordered canonically: by type, then shorter value first, then bytewise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Component {
    tlv_type: u64,
    value: Bytes,
}

impl Component {
    /// Generic component holding `value`.
    pub fn new(value: impl Into<Bytes>) -> Self {
        Self::typed(tlv::GENERIC_NAME_COMPONENT, value)
    }

    pub fn typed(tlv_type: u64, value: impl Into<Bytes>) -> Self {
        Self { tlv_type, value: value.into() }
    }

    pub fn tlv_type(&self) -> u64 {
        self.tlv_type
    }

    pub fn is_generic(&self) -> bool {
        self.tlv_type == tlv::GENERIC_NAME_COMPONENT
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.value
    }

    fn from_block(block: &Block) -> Result<Self, NameError> {
        match block.tlv_type() {
            COMPONENT_TYPES_START..=COMPONENT_TYPES_END => {
                Ok(Self::typed(block.tlv_type(), block.value().clone()))
            }
            other => Err(NameError::UnexpectedType(other)),
        }
    }
}

const COMPONENT_TYPES_START: u64 = 1;
const COMPONENT_TYPES_END: u64 = 0xFFFF;

impl Ord for Component {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tlv_type
            .cmp(&other.tlv_type)
            .then_with(|| self.value.len().cmp(&other.value.len()))
            .then_with(|| self.value.cmp(&other.value))
    }
}

impl PartialOrd for Component {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_generic() {
            write!(f, "{}=", self.tlv_type)?;
        } else if self.value.iter().all(|b| *b == b'.') {
            // "." and ".." are path segments, so all-period values get three extra.
            f.write_str("...")?;
        }
        for byte in self.value.iter() {
            if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
                write!(f, "{}", *byte as char)?;
            } else {
                write!(f, "%{:02X}", byte)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Component {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NameError::InvalidComponent(s.to_string());

        if let Some((number, value)) = s.split_once('=') {
            if !number.is_empty() && number.bytes().all(|b| b.is_ascii_digit()) {
                let tlv_type = number
                    .parse::<u64>()
                    .ok()
                    .filter(|t| (COMPONENT_TYPES_START..=COMPONENT_TYPES_END).contains(t))
                    .ok_or_else(invalid)?;
                let value = percent_decode(value).ok_or_else(invalid)?;
                return Ok(Self::typed(tlv_type, value));
            }
        }

        if s.bytes().all(|b| b == b'.') {
            return match s.len() {
                0..=2 => Err(invalid()),
                n => Ok(Self::new(vec![b'.'; n - 3])),
            };
        }
        percent_decode(s).map(Self::new).ok_or_else(invalid)
    }
}

fn percent_decode(s: &str) -> Option<Vec<u8>> {
    let raw = s.as_bytes();
    let mut value = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hex = s.get(i + 1..i + 3)?;
            value.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            value.push(raw[i]);
            i += 1;
        }
    }
    Some(value)
}

/// Hierarchical name such as `/ndn/edu/memphis`.
///
/// Names compare component by component, and a proper prefix sorts before
/// every name it prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    components: Vec<Component>,
}

impl Name {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn push(&mut self, component: Component) -> &mut Self {
        self.components.push(component);
        self
    }

    /// Returns a new name with every component of `suffix` appended.
    pub fn join(&self, suffix: &Name) -> Name {
        let mut components = self.components.clone();
        components.extend(suffix.components.iter().cloned());
        Name { components }
    }

    pub fn is_prefix_of(&self, other: &Name) -> bool {
        other.components.starts_with(&self.components)
    }

    /// Prepend the Name TLV to `encoder`, returning the bytes written.
    pub fn encode(&self, encoder: &mut Encoder) -> usize {
        let mut length = 0;
        for component in self.components.iter().rev() {
            length += encoder.prepend_block(component.tlv_type(), component.as_bytes());
        }
        length + encoder.prepend_header(tlv::NAME, length)
    }

    pub fn from_block(block: &Block) -> Result<Self, NameError> {
        if block.tlv_type() != tlv::NAME {
            return Err(NameError::UnexpectedType(block.tlv_type()));
        }
        let components = block
            .elements()?
            .into_iter()
            .map(|element| Component::from_block(&element))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.components.is_empty() {
            return f.write_str("/");
        }
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl FromStr for Name {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| NameError::NotAbsolute(s.to_string()))?;
        let components = rest
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(Component::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { components })
    }
}

impl Serialize for Name {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Name {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let uri = String::deserialize(deserializer)?;
        uri.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        uri.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let n = name("/ndn/edu/mem%20phis");
        assert_eq!(n.len(), 3);
        assert_eq!(n.components()[2].as_bytes(), b"mem phis");
        assert_eq!(n.to_string(), "/ndn/edu/mem%20phis");
        assert_eq!(name("/").to_string(), "/");
        assert_eq!(name("/a/.../b").components()[1].as_bytes(), b"");
        assert_eq!(name("/a/.../b").to_string(), "/a/.../b");
    }

    #[test]
    fn test_parse_rejects_relative_and_bad_escape() {
        assert!(matches!("ndn/edu".parse::<Name>(), Err(NameError::NotAbsolute(_))));
        assert!(matches!("/a/%zz".parse::<Name>(), Err(NameError::InvalidComponent(_))));
        assert!(matches!("/a/..".parse::<Name>(), Err(NameError::InvalidComponent(_))));
    }

    #[test]
    fn test_canonical_order() {
        assert!(name("/a") < name("/a/b"));
        assert!(name("/b") < name("/aa"));
        assert!(name("/a/c") < name("/b"));
        assert!(name("/a").is_prefix_of(&name("/a/b")));
        assert!(!name("/a/b").is_prefix_of(&name("/a")));
    }

    #[test]
    fn test_wire_form() {
        let n = name("/ab/c");
        let mut encoder = Encoder::new();
        let length = n.encode(&mut encoder);
        let wire = encoder.finish();
        assert_eq!(length, wire.len());
        assert_eq!(&wire[..], &[7, 7, 8, 2, b'a', b'b', 8, 1, b'c']);

        let decoded = Name::from_block(&Block::decode(wire).unwrap()).unwrap();
        assert_eq!(decoded, n);
    }

    #[test]
    fn test_typed_component_round_trip() {
        let block = Block::decode(Bytes::from_static(&[7, 8, 8, 1, b'a', 54, 3, 0, 1, 2])).unwrap();
        let n = Name::from_block(&block).unwrap();
        assert_eq!(n.components()[1].tlv_type(), 54);
        assert_eq!(n.components()[1].as_bytes(), &[0, 1, 2]);
        assert_eq!(n.to_string(), "/a/54=%00%01%02");
        assert_eq!(name("/a/54=%00%01%02"), n);

        let mut encoder = Encoder::new();
        n.encode(&mut encoder);
        assert_eq!(encoder.finish(), block.wire().clone());
    }

    #[test]
    fn test_component_type_orders_first() {
        // Generic (8) sorts before version (54) whatever the value length.
        assert!(name("/a/abc") < name("/a/54=%01"));
        assert!(name("/a/8=x") == name("/a/x"));
        assert!(name("/a=b").components()[0].is_generic());
    }

    #[test]
    fn test_from_block_rejects_out_of_range_component_type() {
        let block = Block::decode(Bytes::from_static(&[7, 3, 0, 1, b'x'])).unwrap();
        assert_eq!(Name::from_block(&block), Err(NameError::UnexpectedType(0)));
        assert!(matches!("/0=x".parse::<Name>(), Err(NameError::InvalidComponent(_))));
    }

    #[test]
    fn test_serde_as_uri() {
        let json = serde_json::to_string(&name("/a/b")).unwrap();
        assert_eq!(json, "\"/a/b\"");
        let back: Name = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name("/a/b"));
    }
}
