//! Link-state advertisements and their wire records.
//!
//! Every kind shares the base record (origin router, sequence number,
//! expiration) as its first child and adds its own entries after it.
//! `Lsa` is the tagged union the database stores and dispatches on.

pub mod adjacency_lsa;
pub mod coordinate_lsa;
pub mod name_lsa;

pub use adjacency_lsa::{AdjLsa, Adjacent};
pub use coordinate_lsa::CoordinateLsa;
pub use name_lsa::{NameLsa, NameLsaUpdate};

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::name::{Name, NameError};
use crate::tlv::{self, Block, Encoder, TlvError};

const EXPIRATION_FORMAT: &str = "%Y%m%dT%H%M%S%.6f";

/// Reasons a received advertisement is rejected as malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LsaError {
    #[error("Unexpected TLV type {tlv_type} in {context}")]
    UnexpectedType { context: &'static str, tlv_type: u64 },

    #[error("Missing required {0} field")]
    MissingField(&'static str),

    #[error("{0} entries are not in ascending canonical order")]
    NonCanonicalOrder(&'static str),

    #[error("Invalid expiration time {0:?}")]
    InvalidExpiration(String),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Tlv(#[from] TlvError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LsaType {
    Name,
    Adjacency,
    Coordinate,
}

impl fmt::Display for LsaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LsaType::Name => f.write_str("NAME"),
            LsaType::Adjacency => f.write_str("ADJACENCY"),
            LsaType::Coordinate => f.write_str("COORDINATE"),
        }
    }
}

/// Fields common to every advertisement kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LsaBase {
    pub origin: Name,
    pub seq_no: u64,
    pub expiration: DateTime<Utc>,
}

impl LsaBase {
    /// The expiration is kept at the microsecond precision of its wire form.
    pub fn new(origin: Name, seq_no: u64, expiration: DateTime<Utc>) -> Self {
        Self {
            origin,
            seq_no,
            expiration: expiration.trunc_subsecs(6),
        }
    }

    pub fn encode(&self, encoder: &mut Encoder) -> usize {
        let expiration = self.expiration.format(EXPIRATION_FORMAT).to_string();
        let mut length = encoder.prepend_block(tlv::EXPIRATION_TIME, expiration.as_bytes());
        length += encoder.prepend_non_negative_integer_block(tlv::SEQUENCE_NUMBER, self.seq_no);
        length += self.origin.encode(encoder);
        length + encoder.prepend_header(tlv::LSA, length)
    }

    pub fn from_block(block: &Block) -> Result<Self, LsaError> {
        if block.tlv_type() != tlv::LSA {
            return Err(LsaError::UnexpectedType { context: "Lsa", tlv_type: block.tlv_type() });
        }
        let elements = block.elements()?;
        let mut fields = elements.iter();

        let origin = match fields.next() {
            Some(element) if element.tlv_type() == tlv::NAME => Name::from_block(element)?,
            _ => return Err(LsaError::MissingField("Name")),
        };
        let seq_no = match fields.next() {
            Some(element) if element.tlv_type() == tlv::SEQUENCE_NUMBER => {
                tlv::read_non_negative_integer(element.value())?
            }
            _ => return Err(LsaError::MissingField("SequenceNumber")),
        };
        let expiration = match fields.next() {
            Some(element) if element.tlv_type() == tlv::EXPIRATION_TIME => {
                parse_expiration(element.value())?
            }
            _ => return Err(LsaError::MissingField("ExpirationTime")),
        };
        if let Some(extra) = fields.next() {
            return Err(LsaError::UnexpectedType { context: "Lsa", tlv_type: extra.tlv_type() });
        }

        Ok(Self { origin, seq_no, expiration })
    }
}

fn parse_expiration(value: &Bytes) -> Result<DateTime<Utc>, LsaError> {
    let text = std::str::from_utf8(value)
        .map_err(|_| LsaError::InvalidExpiration(String::from_utf8_lossy(value).into_owned()))?;
    NaiveDateTime::parse_from_str(text, "%Y%m%dT%H%M%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| LsaError::InvalidExpiration(text.to_string()))
}

impl fmt::Display for LsaBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Origin Router      : {}", self.origin)?;
        writeln!(f, "  Sequence Number    : {}", self.seq_no)?;
        writeln!(f, "  Expiration Point   : {}", self.expiration.format(EXPIRATION_FORMAT))
    }
}

/// Check the outer type of an advertisement record and decode its base
/// record, which must be the first child. Returns the remaining children.
pub(crate) fn decode_base(
    block: &Block,
    expected_type: u64,
    context: &'static str,
) -> Result<(LsaBase, Vec<Block>), LsaError> {
    if block.tlv_type() != expected_type {
        return Err(LsaError::UnexpectedType { context, tlv_type: block.tlv_type() });
    }
    let mut elements = block.elements()?.into_iter();
    let base = match elements.next() {
        Some(element) if element.tlv_type() == tlv::LSA => LsaBase::from_block(&element)?,
        _ => return Err(LsaError::MissingField("Lsa")),
    };
    Ok((base, elements.collect()))
}

/// Encoded form of an advertisement, kept until its content changes.
#[derive(Debug, Clone, Default)]
pub(crate) struct WireCache {
    bytes: Option<Bytes>,
    dirty: bool,
}

impl WireCache {
    pub(crate) fn from_wire(bytes: Bytes) -> Self {
        Self { bytes: Some(bytes), dirty: false }
    }

    pub(crate) fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn is_valid(&self) -> bool {
        !self.dirty && self.bytes.is_some()
    }

    pub(crate) fn get_or_encode(&mut self, encode: impl FnOnce() -> Bytes) -> Bytes {
        if let Some(bytes) = self.bytes.as_ref().filter(|_| !self.dirty) {
            return bytes.clone();
        }
        let bytes = encode();
        self.bytes = Some(bytes.clone());
        self.dirty = false;
        bytes
    }
}

/// Any advertisement the database can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum Lsa {
    Name(NameLsa),
    Adjacency(AdjLsa),
    Coordinate(CoordinateLsa),
}

impl Lsa {
    /// Decode a received record, choosing the kind from its outer type.
    pub fn from_wire(wire: Bytes) -> Result<Self, LsaError> {
        let block = Block::decode(wire)?;
        match block.tlv_type() {
            tlv::NAME_LSA => NameLsa::from_block(&block).map(Lsa::Name),
            tlv::ADJACENCY_LSA => AdjLsa::from_block(&block).map(Lsa::Adjacency),
            tlv::COORDINATE_LSA => CoordinateLsa::from_block(&block).map(Lsa::Coordinate),
            other => Err(LsaError::UnexpectedType { context: "Lsa", tlv_type: other }),
        }
    }

    pub fn base(&self) -> &LsaBase {
        match self {
            Lsa::Name(lsa) => lsa.base(),
            Lsa::Adjacency(lsa) => lsa.base(),
            Lsa::Coordinate(lsa) => lsa.base(),
        }
    }

    pub fn lsa_type(&self) -> LsaType {
        match self {
            Lsa::Name(_) => LsaType::Name,
            Lsa::Adjacency(_) => LsaType::Adjacency,
            Lsa::Coordinate(_) => LsaType::Coordinate,
        }
    }

    pub fn origin(&self) -> &Name {
        &self.base().origin
    }

    pub fn seq_no(&self) -> u64 {
        self.base().seq_no
    }

    pub fn wire_encode(&mut self) -> Bytes {
        match self {
            Lsa::Name(lsa) => lsa.wire_encode(),
            Lsa::Adjacency(lsa) => lsa.wire_encode(),
            Lsa::Coordinate(lsa) => lsa.wire_encode(),
        }
    }
}

impl fmt::Display for Lsa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LSA of type {}:", self.lsa_type())?;
        match self {
            Lsa::Name(lsa) => write!(f, "{}", lsa),
            Lsa::Adjacency(lsa) => write!(f, "{}", lsa),
            Lsa::Coordinate(lsa) => write!(f, "{}", lsa),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_base_record_wire() {
        let expiration = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let base = LsaBase::new("/ndn/router1".parse().unwrap(), 42, expiration);

        let mut encoder = Encoder::new();
        base.encode(&mut encoder);
        let block = Block::decode(encoder.finish()).unwrap();

        let elements = block.elements().unwrap();
        assert_eq!(elements[2].value().as_ref(), b"20240301T123000.000000");
        assert_eq!(LsaBase::from_block(&block).unwrap(), base);
    }

    #[test]
    fn test_base_record_requires_sequence_number() {
        let mut encoder = Encoder::new();
        let mut length = encoder.prepend_block(tlv::EXPIRATION_TIME, b"20240301T123000.000000");
        length += Name::new().encode(&mut encoder);
        encoder.prepend_header(tlv::LSA, length);

        let block = Block::decode(encoder.finish()).unwrap();
        assert_eq!(
            LsaBase::from_block(&block),
            Err(LsaError::MissingField("SequenceNumber"))
        );
    }

    #[test]
    fn test_base_record_rejects_bad_expiration() {
        let mut encoder = Encoder::new();
        let mut length = encoder.prepend_block(tlv::EXPIRATION_TIME, b"tomorrow");
        length += encoder.prepend_non_negative_integer_block(tlv::SEQUENCE_NUMBER, 1);
        length += Name::new().encode(&mut encoder);
        encoder.prepend_header(tlv::LSA, length);

        let block = Block::decode(encoder.finish()).unwrap();
        assert!(matches!(
            LsaBase::from_block(&block),
            Err(LsaError::InvalidExpiration(_))
        ));
    }

    #[test]
    fn test_from_wire_rejects_unknown_kind() {
        let err = Lsa::from_wire(Bytes::from_static(&[200, 0])).unwrap_err();
        assert_eq!(err, LsaError::UnexpectedType { context: "Lsa", tlv_type: 200 });
    }
}
