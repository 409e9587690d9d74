use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{LsaBase, LsaError, WireCache, decode_base};
use crate::name::Name;
use crate::tlv::{self, Block, Encoder};

/// A router's hyperbolic coordinates.
#[derive(Debug, Clone)]
pub struct CoordinateLsa {
    base: LsaBase,
    radius: f64,
    angles: Vec<f64>,
    wire: WireCache,
}

impl CoordinateLsa {
    pub fn new(
        origin: Name,
        seq_no: u64,
        expiration: DateTime<Utc>,
        radius: f64,
        angles: Vec<f64>,
    ) -> Self {
        Self {
            base: LsaBase::new(origin, seq_no, expiration),
            radius,
            angles,
            wire: WireCache::default(),
        }
    }

    pub fn from_block(block: &Block) -> Result<Self, LsaError> {
        let (base, entries) = decode_base(block, tlv::COORDINATE_LSA, "CoordinateLsa")?;
        let mut entries = entries.iter();

        let radius = match entries.next() {
            Some(entry) if entry.tlv_type() == tlv::HYPERBOLIC_RADIUS => {
                tlv::read_double(entry.value())?
            }
            _ => return Err(LsaError::MissingField("HyperbolicRadius")),
        };
        let angles = entries
            .map(|entry| match entry.tlv_type() {
                tlv::HYPERBOLIC_ANGLE => tlv::read_double(entry.value()).map_err(LsaError::from),
                other => Err(LsaError::UnexpectedType {
                    context: "CoordinateLsa",
                    tlv_type: other,
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if angles.is_empty() {
            return Err(LsaError::MissingField("HyperbolicAngle"));
        }

        Ok(Self {
            base,
            radius,
            angles,
            wire: WireCache::from_wire(block.wire().clone()),
        })
    }

    pub fn wire_encode(&mut self) -> Bytes {
        let (base, radius, angles) = (&self.base, self.radius, &self.angles);
        self.wire.get_or_encode(|| {
            let mut encoder = Encoder::new();
            let mut length = 0;
            for angle in angles.iter().rev() {
                length += encoder.prepend_double_block(tlv::HYPERBOLIC_ANGLE, *angle);
            }
            length += encoder.prepend_double_block(tlv::HYPERBOLIC_RADIUS, radius);
            length += base.encode(&mut encoder);
            encoder.prepend_header(tlv::COORDINATE_LSA, length);
            encoder.finish()
        })
    }

    pub fn base(&self) -> &LsaBase {
        &self.base
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    pub(crate) fn set_base(&mut self, seq_no: u64, expiration: DateTime<Utc>) {
        self.base = LsaBase::new(self.base.origin.clone(), seq_no, expiration);
        self.wire.invalidate();
    }

    /// Take `incoming`'s coordinates. Returns whether they moved.
    pub fn update(&mut self, incoming: &CoordinateLsa) -> bool {
        if self.radius == incoming.radius && self.angles == incoming.angles {
            return false;
        }
        self.radius = incoming.radius;
        self.angles = incoming.angles.clone();
        self.wire.invalidate();
        true
    }
}

impl PartialEq for CoordinateLsa {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.radius == other.radius && self.angles == other.angles
    }
}

impl fmt::Display for CoordinateLsa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        writeln!(f, "      Hyperbolic Radius  : {}", self.radius)?;
        for (i, angle) in self.angles.iter().enumerate() {
            writeln!(f, "      Hyperbolic Theta {} : {}", i, angle)?;
        }
        Ok(())
    }
}
