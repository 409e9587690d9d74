use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{LsaBase, LsaError, WireCache, decode_base};
use crate::name::Name;
use crate::name_prefix_list::decode_name_cost;
use crate::tlv::{self, Block, Encoder};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjacent {
    pub name: Name,
    pub cost: u64,
}

/// A router's links to its neighbours. One cost per neighbour.
#[derive(Debug, Clone)]
pub struct AdjLsa {
    base: LsaBase,
    adjacencies: BTreeMap<Name, u64>,
    wire: WireCache,
}

impl AdjLsa {
    pub fn new(
        origin: Name,
        seq_no: u64,
        expiration: DateTime<Utc>,
        adjacencies: impl IntoIterator<Item = Adjacent>,
    ) -> Self {
        Self {
            base: LsaBase::new(origin, seq_no, expiration),
            adjacencies: adjacencies
                .into_iter()
                .map(|adjacent| (adjacent.name, adjacent.cost))
                .collect(),
            wire: WireCache::default(),
        }
    }

    pub fn from_block(block: &Block) -> Result<Self, LsaError> {
        let (base, entries) = decode_base(block, tlv::ADJACENCY_LSA, "AdjacencyLsa")?;

        let mut adjacencies = BTreeMap::new();
        for entry in &entries {
            if entry.tlv_type() != tlv::ADJACENCY {
                return Err(LsaError::UnexpectedType {
                    context: "AdjacencyLsa",
                    tlv_type: entry.tlv_type(),
                });
            }
            let (name, cost) = decode_name_cost(entry, tlv::ADJACENCY, "Adjacency")?;
            if adjacencies.last_key_value().is_some_and(|(last, _)| *last >= name) {
                return Err(LsaError::NonCanonicalOrder("Adjacency"));
            }
            adjacencies.insert(name, cost);
        }

        Ok(Self {
            base,
            adjacencies,
            wire: WireCache::from_wire(block.wire().clone()),
        })
    }

    pub fn wire_encode(&mut self) -> Bytes {
        let (base, adjacencies) = (&self.base, &self.adjacencies);
        self.wire.get_or_encode(|| {
            let mut encoder = Encoder::new();
            let mut length = 0;
            for (name, cost) in adjacencies.iter().rev() {
                let mut entry = encoder.prepend_non_negative_integer_block(tlv::COST, *cost);
                entry += name.encode(&mut encoder);
                length += entry + encoder.prepend_header(tlv::ADJACENCY, entry);
            }
            length += base.encode(&mut encoder);
            encoder.prepend_header(tlv::ADJACENCY_LSA, length);
            encoder.finish()
        })
    }

    pub fn base(&self) -> &LsaBase {
        &self.base
    }

    pub fn adjacencies(&self) -> impl Iterator<Item = Adjacent> + '_ {
        self.adjacencies.iter().map(|(name, cost)| Adjacent {
            name: name.clone(),
            cost: *cost,
        })
    }

    pub(crate) fn set_base(&mut self, seq_no: u64, expiration: DateTime<Utc>) {
        self.base = LsaBase::new(self.base.origin.clone(), seq_no, expiration);
        self.wire.invalidate();
    }

    /// Replace the adjacency list with `incoming`'s. Returns whether it differed.
    pub fn update(&mut self, incoming: &AdjLsa) -> bool {
        if self.adjacencies == incoming.adjacencies {
            return false;
        }
        self.adjacencies = incoming.adjacencies.clone();
        self.wire.invalidate();
        true
    }
}

impl PartialEq for AdjLsa {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.adjacencies == other.adjacencies
    }
}

impl fmt::Display for AdjLsa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        writeln!(f, "      Adjacents:")?;
        for (i, (name, cost)) in self.adjacencies.iter().enumerate() {
            writeln!(f, "        Adjacent {}: {} cost {}", i, name, cost)?;
        }
        Ok(())
    }
}
