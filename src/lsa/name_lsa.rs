use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use super::{LsaBase, LsaError, WireCache, decode_base};
use crate::name::Name;
use crate::name_prefix_list::{NamePrefixList, PrefixCost};
use crate::tlv::{self, Block, Encoder};

/// A router's advertised name prefixes and their costs.
#[derive(Debug, Clone)]
pub struct NameLsa {
    base: LsaBase,
    npl: NamePrefixList,
    wire: WireCache,
}

/// Result of merging a newer Name LSA into the stored one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameLsaUpdate {
    pub changed: bool,
    pub added: Vec<PrefixCost>,
    pub removed: Vec<PrefixCost>,
}

impl NameLsa {
    pub fn new(
        origin: Name,
        seq_no: u64,
        expiration: DateTime<Utc>,
        npl: &NamePrefixList,
    ) -> Self {
        Self {
            base: LsaBase::new(origin, seq_no, expiration),
            npl: npl.clone(),
            wire: WireCache::default(),
        }
    }

    pub fn from_wire(wire: Bytes) -> Result<Self, LsaError> {
        Self::from_block(&Block::decode(wire)?)
    }

    /// Decode a Name LSA record. The received bytes become the wire cache,
    /// so re-encoding an untouched LSA gives back exactly what arrived.
    pub fn from_block(block: &Block) -> Result<Self, LsaError> {
        let (base, entries) = decode_base(block, tlv::NAME_LSA, "NameLsa")?;

        let mut npl = NamePrefixList::new();
        for entry in &entries {
            if entry.tlv_type() != tlv::PREFIX_COST {
                return Err(LsaError::UnexpectedType {
                    context: "NameLsa",
                    tlv_type: entry.tlv_type(),
                });
            }
            let pair = PrefixCost::from_block(entry)?;
            // Entries must arrive strictly ascending; anything else would
            // make the cached bytes disagree with a fresh encoding.
            if npl.last().is_some_and(|last| *last >= pair) {
                return Err(LsaError::NonCanonicalOrder("PrefixCost"));
            }
            npl.insert_pair(pair);
        }

        Ok(Self {
            base,
            npl,
            wire: WireCache::from_wire(block.wire().clone()),
        })
    }

    pub fn wire_encode(&mut self) -> Bytes {
        let (base, npl) = (&self.base, &self.npl);
        self.wire.get_or_encode(|| {
            let mut encoder = Encoder::new();
            let mut length = 0;
            // Prepending in descending order leaves the entries ascending on the wire.
            for pair in npl.iter().rev() {
                length += pair.encode(&mut encoder);
            }
            length += base.encode(&mut encoder);
            encoder.prepend_header(tlv::NAME_LSA, length);
            encoder.finish()
        })
    }

    pub fn has_cached_wire(&self) -> bool {
        self.wire.is_valid()
    }

    pub fn base(&self) -> &LsaBase {
        &self.base
    }

    pub fn origin(&self) -> &Name {
        &self.base.origin
    }

    pub fn seq_no(&self) -> u64 {
        self.base.seq_no
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.base.expiration
    }

    pub(crate) fn set_base(&mut self, seq_no: u64, expiration: DateTime<Utc>) {
        self.base = LsaBase::new(self.base.origin.clone(), seq_no, expiration);
        self.wire.invalidate();
    }

    pub fn npl(&self) -> &NamePrefixList {
        &self.npl
    }

    pub fn add_name(&mut self, pair: PrefixCost) -> bool {
        let inserted = self.npl.insert_pair(pair);
        if inserted {
            self.wire.invalidate();
        }
        inserted
    }

    pub fn remove_name(&mut self, pair: &PrefixCost) -> bool {
        let removed = self.npl.remove_pair(pair);
        if removed {
            self.wire.invalidate();
        }
        removed
    }

    /// Bring this LSA's prefixes in line with `incoming` and report what moved.
    ///
    /// The caller has already decided `incoming` is newer; sequence number
    /// and expiration are left for it to copy over.
    pub fn update(&mut self, incoming: &NameLsa) -> NameLsaUpdate {
        let added = sorted_difference(incoming.npl.iter(), self.npl.iter());
        let removed = sorted_difference(self.npl.iter(), incoming.npl.iter());

        for pair in &added {
            self.add_name(pair.clone());
        }
        for pair in &removed {
            self.remove_name(pair);
        }

        NameLsaUpdate {
            changed: !added.is_empty() || !removed.is_empty(),
            added,
            removed,
        }
    }
}

/// Elements of `left` missing from `right`, both ascending. Linear in the
/// combined length.
fn sorted_difference<'a>(
    left: impl Iterator<Item = &'a PrefixCost>,
    right: impl Iterator<Item = &'a PrefixCost>,
) -> Vec<PrefixCost> {
    let mut right = right.peekable();
    let mut difference = Vec::new();
    for item in left {
        while right.next_if(|candidate| *candidate < item).is_some() {}
        if right.peek() != Some(&item) {
            difference.push(item.clone());
        }
    }
    difference
}

impl PartialEq for NameLsa {
    fn eq(&self, other: &Self) -> bool {
        self.base == other.base && self.npl == other.npl
    }
}

impl fmt::Display for NameLsa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        writeln!(f, "      Names:")?;
        for (i, pair) in self.npl.iter().enumerate() {
            writeln!(f, "        Name {}: {}", i, pair)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::Component;
    use chrono::TimeZone;

    fn name(uri: &str) -> Name {
        uri.parse().unwrap()
    }

    fn npl(pairs: &[(&str, u64)]) -> NamePrefixList {
        pairs
            .iter()
            .map(|(uri, cost)| PrefixCost::new(name(uri), *cost))
            .collect()
    }

    fn lsa(pairs: &[(&str, u64)]) -> NameLsa {
        let expiration = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        NameLsa::new(name("/ndn/site/%C1.Router/r1"), 7, expiration, &npl(pairs))
    }

    fn base_record() -> (Encoder, usize) {
        let mut encoder = Encoder::new();
        let length = lsa(&[]).base().encode(&mut encoder);
        (encoder, length)
    }

    #[test]
    fn test_round_trip() {
        for pairs in [&[][..], &[("/a", 1), ("/b/c", 20), ("/a", 5)][..]] {
            let mut built = lsa(pairs);
            let decoded = NameLsa::from_wire(built.wire_encode()).unwrap();
            assert_eq!(decoded.origin(), built.origin());
            assert_eq!(decoded.seq_no(), 7);
            assert_eq!(decoded.expiration(), built.expiration());
            assert_eq!(decoded.npl(), built.npl());
        }
    }

    #[test]
    fn test_encoding_is_deterministic_and_ascending() {
        let mut first = lsa(&[("/b", 2), ("/a", 1)]);
        let mut second = lsa(&[("/a", 1), ("/b", 2)]);
        let wire = first.wire_encode();
        assert_eq!(wire, second.wire_encode());

        let children = Block::decode(wire).unwrap().elements().unwrap();
        assert_eq!(children[0].tlv_type(), tlv::LSA);
        let prefixes: Vec<PrefixCost> = children[1..]
            .iter()
            .map(|child| PrefixCost::from_block(child).unwrap())
            .collect();
        assert_eq!(
            prefixes,
            vec![PrefixCost::new(name("/a"), 1), PrefixCost::new(name("/b"), 2)]
        );
    }

    #[test]
    fn test_decode_keeps_received_bytes() {
        let wire = lsa(&[("/a", 1)]).wire_encode();
        let mut decoded = NameLsa::from_wire(wire.clone()).unwrap();
        assert!(decoded.has_cached_wire());
        assert_eq!(decoded.wire_encode(), wire);
    }

    #[test]
    fn test_mutation_invalidates_cache() {
        let mut lsa = lsa(&[("/a", 1)]);
        let before = lsa.wire_encode();
        assert!(lsa.has_cached_wire());

        assert!(lsa.add_name(PrefixCost::new(name("/z"), 3)));
        assert!(!lsa.has_cached_wire());
        let after = lsa.wire_encode();
        assert_ne!(before, after);
        assert_eq!(NameLsa::from_wire(after).unwrap().npl().len(), 2);

        assert!(!lsa.add_name(PrefixCost::new(name("/z"), 3)));
        assert!(lsa.has_cached_wire());
    }

    #[test]
    fn test_decode_rejects_wrong_outer_type() {
        let (mut encoder, length) = base_record();
        encoder.prepend_header(tlv::ADJACENCY_LSA, length);
        assert_eq!(
            NameLsa::from_wire(encoder.finish()).unwrap_err(),
            LsaError::UnexpectedType { context: "NameLsa", tlv_type: tlv::ADJACENCY_LSA }
        );
    }

    #[test]
    fn test_decode_rejects_missing_base() {
        let mut encoder = Encoder::new();
        let length = PrefixCost::new(name("/a"), 1).encode(&mut encoder);
        encoder.prepend_header(tlv::NAME_LSA, length);
        assert_eq!(
            NameLsa::from_wire(encoder.finish()).unwrap_err(),
            LsaError::MissingField("Lsa")
        );

        let mut encoder = Encoder::new();
        encoder.prepend_header(tlv::NAME_LSA, 0);
        assert_eq!(
            NameLsa::from_wire(encoder.finish()).unwrap_err(),
            LsaError::MissingField("Lsa")
        );
    }

    #[test]
    fn test_decode_rejects_unknown_child() {
        let mut encoder = Encoder::new();
        let mut length = encoder.prepend_block(tlv::ADJACENCY, &[]);
        length += lsa(&[]).base().encode(&mut encoder);
        encoder.prepend_header(tlv::NAME_LSA, length);
        assert_eq!(
            NameLsa::from_wire(encoder.finish()).unwrap_err(),
            LsaError::UnexpectedType { context: "NameLsa", tlv_type: tlv::ADJACENCY }
        );
    }

    #[test]
    fn test_decode_accepts_typed_name_components() {
        let mut prefix = name("/ndn/app");
        prefix.push(Component::typed(54, vec![1, 2, 3]));

        let mut encoder = Encoder::new();
        let mut length = PrefixCost::new(prefix.clone(), 4).encode(&mut encoder);
        length += lsa(&[]).base().encode(&mut encoder);
        encoder.prepend_header(tlv::NAME_LSA, length);
        let wire = encoder.finish();

        let mut decoded = NameLsa::from_wire(wire.clone()).unwrap();
        assert_eq!(decoded.npl().names(), vec![&prefix]);
        assert_eq!(decoded.npl().names()[0].to_string(), "/ndn/app/54=%01%02%03");

        decoded.add_name(PrefixCost::new(name("/ndn/zzz"), 1));
        let rebuilt = NameLsa::from_wire(decoded.wire_encode()).unwrap();
        assert!(rebuilt.npl().contains_name(&prefix));
    }

    #[test]
    fn test_decode_rejects_out_of_order_prefixes() {
        let mut encoder = Encoder::new();
        let mut length = PrefixCost::new(name("/a"), 1).encode(&mut encoder);
        length += PrefixCost::new(name("/b"), 1).encode(&mut encoder);
        length += lsa(&[]).base().encode(&mut encoder);
        encoder.prepend_header(tlv::NAME_LSA, length);
        assert_eq!(
            NameLsa::from_wire(encoder.finish()).unwrap_err(),
            LsaError::NonCanonicalOrder("PrefixCost")
        );
    }

    #[test]
    fn test_decode_rejects_duplicate_prefixes() {
        let (mut encoder, mut length) = (Encoder::new(), 0);
        for _ in 0..2 {
            length += PrefixCost::new(name("/a"), 1).encode(&mut encoder);
        }
        length += lsa(&[]).base().encode(&mut encoder);
        encoder.prepend_header(tlv::NAME_LSA, length);
        assert_eq!(
            NameLsa::from_wire(encoder.finish()).unwrap_err(),
            LsaError::NonCanonicalOrder("PrefixCost")
        );
    }

    #[test]
    fn test_update_reports_minimal_diff() {
        let mut stored = lsa(&[("/a", 1), ("/b", 2)]);
        stored.wire_encode();
        let incoming = lsa(&[("/b", 2), ("/c", 3)]);

        let update = stored.update(&incoming);
        assert!(update.changed);
        assert_eq!(update.added, vec![PrefixCost::new(name("/c"), 3)]);
        assert_eq!(update.removed, vec![PrefixCost::new(name("/a"), 1)]);
        assert_eq!(stored.npl(), incoming.npl());
        assert!(!stored.has_cached_wire());
    }

    #[test]
    fn test_update_treats_cost_change_as_replace() {
        let mut stored = lsa(&[("/a", 1)]);
        let update = stored.update(&lsa(&[("/a", 4)]));
        assert_eq!(update.added, vec![PrefixCost::new(name("/a"), 4)]);
        assert_eq!(update.removed, vec![PrefixCost::new(name("/a"), 1)]);
    }

    #[test]
    fn test_update_without_change() {
        let mut stored = lsa(&[("/a", 1), ("/b", 2)]);
        let wire = stored.wire_encode();
        let before = stored.clone();

        let update = stored.update(&lsa(&[("/b", 2), ("/a", 1)]));
        assert_eq!(update, NameLsaUpdate::default());
        assert_eq!(stored, before);
        assert_eq!(stored.wire_encode(), wire);
    }

    #[test]
    fn test_render_lists_names_from_zero() {
        let rendered = lsa(&[("/a", 1), ("/b", 2)]).to_string();
        assert!(rendered.contains("Origin Router      : /ndn/site/%C1.Router/r1"));
        assert!(rendered.contains("        Name 0: /a cost 1\n"));
        assert!(rendered.contains("        Name 1: /b cost 2\n"));
    }
}
