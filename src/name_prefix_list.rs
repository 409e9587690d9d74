use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lsa::LsaError;
use crate::name::Name;
use crate::tlv::{self, Block, Encoder};

/// One advertised prefix with its routing cost. Ordered by `(name, cost)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PrefixCost {
    pub name: Name,
    pub cost: u64,
}

impl PrefixCost {
    pub fn new(name: Name, cost: u64) -> Self {
        Self { name, cost }
    }

    pub fn encode(&self, encoder: &mut Encoder) -> usize {
        let mut length = encoder.prepend_non_negative_integer_block(tlv::COST, self.cost);
        length += self.name.encode(encoder);
        length + encoder.prepend_header(tlv::PREFIX_COST, length)
    }

    pub fn from_block(block: &Block) -> Result<Self, LsaError> {
        decode_name_cost(block, tlv::PREFIX_COST, "PrefixCost")
            .map(|(name, cost)| Self { name, cost })
    }
}

impl fmt::Display for PrefixCost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cost {}", self.name, self.cost)
    }
}

/// Decode a `Name` followed by a `Cost` inside a record of type `tlv_type`.
pub(crate) fn decode_name_cost(
    block: &Block,
    tlv_type: u64,
    context: &'static str,
) -> Result<(Name, u64), LsaError> {
    if block.tlv_type() != tlv_type {
        return Err(LsaError::UnexpectedType { context, tlv_type: block.tlv_type() });
    }
    let elements = block.elements()?;
    let mut fields = elements.iter();

    let name = match fields.next() {
        Some(element) if element.tlv_type() == tlv::NAME => Name::from_block(element)?,
        _ => return Err(LsaError::MissingField("Name")),
    };
    let cost = match fields.next() {
        Some(element) if element.tlv_type() == tlv::COST => {
            tlv::read_non_negative_integer(element.value())?
        }
        _ => return Err(LsaError::MissingField("Cost")),
    };
    if let Some(extra) = fields.next() {
        return Err(LsaError::UnexpectedType { context, tlv_type: extra.tlv_type() });
    }
    Ok((name, cost))
}

/// Ordered, deduplicated set of `(name, cost)` pairs originated by a router.
///
/// Insertion is keyed on the full pair, so the same name may appear with
/// several costs. `erase` drops all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamePrefixList {
    entries: BTreeSet<PrefixCost>,
}

impl NamePrefixList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the pair was not already present.
    pub fn insert(&mut self, name: Name, cost: u64) -> bool {
        self.entries.insert(PrefixCost::new(name, cost))
    }

    pub fn insert_pair(&mut self, pair: PrefixCost) -> bool {
        self.entries.insert(pair)
    }

    /// Remove every entry for `name`. Returns true if anything was removed.
    pub fn erase(&mut self, name: &Name) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| &entry.name != name);
        self.entries.len() != before
    }

    pub fn remove_pair(&mut self, pair: &PrefixCost) -> bool {
        self.entries.remove(pair)
    }

    pub fn contains(&self, pair: &PrefixCost) -> bool {
        self.entries.contains(pair)
    }

    pub fn contains_name(&self, name: &Name) -> bool {
        self.entries.iter().any(|entry| &entry.name == name)
    }

    /// Entries in ascending `(name, cost)` order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PrefixCost> + '_ {
        self.entries.iter()
    }

    pub fn names(&self) -> Vec<&Name> {
        self.entries.iter().map(|entry| &entry.name).collect()
    }

    pub fn last(&self) -> Option<&PrefixCost> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<PrefixCost> for NamePrefixList {
    fn from_iter<T: IntoIterator<Item = PrefixCost>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a NamePrefixList {
    type Item = &'a PrefixCost;
    type IntoIter = std::collections::btree_set::Iter<'a, PrefixCost>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(uri: &str) -> Name {
        uri.parse().unwrap()
    }

    #[test]
    fn test_insert_is_keyed_on_pair() {
        let mut npl = NamePrefixList::new();
        assert!(npl.insert(name("/a"), 10));
        assert!(!npl.insert(name("/a"), 10));
        assert!(npl.insert(name("/a"), 20));
        assert_eq!(npl.len(), 2);
    }

    #[test]
    fn test_erase_removes_every_cost() {
        let mut npl = NamePrefixList::new();
        npl.insert(name("/a"), 10);
        npl.insert(name("/a"), 20);
        npl.insert(name("/b"), 5);

        assert!(npl.erase(&name("/a")));
        assert!(!npl.erase(&name("/a")));
        assert_eq!(npl.names(), vec![&name("/b")]);
    }

    #[test]
    fn test_iteration_is_canonical() {
        let npl: NamePrefixList = vec![
            PrefixCost::new(name("/c"), 3),
            PrefixCost::new(name("/a"), 9),
            PrefixCost::new(name("/a"), 1),
        ]
        .into_iter()
        .collect();

        let order: Vec<String> = npl.iter().map(ToString::to_string).collect();
        assert_eq!(order, vec!["/a cost 1", "/a cost 9", "/c cost 3"]);
    }

    #[test]
    fn test_prefix_cost_wire() {
        let pair = PrefixCost::new(name("/a"), 7);
        let mut encoder = Encoder::new();
        pair.encode(&mut encoder);
        let wire = encoder.finish();
        assert_eq!(&wire[..], &[150, 8, 7, 3, 8, 1, b'a', 140, 1, 7]);

        let block = Block::decode(wire).unwrap();
        assert_eq!(PrefixCost::from_block(&block).unwrap(), pair);
    }

    #[test]
    fn test_prefix_cost_requires_cost() {
        let block = Block::decode(bytes::Bytes::from_static(&[150, 5, 7, 3, 8, 1, b'a'])).unwrap();
        assert!(matches!(
            PrefixCost::from_block(&block),
            Err(LsaError::MissingField("Cost"))
        ));
    }
}
