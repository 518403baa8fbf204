//! Tip discovery.

use crate::{KeyKind, KeyScheme, ReplicaError};
use alloy_primitives::B256;
use ferry_store::StoreReader;
use std::ops::ControlFlow;
use tracing::{debug, info, trace};

/// Finds the highest block number with a canonical mapping in a store.
///
/// The policy is highest-present: gaps below the tip are tolerated. Every key under the
/// scheme's canonical scan prefix is decoded. Keys of other kinds sharing the prefix, and
/// foreign keys that do not decode at all (hash-keyed trie nodes whose first byte happens
/// to match the marker), are skipped. Only store failures abort the scan.
#[derive(Debug)]
pub struct TipFinder<'a, S: ?Sized> {
    store: &'a S,
    scheme: &'a KeyScheme,
}

impl<'a, S> TipFinder<'a, S>
where
    S: StoreReader + ?Sized,
{
    /// Creates a tip finder over `store`.
    pub const fn new(store: &'a S, scheme: &'a KeyScheme) -> Self {
        Self { store, scheme }
    }

    /// Returns the highest block number with a canonical mapping, or `0` if there is none.
    pub fn find(&self) -> Result<u64, ReplicaError> {
        Ok(self.find_with_hash()?.map_or(0, |(number, _)| number))
    }

    /// Returns the highest canonical block number together with its hash.
    pub fn find_with_hash(&self) -> Result<Option<(u64, B256)>, ReplicaError> {
        let mut tip: Option<(u64, Vec<u8>)> = None;
        let (scanned, skipped) = self.scan(|number, value| {
            if tip.as_ref().is_none_or(|(highest, _)| number > *highest) {
                tip = Some((number, value.to_vec()));
            }
            ControlFlow::Continue(())
        })?;

        let Some((number, value)) = tip else {
            info!(target: "ferry::tip", scanned, skipped, "No canonical mappings found");
            return Ok(None);
        };
        let hash = B256::try_from(value.as_slice()).map_err(|_| {
            ReplicaError::MalformedCanonical { number, len: value.len(), last_flushed: None }
        })?;
        info!(target: "ferry::tip", scanned, skipped, tip = number, %hash, "Found chain tip");
        Ok(Some((number, hash)))
    }

    /// Returns the highest `n` such that every block in `0..=n` has a canonical mapping.
    ///
    /// Diagnostic only. Range resolution always uses [`TipFinder::find`].
    pub fn contiguous_tip(&self) -> Result<Option<u64>, ReplicaError> {
        let mut next = 0u64;
        self.scan(|number, _| {
            if number != next {
                return ControlFlow::Break(());
            }
            next += 1;
            ControlFlow::Continue(())
        })?;
        let tip = next.checked_sub(1);
        debug!(target: "ferry::tip", ?tip, "Found contiguous tip");
        Ok(tip)
    }

    /// Visits canonical mappings in ascending key order. Returns the number of keys
    /// scanned and how many of them did not decode.
    fn scan(
        &self,
        mut visit: impl FnMut(u64, &[u8]) -> ControlFlow<()>,
    ) -> Result<(u64, u64), ReplicaError> {
        let prefix = self.scheme.canonical_scan_prefix();
        let (mut scanned, mut skipped) = (0u64, 0u64);
        for entry in self.store.iter_prefix(&prefix).map_err(ReplicaError::Tip)? {
            let (key, value) = entry.map_err(ReplicaError::Tip)?;
            scanned += 1;
            let decoded = match self.scheme.decode(&key) {
                Ok(decoded) => decoded,
                Err(err) => {
                    skipped += 1;
                    trace!(target: "ferry::tip", %err, "Skipping foreign key");
                    continue;
                }
            };
            if decoded.kind != KeyKind::Canonical {
                continue;
            }
            let Some(number) = decoded.number else { continue };
            if visit(number, &value).is_break() {
                break;
            }
        }
        if skipped > 0 {
            debug!(target: "ferry::tip", skipped, "Ignored undecodable keys under the canonical prefix");
        }
        Ok((scanned, skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{KeyLayout, test_utils::seed_block};
    use ferry_store::MemoryStore;
    use rstest::rstest;

    fn seeded(scheme: &KeyScheme, numbers: &[u64]) -> MemoryStore {
        let store = MemoryStore::new();
        for number in numbers {
            seed_block(&store, scheme, *number, &KeyKind::BLOCK_RECORDS);
        }
        store
    }

    #[rstest]
    #[case::byte_prefix(KeyLayout::BytePrefix)]
    #[case::ascii_number_first(KeyLayout::AsciiNumberFirst)]
    #[case::ascii_hash_first(KeyLayout::AsciiHashFirst)]
    fn test_highest_present_with_gaps(#[case] layout: KeyLayout) {
        let scheme = KeyScheme::new(layout);
        let store = seeded(&scheme, &[0, 1, 2, 5, 6]);
        let finder = TipFinder::new(&store, &scheme);

        assert_eq!(finder.find().unwrap(), 6);
        assert_eq!(finder.contiguous_tip().unwrap(), Some(2));
        let (number, hash) = finder.find_with_hash().unwrap().unwrap();
        assert_eq!(number, 6);
        assert_eq!(hash, crate::test_utils::block_hash(6));
    }

    #[test]
    fn test_empty_store_tip_is_zero() {
        let scheme = KeyScheme::new(KeyLayout::BytePrefix);
        let store = MemoryStore::new();
        let finder = TipFinder::new(&store, &scheme);
        assert_eq!(finder.find().unwrap(), 0);
        assert_eq!(finder.find_with_hash().unwrap(), None);
        assert_eq!(finder.contiguous_tip().unwrap(), None);
    }

    #[test]
    fn test_missing_genesis_has_no_contiguous_tip() {
        let scheme = KeyScheme::new(KeyLayout::AsciiNumberFirst);
        let store = seeded(&scheme, &[3, 4]);
        let finder = TipFinder::new(&store, &scheme);
        assert_eq!(finder.find().unwrap(), 4);
        assert_eq!(finder.contiguous_tip().unwrap(), None);
    }

    #[test]
    fn test_large_numbers_sort_by_height() {
        let scheme = KeyScheme::new(KeyLayout::BytePrefix);
        let store = seeded(&scheme, &[255, 256, 70_000]);
        assert_eq!(TipFinder::new(&store, &scheme).find().unwrap(), 70_000);
    }

    #[test]
    fn test_namespace_hides_foreign_keys() {
        let scheme = KeyScheme::new(KeyLayout::BytePrefix).with_namespace(vec![0xaa; 4]);
        let store = seeded(&scheme, &[1, 2]);
        seed_block(&store, &KeyScheme::new(KeyLayout::BytePrefix), 90, &[]);
        assert_eq!(TipFinder::new(&store, &scheme).find().unwrap(), 2);
    }

    #[rstest]
    #[case::byte_prefix(KeyLayout::BytePrefix)]
    #[case::ascii_number_first(KeyLayout::AsciiNumberFirst)]
    #[case::ascii_hash_first(KeyLayout::AsciiHashFirst)]
    fn test_trie_node_under_marker_is_ignored(#[case] layout: KeyLayout) {
        let scheme = KeyScheme::new(layout);
        let store = seeded(&scheme, &[0, 1, 2, 3, 4, 5]);
        let mut node = scheme.canonical_scan_prefix();
        node.resize(32, 0x5a);
        store.insert(node, vec![0xf8, 0x51, 0x80]);
        store.insert(vec![scheme.canonical_scan_prefix()[0], 0x01], vec![0x00; 32]);

        let finder = TipFinder::new(&store, &scheme);
        assert_eq!(finder.find().unwrap(), 5);
        assert_eq!(finder.contiguous_tip().unwrap(), Some(5));
    }

    #[test]
    fn test_malformed_tip_hash() {
        let scheme = KeyScheme::new(KeyLayout::AsciiHashFirst);
        let store = seeded(&scheme, &[0]);
        store.insert(scheme.canonical_key(1), vec![0x01; 3]);
        let finder = TipFinder::new(&store, &scheme);
        assert_eq!(finder.find_with_hash().unwrap_err().to_string(), "canonical hash of block 1 is 3 bytes, expected 32");
    }
}
