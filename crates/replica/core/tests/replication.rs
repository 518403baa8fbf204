//! End-to-end replication runs against in-memory and RocksDB stores.

use alloy_primitives::B256;
use ferry_replica::{
    BulkPrefix, KeyBytes, KeyKind, KeyLayout, KeyScheme, ReplicaConfig, ReplicaError, Replicator,
    Stage,
};
use ferry_store::{MemoryStore, RocksStore, StoreError, StoreReader, StoreWriter, WriteBatch};
use rstest::rstest;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn hash_of(number: u64) -> B256 {
    let mut hash = B256::repeat_byte(0x7e);
    hash[..8].copy_from_slice(&number.to_be_bytes());
    hash
}

/// Writes a full block at `number` and returns its hash.
fn put_block<W: StoreWriter + ?Sized>(store: &W, scheme: &KeyScheme, number: u64) -> B256 {
    let hash = hash_of(number);
    let mut batch = WriteBatch::new();
    batch.put(scheme.canonical_key(number), hash.to_vec());
    batch.put(scheme.hash_to_number_key(&hash), number.to_be_bytes().to_vec());
    for kind in KeyKind::BLOCK_RECORDS {
        batch.put(scheme.encode(kind, number, &hash), format!("{kind} of {number}").into_bytes());
    }
    store.write_batch(&batch).unwrap();
    hash
}

fn chain(scheme: &KeyScheme, numbers: impl IntoIterator<Item = u64>) -> MemoryStore {
    let store = MemoryStore::new();
    for number in numbers {
        put_block(&store, scheme, number);
    }
    store
}

#[rstest]
#[case::byte_prefix(KeyLayout::BytePrefix)]
#[case::ascii_number_first(KeyLayout::AsciiNumberFirst)]
#[case::ascii_hash_first(KeyLayout::AsciiHashFirst)]
fn test_end_to_end(#[case] layout: KeyLayout, #[values(None, Some(5))] end_block: Option<u64>) {
    let scheme = KeyScheme::new(layout);
    let source = chain(&scheme, 0..=5);
    source.insert(vec![0x00, 0x01, 0x02], b"trie node".to_vec());
    source.insert(b"c\x01".to_vec(), b"code".to_vec());
    source.insert(b"LastBlock".to_vec(), hash_of(5).to_vec());
    source.insert(b"LastHeader".to_vec(), hash_of(5).to_vec());
    let dest = MemoryStore::new();

    let mut config = ReplicaConfig::new(scheme.clone());
    config.batch_size = 2;
    config.end_block = end_block;
    config.head_pointer_keys = vec![KeyBytes::from("LastBlock"), KeyBytes::from("LastHeader")];

    let outcome = Replicator::new(&source, &dest, &config).run().unwrap();

    assert_eq!(outcome.range, 0..=5);
    assert_eq!(outcome.tip_discovered, end_block.is_none());
    assert_eq!(outcome.replay.blocks_processed, 6);
    assert_eq!(outcome.replay.blocks_written, 6);
    assert_eq!(outcome.replay.blocks_complete, 6);
    assert_eq!(outcome.replay.last_flushed, Some(5));
    assert_eq!(outcome.entries_for("state"), Some(1));
    assert_eq!(outcome.entries_for("code"), Some(1));
    assert_eq!(outcome.metadata.singletons, 2);

    let heights: Vec<_> = outcome.verification.heights.iter().map(|h| h.number).collect();
    assert_eq!(heights, [0, 5]);
    assert!(outcome.verification.passed());
    assert_eq!(dest.snapshot(), source.snapshot());
}

/// A hash-keyed trie node for every possible leading byte, so some share the block key
/// markers of each layout.
fn trie_nodes() -> Vec<(Vec<u8>, Vec<u8>)> {
    (0..=u8::MAX)
        .map(|lead| {
            let mut key = B256::repeat_byte(lead.wrapping_mul(31).wrapping_add(7)).to_vec();
            key[0] = lead;
            (key, vec![0xf8, 0x51, 0x80, lead])
        })
        .collect()
}

#[rstest]
#[case::byte_prefix(KeyLayout::BytePrefix)]
#[case::ascii_number_first(KeyLayout::AsciiNumberFirst)]
#[case::ascii_hash_first(KeyLayout::AsciiHashFirst)]
fn test_trie_nodes_beside_blocks(#[case] layout: KeyLayout) {
    let scheme = KeyScheme::new(layout);
    let source = chain(&scheme, 0..=5);
    let nodes = trie_nodes();
    for (key, value) in &nodes {
        source.insert(key.clone(), value.clone());
    }
    let dest = MemoryStore::new();
    let mut config = ReplicaConfig::new(scheme.clone());
    config.bulk_prefixes.clear();

    let outcome = Replicator::new(&source, &dest, &config).run().unwrap();

    assert_eq!(outcome.range, 0..=5);
    assert_eq!(outcome.replay.blocks_written, 6);
    assert_eq!(outcome.replay.blocks_complete, 6);
    assert!(outcome.verification.passed());
    for (key, _) in &nodes {
        assert_eq!(dest.get(key).unwrap(), None);
    }
    assert_eq!(dest.len(), 6 * 6);
}

#[test]
fn test_gaps_are_skipped() {
    let scheme = KeyScheme::new(KeyLayout::BytePrefix);
    let source = chain(&scheme, [0, 1, 2, 5, 6]);
    let dest = MemoryStore::new();
    let config = ReplicaConfig::new(scheme.clone());

    let outcome = Replicator::new(&source, &dest, &config).run().unwrap();

    assert_eq!(outcome.range, 0..=6);
    assert_eq!(outcome.replay.blocks_processed, 7);
    assert_eq!(outcome.replay.blocks_written, 5);
    for number in [3, 4] {
        assert_eq!(dest.get(&scheme.canonical_key(number)).unwrap(), None);
    }
    assert!(outcome.verification.passed());
}

#[test]
fn test_rerun_is_idempotent() {
    let scheme = KeyScheme::new(KeyLayout::AsciiNumberFirst);
    let source = chain(&scheme, 0..=9);
    let dest = MemoryStore::new();
    let mut config = ReplicaConfig::new(scheme);
    config.batch_size = 3;

    Replicator::new(&source, &dest, &config).run().unwrap();
    let first = dest.snapshot();
    let again = Replicator::new(&source, &dest, &config).run().unwrap();

    assert_eq!(again.replay.blocks_written, 10);
    assert_eq!(dest.snapshot(), first);
}

#[test]
fn test_resume_from_later_start() {
    let scheme = KeyScheme::new(KeyLayout::BytePrefix);
    let source = chain(&scheme, 0..=7);
    let dest = MemoryStore::new();
    let mut config = ReplicaConfig::new(scheme);

    config.end_block = Some(3);
    Replicator::new(&source, &dest, &config).run().unwrap();
    config.start_block = 4;
    config.end_block = None;
    let outcome = Replicator::new(&source, &dest, &config).run().unwrap();

    assert_eq!(outcome.range, 4..=7);
    assert!(outcome.verification.passed());
    assert_eq!(dest.snapshot(), source.snapshot());
}

#[test]
fn test_retargeted_run() {
    let scheme = KeyScheme::new(KeyLayout::AsciiHashFirst);
    let target = KeyScheme::new(KeyLayout::BytePrefix).with_namespace(vec![0x33; 32]);
    let source = chain(&scheme, 0..=2);
    let dest = MemoryStore::new();
    let mut config = ReplicaConfig::new(scheme.clone());
    config.target_scheme = Some(target.clone());

    let outcome = Replicator::new(&source, &dest, &config).run().unwrap();

    assert!(outcome.verification.passed());
    for number in 0..=2 {
        let hash = hash_of(number);
        for kind in KeyKind::ALL {
            let value = source.get(&scheme.encode(kind, number, &hash)).unwrap();
            assert!(value.is_some());
            assert_eq!(dest.get(&target.encode(kind, number, &hash)).unwrap(), value);
        }
    }
    assert_eq!(dest.len(), source.len());
}

#[test]
fn test_namespace_ignores_foreign_blocks() {
    let scheme = KeyScheme::new(KeyLayout::BytePrefix).with_namespace(b"subnet".to_vec());
    let source = chain(&scheme, 0..=3);
    for number in 0..=9 {
        put_block(&source, &KeyScheme::new(KeyLayout::BytePrefix), number);
    }
    let dest = MemoryStore::new();
    let mut config = ReplicaConfig::new(scheme.clone());
    config.bulk_prefixes.clear();

    let outcome = Replicator::new(&source, &dest, &config).run().unwrap();

    assert_eq!(outcome.range, 0..=3);
    assert_eq!(outcome.replay.blocks_written, 4);
    assert_eq!(dest.len(), 4 * 6);
    assert!(dest.snapshot().keys().all(|key| key.starts_with(b"subnet")));
}

#[test]
fn test_bulk_prefix_boundary() {
    let scheme = KeyScheme::new(KeyLayout::BytePrefix);
    let source = chain(&scheme, 0..=0);
    source.insert(vec![0x00], b"root".to_vec());
    source.insert(vec![0x00, 0xff], b"node".to_vec());
    source.insert(vec![0x01, 0x00], b"outside".to_vec());
    let dest = MemoryStore::new();
    let mut config = ReplicaConfig::new(scheme);
    config.bulk_prefixes = vec![BulkPrefix::new("state", vec![0x00])];

    let outcome = Replicator::new(&source, &dest, &config).run().unwrap();

    assert_eq!(outcome.entries_for("state"), Some(2));
    assert_eq!(dest.get(&[0x01, 0x00]).unwrap(), None);
}

/// Destination that accepts a fixed number of batches, then fails every write.
#[derive(Debug)]
struct FailingDest {
    inner: MemoryStore,
    remaining: AtomicUsize,
}

impl StoreReader for FailingDest {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<ferry_store::EntryIter<'_>, StoreError> {
        self.inner.iter_prefix(prefix)
    }
}

impl StoreWriter for FailingDest {
    fn write_batch(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        if self.remaining.load(Ordering::SeqCst) == 0 {
            return Err(StoreError::write(batch.len(), "no space left on device"));
        }
        self.remaining.fetch_sub(1, Ordering::SeqCst);
        self.inner.write_batch(batch)
    }
}

#[test]
fn test_write_failure_reports_resume_point() {
    let scheme = KeyScheme::new(KeyLayout::BytePrefix);
    let source = chain(&scheme, 0..=9);
    let dest = FailingDest { inner: MemoryStore::new(), remaining: AtomicUsize::new(2) };
    let mut config = ReplicaConfig::new(scheme.clone());
    config.batch_size = 3;

    let err = Replicator::new(&source, &dest, &config).run().unwrap_err();

    assert_eq!(err.stage, Stage::Replay);
    assert_eq!(err.last_flushed_block, Some(5));
    assert!(matches!(err.source, ReplicaError::Replay { number: 8, .. }));
    assert_eq!(
        err.to_string(),
        "replication aborted during block replay (last flushed block: 5)"
    );
    assert!(dest.inner.get(&scheme.canonical_key(5)).unwrap().is_some());
    assert_eq!(dest.inner.get(&scheme.canonical_key(6)).unwrap(), None);
}

#[test]
fn test_rocksdb_round_trip() {
    let dir = TempDir::new().unwrap();
    let (source_path, dest_path) = (dir.path().join("source"), dir.path().join("dest"));
    let scheme = KeyScheme::new(KeyLayout::AsciiNumberFirst);
    {
        let writer = RocksStore::open(&source_path, false).unwrap();
        for number in 0..=4 {
            put_block(&writer, &scheme, number);
        }
        let mut meta = WriteBatch::new();
        meta.put(b"LastHeader".to_vec(), hash_of(4).to_vec());
        meta.put(b"ethereum-config-genesis".to_vec(), b"{}".to_vec());
        writer.write_batch(&meta).unwrap();
    }

    let source = RocksStore::open_read_only(&source_path).unwrap();
    let dest = RocksStore::open(&dest_path, true).unwrap();
    let mut config = ReplicaConfig::new(scheme.clone());
    config.head_pointer_keys = vec![KeyBytes::from("LastHeader")];

    let outcome = Replicator::new(&source, &dest, &config).run().unwrap();

    assert_eq!(outcome.range, 0..=4);
    assert_eq!(outcome.replay.blocks_written, 5);
    assert_eq!(outcome.metadata.total(), 2);
    assert!(outcome.verification.passed());
    let copied: Vec<_> = dest.iter_prefix(&[]).unwrap().map(Result::unwrap).collect();
    let original: Vec<_> = source.iter_prefix(&[]).unwrap().map(Result::unwrap).collect();
    assert_eq!(copied, original);
}
