//! Helpers for seeding stores in tests.

use crate::{KeyKind, KeyScheme};
use alloy_primitives::B256;
use ferry_store::MemoryStore;

/// Deterministic block hash for `number`.
pub(crate) fn block_hash(number: u64) -> B256 {
    let mut hash = B256::repeat_byte(0x11);
    hash[24..].copy_from_slice(&number.to_be_bytes());
    hash
}

/// Seeds the canonical mapping, hash lookup and `kinds` of block `number`.
pub(crate) fn seed_block(
    store: &MemoryStore,
    scheme: &KeyScheme,
    number: u64,
    kinds: &[KeyKind],
) -> B256 {
    let hash = block_hash(number);
    store.insert(scheme.canonical_key(number), hash.to_vec());
    store.insert(scheme.hash_to_number_key(&hash), number.to_be_bytes().to_vec());
    for kind in kinds {
        store.insert(scheme.encode(*kind, number, &hash), format!("{kind}-{number}").into_bytes());
    }
    hash
}
