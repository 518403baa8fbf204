//! In-memory store backed by an ordered map.

use crate::{EntryIter, StoreError, StoreReader, StoreWriter, WriteBatch};
use std::{
    collections::BTreeMap,
    sync::{
        PoisonError, RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

/// An ordered in-memory key-value store.
///
/// Mostly useful for tests and dry runs; ordering semantics match the on-disk
/// backends, so copy stages behave identically against it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    writes: AtomicU64,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a single entry directly, bypassing batching.
    pub fn insert(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).insert(key.into(), value.into());
    }

    /// Removes a single entry directly.
    pub fn remove(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).remove(key)
    }

    /// Number of entries held.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of batches committed through [`StoreWriter::write_batch`].
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns a copy of every entry, in key order.
    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl<K, V> FromIterator<(K, V)> for MemoryStore
where
    K: Into<Vec<u8>>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let entries = iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { entries: RwLock::new(entries), writes: AtomicU64::new(0) }
    }
}

impl StoreReader for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.read().unwrap_or_else(PoisonError::into_inner).get(key).cloned())
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<EntryIter<'_>, StoreError> {
        // Entries are cloned out so the lock is not held across the caller's writes.
        let matching: Vec<_> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| Ok((key.clone(), value.clone())))
            .collect();
        Ok(Box::new(matching.into_iter()))
    }
}

impl StoreWriter for MemoryStore {
    fn write_batch(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for (key, value) in batch.iter() {
            entries.insert(key.to_vec(), value.to_vec());
        }
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
