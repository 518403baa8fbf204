//! Buffered writes.
//!
//! A [`WriteBatch`] is a plain list of pending puts. [`BatchWriter`] pairs a batch with a
//! destination and turns the put/flush/reset cycle into one type, which is how every
//! copy stage in the replication engine writes.

use crate::{StoreError, StoreWriter};
use std::time::Instant;
use tracing::trace;

/// An ordered set of pending puts committed together.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WriteBatch {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    size: usize,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub const fn new() -> Self {
        Self { entries: Vec::new(), size: 0 }
    }

    /// Stages a put of `value` under `key`.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        let (key, value) = (key.into(), value.into());
        self.size += key.len() + value.len();
        self.entries.push((key, value));
    }

    /// Number of staged puts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total key and value bytes staged.
    pub const fn size_bytes(&self) -> usize {
        self.size
    }

    /// Iterates over staged puts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Clears all staged puts, keeping the allocation.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.size = 0;
    }
}

/// A [`WriteBatch`] bound to the destination it is flushed into.
#[derive(Debug)]
pub struct BatchWriter<'a, W: ?Sized> {
    dest: &'a W,
    batch: WriteBatch,
    flushes: u64,
    flushed_entries: u64,
}

impl<'a, W> BatchWriter<'a, W>
where
    W: StoreWriter + ?Sized,
{
    /// Creates a writer with an empty batch.
    pub const fn new(dest: &'a W) -> Self {
        Self { dest, batch: WriteBatch::new(), flushes: 0, flushed_entries: 0 }
    }

    /// Stages a put.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.batch.put(key, value);
    }

    /// Number of puts staged since the last flush.
    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    /// Number of non-empty flushes performed so far.
    pub const fn flushes(&self) -> u64 {
        self.flushes
    }

    /// Number of entries made durable so far.
    pub const fn flushed_entries(&self) -> u64 {
        self.flushed_entries
    }

    /// Commits the staged puts and resets the batch.
    ///
    /// An empty batch is not written. Returns the number of entries committed.
    pub fn flush(&mut self) -> Result<usize, StoreError> {
        if self.batch.is_empty() {
            return Ok(0);
        }
        let entries = self.batch.len();
        let started = Instant::now();
        self.dest.write_batch(&self.batch)?;
        trace!(
            target: "ferry::store",
            entries,
            bytes = self.batch.size_bytes(),
            elapsed = ?started.elapsed(),
            "Flushed batch"
        );
        self.batch.reset();
        self.flushes += 1;
        self.flushed_entries += entries as u64;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, StoreReader};

    #[test]
    fn test_batch_tracks_size_and_resets() {
        let mut batch = WriteBatch::new();
        batch.put(b"ab".to_vec(), b"cde".to_vec());
        batch.put(b"f".to_vec(), Vec::new());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.size_bytes(), 6);

        batch.reset();
        assert!(batch.is_empty());
        assert_eq!(batch.size_bytes(), 0);
    }

    #[test]
    fn test_writer_only_persists_on_flush() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(&store);
        writer.put(b"k1".to_vec(), b"v1".to_vec());
        writer.put(b"k2".to_vec(), b"v2".to_vec());
        assert_eq!(store.get(b"k1").unwrap(), None);

        assert_eq!(writer.flush().unwrap(), 2);
        assert_eq!(writer.pending(), 0);
        assert_eq!(store.get(b"k1").unwrap(), Some(b"v1".to_vec()));
        assert_eq!(store.get(b"k2").unwrap(), Some(b"v2".to_vec()));
    }

    #[test]
    fn test_empty_flush_is_skipped() {
        let store = MemoryStore::new();
        let mut writer = BatchWriter::new(&store);
        assert_eq!(writer.flush().unwrap(), 0);
        assert_eq!(writer.flushes(), 0);
        assert_eq!(store.write_count(), 0);
    }
}
