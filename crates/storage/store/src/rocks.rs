//! RocksDB-backed store.

use crate::{Entry, EntryIter, StoreError, StoreReader, StoreWriter, WriteBatch};
use rocksdb::{DB, DBRawIterator, Options, WriteOptions};
use std::{
    fmt,
    path::{Path, PathBuf},
};
use tracing::{debug, error};

/// Manages a RocksDB database used as a replication source or destination.
pub struct RocksStore {
    db: DB,
    path: PathBuf,
    sync: bool,
}

impl fmt::Debug for RocksStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RocksStore").field("path", &self.path).field("sync", &self.sync).finish()
    }
}

impl RocksStore {
    /// Opens an existing database read-only. Used for replication sources.
    pub fn open_read_only(path: &Path) -> Result<Self, StoreError> {
        let db = DB::open_for_read_only(&Options::default(), path, false).map_err(|source| {
            error!(target: "ferry::store", path = %path.display(), %source, "Failed to open source store");
            StoreError::Open { path: path.to_path_buf(), source: source.into() }
        })?;
        debug!(target: "ferry::store", path = %path.display(), "Opened store read-only");
        Ok(Self { db, path: path.to_path_buf(), sync: false })
    }

    /// Creates or opens a database for writing. Used for replication destinations.
    ///
    /// With `sync` set, every batch write is fsynced before returning.
    pub fn open(path: &Path, sync: bool) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        let db = DB::open(&opts, path).map_err(|source| {
            error!(target: "ferry::store", path = %path.display(), %source, "Failed to open destination store");
            StoreError::Open { path: path.to_path_buf(), source: source.into() }
        })?;
        debug!(target: "ferry::store", path = %path.display(), sync, "Opened store read-write");
        Ok(Self { db, path: path.to_path_buf(), sync })
    }

    /// Location of the database on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StoreReader for RocksStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        self.db.get(key).map_err(|source| StoreError::read(key, source))
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Result<EntryIter<'_>, StoreError> {
        let mut raw = self.db.raw_iterator();
        raw.seek(prefix);
        Ok(Box::new(PrefixCursor { raw, prefix: prefix.to_vec(), done: false }))
    }
}

impl StoreWriter for RocksStore {
    fn write_batch(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        let mut rocks_batch = rocksdb::WriteBatch::default();
        for (key, value) in batch.iter() {
            rocks_batch.put(key, value);
        }
        let mut opts = WriteOptions::default();
        opts.set_sync(self.sync);
        self.db.write_opt(rocks_batch, &opts).map_err(|source| {
            error!(target: "ferry::store", entries = batch.len(), %source, "Failed to write batch");
            StoreError::write(batch.len(), source)
        })
    }
}

/// Forward cursor over a RocksDB key range sharing a prefix.
struct PrefixCursor<'a> {
    raw: DBRawIterator<'a>,
    prefix: Vec<u8>,
    done: bool,
}

impl Iterator for PrefixCursor<'_> {
    type Item = Result<Entry, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.raw.valid() {
            self.done = true;
            return self.raw.status().err().map(|source| Err(StoreError::iterate(&self.prefix, source)));
        }
        let entry = match (self.raw.key(), self.raw.value()) {
            (Some(key), Some(value)) if key.starts_with(&self.prefix) => (key.to_vec(), value.to_vec()),
            _ => {
                self.done = true;
                return None;
            }
        };
        self.raw.next();
        Some(Ok(entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BatchWriter;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_reopen_read_only() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let db_path = tmp_dir.path().join("chaindata");
        {
            let store = RocksStore::open(&db_path, false).expect("open writable store");
            let mut writer = BatchWriter::new(&store);
            writer.put(b"LastBlock".to_vec(), vec![0xaa; 32]);
            writer.flush().expect("flush");
        }

        let store = RocksStore::open_read_only(&db_path).expect("open read-only store");
        assert_eq!(store.get(b"LastBlock").unwrap(), Some(vec![0xaa; 32]));
        assert_eq!(store.get(b"LastHeader").unwrap(), None);
    }

    #[test]
    fn test_open_read_only_missing_path_fails() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let err = RocksStore::open_read_only(&tmp_dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, StoreError::Open { .. }));
    }

    #[test]
    fn test_prefix_cursor_stops_at_boundary() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let store = RocksStore::open(tmp_dir.path(), true).expect("open store");
        let mut writer = BatchWriter::new(&store);
        writer.put(vec![0x00, 0x01], vec![1]);
        writer.put(vec![0x00, 0x02], vec![2]);
        writer.put(vec![0x01, 0x00], vec![3]);
        writer.flush().expect("flush");

        let keys: Vec<_> =
            store.iter_prefix(&[0x00]).unwrap().map(|entry| entry.unwrap().0).collect();
        assert_eq!(keys, vec![vec![0x00, 0x01], vec![0x00, 0x02]]);

        let all = store.iter_prefix(&[]).unwrap().count();
        assert_eq!(all, 3);
    }
}
