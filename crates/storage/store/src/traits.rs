use crate::{StoreError, WriteBatch};
use auto_impl::auto_impl;

/// A single `(key, value)` entry yielded by a prefix cursor.
pub type Entry = (Vec<u8>, Vec<u8>);

/// Cursor over the entries under a prefix, in ascending key order.
pub type EntryIter<'a> = Box<dyn Iterator<Item = Result<Entry, StoreError>> + 'a>;

/// Read access to a key-value store.
///
/// Implementations must return keys from [`StoreReader::iter_prefix`] in ascending
/// lexicographic byte order, so that all keys sharing a prefix form one contiguous run.
#[auto_impl(&, Box, Arc)]
pub trait StoreReader {
    /// Looks up a single key.
    ///
    /// # Returns
    /// * `Ok(Some(value))` if the key exists.
    /// * `Ok(None)` if the key is absent.
    /// * `Err(StoreError)` if the backend failed.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Seeks to `prefix` and yields every entry whose key starts with it.
    ///
    /// Iteration ends at the first key that no longer matches. An empty prefix
    /// yields the whole store.
    fn iter_prefix(&self, prefix: &[u8]) -> Result<EntryIter<'_>, StoreError>;
}

/// Write access to a key-value store.
#[auto_impl(&, Box, Arc)]
pub trait StoreWriter {
    /// Commits every put in `batch` as a single all-or-nothing unit.
    ///
    /// The batch itself is left untouched; callers reset it once the write returns.
    fn write_batch(&self, batch: &WriteBatch) -> Result<(), StoreError>;
}

/// A store that can be both read and written.
pub trait Store: StoreReader + StoreWriter {}

impl<T> Store for T where T: StoreReader + StoreWriter + ?Sized {}
