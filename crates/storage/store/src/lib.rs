//! Key-value store abstraction consumed by the ferry replication engine.
//!
//! Sources and destinations are accessed only through the [`StoreReader`] and
//! [`StoreWriter`] traits: point lookups, ordered prefix iteration and atomic batch
//! writes. [`MemoryStore`] and, behind the `rocksdb` feature, [`RocksStore`] provide
//! concrete backends.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod error;
pub use error::{BackendError, StoreError};

mod traits;
pub use traits::{Entry, EntryIter, Store, StoreReader, StoreWriter};

mod batch;
pub use batch::{BatchWriter, WriteBatch};

mod memory;
pub use memory::MemoryStore;

#[cfg(feature = "rocksdb")]
mod rocks;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksStore;
