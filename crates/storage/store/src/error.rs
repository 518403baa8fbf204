use alloy_primitives::Bytes;
use std::path::PathBuf;
use thiserror::Error;

/// Opaque error raised by a concrete storage backend.
pub type BackendError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Errors that may occur while interacting with a source or destination store.
///
/// A missing key is never an error: lookups return `Ok(None)` for it. Every variant
/// here is an I/O level failure that callers treat as fatal.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be opened.
    #[error("failed to open store at {}", path.display())]
    Open {
        /// Location of the store.
        path: PathBuf,
        /// Backend failure.
        source: BackendError,
    },

    /// A point lookup failed.
    #[error("failed to read key {key}")]
    Read {
        /// The key being read.
        key: Bytes,
        /// Backend failure.
        source: BackendError,
    },

    /// Seeking to or advancing over a prefix failed.
    #[error("failed to iterate keys under prefix {prefix}")]
    Iterate {
        /// The prefix being iterated.
        prefix: Bytes,
        /// Backend failure.
        source: BackendError,
    },

    /// Committing a write batch failed. Nothing from the batch is durable.
    #[error("failed to write batch of {entries} entries")]
    Write {
        /// Number of entries in the rejected batch.
        entries: usize,
        /// Backend failure.
        source: BackendError,
    },
}

impl StoreError {
    /// Builds a [`StoreError::Read`] for the given key.
    pub fn read(key: &[u8], source: impl Into<BackendError>) -> Self {
        Self::Read { key: Bytes::copy_from_slice(key), source: source.into() }
    }

    /// Builds a [`StoreError::Iterate`] for the given prefix.
    pub fn iterate(prefix: &[u8], source: impl Into<BackendError>) -> Self {
        Self::Iterate { prefix: Bytes::copy_from_slice(prefix), source: source.into() }
    }

    /// Builds a [`StoreError::Write`] for a batch of `entries` puts.
    pub fn write(entries: usize, source: impl Into<BackendError>) -> Self {
        Self::Write { entries, source: source.into() }
    }
}
