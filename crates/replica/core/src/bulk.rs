//! Verbatim copies of whole key prefixes.
//!
//! State trie nodes and contract code are content addressed, so they are copied without
//! interpretation: every entry whose key starts with a configured prefix lands in the
//! destination unchanged.

use crate::{KeyBytes, Metrics, ReplicaError, metrics::timed_flush};
use ferry_store::{BatchWriter, StoreReader, StoreWriter};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use tracing::{debug, info};

/// A labelled key prefix copied in full.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BulkPrefix {
    /// Name used in logs, metrics and reports.
    pub label: String,
    /// The key prefix.
    pub prefix: KeyBytes,
}

impl BulkPrefix {
    /// Creates a labelled prefix.
    pub fn new(label: impl Into<String>, prefix: impl Into<KeyBytes>) -> Self {
        Self { label: label.into(), prefix: prefix.into() }
    }
}

/// Result of copying one [`BulkPrefix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixCopyStats {
    /// Label of the prefix.
    pub label: String,
    /// The prefix that was copied.
    pub prefix: KeyBytes,
    /// Entries copied.
    pub entries: u64,
}

/// Copies every entry under a set of prefixes, flushing every `flush_threshold` entries.
#[derive(Debug)]
pub struct PrefixCopier<'a, S: ?Sized, D: ?Sized> {
    source: &'a S,
    dest: &'a D,
    flush_threshold: NonZeroUsize,
}

impl<'a, S, D> PrefixCopier<'a, S, D>
where
    S: StoreReader + ?Sized,
    D: StoreWriter + ?Sized,
{
    /// Creates a copier.
    pub const fn new(source: &'a S, dest: &'a D, flush_threshold: NonZeroUsize) -> Self {
        Self { source, dest, flush_threshold }
    }

    /// Copies each prefix in order.
    pub fn copy(&self, prefixes: &[BulkPrefix]) -> Result<Vec<PrefixCopyStats>, ReplicaError> {
        prefixes.iter().map(|prefix| self.copy_prefix(prefix)).collect()
    }

    /// Copies every entry under `prefix`.
    pub fn copy_prefix(&self, prefix: &BulkPrefix) -> Result<PrefixCopyStats, ReplicaError> {
        let BulkPrefix { label, prefix: key_prefix } = prefix;
        info!(target: "ferry::bulk", %label, prefix = %key_prefix, "Copying prefix");

        let mut writer = BatchWriter::new(self.dest);
        let fail = |writer: &BatchWriter<'_, D>, source| ReplicaError::Bulk {
            label: label.clone(),
            copied: writer.flushed_entries(),
            source,
        };

        let entries = self.source.iter_prefix(key_prefix).map_err(|source| fail(&writer, source))?;
        for entry in entries {
            let (key, value) = entry.map_err(|source| fail(&writer, source))?;
            writer.put(key, value);
            if writer.pending() >= self.flush_threshold.get() {
                timed_flush(&mut writer, "bulk").map_err(|source| fail(&writer, source))?;
                debug!(
                    target: "ferry::bulk",
                    %label,
                    copied = writer.flushed_entries(),
                    "Flushed prefix batch"
                );
            }
        }
        timed_flush(&mut writer, "bulk").map_err(|source| fail(&writer, source))?;

        let entries = writer.flushed_entries();
        Metrics::record_bulk_entries(label, entries);
        info!(target: "ferry::bulk", %label, entries, "Copied prefix");
        Ok(PrefixCopyStats { label: label.clone(), prefix: key_prefix.clone(), entries })
    }
}
