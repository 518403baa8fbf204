//! Range replay: copies every block in a height range, one canonical mapping at a time.

use crate::{KeyKind, KeyScheme, Metrics, ReplicaError, metrics::timed_flush};
use alloy_primitives::B256;
use ferry_store::{BatchWriter, StoreError, StoreReader, StoreWriter};
use std::{num::NonZeroU64, ops::RangeInclusive};
use tracing::{debug, info, trace};

/// Per-kind counts of copied block records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordCounts {
    /// Canonical mappings copied.
    pub canonical: u64,
    /// Headers copied.
    pub headers: u64,
    /// Bodies copied.
    pub bodies: u64,
    /// Receipts copied.
    pub receipts: u64,
    /// Total difficulty entries copied.
    pub total_difficulty: u64,
    /// Hash → number lookups copied.
    pub hash_to_number: u64,
}

impl RecordCounts {
    fn increment(&mut self, kind: KeyKind) {
        let slot = match kind {
            KeyKind::Canonical => &mut self.canonical,
            KeyKind::Header => &mut self.headers,
            KeyKind::Body => &mut self.bodies,
            KeyKind::Receipts => &mut self.receipts,
            KeyKind::TotalDifficulty => &mut self.total_difficulty,
            KeyKind::HashToNumber => &mut self.hash_to_number,
        };
        *slot += 1;
    }

    /// Total number of records copied.
    pub const fn total(&self) -> u64 {
        self.canonical +
            self.headers +
            self.bodies +
            self.receipts +
            self.total_difficulty +
            self.hash_to_number
    }
}

/// Counters produced by a [`RangeReplayer`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Heights visited, whether or not anything was found.
    pub blocks_processed: u64,
    /// Heights whose canonical mapping was copied.
    pub blocks_written: u64,
    /// Heights copied with a header, body, receipts and TD.
    pub blocks_complete: u64,
    /// Record counts per kind.
    pub records: RecordCounts,
    /// Highest height covered by a durable flush.
    pub last_flushed: Option<u64>,
}

impl ReplayStats {
    /// Heights copied with at least one of header, body, receipts or TD missing.
    pub const fn partial_blocks(&self) -> u64 {
        self.blocks_written - self.blocks_complete
    }
}

/// Copies the block records of a height range from a source to a destination store.
///
/// Each height is resolved through its canonical mapping. A height without one is
/// skipped; sub-records missing from the source are skipped individually. Writes are
/// flushed every `batch_size` heights, so a crash loses at most one batch.
#[derive(Debug)]
pub struct RangeReplayer<'a, S: ?Sized, D: ?Sized> {
    source: &'a S,
    dest: &'a D,
    scheme: &'a KeyScheme,
    target: &'a KeyScheme,
    batch_size: NonZeroU64,
    progress_interval: u64,
}

impl<'a, S, D> RangeReplayer<'a, S, D>
where
    S: StoreReader + ?Sized,
    D: StoreWriter + ?Sized,
{
    /// Creates a replayer writing keys in the same scheme they are read with.
    pub const fn new(
        source: &'a S,
        dest: &'a D,
        scheme: &'a KeyScheme,
        batch_size: NonZeroU64,
    ) -> Self {
        Self { source, dest, scheme, target: scheme, batch_size, progress_interval: 0 }
    }

    /// Re-encodes every copied key with `target`. Values are still copied untouched.
    pub const fn with_target_scheme(mut self, target: &'a KeyScheme) -> Self {
        self.target = target;
        self
    }

    /// Logs progress every `interval` heights. Zero disables progress logs.
    pub const fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Copies every height in `range`.
    pub fn replay(&self, range: RangeInclusive<u64>) -> Result<ReplayStats, ReplicaError> {
        let (start, end) = (*range.start(), *range.end());
        info!(target: "ferry::replay", start, end, batch_size = self.batch_size.get(), "Replaying blocks");

        let mut writer = BatchWriter::new(self.dest);
        let mut stats = ReplayStats::default();
        let mut in_batch = 0u64;

        for number in range {
            stats.blocks_processed += 1;
            let last_flushed = stats.last_flushed;
            let written = self
                .copy_block(number, &mut writer, &mut stats)
                .map_err(|err| err.into_replica_error(number, last_flushed))?;
            Metrics::record_block(written);

            in_batch += 1;
            if in_batch == self.batch_size.get() || number == end {
                timed_flush(&mut writer, "replay").map_err(|source| ReplicaError::Replay {
                    number,
                    last_flushed: stats.last_flushed,
                    source,
                })?;
                stats.last_flushed = Some(number);
                Metrics::record_flushed_height(number);
                debug!(target: "ferry::replay", last_flushed = number, "Flushed block batch");
                in_batch = 0;
            }

            if self.progress_interval != 0 && stats.blocks_processed % self.progress_interval == 0 {
                info!(
                    target: "ferry::replay",
                    number,
                    processed = stats.blocks_processed,
                    written = stats.blocks_written,
                    "Replay progress"
                );
            }
        }

        info!(
            target: "ferry::replay",
            processed = stats.blocks_processed,
            written = stats.blocks_written,
            complete = stats.blocks_complete,
            "Replay finished"
        );
        Ok(stats)
    }

    /// Stages every record of `number`. Returns whether the canonical mapping was found.
    fn copy_block<W>(
        &self,
        number: u64,
        writer: &mut BatchWriter<'_, W>,
        stats: &mut ReplayStats,
    ) -> Result<bool, BlockError>
    where
        W: StoreWriter + ?Sized,
    {
        let Some(canonical) = self.source.get(&self.scheme.canonical_key(number))? else {
            trace!(target: "ferry::replay", number, "No canonical mapping, skipping block");
            return Ok(false);
        };
        let hash = B256::try_from(canonical.as_slice())
            .map_err(|_| BlockError::MalformedCanonical(canonical.len()))?;

        writer.put(self.target.canonical_key(number), canonical);
        stats.blocks_written += 1;
        stats.records.increment(KeyKind::Canonical);

        let mut complete = true;
        for kind in KeyKind::BLOCK_RECORDS {
            let present = self.copy_record(kind, number, &hash, writer)?;
            if present {
                stats.records.increment(kind);
            } else {
                debug!(target: "ferry::replay", number, %hash, %kind, "Record missing from source");
                complete = false;
            }
            Metrics::record_record(kind, present);
        }
        if self.copy_record(KeyKind::HashToNumber, number, &hash, writer)? {
            stats.records.increment(KeyKind::HashToNumber);
        }
        if complete {
            stats.blocks_complete += 1;
        }
        Ok(true)
    }

    fn copy_record<W>(
        &self,
        kind: KeyKind,
        number: u64,
        hash: &B256,
        writer: &mut BatchWriter<'_, W>,
    ) -> Result<bool, StoreError>
    where
        W: StoreWriter + ?Sized,
    {
        match self.source.get(&self.scheme.encode(kind, number, hash))? {
            Some(value) => {
                writer.put(self.target.encode(kind, number, hash), value);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Failure while staging a single block, before the block number is attached.
#[derive(Debug)]
enum BlockError {
    Store(StoreError),
    MalformedCanonical(usize),
}

impl From<StoreError> for BlockError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl BlockError {
    fn into_replica_error(self, number: u64, last_flushed: Option<u64>) -> ReplicaError {
        match self {
            Self::Store(source) => ReplicaError::Replay { number, last_flushed, source },
            Self::MalformedCanonical(len) => {
                ReplicaError::MalformedCanonical { number, len, last_flushed }
            }
        }
    }
}
