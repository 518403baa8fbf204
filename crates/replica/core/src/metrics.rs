//! Metrics recorded by the replication stages.

use crate::KeyKind;
use ferry_store::{BatchWriter, StoreError, StoreWriter};
use std::time::{Duration, Instant};

/// Container for the replication engine's metric names and recording helpers.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Heights visited by the range replayer.
    pub const BLOCKS_PROCESSED_TOTAL: &'static str = "ferry_blocks_processed_total";
    /// Heights whose canonical mapping was copied.
    pub const BLOCKS_WRITTEN_TOTAL: &'static str = "ferry_blocks_written_total";
    /// Block records copied, labelled by kind.
    pub const RECORDS_COPIED_TOTAL: &'static str = "ferry_records_copied_total";
    /// Block records absent from the source, labelled by kind.
    pub const RECORDS_MISSING_TOTAL: &'static str = "ferry_records_missing_total";
    /// Highest height made durable by the range replayer.
    pub const REPLAY_FLUSHED_HEIGHT: &'static str = "ferry_replay_flushed_height";
    /// Entries copied by the bulk prefix copier, labelled by prefix label.
    pub const BULK_ENTRIES_TOTAL: &'static str = "ferry_bulk_entries_total";
    /// Metadata entries copied.
    pub const METADATA_ENTRIES_TOTAL: &'static str = "ferry_metadata_entries_total";
    /// Batch flushes, labelled by stage.
    pub const BATCH_FLUSHES_TOTAL: &'static str = "ferry_batch_flushes_total";
    /// Latency of batch flushes, labelled by stage.
    pub const BATCH_FLUSH_DURATION_SECONDS: &'static str = "ferry_batch_flush_duration_seconds";
    /// Failed verification checks.
    pub const VERIFY_FAILURES_TOTAL: &'static str = "ferry_verify_failures_total";

    /// Describes and zeroes every metric.
    pub fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::BLOCKS_PROCESSED_TOTAL,
            metrics::Unit::Count,
            "Block heights visited by the range replayer",
        );
        metrics::describe_counter!(
            Self::BLOCKS_WRITTEN_TOTAL,
            metrics::Unit::Count,
            "Block heights whose canonical mapping was copied",
        );
        metrics::describe_counter!(
            Self::RECORDS_COPIED_TOTAL,
            metrics::Unit::Count,
            "Block records copied to the destination",
        );
        metrics::describe_counter!(
            Self::RECORDS_MISSING_TOTAL,
            metrics::Unit::Count,
            "Block records skipped because the source lacks them",
        );
        metrics::describe_gauge!(
            Self::REPLAY_FLUSHED_HEIGHT,
            metrics::Unit::Count,
            "Highest block height durably copied",
        );
        metrics::describe_counter!(
            Self::BULK_ENTRIES_TOTAL,
            metrics::Unit::Count,
            "State and code entries copied",
        );
        metrics::describe_counter!(
            Self::METADATA_ENTRIES_TOTAL,
            metrics::Unit::Count,
            "Metadata entries copied",
        );
        metrics::describe_counter!(
            Self::BATCH_FLUSHES_TOTAL,
            metrics::Unit::Count,
            "Write batches committed to the destination",
        );
        metrics::describe_histogram!(
            Self::BATCH_FLUSH_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Latency of committing a write batch",
        );
        metrics::describe_counter!(
            Self::VERIFY_FAILURES_TOTAL,
            metrics::Unit::Count,
            "Verification checks that failed",
        );
    }

    fn zero() {
        metrics::counter!(Self::BLOCKS_PROCESSED_TOTAL).increment(0);
        metrics::counter!(Self::BLOCKS_WRITTEN_TOTAL).increment(0);
        for kind in KeyKind::ALL {
            metrics::counter!(Self::RECORDS_COPIED_TOTAL, "kind" => kind.to_string()).increment(0);
        }
        metrics::counter!(Self::METADATA_ENTRIES_TOTAL).increment(0);
        metrics::counter!(Self::VERIFY_FAILURES_TOTAL).increment(0);
        metrics::gauge!(Self::REPLAY_FLUSHED_HEIGHT).set(0.0);
    }

    pub(crate) fn record_block(written: bool) {
        metrics::counter!(Self::BLOCKS_PROCESSED_TOTAL).increment(1);
        if written {
            metrics::counter!(Self::BLOCKS_WRITTEN_TOTAL).increment(1);
        }
    }

    pub(crate) fn record_record(kind: KeyKind, present: bool) {
        let name = if present { Self::RECORDS_COPIED_TOTAL } else { Self::RECORDS_MISSING_TOTAL };
        metrics::counter!(name, "kind" => kind.to_string()).increment(1);
    }

    pub(crate) fn record_flush(stage: &'static str, elapsed: Duration) {
        metrics::counter!(Self::BATCH_FLUSHES_TOTAL, "stage" => stage).increment(1);
        metrics::histogram!(Self::BATCH_FLUSH_DURATION_SECONDS, "stage" => stage)
            .record(elapsed.as_secs_f64());
    }

    pub(crate) fn record_flushed_height(number: u64) {
        metrics::gauge!(Self::REPLAY_FLUSHED_HEIGHT).set(number as f64);
    }

    pub(crate) fn record_bulk_entries(label: &str, entries: u64) {
        metrics::counter!(Self::BULK_ENTRIES_TOTAL, "label" => label.to_string()).increment(entries);
    }

    pub(crate) fn record_metadata_entries(entries: u64) {
        metrics::counter!(Self::METADATA_ENTRIES_TOTAL).increment(entries);
    }

    pub(crate) fn record_verify_failures(failures: u64) {
        metrics::counter!(Self::VERIFY_FAILURES_TOTAL).increment(failures);
    }
}

/// Flushes `writer`, recording the flush under `stage` when anything was written.
pub(crate) fn timed_flush<W>(
    writer: &mut BatchWriter<'_, W>,
    stage: &'static str,
) -> Result<usize, StoreError>
where
    W: StoreWriter + ?Sized,
{
    let started = Instant::now();
    let entries = writer.flush()?;
    if entries > 0 {
        Metrics::record_flush(stage, started.elapsed());
    }
    Ok(entries)
}
