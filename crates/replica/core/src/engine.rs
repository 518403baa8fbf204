//! The full replication run.

use crate::{
    ConfigError, MetadataCopier, MetadataStats, PrefixCopier, PrefixCopyStats, RangeReplayer,
    ReplayStats, ReplicaConfig, ReplicaError, RunError, Stage, TipFinder, VerificationReport,
    Verifier, verify_heights,
};
use ferry_store::{Store, StoreReader};
use std::{
    num::NonZeroUsize,
    ops::RangeInclusive,
    time::{Duration, Instant},
};
use tracing::info;

/// Everything a successful replication run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaOutcome {
    /// The block range that was replayed.
    pub range: RangeInclusive<u64>,
    /// Whether the end of the range came from tip discovery.
    pub tip_discovered: bool,
    /// Block replay counters.
    pub replay: ReplayStats,
    /// Per-prefix bulk copy counters.
    pub bulk: Vec<PrefixCopyStats>,
    /// Metadata copy counters.
    pub metadata: MetadataStats,
    /// Post-copy verification results.
    pub verification: VerificationReport,
    /// Wall-clock duration of the run.
    pub duration: Duration,
}

impl ReplicaOutcome {
    /// Entries copied under the bulk prefix labelled `label`.
    pub fn entries_for(&self, label: &str) -> Option<u64> {
        self.bulk.iter().find(|stats| stats.label == label).map(|stats| stats.entries)
    }

    /// Copied blocks missing at least one sub-record.
    pub const fn partial_blocks(&self) -> u64 {
        self.replay.partial_blocks()
    }
}

/// Runs tip discovery, block replay, bulk copy, metadata copy and verification in order.
///
/// The source is only read. The destination is only written to, then read back for
/// verification. Stages run sequentially and the first fatal error stops the run.
#[derive(Debug)]
pub struct Replicator<'a, S: ?Sized, D: ?Sized> {
    source: &'a S,
    dest: &'a D,
    config: &'a ReplicaConfig,
}

impl<'a, S, D> Replicator<'a, S, D>
where
    S: StoreReader + ?Sized,
    D: Store + ?Sized,
{
    /// Creates a replicator for one run.
    pub const fn new(source: &'a S, dest: &'a D, config: &'a ReplicaConfig) -> Self {
        Self { source, dest, config }
    }

    /// Executes the run.
    pub fn run(&self) -> Result<ReplicaOutcome, RunError> {
        let started = Instant::now();
        let config = self.config;
        let setup = |source: ConfigError| abort(Stage::Setup, None, source.into());

        config.validate().map_err(setup)?;
        let batch_size = config.batch_size().map_err(setup)?;
        let flush_threshold = NonZeroUsize::new(config.bulk_flush_threshold)
            .ok_or(ConfigError::ZeroFlushThreshold)
            .map_err(setup)?;

        let (end, tip_discovered) = match config.explicit_end() {
            Some(end) => (end, false),
            None => {
                let tip = TipFinder::new(self.source, &config.scheme)
                    .find()
                    .map_err(|source| abort(Stage::Tip, None, source))?;
                (tip, true)
            }
        };
        let start = config.start_block;
        if start > end {
            return Err(setup(ConfigError::EmptyRange { start, end }));
        }
        info!(
            target: "ferry::replay",
            start,
            end,
            tip_discovered,
            source_layout = %config.scheme.layout,
            target_layout = %config.target_scheme().layout,
            "Starting replication"
        );

        let replay = RangeReplayer::new(self.source, self.dest, &config.scheme, batch_size)
            .with_target_scheme(config.target_scheme())
            .with_progress_interval(config.progress_interval)
            .replay(start..=end)
            .map_err(|source| abort(Stage::Replay, source.last_flushed(), source))?;
        let last_flushed = replay.last_flushed;

        let bulk = PrefixCopier::new(self.source, self.dest, flush_threshold)
            .copy(&config.bulk_prefixes)
            .map_err(|source| abort(Stage::Bulk, last_flushed, source))?;

        let metadata = MetadataCopier::new(self.source, self.dest)
            .copy(&config.metadata_keys, &config.metadata_prefixes)
            .map_err(|source| abort(Stage::Metadata, last_flushed, source))?;

        let verification = Verifier::new(self.dest, config.target_scheme())
            .verify(
                &verify_heights(end, &config.extra_verify_heights),
                end,
                &config.head_pointer_keys,
            )
            .map_err(|source| abort(Stage::Verify, last_flushed, source))?;

        let outcome = ReplicaOutcome {
            range: start..=end,
            tip_discovered,
            replay,
            bulk,
            metadata,
            verification,
            duration: started.elapsed(),
        };
        info!(
            target: "ferry::replay",
            blocks_written = outcome.replay.blocks_written,
            verified = outcome.verification.passed(),
            elapsed = ?outcome.duration,
            "Replication finished"
        );
        Ok(outcome)
    }
}

fn abort(stage: Stage, last_flushed_block: Option<u64>, source: ReplicaError) -> RunError {
    RunError { stage, last_flushed_block, source }
}
