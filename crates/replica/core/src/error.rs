use crate::ConfigError;
use derive_more::Display;
use ferry_store::StoreError;
use thiserror::Error;

/// Fatal errors raised by a replication stage.
///
/// Absent records never surface here; they are skipped where they are found.
#[derive(Debug, Error)]
pub enum ReplicaError {
    /// The run configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A store operation failed while copying a block.
    #[error("failed to copy block {number} (last flushed block: {})", display_block(.last_flushed))]
    Replay {
        /// The block being copied.
        number: u64,
        /// Highest block covered by a durable flush.
        last_flushed: Option<u64>,
        /// The store failure.
        source: StoreError,
    },

    /// A canonical mapping holds something other than a 32-byte hash.
    #[error("canonical hash of block {number} is {len} bytes, expected 32")]
    MalformedCanonical {
        /// The block whose mapping is malformed.
        number: u64,
        /// Length of the stored value.
        len: usize,
        /// Highest block covered by a durable flush.
        last_flushed: Option<u64>,
    },

    /// Scanning canonical mappings failed.
    #[error("failed to scan canonical mappings")]
    Tip(#[source] StoreError),

    /// Copying a bulk prefix failed.
    #[error("failed to copy {label} entries after {copied} were copied")]
    Bulk {
        /// Label of the prefix being copied.
        label: String,
        /// Entries made durable before the failure.
        copied: u64,
        /// The store failure.
        source: StoreError,
    },

    /// Copying metadata failed.
    #[error("failed to copy chain metadata")]
    Metadata(#[source] StoreError),

    /// The verifier could not read the destination.
    #[error("failed to read records for verification")]
    Verify(#[source] StoreError),
}

impl ReplicaError {
    /// Highest block number known to be durable in the destination, if the error carries it.
    pub const fn last_flushed(&self) -> Option<u64> {
        match self {
            Self::Replay { last_flushed, .. } | Self::MalformedCanonical { last_flushed, .. } => {
                *last_flushed
            }
            _ => None,
        }
    }
}

/// The stage of a replication run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Stage {
    /// Configuration validation.
    #[display("setup")]
    Setup,
    /// Tip discovery.
    #[display("tip discovery")]
    Tip,
    /// Block range replay.
    #[display("block replay")]
    Replay,
    /// State and code prefix copy.
    #[display("bulk copy")]
    Bulk,
    /// Metadata copy.
    #[display("metadata copy")]
    Metadata,
    /// Post-copy verification.
    #[display("verification")]
    Verify,
}

/// A fatal error that aborted a full replication run.
#[derive(Debug, Error)]
#[error("replication aborted during {stage} (last flushed block: {})", display_block(.last_flushed_block))]
pub struct RunError {
    /// Stage that failed.
    pub stage: Stage,
    /// Highest block number durably copied before the failure. Re-run from the block after
    /// it to resume.
    pub last_flushed_block: Option<u64>,
    /// The underlying failure.
    #[source]
    pub source: ReplicaError,
}

fn display_block(block: &Option<u64>) -> String {
    block.map_or_else(|| "none".to_string(), |n| n.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_error_names_stage_and_resume_point() {
        let err = RunError {
            stage: Stage::Replay,
            last_flushed_block: Some(41),
            source: ReplicaError::Replay {
                number: 42,
                last_flushed: Some(41),
                source: StoreError::read(&[0x30], "io"),
            },
        };
        assert_eq!(err.to_string(), "replication aborted during block replay (last flushed block: 41)");
        assert_eq!(
            err.source.to_string(),
            "failed to copy block 42 (last flushed block: 41)"
        );
    }

    #[test]
    fn test_run_error_without_progress() {
        let err = RunError {
            stage: Stage::Tip,
            last_flushed_block: None,
            source: ReplicaError::Tip(StoreError::iterate(&[0x32], "io")),
        };
        assert!(err.to_string().ends_with("(last flushed block: none)"));
    }
}
