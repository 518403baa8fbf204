//! Chain-data replication engine.
//!
//! Copies the records of a blockchain client from one key-value store into another:
//! block records by height through the canonical mapping, state and code by prefix,
//! then chain metadata, and finally spot-checks the result. Every stage talks to the
//! stores only through [`ferry_store`]'s traits, and a [`KeyScheme`] picked per run
//! decides how block records are addressed.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod bytes;
pub use bytes::KeyBytes;

mod scheme;
pub use scheme::{DecodedKey, KeyError, KeyKind, KeyLayout, KeyScheme};

mod config;
pub use config::{
    ConfigError, DEFAULT_BATCH_SIZE, DEFAULT_BULK_FLUSH_THRESHOLD, DEFAULT_PROGRESS_INTERVAL,
    ReplicaConfig,
};

mod error;
pub use error::{ReplicaError, RunError, Stage};

mod metrics;
pub use metrics::Metrics;

mod replay;
pub use replay::{RangeReplayer, RecordCounts, ReplayStats};

mod tip;
pub use tip::TipFinder;

mod bulk;
pub use bulk::{BulkPrefix, PrefixCopier, PrefixCopyStats};

mod metadata;
pub use metadata::{MetadataCopier, MetadataStats};

mod verify;
pub use verify::{
    HeightCheck, PointerCheck, PointerOutcome, VerificationReport, Verifier, VerifyFailure,
    verify_heights,
};

mod engine;
pub use engine::{ReplicaOutcome, Replicator};

pub mod inspect;

#[cfg(test)]
mod test_utils;
