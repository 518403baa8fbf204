//! Run configuration.
//!
//! A [`ReplicaConfig`] fully describes one replication run. The engine never reads paths,
//! environment variables or network identifiers on its own; everything arrives here.

use crate::{BulkPrefix, KeyBytes, KeyScheme};
use serde::{Deserialize, Serialize};
use std::{num::NonZeroU64, path::Path};
use thiserror::Error;

/// Default number of block heights per replay batch.
pub const DEFAULT_BATCH_SIZE: u64 = 1_000;

/// Default number of bulk entries per flush.
pub const DEFAULT_BULK_FLUSH_THRESHOLD: usize = 10_000;

/// Default number of heights between progress logs.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 10_000;

/// Errors raised while loading or validating a [`ReplicaConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}")]
    Read {
        /// The file path.
        path: String,
        /// The I/O failure.
        source: std::io::Error,
    },
    /// The configuration file is not valid TOML for a [`ReplicaConfig`].
    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),
    /// `batch_size` is zero.
    #[error("batch size must be greater than zero")]
    ZeroBatchSize,
    /// `bulk_flush_threshold` is zero.
    #[error("bulk flush threshold must be greater than zero")]
    ZeroFlushThreshold,
    /// The start block lies past the end block.
    #[error("start block {start} is past end block {end}")]
    EmptyRange {
        /// Requested start block.
        start: u64,
        /// Requested or discovered end block.
        end: u64,
    },
}

/// Configuration of a single replication run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplicaConfig {
    /// First block number to copy.
    #[serde(default)]
    pub start_block: u64,
    /// Last block number to copy, inclusive. `None` or `0` resolves to the source tip.
    #[serde(default)]
    pub end_block: Option<u64>,
    /// Block heights per flushed batch.
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,
    /// Key scheme of the source store.
    pub scheme: KeyScheme,
    /// Key scheme to write block records with. Defaults to [`ReplicaConfig::scheme`].
    #[serde(default)]
    pub target_scheme: Option<KeyScheme>,
    /// Singleton metadata keys copied when present.
    #[serde(default = "default_metadata_keys")]
    pub metadata_keys: Vec<KeyBytes>,
    /// Prefixes of metadata entries copied in full.
    #[serde(default = "default_metadata_prefixes")]
    pub metadata_prefixes: Vec<KeyBytes>,
    /// Prefixes of state and code entries copied in full.
    #[serde(default = "default_bulk_prefixes")]
    pub bulk_prefixes: Vec<BulkPrefix>,
    /// Bulk entries per flushed batch.
    #[serde(default = "default_bulk_flush_threshold")]
    pub bulk_flush_threshold: usize,
    /// Heights between progress logs.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
    /// Metadata keys expected to hold the canonical hash of the last copied block.
    #[serde(default)]
    pub head_pointer_keys: Vec<KeyBytes>,
    /// Heights verified in addition to genesis and the last copied block.
    #[serde(default)]
    pub extra_verify_heights: Vec<u64>,
}

impl ReplicaConfig {
    /// Creates a configuration for `scheme` with every other field at its default.
    pub fn new(scheme: KeyScheme) -> Self {
        Self {
            start_block: 0,
            end_block: None,
            batch_size: DEFAULT_BATCH_SIZE,
            scheme,
            target_scheme: None,
            metadata_keys: default_metadata_keys(),
            metadata_prefixes: default_metadata_prefixes(),
            bulk_prefixes: default_bulk_prefixes(),
            bulk_flush_threshold: DEFAULT_BULK_FLUSH_THRESHOLD,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            head_pointer_keys: Vec::new(),
            extra_verify_heights: Vec::new(),
        }
    }

    /// Parses a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Reads and parses a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;
        Self::from_toml_str(&contents)
    }

    /// Scheme block records are written with.
    pub fn target_scheme(&self) -> &KeyScheme {
        self.target_scheme.as_ref().unwrap_or(&self.scheme)
    }

    /// The explicit end block, treating `0` as unset.
    pub fn explicit_end(&self) -> Option<u64> {
        self.end_block.filter(|end| *end != 0)
    }

    /// Checks the fields that do not depend on store contents.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.bulk_flush_threshold == 0 {
            return Err(ConfigError::ZeroFlushThreshold);
        }
        if let Some(end) = self.explicit_end() {
            if self.start_block > end {
                return Err(ConfigError::EmptyRange { start: self.start_block, end });
            }
        }
        Ok(())
    }

    /// Batch size as a non-zero value.
    pub fn batch_size(&self) -> Result<NonZeroU64, ConfigError> {
        NonZeroU64::new(self.batch_size).ok_or(ConfigError::ZeroBatchSize)
    }
}

const fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

const fn default_bulk_flush_threshold() -> usize {
    DEFAULT_BULK_FLUSH_THRESHOLD
}

const fn default_progress_interval() -> u64 {
    DEFAULT_PROGRESS_INTERVAL
}

fn default_metadata_keys() -> Vec<KeyBytes> {
    ["LastBlock", "LastHeader", "LastFast", "LastPivot", "lastFinalized"]
        .into_iter()
        .map(KeyBytes::from)
        .collect()
}

fn default_metadata_prefixes() -> Vec<KeyBytes> {
    ["ethereum-config-", "eth-config-"].into_iter().map(KeyBytes::from).collect()
}

fn default_bulk_prefixes() -> Vec<BulkPrefix> {
    vec![BulkPrefix::new("state", vec![0x00]), BulkPrefix::new("code", b"c".to_vec())]
}
