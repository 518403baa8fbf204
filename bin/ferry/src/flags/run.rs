//! Replication run flags.

use crate::flags::SchemeArgs;
use anyhow::Context;
use clap::Args;
use ferry_replica::{KeyBytes, KeyLayout, KeyScheme, ReplicaConfig};
use std::path::PathBuf;

/// Flags describing a replication run.
///
/// Every flag overrides the matching field of the `--config` file. Without a config file,
/// the defaults of [`ReplicaConfig::new`] apply and `--layout` is required.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// TOML file with the run configuration.
    #[arg(long, short = 'c', env = "FERRY_CONFIG")]
    pub config: Option<PathBuf>,
    /// First block number to copy.
    #[arg(long = "start-block")]
    pub start_block: Option<u64>,
    /// Last block number to copy. Omitted or `0` copies up to the source tip.
    #[arg(long = "end-block")]
    pub end_block: Option<u64>,
    /// Block heights per flushed batch.
    #[arg(long = "batch-size")]
    pub batch_size: Option<u64>,
    /// Source key scheme.
    #[command(flatten)]
    pub scheme: SchemeArgs,
    /// Key layout to write block records with. Defaults to the source layout.
    #[arg(long = "target.layout")]
    pub target_layout: Option<KeyLayout>,
    /// Namespace to write block records under. Defaults to the source namespace.
    #[arg(long = "target.namespace")]
    pub target_namespace: Option<KeyBytes>,
    /// State and code entries per flushed batch.
    #[arg(long = "bulk.flush-threshold")]
    pub bulk_flush_threshold: Option<usize>,
    /// Heights between progress logs. `0` disables them.
    #[arg(long = "progress-interval")]
    pub progress_interval: Option<u64>,
    /// Metadata keys expected to point at the last copied block.
    #[arg(long = "head-pointer", value_delimiter = ',')]
    pub head_pointers: Vec<KeyBytes>,
    /// Extra heights to verify after copying.
    #[arg(long = "verify-height", value_delimiter = ',')]
    pub verify_heights: Vec<u64>,
}

impl RunArgs {
    /// Loads the config file, if any, and applies the flag overrides.
    pub fn load(&self) -> anyhow::Result<ReplicaConfig> {
        let base = match &self.config {
            Some(path) => Some(
                ReplicaConfig::from_file(path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
            ),
            None => None,
        };
        let scheme = self.scheme.resolve(base.as_ref().map(|config| &config.scheme))?;
        let mut config = match base {
            Some(mut config) => {
                config.scheme = scheme;
                config
            }
            None => ReplicaConfig::new(scheme),
        };
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut ReplicaConfig) {
        if let Some(start) = self.start_block {
            config.start_block = start;
        }
        if let Some(end) = self.end_block {
            config.end_block = Some(end);
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(threshold) = self.bulk_flush_threshold {
            config.bulk_flush_threshold = threshold;
        }
        if let Some(interval) = self.progress_interval {
            config.progress_interval = interval;
        }
        if self.target_layout.is_some() || self.target_namespace.is_some() {
            let current = config.target_scheme();
            config.target_scheme = Some(KeyScheme {
                layout: self.target_layout.unwrap_or(current.layout),
                namespace: self.target_namespace.clone().unwrap_or_else(|| current.namespace.clone()),
            });
        }
        if !self.head_pointers.is_empty() {
            config.head_pointer_keys = self.head_pointers.clone();
        }
        if !self.verify_heights.is_empty() {
            config.extra_verify_heights = self.verify_heights.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        run: RunArgs,
    }

    fn parse(args: &[&str]) -> RunArgs {
        TestCli::try_parse_from(std::iter::once("ferry").chain(args.iter().copied())).unwrap().run
    }

    #[test]
    fn test_flags_without_config() {
        let config = parse(&[
            "--layout",
            "ascii-number-first",
            "--start-block",
            "5",
            "--end-block",
            "9",
            "--batch-size",
            "2",
            "--head-pointer",
            "LastHeader,LastBlock",
        ])
        .load()
        .unwrap();

        assert_eq!(config.scheme, KeyScheme::new(KeyLayout::AsciiNumberFirst));
        assert_eq!(config.start_block, 5);
        assert_eq!(config.explicit_end(), Some(9));
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.head_pointer_keys, [KeyBytes::from("LastHeader"), KeyBytes::from("LastBlock")]);
        assert_eq!(config.target_scheme, None);
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            start_block = 100
            batch_size = 50

            [scheme]
            layout = "byte-prefix"
            namespace = "0xabcd"
            "#
        )
        .unwrap();

        let config = parse(&[
            "--config",
            file.path().to_str().unwrap(),
            "--batch-size",
            "7",
            "--target.layout",
            "ascii-hash-first",
        ])
        .load()
        .unwrap();

        assert_eq!(config.start_block, 100);
        assert_eq!(config.batch_size, 7);
        assert_eq!(config.scheme.layout, KeyLayout::BytePrefix);
        let target = config.target_scheme();
        assert_eq!(target.layout, KeyLayout::AsciiHashFirst);
        assert_eq!(target.namespace.as_slice(), &[0xab, 0xcd]);
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let err = parse(&["--layout", "byte-prefix", "--batch-size", "0"]).load().unwrap_err();
        assert_eq!(err.to_string(), "batch size must be greater than zero");
    }

    #[test]
    fn test_unknown_layout_flag() {
        assert!(TestCli::try_parse_from(["ferry", "--layout", "leveldb"]).is_err());
    }
}
