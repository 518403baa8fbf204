//! Verify Subcommand

use crate::{
    commands::report::verification_tables,
    flags::{GlobalArgs, SchemeArgs},
};
use anyhow::{Context, bail};
use clap::Parser;
use ferry_replica::{KeyBytes, TipFinder, Verifier, verify_heights};
use ferry_store::RocksStore;
use std::path::PathBuf;

/// The `verify` Subcommand
///
/// Spot-checks block records in a database. Without `--height`, checks genesis and the
/// tip. The tip is only discovered when it is needed for default heights or head pointers.
#[derive(Parser, Debug, Clone)]
#[command(about = "Checks block records and head pointers in a database")]
pub struct VerifyCommand {
    /// Database directory. Opened read-only.
    #[arg(long)]
    pub db: PathBuf,
    /// Key scheme of the database.
    #[command(flatten)]
    pub scheme: SchemeArgs,
    /// Heights to check.
    #[arg(long = "height", value_delimiter = ',')]
    pub heights: Vec<u64>,
    /// Metadata keys expected to hold the canonical hash of the tip.
    #[arg(long = "head-pointer", value_delimiter = ',')]
    pub head_pointers: Vec<KeyBytes>,
}

impl VerifyCommand {
    /// Runs the subcommand.
    pub fn run(self, _args: &GlobalArgs) -> anyhow::Result<()> {
        let scheme = self.scheme.resolve(None)?;
        let store = RocksStore::open_read_only(&self.db).context("failed to open database")?;
        let (heights, tip) = self.plan(|| Ok(TipFinder::new(&store, &scheme).find()?))?;

        let report = Verifier::new(&store, &scheme).verify(&heights, tip, &self.head_pointers)?;
        println!("{}", verification_tables(&report));

        let failures = report.failure_count();
        if failures > 0 {
            bail!("verification found {failures} problems");
        }
        Ok(())
    }

    /// Resolves the heights to check and the tip head pointers are compared against.
    fn plan(
        &self,
        find_tip: impl FnOnce() -> anyhow::Result<u64>,
    ) -> anyhow::Result<(Vec<u64>, u64)> {
        let Some((&first, rest)) = self.heights.split_first() else {
            let tip = find_tip()?;
            return Ok((verify_heights(tip, &[]), tip));
        };
        let tip = if self.head_pointers.is_empty() { first } else { find_tip()? };
        let mut heights = vec![first];
        for number in rest {
            if !heights.contains(number) {
                heights.push(*number);
            }
        }
        Ok((heights, tip))
    }
}
