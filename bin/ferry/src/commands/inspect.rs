//! Inspect Subcommand

use crate::{commands::report::survey_tables, flags::GlobalArgs};
use anyhow::Context;
use clap::Parser;
use ferry_replica::{KeyBytes, inspect};
use ferry_store::RocksStore;
use std::path::PathBuf;

/// The `inspect` Subcommand
///
/// Classifies the keys of an unfamiliar database to help choose a key layout and bulk
/// prefixes. Nothing is written.
#[derive(Parser, Debug, Clone)]
#[command(about = "Surveys the key classes of a database")]
pub struct InspectCommand {
    /// Database directory. Opened read-only.
    #[arg(long)]
    pub db: PathBuf,
    /// Namespace block keys are expected under.
    #[arg(long, default_value = "0x")]
    pub namespace: KeyBytes,
    /// Stop after this many entries.
    #[arg(long)]
    pub limit: Option<u64>,
}

impl InspectCommand {
    /// Runs the subcommand.
    pub fn run(self, _args: &GlobalArgs) -> anyhow::Result<()> {
        let store = RocksStore::open_read_only(&self.db).context("failed to open database")?;
        let survey = inspect::survey(&store, &self.namespace, self.limit)?;

        println!("{}", survey_tables(&survey));
        println!("scanned {} entries", survey.scanned);
        match survey.likely_layout() {
            Some(layout) => println!("likely layout: {layout}"),
            None => println!("likely layout: unknown"),
        }
        Ok(())
    }
}
