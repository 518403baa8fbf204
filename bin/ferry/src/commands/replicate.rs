//! Replicate Subcommand

use crate::{
    commands::report::{outcome_table, verification_tables},
    flags::{GlobalArgs, RunArgs},
};
use anyhow::{Context, bail};
use clap::Parser;
use ferry_replica::Replicator;
use ferry_store::RocksStore;
use std::path::PathBuf;
use tracing::warn;

/// The `replicate` Subcommand
///
/// Copies block records, state, code and metadata from a source database into a
/// destination database, then verifies the destination.
///
/// # Usage
///
/// ```sh
/// ferry replicate --source <DIR> --dest <DIR> --layout <LAYOUT> [OPTIONS]
/// ```
#[derive(Parser, Debug, Clone)]
#[command(about = "Copies a chain database into a fresh store")]
pub struct ReplicateCommand {
    /// Source database directory. Opened read-only.
    #[arg(long, env = "FERRY_SOURCE")]
    pub source: PathBuf,
    /// Destination database directory. Created if missing.
    #[arg(long, env = "FERRY_DEST")]
    pub dest: PathBuf,
    /// Fsync every batch written to the destination.
    #[arg(long)]
    pub sync: bool,
    /// Exit with an error when verification finds problems.
    #[arg(long)]
    pub strict: bool,
    /// Run configuration.
    #[command(flatten)]
    pub run: RunArgs,
}

impl ReplicateCommand {
    /// Runs the subcommand.
    pub fn run(self, _args: &GlobalArgs) -> anyhow::Result<()> {
        let config = self.run.load()?;
        let source = RocksStore::open_read_only(&self.source).context("failed to open source")?;
        let dest = RocksStore::open(&self.dest, self.sync).context("failed to open destination")?;

        let outcome = Replicator::new(&source, &dest, &config).run()?;

        println!("{}", outcome_table(&outcome));
        println!("{}", verification_tables(&outcome.verification));
        println!("finished in {:.2?}", outcome.duration);
        if outcome.partial_blocks() > 0 {
            warn!(
                target: "ferry::replay",
                partial = outcome.partial_blocks(),
                "Some blocks were copied without all of their records"
            );
        }

        let failures = outcome.verification.failure_count();
        if self.strict && failures > 0 {
            bail!("verification found {failures} problems");
        }
        Ok(())
    }
}
