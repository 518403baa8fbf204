//! Tip Subcommand

use crate::flags::{GlobalArgs, SchemeArgs};
use anyhow::Context;
use clap::Parser;
use ferry_replica::TipFinder;
use ferry_store::RocksStore;
use std::path::PathBuf;

/// The `tip` Subcommand
///
/// Prints the highest block with a canonical mapping and the highest block below which
/// no canonical mapping is missing.
#[derive(Parser, Debug, Clone)]
#[command(about = "Finds the highest canonical block in a database")]
pub struct TipCommand {
    /// Database directory. Opened read-only.
    #[arg(long)]
    pub db: PathBuf,
    /// Key scheme of the database.
    #[command(flatten)]
    pub scheme: SchemeArgs,
}

impl TipCommand {
    /// Runs the subcommand.
    pub fn run(self, _args: &GlobalArgs) -> anyhow::Result<()> {
        let scheme = self.scheme.resolve(None)?;
        let store = RocksStore::open_read_only(&self.db).context("failed to open database")?;
        let finder = TipFinder::new(&store, &scheme);

        match finder.find_with_hash()? {
            Some((number, hash)) => println!("tip: {number} ({hash})"),
            None => println!("tip: none"),
        }
        match finder.contiguous_tip()? {
            Some(number) => println!("contiguous tip: {number}"),
            None => println!("contiguous tip: none (genesis missing)"),
        }
        Ok(())
    }
}
