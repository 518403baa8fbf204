//! Contains the ferry CLI.

use crate::{
    commands::{InspectCommand, ReplicateCommand, TipCommand, VerifyCommand},
    flags::GlobalArgs,
};
use clap::{Parser, Subcommand};
use ferry_cli::cli_styles;

/// Subcommands for the CLI.
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Copies a chain database into a fresh store.
    Replicate(ReplicateCommand),
    /// Finds the highest canonical block in a database.
    Tip(TipCommand),
    /// Checks block records and head pointers in a database.
    Verify(VerifyCommand),
    /// Surveys the key classes of a database.
    Inspect(InspectCommand),
}

/// The ferry CLI.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, styles = cli_styles(), long_about = None)]
pub struct Cli {
    /// Global arguments for the CLI.
    #[command(flatten)]
    pub global: GlobalArgs,
    /// The subcommand to run.
    #[command(subcommand)]
    pub subcommand: Commands,
}

impl Cli {
    /// Runs the CLI.
    pub fn run(self) -> anyhow::Result<()> {
        self.global.init_stack()?;

        match self.subcommand {
            Commands::Replicate(cmd) => cmd.run(&self.global),
            Commands::Tip(cmd) => cmd.run(&self.global),
            Commands::Verify(cmd) => cmd.run(&self.global),
            Commands::Inspect(cmd) => cmd.run(&self.global),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_replica::KeyLayout;

    #[test]
    fn test_replicate_args() {
        let cli = Cli::try_parse_from([
            "ferry",
            "-vv",
            "replicate",
            "--source",
            "/data/source",
            "--dest",
            "/data/dest",
            "--layout",
            "byte-prefix",
            "--strict",
        ])
        .unwrap();

        assert_eq!(cli.global.log_args.v, 2);
        let Commands::Replicate(cmd) = cli.subcommand else { panic!("expected replicate") };
        assert!(cmd.strict);
        assert_eq!(cmd.source.to_str(), Some("/data/source"));
        assert_eq!(cmd.run.scheme.layout, Some(KeyLayout::BytePrefix));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "ferry",
            "tip",
            "--db",
            "/data/chain",
            "--layout",
            "ascii-hash-first",
            "--metrics.enabled",
            "-v",
        ])
        .unwrap();
        assert!(cli.global.metrics.enabled);
        assert_eq!(cli.global.log_args.v, 1);
    }

    #[test]
    fn test_verify_heights() {
        let cli = Cli::try_parse_from([
            "ferry", "verify", "--db", "/d", "--layout", "byte-prefix", "--height", "0,5", "--height",
            "9",
        ])
        .unwrap();
        let Commands::Verify(cmd) = cli.subcommand else { panic!("expected verify") };
        assert_eq!(cmd.heights, [0, 5, 9]);
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["ferry"]).is_err());
    }
}
