#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod cli;
pub mod commands;
pub mod flags;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    ferry_cli::backtrace::enable();
    cli::Cli::parse().run()
}
