//! Global arguments for the CLI.

use clap::Parser;
use ferry_cli::{LogArgs, MetricsArgs};
use ferry_replica::Metrics;

/// Global arguments for the CLI.
#[derive(Parser, Default, Clone, Debug)]
pub struct GlobalArgs {
    /// Logging arguments.
    #[command(flatten)]
    pub log_args: LogArgs,
    /// Prometheus CLI arguments.
    #[command(flatten)]
    pub metrics: MetricsArgs,
}

impl GlobalArgs {
    /// Installs the tracing subscriber and, when enabled, the metrics exporter.
    pub fn init_stack(&self) -> anyhow::Result<()> {
        self.log_args.init_tracing()?;
        self.metrics.init_with(Metrics::init)?;
        Ok(())
    }
}
