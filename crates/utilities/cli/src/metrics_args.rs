//! Prometheus metrics flags.

use crate::{CliResult, init_prometheus_server};
use clap::Args;
use std::net::{IpAddr, Ipv4Addr};

/// Configuration for the Prometheus exporter.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct MetricsArgs {
    /// Serve Prometheus metrics while the command runs.
    #[arg(long = "metrics.enabled", global = true, env = "FERRY_METRICS_ENABLED")]
    pub enabled: bool,
    /// Address the metrics server listens on.
    #[arg(
        long = "metrics.addr",
        global = true,
        default_value = "0.0.0.0",
        env = "FERRY_METRICS_ADDR"
    )]
    pub addr: IpAddr,
    /// Port the metrics server listens on. `0` picks a free port.
    #[arg(long = "metrics.port", global = true, default_value_t = 9090, env = "FERRY_METRICS_PORT")]
    pub port: u16,
}

impl Default for MetricsArgs {
    fn default() -> Self {
        Self { enabled: false, addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 9090 }
    }
}

impl MetricsArgs {
    /// Starts the exporter if enabled and runs `describe` to register metric descriptions.
    pub fn init_with(&self, describe: impl FnOnce()) -> CliResult<()> {
        if self.enabled {
            init_prometheus_server(self.addr, self.port)?;
            describe();
        }
        Ok(())
    }
}
