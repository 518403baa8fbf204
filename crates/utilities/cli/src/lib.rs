//! Command line plumbing shared by the ferry binaries: log and metrics flags, tracing
//! subscriber setup, the Prometheus exporter and clap styling.
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

pub mod backtrace;

mod error;
pub use error::{CliError, CliResult, PrometheusError};

mod log;
pub use log::{LogArgs, init_tracing_subscriber};

mod metrics_args;
pub use metrics_args::MetricsArgs;

mod prometheus;
pub use prometheus::init_prometheus_server;

mod styles;
pub use styles::cli_styles;
