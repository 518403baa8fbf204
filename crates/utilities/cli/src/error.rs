//! Error types for CLI utilities.

use std::{io, net::SocketAddr};
use thiserror::Error;

/// Error type for prometheus server initialization.
#[derive(Debug, Error)]
pub enum PrometheusError {
    /// Failed to bind to the specified address.
    #[error("failed to bind metrics listener")]
    Bind(#[from] io::Error),
    /// The exporter could not be built or installed.
    #[error("failed to install prometheus exporter on {addr}")]
    Install {
        /// Address the exporter was meant to listen on.
        addr: SocketAddr,
        /// The exporter failure.
        source: metrics_exporter_prometheus::BuildError,
    },
}

/// Errors that can occur in CLI operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// The tracing subscriber could not be installed.
    #[error("failed to initialize tracing")]
    Tracing(#[from] tracing_subscriber::util::TryInitError),

    /// An invalid `RUST_LOG` directive was given.
    #[error("invalid log filter")]
    LogFilter(#[from] tracing_subscriber::filter::FromEnvError),

    /// Error initializing metrics.
    #[error("failed to initialize metrics")]
    MetricsInitialization(#[from] PrometheusError),
}

/// Type alias for CLI results.
pub type CliResult<T> = Result<T, CliError>;
