//! Utilities for spinning up a prometheus metrics server.

use crate::PrometheusError;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, SocketAddr, TcpListener};
use tracing::info;

/// Starts a Prometheus metrics server and installs it as the global recorder.
///
/// A port of `0` binds to a free port chosen by the OS.
pub fn init_prometheus_server(addr: IpAddr, port: u16) -> Result<SocketAddr, PrometheusError> {
    let addr = if port == 0 {
        let listener = TcpListener::bind((addr, 0))?;
        listener.local_addr()?
    } else {
        SocketAddr::from((addr, port))
    };

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|source| PrometheusError::Install { addr, source })?;

    info!(target: "ferry::metrics", "Serving metrics at: http://{addr}");
    Ok(addr)
}
