//! Utilities for spinning up a prometheus metrics server.

use crate::PrometheusError;
use metrics_exporter_prometheus::PrometheusBuilder;
use metrics_process::Collector;
use std::{
    net::{IpAddr, SocketAddr, TcpListener},
    thread::{self, sleep},
    time::Duration,
};
use tracing::info;

/// Interval between process metric collections.
const PROCESS_COLLECTION_INTERVAL: Duration = Duration::from_secs(60);

/// Starts a Prometheus metrics server on the given address and port.
///
/// A port of `0` lets the OS pick a free port. Returns the address the server listens on.
pub fn init_prometheus_server(addr: IpAddr, port: u16) -> Result<SocketAddr, PrometheusError> {
    let listen_addr = if port == 0 {
        // PrometheusBuilder binds its own listener, so only reserve the port here.
        TcpListener::bind((addr, 0))?.local_addr()?
    } else {
        SocketAddr::from((addr, port))
    };

    PrometheusBuilder::new().with_http_listener(listen_addr).install()?;

    // Process metrics, e.g. CPU and memory usage.
    let collector = Collector::default();
    collector.describe();
    thread::spawn(move || {
        loop {
            collector.collect();
            sleep(PROCESS_COLLECTION_INTERVAL);
        }
    });

    info!(target: "prometheus", "Serving metrics at: http://{listen_addr}");
    Ok(listen_addr)
}
