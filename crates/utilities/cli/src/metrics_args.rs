//! Prometheus metrics arguments.

use crate::{CliResult, init_prometheus_server};
use clap::Args;
use std::net::{IpAddr, Ipv4Addr};

/// Prometheus metrics arguments shared by kona binaries.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct MetricsArgs {
    /// Enables the Prometheus metrics endpoint.
    #[arg(long = "metrics.enabled", global = true, env = "KONA_METRICS_ENABLED")]
    pub enabled: bool,
    /// Address the metrics endpoint listens on.
    #[arg(
        long = "metrics.addr",
        global = true,
        default_value = "0.0.0.0",
        env = "KONA_METRICS_ADDR"
    )]
    pub addr: IpAddr,
    /// Port the metrics endpoint listens on.
    #[arg(long = "metrics.port", global = true, default_value_t = 9090, env = "KONA_METRICS_PORT")]
    pub port: u16,
}

impl Default for MetricsArgs {
    fn default() -> Self {
        Self { enabled: false, addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 9090 }
    }
}

impl MetricsArgs {
    /// Starts the Prometheus server if metrics are enabled.
    pub fn init_metrics(&self) -> CliResult<()> {
        if self.enabled {
            init_prometheus_server(self.addr, self.port)?;
        }
        Ok(())
    }
}
