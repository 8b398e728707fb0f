#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod styles;
pub use styles::cli_styles;

mod error;
pub use error::{CliError, CliResult, PrometheusError};

pub mod log;
pub use log::{LogArgs, LogConfig, init_tracing_subscriber};

pub mod metrics_args;
pub use metrics_args::MetricsArgs;

mod prometheus;
pub use prometheus::init_prometheus_server;

pub mod backtrace;
