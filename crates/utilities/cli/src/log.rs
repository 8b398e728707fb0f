//! Logging arguments and tracing subscriber setup.

use crate::CliResult;
use clap::{ArgAction, Args};
use tracing_subscriber::{
    EnvFilter,
    filter::{Directive, LevelFilter},
    fmt,
    prelude::*,
};

/// Logging arguments shared by kona binaries.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct LogArgs {
    /// Verbosity level. `-v` enables debug logs, `-vv` and above enable trace logs.
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub v: u8,
    /// Extra filter directives, e.g. `dtl::persister=trace`. `RUST_LOG` is honored as well.
    #[arg(long = "log.filter", global = true, env = "KONA_LOG_FILTER")]
    pub filter: Option<String>,
    /// Disables ANSI colors in log output.
    #[arg(long = "log.no-color", global = true, env = "KONA_LOG_NO_COLOR")]
    pub no_color: bool,
}

/// Logging configuration built from [`LogArgs`].
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    args: LogArgs,
}

impl LogConfig {
    /// Creates a new [`LogConfig`].
    pub const fn new(args: LogArgs) -> Self {
        Self { args }
    }

    /// Returns the [`EnvFilter`] for the configured verbosity and directives.
    ///
    /// Directives from `RUST_LOG` override the verbosity level, and explicit `--log.filter`
    /// directives override both.
    pub fn env_filter(&self) -> CliResult<EnvFilter> {
        let mut filter = EnvFilter::builder()
            .with_default_directive(verbosity_level(self.args.v).into())
            .from_env_lossy();
        if let Some(directives) = &self.args.filter {
            for directive in directives.split(',').filter(|d| !d.is_empty()) {
                filter = filter.add_directive(directive.parse::<Directive>()?);
            }
        }
        Ok(filter)
    }

    /// Installs the global tracing subscriber.
    pub fn init_tracing_subscriber(&self, env_filter: Option<EnvFilter>) -> CliResult<()> {
        let filter = match env_filter {
            Some(filter) => filter,
            None => self.env_filter()?,
        };
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(!self.args.no_color))
            .try_init()?;
        Ok(())
    }
}

/// Installs the global tracing subscriber with the given verbosity.
///
/// `env_filter` replaces the default filter built from `verbosity` and `RUST_LOG`.
pub fn init_tracing_subscriber(
    verbosity: u8,
    env_filter: Option<impl Into<EnvFilter>>,
) -> CliResult<()> {
    LogConfig::new(LogArgs { v: verbosity, ..Default::default() })
        .init_tracing_subscriber(env_filter.map(Into::into))
}

/// Maps a `-v` count to the default log level.
pub const fn verbosity_level(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}
