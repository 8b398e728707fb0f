//! Contains the dtl CLI.

use crate::{
    error::DtlResult,
    flags::{DtlArgs, StorageKind},
};
use clap::Parser;
use kona_cli::{LogArgs, LogConfig, MetricsArgs, cli_styles};
use kona_dtl_core::{AlloyChainSource, HandlerRegistry, IngestionConfig, L1IngestionService};
use kona_dtl_storage::{ChainDataStore, ChainDb, InMemoryChainStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The kona data transport layer CLI.
///
/// Follows the L1 chain, indexes the events of the canonical transaction chain and the state
/// commitment chain, and persists the derived rollup transactions and state roots.
#[derive(Parser, Clone, Debug)]
#[command(author, version, about, styles = cli_styles(), long_about = None)]
pub(crate) struct Cli {
    /// Logging arguments.
    #[command(flatten)]
    pub(crate) log: LogArgs,
    /// Prometheus arguments.
    #[command(flatten)]
    pub(crate) metrics: MetricsArgs,
    /// Data transport layer arguments.
    #[command(flatten)]
    pub(crate) dtl: DtlArgs,
}

impl Cli {
    /// Runs the CLI.
    pub(crate) fn run(self) -> DtlResult<()> {
        LogConfig::new(self.log.clone()).init_tracing_subscriber(None)?;
        self.metrics.init_metrics()?;

        let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
        runtime.block_on(self.start())
    }

    /// Starts ingestion and runs it until ctrl-c.
    async fn start(self) -> DtlResult<()> {
        let source = Arc::new(AlloyChainSource::new_http(self.dtl.l1_rpc.clone()));
        let registry =
            HandlerRegistry::rollup_contracts(self.dtl.ctc_address, self.dtl.scc_address);
        let config = self.dtl.ingestion_config();

        let cancellation = CancellationToken::new();
        let on_signal = cancellation.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => on_signal.cancel(),
                Err(err) => warn!(target: "dtl", %err, "Failed to listen for ctrl-c"),
            }
        });

        info!(
            target: "dtl",
            ctc = %self.dtl.ctc_address,
            scc = %self.dtl.scc_address,
            storage = ?self.dtl.storage,
            "Starting data transport layer"
        );

        match self.dtl.storage {
            StorageKind::RocksDb => {
                let store = Arc::new(ChainDb::new(&self.dtl.datadir)?);
                ingest(store, source, registry, config, cancellation).await
            }
            StorageKind::Memory => {
                let store = Arc::new(InMemoryChainStore::new());
                ingest(store, source, registry, config, cancellation).await
            }
        }
    }
}

async fn ingest<S: ChainDataStore>(
    store: Arc<S>,
    source: Arc<AlloyChainSource>,
    registry: HandlerRegistry,
    config: IngestionConfig,
    cancellation: CancellationToken,
) -> DtlResult<()> {
    L1IngestionService::new(store, source, registry, config).run(cancellation).await?;
    Ok(())
}
