//! The L1 ingestion service: feeds confirmed source chain blocks to the persister, in order.

use crate::{
    BlockSource, ChainDataPersister, ChainSource, ChainSourceError, HandlerRegistry, Metrics,
    PersisterError,
};
use backon::{ExponentialBuilder, Retryable};
use kona_dtl_storage::{ChainDataStore, StorageError};
use kona_dtl_types::BlockInfo;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Backoff applied to a block whose `handle` call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Upper bound for the delay between retries.
    pub max_delay: Duration,
    /// Number of retries before the block is left for the next poll.
    pub max_times: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            max_times: 5,
        }
    }
}

impl RetryConfig {
    /// Returns the exponential backoff described by this config.
    pub fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_factor(2.0)
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_max_times(self.max_times)
    }
}

/// Configuration of the [`L1IngestionService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionConfig {
    /// Blocks below this height are never handled. Ingestion starts here on an empty store.
    pub earliest_block: Option<u64>,
    /// Number of blocks to stay behind the source chain head.
    pub confirmations: u64,
    /// Interval between head polls.
    pub poll_interval: Duration,
    /// Maximum number of blocks handled per poll.
    pub max_blocks_per_poll: u64,
    /// Backoff for failed blocks.
    pub retry: RetryConfig,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            earliest_block: None,
            confirmations: 12,
            poll_interval: Duration::from_secs(5),
            max_blocks_per_poll: 100,
            retry: RetryConfig::default(),
        }
    }
}

/// Errors returned by the [`L1IngestionService`].
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Reading the head or a block from the source chain failed.
    #[error(transparent)]
    Source(#[from] ChainSourceError),

    /// Reading the resume point from storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A block could not be persisted after exhausting its retries.
    #[error("Failed to persist block {block_number}: {source}")]
    Persister {
        /// The block that failed.
        block_number: u64,
        /// The last error.
        #[source]
        source: PersisterError,
    },
}

/// Drives a [`ChainDataPersister`] block by block from the source chain.
///
/// Guarantees at most one in-flight `handle` call at a time, and hands blocks over in
/// ascending order. The cursor only advances past a block once it was handled successfully.
#[derive(Debug)]
pub struct L1IngestionService<S, C> {
    store: Arc<S>,
    source: Arc<C>,
    persister: ChainDataPersister<S, C>,
    config: IngestionConfig,
}

impl<S, C> L1IngestionService<S, C>
where
    S: ChainDataStore,
    C: ChainSource + BlockSource,
{
    /// Creates a new [`L1IngestionService`] and the persister it drives.
    pub fn new(
        store: Arc<S>,
        source: Arc<C>,
        registry: impl Into<HandlerRegistry>,
        config: IngestionConfig,
    ) -> Self {
        let persister =
            ChainDataPersister::new(store.clone(), source.clone(), registry, config.earliest_block);
        Self { store, source, persister, config }
    }

    /// Returns the persister driven by this service.
    pub const fn persister(&self) -> &ChainDataPersister<S, C> {
        &self.persister
    }

    /// Returns the height ingestion resumes from: the block after the latest fully processed
    /// one, but never below the earliest block.
    pub fn resume_height(&self) -> Result<u64, IngestionError> {
        let earliest = self.config.earliest_block.unwrap_or_default();
        let next = self
            .store
            .latest_processed_block()?
            .map_or(earliest, |block| block.number.saturating_add(1));
        Ok(next.max(earliest))
    }

    /// Polls the source chain until `cancellation` fires.
    ///
    /// Errors within a poll are logged and the poll is retried on the next tick. Only a
    /// failure to determine the resume point is returned.
    pub async fn run(&self, cancellation: CancellationToken) -> Result<(), IngestionError> {
        Metrics::init();

        let mut next = self.resume_height()?;
        Metrics::record_ingestion_height(next);
        info!(
            target: "dtl::ingestion",
            next,
            confirmations = self.config.confirmations,
            "Starting L1 ingestion"
        );

        let mut interval = tokio::time::interval(self.config.poll_interval);
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                _ = interval.tick() => {}
            }

            // Dropping an in-flight `handle` is safe: the block is handled again next time.
            let result = tokio::select! {
                _ = cancellation.cancelled() => break,
                result = self.sync_to_head(&mut next) => result,
            };

            match result {
                Ok(0) => {}
                Ok(handled) => {
                    debug!(target: "dtl::ingestion", handled, next, "Synced to confirmed head");
                }
                Err(err) => {
                    warn!(target: "dtl::ingestion", next, %err, "Failed to sync to head");
                }
            }
        }

        info!(target: "dtl::ingestion", next, "L1 ingestion cancellation requested, stopping...");
        Ok(())
    }

    /// Handles every confirmed block from `next` onward, up to the per-poll limit.
    ///
    /// Advances `next` past each successfully handled block and returns how many were handled.
    pub async fn sync_to_head(&self, next: &mut u64) -> Result<u64, IngestionError> {
        let head = self.source.latest_block_number().await?;
        let Some(confirmed) = head.checked_sub(self.config.confirmations) else {
            return Ok(0);
        };
        let limit = next.saturating_add(self.config.max_blocks_per_poll.max(1) - 1);
        let target = confirmed.min(limit);

        let mut handled = 0;
        while *next <= target {
            let block = self
                .source
                .block_by_number(*next)
                .await?
                .ok_or(ChainSourceError::BlockNotFound(*next))?;

            self.handle_with_retry(&block).await.map_err(|source| IngestionError::Persister {
                block_number: block.number,
                source,
            })?;

            *next += 1;
            handled += 1;
            Metrics::record_ingestion_height(*next);
        }
        Ok(handled)
    }

    async fn handle_with_retry(&self, block: &BlockInfo) -> Result<(), PersisterError> {
        (|| self.persister.handle(block))
            .retry(self.config.retry.backoff())
            .when(PersisterError::is_retryable)
            .notify(|err, dur| {
                warn!(
                    target: "dtl::ingestion",
                    block_number = block.number,
                    %err,
                    ?dur,
                    "Retrying block"
                );
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LogFilter;
    use alloy_primitives::{Address, B256};
    use alloy_rpc_types_eth::Log;
    use async_trait::async_trait;
    use kona_dtl_storage::{
        ChainDataReader, ChainDataWriter, InMemoryChainStore, PersistenceStateReader,
    };
    use kona_dtl_types::{L1Transaction, PersistenceState};
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    /// A source chain without relevant logs, whose log queries can be made to fail.
    #[derive(Debug, Default)]
    struct FakeChain {
        head: AtomicU64,
        failures: AtomicUsize,
        log_queries: AtomicUsize,
    }

    impl FakeChain {
        fn with_head(head: u64) -> Self {
            Self { head: AtomicU64::new(head), ..Default::default() }
        }
    }

    fn block(number: u64) -> BlockInfo {
        let parent = number.checked_sub(1).map(|n| B256::left_padding_from(&n.to_be_bytes()));
        BlockInfo::new(
            B256::left_padding_from(&number.to_be_bytes()),
            number,
            parent.unwrap_or_default(),
            number * 12,
        )
    }

    #[async_trait]
    impl ChainSource for FakeChain {
        async fn logs(&self, _filter: &LogFilter) -> Result<Vec<Log>, ChainSourceError> {
            self.log_queries.fetch_add(1, Ordering::SeqCst);
            let failures = self.failures.load(Ordering::SeqCst);
            if failures > 0 {
                self.failures.store(failures - 1, Ordering::SeqCst);
                return Err(ChainSourceError::BlockNotFound(0));
            }
            Ok(Vec::new())
        }

        async fn transaction_by_hash(
            &self,
            _hash: B256,
        ) -> Result<Option<L1Transaction>, ChainSourceError> {
            Ok(None)
        }
    }

    #[async_trait]
    impl BlockSource for FakeChain {
        async fn latest_block_number(&self) -> Result<u64, ChainSourceError> {
            Ok(self.head.load(Ordering::SeqCst))
        }

        async fn block_by_number(
            &self,
            number: u64,
        ) -> Result<Option<BlockInfo>, ChainSourceError> {
            Ok((number <= self.head.load(Ordering::SeqCst)).then(|| block(number)))
        }
    }

    fn config() -> IngestionConfig {
        IngestionConfig {
            confirmations: 2,
            poll_interval: Duration::from_millis(10),
            retry: RetryConfig {
                min_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(2),
                max_times: 2,
            },
            ..Default::default()
        }
    }

    fn service(
        chain: FakeChain,
        config: IngestionConfig,
    ) -> (Arc<InMemoryChainStore>, L1IngestionService<InMemoryChainStore, FakeChain>) {
        let store = Arc::new(InMemoryChainStore::new());
        let registry =
            HandlerRegistry::rollup_contracts(Address::repeat_byte(1), Address::repeat_byte(2));
        let service = L1IngestionService::new(store.clone(), Arc::new(chain), registry, config);
        (store, service)
    }

    #[tokio::test]
    async fn test_sync_stops_at_confirmed_head() {
        let (store, service) = service(FakeChain::with_head(10), config());

        let mut next = service.resume_height().unwrap();
        assert_eq!(next, 0);
        assert_eq!(service.sync_to_head(&mut next).await.unwrap(), 9);
        assert_eq!(next, 9);

        assert_eq!(store.latest_processed_block().unwrap().map(|b| b.number), Some(8));
        assert!(store.block_by_number(9).unwrap().is_none());
        assert_eq!(store.persistence_state(8).unwrap(), PersistenceState::PROCESSED);

        // Nothing new until the head moves.
        assert_eq!(service.sync_to_head(&mut next).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_head_below_confirmations() {
        let (_, service) = service(FakeChain::with_head(1), config());
        let mut next = 0;
        assert_eq!(service.sync_to_head(&mut next).await.unwrap(), 0);
        assert_eq!(next, 0);
    }

    #[tokio::test]
    async fn test_sync_respects_poll_limit() {
        let config = IngestionConfig { max_blocks_per_poll: 3, ..config() };
        let (_, service) = service(FakeChain::with_head(100), config);

        let mut next = 10;
        assert_eq!(service.sync_to_head(&mut next).await.unwrap(), 3);
        assert_eq!(next, 13);
    }

    #[tokio::test]
    async fn test_resume_height() {
        let config = IngestionConfig { earliest_block: Some(5), ..config() };
        let (store, service) = service(FakeChain::with_head(100), config);
        assert_eq!(service.resume_height().unwrap(), 5);

        store.insert_block(&block(20), true).unwrap();
        assert_eq!(service.resume_height().unwrap(), 21);

        // A processed block below the earliest block doesn't pull the cursor back.
        let config = IngestionConfig { earliest_block: Some(50), ..config() };
        let (store, service) = service(FakeChain::with_head(100), config);
        store.insert_block(&block(20), true).unwrap();
        assert_eq!(service.resume_height().unwrap(), 50);
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried() {
        let chain = FakeChain::with_head(4);
        // Three bindings per attempt; fail the whole first attempt.
        chain.failures.store(1, Ordering::SeqCst);
        let (store, service) = service(chain, config());

        let mut next = 0;
        assert_eq!(service.sync_to_head(&mut next).await.unwrap(), 3);
        assert_eq!(store.latest_processed_block().unwrap().map(|b| b.number), Some(2));
    }

    #[tokio::test]
    async fn test_exhausted_retries_keep_cursor() {
        let chain = FakeChain::with_head(4);
        chain.failures.store(usize::MAX, Ordering::SeqCst);
        let (store, service) = service(chain, config());

        let mut next = 0;
        let err = service.sync_to_head(&mut next).await.unwrap_err();
        assert!(matches!(err, IngestionError::Persister { block_number: 0, .. }));
        assert_eq!(next, 0);
        assert!(store.block_by_number(0).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_run_until_cancelled() {
        let (store, service) = service(FakeChain::with_head(6), config());
        let cancellation = CancellationToken::new();

        let canceller = cancellation.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        service.run(cancellation).await.unwrap();
        assert_eq!(store.latest_processed_block().unwrap().map(|b| b.number), Some(4));
    }

    #[test]
    fn test_default_config() {
        let config = IngestionConfig::default();
        assert_eq!(config.confirmations, 12);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.earliest_block, None);
    }
}
