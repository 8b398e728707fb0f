//! The chain data persister: drives a single source chain block to "fully processed".

use crate::{
    ChainSource, HandlerKind, HandlerRegistry, LogFilter, MatchedLog, Metrics, PersisterError,
    match_logs, transaction_order,
};
use alloy_primitives::B256;
use futures::future::try_join_all;
use kona_dtl_storage::{ChainDataWriter, PersistenceStateReader};
use kona_dtl_types::{BlockInfo, L1Transaction, LogStage, PersistenceState};
use std::{collections::HashMap, sync::Arc, time::Instant};
use tracing::{debug, trace, warn};

/// Persists one source chain block per [`ChainDataPersister::handle`] call.
///
/// Work is split into stages, each gated by the block's [`PersistenceState`]:
/// - the raw block, bundled with the transactions that emitted relevant logs;
/// - the log pass, which dispatches every matched log to its handler;
/// - the processed marker, written once the log pass has completed.
///
/// The persistence state is maintained by the storage backend as a side effect of the writes
/// issued here. A failed call leaves whatever the backend already committed, so re-invoking
/// `handle` with the same block resumes where the previous attempt stopped.
#[derive(Debug)]
pub struct ChainDataPersister<S, C> {
    store: Arc<S>,
    source: Arc<C>,
    registry: HandlerRegistry,
    earliest_block: Option<u64>,
}

impl<S, C> ChainDataPersister<S, C>
where
    S: PersistenceStateReader + ChainDataWriter,
    C: ChainSource,
{
    /// Creates a new [`ChainDataPersister`].
    ///
    /// # Arguments
    /// - `store`: Storage backend that records blocks, derived records and persistence state.
    /// - `source`: Source chain to fetch logs and transactions from.
    /// - `registry`: Handler bindings, in registration order.
    /// - `earliest_block`: Blocks below this height are ignored.
    pub fn new(
        store: Arc<S>,
        source: Arc<C>,
        registry: impl Into<HandlerRegistry>,
        earliest_block: Option<u64>,
    ) -> Self {
        Self { store, source, registry: registry.into(), earliest_block }
    }

    /// Returns the handler registry.
    pub const fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Returns the configured low-water mark.
    pub const fn earliest_block(&self) -> Option<u64> {
        self.earliest_block
    }

    /// Performs the remaining durable writes needed to fully process `block`.
    ///
    /// Safe to call any number of times for the same block. Callers must not run two calls
    /// for the same block concurrently.
    pub async fn handle(&self, block: &BlockInfo) -> Result<(), PersisterError> {
        if self.earliest_block.is_some_and(|earliest| block.number < earliest) {
            trace!(
                target: "dtl::persister",
                block_number = block.number,
                earliest_block = ?self.earliest_block,
                "Ignoring block below earliest block"
            );
            Metrics::record_skipped(Metrics::SKIP_BELOW_EARLIEST);
            return Ok(());
        }

        let start = Instant::now();
        let result = self.persist(block).await;
        Metrics::record_handle(start.elapsed(), &result);

        if let Err(err) = &result {
            warn!(
                target: "dtl::persister",
                block_number = block.number,
                %err,
                "Failed to persist block"
            );
        }
        result
    }

    async fn persist(&self, block: &BlockInfo) -> Result<(), PersisterError> {
        let mut progress = BlockProgress::new(self.store.persistence_state(block.number)?);

        if self.registry.is_empty() {
            if progress.needs_block() {
                self.store.insert_block(block, true)?;
                progress.block_written(false, true);
                debug!(target: "dtl::persister", block_number = block.number, "Persisted block");
            } else {
                Metrics::record_skipped(Metrics::SKIP_ALREADY_PROCESSED);
            }
            return Ok(());
        }

        if !progress.needs_log_pass() {
            if progress.needs_block() {
                self.store.insert_block(block, false)?;
                progress.block_written(false, false);
            } else {
                trace!(
                    target: "dtl::persister",
                    block_number = block.number,
                    "Block already processed"
                );
                Metrics::record_skipped(Metrics::SKIP_ALREADY_PROCESSED);
            }
            return Ok(());
        }

        let matched = self.fetch_matched_logs(block).await?;
        let transactions = self.resolve_transactions(&matched).await?;

        if progress.needs_block() {
            let mark_processed = transactions.is_empty();
            self.store.insert_block_with_transactions(
                block,
                transactions.clone(),
                mark_processed,
            )?;
            progress.block_written(true, mark_processed);
        }

        let (rollup_transactions, state_roots) = self.dispatch(&matched, &transactions).await?;

        if !progress.is_processed() {
            self.store.mark_block_processed(block.hash)?;
            progress.marked_processed();
        }

        debug!(
            target: "dtl::persister",
            block_number = block.number,
            %block.hash,
            logs = matched.len(),
            transactions = transactions.len(),
            rollup_transactions,
            state_roots,
            "Persisted block"
        );
        Ok(())
    }

    /// Fetches logs for every binding concurrently and keeps the ones that match.
    async fn fetch_matched_logs(
        &self,
        block: &BlockInfo,
    ) -> Result<Vec<MatchedLog>, PersisterError> {
        let fetches = self.registry.iter().map(|binding| {
            let filter = LogFilter::new(block.hash, binding.address, binding.topic);
            async move { self.source.logs(&filter).await }
        });

        let fetched = try_join_all(fetches)
            .await?
            .into_iter()
            .map(|logs| {
                logs.into_iter()
                    .filter(|log| log.block_hash.is_none_or(|hash| hash == block.hash))
                    .collect()
            })
            .collect();

        Ok(match_logs(&self.registry, fetched))
    }

    /// Resolves the owning transactions of `matched` concurrently, in first-seen order.
    async fn resolve_transactions(
        &self,
        matched: &[MatchedLog],
    ) -> Result<Vec<L1Transaction>, PersisterError> {
        let order = transaction_order(matched)?;
        let resolved =
            try_join_all(order.iter().map(|hash| self.source.transaction_by_hash(*hash))).await?;

        order
            .into_iter()
            .zip(resolved)
            .map(|(hash, tx)| tx.ok_or(PersisterError::UnknownTransaction(hash)))
            .collect()
    }

    /// Invokes the handler of every matched log, in order.
    ///
    /// Returns the number of newly written rollup transactions and state roots.
    async fn dispatch(
        &self,
        matched: &[MatchedLog],
        transactions: &[L1Transaction],
    ) -> Result<(usize, usize), PersisterError> {
        let by_hash: HashMap<B256, &L1Transaction> =
            transactions.iter().map(|tx| (tx.hash, tx)).collect();

        let (mut rollup_transactions, mut state_roots) = (0, 0);
        for entry in matched {
            let Some(binding) = self.registry.get(entry.binding) else { continue };
            let hash = entry.transaction_hash()?;
            let transaction =
                by_hash.get(&hash).ok_or(PersisterError::UnknownTransaction(hash))?;

            let written =
                binding.handler.handle(self.store.as_ref(), &entry.log, transaction).await?;
            Metrics::record_derived(binding.kind, written);

            match binding.kind {
                HandlerKind::RollupTransactions => rollup_transactions += written,
                HandlerKind::StateRoots => state_roots += written,
            }
        }
        Ok((rollup_transactions, state_roots))
    }
}

/// Local view of a block's [`PersistenceState`] for the duration of one `handle` call.
///
/// Starts from the stored record and applies the transitions the backend performs for each
/// write issued, so later stages can be gated without re-reading storage.
#[derive(Debug, Clone, Copy)]
struct BlockProgress {
    state: PersistenceState,
}

impl BlockProgress {
    const fn new(state: PersistenceState) -> Self {
        Self { state }
    }

    const fn needs_block(&self) -> bool {
        !self.state.block_persisted
    }

    const fn needs_log_pass(&self) -> bool {
        matches!(self.state.log_stage(), LogStage::NotStarted)
    }

    const fn is_processed(&self) -> bool {
        self.state.is_fully_processed()
    }

    const fn block_written(&mut self, with_transactions: bool, mark_processed: bool) {
        let update = if mark_processed {
            PersistenceState::PROCESSED
        } else {
            PersistenceState {
                block_persisted: true,
                transactions_persisted: with_transactions,
                rollup_transactions_persisted: false,
                state_roots_persisted: false,
            }
        };
        self.state = self.state.merge(update);
    }

    const fn marked_processed(&mut self) {
        self.state = self.state.merge(PersistenceState::PROCESSED);
    }
}
