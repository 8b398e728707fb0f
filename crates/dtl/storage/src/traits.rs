use crate::StorageError;
use alloy_primitives::B256;
use auto_impl::auto_impl;
use kona_dtl_types::{
    BlockInfo, L1Transaction, PersistenceState, RollupTransaction, RollupTransactionKind,
    StateRootEntry,
};

/// Provides read access to the per-block [`PersistenceState`] record.
#[auto_impl(&, Arc)]
pub trait PersistenceStateReader: Send + Sync {
    /// Returns the persistence record for the given block number.
    ///
    /// # Returns
    /// * `Ok(PersistenceState)` with every flag `false` if no record exists yet.
    /// * `Err(StorageError)` if the record could not be read.
    fn persistence_state(&self, block_number: u64) -> Result<PersistenceState, StorageError>;
}

/// Write contract consumed by the persistence pipeline and by log handlers.
///
/// Every write must be idempotent for identical inputs: re-sending the same insert must not
/// duplicate rows. Persistence flags are updated as a side effect of these writes:
/// - block inserts set `block_persisted` (and `transactions_persisted` when transactions are
///   bundled);
/// - `mark_processed = true` or [`ChainDataWriter::mark_block_processed`] sets every flag;
/// - derived-record inserts never set a flag by themselves, so the two derived flags always
///   move together.
#[auto_impl(&, Arc)]
pub trait ChainDataWriter: Send + Sync {
    /// Stores a block without any transactions.
    fn insert_block(&self, block: &BlockInfo, mark_processed: bool) -> Result<(), StorageError>;

    /// Stores a block bundled with its relevant transactions, in the given order.
    fn insert_block_with_transactions(
        &self,
        block: &BlockInfo,
        transactions: Vec<L1Transaction>,
        mark_processed: bool,
    ) -> Result<(), StorageError>;

    /// Stores rollup transactions carried by the given source transaction.
    ///
    /// Returns the number of records that were not already stored.
    fn insert_rollup_transactions(
        &self,
        transaction_hash: B256,
        records: Vec<RollupTransaction>,
    ) -> Result<usize, StorageError>;

    /// Stores state roots carried by the given source transaction.
    ///
    /// Returns the number of roots that were not already stored.
    fn insert_state_roots(
        &self,
        transaction_hash: B256,
        roots: Vec<StateRootEntry>,
    ) -> Result<usize, StorageError>;

    /// Marks the block with the given hash as fully processed.
    fn mark_block_processed(&self, block_hash: B256) -> Result<(), StorageError>;
}

/// Read access to persisted chain data for downstream consumers.
#[auto_impl(&, Arc)]
pub trait ChainDataReader: Send + Sync {
    /// Returns the stored block at the given height, if any.
    fn block_by_number(&self, number: u64) -> Result<Option<BlockInfo>, StorageError>;

    /// Returns the transactions stored with the block at the given height, in insertion order.
    fn transactions_in_block(&self, number: u64) -> Result<Vec<L1Transaction>, StorageError>;

    /// Returns a rollup transaction by kind and index.
    fn rollup_transaction(
        &self,
        kind: RollupTransactionKind,
        index: u64,
    ) -> Result<Option<RollupTransaction>, StorageError>;

    /// Returns a state root by its index in the state commitment chain.
    fn state_root(&self, index: u64) -> Result<Option<StateRootEntry>, StorageError>;

    /// Returns the highest block that has been fully processed.
    fn latest_processed_block(&self) -> Result<Option<BlockInfo>, StorageError>;
}

/// A complete storage backend.
pub trait ChainDataStore: PersistenceStateReader + ChainDataWriter + ChainDataReader {}

impl<T> ChainDataStore for T where T: PersistenceStateReader + ChainDataWriter + ChainDataReader {}
