//! A non-durable [`ChainDataStore`](crate::ChainDataStore) kept entirely in memory.

use crate::{ChainDataReader, ChainDataWriter, PersistenceStateReader, StorageError};
use alloy_primitives::B256;
use kona_dtl_types::{
    BlockInfo, L1Transaction, PersistenceState, RollupTransaction, RollupTransactionKind,
    StateRootEntry,
};
use std::{
    collections::{BTreeMap, HashMap},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};
use tracing::trace;

/// In-memory storage backend.
///
/// Follows the same flag maintenance rules as [`ChainDb`](crate::ChainDb). Used in tests and
/// for ephemeral runs that don't need to survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryChainStore {
    inner: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    blocks: BTreeMap<u64, BlockInfo>,
    block_numbers: HashMap<B256, u64>,
    transactions: HashMap<B256, L1Transaction>,
    block_transactions: BTreeMap<u64, Vec<B256>>,
    rollup_transactions: BTreeMap<(RollupTransactionKind, u64), RollupTransaction>,
    state_roots: BTreeMap<u64, StateRootEntry>,
    states: BTreeMap<u64, PersistenceState>,
}

impl Tables {
    fn put_block(&mut self, block: &BlockInfo) {
        if let Some(previous) = self.blocks.insert(block.number, *block) {
            if previous.hash != block.hash {
                self.block_numbers.remove(&previous.hash);
            }
        }
        self.block_numbers.insert(block.hash, block.number);
    }

    fn update_state(&mut self, number: u64, update: PersistenceState) {
        let state = self.states.entry(number).or_default();
        *state = state.merge(update);
    }

    fn block_of_transaction(&self, hash: B256) -> Result<u64, StorageError> {
        self.transactions
            .get(&hash)
            .map(|tx| tx.block_number)
            .ok_or_else(|| StorageError::EntryNotFound(format!("transaction {hash}")))
    }
}

impl InMemoryChainStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StorageError> {
        self.inner.read().map_err(|_| StorageError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StorageError> {
        self.inner.write().map_err(|_| StorageError::LockPoisoned)
    }

    /// Returns every stored rollup transaction of the given kind, ordered by index.
    pub fn rollup_transactions(
        &self,
        kind: RollupTransactionKind,
    ) -> Result<Vec<RollupTransaction>, StorageError> {
        Ok(self
            .read()?
            .rollup_transactions
            .range((kind, 0)..=(kind, u64::MAX))
            .map(|(_, record)| record.clone())
            .collect())
    }

    /// Returns every stored state root, ordered by index.
    pub fn state_roots(&self) -> Result<Vec<StateRootEntry>, StorageError> {
        Ok(self.read()?.state_roots.values().cloned().collect())
    }
}

impl PersistenceStateReader for InMemoryChainStore {
    fn persistence_state(&self, block_number: u64) -> Result<PersistenceState, StorageError> {
        Ok(self.read()?.states.get(&block_number).copied().unwrap_or_default())
    }
}

impl ChainDataWriter for InMemoryChainStore {
    fn insert_block(&self, block: &BlockInfo, mark_processed: bool) -> Result<(), StorageError> {
        let mut tables = self.write()?;
        tables.put_block(block);
        let update = if mark_processed {
            PersistenceState::PROCESSED
        } else {
            PersistenceState { block_persisted: true, ..Default::default() }
        };
        tables.update_state(block.number, update);
        trace!(target: "dtl::storage", block_number = block.number, mark_processed, "Stored block");
        Ok(())
    }

    fn insert_block_with_transactions(
        &self,
        block: &BlockInfo,
        transactions: Vec<L1Transaction>,
        mark_processed: bool,
    ) -> Result<(), StorageError> {
        let mut tables = self.write()?;
        tables.put_block(block);

        let hashes = transactions.iter().map(|tx| tx.hash).collect::<Vec<_>>();
        for tx in transactions {
            tables.transactions.insert(tx.hash, tx);
        }
        tables.block_transactions.insert(block.number, hashes);

        let update = if mark_processed {
            PersistenceState::PROCESSED
        } else {
            PersistenceState {
                block_persisted: true,
                transactions_persisted: true,
                ..Default::default()
            }
        };
        tables.update_state(block.number, update);
        Ok(())
    }

    fn insert_rollup_transactions(
        &self,
        transaction_hash: B256,
        records: Vec<RollupTransaction>,
    ) -> Result<usize, StorageError> {
        let mut tables = self.write()?;
        tables.block_of_transaction(transaction_hash)?;

        let mut inserted = 0;
        for record in records {
            if tables.rollup_transactions.insert((record.kind, record.index), record).is_none() {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn insert_state_roots(
        &self,
        transaction_hash: B256,
        roots: Vec<StateRootEntry>,
    ) -> Result<usize, StorageError> {
        let mut tables = self.write()?;
        tables.block_of_transaction(transaction_hash)?;

        let mut inserted = 0;
        for root in roots {
            if tables.state_roots.insert(root.index, root).is_none() {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn mark_block_processed(&self, block_hash: B256) -> Result<(), StorageError> {
        let mut tables = self.write()?;
        let number = *tables
            .block_numbers
            .get(&block_hash)
            .ok_or_else(|| StorageError::EntryNotFound(format!("block {block_hash}")))?;
        tables.update_state(number, PersistenceState::PROCESSED);
        Ok(())
    }
}

impl ChainDataReader for InMemoryChainStore {
    fn block_by_number(&self, number: u64) -> Result<Option<BlockInfo>, StorageError> {
        Ok(self.read()?.blocks.get(&number).copied())
    }

    fn transactions_in_block(&self, number: u64) -> Result<Vec<L1Transaction>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .block_transactions
            .get(&number)
            .into_iter()
            .flatten()
            .filter_map(|hash| tables.transactions.get(hash).cloned())
            .collect())
    }

    fn rollup_transaction(
        &self,
        kind: RollupTransactionKind,
        index: u64,
    ) -> Result<Option<RollupTransaction>, StorageError> {
        Ok(self.read()?.rollup_transactions.get(&(kind, index)).cloned())
    }

    fn state_root(&self, index: u64) -> Result<Option<StateRootEntry>, StorageError> {
        Ok(self.read()?.state_roots.get(&index).cloned())
    }

    fn latest_processed_block(&self) -> Result<Option<BlockInfo>, StorageError> {
        let tables = self.read()?;
        Ok(tables
            .states
            .iter()
            .rev()
            .filter(|(_, state)| state.is_fully_processed())
            .find_map(|(number, _)| tables.blocks.get(number).copied()))
    }
}
