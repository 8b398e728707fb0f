//! Durable chain data storage on top of RocksDB.

use crate::{ChainDataReader, ChainDataWriter, PersistenceStateReader, StorageError};
use alloy_primitives::B256;
use kona_dtl_types::{
    BlockInfo, L1Transaction, PersistenceState, RollupTransaction, RollupTransactionKind,
    StateRootEntry,
};
use rocksdb::{
    ColumnFamily, ColumnFamilyDescriptor, DB, IteratorMode, Options, WriteBatch,
};
use serde::{Serialize, de::DeserializeOwned};
use std::{path::Path, sync::Mutex};
use tracing::{debug, trace};

/// Column family names.
mod cf {
    /// Block number -> [`BlockInfo`](kona_dtl_types::BlockInfo).
    pub(super) const BLOCKS: &str = "blocks";
    /// Block hash -> block number.
    pub(super) const BLOCK_HASHES: &str = "block_hashes";
    /// Transaction hash -> [`L1Transaction`](kona_dtl_types::L1Transaction).
    pub(super) const TRANSACTIONS: &str = "transactions";
    /// Block number -> ordered transaction hashes.
    pub(super) const BLOCK_TRANSACTIONS: &str = "block_transactions";
    /// (kind, index) -> [`RollupTransaction`](kona_dtl_types::RollupTransaction).
    pub(super) const ROLLUP_TRANSACTIONS: &str = "rollup_transactions";
    /// Index -> [`StateRootEntry`](kona_dtl_types::StateRootEntry).
    pub(super) const STATE_ROOTS: &str = "state_roots";
    /// Block number -> [`PersistenceState`](kona_dtl_types::PersistenceState).
    pub(super) const PERSISTENCE_STATE: &str = "persistence_state";

    pub(super) const ALL: [&str; 7] = [
        BLOCKS,
        BLOCK_HASHES,
        TRANSACTIONS,
        BLOCK_TRANSACTIONS,
        ROLLUP_TRANSACTIONS,
        STATE_ROOTS,
        PERSISTENCE_STATE,
    ];
}

/// Manages the RocksDB environment for the source chain.
///
/// Every write method commits a single [`WriteBatch`], so a crash never leaves a block or a
/// flag update half-written. Values are JSON encoded; integer keys are big-endian so that
/// iteration order matches numeric order.
#[derive(Debug)]
pub struct ChainDb {
    db: DB,
    /// Serializes read-modify-write cycles on persistence records.
    write_lock: Mutex<()>,
}

impl ChainDb {
    /// Creates or opens a database environment at the given path.
    pub fn new(path: &Path) -> Result<Self, StorageError> {
        let mut options = Options::default();
        options.create_if_missing(true);
        options.create_missing_column_families(true);

        let descriptors = cf::ALL
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&options, path, descriptors)?;
        debug!(target: "dtl::storage", path = %path.display(), "Opened chain database");
        Ok(Self { db, write_lock: Mutex::new(()) })
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::EntryNotFound(format!("column family `{name}`")))
    }

    fn get<V: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<V>, StorageError> {
        let cf = self.cf_handle(cf_name)?;
        self.db
            .get_cf(cf, key)?
            .map(|bytes| serde_json::from_slice(&bytes))
            .transpose()
            .map_err(Into::into)
    }

    fn put<V: Serialize>(
        &self,
        batch: &mut WriteBatch,
        cf_name: &str,
        key: &[u8],
        value: &V,
    ) -> Result<(), StorageError> {
        let cf = self.cf_handle(cf_name)?;
        batch.put_cf(cf, key, serde_json::to_vec(value)?);
        Ok(())
    }

    fn exists(&self, cf_name: &str, key: &[u8]) -> Result<bool, StorageError> {
        let cf = self.cf_handle(cf_name)?;
        Ok(self.db.get_pinned_cf(cf, key)?.is_some())
    }

    fn stage_state(
        &self,
        batch: &mut WriteBatch,
        number: u64,
        update: PersistenceState,
    ) -> Result<(), StorageError> {
        let key = number.to_be_bytes();
        let current: PersistenceState =
            self.get(cf::PERSISTENCE_STATE, &key)?.unwrap_or_default();
        self.put(batch, cf::PERSISTENCE_STATE, &key, &current.merge(update))
    }

    fn stage_block(&self, batch: &mut WriteBatch, block: &BlockInfo) -> Result<(), StorageError> {
        let key = block.number.to_be_bytes();
        if let Some(previous) = self.get::<BlockInfo>(cf::BLOCKS, &key)? {
            if previous.hash != block.hash {
                batch.delete_cf(self.cf_handle(cf::BLOCK_HASHES)?, previous.hash);
            }
        }
        self.put(batch, cf::BLOCKS, &key, block)?;
        self.put(batch, cf::BLOCK_HASHES, block.hash.as_slice(), &block.number)
    }

    fn ensure_known_transaction(&self, hash: B256) -> Result<(), StorageError> {
        if self.exists(cf::TRANSACTIONS, hash.as_slice())? {
            Ok(())
        } else {
            Err(StorageError::EntryNotFound(format!("transaction {hash}")))
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, StorageError> {
        self.write_lock.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn rollup_key(kind: RollupTransactionKind, index: u64) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = match kind {
        RollupTransactionKind::Enqueued => 0,
        RollupTransactionKind::Sequenced => 1,
    };
    key[1..].copy_from_slice(&index.to_be_bytes());
    key
}

impl PersistenceStateReader for ChainDb {
    fn persistence_state(&self, block_number: u64) -> Result<PersistenceState, StorageError> {
        Ok(self.get(cf::PERSISTENCE_STATE, &block_number.to_be_bytes())?.unwrap_or_default())
    }
}

impl ChainDataWriter for ChainDb {
    fn insert_block(&self, block: &BlockInfo, mark_processed: bool) -> Result<(), StorageError> {
        let _guard = self.lock()?;
        let mut batch = WriteBatch::default();
        self.stage_block(&mut batch, block)?;

        let update = if mark_processed {
            PersistenceState::PROCESSED
        } else {
            PersistenceState { block_persisted: true, ..Default::default() }
        };
        self.stage_state(&mut batch, block.number, update)?;
        self.db.write(batch)?;

        trace!(target: "dtl::storage", block_number = block.number, mark_processed, "Stored block");
        Ok(())
    }

    fn insert_block_with_transactions(
        &self,
        block: &BlockInfo,
        transactions: Vec<L1Transaction>,
        mark_processed: bool,
    ) -> Result<(), StorageError> {
        let _guard = self.lock()?;
        let mut batch = WriteBatch::default();
        self.stage_block(&mut batch, block)?;

        let hashes = transactions.iter().map(|tx| tx.hash).collect::<Vec<_>>();
        for tx in &transactions {
            self.put(&mut batch, cf::TRANSACTIONS, tx.hash.as_slice(), tx)?;
        }
        self.put(&mut batch, cf::BLOCK_TRANSACTIONS, &block.number.to_be_bytes(), &hashes)?;

        let update = if mark_processed {
            PersistenceState::PROCESSED
        } else {
            PersistenceState {
                block_persisted: true,
                transactions_persisted: true,
                ..Default::default()
            }
        };
        self.stage_state(&mut batch, block.number, update)?;
        self.db.write(batch)?;

        trace!(
            target: "dtl::storage",
            block_number = block.number,
            transactions = hashes.len(),
            mark_processed,
            "Stored block with transactions"
        );
        Ok(())
    }

    fn insert_rollup_transactions(
        &self,
        transaction_hash: B256,
        records: Vec<RollupTransaction>,
    ) -> Result<usize, StorageError> {
        let _guard = self.lock()?;
        self.ensure_known_transaction(transaction_hash)?;

        let mut batch = WriteBatch::default();
        let mut inserted = 0;
        for record in &records {
            let key = rollup_key(record.kind, record.index);
            if !self.exists(cf::ROLLUP_TRANSACTIONS, &key)? {
                inserted += 1;
            }
            self.put(&mut batch, cf::ROLLUP_TRANSACTIONS, &key, record)?;
        }
        self.db.write(batch)?;
        Ok(inserted)
    }

    fn insert_state_roots(
        &self,
        transaction_hash: B256,
        roots: Vec<StateRootEntry>,
    ) -> Result<usize, StorageError> {
        let _guard = self.lock()?;
        self.ensure_known_transaction(transaction_hash)?;

        let mut batch = WriteBatch::default();
        let mut inserted = 0;
        for root in &roots {
            let key = root.index.to_be_bytes();
            if !self.exists(cf::STATE_ROOTS, &key)? {
                inserted += 1;
            }
            self.put(&mut batch, cf::STATE_ROOTS, &key, root)?;
        }
        self.db.write(batch)?;
        Ok(inserted)
    }

    fn mark_block_processed(&self, block_hash: B256) -> Result<(), StorageError> {
        let _guard = self.lock()?;
        let number: u64 = self
            .get(cf::BLOCK_HASHES, block_hash.as_slice())?
            .ok_or_else(|| StorageError::EntryNotFound(format!("block {block_hash}")))?;

        let mut batch = WriteBatch::default();
        self.stage_state(&mut batch, number, PersistenceState::PROCESSED)?;
        self.db.write(batch)?;
        Ok(())
    }
}

impl ChainDataReader for ChainDb {
    fn block_by_number(&self, number: u64) -> Result<Option<BlockInfo>, StorageError> {
        self.get(cf::BLOCKS, &number.to_be_bytes())
    }

    fn transactions_in_block(&self, number: u64) -> Result<Vec<L1Transaction>, StorageError> {
        let hashes: Vec<B256> =
            self.get(cf::BLOCK_TRANSACTIONS, &number.to_be_bytes())?.unwrap_or_default();

        let mut transactions = Vec::with_capacity(hashes.len());
        for hash in hashes {
            if let Some(tx) = self.get(cf::TRANSACTIONS, hash.as_slice())? {
                transactions.push(tx);
            }
        }
        Ok(transactions)
    }

    fn rollup_transaction(
        &self,
        kind: RollupTransactionKind,
        index: u64,
    ) -> Result<Option<RollupTransaction>, StorageError> {
        self.get(cf::ROLLUP_TRANSACTIONS, &rollup_key(kind, index))
    }

    fn state_root(&self, index: u64) -> Result<Option<StateRootEntry>, StorageError> {
        self.get(cf::STATE_ROOTS, &index.to_be_bytes())
    }

    fn latest_processed_block(&self) -> Result<Option<BlockInfo>, StorageError> {
        let cf = self.cf_handle(cf::PERSISTENCE_STATE)?;
        for item in self.db.iterator_cf(cf, IteratorMode::End) {
            let (key, value) = item?;
            let state: PersistenceState = serde_json::from_slice(&value)?;
            if !state.is_fully_processed() {
                continue;
            }
            return self.get(cf::BLOCKS, &key);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Bytes;
    use kona_dtl_types::QueueOrigin;
    use tempfile::TempDir;

    fn open() -> (TempDir, ChainDb) {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let db = ChainDb::new(&tmp_dir.path().join("chaindb")).expect("open chaindb");
        (tmp_dir, db)
    }

    fn block(number: u64) -> BlockInfo {
        BlockInfo::new(B256::with_last_byte(number as u8), number, B256::ZERO, 1_000 + number)
    }

    fn tx(hash: u8, block: &BlockInfo) -> L1Transaction {
        L1Transaction {
            hash: B256::repeat_byte(hash),
            block_hash: block.hash,
            block_number: block.number,
            input: Bytes::from_static(&[0xde, 0xad]),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_and_open_db() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let db_path = tmp_dir.path().join("chaindb");
        assert!(ChainDb::new(&db_path).is_ok(), "Should create database");
        assert!(ChainDb::new(&db_path).is_ok(), "Should reopen existing database");
    }

    #[test]
    fn test_block_with_transactions_roundtrip() {
        let (_dir, db) = open();
        let b = block(10);
        let txs = vec![tx(2, &b), tx(1, &b)];

        db.insert_block_with_transactions(&b, txs.clone(), false).unwrap();

        assert_eq!(db.block_by_number(10).unwrap(), Some(b));
        assert_eq!(db.transactions_in_block(10).unwrap(), txs);

        let state = db.persistence_state(10).unwrap();
        assert!(state.block_persisted && state.transactions_persisted);
        assert!(!state.rollup_transactions_persisted && !state.state_roots_persisted);
    }

    #[test]
    fn test_state_roots_idempotent_and_flag_free() {
        let (_dir, db) = open();
        let b = block(11);
        let t = tx(7, &b);
        db.insert_block_with_transactions(&b, vec![t.clone()], false).unwrap();

        let roots = (0..3)
            .map(|index| StateRootEntry {
                index,
                batch_index: 0,
                value: B256::repeat_byte(index as u8 + 1),
                l1_block_number: b.number,
                l1_transaction_hash: t.hash,
            })
            .collect::<Vec<_>>();

        assert_eq!(db.insert_state_roots(t.hash, roots.clone()).unwrap(), 3);
        assert_eq!(db.insert_state_roots(t.hash, roots).unwrap(), 0);
        assert!(!db.persistence_state(11).unwrap().state_roots_persisted);
        assert_eq!(db.state_root(2).unwrap().unwrap().value, B256::repeat_byte(3));
    }

    #[test]
    fn test_rollup_transactions_keyed_by_kind() {
        let (_dir, db) = open();
        let b = block(12);
        let t = tx(8, &b);
        db.insert_block_with_transactions(&b, vec![t.clone()], false).unwrap();

        let record = |kind| RollupTransaction {
            kind,
            index: 0,
            queue_origin: QueueOrigin::L1,
            queue_index: Some(0),
            l1_tx_origin: None,
            target: None,
            gas_limit: 0,
            timestamp: 0,
            l1_block_number: b.number,
            l1_transaction_hash: t.hash,
            data: Bytes::new(),
        };
        let records =
            vec![record(RollupTransactionKind::Enqueued), record(RollupTransactionKind::Sequenced)];
        assert_eq!(db.insert_rollup_transactions(t.hash, records).unwrap(), 2);
        assert!(db.rollup_transaction(RollupTransactionKind::Enqueued, 0).unwrap().is_some());
        assert!(db.rollup_transaction(RollupTransactionKind::Sequenced, 0).unwrap().is_some());
        assert!(db.rollup_transaction(RollupTransactionKind::Sequenced, 1).unwrap().is_none());
    }

    #[test]
    fn test_mark_processed_and_latest() {
        let (_dir, db) = open();
        db.insert_block(&block(1), true).unwrap();
        db.insert_block(&block(2), false).unwrap();
        assert_eq!(db.latest_processed_block().unwrap(), Some(block(1)));

        db.mark_block_processed(block(2).hash).unwrap();
        assert_eq!(db.persistence_state(2).unwrap(), PersistenceState::PROCESSED);
        assert_eq!(db.latest_processed_block().unwrap(), Some(block(2)));
    }

    #[test]
    fn test_state_survives_reopen() {
        let tmp_dir = TempDir::new().expect("create temp dir");
        let path = tmp_dir.path().join("chaindb");
        {
            let db = ChainDb::new(&path).unwrap();
            db.insert_block(&block(5), false).unwrap();
        }
        let db = ChainDb::new(&path).unwrap();
        assert!(db.persistence_state(5).unwrap().block_persisted);
        assert!(matches!(
            db.mark_block_processed(B256::repeat_byte(0xee)),
            Err(StorageError::EntryNotFound(_))
        ));
    }
}
