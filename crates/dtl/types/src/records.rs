//! Records derived from rollup contract events.
//!
//! The persistence pipeline never interprets these; they are produced by log handlers
//! and forwarded to storage.

use alloy_primitives::{Address, B256, Bytes};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Which queue a rollup transaction entered the L2 chain through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueOrigin {
    /// Submitted directly by the sequencer.
    #[display("sequencer")]
    Sequencer,
    /// Enqueued on the source chain.
    #[display("l1")]
    L1,
}

/// The kind of a [`RollupTransaction`], which also scopes its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollupTransactionKind {
    /// A queue entry created by a `TransactionEnqueued` event, indexed by queue index.
    #[display("enqueued")]
    Enqueued,
    /// A canonical chain element appended by a sequencer batch, indexed by chain position.
    #[display("sequenced")]
    Sequenced,
}

/// An L2-bound transaction extracted from a source chain log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupTransaction {
    /// The record kind.
    pub kind: RollupTransactionKind,
    /// Queue index for enqueued entries, canonical chain index for sequenced entries.
    pub index: u64,
    /// Where the transaction originated.
    pub queue_origin: QueueOrigin,
    /// The queue entry this transaction refers to, if it came through the L1 queue.
    pub queue_index: Option<u64>,
    /// The source chain account that enqueued the transaction.
    pub l1_tx_origin: Option<Address>,
    /// The L2 target of an enqueued transaction.
    pub target: Option<Address>,
    /// L2 gas limit.
    pub gas_limit: u64,
    /// L2 timestamp.
    pub timestamp: u64,
    /// Source chain block number the transaction is associated with.
    pub l1_block_number: u64,
    /// Hash of the source chain transaction that carried this record.
    pub l1_transaction_hash: B256,
    /// The L2 transaction payload.
    pub data: Bytes,
}

/// A committed L2 state root extracted from a source chain log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateRootEntry {
    /// Position of the root in the state commitment chain.
    pub index: u64,
    /// Index of the batch that committed the root.
    pub batch_index: u64,
    /// The state root.
    pub value: B256,
    /// Source chain block that included the batch.
    pub l1_block_number: u64,
    /// Hash of the source chain transaction that appended the batch.
    pub l1_transaction_hash: B256,
}
