use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};

/// A source chain transaction that owns at least one relevant log.
///
/// The content is opaque to the persistence pipeline: it is forwarded from the chain
/// source to storage and to log handlers without interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct L1Transaction {
    /// The transaction hash.
    pub hash: B256,
    /// Hash of the block that includes the transaction.
    pub block_hash: B256,
    /// Number of the block that includes the transaction.
    pub block_number: u64,
    /// Position of the transaction within its block.
    pub transaction_index: u64,
    /// The sender.
    pub from: Address,
    /// The recipient, `None` for contract creations.
    pub to: Option<Address>,
    /// The sender nonce.
    pub nonce: u64,
    /// The gas limit.
    pub gas_limit: u64,
    /// The transferred value.
    pub value: U256,
    /// The calldata.
    pub input: Bytes,
}
