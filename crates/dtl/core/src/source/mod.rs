//! Read-only access to the source chain.

use alloy_primitives::{Address, B256};
use alloy_rpc_types_eth::{Filter, Log};
use alloy_transport::TransportError;
use async_trait::async_trait;
use kona_dtl_types::{BlockInfo, L1Transaction};
use thiserror::Error;

mod alloy;
pub use alloy::AlloyChainSource;

/// Selects the logs emitted by one contract with one topic inside one block.
///
/// Scoping the filter to a block hash keeps logs of other blocks out of the block being
/// handled, even across re-orgs at the same height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogFilter {
    /// The block whose logs are requested.
    pub block_hash: B256,
    /// The emitting contract.
    pub address: Address,
    /// A topic the log must carry.
    pub topic: B256,
}

impl LogFilter {
    /// Creates a new [`LogFilter`].
    pub const fn new(block_hash: B256, address: Address, topic: B256) -> Self {
        Self { block_hash, address, topic }
    }
}

impl From<LogFilter> for Filter {
    fn from(filter: LogFilter) -> Self {
        Self::new()
            .at_block_hash(filter.block_hash)
            .address(filter.address)
            .event_signature(filter.topic)
    }
}

/// Errors returned by [`ChainSource`] and [`BlockSource`] implementations.
#[derive(Debug, Error)]
pub enum ChainSourceError {
    /// The RPC transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The source chain has no block at the requested height.
    #[error("Block {0} not found")]
    BlockNotFound(u64),
}

/// Fetches logs and transactions from the source chain.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Returns the logs selected by `filter`, in the order the chain returns them.
    async fn logs(&self, filter: &LogFilter) -> Result<Vec<Log>, ChainSourceError>;

    /// Returns the transaction with the given hash, or `None` if the chain doesn't know it.
    async fn transaction_by_hash(
        &self,
        hash: B256,
    ) -> Result<Option<L1Transaction>, ChainSourceError>;
}

/// Fetches block headers from the source chain.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Returns the height of the latest block.
    async fn latest_block_number(&self) -> Result<u64, ChainSourceError>;

    /// Returns the block at the given height, if it exists.
    async fn block_by_number(&self, number: u64) -> Result<Option<BlockInfo>, ChainSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_log_filter_is_scoped_to_block() {
        let block_hash = B256::repeat_byte(0xab);
        let contract = address!("0x00000000000000000000000000000000000000aa");
        let topic = B256::repeat_byte(0x01);

        let filter = Filter::from(LogFilter::new(block_hash, contract, topic));

        assert_eq!(filter.get_block_hash(), Some(block_hash));
        assert!(filter.address.matches(&contract));
        assert!(!filter.address.matches(&Address::ZERO));
        assert!(filter.topics[0].matches(&topic));
        assert!(!filter.topics[0].matches(&B256::ZERO));
    }
}
