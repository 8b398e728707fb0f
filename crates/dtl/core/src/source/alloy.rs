use super::{BlockSource, ChainSource, ChainSourceError, LogFilter};
use alloy_consensus::Transaction as ConsensusTransaction;
use alloy_eips::BlockNumberOrTag;
use alloy_network_primitives::TransactionResponse;
use alloy_primitives::B256;
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_types_eth::{Filter, Log, Transaction};
use async_trait::async_trait;
use kona_dtl_types::{BlockInfo, L1Transaction};
use tracing::trace;
use url::Url;

/// A [`ChainSource`] and [`BlockSource`] backed by an alloy [`RootProvider`].
#[derive(Debug, Clone)]
pub struct AlloyChainSource {
    /// The inner Ethereum JSON-RPC provider.
    inner: RootProvider,
}

impl AlloyChainSource {
    /// Creates a new [`AlloyChainSource`] with the given alloy provider.
    pub const fn new(inner: RootProvider) -> Self {
        Self { inner }
    }

    /// Creates a new [`AlloyChainSource`] from the provided [`Url`].
    pub fn new_http(url: Url) -> Self {
        Self::new(RootProvider::new_http(url))
    }
}

fn to_l1_transaction(tx: Transaction) -> L1Transaction {
    L1Transaction {
        hash: TransactionResponse::tx_hash(&tx),
        block_hash: tx.block_hash.unwrap_or_default(),
        block_number: tx.block_number.unwrap_or_default(),
        transaction_index: tx.transaction_index.unwrap_or_default(),
        from: TransactionResponse::from(&tx),
        to: ConsensusTransaction::to(&tx),
        nonce: ConsensusTransaction::nonce(&tx),
        gas_limit: ConsensusTransaction::gas_limit(&tx),
        value: ConsensusTransaction::value(&tx),
        input: ConsensusTransaction::input(&tx).clone(),
    }
}

#[async_trait]
impl ChainSource for AlloyChainSource {
    async fn logs(&self, filter: &LogFilter) -> Result<Vec<Log>, ChainSourceError> {
        let logs = self.inner.get_logs(&Filter::from(*filter)).await?;
        trace!(
            target: "dtl::source",
            block_hash = %filter.block_hash,
            address = %filter.address,
            topic = %filter.topic,
            count = logs.len(),
            "Fetched logs"
        );
        Ok(logs)
    }

    async fn transaction_by_hash(
        &self,
        hash: B256,
    ) -> Result<Option<L1Transaction>, ChainSourceError> {
        Ok(self.inner.get_transaction_by_hash(hash).await?.map(to_l1_transaction))
    }
}

#[async_trait]
impl BlockSource for AlloyChainSource {
    async fn latest_block_number(&self) -> Result<u64, ChainSourceError> {
        Ok(self.inner.get_block_number().await?)
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<BlockInfo>, ChainSourceError> {
        let block = self.inner.get_block_by_number(BlockNumberOrTag::Number(number)).await?;
        Ok(block.map(|block| {
            let header = block.header;
            BlockInfo::new(header.hash, header.number, header.parent_hash, header.timestamp)
        }))
    }
}
