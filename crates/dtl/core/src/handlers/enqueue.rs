use super::{TransactionEnqueued, to_u64};
use crate::{HandlerError, LogHandler};
use alloy_rpc_types_eth::Log;
use alloy_sol_types::SolEvent;
use async_trait::async_trait;
use kona_dtl_storage::ChainDataWriter;
use kona_dtl_types::{L1Transaction, QueueOrigin, RollupTransaction, RollupTransactionKind};
use tracing::trace;

/// Stores one [`RollupTransactionKind::Enqueued`] record per [`TransactionEnqueued`] log,
/// indexed by its queue index.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionEnqueuedHandler;

#[async_trait]
impl LogHandler for TransactionEnqueuedHandler {
    async fn handle(
        &self,
        writer: &dyn ChainDataWriter,
        log: &Log,
        transaction: &L1Transaction,
    ) -> Result<usize, HandlerError> {
        let event = TransactionEnqueued::decode_log_data(log.data())?;
        let queue_index = to_u64(event._queueIndex, "_queueIndex")?;

        let record = RollupTransaction {
            kind: RollupTransactionKind::Enqueued,
            index: queue_index,
            queue_origin: QueueOrigin::L1,
            queue_index: Some(queue_index),
            l1_tx_origin: Some(event._l1TxOrigin),
            target: Some(event._target),
            gas_limit: to_u64(event._gasLimit, "_gasLimit")?,
            timestamp: to_u64(event._timestamp, "_timestamp")?,
            l1_block_number: log.block_number.ok_or(HandlerError::MissingLogField("block_number"))?,
            l1_transaction_hash: transaction.hash,
            data: event._data,
        };

        trace!(
            target: "dtl::handlers",
            queue_index,
            %transaction.hash,
            "Decoded enqueued transaction"
        );
        Ok(writer.insert_rollup_transactions(transaction.hash, vec![record])?)
    }
}
