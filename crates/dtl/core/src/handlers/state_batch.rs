use super::{StateBatchAppended, appendStateBatchCall, to_u64};
use crate::{HandlerError, LogHandler};
use alloy_rpc_types_eth::Log;
use alloy_sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use kona_dtl_storage::ChainDataWriter;
use kona_dtl_types::{L1Transaction, StateRootEntry};
use tracing::trace;

/// Stores the state roots of a [`StateBatchAppended`] log, decoded from the `appendStateBatch`
/// calldata of the owning transaction and indexed from `_prevTotalElements`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StateBatchAppendedHandler;

#[async_trait]
impl LogHandler for StateBatchAppendedHandler {
    async fn handle(
        &self,
        writer: &dyn ChainDataWriter,
        log: &Log,
        transaction: &L1Transaction,
    ) -> Result<usize, HandlerError> {
        let event = StateBatchAppended::decode_log_data(log.data())?;
        let call = appendStateBatchCall::abi_decode(&transaction.input)?;

        let batch_size = to_u64(event._batchSize, "_batchSize")?;
        if call._batch.len() as u64 != batch_size {
            return Err(HandlerError::BatchSizeMismatch {
                expected: batch_size,
                actual: call._batch.len() as u64,
            });
        }

        let batch_index = to_u64(event._batchIndex, "_batchIndex")?;
        let start = to_u64(event._prevTotalElements, "_prevTotalElements")?;
        let roots = call
            ._batch
            .into_iter()
            .zip(start..)
            .map(|(value, index)| StateRootEntry {
                index,
                batch_index,
                value,
                l1_block_number: transaction.block_number,
                l1_transaction_hash: transaction.hash,
            })
            .collect::<Vec<_>>();

        trace!(
            target: "dtl::handlers",
            batch_index,
            start,
            roots = roots.len(),
            "Decoded state batch"
        );
        Ok(writer.insert_state_roots(transaction.hash, roots)?)
    }
}
