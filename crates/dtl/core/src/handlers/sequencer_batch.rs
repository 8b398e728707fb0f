use super::{SequencerBatchAppended, appendSequencerBatchCall, to_u64};
use crate::{HandlerError, LogHandler};
use alloy_primitives::Bytes;
use alloy_rpc_types_eth::Log;
use alloy_sol_types::{SolCall, SolEvent};
use async_trait::async_trait;
use kona_dtl_storage::ChainDataWriter;
use kona_dtl_types::{L1Transaction, QueueOrigin, RollupTransaction, RollupTransactionKind};
use tracing::trace;

/// Size of an encoded [`BatchContext`].
const CONTEXT_SIZE: usize = 16;

/// A group of consecutive batch elements that share a timestamp and L1 block number.
///
/// The context's sequencer transactions come first, followed by its queue elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchContext {
    /// Number of sequencer transactions in the context.
    pub num_sequenced_transactions: u64,
    /// Number of queue elements following the sequencer transactions.
    pub num_subsequent_queue_transactions: u64,
    /// Timestamp of every element in the context.
    pub timestamp: u64,
    /// L1 block number of every element in the context.
    pub block_number: u64,
}

/// The compact calldata of an `appendSequencerBatch` call.
///
/// Layout after the selector, all integers big-endian:
///
/// | field                   | size         |
/// |-------------------------|--------------|
/// | `shouldStartAtElement`  | 5            |
/// | `totalElementsToAppend` | 3            |
/// | `numContexts`           | 3            |
/// | contexts                | 16 each      |
/// | transactions            | 3 + len each |
///
/// A context is `numSequencedTransactions (3) | numSubsequentQueueTransactions (3) |
/// timestamp (5) | blockNumber (5)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerBatch {
    /// Index of the first element of the batch in the canonical transaction chain.
    pub should_start_at_element: u64,
    /// Number of elements in the batch, sequencer transactions and queue elements combined.
    pub total_elements_to_append: u64,
    /// The batch contexts.
    pub contexts: Vec<BatchContext>,
    /// The raw sequencer transactions, in order.
    pub transactions: Vec<Bytes>,
}

impl SequencerBatch {
    /// Decodes the calldata of an `appendSequencerBatch` call, selector included.
    pub fn decode(input: &[u8]) -> Result<Self, HandlerError> {
        let data = input
            .strip_prefix(appendSequencerBatchCall::SELECTOR.as_slice())
            .ok_or_else(|| HandlerError::MalformedBatch("unexpected selector".to_string()))?;
        let mut reader = BatchReader::new(data);

        let should_start_at_element = reader.read_uint(5, "shouldStartAtElement")?;
        let total_elements_to_append = reader.read_uint(3, "totalElementsToAppend")?;
        let num_contexts = reader.read_uint(3, "numContexts")? as usize;

        if reader.remaining() < num_contexts * CONTEXT_SIZE {
            return Err(HandlerError::MalformedBatch(format!(
                "calldata too short for {num_contexts} contexts"
            )));
        }
        let contexts = (0..num_contexts)
            .map(|_| {
                Ok(BatchContext {
                    num_sequenced_transactions: reader.read_uint(3, "numSequencedTransactions")?,
                    num_subsequent_queue_transactions: reader
                        .read_uint(3, "numSubsequentQueueTransactions")?,
                    timestamp: reader.read_uint(5, "timestamp")?,
                    block_number: reader.read_uint(5, "blockNumber")?,
                })
            })
            .collect::<Result<Vec<_>, HandlerError>>()?;

        let elements: u64 = contexts
            .iter()
            .map(|c| c.num_sequenced_transactions + c.num_subsequent_queue_transactions)
            .sum();
        if elements != total_elements_to_append {
            return Err(HandlerError::BatchSizeMismatch {
                expected: total_elements_to_append,
                actual: elements,
            });
        }

        let num_transactions: u64 = contexts.iter().map(|c| c.num_sequenced_transactions).sum();
        let transactions = (0..num_transactions)
            .map(|_| {
                let len = reader.read_uint(3, "transaction length")? as usize;
                Ok(Bytes::copy_from_slice(reader.read_bytes(len, "transaction")?))
            })
            .collect::<Result<Vec<_>, HandlerError>>()?;

        if reader.remaining() != 0 {
            return Err(HandlerError::MalformedBatch(format!(
                "{} trailing bytes",
                reader.remaining()
            )));
        }

        Ok(Self { should_start_at_element, total_elements_to_append, contexts, transactions })
    }

    /// Number of queue elements referenced by the batch.
    pub fn num_queue_elements(&self) -> u64 {
        self.contexts.iter().map(|c| c.num_subsequent_queue_transactions).sum()
    }
}

/// Cursor over compact batch calldata.
#[derive(Debug)]
struct BatchReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BatchReader<'a> {
    const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    const fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    fn read_bytes(&mut self, len: usize, field: &str) -> Result<&'a [u8], HandlerError> {
        let bytes = self
            .data
            .get(self.offset..self.offset + len)
            .ok_or_else(|| HandlerError::MalformedBatch(format!("truncated at `{field}`")))?;
        self.offset += len;
        Ok(bytes)
    }

    /// Reads a big-endian unsigned integer of `width` bytes, at most 8.
    fn read_uint(&mut self, width: usize, field: &str) -> Result<u64, HandlerError> {
        let mut buf = [0u8; 8];
        buf[8 - width..].copy_from_slice(self.read_bytes(width, field)?);
        Ok(u64::from_be_bytes(buf))
    }
}

/// Expands a [`SequencerBatchAppended`] log into [`RollupTransactionKind::Sequenced`] records,
/// decoded from the calldata of the owning `appendSequencerBatch` transaction.
///
/// Sequencer elements carry their raw transaction. Queue elements reference the enqueued
/// transaction by queue index, counting up from the event's `_startingQueueIndex`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequencerBatchAppendedHandler;

#[async_trait]
impl LogHandler for SequencerBatchAppendedHandler {
    async fn handle(
        &self,
        writer: &dyn ChainDataWriter,
        log: &Log,
        transaction: &L1Transaction,
    ) -> Result<usize, HandlerError> {
        let event = SequencerBatchAppended::decode_log_data(log.data())?;
        let batch = SequencerBatch::decode(&transaction.input)?;

        let num_queue_elements = to_u64(event._numQueueElements, "_numQueueElements")?;
        if batch.num_queue_elements() != num_queue_elements {
            return Err(HandlerError::BatchSizeMismatch {
                expected: num_queue_elements,
                actual: batch.num_queue_elements(),
            });
        }
        let total_elements = to_u64(event._totalElements, "_totalElements")?;
        if batch.should_start_at_element + batch.total_elements_to_append != total_elements {
            return Err(HandlerError::BatchSizeMismatch {
                expected: total_elements.saturating_sub(batch.should_start_at_element),
                actual: batch.total_elements_to_append,
            });
        }

        let mut queue_index = to_u64(event._startingQueueIndex, "_startingQueueIndex")?;
        let mut index = batch.should_start_at_element;
        let mut sequenced = batch.transactions.into_iter();
        let mut records = Vec::with_capacity(batch.total_elements_to_append as usize);

        for context in &batch.contexts {
            let element = |index, queue_origin, queue_index, data| RollupTransaction {
                kind: RollupTransactionKind::Sequenced,
                index,
                queue_origin,
                queue_index,
                l1_tx_origin: None,
                target: None,
                gas_limit: 0,
                timestamp: context.timestamp,
                l1_block_number: context.block_number,
                l1_transaction_hash: transaction.hash,
                data,
            };

            for _ in 0..context.num_sequenced_transactions {
                let data = sequenced.next().ok_or_else(|| {
                    HandlerError::MalformedBatch("missing sequencer transaction".to_string())
                })?;
                records.push(element(index, QueueOrigin::Sequencer, None, data));
                index += 1;
            }
            for _ in 0..context.num_subsequent_queue_transactions {
                records.push(element(index, QueueOrigin::L1, Some(queue_index), Bytes::new()));
                queue_index += 1;
                index += 1;
            }
        }

        trace!(
            target: "dtl::handlers",
            start = batch.should_start_at_element,
            elements = records.len(),
            contexts = batch.contexts.len(),
            "Decoded sequencer batch"
        );
        Ok(writer.insert_rollup_transactions(transaction.hash, records)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::tests::{CTC, l1_transaction, rpc_log, store_with};
    use alloy_primitives::{B256, U256, bytes};
    use kona_dtl_storage::ChainDataReader;

    fn uint(value: u64, width: usize) -> Vec<u8> {
        value.to_be_bytes()[8 - width..].to_vec()
    }

    /// Encodes a batch from `(num_sequenced, num_queue, timestamp, block_number)` contexts.
    fn encode(start: u64, contexts: &[(u64, u64, u64, u64)], txs: &[&[u8]]) -> Bytes {
        let total: u64 = contexts.iter().map(|c| c.0 + c.1).sum();
        let mut out = appendSequencerBatchCall::SELECTOR.to_vec();
        out.extend(uint(start, 5));
        out.extend(uint(total, 3));
        out.extend(uint(contexts.len() as u64, 3));
        for (sequenced, queued, timestamp, block_number) in contexts {
            out.extend(uint(*sequenced, 3));
            out.extend(uint(*queued, 3));
            out.extend(uint(*timestamp, 5));
            out.extend(uint(*block_number, 5));
        }
        for tx in txs {
            out.extend(uint(tx.len() as u64, 3));
            out.extend_from_slice(tx);
        }
        out.into()
    }

    fn appended(starting_queue_index: u64, num_queue: u64, total: u64) -> SequencerBatchAppended {
        SequencerBatchAppended {
            _startingQueueIndex: U256::from(starting_queue_index),
            _numQueueElements: U256::from(num_queue),
            _totalElements: U256::from(total),
        }
    }

    #[test]
    fn test_decode_batch() {
        let input = encode(10, &[(2, 1, 1_000, 50), (0, 1, 1_010, 51)], &[&[0xaa], &[0xbb, 0xcc]]);
        let batch = SequencerBatch::decode(&input).unwrap();

        assert_eq!(batch.should_start_at_element, 10);
        assert_eq!(batch.total_elements_to_append, 4);
        assert_eq!(
            batch.contexts[0],
            BatchContext {
                num_sequenced_transactions: 2,
                num_subsequent_queue_transactions: 1,
                timestamp: 1_000,
                block_number: 50,
            }
        );
        assert_eq!(batch.transactions, vec![bytes!("aa"), bytes!("bbcc")]);
        assert_eq!(batch.num_queue_elements(), 2);
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        let input = encode(0, &[(1, 0, 1, 1)], &[&[0x01]]);

        let mut wrong_selector = input.to_vec();
        wrong_selector[0] ^= 0xff;
        assert!(matches!(
            SequencerBatch::decode(&wrong_selector),
            Err(HandlerError::MalformedBatch(_))
        ));

        assert!(matches!(
            SequencerBatch::decode(&input[..input.len() - 1]),
            Err(HandlerError::MalformedBatch(_))
        ));

        let mut trailing = input.to_vec();
        trailing.push(0);
        assert!(matches!(SequencerBatch::decode(&trailing), Err(HandlerError::MalformedBatch(_))));
    }

    #[test]
    fn test_decode_rejects_wrong_total() {
        let mut input = encode(0, &[(1, 0, 1, 1)], &[&[0x01]]).to_vec();
        // totalElementsToAppend follows the selector and the 5-byte start.
        input[4 + 5 + 2] = 2;
        assert!(matches!(
            SequencerBatch::decode(&input),
            Err(HandlerError::BatchSizeMismatch { expected: 2, actual: 1 })
        ));
    }

    #[tokio::test]
    async fn test_batch_is_stored_in_order() {
        let input = encode(10, &[(2, 1, 1_000, 50), (0, 1, 1_010, 51)], &[&[0xaa], &[0xbb]]);
        let tx = l1_transaction(B256::repeat_byte(0x5b), CTC, input);
        let store = store_with(&tx);
        let log = rpc_log(CTC, appended(7, 2, 14).encode_log_data(), tx.hash);

        let written = SequencerBatchAppendedHandler.handle(&store, &log, &tx).await.unwrap();
        assert_eq!(written, 4);

        let stored = store.rollup_transactions(RollupTransactionKind::Sequenced).unwrap();
        let summary = stored
            .iter()
            .map(|r| (r.index, r.queue_origin, r.queue_index, r.timestamp, r.data.clone()))
            .collect::<Vec<_>>();
        assert_eq!(
            summary,
            vec![
                (10, QueueOrigin::Sequencer, None, 1_000, bytes!("aa")),
                (11, QueueOrigin::Sequencer, None, 1_000, bytes!("bb")),
                (12, QueueOrigin::L1, Some(7), 1_000, Bytes::new()),
                (13, QueueOrigin::L1, Some(8), 1_010, Bytes::new()),
            ]
        );
        assert!(stored.iter().all(|r| r.l1_transaction_hash == tx.hash));
    }

    #[tokio::test]
    async fn test_queue_count_mismatch() {
        let input = encode(0, &[(1, 1, 1, 1)], &[&[0x01]]);
        let tx = l1_transaction(B256::repeat_byte(0x5c), CTC, input);
        let store = store_with(&tx);
        let log = rpc_log(CTC, appended(0, 3, 2).encode_log_data(), tx.hash);

        assert!(matches!(
            SequencerBatchAppendedHandler.handle(&store, &log, &tx).await,
            Err(HandlerError::BatchSizeMismatch { expected: 3, actual: 1 })
        ));
        assert!(store.rollup_transactions(RollupTransactionKind::Sequenced).unwrap().is_empty());
    }
}
