//! Log handlers for the rollup contracts.
//!
//! The canonical transaction chain emits [`TransactionEnqueued`] and [`SequencerBatchAppended`],
//! both of which produce rollup transactions. The state commitment chain emits
//! [`StateBatchAppended`], which produces state roots.

use crate::{HandlerBinding, HandlerError, HandlerKind, HandlerRegistry};
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolEvent;

mod contracts;
pub use contracts::{
    SequencerBatchAppended, StateBatchAppended, TransactionEnqueued, appendSequencerBatchCall,
    appendStateBatchCall,
};

mod enqueue;
pub use enqueue::TransactionEnqueuedHandler;

mod sequencer_batch;
pub use sequencer_batch::{BatchContext, SequencerBatch, SequencerBatchAppendedHandler};

mod state_batch;
pub use state_batch::StateBatchAppendedHandler;

/// Returns the bindings for the canonical transaction chain at `ctc` and the state commitment
/// chain at `scc`, in registration order.
pub fn rollup_contracts(ctc: Address, scc: Address) -> Vec<HandlerBinding> {
    vec![
        HandlerBinding::new(
            TransactionEnqueued::SIGNATURE_HASH,
            ctc,
            HandlerKind::RollupTransactions,
            TransactionEnqueuedHandler,
        ),
        HandlerBinding::new(
            SequencerBatchAppended::SIGNATURE_HASH,
            ctc,
            HandlerKind::RollupTransactions,
            SequencerBatchAppendedHandler,
        ),
        HandlerBinding::new(
            StateBatchAppended::SIGNATURE_HASH,
            scc,
            HandlerKind::StateRoots,
            StateBatchAppendedHandler,
        ),
    ]
}

impl HandlerRegistry {
    /// Creates the registry for the rollup contracts. See [`rollup_contracts`].
    pub fn rollup_contracts(ctc: Address, scc: Address) -> Self {
        Self::new(rollup_contracts(ctc, scc))
    }
}

/// Narrows an ABI `uint256` to `u64`.
pub(crate) fn to_u64(value: U256, field: &'static str) -> Result<u64, HandlerError> {
    u64::try_from(value).map_err(|_| HandlerError::ValueOverflow(field))
}
