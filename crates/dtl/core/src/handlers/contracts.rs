//! ABI definitions of the rollup contract events and calls.

use alloy_sol_types::sol;

sol! {
    /// Emitted by the canonical transaction chain when a transaction is enqueued from L1.
    #[derive(Debug, PartialEq, Eq)]
    event TransactionEnqueued(
        address indexed _l1TxOrigin,
        address indexed _target,
        uint256 _gasLimit,
        bytes _data,
        uint256 indexed _queueIndex,
        uint256 _timestamp
    );

    /// Emitted by the canonical transaction chain when the sequencer appends a batch.
    #[derive(Debug, PartialEq, Eq)]
    event SequencerBatchAppended(
        uint256 _startingQueueIndex,
        uint256 _numQueueElements,
        uint256 _totalElements
    );

    /// Emitted by the state commitment chain when a batch of state roots is appended.
    #[derive(Debug, PartialEq, Eq)]
    event StateBatchAppended(
        uint256 indexed _batchIndex,
        bytes32 _batchRoot,
        uint256 _batchSize,
        uint256 _prevTotalElements,
        bytes _extraData
    );

    /// Appends a batch of state roots. Carried by the transaction emitting
    /// [`StateBatchAppended`].
    function appendStateBatch(bytes32[] _batch, uint256 _shouldStartAtElement);

    /// Appends a sequencer batch. The arguments follow the selector in a compact,
    /// non-ABI encoding.
    function appendSequencerBatch();
}
