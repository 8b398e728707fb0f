use crate::ChainSourceError;
use alloy_primitives::B256;
use kona_dtl_storage::StorageError;
use thiserror::Error;

/// Errors that abort a single [`ChainDataPersister::handle`](crate::ChainDataPersister::handle)
/// call.
///
/// None of these are retried internally. Writes committed earlier in the failed call are not
/// rolled back, so re-invoking `handle` with the same block makes forward progress.
#[derive(Debug, Error)]
pub enum PersisterError {
    /// A chain source call failed.
    #[error(transparent)]
    Fetch(#[from] ChainSourceError),

    /// The storage backend rejected a read or write.
    #[error(transparent)]
    Write(#[from] StorageError),

    /// A matched log references a transaction the chain source does not know about.
    #[error("Unknown transaction {0}")]
    UnknownTransaction(B256),

    /// A matched log was returned without its transaction hash.
    #[error("Log at index {log_index:?} is missing its transaction hash")]
    MissingTransactionHash {
        /// Index of the offending log within its block, if known.
        log_index: Option<u64>,
    },

    /// A log handler failed.
    #[error(transparent)]
    Handler(HandlerError),
}

impl From<HandlerError> for PersisterError {
    fn from(err: HandlerError) -> Self {
        match err {
            // Derived-record writes are storage writes like any other.
            HandlerError::Storage(err) => Self::Write(err),
            err => Self::Handler(err),
        }
    }
}

impl PersisterError {
    /// Returns `true` if re-invoking `handle` with the same block may succeed.
    ///
    /// There is no fatal class inside the pipeline: every failure is resolved externally and
    /// then retried.
    pub const fn is_retryable(&self) -> bool {
        true
    }
}

/// Errors raised by [`LogHandler`](crate::LogHandler) implementations.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// An event or call payload could not be ABI decoded.
    #[error("Failed to decode payload: {0}")]
    Decode(#[from] alloy_sol_types::Error),

    /// The batch calldata does not follow the expected layout.
    #[error("Malformed batch: {0}")]
    MalformedBatch(String),

    /// The number of decoded entries disagrees with the event.
    #[error("Batch size mismatch: event announced {expected}, calldata carried {actual}")]
    BatchSizeMismatch {
        /// Size announced by the event.
        expected: u64,
        /// Size found in the calldata.
        actual: u64,
    },

    /// A decoded integer does not fit the field it is stored in.
    #[error("Value of `{0}` overflows u64")]
    ValueOverflow(&'static str),

    /// A log field that the handler relies on is absent.
    #[error("Log is missing field `{0}`")]
    MissingLogField(&'static str),

    /// Writing derived records failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
