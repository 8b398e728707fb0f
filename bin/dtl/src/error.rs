//! Error types for the dtl binary.

use kona_dtl_core::IngestionError;
use kona_dtl_storage::StorageError;
use thiserror::Error;

/// Errors that can occur in the dtl binary.
#[derive(Error, Debug)]
pub(crate) enum DtlError {
    /// CLI error from kona-cli utilities.
    #[error(transparent)]
    Cli(#[from] kona_cli::CliError),

    /// The storage backend could not be opened.
    #[error("Failed to open storage: {0}")]
    Storage(#[from] StorageError),

    /// The ingestion service stopped with an error.
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    /// The async runtime could not be started.
    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Type alias for dtl results.
pub(crate) type DtlResult<T> = Result<T, DtlError>;
