use thiserror::Error;

/// Errors that may occur while interacting with chain data storage.
///
/// This enum is used across all implementations of the storage traits.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error from the underlying RocksDB instance.
    #[error("Database error")]
    Database(#[from] rocksdb::Error),

    /// A stored value could not be encoded or decoded.
    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    /// The expected entry was not found in the database.
    #[error("Entry not found: {0}")]
    EntryNotFound(String),

    /// Represents a conflict occurred while attempting to write to the database.
    #[error("Conflict error: {0}")]
    ConflictError(String),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("Storage lock poisoned")]
    LockPoisoned,
}
