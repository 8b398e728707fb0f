//! Storage backends for the data transport layer.
//!
//! The persistence pipeline consumes a fixed write/read contract, defined by the traits in
//! this crate. Two backends are provided: [`InMemoryChainStore`] and the RocksDB-backed
//! [`ChainDb`].

mod error;
pub use error::StorageError;

mod traits;
pub use traits::{ChainDataReader, ChainDataStore, ChainDataWriter, PersistenceStateReader};

mod memory;
pub use memory::InMemoryChainStore;

mod chaindb;
pub use chaindb::ChainDb;
