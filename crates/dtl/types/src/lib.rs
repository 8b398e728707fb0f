//! Core types shared across data transport layer components.
//!
//! This crate defines the fundamental data structures used by the chain data
//! persistence pipeline: source chain blocks and transactions, the per-block
//! persistence record, and the derived rollup records extracted from contract
//! events.

mod block;
pub use block::BlockInfo;

mod transaction;
pub use transaction::L1Transaction;

mod state;
pub use state::{LogStage, PersistenceState};

mod records;
pub use records::{QueueOrigin, RollupTransaction, RollupTransactionKind, StateRootEntry};
