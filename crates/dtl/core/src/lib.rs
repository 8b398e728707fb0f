//! The chain data persistence pipeline of the data transport layer.
//!
//! Given one source chain block at a time, the [`ChainDataPersister`] decides what remains to
//! be done for that block, fetches only the missing pieces from a [`ChainSource`], dispatches
//! relevant logs to the handlers in its [`HandlerRegistry`], and relies on the storage backend
//! to durably record a resumption marker for every stage.
//!
//! The [`L1IngestionService`] drives the persister block-by-block from a source chain.

mod error;
pub use error::{HandlerError, PersisterError};

mod source;
pub use source::{AlloyChainSource, BlockSource, ChainSource, ChainSourceError, LogFilter};

mod registry;
pub use registry::{HandlerBinding, HandlerKind, HandlerRegistry, LogHandler};

mod matcher;
pub use matcher::{MatchedLog, match_logs, matches, transaction_order};

mod persister;
pub use persister::ChainDataPersister;

pub mod handlers;

mod service;
pub use service::{IngestionConfig, IngestionError, L1IngestionService, RetryConfig};

mod metrics;
pub use metrics::Metrics;
