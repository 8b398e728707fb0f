//! The handler registry: which logs a pipeline cares about and what to do with them.

use crate::HandlerError;
use alloy_primitives::{Address, B256};
use alloy_rpc_types_eth::Log;
use async_trait::async_trait;
use kona_dtl_storage::ChainDataWriter;
use kona_dtl_types::L1Transaction;
use std::{fmt::Debug, sync::Arc};

/// Processes one matched log.
///
/// Implementations perform zero or more derived-record writes through the supplied writer and
/// return how many records they wrote. A handler may be re-invoked for the same log if a
/// previous attempt failed partway through a block, so it must be safe to re-run.
#[async_trait]
pub trait LogHandler: Debug + Send + Sync {
    /// Handles `log`, which was emitted by `transaction`.
    async fn handle(
        &self,
        writer: &dyn ChainDataWriter,
        log: &Log,
        transaction: &L1Transaction,
    ) -> Result<usize, HandlerError>;
}

/// The category of derived records a handler produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    /// The handler writes rollup transactions.
    RollupTransactions,
    /// The handler writes state roots.
    StateRoots,
}

impl HandlerKind {
    /// Returns a short label, used for logging and metrics.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::RollupTransactions => "rollup_transactions",
            Self::StateRoots => "state_roots",
        }
    }
}

/// Binds a handler to the logs with a given topic emitted by a given contract.
#[derive(Debug, Clone)]
pub struct HandlerBinding {
    /// The topic a log must carry.
    pub topic: B256,
    /// The contract a log must be emitted by.
    pub address: Address,
    /// What the handler produces.
    pub kind: HandlerKind,
    /// The handler.
    pub handler: Arc<dyn LogHandler>,
}

impl HandlerBinding {
    /// Creates a new [`HandlerBinding`].
    pub fn new(
        topic: B256,
        address: Address,
        kind: HandlerKind,
        handler: impl LogHandler + 'static,
    ) -> Self {
        Self { topic, address, kind, handler: Arc::new(handler) }
    }
}

/// The ordered set of [`HandlerBinding`]s a pipeline was constructed with.
///
/// Fixed at construction. Iteration order equals registration order, which determines the
/// order in which resolved transactions are persisted.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    bindings: Vec<HandlerBinding>,
}

impl HandlerRegistry {
    /// Creates a registry from bindings in registration order.
    pub const fn new(bindings: Vec<HandlerBinding>) -> Self {
        Self { bindings }
    }

    /// Returns `true` if no bindings are registered.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Returns the number of registered bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns the binding registered at `index`.
    pub fn get(&self, index: usize) -> Option<&HandlerBinding> {
        self.bindings.get(index)
    }

    /// Iterates over the bindings in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &HandlerBinding> {
        self.bindings.iter()
    }
}

impl From<Vec<HandlerBinding>> for HandlerRegistry {
    fn from(bindings: Vec<HandlerBinding>) -> Self {
        Self::new(bindings)
    }
}
