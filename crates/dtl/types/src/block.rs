use alloy_primitives::B256;
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Minimal reference to a source chain block.
///
/// Blocks are immutable once observed. The pipeline owns a copy for the duration of a
/// single `handle` call; the durable copy belongs to the storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Serialize, Deserialize)]
#[display("BlockInfo {{ hash: {hash}, number: {number} }}")]
#[serde(rename_all = "camelCase")]
pub struct BlockInfo {
    /// The block hash.
    pub hash: B256,
    /// The block height.
    pub number: u64,
    /// The parent block hash.
    pub parent_hash: B256,
    /// The block timestamp (seconds since Unix epoch).
    pub timestamp: u64,
}

impl BlockInfo {
    /// Creates a new [`BlockInfo`].
    pub const fn new(hash: B256, number: u64, parent_hash: B256, timestamp: u64) -> Self {
        Self { hash, number, parent_hash, timestamp }
    }

    /// Returns `true` if `self` is the direct parent of `child`.
    pub fn is_parent_of(&self, child: &Self) -> bool {
        self.number + 1 == child.number && self.hash == child.parent_hash
    }
}
