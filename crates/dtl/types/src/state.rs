use serde::{Deserialize, Serialize};

/// Progress of the log-processing pass for a block.
///
/// Rollup transactions and state roots are always derived together from a single pass
/// over the matched logs, so the two derived completion flags collapse into one
/// monotonic transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogStage {
    /// No log-processing pass has completed for the block.
    NotStarted,
    /// The log-processing pass ran to completion.
    LogsProcessed,
}

/// Per-block record of which persistence stages have been durably written.
///
/// Flags are monotonic: once set for a block they are never unset. They are maintained by
/// the storage backend as a side effect of writes; the pipeline only reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistenceState {
    /// The raw block has been written.
    pub block_persisted: bool,
    /// The block's relevant transactions have been written.
    pub transactions_persisted: bool,
    /// Rollup transactions derived from the block's logs have been written.
    pub rollup_transactions_persisted: bool,
    /// State roots derived from the block's logs have been written.
    pub state_roots_persisted: bool,
}

impl PersistenceState {
    /// A record with every stage complete.
    pub const PROCESSED: Self = Self {
        block_persisted: true,
        transactions_persisted: true,
        rollup_transactions_persisted: true,
        state_roots_persisted: true,
    };

    /// Returns the [`LogStage`] implied by the derived-output flags.
    ///
    /// Either flag being set is treated as evidence that the log pass completed.
    pub const fn log_stage(&self) -> LogStage {
        if self.rollup_transactions_persisted || self.state_roots_persisted {
            LogStage::LogsProcessed
        } else {
            LogStage::NotStarted
        }
    }

    /// Returns `true` if the block and its log pass are both complete.
    pub const fn is_fully_processed(&self) -> bool {
        self.block_persisted && matches!(self.log_stage(), LogStage::LogsProcessed)
    }

    /// Merges `other` into `self`, keeping every flag that is set in either record.
    pub const fn merge(self, other: Self) -> Self {
        Self {
            block_persisted: self.block_persisted || other.block_persisted,
            transactions_persisted: self.transactions_persisted || other.transactions_persisted,
            rollup_transactions_persisted: self.rollup_transactions_persisted ||
                other.rollup_transactions_persisted,
            state_roots_persisted: self.state_roots_persisted || other.state_roots_persisted,
        }
    }
}
