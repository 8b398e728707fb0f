use crate::{HandlerKind, PersisterError};
use std::time::Duration;

/// Metrics recorded by the persistence pipeline and the ingestion service.
#[derive(Debug, Clone)]
pub struct Metrics;

impl Metrics {
    /// Identifier for the counter of `handle` calls, labelled by `result`.
    pub const DTL_BLOCKS_HANDLED_TOTAL: &'static str = "kona_dtl_blocks_handled_total";
    /// Identifier for the counter of blocks skipped without any work, labelled by `reason`.
    pub const DTL_BLOCKS_SKIPPED_TOTAL: &'static str = "kona_dtl_blocks_skipped_total";
    /// Identifier for the counter of derived records written, labelled by `kind`.
    pub const DTL_DERIVED_RECORDS_TOTAL: &'static str = "kona_dtl_derived_records_total";
    /// Identifier for the `handle` latency histogram.
    pub const DTL_HANDLE_DURATION_SECONDS: &'static str = "kona_dtl_handle_duration_seconds";
    /// Identifier for the gauge tracking the next block the ingestion service will handle.
    pub const DTL_INGESTION_HEIGHT: &'static str = "kona_dtl_ingestion_height";

    /// Skip reason: the block is below the configured earliest block.
    pub const SKIP_BELOW_EARLIEST: &'static str = "below_earliest";
    /// Skip reason: the block was already fully processed.
    pub const SKIP_ALREADY_PROCESSED: &'static str = "already_processed";

    /// Initializes metrics for the data transport layer.
    ///
    /// This does two things:
    /// * Describes various metrics.
    /// * Initializes metrics to 0 so they can be queried immediately.
    pub fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_counter!(
            Self::DTL_BLOCKS_HANDLED_TOTAL,
            metrics::Unit::Count,
            "Total number of blocks handled by the persistence pipeline",
        );

        metrics::describe_counter!(
            Self::DTL_BLOCKS_SKIPPED_TOTAL,
            metrics::Unit::Count,
            "Total number of blocks that required no work",
        );

        metrics::describe_counter!(
            Self::DTL_DERIVED_RECORDS_TOTAL,
            metrics::Unit::Count,
            "Total number of derived records newly written by log handlers",
        );

        metrics::describe_histogram!(
            Self::DTL_HANDLE_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Latency of a single block handle call",
        );

        metrics::describe_gauge!(
            Self::DTL_INGESTION_HEIGHT,
            "Next source chain block the ingestion service will handle",
        );
    }

    fn zero() {
        for result in ["success", "error"] {
            metrics::counter!(Self::DTL_BLOCKS_HANDLED_TOTAL, "result" => result).increment(0);
        }

        for reason in [Self::SKIP_BELOW_EARLIEST, Self::SKIP_ALREADY_PROCESSED] {
            metrics::counter!(Self::DTL_BLOCKS_SKIPPED_TOTAL, "reason" => reason).increment(0);
        }

        for kind in [HandlerKind::RollupTransactions, HandlerKind::StateRoots] {
            metrics::counter!(Self::DTL_DERIVED_RECORDS_TOTAL, "kind" => kind.as_str())
                .increment(0);
        }

        metrics::histogram!(Self::DTL_HANDLE_DURATION_SECONDS).record(0.0);
        metrics::gauge!(Self::DTL_INGESTION_HEIGHT).set(0.0);
    }

    /// Records the outcome and latency of a `handle` call.
    pub fn record_handle(elapsed: Duration, result: &Result<(), PersisterError>) {
        let label = if result.is_ok() { "success" } else { "error" };
        metrics::counter!(Self::DTL_BLOCKS_HANDLED_TOTAL, "result" => label).increment(1);
        metrics::histogram!(Self::DTL_HANDLE_DURATION_SECONDS).record(elapsed.as_secs_f64());
    }

    /// Records a block that required no work.
    pub fn record_skipped(reason: &'static str) {
        metrics::counter!(Self::DTL_BLOCKS_SKIPPED_TOTAL, "reason" => reason).increment(1);
    }

    /// Records derived records newly written by handlers of the given kind.
    pub fn record_derived(kind: HandlerKind, count: usize) {
        metrics::counter!(Self::DTL_DERIVED_RECORDS_TOTAL, "kind" => kind.as_str())
            .increment(count as u64);
    }

    /// Records the next block the ingestion service will handle.
    pub fn record_ingestion_height(height: u64) {
        metrics::gauge!(Self::DTL_INGESTION_HEIGHT).set(height as f64);
    }
}
