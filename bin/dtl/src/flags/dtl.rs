use alloy_primitives::Address;
use clap::{Args, ValueEnum};
use kona_dtl_core::{IngestionConfig, RetryConfig};
use std::{path::PathBuf, time::Duration};
use url::Url;

/// The storage backend to persist chain data to.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum StorageKind {
    /// Durable RocksDB storage under `--datadir`.
    #[default]
    #[value(name = "rocksdb")]
    RocksDb,
    /// Non-durable in-memory storage. Progress is lost on exit.
    Memory,
}

/// Data transport layer arguments.
#[derive(Args, Debug, Clone)]
pub(crate) struct DtlArgs {
    /// L1 RPC endpoint.
    #[arg(long = "l1-rpc", env = "L1_RPC")]
    pub(crate) l1_rpc: Url,

    /// Address of the canonical transaction chain contract.
    #[arg(long = "ctc-address", env = "CTC_ADDRESS")]
    pub(crate) ctc_address: Address,

    /// Address of the state commitment chain contract.
    #[arg(long = "scc-address", env = "SCC_ADDRESS")]
    pub(crate) scc_address: Address,

    /// L1 blocks below this height are ignored.
    #[arg(long = "earliest-block", env = "EARLIEST_BLOCK")]
    pub(crate) earliest_block: Option<u64>,

    /// Number of blocks to stay behind the L1 head.
    #[arg(long, env = "CONFIRMATIONS", default_value_t = 12)]
    pub(crate) confirmations: u64,

    /// Seconds between L1 head polls.
    #[arg(long = "poll-interval", env = "POLL_INTERVAL", default_value_t = 5, value_name = "SECONDS")]
    pub(crate) poll_interval: u64,

    /// Maximum number of L1 blocks handled per poll.
    #[arg(long = "max-blocks-per-poll", env = "MAX_BLOCKS_PER_POLL", default_value_t = 100)]
    pub(crate) max_blocks_per_poll: u64,

    /// Number of retries for a failing block before it is left for the next poll.
    #[arg(long = "retry.max-times", env = "RETRY_MAX_TIMES", default_value_t = 5)]
    pub(crate) retry_max_times: usize,

    /// Storage backend.
    #[arg(long, env = "STORAGE", value_enum, default_value_t = StorageKind::RocksDb)]
    pub(crate) storage: StorageKind,

    /// Directory to store chain data in.
    #[arg(long, env = "DATADIR", default_value = "dtl-data")]
    pub(crate) datadir: PathBuf,
}

impl DtlArgs {
    /// Returns the ingestion service configuration.
    pub(crate) fn ingestion_config(&self) -> IngestionConfig {
        IngestionConfig {
            earliest_block: self.earliest_block,
            confirmations: self.confirmations,
            poll_interval: Duration::from_secs(self.poll_interval),
            max_blocks_per_poll: self.max_blocks_per_poll,
            retry: RetryConfig { max_times: self.retry_max_times, ..Default::default() },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;
    use clap::Parser;
    use rstest::rstest;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        dtl: DtlArgs,
    }

    const REQUIRED: [&str; 7] = [
        "test",
        "--l1-rpc",
        "http://localhost:8545",
        "--ctc-address",
        "0x5e4e65926ba27467555eb562121fac00d24e9dd2",
        "--scc-address",
        "0xbe5dab4a2e9cd0f27300db4ab94bee3a233aeb19",
    ];

    fn parse(extra: &[&str]) -> Result<DtlArgs, clap::Error> {
        TestCli::try_parse_from(REQUIRED.iter().chain(extra)).map(|cli| cli.dtl)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.ctc_address, address!("0x5e4e65926ba27467555eb562121fac00d24e9dd2"));
        assert_eq!(args.scc_address, address!("0xbe5dab4a2e9cd0f27300db4ab94bee3a233aeb19"));
        assert_eq!(args.storage, StorageKind::RocksDb);
        assert_eq!(args.datadir, PathBuf::from("dtl-data"));

        let config = args.ingestion_config();
        assert_eq!(config.earliest_block, None);
        assert_eq!(config.confirmations, 12);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.max_blocks_per_poll, 100);
    }

    #[rstest]
    #[case::earliest(&["--earliest-block", "1000"], |c: IngestionConfig| c.earliest_block == Some(1000))]
    #[case::confirmations(&["--confirmations", "0"], |c: IngestionConfig| c.confirmations == 0)]
    #[case::poll_interval(&["--poll-interval", "30"], |c: IngestionConfig| c.poll_interval == Duration::from_secs(30))]
    #[case::poll_limit(&["--max-blocks-per-poll", "7"], |c: IngestionConfig| c.max_blocks_per_poll == 7)]
    #[case::retries(&["--retry.max-times", "9"], |c: IngestionConfig| c.retry.max_times == 9)]
    fn test_ingestion_flags(#[case] extra: &[&str], #[case] check: fn(IngestionConfig) -> bool) {
        assert!(check(parse(extra).unwrap().ingestion_config()));
    }

    #[rstest]
    #[case("rocksdb", StorageKind::RocksDb)]
    #[case("memory", StorageKind::Memory)]
    fn test_storage_kind(#[case] value: &str, #[case] expected: StorageKind) {
        assert_eq!(parse(&["--storage", value]).unwrap().storage, expected);
    }

    #[rstest]
    #[case::bad_address(&["--ctc-address", "0x1234"])]
    #[case::bad_storage(&["--storage", "postgres"])]
    #[case::bad_height(&["--earliest-block", "-1"])]
    fn test_invalid_flags(#[case] extra: &[&str]) {
        assert!(parse(extra).is_err());
    }
}
