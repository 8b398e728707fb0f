//! Log relevance matching and owning-transaction ordering.

use crate::{HandlerBinding, HandlerRegistry, PersisterError};
use alloy_primitives::B256;
use alloy_rpc_types_eth::Log;
use std::collections::HashSet;

/// Returns `true` if `binding` applies to `log`.
///
/// The log must carry the binding's topic and be emitted by the binding's contract. Both
/// comparisons are exact.
pub fn matches(log: &Log, binding: &HandlerBinding) -> bool {
    log.address() == binding.address && log.topics().contains(&binding.topic)
}

/// A log paired with the registry index of a binding that matched it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedLog {
    /// Index of the matching binding in the [`HandlerRegistry`].
    pub binding: usize,
    /// The log.
    pub log: Log,
}

impl MatchedLog {
    /// Returns the hash of the transaction that emitted the log.
    pub fn transaction_hash(&self) -> Result<B256, PersisterError> {
        self.log
            .transaction_hash
            .ok_or(PersisterError::MissingTransactionHash { log_index: self.log.log_index })
    }
}

/// Matches fetched logs against the registry.
///
/// `fetched` holds one log list per binding, in registration order. A log returned for a
/// binding is kept only if it matches that binding. The result is ordered by binding, then by
/// the order logs were returned for that binding.
pub fn match_logs(registry: &HandlerRegistry, fetched: Vec<Vec<Log>>) -> Vec<MatchedLog> {
    registry
        .iter()
        .zip(fetched)
        .enumerate()
        .flat_map(|(index, (binding, logs))| {
            logs.into_iter()
                .filter(move |log| matches(log, binding))
                .map(move |log| MatchedLog { binding: index, log })
        })
        .collect()
}

/// Returns the distinct owning transaction hashes of `matched`, in first-seen order.
pub fn transaction_order(matched: &[MatchedLog]) -> Result<Vec<B256>, PersisterError> {
    let mut seen = HashSet::with_capacity(matched.len());
    let mut order = Vec::with_capacity(matched.len());
    for entry in matched {
        let hash = entry.transaction_hash()?;
        if seen.insert(hash) {
            order.push(hash);
        }
    }
    Ok(order)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{HandlerError, HandlerKind, LogHandler};
    use alloy_primitives::{Address, Bytes, LogData, address};
    use async_trait::async_trait;
    use kona_dtl_storage::ChainDataWriter;
    use kona_dtl_types::L1Transaction;

    #[derive(Debug)]
    struct NoopHandler;

    #[async_trait]
    impl LogHandler for NoopHandler {
        async fn handle(
            &self,
            _writer: &dyn ChainDataWriter,
            _log: &Log,
            _transaction: &L1Transaction,
        ) -> Result<usize, HandlerError> {
            Ok(0)
        }
    }

    const AA: Address = address!("0x00000000000000000000000000000000000000aa");
    const BB: Address = address!("0x00000000000000000000000000000000000000bb");

    pub(crate) fn make_log(address: Address, topics: Vec<B256>, tx_hash: Option<B256>) -> Log {
        Log {
            inner: alloy_primitives::Log {
                address,
                data: LogData::new_unchecked(topics, Bytes::new()),
            },
            transaction_hash: tx_hash,
            ..Default::default()
        }
    }

    fn binding(topic: B256, address: Address) -> HandlerBinding {
        HandlerBinding::new(topic, address, HandlerKind::RollupTransactions, NoopHandler)
    }

    #[test]
    fn test_matches_requires_topic_and_address() {
        let topic = B256::repeat_byte(0x11);
        let b = binding(topic, AA);

        assert!(matches(&make_log(AA, vec![topic], None), &b));
        assert!(matches(&make_log(AA, vec![B256::ZERO, topic], None), &b));
        assert!(!matches(&make_log(BB, vec![topic], None), &b));
        assert!(!matches(&make_log(AA, vec![B256::repeat_byte(0x22)], None), &b));
        assert!(!matches(&make_log(AA, vec![], None), &b));
    }

    #[test]
    fn test_match_logs_preserves_binding_order() {
        let t1 = B256::repeat_byte(1);
        let t2 = B256::repeat_byte(2);
        let registry = HandlerRegistry::new(vec![binding(t1, AA), binding(t2, AA)]);

        let first = make_log(AA, vec![t1], Some(B256::repeat_byte(0xa1)));
        let stray = make_log(BB, vec![t1], Some(B256::repeat_byte(0xa2)));
        let second = make_log(AA, vec![t2], Some(B256::repeat_byte(0xa3)));

        let matched = match_logs(&registry, vec![vec![first.clone(), stray], vec![second.clone()]]);
        assert_eq!(
            matched,
            vec![MatchedLog { binding: 0, log: first }, MatchedLog { binding: 1, log: second }]
        );
    }

    #[test]
    fn test_log_with_two_topics_matches_both_bindings() {
        let t1 = B256::repeat_byte(1);
        let t2 = B256::repeat_byte(2);
        let registry = HandlerRegistry::new(vec![binding(t1, AA), binding(t2, AA)]);

        let log = make_log(AA, vec![t1, t2], Some(B256::repeat_byte(0xcc)));
        let matched = match_logs(&registry, vec![vec![log.clone()], vec![log]]);

        assert_eq!(matched.len(), 2);
        assert_eq!(transaction_order(&matched).unwrap(), vec![B256::repeat_byte(0xcc)]);
    }

    #[test]
    fn test_transaction_order_first_seen() {
        let t = B256::repeat_byte(1);
        let h = |b| Some(B256::repeat_byte(b));
        let matched = [h(3), h(1), h(3), h(2), h(1)]
            .into_iter()
            .map(|hash| MatchedLog { binding: 0, log: make_log(AA, vec![t], hash) })
            .collect::<Vec<_>>();

        assert_eq!(
            transaction_order(&matched).unwrap(),
            vec![B256::repeat_byte(3), B256::repeat_byte(1), B256::repeat_byte(2)]
        );
    }

    #[test]
    fn test_transaction_order_missing_hash() {
        let matched = vec![MatchedLog { binding: 0, log: make_log(AA, vec![], None) }];
        assert!(matches!(
            transaction_order(&matched),
            Err(PersisterError::MissingTransactionHash { .. })
        ));
    }
}
