//! Remote transport contract.

use crate::error::TransportError;
use async_trait::async_trait;
use fieldsync_engine::{Checkpoint, PushResult, RecordOutcome, ServerRecord, SyncableRecord};
use std::collections::HashMap;

/// Per-record outcome of one pushed batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PushReport {
    pub results: Vec<PushResult>,
    /// Request plus response size
    pub bytes_transferred: u64,
}

impl PushReport {
    /// Outcomes keyed by record id. A repeated id keeps its last outcome.
    pub fn outcomes(&self) -> HashMap<&str, &RecordOutcome> {
        self.results
            .iter()
            .map(|r| (r.id.as_str(), &r.outcome))
            .collect()
    }
}

/// One page of server changes.
#[derive(Debug, Clone, PartialEq)]
pub struct PullBatch {
    pub records: Vec<ServerRecord>,
    /// Checkpoint to resume from after applying this page
    pub checkpoint: Checkpoint,
    pub has_more: bool,
    pub bytes_transferred: u64,
}

/// Push/pull channel to the sync server.
///
/// Push is at-least-once: a batch may be delivered again after a failure, so
/// the server must dedupe by record id. Timeouts are the transport's concern
/// and surface as [`TransportError::Timeout`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a batch of pending records.
    async fn push_batch(&self, records: &[SyncableRecord]) -> Result<PushReport, TransportError>;

    /// Fetch up to `limit` server changes after `checkpoint`.
    async fn pull_since(
        &self,
        checkpoint: Option<&str>,
        limit: usize,
    ) -> Result<PullBatch, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcomes_index_by_id() {
        let report = PushReport {
            results: vec![
                PushResult {
                    id: "a".to_string(),
                    outcome: RecordOutcome::Synced { revision: 1 },
                },
                PushResult {
                    id: "b".to_string(),
                    outcome: RecordOutcome::Error {
                        message: "bad".to_string(),
                    },
                },
            ],
            bytes_transferred: 0,
        };

        let outcomes = report.outcomes();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes.get("a"), Some(&&RecordOutcome::Synced { revision: 1 }));
        assert!(outcomes.get("c").is_none());
    }
}
