//! Append-only sync log with running statistics.
//!
//! Statistics are updated in O(1) per appended entry; the average duration is
//! kept as a running sum so a long-lived session never rescans its log.

use crate::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Kind of sync step a log entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncLogType {
    Push,
    Pull,
    Conflict,
    Error,
}

/// One immutable sync attempt record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLog {
    /// Unique entry id
    pub id: String,
    /// When the step finished (milliseconds since epoch)
    pub timestamp: Timestamp,
    /// Step kind
    #[serde(rename = "type")]
    pub log_type: SyncLogType,
    /// Whether the step succeeded
    pub success: bool,
    /// Step duration in milliseconds
    pub duration: u64,
    /// Records involved
    pub items_count: usize,
    /// Bytes sent and received
    pub bytes_transferred: u64,
    /// Failure description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncLog {
    /// Create a successful, empty entry.
    pub fn new(id: impl Into<String>, timestamp: Timestamp, log_type: SyncLogType) -> Self {
        Self {
            id: id.into(),
            timestamp,
            log_type,
            success: true,
            duration: 0,
            items_count: 0,
            bytes_transferred: 0,
            error: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration = duration_ms;
        self
    }

    pub fn with_items(mut self, items_count: usize) -> Self {
        self.items_count = items_count;
        self
    }

    pub fn with_bytes(mut self, bytes_transferred: u64) -> Self {
        self.bytes_transferred = bytes_transferred;
        self
    }

    /// Mark the entry failed with a reason.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Aggregate view over every entry logged since the last clear.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatistics {
    pub total_syncs: u64,
    pub successful_syncs: u64,
    pub failed_syncs: u64,
    pub total_bytes_transferred: u64,
    /// Sum of all entry durations (ms)
    pub total_sync_duration: u64,
    /// Mean entry duration (ms)
    pub average_sync_duration: f64,
    /// Timestamp of the latest entry, 0 if none
    pub last_sync_time: Timestamp,
    /// Number of conflict entries
    pub conflicts: u64,
    /// Error text of the latest failed entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl SyncStatistics {
    fn record(&mut self, entry: &SyncLog) {
        self.total_syncs += 1;
        if entry.success {
            self.successful_syncs += 1;
        } else {
            self.failed_syncs += 1;
            self.last_error = entry.error.clone();
        }

        self.total_bytes_transferred += entry.bytes_transferred;
        self.total_sync_duration += entry.duration;
        self.average_sync_duration = self.total_sync_duration as f64 / self.total_syncs as f64;
        self.last_sync_time = entry.timestamp;

        if entry.log_type == SyncLogType::Conflict {
            self.conflicts += 1;
        }
    }

    /// Fraction of successful entries in `[0, 1]`, 0 when nothing was logged.
    pub fn success_rate(&self) -> f64 {
        if self.total_syncs == 0 {
            return 0.0;
        }
        self.successful_syncs as f64 / self.total_syncs as f64
    }

    /// Bytes per second over the total logged duration.
    pub fn throughput(&self) -> f64 {
        if self.total_sync_duration == 0 {
            return 0.0;
        }
        self.total_bytes_transferred as f64 * 1000.0 / self.total_sync_duration as f64
    }
}

/// Append-only log of sync steps.
#[derive(Debug, Clone, Default)]
pub struct SyncLogger {
    logs: VecDeque<SyncLog>,
    stats: SyncStatistics,
    /// Maximum number of retained entries, unbounded when `None`
    retention: Option<usize>,
}

impl SyncLogger {
    /// Create a logger that keeps every entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logger that keeps only the newest `max_entries` entries.
    /// Statistics still cover every entry ever logged.
    pub fn with_retention(max_entries: usize) -> Self {
        Self {
            logs: VecDeque::with_capacity(max_entries.min(1024)),
            stats: SyncStatistics::default(),
            retention: Some(max_entries),
        }
    }

    /// Append an entry and fold it into the statistics.
    pub fn log(&mut self, entry: SyncLog) {
        self.stats.record(&entry);
        self.logs.push_back(entry);

        if let Some(max) = self.retention {
            while self.logs.len() > max {
                self.logs.pop_front();
            }
        }
    }

    /// Snapshot of the current statistics.
    pub fn get_statistics(&self) -> SyncStatistics {
        self.stats.clone()
    }

    /// The newest `limit` entries (all when `None`), oldest first.
    pub fn get_logs(&self, limit: Option<usize>) -> Vec<SyncLog> {
        let skip = match limit {
            Some(limit) => self.logs.len().saturating_sub(limit),
            None => 0,
        };
        self.logs.iter().skip(skip).cloned().collect()
    }

    /// Drop every entry and reset statistics.
    pub fn clear_logs(&mut self) {
        self.logs.clear();
        self.stats = SyncStatistics::default();
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }
}
