//! Sync configuration read by the orchestrator at start.

use crate::{error::Result, Error};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default period between automatic passes (one minute).
pub const DEFAULT_SYNC_INTERVAL_MS: u64 = 60_000;

/// Shortest accepted period between automatic passes.
pub const MIN_SYNC_INTERVAL_MS: u64 = 1_000;

/// Default maximum number of records pushed in one pass.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Default maximum number of pull pages fetched in one pass.
pub const DEFAULT_MAX_PULL_PAGES: usize = 10;

/// What happens to a trigger that arrives while a pass is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RetriggerPolicy {
    /// Remember the request; the next scheduled tick serves it
    #[default]
    NextTick,
    /// Run one follow-up pass as soon as the current one finishes
    Immediate,
}

/// Process-wide sync settings.
///
/// Deserialization ignores unknown keys and fills missing keys with defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfiguration {
    /// Schedule periodic passes
    pub auto_sync: bool,
    /// Period between automatic passes (ms)
    pub sync_interval: u64,
    /// Only sync on an unmetered connection
    pub wifi_only: bool,
    /// Maximum records pushed per pass
    pub batch_size: usize,
    /// Handling of triggers that arrive mid-pass
    pub retrigger: RetriggerPolicy,
    /// Maximum pull pages per pass
    pub max_pull_pages: usize,
}

impl Default for SyncConfiguration {
    fn default() -> Self {
        Self {
            auto_sync: true,
            sync_interval: DEFAULT_SYNC_INTERVAL_MS,
            wifi_only: false,
            batch_size: DEFAULT_BATCH_SIZE,
            retrigger: RetriggerPolicy::NextTick,
            max_pull_pages: DEFAULT_MAX_PULL_PAGES,
        }
    }
}

impl SyncConfiguration {
    /// Parse a JSON options object.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Convert an already parsed JSON options object.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Check the invariants the orchestrator relies on.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidBatchSize(self.batch_size));
        }
        if self.sync_interval < MIN_SYNC_INTERVAL_MS {
            return Err(Error::SyncIntervalTooShort {
                minimum: MIN_SYNC_INTERVAL_MS,
                actual: self.sync_interval,
            });
        }
        if self.max_pull_pages == 0 {
            return Err(Error::InvalidConfig(
                "maxPullPages must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Period between automatic passes.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval)
    }

    pub fn with_auto_sync(mut self, auto_sync: bool) -> Self {
        self.auto_sync = auto_sync;
        self
    }

    pub fn with_sync_interval(mut self, interval_ms: u64) -> Self {
        self.sync_interval = interval_ms;
        self
    }

    pub fn with_wifi_only(mut self, wifi_only: bool) -> Self {
        self.wifi_only = wifi_only;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_retrigger(mut self, retrigger: RetriggerPolicy) -> Self {
        self.retrigger = retrigger;
        self
    }

    pub fn with_max_pull_pages(mut self, max_pull_pages: usize) -> Self {
        self.max_pull_pages = max_pull_pages;
        self
    }
}
