//! Record types tracked by the sync engine.

use crate::{RecordId, Revision, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sync state of a record in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Modified locally, not yet acknowledged by the server (in the outbox)
    #[default]
    Pending,
    /// Matches the server
    Synced,
    /// Diverged from the server and waiting for resolution
    Conflict,
    /// Rejected by the server for a record-specific reason
    Error,
}

impl SyncStatus {
    /// All statuses, in declaration order.
    pub const ALL: [SyncStatus; 4] = [
        SyncStatus::Pending,
        SyncStatus::Synced,
        SyncStatus::Conflict,
        SyncStatus::Error,
    ];

    /// Stable lowercase name, as stored and sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Conflict => "conflict",
            SyncStatus::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SyncStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("unknown sync status: {}", s))
    }
}

/// Which collaborator table a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RecordKind {
    /// Recording session metadata
    Session,
    /// A single sensor sample
    #[default]
    SensorData,
}

impl RecordKind {
    /// Stable name, as stored server-side.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Session => "session",
            RecordKind::SensorData => "sensorData",
        }
    }
}

impl FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(RecordKind::Session),
            "sensorData" => Ok(RecordKind::SensorData),
            other => Err(format!("unknown record kind: {}", other)),
        }
    }
}

/// A locally stored record that takes part in sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncableRecord {
    /// Stable identifier, unique within the store
    pub id: RecordId,
    /// Table the record belongs to
    #[serde(default)]
    pub kind: RecordKind,
    /// Opaque domain data
    pub payload: serde_json::Value,
    /// Local last-modified time (milliseconds since epoch)
    pub updated_at: Timestamp,
    /// Sync state
    #[serde(default)]
    pub sync_status: SyncStatus,
    /// Server revision this local version was derived from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_revision: Option<Revision>,
}

impl SyncableRecord {
    /// Create a record that was just written locally and awaits push.
    pub fn pending(
        id: impl Into<RecordId>,
        kind: RecordKind,
        payload: serde_json::Value,
        updated_at: Timestamp,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            payload,
            updated_at,
            sync_status: SyncStatus::Pending,
            base_revision: None,
        }
    }

    /// Create a record that mirrors a server version.
    pub fn synced(
        id: impl Into<RecordId>,
        kind: RecordKind,
        payload: serde_json::Value,
        updated_at: Timestamp,
        revision: Revision,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            payload,
            updated_at,
            sync_status: SyncStatus::Synced,
            base_revision: Some(revision),
        }
    }

    /// Only pending records may be pushed.
    pub fn is_push_eligible(&self) -> bool {
        self.sync_status == SyncStatus::Pending
    }

    /// Record a local edit: new payload, new timestamp, back into the outbox.
    pub fn edit(&mut self, payload: serde_json::Value, updated_at: Timestamp) {
        self.payload = payload;
        self.updated_at = updated_at;
        self.sync_status = SyncStatus::Pending;
    }

    /// Acknowledge the record at the given server revision.
    pub fn mark_synced(&mut self, revision: Revision) {
        self.sync_status = SyncStatus::Synced;
        self.base_revision = Some(revision);
    }

    /// Keep the local payload but base it on a newer server revision so the
    /// next push overwrites the server instead of conflicting again.
    pub fn rebase(&mut self, revision: Revision) {
        self.sync_status = SyncStatus::Pending;
        self.base_revision = Some(revision);
    }

    /// Rough size of the record on the wire, in bytes.
    pub fn encoded_len(&self) -> usize {
        serde_json::to_vec(self).map(|bytes| bytes.len()).unwrap_or(0)
    }
}

/// Order records oldest edit first, ties broken by id for a total order.
pub fn sort_oldest_first(records: &mut [SyncableRecord]) {
    records.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.cmp(&b.id)));
}
