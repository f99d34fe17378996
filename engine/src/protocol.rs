//! Wire protocol shared by the device client and the sync server.
//!
//! All messages are JSON with camelCase keys. A push carries a batch of
//! pending records and is answered with one outcome per record; a pull asks
//! for every server change after an opaque checkpoint.

use crate::{Checkpoint, DeviceId, RecordId, RecordKind, Revision, SyncableRecord, Timestamp};
use serde::{Deserialize, Serialize};

/// Server-side version of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub id: RecordId,
    #[serde(default)]
    pub kind: RecordKind,
    pub payload: serde_json::Value,
    /// Last-modified time reported by the writing device
    pub updated_at: Timestamp,
    /// Server revision of this version
    pub revision: Revision,
}

impl ServerRecord {
    /// Local copy of this server version, already in sync.
    pub fn to_synced_record(&self) -> SyncableRecord {
        SyncableRecord::synced(
            self.id.clone(),
            self.kind,
            self.payload.clone(),
            self.updated_at,
            self.revision,
        )
    }
}

/// Body of `POST /sync/push`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    /// Pushing device
    pub device_id: DeviceId,
    /// Pending records, oldest edit first
    pub records: Vec<SyncableRecord>,
}

/// Server verdict for one pushed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RecordOutcome {
    /// Stored; the record is now at `revision`
    Synced { revision: Revision },
    /// The server holds a diverging version
    Conflict { server: ServerRecord },
    /// Rejected for a reason specific to this record
    Error { message: String },
}

/// Outcome for one record of a push.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResult {
    pub id: RecordId,
    pub outcome: RecordOutcome,
}

/// Body answering `POST /sync/push`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    pub results: Vec<PushResult>,
}

impl PushResponse {
    /// Outcome reported for `id`, if any.
    pub fn outcome_for(&self, id: &str) -> Option<&RecordOutcome> {
        self.results.iter().find(|r| r.id == id).map(|r| &r.outcome)
    }
}

/// Query string of `GET /sync/pull`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullQuery {
    /// Checkpoint from the previous pull, absent for the first one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub since: Option<Checkpoint>,
    /// Maximum number of records to return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<i64>,
}

/// Body answering `GET /sync/pull`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    /// Changed records, in revision order
    pub records: Vec<ServerRecord>,
    /// Checkpoint to send with the next pull
    pub checkpoint: Checkpoint,
    /// Whether more changes are waiting
    pub has_more: bool,
}

/// How the server should treat one pushed record.
#[derive(Debug, Clone, PartialEq)]
pub enum PushDecision {
    /// New id: store it
    Insert,
    /// Based on the current server revision: replace it
    Overwrite,
    /// Same content already stored (a retried push): acknowledge as is
    Duplicate(Revision),
    /// The server moved on since the device last synced this record
    Conflict(ServerRecord),
    /// Malformed record
    Invalid(String),
}

/// Classify a pushed record against the stored version.
///
/// Redelivered records are recognised by identical payloads, which makes the
/// at-least-once push from devices idempotent.
pub fn classify_push(existing: Option<&ServerRecord>, incoming: &SyncableRecord) -> PushDecision {
    if incoming.id.trim().is_empty() {
        return PushDecision::Invalid("record id is empty".to_string());
    }
    if incoming.payload.is_null() {
        return PushDecision::Invalid(format!("record {} has no payload", incoming.id));
    }

    let Some(stored) = existing else {
        return PushDecision::Insert;
    };

    if stored.payload == incoming.payload {
        return PushDecision::Duplicate(stored.revision);
    }

    match incoming.base_revision {
        Some(base) if base >= stored.revision => PushDecision::Overwrite,
        _ => PushDecision::Conflict(stored.clone()),
    }
}
