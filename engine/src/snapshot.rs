//! Snapshot types for persisting and restoring local sync state.
//!
//! Snapshots are the bridge between an in-memory record store and persistent
//! storage. They use ordered maps so the same state always serializes to the
//! same bytes.

use crate::{error::Result, Checkpoint, DeviceId, Error, RecordId, SyncStatus, SyncableRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version of the snapshot format for future compatibility.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A point-in-time snapshot of the local records and pull checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    /// Snapshot format version
    pub format_version: u32,
    /// Device the snapshot was taken on
    pub device_id: DeviceId,
    /// Last successfully recorded pull checkpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<Checkpoint>,
    /// All records by id
    pub records: BTreeMap<RecordId, SyncableRecord>,
}

impl StoreSnapshot {
    /// Create a new empty snapshot.
    pub fn new(device_id: impl Into<DeviceId>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            device_id: device_id.into(),
            checkpoint: None,
            records: BTreeMap::new(),
        }
    }

    /// Add a record to the snapshot, replacing any record with the same id.
    pub fn add_record(&mut self, record: SyncableRecord) {
        self.records.insert(record.id.clone(), record);
    }

    /// Get a record from the snapshot.
    pub fn get_record(&self, id: &str) -> Option<&SyncableRecord> {
        self.records.get(id)
    }

    /// Count total records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Count records with the given status.
    pub fn count_with_status(&self, status: SyncStatus) -> usize {
        self.records
            .values()
            .filter(|r| r.sync_status == status)
            .count()
    }

    /// Serialize to JSON with deterministic ordering.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Serialize to pretty JSON with deterministic ordering.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Deserialize from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if snapshot.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported snapshot format version: {} (max supported: {})",
                snapshot.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        // Keys must agree with the records they index
        if let Some((key, record)) = snapshot.records.iter().find(|(k, r)| **k != r.id) {
            return Err(Error::InvalidSnapshot(format!(
                "record keyed as {} has id {}",
                key, record.id
            )));
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordKind;
    use serde_json::json;

    #[test]
    fn create_empty_snapshot() {
        let snapshot = StoreSnapshot::new("device-1");
        assert_eq!(snapshot.format_version, SNAPSHOT_FORMAT_VERSION);
        assert_eq!(snapshot.device_id, "device-1");
        assert_eq!(snapshot.record_count(), 0);
        assert!(snapshot.checkpoint.is_none());
    }

    #[test]
    fn add_and_get_record() {
        let mut snapshot = StoreSnapshot::new("device-1");

        snapshot.add_record(SyncableRecord::pending(
            "s-1",
            RecordKind::SensorData,
            json!({"x": 0.5}),
            1000,
        ));

        assert_eq!(snapshot.record_count(), 1);
        assert_eq!(snapshot.count_with_status(SyncStatus::Pending), 1);
        let retrieved = snapshot.get_record("s-1").unwrap();
        assert_eq!(retrieved.payload, json!({"x": 0.5}));
    }

    #[test]
    fn json_roundtrip_keeps_checkpoint() {
        let mut snapshot = StoreSnapshot::new("device-1");
        snapshot.checkpoint = Some("42".to_string());
        snapshot.add_record(SyncableRecord::synced(
            "session-1",
            RecordKind::Session,
            json!({"notes": "walk"}),
            1000,
            42,
        ));

        let restored = StoreSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();

        assert_eq!(snapshot, restored);
    }

    #[test]
    fn deterministic_serialization() {
        let mut first = StoreSnapshot::new("device-1");
        let mut second = StoreSnapshot::new("device-1");

        let a = SyncableRecord::pending("a", RecordKind::SensorData, json!({}), 1);
        let b = SyncableRecord::pending("b", RecordKind::SensorData, json!({}), 2);

        first.add_record(a.clone());
        first.add_record(b.clone());
        second.add_record(b);
        second.add_record(a);

        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn future_format_rejected() {
        let json = r#"{"formatVersion": 99, "deviceId": "d", "records": {}}"#;
        assert!(matches!(
            StoreSnapshot::from_json(json),
            Err(Error::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn mismatched_key_rejected() {
        let json = r#"{
            "formatVersion": 1,
            "deviceId": "d",
            "records": {
                "a": {"id": "b", "payload": {}, "updatedAt": 1}
            }
        }"#;
        assert!(matches!(
            StoreSnapshot::from_json(json),
            Err(Error::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn invalid_json() {
        assert!(StoreSnapshot::from_json("not json").is_err());
    }
}
