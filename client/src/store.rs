//! Local record store contract and an in-memory implementation.

use crate::error::StoreError;
use async_trait::async_trait;
use dashmap::DashMap;
use fieldsync_engine::{
    sort_oldest_first, Checkpoint, DeviceId, Revision, StoreSnapshot, SyncStatus, SyncableRecord,
};
use tokio::sync::RwLock;

/// Persistence for syncable records and the pull checkpoint.
///
/// The orchestrator is the only writer of `sync_status`; UI code may read
/// concurrently.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Up to `limit` pending records, oldest `updated_at` first.
    async fn query_pending(&self, limit: usize) -> Result<Vec<SyncableRecord>, StoreError>;

    /// Every record with the given status.
    async fn query_by_status(&self, status: SyncStatus) -> Result<Vec<SyncableRecord>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<SyncableRecord>, StoreError>;

    /// Insert or replace a record.
    async fn upsert(&self, record: SyncableRecord) -> Result<(), StoreError>;

    /// Acknowledge a record at the given server revision.
    async fn mark_synced(&self, id: &str, revision: Revision) -> Result<(), StoreError>;

    async fn mark_conflict(&self, id: &str) -> Result<(), StoreError>;

    async fn mark_error(&self, id: &str) -> Result<(), StoreError>;

    /// Checkpoint of the last successful pull, `None` before the first one.
    async fn load_checkpoint(&self) -> Result<Option<Checkpoint>, StoreError>;

    async fn save_checkpoint(&self, checkpoint: &str) -> Result<(), StoreError>;
}

/// Record store held in memory, with snapshot export for persistence.
#[derive(Debug)]
pub struct MemoryStore {
    device_id: DeviceId,
    records: DashMap<String, SyncableRecord>,
    checkpoint: RwLock<Option<Checkpoint>>,
}

impl MemoryStore {
    pub fn new(device_id: impl Into<DeviceId>) -> Self {
        Self {
            device_id: device_id.into(),
            records: DashMap::new(),
            checkpoint: RwLock::new(None),
        }
    }

    /// Restore a store from a snapshot.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self {
            device_id: snapshot.device_id,
            records: snapshot.records.into_iter().collect(),
            checkpoint: RwLock::new(snapshot.checkpoint),
        }
    }

    /// Restore a store from snapshot JSON.
    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        let snapshot = StoreSnapshot::from_json(json).map_err(|e| StoreError::Read(e.to_string()))?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Capture the current records and checkpoint.
    pub async fn snapshot(&self) -> StoreSnapshot {
        let mut snapshot = StoreSnapshot::new(self.device_id.clone());
        snapshot.checkpoint = self.checkpoint.read().await.clone();
        for entry in self.records.iter() {
            snapshot.add_record(entry.value().clone());
        }
        snapshot
    }

    /// Serialize the current state to snapshot JSON.
    pub async fn to_json(&self) -> Result<String, StoreError> {
        self.snapshot()
            .await
            .to_json()
            .map_err(|e| StoreError::Write(e.to_string()))
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn set_status(&self, id: &str, status: SyncStatus) -> Result<(), StoreError> {
        let mut record = self
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.sync_status = status;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn query_pending(&self, limit: usize) -> Result<Vec<SyncableRecord>, StoreError> {
        let mut pending: Vec<_> = self
            .records
            .iter()
            .filter(|entry| entry.is_push_eligible())
            .map(|entry| entry.value().clone())
            .collect();
        sort_oldest_first(&mut pending);
        pending.truncate(limit);
        Ok(pending)
    }

    async fn query_by_status(&self, status: SyncStatus) -> Result<Vec<SyncableRecord>, StoreError> {
        let mut matching: Vec<_> = self
            .records
            .iter()
            .filter(|entry| entry.sync_status == status)
            .map(|entry| entry.value().clone())
            .collect();
        sort_oldest_first(&mut matching);
        Ok(matching)
    }

    async fn get(&self, id: &str) -> Result<Option<SyncableRecord>, StoreError> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn upsert(&self, record: SyncableRecord) -> Result<(), StoreError> {
        if record.id.is_empty() {
            return Err(StoreError::Write("record id is empty".to_string()));
        }
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn mark_synced(&self, id: &str, revision: Revision) -> Result<(), StoreError> {
        let mut record = self
            .records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        record.mark_synced(revision);
        Ok(())
    }

    async fn mark_conflict(&self, id: &str) -> Result<(), StoreError> {
        self.set_status(id, SyncStatus::Conflict)
    }

    async fn mark_error(&self, id: &str) -> Result<(), StoreError> {
        self.set_status(id, SyncStatus::Error)
    }

    async fn load_checkpoint(&self) -> Result<Option<Checkpoint>, StoreError> {
        Ok(self.checkpoint.read().await.clone())
    }

    async fn save_checkpoint(&self, checkpoint: &str) -> Result<(), StoreError> {
        *self.checkpoint.write().await = Some(checkpoint.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsync_engine::RecordKind;
    use serde_json::json;

    fn sample(id: &str, updated_at: u64) -> SyncableRecord {
        SyncableRecord::pending(id, RecordKind::SensorData, json!({"x": updated_at}), updated_at)
    }

    #[tokio::test]
    async fn pending_is_oldest_first_and_limited() {
        let store = MemoryStore::new("device-1");
        store.upsert(sample("c", 300)).await.unwrap();
        store.upsert(sample("a", 100)).await.unwrap();
        store.upsert(sample("b", 200)).await.unwrap();

        let batch = store.query_pending(2).await.unwrap();
        let ids: Vec<_> = batch.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn conflict_records_leave_the_outbox() {
        let store = MemoryStore::new("device-1");
        store.upsert(sample("a", 100)).await.unwrap();
        store.upsert(sample("b", 200)).await.unwrap();

        store.mark_conflict("a").await.unwrap();

        let batch = store.query_pending(10).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, "b");
        assert_eq!(store.query_by_status(SyncStatus::Conflict).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mark_synced_records_revision() {
        let store = MemoryStore::new("device-1");
        store.upsert(sample("a", 100)).await.unwrap();

        store.mark_synced("a", 12).await.unwrap();

        let record = store.get("a").await.unwrap().unwrap();
        assert_eq!(record.sync_status, SyncStatus::Synced);
        assert_eq!(record.base_revision, Some(12));
    }

    #[tokio::test]
    async fn marking_unknown_record_fails() {
        let store = MemoryStore::new("device-1");
        assert_eq!(
            store.mark_error("ghost").await,
            Err(StoreError::NotFound("ghost".into()))
        );
    }

    #[tokio::test]
    async fn snapshot_roundtrip() {
        let store = MemoryStore::new("device-1");
        store.upsert(sample("a", 100)).await.unwrap();
        store.save_checkpoint("41").await.unwrap();

        let json = store.to_json().await.unwrap();
        let restored = MemoryStore::from_json(&json).unwrap();

        assert_eq!(restored.device_id(), "device-1");
        assert_eq!(restored.len(), 1);
        assert_eq!(restored.load_checkpoint().await.unwrap().as_deref(), Some("41"));
    }
}
