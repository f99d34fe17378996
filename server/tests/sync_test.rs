//! Integration tests for the sync protocol.
//!
//! The push rules run against an in-memory table that mirrors the
//! `records` table: one row per id, revisions from a shared sequence.

use fieldsync_engine::{
    classify_push, PullQuery, PullResponse, PushDecision, PushRequest, PushResponse, PushResult,
    RecordKind, RecordOutcome, ServerRecord, SyncableRecord,
};
use serde_json::json;
use std::collections::BTreeMap;

/// Minimal stand-in for the server's push handler.
#[derive(Default)]
struct Table {
    rows: BTreeMap<String, ServerRecord>,
    sequence: u64,
}

impl Table {
    fn push(&mut self, records: &[SyncableRecord]) -> PushResponse {
        let results = records
            .iter()
            .map(|record| {
                let outcome = match classify_push(self.rows.get(&record.id), record) {
                    PushDecision::Insert | PushDecision::Overwrite => {
                        self.sequence += 1;
                        self.rows.insert(
                            record.id.clone(),
                            ServerRecord {
                                id: record.id.clone(),
                                kind: record.kind,
                                payload: record.payload.clone(),
                                updated_at: record.updated_at,
                                revision: self.sequence,
                            },
                        );
                        RecordOutcome::Synced {
                            revision: self.sequence,
                        }
                    }
                    PushDecision::Duplicate(revision) => RecordOutcome::Synced { revision },
                    PushDecision::Conflict(server) => RecordOutcome::Conflict { server },
                    PushDecision::Invalid(message) => RecordOutcome::Error { message },
                };
                PushResult {
                    id: record.id.clone(),
                    outcome,
                }
            })
            .collect();
        PushResponse { results }
    }

    fn pull(&self, since: u64, limit: usize) -> PullResponse {
        let mut changed: Vec<_> = self
            .rows
            .values()
            .filter(|r| r.revision > since)
            .cloned()
            .collect();
        changed.sort_by_key(|r| r.revision);
        let has_more = changed.len() > limit;
        changed.truncate(limit);
        let checkpoint = changed.last().map_or(since, |r| r.revision).to_string();
        PullResponse {
            records: changed,
            checkpoint,
            has_more,
        }
    }
}

fn sample(id: &str, value: i64, updated_at: u64) -> SyncableRecord {
    SyncableRecord::pending(id, RecordKind::SensorData, json!({"value": value}), updated_at)
}

fn revision_of(response: &PushResponse, id: &str) -> u64 {
    match response.outcome_for(id) {
        Some(RecordOutcome::Synced { revision }) => *revision,
        other => panic!("expected synced outcome for {}, got {:?}", id, other),
    }
}

#[test]
fn redelivered_push_is_acknowledged_once() {
    let mut table = Table::default();
    let batch = vec![sample("s-1", 1, 100), sample("s-2", 2, 200)];

    let first = table.push(&batch);
    let second = table.push(&batch);

    assert_eq!(first, second);
    assert_eq!(table.sequence, 2);
}

#[test]
fn second_device_conflicts_until_it_rebases() {
    let mut table = Table::default();

    let created = table.push(&[sample("s-1", 1, 100)]);
    let base = revision_of(&created, "s-1");

    // Device A edits on top of the revision it saw.
    let mut from_a = sample("s-1", 2, 200);
    from_a.base_revision = Some(base);
    let accepted = table.push(&[from_a]);
    let current = revision_of(&accepted, "s-1");
    assert!(current > base);

    // Device B still holds the old base.
    let mut from_b = sample("s-1", 3, 150);
    from_b.base_revision = Some(base);
    let rejected = table.push(&[from_b.clone()]);
    let server = match rejected.outcome_for("s-1") {
        Some(RecordOutcome::Conflict { server }) => server.clone(),
        other => panic!("expected conflict, got {:?}", other),
    };
    assert_eq!(server.revision, current);
    assert_eq!(server.payload, json!({"value": 2}));

    // Keeping the local version means rebasing on the server revision.
    from_b.rebase(server.revision);
    let retried = table.push(&[from_b]);
    assert!(revision_of(&retried, "s-1") > current);
    assert_eq!(table.rows["s-1"].payload, json!({"value": 3}));
}

#[test]
fn invalid_record_does_not_block_batch() {
    let mut table = Table::default();
    let mut empty = sample("s-1", 1, 100);
    empty.payload = serde_json::Value::Null;

    let response = table.push(&[empty, sample("s-2", 2, 200)]);

    assert!(matches!(
        response.outcome_for("s-1"),
        Some(RecordOutcome::Error { .. })
    ));
    assert_eq!(revision_of(&response, "s-2"), 1);
}

#[test]
fn pull_pages_follow_revision_order() {
    let mut table = Table::default();
    table.push(&[
        sample("s-1", 1, 300),
        sample("s-2", 2, 100),
        sample("s-3", 3, 200),
    ]);

    let first = table.pull(0, 2);
    assert!(first.has_more);
    assert_eq!(first.checkpoint, "2");
    let ids: Vec<_> = first.records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["s-1", "s-2"]);

    let second = table.pull(first.checkpoint.parse().unwrap(), 2);
    assert!(!second.has_more);
    assert_eq!(second.records.len(), 1);
    assert_eq!(second.checkpoint, "3");

    let empty = table.pull(3, 2);
    assert!(empty.records.is_empty());
    assert_eq!(empty.checkpoint, "3");
}

#[test]
fn push_request_wire_format() {
    let json = r#"{
        "deviceId": "device-123",
        "records": [
            {
                "id": "s-1",
                "kind": "sensorData",
                "payload": {"hr": 72},
                "updatedAt": 1706745600000,
                "syncStatus": "pending",
                "baseRevision": 4
            },
            {
                "id": "sess-1",
                "payload": {"name": "run"},
                "updatedAt": 1706745601000
            }
        ]
    }"#;

    let request: PushRequest = serde_json::from_str(json).unwrap();

    assert_eq!(request.device_id, "device-123");
    assert_eq!(request.records.len(), 2);
    assert_eq!(request.records[0].base_revision, Some(4));
    assert_eq!(request.records[1].kind, RecordKind::SensorData);
    assert_eq!(request.records[1].base_revision, None);
}

#[test]
fn push_response_wire_format() {
    let response = PushResponse {
        results: vec![
            PushResult {
                id: "s-1".to_string(),
                outcome: RecordOutcome::Synced { revision: 7 },
            },
            PushResult {
                id: "s-2".to_string(),
                outcome: RecordOutcome::Error {
                    message: "record s-2 has no payload".to_string(),
                },
            },
        ],
    };

    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(value["results"][0]["outcome"]["status"], "synced");
    assert_eq!(value["results"][0]["outcome"]["revision"], 7);
    assert_eq!(value["results"][1]["outcome"]["status"], "error");
}

#[test]
fn pull_query_and_response_wire_format() {
    let query = PullQuery {
        since: Some("42".to_string()),
        limit: Some(50),
    };
    let value = serde_json::to_value(&query).unwrap();
    assert_eq!(value, json!({"since": "42", "limit": 50}));

    let response = PullResponse {
        records: vec![],
        checkpoint: "42".to_string(),
        has_more: false,
    };
    let json = serde_json::to_string(&response).unwrap();
    assert!(json.contains("\"checkpoint\":\"42\""));
    assert!(json.contains("\"hasMore\":false"));
}
