//! Push handler - applies record batches uploaded by devices.

use crate::db;
use crate::error::{AppError, Result};
use fieldsync_engine::{
    classify_push, PushDecision, PushRequest, PushResponse, PushResult, RecordOutcome,
    SyncableRecord,
};
use sqlx::PgPool;

/// Largest batch a single push may carry.
pub const MAX_PUSH_RECORDS: usize = 1000;

/// Attempts at storing a record that loses an insert race.
const MAX_ATTEMPTS: usize = 3;

/// Process a push request from a device.
pub async fn handle_push(pool: &PgPool, request: PushRequest) -> Result<PushResponse> {
    if request.records.len() > MAX_PUSH_RECORDS {
        return Err(AppError::BadRequest(format!(
            "push carries {} records, at most {} allowed",
            request.records.len(),
            MAX_PUSH_RECORDS
        )));
    }

    let mut results = Vec::with_capacity(request.records.len());
    for record in &request.records {
        let outcome = apply_record(pool, &request.device_id, record).await?;
        results.push(PushResult {
            id: record.id.clone(),
            outcome,
        });
    }

    let synced = results
        .iter()
        .filter(|r| matches!(r.outcome, RecordOutcome::Synced { .. }))
        .count();
    tracing::info!(
        device_id = %request.device_id,
        records = results.len(),
        synced,
        "push applied"
    );

    Ok(PushResponse { results })
}

/// Store one record and report its outcome.
///
/// Each record runs in its own transaction holding the row lock, so a
/// failure on one record never rolls back its neighbours.
async fn apply_record(
    pool: &PgPool,
    device_id: &str,
    record: &SyncableRecord,
) -> Result<RecordOutcome> {
    for _ in 0..MAX_ATTEMPTS {
        let mut tx = pool.begin().await?;

        let existing = match db::get_record_for_update(&mut *tx, &record.id).await? {
            Some(stored) => Some(stored.to_server_record().map_err(AppError::Internal)?),
            None => None,
        };

        let outcome = match classify_push(existing.as_ref(), record) {
            PushDecision::Invalid(message) => {
                tracing::debug!(record_id = %record.id, %message, "rejected record");
                RecordOutcome::Error { message }
            }
            PushDecision::Insert => match db::insert_record(&mut *tx, device_id, record).await? {
                Some(revision) => RecordOutcome::Synced {
                    revision: revision as u64,
                },
                // Another push created the id after our lookup; classify again.
                None => {
                    tx.rollback().await?;
                    continue;
                }
            },
            PushDecision::Overwrite => {
                let revision = db::update_record(&mut *tx, device_id, record).await?;
                RecordOutcome::Synced {
                    revision: revision as u64,
                }
            }
            PushDecision::Duplicate(revision) => RecordOutcome::Synced { revision },
            PushDecision::Conflict(server) => {
                tracing::debug!(
                    record_id = %record.id,
                    base_revision = ?record.base_revision,
                    server_revision = server.revision,
                    "push conflict"
                );
                RecordOutcome::Conflict { server }
            }
        };

        tx.commit().await?;
        return Ok(outcome);
    }

    Err(AppError::Internal(format!(
        "record {} kept losing insert races",
        record.id
    )))
}
