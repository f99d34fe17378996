//! Pull handler - serves changed records to devices.

use crate::config::MAX_PULL_LIMIT;
use crate::db;
use crate::error::{AppError, Result};
use fieldsync_engine::{PullQuery, PullResponse};
use sqlx::PgPool;

/// Process a pull request from a device.
pub async fn handle_pull(
    pool: &PgPool,
    query: PullQuery,
    default_limit: i64,
) -> Result<PullResponse> {
    let since = parse_checkpoint(query.since.as_deref())?;
    let limit = query
        .limit
        .map(|l| l.clamp(1, MAX_PULL_LIMIT))
        .unwrap_or(default_limit);

    // Fetch one more than requested to check if there are more
    let stored = db::get_records_since(pool, since, limit + 1).await?;

    let has_more = stored.len() as i64 > limit;
    let page: Vec<_> = stored.into_iter().take(limit as usize).collect();

    let mut records = Vec::with_capacity(page.len());
    for row in &page {
        match row.to_server_record() {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    device_id = %row.device_id,
                    "Failed to convert stored record {}: {}",
                    row.record_id,
                    e
                );
            }
        }
    }

    // Skipped rows still advance the checkpoint.
    let checkpoint = match page.last() {
        Some(last) => last.revision.to_string(),
        None => since.to_string(),
    };

    tracing::debug!(since, returned = records.len(), has_more, "pull served");

    Ok(PullResponse {
        records,
        checkpoint,
        has_more,
    })
}

/// Checkpoints are decimal revisions; absent or empty means from the start.
pub fn parse_checkpoint(since: Option<&str>) -> Result<i64> {
    match since.map(str::trim) {
        None | Some("") => Ok(0),
        Some(value) => value
            .parse::<i64>()
            .ok()
            .filter(|v| *v >= 0)
            .ok_or_else(|| AppError::BadRequest(format!("invalid checkpoint: {}", value))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_parsing() {
        assert_eq!(parse_checkpoint(None).unwrap(), 0);
        assert_eq!(parse_checkpoint(Some("")).unwrap(), 0);
        assert_eq!(parse_checkpoint(Some("42")).unwrap(), 42);
        assert!(matches!(
            parse_checkpoint(Some("abc")),
            Err(AppError::BadRequest(_))
        ));
        assert!(parse_checkpoint(Some("-3")).is_err());
    }
}
