//! Database operations for the records table.

use fieldsync_engine::{RecordKind, ServerRecord, SyncableRecord};
use sqlx::{PgConnection, PgPool, Row};

/// A stored record row from the database.
#[derive(Debug)]
pub struct StoredRecord {
    pub record_id: String,
    pub kind: String,
    pub payload: serde_json::Value,
    pub updated_at: i64,
    pub revision: i64,
    /// Device that wrote this revision
    pub device_id: String,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredRecord {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredRecord {
            record_id: row.try_get("record_id")?,
            kind: row.try_get("kind")?,
            payload: row.try_get("payload")?,
            updated_at: row.try_get("updated_at")?,
            revision: row.try_get("revision")?,
            device_id: row.try_get("device_id")?,
        })
    }
}

impl StoredRecord {
    /// Convert a database row to the wire representation.
    pub fn to_server_record(&self) -> Result<ServerRecord, String> {
        let kind: RecordKind = self.kind.parse()?;

        Ok(ServerRecord {
            id: self.record_id.clone(),
            kind,
            payload: self.payload.clone(),
            updated_at: self.updated_at as u64,
            revision: self.revision as u64,
        })
    }
}

const SELECT_COLUMNS: &str =
    "SELECT record_id, kind, payload, updated_at, revision, device_id FROM records";

/// Get a record by id and lock its row until the transaction ends.
pub async fn get_record_for_update(
    conn: &mut PgConnection,
    record_id: &str,
) -> Result<Option<StoredRecord>, sqlx::Error> {
    let sql = format!("{} WHERE record_id = $1 FOR UPDATE", SELECT_COLUMNS);
    sqlx::query_as::<_, StoredRecord>(&sql)
        .bind(record_id)
        .fetch_optional(conn)
        .await
}

/// Insert a new record at the next revision.
///
/// Returns `None` if a concurrent push created the same id first.
pub async fn insert_record(
    conn: &mut PgConnection,
    device_id: &str,
    record: &SyncableRecord,
) -> Result<Option<i64>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO records (record_id, kind, payload, updated_at, revision, device_id)
        VALUES ($1, $2, $3, $4, nextval('record_revisions'), $5)
        ON CONFLICT (record_id) DO NOTHING
        RETURNING revision
        "#,
    )
    .bind(&record.id)
    .bind(record.kind.as_str())
    .bind(&record.payload)
    .bind(record.updated_at as i64)
    .bind(device_id)
    .fetch_optional(conn)
    .await?;

    row.map(|r| r.try_get("revision")).transpose()
}

/// Replace a record's content and move it to the next revision.
pub async fn update_record(
    conn: &mut PgConnection,
    device_id: &str,
    record: &SyncableRecord,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        r#"
        UPDATE records SET
            kind = $2,
            payload = $3,
            updated_at = $4,
            revision = nextval('record_revisions'),
            device_id = $5,
            received_at = now()
        WHERE record_id = $1
        RETURNING revision
        "#,
    )
    .bind(&record.id)
    .bind(record.kind.as_str())
    .bind(&record.payload)
    .bind(record.updated_at as i64)
    .bind(device_id)
    .fetch_one(conn)
    .await?;

    row.try_get("revision")
}

/// Records changed after `since`, in revision order.
pub async fn get_records_since(
    pool: &PgPool,
    since: i64,
    limit: i64,
) -> Result<Vec<StoredRecord>, sqlx::Error> {
    let sql = format!(
        "{} WHERE revision > $1 ORDER BY revision ASC LIMIT $2",
        SELECT_COLUMNS
    );
    sqlx::query_as::<_, StoredRecord>(&sql)
        .bind(since)
        .bind(limit)
        .fetch_all(pool)
        .await
}
