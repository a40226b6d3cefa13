use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

use crate::models::SyncRecord;

pub async fn get_sync_record(pool: &PgPool, scope: &str) -> anyhow::Result<Option<SyncRecord>> {
    let record = sqlx::query_as::<_, SyncRecord>("SELECT * FROM sync_records WHERE scope = $1")
        .bind(scope)
        .fetch_optional(pool)
        .await?;

    Ok(record)
}

/// Merge a freshly covered range into a scope's sync record. Bounds only ever
/// widen (LEAST/GREATEST, nulls ignored) and the complete-history flag is
/// sticky once set. Takes a connection so the caller can commit it in the
/// same transaction as the fills it describes.
pub async fn record_synced_range(
    conn: &mut PgConnection,
    scope: &str,
    synced_from: Option<DateTime<Utc>>,
    synced_to: Option<DateTime<Utc>>,
    has_complete_history: bool,
) -> anyhow::Result<SyncRecord> {
    let record = sqlx::query_as::<_, SyncRecord>(
        r#"
        INSERT INTO sync_records (scope, synced_from, synced_to, synced_at, has_complete_history)
        VALUES ($1, $2, $3, NOW(), $4)
        ON CONFLICT (scope) DO UPDATE SET
            synced_from = LEAST(sync_records.synced_from, EXCLUDED.synced_from),
            synced_to = GREATEST(sync_records.synced_to, EXCLUDED.synced_to),
            synced_at = NOW(),
            has_complete_history = sync_records.has_complete_history OR EXCLUDED.has_complete_history
        RETURNING *
        "#,
    )
    .bind(scope)
    .bind(synced_from)
    .bind(synced_to)
    .bind(has_complete_history)
    .fetch_one(&mut *conn)
    .await?;

    Ok(record)
}
