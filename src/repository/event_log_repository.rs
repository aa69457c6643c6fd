use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use crate::{domain::EventRecord, repository::EventLogRepository};

/// Durable operational log, the SQLite rendition of the old AllLog
/// collection. Writes are fail-soft: an insert error is traced and
/// dropped so logging can never take down the operation being logged.
pub struct SqliteEventLogRepository {
    pool: SqlitePool,
}

impl SqliteEventLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLogRepository for SqliteEventLogRepository {
    async fn record(&self, event: EventRecord) {
        let result = sqlx::query(
            r#"
            INSERT INTO event_log (type, request_id, message, error, status_code, detail, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.kind.as_str())
        .bind(&event.request_id)
        .bind(&event.message)
        .bind(&event.error)
        .bind(event.status_code)
        .bind(event.detail.as_ref().map(|d| d.to_string()))
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(
                kind = event.kind.as_str(),
                request_id = event.request_id.as_deref().unwrap_or(""),
                "Failed to write event log entry: {}",
                e
            );
        }
    }
}
