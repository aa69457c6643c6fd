use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    domain::{Buyer, PaymentSnapshot, PaymentStatus, RetryCallback, RetryStatus},
    error::{AppError, Result},
    repository::{CallbackFailure, RetryCallbackRepository},
};

#[derive(FromRow)]
struct RetryRow {
    id: i64,
    request_id: String,
    reference: String,
    callback_url: String,
    status: String,
    attempts: i64,
    next_retry_at: Option<NaiveDateTime>,
    last_attempt: Option<NaiveDateTime>,
    last_error: Option<String>,
    last_status_code: Option<i64>,
    success_at: Option<NaiveDateTime>,
    amount: i64,
    currency: String,
    payment_status: String,
    buyer_name: String,
    buyer_email: String,
    buyer_document: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const RETRY_COLUMNS: &str = r#"
    id, request_id, reference, callback_url, status, attempts,
    next_retry_at, last_attempt, last_error, last_status_code, success_at,
    amount, currency, payment_status, buyer_name, buyer_email, buyer_document,
    created_at, updated_at
"#;

pub struct SqliteRetryCallbackRepository {
    pool: SqlitePool,
}

impl SqliteRetryCallbackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Timestamps feeding the backoff arithmetic are stored with whole-second
    /// precision so `datetime(.., '+N minutes')` in SQL stays exact.
    fn now_second() -> NaiveDateTime {
        let now = Utc::now().naive_utc();
        now.with_nanosecond(0).unwrap_or(now)
    }

    fn row_to_entry(row: RetryRow) -> Result<RetryCallback> {
        let to_utc = |dt: NaiveDateTime| DateTime::from_naive_utc_and_offset(dt, Utc);
        Ok(RetryCallback {
            id: row.id,
            request_id: row.request_id,
            reference: row.reference,
            callback_url: row.callback_url,
            status: RetryStatus::parse(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid retry status: {}", row.status)))?,
            attempts: row.attempts,
            next_retry_at: row.next_retry_at.map(to_utc),
            last_attempt: row.last_attempt.map(to_utc),
            last_error: row.last_error,
            last_status_code: row.last_status_code,
            success_at: row.success_at.map(to_utc),
            payment_data: PaymentSnapshot {
                amount: row.amount,
                currency: row.currency,
                payment_status: PaymentStatus::parse(&row.payment_status).ok_or_else(|| {
                    AppError::Database(format!("Invalid payment status: {}", row.payment_status))
                })?,
                buyer: Buyer {
                    name: row.buyer_name,
                    email: row.buyer_email,
                    document: row.buyer_document,
                },
            },
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }
}

#[async_trait]
impl RetryCallbackRepository for SqliteRetryCallbackRepository {
    async fn record_failure(&self, failure: CallbackFailure) -> Result<RetryCallback> {
        let now = Self::now_second();

        // Single conditional upsert so two overlapping sweeps cannot lose an
        // increment. The insert branch starts at attempts=1 with a 2 minute
        // wait; the conflict branch increments in SQL and waits
        // (attempts+1) minutes, where attempts is the post-increment count
        // (retry_callbacks.attempts here is still the pre-update value).
        // The payment snapshot is written on first failure and left alone
        // while the entry is in flight; a row reopened after SUCCESS gets a
        // fresh snapshot since there is no in-flight payload to corrupt.
        let row = sqlx::query_as::<_, RetryRow>(&format!(
            r#"
            INSERT INTO retry_callbacks (
                request_id, reference, callback_url, status, attempts,
                next_retry_at, last_attempt, last_error, last_status_code,
                amount, currency, payment_status,
                buyer_name, buyer_email, buyer_document,
                created_at, updated_at
            ) VALUES (?, ?, ?, 'PENDING', 1, datetime(?, '+2 minutes'), ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(request_id) DO UPDATE SET
                attempts = retry_callbacks.attempts + 1,
                status = 'PENDING',
                next_retry_at = datetime(
                    excluded.last_attempt,
                    '+' || (retry_callbacks.attempts + 2) || ' minutes'
                ),
                last_attempt = excluded.last_attempt,
                last_error = excluded.last_error,
                last_status_code = excluded.last_status_code,
                success_at = NULL,
                amount = CASE WHEN retry_callbacks.status = 'SUCCESS'
                              THEN excluded.amount ELSE retry_callbacks.amount END,
                currency = CASE WHEN retry_callbacks.status = 'SUCCESS'
                                THEN excluded.currency ELSE retry_callbacks.currency END,
                payment_status = CASE WHEN retry_callbacks.status = 'SUCCESS'
                                      THEN excluded.payment_status ELSE retry_callbacks.payment_status END,
                buyer_name = CASE WHEN retry_callbacks.status = 'SUCCESS'
                                  THEN excluded.buyer_name ELSE retry_callbacks.buyer_name END,
                buyer_email = CASE WHEN retry_callbacks.status = 'SUCCESS'
                                   THEN excluded.buyer_email ELSE retry_callbacks.buyer_email END,
                buyer_document = CASE WHEN retry_callbacks.status = 'SUCCESS'
                                      THEN excluded.buyer_document ELSE retry_callbacks.buyer_document END,
                updated_at = excluded.updated_at
            RETURNING {RETRY_COLUMNS}
            "#
        ))
        .bind(&failure.request_id)
        .bind(&failure.reference)
        .bind(&failure.callback_url)
        .bind(now)
        .bind(now)
        .bind(&failure.error)
        .bind(failure.status_code)
        .bind(failure.snapshot.amount)
        .bind(&failure.snapshot.currency)
        .bind(failure.snapshot.payment_status.as_str())
        .bind(&failure.snapshot.buyer.name)
        .bind(&failure.snapshot.buyer.email)
        .bind(&failure.snapshot.buyer.document)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Self::row_to_entry(row)
    }

    async fn record_success(
        &self,
        request_id: &str,
        status_code: i64,
    ) -> Result<Option<RetryCallback>> {
        let now = Self::now_second();

        let row = sqlx::query_as::<_, RetryRow>(&format!(
            r#"
            UPDATE retry_callbacks
            SET status = 'SUCCESS',
                attempts = attempts + 1,
                last_attempt = ?,
                last_status_code = ?,
                success_at = ?,
                next_retry_at = NULL,
                last_error = NULL,
                updated_at = ?
            WHERE request_id = ?
            RETURNING {RETRY_COLUMNS}
            "#
        ))
        .bind(now)
        .bind(status_code)
        .bind(now)
        .bind(now)
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_entry(r)?)),
            None => Ok(None),
        }
    }

    async fn due_entries(&self, limit: i64) -> Result<Vec<RetryCallback>> {
        let rows = sqlx::query_as::<_, RetryRow>(&format!(
            r#"
            SELECT {RETRY_COLUMNS} FROM retry_callbacks
            WHERE status = 'PENDING' AND next_retry_at <= ?
            ORDER BY next_retry_at ASC
            LIMIT ?
            "#
        ))
        .bind(Self::now_second())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_entry).collect()
    }

    async fn find_by_request_id(&self, request_id: &str) -> Result<Option<RetryCallback>> {
        let row = sqlx::query_as::<_, RetryRow>(&format!(
            "SELECT {RETRY_COLUMNS} FROM retry_callbacks WHERE request_id = ?"
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_entry(r)?)),
            None => Ok(None),
        }
    }
}
