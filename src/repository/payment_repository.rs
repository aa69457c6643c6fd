use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Buyer, Payment, PaymentStatus},
    error::{AppError, Result},
    repository::PaymentRepository,
};

#[derive(FromRow)]
struct PaymentRow {
    id: String,
    request_id: String,
    reference: String,
    amount: i64,
    currency: String,
    status: String,
    buyer_name: String,
    buyer_email: String,
    buyer_document: Option<String>,
    external_url_callback: Option<String>,
    callback_executed: bool,
    process_url: Option<String>,
    last_status_update: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const PAYMENT_COLUMNS: &str = r#"
    id, request_id, reference, amount, currency, status,
    buyer_name, buyer_email, buyer_document,
    external_url_callback, callback_executed, process_url,
    last_status_update, created_at, updated_at
"#;

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PaymentRow) -> Result<Payment> {
        Ok(Payment {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            request_id: row.request_id,
            reference: row.reference,
            amount: row.amount,
            currency: row.currency,
            status: PaymentStatus::parse(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid payment status: {}", row.status)))?,
            buyer: Buyer {
                name: row.buyer_name,
                email: row.buyer_email,
                document: row.buyer_document,
            },
            external_url_callback: row.external_url_callback,
            callback_executed: row.callback_executed,
            process_url: row.process_url,
            last_status_update: row
                .last_status_update
                .map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn create(&self, payment: Payment) -> Result<Payment> {
        let id_str = payment.id.to_string();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, request_id, reference, amount, currency, status,
                buyer_name, buyer_email, buyer_document,
                external_url_callback, callback_executed, process_url,
                last_status_update, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(&payment.request_id)
        .bind(&payment.reference)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(&payment.buyer.name)
        .bind(&payment.buyer.email)
        .bind(&payment.buyer.document)
        .bind(&payment.external_url_callback)
        .bind(payment.callback_executed)
        .bind(&payment.process_url)
        .bind(payment.last_status_update.map(|dt| dt.naive_utc()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_request_id(&payment.request_id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created payment".to_string()))
    }

    async fn find_by_request_id(&self, request_id: &str) -> Result<Option<Payment>> {
        let row = sqlx::query_as::<_, PaymentRow>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE request_id = ?"
        ))
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_payment(r)?)),
            None => Ok(None),
        }
    }

    async fn list_reconcilable(&self, cutoff: DateTime<Utc>) -> Result<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payments
            WHERE status IN ('CREATED', 'PENDING') AND created_at >= ?
            ORDER BY created_at DESC
            "#
        ))
        .bind(cutoff.naive_utc())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_payment).collect()
    }

    async fn update_status(
        &self,
        request_id: &str,
        status: PaymentStatus,
        status_date: Option<DateTime<Utc>>,
    ) -> Result<Payment> {
        let now = Utc::now().naive_utc();
        let status_date = status_date.map(|dt| dt.naive_utc()).unwrap_or(now);

        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = ?,
                last_status_update = ?,
                callback_executed = 0,
                updated_at = ?
            WHERE request_id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(status_date)
        .bind(now)
        .bind(request_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Payment {request_id} not found")));
        }

        self.find_by_request_id(request_id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve updated payment".to_string()))
    }

    async fn set_callback_executed(&self, request_id: &str, executed: bool) -> Result<()> {
        sqlx::query(
            "UPDATE payments SET callback_executed = ?, updated_at = ? WHERE request_id = ?",
        )
        .bind(executed)
        .bind(Utc::now().naive_utc())
        .bind(request_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }

    async fn record_notification(&self, request_id: &str, data: &serde_json::Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO payment_notifications (request_id, received_at, data) VALUES (?, ?, ?)",
        )
        .bind(request_id)
        .bind(Utc::now().naive_utc())
        .bind(data.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(())
    }
}
