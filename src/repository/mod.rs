use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::*;
use crate::error::Result;

pub mod event_log_repository;
pub mod payment_repository;
pub mod retry_repository;

pub use event_log_repository::SqliteEventLogRepository;
pub use payment_repository::SqlitePaymentRepository;
pub use retry_repository::SqliteRetryCallbackRepository;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: Payment) -> Result<Payment>;
    async fn find_by_request_id(&self, request_id: &str) -> Result<Option<Payment>>;
    /// Payments still worth polling upstream: status CREATED or PENDING,
    /// created on or after `cutoff`, newest first.
    async fn list_reconcilable(&self, cutoff: DateTime<Utc>) -> Result<Vec<Payment>>;
    /// Persist a confirmed status change. Also stamps `last_status_update`
    /// and resets `callback_executed`, so the new status owes a delivery.
    async fn update_status(
        &self,
        request_id: &str,
        status: PaymentStatus,
        status_date: Option<DateTime<Utc>>,
    ) -> Result<Payment>;
    async fn set_callback_executed(&self, request_id: &str, executed: bool) -> Result<()>;
    /// Append one raw provider notification to the payment's history.
    async fn record_notification(&self, request_id: &str, data: &serde_json::Value) -> Result<()>;
}

/// Arguments for one failed delivery attempt being folded into the ledger.
#[derive(Debug, Clone)]
pub struct CallbackFailure {
    pub request_id: String,
    pub reference: String,
    pub callback_url: String,
    pub snapshot: PaymentSnapshot,
    pub error: String,
    pub status_code: i64,
}

#[async_trait]
pub trait RetryCallbackRepository: Send + Sync {
    /// Upsert a failure, atomically at the store: first failure creates the
    /// entry with attempts=1, later failures increment attempts and
    /// recompute next_retry_at = last_attempt + (attempts+1) minutes, all
    /// inside one statement so concurrent sweeps cannot lose an update.
    async fn record_failure(&self, failure: CallbackFailure) -> Result<RetryCallback>;
    async fn record_success(&self, request_id: &str, status_code: i64)
        -> Result<Option<RetryCallback>>;
    /// Pending entries whose retry time has elapsed, most overdue first,
    /// capped at `limit`.
    async fn due_entries(&self, limit: i64) -> Result<Vec<RetryCallback>>;
    async fn find_by_request_id(&self, request_id: &str) -> Result<Option<RetryCallback>>;
}

#[async_trait]
pub trait EventLogRepository: Send + Sync {
    /// Best-effort durable log write. Implementations swallow storage
    /// errors after tracing them; callers never fail because of logging.
    async fn record(&self, event: EventRecord);
}
