use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Buyer, PaymentStatus};

/// A pending or resolved outbound delivery obligation. At most one row
/// exists per `request_id`; failures upsert into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryCallback {
    pub id: i64,
    pub request_id: String,
    pub reference: String,
    pub callback_url: String,
    pub status: RetryStatus,
    /// Failed attempts so far. After the Nth failure the next attempt
    /// waits (N+1) minutes, unbounded, no cap.
    pub attempts: i64,
    pub next_retry_at: Option<DateTime<Utc>>,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_status_code: Option<i64>,
    pub success_at: Option<DateTime<Utc>>,
    /// Payment snapshot captured at the first failure. Replays use this,
    /// not the live payment row, so a later unrelated status change does
    /// not corrupt an in-flight retry's payload.
    pub payment_data: PaymentSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RetryStatus {
    Pending,
    Success,
}

impl RetryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryStatus::Pending => "PENDING",
            RetryStatus::Success => "SUCCESS",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(RetryStatus::Pending),
            "SUCCESS" => Some(RetryStatus::Success),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PaymentSnapshot {
    pub amount: i64,
    pub currency: String,
    pub payment_status: PaymentStatus,
    pub buyer: Buyer,
}
