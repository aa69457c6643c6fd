use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One Getnet web-checkout session and its local delivery state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    /// Session id assigned by Getnet, unique and immutable.
    pub request_id: String,
    /// Caller-supplied business reference, max 32 characters.
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub buyer: Buyer,
    /// Subscriber URL to notify on status change. Set once at creation.
    pub external_url_callback: Option<String>,
    /// Whether the notification for the current status has been delivered.
    pub callback_executed: bool,
    pub process_url: Option<String>,
    /// Timestamp of the last confirmed status change, used to skip no-op polls.
    pub last_status_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Created,
    Pending,
    Approved,
    Rejected,
    Failed,
    Expired,
    Refunded,
    Chargeback,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Created => "CREATED",
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Approved => "APPROVED",
            PaymentStatus::Rejected => "REJECTED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Expired => "EXPIRED",
            PaymentStatus::Refunded => "REFUNDED",
            PaymentStatus::Chargeback => "CHARGEBACK",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(PaymentStatus::Created),
            "PENDING" => Some(PaymentStatus::Pending),
            "APPROVED" => Some(PaymentStatus::Approved),
            "REJECTED" => Some(PaymentStatus::Rejected),
            "FAILED" => Some(PaymentStatus::Failed),
            "EXPIRED" => Some(PaymentStatus::Expired),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            "CHARGEBACK" => Some(PaymentStatus::Chargeback),
            _ => None,
        }
    }

    /// Statuses still worth polling upstream for. Approved and terminal
    /// payments are excluded to bound provider API load.
    pub fn is_reconcilable(&self) -> bool {
        matches!(self, PaymentStatus::Created | PaymentStatus::Pending)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Buyer {
    pub name: String,
    pub email: String,
    pub document: Option<String>,
}
