use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use sha1::{Digest, Sha1};

use crate::{
    domain::{Buyer, Payment, PaymentStatus, RetryCallback},
    error::{AppError, Result},
};

/// Only 200 and 201 count as delivered. Other 2xx codes are failures by
/// provider contract.
pub const VALID_STATUS_CODES: [u16; 2] = [200, 201];

/// Outcome of a single delivery attempt. Never an Err: callers always
/// proceed to bookkeeping, whatever happened on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success { status_code: u16 },
    HttpFailure { status_code: u16, error: String },
    TransportFailure { error: String },
    Timeout,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Success { .. })
    }

    /// HTTP status if a response was received, 0 otherwise.
    pub fn status_code(&self) -> u16 {
        match self {
            DeliveryOutcome::Success { status_code } => *status_code,
            DeliveryOutcome::HttpFailure { status_code, .. } => *status_code,
            DeliveryOutcome::TransportFailure { .. } | DeliveryOutcome::Timeout => 0,
        }
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            DeliveryOutcome::Success { .. } => None,
            DeliveryOutcome::HttpFailure { error, .. } => Some(error.clone()),
            DeliveryOutcome::TransportFailure { error } => Some(error.clone()),
            DeliveryOutcome::Timeout => Some("Timeout".to_string()),
        }
    }
}

/// One notification to push to a subscriber URL.
#[derive(Debug, Clone)]
pub struct CallbackJob {
    pub callback_url: String,
    pub request_id: String,
    pub reference: String,
    pub status: PaymentStatus,
    pub amount: i64,
    pub currency: String,
    pub buyer: Buyer,
    pub is_retry: bool,
    pub attempt_number: i64,
}

impl CallbackJob {
    /// First delivery attempt, built from the live payment. The caller
    /// guarantees `external_url_callback` is set.
    pub fn first_attempt(payment: &Payment, callback_url: &str) -> Self {
        Self {
            callback_url: callback_url.to_string(),
            request_id: payment.request_id.clone(),
            reference: payment.reference.clone(),
            status: payment.status,
            amount: payment.amount,
            currency: payment.currency.clone(),
            buyer: payment.buyer.clone(),
            is_retry: false,
            attempt_number: 1,
        }
    }

    /// Replay built from the ledger entry's snapshot, not the live payment.
    pub fn replay(entry: &RetryCallback) -> Self {
        Self {
            callback_url: entry.callback_url.clone(),
            request_id: entry.request_id.clone(),
            reference: entry.reference.clone(),
            status: entry.payment_data.payment_status,
            amount: entry.payment_data.amount,
            currency: entry.payment_data.currency.clone(),
            buyer: entry.payment_data.buyer.clone(),
            is_retry: true,
            attempt_number: entry.attempts + 1,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CallbackPayload<'a> {
    secret_hash: String,
    request_id: &'a str,
    reference: &'a str,
    status: PaymentStatus,
    amount: i64,
    currency: &'a str,
    buyer: &'a Buyer,
    timestamp: String,
    is_retry: bool,
    attempt_number: i64,
}

/// Performs one delivery attempt to a subscriber URL. Stateless: never
/// touches the ledger or payment rows, that is the orchestrator's job.
pub struct CallbackDispatcher {
    http: reqwest::Client,
    server_secret: String,
    timeout: Duration,
}

impl CallbackDispatcher {
    pub fn new(server_secret: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            server_secret,
            timeout,
        })
    }

    /// Sender-authentication token carried in the payload body: SHA-1 hex
    /// of serverSecret + callbackUrl. In-body rather than a header so the
    /// subscriber can verify the sender without a shared TLS channel.
    pub fn callback_secret(&self, callback_url: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.server_secret.as_bytes());
        hasher.update(callback_url.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn deliver(&self, job: &CallbackJob) -> DeliveryOutcome {
        let payload = CallbackPayload {
            secret_hash: self.callback_secret(&job.callback_url),
            request_id: &job.request_id,
            reference: &job.reference,
            status: job.status,
            amount: job.amount,
            currency: &job.currency,
            buyer: &job.buyer,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            is_retry: job.is_retry,
            attempt_number: job.attempt_number,
        };

        let response = self
            .http
            .post(&job.callback_url)
            .header("X-Getnet-RequestId", &job.request_id)
            .header("X-Attempt-Number", job.attempt_number.to_string())
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status_code = resp.status().as_u16();
                if VALID_STATUS_CODES.contains(&status_code) {
                    DeliveryOutcome::Success { status_code }
                } else {
                    let body: serde_json::Value = resp.json().await.unwrap_or_default();
                    let error = body
                        .get("message")
                        .and_then(|v| v.as_str())
                        .or_else(|| body.get("error").and_then(|v| v.as_str()))
                        .map(str::to_string)
                        .unwrap_or_else(|| format!("HTTP {status_code}"));
                    DeliveryOutcome::HttpFailure { status_code, error }
                }
            }
            Err(e) if e.is_timeout() => DeliveryOutcome::Timeout,
            Err(e) => DeliveryOutcome::TransportFailure {
                error: e.to_string(),
            },
        }
    }
}
