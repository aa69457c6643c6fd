use std::sync::Arc;

use serde_json::json;

use crate::{
    callback::dispatcher::{CallbackDispatcher, CallbackJob},
    domain::{EventKind, EventRecord, Payment, PaymentSnapshot, PaymentStatus, RetryCallback},
    error::{AppError, Result},
    repository::{CallbackFailure, EventLogRepository, PaymentRepository, RetryCallbackRepository},
};

/// Decides whether a payment owes a notification, runs the dispatcher,
/// and settles the outcome into the payment row and the retry ledger.
/// Owns no state of its own.
pub struct CallbackOrchestrator {
    dispatcher: CallbackDispatcher,
    payments: Arc<dyn PaymentRepository>,
    retries: Arc<dyn RetryCallbackRepository>,
    events: Arc<dyn EventLogRepository>,
}

impl CallbackOrchestrator {
    pub fn new(
        dispatcher: CallbackDispatcher,
        payments: Arc<dyn PaymentRepository>,
        retries: Arc<dyn RetryCallbackRepository>,
        events: Arc<dyn EventLogRepository>,
    ) -> Self {
        Self {
            dispatcher,
            payments,
            retries,
            events,
        }
    }

    /// Entry point for a detected status change (inbound notification or
    /// reconciliation poll). Unknown request ids surface as NotFound and
    /// never create ledger entries.
    pub async fn notify_status_change(
        &self,
        request_id: &str,
        old_status: PaymentStatus,
        new_status: PaymentStatus,
    ) -> Result<bool> {
        tracing::info!(
            request_id,
            "Payment status changed: {} -> {}",
            old_status,
            new_status
        );

        let payment = self
            .payments
            .find_by_request_id(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment {request_id} not found")))?;

        let delivered = self.notify_if_configured(&payment).await?;

        self.events
            .record(
                EventRecord::new(EventKind::Info)
                    .request_id(request_id)
                    .message(format!(
                        "Payment status changed: {old_status} -> {new_status}"
                    ))
                    .detail(json!({
                        "oldStatus": old_status,
                        "newStatus": new_status,
                        "hasCallback": payment.external_url_callback.is_some(),
                    })),
            )
            .await;

        Ok(delivered)
    }

    /// Deliver the payment's current status to its subscriber, if any.
    /// Idempotent: an already-delivered payment is a no-op with no network
    /// I/O; a payment with no callback URL is marked delivered directly.
    /// Returns whether the payment is delivered after this call.
    pub async fn notify_if_configured(&self, payment: &Payment) -> Result<bool> {
        if payment.callback_executed {
            return Ok(true);
        }

        let Some(callback_url) = payment.external_url_callback.as_deref() else {
            self.payments
                .set_callback_executed(&payment.request_id, true)
                .await?;
            return Ok(true);
        };

        tracing::info!(
            request_id = payment.request_id,
            callback_url,
            "Executing external callback"
        );

        let job = CallbackJob::first_attempt(payment, callback_url);
        let outcome = self.dispatcher.deliver(&job).await;

        if outcome.is_success() {
            self.payments
                .set_callback_executed(&payment.request_id, true)
                .await?;

            self.events
                .record(
                    EventRecord::new(EventKind::CallbackSuccess)
                        .request_id(&payment.request_id)
                        .status_code(outcome.status_code() as i64)
                        .detail(json!({
                            "callbackUrl": callback_url,
                            "status": payment.status,
                        })),
                )
                .await;

            Ok(true)
        } else {
            let error = outcome.error_message().unwrap_or_default();
            tracing::warn!(
                request_id = payment.request_id,
                status_code = outcome.status_code(),
                "Callback failed, queued for retry: {}",
                error
            );

            let entry = self
                .retries
                .record_failure(CallbackFailure {
                    request_id: payment.request_id.clone(),
                    reference: payment.reference.clone(),
                    callback_url: callback_url.to_string(),
                    snapshot: PaymentSnapshot {
                        amount: payment.amount,
                        currency: payment.currency.clone(),
                        payment_status: payment.status,
                        buyer: payment.buyer.clone(),
                    },
                    error: error.clone(),
                    status_code: outcome.status_code() as i64,
                })
                .await?;

            self.events
                .record(
                    EventRecord::new(EventKind::CallbackFailed)
                        .request_id(&payment.request_id)
                        .status_code(outcome.status_code() as i64)
                        .error(error)
                        .message("Callback failed, queued for retry")
                        .detail(json!({
                            "callbackUrl": callback_url,
                            "attempts": entry.attempts,
                            "nextRetryAt": entry.next_retry_at,
                        })),
                )
                .await;

            Ok(false)
        }
    }

    /// Re-attempt one ledger entry. The payload is rebuilt from the entry's
    /// snapshot; the live payment row is only touched to flip its
    /// delivered flag on success.
    pub async fn retry_one(&self, entry: &RetryCallback) -> Result<bool> {
        let job = CallbackJob::replay(entry);
        tracing::info!(
            request_id = entry.request_id,
            attempt = job.attempt_number,
            "Retrying callback"
        );

        let outcome = self.dispatcher.deliver(&job).await;

        if outcome.is_success() {
            self.retries
                .record_success(&entry.request_id, outcome.status_code() as i64)
                .await?;
            self.payments
                .set_callback_executed(&entry.request_id, true)
                .await?;

            tracing::info!(
                request_id = entry.request_id,
                "Callback succeeded after {} attempts",
                job.attempt_number
            );
            self.events
                .record(
                    EventRecord::new(EventKind::CronCallbackSuccess)
                        .request_id(&entry.request_id)
                        .status_code(outcome.status_code() as i64)
                        .detail(json!({
                            "callbackUrl": entry.callback_url,
                            "attempt": job.attempt_number,
                        })),
                )
                .await;

            Ok(true)
        } else {
            let error = outcome.error_message().unwrap_or_default();
            let updated = self
                .retries
                .record_failure(CallbackFailure {
                    request_id: entry.request_id.clone(),
                    reference: entry.reference.clone(),
                    callback_url: entry.callback_url.clone(),
                    snapshot: entry.payment_data.clone(),
                    error: error.clone(),
                    status_code: outcome.status_code() as i64,
                })
                .await?;

            tracing::warn!(
                request_id = entry.request_id,
                attempt = job.attempt_number,
                next_retry_at = ?updated.next_retry_at,
                "Callback retry failed: {}",
                error
            );
            self.events
                .record(
                    EventRecord::new(EventKind::CronCallbackFailed)
                        .request_id(&entry.request_id)
                        .status_code(outcome.status_code() as i64)
                        .error(error)
                        .detail(json!({
                            "callbackUrl": entry.callback_url,
                            "attempt": job.attempt_number,
                            "nextRetryAt": updated.next_retry_at,
                        })),
                )
                .await;

            Ok(false)
        }
    }
}
