use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use crate::{
    callback::CallbackOrchestrator,
    domain::{EventKind, EventRecord, Payment, PaymentStatus},
    error::Result,
    gateway::GetnetClient,
    repository::{EventLogRepository, PaymentRepository},
};

/// Hard cap on the lookback window, whatever the caller asks for.
pub const MAX_DAYS_BACK: i64 = 30;

/// Polls the provider for payments still in a non-terminal state and
/// folds any status change back into local state, notifying subscribers
/// through the orchestrator. Strictly sequential with a fixed pause
/// between upstream queries; per-payment errors never abort the batch.
pub struct ReconciliationScheduler {
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<GetnetClient>,
    orchestrator: Arc<CallbackOrchestrator>,
    events: Arc<dyn EventLogRepository>,
    query_delay: Duration,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransition {
    pub request_id: String,
    pub reference: String,
    pub from: PaymentStatus,
    pub to: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationSummary {
    pub days_back: i64,
    pub checked: usize,
    pub updated: usize,
    pub errors: usize,
    pub transitions: Vec<StatusTransition>,
}

impl ReconciliationScheduler {
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<GetnetClient>,
        orchestrator: Arc<CallbackOrchestrator>,
        events: Arc<dyn EventLogRepository>,
        query_delay: Duration,
    ) -> Self {
        Self {
            payments,
            gateway,
            orchestrator,
            events,
            query_delay,
        }
    }

    pub async fn run(&self, days_back: i64) -> Result<ReconciliationSummary> {
        let days_back = days_back.clamp(1, MAX_DAYS_BACK);
        let cutoff = Utc::now() - chrono::Duration::days(days_back);

        // Candidate listing is the only failure that aborts the run.
        let candidates = self.payments.list_reconcilable(cutoff).await?;

        let mut summary = ReconciliationSummary {
            days_back,
            ..Default::default()
        };

        tracing::info!(
            days_back,
            candidates = candidates.len(),
            "Starting reconciliation run"
        );

        for (i, payment) in candidates.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.query_delay).await;
            }
            summary.checked += 1;

            match self.reconcile_one(payment).await {
                Ok(Some(transition)) => {
                    summary.updated += 1;
                    summary.transitions.push(transition);
                }
                Ok(None) => {}
                Err(e) => {
                    summary.errors += 1;
                    tracing::warn!(
                        request_id = payment.request_id,
                        "Reconciliation skipped payment: {}",
                        e
                    );
                    self.events
                        .record(
                            EventRecord::new(EventKind::Error)
                                .request_id(&payment.request_id)
                                .message("Reconciliation failed for payment")
                                .error(e.to_string()),
                        )
                        .await;
                }
            }
        }

        tracing::info!(
            checked = summary.checked,
            updated = summary.updated,
            errors = summary.errors,
            "Reconciliation run finished"
        );

        Ok(summary)
    }

    async fn reconcile_one(&self, payment: &Payment) -> Result<Option<StatusTransition>> {
        let info = self.gateway.query_status(&payment.request_id).await?;

        let Some(status_block) = info.status else {
            tracing::debug!(
                request_id = payment.request_id,
                "Status query returned no status block"
            );
            return Ok(None);
        };

        let Some(new_status) = PaymentStatus::parse(&status_block.status) else {
            tracing::warn!(
                request_id = payment.request_id,
                "Unknown upstream status: {}",
                status_block.status
            );
            return Ok(None);
        };

        if new_status == payment.status {
            return Ok(None);
        }

        let status_date = status_block
            .date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let updated = self
            .payments
            .update_status(&payment.request_id, new_status, status_date)
            .await?;

        self.events
            .record(
                EventRecord::new(EventKind::CronPaymentUpdated)
                    .request_id(&payment.request_id)
                    .message(format!(
                        "Reconciliation: {} -> {}",
                        payment.status, new_status
                    ))
                    .detail(json!({
                        "from": payment.status,
                        "to": new_status,
                        "statusDate": status_block.date,
                    })),
            )
            .await;

        // Any status change is notify-worthy, not only APPROVED. A delivery
        // failure here is already ledgered by the orchestrator, so it does
        // not count against the reconciliation itself.
        if let Err(e) = self.orchestrator.notify_if_configured(&updated).await {
            tracing::error!(
                request_id = payment.request_id,
                "Notification after reconciliation failed: {}",
                e
            );
        }

        Ok(Some(StatusTransition {
            request_id: payment.request_id.clone(),
            reference: payment.reference.clone(),
            from: payment.status,
            to: new_status,
        }))
    }
}
