use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::{
    callback::orchestrator::CallbackOrchestrator,
    error::Result,
    repository::RetryCallbackRepository,
};

/// Periodically drains due retry ledger entries, sequentially and with a
/// fixed pause between attempts so subscriber endpoints are never hit in
/// bursts. A failed entry is not re-tried within the sweep; its
/// next_retry_at was already advanced by the failure handler.
pub struct RetrySweeper {
    retries: Arc<dyn RetryCallbackRepository>,
    orchestrator: Arc<CallbackOrchestrator>,
    batch_size: i64,
    delay: Duration,
}

#[derive(Debug, Clone, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SweepSummary {
    pub due: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RetrySweeper {
    pub fn new(
        retries: Arc<dyn RetryCallbackRepository>,
        orchestrator: Arc<CallbackOrchestrator>,
        batch_size: i64,
        delay: Duration,
    ) -> Self {
        Self {
            retries,
            orchestrator,
            batch_size,
            delay,
        }
    }

    /// One sweep over at most `batch_size` due entries. Only the initial
    /// ledger read can fail the sweep; per-entry errors are counted and
    /// logged.
    pub async fn run(&self) -> Result<SweepSummary> {
        let due = self.retries.due_entries(self.batch_size).await?;

        let mut summary = SweepSummary {
            due: due.len(),
            ..Default::default()
        };

        if due.is_empty() {
            tracing::debug!("No due callback retries");
            return Ok(summary);
        }

        tracing::info!("Processing {} due callback retries", due.len());

        for (i, entry) in due.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.delay).await;
            }

            match self.orchestrator.retry_one(entry).await {
                Ok(true) => summary.succeeded += 1,
                Ok(false) => summary.failed += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(
                        request_id = entry.request_id,
                        "Retry processing error: {}",
                        e
                    );
                }
            }
        }

        tracing::info!(
            due = summary.due,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Retry sweep finished"
        );

        Ok(summary)
    }
}
