use std::time::Instant;

use axum::{extract::Query, extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::{
    api::state::AppState,
    callback::SweepSummary,
    domain::{EventKind, EventRecord},
    error::Result,
    reconciliation::ReconciliationSummary,
};

#[derive(Debug, Deserialize)]
pub struct CronParams {
    pub days: Option<i64>,
    #[serde(rename = "skipReconciliation", default)]
    pub skip_reconciliation: bool,
    #[serde(rename = "skipCallbacks", default)]
    pub skip_callbacks: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CronSummary {
    pub reconciliation: Option<ReconciliationSummary>,
    pub callbacks: Option<SweepSummary>,
    pub duration_ms: u64,
}

/// Externally triggered batch job: one reconciliation run followed by one
/// retry sweep, never internally parallelized. Always 200 with a summary
/// unless a candidate listing itself fails.
pub async fn run(
    State(state): State<AppState>,
    Query(params): Query<CronParams>,
) -> Result<Json<CronSummary>> {
    let started = Instant::now();
    let days_back = params
        .days
        .unwrap_or(state.settings.reconciliation.default_days_back);

    state
        .services
        .event_log
        .record(EventRecord::new(EventKind::CronStarted).message(format!(
            "days={days_back} skipReconciliation={} skipCallbacks={}",
            params.skip_reconciliation, params.skip_callbacks
        )))
        .await;

    let outcome = execute(&state, days_back, &params).await;

    match outcome {
        Ok((reconciliation, callbacks)) => {
            let summary = CronSummary {
                reconciliation,
                callbacks,
                duration_ms: started.elapsed().as_millis() as u64,
            };

            state
                .services
                .event_log
                .record(
                    EventRecord::new(EventKind::CronCompleted)
                        .message(format!("Completed in {} ms", summary.duration_ms)),
                )
                .await;

            Ok(Json(summary))
        }
        Err(e) => {
            state
                .services
                .event_log
                .record(EventRecord::new(EventKind::CronError).error(e.to_string()))
                .await;
            Err(e)
        }
    }
}

async fn execute(
    state: &AppState,
    days_back: i64,
    params: &CronParams,
) -> Result<(Option<ReconciliationSummary>, Option<SweepSummary>)> {
    let reconciliation = if params.skip_reconciliation {
        None
    } else {
        Some(state.services.scheduler.run(days_back).await?)
    };

    let callbacks = if params.skip_callbacks {
        None
    } else {
        Some(state.services.sweeper.run().await?)
    };

    Ok((reconciliation, callbacks))
}
