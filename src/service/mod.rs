use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::{
    callback::{CallbackDispatcher, CallbackOrchestrator, RetrySweeper},
    config::Settings,
    error::Result,
    gateway::GetnetClient,
    reconciliation::ReconciliationScheduler,
    repository::{
        EventLogRepository, PaymentRepository, RetryCallbackRepository, SqliteEventLogRepository,
        SqlitePaymentRepository, SqliteRetryCallbackRepository,
    },
};

/// Wires repositories, the Getnet client and the callback machinery
/// together. Handlers reach everything through this context.
pub struct ServiceContext {
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub retry_repo: Arc<dyn RetryCallbackRepository>,
    pub event_log: Arc<dyn EventLogRepository>,
    pub gateway: Arc<GetnetClient>,
    pub orchestrator: Arc<CallbackOrchestrator>,
    pub scheduler: Arc<ReconciliationScheduler>,
    pub sweeper: Arc<RetrySweeper>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(db_pool: SqlitePool, settings: &Settings) -> Result<Self> {
        let payment_repo: Arc<dyn PaymentRepository> =
            Arc::new(SqlitePaymentRepository::new(db_pool.clone()));
        let retry_repo: Arc<dyn RetryCallbackRepository> =
            Arc::new(SqliteRetryCallbackRepository::new(db_pool.clone()));
        let event_log: Arc<dyn EventLogRepository> =
            Arc::new(SqliteEventLogRepository::new(db_pool.clone()));

        let gateway = Arc::new(GetnetClient::new(&settings.getnet)?);

        let dispatcher = CallbackDispatcher::new(
            settings.callback.server_secret.clone(),
            Duration::from_secs(settings.callback.timeout_secs),
        )?;

        let orchestrator = Arc::new(CallbackOrchestrator::new(
            dispatcher,
            payment_repo.clone(),
            retry_repo.clone(),
            event_log.clone(),
        ));

        let scheduler = Arc::new(ReconciliationScheduler::new(
            payment_repo.clone(),
            gateway.clone(),
            orchestrator.clone(),
            event_log.clone(),
            Duration::from_millis(settings.reconciliation.query_delay_ms),
        ));

        let sweeper = Arc::new(RetrySweeper::new(
            retry_repo.clone(),
            orchestrator.clone(),
            settings.callback.batch_size,
            Duration::from_millis(settings.callback.sweep_delay_ms),
        ));

        Ok(Self {
            payment_repo,
            retry_repo,
            event_log,
            gateway,
            orchestrator,
            scheduler,
            sweeper,
            db_pool,
        })
    }
}
