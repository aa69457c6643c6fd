#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

use getnet_gateway::{
    callback::{CallbackDispatcher, CallbackOrchestrator},
    domain::{Buyer, Payment, PaymentStatus},
    repository::{
        EventLogRepository, PaymentRepository, RetryCallbackRepository, SqliteEventLogRepository,
        SqlitePaymentRepository, SqliteRetryCallbackRepository,
    },
};

pub const TEST_SECRET: &str = "test-secret";

/// In-memory SQLite with migrations applied. One connection only: each
/// SQLite memory connection is its own database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    pool
}

/// Serve a router on an ephemeral local port.
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    addr
}

#[derive(Clone, Default)]
pub struct SubscriberState {
    pub hits: Arc<AtomicUsize>,
    /// While true, the endpoint answers 500; otherwise 201.
    pub failing: Arc<AtomicBool>,
    pub requests: Arc<std::sync::Mutex<Vec<Value>>>,
}

impl SubscriberState {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

/// Stub subscriber endpoint. Counts hits, records bodies, and answers
/// 500 {"error": "server exploded"} while failing, 201 otherwise.
pub async fn spawn_subscriber(state: SubscriberState) -> SocketAddr {
    let router = Router::new()
        .route(
            "/callback",
            post(
                |State(state): State<SubscriberState>, Json(body): Json<Value>| async move {
                    state.hits.fetch_add(1, Ordering::SeqCst);
                    state.requests.lock().expect("lock").push(body);
                    if state.failing.load(Ordering::SeqCst) {
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "error": "server exploded" })),
                        )
                    } else {
                        (StatusCode::CREATED, Json(json!({ "received": true })))
                    }
                },
            ),
        )
        .with_state(state);
    spawn_server(router).await
}

pub struct Harness {
    pub pool: SqlitePool,
    pub payments: Arc<dyn PaymentRepository>,
    pub retries: Arc<dyn RetryCallbackRepository>,
    pub events: Arc<dyn EventLogRepository>,
    pub orchestrator: Arc<CallbackOrchestrator>,
}

pub async fn harness() -> Harness {
    let pool = test_pool().await;
    let payments: Arc<dyn PaymentRepository> = Arc::new(SqlitePaymentRepository::new(pool.clone()));
    let retries: Arc<dyn RetryCallbackRepository> =
        Arc::new(SqliteRetryCallbackRepository::new(pool.clone()));
    let events: Arc<dyn EventLogRepository> = Arc::new(SqliteEventLogRepository::new(pool.clone()));

    let dispatcher = CallbackDispatcher::new(TEST_SECRET.to_string(), Duration::from_secs(2))
        .expect("dispatcher");
    let orchestrator = Arc::new(CallbackOrchestrator::new(
        dispatcher,
        payments.clone(),
        retries.clone(),
        events.clone(),
    ));

    Harness {
        pool,
        payments,
        retries,
        events,
        orchestrator,
    }
}

pub fn sample_payment(request_id: &str, callback_url: Option<String>) -> Payment {
    Payment {
        id: Uuid::new_v4(),
        request_id: request_id.to_string(),
        reference: format!("ORDER-{request_id}"),
        amount: 5000,
        currency: "CLP".to_string(),
        status: PaymentStatus::Created,
        buyer: Buyer {
            name: "Hugo".to_string(),
            email: "test@example.com".to_string(),
            document: Some("11111111-1".to_string()),
        },
        external_url_callback: callback_url,
        callback_executed: false,
        process_url: Some("https://checkout.test.getnet.cl/session/1".to_string()),
        last_status_update: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
