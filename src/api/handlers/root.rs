use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    api::state::AppState,
    domain::{EventKind, EventRecord},
    error::{AppError, Result},
};

pub async fn root() -> Json<Value> {
    Json(json!({
        "name": "getnet-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>> {
    let db_ok = sqlx::query("SELECT 1")
        .fetch_one(&state.services.db_pool)
        .await
        .is_ok();

    state
        .services
        .event_log
        .record(EventRecord::new(EventKind::HealthCheck).message(if db_ok {
            "ok"
        } else {
            "database unreachable"
        }))
        .await;

    if !db_ok {
        return Err(AppError::Internal("Database unreachable".to_string()));
    }

    Ok(Json(json!({ "status": "ok" })))
}
