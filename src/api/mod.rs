pub mod handlers;
pub mod state;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{config::Settings, service::ServiceContext};
use state::AppState;

pub fn create_app(services: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(services, settings);

    Router::new()
        .route("/", get(handlers::root::root))
        .route("/health", get(handlers::root::health_check))
        .route("/api/create-payment", post(handlers::payments::create))
        .route("/api/payments/:request_id", get(handlers::payments::get))
        .route("/api/notification", post(handlers::notifications::receive))
        // Invoked by an external periodic trigger; runs reconciliation
        // then the retry sweep.
        .route("/api/cron", get(handlers::cron::run))
        .with_state(app_state)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
