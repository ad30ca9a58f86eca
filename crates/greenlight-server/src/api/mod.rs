//! API module for the verification server

pub mod error;
pub mod handlers;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use handlers::AppState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Readiness check response
#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub certificates: usize,
    pub valid_kids: usize,
    pub revoked: usize,
    /// Seconds since the trust snapshot was published
    pub trust_age_seconds: i64,
    /// Seconds since the policy snapshot was published
    pub policy_age_seconds: i64,
}

/// Health check endpoint
///
/// GET /health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Readiness check endpoint
///
/// GET /ready
pub async fn ready(State(state): State<Arc<AppState>>) -> Json<ReadyResponse> {
    let trust = state.context.trust();
    let policy = state.context.policy();
    let now = chrono::Utc::now();

    Json(ReadyResponse {
        ready: trust.certificate_count() > 0,
        certificates: trust.certificate_count(),
        valid_kids: trust.valid_kids().len(),
        revoked: policy.revoked.len(),
        trust_age_seconds: (now - state.context.trust_published_at()).num_seconds(),
        policy_age_seconds: (now - state.context.policy_published_at()).num_seconds(),
    })
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS configuration for browser-based verifier clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/v1/verify", get(handlers::verify_credential))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
