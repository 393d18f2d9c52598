//! Route definitions for the reminder engine
//!
//! The engine has no public API; it only exposes health probes.

use crate::state::AppState;
use axum::{routing::get, Router};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

mod health;

pub use health::{HealthChecks, HealthResponse};

/// Create the router with the health probes and middleware
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/live", get(health::liveness_check))
        .layer(TimeoutLayer::new(Duration::from_secs(10)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
