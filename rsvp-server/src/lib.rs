//! rsvp-server library
//!
//! Receives RSVP submissions over HTTP and persists them into the guest store
//! and the passport image folder. Exposes the router and state for the binary
//! and for integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod persistence;
pub mod store;

pub use crate::error::{ApiError, ApiResult};

use std::sync::Arc;

use axum::http::Method;
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::UploadLimits;
use crate::persistence::PersistenceEngine;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Single persistence engine; owns the store's write lock
    pub engine: Arc<PersistenceEngine>,
    /// Upload size limits
    pub limits: UploadLimits,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: PersistenceEngine, limits: UploadLimits) -> Self {
        Self {
            engine: Arc::new(engine),
            limits,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    // Browser form posts from another origin; mirror it back
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .merge(api::submit_routes(state.limits))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
