//! studyhub-api library - tutoring platform backend
//!
//! Accounts, subjects, tutoring sessions with their confirmation and
//! cancellation workflow, reviews, study materials, a threaded forum,
//! notifications and support intake over a JSON HTTP API.

use axum::Router;
use sqlx::SqlitePool;
use studyhub_common::events::EventBus;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod notify;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Live event fan-out for SSE subscribers
    pub event_bus: EventBus,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus) -> Self {
        Self { db, event_bus }
    }
}

/// Build application router
///
/// `/health` is served at the root, everything else under `/api`.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(api::user_routes())
        .merge(api::session_routes())
        .merge(api::forum_routes())
        .merge(api::material_routes())
        .merge(api::notification_routes())
        .merge(api::support_routes());

    Router::new()
        .nest("/api", api)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
