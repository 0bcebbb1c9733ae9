//! HTTP API for the grading core.
//!
//! Routes:
//!
//! - `PUT  /api/admin/grades/{cadet_id}`: replace a cadet's grading inputs
//! - `POST /api/admin/sync-lifetime-merits`: reconcile every cadet's merit totals
//! - `GET|POST /api/admin/merit-logs`, `DELETE /api/admin/merit-logs/{log_id}`
//! - `GET|POST /api/admin/cadets`, `GET|DELETE /api/admin/cadets/{cadet_id}`
//! - `POST /api/admin/cadets/{cadet_id}/sync-merits`
//! - `GET  /healthz`

pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use rgms_core::Store;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared application state.
/// Clone is cheap - the store sits behind an Arc.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
}

impl AppState {
    pub fn new(store: Store) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route(
            "/api/admin/cadets",
            get(handlers::list_cadets).post(handlers::create_cadet),
        )
        .route(
            "/api/admin/cadets/{cadet_id}",
            get(handlers::get_cadet).delete(handlers::delete_cadet),
        )
        .route(
            "/api/admin/cadets/{cadet_id}/sync-merits",
            post(handlers::sync_cadet_merits),
        )
        .route("/api/admin/grades/{cadet_id}", put(handlers::update_grades))
        .route(
            "/api/admin/merit-logs",
            get(handlers::list_merit_logs).post(handlers::create_merit_log),
        )
        .route(
            "/api/admin/merit-logs/{log_id}",
            delete(handlers::delete_merit_log),
        )
        .route(
            "/api/admin/sync-lifetime-merits",
            post(handlers::sync_lifetime_merits),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
