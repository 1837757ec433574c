//! HTTP transport for contact identity reconciliation.
//!
//! # Responsibility
//! - Expose `POST /identify`, `GET /` and `GET /health`.
//! - Map core errors onto the `{ error: { message } }` envelope.
//!
//! # Invariants
//! - Handlers never hold the database mutex on an async worker thread.
//! - 500 responses carry error details only in development mode.

use axum::http::{header, HeaderName, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use crate::config::Environment;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

pub mod api;
pub mod config;

/// Application state shared across HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Single migrated connection; resolutions are serialized through it.
    pub db: Arc<Mutex<Connection>>,
    pub environment: Environment,
}

impl AppState {
    pub fn new(conn: Connection, environment: Environment) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            environment,
        }
    }
}

/// Builds the application router with CORS and security headers.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(api::service_description))
        .route("/identify", post(api::identify))
        .merge(api::health_routes())
        .layer(CorsLayer::permissive())
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static("referrer-policy"),
            HeaderValue::from_static("no-referrer"),
        ))
        .with_state(state)
}
