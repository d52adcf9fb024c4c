//! Web server module for the identity provider webhook.
//!
//! This module provides:
//! - Svix signature verification over the raw request body
//! - The webhook handler that dispatches verified user events
//! - A health check

pub mod handlers;
pub mod signature;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use handlers::{
    clerk_webhook, health, AppState, HealthResponse, SyncResponse, MISSING_HEADERS_BODY,
    VERIFICATION_FAILED_BODY,
};
pub use signature::{SignatureVerifier, SvixHeaders, SvixVerifier};

/// Build the application router with the webhook mounted at `webhook_path`.
pub fn router(state: AppState, webhook_path: &str) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(webhook_path, post(clerk_webhook))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
