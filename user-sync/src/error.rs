//! Error types for each stage of webhook handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

/// Startup configuration problems. These are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("WEBHOOK_SECRET is not set; add the signing secret from the Clerk dashboard")]
    MissingWebhookSecret,

    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Reasons a webhook delivery fails authentication or decoding.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("signing secret is not valid base64")]
    InvalidSecret,

    #[error("invalid svix-timestamp header: {0:?}")]
    InvalidTimestamp(String),

    #[error("message timestamp too old ({age_secs}s)")]
    TimestampTooOld { age_secs: i64 },

    #[error("message timestamp too new ({ahead_secs}s ahead)")]
    TimestampTooNew { ahead_secs: i64 },

    #[error("no matching signature found")]
    NoMatchingSignature,

    #[error("payload is not a valid event: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Failure inside the persistence collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user store unavailable: {0}")]
    Unavailable(String),
}

/// Failure calling the identity provider's backend API.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider base url cannot take path segments: {0}")]
    InvalidBaseUrl(String),
}

/// Downstream failures while applying a verified event.
///
/// These are not recovered locally; they surface as a 500 so the provider
/// redelivers the event.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("user {user_id} has no email address")]
    MissingEmail { user_id: String },
}

impl IntoResponse for SyncError {
    fn into_response(self) -> Response {
        error!(error = %self, "webhook_sync_failed");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
    }
}
