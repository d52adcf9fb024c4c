//! Webhook endpoint handlers.
//!
//! The webhook handler:
//! 1. Requires the three Svix headers
//! 2. Verifies the signature over the raw body bytes
//! 3. Decodes the event and hands it to [`UserSync`]
//!
//! Only missing headers and failed verification are answered locally (400).
//! Downstream failures become a 500 so the provider retries the delivery.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{SyncError, VerifyError};
use crate::event::UserEvent;
use crate::store::User;
use crate::sync::{SyncOutcome, UserSync};
use crate::web::signature::{SignatureVerifier, SvixHeaders};

pub const MISSING_HEADERS_BODY: &str = "Error occurred -- no svix headers";
pub const VERIFICATION_FAILED_BODY: &str = "Error occurred";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<dyn SignatureVerifier>,
    pub sync: UserSync,
}

impl AppState {
    pub fn new(verifier: Arc<dyn SignatureVerifier>, sync: UserSync) -> Self {
        Self { verifier, sync }
    }
}

// =============================================================================
// Health Check
// =============================================================================

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

// =============================================================================
// Clerk Webhook
// =============================================================================

/// Response for a synced create/update/delete.
#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub message: &'static str,
    pub user: Option<User>,
}

/// Clerk user webhook endpoint.
///
/// The body is taken as raw `Bytes` so verification sees exactly what was
/// signed; it is only parsed once the signature checks out.
pub async fn clerk_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, SyncError> {
    let Some(svix) = SvixHeaders::from_headers(&headers) else {
        warn!(body_length = body.len(), "webhook_missing_svix_headers");
        return Ok((StatusCode::BAD_REQUEST, MISSING_HEADERS_BODY).into_response());
    };

    let event = match verify_and_decode(state.verifier.as_ref(), &svix, &body) {
        Ok(event) => event,
        Err(e) => {
            error!(svix_id = %svix.id, error = %e, "webhook_verification_failed");
            return Ok((StatusCode::BAD_REQUEST, VERIFICATION_FAILED_BODY).into_response());
        }
    };

    info!(
        svix_id = %svix.id,
        event_type = event.event_type(),
        body_length = body.len(),
        "webhook_received"
    );

    match state.sync.apply(event).await? {
        SyncOutcome::Synced(user) => Ok(Json(SyncResponse {
            message: "OK",
            user,
        })
        .into_response()),
        SyncOutcome::Ignored => {
            info!(
                svix_id = %svix.id,
                body = %String::from_utf8_lossy(&body),
                "webhook_body"
            );
            Ok((StatusCode::OK, "").into_response())
        }
    }
}

fn verify_and_decode(
    verifier: &dyn SignatureVerifier,
    headers: &SvixHeaders,
    body: &[u8],
) -> Result<UserEvent, VerifyError> {
    verifier.verify(headers, body)?;
    Ok(UserEvent::from_slice(body)?)
}
