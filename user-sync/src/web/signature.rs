//! Svix webhook signature verification.
//!
//! Clerk delivers webhooks through Svix, which signs each request with
//! HMAC-SHA256 over `"{svix-id}.{svix-timestamp}.{body}"`.
//! Reference: https://docs.svix.com/receiving/verifying-payloads/how-manual

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::error::VerifyError;

type HmacSha256 = Hmac<Sha256>;

pub const SVIX_ID: &str = "svix-id";
pub const SVIX_TIMESTAMP: &str = "svix-timestamp";
pub const SVIX_SIGNATURE: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";
const SIGNATURE_VERSION: &str = "v1";

/// The three signature headers of a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvixHeaders {
    pub id: String,
    pub timestamp: String,
    pub signature: String,
}

impl SvixHeaders {
    /// Extract the headers. Returns `None` if any is missing or empty.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Some(Self {
            id: get(SVIX_ID)?,
            timestamp: get(SVIX_TIMESTAMP)?,
            signature: get(SVIX_SIGNATURE)?,
        })
    }
}

/// Checks that a payload was signed by the provider.
pub trait SignatureVerifier: Send + Sync {
    /// Verify `payload` exactly as received on the wire.
    fn verify(&self, headers: &SvixHeaders, payload: &[u8]) -> Result<(), VerifyError>;
}

/// Production verifier for Svix-signed deliveries.
#[derive(Clone)]
pub struct SvixVerifier {
    key: Vec<u8>,
    tolerance_secs: i64,
}

impl std::fmt::Debug for SvixVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvixVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

impl SvixVerifier {
    /// Build a verifier from a `whsec_`-prefixed (or bare) base64 secret.
    ///
    /// # Arguments
    ///
    /// * `secret` - The signing secret from the provider dashboard
    /// * `tolerance_secs` - Maximum allowed skew of `svix-timestamp` (prevents replay attacks)
    pub fn new(secret: &str, tolerance_secs: u64) -> Result<Self, VerifyError> {
        let encoded = secret.trim();
        let encoded = encoded.strip_prefix(SECRET_PREFIX).unwrap_or(encoded);

        let key = STANDARD
            .decode(encoded)
            .map_err(|_| VerifyError::InvalidSecret)?;
        if key.is_empty() {
            return Err(VerifyError::InvalidSecret);
        }

        Ok(Self {
            key,
            tolerance_secs: i64::try_from(tolerance_secs).unwrap_or(i64::MAX),
        })
    }

    /// Verify against an explicit current time in Unix seconds.
    pub fn verify_at(
        &self,
        headers: &SvixHeaders,
        payload: &[u8],
        now: i64,
    ) -> Result<(), VerifyError> {
        let timestamp: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| VerifyError::InvalidTimestamp(headers.timestamp.clone()))?;

        if now.saturating_sub(timestamp) > self.tolerance_secs {
            warn!(
                webhook_time = timestamp,
                current_time = now,
                tolerance_secs = self.tolerance_secs,
                "svix_signature_stale"
            );
            return Err(VerifyError::TimestampTooOld {
                age_secs: now.saturating_sub(timestamp),
            });
        }
        if timestamp > now.saturating_add(self.tolerance_secs) {
            warn!(
                webhook_time = timestamp,
                current_time = now,
                tolerance_secs = self.tolerance_secs,
                "svix_signature_from_future"
            );
            return Err(VerifyError::TimestampTooNew {
                ahead_secs: timestamp.saturating_sub(now),
            });
        }

        let mac = self.mac(&headers.id, &headers.timestamp, payload)?;

        // Header holds space-separated "<version>,<base64>" entries; any v1 match passes.
        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, sig)| STANDARD.decode(sig).ok())
            .any(|sig| mac.clone().verify_slice(&sig).is_ok());

        if !matched {
            warn!(
                svix_id = %headers.id,
                candidates = headers.signature.split_whitespace().count(),
                "svix_signature_mismatch"
            );
            return Err(VerifyError::NoMatchingSignature);
        }

        Ok(())
    }

    /// Produce an `svix-signature` header value for a payload.
    pub fn sign(&self, msg_id: &str, timestamp: i64, payload: &[u8]) -> Result<String, VerifyError> {
        let mac = self.mac(msg_id, &timestamp.to_string(), payload)?;
        let digest = STANDARD.encode(mac.finalize().into_bytes());
        Ok(format!("{SIGNATURE_VERSION},{digest}"))
    }

    fn mac(&self, msg_id: &str, timestamp: &str, payload: &[u8]) -> Result<HmacSha256, VerifyError> {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).map_err(|_| VerifyError::InvalidSecret)?;
        mac.update(msg_id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac)
    }
}

impl SignatureVerifier for SvixVerifier {
    fn verify(&self, headers: &SvixHeaders, payload: &[u8]) -> Result<(), VerifyError> {
        self.verify_at(headers, payload, Utc::now().timestamp())
    }
}
