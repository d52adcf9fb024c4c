//! Configuration module for environment variable parsing.
//!
//! Everything is read once at startup. The webhook secret is required: the
//! server refuses to start without it rather than failing per request.

use std::env;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::error::ConfigError;

/// Default base URL of the identity provider's backend API.
pub const DEFAULT_CLERK_API_URL: &str = "https://api.clerk.com/v1";

/// Default route the webhook is mounted on.
pub const DEFAULT_WEBHOOK_PATH: &str = "/api/webhooks/clerk";

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port for the web server to listen on
    pub port: u16,

    /// Route the webhook endpoint is mounted on
    pub webhook_path: String,

    /// Svix signing secret (`whsec_...`)
    pub webhook_secret: String,

    /// Allowed clock skew in seconds for the `svix-timestamp` header
    pub signature_tolerance_secs: u64,

    /// Secret key for the provider backend API. Metadata tagging is
    /// disabled when unset.
    pub clerk_secret_key: Option<String>,

    /// Base URL of the provider backend API
    pub clerk_api_url: Url,

    /// Timeout for outbound provider requests in milliseconds
    pub request_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let webhook_secret = env::var("WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::MissingWebhookSecret)?;

        let raw_url =
            env::var("CLERK_API_URL").unwrap_or_else(|_| DEFAULT_CLERK_API_URL.to_string());
        let clerk_api_url = Url::parse(&raw_url).map_err(|source| ConfigError::InvalidUrl {
            name: "CLERK_API_URL",
            source,
        })?;

        Ok(Config {
            port: parse_or("PORT", 8080),

            webhook_path: parse_path("WEBHOOK_PATH", DEFAULT_WEBHOOK_PATH),

            webhook_secret,

            signature_tolerance_secs: parse_or("SIGNATURE_TOLERANCE_SECS", 300), // 5 minutes

            clerk_secret_key: env::var("CLERK_SECRET_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),

            clerk_api_url,

            request_timeout_ms: parse_or("REQUEST_TIMEOUT_MS", 8000),
        })
    }

    /// Timeout applied to outbound provider calls.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Parse a numeric variable, falling back to `default` when unset or invalid.
fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(v) => v,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid numeric value, using default");
            default
        }
    }
}

/// Read a route path, falling back to `default` when unset or not absolute.
fn parse_path(name: &str, default: &str) -> String {
    match env::var(name) {
        Ok(path) if path.starts_with('/') => path,
        Ok(path) => {
            warn!(env_var = name, value = %path, "Route path must start with '/', using default");
            default.to_string()
        }
        Err(_) => default.to_string(),
    }
}
