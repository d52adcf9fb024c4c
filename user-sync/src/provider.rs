//! Identity provider backend API.
//!
//! Only one call is needed: tagging a provider account with public metadata
//! that points back at the local user record.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};
use url::Url;

use crate::error::ProviderError;

/// Provider-side account operations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Replace the public metadata keys given in `metadata` on `account_id`.
    async fn update_public_metadata(
        &self,
        account_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), ProviderError>;
}

#[derive(Serialize)]
struct MetadataRequest {
    public_metadata: serde_json::Value,
}

/// Clerk backend API client.
#[derive(Clone)]
pub struct ClerkClient {
    client: Client,
    base_url: Url,
    secret_key: String,
}

impl ClerkClient {
    pub fn new(client: Client, base_url: Url, secret_key: String) -> Self {
        Self {
            client,
            base_url,
            secret_key,
        }
    }

    fn metadata_url(&self, account_id: &str) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["users", account_id, "metadata"]);
        Ok(url)
    }
}

#[async_trait]
impl IdentityProvider for ClerkClient {
    async fn update_public_metadata(
        &self,
        account_id: &str,
        metadata: serde_json::Value,
    ) -> Result<(), ProviderError> {
        let url = self.metadata_url(account_id)?;

        let response = self
            .client
            .patch(url)
            .bearer_auth(&self.secret_key)
            .json(&MetadataRequest {
                public_metadata: metadata,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                account_id = %account_id,
                status = status.as_u16(),
                "provider_metadata_rejected"
            );
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        info!(account_id = %account_id, "provider_metadata_updated");
        Ok(())
    }
}

/// Used when no provider secret key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledProvider;

#[async_trait]
impl IdentityProvider for DisabledProvider {
    async fn update_public_metadata(
        &self,
        account_id: &str,
        _metadata: serde_json::Value,
    ) -> Result<(), ProviderError> {
        warn!(account_id = %account_id, "provider_metadata_not_configured");
        Ok(())
    }
}
