//! Local user persistence.
//!
//! [`UserStore`] is the seam the sync logic writes through. Records are keyed
//! by the identity provider's user id; each record also carries its own local
//! id, which is written back to the provider as public metadata.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::StoreError;

/// A locally stored user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Local id
    pub id: String,
    /// Identity provider's user id
    pub clerk_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a user.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    /// Identity provider's user id
    pub id: String,
    pub email: String,
}

/// Partial update.
///
/// `email: None` leaves the stored address unchanged. Profile fields use
/// `None` for "leave unchanged" and `Some(None)` for "clear".
#[derive(Debug, Clone, PartialEq)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub first_name: Option<Option<String>>,
    pub last_name: Option<Option<String>>,
    pub username: Option<Option<String>>,
    pub image_url: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}

/// Persistence operations used by the webhook.
///
/// Idempotency on redelivery is the implementation's responsibility.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user, returning the stored record if one was written.
    async fn create_user(&self, user: NewUser) -> Result<Option<User>, StoreError>;

    /// Apply `update` to the user with provider id `id`.
    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<Option<User>, StoreError>;

    /// Remove the user with provider id `id`, returning the removed record.
    async fn delete_user(&self, id: &str) -> Result<Option<User>, StoreError>;
}

/// In-process store backed by a map.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a user by provider id.
    pub async fn get(&self, clerk_id: &str) -> Option<User> {
        self.users.read().await.get(clerk_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: NewUser) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;

        // Redelivered create: hand back what we already have.
        if let Some(existing) = users.get(&user.id) {
            debug!(clerk_id = %user.id, "store_user_exists");
            return Ok(Some(existing.clone()));
        }

        let now = Utc::now();
        let record = User {
            id: Uuid::new_v4().to_string(),
            clerk_id: user.id.clone(),
            email: user.email,
            first_name: None,
            last_name: None,
            username: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, record.clone());

        Ok(Some(record))
    }

    async fn update_user(&self, id: &str, update: UserUpdate) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;

        let Some(user) = users.get_mut(id) else {
            debug!(clerk_id = %id, "store_update_unknown_user");
            return Ok(None);
        };

        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(first_name) = update.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = last_name;
        }
        if let Some(username) = update.username {
            user.username = username;
        }
        if let Some(image_url) = update.image_url {
            user.image_url = image_url;
        }
        user.updated_at = update.updated_at;

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.write().await.remove(id))
    }
}
