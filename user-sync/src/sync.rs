//! Applies verified user events to the local store.
//!
//! ```text
//! UserEvent → UserSync::apply() → UserStore (+ IdentityProvider on create)
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::error::SyncError;
use crate::event::{DeletedPayload, UserEvent, UserPayload};
use crate::provider::IdentityProvider;
use crate::store::{NewUser, User, UserStore, UserUpdate};

/// What happened to an event.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// A store operation ran; carries the record it returned.
    Synced(Option<User>),
    /// Event type not handled here.
    Ignored,
}

/// Dispatches user events to the store and provider collaborators.
#[derive(Clone)]
pub struct UserSync {
    store: Arc<dyn UserStore>,
    provider: Arc<dyn IdentityProvider>,
}

impl UserSync {
    pub fn new(store: Arc<dyn UserStore>, provider: Arc<dyn IdentityProvider>) -> Self {
        Self { store, provider }
    }

    /// Apply one event. At most one store operation runs per call.
    pub async fn apply(&self, event: UserEvent) -> Result<SyncOutcome, SyncError> {
        match event {
            UserEvent::Created(user) => self.created(user).await,
            UserEvent::Updated(user) => self.updated(user).await,
            UserEvent::Deleted(deleted) => self.deleted(deleted).await,
            UserEvent::Other { event_type, id } => {
                info!(
                    event_type = %event_type,
                    id = id.as_deref().unwrap_or(""),
                    "webhook_event_ignored"
                );
                Ok(SyncOutcome::Ignored)
            }
        }
    }

    async fn created(&self, user: UserPayload) -> Result<SyncOutcome, SyncError> {
        let email = user
            .first_email()
            .ok_or_else(|| SyncError::MissingEmail {
                user_id: user.id.clone(),
            })?
            .to_string();

        let created = self
            .store
            .create_user(NewUser {
                id: user.id.clone(),
                email,
            })
            .await?;

        // No rollback if tagging fails; redelivery hits the idempotent create.
        if let Some(record) = &created {
            info!(clerk_id = %user.id, user_id = %record.id, "user_created");
            self.provider
                .update_public_metadata(&user.id, json!({ "userId": record.id }))
                .await?;
        }

        Ok(SyncOutcome::Synced(created))
    }

    async fn updated(&self, user: UserPayload) -> Result<SyncOutcome, SyncError> {
        let update = UserUpdate {
            email: user.first_email().map(str::to_string),
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            image_url: user.image_url,
            updated_at: Utc::now(),
        };

        let updated = self.store.update_user(&user.id, update).await?;
        info!(clerk_id = %user.id, found = updated.is_some(), "user_updated");

        Ok(SyncOutcome::Synced(updated))
    }

    async fn deleted(&self, deleted: DeletedPayload) -> Result<SyncOutcome, SyncError> {
        let id = deleted.id.unwrap_or_default();

        let removed = self.store.delete_user(&id).await?;
        info!(clerk_id = %id, found = removed.is_some(), "user_deleted");

        Ok(SyncOutcome::Synced(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ProviderError, StoreError};
    use crate::store::MemoryUserStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FailingProvider {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl IdentityProvider for FailingProvider {
        async fn update_public_metadata(
            &self,
            _account_id: &str,
            _metadata: serde_json::Value,
        ) -> Result<(), ProviderError> {
            *self.calls.lock().unwrap() += 1;
            Err(ProviderError::Status {
                status: 503,
                body: "unavailable".to_string(),
            })
        }
    }

    /// Provider that counts calls and always succeeds.
    #[derive(Default)]
    struct CountingProvider {
        calls: Mutex<u32>,
    }

    #[async_trait]
    impl IdentityProvider for CountingProvider {
        async fn update_public_metadata(
            &self,
            _account_id: &str,
            _metadata: serde_json::Value,
        ) -> Result<(), ProviderError> {
            *self.calls.lock().unwrap() += 1;
            Ok(())
        }
    }

    /// Store whose writes never produce a record.
    struct NothingWrittenStore;

    #[async_trait]
    impl UserStore for NothingWrittenStore {
        async fn create_user(&self, _user: NewUser) -> Result<Option<User>, StoreError> {
            Ok(None)
        }

        async fn update_user(&self, _id: &str, _update: UserUpdate) -> Result<Option<User>, StoreError> {
            Ok(None)
        }

        async fn delete_user(&self, _id: &str) -> Result<Option<User>, StoreError> {
            Ok(None)
        }
    }

    fn payload(json: serde_json::Value) -> UserPayload {
        serde_json::from_value(json).unwrap()
    }

    #[tokio::test]
    async fn test_created_without_email_fails() {
        let store = MemoryUserStore::new();
        let sync = UserSync::new(
            Arc::new(store.clone()),
            Arc::new(crate::provider::DisabledProvider),
        );

        let event = UserEvent::Created(payload(json!({"id": "user_1", "email_addresses": []})));
        let err = sync.apply(event).await.unwrap_err();

        assert!(matches!(err, SyncError::MissingEmail { ref user_id } if user_id == "user_1"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_created_user() {
        let store = MemoryUserStore::new();
        let provider = Arc::new(FailingProvider::default());
        let sync = UserSync::new(Arc::new(store.clone()), provider.clone());

        let event = UserEvent::Created(payload(json!({
            "id": "user_1",
            "email_addresses": [{"email_address": "a@b.com"}]
        })));
        let err = sync.apply(event).await.unwrap_err();

        assert!(matches!(err, SyncError::Provider(_)));
        assert_eq!(*provider.calls.lock().unwrap(), 1);
        assert!(store.get("user_1").await.is_some());
    }

    #[tokio::test]
    async fn test_update_persists_profile_fields() {
        let store = MemoryUserStore::new();
        let sync = UserSync::new(
            Arc::new(store.clone()),
            Arc::new(crate::provider::DisabledProvider),
        );

        sync.apply(UserEvent::Created(payload(json!({
            "id": "user_1",
            "email_addresses": [{"email_address": "a@b.com"}]
        }))))
        .await
        .unwrap();

        let outcome = sync
            .apply(UserEvent::Updated(payload(json!({
                "id": "user_1",
                "email_addresses": [{"email_address": "new@b.com"}],
                "first_name": "Ada",
                "last_name": "Lovelace",
                "username": "ada",
                "image_url": "https://img.example.com/ada.png"
            }))))
            .await
            .unwrap();

        let user = match outcome {
            SyncOutcome::Synced(Some(user)) => user,
            other => panic!("Expected synced user, got {:?}", other),
        };
        assert_eq!(user.email, "new@b.com");
        assert_eq!(user.first_name.as_deref(), Some("Ada"));
        assert_eq!(user.last_name.as_deref(), Some("Lovelace"));
        assert_eq!(user.username.as_deref(), Some("ada"));
        assert_eq!(user.image_url.as_deref(), Some("https://img.example.com/ada.png"));
    }

    #[tokio::test]
    async fn test_created_without_record_skips_metadata() {
        let provider = Arc::new(CountingProvider::default());
        let sync = UserSync::new(Arc::new(NothingWrittenStore), provider.clone());

        let outcome = sync
            .apply(UserEvent::Created(payload(json!({
                "id": "user_1",
                "email_addresses": [{"email_address": "a@b.com"}]
            }))))
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Synced(None));
        assert_eq!(*provider.calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_null_clears_profile_fields() {
        let store = MemoryUserStore::new();
        let sync = UserSync::new(
            Arc::new(store.clone()),
            Arc::new(crate::provider::DisabledProvider),
        );

        sync.apply(UserEvent::Created(payload(json!({
            "id": "user_1",
            "email_addresses": [{"email_address": "a@b.com"}]
        }))))
        .await
        .unwrap();

        sync.apply(UserEvent::Updated(payload(json!({
            "id": "user_1",
            "email_addresses": [{"email_address": "a@b.com"}],
            "last_name": "Lovelace",
            "username": "ada",
            "image_url": "https://img.example.com/ada.png"
        }))))
        .await
        .unwrap();

        sync.apply(UserEvent::Updated(payload(json!({
            "id": "user_1",
            "email_addresses": [{"email_address": "a@b.com"}],
            "last_name": null,
            "username": null
        }))))
        .await
        .unwrap();

        let user = store.get("user_1").await.unwrap();
        assert_eq!(user.last_name, None);
        assert_eq!(user.username, None);
        assert_eq!(user.image_url.as_deref(), Some("https://img.example.com/ada.png"));
    }

    #[tokio::test]
    async fn test_other_event_is_ignored() {
        let store = MemoryUserStore::new();
        let sync = UserSync::new(
            Arc::new(store.clone()),
            Arc::new(crate::provider::DisabledProvider),
        );

        let outcome = sync
            .apply(UserEvent::Other {
                event_type: "email.created".to_string(),
                id: None,
            })
            .await
            .unwrap();

        assert_eq!(outcome, SyncOutcome::Ignored);
        assert!(store.is_empty().await);
    }
}
