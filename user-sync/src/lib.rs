//! User sync - keeps local user records in step with the identity provider.
//!
//! The provider posts signed user lifecycle webhooks; each one is verified
//! and applied to the local store.
//!
//! ## Flow
//!
//! ```text
//! Provider → POST /api/webhooks/clerk → verify → UserSync → UserStore
//!                                                    ↘ IdentityProvider (metadata)
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod provider;
pub mod store;
pub mod sync;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use error::{ConfigError, ProviderError, StoreError, SyncError, VerifyError};
pub use event::UserEvent;
pub use provider::{ClerkClient, DisabledProvider, IdentityProvider};
pub use store::{MemoryUserStore, NewUser, User, UserStore, UserUpdate};
pub use sync::{SyncOutcome, UserSync};
pub use web::{router, AppState};
