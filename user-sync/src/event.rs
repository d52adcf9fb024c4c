//! Identity provider event types.
//!
//! A verified payload is first read as a loose [`EventEnvelope`] so that
//! unknown event types never fail decoding, then narrowed into a
//! [`UserEvent`].

use serde::{Deserialize, Deserializer, Serialize};

pub const USER_CREATED: &str = "user.created";
pub const USER_UPDATED: &str = "user.updated";
pub const USER_DELETED: &str = "user.deleted";

/// Outer `{ type, data }` shape shared by every event.
#[derive(Debug, Clone, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(default)]
    pub object: Option<String>,
}

impl EventEnvelope {
    /// `data.id`, if present.
    pub fn data_id(&self) -> Option<&str> {
        self.data.get("id").and_then(|v| v.as_str())
    }
}

/// A single email address entry on a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(default)]
    pub id: Option<String>,
    pub email_address: String,
}

/// User object carried by `user.created` and `user.updated`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub id: String,
    #[serde(default)]
    pub email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
    /// Profile fields: `None` when absent, `Some(None)` when sent as null.
    #[serde(default, deserialize_with = "present")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub username: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub image_url: Option<Option<String>>,
}

/// Marks a field that appeared in the payload, keeping an explicit null.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl UserPayload {
    /// First registered email address.
    pub fn first_email(&self) -> Option<&str> {
        self.email_addresses
            .first()
            .map(|e| e.email_address.as_str())
    }
}

/// Object carried by `user.deleted`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeletedPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

/// A decoded user lifecycle event.
#[derive(Debug, Clone)]
pub enum UserEvent {
    Created(UserPayload),
    Updated(UserPayload),
    Deleted(DeletedPayload),
    /// Any type this service does not act on.
    Other {
        event_type: String,
        id: Option<String>,
    },
}

impl UserEvent {
    /// Decode a verified payload.
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        let envelope: EventEnvelope = serde_json::from_slice(payload)?;
        Self::try_from(envelope)
    }

    pub fn event_type(&self) -> &str {
        match self {
            UserEvent::Created(_) => USER_CREATED,
            UserEvent::Updated(_) => USER_UPDATED,
            UserEvent::Deleted(_) => USER_DELETED,
            UserEvent::Other { event_type, .. } => event_type,
        }
    }
}

impl TryFrom<EventEnvelope> for UserEvent {
    type Error = serde_json::Error;

    fn try_from(envelope: EventEnvelope) -> Result<Self, Self::Error> {
        let event = match envelope.event_type.as_str() {
            USER_CREATED => UserEvent::Created(serde_json::from_value(envelope.data)?),
            USER_UPDATED => UserEvent::Updated(serde_json::from_value(envelope.data)?),
            USER_DELETED => UserEvent::Deleted(serde_json::from_value(envelope.data)?),
            _ => UserEvent::Other {
                id: envelope.data_id().map(str::to_string),
                event_type: envelope.event_type,
            },
        };
        Ok(event)
    }
}
