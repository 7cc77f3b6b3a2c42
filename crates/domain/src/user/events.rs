//! User domain events.

use chrono::{DateTime, Utc};
use event_store::AggregateId;
use serde::{Deserialize, Serialize};

use crate::aggregate::DomainEvent;

/// Events that can occur on a user aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UserEvent {
    /// A new user account was registered.
    UserRegistered(UserRegisteredData),

    /// The user's display name was changed.
    UserProfileUpdated(UserProfileUpdatedData),

    /// The user's email address was changed.
    UserEmailChanged(UserEmailChangedData),

    /// The account was deactivated.
    UserDeactivated(UserDeactivatedData),
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::UserRegistered(_) => "UserRegistered",
            UserEvent::UserProfileUpdated(_) => "UserProfileUpdated",
            UserEvent::UserEmailChanged(_) => "UserEmailChanged",
            UserEvent::UserDeactivated(_) => "UserDeactivated",
        }
    }
}

/// Data for UserRegistered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRegisteredData {
    /// The new user's ID.
    pub user_id: AggregateId,

    /// Display name at registration.
    pub name: String,

    /// Email address at registration.
    pub email: String,

    /// When the registration happened.
    pub registered_at: DateTime<Utc>,
}

/// Data for UserProfileUpdated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileUpdatedData {
    /// Previous display name.
    pub old_name: String,

    /// New display name.
    pub new_name: String,
}

/// Data for UserEmailChanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserEmailChangedData {
    /// Previous email address.
    pub old_email: String,

    /// New email address.
    pub new_email: String,
}

/// Data for UserDeactivated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDeactivatedData {
    /// Email at the time of deactivation, kept for downstream consumers.
    pub email: String,

    /// Optional operator-supplied reason.
    pub reason: Option<String>,

    /// When the account was deactivated.
    pub deactivated_at: DateTime<Utc>,
}

impl UserEvent {
    pub fn user_registered(user_id: AggregateId, name: &str, email: &str) -> Self {
        UserEvent::UserRegistered(UserRegisteredData {
            user_id,
            name: name.to_string(),
            email: email.to_string(),
            registered_at: Utc::now(),
        })
    }

    pub fn profile_updated(old_name: &str, new_name: &str) -> Self {
        UserEvent::UserProfileUpdated(UserProfileUpdatedData {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        })
    }

    pub fn email_changed(old_email: &str, new_email: &str) -> Self {
        UserEvent::UserEmailChanged(UserEmailChangedData {
            old_email: old_email.to_string(),
            new_email: new_email.to_string(),
        })
    }

    pub fn deactivated(email: &str, reason: Option<String>) -> Self {
        UserEvent::UserDeactivated(UserDeactivatedData {
            email: email.to_string(),
            reason,
            deactivated_at: Utc::now(),
        })
    }
}
