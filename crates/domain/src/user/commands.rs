//! User commands.

use event_store::AggregateId;

/// Register a new user account.
#[derive(Debug, Clone)]
pub struct RegisterUser {
    pub user_id: AggregateId,
    pub name: String,
    pub email: String,
}

impl RegisterUser {
    /// Creates a registration command with a fresh user ID.
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user_id: AggregateId::new(),
            name: name.into(),
            email: email.into(),
        }
    }

    /// Creates a registration command for a caller-chosen ID.
    pub fn with_id(
        user_id: AggregateId,
        name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            name: name.into(),
            email: email.into(),
        }
    }
}

/// Change a user's display name.
#[derive(Debug, Clone)]
pub struct UpdateProfile {
    pub user_id: AggregateId,
    pub name: String,
}

impl UpdateProfile {
    pub fn new(user_id: AggregateId, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
        }
    }
}

/// Change a user's email address.
#[derive(Debug, Clone)]
pub struct ChangeEmail {
    pub user_id: AggregateId,
    pub email: String,
}

impl ChangeEmail {
    pub fn new(user_id: AggregateId, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }
}

/// Deactivate a user account.
#[derive(Debug, Clone)]
pub struct DeactivateUser {
    pub user_id: AggregateId,
    pub reason: Option<String>,
}

impl DeactivateUser {
    pub fn new(user_id: AggregateId, reason: Option<String>) -> Self {
        Self { user_id, reason }
    }
}
