//! User aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod service;
mod state;

pub use aggregate::User;
pub use commands::{ChangeEmail, DeactivateUser, RegisterUser, UpdateProfile};
pub use events::{
    UserDeactivatedData, UserEmailChangedData, UserEvent, UserProfileUpdatedData,
    UserRegisteredData,
};
pub use service::UserService;
pub use state::UserStatus;

use thiserror::Error;

/// Business-rule violations of the user aggregate.
///
/// All of these are raised *before* any event is produced, so a rejected
/// operation never leaves partial state behind.
#[derive(Debug, Error)]
pub enum UserError {
    /// Registration attempted on an aggregate that already has history.
    #[error("user already registered")]
    AlreadyRegistered,

    /// An operation other than registration targeted an unknown user.
    #[error("user is not registered")]
    NotRegistered,

    /// The user was deactivated; no further changes are allowed.
    #[error("user is deactivated")]
    Deactivated,

    /// Display name missing or blank.
    #[error("name must not be empty")]
    EmptyName,

    /// Email address failed the plausibility check.
    #[error("invalid email address: {email}")]
    InvalidEmail { email: String },
}
