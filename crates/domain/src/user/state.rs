use serde::{Deserialize, Serialize};

/// Lifecycle state of a user account.
///
/// Deactivation is terminal: a deactivated account is kept for its history
/// but accepts no further changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserStatus {
    /// Account is live and can be modified.
    #[default]
    Active,

    /// Account was deactivated (terminal).
    Deactivated,
}

impl UserStatus {
    /// Returns true if profile changes are allowed in this state.
    pub fn can_modify(&self) -> bool {
        matches!(self, UserStatus::Active)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, UserStatus::Deactivated)
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserStatus::Active => write!(f, "Active"),
            UserStatus::Deactivated => write!(f, "Deactivated"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_active() {
        assert_eq!(UserStatus::default(), UserStatus::Active);
    }

    #[test]
    fn only_active_can_modify() {
        assert!(UserStatus::Active.can_modify());
        assert!(!UserStatus::Deactivated.can_modify());
    }

    #[test]
    fn deactivated_is_terminal() {
        assert!(!UserStatus::Active.is_terminal());
        assert!(UserStatus::Deactivated.is_terminal());
    }
}
