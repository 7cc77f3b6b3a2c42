//! User aggregate implementation.

use event_store::AggregateId;

use crate::aggregate::Aggregate;

use super::{
    UserError, UserEvent, UserStatus,
    events::{UserDeactivatedData, UserEmailChangedData, UserProfileUpdatedData, UserRegisteredData},
};

/// Projected state of a user account.
///
/// Command methods validate against the current state and return events;
/// they never mutate. All mutation happens in [`Aggregate::apply`], which
/// keeps replay deterministic.
#[derive(Debug, Clone, Default)]
pub struct User {
    id: Option<AggregateId>,
    name: String,
    email: String,
    status: UserStatus,
}

impl Aggregate for User {
    type Event = UserEvent;
    type Error = UserError;

    fn aggregate_type() -> &'static str {
        "User"
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            UserEvent::UserRegistered(data) => self.apply_registered(data),
            UserEvent::UserProfileUpdated(data) => self.apply_profile_updated(data),
            UserEvent::UserEmailChanged(data) => self.apply_email_changed(data),
            UserEvent::UserDeactivated(data) => self.apply_deactivated(data),
        }
    }
}

// Query methods
impl User {
    /// The user's ID, or None before registration.
    pub fn id(&self) -> Option<AggregateId> {
        self.id
    }

    /// Current display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current email address.
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Current lifecycle state.
    pub fn status(&self) -> UserStatus {
        self.status
    }

    /// True if the account exists and accepts changes.
    pub fn is_active(&self) -> bool {
        self.id.is_some() && self.status.can_modify()
    }
}

// Command methods (validate, then return events)
impl User {
    /// Registers a new account.
    pub fn register(
        &self,
        user_id: AggregateId,
        name: &str,
        email: &str,
    ) -> Result<Vec<UserEvent>, UserError> {
        if self.id.is_some() {
            return Err(UserError::AlreadyRegistered);
        }
        validate_name(name)?;
        validate_email(email)?;

        Ok(vec![UserEvent::user_registered(user_id, name, email)])
    }

    /// Changes the display name.
    pub fn update_profile(&self, name: &str) -> Result<Vec<UserEvent>, UserError> {
        self.require_active()?;
        validate_name(name)?;

        if name == self.name {
            return Ok(vec![]);
        }

        Ok(vec![UserEvent::profile_updated(&self.name, name)])
    }

    /// Changes the email address.
    pub fn change_email(&self, email: &str) -> Result<Vec<UserEvent>, UserError> {
        self.require_active()?;
        validate_email(email)?;

        if email == self.email {
            return Ok(vec![]);
        }

        Ok(vec![UserEvent::email_changed(&self.email, email)])
    }

    /// Deactivates the account. Terminal.
    pub fn deactivate(&self, reason: Option<String>) -> Result<Vec<UserEvent>, UserError> {
        self.require_active()?;

        Ok(vec![UserEvent::deactivated(&self.email, reason)])
    }

    fn require_active(&self) -> Result<(), UserError> {
        if self.id.is_none() {
            return Err(UserError::NotRegistered);
        }
        if self.status.is_terminal() {
            return Err(UserError::Deactivated);
        }
        Ok(())
    }
}

// Apply helpers
impl User {
    fn apply_registered(&mut self, data: UserRegisteredData) {
        self.id = Some(data.user_id);
        self.name = data.name;
        self.email = data.email;
        self.status = UserStatus::Active;
    }

    fn apply_profile_updated(&mut self, data: UserProfileUpdatedData) {
        self.name = data.new_name;
    }

    fn apply_email_changed(&mut self, data: UserEmailChangedData) {
        self.email = data.new_email;
    }

    fn apply_deactivated(&mut self, _data: UserDeactivatedData) {
        self.status = UserStatus::Deactivated;
    }
}

fn validate_name(name: &str) -> Result<(), UserError> {
    if name.trim().is_empty() {
        return Err(UserError::EmptyName);
    }
    Ok(())
}

// Plausibility only; real deliverability checks belong to the outer layers.
fn validate_email(email: &str) -> Result<(), UserError> {
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, host)| !local.is_empty() && host.contains('.'));
    if !well_formed {
        return Err(UserError::InvalidEmail {
            email: email.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregateRoot;

    fn registered_user() -> AggregateRoot<User> {
        let user_id = AggregateId::new();
        let mut root: AggregateRoot<User> = AggregateRoot::new(user_id);
        root.execute(|user| user.register(user_id, "Ada Lovelace", "ada@example.com"))
            .unwrap();
        root
    }

    #[test]
    fn register_creates_active_user() {
        let root = registered_user();
        let user = root.state();

        assert!(user.id().is_some());
        assert_eq!(user.name(), "Ada Lovelace");
        assert_eq!(user.email(), "ada@example.com");
        assert_eq!(user.status(), UserStatus::Active);
        assert_eq!(root.pending_events().len(), 1);
    }

    #[test]
    fn register_twice_is_rejected() {
        let root = registered_user();
        let result = root
            .state()
            .register(AggregateId::new(), "Eve", "eve@example.com");
        assert!(matches!(result, Err(UserError::AlreadyRegistered)));
    }

    #[test]
    fn register_validates_inputs() {
        let user = User::default();
        let id = AggregateId::new();

        assert!(matches!(
            user.register(id, "  ", "ada@example.com"),
            Err(UserError::EmptyName)
        ));
        assert!(matches!(
            user.register(id, "Ada", "not-an-email"),
            Err(UserError::InvalidEmail { .. })
        ));
        assert!(matches!(
            user.register(id, "Ada", "ada@localhost"),
            Err(UserError::InvalidEmail { .. })
        ));
    }

    #[test]
    fn update_profile_records_old_and_new_name() {
        let mut root = registered_user();
        root.execute(|user| user.update_profile("Ada King")).unwrap();

        assert_eq!(root.state().name(), "Ada King");
        match root.pending_events().last().unwrap() {
            UserEvent::UserProfileUpdated(data) => {
                assert_eq!(data.old_name, "Ada Lovelace");
                assert_eq!(data.new_name, "Ada King");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unchanged_profile_is_a_no_op() {
        let mut root = registered_user();
        root.execute(|user| user.update_profile("Ada Lovelace"))
            .unwrap();
        assert_eq!(root.pending_events().len(), 1); // only the registration
    }

    #[test]
    fn change_email_requires_registration() {
        let user = User::default();
        assert!(matches!(
            user.change_email("new@example.com"),
            Err(UserError::NotRegistered)
        ));
    }

    #[test]
    fn change_email_rejects_malformed_address() {
        let root = registered_user();
        assert!(matches!(
            root.state().change_email("@example.com"),
            Err(UserError::InvalidEmail { .. })
        ));
    }

    #[test]
    fn deactivation_is_terminal() {
        let mut root = registered_user();
        root.execute(|user| user.deactivate(Some("account closure".to_string())))
            .unwrap();

        let user = root.state();
        assert_eq!(user.status(), UserStatus::Deactivated);
        assert!(!user.is_active());

        assert!(matches!(
            user.update_profile("New Name"),
            Err(UserError::Deactivated)
        ));
        assert!(matches!(
            user.change_email("new@example.com"),
            Err(UserError::Deactivated)
        ));
        assert!(matches!(user.deactivate(None), Err(UserError::Deactivated)));
    }

    #[test]
    fn deactivation_event_carries_last_email() {
        let mut root = registered_user();
        root.execute(|user| user.change_email("countess@example.com"))
            .unwrap();
        root.execute(|user| user.deactivate(None)).unwrap();

        match root.pending_events().last().unwrap() {
            UserEvent::UserDeactivated(data) => {
                assert_eq!(data.email, "countess@example.com");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
