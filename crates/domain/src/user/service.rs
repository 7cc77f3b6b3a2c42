//! User application service: the load / mutate / commit / publish cycle.

use event_store::{AggregateId, EventEnvelope, EventStore};
use messaging::{EventPublisher, MessageTransport};

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;

use super::{ChangeEmail, DeactivateUser, RegisterUser, UpdateProfile, User};

/// How often a conflicted update is recomputed before giving up.
const CONFLICT_RETRIES: u32 = 3;

/// Service for managing user accounts.
///
/// Each operation replays the user from the event store, runs the business
/// rule, commits the produced events under optimistic concurrency, and then
/// hands the committed envelopes to the publisher. Publication is best
/// effort: a delivery failure is logged by the publisher and never undoes
/// the commit.
pub struct UserService<S: EventStore, T: MessageTransport> {
    handler: CommandHandler<S, User>,
    publisher: EventPublisher<T>,
}

impl<S: EventStore, T: MessageTransport> UserService<S, T> {
    /// Creates a user service over an event store and a publisher.
    pub fn new(store: S, publisher: EventPublisher<T>) -> Self {
        Self {
            handler: CommandHandler::new(store),
            publisher,
        }
    }

    /// Returns the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<S, User> {
        &self.handler
    }

    /// Registers a new user.
    ///
    /// Not retried on conflict: a conflict on a fresh ID means someone else
    /// already registered it, which is a real error, not a race to resolve.
    #[tracing::instrument(skip(self))]
    pub async fn register_user(
        &self,
        cmd: RegisterUser,
    ) -> Result<CommandResult<User>, DomainError> {
        let result = self
            .handler
            .execute(cmd.user_id, |user| {
                user.register(cmd.user_id, &cmd.name, &cmd.email)
            })
            .await?;

        tracing::info!(user_id = %cmd.user_id, "user registered");
        self.publish(&result.envelopes);
        Ok(result)
    }

    /// Changes a user's display name.
    #[tracing::instrument(skip(self))]
    pub async fn update_profile(
        &self,
        cmd: UpdateProfile,
    ) -> Result<CommandResult<User>, DomainError> {
        let result = self
            .handler
            .execute_with_retry(cmd.user_id, CONFLICT_RETRIES, |user| {
                user.update_profile(&cmd.name)
            })
            .await?;

        self.publish(&result.envelopes);
        Ok(result)
    }

    /// Changes a user's email address.
    #[tracing::instrument(skip(self))]
    pub async fn change_email(
        &self,
        cmd: ChangeEmail,
    ) -> Result<CommandResult<User>, DomainError> {
        let result = self
            .handler
            .execute_with_retry(cmd.user_id, CONFLICT_RETRIES, |user| {
                user.change_email(&cmd.email)
            })
            .await?;

        self.publish(&result.envelopes);
        Ok(result)
    }

    /// Deactivates a user account.
    #[tracing::instrument(skip(self))]
    pub async fn deactivate_user(
        &self,
        cmd: DeactivateUser,
    ) -> Result<CommandResult<User>, DomainError> {
        let result = self
            .handler
            .execute_with_retry(cmd.user_id, CONFLICT_RETRIES, |user| {
                user.deactivate(cmd.reason.clone())
            })
            .await?;

        tracing::info!(user_id = %cmd.user_id, "user deactivated");
        self.publish(&result.envelopes);
        Ok(result)
    }

    /// Loads a user by ID; None if the user was never registered.
    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, user_id: AggregateId) -> Result<Option<User>, DomainError> {
        let root = self.handler.load_existing(user_id).await?;
        Ok(root.map(|root| root.state().clone()))
    }

    fn publish(&self, envelopes: &[EventEnvelope]) {
        match self.publisher.publish_batch(envelopes) {
            // Outcomes are logged by the publisher; nothing to wait for here.
            Ok(handles) => drop(handles),
            Err(e) => {
                tracing::warn!(error = %e, "could not schedule event publication");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::UserStatus;
    use event_store::InMemoryEventStore;
    use messaging::{InMemoryTransport, PublisherConfig};
    use std::sync::Arc;

    fn service() -> (UserService<InMemoryEventStore, InMemoryTransport>, Arc<InMemoryTransport>)
    {
        let transport = Arc::new(InMemoryTransport::new());
        let publisher = EventPublisher::new(
            Arc::clone(&transport),
            PublisherConfig::new("user-events"),
        );
        (
            UserService::new(InMemoryEventStore::new(), publisher),
            transport,
        )
    }

    #[tokio::test]
    async fn register_and_get_user() {
        let (service, _transport) = service();

        let cmd = RegisterUser::new("Ada Lovelace", "ada@example.com");
        let user_id = cmd.user_id;
        let result = service.register_user(cmd).await.unwrap();
        assert_eq!(result.events.len(), 1);

        let user = service.get_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.name(), "Ada Lovelace");
        assert_eq!(user.email(), "ada@example.com");
    }

    #[tokio::test]
    async fn get_unknown_user_is_none() {
        let (service, _transport) = service();
        assert!(service.get_user(AggregateId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn full_lifecycle() {
        let (service, _transport) = service();

        let cmd = RegisterUser::new("Ada Lovelace", "ada@example.com");
        let user_id = cmd.user_id;
        service.register_user(cmd).await.unwrap();

        service
            .update_profile(UpdateProfile::new(user_id, "Ada King"))
            .await
            .unwrap();
        service
            .change_email(ChangeEmail::new(user_id, "countess@example.com"))
            .await
            .unwrap();
        let result = service
            .deactivate_user(DeactivateUser::new(user_id, Some("closed".to_string())))
            .await
            .unwrap();

        assert_eq!(result.new_version.as_i64(), 4);
        let user = service.get_user(user_id).await.unwrap().unwrap();
        assert_eq!(user.status(), UserStatus::Deactivated);
        assert_eq!(user.name(), "Ada King");
        assert_eq!(user.email(), "countess@example.com");
    }

    #[tokio::test]
    async fn committed_events_are_published() {
        let (service, transport) = service();

        let cmd = RegisterUser::new("Ada", "ada@example.com");
        let user_id = cmd.user_id;
        service.register_user(cmd).await.unwrap();
        service
            .update_profile(UpdateProfile::new(user_id, "Ada King"))
            .await
            .unwrap();

        // Publication is asynchronous; give the spawned tasks a beat.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let delivered = transport.delivered("user-events").await;
        assert_eq!(delivered.len(), 2);
        assert_eq!(delivered[0].payload["event_type"], "UserRegistered");
        assert_eq!(delivered[1].payload["event_type"], "UserProfileUpdated");
        assert_eq!(
            delivered[0].key.as_deref(),
            Some(user_id.to_string().as_str())
        );
    }

    #[tokio::test]
    async fn rejected_command_publishes_nothing() {
        let (service, transport) = service();

        let result = service
            .update_profile(UpdateProfile::new(AggregateId::new(), "Nobody"))
            .await;
        assert!(result.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(transport.delivered_count("user-events").await, 0);
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_the_commit() {
        let (service, transport) = service();
        transport.fail_event_type("UserRegistered").await;

        let cmd = RegisterUser::new("Ada", "ada@example.com");
        let user_id = cmd.user_id;
        let result = service.register_user(cmd).await;

        // Commit succeeded even though delivery was refused.
        assert!(result.is_ok());
        let user = service.get_user(user_id).await.unwrap();
        assert!(user.is_some());

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(transport.delivered_count("user-events").await, 0);
    }
}
