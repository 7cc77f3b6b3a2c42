//! Command handling: the load / execute / commit cycle.

use std::marker::PhantomData;

use event_store::{AggregateId, EventEnvelope, EventStore, Version};

use crate::aggregate::{Aggregate, AggregateRoot};
use crate::error::DomainError;

/// Result of a successfully committed command.
#[derive(Debug)]
pub struct CommandResult<A: Aggregate> {
    /// The aggregate root after the commit, pending buffer cleared.
    pub root: AggregateRoot<A>,

    /// The typed events the command produced, in order.
    pub events: Vec<A::Event>,

    /// The committed envelopes, ready for publication.
    pub envelopes: Vec<EventEnvelope>,

    /// The aggregate's version after the commit.
    pub new_version: Version,
}

/// Executes business operations against event-sourced aggregates.
///
/// For each command the handler replays the aggregate from the store, runs
/// the caller-supplied business function against the projected state, and
/// appends the produced events under the version it loaded. A concurrent
/// writer that got there first surfaces as a
/// [`event_store::EventStoreError::ConcurrencyConflict`]; the handler never
/// hides it, but [`CommandHandler::execute_with_retry`] offers the standard
/// reload-recompute-retry loop.
pub struct CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    store: S,
    _phantom: PhantomData<A>,
}

impl<S, A> CommandHandler<S, A>
where
    S: EventStore,
    A: Aggregate,
{
    /// Creates a command handler over the given event store.
    pub fn new(store: S) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    /// Returns a reference to the underlying event store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an aggregate by replaying its history.
    ///
    /// An aggregate with no events loads as a fresh version-0 root.
    pub async fn load(&self, aggregate_id: AggregateId) -> Result<AggregateRoot<A>, DomainError> {
        let history = self.store.get_events(aggregate_id).await?;
        Ok(AggregateRoot::load_from_history(aggregate_id, &history)?)
    }

    /// Loads an aggregate, returning None if it has no persisted events.
    pub async fn load_existing(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Option<AggregateRoot<A>>, DomainError> {
        let root = self.load(aggregate_id).await?;
        if root.is_new() { Ok(None) } else { Ok(Some(root)) }
    }

    /// Executes a business operation and commits the events it produces.
    ///
    /// The business function receives the current projected state and returns
    /// either events to apply or a business-rule rejection; rejections commit
    /// nothing. Events are appended atomically under the loaded version, so
    /// a racing writer loses with a concurrency conflict and the store stays
    /// unchanged for the loser.
    pub async fn execute<F>(
        &self,
        aggregate_id: AggregateId,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut root = self.load(aggregate_id).await?;
        let expected_version = root.version();

        root.execute(command_fn).map_err(DomainError::from)?;

        if !root.has_pending() {
            return Ok(CommandResult {
                root,
                events: vec![],
                envelopes: vec![],
                new_version: expected_version,
            });
        }

        let envelopes = root.pending_envelopes()?;
        let new_version = self
            .store
            .append(envelopes.clone(), expected_version)
            .await?;

        metrics::counter!("commands_committed_total").increment(1);

        let events = root.pending_events().to_vec();
        root.mark_committed();

        Ok(CommandResult {
            root,
            events,
            envelopes,
            new_version,
        })
    }

    /// Executes a command, reloading and retrying on concurrency conflicts.
    ///
    /// The business function is re-run against freshly loaded state on every
    /// attempt, since a retried operation must be recomputed, not replayed.
    /// Gives up after `max_attempts` and returns the last conflict.
    pub async fn execute_with_retry<F>(
        &self,
        aggregate_id: AggregateId,
        max_attempts: u32,
        command_fn: F,
    ) -> Result<CommandResult<A>, DomainError>
    where
        F: Fn(&A) -> Result<Vec<A::Event>, A::Error>,
        DomainError: From<A::Error>,
    {
        let mut attempt = 1;
        loop {
            match self.execute(aggregate_id, &command_fn).await {
                Err(e) if e.is_concurrency_conflict() && attempt < max_attempts => {
                    metrics::counter!("concurrency_conflicts_total").increment(1);
                    tracing::warn!(
                        %aggregate_id,
                        attempt,
                        "concurrency conflict, reloading and retrying"
                    );
                    attempt += 1;
                }
                other => return other,
            }
        }
    }
}
