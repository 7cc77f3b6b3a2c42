//! Domain error types.

use event_store::{AggregateId, EventStoreError, Version};
use thiserror::Error;

use crate::user::UserError;

/// A corrupt or mis-ordered event history was supplied for replay.
///
/// This is fatal for the load in progress: it signals either store corruption
/// or a caller bug, so it is surfaced and never silently repaired by
/// skipping or reordering events.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The history has a gap, a duplicate, or an out-of-order version.
    #[error(
        "broken event sequence for aggregate {aggregate_id}: expected version {expected}, found {found}"
    )]
    BrokenSequence {
        aggregate_id: AggregateId,
        expected: Version,
        found: Version,
    },

    /// The history contains an event belonging to a different aggregate.
    #[error("event for aggregate {found} supplied while replaying aggregate {expected}")]
    AggregateMismatch {
        expected: AggregateId,
        found: AggregateId,
    },

    /// Replay was attempted on a root that already has uncommitted events.
    #[error("cannot replay history into an aggregate with uncommitted events")]
    UncommittedChanges,

    /// An event payload could not be deserialized into its typed event.
    #[error("cannot deserialize payload of {event_type} event")]
    Payload {
        event_type: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error surfaced from the event store, including concurrency
    /// conflicts the caller is expected to resolve by reloading and retrying.
    #[error("event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The aggregate's event history failed integrity checks during replay.
    #[error("replay error: {0}")]
    Replay(#[from] ReplayError),

    /// A business rule of the user aggregate rejected the operation.
    #[error("user error: {0}")]
    User(#[from] UserError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true if the operation failed on the optimistic-concurrency
    /// check and can be retried against freshly loaded state.
    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::EventStore(e) if e.is_concurrency_conflict()
        )
    }
}
