//! Aggregate and domain event abstractions.

use event_store::{AggregateId, EventEnvelope, Version};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::ReplayError;

/// Trait for typed domain events.
///
/// Domain events are immutable facts, named in past tense. The type name
/// returned by [`DomainEvent::event_type`] is what gets stored in the event
/// log and used to route and deserialize payloads.
pub trait DomainEvent:
    std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + Clone
{
    /// Returns the concrete event's name (e.g. "UserRegistered").
    fn event_type(&self) -> &'static str;
}

/// Pure state projection of an event-sourced aggregate.
///
/// Implementations describe *what the events do to the state* and nothing
/// else: [`Aggregate::apply`] must be deterministic and free of side effects,
/// clocks, and randomness, so that replaying the same history always yields
/// the same state. Version tracking and the uncommitted-events buffer live in
/// [`AggregateRoot`], not here.
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The business-rule errors this aggregate's commands can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate type name used as the storage discriminator.
    fn aggregate_type() -> &'static str;

    /// Applies one event to the state. Infallible: events are facts that
    /// have already happened.
    fn apply(&mut self, event: Self::Event);
}

/// An aggregate instance with its identity, version, and uncommitted events.
///
/// The root owns two ordered zones of events: the committed history (owned by
/// the event store, reflected here only as `version`) and the pending buffer
/// of events produced since the last commit. Pending events are exclusively
/// owned by the in-flight operation; a root is never shared across threads.
/// Each load / mutate / commit cycle uses its own instance.
#[derive(Debug)]
pub struct AggregateRoot<A: Aggregate> {
    id: AggregateId,
    state: A,
    version: Version,
    pending: Vec<A::Event>,
}

impl<A: Aggregate> AggregateRoot<A> {
    /// Creates a brand-new aggregate at version 0 with default state.
    pub fn new(id: AggregateId) -> Self {
        Self {
            id,
            state: A::default(),
            version: Version::initial(),
            pending: Vec::new(),
        }
    }

    /// Reconstructs an aggregate by replaying its persisted history.
    ///
    /// The history must be a contiguous ascending version sequence starting
    /// at 1 and belong entirely to `id`; anything else fails with
    /// [`ReplayError`] and no aggregate is constructed. An empty history
    /// yields a fresh version-0 root.
    pub fn load_from_history(id: AggregateId, history: &[EventEnvelope]) -> Result<Self, ReplayError> {
        let mut root = Self::new(id);
        root.replay(history)?;
        Ok(root)
    }

    /// Replays further history on top of the current version.
    ///
    /// State mutation only: the pending buffer does not grow. Rejected if the
    /// root has uncommitted events, or if the supplied sequence is not
    /// contiguous and ascending starting right after the current version.
    pub fn replay(&mut self, history: &[EventEnvelope]) -> Result<(), ReplayError> {
        if !self.pending.is_empty() {
            return Err(ReplayError::UncommittedChanges);
        }

        for envelope in history {
            if envelope.aggregate_id != self.id {
                return Err(ReplayError::AggregateMismatch {
                    expected: self.id,
                    found: envelope.aggregate_id,
                });
            }

            let expected = self.version.next();
            if envelope.version != expected {
                return Err(ReplayError::BrokenSequence {
                    aggregate_id: self.id,
                    expected,
                    found: envelope.version,
                });
            }

            let event: A::Event =
                envelope
                    .deserialize_payload()
                    .map_err(|source| ReplayError::Payload {
                        event_type: envelope.event_type.clone(),
                        source,
                    })?;

            self.state.apply(event);
            self.version = envelope.version;
        }

        Ok(())
    }

    /// Applies a freshly produced event: mutates the state and buffers the
    /// event as uncommitted. The version advances by exactly one.
    pub fn apply_new(&mut self, event: A::Event) {
        self.state.apply(event.clone());
        self.pending.push(event);
        self.version = self.version.next();
    }

    /// Runs a business operation against the current state.
    ///
    /// On success every produced event is applied via [`Self::apply_new`];
    /// on rejection nothing is applied, so partial application is never
    /// observable.
    pub fn execute<F>(&mut self, command_fn: F) -> Result<(), A::Error>
    where
        F: FnOnce(&A) -> Result<Vec<A::Event>, A::Error>,
    {
        let events = command_fn(&self.state)?;
        for event in events {
            self.apply_new(event);
        }
        Ok(())
    }

    /// Returns the buffered, not-yet-committed events in application order.
    pub fn pending_events(&self) -> &[A::Event] {
        &self.pending
    }

    /// Returns true if there are uncommitted events.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Builds envelopes for the pending events, stamped with the versions
    /// they will occupy in the store (`committed_version + 1` onwards).
    pub fn pending_envelopes(&self) -> Result<Vec<EventEnvelope>, serde_json::Error> {
        let mut version = self.committed_version();
        self.pending
            .iter()
            .map(|event| {
                version = version.next();
                EventEnvelope::from_payload(
                    self.id,
                    A::aggregate_type(),
                    event.event_type(),
                    version,
                    event,
                )
            })
            .collect()
    }

    /// Clears the pending buffer after the caller has confirmed durable
    /// persistence. Idempotent.
    pub fn mark_committed(&mut self) {
        self.pending.clear();
    }

    /// The aggregate's identity.
    pub fn id(&self) -> AggregateId {
        self.id
    }

    /// Version after all applied events, pending included.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Version of the last event known to be durable.
    pub fn committed_version(&self) -> Version {
        Version::new(self.version.as_i64() - self.pending.len() as i64)
    }

    /// True if the aggregate has never been persisted and has no pending
    /// events.
    pub fn is_new(&self) -> bool {
        self.version == Version::initial()
    }

    /// The projected state.
    pub fn state(&self) -> &A {
        &self.state
    }
}
