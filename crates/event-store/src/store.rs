use std::pin::Pin;

use async_trait::async_trait;
use futures_core::Stream;

use crate::{AggregateId, EventEnvelope, EventStoreError, Result, Version};

/// A stream of events in global append order.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope>> + Send>>;

/// Contract for durable event storage.
///
/// The store is the single serialization point for concurrent writers:
/// appends for the same aggregate are ordered by an expected-version check
/// rather than a lock held across the business operation. Implementations
/// must be thread-safe and must make the check-then-write atomic.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a batch of events for one aggregate.
    ///
    /// All-or-nothing: either every event in the batch is persisted or none
    /// is. The append succeeds only if the aggregate's highest persisted
    /// version equals `expected_version` (use [`Version::initial`] for a new
    /// aggregate); otherwise it fails with
    /// [`EventStoreError::ConcurrencyConflict`] and the store is unchanged.
    ///
    /// Returns the aggregate's version after the append.
    async fn append(
        &self,
        events: Vec<EventEnvelope>,
        expected_version: Version,
    ) -> Result<Version>;

    /// Returns the full history of an aggregate in ascending version order.
    ///
    /// An aggregate with no events yields an empty vec, not an error.
    async fn get_events(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>>;

    /// Returns an aggregate's history truncated to versions >= `from_version`.
    async fn get_events_from(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>>;

    /// Returns all events of a given type, in global append order.
    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>>;

    /// Streams every event in the store in global append order.
    ///
    /// Administrative/bulk retrieval; ordering across aggregates follows the
    /// order appends committed, not per-aggregate version order.
    async fn stream_all_events(&self) -> Result<EventStream>;

    /// Returns the highest persisted version for an aggregate, or None if the
    /// aggregate has no events.
    async fn current_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>>;
}

/// Validates a batch before it reaches storage.
///
/// Rejects empty batches, batches spanning more than one aggregate, and
/// version sequences that are not contiguous starting at
/// `expected_version + 1`.
pub(crate) fn validate_batch(events: &[EventEnvelope], expected_version: Version) -> Result<()> {
    let first = events
        .first()
        .ok_or_else(|| EventStoreError::InvalidBatch("empty event batch".to_string()))?;

    for event in &events[1..] {
        if event.aggregate_id != first.aggregate_id {
            return Err(EventStoreError::InvalidBatch(
                "batch spans multiple aggregates".to_string(),
            ));
        }
        if event.aggregate_type != first.aggregate_type {
            return Err(EventStoreError::InvalidBatch(
                "batch mixes aggregate types".to_string(),
            ));
        }
    }

    let mut next = expected_version;
    for event in events {
        next = next.next();
        if event.version != next {
            return Err(EventStoreError::InvalidBatch(format!(
                "non-contiguous versions: expected {}, got {}",
                next, event.version
            )));
        }
    }

    Ok(())
}
