use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventEnvelope, EventStoreError, Result, Version,
    store::{EventStore, EventStream, validate_batch},
};

#[derive(Default)]
struct Inner {
    /// Per-aggregate histories, each kept in version order.
    streams: HashMap<AggregateId, Vec<EventEnvelope>>,

    /// Global log in append order.
    log: Vec<EventEnvelope>,
}

/// In-memory event store.
///
/// Backs unit tests and examples with the same semantics as the PostgreSQL
/// implementation: the write lock makes the version check and the append a
/// single atomic step, so racing writers observe exactly one winner.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryEventStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.inner.read().await.log.len()
    }

    /// Drops all stored events.
    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.streams.clear();
        inner.log.clear();
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(
        &self,
        events: Vec<EventEnvelope>,
        expected_version: Version,
    ) -> Result<Version> {
        validate_batch(&events, expected_version)?;
        let aggregate_id = events[0].aggregate_id;

        let mut inner = self.inner.write().await;

        let actual = inner
            .streams
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map(|event| event.version)
            .unwrap_or(Version::initial());

        if actual != expected_version {
            return Err(EventStoreError::ConcurrencyConflict {
                aggregate_id,
                expected: expected_version,
                actual,
            });
        }

        let last_version = events.last().map(|e| e.version).unwrap_or(actual);
        inner
            .streams
            .entry(aggregate_id)
            .or_default()
            .extend(events.iter().cloned());
        inner.log.extend(events);

        Ok(last_version)
    }

    async fn get_events(&self, aggregate_id: AggregateId) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        Ok(inner.streams.get(&aggregate_id).cloned().unwrap_or_default())
    }

    async fn get_events_from(
        &self,
        aggregate_id: AggregateId,
        from_version: Version,
    ) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        Ok(inner
            .streams
            .get(&aggregate_id)
            .map(|stream| {
                stream
                    .iter()
                    .filter(|e| e.version >= from_version)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_events_by_type(&self, event_type: &str) -> Result<Vec<EventEnvelope>> {
        let inner = self.inner.read().await;
        Ok(inner
            .log
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect())
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::stream;

        let inner = self.inner.read().await;
        let events = inner.log.clone();
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    async fn current_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let inner = self.inner.read().await;
        Ok(inner
            .streams
            .get(&aggregate_id)
            .and_then(|stream| stream.last())
            .map(|event| event.version))
    }
}
