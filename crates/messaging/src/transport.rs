use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::RwLock;

/// A record handed to the bus client: topic, optional partition/ordering key,
/// and the serialized event.
#[derive(Debug, Clone)]
pub struct OutgoingRecord {
    pub topic: String,
    pub key: Option<String>,
    pub payload: serde_json::Value,
}

/// Position metadata reported by the bus once a record is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

/// Errors reported by the underlying bus client.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The bus could not be reached.
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// The bus rejected the record.
    #[error("send rejected: {0}")]
    Rejected(String),

    /// The send did not complete within the configured timeout.
    #[error("send timed out after {0:?}")]
    Timeout(Duration),
}

/// Async send-with-acknowledgement seam over the actual bus client.
///
/// Implementations resolve once the bus has accepted (or refused) the record;
/// they do not retry. Ordering across records is whatever the caller imposes
/// by the order of its `send` calls.
#[async_trait]
pub trait MessageTransport: Send + Sync + 'static {
    async fn send(&self, record: OutgoingRecord) -> Result<DeliveryReport, TransportError>;
}

#[derive(Default)]
struct TransportState {
    /// Delivered records per topic; the index is the offset.
    topics: HashMap<String, Vec<OutgoingRecord>>,

    /// Event types whose sends are made to fail.
    failing_event_types: HashSet<String>,
}

/// In-memory transport for tests.
///
/// Records every accepted send per topic and assigns sequential offsets.
/// Individual event types can be made to fail to exercise the
/// failure-isolation behavior of the publisher.
#[derive(Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<RwLock<TransportState>>,
}

impl InMemoryTransport {
    /// Creates a new empty transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every send of the given event type fail with
    /// [`TransportError::Rejected`].
    pub async fn fail_event_type(&self, event_type: impl Into<String>) {
        self.state
            .write()
            .await
            .failing_event_types
            .insert(event_type.into());
    }

    /// Returns the records delivered to a topic, in offset order.
    pub async fn delivered(&self, topic: &str) -> Vec<OutgoingRecord> {
        self.state
            .read()
            .await
            .topics
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns the number of records delivered to a topic.
    pub async fn delivered_count(&self, topic: &str) -> usize {
        self.state
            .read()
            .await
            .topics
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessageTransport for InMemoryTransport {
    async fn send(&self, record: OutgoingRecord) -> Result<DeliveryReport, TransportError> {
        let mut state = self.state.write().await;

        if let Some(event_type) = record.payload.get("event_type").and_then(|v| v.as_str())
            && state.failing_event_types.contains(event_type)
        {
            return Err(TransportError::Rejected(format!(
                "injected failure for {event_type}"
            )));
        }

        let topic = record.topic.clone();
        let log = state.topics.entry(topic.clone()).or_default();
        let offset = log.len() as i64;
        log.push(record);

        Ok(DeliveryReport {
            topic,
            partition: 0,
            offset,
        })
    }
}
