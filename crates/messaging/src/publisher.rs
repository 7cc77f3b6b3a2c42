use std::sync::Arc;
use std::time::Duration;

use event_store::{EventEnvelope, EventId};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::transport::{DeliveryReport, MessageTransport, OutgoingRecord, TransportError};

/// Errors raised while scheduling a publication.
///
/// Delivery failures are not represented here: they surface asynchronously on
/// the [`DeliveryHandle`] and in the logs, never as a scheduling error.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The envelope could not be serialized for the wire.
    #[error("cannot serialize event for publication: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration for the event publisher.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Topic the events are published to.
    pub topic: String,

    /// Upper bound on a single delivery attempt.
    pub send_timeout: Duration,
}

impl PublisherConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            send_timeout: Duration::from_secs(5),
        }
    }

    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}

/// Handle to one event's asynchronous delivery outcome.
///
/// Callers that only want fire-and-forget semantics can drop the handle; the
/// outcome is logged either way. Tests (and callers that do care) can await
/// [`DeliveryHandle::outcome`].
#[derive(Debug)]
pub struct DeliveryHandle {
    event_id: EventId,
    rx: oneshot::Receiver<Result<DeliveryReport, TransportError>>,
}

impl DeliveryHandle {
    /// The event this handle tracks.
    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    /// Waits for the delivery attempt to complete.
    pub async fn outcome(self) -> Result<DeliveryReport, TransportError> {
        self.rx
            .await
            .unwrap_or_else(|_| Err(TransportError::Unavailable("publisher task dropped".into())))
    }
}

/// Forwards committed events to the external bus, best effort.
///
/// `publish` returns once the delivery attempt is scheduled; it never blocks
/// on the bus. Each event is keyed by its aggregate id so consumers observe
/// per-aggregate ordering, and attempts for a batch are issued in version
/// order. A failed delivery is logged and reported on its handle but does not
/// affect the durability already achieved by the event store, and is not
/// retried here.
pub struct EventPublisher<T: MessageTransport> {
    transport: Arc<T>,
    config: PublisherConfig,
}

impl<T: MessageTransport> EventPublisher<T> {
    /// Creates a publisher over the given transport.
    pub fn new(transport: Arc<T>, config: PublisherConfig) -> Self {
        Self { transport, config }
    }

    /// Returns the topic this publisher targets.
    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// Schedules delivery of one committed event.
    pub fn publish(&self, event: &EventEnvelope) -> Result<DeliveryHandle, PublishError> {
        let record = OutgoingRecord {
            topic: self.config.topic.clone(),
            key: Some(event.aggregate_id.to_string()),
            payload: serde_json::to_value(event)?,
        };

        let (tx, rx) = oneshot::channel();
        let transport = Arc::clone(&self.transport);
        let timeout = self.config.send_timeout;
        let event_id = event.event_id;
        let event_type = event.event_type.clone();
        let aggregate_id = event.aggregate_id;

        tokio::spawn(async move {
            let result = match tokio::time::timeout(timeout, transport.send(record)).await {
                Ok(Ok(report)) => {
                    metrics::counter!("events_published_total").increment(1);
                    tracing::info!(
                        %event_id,
                        %aggregate_id,
                        event_type,
                        topic = %report.topic,
                        partition = report.partition,
                        offset = report.offset,
                        "event published"
                    );
                    Ok(report)
                }
                Ok(Err(e)) => {
                    metrics::counter!("event_publish_failures_total").increment(1);
                    tracing::error!(
                        %event_id,
                        %aggregate_id,
                        event_type,
                        error = %e,
                        "failed to publish event"
                    );
                    Err(e)
                }
                Err(_) => {
                    let e = TransportError::Timeout(timeout);
                    metrics::counter!("event_publish_failures_total").increment(1);
                    tracing::error!(
                        %event_id,
                        %aggregate_id,
                        event_type,
                        error = %e,
                        "failed to publish event"
                    );
                    Err(e)
                }
            };
            // Receiver may have been dropped by a fire-and-forget caller.
            let _ = tx.send(result);
        });

        Ok(DeliveryHandle { event_id, rx })
    }

    /// Schedules delivery of a committed batch, issuing attempts in the order
    /// supplied (version order for events from one append). Completion may
    /// still be observed out of order across events.
    pub fn publish_batch(
        &self,
        events: &[EventEnvelope],
    ) -> Result<Vec<DeliveryHandle>, PublishError> {
        events.iter().map(|event| self.publish(event)).collect()
    }
}
