use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an aggregate instance.
///
/// Wraps a UUID so aggregate identities cannot be confused with other
/// UUID-based identifiers at the type level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(Uuid);

impl AggregateId {
    /// Creates a new random aggregate ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an aggregate ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for AggregateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for AggregateId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl From<Uuid> for AggregateId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Unique identifier for a single event, generated at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an event ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Aggregate sequence number used for optimistic concurrency control.
///
/// Version 0 means "never persisted". The first event of an aggregate carries
/// version 1 and every later event carries exactly the previous version plus
/// one, so the history of an aggregate is a gap-free strictly increasing
/// sequence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    /// Creates a version from a raw value.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// The version of an aggregate that has never been persisted (0).
    pub fn initial() -> Self {
        Self(0)
    }

    /// The version carried by the first event of an aggregate (1).
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the next version in the sequence.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Version {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

/// A domain event as stored and shipped: metadata plus a JSON payload.
///
/// Envelopes are immutable facts. `event_id` and `occurred_at` are assigned
/// when the envelope is constructed and never change; the payload carries the
/// event-type-specific fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Globally unique identifier for this event.
    pub event_id: EventId,

    /// The aggregate this event belongs to.
    pub aggregate_id: AggregateId,

    /// Discriminator for the owning aggregate kind (e.g. "User").
    pub aggregate_type: String,

    /// Concrete event name (e.g. "UserRegistered"), used for deserialization
    /// and routing.
    pub event_type: String,

    /// The aggregate's version after this event is applied.
    pub version: Version,

    /// When the event was created.
    pub occurred_at: DateTime<Utc>,

    /// Event-type-specific fields as JSON.
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Creates an envelope for a freshly produced event, assigning it a new
    /// event ID and the current timestamp.
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        version: Version,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            event_type: event_type.into(),
            version,
            occurred_at: Utc::now(),
            payload,
        }
    }

    /// Creates an envelope from a serializable payload.
    pub fn from_payload<T: Serialize>(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        event_type: impl Into<String>,
        version: Version,
        payload: &T,
    ) -> std::result::Result<Self, serde_json::Error> {
        Ok(Self::new(
            aggregate_id,
            aggregate_type,
            event_type,
            version,
            serde_json::to_value(payload)?,
        ))
    }

    /// Deserializes the payload into a concrete event type.
    pub fn deserialize_payload<T: for<'de> Deserialize<'de>>(
        &self,
    ) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}
