//! Event store for the user service.
//!
//! Provides the append-only event log that backs every event-sourced
//! aggregate: events are persisted per aggregate under an expected-version
//! precondition (optimistic concurrency) and replayed in version order to
//! rebuild aggregate state.
//!
//! Two implementations are provided: [`InMemoryEventStore`] for tests and
//! [`PostgresEventStore`] for production.

pub mod error;
pub mod event;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{EventStoreError, Result};
pub use event::{AggregateId, EventEnvelope, EventId, Version};
pub use memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use store::{EventStore, EventStream};
