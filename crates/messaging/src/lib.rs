//! Messaging layer: forwards committed events to an external bus.
//!
//! Publication is deliberately decoupled from the event store's transactional
//! boundary: an event that reached the store stays durable whether or not its
//! publication is ever observed by consumers. The [`EventPublisher`] only
//! guarantees that a delivery attempt is scheduled; completion is observed
//! asynchronously and logged.
//!
//! The wire transport itself is an external collaborator behind the
//! [`MessageTransport`] trait; [`InMemoryTransport`] stands in for it in
//! tests.

pub mod publisher;
pub mod transport;

pub use publisher::{DeliveryHandle, EventPublisher, PublishError, PublisherConfig};
pub use transport::{
    DeliveryReport, InMemoryTransport, MessageTransport, OutgoingRecord, TransportError,
};
