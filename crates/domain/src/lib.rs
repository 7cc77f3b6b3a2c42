//! Domain layer for the user service.
//!
//! Provides the event-sourcing abstractions shared by every aggregate:
//! - [`DomainEvent`] and [`Aggregate`] traits for typed events and pure state
//!   projection
//! - [`AggregateRoot`], which buffers uncommitted events and guards replay
//!   integrity
//! - [`CommandHandler`] for the load / execute / commit cycle against an
//!   [`event_store::EventStore`]
//! - the [`user`] module with the concrete `User` aggregate and its service

pub mod aggregate;
pub mod command;
pub mod error;
pub mod user;

pub use aggregate::{Aggregate, AggregateRoot, DomainEvent};
pub use command::{CommandHandler, CommandResult};
pub use error::{DomainError, ReplayError};
pub use user::{
    ChangeEmail, DeactivateUser, RegisterUser, UpdateProfile, User, UserError, UserEvent,
    UserService, UserStatus,
};
