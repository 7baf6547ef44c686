//! Event and data channels for strata.
//!
//! Components never call each other to share data. They publish an
//! [`Event`] on a named channel and the event waits in an
//! [`EventQueue`] until an observer drains it.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Model Layer                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  strata-types     : IdentityId, EventId, ErrorCode          │
//! │  strata-event     : Event, EventQueue  ◄── HERE             │
//! │  strata-component : Lifecycle, Identity, Component, Leaf    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Flow
//!
//! ```text
//!  Component ──publish_data("sensor", {..})──► pending data queue
//!      │                                              │
//!      └──transition(Active)──► domain event queue    │ drain_events()
//!                                     │               ▼
//!                                     └──────────► observer
//! ```
//!
//! | Kind | Channel | Payload |
//! |------|---------|---------|
//! | [`EventKind::Data`] | caller chosen | caller data |
//! | [`EventKind::StateChanged`] | [`LIFECYCLE_CHANNEL`] | `previous`, `next` |
//!
//! Events are `Serialize`/`Deserialize` so adapters can forward them,
//! but no wire format is defined here.

mod error;
mod event;
mod queue;

pub use error::EventError;
pub use event::{Event, EventKind, Payload, LIFECYCLE_CHANNEL};
pub use queue::EventQueue;
