//! Components for strata.
//!
//! This crate defines what a single component is: its [`Identity`] and
//! lineage, its [`LifecycleState`], the [`ComponentCore`] that enforces
//! the transition table, and the [`Component`] trait shared by leaves
//! and containers.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Model Layer                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  strata-types     : IdentityId, EventId, ErrorCode          │
//! │  strata-event     : Event, EventQueue                       │
//! │  strata-component : Lifecycle, Identity, Component  ◄── HERE│
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  strata-runtime   : Composite, Machine, breakers, config    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`lifecycle`] | [`LifecycleState`], [`LifecycleCategory`], edge table |
//! | [`identity`] | [`Identity`], [`LineageTable`] |
//! | [`core`] | [`ComponentCore`], [`ActivityLog`] |
//! | [`component`] | [`Component`] trait, [`Leaf`] |
//! | [`health`] | [`Health`] buckets for aggregation |
//! | [`environment`] | host snapshot helpers |
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use strata_component::{Component, Leaf, LifecycleState, LineageTable};
//!
//! let table = LineageTable::new();
//! let adam = table.create_root("Adam", BTreeMap::new()).unwrap();
//! let id = table.create_child("sensor", BTreeMap::new(), &adam.id()).unwrap();
//!
//! let sensor = Leaf::create(id).unwrap();
//! sensor.activate().unwrap();
//! sensor.publish_single("readings", "celsius", 21.0.into()).unwrap();
//!
//! assert_eq!(sensor.state(), LifecycleState::Active);
//! assert_eq!(sensor.drain_events()[0].channel, "readings");
//!
//! sensor.terminate().unwrap();
//! assert!(table.live_descendants(&adam.id()).unwrap().is_empty());
//! ```

pub mod component;
pub mod core;
pub mod environment;
mod error;
pub mod health;
pub mod identity;
pub mod lifecycle;

pub use crate::core::{ActivityEntry, ActivityLog, ComponentCore};
pub use component::{Component, Leaf};
pub use error::{ComponentError, IdentityError};
pub use health::Health;
pub use identity::{Identity, LineageTable};
pub use lifecycle::{LifecycleCategory, LifecycleState};
