//! Foundational types for strata.
//!
//! strata is a hierarchical component runtime: leaf components are
//! grouped into composites, composites are wired into machines, and
//! every node carries an identity with a recorded lineage.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Model Layer                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  strata-types     : IdentityId, EventId, ErrorCode  ◄── HERE │
//! │  strata-event     : Event, EventQueue                       │
//! │  strata-component : Lifecycle, Identity, Component, Leaf    │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Runtime Layer                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  strata-runtime   : Composite, Machine, breakers, config    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate has no knowledge of components. It only defines the
//! identifiers shared by every layer and the [`ErrorCode`] contract
//! that every error enum implements.
//!
//! # Example
//!
//! ```
//! use strata_types::{EventId, IdentityId};
//!
//! let id = IdentityId::new();
//! assert!(id.to_string().starts_with("id:"));
//!
//! let evt = EventId::new();
//! assert!(evt.to_string().starts_with("evt:"));
//! ```

mod error;
mod id;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{EventId, IdentityId};
