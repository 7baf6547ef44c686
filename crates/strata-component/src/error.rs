//! Component layer errors.
//!
//! Two enums live here: [`IdentityError`] for lineage bookkeeping and
//! [`ComponentError`] for lifecycle and publication failures.
//!
//! # Error Code Convention
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`IdentityError::EmptyReason`] | `IDENTITY_EMPTY_REASON` | No |
//! | [`IdentityError::InvalidParent`] | `IDENTITY_INVALID_PARENT` | No |
//! | [`IdentityError::UnknownIdentity`] | `IDENTITY_UNKNOWN` | No |
//! | [`ComponentError::InvalidStateTransition`] | `COMPONENT_INVALID_STATE_TRANSITION` | No |
//! | [`ComponentError::InvalidOperation`] | `COMPONENT_INVALID_OPERATION` | No |
//! | [`ComponentError::TerminatedComponent`] | `COMPONENT_TERMINATED` | No |
//! | [`ComponentError::PartialActivation`] | `COMPONENT_PARTIAL_ACTIVATION` | Yes |
//! | [`ComponentError::Event`] | `COMPONENT_EVENT` | No |
//!
//! Failed transitions never change state, so they are safe to report
//! and continue. A partial activation leaves the container active with
//! some children behind; activating again may pick them up.
//!
//! # Example
//!
//! ```
//! use strata_component::{ComponentError, LifecycleState};
//! use strata_types::ErrorCode;
//!
//! let err = ComponentError::InvalidStateTransition {
//!     from: LifecycleState::Active,
//!     to: LifecycleState::Conception,
//! };
//! assert_eq!(err.code(), "COMPONENT_INVALID_STATE_TRANSITION");
//! assert_eq!(err.to_string(), "invalid state transition: active -> conception");
//! ```

use crate::LifecycleState;
use serde::{Deserialize, Serialize};
use strata_event::EventError;
use strata_types::{ErrorCode, IdentityId};
use thiserror::Error;

/// Identity and lineage error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum IdentityError {
    /// Reasons must contain at least one non-whitespace character.
    #[error("identity reason must not be empty")]
    EmptyReason,

    /// The parent id is not registered in the lineage table.
    #[error("invalid parent: {0}")]
    InvalidParent(IdentityId),

    /// The id is not registered in the lineage table.
    #[error("unknown identity: {0}")]
    UnknownIdentity(IdentityId),
}

impl ErrorCode for IdentityError {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyReason => "IDENTITY_EMPTY_REASON",
            Self::InvalidParent(_) => "IDENTITY_INVALID_PARENT",
            Self::UnknownIdentity(_) => "IDENTITY_UNKNOWN",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Component layer error.
///
/// # Variants
///
/// | Variant | When | Recovery |
/// |---------|------|----------|
/// | `InvalidStateTransition` | Edge not in the transition table | Pick a legal target |
/// | `InvalidOperation` | Lifecycle operation from the wrong state | Check `state()` first |
/// | `TerminatedComponent` | Publishing after termination | None |
/// | `PartialActivation` | Some children of a container failed | Inspect `failed`, retry |
/// | `Event` | Event could not be built | Fix the channel name |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum ComponentError {
    /// The requested edge is not allowed.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    /// A lifecycle operation was called from a state it does not accept.
    #[error("cannot {operation} while {state}")]
    InvalidOperation {
        operation: String,
        state: LifecycleState,
    },

    /// The component has been terminated.
    #[error("component terminated: {0}")]
    TerminatedComponent(IdentityId),

    /// A container changed state but some children did not follow.
    ///
    /// Each entry is `"<child name>: <error>"`.
    #[error("partial activation, {} child(ren) failed: {}", failed.len(), failed.join("; "))]
    PartialActivation { failed: Vec<String> },

    /// Event construction failed.
    #[error(transparent)]
    Event(#[from] EventError),
}

impl ComponentError {
    /// Builds an [`InvalidOperation`](Self::InvalidOperation) error.
    #[must_use]
    pub fn invalid_operation(operation: &str, state: LifecycleState) -> Self {
        Self::InvalidOperation {
            operation: operation.to_string(),
            state,
        }
    }
}

impl ErrorCode for ComponentError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidStateTransition { .. } => "COMPONENT_INVALID_STATE_TRANSITION",
            Self::InvalidOperation { .. } => "COMPONENT_INVALID_OPERATION",
            Self::TerminatedComponent(_) => "COMPONENT_TERMINATED",
            Self::PartialActivation { .. } => "COMPONENT_PARTIAL_ACTIVATION",
            Self::Event(_) => "COMPONENT_EVENT",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::PartialActivation { .. } => true,
            Self::InvalidStateTransition { .. }
            | Self::InvalidOperation { .. }
            | Self::TerminatedComponent(_)
            | Self::Event(_) => false,
        }
    }
}
