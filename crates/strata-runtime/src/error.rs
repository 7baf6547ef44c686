//! Container errors.
//!
//! | Error | Code | Recoverable |
//! |-------|------|-------------|
//! | [`CompositeError::DuplicateName`] | `COMPOSITE_DUPLICATE_NAME` | No |
//! | [`CompositeError::DuplicateComponent`] | `COMPOSITE_DUPLICATE_COMPONENT` | No |
//! | [`CompositeError::UnknownChild`] | `COMPOSITE_UNKNOWN_CHILD` | No |
//! | [`CompositeError::SelfConnection`] | `COMPOSITE_SELF_CONNECTION` | No |
//! | [`CompositeError::NotConnected`] | `COMPOSITE_NOT_CONNECTED` | No |
//! | [`CompositeError::CircuitOpen`] | `COMPOSITE_CIRCUIT_OPEN` | Yes |
//! | [`CompositeError::CyclicContainment`] | `COMPOSITE_CYCLIC_CONTAINMENT` | No |
//! | [`CompositeError::StageFailed`] | `COMPOSITE_STAGE_FAILED` | Yes |
//! | [`CompositeError::Component`] | `COMPOSITE_COMPONENT` | inherits |
//! | [`MachineError::DuplicateName`] | `MACHINE_DUPLICATE_NAME` | No |
//! | [`MachineError::DuplicateComposite`] | `MACHINE_DUPLICATE_COMPOSITE` | No |
//! | [`MachineError::UnknownComposite`] | `MACHINE_UNKNOWN_COMPOSITE` | No |
//! | [`MachineError::SelfConnection`] | `MACHINE_SELF_CONNECTION` | No |
//! | [`MachineError::AlreadyAttached`] | `MACHINE_ALREADY_ATTACHED` | No |
//! | [`MachineError::Faulted`] | `MACHINE_FAULTED` | Yes |
//! | [`MachineError::Composite`] | `MACHINE_COMPOSITE` | inherits |
//! | [`RuntimeError::Identity`] | `RUNTIME_IDENTITY` | No |
//! | [`RuntimeError::Component`] | `RUNTIME_COMPONENT` | inherits |
//!
//! An open circuit closes on its own after the cool-down, so
//! [`CompositeError::CircuitOpen`] is the one structural error worth
//! retrying. Callers usually fall back to another target instead.
//! A faulted machine recovers through
//! [`Machine::reset_from_error`](crate::Machine::reset_from_error).

use strata_component::{ComponentError, IdentityError};
use strata_types::{ErrorCode, IdentityId};
use thiserror::Error;

/// Composite container error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompositeError {
    /// A child is already registered under this name.
    #[error("duplicate child name: {0}")]
    DuplicateName(String),

    /// The same component is already registered under another name.
    #[error("component {id} already registered as '{existing}'")]
    DuplicateComponent { id: IdentityId, existing: String },

    /// No child with this name.
    #[error("unknown child: {0}")]
    UnknownChild(String),

    /// Source and target are the same child.
    #[error("cannot connect '{0}' to itself")]
    SelfConnection(String),

    /// No edge between the two children.
    #[error("'{source_name}' is not connected to '{target}'")]
    NotConnected { source_name: String, target: String },

    /// The breaker on this edge is open.
    #[error("circuit open on '{source_name}' -> '{target}'")]
    CircuitOpen { source_name: String, target: String },

    /// Adding the component would place the composite inside itself.
    #[error("component {0} is or contains this composite")]
    CyclicContainment(IdentityId),

    /// A transformer attached to a child returned an error.
    #[error("stage at '{child}' failed: {reason}")]
    StageFailed { child: String, reason: String },

    /// A child component operation failed.
    #[error(transparent)]
    Component(#[from] ComponentError),
}

impl ErrorCode for CompositeError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateName(_) => "COMPOSITE_DUPLICATE_NAME",
            Self::DuplicateComponent { .. } => "COMPOSITE_DUPLICATE_COMPONENT",
            Self::UnknownChild(_) => "COMPOSITE_UNKNOWN_CHILD",
            Self::SelfConnection(_) => "COMPOSITE_SELF_CONNECTION",
            Self::NotConnected { .. } => "COMPOSITE_NOT_CONNECTED",
            Self::CircuitOpen { .. } => "COMPOSITE_CIRCUIT_OPEN",
            Self::CyclicContainment(_) => "COMPOSITE_CYCLIC_CONTAINMENT",
            Self::StageFailed { .. } => "COMPOSITE_STAGE_FAILED",
            Self::Component(_) => "COMPOSITE_COMPONENT",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::CircuitOpen { .. } | Self::StageFailed { .. } => true,
            Self::Component(e) => e.is_recoverable(),
            Self::DuplicateName(_)
            | Self::DuplicateComponent { .. }
            | Self::UnknownChild(_)
            | Self::SelfConnection(_)
            | Self::NotConnected { .. }
            | Self::CyclicContainment(_) => false,
        }
    }
}

/// Machine orchestrator error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// A composite is already registered under this name.
    #[error("duplicate composite name: {0}")]
    DuplicateName(String),

    /// The same composite is already registered under another name.
    #[error("composite {id} already registered as '{existing}'")]
    DuplicateComposite { id: IdentityId, existing: String },

    /// No composite with this name.
    #[error("unknown composite: {0}")]
    UnknownComposite(String),

    /// Source and target are the same composite.
    #[error("cannot connect composite '{0}' to itself")]
    SelfConnection(String),

    /// The composite already belongs to a machine.
    #[error("composite {0} is already attached to a machine")]
    AlreadyAttached(IdentityId),

    /// The machine is in its error state.
    #[error("machine is faulted: {0}")]
    Faulted(String),

    /// A composite operation failed.
    #[error(transparent)]
    Composite(#[from] CompositeError),
}

impl From<ComponentError> for MachineError {
    fn from(err: ComponentError) -> Self {
        Self::Composite(CompositeError::Component(err))
    }
}

impl ErrorCode for MachineError {
    fn code(&self) -> &'static str {
        match self {
            Self::DuplicateName(_) => "MACHINE_DUPLICATE_NAME",
            Self::DuplicateComposite { .. } => "MACHINE_DUPLICATE_COMPOSITE",
            Self::UnknownComposite(_) => "MACHINE_UNKNOWN_COMPOSITE",
            Self::SelfConnection(_) => "MACHINE_SELF_CONNECTION",
            Self::AlreadyAttached(_) => "MACHINE_ALREADY_ATTACHED",
            Self::Faulted(_) => "MACHINE_FAULTED",
            Self::Composite(_) => "MACHINE_COMPOSITE",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Faulted(_) => true,
            Self::Composite(e) => e.is_recoverable(),
            Self::DuplicateName(_)
            | Self::DuplicateComposite { .. }
            | Self::UnknownComposite(_)
            | Self::SelfConnection(_)
            | Self::AlreadyAttached(_) => false,
        }
    }
}

/// Factory error from [`Runtime`](crate::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The identity could not be created.
    #[error(transparent)]
    Identity(#[from] IdentityError),

    /// The new component could not be initialized.
    #[error(transparent)]
    Component(#[from] ComponentError),
}

impl ErrorCode for RuntimeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Identity(_) => "RUNTIME_IDENTITY",
            Self::Component(_) => "RUNTIME_COMPONENT",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Identity(_) => false,
            Self::Component(e) => e.is_recoverable(),
        }
    }
}
