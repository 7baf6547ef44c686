//! Identifier types for strata.
//!
//! All identifiers are UUID v4 based. They are opaque tokens: nothing
//! about the owning component can be derived from the value itself.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a component identity.
///
/// Every component, composite and machine owns exactly one identity, so
/// this is also the stable address used by lineage lookups and as the
/// `source` of published events.
///
/// # Short Form
///
/// Hierarchical addresses and log lines use the first eight hex digits
/// of the UUID (see [`short`](Self::short)). Short forms are for humans
/// only; they are not guaranteed to be unique.
///
/// # Example
///
/// ```
/// use strata_types::IdentityId;
///
/// let a = IdentityId::new();
/// let b = IdentityId::new();
///
/// assert_ne!(a, b);
/// assert_eq!(a.short().len(), 8);
/// assert!(a.uuid().to_string().starts_with(&a.short()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityId(pub Uuid);

#[allow(clippy::new_without_default)] // Default intentionally not implemented - see below
impl IdentityId {
    /// Creates a new [`IdentityId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns the first eight hex digits of the UUID.
    #[must_use]
    pub fn short(&self) -> String {
        let mut s = self.0.simple().to_string();
        s.truncate(8);
        s
    }
}

// NOTE: IdentityId intentionally does NOT implement Default.
// A defaulted id would not be registered in any LineageTable and every
// lineage lookup on it would fail. Identities are minted by the table.

impl std::fmt::Display for IdentityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "id:{}", self.0)
    }
}

/// Identifier for a published event.
///
/// # Example
///
/// ```
/// use strata_types::EventId;
///
/// let evt_id = EventId::new();
/// assert!(evt_id.to_string().starts_with("evt:"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Creates a new [`EventId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
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
        write!(f, "evt:{}", self.0)
    }
}

// Tests are in lib.rs as integration tests for public API
