//! Identity and lineage.
//!
//! Every component is born with an [`Identity`]: a random id, the reason
//! it was created, the moment of conception and a snapshot of the
//! environment it was conceived in. Identities are minted by a
//! [`LineageTable`], which also records who descends from whom.
//!
//! # Lineage by Index
//!
//! Identities never point at each other. A child stores its parent's
//! [`IdentityId`] and the table keeps the reverse index:
//!
//! ```text
//! LineageTable
//! ├── identities : id → Arc<Identity>
//! └── children   : id → [child id, ...]   (insertion order)
//!
//!   Adam ──────────┬──► Child-1 ──► Grandchild
//!   (parent: None) └──► Child-2
//! ```
//!
//! A parent is fixed at creation and must already be registered, so
//! every walk toward the root terminates.
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeMap;
//! use strata_component::LineageTable;
//!
//! let table = LineageTable::new();
//! let adam = table.create_root("Adam", BTreeMap::new()).unwrap();
//! let child = table.create_child("Child", BTreeMap::new(), &adam.id()).unwrap();
//!
//! assert_eq!(child.lineage(), vec!["Adam", "Child"]);
//! assert!(table.is_descendant_of(&child.id(), &adam.id()));
//!
//! let address = table.hierarchical_address(&child.id()).unwrap();
//! assert!(address.starts_with("Adam<"));
//! assert!(address.contains(".Child<"));
//! ```

use crate::IdentityError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use strata_types::IdentityId;

/// Immutable birth record of a component, plus its growing lineage.
#[derive(Debug)]
pub struct Identity {
    id: IdentityId,
    reason: String,
    conception_time: DateTime<Utc>,
    parent: Option<IdentityId>,
    environment: BTreeMap<String, String>,
    lineage: RwLock<Vec<String>>,
    alive: AtomicBool,
}

impl Identity {
    fn new(
        reason: String,
        environment: BTreeMap<String, String>,
        parent: Option<IdentityId>,
        mut lineage: Vec<String>,
    ) -> Self {
        lineage.push(reason.clone());
        Self {
            id: IdentityId::new(),
            reason,
            conception_time: Utc::now(),
            parent,
            environment,
            lineage: RwLock::new(lineage),
            alive: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn id(&self) -> IdentityId {
        self.id
    }

    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    #[must_use]
    pub fn conception_time(&self) -> DateTime<Utc> {
        self.conception_time
    }

    /// Returns the parent id, `None` for a root ("Adam") identity.
    #[must_use]
    pub fn parent(&self) -> Option<IdentityId> {
        self.parent
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    #[must_use]
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// Returns a snapshot of the lineage, oldest entry first.
    #[must_use]
    pub fn lineage(&self) -> Vec<String> {
        self.lineage.read().clone()
    }

    /// Appends an entry to the lineage.
    pub fn record_lineage(&self, entry: impl Into<String>) {
        self.lineage.write().push(entry.into());
    }

    /// Returns `false` once the owning component has terminated.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub(crate) fn mark_terminated(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<{}>", self.reason, self.id.short())
    }
}

#[derive(Debug, Default)]
struct LineageIndex {
    identities: HashMap<IdentityId, Arc<Identity>>,
    children: HashMap<IdentityId, Vec<IdentityId>>,
}

/// Registry of identities and their parent/child relations.
///
/// Owned by the caller (usually a `Runtime`); there is no global table.
/// Entries are never removed, so descendant lists may name identities
/// whose components have terminated. Use
/// [`live_descendants`](Self::live_descendants) to filter them.
#[derive(Debug, Default)]
pub struct LineageTable {
    index: RwLock<LineageIndex>,
}

impl LineageTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a root ("Adam") identity.
    ///
    /// # Errors
    ///
    /// [`IdentityError::EmptyReason`] if `reason` is blank.
    pub fn create_root(
        &self,
        reason: impl Into<String>,
        environment: BTreeMap<String, String>,
    ) -> Result<Arc<Identity>, IdentityError> {
        let reason = validate_reason(reason.into())?;
        let identity = Arc::new(Identity::new(reason, environment, None, Vec::new()));

        self.index
            .write()
            .identities
            .insert(identity.id(), Arc::clone(&identity));
        tracing::debug!(id = %identity.id(), reason = identity.reason(), "root identity created");
        Ok(identity)
    }

    /// Mints a child of `parent`.
    ///
    /// The child's lineage starts with a copy of the parent's lineage.
    ///
    /// # Errors
    ///
    /// - [`IdentityError::EmptyReason`] if `reason` is blank
    /// - [`IdentityError::InvalidParent`] if `parent` is not registered here
    pub fn create_child(
        &self,
        reason: impl Into<String>,
        environment: BTreeMap<String, String>,
        parent: &IdentityId,
    ) -> Result<Arc<Identity>, IdentityError> {
        let reason = validate_reason(reason.into())?;

        let mut index = self.index.write();
        let parent_identity = index
            .identities
            .get(parent)
            .ok_or(IdentityError::InvalidParent(*parent))?;

        let identity = Arc::new(Identity::new(
            reason,
            environment,
            Some(*parent),
            parent_identity.lineage(),
        ));
        index
            .identities
            .insert(identity.id(), Arc::clone(&identity));
        index.children.entry(*parent).or_default().push(identity.id());

        tracing::debug!(
            id = %identity.id(),
            parent = %parent,
            reason = identity.reason(),
            "child identity created"
        );
        Ok(identity)
    }

    #[must_use]
    pub fn get(&self, id: &IdentityId) -> Option<Arc<Identity>> {
        self.index.read().identities.get(id).cloned()
    }

    #[must_use]
    pub fn contains(&self, id: &IdentityId) -> bool {
        self.index.read().identities.contains_key(id)
    }

    #[must_use]
    pub fn parent_of(&self, id: &IdentityId) -> Option<IdentityId> {
        self.index.read().identities.get(id).and_then(|i| i.parent())
    }

    /// Returns the ancestors of `id`, nearest first.
    ///
    /// # Errors
    ///
    /// [`IdentityError::UnknownIdentity`] if `id` is not registered.
    pub fn ancestors(&self, id: &IdentityId) -> Result<Vec<IdentityId>, IdentityError> {
        let index = self.index.read();
        let mut current = index
            .identities
            .get(id)
            .ok_or(IdentityError::UnknownIdentity(*id))?
            .parent();

        let mut out = Vec::new();
        while let Some(parent) = current {
            out.push(parent);
            current = index.identities.get(&parent).and_then(|i| i.parent());
        }
        Ok(out)
    }

    /// Returns the direct children of `id` in creation order.
    ///
    /// # Errors
    ///
    /// [`IdentityError::UnknownIdentity`] if `id` is not registered.
    pub fn descendants(&self, id: &IdentityId) -> Result<Vec<IdentityId>, IdentityError> {
        let index = self.index.read();
        if !index.identities.contains_key(id) {
            return Err(IdentityError::UnknownIdentity(*id));
        }
        Ok(index.children.get(id).cloned().unwrap_or_default())
    }

    /// Like [`descendants`](Self::descendants), skipping terminated ones.
    ///
    /// # Errors
    ///
    /// [`IdentityError::UnknownIdentity`] if `id` is not registered.
    pub fn live_descendants(&self, id: &IdentityId) -> Result<Vec<IdentityId>, IdentityError> {
        let children = self.descendants(id)?;
        let index = self.index.read();
        Ok(children
            .into_iter()
            .filter(|c| index.identities.get(c).is_some_and(|i| i.is_alive()))
            .collect())
    }

    /// Returns `true` if `ancestor` appears anywhere above `id`.
    ///
    /// Unknown ids are descendants of nothing.
    #[must_use]
    pub fn is_descendant_of(&self, id: &IdentityId, ancestor: &IdentityId) -> bool {
        self.ancestors(id)
            .map(|chain| chain.contains(ancestor))
            .unwrap_or(false)
    }

    /// Returns the other children of `id`'s parent, in creation order.
    ///
    /// Root identities have no siblings.
    ///
    /// # Errors
    ///
    /// [`IdentityError::UnknownIdentity`] if `id` is not registered.
    pub fn siblings(&self, id: &IdentityId) -> Result<Vec<IdentityId>, IdentityError> {
        let index = self.index.read();
        let identity = index
            .identities
            .get(id)
            .ok_or(IdentityError::UnknownIdentity(*id))?;

        let Some(parent) = identity.parent() else {
            return Ok(Vec::new());
        };
        Ok(index
            .children
            .get(&parent)
            .map(|c| c.iter().copied().filter(|c| c != id).collect())
            .unwrap_or_default())
    }

    /// Builds a dotted path from the root down to `id`.
    ///
    /// Each segment is `reason<short-id>`, e.g.
    /// `Adam<1f2e3d4c>.Child<9a8b7c6d>`.
    ///
    /// # Errors
    ///
    /// [`IdentityError::UnknownIdentity`] if `id` is not registered.
    pub fn hierarchical_address(&self, id: &IdentityId) -> Result<String, IdentityError> {
        let index = self.index.read();
        let mut segments = Vec::new();
        let mut current = Some(*id);

        while let Some(cur) = current {
            let identity = index
                .identities
                .get(&cur)
                .ok_or(IdentityError::UnknownIdentity(cur))?;
            segments.push(identity.to_string());
            current = identity.parent();
        }

        segments.reverse();
        Ok(segments.join("."))
    }

    /// Number of registered identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.read().identities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.read().identities.is_empty()
    }
}

fn validate_reason(reason: String) -> Result<String, IdentityError> {
    if reason.trim().is_empty() {
        return Err(IdentityError::EmptyReason);
    }
    Ok(reason)
}
