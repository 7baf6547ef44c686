//! The component contract.
//!
//! Leaves and containers are both [`Component`]s, so a container can
//! hold another container and never needs to know which one it has.
//!
//! # Trait Shape
//!
//! ```text
//! Component (Send + Sync + Debug)
//!   ├── core()          required: the ComponentCore backing this node
//!   ├── id / identity / state / lineage         read through the core
//!   ├── transition / activate / deactivate / terminate
//!   ├── publish_data / drain_events / drain_domain_events
//!   ├── health()        default: Health::from(state)
//!   └── contains_descendant()  default: false
//!
//! Implementations:
//!   ├── Leaf            this crate, core only
//!   └── Composite       strata-runtime, cascading lifecycle and aggregate health
//! ```
//!
//! Every method takes `&self`. State lives behind the core's locks, so
//! components are shared as `Arc<dyn Component>`.

use crate::{ActivityEntry, ComponentCore, ComponentError, Health, Identity, LifecycleState};
use serde_json::Value;
use std::sync::Arc;
use strata_event::{Event, Payload};
use strata_types::{EventId, IdentityId};

/// A node in the component hierarchy.
///
/// Only [`core`](Self::core) is required. Containers override the
/// lifecycle operations to cascade into their children and
/// [`health`](Self::health) to report their aggregate label.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
/// use strata_component::{Component, Health, Leaf, LineageTable};
///
/// let table = LineageTable::new();
/// let leaf: Arc<dyn Component> =
///     Arc::new(Leaf::create(table.create_root("valve", BTreeMap::new()).unwrap()).unwrap());
///
/// assert_eq!(leaf.health(), Health::Standby);
/// leaf.activate().unwrap();
/// assert_eq!(leaf.health(), Health::Active);
/// ```
pub trait Component: Send + Sync + std::fmt::Debug {
    /// Returns the core backing this component.
    fn core(&self) -> &ComponentCore;

    fn id(&self) -> IdentityId {
        self.core().id()
    }

    fn identity(&self) -> &Arc<Identity> {
        self.core().identity()
    }

    fn state(&self) -> LifecycleState {
        self.core().state()
    }

    /// See [`ComponentCore::transition`].
    fn transition(&self, target: LifecycleState) -> Result<(), ComponentError> {
        self.core().transition(target)
    }

    /// See [`ComponentCore::activate`].
    fn activate(&self) -> Result<(), ComponentError> {
        self.core().activate()
    }

    /// See [`ComponentCore::deactivate`].
    fn deactivate(&self) -> Result<(), ComponentError> {
        self.core().deactivate()
    }

    /// See [`ComponentCore::terminate`].
    fn terminate(&self) -> Result<(), ComponentError> {
        self.core().terminate()
    }

    /// See [`ComponentCore::publish_data`].
    fn publish_data(&self, channel: &str, data: Payload) -> Result<EventId, ComponentError> {
        self.core().publish_data(channel, data)
    }

    /// See [`ComponentCore::publish_single`].
    fn publish_single(
        &self,
        channel: &str,
        key: &str,
        value: Value,
    ) -> Result<EventId, ComponentError> {
        self.core().publish_single(channel, key, value)
    }

    fn drain_events(&self) -> Vec<Event> {
        self.core().drain_events()
    }

    fn drain_domain_events(&self) -> Vec<Event> {
        self.core().drain_domain_events()
    }

    fn lineage(&self) -> Vec<String> {
        self.core().lineage()
    }

    fn activity_log(&self) -> Vec<ActivityEntry> {
        self.core().activity_log()
    }

    /// Health bucket used by container aggregation.
    fn health(&self) -> Health {
        Health::from(self.state())
    }

    /// True if `id` sits anywhere below this component.
    ///
    /// Leaves hold nothing. Containers search their whole subtree.
    fn contains_descendant(&self, id: &IdentityId) -> bool {
        let _ = id;
        false
    }
}

/// A component with no children.
#[derive(Debug)]
pub struct Leaf {
    core: ComponentCore,
}

impl Leaf {
    /// Creates a leaf in [`LifecycleState::Conception`].
    #[must_use]
    pub fn new(identity: Arc<Identity>) -> Self {
        Self {
            core: ComponentCore::new(identity),
        }
    }

    /// Creates a leaf and walks it to [`LifecycleState::Ready`].
    ///
    /// # Errors
    ///
    /// Propagates [`ComponentCore::initialize`] failures.
    pub fn create(identity: Arc<Identity>) -> Result<Self, ComponentError> {
        let leaf = Self::new(identity);
        leaf.core.initialize()?;
        Ok(leaf)
    }

    /// See [`ComponentCore::initialize`].
    ///
    /// # Errors
    ///
    /// [`ComponentError::InvalidOperation`] unless the leaf is in `Conception`.
    pub fn initialize(&self) -> Result<(), ComponentError> {
        self.core.initialize()
    }
}

impl Component for Leaf {
    fn core(&self) -> &ComponentCore {
        &self.core
    }
}
