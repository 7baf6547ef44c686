//! Component core: identity, state, activity log and event queues.
//!
//! [`ComponentCore`] is the state every component carries, whether it
//! is a [`Leaf`](crate::Leaf) or a container. All operations take
//! `&self`; mutable parts sit behind their own locks so a core can be
//! shared as `Arc<dyn Component>` across threads.
//!
//! # Locking
//!
//! | Lock | Guards | Held across |
//! |------|--------|-------------|
//! | `state` | current [`LifecycleState`] | validate, apply, log, enqueue |
//! | activity log | entries | one append or snapshot |
//! | queues | pending events | one push or drain |
//!
//! The state lock is always taken first. Holding it across
//! validate-and-apply serializes transitions per component, so two
//! threads can never both validate against the same stale state.

use crate::{ComponentError, Identity, LifecycleState};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use strata_event::{Event, EventQueue, Payload};
use strata_types::{EventId, IdentityId};
use tracing::{debug, warn};

/// One line of an activity log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

impl std::fmt::Display for ActivityEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.timestamp.to_rfc3339(), self.message)
    }
}

/// Append-only, timestamped log.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: RwLock<Vec<ActivityEntry>>,
}

impl ActivityLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, message: impl Into<String>) {
        self.entries.write().push(ActivityEntry {
            timestamp: Utc::now(),
            message: message.into(),
        });
    }

    /// Returns a copy of all entries, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<ActivityEntry> {
        self.entries.read().clone()
    }

    /// Returns only the messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.entries.read().iter().map(|e| e.message.clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Identity, lifecycle state and outbound events of one component.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use strata_component::{ComponentCore, LifecycleState, LineageTable};
///
/// let table = LineageTable::new();
/// let core = ComponentCore::new(table.create_root("pump", BTreeMap::new()).unwrap());
/// assert_eq!(core.state(), LifecycleState::Conception);
///
/// core.initialize().unwrap();
/// core.activate().unwrap();
/// core.publish_single("flow", "litres", 12).unwrap();
///
/// let data = core.drain_events();
/// assert_eq!(data.len(), 1);
/// assert_eq!(core.drain_domain_events().len(), 6);
/// ```
#[derive(Debug)]
pub struct ComponentCore {
    identity: Arc<Identity>,
    state: Mutex<LifecycleState>,
    activity: ActivityLog,
    data_events: EventQueue,
    domain_events: EventQueue,
}

impl ComponentCore {
    /// Creates a core in [`LifecycleState::Conception`].
    #[must_use]
    pub fn new(identity: Arc<Identity>) -> Self {
        Self {
            identity,
            state: Mutex::new(LifecycleState::Conception),
            activity: ActivityLog::new(),
            data_events: EventQueue::new(),
            domain_events: EventQueue::new(),
        }
    }

    #[must_use]
    pub fn identity(&self) -> &Arc<Identity> {
        &self.identity
    }

    #[must_use]
    pub fn id(&self) -> IdentityId {
        self.identity.id()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.state().is_terminated()
    }

    /// Moves to `target` if the edge is allowed.
    ///
    /// A rejected attempt is still written to the activity log.
    ///
    /// # Errors
    ///
    /// [`ComponentError::InvalidStateTransition`] if the edge is not in
    /// the transition table. The state is left unchanged.
    pub fn transition(&self, target: LifecycleState) -> Result<(), ComponentError> {
        let mut state = self.state.lock();
        self.apply(&mut state, target)
    }

    /// Walks the creation category from `Conception` to `Ready`.
    ///
    /// # Errors
    ///
    /// [`ComponentError::InvalidOperation`] unless the core is in `Conception`.
    pub fn initialize(&self) -> Result<(), ComponentError> {
        let mut state = self.state.lock();
        if *state != LifecycleState::Conception {
            return Err(self.refuse(&state, "initialize"));
        }
        for next in LifecycleState::CREATION_PATH {
            self.apply(&mut state, next)?;
        }
        Ok(())
    }

    /// Moves from `Ready` or `Waiting` to `Active`.
    ///
    /// # Errors
    ///
    /// [`ComponentError::InvalidOperation`] from any other state.
    pub fn activate(&self) -> Result<(), ComponentError> {
        let mut state = self.state.lock();
        if !state.can_activate() {
            return Err(self.refuse(&state, "activate"));
        }
        self.apply(&mut state, LifecycleState::Active)
    }

    /// Moves from `Active` or `Running` back to `Ready`.
    ///
    /// # Errors
    ///
    /// [`ComponentError::InvalidOperation`] from any other state.
    pub fn deactivate(&self) -> Result<(), ComponentError> {
        let mut state = self.state.lock();
        if !state.can_deactivate() {
            return Err(self.refuse(&state, "deactivate"));
        }
        self.apply(&mut state, LifecycleState::Ready)
    }

    /// Moves from `Active` or `Running` to `Waiting`.
    ///
    /// A suspended core comes back with [`activate`](Self::activate).
    ///
    /// # Errors
    ///
    /// [`ComponentError::InvalidOperation`] from any other state.
    pub fn suspend(&self) -> Result<(), ComponentError> {
        let mut state = self.state.lock();
        if !state.can_deactivate() {
            return Err(self.refuse(&state, "suspend"));
        }
        self.apply(&mut state, LifecycleState::Waiting)
    }

    /// Terminates the component.
    ///
    /// Goes through `Terminating` to `Terminated`, appends an archival
    /// note to the lineage and marks the identity as no longer alive.
    /// Calling it again is a no-op.
    pub fn terminate(&self) -> Result<(), ComponentError> {
        let mut state = self.state.lock();
        if state.is_terminated() {
            return Ok(());
        }
        let from = *state;
        if from != LifecycleState::Terminating {
            self.apply(&mut state, LifecycleState::Terminating)?;
        }
        self.apply(&mut state, LifecycleState::Terminated)?;

        self.identity.record_lineage(format!(
            "archived: terminated from {from} at {}",
            Utc::now().to_rfc3339()
        ));
        self.identity.mark_terminated();
        Ok(())
    }

    /// Queues a data event carrying `data` on `channel`.
    ///
    /// # Errors
    ///
    /// - [`ComponentError::TerminatedComponent`] after termination
    /// - [`ComponentError::Event`] if `channel` is blank
    pub fn publish_data(
        &self,
        channel: impl Into<String>,
        data: Payload,
    ) -> Result<EventId, ComponentError> {
        let state = self.state.lock();
        if state.is_termination() {
            return Err(ComponentError::TerminatedComponent(self.id()));
        }
        let event = Event::data(self.id(), channel, data)?;
        let id = event.id;
        self.data_events.push(event);
        Ok(id)
    }

    /// [`publish_data`](Self::publish_data) with a single key.
    ///
    /// # Errors
    ///
    /// Same as [`publish_data`](Self::publish_data).
    pub fn publish_single(
        &self,
        channel: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<EventId, ComponentError> {
        let mut data = Payload::new();
        data.insert(key.into(), value.into());
        self.publish_data(channel, data)
    }

    /// Takes all pending data events, oldest first.
    #[must_use]
    pub fn drain_events(&self) -> Vec<Event> {
        self.data_events.drain()
    }

    /// Takes all raised state change events, oldest first.
    #[must_use]
    pub fn drain_domain_events(&self) -> Vec<Event> {
        self.domain_events.drain()
    }

    /// Number of data events waiting to be drained.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.data_events.len()
    }

    /// Appends to the identity's lineage.
    pub fn add_to_lineage(&self, entry: impl Into<String>) {
        self.identity.record_lineage(entry);
    }

    #[must_use]
    pub fn lineage(&self) -> Vec<String> {
        self.identity.lineage()
    }

    /// Appends a free-form note to the activity log.
    ///
    /// Allowed in every state, including after termination.
    pub fn log_activity(&self, message: impl Into<String>) {
        self.activity.record(message);
    }

    /// Returns a copy of the activity log, oldest first.
    #[must_use]
    pub fn activity_log(&self) -> Vec<ActivityEntry> {
        self.activity.snapshot()
    }

    fn apply(
        &self,
        state: &mut LifecycleState,
        target: LifecycleState,
    ) -> Result<(), ComponentError> {
        let from = *state;
        if !from.can_transition_to(target) {
            self.activity.record(format!("rejected {from} -> {target}"));
            warn!(id = %self.id(), %from, to = %target, "transition rejected");
            return Err(ComponentError::InvalidStateTransition { from, to: target });
        }

        *state = target;
        self.activity.record(format!("{from} -> {target}"));
        self.domain_events.push(Event::state_changed(
            self.id(),
            &from.to_string(),
            &target.to_string(),
        ));
        debug!(id = %self.id(), %from, to = %target, "transition");
        Ok(())
    }

    fn refuse(&self, state: &LifecycleState, operation: &str) -> ComponentError {
        self.activity.record(format!("rejected {operation} while {state}"));
        warn!(id = %self.id(), %state, operation, "operation rejected");
        ComponentError::invalid_operation(operation, *state)
    }
}
