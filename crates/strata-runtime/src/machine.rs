//! Machine orchestrator.
//!
//! A [`Machine`] is the top-level assembly. It holds named
//! [`Composite`]s, the connections between them and an inbox that
//! attached composites write critical notices to.
//!
//! # Lifecycle
//!
//! ```text
//! create ──► Ready ──start_machine──► Active ──stop_machine──► Ready
//!                                     │    ▲
//!                                pause│    │resume
//!                                     ▼    │
//!                                     Waiting
//!
//! terminate_machine: any state ──► Terminated
//! ```
//!
//! Starting activates every composite in standby, which cascades into
//! each composite's children. A composite that fails to start is kept in
//! the machine, logged and remembered as a start failure; the others
//! are not rolled back. Pausing deactivates the active composites and
//! resuming activates them again.
//!
//! # Error State
//!
//! [`Machine::set_error_state`] records a fault next to the lifecycle.
//! A faulted machine reports [`MachineState::Impaired`] and refuses
//! `start_machine`, `resume`, `pause` and `set_version` with
//! [`MachineError::Faulted`] until [`Machine::reset_from_error`]
//! clears the fault and stops it.
//!
//! # Aggregate State
//!
//! | Assessment | [`MachineState`] |
//! |------------|------------------|
//! | Nominal | Operational |
//! | Reduced | Partial |
//! | Transitional | Reorganizing |
//! | Critical | Impaired |
//!
//! Any recorded start failure turns a non-critical result into
//! `Partial`.

use crate::aggregate::{Assessment, Thresholds};
use crate::composite::Composite;
use crate::config::MachineConfig;
use crate::error::MachineError;
use crate::graph::ConnectionGraph;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use strata_component::{
    ActivityEntry, Component, ComponentCore, ComponentError, Identity, LifecycleState,
};
use strata_event::{Event, EventQueue};
use strata_types::IdentityId;
use tracing::{debug, info, warn};

/// Aggregate label of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineState {
    /// Enough composites are active.
    Operational,
    /// Running short of active composites, or a composite failed to start.
    Partial,
    /// Composites are still settling, or there are none.
    Reorganizing,
    /// Failed composites reached the critical threshold.
    Impaired,
}

impl From<Assessment> for MachineState {
    fn from(assessment: Assessment) -> Self {
        match assessment {
            Assessment::Nominal => Self::Operational,
            Assessment::Reduced => Self::Partial,
            Assessment::Transitional => Self::Reorganizing,
            Assessment::Critical => Self::Impaired,
        }
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operational => write!(f, "operational"),
            Self::Partial => write!(f, "partial"),
            Self::Reorganizing => write!(f, "reorganizing"),
            Self::Impaired => write!(f, "impaired"),
        }
    }
}

/// Version a machine starts with.
pub const DEFAULT_VERSION: &str = "1.0.0";

/// Outcome of [`Machine::start_machine`] and [`Machine::resume`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StartReport {
    /// Composites that were activated.
    pub activated: Vec<String>,
    /// Composites that failed, with the error message.
    pub failed: Vec<(String, String)>,
    /// Composites that were not in standby and were left alone.
    pub skipped: Vec<String>,
}

impl StartReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of [`Machine::stop_machine`] and [`Machine::pause`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StopReport {
    /// Composites that were deactivated.
    pub deactivated: Vec<String>,
    /// Composites that failed, with the error message.
    pub failed: Vec<(String, String)>,
}

/// Top-level assembly of composites.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
/// use strata_component::{Leaf, LineageTable};
/// use strata_runtime::composite::Composite;
/// use strata_runtime::config::{CompositeConfig, MachineConfig};
/// use strata_runtime::machine::{Machine, MachineState};
///
/// let table = LineageTable::new();
/// let plant = table.create_root("plant", BTreeMap::new()).unwrap();
/// let machine = Machine::create(plant.clone(), &MachineConfig::default()).unwrap();
///
/// let line_id = table.create_child("line", BTreeMap::new(), &plant.id()).unwrap();
/// let line = Arc::new(Composite::create(line_id.clone(), &CompositeConfig::default()).unwrap());
/// let cell = table.create_child("cell", BTreeMap::new(), &line_id.id()).unwrap();
/// line.add("cell", Arc::new(Leaf::create(cell).unwrap())).unwrap();
///
/// machine.add_composite("line", line).unwrap();
/// let report = machine.start_machine().unwrap();
///
/// assert_eq!(report.activated, vec!["line".to_string()]);
/// assert_eq!(machine.evaluate_aggregate_state(), MachineState::Operational);
/// ```
#[derive(Debug)]
pub struct Machine {
    core: ComponentCore,
    thresholds: Thresholds,
    composites: RwLock<BTreeMap<String, Arc<Composite>>>,
    graph: RwLock<ConnectionGraph>,
    start_failures: RwLock<BTreeSet<String>>,
    inbox: EventQueue,
    version: RwLock<String>,
    fault: RwLock<Option<String>>,
}

impl Machine {
    /// Creates a machine and walks it to `Ready`.
    ///
    /// # Errors
    ///
    /// Propagates [`ComponentCore::initialize`] failures.
    pub fn create(
        identity: Arc<Identity>,
        config: &MachineConfig,
    ) -> Result<Self, ComponentError> {
        let machine = Self {
            core: ComponentCore::new(identity),
            thresholds: config.thresholds(),
            composites: RwLock::new(BTreeMap::new()),
            graph: RwLock::new(ConnectionGraph::new()),
            start_failures: RwLock::new(BTreeSet::new()),
            inbox: EventQueue::new(),
            version: RwLock::new(DEFAULT_VERSION.to_string()),
            fault: RwLock::new(None),
        };
        machine.core.initialize()?;
        Ok(machine)
    }

    #[must_use]
    pub fn id(&self) -> IdentityId {
        self.core.id()
    }

    #[must_use]
    pub fn identity(&self) -> &Arc<Identity> {
        self.core.identity()
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.core.state()
    }

    #[must_use]
    pub fn version(&self) -> String {
        self.version.read().clone()
    }

    /// Replaces the version string.
    ///
    /// # Errors
    ///
    /// - [`ComponentError::TerminatedComponent`] after termination
    /// - [`MachineError::Faulted`] while in the error state
    pub fn set_version(&self, version: impl Into<String>) -> Result<(), MachineError> {
        self.ensure_usable()?;
        let version = version.into();
        info!(machine = %self.id(), %version, "version updated");
        self.core.log_activity(format!("version updated to {version}"));
        *self.version.write() = version;
        Ok(())
    }

    // === Composites ===

    /// Registers `composite` under `name` and attaches it to the inbox.
    ///
    /// # Errors
    ///
    /// - [`MachineError::DuplicateName`] if `name` is taken
    /// - [`MachineError::DuplicateComposite`] if the composite is already
    ///   registered under another name
    /// - [`MachineError::AlreadyAttached`] if another machine holds it
    pub fn add_composite(
        &self,
        name: impl Into<String>,
        composite: Arc<Composite>,
    ) -> Result<bool, MachineError> {
        let name = name.into();
        let mut composites = self.composites.write();

        if composites.contains_key(&name) {
            return Err(MachineError::DuplicateName(name));
        }
        let id = composite.id();
        if let Some((existing, _)) = composites.iter().find(|(_, c)| c.id() == id) {
            return Err(MachineError::DuplicateComposite {
                id,
                existing: existing.clone(),
            });
        }

        if !composite.attach_inbox(self.inbox.clone()) {
            warn!(machine = %self.id(), composite = %name, "composite held by another machine");
            return Err(MachineError::AlreadyAttached(id));
        }
        debug!(machine = %self.id(), composite = %name, "composite added");
        self.core.log_activity(format!("added composite {name}"));
        composites.insert(name, composite);
        Ok(true)
    }

    /// Detaches a composite with its connections and start failure.
    ///
    /// The composite keeps running.
    pub fn remove_composite(&self, name: &str) -> Option<Arc<Composite>> {
        let mut composites = self.composites.write();
        let removed = composites.remove(name)?;

        self.graph.write().remove_node(name);
        self.start_failures.write().remove(name);
        removed.detach_inbox(&self.inbox);

        debug!(machine = %self.id(), composite = %name, "composite removed");
        self.core.log_activity(format!("removed composite {name}"));
        Some(removed)
    }

    #[must_use]
    pub fn composite(&self, name: &str) -> Option<Arc<Composite>> {
        self.composites.read().get(name).cloned()
    }

    /// Composite names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.composites.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.composites.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.composites.read().is_empty()
    }

    /// Connects two composites. Returns `Ok(false)` if already connected.
    ///
    /// # Errors
    ///
    /// - [`MachineError::UnknownComposite`] if either name is absent
    /// - [`MachineError::SelfConnection`] if `source == target`
    pub fn connect_composites(&self, source: &str, target: &str) -> Result<bool, MachineError> {
        let composites = self.composites.read();
        for name in [source, target] {
            if !composites.contains_key(name) {
                return Err(MachineError::UnknownComposite(name.to_string()));
            }
        }
        if source == target {
            return Err(MachineError::SelfConnection(source.to_string()));
        }

        let added = self.graph.write().connect(source, target);
        if added {
            debug!(machine = %self.id(), %source, %target, "composites connected");
            self.core
                .log_activity(format!("connected {source} -> {target}"));
        }
        Ok(added)
    }

    pub fn disconnect_composites(&self, source: &str, target: &str) -> bool {
        let removed = self.graph.write().disconnect(source, target);
        if removed {
            debug!(machine = %self.id(), %source, %target, "composites disconnected");
            self.core
                .log_activity(format!("disconnected {source} -> {target}"));
        }
        removed
    }

    #[must_use]
    pub fn connections(&self) -> Vec<(String, String)> {
        self.graph.read().edges()
    }

    // === Aggregate ===

    /// Derives the machine's label from its composites' health.
    ///
    /// Each composite evaluates its own label on the way, so a composite
    /// crossing into critical drops its notice in the inbox. A faulted
    /// machine is always impaired.
    pub fn evaluate_aggregate_state(&self) -> MachineState {
        let composites: Vec<Arc<Composite>> =
            self.composites.read().values().cloned().collect();
        let state = MachineState::from(crate::aggregate::assess(
            &composites,
            |c| c.health(),
            &self.thresholds,
        ));

        if self.is_faulted() {
            return MachineState::Impaired;
        }
        if state != MachineState::Impaired && !self.start_failures.read().is_empty() {
            return MachineState::Partial;
        }
        state
    }

    /// Names of composites that failed during the last start.
    #[must_use]
    pub fn start_failures(&self) -> Vec<String> {
        self.start_failures.read().iter().cloned().collect()
    }

    // === Lifecycle ===

    /// Activates every composite in standby.
    ///
    /// # Errors
    ///
    /// Fails only if the machine itself cannot be started: after
    /// [`terminate_machine`](Self::terminate_machine) or while faulted.
    /// Composite failures are collected in the report.
    pub fn start_machine(&self) -> Result<StartReport, MachineError> {
        self.ensure_usable()?;
        if self.core.state().can_activate() {
            self.core.activate()?;
        }

        let report = self.activate_composites();
        info!(
            machine = %self.id(),
            activated = report.activated.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "machine started"
        );
        self.core.log_activity(format!(
            "started: {} activated, {} failed",
            report.activated.len(),
            report.failed.len()
        ));
        Ok(report)
    }

    /// Deactivates every active composite and clears start failures.
    ///
    /// Also brings a paused machine back to `Ready`.
    ///
    /// # Errors
    ///
    /// Fails only if the machine has been terminated.
    pub fn stop_machine(&self) -> Result<StopReport, MachineError> {
        if self.core.is_terminated() {
            return Err(ComponentError::TerminatedComponent(self.id()).into());
        }

        let report = self.deactivate_composites("stop");
        self.start_failures.write().clear();

        match self.core.state() {
            LifecycleState::Waiting => self.core.transition(LifecycleState::Ready)?,
            state if state.can_deactivate() => self.core.deactivate()?,
            _ => {}
        }
        info!(machine = %self.id(), deactivated = report.deactivated.len(), "machine stopped");
        Ok(report)
    }

    /// Suspends a running machine.
    ///
    /// Active composites are deactivated and the machine moves to
    /// `Waiting`.
    ///
    /// # Errors
    ///
    /// - [`ComponentError::InvalidOperation`] unless the machine is active
    /// - [`MachineError::Faulted`] while in the error state
    pub fn pause(&self) -> Result<StopReport, MachineError> {
        self.ensure_usable()?;
        self.core.suspend()?;

        let report = self.deactivate_composites("pause");
        info!(machine = %self.id(), suspended = report.deactivated.len(), "machine paused");
        self.core.log_activity(format!(
            "paused: {} suspended",
            report.deactivated.len()
        ));
        Ok(report)
    }

    /// Resumes a paused machine, activating every composite in standby.
    ///
    /// # Errors
    ///
    /// - [`ComponentError::InvalidOperation`] unless the machine is paused
    /// - [`MachineError::Faulted`] while in the error state
    pub fn resume(&self) -> Result<StartReport, MachineError> {
        self.ensure_usable()?;
        let state = self.core.state();
        if state != LifecycleState::Waiting {
            self.core.log_activity(format!("rejected resume while {state}"));
            warn!(machine = %self.id(), %state, "resume rejected");
            return Err(ComponentError::invalid_operation("resume", state).into());
        }
        self.core.activate()?;

        let report = self.activate_composites();
        info!(
            machine = %self.id(),
            activated = report.activated.len(),
            failed = report.failed.len(),
            "machine resumed"
        );
        self.core.log_activity(format!(
            "resumed: {} activated, {} failed",
            report.activated.len(),
            report.failed.len()
        ));
        Ok(report)
    }

    /// Puts the machine in its error state.
    ///
    /// Returns `false`, changing nothing, if the machine is already
    /// faulted or has been terminated.
    pub fn set_error_state(&self, reason: impl Into<String>) -> bool {
        if self.core.is_terminated() {
            return false;
        }
        let mut fault = self.fault.write();
        if fault.is_some() {
            return false;
        }
        let reason = reason.into();
        warn!(machine = %self.id(), %reason, "machine faulted");
        self.core.log_activity(format!("faulted: {reason}"));
        *fault = Some(reason);
        true
    }

    /// Clears the error state and stops the machine.
    ///
    /// Returns `Ok(false)` if the machine was not faulted.
    ///
    /// # Errors
    ///
    /// Propagates [`stop_machine`](Self::stop_machine) failures. The
    /// fault stays recorded in that case.
    pub fn reset_from_error(&self) -> Result<bool, MachineError> {
        if !self.is_faulted() {
            return Ok(false);
        }
        self.stop_machine()?;
        if let Some(reason) = self.fault.write().take() {
            info!(machine = %self.id(), %reason, "fault cleared");
            self.core.log_activity(format!("fault cleared: {reason}"));
        }
        Ok(true)
    }

    #[must_use]
    pub fn is_faulted(&self) -> bool {
        self.fault.read().is_some()
    }

    /// Reason given to [`set_error_state`](Self::set_error_state), if faulted.
    #[must_use]
    pub fn fault(&self) -> Option<String> {
        self.fault.read().clone()
    }

    fn ensure_usable(&self) -> Result<(), MachineError> {
        if self.core.is_terminated() {
            return Err(ComponentError::TerminatedComponent(self.id()).into());
        }
        match self.fault.read().as_ref() {
            Some(reason) => Err(MachineError::Faulted(reason.clone())),
            None => Ok(()),
        }
    }

    fn activate_composites(&self) -> StartReport {
        let mut report = StartReport::default();
        for (name, composite) in self.snapshot() {
            if !composite.state().can_activate() {
                report.skipped.push(name);
                continue;
            }
            match composite.activate() {
                Ok(()) => {
                    self.start_failures.write().remove(&name);
                    report.activated.push(name);
                }
                Err(e) => {
                    warn!(
                        machine = %self.id(),
                        composite = %name,
                        error = %e,
                        "composite failed to start"
                    );
                    self.core
                        .log_activity(format!("failed to activate composite {name}: {e}"));
                    self.start_failures.write().insert(name.clone());
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        report
    }

    fn deactivate_composites(&self, operation: &str) -> StopReport {
        let mut report = StopReport::default();
        for (name, composite) in self.snapshot() {
            if !composite.state().can_deactivate() {
                continue;
            }
            match composite.deactivate() {
                Ok(()) => {
                    debug!(
                        machine = %self.id(),
                        composite = %name,
                        operation,
                        "composite deactivated"
                    );
                    report.deactivated.push(name);
                }
                Err(e) => {
                    warn!(
                        machine = %self.id(),
                        composite = %name,
                        operation,
                        error = %e,
                        "composite failed to deactivate"
                    );
                    self.core
                        .log_activity(format!("failed to deactivate composite {name}: {e}"));
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        report
    }

    /// Terminates every composite, then the machine. Idempotent.
    ///
    /// # Errors
    ///
    /// [`ComponentError::PartialActivation`] listing composites whose
    /// termination reported a failure. The machine is terminated anyway.
    pub fn terminate_machine(&self) -> Result<(), MachineError> {
        if self.core.is_terminated() {
            return Ok(());
        }

        let mut failed = Vec::new();
        for (name, composite) in self.snapshot() {
            if let Err(e) = composite.terminate() {
                warn!(
                    machine = %self.id(),
                    composite = %name,
                    error = %e,
                    "composite failed to terminate"
                );
                failed.push(format!("{name}: {e}"));
            }
        }
        self.core.terminate()?;
        info!(machine = %self.id(), "machine terminated");

        if failed.is_empty() {
            Ok(())
        } else {
            Err(ComponentError::PartialActivation { failed }.into())
        }
    }

    // === Inbox and logs ===

    /// Takes every notice sent by the composites, oldest first.
    #[must_use]
    pub fn drain_events(&self) -> Vec<Event> {
        self.inbox.drain()
    }

    /// Number of notices waiting in the inbox.
    #[must_use]
    pub fn pending_events(&self) -> usize {
        self.inbox.len()
    }

    #[must_use]
    pub fn activity_log(&self) -> Vec<ActivityEntry> {
        self.core.activity_log()
    }

    fn snapshot(&self) -> Vec<(String, Arc<Composite>)> {
        self.composites
            .read()
            .iter()
            .map(|(name, c)| (name.clone(), Arc::clone(c)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::CRITICAL_CHANNEL;
    use crate::config::CompositeConfig;
    use strata_component::{Leaf, LineageTable};
    use strata_types::ErrorCode;

    /// Sits in standby but refuses every activation.
    #[derive(Debug)]
    struct Faulty {
        core: ComponentCore,
    }

    impl Faulty {
        fn create(identity: Arc<Identity>) -> Self {
            let core = ComponentCore::new(identity);
            core.initialize().unwrap();
            Self { core }
        }
    }

    impl Component for Faulty {
        fn core(&self) -> &ComponentCore {
            &self.core
        }

        fn activate(&self) -> Result<(), ComponentError> {
            Err(ComponentError::invalid_operation("activate", self.state()))
        }
    }

    struct Fixture {
        table: LineageTable,
        machine: Machine,
    }

    impl Fixture {
        fn new() -> Self {
            let table = LineageTable::new();
            let root = table.create_root("plant", BTreeMap::new()).unwrap();
            let machine = Machine::create(root, &MachineConfig::default()).unwrap();
            Self { table, machine }
        }

        /// Adds a composite holding `leaves` fresh leaves.
        fn composite(&self, name: &str, leaves: usize) -> Arc<Composite> {
            let id = self
                .table
                .create_child(name, BTreeMap::new(), &self.machine.id())
                .unwrap();
            let composite = Arc::new(
                Composite::create(
                    id.clone(),
                    &CompositeConfig {
                        critical_error_threshold: 1,
                        ..Default::default()
                    },
                )
                .unwrap(),
            );
            for i in 0..leaves {
                let child = format!("{name}-{i}");
                let leaf_id = self
                    .table
                    .create_child(&child, BTreeMap::new(), &id.id())
                    .unwrap();
                composite
                    .add(child, Arc::new(Leaf::create(leaf_id).unwrap()))
                    .unwrap();
            }
            self.machine.add_composite(name, composite.clone()).unwrap();
            composite
        }
    }

    #[test]
    fn empty_machine_is_reorganizing() {
        let fx = Fixture::new();
        assert_eq!(fx.machine.state(), LifecycleState::Ready);
        assert_eq!(fx.machine.evaluate_aggregate_state(), MachineState::Reorganizing);
    }

    #[test]
    fn duplicate_names_and_composites() {
        let fx = Fixture::new();
        let a = fx.composite("a", 1);

        assert_eq!(
            fx.machine.add_composite("a", a.clone()).unwrap_err(),
            MachineError::DuplicateName("a".into())
        );
        assert!(matches!(
            fx.machine.add_composite("b", a).unwrap_err(),
            MachineError::DuplicateComposite { .. }
        ));
        assert_eq!(fx.machine.names(), vec!["a".to_string()]);
    }

    #[test]
    fn connect_validates_names() {
        let fx = Fixture::new();
        fx.composite("a", 1);
        fx.composite("b", 1);

        assert_eq!(
            fx.machine.connect_composites("a", "x"),
            Err(MachineError::UnknownComposite("x".into()))
        );
        assert_eq!(
            fx.machine.connect_composites("a", "a"),
            Err(MachineError::SelfConnection("a".into()))
        );
        assert_eq!(fx.machine.connect_composites("a", "b"), Ok(true));
        assert_eq!(fx.machine.connect_composites("a", "b"), Ok(false));
        assert!(fx.machine.disconnect_composites("a", "b"));
        assert!(fx.machine.connections().is_empty());
    }

    #[test]
    fn start_and_stop() {
        let fx = Fixture::new();
        let a = fx.composite("a", 2);
        fx.composite("b", 1);

        let report = fx.machine.start_machine().unwrap();
        assert_eq!(report.activated, vec!["a".to_string(), "b".to_string()]);
        assert!(report.is_clean());
        assert_eq!(fx.machine.state(), LifecycleState::Active);
        assert_eq!(fx.machine.evaluate_aggregate_state(), MachineState::Operational);

        // A second start leaves running composites alone.
        let again = fx.machine.start_machine().unwrap();
        assert_eq!(again.skipped.len(), 2);

        let stop = fx.machine.stop_machine().unwrap();
        assert_eq!(stop.deactivated.len(), 2);
        assert_eq!(a.state(), LifecycleState::Ready);
        assert_eq!(fx.machine.state(), LifecycleState::Ready);
    }

    #[test]
    fn start_failure_makes_machine_partial() {
        let fx = Fixture::new();
        fx.composite("good", 1);
        let bad = fx.composite("bad", 0);
        let faulty_id = fx
            .table
            .create_child("faulty", BTreeMap::new(), &bad.id())
            .unwrap();
        bad.add("faulty", Arc::new(Faulty::create(faulty_id))).unwrap();

        let report = fx.machine.start_machine().unwrap();
        assert_eq!(report.activated, vec!["good".to_string()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "bad");
        assert!(report.failed[0].1.contains("faulty"));
        assert_eq!(fx.machine.start_failures(), vec!["bad".to_string()]);
        assert_eq!(fx.machine.evaluate_aggregate_state(), MachineState::Partial);

        let logged = fx
            .machine
            .activity_log()
            .iter()
            .any(|e| e.message.starts_with("failed to activate composite bad"));
        assert!(logged);

        // Not rolled back.
        assert_eq!(
            fx.machine.composite("good").unwrap().state(),
            LifecycleState::Active
        );

        fx.machine.remove_composite("bad").unwrap();
        assert!(fx.machine.start_failures().is_empty());
        assert_eq!(fx.machine.evaluate_aggregate_state(), MachineState::Operational);
    }

    #[test]
    fn stop_clears_start_failures() {
        let fx = Fixture::new();
        let bad = fx.composite("bad", 0);
        let faulty_id = fx
            .table
            .create_child("faulty", BTreeMap::new(), &bad.id())
            .unwrap();
        bad.add("faulty", Arc::new(Faulty::create(faulty_id))).unwrap();

        fx.machine.start_machine().unwrap();
        assert_eq!(fx.machine.start_failures().len(), 1);

        fx.machine.stop_machine().unwrap();
        assert!(fx.machine.start_failures().is_empty());
        assert_eq!(bad.state(), LifecycleState::Ready);
    }

    #[test]
    fn critical_composite_impairs_machine_and_notifies() {
        let fx = Fixture::new();
        fx.composite("a", 1);
        let b = fx.composite("b", 1);
        fx.machine.start_machine().unwrap();

        b.get("b-0").unwrap().terminate().unwrap();
        assert_eq!(fx.machine.evaluate_aggregate_state(), MachineState::Impaired);

        let notices = fx.machine.drain_events();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].channel, CRITICAL_CHANNEL);
        assert_eq!(notices[0].source, b.id());
    }

    #[test]
    fn removed_composite_no_longer_notifies() {
        let fx = Fixture::new();
        let a = fx.composite("a", 1);
        fx.machine.remove_composite("a").unwrap();
        assert!(!a.is_attached());

        a.get("a-0").unwrap().terminate().unwrap();
        a.evaluate_aggregate_state();
        assert_eq!(fx.machine.pending_events(), 0);
    }

    #[test]
    fn terminate_is_idempotent_and_blocks_restart() {
        let fx = Fixture::new();
        let a = fx.composite("a", 1);
        fx.machine.start_machine().unwrap();

        fx.machine.terminate_machine().unwrap();
        fx.machine.terminate_machine().unwrap();
        assert_eq!(a.state(), LifecycleState::Terminated);
        assert!(!fx.machine.identity().is_alive());

        let err = fx.machine.start_machine().unwrap_err();
        assert_eq!(err.code(), "MACHINE_COMPOSITE");
    }

    #[test]
    fn activity_log_records_membership() {
        let fx = Fixture::new();
        fx.composite("a", 1);
        fx.composite("b", 1);
        fx.machine.connect_composites("a", "b").unwrap();

        let messages: Vec<String> = fx
            .machine
            .activity_log()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert!(messages.contains(&"added composite a".to_string()));
        assert!(messages.contains(&"connected a -> b".to_string()));
    }

    #[test]
    fn composite_held_by_another_machine_is_refused() {
        let fx = Fixture::new();
        let a = fx.composite("a", 1);
        let other_root = fx.table.create_root("other", BTreeMap::new()).unwrap();
        let other = Machine::create(other_root, &MachineConfig::default()).unwrap();

        assert_eq!(
            other.add_composite("a", a.clone()).unwrap_err(),
            MachineError::AlreadyAttached(a.id())
        );
        assert!(other.is_empty());

        // Notices still reach the first machine.
        fx.machine.start_machine().unwrap();
        a.get("a-0").unwrap().terminate().unwrap();
        fx.machine.evaluate_aggregate_state();
        assert_eq!(fx.machine.pending_events(), 1);
        assert_eq!(other.pending_events(), 0);

        fx.machine.remove_composite("a").unwrap();
        assert_eq!(other.add_composite("a", a), Ok(true));
    }

    #[test]
    fn pause_and_resume() {
        let fx = Fixture::new();
        let a = fx.composite("a", 1);
        fx.composite("b", 1);

        let err = fx.machine.pause().unwrap_err();
        assert_eq!(
            err,
            MachineError::from(ComponentError::invalid_operation(
                "suspend",
                LifecycleState::Ready
            ))
        );
        assert!(fx.machine.resume().is_err());

        fx.machine.start_machine().unwrap();
        let paused = fx.machine.pause().unwrap();
        assert_eq!(paused.deactivated, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(fx.machine.state(), LifecycleState::Waiting);
        assert_eq!(a.state(), LifecycleState::Ready);
        assert_eq!(a.get("a-0").unwrap().state(), LifecycleState::Ready);

        let resumed = fx.machine.resume().unwrap();
        assert_eq!(resumed.activated.len(), 2);
        assert_eq!(fx.machine.state(), LifecycleState::Active);
        assert_eq!(fx.machine.evaluate_aggregate_state(), MachineState::Operational);

        fx.machine.pause().unwrap();
        fx.machine.stop_machine().unwrap();
        assert_eq!(fx.machine.state(), LifecycleState::Ready);

        let log: Vec<String> = fx
            .machine
            .activity_log()
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert!(log.contains(&"paused: 2 suspended".to_string()));
        assert!(log.contains(&"rejected resume while ready".to_string()));
    }

    #[test]
    fn error_state_blocks_until_reset() {
        let fx = Fixture::new();
        fx.composite("a", 1);
        fx.machine.start_machine().unwrap();

        assert!(fx.machine.set_error_state("coolant leak"));
        assert!(!fx.machine.set_error_state("second fault"));
        assert_eq!(fx.machine.fault(), Some("coolant leak".to_string()));
        assert_eq!(fx.machine.evaluate_aggregate_state(), MachineState::Impaired);

        let err = fx.machine.start_machine().unwrap_err();
        assert_eq!(err, MachineError::Faulted("coolant leak".into()));
        assert!(err.is_recoverable());
        assert!(matches!(fx.machine.pause(), Err(MachineError::Faulted(_))));
        assert!(matches!(fx.machine.set_version("2.0.0"), Err(MachineError::Faulted(_))));

        assert_eq!(fx.machine.reset_from_error(), Ok(true));
        assert_eq!(fx.machine.reset_from_error(), Ok(false));
        assert!(!fx.machine.is_faulted());
        assert_eq!(fx.machine.state(), LifecycleState::Ready);
        assert_eq!(fx.machine.start_machine().unwrap().activated.len(), 1);
    }

    #[test]
    fn terminated_machine_cannot_fault() {
        let fx = Fixture::new();
        fx.machine.terminate_machine().unwrap();
        assert!(!fx.machine.set_error_state("late"));
        assert_eq!(fx.machine.reset_from_error(), Ok(false));
    }

    #[test]
    fn version_defaults_and_updates() {
        let fx = Fixture::new();
        assert_eq!(fx.machine.version(), DEFAULT_VERSION);

        fx.machine.set_version("1.1.0").unwrap();
        assert_eq!(fx.machine.version(), "1.1.0");
        assert!(fx
            .machine
            .activity_log()
            .iter()
            .any(|e| e.message == "version updated to 1.1.0"));

        fx.machine.terminate_machine().unwrap();
        assert!(fx.machine.set_version("1.2.0").is_err());
        assert_eq!(fx.machine.version(), "1.1.0");
    }
}
