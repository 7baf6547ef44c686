//! Composite container.
//!
//! A [`Composite`] holds named children (leaves or other composites)
//! and a directed graph of connections between them. Every connection
//! carries its own [`CircuitBreaker`]. The composite is itself a
//! [`Component`], so it nests.
//!
//! # Structure
//!
//! ```text
//! Composite
//!   ├── core        ComponentCore (own identity, state, queues)
//!   ├── children    name → Arc<dyn Component>
//!   ├── graph       ConnectionGraph of names
//!   ├── breakers    (source, target) → Arc<CircuitBreaker>
//!   ├── stages      name → validator / transformer
//!   └── inbox       machine EventQueue, set while attached
//! ```
//!
//! # Lock Order
//!
//! `children` → `graph` → `breakers` → `stages`. Evaluation, routing
//! and processing copy what they need and release the locks before
//! touching any child or stage, so neither runs under a container lock.
//!
//! # Processing
//!
//! [`Composite::process`] walks the graph depth-first from an entry
//! child:
//!
//! ```text
//! entry ──validate──transform──┬──▶ b ──▶ ... ──▶ terminal  => Some(data)
//!                              └──▶ c (breaker open: skipped)
//! ```
//!
//! Each hop goes through the edge's breaker. A transformer error counts
//! as a breaker failure and abandons that branch. A rejected validation
//! abandons the branch without touching the breaker's failure count.
//! The first branch that reaches a child with no outgoing edges wins.
//!
//! # Aggregate State
//!
//! | Assessment | [`CompositeState`] |
//! |------------|--------------------|
//! | Nominal | Flowing |
//! | Reduced | Degraded |
//! | Transitional | Degraded |
//! | Critical | Critical |

use crate::aggregate::{Assessment, Tally, Thresholds};
use crate::breaker::{BreakerConfig, BreakerStats, CircuitBreaker};
use crate::config::CompositeConfig;
use crate::error::CompositeError;
use crate::graph::ConnectionGraph;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use strata_component::{Component, ComponentCore, ComponentError, Health, Identity};
use strata_event::{Event, EventQueue, Payload};
use strata_types::{EventId, IdentityId};
use tracing::{debug, info, warn};

/// Channel a composite publishes its label changes on.
pub const STATE_CHANNEL: &str = "composite.state";

/// Channel used to tell the owning machine a composite went critical.
pub const CRITICAL_CHANNEL: &str = "composite.critical";

/// Aggregate label of a composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeState {
    /// Enough children are active.
    Flowing,
    /// Too few active children, or too many lagging behind.
    Degraded,
    /// Failed children reached the critical threshold.
    Critical,
}

impl From<Assessment> for CompositeState {
    fn from(assessment: Assessment) -> Self {
        match assessment {
            Assessment::Nominal => Self::Flowing,
            Assessment::Reduced | Assessment::Transitional => Self::Degraded,
            Assessment::Critical => Self::Critical,
        }
    }
}

impl fmt::Display for CompositeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flowing => write!(f, "flowing"),
            Self::Degraded => write!(f, "degraded"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// Outcome of [`Composite::fan_out`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanOutReport {
    /// Targets that accepted the data.
    pub delivered: Vec<String>,
    /// Targets whose publish failed.
    pub failed: Vec<(String, CompositeError)>,
    /// Targets skipped because their breaker was open.
    pub skipped: Vec<String>,
}

impl FanOutReport {
    /// True if every target accepted the data.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

type EdgeKey = (String, String);

/// Transformer attached with [`Composite::add_transformer`].
///
/// An `Err` carries the reason the data was refused.
pub type Transformer = Arc<dyn Fn(Payload) -> Result<Payload, String> + Send + Sync>;

/// Validator attached with [`Composite::add_validator`].
pub type Validator = Arc<dyn Fn(&Payload) -> bool + Send + Sync>;

#[derive(Clone, Default)]
struct Stages {
    validator: Option<Validator>,
    transformer: Option<Transformer>,
}

/// Container of named components.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use std::sync::Arc;
/// use strata_component::{Component, Leaf, LineageTable};
/// use strata_runtime::composite::{Composite, CompositeState};
/// use strata_runtime::config::CompositeConfig;
///
/// let table = LineageTable::new();
/// let root = table.create_root("pump", BTreeMap::new()).unwrap();
/// let pump = Composite::create(root.clone(), &CompositeConfig::default()).unwrap();
///
/// for name in ["intake", "valve"] {
///     let id = table.create_child(name, BTreeMap::new(), &root.id()).unwrap();
///     pump.add(name, Arc::new(Leaf::create(id).unwrap())).unwrap();
/// }
/// pump.connect("intake", "valve").unwrap();
///
/// pump.activate().unwrap();
/// assert_eq!(pump.evaluate_aggregate_state(), CompositeState::Flowing);
/// ```
pub struct Composite {
    core: ComponentCore,
    thresholds: Thresholds,
    default_breaker: BreakerConfig,
    children: RwLock<BTreeMap<String, Arc<dyn Component>>>,
    graph: RwLock<ConnectionGraph>,
    breakers: RwLock<HashMap<EdgeKey, Arc<CircuitBreaker>>>,
    stages: RwLock<HashMap<String, Stages>>,
    last_state: Mutex<Option<CompositeState>>,
    machine_inbox: RwLock<Option<EventQueue>>,
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("id", &self.core.id())
            .field("state", &self.core.state())
            .field("children", &self.names())
            .field("connections", &self.graph.read().len())
            .finish()
    }
}

impl Composite {
    /// Creates a composite in `Conception` with no children.
    #[must_use]
    pub fn new(identity: Arc<Identity>, config: &CompositeConfig) -> Self {
        Self {
            core: ComponentCore::new(identity),
            thresholds: config.thresholds(),
            default_breaker: config.breaker,
            children: RwLock::new(BTreeMap::new()),
            graph: RwLock::new(ConnectionGraph::new()),
            breakers: RwLock::new(HashMap::new()),
            stages: RwLock::new(HashMap::new()),
            last_state: Mutex::new(None),
            machine_inbox: RwLock::new(None),
        }
    }

    /// Creates a composite and walks it to `Ready`.
    ///
    /// # Errors
    ///
    /// Propagates [`ComponentCore::initialize`] failures.
    pub fn create(
        identity: Arc<Identity>,
        config: &CompositeConfig,
    ) -> Result<Self, ComponentError> {
        let composite = Self::new(identity, config);
        composite.core.initialize()?;
        Ok(composite)
    }

    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    // === Children ===

    /// Registers `component` under `name`.
    ///
    /// # Errors
    ///
    /// - [`CompositeError::DuplicateName`] if `name` is taken
    /// - [`CompositeError::DuplicateComponent`] if the component is
    ///   already registered under another name
    /// - [`CompositeError::CyclicContainment`] if the component is this
    ///   composite or holds it somewhere below
    ///
    /// Nothing is changed on error.
    pub fn add(
        &self,
        name: impl Into<String>,
        component: Arc<dyn Component>,
    ) -> Result<bool, CompositeError> {
        let name = name.into();
        let id = component.id();
        // Searched before taking our own lock: the subtree may read it.
        let own = self.core.id();
        if id == own || component.contains_descendant(&own) {
            warn!(composite = %own, child = %name, child_id = %id, "cyclic containment refused");
            self.core.log_activity(format!("rejected add {name}: cyclic containment"));
            return Err(CompositeError::CyclicContainment(id));
        }

        let mut children = self.children.write();
        if children.contains_key(&name) {
            return Err(CompositeError::DuplicateName(name));
        }
        if let Some((existing, _)) = children.iter().find(|(_, c)| c.id() == id) {
            return Err(CompositeError::DuplicateComponent {
                id,
                existing: existing.clone(),
            });
        }

        debug!(composite = %self.core.id(), child = %name, child_id = %id, "child added");
        self.core.log_activity(format!("added child {name}"));
        children.insert(name, component);
        Ok(true)
    }

    /// Detaches a child together with its edges and breakers.
    ///
    /// The child itself is left running.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Component>> {
        let mut children = self.children.write();
        let removed = children.remove(name)?;

        let dropped = self.graph.write().remove_node(name);
        let mut breakers = self.breakers.write();
        for edge in &dropped {
            breakers.remove(edge);
        }
        drop(breakers);
        self.stages.write().remove(name);

        debug!(composite = %self.core.id(), child = %name, edges = dropped.len(), "child removed");
        self.core.log_activity(format!("removed child {name}"));
        Some(removed)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Component>> {
        self.children.read().get(name).cloned()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.children.read().contains_key(name)
    }

    /// Child names in sorted order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.children.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.children.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.read().is_empty()
    }

    // === Connections ===

    /// Connects `source` to `target`.
    ///
    /// Returns `Ok(false)` if the edge already existed. A new edge gets a
    /// breaker built from the composite's default breaker config.
    ///
    /// # Errors
    ///
    /// - [`CompositeError::UnknownChild`] if either name is absent
    /// - [`CompositeError::SelfConnection`] if `source == target`
    pub fn connect(&self, source: &str, target: &str) -> Result<bool, CompositeError> {
        let children = self.children.read();
        for name in [source, target] {
            if !children.contains_key(name) {
                return Err(CompositeError::UnknownChild(name.to_string()));
            }
        }
        if source == target {
            return Err(CompositeError::SelfConnection(source.to_string()));
        }

        let added = self.graph.write().connect(source, target);
        if added {
            self.breakers.write().insert(
                (source.to_string(), target.to_string()),
                Arc::new(CircuitBreaker::new(
                    format!("{source}->{target}"),
                    self.default_breaker,
                )),
            );
            debug!(composite = %self.core.id(), %source, %target, "connected");
            self.core.log_activity(format!("connected {source} -> {target}"));
        }
        Ok(added)
    }

    /// Removes an edge and its breaker. Returns `false` if there was none.
    pub fn disconnect(&self, source: &str, target: &str) -> bool {
        let removed = self.graph.write().disconnect(source, target);
        if removed {
            self.breakers
                .write()
                .remove(&(source.to_string(), target.to_string()));
            debug!(composite = %self.core.id(), %source, %target, "disconnected");
            self.core.log_activity(format!("disconnected {source} -> {target}"));
        }
        removed
    }

    #[must_use]
    pub fn is_connected(&self, source: &str, target: &str) -> bool {
        self.graph.read().contains(source, target)
    }

    /// Downstream targets of `source`.
    #[must_use]
    pub fn targets(&self, source: &str) -> Vec<String> {
        self.graph.read().targets(source)
    }

    /// All edges as `(source, target)` pairs.
    #[must_use]
    pub fn connections(&self) -> Vec<(String, String)> {
        self.graph.read().edges()
    }

    // === Breakers ===

    /// Replaces the breaker on one edge with a fresh one using `config`.
    ///
    /// # Errors
    ///
    /// [`CompositeError::NotConnected`] if the edge does not exist.
    pub fn enable_circuit_breaker(
        &self,
        source: &str,
        target: &str,
        config: BreakerConfig,
    ) -> Result<(), CompositeError> {
        let graph = self.graph.read();
        if !graph.contains(source, target) {
            return Err(not_connected(source, target));
        }
        self.breakers.write().insert(
            (source.to_string(), target.to_string()),
            Arc::new(CircuitBreaker::new(format!("{source}->{target}"), config)),
        );
        debug!(
            composite = %self.core.id(),
            %source,
            %target,
            threshold = config.failure_threshold,
            cool_down_ms = config.cool_down_ms,
            "breaker configured"
        );
        Ok(())
    }

    #[must_use]
    pub fn breaker(&self, source: &str, target: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers
            .read()
            .get(&(source.to_string(), target.to_string()))
            .cloned()
    }

    #[must_use]
    pub fn breaker_stats(&self, source: &str, target: &str) -> Option<BreakerStats> {
        self.breaker(source, target).map(|b| b.stats())
    }

    // === Routing ===

    /// Runs `op` against `target` through the breaker on `source → target`.
    ///
    /// An `Ok` from `op` counts as a success on the breaker, an `Err` as
    /// a failure.
    ///
    /// # Errors
    ///
    /// - [`CompositeError::UnknownChild`] if either name is absent
    /// - [`CompositeError::NotConnected`] if there is no such edge
    /// - [`CompositeError::CircuitOpen`] if the breaker refused the call;
    ///   `op` is not invoked
    /// - whatever `op` returned, converted
    pub fn route<T, E>(
        &self,
        source: &str,
        target: &str,
        op: impl FnOnce(&dyn Component) -> Result<T, E>,
    ) -> Result<T, CompositeError>
    where
        E: Into<CompositeError>,
    {
        let (child, breaker) = {
            let children = self.children.read();
            if !children.contains_key(source) {
                return Err(CompositeError::UnknownChild(source.to_string()));
            }
            let child = children
                .get(target)
                .cloned()
                .ok_or_else(|| CompositeError::UnknownChild(target.to_string()))?;
            let breaker = self
                .breaker(source, target)
                .ok_or_else(|| not_connected(source, target))?;
            (child, breaker)
        };

        if !breaker.try_acquire() {
            debug!(
                composite = %self.core.id(),
                %source,
                %target,
                "call rejected, circuit open"
            );
            return Err(CompositeError::CircuitOpen {
                source_name: source.to_string(),
                target: target.to_string(),
            });
        }

        match op(child.as_ref()) {
            Ok(value) => {
                breaker.record_success();
                Ok(value)
            }
            Err(e) => {
                breaker.record_failure();
                let err = e.into();
                debug!(
                    composite = %self.core.id(),
                    %source,
                    %target,
                    error = %err,
                    "routed call failed"
                );
                Err(err)
            }
        }
    }

    /// Publishes `data` on `channel` at `target`, through the breaker on
    /// `source → target`.
    ///
    /// # Errors
    ///
    /// Same as [`route`](Self::route).
    pub fn send(
        &self,
        source: &str,
        target: &str,
        channel: &str,
        data: Payload,
    ) -> Result<EventId, CompositeError> {
        self.route(source, target, move |child| child.publish_data(channel, data))
    }

    /// Sends `data` to every downstream target of `source`.
    ///
    /// # Errors
    ///
    /// [`CompositeError::UnknownChild`] if `source` is absent. Per-target
    /// failures are collected in the report.
    pub fn fan_out(
        &self,
        source: &str,
        channel: &str,
        data: &Payload,
    ) -> Result<FanOutReport, CompositeError> {
        if !self.contains(source) {
            return Err(CompositeError::UnknownChild(source.to_string()));
        }

        let mut report = FanOutReport::default();
        for target in self.targets(source) {
            match self.send(source, &target, channel, data.clone()) {
                Ok(_) => report.delivered.push(target),
                Err(CompositeError::CircuitOpen { .. }) => report.skipped.push(target),
                Err(e) => report.failed.push((target, e)),
            }
        }
        debug!(
            composite = %self.core.id(),
            %source,
            %channel,
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "fan-out finished"
        );
        Ok(report)
    }

    // === Processing ===

    /// Attaches `transformer` to child `name`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`CompositeError::UnknownChild`] if `name` is absent.
    pub fn add_transformer<F>(&self, name: &str, transformer: F) -> Result<(), CompositeError>
    where
        F: Fn(Payload) -> Result<Payload, String> + Send + Sync + 'static,
    {
        let children = self.children.read();
        if !children.contains_key(name) {
            return Err(CompositeError::UnknownChild(name.to_string()));
        }
        self.stages
            .write()
            .entry(name.to_string())
            .or_default()
            .transformer = Some(Arc::new(transformer));
        debug!(composite = %self.core.id(), child = %name, "transformer attached");
        Ok(())
    }

    /// Attaches `validator` to child `name`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// [`CompositeError::UnknownChild`] if `name` is absent.
    pub fn add_validator<F>(&self, name: &str, validator: F) -> Result<(), CompositeError>
    where
        F: Fn(&Payload) -> bool + Send + Sync + 'static,
    {
        let children = self.children.read();
        if !children.contains_key(name) {
            return Err(CompositeError::UnknownChild(name.to_string()));
        }
        self.stages
            .write()
            .entry(name.to_string())
            .or_default()
            .validator = Some(Arc::new(validator));
        debug!(composite = %self.core.id(), child = %name, "validator attached");
        Ok(())
    }

    /// Pushes `data` through the graph starting at `entry`.
    ///
    /// Returns the data as it left the first terminal child reached, or
    /// `None` when every branch was refused, failed or skipped. Every
    /// refusal and failure is written to the activity log.
    ///
    /// # Errors
    ///
    /// - [`ComponentError::InvalidOperation`] unless the composite is
    ///   active
    /// - [`CompositeError::UnknownChild`] if `entry` is absent
    pub fn process(&self, entry: &str, data: Payload) -> Result<Option<Payload>, CompositeError> {
        let state = self.core.state();
        if !state.can_deactivate() {
            self.core.log_activity(format!("rejected process while {state}"));
            warn!(composite = %self.core.id(), %state, "process rejected");
            return Err(ComponentError::invalid_operation("process", state).into());
        }
        if !self.contains(entry) {
            return Err(CompositeError::UnknownChild(entry.to_string()));
        }

        let result = match self.run_stages(entry, data) {
            Ok(Some(data)) => self.walk(entry, data, &mut Vec::new()),
            Ok(None) => None,
            Err(e) => {
                self.stage_failed(entry, &e);
                None
            }
        };
        debug!(
            composite = %self.core.id(),
            %entry,
            completed = result.is_some(),
            "processing finished"
        );
        Ok(result)
    }

    fn walk(&self, name: &str, data: Payload, path: &mut Vec<String>) -> Option<Payload> {
        let targets = self.targets(name);
        if targets.is_empty() {
            self.core.log_activity(format!("processed to terminal {name}"));
            return Some(data);
        }

        path.push(name.to_string());
        let mut result = None;
        for target in targets {
            if path.contains(&target) {
                debug!(composite = %self.core.id(), %name, %target, "cycle skipped");
                continue;
            }
            let Some(breaker) = self.breaker(name, &target) else {
                continue;
            };
            if !breaker.try_acquire() {
                self.core
                    .log_activity(format!("skipped {name} -> {target}: circuit open"));
                continue;
            }

            match self.run_stages(&target, data.clone()) {
                Ok(Some(next)) => {
                    breaker.record_success();
                    result = self.walk(&target, next, path);
                }
                Ok(None) => breaker.record_success(),
                Err(e) => {
                    breaker.record_failure();
                    self.stage_failed(&target, &e);
                }
            }
            if result.is_some() {
                break;
            }
        }
        path.pop();
        result
    }

    /// Validates then transforms at `name`. `Ok(None)` means refused.
    fn run_stages(&self, name: &str, data: Payload) -> Result<Option<Payload>, CompositeError> {
        let stages = self.stages.read().get(name).cloned().unwrap_or_default();

        if let Some(validator) = &stages.validator {
            if !validator(&data) {
                self.core.log_activity(format!("validation failed at {name}"));
                debug!(composite = %self.core.id(), child = %name, "validation failed");
                return Ok(None);
            }
        }
        let Some(transformer) = &stages.transformer else {
            return Ok(Some(data));
        };
        let out = transformer(data).map_err(|reason| CompositeError::StageFailed {
            child: name.to_string(),
            reason,
        })?;
        debug!(composite = %self.core.id(), child = %name, "data transformed");
        Ok(Some(out))
    }

    fn stage_failed(&self, name: &str, err: &CompositeError) {
        warn!(composite = %self.core.id(), child = %name, error = %err, "stage failed");
        self.core.log_activity(err.to_string());
    }

    // === Aggregate ===

    /// Derives the composite's label from its children's health.
    ///
    /// A label change is published on [`STATE_CHANNEL`]. Crossing into
    /// [`CompositeState::Critical`] also notifies the attached machine
    /// on [`CRITICAL_CHANNEL`].
    pub fn evaluate_aggregate_state(&self) -> CompositeState {
        let children: Vec<Arc<dyn Component>> = self.children.read().values().cloned().collect();
        let tally = Tally::of(&children, |c| c.health());
        let next = CompositeState::from(tally.assess(&self.thresholds));

        let previous = std::mem::replace(&mut *self.last_state.lock(), Some(next));
        if previous != Some(next) {
            self.announce_change(previous, next);
            if next == CompositeState::Critical {
                warn!(
                    composite = %self.core.id(),
                    failed = tally.failed,
                    total = tally.total,
                    "composite is critical"
                );
                self.notify_machine(&tally);
            }
        }
        next
    }

    /// Last label computed by
    /// [`evaluate_aggregate_state`](Self::evaluate_aggregate_state).
    #[must_use]
    pub fn last_state(&self) -> Option<CompositeState> {
        *self.last_state.lock()
    }

    fn announce_change(&self, previous: Option<CompositeState>, next: CompositeState) {
        let mut data = Payload::new();
        data.insert(
            "previous".into(),
            previous.map_or(Value::Null, |p| Value::from(p.to_string())),
        );
        data.insert("next".into(), Value::from(next.to_string()));
        if let Err(e) = self.core.publish_data(STATE_CHANNEL, data) {
            warn!(composite = %self.core.id(), %next, error = %e, "label change not published");
            self.core
                .log_activity(format!("label change to {next} not published: {e}"));
        }
    }

    fn notify_machine(&self, tally: &Tally) {
        let Some(inbox) = self.machine_inbox.read().clone() else {
            return;
        };
        let mut data = Payload::new();
        data.insert("composite".into(), Value::from(self.core.id().to_string()));
        data.insert(
            "reason".into(),
            Value::from(self.core.identity().reason().to_string()),
        );
        data.insert("failed".into(), Value::from(tally.failed));
        data.insert("total".into(), Value::from(tally.total));
        match Event::data(self.core.id(), CRITICAL_CHANNEL, data) {
            Ok(event) => inbox.push(event),
            Err(e) => warn!(composite = %self.core.id(), error = %e, "critical notice dropped"),
        }
    }

    // === Machine attachment ===

    /// Claims the composite for the machine owning `inbox`.
    ///
    /// Returns `false` if another machine already holds it.
    pub(crate) fn attach_inbox(&self, inbox: EventQueue) -> bool {
        let mut slot = self.machine_inbox.write();
        if slot.is_some() {
            return false;
        }
        *slot = Some(inbox);
        true
    }

    /// Releases the claim made with `inbox`. Other claims are left alone.
    pub(crate) fn detach_inbox(&self, inbox: &EventQueue) {
        let mut slot = self.machine_inbox.write();
        if slot.as_ref().is_some_and(|held| held.same_queue(inbox)) {
            *slot = None;
        }
    }

    /// True while a machine holds this composite.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.machine_inbox.read().is_some()
    }

    fn snapshot(&self) -> Vec<(String, Arc<dyn Component>)> {
        self.children
            .read()
            .iter()
            .map(|(name, child)| (name.clone(), Arc::clone(child)))
            .collect()
    }

    fn partial(failed: Vec<String>) -> Result<(), ComponentError> {
        if failed.is_empty() {
            Ok(())
        } else {
            Err(ComponentError::PartialActivation { failed })
        }
    }
}

impl Component for Composite {
    fn core(&self) -> &ComponentCore {
        &self.core
    }

    /// Activates the composite, then every child in standby.
    ///
    /// Children that fail are reported together as
    /// [`ComponentError::PartialActivation`]. The ones that succeeded stay
    /// active.
    fn activate(&self) -> Result<(), ComponentError> {
        self.core.activate()?;

        let mut failed = Vec::new();
        let mut activated = 0usize;
        for (name, child) in self.snapshot() {
            if !child.state().can_activate() {
                continue;
            }
            match child.activate() {
                Ok(()) => activated += 1,
                Err(e) => {
                    warn!(
                        composite = %self.core.id(),
                        child = %name,
                        error = %e,
                        "child activation failed"
                    );
                    failed.push(format!("{name}: {e}"));
                }
            }
        }

        info!(
            composite = %self.core.id(),
            activated,
            failed = failed.len(),
            "composite activated"
        );
        Self::partial(failed)
    }

    /// Deactivates the composite, then every active child.
    fn deactivate(&self) -> Result<(), ComponentError> {
        self.core.deactivate()?;

        let mut failed = Vec::new();
        for (name, child) in self.snapshot() {
            if !child.state().can_deactivate() {
                continue;
            }
            if let Err(e) = child.deactivate() {
                warn!(
                    composite = %self.core.id(),
                    child = %name,
                    error = %e,
                    "child deactivation failed"
                );
                failed.push(format!("{name}: {e}"));
            }
        }

        info!(composite = %self.core.id(), failed = failed.len(), "composite deactivated");
        Self::partial(failed)
    }

    /// Terminates every child, then the composite. Idempotent.
    fn terminate(&self) -> Result<(), ComponentError> {
        if self.core.is_terminated() {
            return Ok(());
        }

        let mut failed = Vec::new();
        for (name, child) in self.snapshot() {
            if let Err(e) = child.terminate() {
                warn!(
                    composite = %self.core.id(),
                    child = %name,
                    error = %e,
                    "child termination failed"
                );
                failed.push(format!("{name}: {e}"));
            }
        }

        self.core.terminate()?;
        info!(composite = %self.core.id(), "composite terminated");
        Self::partial(failed)
    }

    fn health(&self) -> Health {
        if self.core.is_terminated() {
            return Health::Failed;
        }
        match self.evaluate_aggregate_state() {
            CompositeState::Critical => Health::Failed,
            CompositeState::Degraded => Health::Degraded,
            CompositeState::Flowing => Health::from(self.core.state()),
        }
    }

    fn contains_descendant(&self, id: &IdentityId) -> bool {
        self.snapshot()
            .iter()
            .any(|(_, child)| child.id() == *id || child.contains_descendant(id))
    }
}

fn not_connected(source: &str, target: &str) -> CompositeError {
    CompositeError::NotConnected {
        source_name: source.to_string(),
        target: target.to_string(),
    }
}
