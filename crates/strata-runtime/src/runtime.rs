//! Runtime factory.
//!
//! The [`Runtime`] owns the [`LineageTable`] and the [`RuntimeConfig`]
//! every component is created against. There is no global registry;
//! callers hold a runtime and pass it where components are built.

use crate::composite::Composite;
use crate::config::{ConfigLoader, RuntimeConfig};
use crate::error::RuntimeError;
use crate::machine::Machine;
use std::collections::BTreeMap;
use std::sync::Arc;
use strata_component::environment::{host_snapshot, overlay};
use strata_component::{Identity, Leaf, LineageTable};
use strata_types::IdentityId;
use tracing::debug;

/// Owner of the lineage table and configuration.
///
/// # Example
///
/// ```
/// use strata_component::Component;
/// use strata_runtime::{MachineState, Runtime, RuntimeConfig};
///
/// let runtime = Runtime::new(RuntimeConfig::default());
/// let machine = runtime.create_machine("plant", None).unwrap();
///
/// let line = runtime.create_composite("line", Some(&machine.id())).unwrap();
/// let cell = runtime.create_leaf("cell", Some(&line.id())).unwrap();
/// line.add("cell", cell).unwrap();
/// machine.add_composite("line", line.clone()).unwrap();
///
/// machine.start_machine().unwrap();
/// assert_eq!(machine.evaluate_aggregate_state(), MachineState::Operational);
///
/// let address = runtime.lineage().hierarchical_address(&line.id()).unwrap();
/// assert!(address.starts_with("plant<"));
/// ```
#[derive(Debug)]
pub struct Runtime {
    lineage: LineageTable,
    config: RuntimeConfig,
    environment: BTreeMap<String, String>,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Runtime {
    /// Creates a runtime with an empty lineage table.
    ///
    /// The host snapshot is taken once here, with
    /// `config.environment` applied on top.
    #[must_use]
    pub fn new(config: RuntimeConfig) -> Self {
        let environment = overlay(host_snapshot(), &config.environment);
        Self {
            lineage: LineageTable::new(),
            config,
            environment,
        }
    }

    /// Creates a runtime from the layered configuration.
    ///
    /// # Errors
    ///
    /// Propagates [`ConfigLoader::load`] failures.
    pub fn from_loader(loader: &ConfigLoader) -> Result<Self, crate::config::ConfigError> {
        Ok(Self::new(loader.load()?))
    }

    #[must_use]
    pub fn lineage(&self) -> &LineageTable {
        &self.lineage
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Environment snapshot given to every new identity.
    #[must_use]
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// Registers a new identity, as a root when `parent` is `None`.
    ///
    /// # Errors
    ///
    /// [`RuntimeError::Identity`] on an empty reason or unknown parent.
    pub fn create_identity(
        &self,
        reason: &str,
        parent: Option<&IdentityId>,
    ) -> Result<Arc<Identity>, RuntimeError> {
        let environment = self.environment.clone();
        let identity = match parent {
            Some(parent) => self.lineage.create_child(reason, environment, parent)?,
            None => self.lineage.create_root(reason, environment)?,
        };
        Ok(identity)
    }

    /// Creates a [`Leaf`] in `Ready`.
    ///
    /// # Errors
    ///
    /// Identity or initialization failure.
    pub fn create_leaf(
        &self,
        reason: &str,
        parent: Option<&IdentityId>,
    ) -> Result<Arc<Leaf>, RuntimeError> {
        let identity = self.create_identity(reason, parent)?;
        debug!(id = %identity.id(), %reason, "creating leaf");
        Ok(Arc::new(Leaf::create(identity)?))
    }

    /// Creates a [`Composite`] in `Ready` using the configured thresholds
    /// and default breaker.
    ///
    /// # Errors
    ///
    /// Identity or initialization failure.
    pub fn create_composite(
        &self,
        reason: &str,
        parent: Option<&IdentityId>,
    ) -> Result<Arc<Composite>, RuntimeError> {
        let identity = self.create_identity(reason, parent)?;
        debug!(id = %identity.id(), %reason, "creating composite");
        Ok(Arc::new(Composite::create(identity, &self.config.composite)?))
    }

    /// Creates a [`Machine`] in `Ready` using the configured thresholds.
    ///
    /// # Errors
    ///
    /// Identity or initialization failure.
    pub fn create_machine(
        &self,
        reason: &str,
        parent: Option<&IdentityId>,
    ) -> Result<Arc<Machine>, RuntimeError> {
        let identity = self.create_identity(reason, parent)?;
        debug!(id = %identity.id(), %reason, "creating machine");
        Ok(Arc::new(Machine::create(identity, &self.config.machine)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_component::{Component, IdentityError, LifecycleState};

    #[test]
    fn environment_overlays_config() {
        let mut config = RuntimeConfig::default();
        config.environment.insert("zone".into(), "eu-1".into());
        config.environment.insert("os".into(), "custom".into());
        let runtime = Runtime::new(config);

        let leaf = runtime.create_leaf("sensor", None).unwrap();
        let env = leaf.identity().environment();
        assert_eq!(env["zone"], "eu-1");
        assert_eq!(env["os"], "custom");
        assert!(env.contains_key("process_id"));
    }

    #[test]
    fn identities_land_in_the_table() {
        let runtime = Runtime::default();
        let root = runtime.create_composite("root", None).unwrap();
        let child = runtime.create_leaf("child", Some(&root.id())).unwrap();

        assert_eq!(runtime.lineage().len(), 2);
        assert_eq!(runtime.lineage().parent_of(&child.id()), Some(root.id()));
        assert_eq!(child.state(), LifecycleState::Ready);
    }

    #[test]
    fn factory_errors() {
        let runtime = Runtime::default();
        assert_eq!(
            runtime.create_leaf("  ", None).unwrap_err(),
            RuntimeError::Identity(IdentityError::EmptyReason)
        );

        let ghost = IdentityId::new();
        assert_eq!(
            runtime.create_machine("m", Some(&ghost)).unwrap_err(),
            RuntimeError::Identity(IdentityError::InvalidParent(ghost))
        );
        assert!(runtime.lineage().is_empty());
    }

    #[test]
    fn composites_use_configured_thresholds() {
        let mut config = RuntimeConfig::default();
        config.composite.minimum_active_required = 5;
        let runtime = Runtime::new(config);

        let composite = runtime.create_composite("c", None).unwrap();
        assert_eq!(composite.thresholds().minimum_active_required, 5);
    }
}
