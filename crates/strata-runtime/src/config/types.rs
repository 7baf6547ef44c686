//! Configuration types.
//!
//! All types implement [`Default`] for compile-time fallback values.

use super::ConfigError;
use crate::aggregate::Thresholds;
use crate::breaker::BreakerConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Main configuration structure.
///
/// This is the unified configuration after merging all layers.
/// `degraded_tolerance` is written as a count or as `"unbounded"`.
///
/// # Example
///
/// ```
/// use strata_runtime::config::RuntimeConfig;
///
/// let config = RuntimeConfig::default();
/// assert_eq!(config.composite.minimum_active_required, 1);
/// assert_eq!(config.composite.breaker.failure_threshold, 3);
/// assert_eq!(config.machine.degraded_tolerance, Some(0));
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Defaults for every composite the runtime creates.
    pub composite: CompositeConfig,

    /// Defaults for every machine the runtime creates.
    pub machine: MachineConfig,

    /// Extra entries added to every identity's environment snapshot.
    pub environment: BTreeMap<String, String>,
}

impl RuntimeConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes to TOML string.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Serialize`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Deserializes from TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

/// Composite thresholds and default breaker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompositeConfig {
    /// Active children needed for `Flowing`.
    pub minimum_active_required: usize,

    /// Failed children that make the composite `Critical`. `0` disables.
    pub critical_error_threshold: usize,

    /// Non-active, non-failed children a `Flowing` composite may carry.
    /// `None` means unbounded.
    #[serde(with = "tolerance")]
    pub degraded_tolerance: Option<usize>,

    /// Breaker installed on every new connection.
    pub breaker: BreakerConfig,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            minimum_active_required: 1,
            critical_error_threshold: 3,
            degraded_tolerance: None,
            breaker: BreakerConfig::default(),
        }
    }
}

impl CompositeConfig {
    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            minimum_active_required: self.minimum_active_required,
            critical_error_threshold: self.critical_error_threshold,
            degraded_tolerance: self.degraded_tolerance,
        }
    }
}

/// Machine thresholds.
///
/// The defaults are strict: every composite must be active and a single
/// failed composite makes the machine `Impaired`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MachineConfig {
    /// Active composites needed for `Operational`.
    pub minimum_active_required: usize,

    /// Failed composites that make the machine `Impaired`. `0` disables.
    pub critical_error_threshold: usize,

    /// Non-active, non-failed composites an `Operational` machine may carry.
    #[serde(with = "tolerance")]
    pub degraded_tolerance: Option<usize>,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            minimum_active_required: 1,
            critical_error_threshold: 1,
            degraded_tolerance: Some(0),
        }
    }
}

impl MachineConfig {
    #[must_use]
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            minimum_active_required: self.minimum_active_required,
            critical_error_threshold: self.critical_error_threshold,
            degraded_tolerance: self.degraded_tolerance,
        }
    }
}

/// `degraded_tolerance` in TOML: a count, or `"unbounded"` for `None`.
///
/// TOML has no null, so the word keeps "no bound" expressible in a
/// layer that overrides a bounded one.
mod tolerance {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub const UNBOUNDED: &str = "unbounded";

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Count(usize),
        Word(String),
    }

    pub fn serialize<S: Serializer>(value: &Option<usize>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(count) => s.serialize_u64(*count as u64),
            None => s.serialize_str(UNBOUNDED),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<usize>, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Count(count) => Ok(Some(count)),
            Raw::Word(word) if word == UNBOUNDED => Ok(None),
            Raw::Word(word) => Err(de::Error::custom(format!(
                "expected a count or \"{UNBOUNDED}\", got \"{word}\""
            ))),
        }
    }
}
