//! Configuration loader with hierarchical merging.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Global config (`~/.strata/config.toml`)
//! 3. Project config (`<root>/.strata/config.toml`)
//! 4. Environment variables (`STRATA_*`)
//!
//! Each layer overrides the previous. The two files are merged as TOML
//! tables before anything is deserialized, so a key written in the
//! project file always beats the global file, even when it restates a
//! default.

use super::{
    default_config_path, ConfigError, RuntimeConfig, PROJECT_CONFIG_DIR, PROJECT_CONFIG_FILE,
};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Helper macro for parsing numeric environment variables.
macro_rules! parse_env_num {
    ($field:expr, $var:literal) => {
        if let Ok(val) = std::env::var($var) {
            $field = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env_var($var, "expected unsigned integer"))?;
        }
    };
}

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```
/// use strata_runtime::config::{ConfigLoader, RuntimeConfig};
///
/// let config = ConfigLoader::new()
///     .skip_global_config()
///     .skip_project_config()
///     .skip_env_vars()
///     .load()
///     .unwrap();
/// assert_eq!(config, RuntimeConfig::default());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    /// Global config file path (defaults to ~/.strata/config.toml).
    global_config_path: Option<PathBuf>,

    /// Project root directory.
    project_root: Option<PathBuf>,

    /// Skip environment variable loading.
    skip_env: bool,

    /// Skip global config loading.
    skip_global: bool,

    /// Skip project config loading.
    skip_project: bool,
}

impl ConfigLoader {
    /// Creates a new loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom global config path.
    #[must_use]
    pub fn with_global_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.global_config_path = Some(path.into());
        self
    }

    /// Sets the project root directory.
    ///
    /// Project config will be loaded from `<project_root>/.strata/config.toml`.
    #[must_use]
    pub fn with_project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_root = Some(path.into());
        self
    }

    /// Skips environment variable loading.
    ///
    /// Useful for testing with deterministic config.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Skips global config loading.
    #[must_use]
    pub fn skip_global_config(mut self) -> Self {
        self.skip_global = true;
        self
    }

    /// Skips project config loading.
    #[must_use]
    pub fn skip_project_config(mut self) -> Self {
        self.skip_project = true;
        self
    }

    /// Loads and merges configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any config file exists but cannot be
    /// parsed, or an environment variable holds an invalid value.
    /// Missing config files are silently ignored.
    pub fn load(&self) -> Result<RuntimeConfig, ConfigError> {
        let mut merged = toml::Table::new();
        let mut last_path = None;

        if !self.skip_global {
            let global_path = self
                .global_config_path
                .clone()
                .unwrap_or_else(default_config_path);

            if let Some(table) = self.load_file(&global_path)? {
                debug!(path = %global_path.display(), "Loaded global config");
                merge_tables(&mut merged, table);
                last_path = Some(global_path);
            }
        }

        if !self.skip_project {
            if let Some(ref project_root) = self.project_root {
                let project_config_path = project_root
                    .join(PROJECT_CONFIG_DIR)
                    .join(PROJECT_CONFIG_FILE);

                if let Some(table) = self.load_file(&project_config_path)? {
                    debug!(
                        path = %project_config_path.display(),
                        project = %project_root.display(),
                        "Loaded project config"
                    );
                    merge_tables(&mut merged, table);
                    last_path = Some(project_config_path);
                }
            }
        }

        let mut config = match last_path {
            Some(path) => toml::Value::Table(merged)
                .try_into()
                .map_err(|e| ConfigError::parse_toml(path, e))?,
            None => RuntimeConfig::default(),
        };

        if !self.skip_env {
            self.apply_env_vars(&mut config)?;
        }

        Ok(config)
    }

    /// Loads a config file as a raw table, returning None if it doesn't exist.
    ///
    /// The table is checked against [`RuntimeConfig`] here so a bad value
    /// is reported against the file that holds it.
    fn load_file(&self, path: &Path) -> Result<Option<toml::Table>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

        let table: toml::Table = content
            .parse()
            .map_err(|e| ConfigError::parse_toml(path, e))?;
        toml::Value::Table(table.clone())
            .try_into::<RuntimeConfig>()
            .map_err(|e| ConfigError::parse_toml(path, e))?;

        Ok(Some(table))
    }

    /// Applies environment variable overrides.
    fn apply_env_vars(&self, config: &mut RuntimeConfig) -> Result<(), ConfigError> {
        parse_env_num!(config.composite.minimum_active_required, "STRATA_MIN_ACTIVE");
        parse_env_num!(
            config.composite.critical_error_threshold,
            "STRATA_CRITICAL_THRESHOLD"
        );
        parse_env_num!(
            config.composite.breaker.failure_threshold,
            "STRATA_BREAKER_FAILURES"
        );
        parse_env_num!(
            config.composite.breaker.cool_down_ms,
            "STRATA_BREAKER_COOLDOWN_MS"
        );
        parse_env_num!(
            config.machine.minimum_active_required,
            "STRATA_MACHINE_MIN_ACTIVE"
        );
        Ok(())
    }
}

/// Lays `overlay` over `base`.
///
/// Nested tables merge key by key. Any other value in `overlay`
/// replaces the one in `base`.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        if let toml::Value::Table(nested) = value {
            if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                merge_tables(existing, nested);
                continue;
            }
            base.insert(key, toml::Value::Table(nested));
        } else {
            base.insert(key, value);
        }
    }
}
