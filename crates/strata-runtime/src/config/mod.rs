//! Configuration management with hierarchical layering.
//!
//! # Architecture
//!
//! Configuration is loaded from multiple sources with priority-based merging:
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌───────────────────────────────────────────┐
//! │  1. Environment Variables (STRATA_*)      │  Runtime override
//! ├───────────────────────────────────────────┤
//! │  2. Project Config (.strata/config.toml)  │  Project-specific
//! ├───────────────────────────────────────────┤
//! │  3. Global Config (~/.strata/config.toml) │  User defaults
//! ├───────────────────────────────────────────┤
//! │  4. Default Values (compile-time)         │  Fallback
//! └───────────────────────────────────────────┘
//! ```
//!
//! File layers merge key by key: any key a higher layer writes wins,
//! even when it restates the compile-time default. Tables such as
//! `[environment]` merge per entry.
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `STRATA_MIN_ACTIVE` | `composite.minimum_active_required` | usize |
//! | `STRATA_CRITICAL_THRESHOLD` | `composite.critical_error_threshold` | usize |
//! | `STRATA_BREAKER_FAILURES` | `composite.breaker.failure_threshold` | u32 |
//! | `STRATA_BREAKER_COOLDOWN_MS` | `composite.breaker.cool_down_ms` | u64 |
//! | `STRATA_MACHINE_MIN_ACTIVE` | `machine.minimum_active_required` | usize |
//!
//! # Example Configuration
//!
//! ```toml
//! # ~/.strata/config.toml
//!
//! [composite]
//! minimum_active_required = 2
//! critical_error_threshold = 3
//! degraded_tolerance = "unbounded"   # or a count
//!
//! [composite.breaker]
//! failure_threshold = 3
//! cool_down_ms = 5000
//!
//! [machine]
//! minimum_active_required = 1
//! critical_error_threshold = 1
//! degraded_tolerance = 0
//!
//! [environment]
//! zone = "eu-1"
//! ```

mod error;
mod loader;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use types::{CompositeConfig, MachineConfig, RuntimeConfig};

/// Default global config directory.
pub fn default_config_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".strata")
}

/// Default global config file path.
pub fn default_config_path() -> std::path::PathBuf {
    default_config_dir().join("config.toml")
}

/// Project config directory name.
pub const PROJECT_CONFIG_DIR: &str = ".strata";

/// Project config file name.
pub const PROJECT_CONFIG_FILE: &str = "config.toml";
