//! Strata runtime: containers and orchestration.
//!
//! This crate assembles components from `strata-component` into
//! composites and machines, guards the connections between children
//! with circuit breakers, and loads the layered configuration.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Model Layer                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  strata-types     : IdentityId, EventId, ErrorCode          │
//! │  strata-event     : Event, EventQueue                       │
//! │  strata-component : Lifecycle, Identity, Component          │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Runtime Layer (THIS CRATE)                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  composite : Composite, CompositeState, routing             │
//! │  machine   : Machine, MachineState, start/stop              │
//! │  breaker   : CircuitBreaker per connection                  │
//! │  config    : RuntimeConfig, ConfigLoader                    │
//! │  runtime   : Runtime factory                                │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! ## [`composite`] - Composite Container
//!
//! - [`Composite`]: named children, connection graph, breakers
//! - [`CompositeState`]: Flowing / Degraded / Critical
//! - [`FanOutReport`]: per-target outcome of [`Composite::fan_out`]
//! - [`Transformer`], [`Validator`]: stages run by [`Composite::process`]
//!
//! ## [`machine`] - Machine Orchestrator
//!
//! - [`Machine`]: named composites and their connections
//! - [`MachineState`]: Operational / Partial / Reorganizing / Impaired
//! - [`StartReport`], [`StopReport`]
//! - pause / resume, error state, version
//!
//! ## [`aggregate`] - Aggregate Evaluation
//!
//! The threshold algorithm shared by composites and machines.
//!
//! ## [`breaker`] - Circuit Breakers
//!
//! - [`CircuitBreaker`]: closed / open / half-open gate
//! - [`BreakerConfig`], [`BreakerStats`]
//!
//! ## [`config`] - Configuration Management
//!
//! Hierarchical configuration with layered merging:
//!
//! - [`RuntimeConfig`]: unified configuration type
//! - [`ConfigLoader`](config::ConfigLoader): multi-source loader
//!
//! # Example
//!
//! ```
//! use strata_component::Component;
//! use strata_runtime::{CompositeState, Runtime};
//!
//! let runtime = Runtime::default();
//! let pump = runtime.create_composite("pump", None).unwrap();
//! for name in ["intake", "valve"] {
//!     pump.add(name, runtime.create_leaf(name, Some(&pump.id())).unwrap()).unwrap();
//! }
//! pump.connect("intake", "valve").unwrap();
//! pump.activate().unwrap();
//!
//! assert_eq!(pump.evaluate_aggregate_state(), CompositeState::Flowing);
//! ```

pub mod aggregate;
pub mod breaker;
pub mod composite;
pub mod config;
mod error;
pub mod graph;
pub mod machine;
mod runtime;

pub use breaker::{BreakerConfig, BreakerStats, CircuitBreaker, CircuitState};
pub use composite::{Composite, CompositeState, FanOutReport, Transformer, Validator};
pub use config::{ConfigError, RuntimeConfig};
pub use error::{CompositeError, MachineError, RuntimeError};
pub use machine::{Machine, MachineState, StartReport, StopReport};
pub use runtime::Runtime;
