//! Health classification used by aggregate evaluation.
//!
//! Containers never look at raw lifecycle states when deriving their
//! own label. They ask each child for its [`Health`], which keeps the
//! aggregation code identical for leaves and nested composites.
//!
//! | Health | Lifecycle states |
//! |--------|------------------|
//! | `Transitional` | creation category, `Adapting`, `Transforming` |
//! | `Standby` | `Initialized`, `Ready`, `Waiting` |
//! | `Active` | `Active`, `Running`, `Stable`, `Spawning` |
//! | `Degraded` | `Degraded`, `Maintaining` |
//! | `Failed` | termination category |

use crate::{LifecycleCategory, LifecycleState};
use serde::{Deserialize, Serialize};

/// Coarse health bucket of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Health {
    /// Doing work.
    Active,
    /// Able to work once activated.
    Standby,
    /// Being built or reshaped.
    Transitional,
    /// Working with reduced capability.
    Degraded,
    /// Gone.
    Failed,
}

impl Health {
    /// Returns `true` for [`Health::Active`].
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns `true` for [`Health::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl From<LifecycleState> for Health {
    fn from(state: LifecycleState) -> Self {
        use LifecycleState as S;
        match state {
            S::Adapting | S::Transforming => Self::Transitional,
            S::Initialized | S::Ready | S::Waiting => Self::Standby,
            S::Active | S::Running | S::Stable | S::Spawning => Self::Active,
            S::Degraded | S::Maintaining => Self::Degraded,
            s if s.category() == LifecycleCategory::Creation => Self::Transitional,
            _ => Self::Failed,
        }
    }
}

impl std::fmt::Display for Health {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Standby => write!(f, "standby"),
            Self::Transitional => write!(f, "transitional"),
            Self::Degraded => write!(f, "degraded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
