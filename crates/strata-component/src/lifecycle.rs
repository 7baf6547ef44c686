//! Lifecycle states and the transition table.
//!
//! Every component moves through 19 states grouped in four ordered
//! categories. Categories only move forward: a component can fall back
//! from `Active` to `Ready`, but it can never return to `Conception`,
//! and nothing leaves the termination category.
//!
//! # Categories
//!
//! ```text
//! Creation     Conception → Initializing → Configuring → Specializing → DevelopingFeatures
//!                   │
//!                   ▼
//! Operational  Initialized, Ready, Active, Running, Waiting, Adapting, Transforming
//!                   │
//!                   ▼
//! Advanced     Stable, Spawning, Degraded, Maintaining
//!                   │
//!                   ▼
//! Termination  Terminating → Terminated → Archived
//! ```
//!
//! Any state outside the termination category may move to `Terminating`.
//! The authoritative edge set is [`LifecycleState::allowed_targets`].
//!
//! # Example
//!
//! ```
//! use strata_component::{LifecycleCategory, LifecycleState};
//!
//! assert!(LifecycleState::Ready.can_transition_to(LifecycleState::Active));
//! assert!(!LifecycleState::Active.can_transition_to(LifecycleState::Conception));
//! assert!(LifecycleState::Degraded.can_transition_to(LifecycleState::Terminating));
//! assert_eq!(LifecycleState::Spawning.category(), LifecycleCategory::Advanced);
//! ```

use serde::{Deserialize, Serialize};

/// Ordered lifecycle category.
///
/// The derived `Ord` follows declaration order, which is the only
/// direction a component may move in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleCategory {
    /// Building the component.
    Creation,
    /// Doing regular work.
    Operational,
    /// Long-lived, self-managing states.
    Advanced,
    /// Shutting down. Absorbing.
    Termination,
}

impl std::fmt::Display for LifecycleCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Creation => write!(f, "creation"),
            Self::Operational => write!(f, "operational"),
            Self::Advanced => write!(f, "advanced"),
            Self::Termination => write!(f, "termination"),
        }
    }
}

/// Lifecycle state of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Freshly created, nothing configured.
    #[default]
    Conception,
    Initializing,
    Configuring,
    Specializing,
    DevelopingFeatures,

    /// Set up but not yet declared ready.
    Initialized,
    /// Standing by for work.
    Ready,
    Active,
    Running,
    /// Paused on an external condition.
    Waiting,
    Adapting,
    Transforming,

    Stable,
    Spawning,
    /// Working with reduced capability.
    Degraded,
    /// Under repair.
    Maintaining,

    Terminating,
    Terminated,
    /// Retained for inspection only.
    Archived,
}

use LifecycleState as S;

impl LifecycleState {
    /// Every state, in category order.
    pub const ALL: [LifecycleState; 19] = [
        S::Conception,
        S::Initializing,
        S::Configuring,
        S::Specializing,
        S::DevelopingFeatures,
        S::Initialized,
        S::Ready,
        S::Active,
        S::Running,
        S::Waiting,
        S::Adapting,
        S::Transforming,
        S::Stable,
        S::Spawning,
        S::Degraded,
        S::Maintaining,
        S::Terminating,
        S::Terminated,
        S::Archived,
    ];

    /// Creation states visited by [`initialize`](crate::ComponentCore::initialize),
    /// ending in `Ready`.
    pub const CREATION_PATH: [LifecycleState; 5] = [
        S::Initializing,
        S::Configuring,
        S::Specializing,
        S::DevelopingFeatures,
        S::Ready,
    ];

    /// Returns the category this state belongs to.
    #[must_use]
    pub fn category(&self) -> LifecycleCategory {
        match self {
            S::Conception
            | S::Initializing
            | S::Configuring
            | S::Specializing
            | S::DevelopingFeatures => LifecycleCategory::Creation,
            S::Initialized
            | S::Ready
            | S::Active
            | S::Running
            | S::Waiting
            | S::Adapting
            | S::Transforming => LifecycleCategory::Operational,
            S::Stable | S::Spawning | S::Degraded | S::Maintaining => LifecycleCategory::Advanced,
            S::Terminating | S::Terminated | S::Archived => LifecycleCategory::Termination,
        }
    }

    /// Returns the explicitly listed successors of this state.
    ///
    /// `Terminating` is reachable from every state outside the
    /// termination category and is not repeated here.
    #[must_use]
    pub fn allowed_targets(&self) -> &'static [LifecycleState] {
        match self {
            S::Conception => &[S::Initializing],
            S::Initializing => &[S::Configuring],
            S::Configuring => &[S::Specializing],
            S::Specializing => &[S::DevelopingFeatures],
            S::DevelopingFeatures => &[S::Initialized, S::Ready],
            S::Initialized => &[S::Ready],
            S::Ready => &[S::Active, S::Running],
            S::Active => &[S::Ready, S::Running, S::Waiting, S::Adapting, S::Transforming],
            S::Running => &[S::Active, S::Ready, S::Waiting, S::Adapting, S::Transforming],
            S::Waiting => &[S::Active, S::Running, S::Ready, S::Adapting],
            S::Adapting => &[S::Active, S::Running, S::Ready, S::Waiting, S::Stable],
            S::Transforming => &[S::Active, S::Ready, S::Stable, S::Spawning],
            S::Stable => &[S::Spawning, S::Degraded, S::Maintaining],
            S::Spawning => &[S::Stable],
            S::Degraded => &[S::Maintaining],
            S::Maintaining => &[S::Stable, S::Degraded],
            S::Terminating => &[S::Terminated],
            S::Terminated => &[S::Archived],
            S::Archived => &[],
        }
    }

    /// Returns `true` if `self -> target` is a legal edge.
    ///
    /// Self-transitions and moves into an earlier category are always
    /// rejected.
    #[must_use]
    pub fn can_transition_to(&self, target: LifecycleState) -> bool {
        if *self == target || target.category() < self.category() {
            return false;
        }
        if target == S::Terminating && !self.is_termination() {
            return true;
        }
        self.allowed_targets().contains(&target)
    }

    /// Returns `true` for `Terminating`, `Terminated` and `Archived`.
    #[must_use]
    pub fn is_termination(&self) -> bool {
        self.category() == LifecycleCategory::Termination
    }

    /// Returns `true` once termination has completed.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        matches!(self, S::Terminated | S::Archived)
    }

    /// States from which [`activate`](crate::ComponentCore::activate) is valid.
    #[must_use]
    pub fn can_activate(&self) -> bool {
        matches!(self, S::Ready | S::Waiting)
    }

    /// States from which [`deactivate`](crate::ComponentCore::deactivate) is valid.
    #[must_use]
    pub fn can_deactivate(&self) -> bool {
        matches!(self, S::Active | S::Running)
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            S::Conception => "conception",
            S::Initializing => "initializing",
            S::Configuring => "configuring",
            S::Specializing => "specializing",
            S::DevelopingFeatures => "developing_features",
            S::Initialized => "initialized",
            S::Ready => "ready",
            S::Active => "active",
            S::Running => "running",
            S::Waiting => "waiting",
            S::Adapting => "adapting",
            S::Transforming => "transforming",
            S::Stable => "stable",
            S::Spawning => "spawning",
            S::Degraded => "degraded",
            S::Maintaining => "maintaining",
            S::Terminating => "terminating",
            S::Terminated => "terminated",
            S::Archived => "archived",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_accepted_transition_lowers_category() {
        for from in LifecycleState::ALL {
            for to in LifecycleState::ALL {
                if from.can_transition_to(to) {
                    assert!(
                        to.category() >= from.category(),
                        "{from} -> {to} moves backwards"
                    );
                }
            }
        }
    }

    #[test]
    fn self_transitions_rejected() {
        for s in LifecycleState::ALL {
            assert!(!s.can_transition_to(s), "{s} -> {s} accepted");
        }
    }

    #[test]
    fn termination_is_absorbing() {
        for from in [S::Terminating, S::Terminated, S::Archived] {
            for to in LifecycleState::ALL {
                if from.can_transition_to(to) {
                    assert!(to.is_termination());
                }
            }
        }
        assert!(LifecycleState::ALL
            .iter()
            .all(|to| !S::Archived.can_transition_to(*to)));
    }

    #[test]
    fn every_live_state_can_terminate() {
        for s in LifecycleState::ALL {
            assert_eq!(s.can_transition_to(S::Terminating), !s.is_termination());
        }
    }

    #[test]
    fn table_edges_accepted() {
        for from in LifecycleState::ALL {
            for to in from.allowed_targets() {
                assert!(from.can_transition_to(*to), "{from} -> {to} listed but rejected");
            }
        }
    }

    #[test]
    fn unlisted_edges_rejected() {
        assert!(!S::Conception.can_transition_to(S::Ready));
        assert!(!S::Ready.can_transition_to(S::Waiting));
        assert!(!S::Degraded.can_transition_to(S::Stable));
        assert!(!S::Spawning.can_transition_to(S::Active));
        assert!(!S::Terminating.can_transition_to(S::Archived));
    }

    #[test]
    fn creation_path_is_walkable() {
        let mut current = S::Conception;
        for next in LifecycleState::CREATION_PATH {
            assert!(current.can_transition_to(next));
            current = next;
        }
        assert_eq!(current, S::Ready);
    }

    #[test]
    fn category_counts() {
        let count = |c| {
            LifecycleState::ALL
                .iter()
                .filter(|s| s.category() == c)
                .count()
        };
        assert_eq!(count(LifecycleCategory::Creation), 5);
        assert_eq!(count(LifecycleCategory::Operational), 7);
        assert_eq!(count(LifecycleCategory::Advanced), 4);
        assert_eq!(count(LifecycleCategory::Termination), 3);
    }

    #[test]
    fn activation_subsets() {
        let standby: Vec<_> = LifecycleState::ALL.iter().filter(|s| s.can_activate()).collect();
        assert_eq!(standby, vec![&S::Ready, &S::Waiting]);

        let active: Vec<_> = LifecycleState::ALL
            .iter()
            .filter(|s| s.can_deactivate())
            .collect();
        assert_eq!(active, vec![&S::Active, &S::Running]);
    }

    #[test]
    fn display_and_serde_agree() {
        for s in LifecycleState::ALL {
            let json = serde_json::to_string(&s).unwrap();
            assert_eq!(json, format!("\"{s}\""));
        }
    }
}
