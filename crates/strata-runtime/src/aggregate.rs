//! Threshold-based aggregate evaluation.
//!
//! Composites derive their label from their children and machines from
//! their composites. Both use [`assess`]; they differ only in the
//! [`Thresholds`] they pass and how they name the resulting
//! [`Assessment`].
//!
//! # Algorithm
//!
//! ```text
//! tally every item by Health
//!   │
//!   ├─ critical > 0 and failed ≥ critical ──────────────► Critical
//!   ├─ no items ────────────────────────────────────────► Transitional
//!   ├─ active ≥ minimum and lagging ≤ tolerance ────────► Nominal
//!   ├─ any item transitional ───────────────────────────► Transitional
//!   └─ otherwise ───────────────────────────────────────► Reduced
//!
//! lagging = total - active - failed
//! ```
//!
//! # Example
//!
//! ```
//! use strata_component::Health;
//! use strata_runtime::aggregate::{assess, Assessment, Thresholds};
//!
//! let children = [Health::Active, Health::Active, Health::Degraded];
//! let thresholds = Thresholds {
//!     minimum_active_required: 2,
//!     critical_error_threshold: 3,
//!     degraded_tolerance: None,
//! };
//!
//! assert_eq!(assess(&children, |h| *h, &thresholds), Assessment::Nominal);
//! ```

use serde::{Deserialize, Serialize};
use strata_component::Health;

/// Limits applied by [`assess`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Active items needed for a nominal result.
    pub minimum_active_required: usize,
    /// Failed items that make the result critical. `0` disables the check.
    pub critical_error_threshold: usize,
    /// Non-active, non-failed items a nominal result may carry.
    /// `None` means any number.
    pub degraded_tolerance: Option<usize>,
}

/// Outcome of an aggregate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    Nominal,
    Reduced,
    Transitional,
    Critical,
}

/// Item counts per [`Health`] bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub total: usize,
    pub active: usize,
    pub standby: usize,
    pub transitional: usize,
    pub degraded: usize,
    pub failed: usize,
}

impl Tally {
    /// Counts `items` after classifying each one.
    pub fn of<T>(items: &[T], classify: impl Fn(&T) -> Health) -> Self {
        let mut tally = Self::default();
        for item in items {
            tally.add(classify(item));
        }
        tally
    }

    pub fn add(&mut self, health: Health) {
        self.total += 1;
        match health {
            Health::Active => self.active += 1,
            Health::Standby => self.standby += 1,
            Health::Transitional => self.transitional += 1,
            Health::Degraded => self.degraded += 1,
            Health::Failed => self.failed += 1,
        }
    }

    /// Items that are neither active nor failed.
    #[must_use]
    pub fn lagging(&self) -> usize {
        self.total - self.active - self.failed
    }

    #[must_use]
    pub fn assess(&self, thresholds: &Thresholds) -> Assessment {
        if thresholds.critical_error_threshold > 0
            && self.failed >= thresholds.critical_error_threshold
        {
            return Assessment::Critical;
        }
        if self.total == 0 {
            return Assessment::Transitional;
        }

        let within_tolerance = thresholds
            .degraded_tolerance
            .map_or(true, |tolerance| self.lagging() <= tolerance);
        if self.active >= thresholds.minimum_active_required && within_tolerance {
            return Assessment::Nominal;
        }

        if self.transitional > 0 {
            Assessment::Transitional
        } else {
            Assessment::Reduced
        }
    }
}

/// Classifies `items` and assesses the tally against `thresholds`.
pub fn assess<T>(
    items: &[T],
    classify: impl Fn(&T) -> Health,
    thresholds: &Thresholds,
) -> Assessment {
    Tally::of(items, classify).assess(thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use Health::*;

    const COMPOSITE: Thresholds = Thresholds {
        minimum_active_required: 2,
        critical_error_threshold: 3,
        degraded_tolerance: None,
    };

    const STRICT: Thresholds = Thresholds {
        minimum_active_required: 1,
        critical_error_threshold: 1,
        degraded_tolerance: Some(0),
    };

    fn run(items: &[Health], t: &Thresholds) -> Assessment {
        assess(items, |h| *h, t)
    }

    #[test]
    fn two_active_one_degraded_is_nominal() {
        assert_eq!(run(&[Active, Active, Degraded], &COMPOSITE), Assessment::Nominal);
    }

    #[test]
    fn one_active_is_reduced() {
        assert_eq!(run(&[Active, Standby, Degraded], &COMPOSITE), Assessment::Reduced);
    }

    #[test]
    fn transitional_child_wins_over_reduced() {
        assert_eq!(
            run(&[Active, Transitional], &COMPOSITE),
            Assessment::Transitional
        );
    }

    #[test]
    fn empty_is_transitional() {
        assert_eq!(run(&[], &COMPOSITE), Assessment::Transitional);
    }

    #[test]
    fn failures_reach_critical() {
        assert_eq!(run(&[Active, Active, Failed, Failed], &COMPOSITE), Assessment::Nominal);
        assert_eq!(
            run(&[Active, Active, Failed, Failed, Failed], &COMPOSITE),
            Assessment::Critical
        );
        assert_eq!(run(&[Active, Failed], &STRICT), Assessment::Critical);
    }

    #[test]
    fn zero_critical_threshold_disables_check() {
        let t = Thresholds {
            critical_error_threshold: 0,
            ..COMPOSITE
        };
        assert_eq!(run(&[Failed, Failed, Failed], &t), Assessment::Reduced);
    }

    #[test]
    fn tolerance_bounds_lagging_items() {
        assert_eq!(run(&[Active, Active], &STRICT), Assessment::Nominal);
        assert_eq!(run(&[Active, Standby], &STRICT), Assessment::Reduced);

        let loose = Thresholds {
            degraded_tolerance: Some(1),
            ..STRICT
        };
        assert_eq!(run(&[Active, Standby], &loose), Assessment::Nominal);
    }

    #[test]
    fn tally_counts() {
        let tally = Tally::of(&[Active, Standby, Transitional, Degraded, Failed, Active], |h| *h);
        assert_eq!(tally.total, 6);
        assert_eq!(tally.active, 2);
        assert_eq!(tally.failed, 1);
        assert_eq!(tally.lagging(), 3);
    }
}
