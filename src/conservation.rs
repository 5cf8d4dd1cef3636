// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Restart Odds Estimator - Conservation Logic

use serde::{Deserialize, Serialize};

/// Per-round tolerance: absolute error below this threshold is considered balanced.
pub const TOLERANCE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Free function
// ---------------------------------------------------------------------------

/// Compute the probability leaked or created by a simulation so far.
///
/// In a sound simulation:
///   1 = active_mass + absorbed_mass
///
/// Returns the absolute difference.
pub fn compute_conservation(active_mass: f64, absorbed_mass: f64) -> f64 {
    (1.0 - (active_mass + absorbed_mass)).abs()
}

// ---------------------------------------------------------------------------
// Conservation result
// ---------------------------------------------------------------------------

/// Outcome of a single round check.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ConservationResult {
    /// Whether the check passed within tolerance.
    pub balanced: bool,
    /// Absolute error for this round.
    pub error: f64,
    /// Whether the cumulative threshold has been exceeded.
    pub tripped: bool,
}

// ---------------------------------------------------------------------------
// Conservation law
// ---------------------------------------------------------------------------

/// Tracks cumulative conservation error across rounds and trips when the
/// error exceeds a configurable threshold.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConservationLaw {
    /// Running total of absolute errors across rounds that violated tolerance.
    pub cumulative_error: f64,
    /// Maximum cumulative error before the law trips.
    pub threshold: f64,
    pub tripped: bool,
    /// Largest single-round error seen.
    pub worst_error: f64,
    pub rounds_checked: usize,
}

impl ConservationLaw {
    pub fn new(threshold: f64) -> Self {
        Self {
            cumulative_error: 0.0,
            threshold,
            tripped: false,
            worst_error: 0.0,
            rounds_checked: 0,
        }
    }

    /// Verify conservation after a round.
    ///
    /// Invariant: `active_mass + absorbed_mass == 1`
    pub fn verify_round(&mut self, active_mass: f64, absorbed_mass: f64) -> ConservationResult {
        let error = compute_conservation(active_mass, absorbed_mass);
        let balanced = error < TOLERANCE;

        self.rounds_checked += 1;
        self.worst_error = self.worst_error.max(error);

        if !balanced {
            self.cumulative_error += error;
        }

        if self.cumulative_error > self.threshold {
            self.tripped = true;
        }

        ConservationResult { balanced, error, tripped: self.tripped }
    }

    pub fn is_tripped(&self) -> bool {
        self.tripped
    }
}

impl Default for ConservationLaw {
    fn default() -> Self {
        Self::new(1e-6)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
