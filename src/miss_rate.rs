// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Restart Odds Estimator - Miss Rate Derivation
//
// A stage's clear rate is the probability of clearing it without losing a
// life. Life losses are modelled as independent events with a common
// single-miss rate `s`, so P(k lives lost) = s^k and
//
//   s + s^2 + s^3 + ... = 1 - r   =>   s = (1 - r) / (2 - r)

use crate::types::Stage;

/// Single-life-loss probability for a stage with clear rate `clear_rate`.
///
/// Expects `0 < clear_rate <= 1`; a certain clear yields zero.
pub fn derive_miss_rate(clear_rate: f64) -> f64 {
    (1.0 - clear_rate) / (2.0 - clear_rate)
}

/// Miss rates parallel to `stages`.
pub fn miss_rates(stages: &[Stage]) -> Vec<f64> {
    stages.iter().map(|s| derive_miss_rate(s.clear_rate)).collect()
}
