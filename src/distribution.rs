// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Restart Odds Estimator - Completion Distribution

use std::collections::BTreeMap;

use crate::types::Elapsed;

/// Probability that a run completes at exactly each elapsed time.
///
/// Keys iterate in ascending time order. Entries only ever grow; total mass is
/// below one when the simulation horizon truncates long retry chains.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionDistribution {
    mass: BTreeMap<Elapsed, f64>,
}

impl CompletionDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from unordered `(time, mass)` pairs; repeated times merge.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Elapsed, f64)>) -> Self {
        let mut dist = Self::new();
        for (time, p) in pairs {
            dist.accumulate(time, p);
        }
        dist
    }

    /// Add absorbed mass at `time`. Non-positive mass is ignored.
    pub fn accumulate(&mut self, time: Elapsed, p: f64) {
        if p > 0.0 {
            *self.mass.entry(time).or_insert(0.0) += p;
        }
    }

    pub fn get(&self, time: &Elapsed) -> Option<f64> {
        self.mass.get(time).copied()
    }

    pub fn len(&self) -> usize {
        self.mass.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mass.is_empty()
    }

    pub fn total_mass(&self) -> f64 {
        self.mass.values().sum()
    }

    /// `(time, mass)` pairs in ascending time order.
    pub fn iter(&self) -> impl Iterator<Item = (Elapsed, f64)> + '_ {
        self.mass.iter().map(|(t, p)| (*t, *p))
    }

    pub fn times(&self) -> Vec<Elapsed> {
        self.mass.keys().copied().collect()
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.mass.values().copied().collect()
    }

    /// Mean completion time over the absorbed mass only.
    pub fn conditional_mean(&self) -> Option<f64> {
        let total = self.total_mass();
        if total <= 0.0 {
            return None;
        }
        let weighted: f64 = self.iter().map(|(t, p)| t.to_f64() * p).sum();
        Some(weighted / total)
    }

    /// Smallest time whose cumulative share of the absorbed mass reaches `q`.
    pub fn quantile(&self, q: f64) -> Option<Elapsed> {
        let total = self.total_mass();
        if total <= 0.0 || !(0.0..=1.0).contains(&q) {
            return None;
        }
        let target = q * total;
        let mut cumulative = 0.0;
        let mut last = None;
        for (time, p) in self.iter() {
            cumulative += p;
            last = Some(time);
            if cumulative >= target {
                return Some(time);
            }
        }
        // Float shortfall on q = 1.0
        last
    }
}
