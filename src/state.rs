// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Restart Odds Estimator - Probability State
//
// Sparse map from elapsed time to a dense (stage, life index) grid of mass.
// Row `stages` is the "run complete" sentinel. Reads never create buckets;
// only `deposit` inserts, and only for positive mass.

use std::collections::BTreeMap;

use crate::config::Config;
use crate::types::Elapsed;

// ─── State Space ────────────────────────────────────────────────────────────

/// Shape of every grid in a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateSpace {
    stages: usize,
    lives_bound: usize,
}

impl StateSpace {
    pub fn new(stages: usize, lives_bound: usize) -> Self {
        Self { stages, lives_bound }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.stage_count(), config.lives_bound())
    }

    /// Rows per grid: every stage plus the sentinel.
    pub fn rows(&self) -> usize {
        self.stages + 1
    }

    /// Row index of the completed-run sentinel.
    pub fn sentinel(&self) -> usize {
        self.stages
    }

    pub fn lives_bound(&self) -> usize {
        self.lives_bound
    }

    /// Highest valid life index.
    pub fn max_life_index(&self) -> usize {
        self.lives_bound.saturating_sub(1)
    }
}

// ─── Life Grid ──────────────────────────────────────────────────────────────

/// Dense `(stage, life index)` probability grid for one elapsed time.
#[derive(Debug, Clone, PartialEq)]
pub struct LifeGrid {
    cols: usize,
    mass: Vec<f64>,
}

impl LifeGrid {
    pub fn zeros(space: StateSpace) -> Self {
        Self {
            cols: space.lives_bound(),
            mass: vec![0.0; space.rows() * space.lives_bound()],
        }
    }

    pub fn get(&self, stage: usize, life: usize) -> f64 {
        self.mass[stage * self.cols + life]
    }

    pub fn add(&mut self, stage: usize, life: usize, p: f64) {
        self.mass[stage * self.cols + life] += p;
    }

    /// Zero a row and return the mass it held.
    pub fn take_row(&mut self, stage: usize) -> f64 {
        let row = &mut self.mass[stage * self.cols..(stage + 1) * self.cols];
        let total = row.iter().sum();
        row.fill(0.0);
        total
    }

    pub fn total(&self) -> f64 {
        self.mass.iter().sum()
    }

    /// Cells holding positive mass as `(stage, life index, mass)`.
    pub fn populated(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let cols = self.cols;
        self.mass
            .iter()
            .enumerate()
            .filter(|(_, p)| **p > 0.0)
            .map(move |(idx, p)| (idx / cols, idx % cols, *p))
    }
}

// ─── Probability State ──────────────────────────────────────────────────────

/// Joint mass over (elapsed time, stage, life index), ordered by time.
#[derive(Debug, Clone)]
pub struct ProbabilityState {
    space: StateSpace,
    buckets: BTreeMap<Elapsed, LifeGrid>,
}

impl ProbabilityState {
    pub fn new(space: StateSpace) -> Self {
        Self { space, buckets: BTreeMap::new() }
    }

    pub fn space(&self) -> StateSpace {
        self.space
    }

    /// Add mass to a cell, creating the time bucket on first use.
    /// Non-positive mass is ignored.
    pub fn deposit(&mut self, time: Elapsed, stage: usize, life: usize, p: f64) {
        if p <= 0.0 {
            return;
        }
        let space = self.space;
        self.buckets
            .entry(time)
            .or_insert_with(|| LifeGrid::zeros(space))
            .add(stage, life, p);
    }

    /// Mass in one cell; zero for absent buckets.
    pub fn mass_at(&self, time: &Elapsed, stage: usize, life: usize) -> f64 {
        self.buckets.get(time).map_or(0.0, |g| g.get(stage, life))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Elapsed, &LifeGrid)> {
        self.buckets.iter()
    }

    /// Number of distinct time buckets.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn total_mass(&self) -> f64 {
        self.buckets.values().map(LifeGrid::total).sum()
    }

    /// Remove all sentinel-row mass, returning `(time, mass)` for each bucket
    /// that held some. Buckets left empty are dropped.
    pub fn drain_completed(&mut self) -> Vec<(Elapsed, f64)> {
        let sentinel = self.space.sentinel();
        let mut completed = Vec::new();
        self.buckets.retain(|time, grid| {
            let mass = grid.take_row(sentinel);
            if mass > 0.0 {
                completed.push((*time, mass));
            }
            grid.populated().next().is_some()
        });
        completed
    }

    /// Largest life index with positive mass anywhere in the state.
    pub fn max_populated_life(&self) -> Option<usize> {
        self.buckets
            .values()
            .flat_map(|g| g.populated().map(|(_, life, _)| life))
            .max()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn space() -> StateSpace {
        StateSpace::new(2, 3)
    }

    #[test]
    fn test_space_shape() {
        let s = space();
        assert_eq!(s.rows(), 3);
        assert_eq!(s.sentinel(), 2);
        assert_eq!(s.max_life_index(), 2);
    }

    #[test]
    fn test_reads_do_not_create_buckets() {
        let state = ProbabilityState::new(space());
        assert_eq!(state.mass_at(&Elapsed(dec!(1.0)), 0, 0), 0.0);
        assert_eq!(state.total_mass(), 0.0);
        assert!(state.is_empty());
    }

    #[test]
    fn test_deposit_merges_same_time() {
        let mut state = ProbabilityState::new(space());
        state.deposit(Elapsed(dec!(0.5)), 1, 2, 0.25);
        state.deposit(Elapsed(dec!(0.50)), 1, 2, 0.25);
        state.deposit(Elapsed(dec!(0.7)), 0, 0, 0.0);
        assert_eq!(state.len(), 1);
        assert!((state.mass_at(&Elapsed(dec!(0.5)), 1, 2) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_drain_completed_removes_sentinel_mass() {
        let mut state = ProbabilityState::new(space());
        state.deposit(Elapsed(dec!(1.0)), 2, 0, 0.2);
        state.deposit(Elapsed(dec!(1.0)), 2, 1, 0.1);
        state.deposit(Elapsed(dec!(1.0)), 0, 1, 0.3);
        state.deposit(Elapsed(dec!(2.0)), 2, 2, 0.4);

        let drained = state.drain_completed();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].0, Elapsed(dec!(1.0)));
        assert!((drained[0].1 - 0.3).abs() < 1e-15);
        assert!((drained[1].1 - 0.4).abs() < 1e-15);

        // Bucket at 2.0 held only completed mass and is gone
        assert_eq!(state.len(), 1);
        assert!((state.total_mass() - 0.3).abs() < 1e-15);
    }

    #[test]
    fn test_max_populated_life() {
        let mut state = ProbabilityState::new(space());
        assert_eq!(state.max_populated_life(), None);
        state.deposit(Elapsed(dec!(0.1)), 0, 1, 0.5);
        state.deposit(Elapsed(dec!(0.2)), 1, 2, 0.5);
        assert_eq!(state.max_populated_life(), Some(2));
    }

    #[test]
    fn test_grid_populated_and_take_row() {
        let mut grid = LifeGrid::zeros(space());
        grid.add(1, 0, 0.25);
        grid.add(1, 2, 0.5);
        assert_eq!(grid.get(1, 1), 0.0);
        let cells: Vec<_> = grid.populated().collect();
        assert_eq!(cells, vec![(1, 0, 0.25), (1, 2, 0.5)]);
        assert!((grid.take_row(1) - 0.75).abs() < 1e-15);
        assert_eq!(grid.total(), 0.0);
    }
}
