// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Restart Odds Estimator - Forward Simulation
//
// Propagates the joint mass over (elapsed time, stage, lives) one attempt per
// round. Each populated cell splits three ways:
//
//   clear, no loss     -> next stage, time + nominal
//   clear, k lost      -> same stage, time + nominal, k in 1..life_index
//   all lives lost     -> stage 0 with starting lives, time + nominal / 2
//
// Mass reaching the sentinel row is absorbed into the completion distribution
// at the end of the round and leaves the active state.

use crate::config::{stage_duration, Config, ConfigError};
use crate::conservation::{ConservationLaw, ConservationResult};
use crate::distribution::CompletionDistribution;
use crate::miss_rate::miss_rates;
use crate::state::{ProbabilityState, StateSpace};
use crate::trace::{RoundRecord, RoundTrace};
use crate::types::{Elapsed, StartState};

// ─── Stage Steps ────────────────────────────────────────────────────────────

/// Per-stage transition parameters, resolved once per simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct StageStep {
    pub clear_rate: f64,
    pub miss_rate: f64,
    pub life_gain: usize,
    pub duration: f64,
    /// Time spent on a failed attempt.
    pub half_duration: f64,
}

pub(crate) fn stage_steps(config: &Config) -> Result<Vec<StageStep>, ConfigError> {
    config
        .stages
        .iter()
        .zip(miss_rates(&config.stages))
        .enumerate()
        .map(|(idx, (stage, miss_rate))| {
            let duration = stage_duration(idx, stage)?;
            Ok(StageStep {
                clear_rate: stage.clear_rate,
                miss_rate,
                life_gain: stage.life_gain as usize,
                duration,
                half_duration: duration / 2.0,
            })
        })
        .collect()
}

// ─── ForwardSimulation ──────────────────────────────────────────────────────

/// A single simulation from one start state.
///
/// Owns its probability state for its whole lifetime; only the completion
/// distribution escapes via [`into_completion`](Self::into_completion).
#[derive(Debug, Clone)]
pub struct ForwardSimulation {
    space: StateSpace,
    steps: Vec<StageStep>,
    reset_life: usize,
    depth: usize,
    round: usize,
    state: ProbabilityState,
    completion: CompletionDistribution,
    conservation: ConservationLaw,
    trace: Option<RoundTrace>,
}

impl ForwardSimulation {
    /// Seed unit mass at time zero in `start`.
    pub fn new(config: &Config, start: StartState) -> Result<Self, ConfigError> {
        config.validate()?;
        config.check_start(start)?;

        let space = StateSpace::from_config(config);
        let mut state = ProbabilityState::new(space);
        state.deposit(Elapsed::ZERO, start.stage_index, (start.lives - 1) as usize, 1.0);

        Ok(Self {
            space,
            steps: stage_steps(config)?,
            reset_life: (config.start_lives - 1) as usize,
            depth: config.transition_depth,
            round: 0,
            state,
            completion: CompletionDistribution::new(),
            conservation: ConservationLaw::default(),
            trace: None,
        })
    }

    /// Record a [`RoundRecord`] after every round.
    pub fn with_trace(mut self) -> Self {
        self.trace = Some(RoundTrace::new());
        self
    }

    /// Rounds completed so far.
    pub fn round(&self) -> usize {
        self.round
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_finished(&self) -> bool {
        self.round >= self.depth
    }

    pub fn space(&self) -> StateSpace {
        self.space
    }

    pub fn state(&self) -> &ProbabilityState {
        &self.state
    }

    pub fn completion(&self) -> &CompletionDistribution {
        &self.completion
    }

    pub fn conservation(&self) -> &ConservationLaw {
        &self.conservation
    }

    pub fn trace(&self) -> Option<&RoundTrace> {
        self.trace.as_ref()
    }

    pub fn active_mass(&self) -> f64 {
        self.state.total_mass()
    }

    pub fn absorbed_mass(&self) -> f64 {
        self.completion.total_mass()
    }

    /// Largest life index holding mass in the active state.
    pub fn max_populated_life(&self) -> Option<usize> {
        self.state.max_populated_life()
    }

    /// Advance one round, ignoring the configured depth.
    pub fn step(&mut self) -> ConservationResult {
        let cap = self.space.max_life_index();
        let mut next = ProbabilityState::new(self.space);

        for (time, grid) in self.state.iter() {
            for (stage, life, p) in grid.populated() {
                let step = &self.steps[stage];
                let cleared_at = time.advance(step.duration);

                // Section cleared; no lives lost
                next.deposit(cleared_at, stage + 1, (life + step.life_gain).min(cap), p * step.clear_rate);

                // Section cleared; some lives lost. Stage index is kept.
                let mut loss = 1.0;
                let mut lost_mass = 0.0;
                for lost in 1..life {
                    loss *= step.miss_rate;
                    lost_mass += loss;
                    next.deposit(cleared_at, stage, (life - lost + step.life_gain).min(cap), p * loss);
                }

                // All lives lost; half the section time is spent before failing
                let failed = (1.0 - step.clear_rate - lost_mass).max(0.0);
                next.deposit(time.advance(step.half_duration), 0, self.reset_life, p * failed);
            }
        }

        self.state = next;
        for (time, mass) in self.state.drain_completed() {
            self.completion.accumulate(time, mass);
        }
        self.round += 1;

        let active = self.state.total_mass();
        let absorbed = self.completion.total_mass();
        let result = self.conservation.verify_round(active, absorbed);
        if !result.balanced {
            log::warn!(
                "round {}: probability mass off by {:.3e} (active {:.12}, absorbed {:.12})",
                self.round,
                result.error,
                active,
                absorbed
            );
        }
        log::trace!(
            "round {}: {} buckets, active {:.6}, absorbed {:.6}",
            self.round,
            self.state.len(),
            active,
            absorbed
        );

        if let Some(trace) = self.trace.as_mut() {
            trace.record(RoundRecord {
                round: self.round,
                active_mass: active,
                absorbed_mass: absorbed,
                time_buckets: self.state.len(),
                completion_times: self.completion.len(),
                conservation_error: result.error,
            });
        }

        result
    }

    /// Run the remaining rounds up to the configured depth.
    pub fn run(&mut self) {
        while !self.is_finished() {
            self.step();
        }
        log::debug!(
            "simulated {} rounds: {} completion times, absorbed {:.6}, worst conservation error {:.3e}",
            self.round,
            self.completion.len(),
            self.completion.total_mass(),
            self.conservation.worst_error
        );
    }

    pub fn into_completion(self) -> CompletionDistribution {
        self.completion
    }

    pub fn into_parts(self) -> (CompletionDistribution, Option<RoundTrace>) {
        (self.completion, self.trace)
    }
}

/// Completion-time distribution of a run starting at `stage_index` holding
/// `lives`, after `config.transition_depth` rounds.
pub fn simulate(config: &Config, stage_index: usize, lives: u32) -> Result<CompletionDistribution, ConfigError> {
    let mut sim = ForwardSimulation::new(config, StartState::new(stage_index, lives))?;
    sim.run();
    Ok(sim.into_completion())
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::miss_rate::derive_miss_rate;
    use crate::types::Stage;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn at(d: Decimal) -> Elapsed {
        Elapsed(d)
    }

    #[test]
    fn test_stage_steps_resolve_durations() {
        let config = Config::new(3, 2, vec![Stage::new(0.5, 0.3, 1)], 1);
        let steps = stage_steps(&config).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].duration, 0.3);
        assert_eq!(Elapsed::ZERO.advance(steps[0].half_duration), at(dec!(0.15)));
        assert!((steps[0].miss_rate - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(steps[0].life_gain, 1);
    }

    #[test]
    fn test_seeded_with_unit_mass() {
        let config = Config::new(5, 3, vec![Stage::new(0.5, 1.0, 0), Stage::new(0.5, 1.0, 0)], 4);
        let sim = ForwardSimulation::new(&config, StartState::new(1, 2)).unwrap();
        assert_eq!(sim.round(), 0);
        assert_eq!(sim.state().mass_at(&Elapsed::ZERO, 1, 1), 1.0);
        assert_eq!(sim.active_mass(), 1.0);
        assert!(sim.completion().is_empty());
    }

    #[test]
    fn test_rejects_out_of_range_start() {
        let config = Config::new(3, 3, vec![Stage::new(0.5, 1.0, 0)], 1);
        assert!(matches!(
            ForwardSimulation::new(&config, StartState::new(1, 1)),
            Err(ConfigError::StageOutOfRange { .. })
        ));
        assert!(matches!(
            ForwardSimulation::new(&config, StartState::new(0, 4)),
            Err(ConfigError::LivesOutOfRange { .. })
        ));
    }

    #[test]
    fn test_single_life_has_only_clear_or_fail() {
        // 1 life: no "cleared with losses" branch
        let config = Config::new(1, 1, vec![Stage::new(0.5, 2.0, 0), Stage::new(0.5, 2.0, 0)], 1);
        let mut sim = ForwardSimulation::new(&config, StartState::new(0, 1)).unwrap();
        sim.step();
        assert!((sim.state().mass_at(&at(dec!(2.0)), 1, 0) - 0.5).abs() < 1e-15);
        assert!((sim.state().mass_at(&at(dec!(1.0)), 0, 0) - 0.5).abs() < 1e-15);
        assert_eq!(sim.state().len(), 2);
    }

    #[test]
    fn test_two_lives_have_no_partial_loss_branch() {
        let config = Config::new(2, 2, vec![Stage::new(0.6, 1.0, 0), Stage::new(0.5, 1.0, 0)], 1);
        let mut sim = ForwardSimulation::new(&config, StartState::new(0, 2)).unwrap();
        sim.step();
        // Clear keeps life index 1; failure resets to stage 0 with index 1
        assert!((sim.state().mass_at(&at(dec!(1.0)), 1, 1) - 0.6).abs() < 1e-15);
        assert!((sim.state().mass_at(&at(dec!(0.5)), 0, 1) - 0.4).abs() < 1e-15);
        assert_eq!(sim.state().mass_at(&at(dec!(1.0)), 0, 0), 0.0);
    }

    #[test]
    fn test_lives_lost_branch_keeps_stage() {
        // 4 lives (index 3): k = 1, 2 lost-but-cleared branches
        let rate = 0.5;
        let s = derive_miss_rate(rate);
        let config = Config::new(4, 4, vec![Stage::new(rate, 1.0, 0), Stage::new(1.0, 1.0, 0)], 1);
        let mut sim = ForwardSimulation::new(&config, StartState::new(0, 4)).unwrap();
        sim.step();

        let st = sim.state();
        let one = at(dec!(1.0));
        assert!((st.mass_at(&one, 1, 3) - rate).abs() < 1e-15);
        assert!((st.mass_at(&one, 0, 2) - s).abs() < 1e-15);
        assert!((st.mass_at(&one, 0, 1) - s * s).abs() < 1e-15);
        let failed = 1.0 - rate - s - s * s;
        assert!((st.mass_at(&at(dec!(0.5)), 0, 3) - failed).abs() < 1e-15);
    }

    #[test]
    fn test_life_gain_capped_at_bound() {
        // bound = min(3, 2 + 5) = 3
        let config = Config::new(3, 2, vec![Stage::new(1.0, 1.0, 5), Stage::new(1.0, 1.0, 0)], 1);
        let mut sim = ForwardSimulation::new(&config, StartState::new(0, 2)).unwrap();
        assert_eq!(sim.space().lives_bound(), 3);
        sim.step();
        assert_eq!(sim.state().mass_at(&at(dec!(1.0)), 1, 2), 1.0);
    }

    #[test]
    fn test_deterministic_clear() {
        let config = Config::new(1, 1, vec![Stage::new(1.0, 1.0, 0)], 1);
        let dist = simulate(&config, 0, 1).unwrap();
        assert_eq!(dist.len(), 1);
        assert_eq!(dist.get(&at(dec!(1.0))), Some(1.0));
    }

    #[test]
    fn test_zero_depth_is_empty() {
        let config = Config::new(1, 1, vec![Stage::new(1.0, 1.0, 0)], 0);
        assert!(simulate(&config, 0, 1).unwrap().is_empty());
    }

    #[test]
    fn test_absorbed_mass_leaves_active_state() {
        let config = Config::new(1, 1, vec![Stage::new(0.5, 2.0, 0)], 1);
        let mut sim = ForwardSimulation::new(&config, StartState::new(0, 1)).unwrap();
        sim.step();
        assert!((sim.absorbed_mass() - 0.5).abs() < 1e-15);
        assert!((sim.active_mass() - 0.5).abs() < 1e-15);
        assert_eq!(sim.state().max_populated_life(), Some(0));
    }

    #[test]
    fn test_trace_records_each_round() {
        let config = Config::new(2, 2, vec![Stage::new(0.7, 1.0, 0)], 5);
        let mut sim = ForwardSimulation::new(&config, StartState::new(0, 2)).unwrap().with_trace();
        sim.run();
        let trace = sim.trace().unwrap();
        assert_eq!(trace.len(), 5);
        assert_eq!(trace.records()[4].round, 5);
        for record in trace.records() {
            assert!(record.conservation_error < 1e-9);
        }
        assert!(!sim.conservation().is_tripped());
    }

    #[test]
    fn test_failure_time_rounds_like_float_sum() {
        // Half of 0.31 is stored just below 0.155, so failure costs 0.15
        let config = Config::new(1, 1, vec![Stage::new(0.5, 0.31, 0)], 2);
        let dist = simulate(&config, 0, 1).unwrap();
        assert_eq!(dist.times(), vec![at(dec!(0.31)), at(dec!(0.46))]);
        assert_eq!(dist.probabilities(), vec![0.5, 0.25]);
    }

    #[test]
    fn test_failure_time_above_midpoint_rounds_up() {
        // Half of 0.45 is stored just above 0.225, so failure costs 0.23
        let config = Config::new(1, 1, vec![Stage::new(0.5, 0.45, 0)], 2);
        let mut sim = ForwardSimulation::new(&config, StartState::new(0, 1)).unwrap();
        sim.step();
        assert_eq!(sim.state().mass_at(&at(dec!(0.23)), 0, 0), 0.5);
        sim.step();
        assert_eq!(sim.completion().get(&at(dec!(0.68))), Some(0.25));
    }

    #[test]
    fn test_run_stops_at_depth() {
        let config = Config::new(2, 2, vec![Stage::new(0.7, 1.0, 0)], 3);
        let mut sim = ForwardSimulation::new(&config, StartState::new(0, 2)).unwrap();
        sim.run();
        assert_eq!(sim.round(), 3);
        sim.run();
        assert_eq!(sim.round(), 3);
        assert!(sim.is_finished());
    }
}
