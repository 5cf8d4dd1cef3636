// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Restart Odds Estimator - Monte Carlo Cross-Check
//
// Samples individual runs of the same chain the forward simulation propagates
// exactly: one attempt per round, same branch probabilities, same quantized
// times, same horizon. Agreement between the two is the check.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use crate::config::{Config, ConfigError};
use crate::simulation::{stage_steps, StageStep};
use crate::types::{Elapsed, StartState};

// ─── Run Sampler ────────────────────────────────────────────────────────────

/// Draws single runs from one start state.
#[derive(Debug, Clone)]
pub struct RunSampler {
    steps: Vec<StageStep>,
    start: StartState,
    cap: usize,
    reset_life: usize,
    depth: usize,
}

impl RunSampler {
    pub fn new(config: &Config, start: StartState) -> Result<Self, ConfigError> {
        config.validate()?;
        config.check_start(start)?;
        Ok(Self {
            steps: stage_steps(config)?,
            start,
            cap: config.lives_bound() - 1,
            reset_life: (config.start_lives - 1) as usize,
            depth: config.transition_depth,
        })
    }

    /// Completion time of one run, or `None` if it does not finish within
    /// the horizon.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<Elapsed> {
        let mut stage = self.start.stage_index;
        let mut life = (self.start.lives - 1) as usize;
        let mut time = Elapsed::ZERO;

        for _ in 0..self.depth {
            let step = &self.steps[stage];
            let roll: f64 = rng.gen();

            if roll < step.clear_rate {
                time = time.advance(step.duration);
                life = (life + step.life_gain).min(self.cap);
                stage += 1;
                if stage == self.steps.len() {
                    return Some(time);
                }
                continue;
            }

            let mut threshold = step.clear_rate;
            let mut loss = 1.0;
            let mut lost_lives = None;
            for lost in 1..life {
                loss *= step.miss_rate;
                threshold += loss;
                if roll < threshold {
                    lost_lives = Some(lost);
                    break;
                }
            }

            match lost_lives {
                Some(lost) => {
                    time = time.advance(step.duration);
                    life = (life - lost + step.life_gain).min(self.cap);
                }
                None => {
                    time = time.advance(step.half_duration);
                    stage = 0;
                    life = self.reset_life;
                }
            }
        }
        None
    }
}

// ─── Report ─────────────────────────────────────────────────────────────────

/// Two-sided 95% normal quantile.
const Z_95: f64 = 1.96;

/// Sampled mean completion time with its 95% confidence half-width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanTime {
    pub mean: f64,
    pub margin: f64,
}

impl MeanTime {
    /// Zero mean and margin for no samples; zero margin for one.
    fn from_times(times: &[f64]) -> Self {
        if times.is_empty() {
            return Self { mean: 0.0, margin: 0.0 };
        }
        let n = times.len() as f64;
        let mean = times.iter().sum::<f64>() / n;
        if times.len() == 1 {
            return Self { mean, margin: 0.0 };
        }
        let variance = times.iter().map(|t| (t - mean).powi(2)).sum::<f64>() / (n - 1.0);
        Self { mean, margin: Z_95 * (variance / n).sqrt() }
    }
}

/// Completion statistics for one start condition.
#[derive(Debug, Clone, Serialize)]
pub struct SampleSummary {
    pub completed: usize,
    pub completed_fraction: f64,
    /// Over finished runs only.
    pub time: MeanTime,
}

impl SampleSummary {
    fn from_outcomes(outcomes: &[Option<Elapsed>]) -> Self {
        let times: Vec<f64> = outcomes.iter().flatten().map(Elapsed::to_f64).collect();
        let runs = outcomes.len().max(1);
        Self {
            completed: times.len(),
            completed_fraction: times.len() as f64 / runs as f64,
            time: MeanTime::from_times(&times),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloReport {
    pub runs: usize,
    pub seed: u64,
    pub restart: SampleSummary,
    #[serde(rename = "continue")]
    pub cont: SampleSummary,
    /// Rescaled share of paired runs where restarting took strictly longer.
    pub prob_restart_longer: Option<f64>,
    pub prob_continue_longer: Option<f64>,
}

/// Sample `runs` paired restart/continue runs with a seeded `ChaCha8Rng`.
///
/// Pairs where either run misses the horizon or both finish at the same time
/// are left out of the probability estimate.
pub fn estimate(config: &Config, query: StartState, runs: usize, seed: u64) -> Result<MonteCarloReport, ConfigError> {
    let restart_sampler = RunSampler::new(config, config.restart_state())?;
    let continue_sampler = RunSampler::new(config, query)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let mut restart_outcomes = Vec::with_capacity(runs);
    let mut continue_outcomes = Vec::with_capacity(runs);
    for _ in 0..runs {
        restart_outcomes.push(restart_sampler.sample(&mut rng));
        continue_outcomes.push(continue_sampler.sample(&mut rng));
    }

    let mut restart_longer = 0usize;
    let mut continue_longer = 0usize;
    for (r, c) in restart_outcomes.iter().zip(&continue_outcomes) {
        if let (Some(r), Some(c)) = (r, c) {
            if r > c {
                restart_longer += 1;
            } else if c > r {
                continue_longer += 1;
            }
        }
    }
    let decided = restart_longer + continue_longer;
    let (prob_restart_longer, prob_continue_longer) = if decided > 0 {
        (
            Some(restart_longer as f64 / decided as f64),
            Some(continue_longer as f64 / decided as f64),
        )
    } else {
        (None, None)
    };

    log::debug!(
        "monte carlo: {} runs, {} decided pairs (seed {})",
        runs,
        decided,
        seed
    );

    Ok(MonteCarloReport {
        runs,
        seed,
        restart: SampleSummary::from_outcomes(&restart_outcomes),
        cont: SampleSummary::from_outcomes(&continue_outcomes),
        prob_restart_longer,
        prob_continue_longer,
    })
}

// ─── Tests ──────────────────────────────────────────────────────────────────
