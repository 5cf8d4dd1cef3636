// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Restart Odds Estimator - Configuration
//
// Run configuration: life caps, the ordered stage list, simulation depth and
// the "continue from here" query. Validation happens once, up front; a config
// that fails it never reaches the simulator.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::{Stage, StartState};

/// Default number of transition rounds.
pub const DEFAULT_TRANSITION_DEPTH: usize = 200;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons a configuration or start state is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("at least one stage is required")]
    NoStages,

    #[error("start_lives must be positive")]
    ZeroStartLives,

    #[error("start_lives ({start_lives}) exceeds max_lives ({max_lives})")]
    StartLivesExceedMax { start_lives: u32, max_lives: u32 },

    #[error("stage {stage}: clear rate {rate} is outside (0, 1]")]
    InvalidClearRate { stage: usize, rate: f64 },

    #[error("stage {stage}: nominal time {time} must be positive and finite")]
    InvalidNominalTime { stage: usize, time: f64 },

    #[error("stage index {stage} out of range (run has {stages} stages)")]
    StageOutOfRange { stage: usize, stages: usize },

    #[error("lives {lives} out of range (expected 1..={start_lives})")]
    LivesOutOfRange { lives: u32, start_lives: u32 },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn default_transition_depth() -> usize {
    DEFAULT_TRANSITION_DEPTH
}

/// Full description of a run and the simulation depth used to evaluate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Hard cap on lives held at any time.
    pub max_lives: u32,
    /// Lives held at the start of a fresh run.
    #[serde(alias = "lives")]
    pub start_lives: u32,
    /// Ordered stages; clearing the last one completes the run.
    #[serde(alias = "sections")]
    pub stages: Vec<Stage>,
    /// Number of transition rounds to propagate.
    #[serde(default = "default_transition_depth", alias = "transitions")]
    pub transition_depth: usize,
    /// The "continue from here" condition compared against a restart.
    #[serde(default)]
    pub query: Option<StartState>,
}

impl Default for Config {
    /// Built-in eight-stage preset.
    fn default() -> Self {
        Self {
            max_lives: 9,
            start_lives: 5,
            stages: vec![
                Stage::new(0.98, 0.4, 0),
                Stage::new(0.92, 0.4, 0),
                Stage::new(0.80, 0.5, 1),
                Stage::new(0.40, 0.3, 0),
                Stage::new(0.59, 0.7, 0),
                Stage::new(0.25, 0.5, 1),
                Stage::new(0.63, 0.4, 0),
                Stage::new(0.44, 0.6, 0),
            ],
            transition_depth: DEFAULT_TRANSITION_DEPTH,
            query: Some(StartState::new(4, 5)),
        }
    }
}

impl Config {
    pub fn new(max_lives: u32, start_lives: u32, stages: Vec<Stage>, transition_depth: usize) -> Self {
        Self { max_lives, start_lives, stages, transition_depth, query: None }
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn with_transition_depth(mut self, transition_depth: usize) -> Self {
        self.transition_depth = transition_depth;
        self
    }

    pub fn with_query(mut self, query: StartState) -> Self {
        self.query = Some(query);
        self
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// The canonical restart condition: first stage, full starting lives.
    pub fn restart_state(&self) -> StartState {
        StartState::new(0, self.start_lives)
    }

    /// The configured query, or the restart condition when none is set.
    pub fn query_or_restart(&self) -> StartState {
        self.query.unwrap_or_else(|| self.restart_state())
    }

    /// Upper bound on lives reachable during a simulation.
    ///
    /// `min(max_lives, start_lives + sum of life gains)`; counts above it can
    /// never be populated, so the life dimension of the grid stops here.
    pub fn lives_bound(&self) -> usize {
        let gains: u64 = self.stages.iter().map(|s| u64::from(s.life_gain)).sum();
        let reachable = u64::from(self.start_lives) + gains;
        reachable.min(u64::from(self.max_lives)) as usize
    }

    /// Check every static invariant of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stages.is_empty() {
            return Err(ConfigError::NoStages);
        }
        if self.start_lives == 0 {
            return Err(ConfigError::ZeroStartLives);
        }
        if self.start_lives > self.max_lives {
            return Err(ConfigError::StartLivesExceedMax {
                start_lives: self.start_lives,
                max_lives: self.max_lives,
            });
        }
        for (idx, stage) in self.stages.iter().enumerate() {
            if !(stage.clear_rate > 0.0 && stage.clear_rate <= 1.0) {
                return Err(ConfigError::InvalidClearRate { stage: idx, rate: stage.clear_rate });
            }
            stage_duration(idx, stage)?;
        }
        if let Some(query) = self.query {
            self.check_start(query)?;
        }
        Ok(())
    }

    /// Check that a simulation may begin from `start`.
    pub fn check_start(&self, start: StartState) -> Result<(), ConfigError> {
        if start.stage_index >= self.stages.len() {
            return Err(ConfigError::StageOutOfRange {
                stage: start.stage_index,
                stages: self.stages.len(),
            });
        }
        if start.lives == 0 || start.lives > self.start_lives {
            return Err(ConfigError::LivesOutOfRange {
                lives: start.lives,
                start_lives: self.start_lives,
            });
        }
        Ok(())
    }
}

/// Nominal stage time, checked to be positive and representable as a time key.
pub(crate) fn stage_duration(idx: usize, stage: &Stage) -> Result<f64, ConfigError> {
    let invalid = || ConfigError::InvalidNominalTime { stage: idx, time: stage.nominal_time };
    if !stage.nominal_time.is_finite() || stage.nominal_time <= 0.0 {
        return Err(invalid());
    }
    match Decimal::from_f64_retain(stage.nominal_time) {
        Some(d) if d > Decimal::ZERO => Ok(stage.nominal_time),
        _ => Err(invalid()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
