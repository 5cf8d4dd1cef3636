// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Restart Odds Estimator - Restart vs Continue Decision
//
// Both raw probabilities fall short of summing to one: the finite horizon
// drops runs needing many restarts, and exact ties are excluded. The report
// rescales them to sum to one, assuming the lost mass splits proportionally
// and ties are negligible.

use serde::Serialize;

use crate::compare::prob_greater;
use crate::config::{Config, ConfigError};
use crate::distribution::CompletionDistribution;
use crate::simulation::simulate;
use crate::types::StartState;

/// Gap below which the two rescaled probabilities are reported as a tie.
pub const INDIFFERENCE_MARGIN: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no completion outcomes resolved within {transition_depth} transitions; increase the depth")]
    Unresolved { transition_depth: usize },
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Restart,
    Continue,
    Indifferent,
}

/// Outcome of comparing a restart against continuing from the query state.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    /// Rescaled probability that restarting takes longer.
    pub prob_restart_longer: f64,
    /// Rescaled probability that continuing takes longer.
    pub prob_continue_longer: f64,
    pub raw_restart_longer: f64,
    pub raw_continue_longer: f64,
    /// `1 / (raw_restart_longer + raw_continue_longer)`.
    pub scale_factor: f64,
    /// Completion mass absorbed within the horizon, restart condition.
    pub restart_resolved_mass: f64,
    /// Completion mass absorbed within the horizon, continue condition.
    pub continue_resolved_mass: f64,
    pub query_stage_index: usize,
    pub query_lives: u32,
    pub transition_depth: usize,
}

impl Decision {
    /// Compare precomputed completion distributions.
    pub fn from_distributions(
        restart: &CompletionDistribution,
        cont: &CompletionDistribution,
        query: StartState,
        transition_depth: usize,
    ) -> Result<Self, DecisionError> {
        let raw_restart_longer = prob_greater(restart, cont);
        let raw_continue_longer = prob_greater(cont, restart);
        let resolved = raw_restart_longer + raw_continue_longer;
        if resolved <= 0.0 {
            return Err(DecisionError::Unresolved { transition_depth });
        }
        let scale_factor = 1.0 / resolved;

        Ok(Self {
            prob_restart_longer: raw_restart_longer * scale_factor,
            prob_continue_longer: raw_continue_longer * scale_factor,
            raw_restart_longer,
            raw_continue_longer,
            scale_factor,
            restart_resolved_mass: restart.total_mass(),
            continue_resolved_mass: cont.total_mass(),
            query_stage_index: query.stage_index,
            query_lives: query.lives,
            transition_depth,
        })
    }

    /// The choice expected to finish sooner.
    pub fn recommend(&self) -> Recommendation {
        let gap = self.prob_restart_longer - self.prob_continue_longer;
        if gap.abs() < INDIFFERENCE_MARGIN {
            Recommendation::Indifferent
        } else if gap > 0.0 {
            Recommendation::Continue
        } else {
            Recommendation::Restart
        }
    }
}

/// Simulate a restart and a continue from `query`, then compare.
pub fn decide(config: &Config, query: StartState) -> Result<Decision, DecisionError> {
    let restart_state = config.restart_state();
    let restart = simulate(config, restart_state.stage_index, restart_state.lives)?;
    let cont = simulate(config, query.stage_index, query.lives)?;
    let decision = Decision::from_distributions(&restart, &cont, query, config.transition_depth)?;
    log::debug!(
        "query {}: raw restart-longer {:.6}, raw continue-longer {:.6}, scale {:.6}",
        query,
        decision.raw_restart_longer,
        decision.raw_continue_longer,
        decision.scale_factor
    );
    Ok(decision)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
