// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Restart Odds Estimator
//
// Estimates whether restarting a multi-stage run or continuing from the
// current stage and life count is more likely to take longer, by propagating
// the completion-time distribution of both choices over a bounded horizon.

pub mod types;
pub mod config;
pub mod miss_rate;
pub mod state;
pub mod distribution;
pub mod conservation;
pub mod simulation;
pub mod compare;
pub mod decision;
pub mod trace;
pub mod monte_carlo;

pub use types::*;
pub use config::{Config, ConfigError};
pub use distribution::CompletionDistribution;
pub use simulation::{simulate, ForwardSimulation};
pub use compare::prob_greater;
pub use decision::{decide, Decision, DecisionError, Recommendation};
