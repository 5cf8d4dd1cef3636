// Console and JSON output for the estimator CLI

use serde::Serialize;

use restart_odds::monte_carlo::MonteCarloReport;
use restart_odds::{CompletionDistribution, Decision, Recommendation};

// ─── Distribution Summary ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct DistributionSummary {
    pub resolved_mass: f64,
    pub completion_times: usize,
    pub conditional_mean: Option<f64>,
    pub median: Option<String>,
    pub p90: Option<String>,
}

impl DistributionSummary {
    pub fn from_distribution(dist: &CompletionDistribution) -> Self {
        Self {
            resolved_mass: dist.total_mass(),
            completion_times: dist.len(),
            conditional_mean: dist.conditional_mean(),
            median: dist.quantile(0.5).map(|t| t.to_string()),
            p90: dist.quantile(0.9).map(|t| t.to_string()),
        }
    }
}

// ─── Top-Level Report ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub decision: &'a Decision,
    pub recommendation: Recommendation,
    pub restart: DistributionSummary,
    #[serde(rename = "continue")]
    pub cont: DistributionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monte_carlo: Option<&'a MonteCarloReport>,
}

impl<'a> JsonReport<'a> {
    pub fn new(
        decision: &'a Decision,
        restart: &CompletionDistribution,
        cont: &CompletionDistribution,
        monte_carlo: Option<&'a MonteCarloReport>,
    ) -> Self {
        Self {
            decision,
            recommendation: decision.recommend(),
            restart: DistributionSummary::from_distribution(restart),
            cont: DistributionSummary::from_distribution(cont),
            monte_carlo,
        }
    }
}

// ─── Console ────────────────────────────────────────────────────────────────

fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn print_decision(decision: &Decision, restart: &CompletionDistribution, cont: &CompletionDistribution) {
    println!("probability that restarting will take longer: {}", decision.prob_restart_longer);
    println!("probability that continuing will take longer: {}", decision.prob_continue_longer);

    let restart = DistributionSummary::from_distribution(restart);
    let cont = DistributionSummary::from_distribution(cont);

    println!();
    println!("  {:<10} {:>10} {:>8} {:>10} {:>8} {:>8}", "Start", "Resolved", "Times", "Mean", "Median", "P90");
    println!("  {}", "-".repeat(59));
    for (label, s) in [("restart", &restart), ("continue", &cont)] {
        println!(
            "  {:<10} {:>10.6} {:>8} {:>10} {:>8} {:>8}",
            label,
            s.resolved_mass,
            s.completion_times,
            fmt_opt(s.conditional_mean.map(|m| format!("{:.3}", m))),
            fmt_opt(s.median.as_deref()),
            fmt_opt(s.p90.as_deref()),
        );
    }
    println!("  {}", "-".repeat(59));
    println!(
        "  Query: stage {} with {} lives | Transitions: {} | Scale factor: {:.6}",
        decision.query_stage_index, decision.query_lives, decision.transition_depth, decision.scale_factor
    );
    let verdict = match decision.recommend() {
        Recommendation::Restart => "RESTART",
        Recommendation::Continue => "CONTINUE",
        Recommendation::Indifferent => "EITHER",
    };
    println!("  Recommendation: {}\n", verdict);
}

pub fn print_monte_carlo(mc: &MonteCarloReport) {
    println!("  Monte Carlo cross-check: {} paired runs (ChaCha8Rng, seed {})", mc.runs, mc.seed);
    for (label, s) in [("restart", &mc.restart), ("continue", &mc.cont)] {
        println!(
            "    {:<10} completed {:>6.2}%  mean {:>8.3} ± {:<6.3}",
            label,
            s.completed_fraction * 100.0,
            s.time.mean,
            s.time.margin,
        );
    }
    println!(
        "    restart longer: {}  continue longer: {}\n",
        fmt_opt(mc.prob_restart_longer.map(|p| format!("{:.4}", p))),
        fmt_opt(mc.prob_continue_longer.map(|p| format!("{:.4}", p))),
    );
}
