// Restart Odds Estimator CLI
//
// Usage:
//   cargo run --release --bin restart-odds                            # Built-in preset (stage 4, 5 lives)
//   cargo run --release --bin restart-odds -- --config run.json       # Custom configuration
//   cargo run --release --bin restart-odds -- --stage 6 --lives 2     # Override the query
//   cargo run --release --bin restart-odds -- --depth 400             # Deeper horizon
//   cargo run --release --bin restart-odds -- --mc-runs 20000         # Monte Carlo cross-check
//   cargo run --release --bin restart-odds -- --trace traces          # Per-round JSONL output
//   cargo run --release --bin restart-odds -- --json                  # Machine-readable report

mod report;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use restart_odds::monte_carlo;
use restart_odds::trace::RoundTrace;
use restart_odds::{CompletionDistribution, Config, Decision, ForwardSimulation, StartState};

// ─── CLI Parsing ────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "restart-odds", version)]
#[command(about = "Estimate whether restarting a run or continuing it is more likely to take longer")]
struct Args {
    /// JSON configuration file (built-in preset when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stage index to continue from
    #[arg(long)]
    stage: Option<usize>,

    /// Lives held at that stage
    #[arg(long)]
    lives: Option<u32>,

    /// Number of transition rounds to simulate
    #[arg(long)]
    depth: Option<usize>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Directory for per-round JSONL traces (restart.jsonl, continue.jsonl)
    #[arg(long)]
    trace: Option<PathBuf>,

    /// Paired Monte Carlo runs to sample as a cross-check (0 disables)
    #[arg(long, default_value_t = 0)]
    mc_runs: usize,

    /// Base seed for the Monte Carlo sampler
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(depth) = args.depth {
        config.transition_depth = depth;
    }
    if args.stage.is_some() || args.lives.is_some() {
        let base = config.query_or_restart();
        let query = StartState::new(
            args.stage.unwrap_or(base.stage_index),
            args.lives.unwrap_or(base.lives),
        );
        config = config.with_query(query);
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run_simulation(
    config: &Config,
    start: StartState,
    traced: bool,
) -> Result<(CompletionDistribution, Option<RoundTrace>)> {
    let mut sim = ForwardSimulation::new(config, start)?;
    if traced {
        sim = sim.with_trace();
    }
    sim.run();
    if sim.conservation().is_tripped() {
        log::warn!(
            "{}: conservation tolerance exceeded (cumulative error {:.3e})",
            start,
            sim.conservation().cumulative_error
        );
    }
    Ok(sim.into_parts())
}

fn write_trace(dir: &Path, name: &str, trace: Option<&RoundTrace>) -> Result<()> {
    if let Some(trace) = trace {
        let path = dir.join(format!("{}.jsonl", name));
        trace
            .write_jsonl(&path)
            .with_context(|| format!("failed to write trace {}", path.display()))?;
        log::info!("wrote {} rounds to {}", trace.len(), path.display());
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;
    let query = config.query_or_restart();

    log::info!(
        "{} stages, lives bound {}, {} transitions, query {}",
        config.stage_count(),
        config.lives_bound(),
        config.transition_depth,
        query
    );

    let traced = args.trace.is_some();
    let (restart, restart_trace) = run_simulation(&config, config.restart_state(), traced)?;
    let (cont, continue_trace) = run_simulation(&config, query, traced)?;

    if let Some(dir) = &args.trace {
        write_trace(dir, "restart", restart_trace.as_ref())?;
        write_trace(dir, "continue", continue_trace.as_ref())?;
    }

    let decision = Decision::from_distributions(&restart, &cont, query, config.transition_depth)?;

    let mc = if args.mc_runs > 0 {
        Some(monte_carlo::estimate(&config, query, args.mc_runs, args.seed)?)
    } else {
        None
    };

    if args.json {
        let report = report::JsonReport::new(&decision, &restart, &cont, mc.as_ref());
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report::print_decision(&decision, &restart, &cont);
        if let Some(mc) = &mc {
            report::print_monte_carlo(mc);
        }
    }

    Ok(())
}
