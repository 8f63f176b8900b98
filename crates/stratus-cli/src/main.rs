//! STRATUS policy training CLI.
//!
//! Trains a linear threshold policy on the CartPole environment with
//! CMA-ES and optionally writes the training history and best weights as
//! JSON artifacts.

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use stratus_cma::{CmaConfig, CmaEs};
use stratus_control::{
    CartPole, LinearPolicy, ParallelEvaluator, SequentialEvaluator, TrainOutcome, Trainer,
    TrainerConfig,
};
use stratus_core::RolloutConfig;

#[derive(Parser, Debug)]
#[command(name = "stratus")]
#[command(version)]
#[command(about = "Evolution-strategy trainer for rollout-based control policies")]
struct Args {
    /// Policy parameter count (CartPole observations have 4 components)
    #[arg(long, default_value = "4")]
    dim: usize,

    /// Initial step size of the search distribution
    #[arg(long, default_value = "0.5")]
    sigma: f64,

    /// Candidates per generation
    #[arg(long, default_value = "8")]
    population: usize,

    /// Generation cap
    #[arg(long, default_value = "300")]
    generations: usize,

    /// Maximum environment steps per rollout
    #[arg(long, default_value = "100")]
    max_steps: usize,

    /// Stop after this many generations without improvement (0 disables)
    #[arg(long, default_value = "40")]
    stagnation: usize,

    /// Stop once a single rollout reaches this reward
    #[arg(long)]
    target_reward: Option<f64>,

    /// RNG seed for the optimizer and environment
    #[arg(long)]
    seed: Option<u64>,

    /// Evaluate candidates in parallel across the rayon pool
    #[arg(long)]
    parallel: bool,

    /// Write per-generation history JSON here
    #[arg(long)]
    history: Option<PathBuf>,

    /// Write best policy weights JSON here
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Log progress every N generations
    #[arg(long, default_value = "10")]
    log_every: usize,
}

/// On-disk shape of the saved best weights.
#[derive(Serialize)]
struct WeightsArtifact<'a> {
    saved_at: String,
    dim: usize,
    cost: f64,
    reward: f64,
    parameters: &'a [f64],
}

fn main() -> Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let args = Args::parse();

    log::info!("STRATUS policy training");
    log::info!("  Dimensions: {}", args.dim);
    log::info!("  Population: {}", args.population);
    log::info!("  Max generations: {}", args.generations);
    log::info!("  Rollout cap: {} steps", args.max_steps);
    log::info!(
        "  Evaluation: {}",
        if args.parallel { "parallel" } else { "sequential" }
    );

    let mut cma = CmaConfig::builder()
        .population_size(args.population)
        .max_generations(args.generations)
        .stagnation_window(args.stagnation)
        .build();
    // Target reward r means target cost -r
    cma.target_cost = args.target_reward.map(|r| -r);
    cma.seed = args.seed;

    let optimizer = CmaEs::new(vec![0.0; args.dim], args.sigma, cma)
        .context("failed to initialize optimizer")?;

    let rollout = RolloutConfig {
        max_steps: args.max_steps,
    };
    let trainer_config = TrainerConfig {
        log_every: args.log_every,
        record_projection: true,
    };

    let start = std::time::Instant::now();

    let outcome = if args.parallel {
        let dim = args.dim;
        let evaluator = ParallelEvaluator::new(
            move || LinearPolicy::new(dim),
            CartPole::new,
            rollout,
        );
        Trainer::new(optimizer, evaluator, trainer_config).run()?
    } else {
        let env = match args.seed {
            Some(seed) => CartPole::seeded(seed),
            None => CartPole::new(),
        };
        let evaluator = SequentialEvaluator::new(LinearPolicy::new(args.dim), env, rollout);
        Trainer::new(optimizer, evaluator, trainer_config).run()?
    };

    let elapsed = start.elapsed().as_secs_f64();
    log::info!("Training completed in {:.1}s", elapsed);
    log::info!("  Generations: {}", outcome.generations);
    log::info!("  Stop reason: {:?}", outcome.stop_reason);
    log::info!("  Best rollout reward: {:.2}", -outcome.best_cost);

    if let Some(path) = &args.history {
        outcome
            .history
            .save_json(path)
            .with_context(|| format!("failed to save history to {}", path.display()))?;
        log::info!("History saved to: {}", path.display());
    }

    if let Some(path) = &args.weights {
        save_weights(path, &args, &outcome)
            .with_context(|| format!("failed to save weights to {}", path.display()))?;
        log::info!("Best weights saved to: {}", path.display());
    }

    Ok(())
}

fn save_weights(path: &PathBuf, args: &Args, outcome: &TrainOutcome) -> Result<()> {
    let artifact = WeightsArtifact {
        saved_at: chrono::Utc::now().to_rfc3339(),
        dim: args.dim,
        cost: outcome.best_cost,
        reward: -outcome.best_cost,
        parameters: &outcome.best_parameters,
    };
    let json = serde_json::to_string_pretty(&artifact)?;
    std::fs::write(path, json)?;
    Ok(())
}
