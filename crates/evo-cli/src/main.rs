//! Evolve hyperparameters of a tracker on a MOT benchmark split.
//!
//! ```text
//! mot-evolve --tracking-method strongsort --benchmark MOT17 --device 0,1,2,3 --n-trials 100
//! mot-evolve --tracking-method ocsort --benchmark MOT16 --n-trials 1000 --resume
//! ```

use anyhow::Context;
use clap::Parser;
use evo_cli::{run_session, Options};
use evo_tracking::{CommandEvaluator, TrackerRegistry};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn enable_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    enable_tracing();

    let options = Options::parse();
    info!("{:?}", options);

    let registry = TrackerRegistry::with_builtin();
    let evaluation = options
        .evaluation_options()
        .context("invalid evaluation options")?;
    let session = options.session_options();
    let evaluator = CommandEvaluator::new(evaluation);

    let summary = run_session(&session, &registry, &evaluator)
        .await
        .with_context(|| format!("evolving {} failed", session.tracker))?;

    info!(
        "Done: {} trials in study, {} on the Pareto front, checkpoint at {}",
        summary.total_trials,
        summary.front_size,
        summary.checkpoint.display()
    );
    Ok(())
}
