use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use trolley_cli::demo::{demo_decisions, run_against_demo_store};
use trolley_cli::{DecisionPort, HttpDecisionClient, LoopConfig};

/// Drive an automation task against the built-in demo storefront.
///
/// Without `--decide-url` the decisions come from a bundled script that
/// buys organic milk; with it, every step is decided by the remote service.
#[derive(Debug, Parser)]
#[command(name = "trolley", version, about)]
struct Args {
    /// Natural-language task to run.
    #[arg(default_value = "buy organic milk")]
    task: String,

    /// Base URL of a remote decision service.
    #[arg(long)]
    decide_url: Option<String>,

    /// Maximum loop iterations before the task times out.
    #[arg(long, default_value_t = LoopConfig::default().max_steps)]
    max_steps: u32,

    /// Milliseconds to wait between a command and the next observation.
    #[arg(long, default_value_t = LoopConfig::default().settle_ms)]
    settle_ms: u64,

    /// Per-call decision service budget in milliseconds.
    #[arg(long, default_value_t = LoopConfig::default().decision_timeout_ms)]
    decision_timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = LoopConfig {
        max_steps: args.max_steps,
        settle_ms: args.settle_ms,
        decision_timeout_ms: args.decision_timeout_ms,
    };

    let decider: Arc<dyn DecisionPort> = match &args.decide_url {
        Some(url) => Arc::new(HttpDecisionClient::new(url)),
        None => Arc::new(demo_decisions()),
    };

    let envelope = run_against_demo_store(&args.task, config, decider)
        .await
        .context("task could not be started")?;

    println!("{}", serde_json::to_string_pretty(&envelope)?);
    if !envelope.success {
        std::process::exit(1);
    }
    Ok(())
}
