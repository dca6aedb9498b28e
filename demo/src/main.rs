//! stepwise reference runtime demo CLI.
//!
//! Runs one or all of the reference scenarios. Each scenario builds a fresh
//! runtime (policy gate, audit log, sandbox, verifiers, store) from the
//! optional `--config` file.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- plan
//!   cargo run -p demo -- backtrack
//!   cargo run -p demo -- --config stepwise.toml goal

mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use stepwise_contracts::error::StepwiseResult;
use stepwise_ref::scenarios::{backtracking, durable_goal, plan_execution};

use crate::config::RuntimeConfig;

// ── CLI definition ────────────────────────────────────────────────────────────

/// Policy-gated, sandboxed, resumable task execution demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "stepwise reference runtime demo",
    long_about = "Runs stepwise reference scenarios showing policy denial, sandboxed tool\n\
                  calls, backtracking fallback, and durable goals with retry and resume."
)]
struct Cli {
    /// TOML file with [policy], [sandbox] and [backoff] tables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three scenarios in sequence.
    RunAll,
    /// Scenario 1: Plan execution with a policy denial.
    Plan,
    /// Scenario 2: Backtracking fallback after a tool timeout.
    Backtrack,
    /// Scenario 3: Durable goal with retry and resume.
    Goal,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for the full pipeline trace.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    match run(&cli).await {
        Ok(()) => {
            println!("All selected scenarios completed successfully.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> StepwiseResult<()> {
    let config = match &cli.config {
        Some(path) => {
            debug!(path = %path.display(), "loading runtime config");
            RuntimeConfig::from_file(path)?
        }
        None => RuntimeConfig::default(),
    };

    match cli.command {
        Command::RunAll => {
            run_plan(&config).await?;
            run_backtrack(&config).await?;
            run_goal(&config).await
        }
        Command::Plan => run_plan(&config).await,
        Command::Backtrack => run_backtrack(&config).await,
        Command::Goal => run_goal(&config).await,
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

async fn run_plan(config: &RuntimeConfig) -> StepwiseResult<()> {
    plan_execution::run_scenario(&config.build_runtime()?).await?;
    Ok(())
}

async fn run_backtrack(config: &RuntimeConfig) -> StepwiseResult<()> {
    backtracking::run_scenario(&config.build_runtime()?).await?;
    Ok(())
}

async fn run_goal(config: &RuntimeConfig) -> StepwiseResult<()> {
    durable_goal::run_scenario(&config.build_runtime()?).await?;
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("stepwise: Autonomous Task Execution Core");
    println!("Reference Demo");
    println!("=========================================");
    println!();
    println!("Per tool call:");
    println!("  [1] Policy gate evaluates tool:<name> for the principal; decision audited");
    println!("  [2] Sandbox validates input against the tool's schema");
    println!("  [3] Rate limit and credit budget checked per principal");
    println!("  [4] Tool body raced against its timeout; attempt is charged");
    println!("  [5] Output sanitized before it leaves the sandbox");
    println!();
}
