//! QUOTEFORGE Print-Shop Reference Runtime: Demo CLI
//!
//! Runs the reference scenarios, or executes one pricing function against one
//! input through the sandboxed Execution Engine.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- print-shop
//!   cargo run -p demo -- fault-isolation
//!   cargo run -p demo -- execute --schema s.json --function f.rhai --input '{"quantity": 3}'
//!   cargo run -p demo -- --config quoteforge.toml run-all

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use quoteforge_contracts::error::{QuoteforgeError, QuoteforgeResult};
use quoteforge_core::{config::QuoteforgeConfig, traits::QuoteExecutor};
use quoteforge_ref_pricing::scenarios::{fault_isolation, print_shop};
use quoteforge_runner::{sink_for, ExecutionEngine};

// ── CLI definition ────────────────────────────────────────────────────────────

/// QUOTEFORGE: generated pricing functions, versioned and verified.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "QUOTEFORGE print-shop reference runtime demo",
    long_about = "Runs QUOTEFORGE demo scenarios showing checkpoint history,\n\
                  sandboxed execution, dataset verification, and fault isolation."
)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run both scenarios in sequence.
    RunAll,
    /// Scenario 1: build and verify a print-shop pricing agent.
    PrintShop,
    /// Scenario 2: contain throwing and looping functions.
    FaultIsolation,
    /// Execute one function against one input and print the result as JSON.
    Execute {
        /// File holding the JSON Schema source.
        #[arg(long)]
        schema: PathBuf,
        /// File holding the pricing function source.
        #[arg(long)]
        function: PathBuf,
        /// Input document as inline JSON.
        #[arg(long)]
        input: String,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Command::RunAll => {
                print_banner();
                run_all(&config).await
            }
            Command::PrintShop => {
                print_banner();
                print_shop::run_scenario(&config).await.map(|_| ())
            }
            Command::FaultIsolation => {
                print_banner();
                fault_isolation::run_scenario(&config).await.map(|_| ())
            }
            Command::Execute {
                schema,
                function,
                input,
            } => execute(&config, &schema, &function, &input).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> QuoteforgeResult<QuoteforgeConfig> {
    match path {
        Some(path) => QuoteforgeConfig::from_file(path),
        None => Ok(QuoteforgeConfig::default()),
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────

async fn run_all(config: &QuoteforgeConfig) -> QuoteforgeResult<()> {
    print_shop::run_scenario(config).await?;
    fault_isolation::run_scenario(config).await?;
    println!("All selected scenarios completed successfully.");
    Ok(())
}

async fn execute(config: &QuoteforgeConfig, schema: &Path, function: &Path, input: &str) -> QuoteforgeResult<()> {
    let schema = read_source(schema)?;
    let function = read_source(function)?;
    let input: serde_json::Value = serde_json::from_str(input).map_err(|e| QuoteforgeError::InvalidInput {
        reason: format!("input is not valid JSON: {e}"),
    })?;
    debug!(schema_len = schema.len(), function_len = function.len(), "executing from files");

    let engine = ExecutionEngine::new(config.runner.clone()).with_diagnostics(sink_for(&config.diagnostics));
    let outcome = engine.execute(&schema, &function, &input).await;
    // The process exits right after a fault; the report must be on disk first.
    engine.flush_diagnostics().await;
    let result = outcome?;

    let rendered = serde_json::to_string_pretty(&result).map_err(|e| QuoteforgeError::InvalidInput {
        reason: format!("result could not be rendered: {e}"),
    })?;
    println!("{rendered}");
    Ok(())
}

fn read_source(path: &Path) -> QuoteforgeResult<String> {
    std::fs::read_to_string(path).map_err(|e| QuoteforgeError::InvalidInput {
        reason: format!("cannot read '{}': {}", path.display(), e),
    })
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("QUOTEFORGE: Generated Pricing Functions");
    println!("Print-Shop Reference Demo");
    println!("=======================================");
    println!();
    println!("QUOTEFORGE pipeline per agent:");
    println!("  [1] Human rules appended; every change is a new hash-chained checkpoint");
    println!("  [2] Schema and function synthesized from the accumulated rules");
    println!("  [3] Dataset scenarios converted into structured test inputs");
    println!("  [4] Each run executed in a fresh sandbox with time and resource ceilings");
    println!("  [5] Results judged: exact totals for happy paths, error codes for unhappy ones");
    println!();
}
