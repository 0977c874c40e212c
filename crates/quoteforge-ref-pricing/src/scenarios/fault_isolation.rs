//! Scenario 2: Fault Isolation
//!
//! Runs a deliberately broken function against a small dataset. The function
//! throws for posters and never returns for flyers; business cards are priced
//! correctly. Every fault stays inside its own test run.
//!
//! Pipeline walk-through for the demo run:
//!   1. Agent built with the faulty canned function
//!   2. Batch run without fail-fast: throw and timeout recorded, others pass
//!   3. Batch run with fail-fast: the first failure halts the batch
//!   4. Fault reports captured for offline troubleshooting

use std::sync::Arc;

use quoteforge_contracts::{dataset::HappyCaseInput, error::QuoteforgeResult};
use quoteforge_core::config::QuoteforgeConfig;
use quoteforge_verify::{BatchOptions, BatchReport};

use crate::{catalog::PRICING_MESSAGES, runtime::ReferenceRuntime, synthesis::CannedSynthesizer};

const TENANT: &str = "acme-print";

/// Upper bound on the per-invocation budget so the looping case ends quickly.
const SCENARIO_TIMEOUT_MS: u64 = 250;

fn orders() -> Vec<HappyCaseInput> {
    [
        ("250 business cards", 20.0),
        ("10 posters", 15.0),
        ("100 flyers", 12.0),
        ("125 business cards", 10.0),
    ]
    .into_iter()
    .map(|(description, total)| HappyCaseInput {
        description: description.to_string(),
        expected_total: total,
        expected_total_reasoning: "price list".to_string(),
    })
    .collect()
}

/// Run Scenario 2: Fault Isolation.
///
/// Returns the reports of the full batch and the fail-fast batch.
pub async fn run_scenario(config: &QuoteforgeConfig) -> QuoteforgeResult<(BatchReport, BatchReport)> {
    println!("=== Scenario 2: Fault Isolation ===");
    println!();

    // ── Wire up the QUOTEFORGE services ───────────────────────────────────────

    let mut config = config.clone();
    config.runner.timeout_ms = config.runner.timeout_ms.min(SCENARIO_TIMEOUT_MS);

    let runtime = ReferenceRuntime::new(config, Arc::new(CannedSynthesizer::faulty()))?;
    let scope = runtime.scope(TENANT);

    let (agent, head) = runtime
        .build_agent(&scope, "Acme print shop (broken)", &PRICING_MESSAGES)
        .await?;
    runtime
        .seed_dataset(&scope, &agent, "Smoke orders", orders(), Vec::new())
        .await?;
    runtime.harness.prepare_checkpoint(&scope, &head.id).await?;

    println!("  Agent:          {} (v{})", agent.name, head.version);
    println!("  Timeout:        {} ms per invocation", runtime.config.runner.timeout_ms);
    println!();

    // ── Full batch ────────────────────────────────────────────────────────────

    let full = runtime
        .harness
        .run_batch(&scope, &head.id, BatchOptions { fail_fast: false })
        .await?;

    println!("  Test: full batch (fail-fast off)");
    for run in runtime.runs(&scope, &head.id).await? {
        let verdict = match run.result.as_ref() {
            Some(result) if result.passed => "PASS".to_string(),
            Some(result) => match &result.runner_exception {
                Some(fault) => format!("FAIL {}", fault),
                None => "FAIL wrong total".to_string(),
            },
            None => "not run".to_string(),
        };
        println!("    {:<56} {}", run.structured_input.to_string(), verdict);
    }
    println!(
        "  Batch result:   {} passed, {} failed, {} not run",
        full.passed(),
        full.failed(),
        full.not_run()
    );
    println!();

    // ── Fail-fast batch ───────────────────────────────────────────────────────

    let halted = runtime
        .harness
        .run_batch(&scope, &head.id, BatchOptions { fail_fast: true })
        .await?;

    println!("  Test: same batch (fail-fast on)");
    println!(
        "  Batch result:   {} passed, {} failed, {} not run (halted early: {})",
        halted.passed(),
        halted.failed(),
        halted.not_run(),
        halted.halted_early
    );
    println!();

    // ── Diagnostics ───────────────────────────────────────────────────────────

    runtime.engine.flush_diagnostics().await;
    match &runtime.config.diagnostics.directory {
        _ if !runtime.config.diagnostics.enabled => println!("  Fault reports:  disabled"),
        Some(dir) => println!("  Fault reports:  written to {}", dir.display()),
        None => println!("  Fault reports:  {} kept in memory", runtime.fault_reports().len()),
    }
    println!();
    println!("  Scenario 2 complete.");
    println!();

    Ok((full, halted))
}
