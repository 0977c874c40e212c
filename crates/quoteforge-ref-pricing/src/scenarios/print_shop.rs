//! Scenario 1: Print Shop Agent
//!
//! Builds a pricing agent for a small print shop from five plain-English
//! rules and verifies it against a dataset of eight orders.
//!
//! Pipeline walk-through for the demo run:
//!   1. Agent registered; one checkpoint per input message
//!   2. Schema and function synthesized (two more checkpoints)
//!   3. One order quoted directly through the Execution Engine
//!   4. Dataset created, assigned and converted into test runs
//!   5. Batch executed; every run judged by its pass rule
//!   6. Checkpoint chain integrity verified at the end

use std::{collections::HashMap, sync::Arc};

use serde_json::json;

use quoteforge_contracts::{error::QuoteforgeResult, ids::CaseId};
use quoteforge_core::{config::QuoteforgeConfig, traits::QuoteExecutor};
use quoteforge_verify::{BatchOptions, BatchReport, RunStatus};

use crate::{
    catalog::{happy_cases, unhappy_cases, PRICING_MESSAGES},
    runtime::ReferenceRuntime,
    synthesis::CannedSynthesizer,
};

const TENANT: &str = "acme-print";

/// Run Scenario 1: Print Shop Agent.
///
/// Returns the batch report so callers can assert on it.
pub async fn run_scenario(config: &QuoteforgeConfig) -> QuoteforgeResult<BatchReport> {
    println!("=== Scenario 1: Print Shop Agent ===");
    println!();

    // ── Wire up the QUOTEFORGE services ───────────────────────────────────────

    let runtime = ReferenceRuntime::new(config.clone(), Arc::new(CannedSynthesizer::print_shop()))?;
    let scope = runtime.scope(TENANT);

    // ── Build the agent ───────────────────────────────────────────────────────

    let (agent, head) = runtime
        .build_agent(&scope, "Acme print shop", &PRICING_MESSAGES)
        .await?;

    println!("  Agent:          {} ({})", agent.name, agent.id);
    println!("  Rules:          {} input messages", PRICING_MESSAGES.len());
    for checkpoint in runtime.ledger.history(&scope, &agent.id, None).await?.iter().rev() {
        println!(
            "    v{:<2} {:<22} {}",
            checkpoint.version, checkpoint.trigger, checkpoint.description
        );
    }
    println!();

    // ── Quote one order directly ──────────────────────────────────────────────

    let order = json!({ "product": "business_cards", "quantity": 250, "rush": true });
    let quote = runtime
        .engine
        .execute(&head.function_schema, &head.function_code, &order)
        .await?;
    println!("  Direct quote:   {}", order);
    println!("  Total:          {:?}", quote.total);
    println!("  Backtrace:      {} top-level step(s)", quote.pricing_calculation_backtrace.len());
    println!();

    // ── Verify against the dataset ────────────────────────────────────────────

    let dataset = runtime
        .seed_dataset(&scope, &agent, "Spring orders", happy_cases(), unhappy_cases())
        .await?;
    let cases = runtime.catalog.cases(&scope, &dataset.id).await?;
    let descriptions: HashMap<CaseId, String> = cases
        .happy
        .iter()
        .map(|c| (c.id, c.description.clone()))
        .chain(cases.unhappy.iter().map(|c| (c.id, c.description.clone())))
        .collect();

    let runs = runtime.harness.prepare_checkpoint(&scope, &head.id).await?;
    println!("  Dataset:        {} ({} cases, {} runs)", dataset.name, cases.len(), runs.len());

    let report = runtime
        .harness
        .run_batch(&scope, &head.id, BatchOptions::from(&config.harness))
        .await?;

    for outcome in &report.outcomes {
        let label = match outcome.status {
            RunStatus::Passed => "PASS",
            RunStatus::Failed => "FAIL",
            RunStatus::NotRun => "SKIP",
        };
        let description = descriptions
            .get(&outcome.case.case_id())
            .map(String::as_str)
            .unwrap_or("?");
        println!("    [{label}] {description}");
    }
    println!(
        "  Batch result:   {} passed, {} failed, {} not run",
        report.passed(),
        report.failed(),
        report.not_run()
    );

    if report.all_passed() {
        runtime.ledger.set_deployed(&scope, &agent.id, true).await?;
        println!("  Deployment:     agent marked deployed");
    }

    // ── Chain integrity ───────────────────────────────────────────────────────

    let intact = runtime.ledger.verify_history(&scope, &agent.id).await?;
    println!(
        "  Chain integrity: {}",
        if intact { "VERIFIED" } else { "BROKEN" }
    );
    println!();
    println!("  Scenario 1 complete.");
    println!();

    Ok(report)
}
