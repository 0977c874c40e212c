//! # quoteforge-runner
//!
//! The Execution Engine: compiles a checkpoint's schema and function source
//! and invokes `calculate_quote(input)` inside a sandbox.
//!
//! Generated code is untrusted. Every invocation gets a fresh script engine
//! with a deny-by-default capability set, and every failure comes back as a
//! classified `ExecutionFault` rather than a panic or a hang:
//!
//! | Failure                               | Fault                                 |
//! |---------------------------------------|---------------------------------------|
//! | schema or function does not compile   | `CompileError { line }`               |
//! | no `calculate_quote` function         | `EntryPointMissing`                   |
//! | `throw`, unknown function, bad math   | `RuntimeFault { cause: Thrown }`      |
//! | wall-clock budget exceeded            | `RuntimeFault { cause: Timeout }`     |
//! | operation, depth or size ceiling      | `RuntimeFault { cause: ResourceLimit }` |
//! | return value is not a quote result    | `RuntimeFault { cause: ContractViolation }` |
//!
//! ## Usage
//!
//! ```rust,ignore
//! let engine = ExecutionEngine::new(config.runner.clone())
//!     .with_diagnostics(sink_for(&config.diagnostics));
//! let quote = engine.execute(&cp.function_schema, &cp.function_code, &input).await?;
//! ```

pub mod contract;
pub mod diagnostics;
pub mod engine;
pub mod literal;
pub mod sandbox;

pub use diagnostics::{sink_for, DirectoryDiagnosticsSink, MemoryDiagnosticsSink};
pub use engine::ExecutionEngine;
pub use sandbox::{ENTRY_POINT, SCHEMA_CONSTANT};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::{
        sync::Arc,
        time::{Duration, Instant},
    };

    use serde_json::{json, Value};

    use quoteforge_contracts::{
        capability::SandboxCapability,
        execution::{ExecutionFault, FaultCause},
    };
    use quoteforge_core::{config::RunnerConfig, traits::QuoteExecutor};

    use super::{DirectoryDiagnosticsSink, ExecutionEngine, MemoryDiagnosticsSink};

    // ── Helpers ───────────────────────────────────────────────────────────────

    const SCHEMA: &str = r#"{
        "type": "object",
        "properties": {
            "quantity": { "type": "integer", "default": 100 },
            "product": { "enum": ["business_cards", "flyers"] }
        },
        "required": ["quantity"]
    }"#;

    const CARDS: &str = r#"
fn calculate_quote(input) {
    let cents = input.quantity * 8;
    #{
        total: cents / 100.0,
        pricingCalculationBacktrace: [
            #{ operation: "cards", description: "8 cents per card", subTasks: [] }
        ],
        errors: []
    }
}
"#;

    fn engine() -> ExecutionEngine {
        ExecutionEngine::new(RunnerConfig::default())
    }

    fn engine_with(config: RunnerConfig) -> ExecutionEngine {
        ExecutionEngine::new(config)
    }

    fn run(function: &str) -> Result<quoteforge_contracts::quote::QuoteResult, ExecutionFault> {
        engine().execute_blocking(SCHEMA, function, &json!({ "quantity": 250 }))
    }

    fn cause_of(outcome: Result<impl std::fmt::Debug, ExecutionFault>) -> FaultCause {
        match outcome {
            Err(ExecutionFault::RuntimeFault { cause, .. }) => cause,
            other => panic!("expected RuntimeFault, got {:?}", other),
        }
    }

    // ── Success ───────────────────────────────────────────────────────────────

    #[test]
    fn computes_total_and_backtrace() {
        let quote = run(CARDS).unwrap();
        assert_eq!(quote.total, Some(20.0));
        assert_eq!(quote.pricing_calculation_backtrace[0].operation, "cards");
        assert!(quote.errors.is_empty());
    }

    #[test]
    fn same_input_gives_same_result() {
        let first = run(CARDS).unwrap();
        let second = run(CARDS).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn structured_errors_are_results_not_faults() {
        let function = r#"
fn calculate_quote(input) {
    if input.quantity <= 0 {
        return #{ errors: [#{ code: "INCORRECT_INPUT_VALUE", message: "quantity must be positive" }] };
    }
    #{ total: 1.0 }
}
"#;
        let quote = engine()
            .execute_blocking(SCHEMA, function, &json!({ "quantity": 0 }))
            .unwrap();
        assert!(quote.total.is_none());
        assert!(quote.has_error_code("INCORRECT_INPUT_VALUE"));
    }

    #[test]
    fn schema_is_visible_as_global_constant() {
        let function = r#"
fn calculate_quote(input) {
    let fallback = global::SCHEMA["properties"]["quantity"]["default"];
    #{ total: fallback * 1.0 }
}
"#;
        let quote = engine().execute_blocking(SCHEMA, function, &json!({})).unwrap();
        assert_eq!(quote.total, Some(100.0));
    }

    #[test]
    fn empty_schema_is_accepted() {
        let quote = engine()
            .execute_blocking("", "fn calculate_quote(input) { #{ total: 5 } }", &Value::Null)
            .unwrap();
        assert_eq!(quote.total, Some(5.0));
    }

    // ── Compile-time faults ───────────────────────────────────────────────────

    #[test]
    fn syntax_error_reports_function_relative_line() {
        let function = "fn calculate_quote(input) {\n    let x = ;\n}";
        match run(function) {
            Err(ExecutionFault::CompileError { line, .. }) => assert_eq!(line, Some(2)),
            other => panic!("expected CompileError, got {:?}", other),
        }
    }

    #[test]
    fn invalid_schema_is_a_compile_error() {
        let outcome = engine().execute_blocking("{ not json", CARDS, &json!({ "quantity": 1 }));
        assert!(matches!(outcome, Err(ExecutionFault::CompileError { line: None, .. })));

        let outcome = engine().execute_blocking(r#"{"type": 12}"#, CARDS, &json!({ "quantity": 1 }));
        assert!(matches!(outcome, Err(ExecutionFault::CompileError { .. })));
    }

    #[test]
    fn missing_entry_point() {
        let outcome = run("fn quote(input) { #{ total: 1.0 } }");
        assert!(matches!(outcome, Err(ExecutionFault::EntryPointMissing { .. })));

        let outcome = run("");
        assert!(matches!(outcome, Err(ExecutionFault::EntryPointMissing { .. })));
    }

    #[test]
    fn entry_point_must_take_one_parameter() {
        let outcome = run("fn calculate_quote(a, b) { #{ total: 1.0 } }");
        assert!(matches!(outcome, Err(ExecutionFault::CompileError { .. })));
    }

    #[test]
    fn module_import_is_not_available() {
        let outcome = run("import \"fs\" as fs;\nfn calculate_quote(input) { #{ total: 1.0 } }");
        assert!(matches!(outcome, Err(ExecutionFault::CompileError { .. })));
    }

    #[test]
    fn eval_is_not_available() {
        let outcome = run("fn calculate_quote(input) { eval(\"#{ total: 1.0 }\") }");
        assert!(outcome.is_err());
    }

    // ── Runtime faults ────────────────────────────────────────────────────────

    #[test]
    fn thrown_error_is_classified() {
        let outcome = run("fn calculate_quote(input) { throw \"no price list\"; }");
        assert_eq!(cause_of(outcome), FaultCause::Thrown);
    }

    #[test]
    fn thrown_error_reports_function_relative_line() {
        let function = "fn calculate_quote(input) {\n    throw \"no price list\";\n}";
        match run(function) {
            Err(ExecutionFault::RuntimeFault { cause, message }) => {
                assert_eq!(cause, FaultCause::Thrown);
                assert!(message.ends_with("(line 2)"), "unexpected message: {message}");
            }
            other => panic!("expected RuntimeFault, got {:?}", other),
        }
    }

    #[test]
    fn sleep_is_refused_without_waiting() {
        let config = RunnerConfig {
            timeout_ms: 100,
            ..RunnerConfig::default()
        };
        let engine = engine_with(config);

        for call in ["sleep(3)", "sleep(2.5)"] {
            let function = format!("fn calculate_quote(input) {{ {call}; #{{ total: 1.0 }} }}");
            let started = Instant::now();
            let outcome = engine.execute_blocking("", &function, &Value::Null);
            assert!(started.elapsed() < Duration::from_secs(1), "{call} was not refused");
            match outcome {
                Err(ExecutionFault::RuntimeFault { cause, message }) => {
                    assert_eq!(cause, FaultCause::Thrown);
                    assert!(message.contains("sleep is not available"), "unexpected message: {message}");
                }
                other => panic!("expected RuntimeFault, got {:?}", other),
            }
        }
    }

    #[test]
    fn clock_is_not_granted() {
        let outcome = run("fn calculate_quote(input) { let t = timestamp(); #{ total: 1.0 } }");
        assert_eq!(cause_of(outcome), FaultCause::Thrown);
    }

    #[test]
    fn ungranted_capability_is_missing() {
        let config = RunnerConfig {
            capabilities: vec![SandboxCapability::Math],
            ..RunnerConfig::default()
        };
        let function = "fn calculate_quote(input) { let s = \"abc\".to_upper(); #{ total: 1.0 } }";
        let outcome = engine_with(config).execute_blocking("", function, &Value::Null);
        assert_eq!(cause_of(outcome), FaultCause::Thrown);
    }

    #[test]
    fn infinite_loop_times_out() {
        let config = RunnerConfig {
            timeout_ms: 100,
            max_operations: u64::MAX,
            ..RunnerConfig::default()
        };
        let outcome = engine_with(config).execute_blocking(
            "",
            "fn calculate_quote(input) { loop { } }",
            &Value::Null,
        );
        assert_eq!(cause_of(outcome), FaultCause::Timeout);
    }

    #[test]
    fn operation_ceiling_is_a_resource_limit() {
        let config = RunnerConfig {
            max_operations: 10_000,
            ..RunnerConfig::default()
        };
        let outcome = engine_with(config).execute_blocking(
            "",
            "fn calculate_quote(input) { let n = 0; loop { n += 1; } }",
            &Value::Null,
        );
        assert_eq!(cause_of(outcome), FaultCause::ResourceLimit);
    }

    #[test]
    fn unbounded_recursion_is_a_resource_limit() {
        let outcome = run("fn calculate_quote(input) { calculate_quote(input) }");
        assert_eq!(cause_of(outcome), FaultCause::ResourceLimit);
    }

    #[test]
    fn non_quote_return_is_a_contract_violation() {
        assert_eq!(
            cause_of(run("fn calculate_quote(input) { 42 }")),
            FaultCause::ContractViolation
        );
        assert_eq!(
            cause_of(run("fn calculate_quote(input) { #{ total: \"35\" } }")),
            FaultCause::ContractViolation
        );
    }

    // ── Diagnostics ───────────────────────────────────────────────────────────

    #[test]
    fn faults_are_reported_with_source() {
        let sink = MemoryDiagnosticsSink::new();
        let engine = engine().with_diagnostics(Arc::new(sink.clone()));

        engine
            .execute_blocking(SCHEMA, CARDS, &json!({ "quantity": 1 }))
            .unwrap();
        assert!(sink.is_empty());

        let failing = "fn calculate_quote(input) { throw \"boom\"; }";
        let _ = engine.execute_blocking(SCHEMA, failing, &json!({ "quantity": 1 }));

        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].function_source, failing);
        assert_eq!(reports[0].input, json!({ "quantity": 1 }));
        assert_eq!(reports[0].source_length, SCHEMA.len() + failing.len());
    }

    // ── Async facade ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn async_execute_matches_blocking() {
        let engine = engine();
        let input = json!({ "quantity": 250 });
        let via_async = engine.execute(SCHEMA, CARDS, &input).await.unwrap();
        let via_blocking = engine.execute_blocking(SCHEMA, CARDS, &input).unwrap();
        assert_eq!(via_async, via_blocking);
    }

    #[tokio::test]
    async fn flushed_report_is_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let reports = dir.path().join("diagnostics");
        let engine = engine().with_diagnostics(Arc::new(DirectoryDiagnosticsSink::new(&reports)));

        let failing = "fn calculate_quote(input) { throw \"no price list\"; }";
        let outcome = engine.execute(SCHEMA, failing, &json!({ "quantity": 1 })).await;
        assert_eq!(cause_of(outcome), FaultCause::Thrown);

        engine.flush_diagnostics().await;
        let written: Vec<_> = std::fs::read_dir(&reports).unwrap().collect();
        assert_eq!(written.len(), 1);
    }

    #[tokio::test]
    async fn async_timeout_and_detached_report() {
        let sink = MemoryDiagnosticsSink::new();
        let config = RunnerConfig {
            timeout_ms: 100,
            max_operations: u64::MAX,
            ..RunnerConfig::default()
        };
        let engine = engine_with(config).with_diagnostics(Arc::new(sink.clone()));

        let outcome = engine
            .execute("", "fn calculate_quote(input) { loop { } }", &Value::Null)
            .await;
        assert_eq!(cause_of(outcome), FaultCause::Timeout);

        engine.flush_diagnostics().await;
        assert_eq!(sink.len(), 1);
    }
}
