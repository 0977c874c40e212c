//! # quoteforge-ref-pricing
//!
//! Print-shop reference runtime for the QUOTEFORGE pricing system.
//!
//! Demonstrates two scenarios with deterministic stand-ins for the generative
//! collaborators:
//!
//! 1. **Print Shop Agent**: five plain-English rules become a schema and a
//!    sandboxed pricing function, verified against eight orders.
//! 2. **Fault Isolation**: a function that throws and loops forever is
//!    contained run by run, with and without fail-fast.
//!
//! All prices are hardcoded and fictional. No external services are called.

pub mod catalog;
pub mod conversion;
pub mod runtime;
pub mod scenarios;
pub mod synthesis;

pub use conversion::KeywordInputConverter;
pub use runtime::ReferenceRuntime;
pub use synthesis::CannedSynthesizer;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use serde_json::json;

    use quoteforge_contracts::execution::{ExecutionFault, FaultCause};
    use quoteforge_core::config::RunnerConfig;
    use quoteforge_runner::ExecutionEngine;

    use crate::catalog::{
        reference_quote, FAULTY_FUNCTION, PRINT_SHOP_FUNCTION, PRINT_SHOP_SCHEMA, UNIT_PRICES,
    };

    fn engine() -> ExecutionEngine {
        ExecutionEngine::new(RunnerConfig::default())
    }

    /// The sandboxed function and the host-side reference agree on every
    /// product across the discount and rush boundaries.
    #[test]
    fn sandboxed_function_matches_reference() {
        let engine = engine();
        for (product, _) in UNIT_PRICES {
            for quantity in [1, 99, 100, 101, 499, 500, 501, 1234] {
                for rush in [false, true] {
                    let input = json!({ "product": product, "quantity": quantity, "rush": rush });
                    let result = engine
                        .execute_blocking(PRINT_SHOP_SCHEMA, PRINT_SHOP_FUNCTION, &input)
                        .unwrap();
                    match reference_quote(product, quantity, rush) {
                        Ok(total) => assert_eq!(result.total, Some(total), "{input}"),
                        Err(category) => {
                            assert!(result.has_error_code(category.code()), "{input}");
                            assert!(result.total.is_none());
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn rejections_are_structured() {
        let engine = engine();
        let cases = [
            (json!({ "product": "posters" }), "MISSING_INPUT_VALUE"),
            (json!({ "quantity": 3 }), "MISSING_INPUT_VALUE"),
            (json!({ "product": "mugs", "quantity": 3 }), "UNSUPPORTED_REQUEST"),
            (json!({ "product": "flyers", "quantity": 0 }), "INCORRECT_INPUT_VALUE"),
            (json!({ "product": "flyers", "quantity": 2.5 }), "INCORRECT_INPUT_VALUE"),
        ];
        for (input, code) in cases {
            let result = engine
                .execute_blocking(PRINT_SHOP_SCHEMA, PRINT_SHOP_FUNCTION, &input)
                .unwrap();
            assert!(result.has_error_code(code), "{input}: {result:?}");
        }
    }

    #[test]
    fn backtrace_records_each_adjustment() {
        let input = json!({ "product": "flyers", "quantity": 600, "rush": true });
        let result = engine()
            .execute_blocking(PRINT_SHOP_SCHEMA, PRINT_SHOP_FUNCTION, &input)
            .unwrap();
        let steps = &result.pricing_calculation_backtrace[0].sub_tasks;
        let operations: Vec<&str> = steps.iter().map(|s| s.operation.as_str()).collect();
        assert_eq!(operations, vec!["base price", "volume discount", "rush fee"]);
        assert_eq!(result.total, Some(79.8));
    }

    #[test]
    fn faulty_function_throws_for_posters() {
        let input = json!({ "product": "posters", "quantity": 10 });
        let fault = engine()
            .execute_blocking(PRINT_SHOP_SCHEMA, FAULTY_FUNCTION, &input)
            .unwrap_err();
        assert!(matches!(
            fault,
            ExecutionFault::RuntimeFault { cause: FaultCause::Thrown, .. }
        ));
    }
}
