//! The fixed shape every pricing function must return.
//!
//! Checked with the `jsonschema` crate before the value is deserialized into
//! `QuoteResult`, so a malformed return value is reported with the path of the
//! offending field instead of a bare serde message.

use std::sync::OnceLock;

use jsonschema::Validator;
use serde_json::{json, Value};

use quoteforge_contracts::{
    execution::{ExecutionFault, FaultCause},
    quote::QuoteResult,
};

fn quote_result_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "total": { "type": ["number", "null"] },
            "pricingCalculationBacktrace": {
                "type": "array",
                "items": { "$ref": "#/$defs/step" }
            },
            "errors": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["code", "message"],
                    "properties": {
                        "code": { "type": "string", "minLength": 1 },
                        "message": { "type": "string" }
                    }
                }
            }
        },
        "$defs": {
            "step": {
                "type": "object",
                "required": ["operation"],
                "properties": {
                    "operation": { "type": "string" },
                    "description": { "type": "string" },
                    "subTasks": {
                        "type": "array",
                        "items": { "$ref": "#/$defs/step" }
                    }
                }
            }
        }
    })
}

static QUOTE_RESULT_VALIDATOR: OnceLock<Result<Validator, String>> = OnceLock::new();

/// The compiled result contract, built on first use.
fn quote_result_validator() -> Result<&'static Validator, ExecutionFault> {
    QUOTE_RESULT_VALIDATOR
        .get_or_init(|| jsonschema::validator_for(&quote_result_schema()).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| {
            ExecutionFault::runtime(FaultCause::HostPanic, format!("result contract failed to compile: {e}"))
        })
}

/// Validate a raw return value and convert it into a `QuoteResult`.
///
/// Every schema violation is collected into one `ContractViolation` message.
pub fn check_quote_result(value: Value) -> Result<QuoteResult, ExecutionFault> {
    let validator = quote_result_validator()?;

    let violations: Vec<String> = validator
        .iter_errors(&value)
        .map(|error| format!("at '{}': {}", error.instance_path, error))
        .collect();
    if !violations.is_empty() {
        return Err(ExecutionFault::runtime(
            FaultCause::ContractViolation,
            format!("returned value is not a quote result: {}", violations.join("; ")),
        ));
    }

    serde_json::from_value(value).map_err(|e| {
        ExecutionFault::runtime(
            FaultCause::ContractViolation,
            format!("returned value is not a quote result: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn contract_is_compiled_once() {
        let first = quote_result_validator().unwrap();
        let second = quote_result_validator().unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn accepts_total_with_nested_backtrace() {
        let result = check_quote_result(json!({
            "total": 35.0,
            "pricingCalculationBacktrace": [
                { "operation": "base", "subTasks": [{ "operation": "cards", "description": "250 x 8c" }] }
            ],
            "errors": []
        }))
        .unwrap();
        assert_eq!(result.total, Some(35.0));
    }

    #[test]
    fn accepts_errors_only() {
        let result = check_quote_result(json!({
            "errors": [{ "code": "UNSUPPORTED_REQUEST", "message": "no banners" }]
        }))
        .unwrap();
        assert!(result.total.is_none());
        assert!(result.has_error_code("UNSUPPORTED_REQUEST"));
    }

    #[test]
    fn rejects_non_object() {
        let fault = check_quote_result(json!(42)).unwrap_err();
        assert!(matches!(
            fault,
            ExecutionFault::RuntimeFault { cause: FaultCause::ContractViolation, .. }
        ));
    }

    #[test]
    fn rejects_string_total_and_reports_path() {
        match check_quote_result(json!({ "total": "35" })) {
            Err(ExecutionFault::RuntimeFault { cause, message }) => {
                assert_eq!(cause, FaultCause::ContractViolation);
                assert!(message.contains("/total"), "unexpected message: {message}");
            }
            other => panic!("expected ContractViolation, got {:?}", other),
        }
    }

    #[test]
    fn rejects_step_without_operation() {
        let fault = check_quote_result(json!({
            "total": 1,
            "pricingCalculationBacktrace": [{ "subTasks": [] }]
        }))
        .unwrap_err();
        assert_eq!(fault.kind(), "runtime_fault");
    }
}
