//! The structured output of a pricing function.

use serde::{Deserialize, Serialize};

/// What a generated pricing function returns.
///
/// A successful quote carries a `total`; a recognised failure mode carries one
/// or more `errors`. The backtrace is a free-form audit trail of how the total
/// was reached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub pricing_calculation_backtrace: Vec<CalculationStep>,
    #[serde(default)]
    pub errors: Vec<QuoteError>,
}

impl QuoteResult {
    /// Return true if any error carries `code`.
    pub fn has_error_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

/// One node of the calculation audit trail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationStep {
    pub operation: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sub_tasks: Vec<CalculationStep>,
}

/// A structured, expected failure returned by a pricing function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteError {
    pub code: String,
    pub message: String,
}
