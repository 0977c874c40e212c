//! Pass rules for the two kinds of test case.
//!
//! A happy-path case passes when the function returns normally with exactly
//! the expected total. An unhappy-path case passes when the function returns
//! normally with an error whose code is the expected category. An
//! `ExecutionFault` fails both: recognised failure modes must come back as
//! structured errors, not as thrown exceptions.

use quoteforge_contracts::{
    dataset::{DatasetHappyPathCase, DatasetUnhappyPathCase, ErrorCategory},
    execution::ExecutionFault,
    quote::QuoteResult,
    test_run::TestResult,
};

/// What a test run expects from the function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expectation {
    Happy { expected_total: f64 },
    Unhappy { category: ErrorCategory },
}

impl Expectation {
    /// Apply the pass rule to a returned result.
    pub fn passes(&self, result: &QuoteResult) -> bool {
        match self {
            // Exact comparison: no tolerance.
            Self::Happy { expected_total } => result.total == Some(*expected_total),
            Self::Unhappy { category } => result.has_error_code(category.code()),
        }
    }

    /// Turn an execution outcome into the `TestResult` stored on the run.
    pub fn judge(&self, outcome: Result<QuoteResult, ExecutionFault>) -> TestResult {
        match outcome {
            Ok(result) => TestResult::completed(self.passes(&result), result),
            Err(fault) => TestResult::faulted(fault),
        }
    }
}

impl From<&DatasetHappyPathCase> for Expectation {
    fn from(case: &DatasetHappyPathCase) -> Self {
        Self::Happy {
            expected_total: case.expected_total,
        }
    }
}

impl From<&DatasetUnhappyPathCase> for Expectation {
    fn from(case: &DatasetUnhappyPathCase) -> Self {
        Self::Unhappy {
            category: case.expected_error,
        }
    }
}
