//! Execution Engine fault classification and diagnostics reports.
//!
//! `ExecutionFault` is what the engine returns instead of propagating a raw
//! script error. The harness stores it verbatim as a test run's
//! `runner_exception`; the diagnostics sink receives a `FaultReport` wrapping
//! it together with the failing source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::ReportId;

/// Why an invocation aborted at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultCause {
    /// The generated code raised an error (`throw`, bad arithmetic, unknown function).
    Thrown,
    /// The wall-clock budget ran out.
    Timeout,
    /// An operation, depth or size ceiling was hit.
    ResourceLimit,
    /// The returned value does not have the shape of a quote result.
    ContractViolation,
    /// The sandbox itself panicked or its worker was lost.
    HostPanic,
}

impl std::fmt::Display for FaultCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Thrown => "thrown",
            Self::Timeout => "timeout",
            Self::ResourceLimit => "resource limit",
            Self::ContractViolation => "contract violation",
            Self::HostPanic => "host panic",
        };
        f.write_str(s)
    }
}

/// A classified failure of the Execution Engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionFault {
    /// The schema or function source could not be compiled.
    #[error("compile error: {message}")]
    CompileError {
        message: String,
        /// 1-based line within the function source, when known.
        line: Option<usize>,
    },

    /// The compiled unit does not define the entry function.
    #[error("entry point '{entry_point}' is missing")]
    EntryPointMissing { entry_point: String },

    /// The function aborted while running.
    #[error("runtime fault ({cause}): {message}")]
    RuntimeFault { cause: FaultCause, message: String },
}

impl ExecutionFault {
    pub fn runtime(cause: FaultCause, message: impl Into<String>) -> Self {
        Self::RuntimeFault {
            cause,
            message: message.into(),
        }
    }

    /// Short machine-readable label, used in logs and report file names.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CompileError { .. } => "compile_error",
            Self::EntryPointMissing { .. } => "entry_point_missing",
            Self::RuntimeFault { .. } => "runtime_fault",
        }
    }
}

/// Everything needed to reproduce a failed invocation offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaultReport {
    pub id: ReportId,
    pub occurred_at: DateTime<Utc>,
    pub fault: ExecutionFault,
    pub schema_source: String,
    pub function_source: String,
    /// Length in bytes of schema plus function source.
    pub source_length: usize,
    /// The structured input the function was invoked with.
    pub input: serde_json::Value,
}

impl FaultReport {
    pub fn new(
        fault: ExecutionFault,
        schema_source: &str,
        function_source: &str,
        input: &serde_json::Value,
    ) -> Self {
        Self {
            id: ReportId::new(),
            occurred_at: Utc::now(),
            fault,
            schema_source: schema_source.to_string(),
            function_source: function_source.to_string(),
            source_length: schema_source.len() + function_source.len(),
            input: input.clone(),
        }
    }
}
