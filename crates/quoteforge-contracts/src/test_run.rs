//! Checkpoint test runs and their latest outcome.
//!
//! A `CheckpointTestRun` binds one dataset case to the structured input the
//! conversion collaborator produced for a specific checkpoint's schema. Its
//! `result` holds only the most recent execution: re-running overwrites it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    execution::ExecutionFault,
    ids::{CaseId, CheckpointId, DatasetId, TestRunId},
    quote::QuoteResult,
    tenant::{TenantId, TenantOwned},
};

/// Which dataset case a run was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "case_id", rename_all = "snake_case")]
pub enum TestCaseRef {
    Happy(CaseId),
    Unhappy(CaseId),
}

impl TestCaseRef {
    pub fn case_id(&self) -> CaseId {
        match self {
            Self::Happy(id) | Self::Unhappy(id) => *id,
        }
    }
}

/// The outcome of the last execution of a test run.
///
/// Exactly one of `function_result` and `runner_exception` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub passed: bool,
    pub function_result: Option<QuoteResult>,
    pub runner_exception: Option<ExecutionFault>,
}

impl TestResult {
    /// The function returned normally; `passed` comes from the pass rule.
    pub fn completed(passed: bool, result: QuoteResult) -> Self {
        Self {
            passed,
            function_result: Some(result),
            runner_exception: None,
        }
    }

    /// The function aborted. Always a failure.
    pub fn faulted(fault: ExecutionFault) -> Self {
        Self {
            passed: false,
            function_result: None,
            runner_exception: Some(fault),
        }
    }
}

/// A (checkpoint, dataset, case) binding with its concrete input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointTestRun {
    pub id: TestRunId,
    pub tenant_id: TenantId,
    pub checkpoint_id: CheckpointId,
    pub dataset_id: DatasetId,
    pub case: TestCaseRef,
    /// Index of the case within the conversion batch that produced the input.
    pub position: usize,
    pub structured_input: serde_json::Value,
    pub result: Option<TestResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CheckpointTestRun {
    pub fn new(
        tenant_id: TenantId,
        checkpoint_id: CheckpointId,
        dataset_id: DatasetId,
        case: TestCaseRef,
        position: usize,
        structured_input: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TestRunId::new(),
            tenant_id,
            checkpoint_id,
            dataset_id,
            case,
            position,
            structured_input,
            result: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl TenantOwned for CheckpointTestRun {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}
