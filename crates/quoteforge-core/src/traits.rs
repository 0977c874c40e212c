//! Trait definitions for every seam of the QUOTEFORGE runtime.
//!
//! The traits fall into three groups:
//!
//! - Collaborators: `CodeSynthesizer`, `InputConverter` (untrusted, remote,
//!   possibly slow) and `QuoteExecutor` (the Execution Engine contract).
//! - Stores: `AgentStore`, `CheckpointStore`, `DatasetStore`, `TestRunStore`.
//!   Every read takes a `TenantScope` so isolation is enforced at the storage
//!   access layer rather than at each call site.
//! - Sinks: `DiagnosticsSink` for offline troubleshooting of failed invocations.

use async_trait::async_trait;
use serde_json::Value;

use quoteforge_contracts::{
    agent::PricingAgent,
    checkpoint::Checkpoint,
    dataset::{
        DatasetAssignment, DatasetCases, DatasetFilter, DatasetHappyPathCase,
        DatasetUnhappyPathCase, TestingDataset,
    },
    error::QuoteforgeResult,
    execution::{ExecutionFault, FaultReport},
    ids::{AgentId, CaseId, CheckpointId, DatasetId, TestRunId},
    quote::QuoteResult,
    tenant::TenantScope,
    test_run::{CheckpointTestRun, TestResult},
};

// ── Collaborators ────────────────────────────────────────────────────────────

/// Turns a natural-language pricing description into source text.
///
/// Implementations are typically backed by a generative text service and are
/// treated as opaque. Failures must be reported as
/// `QuoteforgeError::SynthesisUnavailable`.
#[async_trait]
pub trait CodeSynthesizer: Send + Sync {
    /// Produce the type-contract source (a JSON Schema document).
    ///
    /// `previous_schema` is the schema of the base checkpoint, if any, so the
    /// collaborator can apply `feedback` incrementally.
    async fn synthesize_schema(
        &self,
        description: &str,
        feedback: Option<&str>,
        previous_schema: Option<&str>,
    ) -> QuoteforgeResult<String>;

    /// Produce the implementation source for `schema`.
    async fn synthesize_function(
        &self,
        description: &str,
        schema: &str,
        feedback: Option<&str>,
        previous_function: Option<&str>,
    ) -> QuoteforgeResult<String>;
}

/// Turns natural-language scenarios into structured inputs for a schema.
///
/// The returned vector must correspond index-by-index with `cases`. Callers
/// tolerate a shorter or longer result by dropping unmatched indices.
#[async_trait]
pub trait InputConverter: Send + Sync {
    async fn convert(&self, cases: &[String], schema: &str) -> QuoteforgeResult<Vec<Value>>;
}

/// The Execution Engine public contract.
///
/// Implementations must never panic or hang on untrusted input: every failure
/// comes back as an `ExecutionFault`.
#[async_trait]
pub trait QuoteExecutor: Send + Sync {
    async fn execute(
        &self,
        schema: &str,
        function: &str,
        input: &Value,
    ) -> Result<QuoteResult, ExecutionFault>;
}

// ── Stores ───────────────────────────────────────────────────────────────────

/// Persistence for pricing agents.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn insert(&self, agent: PricingAgent) -> QuoteforgeResult<()>;

    /// Fetch an agent, including soft-deleted ones, if visible in `scope`.
    async fn get(&self, scope: &TenantScope, id: &AgentId) -> QuoteforgeResult<Option<PricingAgent>>;

    /// Replace the stored agent document. `NotFound` if it does not exist
    /// or lies outside `scope`.
    async fn update(&self, scope: &TenantScope, agent: PricingAgent) -> QuoteforgeResult<()>;

    /// Every non-deleted agent visible in `scope`, oldest first.
    async fn list(&self, scope: &TenantScope) -> QuoteforgeResult<Vec<PricingAgent>>;
}

/// Insert-only persistence for checkpoints.
///
/// There is deliberately no update or delete verb: history is immutable.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Insert `checkpoint` if no checkpoint with the same
    /// `(agent_id, version)` exists; otherwise `VersionConflict`.
    async fn insert(&self, checkpoint: Checkpoint) -> QuoteforgeResult<()>;

    async fn get(&self, id: &CheckpointId) -> QuoteforgeResult<Option<Checkpoint>>;

    /// The checkpoint with the highest version for `agent_id`.
    async fn latest(&self, agent_id: &AgentId) -> QuoteforgeResult<Option<Checkpoint>>;

    /// Checkpoints of `agent_id`, newest first, at most `limit` if given.
    async fn history(
        &self,
        agent_id: &AgentId,
        limit: Option<usize>,
    ) -> QuoteforgeResult<Vec<Checkpoint>>;
}

/// Persistence for datasets, their cases and agent assignments.
#[async_trait]
pub trait DatasetStore: Send + Sync {
    async fn insert_dataset(&self, dataset: TestingDataset) -> QuoteforgeResult<()>;

    async fn get_dataset(
        &self,
        scope: &TenantScope,
        id: &DatasetId,
    ) -> QuoteforgeResult<Option<TestingDataset>>;

    /// Replace a stored dataset. `NotFound` if it does not exist or lies
    /// outside `scope`; the same holds for the case updates below.
    async fn update_dataset(&self, scope: &TenantScope, dataset: TestingDataset) -> QuoteforgeResult<()>;

    async fn list_datasets(&self, filter: &DatasetFilter) -> QuoteforgeResult<Vec<TestingDataset>>;

    async fn insert_happy_case(&self, case: DatasetHappyPathCase) -> QuoteforgeResult<()>;

    async fn insert_unhappy_case(&self, case: DatasetUnhappyPathCase) -> QuoteforgeResult<()>;

    async fn update_happy_case(&self, scope: &TenantScope, case: DatasetHappyPathCase) -> QuoteforgeResult<()>;

    async fn update_unhappy_case(
        &self,
        scope: &TenantScope,
        case: DatasetUnhappyPathCase,
    ) -> QuoteforgeResult<()>;

    async fn get_happy_case(
        &self,
        scope: &TenantScope,
        id: &CaseId,
    ) -> QuoteforgeResult<Option<DatasetHappyPathCase>>;

    async fn get_unhappy_case(
        &self,
        scope: &TenantScope,
        id: &CaseId,
    ) -> QuoteforgeResult<Option<DatasetUnhappyPathCase>>;

    /// Live (non-deleted) cases of a dataset, each kind in creation order.
    async fn list_cases(
        &self,
        scope: &TenantScope,
        dataset_id: &DatasetId,
    ) -> QuoteforgeResult<DatasetCases>;

    /// Insert an assignment; `DuplicateAssignment` if the
    /// `(agent, dataset, tenant)` triple already exists.
    async fn insert_assignment(&self, assignment: DatasetAssignment) -> QuoteforgeResult<()>;

    /// Remove an assignment. Returns false if there was none.
    async fn delete_assignment(
        &self,
        scope: &TenantScope,
        agent_id: &AgentId,
        dataset_id: &DatasetId,
    ) -> QuoteforgeResult<bool>;

    async fn list_assignments(
        &self,
        scope: &TenantScope,
        agent_id: &AgentId,
    ) -> QuoteforgeResult<Vec<DatasetAssignment>>;
}

/// Persistence for checkpoint test runs.
#[async_trait]
pub trait TestRunStore: Send + Sync {
    /// Replace every run bound to `(checkpoint_id, dataset_id)` with `runs`.
    /// Only runs visible in `scope` are removed, and every new run must lie
    /// inside it.
    async fn replace_runs(
        &self,
        scope: &TenantScope,
        checkpoint_id: &CheckpointId,
        dataset_id: &DatasetId,
        runs: Vec<CheckpointTestRun>,
    ) -> QuoteforgeResult<()>;

    /// Runs bound to a checkpoint in stable storage order.
    async fn list_runs(
        &self,
        scope: &TenantScope,
        checkpoint_id: &CheckpointId,
    ) -> QuoteforgeResult<Vec<CheckpointTestRun>>;

    async fn get_run(
        &self,
        scope: &TenantScope,
        id: &TestRunId,
    ) -> QuoteforgeResult<Option<CheckpointTestRun>>;

    /// Overwrite the latest result of a run. `NotFound` outside `scope`.
    async fn record_result(
        &self,
        scope: &TenantScope,
        id: &TestRunId,
        result: TestResult,
    ) -> QuoteforgeResult<()>;
}

// ── Sinks ────────────────────────────────────────────────────────────────────

/// Best-effort storage for failing generated source and its context.
///
/// The engine logs and ignores errors returned here: a diagnostics failure
/// must never mask the original fault.
pub trait DiagnosticsSink: Send + Sync {
    fn record(&self, report: &FaultReport) -> QuoteforgeResult<()>;
}

/// A sink that discards every report.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl DiagnosticsSink for NullDiagnostics {
    fn record(&self, _report: &FaultReport) -> QuoteforgeResult<()> {
        Ok(())
    }
}
