//! `VerificationHarness`: turns dataset cases into test runs for a checkpoint
//! and executes them through the Execution Engine.
//!
//! Runs are executed one at a time in stored order. That keeps persisted
//! results in a stable order and makes fail-fast deterministic: with
//! fail-fast on, nothing after the first failing run is invoked, and those
//! runs keep whatever result they had before.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use quoteforge_contracts::{
    checkpoint::Checkpoint,
    error::{QuoteforgeError, QuoteforgeResult},
    ids::{CheckpointId, DatasetId, TestRunId},
    tenant::TenantScope,
    test_run::{CheckpointTestRun, TestCaseRef, TestResult},
};
use quoteforge_core::{
    config::HarnessConfig,
    traits::{DatasetStore, InputConverter, QuoteExecutor, TestRunStore},
};
use quoteforge_ledger::CheckpointLedger;

use crate::rules::Expectation;

/// Per-batch switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Stop issuing invocations after the first failing run.
    pub fail_fast: bool,
}

impl From<&HarnessConfig> for BatchOptions {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            fail_fast: config.fail_fast,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Passed,
    Failed,
    /// Skipped by fail-fast, or its case no longer exists.
    NotRun,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    pub run_id: TestRunId,
    pub case: TestCaseRef,
    pub status: RunStatus,
}

/// Summary of one `run_batch` call, in run order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub checkpoint_id: CheckpointId,
    pub outcomes: Vec<RunOutcome>,
    /// True when fail-fast stopped the batch before the last run.
    pub halted_early: bool,
}

impl BatchReport {
    fn count(&self, status: RunStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    pub fn passed(&self) -> usize {
        self.count(RunStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(RunStatus::Failed)
    }

    pub fn not_run(&self) -> usize {
        self.count(RunStatus::NotRun)
    }

    /// True when every run was executed and passed. An empty batch passes.
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(|o| o.status == RunStatus::Passed)
    }
}

pub struct VerificationHarness {
    ledger: Arc<CheckpointLedger>,
    datasets: Arc<dyn DatasetStore>,
    test_runs: Arc<dyn TestRunStore>,
    converter: Arc<dyn InputConverter>,
    executor: Arc<dyn QuoteExecutor>,
}

impl VerificationHarness {
    pub fn new(
        ledger: Arc<CheckpointLedger>,
        datasets: Arc<dyn DatasetStore>,
        test_runs: Arc<dyn TestRunStore>,
        converter: Arc<dyn InputConverter>,
        executor: Arc<dyn QuoteExecutor>,
    ) -> Self {
        Self {
            ledger,
            datasets,
            test_runs,
            converter,
            executor,
        }
    }

    // ── Input regeneration ────────────────────────────────────────────────────

    /// Rebuild the `(checkpoint, dataset)` run set from the dataset's live
    /// cases, converted against the checkpoint's schema in one batch.
    ///
    /// Happy cases come first, then unhappy cases, each in creation order. If
    /// the converter returns a different number of inputs than cases, the
    /// mismatch is logged and unmatched cases get no run.
    pub async fn regenerate_inputs(
        &self,
        scope: &TenantScope,
        checkpoint_id: &CheckpointId,
        dataset_id: &DatasetId,
    ) -> QuoteforgeResult<Vec<CheckpointTestRun>> {
        let checkpoint = self.ledger.checkpoint(scope, checkpoint_id).await?;
        if !checkpoint.has_schema() {
            return Err(QuoteforgeError::InvalidState {
                reason: format!("checkpoint {} has no schema to convert inputs against", checkpoint.id),
            });
        }
        let dataset = self
            .datasets
            .get_dataset(scope, dataset_id)
            .await?
            .filter(|d| !d.is_deleted())
            .ok_or_else(|| QuoteforgeError::not_found("dataset", dataset_id))?;

        let cases = self.datasets.list_cases(scope, dataset_id).await?;
        let (refs, descriptions): (Vec<TestCaseRef>, Vec<String>) = cases
            .happy
            .iter()
            .map(|c| (TestCaseRef::Happy(c.id), c.description.clone()))
            .chain(
                cases
                    .unhappy
                    .iter()
                    .map(|c| (TestCaseRef::Unhappy(c.id), c.description.clone())),
            )
            .unzip();

        let inputs = if descriptions.is_empty() {
            Vec::new()
        } else {
            debug!(
                checkpoint_id = %checkpoint.id,
                dataset_id = %dataset.id,
                cases = descriptions.len(),
                "converting case descriptions"
            );
            self.converter
                .convert(&descriptions, &checkpoint.function_schema)
                .await
                .map_err(as_conversion_failure)?
        };

        if inputs.len() != refs.len() {
            warn!(
                checkpoint_id = %checkpoint.id,
                dataset_id = %dataset.id,
                expected = refs.len(),
                received = inputs.len(),
                "conversion count mismatch; unmatched cases dropped"
            );
        }

        let runs: Vec<CheckpointTestRun> = refs
            .into_iter()
            .zip(inputs)
            .enumerate()
            .map(|(position, (case, input))| {
                CheckpointTestRun::new(
                    dataset.tenant_id.clone(),
                    checkpoint.id,
                    dataset.id,
                    case,
                    position,
                    input,
                )
            })
            .collect();

        self.test_runs
            .replace_runs(scope, &checkpoint.id, &dataset.id, runs.clone())
            .await?;
        info!(
            checkpoint_id = %checkpoint.id,
            dataset_id = %dataset.id,
            runs = runs.len(),
            "test inputs regenerated"
        );
        Ok(runs)
    }

    /// `regenerate_inputs` for every live dataset assigned to the
    /// checkpoint's agent. Returns all runs created, dataset by dataset.
    pub async fn prepare_checkpoint(
        &self,
        scope: &TenantScope,
        checkpoint_id: &CheckpointId,
    ) -> QuoteforgeResult<Vec<CheckpointTestRun>> {
        let checkpoint = self.ledger.checkpoint(scope, checkpoint_id).await?;
        let assignments = self
            .datasets
            .list_assignments(scope, &checkpoint.agent_id)
            .await?;

        let mut runs = Vec::new();
        for assignment in assignments {
            let live = self
                .datasets
                .get_dataset(scope, &assignment.dataset_id)
                .await?
                .is_some_and(|d| !d.is_deleted());
            if !live {
                debug!(dataset_id = %assignment.dataset_id, "skipping deleted dataset");
                continue;
            }
            runs.extend(
                self.regenerate_inputs(scope, &checkpoint.id, &assignment.dataset_id)
                    .await?,
            );
        }
        Ok(runs)
    }

    // ── Execution ─────────────────────────────────────────────────────────────

    /// Execute every run bound to the checkpoint, in stored order.
    pub async fn run_batch(
        &self,
        scope: &TenantScope,
        checkpoint_id: &CheckpointId,
        options: BatchOptions,
    ) -> QuoteforgeResult<BatchReport> {
        let checkpoint = self.ledger.checkpoint(scope, checkpoint_id).await?;
        let runs = self.test_runs.list_runs(scope, &checkpoint.id).await?;
        debug!(
            checkpoint_id = %checkpoint.id,
            runs = runs.len(),
            fail_fast = options.fail_fast,
            "starting batch"
        );

        let mut outcomes = Vec::with_capacity(runs.len());
        let mut halted = false;

        for run in runs {
            let status = if halted {
                RunStatus::NotRun
            } else {
                match self.expectation(scope, &run.case).await? {
                    None => {
                        warn!(run_id = %run.id, case_id = %run.case.case_id(), "test case no longer exists");
                        RunStatus::NotRun
                    }
                    Some(expectation) => {
                        let result = self.execute_run(scope, &checkpoint, &run, expectation).await?;
                        if result.passed {
                            RunStatus::Passed
                        } else {
                            if options.fail_fast {
                                info!(run_id = %run.id, "fail-fast: no further runs will be invoked");
                                halted = true;
                            }
                            RunStatus::Failed
                        }
                    }
                }
            };
            outcomes.push(RunOutcome {
                run_id: run.id,
                case: run.case,
                status,
            });
        }

        let report = BatchReport {
            checkpoint_id: checkpoint.id,
            outcomes,
            halted_early: halted,
        };
        info!(
            checkpoint_id = %checkpoint.id,
            passed = report.passed(),
            failed = report.failed(),
            not_run = report.not_run(),
            "batch complete"
        );
        Ok(report)
    }

    /// Re-run one stored test run and overwrite its result.
    pub async fn run_single(&self, scope: &TenantScope, run_id: &TestRunId) -> QuoteforgeResult<TestResult> {
        let run = self.test_runs.get_run(scope, run_id).await?;
        let run = scope.require(run, "test run", run_id)?;
        let checkpoint = self.ledger.checkpoint(scope, &run.checkpoint_id).await?;
        let expectation = self
            .expectation(scope, &run.case)
            .await?
            .ok_or_else(|| QuoteforgeError::not_found("test case", run.case.case_id()))?;
        self.execute_run(scope, &checkpoint, &run, expectation).await
    }

    async fn expectation(
        &self,
        scope: &TenantScope,
        case: &TestCaseRef,
    ) -> QuoteforgeResult<Option<Expectation>> {
        Ok(match case {
            TestCaseRef::Happy(id) => self
                .datasets
                .get_happy_case(scope, id)
                .await?
                .filter(|c| c.deleted_at.is_none())
                .map(|c| Expectation::from(&c)),
            TestCaseRef::Unhappy(id) => self
                .datasets
                .get_unhappy_case(scope, id)
                .await?
                .filter(|c| c.deleted_at.is_none())
                .map(|c| Expectation::from(&c)),
        })
    }

    async fn execute_run(
        &self,
        scope: &TenantScope,
        checkpoint: &Checkpoint,
        run: &CheckpointTestRun,
        expectation: Expectation,
    ) -> QuoteforgeResult<TestResult> {
        debug!(run_id = %run.id, position = run.position, "executing test run");
        let outcome = self
            .executor
            .execute(
                &checkpoint.function_schema,
                &checkpoint.function_code,
                &run.structured_input,
            )
            .await;
        let result = expectation.judge(outcome);

        if let Some(fault) = &result.runner_exception {
            warn!(run_id = %run.id, kind = fault.kind(), error = %fault, "test run faulted");
        }
        self.test_runs.record_result(scope, &run.id, result.clone()).await?;
        Ok(result)
    }
}

fn as_conversion_failure(err: QuoteforgeError) -> QuoteforgeError {
    match err {
        QuoteforgeError::ConversionUnavailable { .. } => err,
        other => QuoteforgeError::ConversionUnavailable {
            reason: other.to_string(),
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    };

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use quoteforge_contracts::{
        checkpoint::NewInputMessage,
        dataset::{ErrorCategory, HappyCaseInput, TestingDataset, UnhappyCaseInput},
        execution::{ExecutionFault, FaultCause},
        ids::AgentId,
        quote::{QuoteError, QuoteResult},
    };
    use quoteforge_core::traits::CodeSynthesizer;
    use quoteforge_datasets::{DatasetCatalog, InMemoryDatasetStore};
    use quoteforge_ledger::{InMemoryAgentStore, InMemoryCheckpointStore};

    use super::*;

    // ── Mock collaborators ────────────────────────────────────────────────────

    struct FixedSynthesizer;

    #[async_trait]
    impl CodeSynthesizer for FixedSynthesizer {
        async fn synthesize_schema(
            &self,
            _description: &str,
            _feedback: Option<&str>,
            _previous_schema: Option<&str>,
        ) -> QuoteforgeResult<String> {
            Ok(r#"{"type":"object"}"#.to_string())
        }

        async fn synthesize_function(
            &self,
            _description: &str,
            _schema: &str,
            _feedback: Option<&str>,
            _previous_function: Option<&str>,
        ) -> QuoteforgeResult<String> {
            Ok("fn calculate_quote(input) { input }".to_string())
        }
    }

    /// Wraps each description as `{"case": description}`; optionally keeps
    /// only the first `limit` inputs or fails outright.
    #[derive(Default)]
    struct EchoConverter {
        limit: Option<usize>,
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl InputConverter for EchoConverter {
        async fn convert(&self, cases: &[String], _schema: &str) -> QuoteforgeResult<Vec<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(QuoteforgeError::StoreFailure {
                    reason: "converter offline".to_string(),
                });
            }
            let take = self.limit.unwrap_or(cases.len());
            Ok(cases.iter().take(take).map(|c| json!({ "case": c })).collect())
        }
    }

    /// Interprets the echoed description: `total <n>`, `error <CODE>` or `throw`.
    #[derive(Default)]
    struct ScriptedExecutor {
        invoked: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl QuoteExecutor for ScriptedExecutor {
        async fn execute(
            &self,
            _schema: &str,
            _function: &str,
            input: &Value,
        ) -> Result<QuoteResult, ExecutionFault> {
            let case = input["case"].as_str().unwrap_or_default().to_string();
            self.invoked.lock().unwrap().push(case.clone());

            let mut words = case.split_whitespace();
            match (words.next(), words.next()) {
                (Some("total"), Some(n)) => Ok(QuoteResult {
                    total: n.parse().ok(),
                    ..QuoteResult::default()
                }),
                (Some("error"), Some(code)) => Ok(QuoteResult {
                    errors: vec![QuoteError {
                        code: code.to_string(),
                        message: case.clone(),
                    }],
                    ..QuoteResult::default()
                }),
                _ => Err(ExecutionFault::runtime(FaultCause::Thrown, "uncaught: boom")),
            }
        }
    }

    // ── Fixture ───────────────────────────────────────────────────────────────

    struct Fixture {
        harness: VerificationHarness,
        ledger: Arc<CheckpointLedger>,
        catalog: DatasetCatalog,
        store: InMemoryDatasetStore,
        converter: Arc<EchoConverter>,
        executor: Arc<ScriptedExecutor>,
        agent_id: AgentId,
        checkpoint: Checkpoint,
        dataset: TestingDataset,
    }

    fn acme() -> TenantScope {
        TenantScope::tenant("acme")
    }

    async fn fixture_with(converter: EchoConverter) -> Fixture {
        let agents = Arc::new(InMemoryAgentStore::new());
        let ledger = Arc::new(CheckpointLedger::new(
            agents.clone(),
            Arc::new(InMemoryCheckpointStore::new()),
            Arc::new(FixedSynthesizer),
        ));
        let store = InMemoryDatasetStore::new();
        let catalog = DatasetCatalog::new(Arc::new(store.clone()), agents);
        let converter = Arc::new(converter);
        let executor = Arc::new(ScriptedExecutor::default());
        let harness = VerificationHarness::new(
            ledger.clone(),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            converter.clone(),
            executor.clone(),
        );

        let scope = acme();
        let (agent, v1) = ledger.register_agent(&scope, "Print shop").await.unwrap();
        let v2 = ledger
            .add_input_message(
                &scope,
                &v1.agent_id,
                &v1.id,
                NewInputMessage::text("Cards cost 8 cents."),
            )
            .await
            .unwrap();
        let v3 = ledger.regenerate_schema(&scope, &v2.id, None).await.unwrap();
        let checkpoint = ledger.regenerate_function(&scope, &v3.id, None).await.unwrap();

        let dataset = catalog.create_dataset(&scope, "Orders", "").await.unwrap();
        catalog.assign(&scope, &agent.id, &dataset.id).await.unwrap();

        Fixture {
            harness,
            ledger,
            catalog,
            store,
            converter,
            executor,
            agent_id: agent.id,
            checkpoint,
            dataset,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(EchoConverter::default()).await
    }

    impl Fixture {
        async fn happy(&self, description: &str, expected_total: f64) {
            self.catalog
                .add_happy_case(
                    &acme(),
                    &self.dataset.id,
                    HappyCaseInput {
                        description: description.to_string(),
                        expected_total,
                        expected_total_reasoning: String::new(),
                    },
                )
                .await
                .unwrap();
        }

        async fn unhappy(&self, description: &str, expected_error: ErrorCategory) {
            self.catalog
                .add_unhappy_case(
                    &acme(),
                    &self.dataset.id,
                    UnhappyCaseInput {
                        description: description.to_string(),
                        expected_error,
                        reasoning: String::new(),
                    },
                )
                .await
                .unwrap();
        }

        async fn prepare(&self) -> Vec<CheckpointTestRun> {
            self.harness
                .regenerate_inputs(&acme(), &self.checkpoint.id, &self.dataset.id)
                .await
                .unwrap()
        }

        fn invocations(&self) -> usize {
            self.executor.invoked.lock().unwrap().len()
        }
    }

    // ── Input regeneration ────────────────────────────────────────────────────

    #[tokio::test]
    async fn regeneration_orders_happy_before_unhappy() {
        let f = fixture().await;
        f.unhappy("error QUOTATION_RULE_VIOLATION", ErrorCategory::QuotationRuleViolation)
            .await;
        f.happy("total 20", 20.0).await;
        f.happy("total 12", 12.0).await;

        let runs = f.prepare().await;
        let cases: Vec<&str> = runs
            .iter()
            .map(|r| r.structured_input["case"].as_str().unwrap())
            .collect();
        assert_eq!(cases, vec!["total 20", "total 12", "error QUOTATION_RULE_VIOLATION"]);
        assert_eq!(runs.iter().map(|r| r.position).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert!(matches!(runs[2].case, TestCaseRef::Unhappy(_)));
        assert!(runs.iter().all(|r| r.result.is_none()));
        assert_eq!(f.converter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn regeneration_replaces_previous_run_set() {
        let f = fixture().await;
        f.happy("total 20", 20.0).await;
        f.prepare().await;
        f.happy("total 12", 12.0).await;
        f.prepare().await;

        let stored = f.store.list_runs(&acme(), &f.checkpoint.id).await.unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn count_mismatch_drops_unmatched_cases() {
        let f = fixture_with(EchoConverter {
            limit: Some(2),
            ..EchoConverter::default()
        })
        .await;
        f.happy("total 1", 1.0).await;
        f.happy("total 2", 2.0).await;
        f.happy("total 3", 3.0).await;

        let runs = f.prepare().await;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].structured_input["case"], "total 2");
    }

    #[tokio::test]
    async fn regeneration_needs_a_schema() {
        let f = fixture().await;
        f.happy("total 1", 1.0).await;
        let without_schema = f
            .ledger
            .add_input_message(
                &acme(),
                &f.checkpoint.agent_id,
                &f.checkpoint.id,
                NewInputMessage::text("Rush adds $15."),
            )
            .await
            .unwrap();

        let err = f
            .harness
            .regenerate_inputs(&acme(), &without_schema.id, &f.dataset.id)
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteforgeError::InvalidState { .. }));
        assert_eq!(f.converter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn conversion_failure_keeps_existing_runs() {
        let f = fixture_with(EchoConverter {
            fail: true,
            ..EchoConverter::default()
        })
        .await;
        f.happy("total 1", 1.0).await;

        let err = f
            .harness
            .regenerate_inputs(&acme(), &f.checkpoint.id, &f.dataset.id)
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteforgeError::ConversionUnavailable { .. }));
        assert!(err.is_retriable());
        assert!(f.store.list_runs(&acme(), &f.checkpoint.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn prepare_checkpoint_covers_every_assigned_dataset() {
        let f = fixture().await;
        f.happy("total 1", 1.0).await;
        let second = f.catalog.create_dataset(&acme(), "Posters", "").await.unwrap();
        f.catalog.assign(&acme(), &f.agent_id, &second.id).await.unwrap();
        f.catalog
            .add_happy_case(
                &acme(),
                &second.id,
                HappyCaseInput {
                    description: "total 9".to_string(),
                    expected_total: 9.0,
                    expected_total_reasoning: String::new(),
                },
            )
            .await
            .unwrap();

        let runs = f.harness.prepare_checkpoint(&acme(), &f.checkpoint.id).await.unwrap();
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].dataset_id, f.dataset.id);
        assert_eq!(runs[1].dataset_id, second.id);
    }

    // ── Pass rules through a batch ────────────────────────────────────────────

    #[tokio::test]
    async fn batch_applies_both_pass_rules() {
        let f = fixture().await;
        f.happy("total 100", 100.0).await;
        f.happy("total 100", 100.01).await;
        f.unhappy("error QUOTATION_RULE_VIOLATION", ErrorCategory::QuotationRuleViolation)
            .await;
        f.unhappy("error QUOTATION_RULE_VIOLATION", ErrorCategory::IncorrectInputValue)
            .await;
        f.prepare().await;

        let report = f
            .harness
            .run_batch(&acme(), &f.checkpoint.id, BatchOptions::default())
            .await
            .unwrap();
        let statuses: Vec<RunStatus> = report.outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![RunStatus::Passed, RunStatus::Failed, RunStatus::Passed, RunStatus::Failed]
        );
        assert!(!report.halted_early);
        assert!(!report.all_passed());

        let stored = f.store.list_runs(&acme(), &f.checkpoint.id).await.unwrap();
        assert!(stored.iter().all(|r| r.result.is_some()));
        assert!(stored[0].result.as_ref().unwrap().passed);
    }

    // ── Fail-fast ─────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn fail_fast_stops_after_first_failure() {
        let f = fixture().await;
        f.happy("total 1", 1.0).await;
        f.happy("total 2", 99.0).await;
        f.happy("total 3", 3.0).await;
        f.happy("total 4", 4.0).await;
        f.prepare().await;

        let report = f
            .harness
            .run_batch(&acme(), &f.checkpoint.id, BatchOptions { fail_fast: true })
            .await
            .unwrap();

        assert_eq!(f.invocations(), 2);
        assert!(report.halted_early);
        assert_eq!(report.passed(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.not_run(), 2);

        let stored = f.store.list_runs(&acme(), &f.checkpoint.id).await.unwrap();
        assert!(stored[2].result.is_none());
        assert!(stored[3].result.is_none());
    }

    #[tokio::test]
    async fn fail_fast_leaves_previous_results_in_place() {
        let f = fixture().await;
        f.happy("total 1", 1.0).await;
        f.happy("total 2", 99.0).await;
        f.happy("total 3", 3.0).await;
        f.prepare().await;

        f.harness
            .run_batch(&acme(), &f.checkpoint.id, BatchOptions::default())
            .await
            .unwrap();
        let before = f.store.list_runs(&acme(), &f.checkpoint.id).await.unwrap();

        f.harness
            .run_batch(&acme(), &f.checkpoint.id, BatchOptions { fail_fast: true })
            .await
            .unwrap();
        let after = f.store.list_runs(&acme(), &f.checkpoint.id).await.unwrap();

        assert_eq!(f.invocations(), 3 + 2);
        assert_eq!(after[2].result, before[2].result);
        assert_eq!(after[2].updated_at, before[2].updated_at);
    }

    // ── Fault isolation ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn thrown_fault_is_recorded_and_batch_continues() {
        let f = fixture().await;
        f.happy("total 1", 1.0).await;
        f.happy("throw", 2.0).await;
        f.happy("total 3", 3.0).await;
        f.prepare().await;

        let report = f
            .harness
            .run_batch(&acme(), &f.checkpoint.id, BatchOptions::default())
            .await
            .unwrap();
        assert_eq!(f.invocations(), 3);
        assert_eq!(report.outcomes[1].status, RunStatus::Failed);
        assert_eq!(report.outcomes[2].status, RunStatus::Passed);

        let stored = f.store.list_runs(&acme(), &f.checkpoint.id).await.unwrap();
        let faulted = stored[1].result.as_ref().unwrap();
        assert!(!faulted.passed);
        assert!(faulted.function_result.is_none());
        assert!(matches!(
            faulted.runner_exception,
            Some(ExecutionFault::RuntimeFault { cause: FaultCause::Thrown, .. })
        ));
    }

    // ── Single runs and missing data ──────────────────────────────────────────

    #[tokio::test]
    async fn run_single_overwrites_one_result() {
        let f = fixture().await;
        f.happy("total 5", 5.0).await;
        let runs = f.prepare().await;

        let result = f.harness.run_single(&acme(), &runs[0].id).await.unwrap();
        assert!(result.passed);

        let stored = f.store.get_run(&acme(), &runs[0].id).await.unwrap().unwrap();
        assert_eq!(stored.result, Some(result));
    }

    #[tokio::test]
    async fn deleted_case_is_not_run() {
        let f = fixture().await;
        f.happy("total 5", 5.0).await;
        let runs = f.prepare().await;
        let case_id = runs[0].case.case_id();
        f.catalog.delete_happy_case(&acme(), &case_id).await.unwrap();

        let report = f
            .harness
            .run_batch(&acme(), &f.checkpoint.id, BatchOptions::default())
            .await
            .unwrap();
        assert_eq!(report.not_run(), 1);
        assert_eq!(f.invocations(), 0);

        let err = f.harness.run_single(&acme(), &runs[0].id).await.unwrap_err();
        assert!(matches!(err, QuoteforgeError::NotFound { entity: "test case", .. }));
    }

    #[tokio::test]
    async fn foreign_tenant_cannot_run_batch() {
        let f = fixture().await;
        f.happy("total 5", 5.0).await;
        f.prepare().await;

        let err = f
            .harness
            .run_batch(&TenantScope::tenant("globex"), &f.checkpoint.id, BatchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteforgeError::NotFound { .. }));
        assert_eq!(f.invocations(), 0);
    }
}
