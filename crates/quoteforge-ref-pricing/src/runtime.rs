//! `ReferenceRuntime`: every QUOTEFORGE service wired together over the
//! in-memory stores.

use std::sync::Arc;

use tracing::info;

use quoteforge_contracts::{
    agent::PricingAgent,
    checkpoint::{Checkpoint, NewInputMessage},
    dataset::{HappyCaseInput, TestingDataset, UnhappyCaseInput},
    error::QuoteforgeResult,
    execution::FaultReport,
    ids::CheckpointId,
    tenant::TenantScope,
    test_run::CheckpointTestRun,
};
use quoteforge_core::{
    config::QuoteforgeConfig,
    traits::{CodeSynthesizer, DiagnosticsSink, TestRunStore},
};
use quoteforge_datasets::{DatasetCatalog, InMemoryDatasetStore};
use quoteforge_ledger::{CheckpointLedger, InMemoryAgentStore, InMemoryCheckpointStore};
use quoteforge_runner::{sink_for, ExecutionEngine, MemoryDiagnosticsSink};
use quoteforge_verify::VerificationHarness;

use crate::conversion::KeywordInputConverter;

pub struct ReferenceRuntime {
    pub config: QuoteforgeConfig,
    pub ledger: Arc<CheckpointLedger>,
    pub catalog: DatasetCatalog,
    pub harness: VerificationHarness,
    pub engine: Arc<ExecutionEngine>,
    test_runs: Arc<InMemoryDatasetStore>,
    /// Set when diagnostics are kept in memory rather than on disk.
    memory_reports: Option<MemoryDiagnosticsSink>,
}

impl ReferenceRuntime {
    pub fn new(config: QuoteforgeConfig, synthesizer: Arc<dyn CodeSynthesizer>) -> QuoteforgeResult<Self> {
        let agents = Arc::new(InMemoryAgentStore::new());
        let checkpoints = Arc::new(InMemoryCheckpointStore::new());
        let datasets = Arc::new(InMemoryDatasetStore::new());

        let ledger = Arc::new(
            CheckpointLedger::new(agents.clone(), checkpoints, synthesizer)
                .with_history_page_size(config.ledger.history_page_size),
        );
        let catalog = DatasetCatalog::new(datasets.clone(), agents);

        let memory_reports = (config.diagnostics.enabled && config.diagnostics.directory.is_none())
            .then(|| MemoryDiagnosticsSink::with_capacity(config.diagnostics.memory_capacity));
        let diagnostics: Arc<dyn DiagnosticsSink> = match &memory_reports {
            Some(memory) => Arc::new(memory.clone()),
            None => sink_for(&config.diagnostics),
        };
        let engine = Arc::new(ExecutionEngine::new(config.runner.clone()).with_diagnostics(diagnostics));

        let harness = VerificationHarness::new(
            ledger.clone(),
            datasets.clone(),
            datasets.clone(),
            Arc::new(KeywordInputConverter::new()?),
            engine.clone(),
        );

        Ok(Self {
            config,
            ledger,
            catalog,
            harness,
            engine,
            test_runs: datasets,
            memory_reports,
        })
    }

    pub fn scope(&self, tenant: &str) -> TenantScope {
        self.config.scope_for(tenant)
    }

    /// Fault reports captured in memory. Empty when reports go to disk or
    /// diagnostics are disabled.
    pub fn fault_reports(&self) -> Vec<FaultReport> {
        self.memory_reports
            .as_ref()
            .map(MemoryDiagnosticsSink::reports)
            .unwrap_or_default()
    }

    /// Stored runs of a checkpoint with their latest results.
    pub async fn runs(
        &self,
        scope: &TenantScope,
        checkpoint_id: &CheckpointId,
    ) -> QuoteforgeResult<Vec<CheckpointTestRun>> {
        self.test_runs.list_runs(scope, checkpoint_id).await
    }

    /// Register an agent, feed it `messages` one checkpoint at a time, then
    /// synthesize its schema and function. Returns the agent and the final
    /// checkpoint.
    pub async fn build_agent(
        &self,
        scope: &TenantScope,
        name: &str,
        messages: &[&str],
    ) -> QuoteforgeResult<(PricingAgent, Checkpoint)> {
        let (agent, mut head) = self.ledger.register_agent(scope, name).await?;
        for message in messages {
            head = self
                .ledger
                .add_input_message(scope, &head.agent_id, &head.id, NewInputMessage::text(*message))
                .await?;
        }
        head = self.ledger.regenerate_schema(scope, &head.id, None).await?;
        head = self.ledger.regenerate_function(scope, &head.id, None).await?;
        info!(agent_id = %agent.id, version = head.version, "reference agent built");
        Ok((agent, head))
    }

    /// Create a dataset with the given cases and assign it to `agent`.
    pub async fn seed_dataset(
        &self,
        scope: &TenantScope,
        agent: &PricingAgent,
        name: &str,
        happy: Vec<HappyCaseInput>,
        unhappy: Vec<UnhappyCaseInput>,
    ) -> QuoteforgeResult<TestingDataset> {
        let dataset = self.catalog.create_dataset(scope, name, "reference scenarios").await?;
        for case in happy {
            self.catalog.add_happy_case(scope, &dataset.id, case).await?;
        }
        for case in unhappy {
            self.catalog.add_unhappy_case(scope, &dataset.id, case).await?;
        }
        self.catalog.assign(scope, &agent.id, &dataset.id).await?;
        Ok(dataset)
    }
}
