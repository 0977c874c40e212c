//! In-memory `DatasetStore` and `TestRunStore`.
//!
//! One store backs both traits because the dataset query's checkpoint filter
//! needs to see test runs. Every list keeps insertion order, which is the
//! stable order the harness relies on.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

use quoteforge_contracts::{
    dataset::{
        DatasetAssignment, DatasetCases, DatasetFilter, DatasetHappyPathCase,
        DatasetUnhappyPathCase, TestingDataset,
    },
    error::{QuoteforgeError, QuoteforgeResult},
    ids::{AgentId, CaseId, CheckpointId, DatasetId, TestRunId},
    tenant::{TenantOwned, TenantScope},
    test_run::{CheckpointTestRun, TestResult},
};
use quoteforge_core::traits::{DatasetStore, TestRunStore};

#[derive(Default)]
struct DatasetState {
    datasets: Vec<TestingDataset>,
    happy: Vec<DatasetHappyPathCase>,
    unhappy: Vec<DatasetUnhappyPathCase>,
    assignments: Vec<DatasetAssignment>,
    runs: Vec<CheckpointTestRun>,
}

#[derive(Clone, Default)]
pub struct InMemoryDatasetStore {
    state: Arc<Mutex<DatasetState>>,
}

impl InMemoryDatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> QuoteforgeResult<MutexGuard<'_, DatasetState>> {
        self.state.lock().map_err(|e| QuoteforgeError::StoreFailure {
            reason: format!("dataset store lock poisoned: {}", e),
        })
    }
}

/// Replace the element whose id matches and that is visible in `scope`, or
/// report `NotFound`.
fn replace<T: TenantOwned>(
    scope: &TenantScope,
    items: &mut [T],
    item: T,
    entity: &'static str,
    same: impl Fn(&T, &T) -> bool,
    id: impl ToString,
) -> QuoteforgeResult<()> {
    let slot = scope.require(
        items.iter_mut().find(|existing| same(existing, &item)),
        entity,
        id,
    )?;
    *slot = item;
    Ok(())
}

#[async_trait]
impl DatasetStore for InMemoryDatasetStore {
    async fn insert_dataset(&self, dataset: TestingDataset) -> QuoteforgeResult<()> {
        self.lock()?.datasets.push(dataset);
        Ok(())
    }

    async fn get_dataset(
        &self,
        scope: &TenantScope,
        id: &DatasetId,
    ) -> QuoteforgeResult<Option<TestingDataset>> {
        let state = self.lock()?;
        Ok(scope.filter(state.datasets.iter().find(|d| d.id == *id).cloned()))
    }

    async fn update_dataset(&self, scope: &TenantScope, dataset: TestingDataset) -> QuoteforgeResult<()> {
        let id = dataset.id;
        replace(scope, &mut self.lock()?.datasets, dataset, "dataset", |a, b| a.id == b.id, id)
    }

    async fn list_datasets(&self, filter: &DatasetFilter) -> QuoteforgeResult<Vec<TestingDataset>> {
        let state = self.lock()?;
        let matching: Vec<TestingDataset> = state
            .datasets
            .iter()
            .filter(|d| filter.matches(d))
            .filter(|d| match &filter.checkpoint_id {
                Some(cp) => state
                    .runs
                    .iter()
                    .any(|r| r.checkpoint_id == *cp && r.dataset_id == d.id),
                None => true,
            })
            .cloned()
            .collect();
        debug!(count = matching.len(), "datasets listed");
        Ok(matching)
    }

    async fn insert_happy_case(&self, case: DatasetHappyPathCase) -> QuoteforgeResult<()> {
        self.lock()?.happy.push(case);
        Ok(())
    }

    async fn insert_unhappy_case(&self, case: DatasetUnhappyPathCase) -> QuoteforgeResult<()> {
        self.lock()?.unhappy.push(case);
        Ok(())
    }

    async fn update_happy_case(&self, scope: &TenantScope, case: DatasetHappyPathCase) -> QuoteforgeResult<()> {
        let id = case.id;
        replace(scope, &mut self.lock()?.happy, case, "happy path case", |a, b| a.id == b.id, id)
    }

    async fn update_unhappy_case(
        &self,
        scope: &TenantScope,
        case: DatasetUnhappyPathCase,
    ) -> QuoteforgeResult<()> {
        let id = case.id;
        replace(scope, &mut self.lock()?.unhappy, case, "unhappy path case", |a, b| a.id == b.id, id)
    }

    async fn get_happy_case(
        &self,
        scope: &TenantScope,
        id: &CaseId,
    ) -> QuoteforgeResult<Option<DatasetHappyPathCase>> {
        let state = self.lock()?;
        Ok(scope.filter(state.happy.iter().find(|c| c.id == *id).cloned()))
    }

    async fn get_unhappy_case(
        &self,
        scope: &TenantScope,
        id: &CaseId,
    ) -> QuoteforgeResult<Option<DatasetUnhappyPathCase>> {
        let state = self.lock()?;
        Ok(scope.filter(state.unhappy.iter().find(|c| c.id == *id).cloned()))
    }

    async fn list_cases(
        &self,
        scope: &TenantScope,
        dataset_id: &DatasetId,
    ) -> QuoteforgeResult<DatasetCases> {
        let state = self.lock()?;
        Ok(DatasetCases {
            happy: state
                .happy
                .iter()
                .filter(|c| c.dataset_id == *dataset_id && c.deleted_at.is_none() && scope.contains(*c))
                .cloned()
                .collect(),
            unhappy: state
                .unhappy
                .iter()
                .filter(|c| c.dataset_id == *dataset_id && c.deleted_at.is_none() && scope.contains(*c))
                .cloned()
                .collect(),
        })
    }

    async fn insert_assignment(&self, assignment: DatasetAssignment) -> QuoteforgeResult<()> {
        let mut state = self.lock()?;
        let duplicate = state.assignments.iter().any(|a| {
            a.agent_id == assignment.agent_id
                && a.dataset_id == assignment.dataset_id
                && a.tenant_id == assignment.tenant_id
        });
        if duplicate {
            return Err(QuoteforgeError::DuplicateAssignment {
                agent_id: assignment.agent_id.to_string(),
                dataset_id: assignment.dataset_id.to_string(),
            });
        }
        state.assignments.push(assignment);
        Ok(())
    }

    async fn delete_assignment(
        &self,
        scope: &TenantScope,
        agent_id: &AgentId,
        dataset_id: &DatasetId,
    ) -> QuoteforgeResult<bool> {
        let mut state = self.lock()?;
        let before = state.assignments.len();
        state.assignments.retain(|a| {
            !(a.agent_id == *agent_id && a.dataset_id == *dataset_id && scope.contains(a))
        });
        Ok(state.assignments.len() < before)
    }

    async fn list_assignments(
        &self,
        scope: &TenantScope,
        agent_id: &AgentId,
    ) -> QuoteforgeResult<Vec<DatasetAssignment>> {
        let state = self.lock()?;
        Ok(state
            .assignments
            .iter()
            .filter(|a| a.agent_id == *agent_id && scope.contains(*a))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TestRunStore for InMemoryDatasetStore {
    async fn replace_runs(
        &self,
        scope: &TenantScope,
        checkpoint_id: &CheckpointId,
        dataset_id: &DatasetId,
        runs: Vec<CheckpointTestRun>,
    ) -> QuoteforgeResult<()> {
        if let Some(foreign) = runs.iter().find(|r| !scope.contains(*r)) {
            return Err(QuoteforgeError::not_found("dataset", foreign.dataset_id));
        }
        let mut state = self.lock()?;
        state.runs.retain(|r| {
            !(r.checkpoint_id == *checkpoint_id && r.dataset_id == *dataset_id && scope.contains(r))
        });
        debug!(
            checkpoint_id = %checkpoint_id,
            dataset_id = %dataset_id,
            count = runs.len(),
            "test runs replaced"
        );
        state.runs.extend(runs);
        Ok(())
    }

    async fn list_runs(
        &self,
        scope: &TenantScope,
        checkpoint_id: &CheckpointId,
    ) -> QuoteforgeResult<Vec<CheckpointTestRun>> {
        let state = self.lock()?;
        Ok(state
            .runs
            .iter()
            .filter(|r| r.checkpoint_id == *checkpoint_id && scope.contains(*r))
            .cloned()
            .collect())
    }

    async fn get_run(
        &self,
        scope: &TenantScope,
        id: &TestRunId,
    ) -> QuoteforgeResult<Option<CheckpointTestRun>> {
        let state = self.lock()?;
        Ok(scope.filter(state.runs.iter().find(|r| r.id == *id).cloned()))
    }

    async fn record_result(
        &self,
        scope: &TenantScope,
        id: &TestRunId,
        result: TestResult,
    ) -> QuoteforgeResult<()> {
        let mut state = self.lock()?;
        let run = scope.require(state.runs.iter_mut().find(|r| r.id == *id), "test run", id)?;
        run.result = Some(result);
        run.updated_at = Utc::now();
        Ok(())
    }
}
