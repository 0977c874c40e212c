//! `DatasetCatalog`: tenant-scoped management of datasets, their cases and
//! their assignments to pricing agents.
//!
//! Datasets are independent of checkpoints. A dataset assigned to an agent is
//! what the verification harness converts into concrete test runs whenever a
//! checkpoint of that agent is prepared.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use quoteforge_contracts::{
    dataset::{
        DatasetAssignment, DatasetCases, DatasetFilter, DatasetHappyPathCase,
        DatasetUnhappyPathCase, HappyCaseInput, TestingDataset, UnhappyCaseInput,
    },
    error::{QuoteforgeError, QuoteforgeResult},
    ids::{AgentId, AssignmentId, CaseId, DatasetId},
    tenant::TenantScope,
};
use quoteforge_core::traits::{AgentStore, DatasetStore};

pub struct DatasetCatalog {
    datasets: Arc<dyn DatasetStore>,
    agents: Arc<dyn AgentStore>,
}

impl DatasetCatalog {
    pub fn new(datasets: Arc<dyn DatasetStore>, agents: Arc<dyn AgentStore>) -> Self {
        Self { datasets, agents }
    }

    // ── Datasets ──────────────────────────────────────────────────────────────

    pub async fn create_dataset(
        &self,
        scope: &TenantScope,
        name: &str,
        description: &str,
    ) -> QuoteforgeResult<TestingDataset> {
        let name = non_empty(name, "dataset name")?;
        let dataset = TestingDataset::new(scope.owner().clone(), name, description.trim());
        self.datasets.insert_dataset(dataset.clone()).await?;
        info!(dataset_id = %dataset.id, tenant = %dataset.tenant_id, "dataset created");
        Ok(dataset)
    }

    /// Fetch a live dataset. Deleted and foreign datasets are `NotFound`.
    pub async fn dataset(&self, scope: &TenantScope, id: &DatasetId) -> QuoteforgeResult<TestingDataset> {
        let found = self.datasets.get_dataset(scope, id).await?;
        scope.require(found.filter(|d| !d.is_deleted()), "dataset", id)
    }

    /// Change name and/or description. `None` keeps the current value.
    pub async fn update_dataset(
        &self,
        scope: &TenantScope,
        id: &DatasetId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> QuoteforgeResult<TestingDataset> {
        let mut dataset = self.dataset(scope, id).await?;
        if let Some(name) = name {
            dataset.name = non_empty(name, "dataset name")?;
        }
        if let Some(description) = description {
            dataset.description = description.trim().to_string();
        }
        dataset.updated_at = Utc::now();
        self.datasets.update_dataset(scope, dataset.clone()).await?;
        Ok(dataset)
    }

    /// Soft-delete. Cases and assignments stay in storage.
    pub async fn delete_dataset(&self, scope: &TenantScope, id: &DatasetId) -> QuoteforgeResult<()> {
        let mut dataset = self.dataset(scope, id).await?;
        let now = Utc::now();
        dataset.deleted_at = Some(now);
        dataset.updated_at = now;
        self.datasets.update_dataset(scope, dataset).await?;
        info!(dataset_id = %id, "dataset deleted");
        Ok(())
    }

    pub async fn list_datasets(&self, filter: &DatasetFilter) -> QuoteforgeResult<Vec<TestingDataset>> {
        self.datasets.list_datasets(filter).await
    }

    // ── Cases ─────────────────────────────────────────────────────────────────

    pub async fn add_happy_case(
        &self,
        scope: &TenantScope,
        dataset_id: &DatasetId,
        input: HappyCaseInput,
    ) -> QuoteforgeResult<DatasetHappyPathCase> {
        let dataset = self.dataset(scope, dataset_id).await?;
        let description = non_empty(&input.description, "case description")?;
        finite_total(input.expected_total)?;

        let case = DatasetHappyPathCase {
            id: CaseId::new(),
            dataset_id: dataset.id,
            tenant_id: dataset.tenant_id,
            description,
            expected_total: input.expected_total,
            expected_total_reasoning: input.expected_total_reasoning,
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.datasets.insert_happy_case(case.clone()).await?;
        debug!(case_id = %case.id, dataset_id = %dataset_id, "happy path case added");
        Ok(case)
    }

    pub async fn add_unhappy_case(
        &self,
        scope: &TenantScope,
        dataset_id: &DatasetId,
        input: UnhappyCaseInput,
    ) -> QuoteforgeResult<DatasetUnhappyPathCase> {
        let dataset = self.dataset(scope, dataset_id).await?;
        let description = non_empty(&input.description, "case description")?;

        let case = DatasetUnhappyPathCase {
            id: CaseId::new(),
            dataset_id: dataset.id,
            tenant_id: dataset.tenant_id,
            description,
            expected_error: input.expected_error,
            reasoning: input.reasoning,
            created_at: Utc::now(),
            deleted_at: None,
        };
        self.datasets.insert_unhappy_case(case.clone()).await?;
        debug!(case_id = %case.id, dataset_id = %dataset_id, "unhappy path case added");
        Ok(case)
    }

    pub async fn update_happy_case(
        &self,
        scope: &TenantScope,
        case_id: &CaseId,
        input: HappyCaseInput,
    ) -> QuoteforgeResult<DatasetHappyPathCase> {
        let mut case = self.happy_case(scope, case_id).await?;
        case.description = non_empty(&input.description, "case description")?;
        finite_total(input.expected_total)?;
        case.expected_total = input.expected_total;
        case.expected_total_reasoning = input.expected_total_reasoning;
        self.datasets.update_happy_case(scope, case.clone()).await?;
        Ok(case)
    }

    pub async fn update_unhappy_case(
        &self,
        scope: &TenantScope,
        case_id: &CaseId,
        input: UnhappyCaseInput,
    ) -> QuoteforgeResult<DatasetUnhappyPathCase> {
        let mut case = self.unhappy_case(scope, case_id).await?;
        case.description = non_empty(&input.description, "case description")?;
        case.expected_error = input.expected_error;
        case.reasoning = input.reasoning;
        self.datasets.update_unhappy_case(scope, case.clone()).await?;
        Ok(case)
    }

    pub async fn delete_happy_case(&self, scope: &TenantScope, case_id: &CaseId) -> QuoteforgeResult<()> {
        let mut case = self.happy_case(scope, case_id).await?;
        case.deleted_at = Some(Utc::now());
        self.datasets.update_happy_case(scope, case).await
    }

    pub async fn delete_unhappy_case(&self, scope: &TenantScope, case_id: &CaseId) -> QuoteforgeResult<()> {
        let mut case = self.unhappy_case(scope, case_id).await?;
        case.deleted_at = Some(Utc::now());
        self.datasets.update_unhappy_case(scope, case).await
    }

    /// Live cases of a live dataset, each kind in creation order.
    pub async fn cases(&self, scope: &TenantScope, dataset_id: &DatasetId) -> QuoteforgeResult<DatasetCases> {
        self.dataset(scope, dataset_id).await?;
        self.datasets.list_cases(scope, dataset_id).await
    }

    async fn happy_case(&self, scope: &TenantScope, id: &CaseId) -> QuoteforgeResult<DatasetHappyPathCase> {
        let found = self.datasets.get_happy_case(scope, id).await?;
        scope.require(found.filter(|c| c.deleted_at.is_none()), "happy path case", id)
    }

    async fn unhappy_case(&self, scope: &TenantScope, id: &CaseId) -> QuoteforgeResult<DatasetUnhappyPathCase> {
        let found = self.datasets.get_unhappy_case(scope, id).await?;
        scope.require(found.filter(|c| c.deleted_at.is_none()), "unhappy path case", id)
    }

    // ── Assignments ───────────────────────────────────────────────────────────

    /// Bind a dataset to an agent. Both must be live and visible in `scope`.
    ///
    /// Assigning the same pair twice fails with `DuplicateAssignment` and
    /// leaves exactly one assignment in place.
    pub async fn assign(
        &self,
        scope: &TenantScope,
        agent_id: &AgentId,
        dataset_id: &DatasetId,
    ) -> QuoteforgeResult<DatasetAssignment> {
        let agent = self.agents.get(scope, agent_id).await?;
        let agent = scope.require(agent.filter(|a| !a.is_deleted()), "agent", agent_id)?;
        let dataset = self.dataset(scope, dataset_id).await?;

        let assignment = DatasetAssignment {
            id: AssignmentId::new(),
            tenant_id: agent.tenant_id,
            agent_id: agent.id,
            dataset_id: dataset.id,
            created_at: Utc::now(),
        };
        self.datasets.insert_assignment(assignment.clone()).await?;
        info!(agent_id = %agent_id, dataset_id = %dataset_id, "dataset assigned");
        Ok(assignment)
    }

    pub async fn unassign(
        &self,
        scope: &TenantScope,
        agent_id: &AgentId,
        dataset_id: &DatasetId,
    ) -> QuoteforgeResult<()> {
        if !self.datasets.delete_assignment(scope, agent_id, dataset_id).await? {
            return Err(QuoteforgeError::not_found(
                "assignment",
                format!("{agent_id}/{dataset_id}"),
            ));
        }
        info!(agent_id = %agent_id, dataset_id = %dataset_id, "dataset unassigned");
        Ok(())
    }

    pub async fn assignments(
        &self,
        scope: &TenantScope,
        agent_id: &AgentId,
    ) -> QuoteforgeResult<Vec<DatasetAssignment>> {
        self.datasets.list_assignments(scope, agent_id).await
    }
}

fn non_empty(value: &str, what: &str) -> QuoteforgeResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(QuoteforgeError::InvalidInput {
            reason: format!("{what} must not be empty"),
        });
    }
    Ok(trimmed.to_string())
}

fn finite_total(total: f64) -> QuoteforgeResult<()> {
    if !total.is_finite() {
        return Err(QuoteforgeError::InvalidInput {
            reason: format!("expected total {total} is not a finite number"),
        });
    }
    Ok(())
}
