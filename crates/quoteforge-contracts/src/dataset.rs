//! Testing datasets, their scenario cases and agent assignments.
//!
//! A dataset is a tenant-scoped bag of natural-language scenarios that is
//! independent of any checkpoint. Happy-path cases expect a known total;
//! unhappy-path cases expect the pricing function to report one of a closed
//! set of error categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ids::{AgentId, AssignmentId, CaseId, CheckpointId, DatasetId},
    tenant::{TenantId, TenantOwned, TenantScope},
};

/// The closed set of error categories an unhappy-path case may expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    IncorrectInputValue,
    MissingInputValue,
    QuotationRuleViolation,
    UnsupportedRequest,
}

impl ErrorCategory {
    pub const ALL: [ErrorCategory; 4] = [
        Self::IncorrectInputValue,
        Self::MissingInputValue,
        Self::QuotationRuleViolation,
        Self::UnsupportedRequest,
    ];

    /// The code a pricing function puts in `QuoteError::code`.
    pub fn code(&self) -> &'static str {
        match self {
            Self::IncorrectInputValue => "INCORRECT_INPUT_VALUE",
            Self::MissingInputValue => "MISSING_INPUT_VALUE",
            Self::QuotationRuleViolation => "QUOTATION_RULE_VIOLATION",
            Self::UnsupportedRequest => "UNSUPPORTED_REQUEST",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for ErrorCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.code() == s)
            .ok_or_else(|| format!("unknown error category '{s}'"))
    }
}

/// A named bag of scenarios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestingDataset {
    pub id: DatasetId,
    pub tenant_id: TenantId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TestingDataset {
    pub fn new(tenant_id: TenantId, name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: DatasetId::new(),
            tenant_id,
            name: name.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A scenario expected to produce a known total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetHappyPathCase {
    pub id: CaseId,
    pub dataset_id: DatasetId,
    pub tenant_id: TenantId,
    /// Natural-language order description.
    pub description: String,
    pub expected_total: f64,
    pub expected_total_reasoning: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A scenario expected to fail with a known error category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetUnhappyPathCase {
    pub id: CaseId,
    pub dataset_id: DatasetId,
    pub tenant_id: TenantId,
    /// Natural-language order description.
    pub description: String,
    pub expected_error: ErrorCategory,
    pub reasoning: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Caller-supplied content of a happy-path case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HappyCaseInput {
    pub description: String,
    pub expected_total: f64,
    pub expected_total_reasoning: String,
}

/// Caller-supplied content of an unhappy-path case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnhappyCaseInput {
    pub description: String,
    pub expected_error: ErrorCategory,
    pub reasoning: String,
}

/// The live cases of one dataset, each list in creation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetCases {
    pub happy: Vec<DatasetHappyPathCase>,
    pub unhappy: Vec<DatasetUnhappyPathCase>,
}

impl DatasetCases {
    pub fn len(&self) -> usize {
        self.happy.len() + self.unhappy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Many-to-many link between an agent and a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetAssignment {
    pub id: AssignmentId,
    pub tenant_id: TenantId,
    pub agent_id: AgentId,
    pub dataset_id: DatasetId,
    pub created_at: DateTime<Utc>,
}

/// Flexible dataset query. Substring filters are case-insensitive.
#[derive(Debug, Clone)]
pub struct DatasetFilter {
    pub scope: TenantScope,
    pub name_contains: Option<String>,
    pub description_contains: Option<String>,
    /// Keep only datasets with test runs bound to this checkpoint.
    pub checkpoint_id: Option<CheckpointId>,
    pub include_deleted: bool,
}

impl DatasetFilter {
    pub fn new(scope: TenantScope) -> Self {
        Self {
            scope,
            name_contains: None,
            description_contains: None,
            checkpoint_id: None,
            include_deleted: false,
        }
    }

    /// Check the text and deletion criteria. The checkpoint criterion needs
    /// test-run data and is applied by the store.
    pub fn matches(&self, dataset: &TestingDataset) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            needle
                .as_ref()
                .map_or(true, |n| haystack.to_lowercase().contains(&n.to_lowercase()))
        }

        self.scope.contains(dataset)
            && (self.include_deleted || !dataset.is_deleted())
            && contains(&dataset.name, &self.name_contains)
            && contains(&dataset.description, &self.description_contains)
    }
}

impl TenantOwned for TestingDataset {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

impl TenantOwned for DatasetHappyPathCase {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

impl TenantOwned for DatasetUnhappyPathCase {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}

impl TenantOwned for DatasetAssignment {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}
