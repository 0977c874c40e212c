//! Error types for the QUOTEFORGE pricing runtime.
//!
//! All fallible service and store operations return `QuoteforgeResult<T>`.
//! Execution Engine faults have their own type, `ExecutionFault`, because the
//! harness persists them inside a `TestResult` instead of raising them.

use thiserror::Error;

use crate::execution::ExecutionFault;

/// The unified error type for the QUOTEFORGE runtime.
#[derive(Debug, Error)]
pub enum QuoteforgeError {
    /// A checkpoint, message, agent, dataset, case or run does not exist in
    /// the caller's tenant scope. Not retriable.
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// The record exists but cannot support the requested operation yet,
    /// e.g. regenerating a schema without any input messages.
    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    /// The caller supplied a value the runtime refuses to store.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    /// The code synthesis collaborator failed. The caller may retry.
    #[error("code synthesis unavailable: {reason}")]
    SynthesisUnavailable { reason: String },

    /// The structured-input conversion collaborator failed. The caller may retry.
    #[error("input conversion unavailable: {reason}")]
    ConversionUnavailable { reason: String },

    /// The Execution Engine rejected or aborted a generated function.
    #[error(transparent)]
    Execution(#[from] ExecutionFault),

    /// The dataset is already bound to the agent within this tenant.
    #[error("dataset '{dataset_id}' is already assigned to agent '{agent_id}'")]
    DuplicateAssignment { agent_id: String, dataset_id: String },

    /// Another writer allocated this checkpoint version first.
    #[error("checkpoint version {version} already exists for agent '{agent_id}'")]
    VersionConflict { agent_id: String, version: u64 },

    /// The storage layer could not complete the operation.
    #[error("store operation failed: {reason}")]
    StoreFailure { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl QuoteforgeError {
    /// Shorthand for the most common error in the ledger and stores.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Return true if repeating the same call may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::SynthesisUnavailable { .. }
                | Self::ConversionUnavailable { .. }
                | Self::VersionConflict { .. }
                | Self::StoreFailure { .. }
        )
    }
}

/// Convenience alias used throughout the QUOTEFORGE crates.
pub type QuoteforgeResult<T> = Result<T, QuoteforgeError>;
