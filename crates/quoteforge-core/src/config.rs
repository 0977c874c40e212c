//! TOML-driven runtime configuration.
//!
//! Every section is optional: a missing key falls back to its default, so an
//! empty document yields a working configuration.
//!
//! Example:
//! ```toml
//! [tenancy]
//! multi_tenant = true
//!
//! [runner]
//! timeout_ms = 500
//! capabilities = ["logic", "math", "maps"]
//!
//! [diagnostics]
//! directory = "var/diagnostics"
//! ```

use std::{path::Path, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use tracing::debug;

use quoteforge_contracts::{
    capability::{CapabilitySet, SandboxCapability},
    error::{QuoteforgeError, QuoteforgeResult},
    tenant::{TenantId, TenantScope},
};

/// Multi-tenancy switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// When false, every caller sees every record (`TenantScope::Shared`).
    pub multi_tenant: bool,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self { multi_tenant: true }
    }
}

/// Per-invocation ceilings for the Execution Engine sandbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Wall-clock budget for compile + invoke, in milliseconds.
    pub timeout_ms: u64,
    /// Maximum number of script operations per invocation.
    pub max_operations: u64,
    /// Maximum function call nesting.
    pub max_call_levels: usize,
    /// Maximum expression nesting at global level.
    pub max_expr_depth: usize,
    /// Maximum expression nesting inside functions.
    pub max_function_expr_depth: usize,
    /// Maximum length of any string value, in bytes.
    pub max_string_size: usize,
    /// Maximum number of elements in any array.
    pub max_array_size: usize,
    /// Maximum number of properties in any object map.
    pub max_map_size: usize,
    /// Function families exposed to generated code.
    pub capabilities: Vec<SandboxCapability>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            max_operations: 5_000_000,
            max_call_levels: 64,
            max_expr_depth: 64,
            max_function_expr_depth: 32,
            max_string_size: 1024 * 1024,
            max_array_size: 100_000,
            max_map_size: 10_000,
            capabilities: CapabilitySet::standard().all().collect(),
        }
    }
}

impl RunnerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn capability_set(&self) -> CapabilitySet {
        self.capabilities.iter().copied().collect()
    }
}

/// Where failing generated source is kept for troubleshooting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub enabled: bool,
    /// Directory for report files. `None` keeps reports in memory only.
    pub directory: Option<PathBuf>,
    /// Reports kept in memory when no directory is set. The oldest report is
    /// dropped first.
    pub memory_capacity: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            memory_capacity: 256,
        }
    }
}

/// Defaults for batch verification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Stop scheduling runs after the first failure.
    pub fail_fast: bool,
}

/// Defaults for ledger reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Page size used when a history request names no limit.
    pub history_page_size: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            history_page_size: 20,
        }
    }
}

/// The top-level structure deserialized from a QUOTEFORGE TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteforgeConfig {
    pub tenancy: TenancyConfig,
    pub runner: RunnerConfig,
    pub diagnostics: DiagnosticsConfig,
    pub harness: HarnessConfig,
    pub ledger: LedgerConfig,
}

impl QuoteforgeConfig {
    /// Parse `s` as TOML and validate the result.
    ///
    /// Returns `QuoteforgeError::ConfigError` if the TOML is malformed, does
    /// not match the expected structure, or names an unusable limit.
    pub fn from_toml_str(s: &str) -> QuoteforgeResult<Self> {
        let config: QuoteforgeConfig = toml::from_str(s).map_err(|e| QuoteforgeError::ConfigError {
            reason: format!("failed to parse configuration TOML: {}", e),
        })?;
        config.validate()?;
        debug!(
            multi_tenant = config.tenancy.multi_tenant,
            timeout_ms = config.runner.timeout_ms,
            "configuration loaded"
        );
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML configuration.
    pub fn from_file(path: &Path) -> QuoteforgeResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| QuoteforgeError::ConfigError {
            reason: format!("failed to read configuration file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Build the visibility scope for a caller acting on behalf of `tenant`.
    pub fn scope_for(&self, tenant: impl Into<String>) -> TenantScope {
        let tenant = TenantId::new(tenant);
        if self.tenancy.multi_tenant {
            TenantScope::Tenant(tenant)
        } else {
            TenantScope::Shared(tenant)
        }
    }

    fn validate(&self) -> QuoteforgeResult<()> {
        let runner = &self.runner;
        let zero = [
            ("runner.timeout_ms", runner.timeout_ms == 0),
            ("runner.max_operations", runner.max_operations == 0),
            ("runner.max_call_levels", runner.max_call_levels == 0),
            ("ledger.history_page_size", self.ledger.history_page_size == 0),
            ("diagnostics.memory_capacity", self.diagnostics.memory_capacity == 0),
        ];
        if let Some((key, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(QuoteforgeError::ConfigError {
                reason: format!("'{}' must be greater than zero", key),
            });
        }
        Ok(())
    }
}
