//! Diagnostics sinks for failed invocations.
//!
//! Reports are best effort. The engine logs a failed write and moves on.

use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tracing::debug;

use quoteforge_contracts::{
    error::{QuoteforgeError, QuoteforgeResult},
    execution::FaultReport,
};
use quoteforge_core::{
    config::DiagnosticsConfig,
    traits::{DiagnosticsSink, NullDiagnostics},
};

/// Pick the sink described by `config`.
///
/// Disabled diagnostics discard reports. Without a directory the most recent
/// `memory_capacity` reports are kept in memory.
pub fn sink_for(config: &DiagnosticsConfig) -> Arc<dyn DiagnosticsSink> {
    match (config.enabled, &config.directory) {
        (false, _) => Arc::new(NullDiagnostics),
        (true, Some(dir)) => Arc::new(DirectoryDiagnosticsSink::new(dir)),
        (true, None) => Arc::new(MemoryDiagnosticsSink::with_capacity(config.memory_capacity)),
    }
}

/// Writes each report to `<dir>/<timestamp>-<report id>.json`.
pub struct DirectoryDiagnosticsSink {
    dir: PathBuf,
}

impl DirectoryDiagnosticsSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn report_path(&self, report: &FaultReport) -> PathBuf {
        let stamp = report.occurred_at.format("%Y%m%dT%H%M%S%.3fZ");
        self.dir.join(format!("{}-{}.json", stamp, report.id))
    }
}

impl DiagnosticsSink for DirectoryDiagnosticsSink {
    fn record(&self, report: &FaultReport) -> QuoteforgeResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| QuoteforgeError::StoreFailure {
            reason: format!("cannot create diagnostics directory '{}': {}", self.dir.display(), e),
        })?;

        let path = self.report_path(report);
        let body = serde_json::to_vec_pretty(report).map_err(|e| QuoteforgeError::StoreFailure {
            reason: format!("cannot serialize fault report {}: {}", report.id, e),
        })?;
        std::fs::write(&path, body).map_err(|e| QuoteforgeError::StoreFailure {
            reason: format!("cannot write '{}': {}", path.display(), e),
        })?;

        debug!(path = %path.display(), kind = report.fault.kind(), "fault report written");
        Ok(())
    }
}

/// Keeps the most recent reports, oldest first. Used by tests and the demo.
#[derive(Clone)]
pub struct MemoryDiagnosticsSink {
    reports: Arc<Mutex<VecDeque<FaultReport>>>,
    capacity: usize,
}

impl Default for MemoryDiagnosticsSink {
    fn default() -> Self {
        Self::with_capacity(DiagnosticsConfig::default().memory_capacity)
    }
}

impl MemoryDiagnosticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink holding at most `capacity` reports (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            reports: Arc::new(Mutex::new(VecDeque::new())),
            capacity: capacity.max(1),
        }
    }

    pub fn reports(&self) -> Vec<FaultReport> {
        self.reports
            .lock()
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticsSink for MemoryDiagnosticsSink {
    fn record(&self, report: &FaultReport) -> QuoteforgeResult<()> {
        let mut reports = self.reports.lock().map_err(|e| QuoteforgeError::StoreFailure {
            reason: format!("diagnostics lock poisoned: {}", e),
        })?;
        if reports.len() == self.capacity {
            reports.pop_front();
        }
        reports.push_back(report.clone());
        Ok(())
    }
}
