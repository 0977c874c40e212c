//! `ExecutionEngine`: the public entry point of the runner.
//!
//! The async path moves each invocation onto the blocking pool and wraps it
//! in an outer timeout slightly longer than the sandbox's own deadline, so a
//! script stuck in a host call that never yields still comes back as a
//! `Timeout` fault. The worker thread is abandoned in that case.
//!
//! Fault reports from the async path are written on the blocking pool while
//! the caller carries on. A short-lived caller, such as a CLI about to exit,
//! calls `flush_diagnostics` first.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use quoteforge_contracts::{
    execution::{ExecutionFault, FaultCause, FaultReport},
    quote::QuoteResult,
};
use quoteforge_core::{
    config::RunnerConfig,
    traits::{DiagnosticsSink, NullDiagnostics, QuoteExecutor},
};

use crate::sandbox::run_sandboxed;

/// Extra time granted to the outer timeout beyond the sandbox deadline.
const DEADLINE_GRACE: Duration = Duration::from_millis(250);

/// Runs generated pricing functions in a fresh sandbox per call.
pub struct ExecutionEngine {
    config: RunnerConfig,
    diagnostics: Arc<dyn DiagnosticsSink>,
    pending_reports: Mutex<JoinSet<()>>,
}

impl ExecutionEngine {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            diagnostics: Arc::new(NullDiagnostics),
            pending_reports: Mutex::new(JoinSet::new()),
        }
    }

    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run on the current thread. The diagnostics report, if any, is written
    /// before returning.
    pub fn execute_blocking(
        &self,
        schema: &str,
        function: &str,
        input: &Value,
    ) -> Result<QuoteResult, ExecutionFault> {
        debug!(function_len = function.len(), "executing pricing function");
        let outcome = run_sandboxed(&self.config, schema, function, input);
        if let Err(fault) = &outcome {
            log_fault(fault);
            let report = FaultReport::new(fault.clone(), schema, function, input);
            if let Err(e) = self.diagnostics.record(&report) {
                warn!(report_id = %report.id, error = %e, "fault report could not be stored");
            }
        }
        outcome
    }

    /// Wait until every fault report queued by `execute` has been written.
    pub async fn flush_diagnostics(&self) {
        let mut pending = match self.pending_reports.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        let mut flushed = 0usize;
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "fault report writer did not finish");
            }
            flushed += 1;
        }
        if flushed > 0 {
            debug!(flushed, "diagnostics flushed");
        }
    }

    fn queue_report(&self, report: FaultReport) {
        let sink = Arc::clone(&self.diagnostics);
        let write = move || {
            if let Err(e) = sink.record(&report) {
                warn!(report_id = %report.id, error = %e, "fault report could not be stored");
            }
        };
        match self.pending_reports.lock() {
            Ok(mut pending) => {
                // Drop handles of writes that already finished.
                while pending.try_join_next().is_some() {}
                pending.spawn_blocking(write);
            }
            Err(_) => {
                tokio::task::spawn_blocking(write);
            }
        }
    }
}

#[async_trait]
impl QuoteExecutor for ExecutionEngine {
    async fn execute(
        &self,
        schema: &str,
        function: &str,
        input: &Value,
    ) -> Result<QuoteResult, ExecutionFault> {
        debug!(function_len = function.len(), "executing pricing function");

        let config = self.config.clone();
        let (owned_schema, owned_function, owned_input) =
            (schema.to_string(), function.to_string(), input.clone());
        let worker = tokio::task::spawn_blocking(move || {
            run_sandboxed(&config, &owned_schema, &owned_function, &owned_input)
        });

        let budget = self.config.timeout() + DEADLINE_GRACE;
        let outcome = match tokio::time::timeout(budget, worker).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_error)) => Err(ExecutionFault::runtime(
                FaultCause::HostPanic,
                format!("sandbox worker lost: {join_error}"),
            )),
            Err(_) => Err(ExecutionFault::runtime(
                FaultCause::Timeout,
                format!("no result within {} ms", budget.as_millis()),
            )),
        };

        if let Err(fault) = &outcome {
            log_fault(fault);
            self.queue_report(FaultReport::new(fault.clone(), schema, function, input));
        }
        outcome
    }
}

fn log_fault(fault: &ExecutionFault) {
    warn!(kind = fault.kind(), error = %fault, "pricing function failed");
}
