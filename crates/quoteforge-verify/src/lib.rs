//! # quoteforge-verify
//!
//! The Verification Harness for QUOTEFORGE checkpoints.
//!
//! Two phases:
//!
//! 1. **Preparation**: every live case of the datasets assigned to an agent
//!    is converted into a structured input against a checkpoint's schema and
//!    stored as a `CheckpointTestRun`.
//! 2. **Execution**: runs are invoked one at a time through a
//!    `QuoteExecutor`, judged by the pass rules in [`rules`], and the latest
//!    `TestResult` is written back onto each run.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use quoteforge_verify::{BatchOptions, VerificationHarness};
//!
//! harness.prepare_checkpoint(&scope, &checkpoint.id).await?;
//! let report = harness
//!     .run_batch(&scope, &checkpoint.id, BatchOptions { fail_fast: true })
//!     .await?;
//! println!("{} passed, {} failed", report.passed(), report.failed());
//! ```

pub mod harness;
pub mod rules;

pub use harness::{BatchOptions, BatchReport, RunOutcome, RunStatus, VerificationHarness};
pub use rules::Expectation;
