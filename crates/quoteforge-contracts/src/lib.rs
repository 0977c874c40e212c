//! # quoteforge-contracts
//!
//! Shared types, tenant scoping and error taxonomy for the QUOTEFORGE pricing
//! runtime.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only record definitions and the small helpers that belong to
//! them.

pub mod agent;
pub mod capability;
pub mod checkpoint;
pub mod dataset;
pub mod error;
pub mod execution;
pub mod ids;
pub mod quote;
pub mod tenant;
pub mod test_run;
