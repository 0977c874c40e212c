//! Print-shop reference scenarios.
//!
//! Each scenario wires real QUOTEFORGE services (ledger, datasets, execution
//! engine, verification harness) over in-memory stores with canned
//! collaborators and demonstrates a distinct part of the pipeline.

pub mod fault_isolation;
pub mod print_shop;
