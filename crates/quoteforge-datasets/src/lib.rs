//! # quoteforge-datasets
//!
//! Testing datasets for pricing agents: named bags of natural-language
//! scenarios, split into happy-path cases (expected total) and unhappy-path
//! cases (expected error category), assigned many-to-many to agents.
//!
//! `InMemoryDatasetStore` implements both `DatasetStore` and `TestRunStore`;
//! `DatasetCatalog` is the service the rest of the runtime talks to.

pub mod catalog;
pub mod memory;

pub use catalog::DatasetCatalog;
pub use memory::InMemoryDatasetStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
