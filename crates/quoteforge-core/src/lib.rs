//! # quoteforge-core
//!
//! The seams of the QUOTEFORGE pricing runtime.
//!
//! This crate provides:
//! - The collaborator traits (`CodeSynthesizer`, `InputConverter`, `QuoteExecutor`)
//! - The storage traits every service is written against
//! - `QuoteforgeConfig`, the TOML configuration shared by all services
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quoteforge_core::{config::QuoteforgeConfig, traits::CheckpointStore};
//!
//! let config = QuoteforgeConfig::from_file(Path::new("quoteforge.toml"))?;
//! let scope = config.scope_for("acme");
//! ```

pub mod config;
pub mod traits;

pub use config::QuoteforgeConfig;

// ── Tests ─────────────────────────────────────────────────────────────────────
