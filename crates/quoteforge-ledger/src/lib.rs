//! # quoteforge-ledger
//!
//! Append-only, SHA-256 hash-chained checkpoint ledger for QUOTEFORGE pricing
//! agents.
//!
//! ## Overview
//!
//! Each pricing agent owns a chain of immutable checkpoints. A checkpoint
//! links to its parent through `prev_hash`, so changing any stored revision
//! (even a single byte of its function source) is detected by
//! `verify_chain`.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quoteforge_ledger::{CheckpointLedger, InMemoryAgentStore, InMemoryCheckpointStore};
//!
//! let ledger = CheckpointLedger::new(agents, checkpoints, synthesizer);
//! let (agent, v1) = ledger.register_agent(&scope, "Print shop").await?;
//! let v2 = ledger.add_input_message(&scope, &v1.agent_id, &v1.id, NewInputMessage::text("...")).await?;
//! let v3 = ledger.regenerate_schema(&scope, &v2.id, None).await?;
//!
//! assert!(ledger.verify_history(&scope, &agent.id).await?);
//! ```

pub mod chain;
pub mod memory;
pub mod service;

pub use chain::{hash_checkpoint, verify_chain, GENESIS_HASH};
pub use memory::{InMemoryAgentStore, InMemoryCheckpointStore};
pub use service::CheckpointLedger;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use quoteforge_contracts::{
        agent::PricingAgent,
        checkpoint::{Checkpoint, CheckpointTrigger},
        error::QuoteforgeError,
        ids::{AgentId, CheckpointId},
        tenant::{TenantId, TenantScope},
    };
    use quoteforge_core::traits::{AgentStore, CheckpointStore};

    use super::{chain::seal, hash_checkpoint, verify_chain, InMemoryAgentStore, InMemoryCheckpointStore, GENESIS_HASH};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Build a sealed chain of `n` checkpoints for one agent.
    fn make_chain(n: u64) -> Vec<Checkpoint> {
        let agent_id = AgentId::new();
        let mut chain: Vec<Checkpoint> = Vec::new();
        for version in 1..=n {
            let parent = chain.last();
            let draft = Checkpoint {
                id: CheckpointId::new(),
                agent_id,
                version,
                parent_id: parent.map(|p| p.id),
                human_input_messages: Vec::new(),
                function_schema: String::new(),
                function_code: format!("fn calculate_quote(input) {{ #{{ total: {version}.0 }} }}"),
                trigger: if version == 1 {
                    CheckpointTrigger::Initial
                } else {
                    CheckpointTrigger::FormulaUpdated
                },
                description: format!("revision {version}"),
                created_at: Utc::now(),
                prev_hash: parent
                    .map(|p| p.content_hash.clone())
                    .unwrap_or_else(|| GENESIS_HASH.to_string()),
                content_hash: String::new(),
            };
            chain.push(seal(draft).unwrap());
        }
        chain
    }

    // ── Hashing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_hash_is_deterministic_hex() {
        let chain = make_chain(1);
        let first = hash_checkpoint(&chain[0]).unwrap();
        let second = hash_checkpoint(&chain[0]).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
        assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(first, chain[0].content_hash);
    }

    #[test]
    fn test_valid_chain_verifies() {
        assert!(verify_chain(&make_chain(4)));
        assert!(verify_chain(&[]));
    }

    /// Changing one byte of a stored function must be detected.
    #[test]
    fn test_tampered_function_breaks_chain() {
        let mut chain = make_chain(3);
        chain[1].function_code.push(' ');
        assert!(!verify_chain(&chain));
    }

    /// Re-sealing a tampered revision still breaks its child's link.
    #[test]
    fn test_resealed_tamper_breaks_child_link() {
        let mut chain = make_chain(3);
        chain[1].description = "rewritten".to_string();
        let resealed = seal(chain[1].clone()).unwrap();
        chain[1] = resealed;
        assert!(!verify_chain(&chain));
    }

    #[test]
    fn test_gap_in_versions_fails() {
        let mut chain = make_chain(3);
        chain.remove(1);
        assert!(!verify_chain(&chain));
    }

    // ── InMemoryCheckpointStore ───────────────────────────────────────────────

    #[tokio::test]
    async fn test_store_rejects_duplicate_version() {
        let store = InMemoryCheckpointStore::new();
        let chain = make_chain(1);
        store.insert(chain[0].clone()).await.unwrap();

        let mut twin = chain[0].clone();
        twin.id = CheckpointId::new();
        let err = store.insert(twin).await.unwrap_err();
        assert!(matches!(err, QuoteforgeError::VersionConflict { version: 1, .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_store_detects_in_place_tampering() {
        let store = InMemoryCheckpointStore::new();
        let chain = make_chain(3);
        let agent_id = chain[0].agent_id;
        for cp in &chain {
            store.insert(cp.clone()).await.unwrap();
        }

        {
            let mut state = store.state.lock().unwrap();
            let target = state.by_id.get_mut(&chain[0].id).unwrap();
            target.function_code = "fn calculate_quote(input) { #{ total: 0.0 } }".to_string();
        }

        let mut stored = store.history(&agent_id, None).await.unwrap();
        stored.reverse();
        assert!(!verify_chain(&stored));
    }

    #[tokio::test]
    async fn test_store_latest_and_history_are_per_agent() {
        let store = InMemoryCheckpointStore::new();
        let a = make_chain(3);
        let b = make_chain(2);
        for cp in a.iter().chain(b.iter()) {
            store.insert(cp.clone()).await.unwrap();
        }

        let latest = store.latest(&a[0].agent_id).await.unwrap().unwrap();
        assert_eq!(latest.version, 3);
        assert_eq!(store.history(&b[0].agent_id, None).await.unwrap().len(), 2);
        assert!(store.latest(&AgentId::new()).await.unwrap().is_none());
    }

    // ── InMemoryAgentStore ────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_agent_store_scopes_reads() {
        let store = InMemoryAgentStore::new();
        let agent = PricingAgent::new(TenantId::new("acme"), "Print shop");
        store.insert(agent.clone()).await.unwrap();

        let acme = TenantScope::tenant("acme");
        let globex = TenantScope::tenant("globex");
        let shared = TenantScope::Shared(TenantId::new("globex"));

        assert!(store.get(&acme, &agent.id).await.unwrap().is_some());
        assert!(store.get(&globex, &agent.id).await.unwrap().is_none());
        assert!(store.get(&shared, &agent.id).await.unwrap().is_some());
        assert_eq!(store.list(&globex).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_agent_store_update_outside_scope_is_not_found() {
        let store = InMemoryAgentStore::new();
        let agent = PricingAgent::new(TenantId::new("acme"), "Print shop");
        store.insert(agent.clone()).await.unwrap();

        let mut renamed = agent.clone();
        renamed.name = "Hijacked".to_string();
        let err = store.update(&TenantScope::tenant("globex"), renamed).await.unwrap_err();
        assert!(matches!(err, QuoteforgeError::NotFound { entity: "agent", .. }));

        let acme = TenantScope::tenant("acme");
        assert_eq!(store.get(&acme, &agent.id).await.unwrap().unwrap().name, "Print shop");
    }

    #[tokio::test]
    async fn test_agent_store_update_unknown_is_not_found() {
        let store = InMemoryAgentStore::new();
        let agent = PricingAgent::new(TenantId::new("acme"), "Print shop");
        let err = store.update(&TenantScope::tenant("acme"), agent).await.unwrap_err();
        assert!(matches!(err, QuoteforgeError::NotFound { entity: "agent", .. }));
    }
}
