//! In-memory implementations of `AgentStore` and `CheckpointStore`.
//!
//! Both stores keep their records behind `Arc<Mutex<_>>`, so clones share
//! state and the services can hold them as `Arc<dyn Trait>`. The checkpoint
//! store enforces the one rule that matters for concurrency: at most one
//! checkpoint per `(agent_id, version)`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use tracing::debug;

use quoteforge_contracts::{
    agent::PricingAgent,
    checkpoint::Checkpoint,
    error::{QuoteforgeError, QuoteforgeResult},
    ids::{AgentId, CheckpointId},
    tenant::TenantScope,
};
use quoteforge_core::traits::{AgentStore, CheckpointStore};

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> QuoteforgeResult<MutexGuard<'a, T>> {
    mutex.lock().map_err(|e| QuoteforgeError::StoreFailure {
        reason: format!("{} lock poisoned: {}", what, e),
    })
}

// ── Agents ────────────────────────────────────────────────────────────────────

/// Agents in insertion order.
#[derive(Clone, Default)]
pub struct InMemoryAgentStore {
    agents: Arc<Mutex<Vec<PricingAgent>>>,
}

impl InMemoryAgentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentStore for InMemoryAgentStore {
    async fn insert(&self, agent: PricingAgent) -> QuoteforgeResult<()> {
        let mut agents = lock(&self.agents, "agent store")?;
        if agents.iter().any(|a| a.id == agent.id) {
            return Err(QuoteforgeError::StoreFailure {
                reason: format!("agent '{}' already exists", agent.id),
            });
        }
        agents.push(agent);
        Ok(())
    }

    async fn get(&self, scope: &TenantScope, id: &AgentId) -> QuoteforgeResult<Option<PricingAgent>> {
        let agents = lock(&self.agents, "agent store")?;
        Ok(scope.filter(agents.iter().find(|a| a.id == *id).cloned()))
    }

    async fn update(&self, scope: &TenantScope, agent: PricingAgent) -> QuoteforgeResult<()> {
        let mut agents = lock(&self.agents, "agent store")?;
        let slot = scope.require(agents.iter_mut().find(|a| a.id == agent.id), "agent", agent.id)?;
        *slot = agent;
        Ok(())
    }

    async fn list(&self, scope: &TenantScope) -> QuoteforgeResult<Vec<PricingAgent>> {
        let agents = lock(&self.agents, "agent store")?;
        Ok(agents
            .iter()
            .filter(|a| !a.is_deleted() && scope.contains(*a))
            .cloned()
            .collect())
    }
}

// ── Checkpoints ───────────────────────────────────────────────────────────────

#[derive(Default)]
pub(crate) struct CheckpointState {
    pub(crate) by_id: HashMap<CheckpointId, Checkpoint>,
    /// Unique index backing the conditional insert.
    pub(crate) by_version: BTreeMap<(AgentId, u64), CheckpointId>,
}

/// Insert-only checkpoint storage.
///
/// There is no way to change a checkpoint through this type once inserted.
/// Tests reach into `state` to simulate tampering.
#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    pub(crate) state: Arc<Mutex<CheckpointState>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of checkpoints across all agents.
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn insert(&self, checkpoint: Checkpoint) -> QuoteforgeResult<()> {
        let mut state = lock(&self.state, "checkpoint store")?;
        let key = (checkpoint.agent_id, checkpoint.version);
        if state.by_version.contains_key(&key) {
            return Err(QuoteforgeError::VersionConflict {
                agent_id: checkpoint.agent_id.to_string(),
                version: checkpoint.version,
            });
        }
        debug!(
            checkpoint_id = %checkpoint.id,
            agent_id = %checkpoint.agent_id,
            version = checkpoint.version,
            "checkpoint stored"
        );
        state.by_version.insert(key, checkpoint.id);
        state.by_id.insert(checkpoint.id, checkpoint);
        Ok(())
    }

    async fn get(&self, id: &CheckpointId) -> QuoteforgeResult<Option<Checkpoint>> {
        let state = lock(&self.state, "checkpoint store")?;
        Ok(state.by_id.get(id).cloned())
    }

    async fn latest(&self, agent_id: &AgentId) -> QuoteforgeResult<Option<Checkpoint>> {
        let state = lock(&self.state, "checkpoint store")?;
        Ok(state
            .by_version
            .range((*agent_id, 0)..=(*agent_id, u64::MAX))
            .next_back()
            .and_then(|(_, id)| state.by_id.get(id))
            .cloned())
    }

    async fn history(
        &self,
        agent_id: &AgentId,
        limit: Option<usize>,
    ) -> QuoteforgeResult<Vec<Checkpoint>> {
        let state = lock(&self.state, "checkpoint store")?;
        let newest_first = state
            .by_version
            .range((*agent_id, 0)..=(*agent_id, u64::MAX))
            .rev()
            .filter_map(|(_, id)| state.by_id.get(id).cloned());
        Ok(match limit {
            Some(n) => newest_first.take(n).collect(),
            None => newest_first.collect(),
        })
    }
}
