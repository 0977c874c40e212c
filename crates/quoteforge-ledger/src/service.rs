//! `CheckpointLedger`: the only way checkpoints come into existence.
//!
//! Every mutating operation reads a base checkpoint, derives a new revision
//! from it (version + 1, parent = base), seals the revision into the hash
//! chain and inserts it. Nothing is ever edited in place.
//!
//! Two writers racing from the same base both derive the same version. The
//! store admits the first and rejects the second with `VersionConflict`; the
//! loser re-reads the latest checkpoint and retries if it still wants to.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use quoteforge_contracts::{
    agent::PricingAgent,
    checkpoint::{Checkpoint, CheckpointTrigger, HumanInputMessage, NewInputMessage},
    error::{QuoteforgeError, QuoteforgeResult},
    ids::{AgentId, CheckpointId, MessageId},
    tenant::TenantScope,
};
use quoteforge_core::traits::{AgentStore, CheckpointStore, CodeSynthesizer};

use crate::chain::{seal, verify_chain, GENESIS_HASH};

const DEFAULT_HISTORY_PAGE_SIZE: usize = 20;

/// Service owning the agent registry and every agent's checkpoint chain.
pub struct CheckpointLedger {
    agents: Arc<dyn AgentStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    synthesizer: Arc<dyn CodeSynthesizer>,
    history_page_size: usize,
}

impl CheckpointLedger {
    pub fn new(
        agents: Arc<dyn AgentStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        synthesizer: Arc<dyn CodeSynthesizer>,
    ) -> Self {
        Self {
            agents,
            checkpoints,
            synthesizer,
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
        }
    }

    /// Page size used by `history` when the caller names no limit.
    pub fn with_history_page_size(mut self, page_size: usize) -> Self {
        self.history_page_size = page_size.max(1);
        self
    }

    // ── Agents ────────────────────────────────────────────────────────────────

    /// Create an agent under the scope's tenant together with its version-1
    /// checkpoint.
    pub async fn register_agent(
        &self,
        scope: &TenantScope,
        name: &str,
    ) -> QuoteforgeResult<(PricingAgent, Checkpoint)> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QuoteforgeError::InvalidInput {
                reason: "agent name must not be empty".to_string(),
            });
        }

        let agent = PricingAgent::new(scope.owner().clone(), name);
        self.agents.insert(agent.clone()).await?;
        info!(agent_id = %agent.id, tenant = %agent.tenant_id, "pricing agent registered");

        let checkpoint = self.create_initial_checkpoint(scope, &agent.id).await?;
        Ok((agent, checkpoint))
    }

    /// Fetch a live agent. Deleted and foreign agents are `NotFound`.
    pub async fn agent(&self, scope: &TenantScope, id: &AgentId) -> QuoteforgeResult<PricingAgent> {
        let agent = self.agents.get(scope, id).await?;
        scope.require(agent.filter(|a| !a.is_deleted()), "agent", id)
    }

    pub async fn list_agents(&self, scope: &TenantScope) -> QuoteforgeResult<Vec<PricingAgent>> {
        self.agents.list(scope).await
    }

    pub async fn rename_agent(
        &self,
        scope: &TenantScope,
        id: &AgentId,
        name: &str,
    ) -> QuoteforgeResult<PricingAgent> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QuoteforgeError::InvalidInput {
                reason: "agent name must not be empty".to_string(),
            });
        }
        let mut agent = self.agent(scope, id).await?;
        agent.name = name.to_string();
        agent.updated_at = Utc::now();
        self.agents.update(scope, agent.clone()).await?;
        Ok(agent)
    }

    /// Toggle whether the agent may serve external quote traffic.
    pub async fn set_deployed(
        &self,
        scope: &TenantScope,
        id: &AgentId,
        deployed: bool,
    ) -> QuoteforgeResult<PricingAgent> {
        let mut agent = self.agent(scope, id).await?;
        agent.deployed = deployed;
        agent.updated_at = Utc::now();
        self.agents.update(scope, agent.clone()).await?;
        info!(agent_id = %id, deployed, "agent deployment changed");
        Ok(agent)
    }

    /// Soft-delete the agent. Its checkpoints stay in the store untouched.
    pub async fn delete_agent(&self, scope: &TenantScope, id: &AgentId) -> QuoteforgeResult<()> {
        let mut agent = self.agent(scope, id).await?;
        let now = Utc::now();
        agent.deleted_at = Some(now);
        agent.deployed = false;
        agent.updated_at = now;
        self.agents.update(scope, agent).await?;
        info!(agent_id = %id, "agent deleted");
        Ok(())
    }

    // ── Checkpoint creation ───────────────────────────────────────────────────

    /// Append an empty version-1 checkpoint for `agent_id`.
    ///
    /// Fails with `VersionConflict` if the agent already has one.
    pub async fn create_initial_checkpoint(
        &self,
        scope: &TenantScope,
        agent_id: &AgentId,
    ) -> QuoteforgeResult<Checkpoint> {
        self.agent(scope, agent_id).await?;

        let draft = Checkpoint {
            id: CheckpointId::new(),
            agent_id: *agent_id,
            version: 1,
            parent_id: None,
            human_input_messages: Vec::new(),
            function_schema: String::new(),
            function_code: String::new(),
            trigger: CheckpointTrigger::Initial,
            description: "Initial checkpoint".to_string(),
            created_at: Utc::now(),
            prev_hash: GENESIS_HASH.to_string(),
            content_hash: String::new(),
        };
        self.append(draft).await
    }

    /// Append a message to the base checkpoint's list.
    ///
    /// The new checkpoint's schema and function are cleared: they were
    /// generated from a description that no longer matches.
    pub async fn add_input_message(
        &self,
        scope: &TenantScope,
        agent_id: &AgentId,
        base_id: &CheckpointId,
        message: NewInputMessage,
    ) -> QuoteforgeResult<Checkpoint> {
        let base = self.agent_checkpoint(scope, agent_id, base_id).await?;

        let message = HumanInputMessage {
            id: MessageId::new(),
            text: message.text,
            categories: message.categories,
            created_at: Utc::now(),
            deleted_at: None,
        };
        let description = match message.usable_text() {
            Some(text) => format!("Added input message: {}", excerpt(text)),
            None => "Added input message without text".to_string(),
        };

        let mut next = derive(&base, CheckpointTrigger::InputMessageAdded, description);
        next.human_input_messages.push(message);
        next.function_schema.clear();
        next.function_code.clear();
        self.append(next).await
    }

    /// Remove one message from the base checkpoint's list.
    ///
    /// Schema and function are carried over unchanged; the next regeneration
    /// picks up the shorter description.
    pub async fn delete_input_message(
        &self,
        scope: &TenantScope,
        agent_id: &AgentId,
        base_id: &CheckpointId,
        message_id: &MessageId,
    ) -> QuoteforgeResult<Checkpoint> {
        let base = self.agent_checkpoint(scope, agent_id, base_id).await?;

        let position = base
            .human_input_messages
            .iter()
            .position(|m| m.id == *message_id)
            .ok_or_else(|| QuoteforgeError::not_found("input message", message_id))?;

        let mut next = derive(
            &base,
            CheckpointTrigger::InputMessageDeleted,
            format!("Deleted input message {}", message_id),
        );
        next.human_input_messages.remove(position);
        self.append(next).await
    }

    /// Ask the synthesizer for a new schema and append it.
    ///
    /// The function is cleared because it was written against the old schema.
    pub async fn regenerate_schema(
        &self,
        scope: &TenantScope,
        base_id: &CheckpointId,
        feedback: Option<&str>,
    ) -> QuoteforgeResult<Checkpoint> {
        let base = self.checkpoint(scope, base_id).await?;
        let description = require_description(&base)?;
        let previous = base.has_schema().then_some(base.function_schema.as_str());

        debug!(checkpoint_id = %base.id, has_feedback = feedback.is_some(), "synthesizing schema");
        let schema = self
            .synthesizer
            .synthesize_schema(&description, feedback, previous)
            .await
            .map_err(as_synthesis_failure)?;
        let schema = require_output(schema, "schema")?;

        let mut next = derive(
            &base,
            CheckpointTrigger::SchemaUpdated,
            revision_note("Regenerated schema", feedback),
        );
        next.function_schema = schema;
        next.function_code.clear();
        self.append(next).await
    }

    /// Ask the synthesizer for a new function against the base schema.
    pub async fn regenerate_function(
        &self,
        scope: &TenantScope,
        base_id: &CheckpointId,
        feedback: Option<&str>,
    ) -> QuoteforgeResult<Checkpoint> {
        let base = self.checkpoint(scope, base_id).await?;
        if !base.has_schema() {
            return Err(QuoteforgeError::InvalidState {
                reason: format!("checkpoint {} has no schema to implement", base.id),
            });
        }
        let description = require_description(&base)?;
        let previous = base.has_function().then_some(base.function_code.as_str());

        debug!(checkpoint_id = %base.id, has_feedback = feedback.is_some(), "synthesizing function");
        let code = self
            .synthesizer
            .synthesize_function(&description, &base.function_schema, feedback, previous)
            .await
            .map_err(as_synthesis_failure)?;
        let code = require_output(code, "function")?;

        let mut next = derive(
            &base,
            CheckpointTrigger::FormulaUpdated,
            revision_note("Regenerated function", feedback),
        );
        next.function_code = code;
        self.append(next).await
    }

    // ── Reads ─────────────────────────────────────────────────────────────────

    /// The highest-version checkpoint of a live agent.
    pub async fn latest(&self, scope: &TenantScope, agent_id: &AgentId) -> QuoteforgeResult<Checkpoint> {
        self.agent(scope, agent_id).await?;
        self.checkpoints
            .latest(agent_id)
            .await?
            .ok_or_else(|| QuoteforgeError::not_found("checkpoint", agent_id))
    }

    /// Checkpoints newest first, at most `limit` (or the configured page size).
    pub async fn history(
        &self,
        scope: &TenantScope,
        agent_id: &AgentId,
        limit: Option<usize>,
    ) -> QuoteforgeResult<Vec<Checkpoint>> {
        self.agent(scope, agent_id).await?;
        let limit = limit.unwrap_or(self.history_page_size);
        self.checkpoints.history(agent_id, Some(limit)).await
    }

    /// Fetch one checkpoint. Its agent must be live and visible in `scope`.
    pub async fn checkpoint(
        &self,
        scope: &TenantScope,
        id: &CheckpointId,
    ) -> QuoteforgeResult<Checkpoint> {
        let checkpoint = self
            .checkpoints
            .get(id)
            .await?
            .ok_or_else(|| QuoteforgeError::not_found("checkpoint", id))?;

        let visible = self
            .agents
            .get(scope, &checkpoint.agent_id)
            .await?
            .is_some_and(|a| !a.is_deleted());
        if !visible {
            return Err(QuoteforgeError::not_found("checkpoint", id));
        }
        Ok(checkpoint)
    }

    /// `checkpoint`, additionally requiring that it belongs to `agent_id`.
    async fn agent_checkpoint(
        &self,
        scope: &TenantScope,
        agent_id: &AgentId,
        id: &CheckpointId,
    ) -> QuoteforgeResult<Checkpoint> {
        let checkpoint = self.checkpoint(scope, id).await?;
        if checkpoint.agent_id != *agent_id {
            return Err(QuoteforgeError::not_found("checkpoint", id));
        }
        Ok(checkpoint)
    }

    /// Recompute every hash in the agent's chain.
    pub async fn verify_history(&self, scope: &TenantScope, agent_id: &AgentId) -> QuoteforgeResult<bool> {
        self.agent(scope, agent_id).await?;
        let mut chain = self.checkpoints.history(agent_id, None).await?;
        chain.reverse();
        let intact = verify_chain(&chain);
        if !intact {
            warn!(agent_id = %agent_id, "checkpoint chain failed verification");
        }
        Ok(intact)
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    async fn append(&self, draft: Checkpoint) -> QuoteforgeResult<Checkpoint> {
        let sealed = seal(draft)?;
        match self.checkpoints.insert(sealed.clone()).await {
            Ok(()) => {
                info!(
                    agent_id = %sealed.agent_id,
                    checkpoint_id = %sealed.id,
                    version = sealed.version,
                    trigger = %sealed.trigger,
                    "checkpoint appended"
                );
                Ok(sealed)
            }
            Err(err @ QuoteforgeError::VersionConflict { .. }) => {
                warn!(
                    agent_id = %sealed.agent_id,
                    version = sealed.version,
                    "checkpoint version already taken"
                );
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}

/// Clone `base` into the next revision. `content_hash` is filled by `seal`.
fn derive(base: &Checkpoint, trigger: CheckpointTrigger, description: String) -> Checkpoint {
    Checkpoint {
        id: CheckpointId::new(),
        agent_id: base.agent_id,
        version: base.version + 1,
        parent_id: Some(base.id),
        human_input_messages: base.human_input_messages.clone(),
        function_schema: base.function_schema.clone(),
        function_code: base.function_code.clone(),
        trigger,
        description,
        created_at: Utc::now(),
        prev_hash: base.content_hash.clone(),
        content_hash: String::new(),
    }
}

fn require_description(base: &Checkpoint) -> QuoteforgeResult<String> {
    base.pricing_description()
        .ok_or_else(|| QuoteforgeError::InvalidState {
            reason: format!("checkpoint {} has no input messages with text", base.id),
        })
}

fn require_output(source: String, what: &str) -> QuoteforgeResult<String> {
    if source.trim().is_empty() {
        return Err(QuoteforgeError::SynthesisUnavailable {
            reason: format!("synthesizer returned an empty {}", what),
        });
    }
    Ok(source)
}

fn as_synthesis_failure(err: QuoteforgeError) -> QuoteforgeError {
    match err {
        QuoteforgeError::SynthesisUnavailable { .. } => err,
        other => QuoteforgeError::SynthesisUnavailable {
            reason: other.to_string(),
        },
    }
}

fn revision_note(action: &str, feedback: Option<&str>) -> String {
    match feedback.map(str::trim).filter(|f| !f.is_empty()) {
        Some(f) => format!("{} with feedback: {}", action, excerpt(f)),
        None => action.to_string(),
    }
}

fn excerpt(text: &str) -> String {
    const MAX: usize = 80;
    match text.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
