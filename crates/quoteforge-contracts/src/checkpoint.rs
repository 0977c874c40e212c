//! Checkpoints: immutable, versioned snapshots of a pricing agent.
//!
//! A checkpoint captures everything the agent has accumulated at one point in
//! its history: the human input messages, the generated schema text and the
//! generated function text. Checkpoints are never edited. Every logical
//! mutation produces a new checkpoint cloned from a base checkpoint, with the
//! version incremented by one and a `trigger` recording why it was created.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, CheckpointId, MessageId};

/// A free-text business rule supplied by a human.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanInputMessage {
    pub id: MessageId,
    /// The message body. Image-only or empty messages carry `None`.
    pub text: Option<String>,
    /// Optional category tags (e.g. "discounts", "shipping").
    #[serde(default)]
    pub categories: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl HumanInputMessage {
    /// Return the trimmed text when the message contributes to a description.
    pub fn usable_text(&self) -> Option<&str> {
        if self.deleted_at.is_some() {
            return None;
        }
        self.text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// What a caller supplies when adding a message; id and timestamp are
/// assigned by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewInputMessage {
    pub text: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl NewInputMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            categories: Vec::new(),
        }
    }
}

/// Why a checkpoint was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointTrigger {
    Initial,
    InputMessageAdded,
    InputMessageDeleted,
    SchemaUpdated,
    FormulaUpdated,
}

impl std::fmt::Display for CheckpointTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Initial => "initial",
            Self::InputMessageAdded => "input_message_added",
            Self::InputMessageDeleted => "input_message_deleted",
            Self::SchemaUpdated => "schema_updated",
            Self::FormulaUpdated => "formula_updated",
        };
        f.pad(s)
    }
}

/// One immutable revision in an agent's version chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub id: CheckpointId,
    /// The agent whose chain this checkpoint belongs to.
    pub agent_id: AgentId,
    /// Monotonically increasing per agent, starting at 1.
    pub version: u64,
    /// The checkpoint this one was cloned from. `None` for version 1.
    pub parent_id: Option<CheckpointId>,
    /// Ordered, append-only list of human input messages.
    pub human_input_messages: Vec<HumanInputMessage>,
    /// Type-contract source text (a JSON Schema document). May be empty.
    pub function_schema: String,
    /// Implementation source text. May be empty.
    pub function_code: String,
    pub trigger: CheckpointTrigger,
    /// Free-text explanation of the revision.
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// `content_hash` of the parent, or the genesis hash for version 1.
    pub prev_hash: String,
    /// SHA-256 (hex) over this checkpoint's fields, computed when sealed.
    pub content_hash: String,
}

impl Checkpoint {
    /// Join every usable message text, oldest first, into the pricing
    /// description handed to the synthesis collaborator.
    ///
    /// Returns `None` when no message carries text.
    pub fn pricing_description(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .human_input_messages
            .iter()
            .filter_map(HumanInputMessage::usable_text)
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }

    pub fn has_schema(&self) -> bool {
        !self.function_schema.trim().is_empty()
    }

    pub fn has_function(&self) -> bool {
        !self.function_code.trim().is_empty()
    }
}
