//! Hash-chain primitives: sealing checkpoints and verifying a version chain.
//!
//! Every checkpoint commits to its parent through `prev_hash`, so editing any
//! stored field of any revision invalidates that revision's `content_hash`
//! and breaks the link of its child.
//!
//! Hash input layout (bytes, in order):
//!   1. agent_id as its 16 raw UUID bytes
//!   2. version as 8-byte little-endian
//!   3. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   4. canonical JSON of the remaining checkpoint fields

use serde::Serialize;
use sha2::{Digest, Sha256};

use quoteforge_contracts::{
    checkpoint::{Checkpoint, CheckpointTrigger, HumanInputMessage},
    error::{QuoteforgeError, QuoteforgeResult},
    ids::CheckpointId,
};

/// The `prev_hash` of every version-1 checkpoint.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// The fields covered by the JSON part of the hash. `content_hash` itself is
/// excluded; everything else is listed explicitly so nothing is omitted.
#[derive(Serialize)]
struct HashedFields<'a> {
    id: &'a CheckpointId,
    parent_id: &'a Option<CheckpointId>,
    human_input_messages: &'a [HumanInputMessage],
    function_schema: &'a str,
    function_code: &'a str,
    trigger: CheckpointTrigger,
    description: &'a str,
    created_at: String,
}

/// Compute the SHA-256 hash of a checkpoint. Returns lowercase hex.
pub fn hash_checkpoint(checkpoint: &Checkpoint) -> QuoteforgeResult<String> {
    let fields = HashedFields {
        id: &checkpoint.id,
        parent_id: &checkpoint.parent_id,
        human_input_messages: &checkpoint.human_input_messages,
        function_schema: &checkpoint.function_schema,
        function_code: &checkpoint.function_code,
        trigger: checkpoint.trigger,
        description: &checkpoint.description,
        created_at: checkpoint.created_at.to_rfc3339(),
    };
    let body = serde_json::to_vec(&fields).map_err(|e| QuoteforgeError::StoreFailure {
        reason: format!("checkpoint {} could not be serialized for hashing: {}", checkpoint.id, e),
    })?;

    let mut hasher = Sha256::new();
    hasher.update(checkpoint.agent_id.0.as_bytes());
    hasher.update(checkpoint.version.to_le_bytes());
    hasher.update(checkpoint.prev_hash.as_bytes());
    hasher.update(&body);

    Ok(hex::encode(hasher.finalize()))
}

/// Fill in `content_hash`. After sealing the checkpoint must not change.
pub fn seal(mut checkpoint: Checkpoint) -> QuoteforgeResult<Checkpoint> {
    checkpoint.content_hash = hash_checkpoint(&checkpoint)?;
    Ok(checkpoint)
}

/// Verify an agent's full chain, given in ascending version order.
///
/// Returns `true` when:
///
/// 1. versions run 1, 2, 3, … without gaps;
/// 2. each `parent_id` names the previous checkpoint (none for version 1);
/// 3. each `prev_hash` equals the previous `content_hash` (`GENESIS_HASH` first);
/// 4. each `content_hash` matches the value recomputed from its fields.
///
/// An empty chain is valid.
pub fn verify_chain(checkpoints: &[Checkpoint]) -> bool {
    let mut expected_prev = GENESIS_HASH.to_string();
    let mut expected_parent: Option<CheckpointId> = None;

    for (idx, checkpoint) in checkpoints.iter().enumerate() {
        if checkpoint.version != idx as u64 + 1 {
            return false;
        }
        if checkpoint.parent_id != expected_parent || checkpoint.prev_hash != expected_prev {
            return false;
        }
        match hash_checkpoint(checkpoint) {
            Ok(recomputed) if recomputed == checkpoint.content_hash => {}
            _ => return false,
        }

        expected_prev = checkpoint.content_hash.clone();
        expected_parent = Some(checkpoint.id);
    }

    true
}
