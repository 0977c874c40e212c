//! Pricing agent identity.
//!
//! A pricing agent is the tenant-scoped owner of a checkpoint chain. Apart
//! from its display name, deployment flag and deletion timestamp it never
//! changes after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ids::AgentId,
    tenant::{TenantId, TenantOwned},
};

/// A tenant-scoped pricing agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingAgent {
    pub id: AgentId,
    pub tenant_id: TenantId,
    /// Human-readable display name.
    pub name: String,
    /// Only deployed agents may serve external quote traffic.
    pub deployed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker. Deleted agents are invisible to the ledger.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl PricingAgent {
    /// Build a new, undeployed agent owned by `tenant_id`.
    pub fn new(tenant_id: TenantId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: AgentId::new(),
            tenant_id,
            name: name.into(),
            deployed: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Return true if the agent may answer external "calculate price now" calls.
    pub fn can_serve(&self) -> bool {
        self.deployed && !self.is_deleted()
    }
}

impl TenantOwned for PricingAgent {
    fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }
}
