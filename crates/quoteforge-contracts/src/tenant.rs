//! Tenant identity and the single scoping helper every query goes through.
//!
//! Stores and services never compare tenant ids by hand. They ask a
//! `TenantScope` whether a record is visible, which keeps isolation rules in
//! one place: a record outside the caller's tenant behaves exactly like a
//! record that does not exist.

use serde::{Deserialize, Serialize};

use crate::error::{QuoteforgeError, QuoteforgeResult};

/// Stable identifier of the tenant that owns a record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Implemented by every record that carries an owning tenant.
pub trait TenantOwned {
    fn tenant_id(&self) -> &TenantId;
}

impl<T: TenantOwned + ?Sized> TenantOwned for &T {
    fn tenant_id(&self) -> &TenantId {
        (**self).tenant_id()
    }
}

impl<T: TenantOwned + ?Sized> TenantOwned for &mut T {
    fn tenant_id(&self) -> &TenantId {
        (**self).tenant_id()
    }
}

/// The visibility window of a caller.
///
/// `Tenant` restricts every read and write to one tenant. `Shared` is used when
/// multi-tenancy is disabled in configuration: every record is visible and new
/// records are created under the named tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantScope {
    Tenant(TenantId),
    Shared(TenantId),
}

impl TenantScope {
    /// Scope restricted to `tenant`.
    pub fn tenant(tenant: impl Into<String>) -> Self {
        Self::Tenant(TenantId::new(tenant))
    }

    /// Return true if a record owned by `owner` is visible in this scope.
    pub fn permits(&self, owner: &TenantId) -> bool {
        match self {
            Self::Tenant(id) => id == owner,
            Self::Shared(_) => true,
        }
    }

    /// Return true if `record` is visible in this scope.
    pub fn contains<T: TenantOwned>(&self, record: &T) -> bool {
        self.permits(record.tenant_id())
    }

    /// Drop `record` if it lies outside the scope.
    pub fn filter<T: TenantOwned>(&self, record: Option<T>) -> Option<T> {
        record.filter(|r| self.contains(r))
    }

    /// Resolve a looked-up record, turning absence *or* a tenant mismatch
    /// into `NotFound` so callers cannot probe foreign ids.
    pub fn require<T: TenantOwned>(
        &self,
        record: Option<T>,
        entity: &'static str,
        id: impl ToString,
    ) -> QuoteforgeResult<T> {
        self.filter(record).ok_or_else(|| QuoteforgeError::NotFound {
            entity,
            id: id.to_string(),
        })
    }

    /// The tenant new records are created under.
    pub fn owner(&self) -> &TenantId {
        match self {
            Self::Tenant(id) | Self::Shared(id) => id,
        }
    }
}
