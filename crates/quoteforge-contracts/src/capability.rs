//! Sandbox capability grants.
//!
//! Generated pricing code runs with a deny-by-default capability model: the
//! Execution Engine only registers the function packages that are granted
//! here. Nothing grants filesystem, network, process, environment or clock
//! access because no such capability exists.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A family of functions the sandbox may expose.
///
/// Core language operators are always present and are not listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxCapability {
    /// Comparison and boolean operators on mixed types.
    Logic,
    /// `floor`, `round`, `sqrt`, `abs`, number parsing and the like.
    Math,
    /// String manipulation beyond concatenation.
    Strings,
    /// Array methods (`push`, `map`, `filter`, `reduce`, ...).
    Arrays,
    /// Object-map methods, including `to_json`.
    Maps,
}

/// The capabilities granted to every invocation of the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    inner: BTreeSet<SandboxCapability>,
}

impl CapabilitySet {
    /// Every capability the engine knows about.
    pub fn standard() -> Self {
        [
            SandboxCapability::Logic,
            SandboxCapability::Math,
            SandboxCapability::Strings,
            SandboxCapability::Arrays,
            SandboxCapability::Maps,
        ]
        .into_iter()
        .collect()
    }

    pub fn grant(&mut self, capability: SandboxCapability) {
        self.inner.insert(capability);
    }

    pub fn has(&self, capability: SandboxCapability) -> bool {
        self.inner.contains(&capability)
    }

    /// Granted capabilities in a stable order.
    pub fn all(&self) -> impl Iterator<Item = SandboxCapability> + '_ {
        self.inner.iter().copied()
    }
}

impl FromIterator<SandboxCapability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = SandboxCapability>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}
