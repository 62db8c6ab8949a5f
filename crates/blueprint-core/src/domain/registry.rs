//! Membership registries injected into canonicalization and evaluation.
//!
//! The core never reads registry metadata; it only asks whether an id exists.
//! Registries are passed explicitly so tests can substitute fakes.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{BlueprintError, Result};

/// Which registry a reference is checked against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RegistryKind {
    Action,
    Intent,
    Invariant,
}

impl RegistryKind {
    pub fn name(&self) -> &'static str {
        match self {
            RegistryKind::Action => "action",
            RegistryKind::Intent => "intent",
            RegistryKind::Invariant => "invariant",
        }
    }
}

/// Flat membership oracle.
pub trait MembershipRegistry: Send + Sync {
    fn contains(&self, id: &str) -> bool;
}

/// Registry backed by an ordered set of ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticRegistry {
    ids: BTreeSet<String>,
}

impl StaticRegistry {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Load a registry from a JSON array of ids.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)?;
        let registry: Self = serde_json::from_slice(&raw)?;
        if registry.ids.iter().any(|id| id.trim().is_empty()) {
            return Err(BlueprintError::InvalidRegistry(format!(
                "{} contains an empty id",
                path.display()
            )));
        }
        Ok(registry)
    }

    pub fn insert(&mut self, id: impl Into<String>) {
        self.ids.insert(id.into());
    }

    pub fn remove(&mut self, id: &str) -> bool {
        self.ids.remove(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl MembershipRegistry for StaticRegistry {
    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}

/// The three registries consulted when resolving references.
#[derive(Clone, Copy)]
pub struct Registries<'a> {
    pub actions: &'a dyn MembershipRegistry,
    pub intents: &'a dyn MembershipRegistry,
    pub invariants: &'a dyn MembershipRegistry,
}

impl<'a> Registries<'a> {
    pub fn new(
        actions: &'a dyn MembershipRegistry,
        intents: &'a dyn MembershipRegistry,
        invariants: &'a dyn MembershipRegistry,
    ) -> Self {
        Self {
            actions,
            intents,
            invariants,
        }
    }

    pub fn get(&self, kind: RegistryKind) -> &'a dyn MembershipRegistry {
        match kind {
            RegistryKind::Action => self.actions,
            RegistryKind::Intent => self.intents,
            RegistryKind::Invariant => self.invariants,
        }
    }

    pub fn contains(&self, kind: RegistryKind, id: &str) -> bool {
        self.get(kind).contains(id)
    }
}

impl std::fmt::Debug for Registries<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registries").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_registry_membership() {
        let registry = StaticRegistry::new(["user.save", "user.delete"]);
        assert!(registry.contains("user.save"));
        assert!(!registry.contains("user.archive"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registries_dispatch_by_kind() {
        let actions = StaticRegistry::new(["user.save"]);
        let intents = StaticRegistry::new(["navigate.back"]);
        let invariants = StaticRegistry::default();
        let registries = Registries::new(&actions, &intents, &invariants);

        assert!(registries.contains(RegistryKind::Action, "user.save"));
        assert!(!registries.contains(RegistryKind::Intent, "user.save"));
        assert!(registries.contains(RegistryKind::Intent, "navigate.back"));
        assert!(!registries.contains(RegistryKind::Invariant, "anything"));
    }

    #[test]
    fn test_registry_loads_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("actions.json");
        std::fs::write(&path, r#"["user.save", "user.delete"]"#).unwrap();

        let registry = StaticRegistry::from_json_file(&path).unwrap();
        assert!(registry.contains("user.delete"));
    }

    #[test]
    fn test_registry_rejects_empty_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intents.json");
        std::fs::write(&path, r#"["ok", "  "]"#).unwrap();

        let err = StaticRegistry::from_json_file(&path).unwrap_err();
        assert!(matches!(err, BlueprintError::InvalidRegistry(_)));
    }
}
