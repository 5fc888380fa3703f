//! Extensions provided by the running core.
//!
//! Core extensions are never installed locally; a dependency on one of their
//! ids (or features) is always satisfied.

use std::collections::HashMap;
use std::fmt::Debug;

use crate::id::ExtensionId;

/// Read-only view of the extensions bundled with the core.
pub trait CoreExtensionRepository: Send + Sync + Debug {
    /// Whether the core provides `id` (a bare id or a feature).
    fn exists(&self, id: &str) -> bool;

    /// The core extension providing `id`, if any.
    fn get(&self, id: &str) -> Option<ExtensionId>;
}

/// Core extensions known at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticCoreExtensions {
    entries: HashMap<String, ExtensionId>,
}

impl StaticCoreExtensions {
    /// Create a new empty set of core extensions.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Build from a list of core extension ids.
    pub fn with_extensions(ids: impl IntoIterator<Item = ExtensionId>) -> Self {
        let mut core = Self::new();
        for id in ids {
            core.register(id);
        }
        core
    }

    /// Register a core extension under its bare id.
    pub fn register(&mut self, id: ExtensionId) {
        self.entries.insert(id.id().to_string(), id);
    }

    /// Register `feature` as provided by the core extension `id`.
    pub fn register_feature(&mut self, feature: impl Into<String>, id: ExtensionId) {
        self.entries.insert(feature.into(), id);
    }

    /// List all provided ids and features (sorted).
    pub fn known_extensions(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CoreExtensionRepository for StaticCoreExtensions {
    fn exists(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    fn get(&self, id: &str) -> Option<ExtensionId> {
        self.entries.get(id).cloned()
    }
}
