//! Job handler registry

use std::collections::HashMap;
use std::sync::Arc;

use extman_core::LocalExtensionRepository;

use crate::handler::JobHandler;
use crate::handlers::{InstallHandler, UninstallHandler};

/// Jobs shipped with the extension manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Install,
    Uninstall,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::Install, JobKind::Uninstall];

    /// Name the handler is registered under.
    pub fn name(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    fn handler(self, repository: Arc<LocalExtensionRepository>) -> Arc<dyn JobHandler> {
        match self {
            Self::Install => Arc::new(InstallHandler::new(repository)),
            Self::Uninstall => Arc::new(UninstallHandler::new(repository)),
        }
    }
}

/// Handlers looked up by name when a job is submitted.
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Create a registry with the built-in install and uninstall jobs.
    pub fn with_builtins(repository: Arc<LocalExtensionRepository>) -> Self {
        let mut registry = Self::new();
        for kind in JobKind::ALL {
            registry.register(kind.name(), kind.handler(Arc::clone(&repository)));
        }
        registry
    }

    /// Register (or replace) the handler for `name`.
    pub fn register(&mut self, name: impl Into<String>, handler: Arc<dyn JobHandler>) {
        self.handlers.insert(name.into(), handler);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// List all registered handler names (sorted).
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use extman_core::{MemoryStorage, StaticCoreExtensions};
    use rstest::rstest;

    fn repository() -> Arc<LocalExtensionRepository> {
        Arc::new(LocalExtensionRepository::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(StaticCoreExtensions::new()),
        ))
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = HandlerRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get("install").is_none());
    }

    #[test]
    fn test_builtins_registered() {
        let registry = HandlerRegistry::with_builtins(repository());
        assert_eq!(registry.list(), vec!["install", "uninstall"]);
        assert!(registry.contains("install"));
        assert_eq!(registry.len(), 2);
    }

    #[rstest]
    #[case("install", Some(JobKind::Install))]
    #[case("uninstall", Some(JobKind::Uninstall))]
    #[case("upgrade", None)]
    #[case("Install", None)]
    fn test_kind_from_name(#[case] name: &str, #[case] expected: Option<JobKind>) {
        assert_eq!(JobKind::from_name(name), expected);
    }
}
