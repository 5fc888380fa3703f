//! Wiring of repository and job gate from configuration.

use std::sync::Arc;

use extman_core::{ExtensionManagerConfig, LocalExtensionRepository};

use crate::error::Result;
use crate::gate::JobGate;
use crate::job::Job;
use crate::registry::HandlerRegistry;
use crate::request::JobRequest;

/// The local repository plus the gate running jobs against it.
#[derive(Debug)]
pub struct ExtensionManager {
    repository: Arc<LocalExtensionRepository>,
    gate: JobGate,
}

impl ExtensionManager {
    /// Open the filesystem repository described by `config`, validate it and
    /// register the built-in jobs.
    pub fn open(config: &ExtensionManagerConfig) -> Result<Self> {
        let repository = LocalExtensionRepository::open(
            Arc::new(config.storage()),
            Arc::new(config.core_repository()),
        )?;
        tracing::info!(
            root = %config.local_repository.display(),
            extensions = repository.count_extensions(),
            "Opened extension manager"
        );
        Ok(Self::with_repository(Arc::new(repository)))
    }

    pub fn with_repository(repository: Arc<LocalExtensionRepository>) -> Self {
        let registry = HandlerRegistry::with_builtins(Arc::clone(&repository));
        Self {
            repository,
            gate: JobGate::new(registry),
        }
    }

    pub fn repository(&self) -> &Arc<LocalExtensionRepository> {
        &self.repository
    }

    pub fn gate(&self) -> &JobGate {
        &self.gate
    }

    pub fn install(&self, request: JobRequest) -> Result<Arc<Job>> {
        self.gate.install(request)
    }

    pub fn uninstall(&self, request: JobRequest) -> Result<Arc<Job>> {
        self.gate.uninstall(request)
    }
}
