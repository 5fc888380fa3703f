use std::collections::HashSet;
use std::sync::Arc;

use extman_core::{ExtensionId, LocalExtension, LocalExtensionRepository};

use crate::error::{JobError, Result};
use crate::handler::JobHandler;
use crate::job::JobContext;
use crate::request::JobRequest;

/// Installs the requested extensions, their local dependencies first.
///
/// A dependency is skipped when the core provides it or a matching version
/// is already installed in the namespace; otherwise the newest matching
/// stored version is installed.
#[derive(Debug, Clone)]
pub struct InstallHandler {
    repository: Arc<LocalExtensionRepository>,
}

impl InstallHandler {
    pub fn new(repository: Arc<LocalExtensionRepository>) -> Self {
        Self { repository }
    }

    fn install(
        &self,
        id: &ExtensionId,
        namespace: Option<&str>,
        context: &JobContext,
        visiting: &mut HashSet<String>,
    ) -> Result<()> {
        let extension = self.repository.resolve(id)?;
        if !visiting.insert(id.id().to_string()) {
            return Ok(());
        }

        for dependency in extension.dependencies() {
            if self.repository.core().exists(dependency.id()) {
                continue;
            }
            let versions = self.repository.versions(dependency.id());
            let satisfied = versions.iter().any(|candidate| {
                candidate.is_installed(namespace) && dependency.accepts(candidate.id().version())
            });
            if satisfied {
                continue;
            }

            let candidate = versions
                .iter()
                .rev()
                .find(|candidate| dependency.accepts(candidate.id().version()))
                .ok_or_else(|| JobError::MissingDependency {
                    extension: id.to_string(),
                    dependency: dependency.to_string(),
                })?;
            self.install(candidate.id(), namespace, context, visiting)?;
        }

        if self.is_registered(&extension, namespace) {
            context.log(format!("Extension {id} is already installed"));
            return Ok(());
        }
        self.repository.install_extension(id, namespace)?;
        context.log(match namespace {
            Some(ns) => format!("Installed {id} in namespace {ns}"),
            None => format!("Installed {id}"),
        });
        Ok(())
    }

    fn is_registered(&self, extension: &Arc<LocalExtension>, namespace: Option<&str>) -> bool {
        self.repository
            .installed_extension(extension.id().id(), namespace)
            .is_some_and(|installed| Arc::ptr_eq(&installed, extension))
    }
}

impl JobHandler for InstallHandler {
    fn run(&self, request: &JobRequest, context: &JobContext) -> Result<()> {
        for namespace in request.scopes() {
            let mut visiting = HashSet::new();
            for id in &request.extensions {
                self.install(id, namespace, context, &mut visiting)?;
            }
        }
        Ok(())
    }
}
