use std::collections::HashSet;
use std::sync::Arc;

use extman_core::{Error, ExtensionId, LocalExtension, LocalExtensionRepository};

use crate::error::Result;
use crate::handler::JobHandler;
use crate::job::JobContext;
use crate::request::JobRequest;

/// Uninstalls the requested extensions after every installed extension that
/// depends on them.
#[derive(Debug, Clone)]
pub struct UninstallHandler {
    repository: Arc<LocalExtensionRepository>,
}

impl UninstallHandler {
    pub fn new(repository: Arc<LocalExtensionRepository>) -> Self {
        Self { repository }
    }

    fn dependents(
        &self,
        extension: &LocalExtension,
        namespace: Option<&str>,
    ) -> Result<Vec<Arc<LocalExtension>>> {
        let provided = std::iter::once(extension.id().id())
            .chain(extension.features().iter().map(String::as_str));

        let mut dependents = Vec::new();
        for feature in provided {
            match self.repository.backward_dependencies(feature, namespace) {
                Ok(found) => dependents.extend(found),
                Err(Error::Resolve(_)) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(dependents)
    }

    fn uninstall(
        &self,
        extension: &Arc<LocalExtension>,
        namespace: Option<&str>,
        context: &JobContext,
        visited: &mut HashSet<ExtensionId>,
    ) -> Result<()> {
        if !visited.insert(extension.id().clone()) {
            return Ok(());
        }

        for dependent in self.dependents(extension, namespace)? {
            let registered = self
                .repository
                .installed_extension(dependent.id().id(), namespace)
                .is_some_and(|installed| Arc::ptr_eq(&installed, &dependent));
            if registered {
                self.uninstall(&dependent, namespace, context, visited)?;
            }
        }

        self.repository.uninstall_extension(extension, namespace)?;
        context.log(match namespace {
            Some(ns) => format!("Uninstalled {} from namespace {ns}", extension.id()),
            None => format!("Uninstalled {}", extension.id()),
        });
        Ok(())
    }
}

impl JobHandler for UninstallHandler {
    fn run(&self, request: &JobRequest, context: &JobContext) -> Result<()> {
        for namespace in request.scopes() {
            let mut visited = HashSet::new();
            for id in &request.extensions {
                let extension = self.repository.resolve(id)?;
                self.uninstall(&extension, namespace, context, &mut visited)?;
            }
        }
        Ok(())
    }
}
