//! Dependency validation of installed extensions.
//!
//! An installed extension stays installed in a namespace only when every
//! dependency is provided by the core or by a local version that is itself
//! valid and installed there (and matches the declared constraint). Anything
//! else is flipped to uninstalled in memory; nothing is persisted.
//!
//! A globally installed extension is only ever validated against global
//! state. Namespaces depending on it reuse that single verdict.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::LocalExtensionRepository;
use crate::dependency::ExtensionDependency;
use crate::extension::LocalExtension;
use crate::id::ExtensionId;

/// What a validation pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Number of `(extension, namespace)` pairs registered as installed.
    pub installed: usize,
    /// Extensions forced to uninstalled, with the namespace they were
    /// validated for.
    pub disabled: Vec<(ExtensionId, Option<String>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Per-namespace bookkeeping of a validation pass.
#[derive(Debug, Default)]
struct Memo {
    marks: HashMap<String, Mark>,
    checked: HashSet<ExtensionId>,
}

#[derive(Debug, Default)]
struct Pass {
    memos: HashMap<Option<String>, Memo>,
    report: ValidationReport,
}

impl Pass {
    fn memo(&mut self, namespace: Option<&str>) -> &mut Memo {
        self.memos
            .entry(namespace.map(str::to_string))
            .or_default()
    }

    fn is_settled(&mut self, extension: &LocalExtension, namespace: Option<&str>) -> bool {
        let memo = self.memo(namespace);
        memo.marks.contains_key(extension.id().id()) || memo.checked.contains(extension.id())
    }
}

#[derive(Debug)]
enum Outcome {
    NotInstalled,
    Shadowed,
    Unsatisfied(String),
    Satisfied,
}

/// The namespace `extension` is validated for when probed from `namespace`.
fn validation_scope<'a>(extension: &LocalExtension, namespace: Option<&'a str>) -> Option<&'a str> {
    if extension.is_installed(None) {
        None
    } else {
        namespace
    }
}

impl LocalExtensionRepository {
    /// Rebuild the installed-state index from the installed flags, disabling
    /// every extension whose dependencies can't be satisfied.
    ///
    /// Running it again without changes yields the same index.
    pub fn validate(&self) -> ValidationReport {
        self.installed.clear();

        let mut pass = Pass::default();

        let mut bare_ids: Vec<String> = self
            .extensions_by_id
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        bare_ids.sort();

        for bare_id in bare_ids {
            for extension in self.versions(&bare_id).into_iter().rev() {
                let namespaces: Vec<Option<String>> = match extension.namespaces() {
                    Some(namespaces) => namespaces.into_iter().map(Some).collect(),
                    None => vec![None],
                };
                for namespace in namespaces {
                    if pass.is_settled(&extension, namespace.as_deref()) {
                        continue;
                    }
                    self.validate_extension(&extension, namespace.as_deref(), &mut pass);
                }
            }
        }

        let report = pass.report;
        tracing::debug!(
            installed = report.installed,
            disabled = report.disabled.len(),
            "Validated installed extensions"
        );
        report
    }

    fn validate_extension(
        &self,
        extension: &Arc<LocalExtension>,
        namespace: Option<&str>,
        pass: &mut Pass,
    ) {
        let bare_id = extension.id().id().to_string();
        let previous = pass
            .memo(namespace)
            .marks
            .insert(bare_id.clone(), Mark::InProgress);

        let outcome = self.check_extension(extension, namespace, pass);
        let memo = pass.memo(namespace);
        memo.checked.insert(extension.id().clone());

        if let Outcome::Satisfied = outcome {
            memo.marks.insert(bare_id, Mark::Done);
            pass.report.installed += 1;
            return;
        }

        // Failed versions leave the id open so older versions get a chance.
        match previous {
            Some(mark) => memo.marks.insert(bare_id, mark),
            None => memo.marks.remove(&bare_id),
        };

        match outcome {
            Outcome::Shadowed => {
                tracing::debug!(
                    extension = %extension.id(),
                    "Disabled extension shadowed by a core extension"
                );
            }
            Outcome::Unsatisfied(dependency) => {
                tracing::debug!(
                    extension = %extension.id(),
                    namespace = ?namespace,
                    dependency = %dependency,
                    "Disabled extension with unsatisfied dependency"
                );
            }
            Outcome::NotInstalled | Outcome::Satisfied => return,
        }
        pass.report
            .disabled
            .push((extension.id().clone(), namespace.map(str::to_string)));
    }

    fn check_extension(
        &self,
        extension: &Arc<LocalExtension>,
        namespace: Option<&str>,
        pass: &mut Pass,
    ) -> Outcome {
        if !extension.is_installed(namespace) {
            return Outcome::NotInstalled;
        }

        if let Some(core) = self.core.get(extension.id().id()) {
            tracing::debug!(extension = %extension.id(), core = %core, "Local copy of a core extension");
            extension.set_installed(false, None);
            return Outcome::Shadowed;
        }

        for dependency in extension.dependencies() {
            if !self.dependency_satisfied(dependency, namespace, pass) {
                extension.set_installed(false, namespace);
                return Outcome::Unsatisfied(dependency.to_string());
            }
        }

        self.register_installed(extension, namespace, false);
        Outcome::Satisfied
    }

    fn dependency_satisfied(
        &self,
        dependency: &ExtensionDependency,
        namespace: Option<&str>,
        pass: &mut Pass,
    ) -> bool {
        if let Some(provider) = self.core.get(dependency.id()) {
            tracing::trace!(dependency = %dependency, provider = %provider, "Provided by the core");
            return true;
        }

        for candidate in self.versions(dependency.id()).into_iter().rev() {
            let scope = validation_scope(&candidate, namespace);
            if pass.memo(scope).marks.get(dependency.id()) == Some(&Mark::InProgress) {
                tracing::debug!(
                    dependency = %dependency,
                    namespace = ?scope,
                    "Dependency cycle detected"
                );
                return false;
            }
            if !pass.memo(scope).checked.contains(candidate.id()) {
                self.validate_extension(&candidate, scope, pass);
            }
            if candidate.is_installed(namespace) && dependency.accepts(candidate.id().version()) {
                return true;
            }
        }

        false
    }
}
