//! Installed-state index: `(feature, namespace)` -> installation record.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::extension::LocalExtension;
use crate::id::ExtensionId;

/// Installation record of one feature in one namespace.
///
/// The backing extension is unbound when the record only exists as the
/// target of reverse edges, e.g. for a feature provided by the core.
#[derive(Debug)]
pub struct InstalledExtension {
    feature: String,
    namespace: Option<String>,
    extension: RwLock<Option<Arc<LocalExtension>>>,
    backward: RwLock<BTreeMap<ExtensionId, Arc<LocalExtension>>>,
}

impl InstalledExtension {
    fn new(feature: &str, namespace: Option<&str>) -> Self {
        Self {
            feature: feature.to_string(),
            namespace: namespace.map(str::to_string),
            extension: RwLock::new(None),
            backward: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The local extension providing this feature, if any.
    pub fn extension(&self) -> Option<Arc<LocalExtension>> {
        self.extension.read().clone()
    }

    pub(crate) fn bind(&self, extension: Arc<LocalExtension>) {
        *self.extension.write() = Some(extension);
    }

    /// Bind to `extension` unless already bound.
    pub(crate) fn bind_if_unbound(&self, extension: impl FnOnce() -> Option<Arc<LocalExtension>>) {
        let mut slot = self.extension.write();
        if slot.is_none() {
            *slot = extension();
        }
    }

    fn is_bound_to(&self, extension: &Arc<LocalExtension>) -> bool {
        self.extension
            .read()
            .as_ref()
            .is_some_and(|bound| Arc::ptr_eq(bound, extension))
    }

    /// Installed extensions depending on this feature, ordered by id.
    pub fn backward_dependencies(&self) -> Vec<Arc<LocalExtension>> {
        self.backward.read().values().cloned().collect()
    }

    pub(crate) fn add_backward_dependency(&self, extension: Arc<LocalExtension>) {
        self.backward
            .write()
            .insert(extension.id().clone(), extension);
    }

    pub(crate) fn remove_backward_dependency(&self, id: &ExtensionId) {
        self.backward.write().remove(id);
    }
}

/// Concurrent map of installation records.
#[derive(Debug, Default)]
pub(crate) struct InstalledIndex {
    records: DashMap<String, HashMap<Option<String>, Arc<InstalledExtension>>>,
}

impl InstalledIndex {
    pub(crate) fn get(&self, feature: &str, namespace: Option<&str>) -> Option<Arc<InstalledExtension>> {
        self.records
            .get(feature)?
            .get(&namespace.map(str::to_string))
            .cloned()
    }

    pub(crate) fn get_or_create(&self, feature: &str, namespace: Option<&str>) -> Arc<InstalledExtension> {
        let mut namespaces = self.records.entry(feature.to_string()).or_default();
        Arc::clone(
            namespaces
                .entry(namespace.map(str::to_string))
                .or_insert_with(|| Arc::new(InstalledExtension::new(feature, namespace))),
        )
    }

    /// Every record of `feature`, keyed by namespace.
    pub(crate) fn namespaces_of(&self, feature: &str) -> Vec<Arc<InstalledExtension>> {
        self.records
            .get(feature)
            .map(|namespaces| namespaces.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop the `(feature, namespace)` record; `None` drops every namespace.
    pub(crate) fn remove(&self, feature: &str, namespace: Option<&str>) {
        match namespace {
            None => {
                self.records.remove(feature);
            }
            Some(ns) => {
                let now_empty = match self.records.get_mut(feature) {
                    Some(mut namespaces) => {
                        namespaces.remove(&Some(ns.to_string()));
                        namespaces.is_empty()
                    }
                    None => false,
                };
                if now_empty {
                    self.records
                        .remove_if(feature, |_, namespaces| namespaces.is_empty());
                }
            }
        }
    }

    /// Drop the records of `feature` that are bound to `extension`.
    pub(crate) fn remove_bound(&self, feature: &str, namespace: Option<&str>, extension: &Arc<LocalExtension>) {
        if let Some(mut namespaces) = self.records.get_mut(feature) {
            namespaces.retain(|ns, record| {
                let in_scope = namespace.is_none() || ns.as_deref() == namespace;
                !(in_scope && record.is_bound_to(extension))
            });
        }
        self.records
            .remove_if(feature, |_, namespaces| namespaces.is_empty());
    }

    /// Every record currently in the index.
    pub(crate) fn records(&self) -> Vec<Arc<InstalledExtension>> {
        self.records
            .iter()
            .flat_map(|entry| entry.value().values().cloned().collect::<Vec<_>>())
            .collect()
    }

    pub(crate) fn clear(&self) {
        self.records.clear();
    }
}
