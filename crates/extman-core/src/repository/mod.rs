//! The local extension repository.
//!
//! Holds every locally stored extension copy, grouped by bare id in
//! ascending version order, and the installed-state index that maps
//! `(feature, namespace)` to the extension providing it along with the
//! installed extensions depending on it.
//!
//! Install state changes go through [`LocalExtensionRepository::install_extension`]
//! and [`LocalExtensionRepository::uninstall_extension`], which persist the
//! descriptor before updating the index. Uninstalling drops the extension's
//! records wholesale; dependents keep their installed flag until the next
//! [`LocalExtensionRepository::validate`] pass.

mod validate;

pub use validate::ValidationReport;

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::core_extensions::CoreExtensionRepository;
use crate::error::{Error, Result};
use crate::extension::{Extension, LocalExtension};
use crate::id::ExtensionId;
use crate::installed::{InstalledExtension, InstalledIndex};
use crate::storage::ExtensionStorage;
use crate::version::{DefaultVersionComparator, VersionComparator};

/// Backward dependencies of one extension, keyed by namespace.
pub type BackwardDependencies = BTreeMap<Option<String>, Vec<Arc<LocalExtension>>>;

#[derive(Debug)]
pub struct LocalExtensionRepository {
    storage: Arc<dyn ExtensionStorage>,
    core: Arc<dyn CoreExtensionRepository>,
    comparator: Arc<dyn VersionComparator>,
    extensions: DashMap<ExtensionId, Arc<LocalExtension>>,
    extensions_by_id: DashMap<String, Vec<Arc<LocalExtension>>>,
    installed: InstalledIndex,
}

impl LocalExtensionRepository {
    /// Create an empty repository. Call [`Self::initialize`] to load what
    /// `storage` already holds.
    pub fn new(
        storage: Arc<dyn ExtensionStorage>,
        core: Arc<dyn CoreExtensionRepository>,
    ) -> Self {
        Self {
            storage,
            core,
            comparator: Arc::new(DefaultVersionComparator),
            extensions: DashMap::new(),
            extensions_by_id: DashMap::new(),
            installed: InstalledIndex::default(),
        }
    }

    /// Use `comparator` to order versions of the same bare id.
    pub fn with_comparator(mut self, comparator: Arc<dyn VersionComparator>) -> Self {
        self.comparator = comparator;
        self
    }

    /// Create a repository and load everything `storage` holds.
    pub fn open(
        storage: Arc<dyn ExtensionStorage>,
        core: Arc<dyn CoreExtensionRepository>,
    ) -> Result<Self> {
        let repository = Self::new(storage, core);
        repository.initialize()?;
        Ok(repository)
    }

    /// Load stored extensions and validate their install state.
    pub fn initialize(&self) -> Result<ValidationReport> {
        for extension in self.storage.load_extensions()? {
            let id = extension.id().clone();
            if !self.add_local_extension(Arc::new(extension)) {
                tracing::warn!(extension = %id, "Ignoring duplicate stored extension");
            }
        }

        let report = self.validate();
        tracing::info!(
            extensions = self.count_extensions(),
            installed = report.installed,
            disabled = report.disabled.len(),
            "Local extension repository initialized"
        );
        Ok(report)
    }

    pub fn core(&self) -> &Arc<dyn CoreExtensionRepository> {
        &self.core
    }

    pub fn storage(&self) -> &Arc<dyn ExtensionStorage> {
        &self.storage
    }

    /// Register a loaded or newly stored extension. Returns `false` if the
    /// id is already known.
    fn add_local_extension(&self, extension: Arc<LocalExtension>) -> bool {
        match self.extensions.entry(extension.id().clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&extension));
                self.insert_version(extension);
                true
            }
        }
    }

    /// Ordered insertion into the per-bare-id version list.
    fn insert_version(&self, extension: Arc<LocalExtension>) {
        let mut versions = self
            .extensions_by_id
            .entry(extension.id().id().to_string())
            .or_default();
        let version = extension.id().version();
        let index = versions
            .iter()
            .position(|existing| {
                self.comparator.compare(version, existing.id().version()) != Ordering::Greater
            })
            .unwrap_or(versions.len());
        versions.insert(index, extension);
    }

    fn forget(&self, extension: &Arc<LocalExtension>) {
        self.extensions.remove(extension.id());

        let bare_id = extension.id().id();
        if let Some(mut versions) = self.extensions_by_id.get_mut(bare_id) {
            versions.retain(|existing| !Arc::ptr_eq(existing, extension));
        }
        self.extensions_by_id
            .remove_if(bare_id, |_, versions| versions.is_empty());
    }

    /// Look up the stored copy of `id`.
    pub fn resolve(&self, id: &ExtensionId) -> Result<Arc<LocalExtension>> {
        self.extensions
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| Error::Resolve(id.to_string()))
    }

    pub fn exists(&self, id: &ExtensionId) -> bool {
        self.extensions.contains_key(id)
    }

    /// Every stored extension, ordered by id.
    pub fn local_extensions(&self) -> Vec<Arc<LocalExtension>> {
        let mut extensions: Vec<Arc<LocalExtension>> = self
            .extensions
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        extensions.sort_by(|a, b| a.id().cmp(b.id()));
        extensions
    }

    /// Stored versions of `bare_id`, oldest first.
    pub fn versions(&self, bare_id: &str) -> Vec<Arc<LocalExtension>> {
        self.extensions_by_id
            .get(bare_id)
            .map(|versions| versions.value().clone())
            .unwrap_or_default()
    }

    pub fn count_extensions(&self) -> usize {
        self.extensions.len()
    }

    /// Stored extensions installed in at least one namespace.
    pub fn installed_extensions(&self) -> Vec<Arc<LocalExtension>> {
        self.local_extensions()
            .into_iter()
            .filter(|extension| extension.is_installed_anywhere())
            .collect()
    }

    /// Stored extensions installed in `namespace` (globally installed ones
    /// included).
    pub fn installed_extensions_in(&self, namespace: Option<&str>) -> Vec<Arc<LocalExtension>> {
        self.local_extensions()
            .into_iter()
            .filter(|extension| extension.is_installed(namespace))
            .collect()
    }

    /// The extension registered as providing `feature` in `namespace`.
    pub fn installed_extension(
        &self,
        feature: &str,
        namespace: Option<&str>,
    ) -> Option<Arc<LocalExtension>> {
        self.installed.get(feature, namespace)?.extension()
    }

    /// Installed extensions depending on `feature` in `namespace`.
    pub fn backward_dependencies(
        &self,
        feature: &str,
        namespace: Option<&str>,
    ) -> Result<Vec<Arc<LocalExtension>>> {
        self.installed
            .get(feature, namespace)
            .map(|record| record.backward_dependencies())
            .ok_or_else(|| Error::Resolve(feature.to_string()))
    }

    /// Backward dependencies of the stored extension `id` in every namespace
    /// where it is registered as installed.
    pub fn backward_dependencies_by_id(&self, id: &ExtensionId) -> Result<BackwardDependencies> {
        let extension = self.resolve(id)?;
        let mut result = BackwardDependencies::new();
        for record in self.installed.namespaces_of(id.id()) {
            let bound = record
                .extension()
                .is_some_and(|bound| Arc::ptr_eq(&bound, &extension));
            if bound {
                result.insert(
                    record.namespace().map(str::to_string),
                    record.backward_dependencies(),
                );
            }
        }
        Ok(result)
    }

    /// Every installation record, ordered by feature then namespace.
    pub fn installed_records(&self) -> Vec<Arc<InstalledExtension>> {
        let mut records = self.installed.records();
        records.sort_by(|a, b| {
            a.feature()
                .cmp(b.feature())
                .then_with(|| a.namespace().cmp(&b.namespace()))
        });
        records
    }

    /// Add `extension` to the local repository.
    ///
    /// The artifact (when the extension carries one) and then the descriptor
    /// are persisted before the extension becomes visible.
    pub fn store_extension(
        &self,
        mut extension: Extension,
        dependency: bool,
    ) -> Result<Arc<LocalExtension>> {
        let id = extension.id().clone();
        let content = extension.take_content();
        let local = match self.extensions.entry(id.clone()) {
            Entry::Occupied(_) => return Err(Error::AlreadyExists(id.to_string())),
            Entry::Vacant(slot) => {
                let file = self.storage.extension_file(&id, extension.kind());
                let descriptor_file = self.storage.descriptor_file(&id);
                let local = Arc::new(LocalExtension::new(
                    extension,
                    dependency,
                    file,
                    descriptor_file,
                ));
                if let Some(content) = &content {
                    self.storage
                        .save_file(&local, content)
                        .map_err(|e| Error::Store {
                            id: id.to_string(),
                            source: Box::new(e),
                        })?;
                }
                if let Err(e) = self.storage.save_descriptor(&local) {
                    if let Err(cleanup) = self.storage.remove_extension(&local) {
                        tracing::warn!(extension = %id, error = %cleanup, "Failed to clean up partially stored extension");
                    }
                    return Err(Error::Store {
                        id: id.to_string(),
                        source: Box::new(e),
                    });
                }
                slot.insert(Arc::clone(&local));
                local
            }
        };
        self.insert_version(Arc::clone(&local));

        tracing::info!(extension = %id, dependency, "Stored extension");
        Ok(local)
    }

    /// Delete the stored copy of `id` from storage and memory.
    pub fn remove_extension(&self, id: &ExtensionId) -> Result<()> {
        let extension = self.resolve(id)?;
        self.storage.remove_extension(&extension)?;

        self.forget(&extension);
        self.drop_installed_records(&extension, None);

        tracing::info!(extension = %id, "Removed extension");
        Ok(())
    }

    /// Mark the stored copy of `id` installed in `namespace` (`None` for
    /// every namespace).
    ///
    /// The descriptor is saved before the index is updated; a failed save
    /// leaves the in-memory flag set.
    pub fn install_extension(
        &self,
        id: &ExtensionId,
        namespace: Option<&str>,
    ) -> Result<Arc<LocalExtension>> {
        let extension = self.resolve(id)?;
        if self.core.exists(id.id()) {
            return Err(Error::CoreExtension(id.id().to_string()));
        }

        extension.set_installed(true, namespace);
        self.storage
            .save_descriptor(&extension)
            .map_err(|e| Error::Install {
                id: id.to_string(),
                source: Box::new(e),
            })?;

        self.register_installed(&extension, namespace, true);

        tracing::info!(extension = %id, namespace = ?namespace, "Installed extension");
        Ok(extension)
    }

    /// Uninstall `extension` from `namespace` (`None` for every namespace).
    ///
    /// `extension` must be the instance registered as installed for its id
    /// in `namespace`.
    pub fn uninstall_extension(
        &self,
        extension: &Arc<LocalExtension>,
        namespace: Option<&str>,
    ) -> Result<()> {
        let id = extension.id();
        let registered = self
            .installed_extension(id.id(), namespace)
            .is_some_and(|installed| Arc::ptr_eq(&installed, extension));
        if !registered {
            return Err(Error::not_installed(&id.to_string(), namespace));
        }

        extension.set_installed(false, namespace);
        self.storage
            .save_descriptor(extension)
            .map_err(|e| Error::Uninstall {
                id: id.to_string(),
                source: Box::new(e),
            })?;

        self.drop_installed_records(extension, namespace);

        tracing::info!(extension = %id, namespace = ?namespace, "Uninstalled extension");
        Ok(())
    }

    /// Register `extension` as installed in `namespace`: under its own id and
    /// every feature, and as a backward dependency of each of its
    /// dependencies.
    ///
    /// With `replace == false` an existing binding of the own-id and feature
    /// records is kept.
    fn register_installed(
        &self,
        extension: &Arc<LocalExtension>,
        namespace: Option<&str>,
        replace: bool,
    ) {
        let provided = std::iter::once(extension.id().id())
            .chain(extension.features().iter().map(String::as_str));
        for feature in provided {
            let record = self.installed.get_or_create(feature, namespace);
            if replace {
                record.bind(Arc::clone(extension));
            } else {
                record.bind_if_unbound(|| Some(Arc::clone(extension)));
            }
        }

        for dependency in extension.dependencies() {
            let record = self.installed.get_or_create(dependency.id(), namespace);
            record.bind_if_unbound(|| self.newest_installed(dependency.id(), namespace));
            record.add_backward_dependency(Arc::clone(extension));
        }
    }

    /// Remove the records provided by `extension` and its reverse edges.
    fn drop_installed_records(&self, extension: &Arc<LocalExtension>, namespace: Option<&str>) {
        self.installed.remove(extension.id().id(), namespace);
        for feature in extension.features() {
            self.installed.remove_bound(feature, namespace, extension);
        }

        for dependency in extension.dependencies() {
            let records = match namespace {
                None => self.installed.namespaces_of(dependency.id()),
                Some(_) => self
                    .installed
                    .get(dependency.id(), namespace)
                    .into_iter()
                    .collect(),
            };
            for record in records {
                record.remove_backward_dependency(extension.id());
            }
        }
    }

    fn newest_installed(&self, bare_id: &str, namespace: Option<&str>) -> Option<Arc<LocalExtension>> {
        self.versions(bare_id)
            .into_iter()
            .rev()
            .find(|candidate| candidate.is_installed(namespace))
    }
}
