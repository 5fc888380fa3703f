//! Persistence of local extensions.
//!
//! [`FilesystemStorage`] lays the local repository out as
//!
//! ```text
//! <root>/<id>/<version>/<id>-<version>.descriptor.toml
//! <root>/<id>/<version>/<id>-<version>.<type>
//! ```
//!
//! with every path segment percent-encoded by [`extman_fs::encode_segment`].

use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use extman_fs::{ConfigStore, NormalizedPath, encode_segment, io};

use crate::error::{Error, Result};
use crate::extension::{ExtensionDescriptor, LocalExtension};
use crate::id::ExtensionId;

/// Suffix of descriptor files inside a filesystem repository.
pub const DESCRIPTOR_SUFFIX: &str = ".descriptor.toml";

/// Backend holding extension descriptors and artifacts.
pub trait ExtensionStorage: Send + Sync + Debug {
    /// Load every stored extension.
    fn load_extensions(&self) -> Result<Vec<LocalExtension>>;

    /// Where the artifact of `id` with type `kind` lives.
    fn extension_file(&self, id: &ExtensionId, kind: &str) -> NormalizedPath;

    /// Where the descriptor of `id` lives.
    fn descriptor_file(&self, id: &ExtensionId) -> NormalizedPath;

    /// Write the artifact of `extension` to [`LocalExtension::file`].
    fn save_file(&self, extension: &LocalExtension, content: &[u8]) -> Result<()>;

    /// Persist the current descriptor (including install state).
    fn save_descriptor(&self, extension: &LocalExtension) -> Result<()>;

    /// Delete the descriptor and artifact of `extension`.
    fn remove_extension(&self, extension: &LocalExtension) -> Result<()>;
}

fn file_stem(id: &ExtensionId) -> String {
    format!(
        "{}-{}",
        encode_segment(id.id()),
        encode_segment(id.version().as_str())
    )
}

/// Descriptors stored as TOML files under a local repository root.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root: NormalizedPath,
    store: ConfigStore,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<NormalizedPath>) -> Self {
        Self {
            root: root.into(),
            store: ConfigStore::new(),
        }
    }

    pub fn root(&self) -> &NormalizedPath {
        &self.root
    }

    fn extension_dir(&self, id: &ExtensionId) -> NormalizedPath {
        self.root
            .join(&encode_segment(id.id()))
            .join(&encode_segment(id.version().as_str()))
    }

    fn load_descriptor(&self, path: &NormalizedPath) -> Result<LocalExtension> {
        let descriptor: ExtensionDescriptor = self.store.load(path)?;
        let id = descriptor.extension_id();
        if descriptor.id.trim().is_empty() {
            return Err(Error::Descriptor {
                path: path.to_native(),
                reason: "empty extension id".to_string(),
            });
        }
        let file = self.extension_file(&id, &descriptor.kind);
        Ok(LocalExtension::from_descriptor(descriptor, file, path.clone()))
    }
}

impl ExtensionStorage for FilesystemStorage {
    fn load_extensions(&self) -> Result<Vec<LocalExtension>> {
        let mut extensions = Vec::new();
        for path in io::list_files(&self.root, "toml")? {
            if !path.as_str().ends_with(DESCRIPTOR_SUFFIX) {
                continue;
            }
            match self.load_descriptor(&path) {
                Ok(extension) => extensions.push(extension),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Skipping unreadable extension descriptor");
                }
            }
        }
        tracing::debug!(root = %self.root, count = extensions.len(), "Loaded extension descriptors");
        Ok(extensions)
    }

    fn extension_file(&self, id: &ExtensionId, kind: &str) -> NormalizedPath {
        self.extension_dir(id)
            .join(&format!("{}.{}", file_stem(id), encode_segment(kind)))
    }

    fn descriptor_file(&self, id: &ExtensionId) -> NormalizedPath {
        self.extension_dir(id)
            .join(&format!("{}{}", file_stem(id), DESCRIPTOR_SUFFIX))
    }

    fn save_file(&self, extension: &LocalExtension, content: &[u8]) -> Result<()> {
        io::write_atomic(extension.file(), content)?;
        Ok(())
    }

    fn save_descriptor(&self, extension: &LocalExtension) -> Result<()> {
        self.store
            .save(extension.descriptor_file(), &extension.descriptor())?;
        Ok(())
    }

    fn remove_extension(&self, extension: &LocalExtension) -> Result<()> {
        io::remove_file(extension.descriptor_file())?;
        io::remove_file(extension.file())?;
        io::prune_empty_dirs(&self.extension_dir(extension.id()), &self.root)?;
        Ok(())
    }
}

/// Descriptors and artifacts kept in memory.
///
/// Useful for embedding and tests; saves can be made to fail on demand.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    descriptors: DashMap<ExtensionId, ExtensionDescriptor>,
    files: DashMap<ExtensionId, Vec<u8>>,
    fail_saves: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a descriptor as if it had been stored earlier.
    pub fn insert_descriptor(&self, descriptor: ExtensionDescriptor) {
        self.descriptors
            .insert(descriptor.extension_id(), descriptor);
    }

    /// The persisted descriptor of `id`.
    pub fn descriptor(&self, id: &ExtensionId) -> Option<ExtensionDescriptor> {
        self.descriptors.get(id).map(|entry| entry.value().clone())
    }

    /// The stored artifact of `id`.
    pub fn file(&self, id: &ExtensionId) -> Option<Vec<u8>> {
        self.files.get(id).map(|entry| entry.value().clone())
    }

    fn check_saves(&self, what: &str, id: &ExtensionId) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::Storage(format!("refusing to save {what} of [{id}]")));
        }
        Ok(())
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

impl ExtensionStorage for MemoryStorage {
    fn load_extensions(&self) -> Result<Vec<LocalExtension>> {
        let mut descriptors: Vec<ExtensionDescriptor> = self
            .descriptors
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        descriptors.sort_by_key(|descriptor| descriptor.extension_id());

        Ok(descriptors
            .into_iter()
            .map(|descriptor| {
                let id = descriptor.extension_id();
                let file = self.extension_file(&id, &descriptor.kind);
                let descriptor_file = self.descriptor_file(&id);
                LocalExtension::from_descriptor(descriptor, file, descriptor_file)
            })
            .collect())
    }

    fn extension_file(&self, id: &ExtensionId, kind: &str) -> NormalizedPath {
        NormalizedPath::new("memory").join(&format!("{}.{}", file_stem(id), kind))
    }

    fn descriptor_file(&self, id: &ExtensionId) -> NormalizedPath {
        NormalizedPath::new("memory").join(&format!("{}{}", file_stem(id), DESCRIPTOR_SUFFIX))
    }

    fn save_file(&self, extension: &LocalExtension, content: &[u8]) -> Result<()> {
        self.check_saves("artifact", extension.id())?;
        self.files.insert(extension.id().clone(), content.to_vec());
        Ok(())
    }

    fn save_descriptor(&self, extension: &LocalExtension) -> Result<()> {
        self.check_saves("descriptor", extension.id())?;
        self.insert_descriptor(extension.descriptor());
        Ok(())
    }

    fn remove_extension(&self, extension: &LocalExtension) -> Result<()> {
        self.descriptors.remove(extension.id());
        self.files.remove(extension.id());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extension::Extension;

    #[test]
    fn test_filesystem_layout_encodes_segments() {
        let storage = FilesystemStorage::new("/repo");
        let id = ExtensionId::new("org.example:app", "1.0");

        assert_eq!(
            storage.descriptor_file(&id).as_str(),
            "/repo/org.example%3Aapp/1.0/org.example%3Aapp-1.0.descriptor.toml"
        );
        assert_eq!(
            storage.extension_file(&id, "xar").as_str(),
            "/repo/org.example%3Aapp/1.0/org.example%3Aapp-1.0.xar"
        );
    }

    #[test]
    fn test_memory_storage_failing_save() {
        let storage = MemoryStorage::new();
        let id = ExtensionId::new("app", "1.0");
        let extension = LocalExtension::new(
            Extension::new(id.clone(), "jar"),
            false,
            storage.extension_file(&id, "jar"),
            storage.descriptor_file(&id),
        );

        storage.set_fail_saves(true);
        let err = storage.save_descriptor(&extension).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert!(storage.is_empty());

        storage.set_fail_saves(false);
        storage.save_descriptor(&extension).unwrap();
        assert_eq!(storage.descriptor(&id).unwrap().id, "app");
    }

    #[test]
    fn test_memory_storage_keeps_artifact_until_removed() {
        let storage = MemoryStorage::new();
        let id = ExtensionId::new("app", "1.0");
        let extension = LocalExtension::new(
            Extension::new(id.clone(), "jar"),
            false,
            storage.extension_file(&id, "jar"),
            storage.descriptor_file(&id),
        );

        storage.save_file(&extension, b"PK").unwrap();
        assert_eq!(storage.file(&id).as_deref(), Some(&b"PK"[..]));

        storage.remove_extension(&extension).unwrap();
        assert!(storage.file(&id).is_none());
    }
}
