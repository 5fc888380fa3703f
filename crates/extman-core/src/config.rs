//! Extension manager configuration.
//!
//! ```toml
//! local_repository = "/var/lib/extman/repository"
//!
//! [[core_extensions]]
//! id = "platform"
//! version = "2.0"
//! features = ["logging-api"]
//! ```

use std::path::{Path, PathBuf};

use extman_fs::{ConfigStore, NormalizedPath};
use serde::{Deserialize, Serialize};

use crate::core_extensions::StaticCoreExtensions;
use crate::error::Result;
use crate::id::ExtensionId;
use crate::storage::FilesystemStorage;

/// A core extension declared in configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CoreExtensionEntry {
    pub id: String,
    pub version: String,
    /// Extra features the core extension provides besides its id.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
}

/// Top-level configuration, loadable from TOML, JSON or YAML.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ExtensionManagerConfig {
    /// Root directory of the local extension repository.
    pub local_repository: PathBuf,
    #[serde(default)]
    pub core_extensions: Vec<CoreExtensionEntry>,
}

impl ExtensionManagerConfig {
    pub fn new(local_repository: impl Into<PathBuf>) -> Self {
        Self {
            local_repository: local_repository.into(),
            core_extensions: Vec::new(),
        }
    }

    /// Declare a core extension.
    pub fn with_core_extension(mut self, id: impl Into<String>, version: impl Into<String>) -> Self {
        self.core_extensions.push(CoreExtensionEntry {
            id: id.into(),
            version: version.into(),
            features: Vec::new(),
        });
        self
    }

    /// Load configuration; the format follows the file extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = NormalizedPath::new(path);
        let config = ConfigStore::new().load(&path)?;
        tracing::debug!(path = %path, "Loaded extension manager configuration");
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        ConfigStore::new().save(&NormalizedPath::new(path), self)?;
        Ok(())
    }

    /// Core extensions as a [`StaticCoreExtensions`] provider.
    pub fn core_repository(&self) -> StaticCoreExtensions {
        let mut core = StaticCoreExtensions::new();
        for entry in &self.core_extensions {
            let id = ExtensionId::new(entry.id.clone(), entry.version.clone());
            for feature in &entry.features {
                core.register_feature(feature.clone(), id.clone());
            }
            core.register(id);
        }
        core
    }

    /// Filesystem storage rooted at [`Self::local_repository`].
    pub fn storage(&self) -> FilesystemStorage {
        FilesystemStorage::new(self.local_repository.as_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_extensions::CoreExtensionRepository;

    #[test]
    fn test_parse_minimal() {
        let config: ExtensionManagerConfig =
            toml::from_str(r#"local_repository = "/srv/extensions""#).unwrap();
        assert_eq!(config.local_repository, PathBuf::from("/srv/extensions"));
        assert!(config.core_extensions.is_empty());
    }

    #[test]
    fn test_core_repository_registers_features() {
        let config: ExtensionManagerConfig = toml::from_str(
            r#"
local_repository = "/srv/extensions"

[[core_extensions]]
id = "platform"
version = "2.0"
features = ["logging-api"]
"#,
        )
        .unwrap();

        let core = config.core_repository();
        assert!(core.exists("platform"));
        assert_eq!(
            core.get("logging-api"),
            Some(ExtensionId::new("platform", "2.0"))
        );
    }

    #[test]
    fn test_save_and_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extman.yaml");
        let config = ExtensionManagerConfig::new(dir.path().join("repository"))
            .with_core_extension("platform", "2.0");

        config.save(&path).unwrap();
        let loaded = ExtensionManagerConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
