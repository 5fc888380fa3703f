//! Extension descriptions and their locally stored copies.

use std::collections::BTreeSet;

use extman_fs::NormalizedPath;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::dependency::ExtensionDependency;
use crate::id::ExtensionId;
use crate::version::Version;

/// An extension that is not yet part of the local repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    id: ExtensionId,
    kind: String,
    name: Option<String>,
    description: Option<String>,
    features: Vec<String>,
    dependencies: Vec<ExtensionDependency>,
    /// Artifact bytes, copied into the local repository when stored.
    content: Option<Vec<u8>>,
}

impl Extension {
    /// Create an extension of artifact type `kind` (e.g. `"jar"`, `"xar"`).
    pub fn new(id: ExtensionId, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            name: None,
            description: None,
            features: Vec::new(),
            dependencies: Vec::new(),
            content: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declare an additional feature (virtual id) provided by this extension.
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    pub fn with_dependency(mut self, dependency: ExtensionDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Attach the artifact to copy into the local repository.
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn id(&self) -> &ExtensionId {
        &self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }

    pub fn dependencies(&self) -> &[ExtensionDependency] {
        &self.dependencies
    }

    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    pub(crate) fn take_content(&mut self) -> Option<Vec<u8>> {
        self.content.take()
    }
}

/// Installed flag plus the namespaces it applies to.
///
/// `namespaces == None` while installed means installed in every namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallState {
    installed: bool,
    namespaces: Option<BTreeSet<String>>,
}

impl InstallState {
    pub fn is_installed(&self, namespace: Option<&str>) -> bool {
        if !self.installed {
            return false;
        }
        match (&self.namespaces, namespace) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(namespaces), Some(ns)) => namespaces.contains(ns),
        }
    }

    /// Whether installed in at least one namespace.
    pub fn is_installed_anywhere(&self) -> bool {
        self.installed
    }

    /// `None` when global or not installed.
    pub fn namespaces(&self) -> Option<&BTreeSet<String>> {
        if self.installed {
            self.namespaces.as_ref()
        } else {
            None
        }
    }

    pub fn set_installed(&mut self, installed: bool, namespace: Option<&str>) {
        match (installed, namespace) {
            (true, None) => {
                self.installed = true;
                self.namespaces = None;
            }
            (true, Some(ns)) => {
                if !self.installed {
                    self.installed = true;
                    self.namespaces = Some(BTreeSet::new());
                }
                if let Some(namespaces) = self.namespaces.as_mut() {
                    namespaces.insert(ns.to_string());
                }
            }
            (false, None) => {
                self.installed = false;
                self.namespaces = None;
            }
            (false, Some(ns)) => {
                if let Some(namespaces) = self.namespaces.as_mut() {
                    namespaces.remove(ns);
                    if namespaces.is_empty() {
                        self.installed = false;
                        self.namespaces = None;
                    }
                }
            }
        }
    }
}

/// A physically stored extension copy.
///
/// Shared as `Arc<LocalExtension>` between the identity index and the
/// installed-state index; only the install state is mutable.
#[derive(Debug)]
pub struct LocalExtension {
    extension: Extension,
    dependency: bool,
    file: NormalizedPath,
    descriptor_file: NormalizedPath,
    state: RwLock<InstallState>,
}

impl LocalExtension {
    pub fn new(
        extension: Extension,
        dependency: bool,
        file: NormalizedPath,
        descriptor_file: NormalizedPath,
    ) -> Self {
        Self {
            extension,
            dependency,
            file,
            descriptor_file,
            state: RwLock::new(InstallState::default()),
        }
    }

    /// Rebuild a stored extension from its persisted descriptor.
    pub fn from_descriptor(
        descriptor: ExtensionDescriptor,
        file: NormalizedPath,
        descriptor_file: NormalizedPath,
    ) -> Self {
        let mut extension = Extension::new(
            ExtensionId::new(descriptor.id, descriptor.version),
            descriptor.kind,
        );
        extension.name = descriptor.name;
        extension.description = descriptor.description;
        extension.features = descriptor.features;
        extension.dependencies = descriptor.dependencies;

        let state = InstallState {
            installed: descriptor.installed,
            namespaces: descriptor
                .namespaces
                .filter(|_| descriptor.installed)
                .map(|namespaces| namespaces.into_iter().collect()),
        };

        Self {
            extension,
            dependency: descriptor.dependency,
            file,
            descriptor_file,
            state: RwLock::new(state),
        }
    }

    /// Snapshot of this extension as a persistable descriptor.
    pub fn descriptor(&self) -> ExtensionDescriptor {
        let state = self.install_state();
        let extension = &self.extension;
        ExtensionDescriptor {
            id: extension.id.id().to_string(),
            version: extension.id.version().clone(),
            kind: extension.kind.clone(),
            name: extension.name.clone(),
            description: extension.description.clone(),
            dependency: self.dependency,
            installed: state.installed,
            namespaces: state
                .namespaces()
                .map(|namespaces| namespaces.iter().cloned().collect()),
            features: extension.features.clone(),
            dependencies: extension.dependencies.clone(),
        }
    }

    pub fn extension(&self) -> &Extension {
        &self.extension
    }

    pub fn id(&self) -> &ExtensionId {
        self.extension.id()
    }

    pub fn kind(&self) -> &str {
        self.extension.kind()
    }

    pub fn features(&self) -> &[String] {
        self.extension.features()
    }

    pub fn dependencies(&self) -> &[ExtensionDependency] {
        self.extension.dependencies()
    }

    /// Whether this copy was pulled in as a dependency of another extension.
    pub fn is_dependency(&self) -> bool {
        self.dependency
    }

    /// Location of the extension artifact.
    pub fn file(&self) -> &NormalizedPath {
        &self.file
    }

    pub fn descriptor_file(&self) -> &NormalizedPath {
        &self.descriptor_file
    }

    pub fn is_installed(&self, namespace: Option<&str>) -> bool {
        self.state.read().is_installed(namespace)
    }

    pub fn is_installed_anywhere(&self) -> bool {
        self.state.read().is_installed_anywhere()
    }

    /// Namespaces this extension is installed in; `None` when global or not
    /// installed.
    pub fn namespaces(&self) -> Option<Vec<String>> {
        self.state
            .read()
            .namespaces()
            .map(|namespaces| namespaces.iter().cloned().collect())
    }

    pub fn install_state(&self) -> InstallState {
        self.state.read().clone()
    }

    pub(crate) fn set_installed(&self, installed: bool, namespace: Option<&str>) {
        self.state.write().set_installed(installed, namespace);
    }
}

/// On-disk form of a [`LocalExtension`].
///
/// Field order matters for TOML: plain values first, `dependencies` (an array
/// of tables) last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDescriptor {
    pub id: String,
    pub version: Version,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub dependency: bool,
    #[serde(default)]
    pub installed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<ExtensionDependency>,
}

impl ExtensionDescriptor {
    pub fn extension_id(&self) -> ExtensionId {
        ExtensionId::new(self.id.clone(), self.version.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(id: &str, version: &str) -> LocalExtension {
        LocalExtension::new(
            Extension::new(ExtensionId::new(id, version), "jar"),
            false,
            NormalizedPath::new("/repo/ext.jar"),
            NormalizedPath::new("/repo/ext.descriptor.toml"),
        )
    }

    #[test]
    fn test_global_install() {
        let ext = local("app", "1.0");
        assert!(!ext.is_installed(None));

        ext.set_installed(true, None);
        assert!(ext.is_installed(None));
        assert!(ext.is_installed(Some("wiki1")));
        assert!(ext.namespaces().is_none());
    }

    #[test]
    fn test_namespace_install() {
        let ext = local("app", "1.0");
        ext.set_installed(true, Some("wiki1"));

        assert!(ext.is_installed(Some("wiki1")));
        assert!(!ext.is_installed(Some("wiki2")));
        assert!(!ext.is_installed(None));
        assert!(ext.is_installed_anywhere());
        assert_eq!(ext.namespaces(), Some(vec!["wiki1".to_string()]));
    }

    #[test]
    fn test_uninstall_last_namespace_clears_flag() {
        let ext = local("app", "1.0");
        ext.set_installed(true, Some("wiki1"));
        ext.set_installed(true, Some("wiki2"));

        ext.set_installed(false, Some("wiki1"));
        assert!(ext.is_installed_anywhere());
        ext.set_installed(false, Some("wiki2"));
        assert!(!ext.is_installed_anywhere());
        assert!(ext.namespaces().is_none());
    }

    #[test]
    fn test_namespace_uninstall_of_global_is_noop() {
        let ext = local("app", "1.0");
        ext.set_installed(true, None);
        ext.set_installed(false, Some("wiki1"));
        assert!(ext.is_installed(Some("wiki1")));
        assert!(ext.is_installed(None));
    }

    #[test]
    fn test_namespace_install_of_global_stays_global() {
        let ext = local("app", "1.0");
        ext.set_installed(true, None);
        ext.set_installed(true, Some("wiki1"));
        assert!(ext.is_installed(None));
    }

    #[test]
    fn test_global_uninstall_clears_namespaces() {
        let ext = local("app", "1.0");
        ext.set_installed(true, Some("wiki1"));
        ext.set_installed(false, None);
        assert!(!ext.is_installed(Some("wiki1")));
        assert_eq!(ext.install_state(), InstallState::default());
    }

    #[test]
    fn test_descriptor_roundtrip_keeps_state() {
        let extension = Extension::new(ExtensionId::new("app", "1.0"), "xar")
            .with_name("Application")
            .with_feature("app-api")
            .with_dependency(ExtensionDependency::with_constraint("lib", ">=1.0").unwrap());
        let ext = LocalExtension::new(
            extension.clone(),
            true,
            NormalizedPath::new("/repo/app.xar"),
            NormalizedPath::new("/repo/app.descriptor.toml"),
        );
        ext.set_installed(true, Some("wiki1"));

        let toml = toml::to_string(&ext.descriptor()).unwrap();
        let descriptor: ExtensionDescriptor = toml::from_str(&toml).unwrap();
        let reloaded = LocalExtension::from_descriptor(
            descriptor,
            ext.file().clone(),
            ext.descriptor_file().clone(),
        );

        assert_eq!(reloaded.extension(), &extension);
        assert!(reloaded.is_dependency());
        assert!(reloaded.is_installed(Some("wiki1")));
        assert!(!reloaded.is_installed(None));
    }

    #[test]
    fn test_descriptor_ignores_namespaces_when_not_installed() {
        let descriptor: ExtensionDescriptor = toml::from_str(
            r#"
id = "app"
version = "1.0"
type = "jar"
namespaces = ["wiki1"]
"#,
        )
        .unwrap();
        let ext = LocalExtension::from_descriptor(
            descriptor,
            NormalizedPath::new("/a"),
            NormalizedPath::new("/b"),
        );
        assert!(!ext.is_installed_anywhere());
        assert!(ext.namespaces().is_none());
    }
}
