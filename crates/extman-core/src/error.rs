use std::path::PathBuf;

/// Display helper for an optional namespace.
pub(crate) fn namespace_label(namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) => format!("namespace [{ns}]"),
        None => "all namespaces".to_string(),
    }
}

/// Errors that can occur in the extension repository.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Unknown extension identity or feature.
    #[error("can't find extension [{0}]")]
    Resolve(String),

    /// Uninstall requested for a handle that is not the installed instance.
    #[error("extension [{id}] is not installed in {namespace}")]
    NotInstalled { id: String, namespace: String },

    /// A local extension may never shadow a core extension.
    #[error("extension [{0}] is provided by the core and can't be installed locally")]
    CoreExtension(String),

    /// Storing an extension whose identity is already known.
    #[error("extension [{0}] already exists in local repository")]
    AlreadyExists(String),

    /// Persisting the descriptor failed while installing.
    #[error("failed to install extension [{id}]: {source}")]
    Install {
        id: String,
        #[source]
        source: Box<Error>,
    },

    /// Persisting the descriptor failed while uninstalling.
    #[error("failed to uninstall extension [{id}]: {source}")]
    Uninstall {
        id: String,
        #[source]
        source: Box<Error>,
    },

    /// Persisting the artifact or descriptor of a new extension failed.
    #[error("failed to store extension [{id}]: {source}")]
    Store {
        id: String,
        #[source]
        source: Box<Error>,
    },

    /// Storage backend failure not tied to a file.
    #[error("storage error: {0}")]
    Storage(String),

    /// Descriptor content could not be interpreted.
    #[error("invalid extension descriptor at {path}: {reason}")]
    Descriptor { path: PathBuf, reason: String },

    /// Invalid version constraint string.
    #[error("invalid version constraint '{constraint}': {reason}")]
    VersionConstraintParse { constraint: String, reason: String },

    /// Invalid `id:version` string.
    #[error("invalid extension id '{value}': {reason}")]
    InvalidExtensionId { value: String, reason: String },

    /// Filesystem error from extman-fs
    #[error(transparent)]
    Fs(#[from] extman_fs::Error),
}

impl Error {
    pub(crate) fn not_installed(id: &str, namespace: Option<&str>) -> Self {
        Self::NotInstalled {
            id: id.to_string(),
            namespace: namespace_label(namespace),
        }
    }

    /// Whether this error (or the error it wraps) came from persistence.
    pub fn is_persistence_failure(&self) -> bool {
        matches!(
            self,
            Self::Install { .. }
                | Self::Uninstall { .. }
                | Self::Store { .. }
                | Self::Storage(_)
                | Self::Fs(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
