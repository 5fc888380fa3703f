//! Job requests.

use extman_core::ExtensionId;
use serde::{Deserialize, Serialize};

/// What a job should act on.
///
/// Without namespaces the job acts globally.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(default)]
    pub extensions: Vec<ExtensionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<Vec<String>>,
}

impl JobRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extension(mut self, id: ExtensionId) -> Self {
        self.extensions.push(id);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespaces
            .get_or_insert_with(Vec::new)
            .push(namespace.into());
        self
    }

    /// Namespaces to act on; `[None]` for a global request.
    pub fn scopes(&self) -> Vec<Option<&str>> {
        match &self.namespaces {
            Some(namespaces) => namespaces.iter().map(|ns| Some(ns.as_str())).collect(),
            None => vec![None],
        }
    }
}
