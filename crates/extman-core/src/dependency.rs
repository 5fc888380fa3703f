//! Declared extension dependencies.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::version::{Version, VersionConstraint};

/// A dependency on another extension (or on a feature it provides).
///
/// The target is a bare id; the optional constraint restricts which known
/// versions may satisfy it. Without a constraint any version does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionDependency {
    id: String,
    #[serde(
        default,
        rename = "version",
        skip_serializing_if = "Option::is_none"
    )]
    constraint: Option<VersionConstraint>,
}

impl ExtensionDependency {
    /// Depend on any version of `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            constraint: None,
        }
    }

    /// Depend on versions of `id` matching `constraint` (e.g. `>=1.0,<2.0`).
    pub fn with_constraint(id: impl Into<String>, constraint: &str) -> Result<Self> {
        Ok(Self {
            id: id.into(),
            constraint: Some(VersionConstraint::parse(constraint)?),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn constraint(&self) -> Option<&VersionConstraint> {
        self.constraint.as_ref()
    }

    /// Whether `version` is acceptable for this dependency.
    pub fn accepts(&self, version: &Version) -> bool {
        self.constraint
            .as_ref()
            .is_none_or(|constraint| constraint.satisfies(version))
    }
}

impl fmt::Display for ExtensionDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(constraint) => write!(f, "{} ({})", self.id, constraint),
            None => f.write_str(&self.id),
        }
    }
}
