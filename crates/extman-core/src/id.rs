//! Extension identity.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::version::Version;

/// Immutable `(bare id, version)` pair identifying one extension copy.
///
/// Ordering is by bare id, then version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExtensionId {
    id: String,
    version: Version,
}

impl ExtensionId {
    pub fn new(id: impl Into<String>, version: impl Into<Version>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
        }
    }

    /// The bare id, without version.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Parse `"id:version"`. The last `:` separates the version so ids such
    /// as `org.xwiki.platform:xwiki-platform-oldcore:4.1` keep their groups.
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidExtensionId {
            value: value.to_string(),
            reason: reason.to_string(),
        };

        let (id, version) = value
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected 'id:version'"))?;
        let (id, version) = (id.trim(), version.trim());
        if id.is_empty() {
            return Err(invalid("empty id"));
        }
        if version.is_empty() {
            return Err(invalid("empty version"));
        }
        Ok(Self::new(id, version))
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.id, self.version)
    }
}

impl FromStr for ExtensionId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
