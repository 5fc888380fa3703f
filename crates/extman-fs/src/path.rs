//! Normalized paths inside the local extension repository

use std::path::{Path, PathBuf};

/// A path normalized to use forward slashes internally.
///
/// Descriptor and artifact locations are computed with this type so the
/// repository layout is identical on every platform; conversion to a native
/// `PathBuf` happens only at I/O boundaries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NormalizedPath {
    inner: String,
}

impl NormalizedPath {
    /// Create a new NormalizedPath from any path-like input.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().to_string_lossy();
        Self {
            inner: path_str.replace('\\', "/"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Convert to a platform-native PathBuf for I/O operations.
    pub fn to_native(&self) -> PathBuf {
        PathBuf::from(&self.inner)
    }

    /// Join this path with a segment.
    ///
    /// The segment is appended verbatim; callers building paths from
    /// extension identifiers should pass them through [`encode_segment`].
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.replace('\\', "/");
        let segment = segment.trim_start_matches('/');
        if self.inner.is_empty() {
            return Self {
                inner: segment.to_string(),
            };
        }
        let inner = if self.inner.ends_with('/') {
            format!("{}{}", self.inner, segment)
        } else {
            format!("{}/{}", self.inner, segment)
        };
        Self { inner }
    }

    /// Get the parent directory.
    pub fn parent(&self) -> Option<Self> {
        let trimmed = self.inner.trim_end_matches('/');
        match trimmed.rfind('/') {
            Some(0) => Some(Self {
                inner: "/".to_string(),
            }),
            Some(idx) => Some(Self {
                inner: trimmed[..idx].to_string(),
            }),
            None => None,
        }
    }

    /// Get the file name component.
    pub fn file_name(&self) -> Option<&str> {
        let trimmed = self.inner.trim_end_matches('/');
        trimmed.rsplit('/').next().filter(|name| !name.is_empty())
    }

    /// Get the extension if present (a leading dot does not count).
    pub fn extension(&self) -> Option<&str> {
        self.file_name().and_then(|name| {
            let idx = name.rfind('.')?;
            if idx == 0 { None } else { Some(&name[idx + 1..]) }
        })
    }

    pub fn exists(&self) -> bool {
        self.to_native().exists()
    }

    pub fn is_dir(&self) -> bool {
        self.to_native().is_dir()
    }

    pub fn is_file(&self) -> bool {
        self.to_native().is_file()
    }
}

/// Encode an extension identifier or version so it can be used as a single
/// path segment.
///
/// Alphanumerics and `.`, `-`, `_` pass through; every other byte becomes
/// `%XX`. A segment made only of dots is encoded entirely so it can never
/// address a parent directory.
pub fn encode_segment(raw: &str) -> String {
    if !raw.is_empty() && raw.chars().all(|c| c == '.') {
        return raw.bytes().map(|b| format!("%{b:02X}")).collect();
    }

    let mut encoded = String::with_capacity(raw.len());
    for byte in raw.bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'.' | b'-' | b'_' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

impl AsRef<Path> for NormalizedPath {
    fn as_ref(&self) -> &Path {
        Path::new(&self.inner)
    }
}

impl std::fmt::Display for NormalizedPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.inner)
    }
}

impl From<&str> for NormalizedPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for NormalizedPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<PathBuf> for NormalizedPath {
    fn from(p: PathBuf) -> Self {
        Self::new(p)
    }
}

impl From<&Path> for NormalizedPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_keeps_plain_identifiers() {
        assert_eq!(encode_segment("xwiki-commons_1.0"), "xwiki-commons_1.0");
    }

    #[test]
    fn encode_escapes_separators() {
        assert_eq!(
            encode_segment("org.xwiki:platform/api"),
            "org.xwiki%3Aplatform%2Fapi"
        );
    }

    #[test]
    fn encode_escapes_dot_only_segments() {
        assert_eq!(encode_segment(".."), "%2E%2E");
        assert_eq!(encode_segment("."), "%2E");
    }

    #[test]
    fn join_onto_empty_path() {
        let path = NormalizedPath::new("").join("descriptor.toml");
        assert_eq!(path.as_str(), "descriptor.toml");
    }
}
