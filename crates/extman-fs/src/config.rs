//! Format-agnostic loading and saving of serde documents

use crate::{Error, NormalizedPath, Result, io};
use serde::{Serialize, de::DeserializeOwned};

/// Document formats understood by [`ConfigStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
    Yaml,
}

impl Format {
    /// Detect the format from a path's file extension.
    pub fn from_path(path: &NormalizedPath) -> Result<Self> {
        let extension = path.extension().unwrap_or("");
        match extension.to_lowercase().as_str() {
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => Err(Error::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
            Self::Yaml => "YAML",
        }
    }
}

/// Loads and saves manager configuration and extension descriptors.
///
/// The format is picked from the file extension; saves go through
/// [`io::write_atomic`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigStore;

impl ConfigStore {
    pub fn new() -> Self {
        Self
    }

    /// Load a document from a file.
    ///
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    /// - `.yaml`, `.yml` -> YAML
    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        let format = Format::from_path(path)?;
        let content = io::read_text(path)?;
        self.parse(path, format, &content)
    }

    /// Parse already-read content as `format`; `path` is used for errors only.
    pub fn parse<T: DeserializeOwned>(
        &self,
        path: &NormalizedPath,
        format: Format,
        content: &str,
    ) -> Result<T> {
        let parse_error = |message: String| Error::ConfigParse {
            path: path.to_native(),
            format: format.name().into(),
            message,
        };

        match format {
            Format::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string())),
            Format::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string())),
            Format::Yaml => serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string())),
        }
    }

    /// Save a document to a file atomically.
    pub fn save<T: Serialize>(&self, path: &NormalizedPath, value: &T) -> Result<()> {
        let format = Format::from_path(path)?;
        let content = self.render(path, format, value)?;
        io::write_atomic(path, content.as_bytes())
    }

    /// Serialize `value` as `format`; `path` is used for errors only.
    pub fn render<T: Serialize>(
        &self,
        path: &NormalizedPath,
        format: Format,
        value: &T,
    ) -> Result<String> {
        let serialize_error = |message: String| Error::ConfigSerialize {
            path: path.to_native(),
            format: format.name().into(),
            message,
        };

        match format {
            Format::Toml => {
                toml::to_string_pretty(value).map_err(|e| serialize_error(e.to_string()))
            }
            Format::Json => {
                serde_json::to_string_pretty(value).map_err(|e| serialize_error(e.to_string()))
            }
            Format::Yaml => serde_yaml::to_string(value).map_err(|e| serialize_error(e.to_string())),
        }
    }
}
