//! Runtime configuration.
//!
//! ```toml
//! [staging]
//! max_bytes = 5242880
//! allowed_mime_types = ["image/jpeg", "image/png", "image/gif", "image/webp"]
//! folder = "blog"
//!
//! [images]
//! root = "uploads"
//! base_url = "/uploads"
//!
//! [database]
//! path = "blockpress.db"
//! ```
//!
//! Every section and field is optional; missing values take the defaults above.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use blockpress_types::ErrorKind;

/// 5 MiB.
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Read { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ErrorKind::NotFound
            }
            ConfigError::Read { .. } => ErrorKind::Storage,
            ConfigError::Parse { .. } | ConfigError::Invalid(_) => ErrorKind::Validation,
        }
    }
}

/// Limits applied when an image is staged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    pub max_bytes: usize,
    pub allowed_mime_types: Vec<String>,
    /// Folder passed to the image store on upload.
    pub folder: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
            allowed_mime_types: ["image/jpeg", "image/png", "image/gif", "image/webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            folder: "blog".to_string(),
        }
    }
}

impl StagingConfig {
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    /// Check if a MIME type is on the allow list (case-insensitive).
    pub fn allows(&self, mime: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime))
    }
}

/// Local permanent image storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Directory files are written under.
    pub root: PathBuf,
    /// Public URL prefix that maps onto `root`.
    pub base_url: String,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("uploads"),
            base_url: "/uploads".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("blockpress.db"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockpressConfig {
    pub staging: StagingConfig,
    pub images: ImagesConfig,
    pub database: DatabaseConfig,
}

impl BlockpressConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse from a TOML string (no file).
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(text).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.staging.max_bytes == 0 {
            return Err(ConfigError::Invalid("staging.max_bytes must be > 0".into()));
        }
        if self.staging.allowed_mime_types.is_empty() {
            return Err(ConfigError::Invalid(
                "staging.allowed_mime_types must not be empty".into(),
            ));
        }
        if self.staging.folder.is_empty()
            || self.staging.folder.contains("..")
            || self.staging.folder.starts_with('/')
        {
            return Err(ConfigError::Invalid(format!(
                "staging.folder '{}' must be a relative folder name",
                self.staging.folder
            )));
        }
        Ok(())
    }
}
