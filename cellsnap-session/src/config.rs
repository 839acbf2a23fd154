//! Configuration parsing and management.

use crate::store::{AnyStore, FileStore, MemoryStore};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),
}

/// Session configuration, typically loaded from `cellsnap.yml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Key under which the serialized snapshot is stored
    #[serde(default = "default_storage_key")]
    pub storage_key: String,

    /// Remove the stored snapshot once it has been restored
    #[serde(default = "default_true")]
    pub remove_after_restore: bool,

    /// Pretty-print the stored JSON
    #[serde(default)]
    pub pretty: bool,

    /// Directory for a file-backed store; in-memory when absent
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,

    // Internal: path to config file (for relative path resolution)
    #[serde(skip)]
    pub(crate) config_path: Option<PathBuf>,
}

fn default_storage_key() -> String {
    String::from("cellsnap/session")
}

fn default_true() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            remove_after_restore: true,
            pretty: false,
            storage_dir: None,
            config_path: None,
        }
    }
}

impl SessionConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: SessionConfig = serde_yaml::from_str(&contents)?;

        // Store config file path for relative path resolution
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Get the storage directory, resolved relative to config file
    pub fn storage_dir(&self) -> Option<PathBuf> {
        self.storage_dir.as_ref().map(|p| self.resolve_path(p))
    }

    /// Open the store this configuration describes
    pub fn open_store(&self) -> AnyStore {
        match self.storage_dir() {
            Some(dir) => AnyStore::File(FileStore::new(dir)),
            None => AnyStore::Memory(MemoryStore::new()),
        }
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else if let Some(config_path) = &self.config_path {
            if let Some(parent) = config_path.parent() {
                parent.join(path)
            } else {
                path.to_path_buf()
            }
        } else {
            path.to_path_buf()
        }
    }
}
