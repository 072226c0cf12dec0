use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::db::StoreError;

/// Settings for the sled-backed node store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SledConfig {
    /// Database directory
    pub path: PathBuf,
    /// Tree holding the trie nodes
    pub tree: String,
    /// Delete the database when it is dropped
    pub temporary: bool,
    /// Page cache size in bytes
    pub cache_capacity: u64,
    /// Flush to disk after every applied batch
    pub flush_on_batch: bool,
}

impl Default for SledConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("db"),
            tree: "mpt".to_string(),
            temporary: false,
            cache_capacity: 1024 * 1024 * 1024, // 1GB, sled's default
            flush_on_batch: false,
        }
    }
}

impl SledConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, StoreError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let config_str = fs::read_to_string(path)?;
        Self::from_toml_str(&config_str)
    }
}
