//! Database configuration

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Identity policy of a [`crate::Database`]
///
/// # Example
/// ```
/// use fmdb_store::DbConfig;
///
/// let config: DbConfig = toml::from_str("reuse_holes = true").unwrap();
/// assert!(config.reuse_holes);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Assign the smallest free userID instead of max + 1
    pub reuse_holes: bool,

    /// First baseID handed out by a fresh database
    pub first_base_id: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            reuse_holes: false,
            first_base_id: 1,
        }
    }
}

impl DbConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_reuse_holes(mut self, reuse: bool) -> Self {
        self.reuse_holes = reuse;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_first_base_id(mut self, first: u64) -> Self {
        self.first_base_id = first.max(1);
        self
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// Returns error for malformed TOML
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}
