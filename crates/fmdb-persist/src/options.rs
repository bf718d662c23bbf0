//! Load and save options

use fmdb_store::{ConfigError, DbConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the fallback copy written when a save fails
pub const EMERGENCY_FILE_NAME: &str = "fedem_save.fmm";

/// How model files are read and written
///
/// # Example
/// ```
/// use fmdb_persist::FileOptions;
///
/// let options = FileOptions::from_toml_str(r#"
///     backup_suffix = ".old"
///     [database]
///     reuse_holes = true
/// "#).unwrap();
/// assert_eq!(options.backup_suffix, ".old");
/// assert!(options.database.is_some_and(|db| db.reuse_holes));
/// assert!(options.load_external);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOptions {
    /// Identity policy imposed on the database being loaded into; the
    /// database keeps its own when unset
    pub database: Option<DbConfig>,

    /// Directory receiving `fedem_save.fmm` when a save fails
    pub emergency_dir: PathBuf,

    /// Suffix of the copy kept of the previous file
    pub backup_suffix: String,

    /// Follow `MODEL_FILE` of sub-assemblies when loading
    pub load_external: bool,

    /// Write sub-assemblies with a `MODEL_FILE` to their own files
    pub write_external: bool,

    /// Entries kept by the derived-artifact cache
    pub artifact_cache_capacity: u64,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            database: None,
            emergency_dir: std::env::temp_dir(),
            backup_suffix: ".bak".to_string(),
            load_external: true,
            write_external: true,
            artifact_cache_capacity: 64,
        }
    }
}

impl FileOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_database(mut self, database: DbConfig) -> Self {
        self.database = Some(database);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_emergency_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.emergency_dir = dir.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = suffix.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn with_load_external(mut self, load: bool) -> Self {
        self.load_external = load;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_write_external(mut self, write: bool) -> Self {
        self.write_external = write;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_artifact_cache_capacity(mut self, capacity: u64) -> Self {
        self.artifact_cache_capacity = capacity;
        self
    }

    /// Fallback file path for failed saves
    #[must_use]
    pub fn emergency_file(&self) -> PathBuf {
        self.emergency_dir.join(EMERGENCY_FILE_NAME)
    }

    /// `<path><backup_suffix>`
    #[must_use]
    pub fn backup_path(&self, path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(&self.backup_suffix);
        PathBuf::from(name)
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
