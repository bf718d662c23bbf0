//! Error types for model-file persistence
//!
//! Provides error handling for:
//! - Header version checks (before any block is read)
//! - Malformed blocks (abort the load, the database is restored)
//! - Load and save I/O, including the emergency save

use fmdb_store::StoreError;
use fmdb_types::{FormatVersion, VersionParseError};
use std::path::PathBuf;

/// File header is missing, unreadable or too new
#[derive(Debug, thiserror::Error)]
pub enum VersionError {
    /// Written by a newer release than this library understands
    #[error("model file format {found} is newer than {current}")]
    TooNew {
        found: FormatVersion,
        current: FormatVersion,
    },

    /// No `FEDEMMODELFILE {...}` header line
    #[error("not a model file: missing FEDEMMODELFILE header")]
    MissingHeader,

    /// Header present but the version cannot be parsed
    #[error(transparent)]
    Unreadable(#[from] VersionParseError),
}

/// Syntax errors inside the block stream
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    /// Block keyword not followed by `{`
    #[error("line {line}: expected '{{' after {keyword}")]
    MissingOpenBrace { line: usize, keyword: String },

    /// File ended inside a block
    #[error("line {line}: {keyword} block is not terminated")]
    UnterminatedBlock { line: usize, keyword: String },

    /// Statement without `=` or `;`
    #[error("line {line}: malformed statement in {keyword} block: {text}")]
    MalformedStatement {
        line: usize,
        keyword: String,
        text: String,
    },

    /// Statement value does not fit its field
    #[error("line {line}: {block}.{field}: {message}")]
    BadValue {
        line: usize,
        block: String,
        field: String,
        message: String,
    },
}

impl FormatError {
    /// Create a bad-value error from any displayable cause
    pub fn bad_value(
        line: usize,
        block: impl Into<String>,
        field: impl Into<String>,
        cause: &impl std::fmt::Display,
    ) -> Self {
        Self::BadValue {
            line,
            block: block.into(),
            field: field.into(),
            message: cause.to_string(),
        }
    }

    /// Line the error was found on
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::MissingOpenBrace { line, .. }
            | Self::UnterminatedBlock { line, .. }
            | Self::MalformedStatement { line, .. }
            | Self::BadValue { line, .. } => *line,
        }
    }
}

/// Errors while loading a model or grafting a file into one
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Version {
        path: PathBuf,
        #[source]
        source: VersionError,
    },

    #[error("{path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: FormatError,
    },

    /// Progress callback asked to stop before resolution
    #[error("loading of {0} was cancelled")]
    Cancelled(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LoadError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors while writing a model
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    /// Write failed; `emergency` names the fallback copy if one was made
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        emergency: Option<PathBuf>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SaveError {
    /// Fallback copy written after the failure, if any
    #[must_use]
    pub fn emergency_file(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { emergency, .. } => emergency.as_ref(),
            Self::Store(_) => None,
        }
    }
}

/// Errors while bringing derived artifacts up to date
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// Payload not resident and not reloadable
    #[error("{part}: no FE data available to derive the artifact from")]
    MissingPayload { part: String },

    /// The reducer failed for a part
    #[error("{part}: reduction failed: {source}")]
    Reduce {
        part: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for loading
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Result type for saving
pub type SaveResult<T> = std::result::Result<T, SaveError>;
