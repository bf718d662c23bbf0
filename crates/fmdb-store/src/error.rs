//! Error types for the model database
//!
//! Provides error handling for:
//! - Identity collisions on connect
//! - Stale or protected handles
//! - Scope lookups
//! - Configuration loading

use fmdb_types::{Handle, ScopePath, TypeTag, UserId};
use std::path::PathBuf;

/// Structural errors raised by database operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Preferred userID already taken in the target ring
    #[error("{tag} {id} already exists in scope {scope}")]
    DuplicateId {
        tag: TypeTag,
        id: UserId,
        scope: ScopePath,
    },

    /// Negative userIDs are reserved for process-wide singletons
    #[error("user id {0} is reserved")]
    ReservedId(UserId),

    /// A model-wide singleton of this kind is already connected
    #[error("a {0} already exists in this model")]
    SingletonExists(TypeTag),

    /// Handle no longer refers to a live entity
    #[error("stale entity handle {0}")]
    StaleHandle(Handle),

    /// Entity is already in a ring
    #[error("entity {0} is already connected")]
    AlreadyConnected(Handle),

    /// Entity is not in a ring
    #[error("entity {0} is not connected")]
    NotConnected(Handle),

    /// Ground part cannot be erased, renumbered or moved
    #[error("the ground part cannot be modified")]
    ProtectedEntity,

    /// Operation needs a sub-assembly
    #[error("{0} is not a sub-assembly")]
    NotAScope(Handle),

    /// Scope path names no existing sub-assembly
    #[error("no sub-assembly at {0}")]
    NoSuchScope(ScopePath),

    /// Operation needs a different kind of entity
    #[error("expected a {expected}, found a {found}")]
    WrongKind { expected: TypeTag, found: TypeTag },

    /// Moving a scope into its own subtree
    #[error("cannot move {0} into its own subtree")]
    CyclicScope(Handle),

    /// Payload could not be read back
    #[error("cannot read payload {path}: {source}")]
    Payload {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Create a wrong-kind error
    #[inline]
    pub fn wrong_kind(expected: TypeTag, found: TypeTag) -> Self {
        Self::WrongKind { expected, found }
    }

    /// Check if the error reports an identity collision
    #[inline]
    #[must_use]
    pub fn is_collision(&self) -> bool {
        matches!(self, Self::DuplicateId { .. } | Self::SingletonExists(_))
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Result type for database operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;
