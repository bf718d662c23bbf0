//! FMDB store
//!
//! The in-memory model database: every entity of a mechanism model, the
//! per-kind rings that order them, the sub-assembly scope tree, and the
//! operations that keep identities and references consistent.
//!
//! # Core Concepts
//!
//! - **Database**: Explicit context owning all entities; no global state
//! - **Entity**: Handle, baseID and userID plus kind-specific field data
//! - **Ring**: Per-kind, per-scope ordered membership with O(1) splicing
//! - **ScopeKey**: The root or the scope owned by a sub-assembly
//! - **Resolution**: Second pass turning reference triples into handles
//! - **Consistency**: Lazily computed payload checksums gating artifacts
//!
//! # Example
//!
//! ```rust
//! use fmdb_ref::EntityRef;
//! use fmdb_store::{Database, ScopeKey};
//! use fmdb_types::{RefTarget, TypeTag, UserId};
//!
//! let mut db = Database::new();
//!
//! // A triad may refer to a part that does not exist yet
//! let triad = db.create(TypeTag::Triad);
//! db.connect(triad, ScopeKey::Root, UserId::new(1)).unwrap();
//! db.get_mut(triad).unwrap().data.as_triad_mut().unwrap().owner_link =
//!     EntityRef::unresolved(RefTarget::root(TypeTag::Part, 2));
//!
//! let part = db.create(TypeTag::Part);
//! db.connect(part, ScopeKey::Root, UserId::new(2)).unwrap();
//!
//! let report = db.resolve_all();
//! assert!(report.is_clean());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod arena;
mod config;
mod consistency;
mod database;
mod diagnostics;
mod entity;
mod error;
mod hooks;
pub mod kinds;
mod resolve;
mod ring;
mod scope;
mod solver;

pub use config::DbConfig;
pub use consistency::{ArtifactStatus, ConsistencyWarning};
pub use database::Database;
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticSink, Severity, TracingSink};
pub use entity::{BlockHeader, Entity, ScopeKey};
pub use error::{ConfigError, StoreError, StoreResult};
pub use hooks::{NoViewHooks, ViewHooks};
pub use kinds::{EntityData, FieldSet, FieldWriter};
pub use ring::{Ring, RingIter, RingMap};
pub use solver::SolverRecord;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the model database
    pub use crate::{
        Database, DbConfig, DiagnosticSink, Entity, EntityData, ScopeKey, StoreError,
        StoreResult, ViewHooks,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
