//! FMDB persistence
//!
//! Reads and writes the text model file: a versioned header, `!` metadata
//! lines, one `KEYWORD { field = value; }` block per entity and an end
//! marker. Older files are migrated while they are read; files newer than
//! this library are refused before anything changes.
//!
//! # Core Concepts
//!
//! - **ModelFile**: Load into or save from a [`fmdb_store::Database`]
//! - **LoadReport**: Unknown keywords, structural repairs and migrations
//! - **graft**: Import a file as a new sub-assembly of an open model
//! - **ArtifactCache**: Reduced FE data shared between equal checksums
//!
//! # Example
//!
//! ```rust
//! use fmdb_persist::{read_str, write_string};
//! use fmdb_store::Database;
//! use fmdb_types::TypeTag;
//!
//! let text = "FEDEMMODELFILE {R7.2 ASCII}
//! TRIAD
//! {
//!   ID = 1;
//!   OWNER_LINK = FcLINK 2;
//! }
//! LINK
//! {
//!   ID = 2;
//! }
//! END {FEDEMMODELFILE}
//! ";
//!
//! let mut db = Database::new();
//! let report = read_str(&mut db, text).unwrap();
//! assert!(report.resolve.is_clean());
//! assert_eq!(db.count(TypeTag::Triad), 1);
//! assert!(write_string(&db).contains("OWNER_LINK = FcLINK 2;"));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cache;
mod error;
mod graft;
pub mod lexer;
pub mod migrate;
mod model_file;
mod options;
mod reader;
mod report;
mod writer;

pub use cache::{prepare_artifacts, ArtifactCache, ArtifactSummary, CacheStats};
pub use error::{
    ArtifactError, FormatError, LoadError, LoadResult, SaveError, SaveResult, VersionError,
};
pub use graft::graft;
pub use lexer::{header_line, read_header, Metadata};
pub use model_file::{read_str, write_string, ModelFile};
pub use options::{FileOptions, EMERGENCY_FILE_NAME};
pub use report::{LoadReport, Progress, SaveReport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for loading and saving models
    pub use crate::{
        graft, read_str, write_string, FileOptions, LoadError, LoadReport, ModelFile,
        SaveError, SaveReport,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
