//! FMDB core types
//!
//! Identity and value primitives shared by every layer of the mechanism
//! model database.
//!
//! # Core Concepts
//!
//! - [`TypeTag`]: Closed catalogue of entity kinds with ring presentation
//! - [`UserId`] / [`BaseId`] / [`Handle`]: The three entity identities
//! - [`ScopePath`]: Sub-assembly path from the model root
//! - [`Checksum`]: 32-byte Blake3 digest gating artifact re-derivation
//! - [`FieldValue`] / [`RefTarget`]: Statement values of the model file
//! - [`FormatVersion`]: Release number recorded in file headers
//!
//! # Example
//!
//! ```rust
//! use fmdb_types::{FieldValue, ScopePath, TypeTag};
//!
//! let value = FieldValue::parse("FcTRIAD 3 [1]").unwrap();
//! let target = value.as_reference().unwrap().unwrap();
//! assert_eq!(target.tag, TypeTag::Triad);
//! assert_eq!(target.path, ScopePath::from_ids(&[1]));
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod checksum;
mod ids;
mod scope_path;
mod type_tag;
mod value;
mod version;

pub use checksum::{Checksum, ChecksumError};
pub use ids::{BaseId, Handle, UserId};
pub use scope_path::{PathError, ScopePath};
pub use type_tag::{MetaGroup, TypeTag};
pub use value::{format_real, FieldError, FieldValue, RefTarget};
pub use version::{FormatVersion, VersionParseError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
