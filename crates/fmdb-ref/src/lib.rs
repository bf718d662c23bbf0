//! FMDB references
//!
//! Typed references between model entities, resolved in a second pass
//! after every entity of a file has been read.
//!
//! # Overview
//!
//! - **EntityRef**: `(type, userID, scope path)` triple plus cached handle
//! - **PathRemap**: Rewrites references when a subtree is copied or grafted
//! - **ResolveReport**: Dangling references collected during a sweep
//!
//! # Example
//!
//! ```rust
//! use fmdb_ref::{EntityRef, RefLookup, Resolution};
//! use fmdb_types::{Handle, RefTarget, TypeTag};
//!
//! struct OnlyTriadOne;
//!
//! impl RefLookup for OnlyTriadOne {
//!     fn lookup(&self, target: &RefTarget) -> Option<Handle> {
//!         (target == &RefTarget::root(TypeTag::Triad, 1)).then(|| Handle::from_raw(0, 1))
//!     }
//! }
//!
//! let mut forward = EntityRef::unresolved(RefTarget::root(TypeTag::Triad, 1));
//! assert_eq!(forward.resolve(&OnlyTriadOne), Resolution::Resolved);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod reference;
mod remap;
mod report;

pub use reference::{EntityRef, RefError, RefIdentity, RefList, RefLookup, RefState, Resolution};
pub use remap::PathRemap;
pub use report::{DanglingRef, ResolveReport};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for reference handling
    pub use crate::{
        EntityRef, PathRemap, RefIdentity, RefList, RefLookup, RefState, Resolution,
        ResolveReport,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
