//! Entity identities
//!
//! Three identities exist for every entity:
//! - [`Handle`]: arena slot plus generation, valid only inside one database
//! - [`BaseId`]: model-wide, permanent, written to file
//! - [`UserId`]: unique within (type, scope), shown to the user

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// User-visible ID, unique per (concrete type, owning scope)
///
/// Zero means "not connected". Negative values are reserved for singletons
/// such as the ground part.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(i32);

impl UserId {
    /// Unassigned ID
    pub const UNSET: Self = Self(0);

    /// ID of the ground part
    pub const GROUND: Self = Self(-1);

    #[inline]
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Zero, i.e. not assigned yet
    #[inline]
    #[must_use]
    pub const fn is_unset(self) -> bool {
        self.0 == 0
    }

    /// Reserved for process-wide singletons
    #[inline]
    #[must_use]
    pub const fn is_singleton(self) -> bool {
        self.0 < 0
    }

    /// Next ID in sequence
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for UserId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// Permanent model-wide ID
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BaseId(u64);

impl BaseId {
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for BaseId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generation-checked arena handle
///
/// A handle whose slot has been released and reused no longer matches,
/// so stale handles are detected instead of aliasing a new entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    #[inline]
    #[must_use]
    pub const fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index in the arena
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// Slot generation at the time the handle was issued
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}
