//! Scope paths for addressing nested sub-assemblies
//!
//! Provides [`ScopePath`], the ordered list of sub-assembly user IDs from
//! the model root down to the scope that owns an entity.

use crate::ids::UserId;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path from the root scope down to a nested sub-assembly
///
/// # Examples
/// - `[]` → the root scope
/// - `[1 3]` → sub-assembly 3 inside sub-assembly 1
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScopePath(SmallVec<[UserId; 4]>);

impl ScopePath {
    /// Path of the root scope
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(SmallVec::new())
    }

    /// Create path from top-down scope IDs
    #[inline]
    #[must_use]
    pub fn new(ids: impl IntoIterator<Item = UserId>) -> Self {
        Self(ids.into_iter().collect())
    }

    /// Create path from raw integers (test and parser convenience)
    #[must_use]
    pub fn from_ids(ids: &[i32]) -> Self {
        Self(ids.iter().copied().map(UserId::new).collect())
    }

    /// Scope IDs, root first
    #[inline]
    #[must_use]
    pub fn ids(&self) -> &[UserId] {
        &self.0
    }

    /// Nesting depth (0 for root)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if this is the root scope
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Same as [`ScopePath::is_root`]
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of the enclosing scope (if not root)
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].iter().copied().collect()))
        }
    }

    /// Innermost scope ID (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<UserId> {
        self.0.last().copied()
    }

    /// Append a nested scope, returning new path
    #[must_use]
    pub fn child(&self, id: UserId) -> Self {
        let mut new = self.clone();
        new.0.push(id);
        new
    }

    /// Check if this path is a prefix of another
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.0.len() <= other.0.len() && self.0[..] == other.0[..self.0.len()]
    }

    /// Check if this path is a strict prefix of another
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }

    /// Replace the leading `old` prefix with `new`
    ///
    /// Returns `None` when `old` is not a prefix of this path.
    #[must_use]
    pub fn rebase(&self, old: &Self, new: &Self) -> Option<Self> {
        if !old.is_prefix_of(self) {
            return None;
        }
        let mut ids: SmallVec<[UserId; 4]> = new.0.clone();
        ids.extend_from_slice(&self.0[old.0.len()..]);
        Some(Self(ids))
    }

    /// Iterator over scope IDs from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = UserId> + '_ {
        self.0.iter().copied()
    }
}

impl Display for ScopePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{id}")?;
        }
        f.write_str("]")
    }
}

impl FromStr for ScopePath {
    type Err = PathError;

    /// Accepts `[1 3]`, `[1,3]` or bare `1 3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim();
        let inner = match (inner.strip_prefix('['), inner.ends_with(']')) {
            (Some(rest), true) => &rest[..rest.len() - 1],
            (None, false) => inner,
            _ => return Err(PathError::Unbalanced(s.to_string())),
        };

        inner
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|seg| !seg.is_empty())
            .map(|seg| {
                seg.parse::<i32>()
                    .ok()
                    .filter(|id| *id > 0)
                    .map(UserId::new)
                    .ok_or_else(|| PathError::InvalidSegment(seg.to_string()))
            })
            .collect::<Result<SmallVec<_>, _>>()
            .map(Self)
    }
}

impl From<Vec<UserId>> for ScopePath {
    fn from(ids: Vec<UserId>) -> Self {
        Self(ids.into_iter().collect())
    }
}

/// Errors related to scope paths
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// Segment is not a positive integer
    #[error("invalid scope id: {0} (must be a positive integer)")]
    InvalidSegment(String),

    /// Brackets do not match
    #[error("unbalanced brackets in scope path: {0}")]
    Unbalanced(String),
}
