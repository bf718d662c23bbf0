//! EntityRef - lazily resolved typed references
//!
//! Provides [`EntityRef`], the reference field stored inside entities. A
//! reference keeps the textual `(type, userID, scope path)` triple it was
//! read with and, once resolved, a generation-checked [`Handle`] to the
//! target.

use crate::remap::PathRemap;
use fmdb_types::{FieldError, FieldValue, Handle, RefTarget, TypeTag};
use serde::Serialize;

/// Resolution state of a reference field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RefState {
    /// No target at all
    Unset,
    /// Target triple known, handle not looked up yet (or lookup failed)
    Unresolved,
    /// Handle cached
    Resolved,
}

/// Looks up the entity a textual reference names
pub trait RefLookup {
    /// Handle of the live entity matching `target`, if any
    fn lookup(&self, target: &RefTarget) -> Option<Handle>;
}

/// Reports the current identity of a live entity
pub trait RefIdentity {
    /// Current `(type, userID, scope path)` of `handle`, or `None` if erased
    fn identity(&self, handle: Handle) -> Option<RefTarget>;
}

/// Outcome of [`EntityRef::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Nothing to resolve
    Unset,
    /// Handle was already cached
    AlreadyResolved,
    /// Lookup succeeded
    Resolved,
    /// Lookup failed; the reference stays unresolved
    Dangling,
}

/// Reference field of an entity
///
/// Many references may point at one entity, and references may form
/// cycles: nothing here owns the target.
///
/// # Example
/// ```
/// use fmdb_ref::{EntityRef, RefState};
/// use fmdb_types::{Handle, RefTarget, TypeTag};
///
/// let mut r = EntityRef::unresolved(RefTarget::root(TypeTag::Triad, 3));
/// assert_eq!(r.state(), RefState::Unresolved);
///
/// r.resolve_to(Handle::from_raw(0, 1));
/// assert_eq!(r.state(), RefState::Resolved);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRef {
    target: Option<RefTarget>,
    handle: Option<Handle>,
}

impl EntityRef {
    /// Unset reference
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            target: None,
            handle: None,
        }
    }

    /// Reference read from file, not yet resolved
    #[inline]
    #[must_use]
    pub fn unresolved(target: RefTarget) -> Self {
        Self {
            target: Some(target),
            handle: None,
        }
    }

    /// Reference bound directly to a live entity
    #[inline]
    #[must_use]
    pub fn resolved(target: RefTarget, handle: Handle) -> Self {
        Self {
            target: Some(target),
            handle: Some(handle),
        }
    }

    /// Build from a statement value, checking the target kind
    ///
    /// `accepts` lists the kinds this field may point at; an empty slice
    /// accepts any kind.
    ///
    /// # Errors
    /// Returns error for non-reference values or a disallowed target kind
    pub fn from_value(value: &FieldValue, accepts: &[TypeTag]) -> Result<Self, RefError> {
        match value.as_reference()? {
            None => Ok(Self::new()),
            Some(target) => {
                check_kind(&target, accepts)?;
                Ok(Self::unresolved(target))
            }
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> RefState {
        match (&self.target, self.handle) {
            (None, _) => RefState::Unset,
            (Some(_), None) => RefState::Unresolved,
            (Some(_), Some(_)) => RefState::Resolved,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.target.is_some()
    }

    /// Stored target triple, as last read or assigned
    #[inline]
    #[must_use]
    pub fn target(&self) -> Option<&RefTarget> {
        self.target.as_ref()
    }

    /// Cached handle (only when resolved)
    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<Handle> {
        self.handle
    }

    /// Check whether this reference is resolved to `handle`
    #[inline]
    #[must_use]
    pub fn points_to(&self, handle: Handle) -> bool {
        self.handle == Some(handle)
    }

    /// Replace the target triple and drop any cached handle
    pub fn set_target(&mut self, target: RefTarget) {
        self.target = Some(target);
        self.handle = None;
    }

    /// Cache a handle for the stored target
    ///
    /// A reference without a stored target stays unset.
    pub fn resolve_to(&mut self, handle: Handle) {
        if self.target.is_some() {
            self.handle = Some(handle);
        }
    }

    /// Return to [`RefState::Unset`]
    pub fn clear(&mut self) {
        self.target = None;
        self.handle = None;
    }

    /// Resolve against `lookup` unless a handle is already cached
    pub fn resolve(&mut self, lookup: &(impl RefLookup + ?Sized)) -> Resolution {
        let Some(target) = &self.target else {
            return Resolution::Unset;
        };
        if self.handle.is_some() {
            return Resolution::AlreadyResolved;
        }
        match lookup.lookup(target) {
            Some(handle) => {
                self.handle = Some(handle);
                Resolution::Resolved
            }
            None => Resolution::Dangling,
        }
    }

    /// Refresh the stored triple from the target's current identity
    ///
    /// Returns the triple to write. Resolved references always report the
    /// target as it is now, so renumbering never yields a stale file.
    pub fn sync(&mut self, ids: &(impl RefIdentity + ?Sized)) -> Option<&RefTarget> {
        if let Some(current) = self.handle.and_then(|h| ids.identity(h)) {
            self.target = Some(current);
        }
        self.target.as_ref()
    }

    /// Triple to write, without mutating the reference
    #[must_use]
    pub fn current_target(&self, ids: &(impl RefIdentity + ?Sized)) -> Option<RefTarget> {
        self.handle
            .and_then(|h| ids.identity(h))
            .or_else(|| self.target.clone())
    }

    /// Rewrite the stored path through `remap` and drop the handle
    ///
    /// Returns true if the target was inside the remapped subtree.
    pub fn remap(&mut self, remap: &PathRemap) -> bool {
        let Some(target) = &self.target else {
            return false;
        };
        match remap.apply(target) {
            Some(moved) => {
                self.target = Some(moved);
                self.handle = None;
                true
            }
            None => false,
        }
    }
}

fn check_kind(target: &RefTarget, accepts: &[TypeTag]) -> Result<(), RefError> {
    if accepts.is_empty() || accepts.contains(&target.tag) {
        Ok(())
    } else {
        Err(RefError::WrongKind {
            found: target.tag,
            accepts: accepts.to_vec(),
        })
    }
}

/// List-valued reference field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefList(Vec<EntityRef>);

impl RefList {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from a statement value, checking every target kind
    ///
    /// # Errors
    /// Returns error for non-reference values or a disallowed target kind
    pub fn from_value(value: &FieldValue, accepts: &[TypeTag]) -> Result<Self, RefError> {
        value
            .as_references()?
            .into_iter()
            .map(|target| {
                check_kind(&target, accepts)?;
                Ok(EntityRef::unresolved(target))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    #[inline]
    pub fn push(&mut self, r: EntityRef) {
        self.0.push(r);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &EntityRef> {
        self.0.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut EntityRef> {
        self.0.iter_mut()
    }

    /// Drop entries that became unset (after their target was erased)
    pub fn compact(&mut self) {
        self.0.retain(EntityRef::is_set);
    }

    /// Triples to write, skipping unset entries
    #[must_use]
    pub fn current_targets(&self, ids: &(impl RefIdentity + ?Sized)) -> Vec<RefTarget> {
        self.0.iter().filter_map(|r| r.current_target(ids)).collect()
    }
}

/// Errors building references from statement values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RefError {
    #[error(transparent)]
    Field(#[from] FieldError),

    #[error("reference to {found} not allowed here (expected one of {accepts:?})")]
    WrongKind { found: TypeTag, accepts: Vec<TypeTag> },
}
