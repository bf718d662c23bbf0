//! Scope-path rewriting for duplicated and grafted subtrees
//!
//! A [`PathRemap`] moves every reference whose target lives in the `old`
//! subtree to the same place under `new`. References leaving the subtree
//! are untouched.

use fmdb_types::{RefTarget, ScopePath, TypeTag, UserId};

/// One-shot `old → new` scope-path rewrite
///
/// Paths are the *own* paths of scopes: the sub-assembly `[1 3]` is
/// sub-assembly 3 inside sub-assembly 1. A reference to the sub-assembly
/// itself is moved too, so `PARENT_ASSEMBLY` links follow the copy.
///
/// # Example
/// ```
/// use fmdb_ref::PathRemap;
/// use fmdb_types::{RefTarget, ScopePath, TypeTag, UserId};
///
/// let remap = PathRemap::new(ScopePath::from_ids(&[1]), ScopePath::from_ids(&[2]));
/// let inside = RefTarget::new(TypeTag::Triad, UserId::new(5), ScopePath::from_ids(&[1]));
/// let moved = remap.apply(&inside).unwrap();
/// assert_eq!(moved.path, ScopePath::from_ids(&[2]));
///
/// let outside = RefTarget::root(TypeTag::Triad, 5);
/// assert!(remap.apply(&outside).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRemap {
    old: ScopePath,
    new: ScopePath,
    excluded: Vec<TypeTag>,
}

impl PathRemap {
    #[inline]
    #[must_use]
    pub fn new(old: ScopePath, new: ScopePath) -> Self {
        Self {
            old,
            new,
            excluded: Vec::new(),
        }
    }

    /// Leave references to these kinds alone
    ///
    /// Used when grafting a whole model, whose singletons are not imported.
    #[must_use]
    pub fn excluding(mut self, tags: impl IntoIterator<Item = TypeTag>) -> Self {
        self.excluded.extend(tags);
        self
    }

    #[inline]
    #[must_use]
    pub fn old(&self) -> &ScopePath {
        &self.old
    }

    #[inline]
    #[must_use]
    pub fn new_path(&self) -> &ScopePath {
        &self.new
    }

    /// Rewritten target, or `None` if the target is outside the subtree
    #[must_use]
    pub fn apply(&self, target: &RefTarget) -> Option<RefTarget> {
        if target.id.is_singleton() || self.excluded.contains(&target.tag) {
            return None;
        }

        if target.tag.is_scope() {
            let own = target.path.child(target.id);
            let moved = own.rebase(&self.old, &self.new)?;
            let id = moved.last().unwrap_or(UserId::UNSET);
            let path = moved.parent().unwrap_or_default();
            return Some(RefTarget::new(target.tag, id, path));
        }

        let path = target.path.rebase(&self.old, &self.new)?;
        Some(RefTarget::new(target.tag, target.id, path))
    }

    /// Rewrite a bare scope path (used for `!Submodel` headers)
    #[must_use]
    pub fn apply_path(&self, path: &ScopePath) -> Option<ScopePath> {
        path.rebase(&self.old, &self.new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(tag: TypeTag, id: i32, path: &[i32]) -> RefTarget {
        RefTarget::new(tag, UserId::new(id), ScopePath::from_ids(path))
    }

    #[test]
    fn remap_moves_members_of_subtree() {
        let remap = PathRemap::new(ScopePath::from_ids(&[1, 3]), ScopePath::from_ids(&[1, 4]));

        let nested = target(TypeTag::Part, 2, &[1, 3, 7]);
        assert_eq!(remap.apply(&nested), Some(target(TypeTag::Part, 2, &[1, 4, 7])));

        let sibling = target(TypeTag::Part, 2, &[1]);
        assert_eq!(remap.apply(&sibling), None);
    }

    #[test]
    fn remap_moves_scope_itself() {
        let remap = PathRemap::new(ScopePath::from_ids(&[1, 3]), ScopePath::from_ids(&[1, 4]));
        let scope = target(TypeTag::SubAssembly, 3, &[1]);
        assert_eq!(remap.apply(&scope), Some(target(TypeTag::SubAssembly, 4, &[1])));

        let other_scope = target(TypeTag::SubAssembly, 2, &[1]);
        assert_eq!(remap.apply(&other_scope), None);
    }

    #[test]
    fn remap_from_root_grafts_everything_but_exclusions() {
        let remap = PathRemap::new(ScopePath::root(), ScopePath::from_ids(&[9]))
            .excluding([TypeTag::Mechanism, TypeTag::Analysis]);

        assert_eq!(
            remap.apply(&target(TypeTag::Triad, 1, &[])),
            Some(target(TypeTag::Triad, 1, &[9]))
        );
        assert_eq!(
            remap.apply(&target(TypeTag::SubAssembly, 2, &[])),
            Some(target(TypeTag::SubAssembly, 2, &[9]))
        );
        assert_eq!(remap.apply(&target(TypeTag::Mechanism, 1, &[])), None);
    }

    #[test]
    fn remap_never_touches_ground() {
        let remap = PathRemap::new(ScopePath::root(), ScopePath::from_ids(&[9]));
        assert_eq!(remap.apply(&target(TypeTag::Part, -1, &[])), None);
    }

    #[test]
    fn remap_bare_path() {
        let remap = PathRemap::new(ScopePath::from_ids(&[1, 3]), ScopePath::from_ids(&[5]));
        assert_eq!(
            remap.apply_path(&ScopePath::from_ids(&[1, 3])),
            Some(ScopePath::from_ids(&[5]))
        );
    }
}
