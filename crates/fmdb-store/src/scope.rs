//! Scope tree navigation, merging and subtree duplication

use crate::database::Database;
use crate::entity::ScopeKey;
use crate::error::{StoreError, StoreResult};
use crate::ring::Ring;
use fmdb_ref::PathRemap;
use fmdb_types::{Handle, ScopePath, TypeTag, UserId};

impl Database {
    /// Own path of a scope, top-down from the root
    #[must_use]
    pub fn scope_path(&self, scope: ScopeKey) -> ScopePath {
        let mut ids = Vec::new();
        let mut scope = scope;
        while let ScopeKey::Assembly(owner) = scope {
            let Some(entity) = self.arena.get(owner) else {
                break;
            };
            ids.push(entity.user_id);
            scope = entity.scope;
        }
        ids.reverse();
        ScopePath::new(ids)
    }

    /// Existing scope at `path`
    #[must_use]
    pub fn scope_at(&self, path: &ScopePath) -> Option<ScopeKey> {
        path.iter().try_fold(ScopeKey::Root, |scope, id| {
            self.ring(scope, TypeTag::SubAssembly)
                .get(id)
                .map(ScopeKey::Assembly)
        })
    }

    /// Scope at `path`, creating and connecting missing sub-assemblies
    ///
    /// # Errors
    /// Propagates connect failures
    pub fn resolve_scope(&mut self, path: &ScopePath) -> StoreResult<ScopeKey> {
        let mut scope = ScopeKey::Root;
        for id in path.iter() {
            scope = match self.ring(scope, TypeTag::SubAssembly).get(id) {
                Some(owner) => ScopeKey::Assembly(owner),
                None => {
                    let owner = self.create(TypeTag::SubAssembly);
                    self.connect(owner, scope, id)?;
                    tracing::trace!(%id, "created intermediate sub-assembly");
                    ScopeKey::Assembly(owner)
                }
            };
        }
        Ok(scope)
    }

    /// Scope owned by a sub-assembly entity
    ///
    /// # Errors
    /// Returns error if `owner` is not a live sub-assembly
    pub fn scope_of(&self, owner: Handle) -> StoreResult<ScopeKey> {
        let entity = self.get(owner)?;
        if entity.tag().is_scope() {
            Ok(ScopeKey::Assembly(owner))
        } else {
            Err(StoreError::NotAScope(owner))
        }
    }

    /// Whether `scope` lies at or below the scope owned by `owner`
    pub(crate) fn is_in_subtree(&self, scope: ScopeKey, owner: Handle) -> bool {
        let mut scope = scope;
        while let ScopeKey::Assembly(a) = scope {
            if a == owner {
                return true;
            }
            match self.arena.get(a) {
                Some(entity) => scope = entity.scope,
                None => return false,
            }
        }
        false
    }

    /// `scope` and every nested scope, depth-first pre-order
    #[must_use]
    pub fn subtree(&self, scope: ScopeKey) -> Vec<ScopeKey> {
        let mut out = vec![scope];
        for owner in self.ring(scope, TypeTag::SubAssembly).iter() {
            out.extend(self.subtree(ScopeKey::Assembly(owner)));
        }
        out
    }

    /// Every entity in a subtree, scope by scope, rank then ring order
    #[must_use]
    pub fn subtree_members(&self, scope: ScopeKey) -> Vec<Handle> {
        self.subtree(scope)
            .into_iter()
            .flat_map(|s| self.members(s))
            .collect()
    }

    /// Fold a freshly parsed entity into an existing one of the same kind
    ///
    /// Description and field data move to `existing`; members of a parsed
    /// scope are moved over, keeping their IDs when free. The parsed
    /// entity is erased. Returns the surviving handle.
    ///
    /// # Errors
    /// Returns error if the kinds differ
    pub fn merge_into(&mut self, parsed: Handle, existing: Handle) -> StoreResult<Handle> {
        if parsed == existing {
            return Ok(existing);
        }
        let (tag, found) = (self.get(existing)?.tag(), self.get(parsed)?.tag());
        if tag != found {
            return Err(StoreError::wrong_kind(tag, found));
        }

        if tag.is_scope() {
            let target = ScopeKey::Assembly(existing);
            for member in self.members(ScopeKey::Assembly(parsed)) {
                let id = self.get(member)?.user_id;
                self.disconnect(member);
                let id = if self.ring(target, self.get(member)?.tag()).is_taken(id) {
                    UserId::UNSET
                } else {
                    id
                };
                self.connect(member, target, id)?;
            }
        }

        let source = self.get_mut(parsed)?;
        let description = std::mem::take(&mut source.description);
        let data = source.data.clone();
        let target = self.get_mut(existing)?;
        target.description = description;
        target.data = data;

        self.erase(parsed)?;
        tracing::trace!(into = %existing, "merged parsed entity");
        Ok(existing)
    }

    /// Rewrite the unresolved and cached references of one entity
    ///
    /// # Errors
    /// Returns error for a stale handle
    pub fn remap_refs(&mut self, handle: Handle, remap: &PathRemap) -> StoreResult<usize> {
        let mut changed = 0;
        self.get_mut(handle)?
            .data
            .fields_mut()
            .for_each_ref_mut(&mut |_, r| {
                if r.remap(remap) {
                    changed += 1;
                }
            });
        Ok(changed)
    }

    /// Deep-copy a sub-assembly next to itself
    ///
    /// The copy gets a fresh ID in the same parent scope. Child
    /// sub-assemblies are copied before other members; every reference
    /// into the copied subtree is rewritten to the copy, references
    /// leaving it are kept. The copy is resolved and initialized before
    /// returning.
    ///
    /// # Errors
    /// Returns error if `assembly` is not a connected sub-assembly
    pub fn duplicate_scope(&mut self, assembly: Handle) -> StoreResult<Handle> {
        let source = self.scope_of(assembly)?;
        let entity = self.get(assembly)?;
        if !entity.connected {
            return Err(StoreError::NotConnected(assembly));
        }
        let parent = entity.scope;
        let (description, data) = (entity.description.clone(), entity.data.clone());

        let copy = self.create_with(data);
        self.get_mut(copy)?.description = description;
        self.connect(copy, parent, UserId::UNSET)?;

        let remap = PathRemap::new(self.scope_path(source), self.scope_path(ScopeKey::Assembly(copy)));
        self.copy_members(source, ScopeKey::Assembly(copy), &remap)?;

        let report = self.resolve_references(ScopeKey::Assembly(copy));
        self.report_dangling(&report);
        self.init_after_resolve();
        tracing::debug!(
            from = %self.id_string(assembly, false),
            to = %self.id_string(copy, false),
            "duplicated sub-assembly"
        );
        Ok(copy)
    }

    fn copy_members(&mut self, from: ScopeKey, to: ScopeKey, remap: &PathRemap) -> StoreResult<()> {
        for child in self.ring(from, TypeTag::SubAssembly).iter().collect::<Vec<_>>() {
            let copy = self.copy_entity(child, to, remap)?;
            self.copy_members(ScopeKey::Assembly(child), ScopeKey::Assembly(copy), remap)?;
        }
        let others: Vec<Handle> = self
            .rings(from)
            .map(|rings| {
                rings
                    .iter()
                    .filter(|ring| !ring.tag().is_scope())
                    .flat_map(Ring::iter)
                    .collect()
            })
            .unwrap_or_default();
        for member in others {
            self.copy_entity(member, to, remap)?;
        }
        Ok(())
    }

    fn copy_entity(&mut self, source: Handle, to: ScopeKey, remap: &PathRemap) -> StoreResult<Handle> {
        let entity = self.get(source)?;
        let (id, description) = (entity.user_id, entity.description.clone());
        let mut data = entity.data.clone();
        let ids: &Self = self;
        data.fields_mut().for_each_ref_mut(&mut |_, r| {
            r.sync(ids);
            r.remap(remap);
        });

        let copy = self.create_with(data);
        self.get_mut(copy)?.description = description;
        self.connect(copy, to, id)?;
        Ok(copy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmdb_ref::EntityRef;
    use fmdb_types::RefTarget;

    #[test]
    fn resolve_scope_creates_intermediate_assemblies() {
        let mut db = Database::new();
        let path = ScopePath::from_ids(&[2, 7]);
        assert!(db.scope_at(&path).is_none());

        let scope = db.resolve_scope(&path).unwrap();
        assert_eq!(db.scope_at(&path), Some(scope));
        assert_eq!(db.scope_path(scope), path);
        assert_eq!(db.count(TypeTag::SubAssembly), 2);

        assert_eq!(db.resolve_scope(&path).unwrap(), scope);
        assert_eq!(db.count(TypeTag::SubAssembly), 2);
    }

    #[test]
    fn scope_of_rejects_non_scopes() {
        let mut db = Database::new();
        let triad = db.create(TypeTag::Triad);
        assert!(matches!(db.scope_of(triad), Err(StoreError::NotAScope(_))));
    }

    #[test]
    fn connect_scope_into_itself_is_cyclic() {
        let mut db = Database::new();
        let outer = db.create(TypeTag::SubAssembly);
        db.connect(outer, ScopeKey::Root, UserId::new(1)).unwrap();
        let inner = db.create(TypeTag::SubAssembly);
        db.connect(inner, ScopeKey::Assembly(outer), UserId::new(1)).unwrap();

        db.disconnect(outer);
        assert!(matches!(
            db.connect(outer, ScopeKey::Assembly(inner), UserId::UNSET),
            Err(StoreError::CyclicScope(_))
        ));
    }

    #[test]
    fn subtree_is_depth_first() {
        let mut db = Database::new();
        let a = db.resolve_scope(&ScopePath::from_ids(&[1, 2])).unwrap();
        let b = db.resolve_scope(&ScopePath::from_ids(&[3])).unwrap();
        let top = db.scope_at(&ScopePath::from_ids(&[1])).unwrap();
        assert_eq!(db.subtree(ScopeKey::Root), vec![ScopeKey::Root, top, a, b]);
    }

    #[test]
    fn merge_into_moves_fields_and_members() {
        let mut db = Database::new();
        let existing = db.resolve_scope(&ScopePath::from_ids(&[4])).unwrap();
        let existing = existing.assembly().unwrap();

        let parsed = db.create(TypeTag::SubAssembly);
        db.get_mut(parsed).unwrap().description = "Wheel".into();
        let member = db.create(TypeTag::Triad);
        db.connect(member, ScopeKey::Assembly(parsed), UserId::new(9)).unwrap();

        let kept = db.merge_into(parsed, existing).unwrap();
        assert_eq!(kept, existing);
        assert!(!db.contains(parsed));
        assert_eq!(db.entity(existing).unwrap().description, "Wheel");
        assert_eq!(
            db.find(&RefTarget::new(TypeTag::Triad, UserId::new(9), ScopePath::from_ids(&[4]))),
            Some(member)
        );
    }

    #[test]
    fn duplicate_scope_rewrites_inner_references_only() {
        let mut db = Database::new();
        let outside = db.create(TypeTag::Part);
        db.connect(outside, ScopeKey::Root, UserId::new(1)).unwrap();

        let scope = db.resolve_scope(&ScopePath::from_ids(&[1])).unwrap();
        let part = db.create(TypeTag::Part);
        db.connect(part, scope, UserId::new(1)).unwrap();
        let inner = db.create(TypeTag::Triad);
        db.connect(inner, scope, UserId::new(1)).unwrap();
        let outer = db.create(TypeTag::Triad);
        db.connect(outer, scope, UserId::new(2)).unwrap();

        let inner_target = RefTarget::new(TypeTag::Part, UserId::new(1), ScopePath::from_ids(&[1]));
        db.get_mut(inner).unwrap().data.as_triad_mut().unwrap().owner_link =
            EntityRef::resolved(inner_target, part);
        db.get_mut(outer).unwrap().data.as_triad_mut().unwrap().owner_link =
            EntityRef::resolved(RefTarget::root(TypeTag::Part, 1), outside);

        let copy = db.duplicate_scope(scope.assembly().unwrap()).unwrap();
        assert_eq!(db.entity(copy).unwrap().user_id(), UserId::new(2));

        let copy_path = ScopePath::from_ids(&[2]);
        let copied_part = db
            .find(&RefTarget::new(TypeTag::Part, UserId::new(1), copy_path.clone()))
            .unwrap();
        let copied_inner = db
            .find(&RefTarget::new(TypeTag::Triad, UserId::new(1), copy_path.clone()))
            .unwrap();
        let copied_outer = db
            .find(&RefTarget::new(TypeTag::Triad, UserId::new(2), copy_path))
            .unwrap();

        let t = db.entity(copied_inner).unwrap().data.as_triad().unwrap();
        assert_eq!(t.owner_link.handle(), Some(copied_part));
        let t = db.entity(copied_outer).unwrap().data.as_triad().unwrap();
        assert_eq!(t.owner_link.handle(), Some(outside));
    }
}
