//! Database context
//!
//! [`Database`] owns every entity in a generational arena, one
//! [`RingMap`] per scope, and the model-wide baseID map. All mutation goes
//! through it; there is no global state.

use crate::arena::Arena;
use crate::config::DbConfig;
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::entity::{Entity, ScopeKey};
use crate::error::{StoreError, StoreResult};
use crate::hooks::{NoViewHooks, ViewHooks};
use crate::kinds::{EntityData, Part};
use crate::ring::{Ring, RingMap};
use fmdb_ref::{RefIdentity, RefLookup};
use fmdb_types::{BaseId, Handle, RefTarget, TypeTag, UserId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// In-memory model database
///
/// # Example
/// ```
/// use fmdb_store::{Database, ScopeKey};
/// use fmdb_types::{TypeTag, UserId};
///
/// let mut db = Database::new();
/// let triad = db.create(TypeTag::Triad);
/// let id = db.connect(triad, ScopeKey::Root, UserId::UNSET).unwrap();
/// assert_eq!(id, UserId::new(1));
/// assert_eq!(db.id_string(triad, false), "Triad [1]");
/// ```
#[derive(Clone)]
pub struct Database {
    config: DbConfig,
    pub(crate) arena: Arena<Entity>,
    pub(crate) scopes: HashMap<ScopeKey, RingMap>,
    base_ids: BTreeMap<BaseId, Handle>,
    next_base: BaseId,
    ground: Handle,
    sink: Arc<dyn DiagnosticSink>,
    pub(crate) hooks: Arc<dyn ViewHooks>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("config", &self.config)
            .field("entities", &self.arena.len())
            .field("scopes", &self.scopes.len())
            .field("next_base", &self.next_base)
            .finish_non_exhaustive()
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// Empty model with the ground part
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DbConfig::default())
    }

    #[must_use]
    pub fn with_config(config: DbConfig) -> Self {
        let mut arena = Arena::default();
        let mut ground = Entity::new(EntityData::Part(Part::default()), BaseId::new(0));
        ground.user_id = UserId::GROUND;
        ground.connected = true;
        ground.description = "Earth".to_string();
        let ground = arena.insert(ground);

        let mut scopes = HashMap::new();
        scopes.insert(ScopeKey::Root, RingMap::default());

        Self {
            next_base: BaseId::new(config.first_base_id.max(1)),
            config,
            arena,
            scopes,
            base_ids: BTreeMap::new(),
            ground,
            sink: Arc::new(TracingSink),
            hooks: Arc::new(NoViewHooks),
        }
    }

    /// Route diagnostics to `sink`
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Install visualization hooks
    #[must_use]
    pub fn with_hooks(mut self, hooks: Arc<dyn ViewHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    #[inline]
    pub fn set_config(&mut self, config: DbConfig) {
        self.config = config;
    }

    /// Diagnostics sink in use
    #[inline]
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn DiagnosticSink> {
        &self.sink
    }

    #[inline]
    pub(crate) fn report(&self, diagnostic: Diagnostic) {
        self.sink.report(diagnostic);
    }

    /// Drop every entity except the ground part
    pub fn clear(&mut self) {
        let fresh = Self::with_config(self.config.clone());
        self.arena = fresh.arena;
        self.scopes = fresh.scopes;
        self.base_ids = fresh.base_ids;
        self.next_base = fresh.next_base;
        self.ground = fresh.ground;
        tracing::debug!("model database cleared");
    }

    // --- entities -------------------------------------------------------

    /// Handle of the ground part (userID −1)
    #[inline]
    #[must_use]
    pub fn ground(&self) -> Handle {
        self.ground
    }

    #[inline]
    #[must_use]
    pub fn entity(&self, handle: Handle) -> Option<&Entity> {
        self.arena.get(handle)
    }

    #[inline]
    pub fn entity_mut(&mut self, handle: Handle) -> Option<&mut Entity> {
        self.arena.get_mut(handle)
    }

    /// Live entity or [`StoreError::StaleHandle`]
    ///
    /// # Errors
    /// Returns error if the handle was erased
    pub fn get(&self, handle: Handle) -> StoreResult<&Entity> {
        self.arena.get(handle).ok_or(StoreError::StaleHandle(handle))
    }

    /// Mutable live entity or [`StoreError::StaleHandle`]
    ///
    /// # Errors
    /// Returns error if the handle was erased
    pub fn get_mut(&mut self, handle: Handle) -> StoreResult<&mut Entity> {
        self.arena
            .get_mut(handle)
            .ok_or(StoreError::StaleHandle(handle))
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.arena.contains(handle)
    }

    /// Number of entities, not counting the ground part
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len() - 1
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every live handle except the ground part, in arena order
    #[must_use]
    pub fn handles(&self) -> Vec<Handle> {
        self.arena.handles().filter(|h| *h != self.ground).collect()
    }

    // --- baseIDs --------------------------------------------------------

    /// Next unused baseID
    #[must_use]
    pub fn free_base_id(&self) -> BaseId {
        let mut id = self.next_base;
        while self.base_ids.contains_key(&id) {
            id = id.next();
        }
        id
    }

    fn allocate_base_id(&mut self) -> BaseId {
        let id = self.free_base_id();
        self.next_base = id.next();
        id
    }

    /// Entity with the given baseID
    #[inline]
    #[must_use]
    pub fn by_base_id(&self, id: BaseId) -> Option<Handle> {
        self.base_ids.get(&id).copied()
    }

    /// Adopt a baseID read from file
    ///
    /// Returns false and keeps the current baseID if another entity
    /// already owns `id`.
    ///
    /// # Errors
    /// Returns error if the handle was erased
    pub fn set_base_id(&mut self, handle: Handle, id: BaseId) -> StoreResult<bool> {
        let current = self.get(handle)?.base_id;
        if current == id {
            return Ok(true);
        }
        if self.base_ids.get(&id).is_some_and(|h| *h != handle) {
            return Ok(false);
        }
        if self.base_ids.get(&current) == Some(&handle) {
            self.base_ids.remove(&current);
        }
        self.base_ids.insert(id, handle);
        self.get_mut(handle)?.base_id = id;
        if id >= self.next_base {
            self.next_base = id.next();
        }
        Ok(true)
    }

    // --- lifecycle ------------------------------------------------------

    /// Construct a detached entity of the given kind
    pub fn create(&mut self, tag: TypeTag) -> Handle {
        self.create_with(EntityData::new(tag))
    }

    /// Construct a detached entity from prepared data
    pub fn create_with(&mut self, data: EntityData) -> Handle {
        let base_id = self.allocate_base_id();
        let is_scope = data.tag().is_scope();
        let handle = self.arena.insert(Entity::new(data, base_id));
        self.base_ids.insert(base_id, handle);
        if is_scope {
            self.scopes.insert(ScopeKey::Assembly(handle), RingMap::default());
        }
        handle
    }

    /// Splice an entity into its ring in `scope`
    ///
    /// `preferred == 0` assigns the next free ID under the configured
    /// policy. A taken preferred ID is rejected and reported; the ring is
    /// left unchanged.
    ///
    /// # Errors
    /// - [`StoreError::DuplicateId`] if `preferred` is taken
    /// - [`StoreError::SingletonExists`] for a second model singleton
    /// - [`StoreError::AlreadyConnected`], [`StoreError::ReservedId`],
    ///   [`StoreError::NoSuchScope`], [`StoreError::CyclicScope`]
    pub fn connect(
        &mut self,
        handle: Handle,
        scope: ScopeKey,
        preferred: UserId,
    ) -> StoreResult<UserId> {
        if handle == self.ground {
            return Err(StoreError::ProtectedEntity);
        }
        let entity = self.get(handle)?;
        if entity.connected {
            return Err(StoreError::AlreadyConnected(handle));
        }
        if preferred.is_singleton() {
            return Err(StoreError::ReservedId(preferred));
        }
        let tag = entity.tag();
        let scope = if tag.is_model_singleton() {
            ScopeKey::Root
        } else {
            scope
        };
        if tag.is_scope() && self.is_in_subtree(scope, handle) {
            return Err(StoreError::CyclicScope(handle));
        }
        if !self.scopes.contains_key(&scope) {
            return Err(StoreError::NoSuchScope(self.scope_path(scope)));
        }

        let reuse = self.config.reuse_holes;
        let ring = self.ring(scope, tag);
        if tag.is_model_singleton() && !ring.is_empty() {
            return Err(StoreError::SingletonExists(tag));
        }
        let id = if preferred.is_unset() {
            ring.next_id(reuse)
        } else if ring.is_taken(preferred) {
            let existing = ring.get(preferred);
            let err = StoreError::DuplicateId {
                tag,
                id: preferred,
                scope: self.scope_path(scope),
            };
            let holder = existing.map_or_else(String::new, |h| self.id_string(h, true));
            self.report(Diagnostic::error(format!(
                "{err}; cannot connect, the ID is used by {holder}"
            )));
            return Err(err);
        } else {
            preferred
        };

        if let Some(rings) = self.scopes.get_mut(&scope) {
            rings.ring_mut(tag).insert_sorted(handle, id);
        }
        let entity = self.get_mut(handle)?;
        entity.user_id = id;
        entity.scope = scope;
        entity.connected = true;
        self.hooks.on_topology_changed(handle);
        tracing::trace!(entity = %handle, %id, "connected");
        Ok(id)
    }

    /// Remove an entity from its ring
    ///
    /// Keeps baseID, userID and outgoing references. Returns false if the
    /// entity was not connected.
    pub fn disconnect(&mut self, handle: Handle) -> bool {
        if handle == self.ground {
            return false;
        }
        let Some(entity) = self.arena.get(handle) else {
            return false;
        };
        if !entity.connected {
            return false;
        }
        let (scope, tag, id) = (entity.scope, entity.tag(), entity.user_id);
        if let Some(rings) = self.scopes.get_mut(&scope) {
            rings.ring_mut(tag).remove(handle, id);
        }
        if let Some(entity) = self.arena.get_mut(handle) {
            entity.connected = false;
        }
        self.hooks.on_topology_changed(handle);
        true
    }

    /// Disconnect and release an entity
    ///
    /// Every reference pointing at it becomes unset. Erasing a
    /// sub-assembly erases its whole subtree first.
    ///
    /// # Errors
    /// Returns error for the ground part or a stale handle
    pub fn erase(&mut self, handle: Handle) -> StoreResult<()> {
        if handle == self.ground {
            return Err(StoreError::ProtectedEntity);
        }
        let tag = self.get(handle)?.tag();

        if tag.is_scope() {
            let key = ScopeKey::Assembly(handle);
            for member in self.members(key) {
                self.erase(member)?;
            }
            self.scopes.remove(&key);
        }

        let identity = self.identity(handle);
        self.disconnect(handle);
        self.clear_inbound(handle, identity.as_ref());

        if let Some(entity) = self.arena.remove(handle) {
            if self.base_ids.get(&entity.base_id) == Some(&handle) {
                self.base_ids.remove(&entity.base_id);
            }
        }
        self.hooks.on_topology_changed(handle);
        Ok(())
    }

    fn clear_inbound(&mut self, target: Handle, identity: Option<&RefTarget>) {
        let handles: Vec<Handle> = self.arena.handles().collect();
        for h in handles {
            if let Some(entity) = self.arena.get_mut(h) {
                entity.data.fields_mut().for_each_ref_mut(&mut |_, r| {
                    let stale_triple = r.handle().is_none() && identity.is_some() && r.target() == identity;
                    if r.points_to(target) || stale_triple {
                        r.clear();
                    }
                });
            }
        }
    }

    /// Change the userID of an entity in place
    ///
    /// # Errors
    /// Returns error if the ID is taken in the entity's ring
    pub fn set_user_id(&mut self, handle: Handle, id: UserId) -> StoreResult<()> {
        if handle == self.ground {
            return Err(StoreError::ProtectedEntity);
        }
        if id.is_singleton() {
            return Err(StoreError::ReservedId(id));
        }
        let entity = self.get(handle)?;
        let (scope, tag, old, connected) = (entity.scope, entity.tag(), entity.user_id, entity.connected);
        if old == id {
            return Ok(());
        }
        if connected {
            let scope_path = self.scope_path(scope);
            let ring = self
                .scopes
                .get_mut(&scope)
                .ok_or_else(|| StoreError::NoSuchScope(scope_path.clone()))?
                .ring_mut(tag);
            if !ring.rekey(handle, old, id) {
                return Err(StoreError::DuplicateId {
                    tag,
                    id,
                    scope: scope_path,
                });
            }
        }
        self.get_mut(handle)?.user_id = id;
        Ok(())
    }

    /// Place `handle` directly after `anchor` in their common ring
    ///
    /// A detached `handle` is first connected in `anchor`'s scope.
    ///
    /// # Errors
    /// Returns error if the two are of different kinds or scopes
    pub fn insert_after(&mut self, handle: Handle, anchor: Handle) -> StoreResult<()> {
        let anchor_entity = self.get(anchor)?;
        if !anchor_entity.connected {
            return Err(StoreError::NotConnected(anchor));
        }
        let (scope, tag) = (anchor_entity.scope, anchor_entity.tag());
        let entity = self.get(handle)?;
        if entity.tag() != tag {
            return Err(StoreError::wrong_kind(tag, entity.tag()));
        }
        if !entity.connected {
            let preferred = entity.user_id;
            let free = !self.ring(scope, tag).is_taken(preferred);
            let preferred = if free { preferred } else { UserId::UNSET };
            self.connect(handle, scope, preferred)?;
        } else if entity.scope != scope {
            return Err(StoreError::NoSuchScope(self.scope_path(entity.scope)));
        }
        if let Some(rings) = self.scopes.get_mut(&scope) {
            rings.ring_mut(tag).move_after(handle, anchor);
        }
        self.hooks.on_topology_changed(handle);
        Ok(())
    }

    // --- rings ----------------------------------------------------------

    /// Ring of `tag` inside `scope`
    ///
    /// An unknown scope yields an empty ring.
    #[must_use]
    pub fn ring(&self, scope: ScopeKey, tag: TypeTag) -> &Ring {
        static EMPTY: std::sync::OnceLock<RingMap> = std::sync::OnceLock::new();
        self.scopes
            .get(&scope)
            .unwrap_or_else(|| EMPTY.get_or_init(RingMap::default))
            .ring(tag)
    }

    /// All rings of a scope
    #[must_use]
    pub fn rings(&self, scope: ScopeKey) -> Option<&RingMap> {
        self.scopes.get(&scope)
    }

    /// Members of a scope, rank order then ring order
    #[must_use]
    pub fn members(&self, scope: ScopeKey) -> Vec<Handle> {
        self.scopes
            .get(&scope)
            .map(|rings| rings.iter().flat_map(Ring::iter).collect())
            .unwrap_or_default()
    }

    /// Number of connected entities of `tag` in the whole model
    #[must_use]
    pub fn count(&self, tag: TypeTag) -> usize {
        self.scopes.values().map(|rings| rings.ring(tag).len()).sum()
    }

    // --- identity -------------------------------------------------------

    /// Bottom-up ID path: `[id,leafScope,...,rootScope]` or `id_leaf_..._root`
    #[must_use]
    pub fn id_path(&self, handle: Handle, brackets: bool) -> String {
        let Some(entity) = self.arena.get(handle) else {
            return String::new();
        };
        let mut ids = vec![entity.user_id.to_string()];
        let mut scope = entity.scope;
        while let ScopeKey::Assembly(owner) = scope {
            let Some(owner) = self.arena.get(owner) else {
                break;
            };
            ids.push(owner.user_id.to_string());
            scope = owner.scope;
        }
        if brackets {
            format!("[{}]", ids.join(","))
        } else {
            ids.join("_")
        }
    }

    /// `<UI name> [idpath] "description"`, used in every diagnostic
    #[must_use]
    pub fn id_string(&self, handle: Handle, with_description: bool) -> String {
        let Some(entity) = self.arena.get(handle) else {
            return format!("<erased {handle}>");
        };
        let mut s = format!("{} {}", entity.tag().ui_name(), self.id_path(handle, true));
        if with_description && !entity.description.is_empty() {
            s.push_str(&format!(" \"{}\"", entity.description));
        }
        s
    }

    /// Handle named by a textual reference, without creating anything
    #[must_use]
    pub fn find(&self, target: &RefTarget) -> Option<Handle> {
        if target.tag == TypeTag::Part && target.id == UserId::GROUND {
            return Some(self.ground);
        }
        let scope = self.scope_at(&target.path)?;
        self.scopes.get(&scope)?.ring(target.tag).get(target.id)
    }

    // --- singletons -----------------------------------------------------

    /// The connected model singleton of `tag`, if any
    #[must_use]
    pub fn singleton(&self, tag: TypeTag) -> Option<Handle> {
        self.ring(ScopeKey::Root, tag).iter().next()
    }

    /// The model singleton of `tag`, created and connected when missing
    ///
    /// # Errors
    /// Returns error if `tag` is not a singleton kind
    pub fn singleton_or_create(&mut self, tag: TypeTag) -> StoreResult<Handle> {
        if !tag.is_model_singleton() {
            return Err(StoreError::wrong_kind(TypeTag::Mechanism, tag));
        }
        if let Some(h) = self.singleton(tag) {
            return Ok(h);
        }
        let h = self.create(tag);
        self.connect(h, ScopeKey::Root, UserId::UNSET)?;
        tracing::debug!(kind = %tag, "created on demand");
        Ok(h)
    }

    #[inline]
    #[must_use]
    pub fn mechanism(&self) -> Option<Handle> {
        self.singleton(TypeTag::Mechanism)
    }

    /// Sea environment, created only when asked for
    ///
    /// # Errors
    /// Never fails in practice; propagates connect errors
    pub fn sea_state(&mut self) -> StoreResult<Handle> {
        self.singleton_or_create(TypeTag::SeaState)
    }
}

impl RefLookup for Database {
    fn lookup(&self, target: &RefTarget) -> Option<Handle> {
        self.find(target)
    }
}

impl RefIdentity for Database {
    fn identity(&self, handle: Handle) -> Option<RefTarget> {
        let entity = self.arena.get(handle)?;
        if !entity.connected {
            return None;
        }
        Some(RefTarget::new(
            entity.tag(),
            entity.user_id,
            self.scope_path(entity.scope),
        ))
    }
}
