//! Lifecycle scenarios spanning rings, scopes and references

use fmdb_store::{Database, ScopeKey, Severity, StoreError};
use fmdb_test_utils::{collecting_db, connected, init_tracing, nested_model, two_entity_model};
use fmdb_types::{RefTarget, ScopePath, TypeTag, UserId};
use pretty_assertions::assert_eq;

#[test]
fn duplicate_connect_leaves_ring_untouched() {
    init_tracing();
    let (mut db, sink) = collecting_db();
    let first = connected(&mut db, TypeTag::Triad, ScopeKey::Root, 4);
    let second = db.create(TypeTag::Triad);

    let err = db.connect(second, ScopeKey::Root, UserId::new(4)).unwrap_err();
    assert!(matches!(err, StoreError::DuplicateId { .. }));
    assert!(err.is_collision());

    let ring: Vec<_> = db.ring(ScopeKey::Root, TypeTag::Triad).iter().collect();
    assert_eq!(ring, vec![first]);
    assert!(!db.entity(second).unwrap().is_connected());
    let errors = sink.messages(Severity::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("Triad [4]"));

    // the loser can still be connected under a fresh ID
    assert_eq!(db.connect(second, ScopeKey::Root, UserId::UNSET).unwrap(), UserId::new(5));
}

#[test]
fn erase_clears_inbound_references() {
    let (mut db, model) = two_entity_model();
    db.erase(model.part).unwrap();

    let triad = db.entity(model.triad).unwrap();
    let owner = &triad.data.as_triad().unwrap().owner_link;
    assert!(!owner.is_set());
    assert_eq!(db.count(TypeTag::Part), 0);
    assert!(db.get(model.part).is_err());
}

#[test]
fn erasing_a_sub_assembly_erases_its_subtree() {
    let (mut db, model) = nested_model();
    let outside = connected(&mut db, TypeTag::Triad, ScopeKey::Root, 9);
    db.erase(model.outer).unwrap();

    for gone in [model.outer, model.inner, model.part, model.triad] {
        assert!(!db.contains(gone));
    }
    assert!(db.contains(outside));
    assert!(db.scope_at(&ScopePath::from_ids(&[1])).is_none());
    assert_eq!(db.subtree_members(ScopeKey::Root), vec![outside]);
}

#[test]
fn sub_assembly_cannot_enter_its_own_subtree() {
    let (mut db, model) = nested_model();
    assert!(db.disconnect(model.outer));
    let err = db
        .connect(model.outer, ScopeKey::Assembly(model.inner), UserId::UNSET)
        .unwrap_err();
    assert!(matches!(err, StoreError::CyclicScope(_)));
    db.connect(model.outer, ScopeKey::Root, UserId::new(1)).unwrap();
    assert_eq!(db.id_path(model.part, true), "[5,2,1]");
}

#[test]
fn references_into_nested_scopes_resolve_by_path() {
    let (mut db, model) = nested_model();
    let triad = db.create(TypeTag::Triad);
    db.connect(triad, ScopeKey::Root, UserId::new(1)).unwrap();
    db.get_mut(triad).unwrap().data.as_triad_mut().unwrap().owner_link =
        fmdb_ref::EntityRef::unresolved(RefTarget {
            tag: TypeTag::Part,
            id: UserId::new(5),
            path: ScopePath::from_ids(&[1, 2]),
        });

    let report = db.resolve_all();
    assert!(report.is_clean());
    let owner = &db.entity(triad).unwrap().data.as_triad().unwrap().owner_link;
    assert!(owner.points_to(model.part));
}

#[test]
fn resolution_and_init_are_idempotent() {
    let (mut db, _) = nested_model();
    let first = db.resolve_all();
    let len = db.len();
    let visited = db.init_after_resolve();

    let second = db.resolve_all();
    assert_eq!(second.resolved + second.already_resolved, first.resolved + first.already_resolved);
    assert_eq!(db.len(), len);
    assert_eq!(db.init_after_resolve(), visited);
}

#[test]
fn duplicated_scope_points_at_its_own_members() {
    let (mut db, model) = nested_model();
    let copy = db.duplicate_scope(model.outer).unwrap();

    assert_eq!(db.entity(copy).unwrap().user_id(), UserId::new(2));
    assert_eq!(db.count(TypeTag::Part), 2);
    let copied_triad = db
        .scope_at(&ScopePath::from_ids(&[2]))
        .map(|scope| db.ring(scope, TypeTag::Triad).iter().collect::<Vec<_>>())
        .unwrap_or_default();
    assert_eq!(copied_triad.len(), 1);

    let owner = &db.entity(copied_triad[0]).unwrap().data.as_triad().unwrap().owner_link;
    let target = owner.handle().unwrap();
    assert_ne!(target, model.part);
    assert_eq!(db.id_path(target, true), "[5,2,2]");
}

#[test]
fn ground_is_protected() {
    let mut db = Database::new();
    let ground = db.ground();
    assert!(matches!(db.erase(ground), Err(StoreError::ProtectedEntity)));
    assert!(!db.disconnect(ground));
    assert_eq!(db.find(&RefTarget::root(TypeTag::Part, UserId::GROUND.get())), Some(ground));
}
