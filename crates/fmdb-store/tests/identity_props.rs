//! Identity invariants under random connect/erase sequences

use fmdb_store::{Database, ScopeKey};
use fmdb_types::{Handle, TypeTag, UserId};
use proptest::prelude::*;
use std::collections::HashSet;

const KINDS: [TypeTag; 3] = [TypeTag::Triad, TypeTag::Part, TypeTag::RevJoint];

#[derive(Debug, Clone)]
enum Op {
    Connect { kind: usize, preferred: i32 },
    Erase { index: usize },
    Renumber { index: usize, id: i32 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..KINDS.len(), 0..8i32).prop_map(|(kind, preferred)| Op::Connect { kind, preferred }),
        1 => (0..32usize).prop_map(|index| Op::Erase { index }),
        1 => (0..32usize, 1..8i32).prop_map(|(index, id)| Op::Renumber { index, id }),
    ]
}

fn assert_rings_unique(db: &Database) {
    for tag in KINDS {
        let ids: Vec<UserId> = db
            .ring(ScopeKey::Root, tag)
            .iter()
            .filter_map(|h| db.entity(h).map(fmdb_store::Entity::user_id))
            .collect();
        let distinct: HashSet<_> = ids.iter().collect();
        assert_eq!(distinct.len(), ids.len(), "{tag:?} ring has duplicate IDs: {ids:?}");
        assert!(ids.iter().all(|id| id.get() > 0), "{tag:?} ring has reserved IDs: {ids:?}");
    }
}

proptest! {
    #[test]
    fn prop_user_ids_stay_unique_per_ring(ops in proptest::collection::vec(op(), 1..60)) {
        let mut db = Database::new();
        let mut live: Vec<Handle> = Vec::new();

        for op in ops {
            match op {
                Op::Connect { kind, preferred } => {
                    let h = db.create(KINDS[kind]);
                    let wanted = if preferred == 0 { UserId::UNSET } else { UserId::new(preferred) };
                    match db.connect(h, ScopeKey::Root, wanted) {
                        Ok(id) => {
                            prop_assert!(wanted.is_unset() || id == wanted);
                            live.push(h);
                        }
                        Err(err) => {
                            prop_assert!(err.is_collision());
                            db.erase(h).unwrap();
                        }
                    }
                }
                Op::Erase { index } if !live.is_empty() => {
                    let h = live.swap_remove(index % live.len());
                    db.erase(h).unwrap();
                    prop_assert!(!db.contains(h));
                }
                Op::Renumber { index, id } if !live.is_empty() => {
                    let h = live[index % live.len()];
                    let before = db.entity(h).unwrap().user_id();
                    if let Err(err) = db.set_user_id(h, UserId::new(id)) {
                        prop_assert!(err.is_collision());
                        prop_assert_eq!(db.entity(h).unwrap().user_id(), before);
                    }
                }
                Op::Erase { .. } | Op::Renumber { .. } => {}
            }
            assert_rings_unique(&db);
        }

        let total: usize = KINDS.iter().map(|tag| db.count(*tag)).sum();
        prop_assert_eq!(total, live.len());
    }

    #[test]
    fn prop_base_ids_are_never_shared(count in 1..40usize) {
        let mut db = Database::new();
        let handles: Vec<Handle> = (0..count).map(|_| db.create(TypeTag::Triad)).collect();
        let base_ids: HashSet<_> = handles.iter().map(|h| db.entity(*h).unwrap().base_id()).collect();
        prop_assert_eq!(base_ids.len(), count);
    }
}
