//! Testing utilities for the FMDB workspace
//!
//! Shared fixtures: small models built through the store API, model-file
//! text wrappers and a tracing subscriber for test runs.

#![allow(missing_docs)]

use fmdb_ref::EntityRef;
use fmdb_store::{CollectingSink, Database, ScopeKey};
use fmdb_types::{FormatVersion, Handle, RefTarget, ScopePath, TypeTag, UserId};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};

static TRACING: Once = Once::new();

/// Install an env-filtered subscriber once per test binary
///
/// Honours `RUST_LOG`; defaults to `warn`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Empty database reporting into a sink the test can inspect
pub fn collecting_db() -> (Database, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let db = Database::new().with_sink(sink.clone());
    (db, sink)
}

/// Create `tag` and connect it under `id` in `scope`
///
/// # Panics
/// If the ID is taken
pub fn connected(db: &mut Database, tag: TypeTag, scope: ScopeKey, id: i32) -> Handle {
    let h = db.create(tag);
    db.connect(h, scope, UserId::new(id))
        .unwrap_or_else(|err| panic!("cannot connect {tag:?} {id}: {err}"));
    h
}

/// Handles of [`two_entity_model`]
#[derive(Debug, Clone, Copy)]
pub struct TwoEntities {
    pub triad: Handle,
    pub part: Handle,
}

/// Triad 1 owned by part 2, both at the root, resolved
pub fn two_entity_model() -> (Database, TwoEntities) {
    let mut db = Database::new();
    let part = connected(&mut db, TypeTag::Part, ScopeKey::Root, 2);
    let triad = connected(&mut db, TypeTag::Triad, ScopeKey::Root, 1);
    if let Some(t) = db.get_mut(triad).ok().and_then(|e| e.data.as_triad_mut()) {
        t.owner_link = EntityRef::resolved(RefTarget::root(TypeTag::Part, 2), part);
    }
    if let Ok(e) = db.get_mut(part) {
        e.description = "chassis".into();
    }
    (db, TwoEntities { triad, part })
}

/// Handles of [`nested_model`]
#[derive(Debug, Clone, Copy)]
pub struct Nested {
    /// Sub-assembly `[1]`
    pub outer: Handle,
    /// Sub-assembly `[1 2]`
    pub inner: Handle,
    /// Part 5 in `[1 2]`
    pub part: Handle,
    /// Triad 3 in `[1]`, owned by the part in `[1 2]`
    pub triad: Handle,
}

/// Two nested sub-assemblies with a reference crossing them
pub fn nested_model() -> (Database, Nested) {
    let mut db = Database::new();
    let outer = connected(&mut db, TypeTag::SubAssembly, ScopeKey::Root, 1);
    let inner = connected(&mut db, TypeTag::SubAssembly, ScopeKey::Assembly(outer), 2);
    let part = connected(&mut db, TypeTag::Part, ScopeKey::Assembly(inner), 5);
    let triad = connected(&mut db, TypeTag::Triad, ScopeKey::Assembly(outer), 3);
    if let Some(t) = db.get_mut(triad).ok().and_then(|e| e.data.as_triad_mut()) {
        t.owner_link = EntityRef::resolved(
            RefTarget {
                tag: TypeTag::Part,
                id: UserId::new(5),
                path: ScopePath::from_ids(&[1, 2]),
            },
            part,
        );
    }
    (
        db,
        Nested {
            outer,
            inner,
            part,
            triad,
        },
    )
}

/// Wrap block text in a header of `version` and the end marker
pub fn model_text(version: FormatVersion, blocks: &str) -> String {
    format!("FEDEMMODELFILE {{{version} ASCII}}\n{blocks}\nEND {{FEDEMMODELFILE}}\n")
}

/// Wrap block text as a current-version model file
pub fn current_model_text(blocks: &str) -> String {
    model_text(FormatVersion::CURRENT, blocks)
}

/// Write `text` to `dir/name`
///
/// # Errors
/// If the file cannot be written
pub fn write_model(dir: &Path, name: &str, text: &str) -> anyhow::Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, text)?;
    Ok(path)
}
