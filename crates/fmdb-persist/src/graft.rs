//! Importing a model file as a new sub-assembly
//!
//! A file starting with `!Submodel: <path>` is a saved sub-assembly: it
//! keeps its recorded ID when that is free in the target scope, and its
//! recorded path is rewritten to the new one. Any other model file is
//! imported whole; its top-level entities move into the new scope except
//! the model singletons, which are skipped. baseIDs on file are ignored.

use crate::error::{LoadError, LoadResult};
use crate::lexer::{read_header, Metadata};
use crate::options::FileOptions;
use crate::reader::Reader;
use crate::report::LoadReport;
use fmdb_ref::PathRemap;
use fmdb_store::{Database, ScopeKey};
use fmdb_types::{FormatVersion, Handle, ScopePath, TypeTag, UserId};
use std::path::Path;

const SINGLETONS: [TypeTag; 4] = [
    TypeTag::Mechanism,
    TypeTag::SeaState,
    TypeTag::Analysis,
    TypeTag::FppOptions,
];

/// Import `path` into `parent` as a new sub-assembly
///
/// Returns the new sub-assembly. The imported subtree is resolved and
/// initialized before returning; on failure the database is restored.
///
/// # Errors
/// - [`LoadError::Io`], [`LoadError::Version`] before anything changes
/// - [`LoadError::Format`] for a malformed block
pub fn graft(
    db: &mut Database,
    path: &Path,
    parent: ScopeKey,
    options: &FileOptions,
) -> LoadResult<Handle> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::io_error(path, e))?;
    let (version, body) = read_header(&text).map_err(|source| LoadError::Version {
        path: path.to_path_buf(),
        source,
    })?;
    if let Some(owner) = parent.assembly() {
        db.scope_of(owner)?;
    }

    let snapshot = db.clone();
    match graft_body(db, path, version, body, parent, options) {
        Ok(assembly) => Ok(assembly),
        Err(err) => {
            *db = snapshot;
            tracing::warn!(file = %path.display(), %err, "import aborted, model restored");
            Err(err)
        }
    }
}

fn graft_body(
    db: &mut Database,
    path: &Path,
    version: FormatVersion,
    body: &str,
    parent: ScopeKey,
    options: &FileOptions,
) -> LoadResult<Handle> {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let assembly = db.create(TypeTag::SubAssembly);
    db.get_mut(assembly)?.description.clone_from(&stem);

    let (remap, skip_singletons) = match Metadata::scan(body).submodel {
        Some(recorded) => {
            let wanted = recorded.last().unwrap_or(UserId::UNSET);
            let free = !db.ring(parent, TypeTag::SubAssembly).is_taken(wanted);
            let id = db.connect(assembly, parent, if free { wanted } else { UserId::UNSET })?;
            let model_file = if id == wanted {
                path.file_name()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default()
            } else {
                let ext = path
                    .extension()
                    .map_or_else(String::new, |e| format!(".{}", e.to_string_lossy()));
                format!("{stem}_{id}{ext}")
            };
            if let Some(data) = db.get_mut(assembly)?.data.as_sub_assembly_mut() {
                data.model_file = model_file;
            }
            let own = db.scope_path(ScopeKey::Assembly(assembly));
            (PathRemap::new(recorded, own), false)
        }
        None => {
            db.connect(assembly, parent, UserId::UNSET)?;
            let own = db.scope_path(ScopeKey::Assembly(assembly));
            (PathRemap::new(ScopePath::root(), own).excluding(SINGLETONS), true)
        }
    };

    let mut report = LoadReport::new(version);
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let (_, saw_end) = Reader::new(db, &mut report, base_dir)
        .with_load_external(options.load_external)
        .grafting(Some(remap), skip_singletons)
        .read_stream(path, body, version, 0, false)?;
    report.missing_end = !saw_end;

    let scope = ScopeKey::Assembly(assembly);
    report.resolve = db.resolve_references(scope);
    db.report_dangling(&report.resolve);
    db.init_after_resolve();
    report.flush(db);
    tracing::info!(
        file = %path.display(),
        into = %db.id_string(assembly, false),
        blocks = report.blocks_read,
        "model imported"
    );
    Ok(assembly)
}
