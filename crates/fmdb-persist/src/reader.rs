//! First load pass: blocks into connected entities
//!
//! References are stored as unresolved triples; nothing here requires a
//! target to exist. Sub-assemblies with an external model file have that
//! file read right after their own block, followed by a local resolve
//! sweep whose misses are retried by the caller's final sweep.

use crate::error::{FormatError, LoadError, LoadResult};
use crate::lexer::{read_header, Item, Lexer, Metadata, RawBlock};
use crate::migrate::{self, Action, Staged};
use crate::report::{LoadReport, Progress};
use fmdb_ref::{PathRemap, RefError};
use fmdb_store::{BlockHeader, Database, EntityData, ScopeKey};
use fmdb_types::{BaseId, FieldValue, FormatVersion, Handle, ScopePath, TypeTag, UserId};
use std::collections::HashSet;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

/// Progress callback; `Break` cancels the load
pub(crate) type ProgressFn<'a> = dyn FnMut(Progress) -> ControlFlow<()> + 'a;

/// One block's statements, sorted into header, description and fields
struct ParsedBlock {
    tag: TypeTag,
    header: BlockHeader,
    description: String,
    data: EntityData,
    staged: Staged,
}

impl ParsedBlock {
    fn new(tag: TypeTag) -> Self {
        Self {
            tag,
            header: BlockHeader::default(),
            description: String::new(),
            data: EntityData::new(tag),
            staged: Staged::new(),
        }
    }

    /// Apply one statement; `Ok(false)` if no field or migration takes it
    fn read(
        &mut self,
        keyword: &str,
        value: &FieldValue,
        version: FormatVersion,
    ) -> Result<bool, RefError> {
        if keyword == "DESCR" {
            self.description = value.as_text()?;
            return Ok(true);
        }
        if self.header.read_field(keyword, value)? {
            return Ok(true);
        }
        if self.data.fields_mut().read_field(keyword, value)? {
            return Ok(true);
        }
        match migrate::lookup(self.tag, keyword, version) {
            Some(row) => match row.action {
                Action::Rename(current) => self.data.fields_mut().read_field(current, value),
                Action::Stage => {
                    self.staged.stage(row.keyword, value.clone());
                    Ok(true)
                }
            },
            None => Ok(false),
        }
    }
}

/// Pass-1 reader over one main file and the external files it names
pub(crate) struct Reader<'a> {
    db: &'a mut Database,
    report: &'a mut LoadReport,
    base_dir: PathBuf,
    load_external: bool,
    remap: Option<PathRemap>,
    skip_singletons: bool,
    ignore_base_ids: bool,
    /// Sub-assemblies that had a block of their own in this load
    declared: HashSet<Handle>,
    progress: Option<&'a mut ProgressFn<'a>>,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(db: &'a mut Database, report: &'a mut LoadReport, base_dir: &Path) -> Self {
        Self {
            db,
            report,
            base_dir: base_dir.to_path_buf(),
            load_external: true,
            remap: None,
            skip_singletons: false,
            ignore_base_ids: false,
            declared: HashSet::new(),
            progress: None,
        }
    }

    pub(crate) fn with_load_external(mut self, load: bool) -> Self {
        self.load_external = load;
        self
    }

    pub(crate) fn with_progress(mut self, progress: &'a mut ProgressFn<'a>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Import mode: move every scope path through `remap`, drop baseIDs
    pub(crate) fn grafting(mut self, remap: Option<PathRemap>, skip_singletons: bool) -> Self {
        self.remap = remap;
        self.skip_singletons = skip_singletons;
        self.ignore_base_ids = true;
        self
    }

    /// Read the blocks of a file whose header has been checked
    ///
    /// `body` is the text after the header line. Returns the metadata
    /// and whether the end marker was seen.
    pub(crate) fn read_stream(
        &mut self,
        path: &Path,
        body: &str,
        version: FormatVersion,
        bytes_before: usize,
        track_progress: bool,
    ) -> LoadResult<(Metadata, bool)> {
        let format_error = |source: FormatError| LoadError::Format {
            path: path.to_path_buf(),
            source,
        };
        let mut meta = Metadata::default();
        let mut lexer = Lexer::new(body, 2);
        let mut saw_end = false;

        while let Some(item) = lexer.next_item().map_err(format_error)? {
            match item {
                Item::Meta(line) => meta.read_line(line),
                Item::End => {
                    saw_end = true;
                    break;
                }
                Item::Block(block) => {
                    self.read_block(&block, version).map_err(|err| match err {
                        BlockError::Format(source) => format_error(source),
                        BlockError::Load(err) => err,
                    })?;
                    self.report.blocks_read += 1;
                    if track_progress {
                        self.tick(path, bytes_before + lexer.offset(), bytes_before + body.len())?;
                    }
                }
            }
        }
        Ok((meta, saw_end))
    }

    fn tick(&mut self, path: &Path, bytes_read: usize, bytes_total: usize) -> LoadResult<()> {
        let Some(progress) = self.progress.as_deref_mut() else {
            return Ok(());
        };
        let step = Progress {
            blocks_read: self.report.blocks_read,
            bytes_read,
            bytes_total,
        };
        match progress(step) {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(()) => Err(LoadError::Cancelled(path.to_path_buf())),
        }
    }

    fn read_block(&mut self, block: &RawBlock<'_>, version: FormatVersion) -> Result<(), BlockError> {
        let Some(tag) = migrate::block_kind(block.keyword) else {
            self.report.unknown_block(block.keyword);
            return Ok(());
        };
        if self.skip_singletons && tag.is_model_singleton() {
            tracing::debug!(kind = %tag, "singleton ignored by import");
            return Ok(());
        }

        let mut parsed = ParsedBlock::new(tag);
        for statement in &block.statements {
            let bad_value = |cause: &dyn std::fmt::Display| {
                FormatError::bad_value(statement.line, block.keyword, statement.keyword, &cause)
            };
            let value = FieldValue::parse(statement.value).map_err(|e| bad_value(&e))?;
            if parsed.read(statement.keyword, &value, version).map_err(|e| bad_value(&e))? {
                self.report.count_read(statement.keyword);
            } else {
                self.report.unknown_keyword(tag, statement.keyword);
            }
        }

        let staged = std::mem::take(&mut parsed.staged);
        let notes = staged
            .finish(&mut parsed.data)
            .map_err(|e| FormatError::bad_value(block.line, block.keyword, "", &e))?;

        let Some(handle) = self.place(parsed, block.line)? else {
            return Ok(());
        };
        for note in notes {
            let owner = self.db.id_string(handle, false);
            self.report.migration.push(format!("{owner}: {note}"));
        }
        if tag.is_scope() && self.load_external {
            self.read_external(handle)?;
        }
        Ok(())
    }

    /// Connect a parsed block where its header says it belongs
    fn place(&mut self, parsed: ParsedBlock, line: usize) -> LoadResult<Option<Handle>> {
        let ParsedBlock {
            tag,
            header,
            description,
            data,
            ..
        } = parsed;
        if header.user_id.is_singleton() {
            self.report.structural(format!(
                "line {line}: {} {} uses a reserved ID and was ignored",
                tag.ui_name(),
                header.user_id
            ));
            return Ok(None);
        }
        let mut path = header.scope_path();
        if let Some(moved) = self.remap.as_ref().and_then(|remap| remap.apply_path(&path)) {
            path = moved;
        }
        let scope = self.db.resolve_scope(&path)?;
        let handle = self.db.create_with(data);
        self.db.get_mut(handle)?.description = description;
        if let Some(remap) = &self.remap {
            self.db.remap_refs(handle, remap)?;
        }

        if let Some(existing) = self.existing(tag, &path, header.user_id) {
            let merged = self.db.merge_into(handle, existing)?;
            self.adopt_base_id(merged, header.base_id)?;
            if tag.is_scope() {
                self.declared.insert(merged);
            }
            return Ok(Some(merged));
        }

        match self.db.connect(handle, scope, header.user_id) {
            Ok(_) => {}
            Err(err) if err.is_collision() => {
                let id = self.db.connect(handle, scope, UserId::UNSET)?;
                self.report.structural(format!(
                    "line {line}: {err}; the new {} was given ID {id}",
                    tag.ui_name()
                ));
            }
            Err(err) => return Err(err.into()),
        }
        if tag.is_scope() {
            self.declared.insert(handle);
        }
        self.adopt_base_id(handle, header.base_id)?;
        Ok(Some(handle))
    }

    /// Give `handle` the baseID its block recorded, unless importing
    fn adopt_base_id(&mut self, handle: Handle, base_id: Option<BaseId>) -> LoadResult<()> {
        let Some(base_id) = base_id.filter(|_| !self.ignore_base_ids) else {
            return Ok(());
        };
        if !self.db.set_base_id(handle, base_id)? {
            self.report.structural(format!(
                "{}: base ID {base_id} is already in use, {} was assigned",
                self.db.id_string(handle, true),
                self.db.get(handle)?.base_id()
            ));
        }
        Ok(())
    }

    /// Entity a parsed block must be folded into instead of connected
    ///
    /// Singletons always merge. A sub-assembly merges only into a scope
    /// that was created on demand by a member's parent path; a second
    /// block with the same ID is a duplicate.
    fn existing(&self, tag: TypeTag, path: &ScopePath, id: UserId) -> Option<Handle> {
        if tag.is_model_singleton() {
            self.db.singleton(tag)
        } else if tag.is_scope() && !id.is_unset() {
            self.db
                .scope_at(&path.child(id))
                .and_then(ScopeKey::assembly)
                .filter(|owner| !self.declared.contains(owner))
        } else {
            None
        }
    }

    /// Read the external model file of a sub-assembly, if it has one
    fn read_external(&mut self, owner: Handle) -> LoadResult<()> {
        let file = match self.db.get(owner)?.data.as_sub_assembly() {
            Some(assembly) if assembly.is_external() => assembly.model_file.clone(),
            _ => return Ok(()),
        };
        let path = self.base_dir.join(&file);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) => {
                self.report.structural(format!(
                    "{}: cannot read {}: {err}",
                    self.db.id_string(owner, true),
                    path.display()
                ));
                return Ok(());
            }
        };
        let (version, body) = read_header(&text).map_err(|source| LoadError::Version {
            path: path.clone(),
            source,
        })?;

        let own = self.db.scope_path(ScopeKey::Assembly(owner));
        let recorded = Metadata::scan(body).submodel;
        let remap = recorded
            .filter(|recorded| *recorded != own)
            .map(|recorded| PathRemap::new(recorded, own));
        let outer = std::mem::replace(&mut self.remap, remap);
        let result = self.read_stream(&path, body, version, 0, false);
        self.remap = outer;

        let (_, saw_end) = result?;
        if !saw_end {
            self.report
                .structural(format!("{} has no END marker", path.display()));
        }
        // Misses stay unresolved for the final sweep
        let _ = self.db.resolve_references(ScopeKey::Assembly(owner));
        tracing::debug!(file = %path.display(), "external sub-assembly read");
        self.report.external_files.push(path);
        Ok(())
    }
}

enum BlockError {
    Format(FormatError),
    Load(LoadError),
}

impl From<FormatError> for BlockError {
    fn from(err: FormatError) -> Self {
        Self::Format(err)
    }
}

impl From<LoadError> for BlockError {
    fn from(err: LoadError) -> Self {
        Self::Load(err)
    }
}
