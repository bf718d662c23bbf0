//! Model-file writer
//!
//! Rings are written scope by scope in serialization rank. A sub-assembly
//! is followed by its members inline, or, when it names a model file,
//! its members go to that file with a `!Submodel` header instead.

use crate::lexer::header_line;
use fmdb_ref::RefIdentity;
use fmdb_store::{Database, FieldWriter, ScopeKey};
use fmdb_types::{FieldValue, Handle, TypeTag};
use std::fmt::Write as _;

/// One generated file
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OutputFile {
    /// Name relative to the main file's directory
    pub(crate) name: String,
    pub(crate) text: String,
}

/// Everything a save writes, main file first
#[derive(Debug, Clone, Default)]
pub(crate) struct Output {
    pub(crate) files: Vec<OutputFile>,
    pub(crate) blocks: usize,
}

pub(crate) struct Writer<'a> {
    db: &'a Database,
    write_external: bool,
    counter: u32,
    stamp: String,
    pending: Vec<Handle>,
    blocks: usize,
}

impl<'a> Writer<'a> {
    pub(crate) fn new(db: &'a Database, write_external: bool, counter: u32) -> Self {
        Self {
            db,
            write_external,
            counter,
            stamp: chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string(),
            pending: Vec::new(),
            blocks: 0,
        }
    }

    /// Write the model as `file_name` plus one file per external scope
    pub(crate) fn write(mut self, file_name: &str) -> Output {
        let mut text = self.preamble(file_name, None);
        self.write_scope(&mut text, ScopeKey::Root);
        text.push_str("END {FEDEMMODELFILE}\n");
        let mut files = vec![OutputFile {
            name: file_name.to_string(),
            text,
        }];

        while let Some(owner) = self.pending.pop() {
            let Some(name) = self
                .db
                .entity(owner)
                .and_then(|e| e.data.as_sub_assembly())
                .map(|a| a.model_file.clone())
            else {
                continue;
            };
            let mut text = self.preamble(&name, Some(owner));
            self.write_scope(&mut text, ScopeKey::Assembly(owner));
            text.push_str("END {FEDEMMODELFILE}\n");
            files.push(OutputFile { name, text });
        }

        Output {
            files,
            blocks: self.blocks,
        }
    }

    fn preamble(&self, file_name: &str, submodel: Option<Handle>) -> String {
        let mut out = header_line();
        out.push('\n');
        let _ = writeln!(out, "!Module version: {}", crate::VERSION);
        let _ = writeln!(out, "!Model file name: {file_name}");
        if let Some(owner) = submodel {
            let path = self.db.scope_path(ScopeKey::Assembly(owner));
            let _ = writeln!(out, "!Submodel: {path}");
        }
        let _ = writeln!(out, "!Last saved: #{}, {}", self.counter, self.stamp);
        out.push('\n');
        out
    }

    fn write_scope(&mut self, out: &mut String, scope: ScopeKey) {
        let Some(rings) = self.db.rings(scope) else {
            return;
        };
        for ring in rings.iter().filter(|ring| !ring.is_empty()) {
            let tag = ring.tag();
            if tag.prints_header() {
                let _ = writeln!(out, "!*** {} ***\n", ring.label());
            }
            for member in ring.iter() {
                self.write_block(out, member);
                if tag == TypeTag::SubAssembly {
                    self.write_members(out, member);
                }
            }
        }
    }

    fn write_members(&mut self, out: &mut String, owner: Handle) {
        let external = self
            .db
            .entity(owner)
            .and_then(|e| e.data.as_sub_assembly())
            .is_some_and(fmdb_store::kinds::SubAssembly::is_external);
        if external && self.write_external {
            self.pending.push(owner);
        } else {
            self.write_scope(out, ScopeKey::Assembly(owner));
        }
    }

    fn write_block(&mut self, out: &mut String, handle: Handle) {
        let Some(entity) = self.db.entity(handle) else {
            return;
        };
        let _ = writeln!(out, "{}\n{{", entity.tag().keyword());
        let _ = writeln!(out, "  ID = {};", entity.user_id());
        let _ = writeln!(out, "  BASE_ID = {};", entity.base_id());
        let _ = writeln!(out, "  DESCR = {};", FieldValue::text(&entity.description));
        if let Some(parent) = entity
            .scope()
            .assembly()
            .and_then(|owner| self.db.identity(owner))
        {
            let _ = writeln!(out, "  PARENT_ASSEMBLY = {};", FieldValue::reference(parent));
        }

        let mut fields = FieldWriter::new(self.db);
        entity.data.fields().write_fields(&mut fields);
        for (keyword, value) in fields.finish() {
            let _ = writeln!(out, "  {keyword} = {value};");
        }
        out.push_str("}\n\n");
        self.blocks += 1;
    }
}
