//! Solver input records
//!
//! Each entity that means something to the solver emits one namelist
//! record. Record IDs are baseIDs, and references are written as the
//! target's baseID, so renumbering userIDs never changes solver input.

use crate::database::Database;
use crate::entity::ScopeKey;
use fmdb_ref::EntityRef;
use fmdb_types::{format_real, Handle};
use std::fmt::Write as _;

/// Body of one namelist record
pub struct SolverRecord<'a> {
    db: &'a Database,
    lines: Vec<String>,
}

impl<'a> SolverRecord<'a> {
    pub(crate) fn new(db: &'a Database) -> Self {
        Self {
            db,
            lines: Vec::new(),
        }
    }

    fn push(&mut self, key: &str, value: impl std::fmt::Display) {
        self.lines.push(format!("  {key} = {value}"));
    }

    #[inline]
    pub fn int(&mut self, key: &str, value: i64) {
        self.push(key, value);
    }

    #[inline]
    pub fn real(&mut self, key: &str, value: f64) {
        self.push(key, format_real(value));
    }

    pub fn reals(&mut self, key: &str, values: &[f64]) {
        let joined: Vec<String> = values.iter().copied().map(format_real).collect();
        self.push(key, joined.join(" "));
    }

    /// Single-quoted string
    pub fn text(&mut self, key: &str, value: &str) {
        self.push(key, format!("'{}'", value.replace('\'', "''")));
    }

    #[inline]
    pub fn word(&mut self, key: &str, value: &str) {
        self.push(key, value);
    }

    /// Target's baseID, or 0 when unset or unresolved
    pub fn reference(&mut self, key: &str, r: &EntityRef) {
        let id = r
            .handle()
            .and_then(|h| self.db.entity(h))
            .map_or(0, |e| e.base_id().get());
        self.push(key, id);
    }
}

impl Database {
    /// Namelist record for one entity, if its kind feeds the solver
    #[must_use]
    pub fn emit_solver_record(&self, handle: Handle) -> Option<String> {
        let entity = self.entity(handle)?;
        let fields = entity.data.fields();
        let section = fields.solver_section()?;

        let mut rec = SolverRecord::new(self);
        rec.int("id", i64::try_from(entity.base_id().get()).unwrap_or(i64::MAX));
        rec.word("extId", &self.id_path(handle, false).replace('_', " "));
        if !entity.description.is_empty() {
            rec.text("extDescr", &entity.description);
        }
        fields.write_solver(&mut rec);

        let mut out = format!("&{section}\n");
        for line in rec.lines {
            let _ = writeln!(out, "{line}");
        }
        out.push_str("/\n");
        Some(out)
    }

    /// Records for every connected entity, model order
    #[must_use]
    pub fn emit_solver_input(&self) -> String {
        let mut out = String::new();
        for handle in self.subtree_members(ScopeKey::Root) {
            if let Some(record) = self.emit_solver_record(handle) {
                out.push_str(&record);
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmdb_types::{RefTarget, ScopePath, TypeTag, UserId};

    #[test]
    fn triad_record_uses_base_ids() {
        let mut db = Database::new();
        let scope = db.resolve_scope(&ScopePath::from_ids(&[2])).unwrap();
        let part = db.create(TypeTag::Part);
        db.connect(part, scope, UserId::new(1)).unwrap();
        let triad = db.create(TypeTag::Triad);
        db.connect(triad, scope, UserId::new(1)).unwrap();
        {
            let entity = db.get_mut(triad).unwrap();
            entity.description = "left hub".into();
            let t = entity.data.as_triad_mut().unwrap();
            t.position = [0.0, 0.5, 1.0];
            t.owner_link = EntityRef::unresolved(RefTarget::new(
                TypeTag::Part,
                UserId::new(1),
                ScopePath::from_ids(&[2]),
            ));
        }
        db.resolve_all();

        let record = db.emit_solver_record(triad).unwrap();
        let base = db.entity(triad).unwrap().base_id();
        let part_base = db.entity(part).unwrap().base_id();
        assert!(record.starts_with("&TRIAD\n"));
        assert!(record.contains(&format!("  id = {base}\n")));
        assert!(record.contains("  extId = 1 2\n"));
        assert!(record.contains("  extDescr = 'left hub'\n"));
        assert!(record.contains("  ur = 0 0.5 1\n"));
        assert!(record.contains(&format!("  supElId = {part_base}\n")));
        assert!(record.ends_with("/\n"));
    }

    #[test]
    fn unresolved_reference_is_zero() {
        let mut db = Database::new();
        let load = db.create(TypeTag::Load);
        db.connect(load, ScopeKey::Root, UserId::UNSET).unwrap();
        let record = db.emit_solver_record(load).unwrap();
        assert!(record.contains("  triadId = 0\n"));
    }

    #[test]
    fn options_emit_nothing() {
        let mut db = Database::new();
        let options = db.create(TypeTag::FppOptions);
        db.connect(options, ScopeKey::Root, UserId::UNSET).unwrap();
        assert!(db.emit_solver_record(options).is_none());
        assert!(db.emit_solver_input().is_empty());
    }
}
