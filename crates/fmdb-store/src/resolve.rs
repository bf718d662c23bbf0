//! Reference resolution and post-resolution initialization

use crate::database::Database;
use crate::diagnostics::Diagnostic;
use crate::entity::ScopeKey;
use fmdb_ref::{ResolveReport, Resolution};
use fmdb_types::{Handle, TypeTag};
use std::collections::HashSet;

impl Database {
    /// Resolve every unresolved reference in a scope subtree
    ///
    /// Scopes are visited depth-first. References that already carry a
    /// handle are left alone, so calling this twice is harmless. Dangling
    /// references stay unresolved and are listed in the report.
    pub fn resolve_references(&mut self, scope: ScopeKey) -> ResolveReport {
        let mut report = ResolveReport::new();
        for handle in self.subtree_members(scope) {
            self.resolve_entity(handle, &mut report);
        }
        tracing::debug!(
            resolved = report.resolved,
            dangling = report.dangling.len(),
            "references resolved"
        );
        report
    }

    fn resolve_entity(&mut self, handle: Handle, report: &mut ResolveReport) {
        let Some(entity) = self.arena.get(handle) else {
            return;
        };
        let mut data = entity.data.clone();
        let mut dangling = Vec::new();
        let mut changed = false;
        data.fields_mut().for_each_ref_mut(&mut |field, r| match r.resolve(&*self) {
            Resolution::Resolved => {
                report.resolved += 1;
                changed = true;
            }
            Resolution::AlreadyResolved => report.already_resolved += 1,
            Resolution::Dangling => {
                if let Some(target) = r.target() {
                    dangling.push((field, target.clone()));
                }
            }
            Resolution::Unset => {}
        });

        if !dangling.is_empty() {
            let owner = self.id_string(handle, true);
            for (field, target) in dangling {
                report.dangling(owner.clone(), field, target);
            }
        }
        if changed {
            if let Some(entity) = self.arena.get_mut(handle) {
                entity.data = data;
            }
        }
    }

    /// Send one warning per dangling reference to the sink
    pub fn report_dangling(&self, report: &ResolveReport) {
        for dangling in &report.dangling {
            self.report(Diagnostic::warning(dangling.to_string()));
        }
    }

    /// Post-resolution initialization sweep
    ///
    /// Runs once per entity, repeating over entities created by earlier
    /// steps until none are new. Every step is idempotent. Returns the
    /// number of entities visited.
    pub fn init_after_resolve(&mut self) -> usize {
        let mut done = HashSet::new();
        loop {
            let pending: Vec<Handle> = self
                .subtree_members(ScopeKey::Root)
                .into_iter()
                .filter(|h| !done.contains(h))
                .collect();
            if pending.is_empty() {
                break;
            }
            for handle in pending {
                done.insert(handle);
                self.init_entity(handle);
            }
        }
        done.len()
    }

    fn init_entity(&mut self, handle: Handle) {
        let Some(entity) = self.arena.get_mut(handle) else {
            return;
        };
        match entity.tag() {
            TypeTag::Analysis => {
                let Some(analysis) = entity.data.as_analysis_mut() else {
                    return;
                };
                if !analysis.has_staged_values() {
                    return;
                }
                let (gravity, tolerance) = analysis.take_staged();
                match self.singleton_or_create(TypeTag::Mechanism) {
                    Ok(mechanism) => {
                        if let Some(m) = self
                            .arena
                            .get_mut(mechanism)
                            .and_then(|e| e.data.as_mechanism_mut())
                        {
                            if let Some(gravity) = gravity {
                                m.gravity = gravity;
                            }
                            if let Some(tolerance) = tolerance {
                                m.position_tolerance = tolerance;
                            }
                        }
                        tracing::debug!("moved analysis settings into the mechanism");
                    }
                    Err(err) => self.report(Diagnostic::error(format!(
                        "cannot move analysis settings: {err}"
                    ))),
                }
            }
            TypeTag::Part => {
                if let Some(part) = entity.data.as_part_mut() {
                    if part.base_ftl_file.is_empty() {
                        if let Some(name) = part.derived_ftl_name() {
                            part.base_ftl_file = name;
                        }
                    }
                }
            }
            _ => {}
        }
    }

    /// Resolve the whole model, report dangling references and initialize
    pub fn resolve_all(&mut self) -> ResolveReport {
        let report = self.resolve_references(ScopeKey::Root);
        self.report_dangling(&report);
        self.init_after_resolve();
        report
    }
}
