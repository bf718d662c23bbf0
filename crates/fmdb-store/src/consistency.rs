//! Checksum-gated consistency of part payloads and derived artifacts
//!
//! A part's payload is hashed lazily: mutation only sets the dirty flag,
//! and the checksum is recomputed the next time someone asks. The saved
//! checksum records what the current artifact was derived from, so
//! `cached == saved` means the artifact can be reused.

use crate::database::Database;
use crate::diagnostics::Diagnostic;
use crate::entity::ScopeKey;
use crate::error::{StoreError, StoreResult};
use crate::kinds::Part;
use fmdb_types::{Checksum, Handle, TypeTag};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Whether a part's derived artifact can be used as is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// Derived from the current payload
    Current,
    /// Payload changed since the artifact was written
    Stale,
    /// User asked to skip the checksum test
    Overridden,
    /// Part has no FE data; nothing to derive
    NoFeData,
}

/// Non-blocking consistency finding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyWarning {
    pub part: String,
    pub message: String,
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.part, self.message)
    }
}

fn part_ref(db: &Database, handle: Handle) -> StoreResult<&Part> {
    let entity = db.get(handle)?;
    entity
        .data
        .as_part()
        .ok_or_else(|| StoreError::wrong_kind(TypeTag::Part, entity.tag()))
}

fn part_mut(db: &mut Database, handle: Handle) -> StoreResult<&mut Part> {
    let entity = db.get_mut(handle)?;
    let tag = entity.tag();
    entity
        .data
        .as_part_mut()
        .ok_or_else(|| StoreError::wrong_kind(TypeTag::Part, tag))
}

impl Database {
    /// Replace a part's payload; the checksum becomes dirty
    ///
    /// # Errors
    /// Returns error if `handle` is not a live part
    pub fn set_payload(&mut self, handle: Handle, bytes: impl Into<Arc<[u8]>>) -> StoreResult<()> {
        part_mut(self, handle)?.set_payload(bytes);
        self.hooks.on_geometry_changed(handle);
        Ok(())
    }

    /// Current payload checksum, recomputed if dirty and resident
    ///
    /// A dirty part whose payload is not resident keeps its cached value
    /// until the payload is reloaded.
    ///
    /// # Errors
    /// Returns error if `handle` is not a live part
    pub fn checksum(&mut self, handle: Handle) -> StoreResult<Checksum> {
        let part = part_mut(self, handle)?;
        if part.checksum.needs_update {
            if let Some(computed) = part.payload().map(|p| Checksum::compute(p)) {
                part.checksum.cached = computed;
                part.checksum.needs_update = false;
                tracing::trace!(part = %handle, checksum = %part.checksum.cached.short(), "checksum updated");
            }
        }
        Ok(part.checksum.cached)
    }

    /// Drop a resident payload, hashing it first if dirty
    ///
    /// Returns false if nothing was resident.
    ///
    /// # Errors
    /// Returns error if `handle` is not a live part
    pub fn evict_payload(&mut self, handle: Handle) -> StoreResult<bool> {
        self.checksum(handle)?;
        Ok(part_mut(self, handle)?.drop_payload())
    }

    /// Read the payload back from the part's FE file
    ///
    /// Idempotent: a resident payload is left alone and `Ok(false)` is
    /// returned. A file whose content no longer matches the cached
    /// checksum is accepted with a warning and the checksum is updated.
    ///
    /// # Errors
    /// Returns error if the file cannot be read
    pub fn reload_payload(&mut self, handle: Handle, base_dir: &Path) -> StoreResult<bool> {
        let part = part_ref(self, handle)?;
        if part.is_resident() {
            return Ok(false);
        }
        if part.original_fe_file.is_empty() {
            return Ok(false);
        }
        let path = base_dir.join(&part.original_fe_file);
        let bytes = std::fs::read(&path).map_err(|source| StoreError::Payload {
            path: path.clone(),
            source,
        })?;
        let actual = Checksum::compute(&bytes);

        let expected = part.checksum.cached;
        if !expected.is_zero() && expected != actual {
            self.report(Diagnostic::warning(format!(
                "{}: FE data in {} has changed since it was last read",
                self.id_string(handle, true),
                path.display()
            )));
        }
        let part = part_mut(self, handle)?;
        part.restore_payload(bytes.into());
        part.checksum.cached = actual;
        part.checksum.needs_update = false;
        tracing::debug!(part = %handle, path = %path.display(), "payload reloaded");
        Ok(true)
    }

    /// Compare the current checksum against the artifact's
    ///
    /// # Errors
    /// Returns error if `handle` is not a live part
    pub fn artifact_status(&mut self, handle: Handle) -> StoreResult<ArtifactStatus> {
        if !part_ref(self, handle)?.has_fe_data() {
            return Ok(ArtifactStatus::NoFeData);
        }
        let current = self.checksum(handle)?;
        let part = part_ref(self, handle)?;
        Ok(if part.override_checksum {
            ArtifactStatus::Overridden
        } else if !current.is_zero() && current == part.checksum.saved {
            ArtifactStatus::Current
        } else {
            ArtifactStatus::Stale
        })
    }

    /// Record that the artifact was regenerated from the current payload
    ///
    /// # Errors
    /// Returns error if `handle` is not a live part
    pub fn mark_artifact_saved(&mut self, handle: Handle) -> StoreResult<Checksum> {
        let current = self.checksum(handle)?;
        part_mut(self, handle)?.checksum.saved = current;
        Ok(current)
    }

    /// Pick the artifact base name for one part
    ///
    /// Parts with equal checksums share a name; a name already used by
    /// another part with a different checksum is suffixed `_ftl<N>`.
    ///
    /// # Errors
    /// Returns error if `handle` is not a live part
    pub fn assign_artifact_name(&mut self, handle: Handle) -> StoreResult<Option<String>> {
        let others: Vec<Handle> = self.parts().into_iter().filter(|h| *h != handle).collect();
        self.artifact_name_among(handle, &others)
    }

    /// Assign artifact names to every part in model order
    ///
    /// Each part is checked only against the parts before it, so on a name
    /// clash the part earlier in the model keeps the plain name whatever
    /// names were filled in before.
    ///
    /// # Errors
    /// Propagates the first per-part failure
    pub fn assign_artifact_names(&mut self) -> StoreResult<()> {
        let parts = self.parts();
        for (i, handle) in parts.iter().enumerate() {
            self.artifact_name_among(*handle, &parts[..i])?;
        }
        Ok(())
    }

    fn artifact_name_among(&mut self, handle: Handle, others: &[Handle]) -> StoreResult<Option<String>> {
        let checksum = self.checksum(handle)?;
        let part = part_ref(self, handle)?;
        let Some(base) = part.derived_ftl_name().or_else(|| {
            (!part.base_ftl_file.is_empty()).then(|| part.base_ftl_file.clone())
        }) else {
            return Ok(None);
        };

        let taken: Vec<(String, Checksum)> = others
            .iter()
            .filter_map(|h| self.entity(*h)?.data.as_part().map(|p| (p.base_ftl_file.clone(), p.checksum.cached)))
            .filter(|(name, _)| !name.is_empty())
            .collect();
        let conflicts = |name: &str| taken.iter().any(|(n, c)| n == name && *c != checksum);

        let stem = base.strip_suffix(".ftl").unwrap_or(&base).to_string();
        let mut name = base;
        let mut n = 0;
        while conflicts(&name) {
            n += 1;
            name = format!("{stem}_ftl{n}.ftl");
        }
        part_mut(self, handle)?.base_ftl_file.clone_from(&name);
        Ok(Some(name))
    }

    /// Every connected part, model order
    #[must_use]
    pub fn parts(&self) -> Vec<Handle> {
        self.subtree_members(ScopeKey::Root)
            .into_iter()
            .filter(|h| self.entity(*h).is_some_and(|e| e.tag() == TypeTag::Part))
            .collect()
    }

    /// Parts whose artifacts must be regenerated before a solver run
    ///
    /// Overridden parts pass but are reported as warnings.
    ///
    /// # Errors
    /// Propagates per-part failures
    pub fn stale_artifacts(&mut self) -> StoreResult<(Vec<Handle>, Vec<ConsistencyWarning>)> {
        let mut stale = Vec::new();
        let mut warnings = Vec::new();
        for handle in self.parts() {
            match self.artifact_status(handle)? {
                ArtifactStatus::Stale => stale.push(handle),
                ArtifactStatus::Overridden => {
                    let warning = ConsistencyWarning {
                        part: self.id_string(handle, true),
                        message: "checksum test is overridden, the FE data may be out of date".to_string(),
                    };
                    self.report(Diagnostic::warning(warning.to_string()));
                    warnings.push(warning);
                }
                ArtifactStatus::Current | ArtifactStatus::NoFeData => {}
            }
        }
        Ok((stale, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmdb_types::UserId;

    fn fe_part(db: &mut Database, id: i32, file: &str) -> Handle {
        let h = db.create(TypeTag::Part);
        db.connect(h, ScopeKey::Root, UserId::new(id)).unwrap();
        db.get_mut(h).unwrap().data.as_part_mut().unwrap().original_fe_file = file.into();
        h
    }

    #[test]
    fn checksum_is_lazy_and_gates_the_artifact() {
        let mut db = Database::new();
        let p = fe_part(&mut db, 1, "arm.nas");
        db.set_payload(p, b"GRID 1".to_vec()).unwrap();
        assert!(db.entity(p).unwrap().data.as_part().unwrap().checksum.needs_update);

        assert_eq!(db.artifact_status(p).unwrap(), ArtifactStatus::Stale);
        db.mark_artifact_saved(p).unwrap();
        assert_eq!(db.artifact_status(p).unwrap(), ArtifactStatus::Current);

        db.set_payload(p, b"GRID 2".to_vec()).unwrap();
        assert_eq!(db.artifact_status(p).unwrap(), ArtifactStatus::Stale);
    }

    #[test]
    fn override_passes_with_warning() {
        let mut db = Database::new();
        let p = fe_part(&mut db, 1, "arm.nas");
        db.set_payload(p, b"GRID".to_vec()).unwrap();
        db.get_mut(p).unwrap().data.as_part_mut().unwrap().override_checksum = true;

        let (stale, warnings) = db.stale_artifacts().unwrap();
        assert!(stale.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].to_string().contains("overridden"));
    }

    #[test]
    fn parts_without_fe_data_need_nothing() {
        let mut db = Database::new();
        let p = db.create(TypeTag::Part);
        db.connect(p, ScopeKey::Root, UserId::UNSET).unwrap();
        assert_eq!(db.artifact_status(p).unwrap(), ArtifactStatus::NoFeData);
    }

    #[test]
    fn evict_and_reload_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("arm.nas"), b"GRID 1").unwrap();

        let mut db = Database::new();
        let p = fe_part(&mut db, 1, "arm.nas");
        db.set_payload(p, b"GRID 1".to_vec()).unwrap();
        let before = db.checksum(p).unwrap();

        assert!(db.evict_payload(p).unwrap());
        assert!(!db.evict_payload(p).unwrap());
        assert!(db.reload_payload(p, dir.path()).unwrap());
        assert!(!db.reload_payload(p, dir.path()).unwrap());
        assert_eq!(db.checksum(p).unwrap(), before);
    }

    #[test]
    fn reload_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::new();
        let p = fe_part(&mut db, 1, "gone.nas");
        assert!(matches!(
            db.reload_payload(p, dir.path()),
            Err(StoreError::Payload { .. })
        ));
    }

    #[test]
    fn artifact_names_shared_on_equal_checksum() {
        let mut db = Database::new();
        let a = fe_part(&mut db, 1, "arm.nas");
        let b = fe_part(&mut db, 2, "other/arm.nas");
        let c = fe_part(&mut db, 3, "arm.bdf");
        db.set_payload(a, b"same".to_vec()).unwrap();
        db.set_payload(b, b"same".to_vec()).unwrap();
        db.set_payload(c, b"different".to_vec()).unwrap();

        db.assign_artifact_names().unwrap();
        let name = |h| db.entity(h).unwrap().data.as_part().unwrap().base_ftl_file.clone();
        assert_eq!(name(a), "arm.ftl");
        assert_eq!(name(b), "arm.ftl");
        assert_eq!(name(c), "arm_ftl1.ftl");
    }

    #[test]
    fn model_order_decides_who_keeps_the_plain_name() {
        let mut db = Database::new();
        let first = fe_part(&mut db, 1, "arm.nas");
        let second = fe_part(&mut db, 2, "arm.bdf");
        db.set_payload(first, b"one".to_vec()).unwrap();
        db.set_payload(second, b"two".to_vec()).unwrap();
        db.get_mut(second).unwrap().data.as_part_mut().unwrap().base_ftl_file = "arm.ftl".into();

        db.assign_artifact_names().unwrap();
        let name = |h| db.entity(h).unwrap().data.as_part().unwrap().base_ftl_file.clone();
        assert_eq!(name(first), "arm.ftl");
        assert_eq!(name(second), "arm_ftl1.ftl");
    }
}
