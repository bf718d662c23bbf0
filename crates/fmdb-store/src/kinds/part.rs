//! Parts and their FE payload consistency state

use super::{read_checksum, FieldSet, FieldWriter};
use crate::solver::SolverRecord;
use fmdb_ref::{EntityRef, RefError, RefList};
use fmdb_types::{Checksum, FieldValue, TypeTag};
use std::sync::Arc;

/// Checksum bookkeeping for a part's payload
///
/// `cached` is the checksum of the payload as last computed; `saved` is
/// the checksum the current artifact was derived from. `needs_update`
/// is the dirty flag set on payload mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumState {
    pub cached: Checksum,
    pub saved: Checksum,
    pub needs_update: bool,
}

impl Default for ChecksumState {
    fn default() -> Self {
        Self {
            cached: Checksum::default(),
            saved: Checksum::default(),
            needs_update: true,
        }
    }
}

/// Rigid or flexible body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Part {
    pub original_fe_file: String,
    pub base_ftl_file: String,
    pub repository: String,
    pub mass: f64,
    pub checksum: ChecksumState,
    pub override_checksum: bool,
    pub load_engines: RefList,
    payload: Option<Arc<[u8]>>,
}

impl Part {
    /// Resident FE payload, if loaded
    #[inline]
    #[must_use]
    pub fn payload(&self) -> Option<&Arc<[u8]>> {
        self.payload.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_resident(&self) -> bool {
        self.payload.is_some()
    }

    /// Replace the payload and mark the checksum dirty
    pub fn set_payload(&mut self, bytes: impl Into<Arc<[u8]>>) {
        self.payload = Some(bytes.into());
        self.checksum.needs_update = true;
    }

    /// Install a payload read back from disk without marking it dirty
    pub(crate) fn restore_payload(&mut self, bytes: Arc<[u8]>) {
        self.payload = Some(bytes);
    }

    pub(crate) fn drop_payload(&mut self) -> bool {
        self.payload.take().is_some()
    }

    /// Whether this part carries FE data at all
    #[must_use]
    pub fn has_fe_data(&self) -> bool {
        self.payload.is_some() || !self.original_fe_file.is_empty()
    }

    /// Artifact base name derived from the FE file: stem with
    /// non-alphanumerics replaced by `_`, plus `.ftl`
    #[must_use]
    pub fn derived_ftl_name(&self) -> Option<String> {
        let file = self.original_fe_file.rsplit(['/', '\\']).next()?;
        let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
        if stem.is_empty() {
            return None;
        }
        let stem: String = stem
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        Some(format!("{stem}.ftl"))
    }
}

impl FieldSet for Part {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.text("ORIGINAL_FE_FILE", &self.original_fe_file);
        out.text("BASE_FTL_FILE", &self.base_ftl_file);
        out.text_if_set("PART_REPOSITORY", &self.repository);
        out.real("MASS", self.mass);
        out.checksum("CACHED_CHECK_SUM", &self.checksum.cached);
        out.checksum("SAVED_CS", &self.checksum.saved);
        out.bool("NEEDS_CS_UPDATE", self.checksum.needs_update);
        out.bool("OVERRIDE_CHECKSUM", self.override_checksum);
        out.references("LOAD_ENGINES", &self.load_engines);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "ORIGINAL_FE_FILE" => self.original_fe_file = value.as_text()?,
            "BASE_FTL_FILE" => self.base_ftl_file = value.as_text()?,
            "PART_REPOSITORY" => self.repository = value.as_text()?,
            "MASS" => self.mass = value.as_real()?,
            "CACHED_CHECK_SUM" => self.checksum.cached = read_checksum(value)?,
            "SAVED_CS" => self.checksum.saved = read_checksum(value)?,
            "NEEDS_CS_UPDATE" => self.checksum.needs_update = value.as_bool()?,
            "OVERRIDE_CHECKSUM" => self.override_checksum = value.as_bool()?,
            "LOAD_ENGINES" => self.load_engines = RefList::from_value(value, &[TypeTag::Engine])?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn for_each_ref(&self, f: &mut dyn FnMut(&'static str, &EntityRef)) {
        for r in self.load_engines.iter() {
            f("LOAD_ENGINES", r);
        }
    }

    fn for_each_ref_mut(&mut self, f: &mut dyn FnMut(&'static str, &mut EntityRef)) {
        for r in self.load_engines.iter_mut() {
            f("LOAD_ENGINES", r);
        }
        self.load_engines.compact();
    }

    fn solver_section(&self) -> Option<&'static str> {
        Some("SUP_EL")
    }

    fn write_solver(&self, rec: &mut SolverRecord<'_>) {
        rec.real("mass", self.mass);
        if !self.base_ftl_file.is_empty() {
            rec.text("feDataFile", &self.base_ftl_file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part_with_fe(file: &str) -> Part {
        Part {
            original_fe_file: file.to_string(),
            ..Part::default()
        }
    }

    #[test]
    fn part_derives_ftl_name_from_stem() {
        assert_eq!(
            part_with_fe("meshes/arm-left v2.nas").derived_ftl_name().as_deref(),
            Some("arm_left_v2.ftl")
        );
        assert_eq!(part_with_fe("C:\\fe\\hub.fem").derived_ftl_name().as_deref(), Some("hub.ftl"));
        assert_eq!(part_with_fe("").derived_ftl_name(), None);
    }

    #[test]
    fn part_payload_mutation_marks_dirty() {
        let mut part = Part::default();
        part.checksum.needs_update = false;
        part.set_payload(b"nodes".to_vec());
        assert!(part.checksum.needs_update);
        assert!(part.is_resident());
        assert!(part.drop_payload());
        assert!(!part.is_resident());
    }

    #[test]
    fn part_reads_checksums() {
        let mut part = Part::default();
        let cs = Checksum::compute(b"payload");
        assert!(part
            .read_field("CACHED_CHECK_SUM", &FieldValue::word(&cs.to_string()))
            .unwrap());
        assert_eq!(part.checksum.cached, cs);
        assert!(part
            .read_field("CACHED_CHECK_SUM", &FieldValue::word("zz"))
            .is_err());
    }
}
