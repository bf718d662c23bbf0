//! Obsolete keyword migration
//!
//! A declarative per-kind table of keywords that older format versions
//! wrote. Each row applies only to files older than the release that
//! dropped the keyword. A row either renames the keyword or stages the
//! value until the block is complete, where a per-kind finisher folds the
//! staged values into the new fields.

use fmdb_ref::RefError;
use fmdb_store::kinds::HistType;
use fmdb_store::EntityData;
use fmdb_types::{FieldValue, FormatVersion, TypeTag};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// What to do with an obsolete keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read the value as if written under the new keyword
    Rename(&'static str),
    /// Keep the value for the block finisher
    Stage,
}

/// One migration table row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    pub tag: TypeTag,
    pub keyword: &'static str,
    /// First release that no longer writes the keyword
    pub removed_in: FormatVersion,
    /// Value assumed when the keyword is absent
    pub default: Option<&'static str>,
    pub action: Action,
}

const fn row(
    tag: TypeTag,
    keyword: &'static str,
    removed_in: FormatVersion,
    default: Option<&'static str>,
    action: Action,
) -> Migration {
    Migration {
        tag,
        keyword,
        removed_in,
        default,
        action,
    }
}

const R4_1: FormatVersion = FormatVersion::new(4, 1, 0);
const R4_3: FormatVersion = FormatVersion::new(4, 3, 0);
const R5_0: FormatVersion = FormatVersion::new(5, 0, 0);
const R5_1: FormatVersion = FormatVersion::new(5, 1, 0);

/// Every obsolete keyword the reader still understands
pub const MIGRATIONS: &[Migration] = &[
    row(TypeTag::Part, "OVERRIDE_LINK_CHECKSUM", R5_0, None, Action::Rename("OVERRIDE_CHECKSUM")),
    row(TypeTag::Part, "OVERRIDE_PART_CHECKSUM", R5_0, None, Action::Rename("OVERRIDE_CHECKSUM")),
    row(TypeTag::Triad, "GL_VEL", R5_1, None, Action::Rename("INIT_VELOCITY")),
    row(TypeTag::Triad, "GL_ACC", R5_1, None, Action::Rename("INIT_ACCELERATION")),
    row(TypeTag::Triad, "CONNETOR_TYPE", R4_3, None, Action::Rename("CONNECTOR_TYPE")),
    row(TypeTag::FppOptions, "HIST_MIN_X", R4_1, Some("-100"), Action::Stage),
    row(TypeTag::FppOptions, "HIST_MAX_X", R4_1, Some("100"), Action::Stage),
    row(TypeTag::FppOptions, "HIST_ABS_MAX_STRESS_TYPE", R4_1, Some("false"), Action::Stage),
    row(TypeTag::FppOptions, "HIST_ABS_MAX_STRAIN_TYPE", R4_1, Some("true"), Action::Stage),
    row(TypeTag::FppOptions, "STRESS_SCALE_FACTOR", R4_1, Some("1e-6"), Action::Stage),
    row(TypeTag::Analysis, "GRAVITY", R5_1, None, Action::Stage),
    row(TypeTag::Analysis, "POSITION_TOLERANCE", R5_1, None, Action::Stage),
];

static BY_KEYWORD: Lazy<HashMap<(TypeTag, &'static str), &'static Migration>> =
    Lazy::new(|| MIGRATIONS.iter().map(|m| ((m.tag, m.keyword), m)).collect());

static BLOCK_ALIASES: Lazy<HashMap<&'static str, TypeTag>> = Lazy::new(|| {
    HashMap::from([
        ("FUNC_REV_JNT_FRICTION", TypeTag::BearingFriction),
        ("FUNC_PRISM_JNT_FRICTION", TypeTag::PrismaticFriction),
    ])
});

/// Kind for a block keyword, including retired block names
#[must_use]
pub fn block_kind(keyword: &str) -> Option<TypeTag> {
    TypeTag::from_keyword(keyword).or_else(|| BLOCK_ALIASES.get(keyword).copied())
}

/// Migration row for `keyword` in a `tag` block of a file at `version`
#[must_use]
pub fn lookup(tag: TypeTag, keyword: &str, version: FormatVersion) -> Option<&'static Migration> {
    BY_KEYWORD
        .get(&(tag, keyword))
        .copied()
        .filter(|m| version < m.removed_in)
}

fn table_default(tag: TypeTag, keyword: &str) -> f64 {
    BY_KEYWORD
        .get(&(tag, keyword))
        .and_then(|m| m.default)
        .and_then(|d| d.parse().ok())
        .unwrap_or_default()
}

/// Staged obsolete values of the block being read
#[derive(Debug, Default)]
pub struct Staged {
    values: IndexMap<&'static str, FieldValue>,
}

impl Staged {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, keyword: &'static str, value: FieldValue) {
        self.values.insert(keyword, value);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn was_on_file(&self, keyword: &str) -> bool {
        self.values.contains_key(keyword)
    }

    fn real(&self, keyword: &str) -> Result<Option<f64>, RefError> {
        self.values.get(keyword).map(FieldValue::as_real).transpose().map_err(Into::into)
    }

    fn flag(&self, keyword: &str) -> Result<Option<bool>, RefError> {
        self.values.get(keyword).map(FieldValue::as_bool).transpose().map_err(Into::into)
    }

    /// Fold staged values into the block's data; returns warnings
    ///
    /// # Errors
    /// Returns error if a staged value has the wrong shape
    pub fn finish(self, data: &mut EntityData) -> Result<Vec<String>, RefError> {
        let mut warnings = Vec::new();
        if self.is_empty() {
            return Ok(warnings);
        }
        match data {
            EntityData::FppOptions(options) => {
                if let (Some(min), Some(max)) = (self.real("HIST_MIN_X")?, self.real("HIST_MAX_X")?) {
                    options.hist_range = (min, max);
                }
                if let (Some(stress), Some(strain)) = (
                    self.flag("HIST_ABS_MAX_STRESS_TYPE")?,
                    self.flag("HIST_ABS_MAX_STRAIN_TYPE")?,
                ) {
                    if stress {
                        options.hist_type = HistType::SN;
                    } else if strain {
                        options.hist_type = HistType::EN;
                    }
                }
                if self.was_on_file("STRESS_SCALE_FACTOR") && options.perform_rainflow {
                    let factor = match self.real("STRESS_SCALE_FACTOR")? {
                        Some(factor) => factor,
                        None => table_default(TypeTag::FppOptions, "STRESS_SCALE_FACTOR"),
                    };
                    warnings.push(format!(
                        "A stress scale factor to MPa ({factor}) was stored with the strain coat \
                         recovery setup. It is now derived from the model database units."
                    ));
                }
            }
            EntityData::Analysis(analysis) => {
                if let Some(gravity) = self.values.get("GRAVITY") {
                    analysis.stage_gravity(gravity.as_vec3()?);
                }
                if let Some(tolerance) = self.real("POSITION_TOLERANCE")? {
                    analysis.stage_position_tolerance(tolerance);
                }
            }
            _ => {}
        }
        Ok(warnings)
    }
}
