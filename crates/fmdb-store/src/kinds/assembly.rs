//! Sub-assemblies

use super::{FieldSet, FieldWriter};
use fmdb_ref::RefError;
use fmdb_types::FieldValue;

/// Nested scope owner
///
/// Members are stored inline after the assembly's own block unless
/// `model_file` names an external file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubAssembly {
    pub model_file: String,
    pub location: [f64; 3],
}

impl SubAssembly {
    /// Members live in a separate file
    #[inline]
    #[must_use]
    pub fn is_external(&self) -> bool {
        !self.model_file.is_empty()
    }
}

impl FieldSet for SubAssembly {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.text_if_set("MODEL_FILE", &self.model_file);
        out.vec3("LOCATION", self.location);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "MODEL_FILE" => self.model_file = value.as_text()?,
            "LOCATION" => self.location = value.as_vec3()?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}
