//! Triads: nodes connecting parts, joints and loads

use super::{FieldSet, FieldWriter};
use crate::solver::SolverRecord;
use fmdb_ref::{EntityRef, RefError};
use fmdb_types::{FieldValue, TypeTag};

#[derive(Debug, Clone, PartialEq)]
pub struct Triad {
    pub position: [f64; 3],
    pub owner_link: EntityRef,
    pub ndofs: i64,
    pub fe_node_no: i64,
    pub connector_type: String,
    pub init_velocity: [f64; 3],
    pub init_acceleration: [f64; 3],
}

impl Default for Triad {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            owner_link: EntityRef::new(),
            ndofs: 6,
            fe_node_no: -1,
            connector_type: "NONE".to_string(),
            init_velocity: [0.0; 3],
            init_acceleration: [0.0; 3],
        }
    }
}

impl FieldSet for Triad {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.vec3("POSITION", self.position);
        out.reference("OWNER_LINK", &self.owner_link);
        out.int("NDOFS", self.ndofs);
        out.int("FE_NODE_NO", self.fe_node_no);
        out.word("CONNECTOR_TYPE", &self.connector_type);
        out.vec3("INIT_VELOCITY", self.init_velocity);
        out.vec3("INIT_ACCELERATION", self.init_acceleration);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "POSITION" => self.position = value.as_vec3()?,
            "OWNER_LINK" => self.owner_link = EntityRef::from_value(value, &[TypeTag::Part])?,
            "NDOFS" => self.ndofs = value.as_int()?,
            "FE_NODE_NO" => self.fe_node_no = value.as_int()?,
            "CONNECTOR_TYPE" => self.connector_type = value.as_word()?.to_string(),
            "INIT_VELOCITY" => self.init_velocity = value.as_vec3()?,
            "INIT_ACCELERATION" => self.init_acceleration = value.as_vec3()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn for_each_ref(&self, f: &mut dyn FnMut(&'static str, &EntityRef)) {
        f("OWNER_LINK", &self.owner_link);
    }

    fn for_each_ref_mut(&mut self, f: &mut dyn FnMut(&'static str, &mut EntityRef)) {
        f("OWNER_LINK", &mut self.owner_link);
    }

    fn solver_section(&self) -> Option<&'static str> {
        Some("TRIAD")
    }

    fn write_solver(&self, rec: &mut SolverRecord<'_>) {
        rec.int("nDOFs", self.ndofs);
        rec.reals("ur", &self.position);
        rec.reference("supElId", &self.owner_link);
    }
}
