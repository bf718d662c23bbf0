//! Springs, loads, sensors and control elements

use super::{FieldSet, FieldWriter};
use crate::solver::SolverRecord;
use fmdb_ref::{EntityRef, RefError};
use fmdb_types::{FieldError, FieldValue, TypeTag};

const CONTROL_ELEMENTS: [TypeTag; 3] = [TypeTag::CtrlInput, TypeTag::CtrlAmplifier, TypeTag::CtrlOutput];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxialSpring {
    pub triad1: EntityRef,
    pub triad2: EntityRef,
    pub spring_function: EntityRef,
    pub stiffness: f64,
}

impl FieldSet for AxialSpring {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.reference("TRIAD1", &self.triad1);
        out.reference("TRIAD2", &self.triad2);
        out.reference("SPRING_FUNCTION", &self.spring_function);
        out.real("INIT_STIFFNESS", self.stiffness);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "TRIAD1" => self.triad1 = EntityRef::from_value(value, &[TypeTag::Triad])?,
            "TRIAD2" => self.triad2 = EntityRef::from_value(value, &[TypeTag::Triad])?,
            "SPRING_FUNCTION" => {
                self.spring_function = EntityRef::from_value(value, &[TypeTag::Engine])?;
            }
            "INIT_STIFFNESS" => self.stiffness = value.as_real()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn for_each_ref(&self, f: &mut dyn FnMut(&'static str, &EntityRef)) {
        f("TRIAD1", &self.triad1);
        f("TRIAD2", &self.triad2);
        f("SPRING_FUNCTION", &self.spring_function);
    }

    fn for_each_ref_mut(&mut self, f: &mut dyn FnMut(&'static str, &mut EntityRef)) {
        f("TRIAD1", &mut self.triad1);
        f("TRIAD2", &mut self.triad2);
        f("SPRING_FUNCTION", &mut self.spring_function);
    }

    fn solver_section(&self) -> Option<&'static str> {
        Some("SPRING_ELEMENT")
    }

    fn write_solver(&self, rec: &mut SolverRecord<'_>) {
        rec.reference("triad1Id", &self.triad1);
        rec.reference("triad2Id", &self.triad2);
        rec.real("stiffness", self.stiffness);
        rec.reference("stiffnessEngineId", &self.spring_function);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadType {
    #[default]
    Force,
    Torque,
}

/// Point force or torque on a triad
#[derive(Debug, Clone, PartialEq)]
pub struct Load {
    pub owner_triad: EntityRef,
    pub engine: EntityRef,
    pub load_type: LoadType,
    pub magnitude: f64,
    pub direction: [f64; 3],
}

impl Default for Load {
    fn default() -> Self {
        Self {
            owner_triad: EntityRef::new(),
            engine: EntityRef::new(),
            load_type: LoadType::Force,
            magnitude: 0.0,
            direction: [0.0, 0.0, 1.0],
        }
    }
}

impl FieldSet for Load {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.reference("OWNER_TRIAD", &self.owner_triad);
        out.reference("ENGINE", &self.engine);
        out.word(
            "LOAD_TYPE",
            match self.load_type {
                LoadType::Force => "FORCE",
                LoadType::Torque => "TORQUE",
            },
        );
        out.real("MAGNITUDE", self.magnitude);
        out.vec3("DIRECTION", self.direction);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "OWNER_TRIAD" => self.owner_triad = EntityRef::from_value(value, &[TypeTag::Triad])?,
            "ENGINE" => self.engine = EntityRef::from_value(value, &[TypeTag::Engine])?,
            "LOAD_TYPE" => {
                self.load_type = match value.as_word()? {
                    "FORCE" => LoadType::Force,
                    "TORQUE" => LoadType::Torque,
                    _ => return Err(FieldError::expected("FORCE or TORQUE", value).into()),
                }
            }
            "MAGNITUDE" => self.magnitude = value.as_real()?,
            "DIRECTION" => self.direction = value.as_vec3()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn for_each_ref(&self, f: &mut dyn FnMut(&'static str, &EntityRef)) {
        f("OWNER_TRIAD", &self.owner_triad);
        f("ENGINE", &self.engine);
    }

    fn for_each_ref_mut(&mut self, f: &mut dyn FnMut(&'static str, &mut EntityRef)) {
        f("OWNER_TRIAD", &mut self.owner_triad);
        f("ENGINE", &mut self.engine);
    }

    fn solver_section(&self) -> Option<&'static str> {
        Some("FORCE")
    }

    fn write_solver(&self, rec: &mut SolverRecord<'_>) {
        rec.word(
            "type",
            match self.load_type {
                LoadType::Force => "FORCE",
                LoadType::Torque => "MOMENT",
            },
        );
        rec.reference("triadId", &self.owner_triad);
        rec.real("f0", self.magnitude);
        rec.reals("v1", &self.direction);
        rec.reference("f1", &self.engine);
    }
}

/// Measures one entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimpleSensor {
    pub measured: EntityRef,
}

impl FieldSet for SimpleSensor {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.reference("MEASURED", &self.measured);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "MEASURED" => self.measured = EntityRef::from_value(value, &[])?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn for_each_ref(&self, f: &mut dyn FnMut(&'static str, &EntityRef)) {
        f("MEASURED", &self.measured);
    }

    fn for_each_ref_mut(&mut self, f: &mut dyn FnMut(&'static str, &mut EntityRef)) {
        f("MEASURED", &mut self.measured);
    }
}

/// Measures the relation between two triads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelativeSensor {
    pub measured_start: EntityRef,
    pub measured_end: EntityRef,
}

impl FieldSet for RelativeSensor {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.reference("MEASURED_START", &self.measured_start);
        out.reference("MEASURED_END", &self.measured_end);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "MEASURED_START" => {
                self.measured_start = EntityRef::from_value(value, &[TypeTag::Triad])?;
            }
            "MEASURED_END" => self.measured_end = EntityRef::from_value(value, &[TypeTag::Triad])?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn for_each_ref(&self, f: &mut dyn FnMut(&'static str, &EntityRef)) {
        f("MEASURED_START", &self.measured_start);
        f("MEASURED_END", &self.measured_end);
    }

    fn for_each_ref_mut(&mut self, f: &mut dyn FnMut(&'static str, &mut EntityRef)) {
        f("MEASURED_START", &mut self.measured_start);
        f("MEASURED_END", &mut self.measured_end);
    }
}

/// Control system input driven by an engine
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CtrlInput {
    pub engine: EntityRef,
}

impl FieldSet for CtrlInput {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.reference("ENGINE", &self.engine);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "ENGINE" => self.engine = EntityRef::from_value(value, &[TypeTag::Engine])?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn for_each_ref(&self, f: &mut dyn FnMut(&'static str, &EntityRef)) {
        f("ENGINE", &self.engine);
    }

    fn for_each_ref_mut(&mut self, f: &mut dyn FnMut(&'static str, &mut EntityRef)) {
        f("ENGINE", &mut self.engine);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CtrlAmplifier {
    pub rate: f64,
}

impl Default for CtrlAmplifier {
    fn default() -> Self {
        Self { rate: 1.0 }
    }
}

impl FieldSet for CtrlAmplifier {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.real("RATE", self.rate);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "RATE" => self.rate = value.as_real()?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CtrlOutput;

impl FieldSet for CtrlOutput {
    fn write_fields(&self, _out: &mut FieldWriter<'_>) {}

    fn read_field(&mut self, _keyword: &str, _value: &FieldValue) -> Result<bool, RefError> {
        Ok(false)
    }
}

/// Signal line between two control elements
#[derive(Debug, Clone, PartialEq)]
pub struct CtrlLine {
    pub start_element: EntityRef,
    pub end_element: EntityRef,
    pub end_port: i64,
}

impl Default for CtrlLine {
    fn default() -> Self {
        Self {
            start_element: EntityRef::new(),
            end_element: EntityRef::new(),
            end_port: 1,
        }
    }
}

impl FieldSet for CtrlLine {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.reference("START_ELEMENT", &self.start_element);
        out.reference("END_ELEMENT", &self.end_element);
        out.int("END_PORT", self.end_port);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "START_ELEMENT" => self.start_element = EntityRef::from_value(value, &CONTROL_ELEMENTS)?,
            "END_ELEMENT" => self.end_element = EntityRef::from_value(value, &CONTROL_ELEMENTS)?,
            "END_PORT" => self.end_port = value.as_int()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn for_each_ref(&self, f: &mut dyn FnMut(&'static str, &EntityRef)) {
        f("START_ELEMENT", &self.start_element);
        f("END_ELEMENT", &self.end_element);
    }

    fn for_each_ref_mut(&mut self, f: &mut dyn FnMut(&'static str, &mut EntityRef)) {
        f("START_ELEMENT", &mut self.start_element);
        f("END_ELEMENT", &mut self.end_element);
    }
}
