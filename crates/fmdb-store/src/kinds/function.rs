//! Engines and the function definitions they evaluate

use super::{FieldSet, FieldWriter};
use crate::solver::SolverRecord;
use fmdb_ref::{EntityRef, RefError};
use fmdb_types::{FieldValue, TypeTag};

const FUNCTIONS: [TypeTag; 3] = [TypeTag::FuncConstant, TypeTag::FuncSinusoidal, TypeTag::FuncRamp];
const SENSORS: [TypeTag; 2] = [TypeTag::SimpleSensor, TypeTag::RelativeSensor];

/// Function of a sensor value (or of time when no argument is set)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Engine {
    pub function: EntityRef,
    pub argument: EntityRef,
}

impl FieldSet for Engine {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.reference("FUNCTION", &self.function);
        out.reference("ARGUMENT", &self.argument);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "FUNCTION" => self.function = EntityRef::from_value(value, &FUNCTIONS)?,
            "ARGUMENT" => self.argument = EntityRef::from_value(value, &SENSORS)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn for_each_ref(&self, f: &mut dyn FnMut(&'static str, &EntityRef)) {
        f("FUNCTION", &self.function);
        f("ARGUMENT", &self.argument);
    }

    fn for_each_ref_mut(&mut self, f: &mut dyn FnMut(&'static str, &mut EntityRef)) {
        f("FUNCTION", &mut self.function);
        f("ARGUMENT", &mut self.argument);
    }

    fn solver_section(&self) -> Option<&'static str> {
        Some("ENGINE")
    }

    fn write_solver(&self, rec: &mut SolverRecord<'_>) {
        rec.reference("functionId", &self.function);
        rec.reference("sensorId", &self.argument);
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FuncConstant {
    pub value: f64,
}

impl FieldSet for FuncConstant {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.real("CONSTANT", self.value);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "CONSTANT" => self.value = value.as_real()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn solver_section(&self) -> Option<&'static str> {
        Some("FUNCTION")
    }

    fn write_solver(&self, rec: &mut SolverRecord<'_>) {
        rec.word("type", "CONSTANT");
        rec.reals("realData", &[self.value]);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncSinusoidal {
    pub frequency: f64,
    pub amplitude: f64,
    pub phase: f64,
    pub mean: f64,
}

impl Default for FuncSinusoidal {
    fn default() -> Self {
        Self {
            frequency: 1.0,
            amplitude: 1.0,
            phase: 0.0,
            mean: 0.0,
        }
    }
}

impl FieldSet for FuncSinusoidal {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.real("FREQUENCY", self.frequency);
        out.real("AMPLITUDE", self.amplitude);
        out.real("PHASE_ANGLE", self.phase);
        out.real("MEAN_VALUE", self.mean);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "FREQUENCY" => self.frequency = value.as_real()?,
            "AMPLITUDE" => self.amplitude = value.as_real()?,
            "PHASE_ANGLE" => self.phase = value.as_real()?,
            "MEAN_VALUE" => self.mean = value.as_real()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn solver_section(&self) -> Option<&'static str> {
        Some("FUNCTION")
    }

    fn write_solver(&self, rec: &mut SolverRecord<'_>) {
        rec.word("type", "SINUSOIDAL");
        rec.reals("realData", &[self.frequency, self.phase, self.amplitude, self.mean]);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncRamp {
    pub start: f64,
    pub slope: f64,
    pub delay: f64,
}

impl Default for FuncRamp {
    fn default() -> Self {
        Self {
            start: 0.0,
            slope: 1.0,
            delay: 0.0,
        }
    }
}

impl FieldSet for FuncRamp {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.real("START_VALUE", self.start);
        out.real("SLOPE", self.slope);
        out.real("DELAY", self.delay);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "START_VALUE" => self.start = value.as_real()?,
            "SLOPE" => self.slope = value.as_real()?,
            "DELAY" => self.delay = value.as_real()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn solver_section(&self) -> Option<&'static str> {
        Some("FUNCTION")
    }

    fn write_solver(&self, rec: &mut SolverRecord<'_>) {
        rec.word("type", "RAMP");
        rec.reals("realData", &[self.start, self.slope, self.delay]);
    }
}
