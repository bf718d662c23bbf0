//! Model-wide singleton kinds: mechanism, environment and options

use super::{FieldSet, FieldWriter};
use crate::solver::SolverRecord;
use fmdb_ref::{EntityRef, RefError};
use fmdb_types::{FieldError, FieldValue, TypeTag};

/// Global mechanism properties
#[derive(Debug, Clone, PartialEq)]
pub struct Mechanism {
    pub gravity: [f64; 3],
    pub position_tolerance: f64,
    pub max_concurrent_processes: i64,
}

impl Default for Mechanism {
    fn default() -> Self {
        Self {
            gravity: [0.0, 0.0, -9.81],
            position_tolerance: 1.0e-4,
            max_concurrent_processes: 1,
        }
    }
}

impl FieldSet for Mechanism {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.vec3("GRAVITY", self.gravity);
        out.real("POSITION_TOLERANCE", self.position_tolerance);
        out.int("MAX_CONCURRENT_PROCESSES", self.max_concurrent_processes);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "GRAVITY" => self.gravity = value.as_vec3()?,
            "POSITION_TOLERANCE" => self.position_tolerance = value.as_real()?,
            "MAX_CONCURRENT_PROCESSES" => self.max_concurrent_processes = value.as_int()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn solver_section(&self) -> Option<&'static str> {
        Some("ENVIRONMENT")
    }

    fn write_solver(&self, rec: &mut SolverRecord<'_>) {
        rec.reals("gravity", &self.gravity);
    }
}

/// Sea environment
#[derive(Debug, Clone, PartialEq)]
pub struct SeaState {
    pub water_density: f64,
    pub mean_sea_level: f64,
    pub wave_direction: [f64; 3],
}

impl Default for SeaState {
    fn default() -> Self {
        Self {
            water_density: 1000.0,
            mean_sea_level: 0.0,
            wave_direction: [1.0, 0.0, 0.0],
        }
    }
}

impl FieldSet for SeaState {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.real("WATER_DENSITY", self.water_density);
        out.real("MEAN_SEA_LEVEL", self.mean_sea_level);
        out.vec3("WAVE_DIRECTION", self.wave_direction);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "WATER_DENSITY" => self.water_density = value.as_real()?,
            "MEAN_SEA_LEVEL" => self.mean_sea_level = value.as_real()?,
            "WAVE_DIRECTION" => self.wave_direction = value.as_vec3()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn solver_section(&self) -> Option<&'static str> {
        Some("SEA_STATE")
    }

    fn write_solver(&self, rec: &mut SolverRecord<'_>) {
        rec.real("rhow", self.water_density);
        rec.real("seaLevel", self.mean_sea_level);
        rec.reals("waveDir", &self.wave_direction);
    }
}

/// Dynamics solver setup
///
/// Gravity and position tolerance used to live here. Values read from
/// old files are staged and moved to the [`Mechanism`] after resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub start_time: f64,
    pub stop_time: f64,
    pub time_incr: f64,
    pub min_time_incr: f64,
    pub time_incr_engine: EntityRef,
    staged_gravity: Option<[f64; 3]>,
    staged_position_tolerance: Option<f64>,
}

impl Default for Analysis {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            stop_time: 1.0,
            time_incr: 0.01,
            min_time_incr: 0.001,
            time_incr_engine: EntityRef::new(),
            staged_gravity: None,
            staged_position_tolerance: None,
        }
    }
}

impl Analysis {
    /// Keep a legacy gravity value for the post-resolution sweep
    pub fn stage_gravity(&mut self, gravity: [f64; 3]) {
        self.staged_gravity = Some(gravity);
    }

    /// Keep a legacy tolerance value for the post-resolution sweep
    pub fn stage_position_tolerance(&mut self, tolerance: f64) {
        self.staged_position_tolerance = Some(tolerance);
    }

    #[must_use]
    pub fn has_staged_values(&self) -> bool {
        self.staged_gravity.is_some() || self.staged_position_tolerance.is_some()
    }

    /// Hand over staged values, leaving nothing behind
    pub fn take_staged(&mut self) -> (Option<[f64; 3]>, Option<f64>) {
        (
            self.staged_gravity.take(),
            self.staged_position_tolerance.take(),
        )
    }
}

impl FieldSet for Analysis {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.real("START_TIME", self.start_time);
        out.real("END_TIME", self.stop_time);
        out.real("TIME_INCR", self.time_incr);
        out.real("MIN_TIME_INCREMENT", self.min_time_incr);
        out.reference("TIME_INCR_ENGINE", &self.time_incr_engine);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "START_TIME" => self.start_time = value.as_real()?,
            "END_TIME" => self.stop_time = value.as_real()?,
            "TIME_INCR" => self.time_incr = value.as_real()?,
            "MIN_TIME_INCREMENT" => self.min_time_incr = value.as_real()?,
            "TIME_INCR_ENGINE" => {
                self.time_incr_engine = EntityRef::from_value(value, &[TypeTag::Engine])?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn for_each_ref(&self, f: &mut dyn FnMut(&'static str, &EntityRef)) {
        f("TIME_INCR_ENGINE", &self.time_incr_engine);
    }

    fn for_each_ref_mut(&mut self, f: &mut dyn FnMut(&'static str, &mut EntityRef)) {
        f("TIME_INCR_ENGINE", &mut self.time_incr_engine);
    }
}

/// Fatigue histogram type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistType {
    /// Stress-life
    #[default]
    SN,
    /// Strain-life
    EN,
}

impl HistType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SN => "S_N",
            Self::EN => "E_N",
        }
    }

    fn parse(value: &FieldValue) -> Result<Self, FieldError> {
        match value.as_word()? {
            "S_N" => Ok(Self::SN),
            "E_N" => Ok(Self::EN),
            _ => Err(FieldError::expected("S_N or E_N", value)),
        }
    }
}

/// Strain-coat recovery setup
#[derive(Debug, Clone, PartialEq)]
pub struct FppOptions {
    pub start_time: f64,
    pub stop_time: f64,
    pub time_incr: f64,
    pub perform_rainflow: bool,
    pub hist_type: HistType,
    pub hist_range: (f64, f64),
    pub hist_n_bins: i64,
}

impl Default for FppOptions {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            stop_time: 1.0,
            time_incr: 0.01,
            perform_rainflow: true,
            hist_type: HistType::SN,
            hist_range: (-100.0, 100.0),
            hist_n_bins: 64,
        }
    }
}

impl FieldSet for FppOptions {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.real("START_TIME", self.start_time);
        out.real("STOP_TIME", self.stop_time);
        out.real("TIME_INCR", self.time_incr);
        out.bool("PERFORM_RAINFLOW", self.perform_rainflow);
        out.word("HIST_ANALYSIS_TYPE", self.hist_type.as_str());
        out.pair("HIST_RANGE", self.hist_range);
        out.int("HIST_N_BINS", self.hist_n_bins);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "START_TIME" => self.start_time = value.as_real()?,
            "STOP_TIME" => self.stop_time = value.as_real()?,
            "TIME_INCR" => self.time_incr = value.as_real()?,
            "PERFORM_RAINFLOW" => self.perform_rainflow = value.as_bool()?,
            "HIST_ANALYSIS_TYPE" => self.hist_type = HistType::parse(value)?,
            "HIST_RANGE" => {
                let v = value.as_vector()?;
                match v.as_slice() {
                    [min, max] => self.hist_range = (*min, *max),
                    _ => return Err(FieldError::expected("two numbers", value).into()),
                }
            }
            "HIST_N_BINS" => self.hist_n_bins = value.as_int()?,
            _ => return Ok(false),
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_staged_values_are_taken_once() {
        let mut analysis = Analysis::default();
        assert!(!analysis.has_staged_values());

        analysis.stage_gravity([0.0, -9.81, 0.0]);
        analysis.stage_position_tolerance(1.0e-3);
        assert!(analysis.has_staged_values());

        assert_eq!(analysis.take_staged(), (Some([0.0, -9.81, 0.0]), Some(1.0e-3)));
        assert_eq!(analysis.take_staged(), (None, None));
    }

    #[test]
    fn fpp_options_rejects_bad_range() {
        let mut options = FppOptions::default();
        let err = options.read_field("HIST_RANGE", &FieldValue::vector(&[1.0]));
        assert!(err.is_err());
        assert!(options
            .read_field("HIST_ANALYSIS_TYPE", &FieldValue::word("E_N"))
            .unwrap());
        assert_eq!(options.hist_type, HistType::EN);
    }

    #[test]
    fn analysis_ignores_relocated_fields() {
        let mut analysis = Analysis::default();
        let known = analysis
            .read_field("GRAVITY", &FieldValue::vector(&[0.0, 0.0, -1.0]))
            .unwrap();
        assert!(!known);
    }
}
