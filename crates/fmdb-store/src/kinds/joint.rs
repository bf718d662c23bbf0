//! Joints and joint frictions
//!
//! Revolute, ball and rigid joints share one field struct, as do the two
//! friction kinds; the variant of [`super::EntityData`] carries the kind.

use super::{FieldSet, FieldWriter};
use crate::solver::SolverRecord;
use fmdb_ref::{EntityRef, RefError};
use fmdb_types::{FieldValue, TypeTag};

const FRICTIONS: [TypeTag; 2] = [TypeTag::BearingFriction, TypeTag::PrismaticFriction];

/// Two-triad joint
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    kind: TypeTag,
    pub dependent_triad: EntityRef,
    pub independent_triad: EntityRef,
    pub friction: EntityRef,
    pub locked: bool,
}

impl Joint {
    #[must_use]
    pub fn new(kind: TypeTag) -> Self {
        Self {
            kind,
            dependent_triad: EntityRef::new(),
            independent_triad: EntityRef::new(),
            friction: EntityRef::new(),
            locked: false,
        }
    }
}

impl FieldSet for Joint {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.reference("DEPENDENT_TRIAD", &self.dependent_triad);
        out.reference("INDEPENDENT_TRIAD", &self.independent_triad);
        out.reference("FRICTION", &self.friction);
        out.bool("LOCKED", self.locked);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "DEPENDENT_TRIAD" => {
                self.dependent_triad = EntityRef::from_value(value, &[TypeTag::Triad])?;
            }
            "INDEPENDENT_TRIAD" => {
                self.independent_triad = EntityRef::from_value(value, &[TypeTag::Triad])?;
            }
            "FRICTION" => self.friction = EntityRef::from_value(value, &FRICTIONS)?,
            "LOCKED" => self.locked = value.as_bool()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn for_each_ref(&self, f: &mut dyn FnMut(&'static str, &EntityRef)) {
        f("DEPENDENT_TRIAD", &self.dependent_triad);
        f("INDEPENDENT_TRIAD", &self.independent_triad);
        f("FRICTION", &self.friction);
    }

    fn for_each_ref_mut(&mut self, f: &mut dyn FnMut(&'static str, &mut EntityRef)) {
        f("DEPENDENT_TRIAD", &mut self.dependent_triad);
        f("INDEPENDENT_TRIAD", &mut self.independent_triad);
        f("FRICTION", &mut self.friction);
    }

    fn solver_section(&self) -> Option<&'static str> {
        Some("MASTER_SLAVE_JOINT")
    }

    fn write_solver(&self, rec: &mut SolverRecord<'_>) {
        let kind = match self.kind {
            TypeTag::BallJoint => "BALL_JOINT",
            TypeTag::RigidJoint => "RIGID_JOINT",
            _ => "REVOLUTE_JOINT",
        };
        rec.word("type", kind);
        rec.reference("slaveId", &self.dependent_triad);
        rec.reference("masterId", &self.independent_triad);
        rec.reference("frictionId", &self.friction);
        rec.int("locked", i64::from(self.locked));
    }
}

/// Coulomb/Stribeck friction parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Friction {
    kind: TypeTag,
    pub prestress_load: f64,
    pub coulomb_coeff: f64,
    pub stribeck_magnitude: f64,
    pub stribeck_speed: f64,
}

impl Friction {
    #[must_use]
    pub fn new(kind: TypeTag) -> Self {
        Self {
            kind,
            prestress_load: 0.0,
            coulomb_coeff: 0.0,
            stribeck_magnitude: 0.0,
            stribeck_speed: 0.0,
        }
    }
}

impl FieldSet for Friction {
    fn write_fields(&self, out: &mut FieldWriter<'_>) {
        out.real("PRESTRESS_LOAD", self.prestress_load);
        out.real("COULOMB_COEFF", self.coulomb_coeff);
        out.real("STRIBECK_MAGNITUDE", self.stribeck_magnitude);
        out.real("CRITICAL_STRIBECK_SPEED", self.stribeck_speed);
    }

    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError> {
        match keyword {
            "PRESTRESS_LOAD" => self.prestress_load = value.as_real()?,
            "COULOMB_COEFF" => self.coulomb_coeff = value.as_real()?,
            "STRIBECK_MAGNITUDE" => self.stribeck_magnitude = value.as_real()?,
            "CRITICAL_STRIBECK_SPEED" => self.stribeck_speed = value.as_real()?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn solver_section(&self) -> Option<&'static str> {
        Some("FRICTION_SET")
    }

    fn write_solver(&self, rec: &mut SolverRecord<'_>) {
        let kind = if self.kind == TypeTag::PrismaticFriction {
            "PRISMATIC_FRICTION"
        } else {
            "BEARING_FRICTION"
        };
        rec.word("type", kind);
        rec.reals(
            "friction",
            &[
                self.prestress_load,
                self.coulomb_coeff,
                self.stribeck_magnitude,
                self.stribeck_speed,
            ],
        );
    }
}
