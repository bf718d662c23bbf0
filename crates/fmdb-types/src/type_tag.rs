//! The closed catalogue of entity kinds
//!
//! [`TypeTag`] names every concrete entity kind together with its file
//! keyword, reference name and ring presentation. Declaration order is the
//! ring-creation order, and therefore the serialization rank.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

/// Concrete entity kind
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TypeTag {
    Mechanism,
    SeaState,
    Analysis,
    FppOptions,
    Part,
    Triad,
    RevJoint,
    BallJoint,
    RigidJoint,
    Engine,
    FuncConstant,
    FuncSinusoidal,
    FuncRamp,
    BearingFriction,
    PrismaticFriction,
    AxialSpring,
    Load,
    SimpleSensor,
    RelativeSensor,
    CtrlInput,
    CtrlAmplifier,
    CtrlOutput,
    CtrlLine,
    SubAssembly,
}

/// Grouping ring over related kinds
///
/// Meta groups only structure the display tree and the file headers;
/// they never own members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetaGroup {
    Joints,
    FunctionDefinitions,
    Frictions,
    Sensors,
    ControlElements,
}

struct Descriptor {
    keyword: &'static str,
    ref_name: &'static str,
    ui_name: &'static str,
    label: &'static str,
    icon: Option<&'static str>,
    header: bool,
    meta: Option<MetaGroup>,
}

const fn d(
    keyword: &'static str,
    ref_name: &'static str,
    ui_name: &'static str,
    label: &'static str,
    icon: Option<&'static str>,
    header: bool,
    meta: Option<MetaGroup>,
) -> Descriptor {
    Descriptor {
        keyword,
        ref_name,
        ui_name,
        label,
        icon,
        header,
        meta,
    }
}

use self::MetaGroup::{ControlElements, Frictions, FunctionDefinitions, Joints, Sensors};

const DESCRIPTORS: [Descriptor; TypeTag::COUNT] = [
    d("MECHANISM", "FcMECHANISM", "Mechanism", "Mechanisms", None, false, None),
    d("SEA_STATE", "FcSEA_STATE", "Sea state", "Sea states", Some("sea"), false, None),
    d("ANALYSIS", "FcANALYSIS", "Analysis", "Analyses", None, false, None),
    d("FPPOPTIONS", "FcFPP_OPTIONS", "Fpp Options", "Fpp Options", None, false, None),
    d("LINK", "FcLINK", "Part", "Parts", Some("FELink"), true, None),
    d("TRIAD", "FcTRIAD", "Triad", "Triads", Some("triad"), true, None),
    d("REV_JOINT", "FcREV_JOINT", "Revolute Joint", "Revolute joints", Some("revJoint"), false, Some(Joints)),
    d("BALL_JOINT", "FcBALL_JOINT", "Ball Joint", "Ball joints", Some("ballJoint"), false, Some(Joints)),
    d("RIGID_JOINT", "FcRIGID_JOINT", "Rigid Joint", "Rigid joints", Some("rigidJoint"), false, Some(Joints)),
    d("ENGINE", "FcENGINE", "Function", "Functions", Some("function"), true, None),
    d("FUNC_CONSTANT", "FcfCONSTANT", "Constant", "Constants", None, false, Some(FunctionDefinitions)),
    d("FUNC_SINUSOIDAL", "FcfSINUSOIDAL", "Sine", "Sines", None, false, Some(FunctionDefinitions)),
    d("FUNC_RAMP", "FcfRAMP", "Ramp", "Ramps", None, false, Some(FunctionDefinitions)),
    d("BEARING_FRICTION", "FcBEARING_FRICTION", "Bearing friction", "Bearing frictions", Some("revJointFriction"), false, Some(Frictions)),
    d("PRISMATIC_FRICTION", "FcPRISMATIC_FRICTION", "Prismatic friction", "Prismatic frictions", Some("prismJointFriction"), false, Some(Frictions)),
    d("AXIAL_SPRING", "FcAXIAL_SPRING", "Axial Spring", "Axial springs", Some("spring"), true, None),
    d("LOAD", "FcLOAD", "Load", "Loads", Some("loadSmall"), true, None),
    d("SENSOR", "FcSIMPLE_SENSOR", "Sensor", "Simple sensors", Some("makeSimpleSensor"), false, Some(Sensors)),
    d("RELATIVE_SENSOR", "FcRELATIVE_SENSOR", "Relative Sensor", "Relative sensors", Some("makeRelativeSensor"), false, Some(Sensors)),
    d("CONTROL_INPUT", "FccINPUT", "Control Input", "Inputs", Some("ctrlElemIn"), false, Some(ControlElements)),
    d("CONTROL_AMPLIFIER", "FccAMPLIFIER", "Amplifier", "Amplifiers", Some("ctrlAmplifier"), false, Some(ControlElements)),
    d("CONTROL_OUTPUT", "FccOUTPUT", "Control Output", "Outputs", Some("ctrlElemOut"), false, Some(ControlElements)),
    d("CONTROL_LINE", "FcCONTROL_LINE", "Control Line", "Control Lines", None, false, None),
    d("SUBASSEMBLY", "FcSUBASSEMBLY", "Assembly", "Assemblies", None, true, None),
];

static BY_KEYWORD: Lazy<HashMap<&'static str, TypeTag>> =
    Lazy::new(|| TypeTag::ALL.iter().map(|t| (t.keyword(), *t)).collect());

static BY_REF_NAME: Lazy<HashMap<&'static str, TypeTag>> =
    Lazy::new(|| TypeTag::ALL.iter().map(|t| (t.ref_name(), *t)).collect());

impl TypeTag {
    /// Number of concrete kinds
    pub const COUNT: usize = 24;

    /// All kinds in ring-creation (serialization) order
    pub const ALL: [TypeTag; Self::COUNT] = [
        Self::Mechanism,
        Self::SeaState,
        Self::Analysis,
        Self::FppOptions,
        Self::Part,
        Self::Triad,
        Self::RevJoint,
        Self::BallJoint,
        Self::RigidJoint,
        Self::Engine,
        Self::FuncConstant,
        Self::FuncSinusoidal,
        Self::FuncRamp,
        Self::BearingFriction,
        Self::PrismaticFriction,
        Self::AxialSpring,
        Self::Load,
        Self::SimpleSensor,
        Self::RelativeSensor,
        Self::CtrlInput,
        Self::CtrlAmplifier,
        Self::CtrlOutput,
        Self::CtrlLine,
        Self::SubAssembly,
    ];

    fn descriptor(self) -> &'static Descriptor {
        &DESCRIPTORS[self as usize]
    }

    /// Block keyword in the model file
    #[inline]
    #[must_use]
    pub fn keyword(self) -> &'static str {
        self.descriptor().keyword
    }

    /// Type name used in reference tokens
    #[inline]
    #[must_use]
    pub fn ref_name(self) -> &'static str {
        self.descriptor().ref_name
    }

    /// Singular name used in diagnostics
    #[inline]
    #[must_use]
    pub fn ui_name(self) -> &'static str {
        self.descriptor().ui_name
    }

    /// Ring display label
    #[inline]
    #[must_use]
    pub fn label(self) -> &'static str {
        self.descriptor().label
    }

    #[inline]
    #[must_use]
    pub fn icon(self) -> Option<&'static str> {
        self.descriptor().icon
    }

    /// Whether the writer emits a `!*** label ***` line before members
    #[inline]
    #[must_use]
    pub fn prints_header(self) -> bool {
        self.descriptor().header
    }

    /// Grouping ring, if any
    #[inline]
    #[must_use]
    pub fn meta(self) -> Option<MetaGroup> {
        self.descriptor().meta
    }

    /// Serialization rank, fixed at ring creation
    #[inline]
    #[must_use]
    pub fn rank(self) -> u16 {
        self as u16
    }

    /// Kinds with at most one instance per model
    #[inline]
    #[must_use]
    pub fn is_model_singleton(self) -> bool {
        matches!(
            self,
            Self::Mechanism | Self::SeaState | Self::Analysis | Self::FppOptions
        )
    }

    /// Kinds whose entities own a nested scope
    #[inline]
    #[must_use]
    pub fn is_scope(self) -> bool {
        matches!(self, Self::SubAssembly)
    }

    /// Look up a kind by block keyword
    #[must_use]
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        BY_KEYWORD.get(keyword).copied()
    }

    /// Look up a kind by reference type name
    #[must_use]
    pub fn from_ref_name(name: &str) -> Option<Self> {
        BY_REF_NAME.get(name).copied()
    }
}

impl Display for TypeTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.ui_name())
    }
}

impl MetaGroup {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Joints => "Joints",
            Self::FunctionDefinitions => "Function definitions",
            Self::Frictions => "Frictions",
            Self::Sensors => "Sensors",
            Self::ControlElements => "Control elements",
        }
    }

    #[must_use]
    pub fn icon(self) -> Option<&'static str> {
        match self {
            Self::Joints => Some("revJoint"),
            Self::FunctionDefinitions => Some("function"),
            Self::Frictions => Some("friction"),
            Self::Sensors => Some("makeSimpleSensor"),
            Self::ControlElements => Some("control"),
        }
    }

    /// Member kinds, in rank order
    pub fn members(self) -> impl Iterator<Item = TypeTag> {
        TypeTag::ALL.into_iter().filter(move |t| t.meta() == Some(self))
    }
}
