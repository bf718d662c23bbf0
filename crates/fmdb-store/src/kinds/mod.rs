//! Per-kind entity data
//!
//! Each entity kind has its own field struct implementing [`FieldSet`]:
//! how it writes its statements, how it reads them back, which reference
//! fields it holds, and what it contributes to the solver input.
//!
//! [`EntityData`] is the closed enum over all kinds.

mod assembly;
mod element;
mod function;
mod joint;
mod model;
mod part;
mod triad;

pub use assembly::SubAssembly;
pub use element::{AxialSpring, CtrlAmplifier, CtrlInput, CtrlLine, CtrlOutput, Load, LoadType, RelativeSensor, SimpleSensor};
pub use function::{Engine, FuncConstant, FuncRamp, FuncSinusoidal};
pub use joint::{Friction, Joint};
pub use model::{Analysis, FppOptions, HistType, Mechanism, SeaState};
pub use part::{ChecksumState, Part};
pub use triad::Triad;

use crate::solver::SolverRecord;
use fmdb_ref::{EntityRef, RefError, RefIdentity, RefList};
use fmdb_types::{Checksum, FieldValue, TypeTag};

/// Statement-level behaviour of one entity kind
pub trait FieldSet {
    /// Append this kind's statements in file order
    fn write_fields(&self, out: &mut FieldWriter<'_>);

    /// Apply one statement; `Ok(false)` means the keyword is unknown
    ///
    /// # Errors
    /// Returns error if the value does not fit the field
    fn read_field(&mut self, keyword: &str, value: &FieldValue) -> Result<bool, RefError>;

    /// Visit every reference field
    fn for_each_ref(&self, _f: &mut dyn FnMut(&'static str, &EntityRef)) {}

    /// Visit every reference field mutably
    fn for_each_ref_mut(&mut self, _f: &mut dyn FnMut(&'static str, &mut EntityRef)) {}

    /// Namelist section name, if this kind feeds the solver
    fn solver_section(&self) -> Option<&'static str> {
        None
    }

    /// Kind-specific solver record entries
    fn write_solver(&self, _rec: &mut SolverRecord<'_>) {}
}

/// Collects `KEYWORD = value` statements for one block
pub struct FieldWriter<'a> {
    ids: &'a dyn RefIdentity,
    fields: Vec<(&'static str, FieldValue)>,
}

impl<'a> FieldWriter<'a> {
    #[must_use]
    pub fn new(ids: &'a dyn RefIdentity) -> Self {
        Self {
            ids,
            fields: Vec::new(),
        }
    }

    #[inline]
    pub fn value(&mut self, keyword: &'static str, value: FieldValue) {
        self.fields.push((keyword, value));
    }

    #[inline]
    pub fn real(&mut self, keyword: &'static str, value: f64) {
        self.value(keyword, FieldValue::real(value));
    }

    #[inline]
    pub fn int(&mut self, keyword: &'static str, value: i64) {
        self.value(keyword, FieldValue::int(value));
    }

    #[inline]
    pub fn bool(&mut self, keyword: &'static str, value: bool) {
        self.value(keyword, FieldValue::bool(value));
    }

    #[inline]
    pub fn vec3(&mut self, keyword: &'static str, value: [f64; 3]) {
        self.value(keyword, FieldValue::vector(&value));
    }

    #[inline]
    pub fn pair(&mut self, keyword: &'static str, value: (f64, f64)) {
        self.value(keyword, FieldValue::vector(&[value.0, value.1]));
    }

    #[inline]
    pub fn word(&mut self, keyword: &'static str, value: &str) {
        self.value(keyword, FieldValue::word(value));
    }

    #[inline]
    pub fn text(&mut self, keyword: &'static str, value: &str) {
        self.value(keyword, FieldValue::text(value));
    }

    /// Quoted text, skipped when empty
    pub fn text_if_set(&mut self, keyword: &'static str, value: &str) {
        if !value.is_empty() {
            self.text(keyword, value);
        }
    }

    pub fn checksum(&mut self, keyword: &'static str, value: &Checksum) {
        if value.is_zero() {
            self.word(keyword, "0");
        } else {
            self.word(keyword, &value.to_string());
        }
    }

    /// Reference by the target's current identity; unset references are omitted
    pub fn reference(&mut self, keyword: &'static str, r: &EntityRef) {
        if let Some(target) = r.current_target(self.ids) {
            self.value(keyword, FieldValue::reference(target));
        }
    }

    /// Reference list; omitted when empty
    pub fn references(&mut self, keyword: &'static str, list: &RefList) {
        let targets = list.current_targets(self.ids);
        if !targets.is_empty() {
            self.value(keyword, FieldValue::Refs(targets));
        }
    }

    /// Collected statements
    #[must_use]
    pub fn finish(self) -> Vec<(&'static str, FieldValue)> {
        self.fields
    }
}

/// Parse a checksum statement; `0` means none
pub(crate) fn read_checksum(value: &FieldValue) -> Result<Checksum, RefError> {
    let word = value.as_word()?;
    if word == "0" {
        return Ok(Checksum::default());
    }
    word.parse::<Checksum>()
        .map_err(|_| fmdb_types::FieldError::expected("a checksum", value).into())
}

/// Field data of an entity, one variant per kind
#[derive(Debug, Clone, PartialEq)]
pub enum EntityData {
    Mechanism(Mechanism),
    SeaState(SeaState),
    Analysis(Analysis),
    FppOptions(FppOptions),
    Part(Part),
    Triad(Triad),
    RevJoint(Joint),
    BallJoint(Joint),
    RigidJoint(Joint),
    Engine(Engine),
    FuncConstant(FuncConstant),
    FuncSinusoidal(FuncSinusoidal),
    FuncRamp(FuncRamp),
    BearingFriction(Friction),
    PrismaticFriction(Friction),
    AxialSpring(AxialSpring),
    Load(Load),
    SimpleSensor(SimpleSensor),
    RelativeSensor(RelativeSensor),
    CtrlInput(CtrlInput),
    CtrlAmplifier(CtrlAmplifier),
    CtrlOutput(CtrlOutput),
    CtrlLine(CtrlLine),
    SubAssembly(SubAssembly),
}

macro_rules! each_kind {
    ($data:expr, $inner:ident => $body:expr) => {
        match $data {
            EntityData::Mechanism($inner) => $body,
            EntityData::SeaState($inner) => $body,
            EntityData::Analysis($inner) => $body,
            EntityData::FppOptions($inner) => $body,
            EntityData::Part($inner) => $body,
            EntityData::Triad($inner) => $body,
            EntityData::RevJoint($inner) => $body,
            EntityData::BallJoint($inner) => $body,
            EntityData::RigidJoint($inner) => $body,
            EntityData::Engine($inner) => $body,
            EntityData::FuncConstant($inner) => $body,
            EntityData::FuncSinusoidal($inner) => $body,
            EntityData::FuncRamp($inner) => $body,
            EntityData::BearingFriction($inner) => $body,
            EntityData::PrismaticFriction($inner) => $body,
            EntityData::AxialSpring($inner) => $body,
            EntityData::Load($inner) => $body,
            EntityData::SimpleSensor($inner) => $body,
            EntityData::RelativeSensor($inner) => $body,
            EntityData::CtrlInput($inner) => $body,
            EntityData::CtrlAmplifier($inner) => $body,
            EntityData::CtrlOutput($inner) => $body,
            EntityData::CtrlLine($inner) => $body,
            EntityData::SubAssembly($inner) => $body,
        }
    };
}

impl EntityData {
    /// Default data for a kind
    #[must_use]
    pub fn new(tag: TypeTag) -> Self {
        match tag {
            TypeTag::Mechanism => Self::Mechanism(Mechanism::default()),
            TypeTag::SeaState => Self::SeaState(SeaState::default()),
            TypeTag::Analysis => Self::Analysis(Analysis::default()),
            TypeTag::FppOptions => Self::FppOptions(FppOptions::default()),
            TypeTag::Part => Self::Part(Part::default()),
            TypeTag::Triad => Self::Triad(Triad::default()),
            TypeTag::RevJoint => Self::RevJoint(Joint::new(tag)),
            TypeTag::BallJoint => Self::BallJoint(Joint::new(tag)),
            TypeTag::RigidJoint => Self::RigidJoint(Joint::new(tag)),
            TypeTag::Engine => Self::Engine(Engine::default()),
            TypeTag::FuncConstant => Self::FuncConstant(FuncConstant::default()),
            TypeTag::FuncSinusoidal => Self::FuncSinusoidal(FuncSinusoidal::default()),
            TypeTag::FuncRamp => Self::FuncRamp(FuncRamp::default()),
            TypeTag::BearingFriction => Self::BearingFriction(Friction::new(tag)),
            TypeTag::PrismaticFriction => Self::PrismaticFriction(Friction::new(tag)),
            TypeTag::AxialSpring => Self::AxialSpring(AxialSpring::default()),
            TypeTag::Load => Self::Load(Load::default()),
            TypeTag::SimpleSensor => Self::SimpleSensor(SimpleSensor::default()),
            TypeTag::RelativeSensor => Self::RelativeSensor(RelativeSensor::default()),
            TypeTag::CtrlInput => Self::CtrlInput(CtrlInput::default()),
            TypeTag::CtrlAmplifier => Self::CtrlAmplifier(CtrlAmplifier::default()),
            TypeTag::CtrlOutput => Self::CtrlOutput(CtrlOutput),
            TypeTag::CtrlLine => Self::CtrlLine(CtrlLine::default()),
            TypeTag::SubAssembly => Self::SubAssembly(SubAssembly::default()),
        }
    }

    /// Kind of this data
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        match self {
            Self::Mechanism(_) => TypeTag::Mechanism,
            Self::SeaState(_) => TypeTag::SeaState,
            Self::Analysis(_) => TypeTag::Analysis,
            Self::FppOptions(_) => TypeTag::FppOptions,
            Self::Part(_) => TypeTag::Part,
            Self::Triad(_) => TypeTag::Triad,
            Self::RevJoint(_) => TypeTag::RevJoint,
            Self::BallJoint(_) => TypeTag::BallJoint,
            Self::RigidJoint(_) => TypeTag::RigidJoint,
            Self::Engine(_) => TypeTag::Engine,
            Self::FuncConstant(_) => TypeTag::FuncConstant,
            Self::FuncSinusoidal(_) => TypeTag::FuncSinusoidal,
            Self::FuncRamp(_) => TypeTag::FuncRamp,
            Self::BearingFriction(_) => TypeTag::BearingFriction,
            Self::PrismaticFriction(_) => TypeTag::PrismaticFriction,
            Self::AxialSpring(_) => TypeTag::AxialSpring,
            Self::Load(_) => TypeTag::Load,
            Self::SimpleSensor(_) => TypeTag::SimpleSensor,
            Self::RelativeSensor(_) => TypeTag::RelativeSensor,
            Self::CtrlInput(_) => TypeTag::CtrlInput,
            Self::CtrlAmplifier(_) => TypeTag::CtrlAmplifier,
            Self::CtrlOutput(_) => TypeTag::CtrlOutput,
            Self::CtrlLine(_) => TypeTag::CtrlLine,
            Self::SubAssembly(_) => TypeTag::SubAssembly,
        }
    }

    /// Kind behaviour as a trait object
    #[must_use]
    pub fn fields(&self) -> &dyn FieldSet {
        each_kind!(self, inner => inner as &dyn FieldSet)
    }

    /// Mutable kind behaviour as a trait object
    pub fn fields_mut(&mut self) -> &mut dyn FieldSet {
        each_kind!(self, inner => inner as &mut dyn FieldSet)
    }

    #[must_use]
    pub fn as_part(&self) -> Option<&Part> {
        match self {
            Self::Part(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_part_mut(&mut self) -> Option<&mut Part> {
        match self {
            Self::Part(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_triad(&self) -> Option<&Triad> {
        match self {
            Self::Triad(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_triad_mut(&mut self) -> Option<&mut Triad> {
        match self {
            Self::Triad(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_analysis_mut(&mut self) -> Option<&mut Analysis> {
        match self {
            Self::Analysis(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_mechanism_mut(&mut self) -> Option<&mut Mechanism> {
        match self {
            Self::Mechanism(m) => Some(m),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_sub_assembly(&self) -> Option<&SubAssembly> {
        match self {
            Self::SubAssembly(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sub_assembly_mut(&mut self) -> Option<&mut SubAssembly> {
        match self {
            Self::SubAssembly(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmdb_types::{Handle, RefTarget};

    struct NoIds;

    impl RefIdentity for NoIds {
        fn identity(&self, _handle: Handle) -> Option<RefTarget> {
            None
        }
    }

    #[test]
    fn entity_data_tag_matches_constructor() {
        for tag in TypeTag::ALL {
            assert_eq!(EntityData::new(tag).tag(), tag);
        }
    }

    #[test]
    fn entity_data_round_trips_own_fields() {
        for tag in TypeTag::ALL {
            let data = EntityData::new(tag);
            let mut writer = FieldWriter::new(&NoIds);
            data.fields().write_fields(&mut writer);

            let mut copy = EntityData::new(tag);
            for (keyword, value) in writer.finish() {
                let parsed = FieldValue::parse(&value.to_string()).unwrap();
                assert!(
                    copy.fields_mut().read_field(keyword, &parsed).unwrap(),
                    "{tag}: {keyword} not accepted"
                );
            }
            assert_eq!(copy, data, "{tag}");
        }
    }

    #[test]
    fn entity_data_rejects_unknown_keyword() {
        let mut data = EntityData::new(TypeTag::Triad);
        let unknown = data
            .fields_mut()
            .read_field("NO_SUCH_FIELD", &FieldValue::int(1))
            .unwrap();
        assert!(!unknown);
    }

    #[test]
    fn writer_omits_unset_references() {
        let mut writer = FieldWriter::new(&NoIds);
        writer.reference("OWNER_LINK", &EntityRef::new());
        writer.reference("ENGINE", &EntityRef::unresolved(RefTarget::root(TypeTag::Engine, 2)));
        let fields = writer.finish();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].0, "ENGINE");
        assert_eq!(fields[0].1.to_string(), "FcENGINE 2");
    }

    #[test]
    fn checksum_zero_is_written_as_zero() {
        let mut writer = FieldWriter::new(&NoIds);
        writer.checksum("SAVED_CS", &Checksum::default());
        let fields = writer.finish();
        assert_eq!(fields[0].1.to_string(), "0");
        assert!(read_checksum(&fields[0].1).unwrap().is_zero());
    }
}
