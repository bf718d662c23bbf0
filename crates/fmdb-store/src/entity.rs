//! Entity records
//!
//! An [`Entity`] carries the three identities (handle, baseID, userID),
//! its owning scope, and the kind-specific [`EntityData`].

use crate::kinds::EntityData;
use fmdb_types::{BaseId, FieldValue, Handle, RefTarget, TypeTag, UserId};

/// Scope that owns an entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    /// The model root
    #[default]
    Root,
    /// The scope owned by a sub-assembly entity
    Assembly(Handle),
}

impl ScopeKey {
    #[inline]
    #[must_use]
    pub fn is_root(self) -> bool {
        matches!(self, Self::Root)
    }

    /// Owning sub-assembly, if not root
    #[inline]
    #[must_use]
    pub fn assembly(self) -> Option<Handle> {
        match self {
            Self::Root => None,
            Self::Assembly(h) => Some(h),
        }
    }
}

/// A model entity
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub(crate) base_id: BaseId,
    pub(crate) user_id: UserId,
    pub(crate) scope: ScopeKey,
    pub(crate) connected: bool,
    pub description: String,
    pub data: EntityData,
}

impl Entity {
    pub(crate) fn new(data: EntityData, base_id: BaseId) -> Self {
        Self {
            base_id,
            user_id: UserId::UNSET,
            scope: ScopeKey::Root,
            connected: false,
            description: String::new(),
            data,
        }
    }

    #[inline]
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        self.data.tag()
    }

    /// Model-wide unique ID, stable for the entity's whole life
    #[inline]
    #[must_use]
    pub fn base_id(&self) -> BaseId {
        self.base_id
    }

    /// ID unique within (kind, scope); unset while detached
    #[inline]
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[inline]
    #[must_use]
    pub fn scope(&self) -> ScopeKey {
        self.scope
    }

    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Process-wide singleton (the ground part)
    #[inline]
    #[must_use]
    pub fn is_ground(&self) -> bool {
        self.user_id.is_singleton()
    }
}

/// Header statements common to every block
///
/// `ID`, `BASE_ID` and `PARENT_ASSEMBLY` decide where a parsed entity is
/// connected, so they are collected apart from the kind fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockHeader {
    pub user_id: UserId,
    pub base_id: Option<BaseId>,
    pub parent: Option<RefTarget>,
}

impl BlockHeader {
    /// Apply one header statement; `Ok(false)` for other keywords
    ///
    /// # Errors
    /// Returns error if the value does not fit the header field
    pub fn read_field(
        &mut self,
        keyword: &str,
        value: &FieldValue,
    ) -> Result<bool, fmdb_ref::RefError> {
        match keyword {
            "ID" => {
                let id = value.as_int()?;
                self.user_id = UserId::new(i32::try_from(id).map_err(|_| {
                    fmdb_types::FieldError::expected("a 32-bit id", value)
                })?);
            }
            "BASE_ID" => {
                let id = value.as_int()?;
                self.base_id = u64::try_from(id).ok().filter(|id| *id > 0).map(BaseId::new);
            }
            "PARENT_ASSEMBLY" => {
                self.parent = value.as_reference()?;
                if let Some(parent) = &self.parent {
                    if !parent.tag.is_scope() {
                        return Err(fmdb_ref::RefError::WrongKind {
                            found: parent.tag,
                            accepts: vec![TypeTag::SubAssembly],
                        });
                    }
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Own scope path of the parent sub-assembly (root when unset)
    #[must_use]
    pub fn scope_path(&self) -> fmdb_types::ScopePath {
        self.parent
            .as_ref()
            .map_or_else(fmdb_types::ScopePath::root, |p| p.path.child(p.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmdb_types::ScopePath;

    #[test]
    fn header_reads_identity_fields() {
        let mut header = BlockHeader::default();
        assert!(header.read_field("ID", &FieldValue::int(4)).unwrap());
        assert!(header.read_field("BASE_ID", &FieldValue::int(17)).unwrap());
        assert!(header
            .read_field("PARENT_ASSEMBLY", &FieldValue::parse("FcSUBASSEMBLY 3 [1]").unwrap())
            .unwrap());
        assert!(!header.read_field("POSITION", &FieldValue::int(0)).unwrap());

        assert_eq!(header.user_id, UserId::new(4));
        assert_eq!(header.base_id, Some(BaseId::new(17)));
        assert_eq!(header.scope_path(), ScopePath::from_ids(&[1, 3]));
    }

    #[test]
    fn header_rejects_non_scope_parent() {
        let mut header = BlockHeader::default();
        let err = header.read_field("PARENT_ASSEMBLY", &FieldValue::parse("FcTRIAD 3").unwrap());
        assert!(err.is_err());
    }

    #[test]
    fn header_without_parent_is_root() {
        assert!(BlockHeader::default().scope_path().is_root());
    }
}
