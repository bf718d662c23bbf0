//! Resolution summaries
//!
//! A resolve sweep never fails. Lookups that miss are collected in a
//! [`ResolveReport`] and flushed once at the end of a load.

use fmdb_types::RefTarget;
use serde::{Serialize, Serializer};
use std::fmt::{self, Display, Formatter};

/// A reference whose target could not be found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingRef {
    /// Identity string of the entity holding the reference
    pub owner: String,
    /// Field keyword
    pub field: &'static str,
    /// Triple that failed to resolve
    #[serde(serialize_with = "as_display")]
    pub target: RefTarget,
}

impl Display for DanglingRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} refers to non-existing {}",
            self.owner, self.field, self.target
        )
    }
}

fn as_display<S: Serializer>(target: &RefTarget, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(target)
}

/// Counts and misses of one resolve sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveReport {
    /// References newly bound to a handle
    pub resolved: usize,
    /// References that were already bound
    pub already_resolved: usize,
    /// Misses, in sweep order
    pub dangling: Vec<DanglingRef>,
}

impl ResolveReport {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty()
    }

    /// Record one miss
    pub fn dangling(&mut self, owner: String, field: &'static str, target: RefTarget) {
        self.dangling.push(DanglingRef {
            owner,
            field,
            target,
        });
    }

    /// Fold another sweep's counts into this one
    pub fn merge(&mut self, other: Self) {
        self.resolved += other.resolved;
        self.already_resolved += other.already_resolved;
        self.dangling.extend(other.dangling);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmdb_types::TypeTag;

    #[test]
    fn report_collects_and_merges() {
        let mut a = ResolveReport::new();
        a.resolved = 2;
        assert!(a.is_clean());

        let mut b = ResolveReport::new();
        b.dangling(
            "Triad [1]".to_string(),
            "OWNER_LINK",
            RefTarget::root(TypeTag::Part, 4),
        );
        a.merge(b);

        assert_eq!(a.resolved, 2);
        assert_eq!(a.dangling.len(), 1);
        assert_eq!(
            a.dangling[0].to_string(),
            "Triad [1]: OWNER_LINK refers to non-existing FcLINK 4"
        );
    }

    #[test]
    fn report_serializes_targets_as_text() {
        let mut report = ResolveReport::new();
        report.dangling("Load [2]".into(), "ENGINE", RefTarget::root(TypeTag::Engine, 7));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["dangling"][0]["target"], "FcENGINE 7");
    }
}
