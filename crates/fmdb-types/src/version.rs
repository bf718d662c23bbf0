//! Model file format versions

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Release number recorded in a model file header, e.g. `R7.4.1`
///
/// Ordered numerically so migrations can ask "does this file predate
/// the removal of a keyword".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FormatVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl FormatVersion {
    /// Format written by this library
    pub const CURRENT: Self = Self::new(8, 1, 0);

    #[inline]
    #[must_use]
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl Display for FormatVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "R{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for FormatVersion {
    type Err = VersionParseError;

    /// Accepts `R8.1.0`, `8.1` and build-suffixed forms such as `R7.4.1-i3`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix(['R', 'r']).unwrap_or(trimmed);
        let core = digits
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .next()
            .unwrap_or_default();

        let mut parts = core.split('.').filter(|p| !p.is_empty());
        let mut next = |required: bool| -> Result<u16, VersionParseError> {
            match parts.next() {
                Some(p) => p
                    .parse()
                    .map_err(|_| VersionParseError(s.to_string())),
                None if required => Err(VersionParseError(s.to_string())),
                None => Ok(0),
            }
        };

        let major = next(true)?;
        let minor = next(false)?;
        let patch = next(false)?;
        Ok(Self::new(major, minor, patch))
    }
}

/// Header version could not be read
#[derive(Debug, thiserror::Error)]
#[error("invalid format version: '{0}'")]
pub struct VersionParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_release_forms() {
        assert_eq!("R8.1.0".parse::<FormatVersion>().unwrap(), FormatVersion::new(8, 1, 0));
        assert_eq!("7.4".parse::<FormatVersion>().unwrap(), FormatVersion::new(7, 4, 0));
        assert_eq!("R7.4.1-i3".parse::<FormatVersion>().unwrap(), FormatVersion::new(7, 4, 1));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("ASCII".parse::<FormatVersion>().is_err());
        assert!("".parse::<FormatVersion>().is_err());
    }

    #[test]
    fn ordering_is_numeric() {
        let old = FormatVersion::new(4, 10, 0);
        let new = FormatVersion::new(5, 1, 0);
        assert!(old < new);
        assert!(FormatVersion::new(5, 0, 9) < new);
    }

    #[test]
    fn display_round_trips() {
        let v = FormatVersion::CURRENT;
        assert_eq!(v.to_string().parse::<FormatVersion>().unwrap(), v);
    }
}
