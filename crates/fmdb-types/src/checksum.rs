//! Payload checksums
//!
//! Provides [`Checksum`], the 32-byte digest that gates re-derivation of
//! expensive artifacts (reduced FE data and the like).

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte payload checksum (Blake3)
///
/// Compared against the last-saved value to decide whether a derived
/// artifact is still valid. Cheap to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Checksum([u8; 32]);

impl Checksum {
    /// Create a checksum from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create checksum from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ChecksumError> {
        if bytes.len() != 32 {
            return Err(ChecksumError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(bytes);
        Ok(Self(arr))
    }

    /// Compute the checksum of a payload
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Compute one checksum over several payload pieces
    ///
    /// Equivalent to [`Checksum::compute`] over the concatenation.
    #[must_use]
    pub fn compute_parts<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        Self::new(*hasher.finalize().as_bytes())
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// Check if checksum is all zeros (never computed)
    #[inline]
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        let mut i = 0;
        while i < 32 {
            if self.0[i] != 0 {
                return false;
            }
            i += 1;
        }
        true
    }
}

impl Display for Checksum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for Checksum {
    type Err = ChecksumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Self([0; 32])
    }
}

impl serde::Serialize for Checksum {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_string())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

impl<'de> serde::Deserialize<'de> for Checksum {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct ChecksumVisitor;

        impl<'de> serde::de::Visitor<'de> for ChecksumVisitor {
            type Value = Checksum;

            fn expecting(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
                formatter.write_str("a 32-byte checksum as hex string or byte array")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                value.parse().map_err(serde::de::Error::custom)
            }

            fn visit_bytes<E>(self, value: &[u8]) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Checksum::from_slice(value).map_err(serde::de::Error::custom)
            }
        }

        if deserializer.is_human_readable() {
            deserializer.deserialize_str(ChecksumVisitor)
        } else {
            deserializer.deserialize_bytes(ChecksumVisitor)
        }
    }
}

/// Errors that can occur when decoding checksums
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// Invalid checksum length
    #[error("invalid checksum length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_from_slice_invalid_length() {
        let result = Checksum::from_slice(&[1u8; 31]);
        assert!(matches!(
            result,
            Err(ChecksumError::InvalidLength { expected: 32, actual: 31 })
        ));
    }

    #[test]
    fn checksum_compute_deterministic() {
        let data = b"CQUAD4 1 1 2 3 4";
        assert_eq!(Checksum::compute(data), Checksum::compute(data));
    }

    #[test]
    fn checksum_single_byte_change_differs() {
        let a = Checksum::compute(b"GRID 1 0.0 0.0 0.0");
        let b = Checksum::compute(b"GRID 1 0.0 0.0 0.1");
        assert_ne!(a, b);
    }

    #[test]
    fn checksum_parts_match_concatenation() {
        let whole = Checksum::compute(b"headerbody");
        let parts = Checksum::compute_parts([b"header".as_slice(), b"body".as_slice()]);
        assert_eq!(whole, parts);
    }

    #[test]
    fn checksum_display_and_parse() {
        let cs = Checksum::compute(b"mesh");
        let parsed: Checksum = cs.to_string().parse().unwrap();
        assert_eq!(cs, parsed);
    }

    #[test]
    fn checksum_short_is_prefix() {
        let cs = Checksum::compute(b"mesh");
        let short = cs.short();
        assert_eq!(short.len(), 16);
        assert!(cs.to_string().starts_with(&short));
    }

    #[test]
    fn checksum_default_is_zero() {
        assert!(Checksum::default().is_zero());
        assert!(!Checksum::compute(b"mesh").is_zero());
    }

    #[test]
    fn checksum_serde_json_is_hex_string() {
        let cs = Checksum::compute(b"mesh");
        let json = serde_json::to_string(&cs).unwrap();
        assert_eq!(json, format!("\"{cs}\""));
        let decoded: Checksum = serde_json::from_str(&json).unwrap();
        assert_eq!(cs, decoded);
    }
}
