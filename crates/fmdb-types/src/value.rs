//! Field values as they appear in model file statements
//!
//! [`FieldValue`] keeps bare tokens as text and interprets them on access,
//! so `1`, `1.0` and a checksum hex string are all read the way the
//! receiving field expects.

use crate::ids::UserId;
use crate::scope_path::ScopePath;
use crate::type_tag::TypeTag;
use std::fmt::{self, Display, Formatter};

/// Textual reference triple: (type, userID, scope path)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefTarget {
    pub tag: TypeTag,
    pub id: UserId,
    pub path: ScopePath,
}

impl RefTarget {
    #[inline]
    #[must_use]
    pub fn new(tag: TypeTag, id: UserId, path: ScopePath) -> Self {
        Self { tag, id, path }
    }

    /// Target in the root scope
    #[inline]
    #[must_use]
    pub fn root(tag: TypeTag, id: i32) -> Self {
        Self::new(tag, UserId::new(id), ScopePath::root())
    }
}

impl Display for RefTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.tag.ref_name(), self.id)?;
        if !self.path.is_root() {
            write!(f, " {}", self.path)?;
        }
        Ok(())
    }
}

/// Right-hand side of a `KEYWORD = value;` statement
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Quoted string, unescaped
    Text(String),
    /// Whitespace-separated bare tokens
    Tokens(Vec<String>),
    /// One or more reference tokens
    Refs(Vec<RefTarget>),
}

impl FieldValue {
    #[must_use]
    pub fn real(value: f64) -> Self {
        Self::Tokens(vec![format_real(value)])
    }

    #[must_use]
    pub fn int(value: i64) -> Self {
        Self::Tokens(vec![value.to_string()])
    }

    #[must_use]
    pub fn bool(value: bool) -> Self {
        Self::word(if value { "true" } else { "false" })
    }

    #[must_use]
    pub fn vector(values: &[f64]) -> Self {
        Self::Tokens(values.iter().copied().map(format_real).collect())
    }

    #[must_use]
    pub fn word(value: &str) -> Self {
        Self::Tokens(vec![value.to_string()])
    }

    #[must_use]
    pub fn text(value: &str) -> Self {
        Self::Text(value.to_string())
    }

    #[must_use]
    pub fn reference(target: RefTarget) -> Self {
        Self::Refs(vec![target])
    }

    /// Parse the raw text between `=` and `;`
    ///
    /// # Errors
    /// Returns error for unterminated strings and broken reference tokens
    pub fn parse(raw: &str) -> Result<Self, FieldError> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix('"') {
            return parse_quoted(rest).map(Self::Text);
        }

        let tokens: Vec<&str> = raw.split_whitespace().collect();
        match tokens.first() {
            Some(first) if TypeTag::from_ref_name(first).is_some() => {
                parse_refs(raw).map(Self::Refs)
            }
            _ => Ok(Self::Tokens(tokens.into_iter().map(str::to_string).collect())),
        }
    }

    fn single(&self, expected: &'static str) -> Result<&str, FieldError> {
        match self {
            Self::Tokens(t) if t.len() == 1 => Ok(&t[0]),
            other => Err(FieldError::expected(expected, other)),
        }
    }

    /// Single numeric token
    ///
    /// # Errors
    /// Returns error if the value is not one number
    pub fn as_real(&self) -> Result<f64, FieldError> {
        let tok = self.single("a real number")?;
        tok.parse().map_err(|_| FieldError::expected("a real number", self))
    }

    /// Single integer token
    ///
    /// # Errors
    /// Returns error if the value is not one integer
    pub fn as_int(&self) -> Result<i64, FieldError> {
        let tok = self.single("an integer")?;
        tok.parse().map_err(|_| FieldError::expected("an integer", self))
    }

    /// `true`/`false`, also accepting `1`/`0`
    ///
    /// # Errors
    /// Returns error for any other token
    pub fn as_bool(&self) -> Result<bool, FieldError> {
        match self.single("a boolean")? {
            "true" | "TRUE" | "1" => Ok(true),
            "false" | "FALSE" | "0" => Ok(false),
            _ => Err(FieldError::expected("a boolean", self)),
        }
    }

    /// Any number of numeric tokens
    ///
    /// # Errors
    /// Returns error if a token is not numeric
    pub fn as_vector(&self) -> Result<Vec<f64>, FieldError> {
        match self {
            Self::Tokens(t) => t
                .iter()
                .map(|tok| tok.parse().map_err(|_| FieldError::expected("numbers", self)))
                .collect(),
            other => Err(FieldError::expected("numbers", other)),
        }
    }

    /// Exactly three numeric tokens
    ///
    /// # Errors
    /// Returns error for any other shape
    pub fn as_vec3(&self) -> Result<[f64; 3], FieldError> {
        let v = self.as_vector()?;
        <[f64; 3]>::try_from(v.as_slice()).map_err(|_| FieldError::expected("three numbers", self))
    }

    /// Single bare word
    ///
    /// # Errors
    /// Returns error if the value is not one token
    pub fn as_word(&self) -> Result<&str, FieldError> {
        self.single("a keyword")
    }

    /// Quoted string; a single bare token is accepted as well
    ///
    /// # Errors
    /// Returns error for references or multi-token values
    pub fn as_text(&self) -> Result<String, FieldError> {
        match self {
            Self::Text(s) => Ok(s.clone()),
            Self::Tokens(t) if t.is_empty() => Ok(String::new()),
            Self::Tokens(t) if t.len() == 1 => Ok(t[0].clone()),
            other => Err(FieldError::expected("a string", other)),
        }
    }

    /// Single reference; ID 0 or an empty value means unset
    ///
    /// # Errors
    /// Returns error for non-reference values
    pub fn as_reference(&self) -> Result<Option<RefTarget>, FieldError> {
        match self {
            Self::Refs(r) if r.len() == 1 => Ok(Some(r[0].clone()).filter(|t| !t.id.is_unset())),
            Self::Tokens(t) if t.is_empty() || (t.len() == 1 && t[0] == "0") => Ok(None),
            other => Err(FieldError::expected("a reference", other)),
        }
    }

    /// Reference list, possibly empty
    ///
    /// # Errors
    /// Returns error for non-reference values
    pub fn as_references(&self) -> Result<Vec<RefTarget>, FieldError> {
        match self {
            Self::Refs(r) => Ok(r.iter().filter(|t| !t.id.is_unset()).cloned().collect()),
            Self::Tokens(t) if t.is_empty() => Ok(Vec::new()),
            other => Err(FieldError::expected("references", other)),
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        _ => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            Self::Tokens(t) => f.write_str(&t.join(" ")),
            Self::Refs(r) => {
                for (i, target) in r.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{target}")?;
                }
                Ok(())
            }
        }
    }
}

/// Shortest text that parses back to the same `f64`
#[must_use]
pub fn format_real(value: f64) -> String {
    format!("{value}")
}

fn parse_quoted(rest: &str) -> Result<String, FieldError> {
    let mut out = String::new();
    let mut chars = rest.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => out.push(escaped),
                None => return Err(FieldError::UnterminatedString),
            },
            '"' => {
                return if chars.as_str().trim().is_empty() {
                    Ok(out)
                } else {
                    Err(FieldError::TrailingText(chars.as_str().trim().to_string()))
                };
            }
            _ => out.push(c),
        }
    }
    Err(FieldError::UnterminatedString)
}

fn parse_refs(raw: &str) -> Result<Vec<RefTarget>, FieldError> {
    let mut targets = Vec::new();
    let mut rest = raw.trim_start();
    while !rest.is_empty() {
        let (name, after) = split_token(rest);
        let tag = TypeTag::from_ref_name(name)
            .ok_or_else(|| FieldError::BadReference(raw.to_string()))?;
        let (id, after) = split_token(after);
        let id: i32 = id
            .parse()
            .map_err(|_| FieldError::BadReference(raw.to_string()))?;

        let after = after.trim_start();
        let (path, after) = match after.strip_prefix('[') {
            Some(inner) => {
                let end = inner
                    .find(']')
                    .ok_or_else(|| FieldError::BadReference(raw.to_string()))?;
                let path = inner[..end]
                    .parse::<ScopePath>()
                    .map_err(|_| FieldError::BadReference(raw.to_string()))?;
                (path, &inner[end + 1..])
            }
            None => (ScopePath::root(), after),
        };

        targets.push(RefTarget::new(tag, UserId::new(id), path));
        rest = after.trim_start();
    }
    Ok(targets)
}

fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    let end = s
        .find(|c: char| c.is_whitespace() || c == '[')
        .unwrap_or(s.len());
    (&s[..end], &s[end..])
}

/// A statement value did not have the shape the field expects
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("expected {expected}, found '{found}'")]
    Expected {
        expected: &'static str,
        found: String,
    },

    #[error("unterminated string")]
    UnterminatedString,

    #[error("unexpected text after string: '{0}'")]
    TrailingText(String),

    #[error("malformed reference: '{0}'")]
    BadReference(String),
}

impl FieldError {
    /// Create a shape mismatch error
    pub fn expected(expected: &'static str, found: &FieldValue) -> Self {
        Self::Expected {
            expected,
            found: found.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numbers_lazily() {
        let v = FieldValue::parse(" 3 ").unwrap();
        assert_eq!(v.as_int().unwrap(), 3);
        assert_eq!(v.as_real().unwrap(), 3.0);
        assert!(FieldValue::parse("0 0 -9.81").unwrap().as_real().is_err());
    }

    #[test]
    fn parse_vector() {
        let v = FieldValue::parse("0 0 -9.81").unwrap();
        assert_eq!(v.as_vec3().unwrap(), [0.0, 0.0, -9.81]);
        assert!(FieldValue::parse("1 2").unwrap().as_vec3().is_err());
    }

    #[test]
    fn parse_quoted_with_escapes() {
        let v = FieldValue::parse(r#""a \"b\" ; c\\d""#).unwrap();
        assert_eq!(v.as_text().unwrap(), r#"a "b" ; c\d"#);
        assert_eq!(v.to_string(), r#""a \"b\" ; c\\d""#);
    }

    #[test]
    fn parse_unterminated_string_fails() {
        assert_eq!(FieldValue::parse("\"open"), Err(FieldError::UnterminatedString));
    }

    #[test]
    fn parse_single_reference() {
        let v = FieldValue::parse("FcTRIAD 3 [1 2]").unwrap();
        let target = v.as_reference().unwrap().unwrap();
        assert_eq!(target.tag, TypeTag::Triad);
        assert_eq!(target.id, UserId::new(3));
        assert_eq!(target.path, ScopePath::from_ids(&[1, 2]));
        assert_eq!(v.to_string(), "FcTRIAD 3 [1 2]");
    }

    #[test]
    fn parse_reference_list() {
        let v = FieldValue::parse("FcENGINE 1 FcENGINE 4 [2]").unwrap();
        let targets = v.as_references().unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[1].path, ScopePath::from_ids(&[2]));
    }

    #[test]
    fn reference_zero_is_unset() {
        assert_eq!(FieldValue::parse("FcLINK 0").unwrap().as_reference().unwrap(), None);
        assert_eq!(FieldValue::parse("").unwrap().as_reference().unwrap(), None);
    }

    #[test]
    fn ground_reference_is_negative() {
        let target = FieldValue::parse("FcLINK -1").unwrap().as_reference().unwrap().unwrap();
        assert!(target.id.is_singleton());
    }

    #[test]
    fn broken_reference_is_error() {
        assert!(matches!(
            FieldValue::parse("FcTRIAD x"),
            Err(FieldError::BadReference(_))
        ));
        assert!(matches!(
            FieldValue::parse("FcTRIAD 2 [1"),
            Err(FieldError::BadReference(_))
        ));
    }

    #[test]
    fn real_format_round_trips() {
        for x in [0.1, -9.81, 1.0e-6, 123456.789, 1.0 / 3.0] {
            let v = FieldValue::real(x);
            assert_eq!(FieldValue::parse(&v.to_string()).unwrap().as_real().unwrap(), x);
        }
    }

    #[test]
    fn checksum_hex_stays_a_word() {
        let hex = "1".repeat(64);
        let v = FieldValue::parse(&hex).unwrap();
        assert_eq!(v.as_word().unwrap(), hex);
    }
}
