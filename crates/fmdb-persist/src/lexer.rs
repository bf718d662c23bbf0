//! Model-file lexer
//!
//! Splits the text after the header line into metadata comments,
//! `KEYWORD { field = value; ... }` blocks and the end marker. Values are
//! kept as raw text; [`fmdb_types::FieldValue::parse`] interprets them.

use crate::error::{FormatError, VersionError};
use fmdb_types::{FormatVersion, ScopePath};
use once_cell::sync::Lazy;
use regex::Regex;

static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*FEDEMMODELFILE\s*\{\s*(\S+)\s+ASCII\s*\}").expect("static pattern")
});
static LAST_SAVED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!Last saved:\s*#(\d+)").expect("static pattern"));
static SUBMODEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!Submodel:\s*(\[[\d\s]*\])").expect("static pattern"));
static MODULE_VERSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^!Module version:\s*(\S.*?)\s*$").expect("static pattern"));

/// Check the header line and return the version and the remaining text
///
/// # Errors
/// Returns error if the header is missing, unreadable or newer than
/// [`FormatVersion::CURRENT`]
pub fn read_header(text: &str) -> Result<(FormatVersion, &str), VersionError> {
    let text = text.trim_start_matches('\u{feff}');
    let (first, rest) = text.split_once('\n').unwrap_or((text, ""));
    let caps = HEADER.captures(first).ok_or(VersionError::MissingHeader)?;
    let version: FormatVersion = caps[1].parse()?;
    if version > FormatVersion::CURRENT {
        return Err(VersionError::TooNew {
            found: version,
            current: FormatVersion::CURRENT,
        });
    }
    Ok((version, rest))
}

/// The header line written by this library
#[must_use]
pub fn header_line() -> String {
    format!("FEDEMMODELFILE {{{} ASCII}}", FormatVersion::CURRENT)
}

/// Facts recovered from `!` metadata lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Save counter from `!Last saved: #N, ...`
    pub save_counter: u32,
    /// Scope path from `!Submodel: [...]`
    pub submodel: Option<ScopePath>,
    /// Writer version from `!Module version: ...`
    pub module_version: Option<String>,
}

impl Metadata {
    /// Absorb one metadata line; other comments are ignored
    pub fn read_line(&mut self, line: &str) {
        let line = line.trim_end();
        if let Some(caps) = LAST_SAVED.captures(line) {
            self.save_counter = caps[1].parse().unwrap_or(0);
        } else if let Some(caps) = SUBMODEL.captures(line) {
            self.submodel = caps[1].parse().ok();
        } else if let Some(caps) = MODULE_VERSION.captures(line) {
            self.module_version = Some(caps[1].to_string());
        }
    }

    /// Metadata from the comment lines preceding the first block
    #[must_use]
    pub fn scan(text: &str) -> Self {
        let mut meta = Self::default();
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take_while(|line| line.starts_with('!'))
            .for_each(|line| meta.read_line(line));
        meta
    }
}

/// One `KEYWORD = value;` statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement<'a> {
    pub keyword: &'a str,
    pub value: &'a str,
    pub line: usize,
}

/// One block with its statements in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock<'a> {
    pub keyword: &'a str,
    pub line: usize,
    pub statements: Vec<RawStatement<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item<'a> {
    Meta(&'a str),
    Block(RawBlock<'a>),
    End,
}

/// Pull lexer over the block stream
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    /// Lex `src`, numbering lines from `first_line`
    #[must_use]
    pub fn new(src: &'a str, first_line: usize) -> Self {
        Self {
            src,
            pos: 0,
            line: first_line,
        }
    }

    /// Bytes consumed so far
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn advance(&mut self, n: usize) -> &'a str {
        let taken = &self.src[self.pos..self.pos + n];
        self.line += taken.matches('\n').count();
        self.pos += n;
        taken
    }

    fn skip_whitespace(&mut self) {
        let rest = self.rest();
        let n = rest.len() - rest.trim_start().len();
        self.advance(n);
    }

    fn take_line(&mut self) -> &'a str {
        let rest = self.rest();
        let n = rest.find('\n').map_or(rest.len(), |i| i + 1);
        self.advance(n).trim_end()
    }

    fn take_word(&mut self) -> &'a str {
        let rest = self.rest();
        let n = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        self.advance(n)
    }

    /// Next item, `None` at end of input
    ///
    /// # Errors
    /// Returns error for a malformed block
    pub fn next_item(&mut self) -> Result<Option<Item<'a>>, FormatError> {
        self.skip_whitespace();
        if self.rest().is_empty() {
            return Ok(None);
        }
        if self.rest().starts_with('!') {
            return Ok(Some(Item::Meta(self.take_line())));
        }

        let line = self.line;
        let keyword = self.take_word();
        if keyword.is_empty() {
            return Err(FormatError::MalformedStatement {
                line,
                keyword: String::new(),
                text: self.take_line().to_string(),
            });
        }
        if keyword == "END" {
            self.take_line();
            return Ok(Some(Item::End));
        }

        self.skip_whitespace();
        if !self.rest().starts_with('{') {
            return Err(FormatError::MissingOpenBrace {
                line,
                keyword: keyword.to_string(),
            });
        }
        self.advance(1);

        let mut statements = Vec::new();
        loop {
            self.skip_whitespace();
            let rest = self.rest();
            if rest.is_empty() {
                return Err(FormatError::UnterminatedBlock {
                    line,
                    keyword: keyword.to_string(),
                });
            }
            if rest.starts_with('}') {
                self.advance(1);
                break;
            }
            statements.push(self.statement(keyword, line)?);
        }

        Ok(Some(Item::Block(RawBlock {
            keyword,
            line,
            statements,
        })))
    }

    fn statement(&mut self, block: &str, block_line: usize) -> Result<RawStatement<'a>, FormatError> {
        let line = self.line;
        let rest = self.rest();
        let malformed = |text: &str| FormatError::MalformedStatement {
            line,
            keyword: block.to_string(),
            text: text.lines().next().unwrap_or_default().to_string(),
        };

        let eq = match rest.find(['=', ';', '}']) {
            Some(i) if rest.as_bytes()[i] == b'=' => i,
            _ => return Err(malformed(rest)),
        };
        let keyword = rest[..eq].trim();
        if keyword.is_empty() || keyword.contains(char::is_whitespace) {
            return Err(malformed(rest));
        }

        let mut in_quotes = false;
        let mut escaped = false;
        let mut end = None;
        for (i, c) in rest[eq + 1..].char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' if in_quotes => escaped = true,
                '"' => in_quotes = !in_quotes,
                ';' if !in_quotes => {
                    end = Some(eq + 1 + i);
                    break;
                }
                _ => {}
            }
        }
        let Some(end) = end else {
            return Err(FormatError::UnterminatedBlock {
                line: block_line,
                keyword: block.to_string(),
            });
        };

        let value = rest[eq + 1..end].trim();
        self.advance(end + 1);
        Ok(RawStatement {
            keyword,
            value,
            line,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn items(src: &str) -> Vec<Item<'_>> {
        let mut lexer = Lexer::new(src, 2);
        let mut out = Vec::new();
        while let Some(item) = lexer.next_item().unwrap() {
            out.push(item);
        }
        out
    }

    #[test]
    fn header_accepts_current_and_older() {
        let (version, rest) = read_header("FEDEMMODELFILE {R7.4.1 ASCII}\nTRIAD\n").unwrap();
        assert_eq!(version, FormatVersion::new(7, 4, 1));
        assert_eq!(rest, "TRIAD\n");
        assert!(read_header(&format!("{}\n", header_line())).is_ok());
    }

    #[test]
    fn header_rejects_newer_and_missing() {
        assert!(matches!(
            read_header("FEDEMMODELFILE {R99.0 ASCII}\n"),
            Err(VersionError::TooNew { .. })
        ));
        assert!(matches!(read_header("TRIAD\n{\n}\n"), Err(VersionError::MissingHeader)));
    }

    #[test]
    fn metadata_lines() {
        let mut meta = Metadata::default();
        meta.read_line("!Module version: 0.1.0");
        meta.read_line("!Last saved: #12, Mon Oct 19 10:12:55 2026");
        meta.read_line("!Submodel: [1 3]");
        meta.read_line("! just a comment");
        assert_eq!(meta.save_counter, 12);
        assert_eq!(meta.submodel, Some(ScopePath::from_ids(&[1, 3])));
        assert_eq!(meta.module_version.as_deref(), Some("0.1.0"));
    }

    #[test]
    fn metadata_scan_stops_at_first_block() {
        let meta = Metadata::scan("!Submodel: [2]\n\nTRIAD\n{\n}\n!Last saved: #4, x\n");
        assert_eq!(meta.submodel, Some(ScopePath::from_ids(&[2])));
        assert_eq!(meta.save_counter, 0);
    }

    #[test]
    fn lexer_splits_blocks_and_statements() {
        let src = "!Model file name: a.fmm\n\nTRIAD\n{\n  ID = 1;\n  DESCR = \"a;b \\\" c\";\n  POSITION = 0 0.5\n    1;\n}\n\nEND {FEDEMMODELFILE}\n";
        let items = items(src);
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Item::Meta("!Model file name: a.fmm"));
        let Item::Block(block) = &items[1] else {
            panic!("expected a block");
        };
        assert_eq!(block.keyword, "TRIAD");
        assert_eq!(block.line, 4);
        let statements: Vec<(&str, &str, usize)> = block
            .statements
            .iter()
            .map(|s| (s.keyword, s.value, s.line))
            .collect();
        assert_eq!(
            statements,
            vec![
                ("ID", "1", 6),
                ("DESCR", "\"a;b \\\" c\"", 7),
                ("POSITION", "0 0.5\n    1", 8),
            ]
        );
        assert_eq!(items[2], Item::End);
    }

    #[test]
    fn lexer_reports_unterminated_block() {
        let mut lexer = Lexer::new("LINK\n{\n  ID = 1;\n", 2);
        assert!(matches!(
            lexer.next_item(),
            Err(FormatError::UnterminatedBlock { line: 2, .. })
        ));
    }

    #[test]
    fn lexer_reports_missing_brace_and_bad_statement() {
        assert!(matches!(
            Lexer::new("LINK ID = 1;", 1).next_item(),
            Err(FormatError::MissingOpenBrace { .. })
        ));
        assert!(matches!(
            Lexer::new("LINK\n{\n  ID 1;\n}\n", 1).next_item(),
            Err(FormatError::MalformedStatement { line: 3, .. })
        ));
    }
}
