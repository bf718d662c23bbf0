//! Load and save summaries
//!
//! Structural issues found while parsing are collected here and flushed
//! to the database's diagnostics sink once, at the end of the load.

use fmdb_ref::ResolveReport;
use fmdb_store::{Database, Diagnostic};
use fmdb_types::{FormatVersion, TypeTag};
use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use std::path::PathBuf;

/// Load progress handed to the progress callback after every block
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Progress {
    pub blocks_read: usize,
    pub bytes_read: usize,
    pub bytes_total: usize,
}

impl Progress {
    /// Fraction of the main file consumed, in `0.0..=1.0`
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> f64 {
        if self.bytes_total == 0 {
            1.0
        } else {
            (self.bytes_read as f64 / self.bytes_total as f64).min(1.0)
        }
    }
}

/// What a load found
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// Format version of the main file
    pub version: FormatVersion,
    /// Save counter recovered from `!Last saved`
    pub save_counter: u32,
    pub blocks_read: usize,
    /// Known keywords that were accepted, by keyword
    pub read_counts: IndexMap<String, usize>,
    /// Keywords not defined for their block kind
    #[serde(serialize_with = "kind_keyed")]
    pub unknown_keywords: IndexMap<(TypeTag, String), usize>,
    /// Block keywords that name no kind
    pub unknown_blocks: IndexMap<String, usize>,
    /// Duplicate IDs, base-ID collisions and similar issues
    pub structural: Vec<String>,
    /// Messages from obsolete-keyword migration
    pub migration: Vec<String>,
    /// External sub-assembly files that were read
    pub external_files: Vec<PathBuf>,
    /// Outcome of the final resolve sweep
    pub resolve: ResolveReport,
    /// No `END {FEDEMMODELFILE}` marker was found
    pub missing_end: bool,
}

fn kind_keyed<S: Serializer>(
    map: &IndexMap<(TypeTag, String), usize>,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.collect_map(
        map.iter()
            .map(|((tag, keyword), n)| (format!("{}.{keyword}", tag.keyword()), n)),
    )
}

impl LoadReport {
    #[must_use]
    pub fn new(version: FormatVersion) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub(crate) fn count_read(&mut self, keyword: &str) {
        *self.read_counts.entry(keyword.to_string()).or_default() += 1;
    }

    pub(crate) fn unknown_keyword(&mut self, tag: TypeTag, keyword: &str) {
        *self
            .unknown_keywords
            .entry((tag, keyword.to_string()))
            .or_default() += 1;
    }

    pub(crate) fn unknown_block(&mut self, keyword: &str) {
        *self.unknown_blocks.entry(keyword.to_string()).or_default() += 1;
    }

    pub(crate) fn structural(&mut self, message: impl Into<String>) {
        self.structural.push(message.into());
    }

    /// No structural problems, unknown keywords or dangling references
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.unknown_keywords.is_empty()
            && self.unknown_blocks.is_empty()
            && self.structural.is_empty()
            && self.resolve.is_clean()
            && !self.missing_end
    }

    /// Summary lines for unknown block and field keywords
    #[must_use]
    pub fn unknown_summary(&self) -> Vec<String> {
        let blocks = self
            .unknown_blocks
            .iter()
            .map(|(keyword, n)| format!("{keyword} is not a defined fmm-file block keyword ({n}x)"));
        let fields = self.unknown_keywords.iter().map(|((tag, keyword), n)| {
            format!(
                "{keyword} is not a defined fmm-file keyword for {}s ({n}x)",
                tag.ui_name()
            )
        });
        blocks.chain(fields).collect()
    }

    /// Report as pretty-printed JSON for tooling
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Send the accumulated issues to the database's sink
    pub(crate) fn flush(&self, db: &Database) {
        let sink = db.sink();
        for line in self.unknown_summary() {
            sink.report(Diagnostic::warning(line));
        }
        for line in self.structural.iter().chain(&self.migration) {
            sink.report(Diagnostic::warning(line.clone()));
        }
        if self.missing_end {
            sink.report(Diagnostic::warning(
                "the model file has no END marker and may be incomplete",
            ));
        }
        for (keyword, n) in &self.read_counts {
            tracing::debug!(keyword = %keyword, count = n, "keyword read");
        }
        tracing::info!(
            blocks = self.blocks_read,
            unknown = self.unknown_keywords.len() + self.unknown_blocks.len(),
            structural = self.structural.len(),
            dangling = self.resolve.dangling.len(),
            "model file loaded"
        );
    }
}

/// What a save wrote
#[derive(Debug, Clone, Default, Serialize)]
pub struct SaveReport {
    /// Counter written to `!Last saved`
    pub save_counter: u32,
    pub blocks_written: usize,
    /// Every file written, main file first
    pub files: Vec<PathBuf>,
    /// Previous versions kept aside
    pub backups: Vec<PathBuf>,
}
