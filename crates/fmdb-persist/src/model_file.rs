//! Loading and saving whole models
//!
//! A load checks the header, parses every block into the database, then
//! runs one resolve sweep and one post-resolution sweep. Any failure
//! before the sweeps puts the database back the way it was.
//!
//! A save writes `<file>.tmp`, moves the previous file to the backup
//! suffix and renames the new one into place. If writing fails, the main
//! file's text goes to the emergency file before the error surfaces.

use crate::error::{LoadError, LoadResult, SaveError, SaveResult};
use crate::lexer::read_header;
use crate::options::FileOptions;
use crate::reader::Reader;
use crate::report::{LoadReport, Progress, SaveReport};
use crate::writer::{Output, Writer};
use fmdb_store::Database;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

/// A model file on disk and its save counter
#[derive(Debug, Clone)]
pub struct ModelFile {
    path: PathBuf,
    options: FileOptions,
    save_counter: u32,
}

impl ModelFile {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: FileOptions::default(),
            save_counter: 0,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: FileOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    #[must_use]
    pub fn options(&self) -> &FileOptions {
        &self.options
    }

    /// Number of saves recorded in the file, including this session's
    #[inline]
    #[must_use]
    pub fn save_counter(&self) -> u32 {
        self.save_counter
    }

    /// Replace the database contents with this file's model
    ///
    /// # Errors
    /// See [`ModelFile::load_with_progress`]
    pub fn load(&mut self, db: &mut Database) -> LoadResult<LoadReport> {
        self.load_with_progress(db, |_| ControlFlow::Continue(()))
    }

    /// Load, reporting progress after every block
    ///
    /// Returning `Break` from `progress` cancels the load before
    /// references are resolved; the database is restored.
    ///
    /// # Errors
    /// - [`LoadError::Io`] if the file cannot be read
    /// - [`LoadError::Version`] for a missing or too new header; the
    ///   database is not touched
    /// - [`LoadError::Format`] for a malformed block and
    ///   [`LoadError::Cancelled`]; the database is restored
    pub fn load_with_progress<F>(&mut self, db: &mut Database, progress: F) -> LoadResult<LoadReport>
    where
        F: FnMut(Progress) -> ControlFlow<()>,
    {
        let text =
            std::fs::read_to_string(&self.path).map_err(|e| LoadError::io_error(&self.path, e))?;
        let report = load_text(db, &self.path, &text, &self.options, progress)?;
        self.save_counter = report.save_counter;
        Ok(report)
    }

    /// Write the model and its external sub-assembly files
    ///
    /// # Errors
    /// Returns [`SaveError::Io`] naming the emergency copy, if one could
    /// be written
    pub fn save(&mut self, db: &Database) -> SaveResult<SaveReport> {
        let counter = self.save_counter + 1;
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = Writer::new(db, self.options.write_external, counter).write(&file_name);

        let mut report = SaveReport {
            save_counter: counter,
            blocks_written: output.blocks,
            ..SaveReport::default()
        };
        if let Err((path, source)) = self.write_files(&output, &mut report) {
            let emergency = self.emergency_save(&output);
            return Err(SaveError::Io {
                path,
                source,
                emergency,
            });
        }

        self.save_counter = counter;
        tracing::info!(
            file = %self.path.display(),
            counter,
            blocks = output.blocks,
            files = report.files.len(),
            "model saved"
        );
        Ok(report)
    }

    fn write_files(
        &self,
        output: &Output,
        report: &mut SaveReport,
    ) -> Result<(), (PathBuf, std::io::Error)> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));
        for (i, file) in output.files.iter().enumerate() {
            let path = if i == 0 {
                self.path.clone()
            } else {
                dir.join(&file.name)
            };
            let backup = self.options.backup_path(&path);
            match replace_file(&path, &file.text, &backup) {
                Ok(kept) => {
                    if kept {
                        report.backups.push(backup);
                    }
                    report.files.push(path);
                }
                Err(err) => return Err((path, err)),
            }
        }
        Ok(())
    }

    fn emergency_save(&self, output: &Output) -> Option<PathBuf> {
        let target = self.options.emergency_file();
        let text = output.files.first().map(|f| f.text.as_str())?;
        match std::fs::write(&target, text) {
            Ok(()) => {
                tracing::error!(
                    file = %self.path.display(),
                    emergency = %target.display(),
                    "save failed; model written to emergency file"
                );
                Some(target)
            }
            Err(err) => {
                tracing::error!(emergency = %target.display(), %err, "emergency save failed");
                None
            }
        }
    }
}

/// Write `text` to `path`, keeping any previous file as `backup`
///
/// Returns whether a previous file was kept.
fn replace_file(path: &Path, text: &str, backup: &Path) -> std::io::Result<bool> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, text)?;
    let kept = if path.exists() {
        std::fs::rename(path, backup)?;
        true
    } else {
        false
    };
    std::fs::rename(&tmp, path)?;
    Ok(kept)
}

pub(crate) fn load_text<F>(
    db: &mut Database,
    path: &Path,
    text: &str,
    options: &FileOptions,
    mut progress: F,
) -> LoadResult<LoadReport>
where
    F: FnMut(Progress) -> ControlFlow<()>,
{
    let (version, body) = read_header(text).map_err(|source| LoadError::Version {
        path: path.to_path_buf(),
        source,
    })?;

    let snapshot = db.clone();
    if let Some(config) = &options.database {
        db.set_config(config.clone());
    }
    db.clear();

    let mut report = LoadReport::new(version);
    let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
    let parsed = Reader::new(db, &mut report, base_dir)
        .with_load_external(options.load_external)
        .with_progress(&mut progress)
        .read_stream(path, body, version, text.len() - body.len(), true);
    let (meta, saw_end) = match parsed {
        Ok(parsed) => parsed,
        Err(err) => {
            *db = snapshot;
            tracing::warn!(file = %path.display(), %err, "load aborted, model restored");
            return Err(err);
        }
    };

    report.save_counter = meta.save_counter;
    report.missing_end = !saw_end;
    report.resolve = db.resolve_all();
    report.flush(db);
    Ok(report)
}

/// Load a model from text; external sub-assembly files are not followed
///
/// # Errors
/// As for [`ModelFile::load`]
pub fn read_str(db: &mut Database, text: &str) -> LoadResult<LoadReport> {
    let options = FileOptions::default().with_load_external(false);
    load_text(db, Path::new("<memory>"), text, &options, |_| {
        ControlFlow::Continue(())
    })
}

/// The model as model-file text, sub-assemblies inlined
#[must_use]
pub fn write_string(db: &Database) -> String {
    Writer::new(db, false, 0)
        .write("")
        .files
        .into_iter()
        .next()
        .map(|file| file.text)
        .unwrap_or_default()
}
