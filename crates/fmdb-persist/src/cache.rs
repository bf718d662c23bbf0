//! Checksum-addressed cache of derived artifacts
//!
//! Reducing FE data is the slow step before a solver run. Parts that share
//! FE data share a checksum, so a reduced artifact is computed once per
//! checksum and reused for every part (and every later run) that needs it.

use crate::error::ArtifactError;
use fmdb_store::{ConsistencyWarning, Database};
use fmdb_types::{Checksum, Handle};
use moka::sync::Cache;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Statistics for cache monitoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of entries in cache
    pub entry_count: u64,
}

/// Reduced artifacts keyed by the checksum of their FE data
///
/// Cloning shares the underlying cache.
#[derive(Debug, Clone)]
pub struct ArtifactCache {
    inner: Cache<Checksum, Arc<[u8]>>,
}

impl ArtifactCache {
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    #[inline]
    pub fn insert(&self, checksum: Checksum, artifact: impl Into<Arc<[u8]>>) {
        self.inner.insert(checksum, artifact.into());
    }

    #[inline]
    #[must_use]
    pub fn get(&self, checksum: &Checksum) -> Option<Arc<[u8]>> {
        self.inner.get(checksum)
    }

    pub fn get_or_insert_with<F>(&self, checksum: Checksum, f: F) -> Arc<[u8]>
    where
        F: FnOnce() -> Vec<u8>,
    {
        self.inner.get_with(checksum, || f().into())
    }

    /// Look up `checksum`, computing and caching on a miss
    ///
    /// # Errors
    /// Returns the error of `f`; nothing is cached then
    pub fn try_get_or_insert_with<F, E>(&self, checksum: Checksum, f: F) -> Result<Arc<[u8]>, E>
    where
        F: FnOnce() -> Result<Vec<u8>, E>,
    {
        if let Some(hit) = self.inner.get(&checksum) {
            return Ok(hit);
        }
        let artifact: Arc<[u8]> = f()?.into();
        self.inner.insert(checksum, Arc::clone(&artifact));
        Ok(artifact)
    }

    #[inline]
    pub fn invalidate(&self, checksum: &Checksum) {
        self.inner.invalidate(checksum);
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, checksum: &Checksum) -> bool {
        self.inner.contains_key(checksum)
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }

    /// Approximate entry count; pending writes are applied lazily
    #[inline]
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.inner.entry_count()
    }

    /// Apply pending inserts and evictions now
    pub fn run_pending_tasks(&self) {
        self.inner.run_pending_tasks();
    }
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new(64)
    }
}

/// Outcome of [`prepare_artifacts`]
#[derive(Debug, Clone, Default)]
pub struct ArtifactSummary {
    /// Artifact files written, model order
    pub written: Vec<PathBuf>,
    /// Parts served from the cache instead of the reducer
    pub reused: usize,
    /// Parts passed because their checksum test is overridden
    pub warnings: Vec<ConsistencyWarning>,
}

/// Bring every stale part's artifact up to date
///
/// Artifact names are assigned first, so parts with equal FE data end up
/// sharing one file. Each stale part gets its payload reloaded from
/// `model_dir` if needed, is reduced through `cache` and written to
/// `model_dir` under its artifact name; its saved checksum is then updated.
///
/// # Errors
/// Stops at the first part whose payload, reduction or write fails.
/// Parts already written keep their updated checksum.
pub fn prepare_artifacts<R>(
    db: &mut Database,
    cache: &ArtifactCache,
    model_dir: &Path,
    mut reducer: R,
) -> Result<ArtifactSummary, ArtifactError>
where
    R: FnMut(&[u8]) -> std::io::Result<Vec<u8>>,
{
    db.assign_artifact_names()?;
    let (stale, warnings) = db.stale_artifacts()?;
    let mut summary = ArtifactSummary {
        warnings,
        ..ArtifactSummary::default()
    };

    for part in stale {
        db.reload_payload(part, model_dir)?;
        let checksum = db.checksum(part)?;
        let name = artifact_name(db, part, checksum)?;
        let Some(payload) = db
            .entity(part)
            .and_then(|e| e.data.as_part())
            .and_then(|p| p.payload().cloned())
        else {
            return Err(ArtifactError::MissingPayload {
                part: db.id_string(part, true),
            });
        };

        let hit = cache.contains(&checksum);
        let artifact = cache
            .try_get_or_insert_with(checksum, || reducer(&payload))
            .map_err(|source| ArtifactError::Reduce {
                part: db.id_string(part, true),
                source,
            })?;
        if hit {
            summary.reused += 1;
        }

        let path = model_dir.join(&name);
        std::fs::write(&path, &artifact).map_err(|source| ArtifactError::Io {
            path: path.clone(),
            source,
        })?;
        db.mark_artifact_saved(part)?;
        tracing::debug!(part = %db.id_string(part, false), file = %path.display(), cached = hit, "artifact written");
        summary.written.push(path);
    }

    tracing::info!(
        written = summary.written.len(),
        reused = summary.reused,
        overridden = summary.warnings.len(),
        "artifacts prepared"
    );
    Ok(summary)
}

/// Artifact file name of `part`, falling back to its checksum
fn artifact_name(db: &mut Database, part: Handle, checksum: Checksum) -> Result<String, ArtifactError> {
    let entity = db.get_mut(part)?;
    let Some(data) = entity.data.as_part_mut() else {
        return Ok(format!("{}.ftl", checksum.short()));
    };
    if data.base_ftl_file.is_empty() {
        data.base_ftl_file = format!("{}.ftl", checksum.short());
    }
    Ok(data.base_ftl_file.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fmdb_store::{ArtifactStatus, ScopeKey};
    use fmdb_types::{TypeTag, UserId};

    fn part_with(db: &mut Database, id: i32, fe_file: &str, bytes: &[u8]) -> Handle {
        let h = db.create(TypeTag::Part);
        db.connect(h, ScopeKey::Root, UserId::new(id)).unwrap();
        db.get_mut(h).unwrap().data.as_part_mut().unwrap().original_fe_file = fe_file.into();
        db.set_payload(h, bytes.to_vec()).unwrap();
        h
    }

    #[test]
    fn cache_computes_once_per_checksum() {
        let cache = ArtifactCache::new(8);
        let key = Checksum::compute(b"mesh");
        let mut calls = 0;
        let first = cache.get_or_insert_with(key, || {
            calls += 1;
            b"reduced".to_vec()
        });
        let second = cache.get_or_insert_with(key, || {
            calls += 1;
            Vec::new()
        });
        assert_eq!(calls, 1);
        assert_eq!(first, second);
        cache.run_pending_tasks();
        assert_eq!(cache.stats().entry_count, 1);

        cache.invalidate(&key);
        assert!(!cache.contains(&key));
    }

    #[test]
    fn failed_reduction_is_not_cached() {
        let cache = ArtifactCache::default();
        let key = Checksum::compute(b"mesh");
        let err = cache.try_get_or_insert_with(key, || Err::<Vec<u8>, _>("boom"));
        assert_eq!(err.unwrap_err(), "boom");
        assert!(cache.get(&key).is_none());
    }

    #[test]
    fn shared_fe_data_is_reduced_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::new();
        let a = part_with(&mut db, 1, "wheel.nas", b"grid");
        let b = part_with(&mut db, 2, "wheel.nas", b"grid");
        let cache = ArtifactCache::new(8);

        let mut reductions = 0;
        let summary = prepare_artifacts(&mut db, &cache, dir.path(), |fe| {
            reductions += 1;
            Ok(fe.iter().rev().copied().collect())
        })
        .unwrap();

        assert_eq!(reductions, 1);
        assert_eq!(summary.reused, 1);
        assert_eq!(summary.written.len(), 2);
        assert_eq!(std::fs::read(dir.path().join("wheel.ftl")).unwrap(), b"dirg");
        assert_eq!(db.artifact_status(a).unwrap(), ArtifactStatus::Current);
        assert_eq!(db.artifact_status(b).unwrap(), ArtifactStatus::Current);

        let again = prepare_artifacts(&mut db, &cache, dir.path(), |_| unreachable!()).unwrap();
        assert!(again.written.is_empty());
    }

    #[test]
    fn reduction_failure_names_the_part() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = Database::new();
        let h = part_with(&mut db, 3, "hub.nas", b"grid");
        let err = prepare_artifacts(&mut db, &ArtifactCache::default(), dir.path(), |_| {
            Err(std::io::Error::other("reducer crashed"))
        })
        .unwrap_err();
        assert!(matches!(err, ArtifactError::Reduce { .. }));
        assert_eq!(db.artifact_status(h).unwrap(), ArtifactStatus::Stale);
    }
}
