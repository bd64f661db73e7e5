//! Enumeration, statistics, clearing and age-based expiry of cache entries
//!
//! Leaf directories sit exactly four levels below the cache root
//! (`video/engine/model/hash`). Everything here is derived from the
//! filesystem; the metadata record is read when present and the directory
//! names stand in for it otherwise.

use crate::paths::{ArtifactPaths, CacheKey, sanitize_segment};
use crate::store::ArtifactStore;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Depth of artifact directories below the cache root
const LEAF_DEPTH: usize = 4;

/// Read-only view of one cache entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntry {
    /// Key of the entry
    pub key: CacheKey,
    /// Artifact directory
    pub path: PathBuf,
    /// Creation time from metadata, else directory modification time
    pub created_at: DateTime<Utc>,
    /// Total size of the directory in bytes
    pub size_bytes: u64,
    /// Video title, if recorded
    pub title: Option<String>,
    /// Source URL, if recorded
    pub url: Option<String>,
}

/// Aggregate numbers over all complete entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Number of complete entries
    pub entries: usize,
    /// Sum of entry sizes in bytes
    pub total_bytes: u64,
    /// Creation time of the oldest entry
    pub oldest: Option<DateTime<Utc>>,
    /// Creation time of the newest entry
    pub newest: Option<DateTime<Utc>>,
}

impl ArtifactStore {
    /// List every complete artifact set under the root
    pub fn enumerate(&self) -> Result<Vec<CacheEntry>> {
        self.scan_leaves(false)
    }

    /// Entry count, total size and age range of the cache
    pub fn stats(&self) -> Result<CacheStats> {
        let entries = self.enumerate()?;
        Ok(CacheStats {
            entries: entries.len(),
            total_bytes: entries.iter().map(|e| e.size_bytes).sum(),
            oldest: entries.iter().map(|e| e.created_at).min(),
            newest: entries.iter().map(|e| e.created_at).max(),
        })
    }

    /// Remove all entries, or only those of one video
    ///
    /// Returns the number of artifact directories removed and the bytes
    /// freed. A missing target is a no-op reporting `(0, 0)`.
    pub fn clear(&self, video_id: Option<&str>) -> Result<(usize, u64)> {
        let root = self.root();
        if !root.is_dir() {
            return Ok((0, 0));
        }

        let targets: Vec<PathBuf> = match video_id {
            Some(id) => vec![root.join(sanitize_segment(id))],
            None => fs::read_dir(root)
                .map_err(|e| Error::io(e, root, "read_dir"))?
                .map(|entry| {
                    entry
                        .map(|e| e.path())
                        .map_err(|e| Error::io(e, root, "read_dir_entry"))
                })
                .collect::<Result<_>>()?,
        };

        let mut removed = 0usize;
        let mut freed = 0u64;
        for target in targets.iter().filter(|p| p.is_dir()) {
            let leaves = count_leaf_dirs(target, LEAF_DEPTH - 1);
            let size = calculate_directory_size(target)?;
            remove_dir(target)?;
            removed += leaves;
            freed += size;
            tracing::debug!(path = %target.display(), entries = leaves, bytes = size, "Cleared cache subtree");
        }

        tracing::info!(
            video_id = video_id.unwrap_or("*"),
            removed,
            freed,
            "Cleared cache"
        );
        Ok((removed, freed))
    }

    /// Remove entries older than `ttl`, returning the keys that were removed
    ///
    /// Incomplete leaf directories are aged the same way so abandoned
    /// partial writes do not accumulate. Parents left empty are pruned.
    pub fn expire(&self, ttl: Duration) -> Result<Vec<CacheKey>> {
        // A TTL reaching past the representable past expires nothing
        let Some(cutoff) = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
        else {
            tracing::debug!(
                ttl_seconds = ttl.as_secs(),
                "Cache TTL exceeds the date range; nothing expires"
            );
            return Ok(Vec::new());
        };

        let mut removed = Vec::new();
        for entry in self.scan_leaves(true)? {
            if entry.created_at >= cutoff {
                continue;
            }
            match remove_dir(&entry.path) {
                Ok(()) => {
                    tracing::debug!(
                        key = %entry.key,
                        size = entry.size_bytes,
                        "Removed expired cache entry"
                    );
                    self.prune_empty_parents(&entry.path);
                    removed.push(entry.key);
                }
                Err(e) => {
                    tracing::warn!(key = %entry.key, error = %e, "Failed to remove expired entry");
                }
            }
        }
        Ok(removed)
    }

    fn scan_leaves(&self, include_incomplete: bool) -> Result<Vec<CacheEntry>> {
        let root = self.root();
        let mut entries = Vec::new();
        if !root.is_dir() {
            return Ok(entries);
        }

        let walker = WalkDir::new(root)
            .min_depth(LEAF_DEPTH)
            .max_depth(LEAF_DEPTH)
            .sort_by_file_name();
        for item in walker {
            let item = item.map_err(|e| walk_error(e, root))?;
            if !item.file_type().is_dir() {
                continue;
            }
            let paths = ArtifactPaths::in_dir(item.path());
            if !include_incomplete && !self.exists(&paths) {
                tracing::debug!(dir = %paths.dir.display(), "Skipping incomplete cache entry");
                continue;
            }
            entries.push(self.describe(root, paths)?);
        }
        Ok(entries)
    }

    fn describe(&self, root: &Path, paths: ArtifactPaths) -> Result<CacheEntry> {
        let meta = match self.read_metadata(&paths) {
            Ok(meta) => Some(meta),
            Err(e) if e.is_missing() => None,
            Err(e) => {
                tracing::warn!(dir = %paths.dir.display(), error = %e, "Unreadable cache metadata");
                None
            }
        };

        let key = match &meta {
            Some(meta) => meta.key(),
            None => key_from_dir(root, &paths.dir),
        };
        let created_at = match &meta {
            Some(meta) => meta.created_at,
            None => modified_at(&paths.dir)?,
        };
        let source = meta.and_then(|m| m.source);

        Ok(CacheEntry {
            key,
            size_bytes: calculate_directory_size(&paths.dir)?,
            path: paths.dir,
            created_at,
            title: source.as_ref().and_then(|s| s.title.clone()),
            url: source.map(|s| s.url),
        })
    }

    fn prune_empty_parents(&self, leaf: &Path) {
        let mut current = leaf.parent();
        while let Some(dir) = current {
            if dir == self.root() || !dir.starts_with(self.root()) {
                break;
            }
            // remove_dir only succeeds on empty directories
            if fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

fn key_from_dir(root: &Path, dir: &Path) -> CacheKey {
    let parts: Vec<String> = dir
        .strip_prefix(root)
        .unwrap_or(dir)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let part = |i: usize| parts.get(i).cloned().unwrap_or_default();
    CacheKey::new(part(0), part(1), part(2), part(3))
}

fn modified_at(path: &Path) -> Result<DateTime<Utc>> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| Error::io(e, path, "metadata"))?;
    Ok(DateTime::<Utc>::from(modified))
}

fn count_leaf_dirs(path: &Path, depth: usize) -> usize {
    WalkDir::new(path)
        .min_depth(depth)
        .max_depth(depth)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_dir())
        .count()
}

/// Calculate total size of a directory recursively
fn calculate_directory_size(path: &Path) -> Result<u64> {
    let mut total = 0u64;
    for item in WalkDir::new(path) {
        let item = item.map_err(|e| walk_error(e, path))?;
        if item.file_type().is_file() {
            let meta = item
                .metadata()
                .map_err(|e| walk_error(e, item.path()))?;
            total += meta.len();
        }
    }
    Ok(total)
}

fn remove_dir(path: &Path) -> Result<()> {
    fs::remove_dir_all(path).map_err(|e| Error::io(e, path, "remove_dir_all"))
}

fn walk_error(err: walkdir::Error, fallback: &Path) -> Error {
    let path = err.path().unwrap_or(fallback).to_path_buf();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
    Error::io(source, path, "walk")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::SourceInfo;
    use chrono::Duration as ChronoDuration;
    use tempfile::TempDir;
    use ytx_core::{TranscriptDoc, TranscriptSegment};

    fn doc(video_id: &str) -> TranscriptDoc {
        TranscriptDoc {
            video_id: video_id.into(),
            source_url: format!("https://youtu.be/{video_id}"),
            title: None,
            duration: Some(1.0),
            language: None,
            engine: "whisper".into(),
            model: "small".into(),
            segments: vec![TranscriptSegment::new(0, 0.0, 1.0, "hello").unwrap()],
            chapters: None,
            summary: None,
        }
    }

    fn put(store: &ArtifactStore, video_id: &str, hash: &str, age_days: i64) -> ArtifactPaths {
        let key = CacheKey::new(video_id, "whisper", "small", hash);
        let paths = store.resolve(&key, true).unwrap();
        let mut meta = store.build_metadata(&key, None, None);
        meta.created_at -= ChronoDuration::days(age_days);
        meta.source = Some(SourceInfo {
            url: format!("https://youtu.be/{video_id}"),
            title: Some(format!("title {video_id}")),
            duration: None,
            uploader: None,
        });
        store.persist(&paths, &doc(video_id), &meta).unwrap();
        paths
    }

    #[test]
    fn test_enumerate_lists_complete_entries() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        put(&store, "aaa", "h1", 0);
        put(&store, "bbb", "h2", 0);

        let entries = store.enumerate().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key.video_id, "aaa");
        assert_eq!(entries[0].title.as_deref(), Some("title aaa"));
        assert!(entries[0].size_bytes > 0);
    }

    #[test]
    fn test_enumerate_skips_incomplete_entries() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let key = CacheKey::new("partial", "whisper", "small", "h");
        let paths = store.resolve(&key, true).unwrap();
        store.write_transcript(&paths, &doc("partial")).unwrap();

        assert!(store.enumerate().unwrap().is_empty());
    }

    #[test]
    fn test_enumerate_falls_back_to_directory_names() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        let paths = put(&store, "vid", "hash", 0);
        fs::write(&paths.meta_json, b"not json").unwrap();

        let entries = store.enumerate().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, CacheKey::new("vid", "whisper", "small", "hash"));
        assert_eq!(entries[0].title, None);
    }

    #[test]
    fn test_enumerate_missing_root() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path().join("nope"));
        assert!(store.enumerate().unwrap().is_empty());
        assert_eq!(store.stats().unwrap(), CacheStats::default());
    }

    #[test]
    fn test_stats_totals() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        put(&store, "aaa", "h1", 3);
        put(&store, "bbb", "h2", 0);

        let stats = store.stats().unwrap();
        let entries = store.enumerate().unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.total_bytes, entries.iter().map(|e| e.size_bytes).sum::<u64>());
        assert!(stats.oldest < stats.newest);
    }

    #[test]
    fn test_clear_single_video() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        put(&store, "keep", "h1", 0);
        put(&store, "drop", "h1", 0);
        put(&store, "drop", "h2", 0);
        let expected_bytes = calculate_directory_size(&tmp.path().join("drop")).unwrap();

        let (count, bytes) = store.clear(Some("drop")).unwrap();
        assert_eq!(count, 2);
        assert_eq!(bytes, expected_bytes);
        assert!(!tmp.path().join("drop").exists());
        assert!(tmp.path().join("keep").exists());
    }

    #[test]
    fn test_clear_unknown_video_is_noop() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        put(&store, "keep", "h1", 0);
        assert_eq!(store.clear(Some("unknown")).unwrap(), (0, 0));
        assert_eq!(store.enumerate().unwrap().len(), 1);
    }

    #[test]
    fn test_clear_all_keeps_root() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        put(&store, "a", "h1", 0);
        put(&store, "b", "h1", 0);

        let (count, bytes) = store.clear(None).unwrap();
        assert_eq!(count, 2);
        assert!(bytes > 0);
        assert!(tmp.path().is_dir());
        assert!(store.enumerate().unwrap().is_empty());
        assert_eq!(store.clear(None).unwrap(), (0, 0));
    }

    #[test]
    fn test_expire_removes_only_old_entries() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        put(&store, "old", "h1", 10);
        put(&store, "new", "h1", 0);

        let removed = store.expire(Duration::from_secs(86_400)).unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].video_id, "old");
        assert!(!tmp.path().join("old").exists(), "empty parents are pruned");
        assert!(tmp.path().join("new/whisper/small/h1").exists());
    }

    #[test]
    fn test_expire_keeps_sibling_entries() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        put(&store, "vid", "old", 10);
        put(&store, "vid", "new", 0);

        let removed = store.expire(Duration::from_secs(86_400)).unwrap();
        assert_eq!(removed.len(), 1);
        assert!(tmp.path().join("vid/whisper/small/new").exists());
        assert!(!tmp.path().join("vid/whisper/small/old").exists());
    }

    #[test]
    fn test_expire_with_huge_ttl_removes_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = ArtifactStore::new(tmp.path());
        put(&store, "old", "h1", 10_000);

        let removed = store.expire(Duration::from_secs(1_000_000_000_000_000)).unwrap();
        assert!(removed.is_empty());
        assert!(store.expire(Duration::MAX).unwrap().is_empty());
        assert!(tmp.path().join("old/whisper/small/h1").exists());
    }

    #[test]
    fn test_key_from_dir() {
        let key = key_from_dir(Path::new("/r"), Path::new("/r/v/e/m/h"));
        assert_eq!(key, CacheKey::new("v", "e", "m", "h"));
    }
}
