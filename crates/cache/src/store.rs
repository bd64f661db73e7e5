//! Artifact store: resolution, atomic writes and integrity checks
//!
//! An artifact set is complete once both `transcript.json` and
//! `captions.srt` are present and non-empty. Writers go through
//! [`ArtifactStore::write_atomic`] so readers only ever observe either the
//! previous or the new complete content of a file.

use crate::captions::render_srt;
use crate::meta::{ArtifactMeta, RequestedEngine, SourceInfo};
use crate::paths::{ArtifactPaths, CacheKey, cache_root};
use crate::{Error, Result};
use chrono::{SubsecRound, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use ytx_core::{TranscriptDoc, VideoMetadata};

/// Filesystem-backed store of transcript artifact sets
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Create a store rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store at the process-wide cache root
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(cache_root()?))
    }

    /// Root directory of the store
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve the artifact paths of `key`, creating the directory when asked
    pub fn resolve(&self, key: &CacheKey, create: bool) -> Result<ArtifactPaths> {
        let dir = self.root.join(key.relative_dir());
        if create {
            fs::create_dir_all(&dir).map_err(|e| Error::io(e, &dir, "create_dir_all"))?;
        }
        Ok(ArtifactPaths::in_dir(dir))
    }

    /// True when transcript and captions both exist and are non-empty
    #[must_use]
    pub fn exists(&self, paths: &ArtifactPaths) -> bool {
        non_empty_file(&paths.transcript_json) && non_empty_file(&paths.captions_srt)
    }

    /// Read and validate the persisted transcript
    ///
    /// Absence yields [`Error::Missing`]; unreadable JSON or a document that
    /// fails validation yields [`Error::Corrupted`].
    pub fn read_transcript(&self, paths: &ArtifactPaths) -> Result<TranscriptDoc> {
        let path = &paths.transcript_json;
        let bytes = read_artifact(path)?;
        let doc: TranscriptDoc = serde_json::from_slice(&bytes)
            .map_err(|e| Error::corrupted(path, format!("invalid transcript JSON: {e}")))?;
        doc.validate()
            .map_err(|e| Error::corrupted(path, e.to_string()))?;
        Ok(doc)
    }

    /// Read the metadata record, with the same missing/corrupted split
    pub fn read_metadata(&self, paths: &ArtifactPaths) -> Result<ArtifactMeta> {
        let path = &paths.meta_json;
        let bytes = read_artifact(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| Error::corrupted(path, format!("invalid metadata JSON: {e}")))
    }

    /// Write `bytes` to `path` through a synced temporary sibling and an atomic rename
    pub fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<PathBuf> {
        let dir = path
            .parent()
            .ok_or_else(|| Error::configuration(format!("{} has no parent", path.display())))?;
        fs::create_dir_all(dir).map_err(|e| Error::io(e, dir, "create_dir_all"))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(e, dir, "create_temp"))?;
        tmp.write_all(bytes)
            .map_err(|e| Error::io(e, tmp.path(), "write"))?;
        tmp.as_file()
            .sync_all()
            .map_err(|e| Error::io(e, tmp.path(), "sync"))?;
        tmp.persist(path)
            .map_err(|e| Error::io(e.error, path, "rename"))?;
        sync_dir(dir);

        tracing::trace!(path = %path.display(), bytes = bytes.len(), "Wrote artifact");
        Ok(path.to_path_buf())
    }

    /// Atomically write the transcript document
    pub fn write_transcript(&self, paths: &ArtifactPaths, doc: &TranscriptDoc) -> Result<PathBuf> {
        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| Error::serialization(format!("failed to encode transcript: {e}")))?;
        self.write_atomic(&paths.transcript_json, &bytes)
    }

    /// Atomically write SRT captions rendered from the document
    ///
    /// A transcript without segments still gets a non-empty captions file so
    /// the entry counts as complete.
    pub fn write_captions(&self, paths: &ArtifactPaths, doc: &TranscriptDoc) -> Result<PathBuf> {
        let mut srt = render_srt(&doc.segments);
        if srt.is_empty() {
            srt.push('\n');
        }
        self.write_atomic(&paths.captions_srt, srt.as_bytes())
    }

    /// Assemble the metadata record for a freshly produced entry
    #[must_use]
    pub fn build_metadata(
        &self,
        key: &CacheKey,
        video: Option<&VideoMetadata>,
        requested: Option<RequestedEngine>,
    ) -> ArtifactMeta {
        let fell_back = requested
            .as_ref()
            .is_some_and(|r| r.engine != key.engine);
        ArtifactMeta {
            created_at: Utc::now().trunc_subsecs(0),
            ytx_version: ytx_core::VERSION.to_string(),
            video_id: key.video_id.clone(),
            engine: key.engine.clone(),
            model: key.model.clone(),
            config_hash: key.config_hash.clone(),
            source: video.map(SourceInfo::from),
            requested,
            fell_back,
        }
    }

    /// Atomically write the metadata record
    pub fn write_metadata(&self, paths: &ArtifactPaths, meta: &ArtifactMeta) -> Result<PathBuf> {
        let bytes = serde_json::to_vec_pretty(meta)
            .map_err(|e| Error::serialization(format!("failed to encode metadata: {e}")))?;
        self.write_atomic(&paths.meta_json, &bytes)
    }

    /// Write a complete artifact set: captions, metadata, then the transcript
    ///
    /// The transcript goes last so [`Self::exists`] cannot report a hit
    /// before every file is on disk.
    pub fn persist(
        &self,
        paths: &ArtifactPaths,
        doc: &TranscriptDoc,
        meta: &ArtifactMeta,
    ) -> Result<()> {
        fs::create_dir_all(&paths.dir).map_err(|e| Error::io(e, &paths.dir, "create_dir_all"))?;
        self.write_captions(paths, doc)?;
        self.write_metadata(paths, meta)?;
        self.write_transcript(paths, doc)?;
        tracing::info!(
            dir = %paths.dir.display(),
            video_id = %doc.video_id,
            engine = %doc.engine,
            model = %doc.model,
            segments = doc.segments.len(),
            "Persisted transcript artifacts"
        );
        Ok(())
    }
}

fn non_empty_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    match fs::read(path) {
        Ok(bytes) if bytes.is_empty() => Err(Error::corrupted(path, "file is empty")),
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(Error::missing(path)),
        Err(e) => Err(Error::io(e, path, "read")),
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) {
    // Best effort; failures here do not undo the rename
    if let Ok(handle) = fs::File::open(dir) {
        let _ = handle.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
