//! Chunked transcription for engines with per-request limits
//!
//! Long audio is split into overlapping windows (see
//! [`ytx_audio::compute_chunks`]), each window is sliced into its own file and
//! transcribed, and the results are shifted by the window start and merged
//! into one timeline. Chunks run strictly in order because the merge of a
//! chunk depends on the last end emitted by the previous one.
//!
//! The transcript language is the first one an engine reports. Without one,
//! and without a configured language, detection runs on the first request's
//! audio, never on a file larger than the engine accepts.

use crate::adapter::{EngineTranscript, TranscriptionEngine};
use crate::progress::ProgressReporter;
use crate::repair::{RawSegment, SegmentRepairer};
use crate::{EngineError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ytx_audio::{Chunk, compute_chunks, probe_duration, slice_segment};
use ytx_core::{AppConfig, TimestampPolicy, TranscriptSegment};

/// Runs one engine over audio of any length
pub struct ChunkedTranscriber {
    engine: Arc<dyn TranscriptionEngine>,
    work_dir: PathBuf,
}

impl std::fmt::Debug for ChunkedTranscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkedTranscriber")
            .field("engine", &self.engine.name())
            .field("work_dir", &self.work_dir)
            .finish()
    }
}

impl ChunkedTranscriber {
    /// Transcriber slicing chunk files into `work_dir`
    pub fn new(engine: Arc<dyn TranscriptionEngine>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            work_dir: work_dir.into(),
        }
    }

    /// Windows used for audio of this length and size, or `None` for a
    /// single request
    ///
    /// # Errors
    ///
    /// Returns an invalid chunking error for unusable limits.
    pub fn plan(&self, duration: f64, bytes: u64, config: &AppConfig) -> Result<Option<Vec<Chunk>>> {
        let limits = self.engine.limits();
        let forced = config.timestamps == TimestampPolicy::Chunked;
        if !forced && !limits.exceeded_by(duration, bytes) {
            return Ok(None);
        }
        let window = limits.window_seconds(duration, bytes);
        let chunks = compute_chunks(duration, window, limits.chunk_overlap_seconds)?;
        Ok(Some(chunks))
    }

    /// Transcribe `audio`, chunking when the engine's limits or the
    /// timestamp policy require it
    ///
    /// # Errors
    ///
    /// Fails when any chunk fails ([`EngineError::ChunkFailed`]); partial
    /// results are never returned.
    pub fn transcribe(
        &self,
        audio: &Path,
        config: &AppConfig,
        progress: &ProgressReporter,
    ) -> Result<EngineTranscript> {
        let engine = self.engine.name();
        // Unknown models fail before any audio is touched
        self.engine.resolve_model(&config.model)?;

        let duration = probe_duration(audio)?;
        let bytes = std::fs::metadata(audio)
            .map_err(|e| ytx_audio::Error::io(e, audio, "metadata"))?
            .len();

        let Some(chunks) = self.plan(duration, bytes, config)? else {
            tracing::debug!(engine, duration, bytes, "Transcribing in a single request");
            let transcript = self.engine.transcribe_with_language(audio, config)?;
            let language = transcript
                .language
                .or_else(|| self.detect_if_unknown(audio, config));
            progress.report(1.0);
            return Ok(EngineTranscript {
                segments: merge([(0.0, transcript.segments)]),
                language,
            });
        };

        std::fs::create_dir_all(&self.work_dir)
            .map_err(|e| ytx_audio::Error::io(e, &self.work_dir, "create_dir_all"))?;

        let total = chunks.len();
        tracing::info!(engine, duration, chunks = total, "Transcribing in chunks");
        let mut repairer = SegmentRepairer::new();
        let mut merged = Vec::new();
        let mut language = None;

        for (i, chunk) in chunks.iter().enumerate() {
            let chunk_path = self.work_dir.join(format!("chunk_{i:04}.wav"));
            slice_segment(audio, &chunk_path, chunk.start, chunk.end)?;

            let result = self.engine.transcribe_with_language(&chunk_path, config);
            if let (0, Ok(first)) = (i, &result) {
                language = first
                    .language
                    .clone()
                    .or_else(|| self.detect_if_unknown(&chunk_path, config));
            }
            remove_chunk_file(&chunk_path);
            let transcript = result.map_err(|source| EngineError::ChunkFailed {
                engine: engine.to_string(),
                index: i + 1,
                total,
                start: chunk.start,
                end: chunk.end,
                source: Box::new(source),
            })?;

            tracing::debug!(
                engine,
                chunk = i + 1,
                total,
                start = chunk.start,
                segments = transcript.segments.len(),
                "Chunk transcribed"
            );
            if language.is_none() {
                language = transcript.language;
            }
            merged.extend(
                transcript
                    .segments
                    .iter()
                    .filter_map(|s| repairer.push(RawSegment::offset_from(s, chunk.start))),
            );
            progress.report((i + 1) as f64 / total as f64);
        }

        Ok(EngineTranscript {
            segments: merged,
            language,
        })
    }

    fn detect_if_unknown(&self, audio: &Path, config: &AppConfig) -> Option<String> {
        if config.language.is_some() {
            return None;
        }
        self.engine.detect_language(audio, config)
    }
}

/// Merge per-chunk results given as `(window_start, segments)` pairs
///
/// Segments are shifted by their window start, pushed forward past the
/// previous end, degenerate lengths extended, and ids renumbered.
pub fn merge<I>(chunks: I) -> Vec<TranscriptSegment>
where
    I: IntoIterator<Item = (f64, Vec<TranscriptSegment>)>,
{
    let mut repairer = SegmentRepairer::new();
    chunks
        .into_iter()
        .flat_map(|(offset, segments)| {
            segments
                .into_iter()
                .map(move |s| RawSegment::offset_from(&s, offset))
        })
        .filter_map(|raw| repairer.push(raw))
        .collect()
}

fn remove_chunk_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::debug!(path = %path.display(), error = %e, "Could not remove chunk file");
    }
}
