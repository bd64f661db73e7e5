//! The contract every transcription provider satisfies

use crate::{EngineError, Result};
use std::path::Path;
use ytx_core::{AppConfig, TranscriptSegment};

/// Window used when an engine has no duration limit but chunking is forced
pub const DEFAULT_WINDOW_SECONDS: f64 = 600.0;
/// Overlap used between forced chunks
pub const DEFAULT_OVERLAP_SECONDS: f64 = 2.0;

/// Where an engine runs; fallback only ever leaves a remote engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdapterKind {
    /// In-process model
    Local,
    /// Network API
    Remote,
}

/// Size limits of a single engine request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineLimits {
    /// Longest audio accepted in one request
    pub max_request_seconds: Option<f64>,
    /// Largest audio file accepted in one request
    pub max_request_bytes: Option<u64>,
    /// Overlap between consecutive chunks
    pub chunk_overlap_seconds: f64,
}

impl EngineLimits {
    /// No request limits
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_request_seconds: None,
            max_request_bytes: None,
            chunk_overlap_seconds: DEFAULT_OVERLAP_SECONDS,
        }
    }

    /// True when audio of this length and size cannot go out in one request
    #[must_use]
    pub fn exceeded_by(&self, duration_seconds: f64, bytes: u64) -> bool {
        self.max_request_seconds
            .is_some_and(|max| duration_seconds > max)
            || self.max_request_bytes.is_some_and(|max| bytes > max)
    }

    /// Chunk window for audio of this length and size
    ///
    /// Starts from the duration limit and shrinks proportionally when the
    /// byte limit would still be exceeded.
    #[must_use]
    pub fn window_seconds(&self, duration_seconds: f64, bytes: u64) -> f64 {
        let mut window = self.max_request_seconds.unwrap_or(DEFAULT_WINDOW_SECONDS);
        if let Some(max_bytes) = self.max_request_bytes {
            if bytes > max_bytes && duration_seconds > 0.0 {
                let bytes_per_second = bytes as f64 / duration_seconds;
                // Keep 5% headroom for container overhead
                window = window.min(max_bytes as f64 * 0.95 / bytes_per_second);
            }
        }
        window.max(self.chunk_overlap_seconds * 2.0 + 1.0)
    }
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self::unlimited()
    }
}

/// Segments of one engine run with the language the engine reported
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineTranscript {
    /// Ordered, repaired segments
    pub segments: Vec<TranscriptSegment>,
    /// Spoken language, when the engine reported one
    pub language: Option<String>,
}

/// A transcription provider
///
/// Implementations take canonical 16 kHz mono WAV audio and must either
/// return a complete, ordered, non-overlapping segment sequence or fail with
/// an [`EngineError`]. Minor timing defects from the underlying model are
/// repaired with [`crate::repair`] before returning.
pub trait TranscriptionEngine: Send + Sync {
    /// Engine name used in configuration and cache keys
    fn name(&self) -> &'static str;

    /// Local model or remote API
    fn kind(&self) -> AdapterKind;

    /// Per-request limits
    fn limits(&self) -> EngineLimits {
        EngineLimits::unlimited()
    }

    /// Model used when the requested one is not valid for this engine
    fn default_model(&self) -> &'static str;

    /// Whether `model` names a model this engine can run
    fn is_valid_model(&self, model: &str) -> bool;

    /// Model that will actually run for a requested name
    ///
    /// # Errors
    ///
    /// Rejects unknown models with [`EngineError::InvalidConfiguration`].
    fn resolve_model(&self, requested: &str) -> Result<String> {
        if self.is_valid_model(requested) {
            Ok(requested.to_string())
        } else {
            Err(EngineError::invalid_configuration(
                self.name(),
                format!("unknown model '{requested}'"),
            ))
        }
    }

    /// Transcribe a whole audio file
    ///
    /// # Errors
    ///
    /// Returns an [`EngineError`] when transcription cannot be completed.
    fn transcribe(&self, audio: &Path, config: &AppConfig) -> Result<Vec<TranscriptSegment>>;

    /// Transcribe and keep whatever language the engine reported alongside
    ///
    /// Engines whose responses carry a language override this; the default
    /// reports none.
    ///
    /// # Errors
    ///
    /// Same as [`TranscriptionEngine::transcribe`].
    fn transcribe_with_language(&self, audio: &Path, config: &AppConfig) -> Result<EngineTranscript> {
        Ok(EngineTranscript {
            segments: self.transcribe(audio, config)?,
            language: None,
        })
    }

    /// Best-effort spoken language detection; `None` when unknown
    fn detect_language(&self, _audio: &Path, _config: &AppConfig) -> Option<String> {
        None
    }
}
