//! Engine selection with single-hop fallback
//!
//! ```text
//! Requested(engine, model) -> Attempting(engine) -> Succeeded | Failed
//! Failed(remote, engine error) + fallback enabled -> Attempting(secondary)
//! ```
//!
//! A failure of the secondary engine is terminal. The engine and model that
//! actually produced the segments are reported in the outcome and become
//! authoritative for cache keys and metadata.

use crate::adapter::{AdapterKind, EngineTranscript, TranscriptionEngine};
use crate::chunked::ChunkedTranscriber;
use crate::progress::ProgressReporter;
use crate::registry::EngineRegistry;
use crate::{EngineError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use ytx_core::{AppConfig, DEFAULT_ENGINE, DEFAULT_WHISPER_MODEL, TranscriptSegment};

/// When and where to fall back
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Whether fallback is allowed at all
    pub enabled: bool,
    /// Engine used after a remote failure
    pub secondary_engine: String,
    /// Model used when the requested model is not valid for the secondary
    pub secondary_default_model: String,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            secondary_engine: DEFAULT_ENGINE.to_string(),
            secondary_default_model: DEFAULT_WHISPER_MODEL.to_string(),
        }
    }
}

impl FallbackPolicy {
    /// Default policy honouring the configuration's `fallback` switch
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            enabled: config.fallback,
            ..Self::default()
        }
    }

    /// Policy that never falls back
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// An engine together with the model it runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineChoice {
    /// Engine name
    pub engine: String,
    /// Model name
    pub model: String,
}

impl EngineChoice {
    /// Choice of `engine` running `model`
    pub fn new(engine: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            model: model.into(),
        }
    }
}

impl fmt::Display for EngineChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.engine, self.model)
    }
}

/// States visited during one run, in order
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptState {
    /// What the caller asked for
    Requested(EngineChoice),
    /// An engine is running
    Attempting(EngineChoice),
    /// The engine produced this many segments
    Succeeded {
        /// Engine and model that ran
        choice: EngineChoice,
        /// Number of segments produced
        segments: usize,
    },
    /// The engine failed
    Failed {
        /// Engine and model that ran
        choice: EngineChoice,
        /// Rendered error
        error: String,
    },
}

/// Result of a successful orchestrated run
#[derive(Debug, Clone)]
pub struct TranscriptionOutcome {
    /// Engine and model the caller asked for
    pub requested: EngineChoice,
    /// Engine and model that produced the segments
    pub used: EngineChoice,
    /// Merged transcript segments
    pub segments: Vec<TranscriptSegment>,
    /// Configured or detected language
    pub language: Option<String>,
    /// State trail of the run
    pub attempts: Vec<AttemptState>,
    /// Configuration the used engine ran with
    pub config: AppConfig,
}

impl TranscriptionOutcome {
    /// True when the secondary engine produced the result
    #[must_use]
    pub fn fell_back(&self) -> bool {
        self.requested.engine != self.used.engine
    }
}

/// Tries the requested engine, then at most one fallback
pub struct FallbackOrchestrator {
    registry: Arc<EngineRegistry>,
    policy: FallbackPolicy,
    work_dir: PathBuf,
}

impl fmt::Debug for FallbackOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallbackOrchestrator")
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .field("work_dir", &self.work_dir)
            .finish()
    }
}

impl FallbackOrchestrator {
    /// Orchestrator slicing chunk files into `work_dir`
    pub fn new(registry: Arc<EngineRegistry>, policy: FallbackPolicy, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            policy,
            work_dir: work_dir.into(),
        }
    }

    /// Whether a failure of `engine` with `error` moves on to the secondary
    fn should_fall_back(&self, engine: &dyn TranscriptionEngine, error: &EngineError) -> bool {
        self.policy.enabled
            && engine.kind() == AdapterKind::Remote
            && !error.is_configuration()
            && engine.name() != self.policy.secondary_engine
    }

    fn attempt(
        &self,
        engine: &Arc<dyn TranscriptionEngine>,
        audio: &Path,
        config: &AppConfig,
        progress: &ProgressReporter,
    ) -> Result<EngineTranscript> {
        let work_dir = self.work_dir.join(engine.name());
        ChunkedTranscriber::new(Arc::clone(engine), work_dir).transcribe(audio, config, progress)
    }

    /// Transcribe `audio` with the configured engine, falling back once
    ///
    /// # Errors
    ///
    /// Returns the primary error when fallback is not eligible, and
    /// [`EngineError::FallbackFailed`] when the secondary fails too.
    pub fn run(
        &self,
        audio: &Path,
        config: &AppConfig,
        progress: &ProgressReporter,
    ) -> Result<TranscriptionOutcome> {
        let requested = EngineChoice::new(&config.engine, &config.model);
        let mut attempts = vec![AttemptState::Requested(requested.clone())];

        let primary = self.registry.get_required(&config.engine)?;
        let primary_model = primary.resolve_model(&config.model)?;
        let primary_choice = EngineChoice::new(primary.name(), primary_model);
        let primary_config = config.with_engine(primary.name(), primary_choice.model.clone());
        attempts.push(AttemptState::Attempting(primary_choice.clone()));

        let primary_error = match self.attempt(&primary, audio, &primary_config, progress) {
            Ok(transcript) => {
                attempts.push(AttemptState::Succeeded {
                    choice: primary_choice.clone(),
                    segments: transcript.segments.len(),
                });
                return Ok(finish(
                    requested,
                    primary_choice,
                    transcript,
                    attempts,
                    primary_config,
                ));
            }
            Err(e) => e,
        };
        attempts.push(AttemptState::Failed {
            choice: primary_choice.clone(),
            error: primary_error.to_string(),
        });

        if !self.should_fall_back(primary.as_ref(), &primary_error) {
            return Err(primary_error);
        }
        let Some(secondary) = self.registry.get(&self.policy.secondary_engine) else {
            tracing::warn!(
                secondary = %self.policy.secondary_engine,
                "Fallback engine is not registered"
            );
            return Err(primary_error);
        };

        let model = if secondary.is_valid_model(&config.model) {
            config.model.clone()
        } else {
            self.policy.secondary_default_model.clone()
        };
        let secondary_choice = EngineChoice::new(secondary.name(), model);
        tracing::warn!(
            primary = %primary_choice,
            secondary = %secondary_choice,
            error = %primary_error,
            "Primary engine failed; falling back"
        );
        let secondary_config = config.with_engine(secondary.name(), secondary_choice.model.clone());
        attempts.push(AttemptState::Attempting(secondary_choice.clone()));

        match self.attempt(&secondary, audio, &secondary_config, &progress.remaining()) {
            Ok(transcript) => {
                attempts.push(AttemptState::Succeeded {
                    choice: secondary_choice.clone(),
                    segments: transcript.segments.len(),
                });
                Ok(finish(
                    requested,
                    secondary_choice,
                    transcript,
                    attempts,
                    secondary_config,
                ))
            }
            Err(secondary_error) => Err(EngineError::FallbackFailed {
                primary: primary_choice.engine,
                primary_error: Box::new(primary_error),
                secondary: secondary_choice.engine,
                secondary_error: Box::new(secondary_error),
            }),
        }
    }
}

fn finish(
    requested: EngineChoice,
    used: EngineChoice,
    transcript: EngineTranscript,
    attempts: Vec<AttemptState>,
    config: AppConfig,
) -> TranscriptionOutcome {
    let EngineTranscript { segments, language } = transcript;
    let language = config.language.clone().or(language);
    tracing::info!(
        requested = %requested,
        used = %used,
        segments = segments.len(),
        "Transcription finished"
    );
    TranscriptionOutcome {
        requested,
        used,
        segments,
        language,
        attempts,
        config,
    }
}
