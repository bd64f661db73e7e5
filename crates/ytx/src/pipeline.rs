//! Cached transcription pipeline
//!
//! One run resolves the video, consults the artifact store and only on a miss
//! downloads, normalizes and transcribes the audio:
//!
//! ```text
//! fetch_metadata -> cache lookup --hit--> read transcript
//!                        |
//!                       miss -> download -> normalize -> transcribe (+fallback) -> persist
//! ```
//!
//! Artifacts are stored under the engine and model that actually produced
//! them. A corrupted entry is logged and reprocessed, never treated as a
//! plain miss.

use crate::maintenance::run_startup_sweep;
use crate::source::MediaSource;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use ytx_audio::{FfmpegTranscoder, Transcoder};
use ytx_cache::{ArtifactPaths, ArtifactStore, CacheKey, RequestedEngine};
use ytx_core::{AppConfig, TranscriptDoc, VideoMetadata};
use ytx_engines::{
    EngineRegistry, FallbackOrchestrator, FallbackPolicy, ModelCache, ProgressReporter,
    TranscriptionOutcome,
};

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The transcript, fresh or from the cache
    pub document: TranscriptDoc,
    /// Key the artifacts are stored under
    pub key: CacheKey,
    /// Files of the artifact set
    pub paths: ArtifactPaths,
    /// True when nothing was transcribed
    pub cache_hit: bool,
    /// True when the fallback engine produced the transcript
    pub fell_back: bool,
}

/// Transcribes videos, reusing cached artifacts where possible
pub struct CachedTranscriptionPipeline {
    config: AppConfig,
    store: ArtifactStore,
    source: Arc<dyn MediaSource>,
    transcoder: Arc<dyn Transcoder>,
    registry: Arc<EngineRegistry>,
    policy: FallbackPolicy,
}

impl std::fmt::Debug for CachedTranscriptionPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedTranscriptionPipeline")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("registry", &self.registry)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CachedTranscriptionPipeline {
    /// Pipeline over explicit collaborators
    ///
    /// The fallback policy follows `config.fallback`.
    pub fn new(
        config: AppConfig,
        store: ArtifactStore,
        source: Arc<dyn MediaSource>,
        transcoder: Arc<dyn Transcoder>,
        registry: Arc<EngineRegistry>,
    ) -> Self {
        let policy = FallbackPolicy::from_config(&config);
        Self {
            config,
            store,
            source,
            transcoder,
            registry,
            policy,
        }
    }

    /// Pipeline configured from `YTX_*` variables with the default cache
    /// root, ffmpeg and the built-in engines
    ///
    /// Runs the start-up cache sweep when `YTX_CACHE_TTL_SECONDS` is set.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or when no cache root can be resolved.
    pub fn from_env(source: Arc<dyn MediaSource>) -> Result<Self> {
        let config = AppConfig::from_env()?;
        let store = ArtifactStore::open_default()?;
        let models = Arc::new(ModelCache::with_default_loader());
        let registry = Arc::new(EngineRegistry::with_defaults(models)?);
        let pipeline = Self::new(
            config,
            store,
            source,
            Arc::new(FfmpegTranscoder::new()),
            registry,
        );
        pipeline.startup_sweep();
        Ok(pipeline)
    }

    /// Override the fallback policy
    #[must_use]
    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Underlying artifact store
    #[must_use]
    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Expire entries older than the configured TTL
    pub fn startup_sweep(&self) -> Vec<CacheKey> {
        run_startup_sweep(
            &self.store,
            self.config.cache_ttl_seconds.map(Duration::from_secs),
        )
    }

    /// Configuration the requested engine will actually run with
    fn effective_config(&self) -> Result<AppConfig> {
        let engine = self.registry.get_required(&self.config.engine)?;
        let model = engine.resolve_model(&self.config.model)?;
        Ok(self.config.with_engine(engine.name(), model))
    }

    /// Transcribe the video at `url`, or return its cached transcript
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid, the media source or
    /// transcoder fail, transcription fails (after fallback where eligible),
    /// or the artifacts cannot be written.
    pub fn run(&self, url: &str, progress: &ProgressReporter) -> Result<PipelineOutcome> {
        self.config.validate()?;
        let effective = self.effective_config()?;

        let video = self.source.fetch_metadata(url)?;
        let key = CacheKey::for_config(&video.id, &effective)?;
        let paths = self.store.resolve(&key, false)?;
        tracing::debug!(url, key = %key, "Resolved cache key");

        if let Some(hit) = self.lookup(&key, &paths)? {
            progress.report(1.0);
            return Ok(hit);
        }

        let work = tempfile::Builder::new()
            .prefix("ytx-")
            .tempdir()
            .map_err(|source| Error::Workspace { source })?;
        let downloaded = self.source.download_audio(&video, work.path())?;
        let audio = self
            .transcoder
            .normalize(&downloaded, &work.path().join("audio.wav"))?;

        let orchestrator = FallbackOrchestrator::new(
            Arc::clone(&self.registry),
            self.policy.clone(),
            work.path().join("chunks"),
        );
        let outcome = orchestrator.run(&audio, &effective, progress)?;
        let persisted = self.persist(&video, outcome)?;
        progress.report(1.0);
        Ok(persisted)
    }

    /// Cached outcome for `key`, or `None` when the entry must be (re)built
    fn lookup(&self, key: &CacheKey, paths: &ArtifactPaths) -> Result<Option<PipelineOutcome>> {
        if !self.store.exists(paths) {
            tracing::debug!(key = %key, "Cache miss");
            return Ok(None);
        }
        let document = match self.store.read_transcript(paths) {
            Ok(doc) => doc,
            Err(e) if e.is_corrupted() => {
                tracing::warn!(key = %key, error = %e, "Cached transcript is corrupted; reprocessing");
                return Ok(None);
            }
            Err(e) if e.is_missing() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let fell_back = match self.store.read_metadata(paths) {
            Ok(meta) => meta.fell_back,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache entry has no readable metadata");
                false
            }
        };
        tracing::info!(key = %key, segments = document.segments.len(), "Cache hit");
        Ok(Some(PipelineOutcome {
            document,
            key: key.clone(),
            paths: paths.clone(),
            cache_hit: true,
            fell_back,
        }))
    }

    fn persist(&self, video: &VideoMetadata, outcome: TranscriptionOutcome) -> Result<PipelineOutcome> {
        let fell_back = outcome.fell_back();
        let key = CacheKey::for_config(&video.id, &outcome.config)?;
        let paths = self.store.resolve(&key, true)?;

        let document = TranscriptDoc {
            video_id: video.id.clone(),
            source_url: video.url.clone(),
            title: Some(video.title.clone()).filter(|t| !t.trim().is_empty()),
            duration: video.duration,
            language: outcome.language,
            engine: outcome.used.engine,
            model: outcome.used.model,
            segments: outcome.segments,
            chapters: Some(video.chapters.clone()).filter(|c| !c.is_empty()),
            summary: None,
        };
        document.validate()?;

        let requested = RequestedEngine {
            engine: outcome.requested.engine,
            model: outcome.requested.model,
        };
        let meta = self.store.build_metadata(&key, Some(video), Some(requested));
        self.store.persist(&paths, &document, &meta)?;

        if fell_back {
            tracing::warn!(
                key = %key,
                "Transcript produced by the fallback engine"
            );
        }
        Ok(PipelineOutcome {
            document,
            key,
            paths,
            cache_hit: false,
            fell_back,
        })
    }
}
