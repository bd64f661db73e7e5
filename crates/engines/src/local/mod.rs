//! Local model adapters
//!
//! Loading a model is expensive, so loaded models are kept in a
//! [`ModelCache`] keyed by `(model, device, compute_type)`. The cache is an
//! explicit object owned by the session and shared with adapters through an
//! `Arc`; there is no process-global model state.

#[cfg(feature = "whisper-rs")]
mod whisper_rs;

#[cfg(feature = "whisper-rs")]
pub use whisper_rs::WhisperRsLoader;

use crate::adapter::{AdapterKind, EngineLimits, TranscriptionEngine};
use crate::repair::{RawSegment, repair_segments};
use crate::{EngineError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use ytx_core::{AppConfig, ComputeType, DEFAULT_WHISPER_MODEL, Device, TranscriptSegment};

/// Engine name used in configuration and cache keys
pub const WHISPER_ENGINE: &str = "whisper";

/// Model presets accepted by the whisper engine
pub const WHISPER_PRESETS: &[&str] = &[
    "tiny", "tiny.en", "base", "base.en", "small", "small.en", "medium", "medium.en", "large-v1",
    "large-v2", "large-v3",
];

/// Identity of a loaded model
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelKey {
    /// Model preset name
    pub model: String,
    /// Device the model runs on
    pub device: Device,
    /// Numerical precision
    pub compute_type: ComputeType,
}

impl ModelKey {
    /// Key for the model a configuration asks for
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            device: config.device,
            compute_type: config.compute_type,
        }
    }
}

/// A loaded speech model
pub trait LocalModel: Send + Sync {
    /// Transcribe 16 kHz mono samples
    ///
    /// # Errors
    ///
    /// Returns an engine error when inference fails.
    fn transcribe(&self, samples: &[f32], language: Option<&str>) -> Result<Vec<RawSegment>>;

    /// Best-effort language detection
    fn detect_language(&self, _samples: &[f32]) -> Option<String> {
        None
    }
}

/// Loads models on cache misses
pub trait ModelLoader: Send + Sync {
    /// Load the model identified by `key`
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] when the model cannot be loaded.
    fn load(&self, key: &ModelKey) -> Result<Arc<dyn LocalModel>>;
}

/// Loaded models of one session
pub struct ModelCache {
    loader: Arc<dyn ModelLoader>,
    models: Mutex<HashMap<ModelKey, Arc<dyn LocalModel>>>,
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("loaded", &self.len())
            .finish_non_exhaustive()
    }
}

impl ModelCache {
    /// Empty cache loading through `loader`
    #[must_use]
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            models: Mutex::new(HashMap::new()),
        }
    }

    /// Empty cache using the backend compiled into this build
    #[must_use]
    pub fn with_default_loader() -> Self {
        Self::new(default_loader())
    }

    /// Loaded model for `key`, loading it on first use
    ///
    /// # Errors
    ///
    /// Propagates loader failures; failed loads are not cached.
    pub fn get_or_load(&self, key: &ModelKey) -> Result<Arc<dyn LocalModel>> {
        let mut models = self.models.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(model) = models.get(key) {
            tracing::debug!(model = %key.model, device = %key.device, "Reusing loaded model");
            return Ok(Arc::clone(model));
        }
        tracing::info!(
            model = %key.model,
            device = %key.device,
            compute_type = %key.compute_type,
            "Loading model"
        );
        let model = self.loader.load(key)?;
        models.insert(key.clone(), Arc::clone(&model));
        Ok(model)
    }

    /// Number of loaded models
    #[must_use]
    pub fn len(&self) -> usize {
        self.models
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when nothing is loaded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every loaded model
    pub fn clear(&self) {
        self.models
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// Directory holding local model files
///
/// `YTX_MODELS_DIR` when set, else `<data dir>/ytx/models`.
#[must_use]
pub fn default_models_dir() -> Option<PathBuf> {
    std::env::var_os("YTX_MODELS_DIR")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::data_dir().map(|d| d.join("ytx").join("models")))
}

/// Loader for builds without a local backend; every load fails
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableLoader;

impl ModelLoader for UnavailableLoader {
    fn load(&self, key: &ModelKey) -> Result<Arc<dyn LocalModel>> {
        Err(EngineError::unavailable(
            WHISPER_ENGINE,
            format!(
                "no local backend compiled in for model '{}'; rebuild with the `whisper-rs` feature",
                key.model
            ),
        ))
    }
}

/// Loader for the backend compiled into this build
#[must_use]
pub fn default_loader() -> Arc<dyn ModelLoader> {
    #[cfg(feature = "whisper-rs")]
    {
        match default_models_dir() {
            Some(dir) => Arc::new(WhisperRsLoader::new(dir)),
            None => Arc::new(UnavailableLoader),
        }
    }
    #[cfg(not(feature = "whisper-rs"))]
    {
        Arc::new(UnavailableLoader)
    }
}

/// Local whisper adapter backed by a shared [`ModelCache`]
#[derive(Debug, Clone)]
pub struct WhisperEngine {
    cache: Arc<ModelCache>,
}

impl WhisperEngine {
    /// Adapter sharing `cache` with the rest of the session
    #[must_use]
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self { cache }
    }

    fn load(&self, audio: &Path, config: &AppConfig) -> Result<(Arc<dyn LocalModel>, Vec<f32>)> {
        let model = self.resolve_model(&config.model)?;
        let key = ModelKey {
            model,
            ..ModelKey::from_config(config)
        };
        let model = self.cache.get_or_load(&key)?;
        let samples = ytx_audio::load_pcm_f32(audio)?;
        Ok((model, samples))
    }
}

impl TranscriptionEngine for WhisperEngine {
    fn name(&self) -> &'static str {
        WHISPER_ENGINE
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Local
    }

    fn limits(&self) -> EngineLimits {
        EngineLimits::unlimited()
    }

    fn default_model(&self) -> &'static str {
        DEFAULT_WHISPER_MODEL
    }

    fn is_valid_model(&self, model: &str) -> bool {
        WHISPER_PRESETS.contains(&model)
    }

    fn transcribe(&self, audio: &Path, config: &AppConfig) -> Result<Vec<TranscriptSegment>> {
        let (model, samples) = self.load(audio, config)?;
        tracing::debug!(
            samples = samples.len(),
            model = %config.model,
            "Running local transcription"
        );
        let raw = model.transcribe(&samples, config.language.as_deref())?;
        Ok(repair_segments(raw))
    }

    fn detect_language(&self, audio: &Path, config: &AppConfig) -> Option<String> {
        match self.load(audio, config) {
            Ok((model, samples)) => model.detect_language(&samples),
            Err(e) => {
                tracing::debug!(error = %e, "Local language detection unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        loads: AtomicUsize,
    }

    struct SilentModel;

    impl LocalModel for SilentModel {
        fn transcribe(&self, _samples: &[f32], _language: Option<&str>) -> Result<Vec<RawSegment>> {
            Ok(vec![RawSegment::new(0.0, 0.0, "hello")])
        }
    }

    impl ModelLoader for CountingLoader {
        fn load(&self, _key: &ModelKey) -> Result<Arc<dyn LocalModel>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(SilentModel))
        }
    }

    fn key(model: &str, device: Device) -> ModelKey {
        ModelKey {
            model: model.to_string(),
            device,
            compute_type: ComputeType::Int8,
        }
    }

    #[test]
    fn test_cache_reuses_identical_keys() {
        let loader = Arc::new(CountingLoader {
            loads: AtomicUsize::new(0),
        });
        let cache = ModelCache::new(loader.clone());

        cache.get_or_load(&key("small", Device::Cpu)).unwrap();
        cache.get_or_load(&key("small", Device::Cpu)).unwrap();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);

        cache.get_or_load(&key("small", Device::Cuda)).unwrap();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unknown_preset_rejected_before_io() {
        let engine = WhisperEngine::new(Arc::new(ModelCache::new(Arc::new(UnavailableLoader))));
        let config = AppConfig::for_engine("whisper").with_engine("whisper", "huge");
        let err = engine
            .transcribe(Path::new("/nonexistent/audio.wav"), &config)
            .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_unavailable_backend() {
        let engine = WhisperEngine::new(Arc::new(ModelCache::new(Arc::new(UnavailableLoader))));
        let err = engine
            .transcribe(Path::new("/nonexistent/audio.wav"), &AppConfig::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::Unavailable { .. }));
    }

    #[test]
    fn test_models_dir_override() {
        temp_env::with_var("YTX_MODELS_DIR", Some("/opt/models"), || {
            assert_eq!(default_models_dir(), Some(PathBuf::from("/opt/models")));
        });
    }
}
