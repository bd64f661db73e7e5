//! whisper.cpp backend through `whisper-rs`

use super::{LocalModel, ModelKey, ModelLoader, WHISPER_ENGINE};
use crate::repair::RawSegment;
use crate::{EngineError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};
use ytx_core::Device;

/// Loads `ggml-<model>.bin` files from a models directory
#[derive(Debug, Clone)]
pub struct WhisperRsLoader {
    models_dir: PathBuf,
}

impl WhisperRsLoader {
    /// Loader reading model files from `models_dir`
    #[must_use]
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    /// Path of the model file for a preset
    #[must_use]
    pub fn model_path(&self, model: &str) -> PathBuf {
        self.models_dir.join(format!("ggml-{model}.bin"))
    }
}

impl ModelLoader for WhisperRsLoader {
    fn load(&self, key: &ModelKey) -> Result<Arc<dyn LocalModel>> {
        let path = self.model_path(&key.model);
        if !path.is_file() {
            return Err(EngineError::unavailable(
                WHISPER_ENGINE,
                format!("model file {} not found", path.display()),
            ));
        }
        let path_str = path.to_str().ok_or_else(|| {
            EngineError::unavailable(WHISPER_ENGINE, format!("non UTF-8 model path {}", path.display()))
        })?;

        let mut params = WhisperContextParameters::default();
        params.use_gpu(!matches!(key.device, Device::Cpu));
        let context = WhisperContext::new_with_params(path_str, params).map_err(|e| {
            EngineError::unavailable(WHISPER_ENGINE, format!("failed to load {}: {e}", path.display()))
        })?;
        Ok(Arc::new(WhisperRsModel { context }))
    }
}

struct WhisperRsModel {
    context: WhisperContext,
}

fn inference_error(e: impl std::fmt::Display) -> EngineError {
    EngineError::request(WHISPER_ENGINE, e.to_string())
}

impl LocalModel for WhisperRsModel {
    fn transcribe(&self, samples: &[f32], language: Option<&str>) -> Result<Vec<RawSegment>> {
        let mut state = self.context.create_state().map_err(inference_error)?;
        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(language.unwrap_or("auto")));
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_special(false);
        params.set_print_timestamps(false);
        state.full(params, samples).map_err(inference_error)?;

        let count = state.full_n_segments().map_err(inference_error)?;
        let mut segments = Vec::with_capacity(usize::try_from(count).unwrap_or_default());
        for i in 0..count {
            let text = state.full_get_segment_text(i).map_err(inference_error)?;
            // Timestamps are in centiseconds
            let t0 = state.full_get_segment_t0(i).map_err(inference_error)?;
            let t1 = state.full_get_segment_t1(i).map_err(inference_error)?;
            segments.push(RawSegment::new(t0 as f64 / 100.0, t1 as f64 / 100.0, text));
        }
        Ok(segments)
    }

    fn detect_language(&self, samples: &[f32]) -> Option<String> {
        let mut state = self.context.create_state().ok()?;
        state.pcm_to_mel(samples, 1).ok()?;
        let (lang_id, _) = state.lang_detect(0, 1).ok()?;
        whisper_rs::get_lang_str(lang_id).map(str::to_string)
    }
}
