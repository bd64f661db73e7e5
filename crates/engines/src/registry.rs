//! Engine registry
//!
//! Maps engine names to adapters so orchestration code dispatches purely on
//! the [`TranscriptionEngine`] contract, never on concrete provider types.

use crate::adapter::TranscriptionEngine;
use crate::local::{ModelCache, WhisperEngine};
use crate::remote::GeminiEngine;
use crate::{EngineError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of transcription engines keyed by [`TranscriptionEngine::name`]
#[derive(Default, Clone)]
pub struct EngineRegistry {
    engines: HashMap<&'static str, Arc<dyn TranscriptionEngine>>,
}

impl EngineRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            engines: HashMap::new(),
        }
    }

    /// Registry with the local whisper engine and the Gemini engine
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] if the Gemini HTTP client cannot
    /// be built.
    pub fn with_defaults(models: Arc<ModelCache>) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(WhisperEngine::new(models)));
        registry.register(Arc::new(GeminiEngine::from_env()?));
        Ok(registry)
    }

    /// Register an engine, replacing one with the same name
    pub fn register(&mut self, engine: Arc<dyn TranscriptionEngine>) {
        self.engines.insert(engine.name(), engine);
    }

    /// Engine registered under `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn TranscriptionEngine>> {
        self.engines.get(name).cloned()
    }

    /// Engine registered under `name`, or a configuration error
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfiguration`] for unknown names.
    pub fn get_required(&self, name: &str) -> Result<Arc<dyn TranscriptionEngine>> {
        self.get(name).ok_or_else(|| {
            EngineError::invalid_configuration(
                name,
                format!("unknown engine; available: {}", self.engines().join(", ")),
            )
        })
    }

    /// Whether an engine is registered under `name`
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.engines.contains_key(name)
    }

    /// Registered engine names, sorted
    #[must_use]
    pub fn engines(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.engines.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.engines())
            .finish()
    }
}
