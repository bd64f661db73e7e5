//! Run configuration for ytx
//!
//! [`AppConfig`] carries every knob that influences a transcription run.
//! Values come from defaults, `YTX_*` environment variables, or are built
//! directly by library callers. Secrets never live here: provider API keys
//! are read by the adapters that need them.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Engine used when none is configured
pub const DEFAULT_ENGINE: &str = "whisper";
/// Default model of the local whisper engine
pub const DEFAULT_WHISPER_MODEL: &str = "small";
/// Default model of the Gemini engine
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Prefix shared by every environment variable read by [`AppConfig::from_env`]
pub const ENV_PREFIX: &str = "YTX_";

/// Default model for an engine name
#[must_use]
pub fn default_model_for(engine: &str) -> &'static str {
    match engine {
        "gemini" => DEFAULT_GEMINI_MODEL,
        _ => DEFAULT_WHISPER_MODEL,
    }
}

/// Compute device for local models
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// Run on the CPU
    #[default]
    Cpu,
    /// Let the backend pick
    Auto,
    /// NVIDIA CUDA
    Cuda,
    /// Apple Metal
    Metal,
}

impl Device {
    /// String form used in config files, env vars and hashes
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Auto => "auto",
            Self::Cuda => "cuda",
            Self::Metal => "metal",
        }
    }
}

impl FromStr for Device {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "auto" => Ok(Self::Auto),
            "cuda" => Ok(Self::Cuda),
            "metal" => Ok(Self::Metal),
            other => Err(Error::configuration(format!("unknown device '{other}'"))),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numerical precision for local models
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ComputeType {
    /// Backend default
    Auto,
    /// 8-bit integer weights
    #[default]
    Int8,
    /// 8-bit weights with 16-bit float activations
    Int8Float16,
    /// 16-bit float
    Float16,
    /// 32-bit float
    Float32,
}

impl ComputeType {
    /// String form used in config files, env vars and hashes
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Int8 => "int8",
            Self::Int8Float16 => "int8_float16",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
        }
    }
}

impl FromStr for ComputeType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "int8" => Ok(Self::Int8),
            "int8_float16" => Ok(Self::Int8Float16),
            "float16" => Ok(Self::Float16),
            "float32" => Ok(Self::Float32),
            other => Err(Error::configuration(format!(
                "unknown compute type '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ComputeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How segment timestamps are produced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimestampPolicy {
    /// Use the engine's own timestamps, chunking only when a provider limit requires it
    #[default]
    Native,
    /// Always split the audio into overlapping windows and re-base timestamps
    Chunked,
}

impl TimestampPolicy {
    /// String form used in config files, env vars and hashes
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Chunked => "chunked",
        }
    }
}

impl FromStr for TimestampPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" => Ok(Self::Native),
            "chunked" => Ok(Self::Chunked),
            other => Err(Error::configuration(format!(
                "unknown timestamp policy '{other}'"
            ))),
        }
    }
}

/// Configuration for one transcription run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Transcription engine name (`whisper`, `gemini`, ...)
    pub engine: String,
    /// Engine model name
    pub model: String,
    /// Target language; `None` lets the engine detect it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Compute device for local models
    pub device: Device,
    /// Numerical precision for local models
    pub compute_type: ComputeType,
    /// Timestamp policy
    pub timestamps: TimestampPolicy,
    /// Provider specific options (temperature, beam size, ...)
    pub engine_options: BTreeMap<String, serde_json::Value>,
    /// Allow falling back to the local engine when a remote provider fails
    pub fallback: bool,
    /// Expire cache entries older than this many seconds at start-up
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_ttl_seconds: Option<u64>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            model: DEFAULT_WHISPER_MODEL.to_string(),
            language: None,
            device: Device::default(),
            compute_type: ComputeType::default(),
            timestamps: TimestampPolicy::default(),
            engine_options: BTreeMap::new(),
            fallback: true,
            cache_ttl_seconds: None,
        }
    }
}

impl AppConfig {
    /// Configuration for an engine with its default model
    #[must_use]
    pub fn for_engine(engine: impl Into<String>) -> Self {
        let engine = engine.into();
        let model = default_model_for(&engine).to_string();
        Self {
            engine,
            model,
            ..Self::default()
        }
    }

    /// Load configuration from `YTX_*` environment variables
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a variable holds an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    ///
    /// Empty values are treated as unset. `YTX_LANGUAGE=auto` means "detect".
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a variable holds an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(&format!("{ENV_PREFIX}{key}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Self::default();
        if let Some(engine) = get("ENGINE") {
            config.engine = engine.to_ascii_lowercase();
        }
        config.model = get("MODEL").unwrap_or_else(|| default_model_for(&config.engine).to_string());
        config.language = get("LANGUAGE").filter(|l| !l.eq_ignore_ascii_case("auto"));
        if let Some(device) = get("DEVICE") {
            config.device = device.parse()?;
        }
        if let Some(compute) = get("COMPUTE_TYPE") {
            config.compute_type = compute.parse()?;
        }
        if let Some(ts) = get("TIMESTAMPS") {
            config.timestamps = ts.parse()?;
        }
        if let Some(fallback) = get("FALLBACK") {
            config.fallback = parse_bool(&fallback)?;
        }
        if let Some(ttl) = get("CACHE_TTL_SECONDS") {
            config.cache_ttl_seconds = Some(ttl.parse().map_err(|_| {
                Error::configuration(format!("YTX_CACHE_TTL_SECONDS is not a number: '{ttl}'"))
            })?);
        }
        if let Some(options) = get("ENGINE_OPTIONS") {
            config.engine_options = serde_json::from_str(&options).map_err(|e| {
                Error::configuration(format!("YTX_ENGINE_OPTIONS must be a JSON object: {e}"))
            })?;
        }

        config.validate()?;
        tracing::debug!(
            engine = %config.engine,
            model = %config.model,
            device = %config.device,
            "Loaded configuration from environment"
        );
        Ok(config)
    }

    /// Reject values that cannot produce a meaningful run
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.engine.trim().is_empty() {
            return Err(Error::configuration("engine must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(Error::configuration("model must not be empty"));
        }
        if let Some(lang) = &self.language {
            let valid = !lang.is_empty()
                && lang
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !valid {
                return Err(Error::configuration(format!(
                    "language '{lang}' is not a language code"
                )));
            }
        }
        if self.engine_options.keys().any(|k| k.trim().is_empty()) {
            return Err(Error::configuration("engine option names must not be empty"));
        }
        Ok(())
    }

    /// Copy of this configuration targeting another engine and model
    #[must_use]
    pub fn with_engine(&self, engine: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            model: model.into(),
            ..self.clone()
        }
    }

    /// Numeric engine option, if present
    #[must_use]
    pub fn option_f64(&self, name: &str) -> Option<f64> {
        self.engine_options.get(name).and_then(|v| v.as_f64())
    }

    /// Stable hash of the output-relevant fields, see [`crate::hashing`]
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the hash input cannot be encoded.
    pub fn config_hash(&self) -> Result<String> {
        crate::hashing::config_hash(self)
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::configuration(format!("expected a boolean, got '{other}'"))),
    }
}
