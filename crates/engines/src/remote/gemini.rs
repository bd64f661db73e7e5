//! Gemini transcription over the `generateContent` REST API
//!
//! Audio is sent inline (base64) together with a prompt that asks for a JSON
//! transcript. The HTTP layer sits behind [`GenerationClient`] so the adapter
//! can be exercised without network access.

use super::retry::{RetryPolicy, classify_failure, retry_with_backoff};
use crate::adapter::{AdapterKind, EngineLimits, EngineTranscript, TranscriptionEngine};
use crate::repair::{RawSegment, repair_segments};
use crate::{EngineError, Result};
use base64::{Engine as _, engine::general_purpose};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use ytx_core::{AppConfig, DEFAULT_GEMINI_MODEL, TranscriptSegment};

/// Engine name used in configuration and cache keys
pub const GEMINI_ENGINE: &str = "gemini";
/// Public API endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Largest inline (base64) audio payload accepted per request
pub const MAX_INLINE_BYTES: u64 = 20 * 1024 * 1024;
/// Largest raw audio file whose base64 encoding fits [`MAX_INLINE_BYTES`]
pub const MAX_AUDIO_BYTES: u64 = MAX_INLINE_BYTES / 4 * 3;
/// Longest audio sent in one request, in seconds
pub const MAX_REQUEST_SECONDS: f64 = 600.0;
/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

const DEFAULT_TEMPERATURE: f64 = 0.2;
const API_KEY_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// One generation call
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// Model name, e.g. `gemini-2.5-flash`
    pub model: &'a str,
    /// Instruction text
    pub prompt: &'a str,
    /// Raw audio bytes
    pub audio: &'a [u8],
    /// MIME type of `audio`
    pub mime_type: &'a str,
    /// Sampling temperature
    pub temperature: f64,
}

/// Transport for generation calls, returning the model's text output
pub trait GenerationClient: Send + Sync {
    /// Run one generation request
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::RateLimited`] for quota failures so they can be
    /// retried, and other engine errors for everything else.
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String>;
}

/// [`GenerationClient`] talking to the Gemini REST API with blocking `reqwest`
pub struct HttpGenerationClient {
    http: reqwest::blocking::Client,
    api_key: Option<SecretString>,
    base_url: String,
}

impl std::fmt::Debug for HttpGenerationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGenerationClient")
            .field("base_url", &self.base_url)
            .field("has_api_key", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl HttpGenerationClient {
    /// Client with an explicit key
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] if the HTTP client cannot be built.
    pub fn new(api_key: Option<SecretString>) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| {
                EngineError::unavailable(GEMINI_ENGINE, format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Client reading the key from `GEMINI_API_KEY`, else `GOOGLE_API_KEY`
    ///
    /// A missing or malformed key does not fail here; requests then fail
    /// with [`EngineError::Unavailable`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self> {
        Self::new(load_api_key(|name| std::env::var(name).ok()))
    }

    /// Point the client at another endpoint
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{model}:generateContent", self.base_url)
    }
}

/// Read and lightly validate the API key
fn load_api_key<F>(lookup: F) -> Option<SecretString>
where
    F: Fn(&str) -> Option<String>,
{
    let key = API_KEY_VARS
        .iter()
        .find_map(|name| lookup(name).filter(|v| !v.trim().is_empty()))?;
    let key = key.trim().to_string();
    if !key.starts_with("AIza") || key.len() < 24 {
        tracing::warn!("Ignoring Gemini API key with an unexpected format");
        return None;
    }
    Some(SecretString::from(key))
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GenerationClient for HttpGenerationClient {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String> {
        let Some(api_key) = &self.api_key else {
            return Err(EngineError::unavailable(
                GEMINI_ENGINE,
                "API key not found; set GEMINI_API_KEY (or GOOGLE_API_KEY)",
            ));
        };

        let body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": request.prompt },
                    { "inline_data": {
                        "mime_type": request.mime_type,
                        "data": general_purpose::STANDARD.encode(request.audio),
                    }},
                ],
            }],
            "generationConfig": {
                "temperature": request.temperature,
                "response_mime_type": "application/json",
            },
        });

        tracing::debug!(
            model = request.model,
            bytes = request.audio.len(),
            "Sending Gemini generateContent request"
        );
        let response = self
            .http
            .post(self.endpoint(request.model))
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    EngineError::Timeout {
                        engine: GEMINI_ENGINE.to_string(),
                        seconds: REQUEST_TIMEOUT.as_secs(),
                    }
                } else {
                    classify_failure(GEMINI_ENGINE, format!("request failed: {e}"))
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let text = response.text().unwrap_or_default();
            return Err(EngineError::RateLimited {
                engine: GEMINI_ENGINE.to_string(),
                message: format!("{status}: {text}"),
            });
        }
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(classify_failure(GEMINI_ENGINE, format!("{status}: {text}")));
        }

        let parsed: GenerateResponse = response.json().map_err(|e| {
            EngineError::invalid_response(GEMINI_ENGINE, format!("unreadable response body: {e}"))
        })?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(EngineError::invalid_response(
                GEMINI_ENGINE,
                "response contained no text",
            ));
        }
        Ok(text)
    }
}

/// Transcript as requested from the model
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTranscript {
    /// Language reported by the model, if any
    pub language: Option<String>,
    /// Segments before repair
    pub segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
struct WireTranscript {
    #[serde(default)]
    language: Option<String>,
    segments: Vec<WireSegment>,
}

#[derive(Debug, Deserialize)]
struct WireSegment {
    start: f64,
    end: f64,
    text: String,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Strip a surrounding Markdown code fence, if present
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (`json`) on the opening line
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the model's JSON answer
///
/// # Errors
///
/// Returns [`EngineError::InvalidResponse`] when the text is not the
/// requested JSON shape.
pub fn parse_response(text: &str) -> Result<ParsedTranscript> {
    let wire: WireTranscript = serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        EngineError::invalid_response(GEMINI_ENGINE, format!("transcript is not valid JSON: {e}"))
    })?;
    let language = wire
        .language
        .map(|l| l.trim().to_ascii_lowercase())
        .filter(|l| !l.is_empty() && l != "unknown");
    let segments = wire
        .segments
        .into_iter()
        .map(|s| RawSegment {
            start: s.start,
            end: s.end,
            text: s.text,
            confidence: s.confidence,
        })
        .collect();
    Ok(ParsedTranscript { language, segments })
}

fn transcription_prompt(language: Option<&str>) -> String {
    let mut prompt = String::from(
        "Transcribe the attached audio verbatim. Respond with JSON only, using this schema: \
         {\"language\": \"<ISO 639-1 code>\", \"segments\": [{\"start\": <seconds>, \
         \"end\": <seconds>, \"text\": \"<text>\"}]}. Times are seconds from the start of the \
         audio, segments are in chronological order and do not overlap.",
    );
    if let Some(lang) = language {
        prompt.push_str(&format!(" The spoken language is '{lang}'."));
    }
    prompt
}

const LANGUAGE_PROMPT: &str = "Identify the spoken language of the attached audio. Respond with \
     JSON only: {\"language\": \"<ISO 639-1 code>\", \"segments\": []}.";

fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a" | "mp4") => "audio/mp4",
        Some("webm") => "audio/webm",
        Some("ogg" | "opus") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "application/octet-stream",
    }
}

/// Remote adapter for Gemini models
pub struct GeminiEngine {
    client: Arc<dyn GenerationClient>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for GeminiEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiEngine")
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl GeminiEngine {
    /// Adapter over an arbitrary client
    #[must_use]
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            client,
            retry: RetryPolicy::default(),
        }
    }

    /// Adapter using the public API and the key from the environment
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(Arc::new(HttpGenerationClient::from_env()?)))
    }

    /// Override the rate-limit retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn run(&self, audio: &Path, config: &AppConfig, prompt: &str) -> Result<ParsedTranscript> {
        let model = self.resolve_model(&config.model)?;
        let bytes = std::fs::read(audio).map_err(|e| ytx_audio::Error::io(e, audio, "read"))?;
        let encoded = base64::encoded_len(bytes.len(), true);
        if encoded.is_none_or(|n| n as u64 > MAX_INLINE_BYTES) {
            return Err(EngineError::request(
                GEMINI_ENGINE,
                format!(
                    "{} bytes encode past the {MAX_INLINE_BYTES} byte inline limit",
                    bytes.len()
                ),
            ));
        }
        let request = GenerationRequest {
            model: &model,
            prompt,
            audio: &bytes,
            mime_type: mime_type_for(audio),
            temperature: config
                .option_f64("temperature")
                .unwrap_or(DEFAULT_TEMPERATURE),
        };
        let text = retry_with_backoff(&self.retry, "gemini.generate", || {
            self.client.generate(&request)
        })?;
        parse_response(&text)
    }
}

impl TranscriptionEngine for GeminiEngine {
    fn name(&self) -> &'static str {
        GEMINI_ENGINE
    }

    fn kind(&self) -> AdapterKind {
        AdapterKind::Remote
    }

    fn limits(&self) -> EngineLimits {
        EngineLimits {
            max_request_seconds: Some(MAX_REQUEST_SECONDS),
            max_request_bytes: Some(MAX_AUDIO_BYTES),
            chunk_overlap_seconds: 2.0,
        }
    }

    fn default_model(&self) -> &'static str {
        DEFAULT_GEMINI_MODEL
    }

    fn is_valid_model(&self, model: &str) -> bool {
        model
            .strip_prefix("gemini-")
            .is_some_and(|rest| !rest.trim().is_empty())
    }

    /// Non-Gemini model names (e.g. a whisper preset) select the default model
    fn resolve_model(&self, requested: &str) -> Result<String> {
        let requested = requested.trim();
        if self.is_valid_model(requested) {
            return Ok(requested.to_string());
        }
        tracing::debug!(
            requested,
            model = DEFAULT_GEMINI_MODEL,
            "Model is not a Gemini model; using default"
        );
        Ok(DEFAULT_GEMINI_MODEL.to_string())
    }

    fn transcribe(&self, audio: &Path, config: &AppConfig) -> Result<Vec<TranscriptSegment>> {
        Ok(self.transcribe_with_language(audio, config)?.segments)
    }

    fn transcribe_with_language(&self, audio: &Path, config: &AppConfig) -> Result<EngineTranscript> {
        let prompt = transcription_prompt(config.language.as_deref());
        let parsed = self.run(audio, config, &prompt)?;
        Ok(EngineTranscript {
            segments: repair_segments(parsed.segments),
            language: parsed.language,
        })
    }

    fn detect_language(&self, audio: &Path, config: &AppConfig) -> Option<String> {
        match self.run(audio, config, LANGUAGE_PROMPT) {
            Ok(parsed) => parsed.language,
            Err(e) => {
                tracing::debug!(error = %e, "Gemini language detection failed");
                None
            }
        }
    }
}
