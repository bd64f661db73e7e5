//! Remote API adapters

mod gemini;
pub mod retry;

pub use gemini::{
    DEFAULT_BASE_URL, GEMINI_ENGINE, GeminiEngine, GenerationClient, GenerationRequest,
    HttpGenerationClient, MAX_AUDIO_BYTES, MAX_INLINE_BYTES, ParsedTranscript, parse_response,
};
pub use retry::{RetryPolicy, is_rate_limit_message, retry_with_backoff};
