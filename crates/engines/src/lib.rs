//! Transcription engines for ytx
//!
//! - The [`TranscriptionEngine`] contract with local and remote variants
//! - Segment repair shared by every adapter and the chunk merger
//! - A local whisper adapter with an explicit, session-owned [`ModelCache`]
//! - A remote Gemini adapter with rate-limit retries
//! - [`ChunkedTranscriber`] for providers with per-request limits
//! - [`FallbackOrchestrator`] for single-hop fallback from remote to local
//!
//! # Engine selection
//!
//! ```text
//! FallbackOrchestrator -> EngineRegistry -> ChunkedTranscriber -> TranscriptionEngine
//! ```
//!
//! The orchestrator reports which engine and model actually produced the
//! transcript; callers key cached artifacts on that, not on the request.

pub mod adapter;
pub mod chunked;
mod error;
pub mod fallback;
pub mod local;
pub mod progress;
pub mod registry;
pub mod remote;
pub mod repair;

// Re-export error types at crate root
pub use error::{EngineError, Result};

pub use adapter::{AdapterKind, EngineLimits, EngineTranscript, TranscriptionEngine};
pub use chunked::{ChunkedTranscriber, merge};
pub use fallback::{
    AttemptState, EngineChoice, FallbackOrchestrator, FallbackPolicy, TranscriptionOutcome,
};
pub use local::{
    LocalModel, ModelCache, ModelKey, ModelLoader, UnavailableLoader, WHISPER_ENGINE,
    WHISPER_PRESETS, WhisperEngine, default_models_dir,
};
pub use progress::ProgressReporter;
pub use registry::EngineRegistry;
pub use remote::{GEMINI_ENGINE, GeminiEngine, GenerationClient, HttpGenerationClient, RetryPolicy};
pub use repair::{RawSegment, SEGMENT_EPSILON, SegmentRepairer, repair_segments};
