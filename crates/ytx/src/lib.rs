//! ytx: cached, chunked transcription with engine fallback
//!
//! This crate ties the workspace together:
//! - [`CachedTranscriptionPipeline`] consults the artifact store before
//!   downloading anything and persists fresh transcripts atomically
//! - [`MediaSource`] is the seam to whatever resolves URLs and downloads audio
//! - [`maintenance::run_startup_sweep`] expires old cache entries at start-up
//! - [`logging::init_tracing`] installs the tracing subscriber
//!
//! The building blocks live in `ytx-core` (configuration and hashing),
//! `ytx-cache` (artifact store), `ytx-audio` (chunking and WAV handling) and
//! `ytx-engines` (adapters, chunked transcription and fallback).

mod error;
pub mod logging;
pub mod maintenance;
pub mod pipeline;
pub mod source;

// Re-export error types at crate root
pub use error::{Error, Result};

pub use pipeline::{CachedTranscriptionPipeline, PipelineOutcome};
pub use source::MediaSource;

pub use ytx_cache::{ArtifactStore, CacheKey};
pub use ytx_core::{AppConfig, Chapter, Summary, TranscriptDoc, TranscriptSegment, VideoMetadata};
pub use ytx_engines::{FallbackPolicy, ProgressReporter};
