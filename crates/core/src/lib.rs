//! Core types for ytx
//!
//! This crate holds the pieces every other ytx crate agrees on:
//! - Transcript data model (segments, documents, source metadata)
//! - Run configuration loaded from `YTX_*` environment variables
//! - Stable configuration hashing used in cache keys
//!
//! # Config hashing
//!
//! A config hash is the SHA-256 of a canonical, key-sorted JSON encoding of
//! the fields that change transcription output:
//! - Engine and model
//! - Language, device and compute precision
//! - Timestamp policy
//! - Provider specific options

pub mod config;
mod error;
pub mod hashing;
pub mod model;

pub use error::{Error, Result};

pub use config::{
    AppConfig, ComputeType, DEFAULT_ENGINE, DEFAULT_GEMINI_MODEL, DEFAULT_WHISPER_MODEL, Device,
    TimestampPolicy, default_model_for,
};
pub use hashing::{HashInput, config_hash, sha256_hex};
pub use model::{
    Chapter, ORDER_TOLERANCE, Summary, TranscriptDoc, TranscriptSegment, VideoMetadata,
    validate_timeline,
};

/// Version string recorded in cache metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
