//! Artifact store for ytx transcripts
//!
//! This crate owns everything ytx keeps on disk between runs:
//! - Cache root resolution (`YTX_CACHE_DIR`, XDG, platform, home)
//! - A sanitized `video/engine/model/config_hash` directory layout
//! - Atomic artifact writes and missing/corrupted aware reads
//! - Enumeration, statistics, clearing and TTL expiry
//!
//! # Artifact set
//!
//! Each entry holds three files:
//! - `transcript.json`: the transcript document
//! - `captions.srt`: captions rendered from its segments
//! - `meta.json`: creation time, tool version, source info and key
//!
//! An entry counts as present only when the transcript and the captions are
//! both non-empty.

#![expect(
    clippy::missing_errors_doc,
    reason = "Every fallible function returns the crate Error with path context"
)]

pub mod captions;
mod error;
pub mod gc;
pub mod meta;
pub mod paths;
pub mod store;

// Re-export error types at crate root
pub use error::{Error, Result};

// Re-export main types
pub use captions::{format_srt_timestamp, render_srt};
pub use gc::{CacheEntry, CacheStats};
pub use meta::{ArtifactMeta, RequestedEngine, SourceInfo};
pub use paths::{
    ArtifactPaths, CAPTIONS_SRT, CacheInputs, CacheKey, META_JSON, TRANSCRIPT_JSON, cache_root,
    cache_root_from_inputs, sanitize_segment,
};
pub use store::ArtifactStore;
