//! Error type for the transcription pipeline

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Errors surfaced by [`crate::CachedTranscriptionPipeline`]
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Configuration or data model error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] ytx_core::Error),

    /// Artifact store error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Cache(#[from] ytx_cache::Error),

    /// Audio normalization or slicing error
    #[error(transparent)]
    #[diagnostic(transparent)]
    Audio(#[from] ytx_audio::Error),

    /// Transcription failed, after fallback where eligible
    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] ytx_engines::EngineError),

    /// The media source could not provide metadata or audio
    #[error("Media source failed for {url}: {message}")]
    #[diagnostic(
        code(ytx::source),
        help("Check the URL and network access of the media source")
    )]
    Source {
        /// URL being fetched
        url: String,
        /// Failure description
        message: String,
    },

    /// Per-run work directory could not be created
    #[error("Failed to create work directory")]
    #[diagnostic(code(ytx::workspace))]
    Workspace {
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a media source error
    #[must_use]
    pub fn media_source(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Source {
            url: url.into(),
            message: msg.into(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;
