//! Error types for the audio crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for chunking, slicing and transcoding
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Window or overlap parameters cannot produce a terminating chunk sequence
    #[error("Invalid chunking parameters: {message}")]
    #[diagnostic(
        code(ytx::audio::invalid_chunking),
        help("Use a positive window and an overlap smaller than the window")
    )]
    InvalidChunking {
        /// Description of the offending parameter
        message: String,
    },

    /// Requested slice does not lie inside the audio
    #[error("Invalid slice range {start}..{end} for audio of {duration} s")]
    #[diagnostic(code(ytx::audio::invalid_range))]
    InvalidRange {
        /// Requested start in seconds
        start: f64,
        /// Requested end in seconds
        end: f64,
        /// Duration of the source audio in seconds
        duration: f64,
    },

    /// Slicing would overwrite its own source
    #[error("Refusing to slice {} onto itself", path.display())]
    #[diagnostic(code(ytx::audio::in_place))]
    InPlace {
        /// Source and destination path
        path: PathBuf,
    },

    /// WAV decoding or encoding failed
    #[error("WAV error in {}: {source}", path.display())]
    #[diagnostic(code(ytx::audio::wav))]
    Wav {
        /// The underlying hound error
        #[source]
        source: hound::Error,
        /// File being read or written
        path: PathBuf,
    },

    /// The WAV file uses a layout ytx cannot process
    #[error("Unsupported audio format in {}: {message}", path.display())]
    #[diagnostic(
        code(ytx::audio::unsupported_format),
        help("Normalize the audio to 16 kHz mono PCM first")
    )]
    UnsupportedFormat {
        /// File that was inspected
        path: PathBuf,
        /// What is unsupported
        message: String,
    },

    /// I/O error during audio operations
    #[error("I/O {operation} failed: {}", path.display())]
    #[diagnostic(code(ytx::audio::io))]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error
        path: PathBuf,
        /// Operation that failed (e.g., "create_temp", "persist")
        operation: String,
    },

    /// The transcoder binary could not be found
    #[error("{program} is required but was not found on PATH")]
    #[diagnostic(
        code(ytx::audio::transcoder_not_found),
        help("Install ffmpeg and make sure it is on PATH")
    )]
    TranscoderNotFound {
        /// Program that was looked up
        program: String,
    },

    /// The transcoder ran but failed
    #[error("Transcoding failed: {message}")]
    #[diagnostic(code(ytx::audio::transcoder))]
    Transcoder {
        /// Failure description, usually the transcoder's stderr
        message: String,
    },
}

impl Error {
    /// Create an invalid chunking error
    #[must_use]
    pub fn invalid_chunking(msg: impl Into<String>) -> Self {
        Self::InvalidChunking {
            message: msg.into(),
        }
    }

    /// Create a WAV error with path context
    #[must_use]
    pub fn wav(source: hound::Error, path: impl AsRef<Path>) -> Self {
        Self::Wav {
            source,
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: path.as_ref().to_path_buf(),
            operation: operation.into(),
        }
    }

    /// Create an unsupported format error
    #[must_use]
    pub fn unsupported(path: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            path: path.as_ref().to_path_buf(),
            message: msg.into(),
        }
    }

    /// Create a transcoder failure
    #[must_use]
    pub fn transcoder(msg: impl Into<String>) -> Self {
        Self::Transcoder {
            message: msg.into(),
        }
    }
}

/// Result type for audio operations
pub type Result<T> = std::result::Result<T, Error>;
