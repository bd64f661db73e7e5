//! Error types for transcription engines

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Error type for engine adapters and the orchestration built on them
#[derive(Error, Debug, Diagnostic)]
pub enum EngineError {
    /// Request cannot be served with the given configuration; never retried or fallen back from
    #[error("{engine}: invalid configuration: {message}")]
    #[diagnostic(
        code(ytx::engine::invalid_configuration),
        help("Check YTX_ENGINE, YTX_MODEL and the engine options")
    )]
    InvalidConfiguration {
        /// Engine that rejected the configuration
        engine: String,
        /// What is wrong
        message: String,
    },

    /// Engine cannot run in this environment (missing model file, credentials, backend)
    #[error("{engine} is unavailable: {message}")]
    #[diagnostic(code(ytx::engine::unavailable))]
    Unavailable {
        /// Engine name
        engine: String,
        /// Why it is unavailable
        message: String,
    },

    /// Provider request or model invocation failed
    #[error("{engine} request failed: {message}")]
    #[diagnostic(code(ytx::engine::request))]
    Request {
        /// Engine name
        engine: String,
        /// Failure description
        message: String,
    },

    /// Provider refused the request because of rate limits or quota
    #[error("{engine} is rate limited: {message}")]
    #[diagnostic(
        code(ytx::engine::rate_limited),
        help("Wait a moment or check the provider quota")
    )]
    RateLimited {
        /// Engine name
        engine: String,
        /// Provider message
        message: String,
    },

    /// Provider answered with something that is not a usable transcript
    #[error("{engine} returned an invalid response: {message}")]
    #[diagnostic(code(ytx::engine::invalid_response))]
    InvalidResponse {
        /// Engine name
        engine: String,
        /// What could not be parsed
        message: String,
    },

    /// Provider did not answer in time
    #[error("{engine} timed out after {seconds} s")]
    #[diagnostic(code(ytx::engine::timeout))]
    Timeout {
        /// Engine name
        engine: String,
        /// Timeout in seconds
        seconds: u64,
    },

    /// One chunk of a chunked run failed, failing the whole run
    #[error("{engine} failed on chunk {index}/{total} ({start:.1}s-{end:.1}s)")]
    #[diagnostic(code(ytx::engine::chunk_failed))]
    ChunkFailed {
        /// Engine name
        engine: String,
        /// 1-based chunk number
        index: usize,
        /// Number of chunks
        total: usize,
        /// Chunk start in seconds
        start: f64,
        /// Chunk end in seconds
        end: f64,
        /// Failure of the chunk
        #[source]
        source: Box<EngineError>,
    },

    /// Both the requested engine and its fallback failed
    #[error("{primary} failed ({primary_error}); fallback {secondary} failed too")]
    #[diagnostic(
        code(ytx::engine::fallback_failed),
        help("Both engines failed; see the cause for the fallback error")
    )]
    FallbackFailed {
        /// Requested engine
        primary: String,
        /// Error of the requested engine
        primary_error: Box<EngineError>,
        /// Fallback engine
        secondary: String,
        /// Error of the fallback engine
        #[source]
        secondary_error: Box<EngineError>,
    },

    /// Audio probing, slicing or decoding failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Audio(#[from] ytx_audio::Error),
}

impl EngineError {
    /// Create an invalid configuration error
    #[must_use]
    pub fn invalid_configuration(engine: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            engine: engine.into(),
            message: msg.into(),
        }
    }

    /// Create an unavailable error
    #[must_use]
    pub fn unavailable(engine: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Unavailable {
            engine: engine.into(),
            message: msg.into(),
        }
    }

    /// Create a request error
    #[must_use]
    pub fn request(engine: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Request {
            engine: engine.into(),
            message: msg.into(),
        }
    }

    /// Create an invalid response error
    #[must_use]
    pub fn invalid_response(engine: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidResponse {
            engine: engine.into(),
            message: msg.into(),
        }
    }

    /// True for errors caused by the configuration rather than the engine
    #[must_use]
    pub fn is_configuration(&self) -> bool {
        match self {
            Self::InvalidConfiguration { .. } => true,
            Self::Audio(ytx_audio::Error::InvalidChunking { .. }) => true,
            Self::ChunkFailed { source, .. } => source.is_configuration(),
            _ => false,
        }
    }

    /// True when retrying the same request may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_detection_through_chunks() {
        let err = EngineError::ChunkFailed {
            engine: "gemini".into(),
            index: 1,
            total: 2,
            start: 0.0,
            end: 600.0,
            source: Box::new(EngineError::invalid_configuration("gemini", "bad")),
        };
        assert!(err.is_configuration());
        assert!(!EngineError::request("gemini", "boom").is_configuration());
    }

    #[test]
    fn test_only_rate_limits_retry() {
        let limited = EngineError::RateLimited {
            engine: "gemini".into(),
            message: "429".into(),
        };
        assert!(limited.is_retryable());
        assert!(!EngineError::request("gemini", "boom").is_retryable());
    }

    #[test]
    fn test_fallback_message_names_both_engines() {
        let err = EngineError::FallbackFailed {
            primary: "gemini".into(),
            primary_error: Box::new(EngineError::request("gemini", "boom")),
            secondary: "whisper".into(),
            secondary_error: Box::new(EngineError::unavailable("whisper", "no model")),
        };
        let text = err.to_string();
        assert!(text.contains("gemini") && text.contains("whisper") && text.contains("boom"));
    }
}
