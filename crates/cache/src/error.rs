//! Error types for the cache crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for artifact store operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error during cache operations
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(ytx::cache::io),
        help("Check file permissions and free disk space under the cache root")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "rename", "sync")
        operation: String,
    },

    /// Configuration or validation error
    #[error("Cache configuration error: {message}")]
    #[diagnostic(code(ytx::cache::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Artifact file is absent; a normal cache miss
    #[error("Cache artifact missing: {}", path.display())]
    #[diagnostic(code(ytx::cache::missing))]
    Missing {
        /// Expected location of the artifact
        path: PathBuf,
    },

    /// Artifact file exists but cannot be parsed or fails validation
    #[error("Cache artifact corrupted: {}: {message}", path.display())]
    #[diagnostic(
        code(ytx::cache::corrupted),
        help("The entry will be reprocessed; clear it to reclaim space")
    )]
    Corrupted {
        /// Location of the corrupted artifact
        path: PathBuf,
        /// What failed while reading it
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(ytx::cache::serialization))]
    Serialization {
        /// Error message describing the serialization issue
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
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
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create a missing-artifact error
    #[must_use]
    pub fn missing(path: impl Into<PathBuf>) -> Self {
        Self::Missing { path: path.into() }
    }

    /// Create a corrupted-artifact error
    #[must_use]
    pub fn corrupted(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Corrupted {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// True for a clean cache miss
    #[must_use]
    pub const fn is_missing(&self) -> bool {
        matches!(self, Self::Missing { .. })
    }

    /// True when an artifact exists but is unusable
    #[must_use]
    pub const fn is_corrupted(&self) -> bool {
        matches!(self, Self::Corrupted { .. })
    }
}

impl From<ytx_core::Error> for Error {
    fn from(err: ytx_core::Error) -> Self {
        match err {
            ytx_core::Error::Configuration { message } | ytx_core::Error::Validation { message } => {
                Self::Configuration { message }
            }
            ytx_core::Error::Serialization { message } => Self::Serialization { message },
        }
    }
}

/// Result type for cache operations
pub type Result<T> = std::result::Result<T, Error>;
