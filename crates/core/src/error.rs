//! Error types for the core crate

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Error type for configuration, validation and hashing
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Invalid configuration value
    #[error("Invalid configuration: {message}")]
    #[diagnostic(
        code(ytx::core::configuration),
        help("Check the YTX_* environment variables and engine options")
    )]
    Configuration {
        /// Description of the offending value
        message: String,
    },

    /// A model value violated one of its invariants
    #[error("Validation failed: {message}")]
    #[diagnostic(code(ytx::core::validation))]
    Validation {
        /// Description of the violated invariant
        message: String,
    },

    /// Serialization error
    #[error("Serialization error: {message}")]
    #[diagnostic(code(ytx::core::serialization))]
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

    /// Create a validation error
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;
