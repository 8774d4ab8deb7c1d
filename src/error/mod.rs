//! Error definitions
//!
//! This module provides error types for testkit-pipeline.

use thiserror::Error;

/// Main error type for testkit-pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A registered check evaluated to false.
    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    /// Round-trip normalization could not encode or decode an element.
    #[error("Coder {coder} failed: {message}")]
    Codec {
        /// Name of the coder that failed.
        coder: String,
        /// Underlying encoder/decoder message.
        message: String,
    },

    /// A serialized function envelope could not be resolved.
    #[error("Closure error: {0}")]
    Closure(String),

    /// A scope could not be applied to a collection.
    #[error("Scope error: {0}")]
    Scope(String),

    /// A pipeline configuration could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// One or more deferred checks failed during a pipeline run.
    #[error("{failed} of {total} checks failed:\n{}", .failures.join("\n"))]
    ChecksFailed {
        /// Number of failed checks.
        failed: usize,
        /// Number of checks evaluated.
        total: usize,
        /// Rendered failure for every failed check.
        failures: Vec<String>,
    },

    /// The pipeline was already run.
    #[error("Pipeline has already been run")]
    AlreadyRun,
}

impl Error {
    /// Create an assertion failure.
    #[must_use]
    pub fn assertion_failed(message: impl Into<String>) -> Self {
        Self::AssertionFailed(message.into())
    }

    /// Create a coder error.
    #[must_use]
    pub fn codec(coder: impl Into<String>, message: impl ToString) -> Self {
        Self::Codec {
            coder: coder.into(),
            message: message.to_string(),
        }
    }

    /// Create a closure error.
    #[must_use]
    pub fn closure(message: impl Into<String>) -> Self {
        Self::Closure(message.into())
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Returns `true` if this is an assertion failure rather than a setup error.
    #[must_use]
    pub fn is_assertion_failure(&self) -> bool {
        matches!(self, Self::AssertionFailed(_) | Self::ChecksFailed { .. })
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
