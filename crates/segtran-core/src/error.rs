//! Error types for the Segtran core library
//!
//! Segment-level failures are absorbed by the dispatch engine and recorded as
//! data (see [`SegmentError`]); only programmer errors, configuration problems
//! and the job-fatal "every segment failed" condition surface through [`Error`].

use crate::http::error::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for Segtran operations
#[derive(Error, Debug)]
pub enum Error {
    /// Model name did not resolve to a known backend
    #[error("Unsupported model: {model}")]
    UnsupportedModel { model: String },

    /// Nothing to translate
    #[error("Input text is empty")]
    EmptyInput,

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Network or proxy failure that escaped segment-level handling
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A backend response did not carry the expected text
    #[error("Response parse error ({backend}): {message}")]
    ResponseParse { backend: String, message: String },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Document extraction failed or the format is not handled
    #[error("Document extraction failed for {path}: {message}")]
    Extraction { path: String, message: String },

    /// Every segment of a job ended in the error state
    #[error("Translation failed: all {total} segment(s) failed ({})", summarize(errors))]
    AllSegmentsFailed {
        total: usize,
        errors: Vec<SegmentError>,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Per-segment failure record kept on the job's error list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentError {
    /// Zero-based segment index
    pub index: usize,
    /// Number of attempts made before giving up
    pub attempts: u32,
    /// Last error message observed
    pub message: String,
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "segment {} failed after {} attempt(s): {}",
            self.index + 1,
            self.attempts,
            self.message
        )
    }
}

fn summarize(errors: &[SegmentError]) -> String {
    match errors.first() {
        Some(first) if errors.len() > 1 => {
            format!("{}; and {} more", first, errors.len() - 1)
        }
        Some(first) => first.to_string(),
        None => "no error details".to_string(),
    }
}

impl Error {
    /// Create a configuration error without a source
    pub fn config(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Create a response parse error for a backend
    pub fn parse(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ResponseParse {
            backend: backend.into(),
            message: message.into(),
        }
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}
