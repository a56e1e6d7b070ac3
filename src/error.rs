//! Centralized error types for postsink.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced along the ingestion path.
///
/// Every variant is recovered at the per-file boundary of the walk: the
/// offending file is logged and skipped, the batch continues.
#[derive(Error, Debug)]
pub enum IngestError {
    /// I/O error with the associated file path.
    #[error("I/O error reading '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No header block could be located in the message.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// No Return-Path, no From, and no configured default sender.
    #[error("no sender resolvable from headers or configuration")]
    NoSenderResolvable,
}

/// Convenience alias for `Result<T, IngestError>`.
pub type Result<T> = std::result::Result<T, IngestError>;

impl IngestError {
    /// Create a `Read` variant from a path and an `io::Error`.
    pub fn read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}
