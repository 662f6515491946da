// src/error.rs

//! Error types for build-requirement inference
//!
//! Malformed log or descriptor content is never an error here; it only
//! degrades the confidence of the output. Errors are reserved for I/O
//! failures on supplied artifacts, bad user-supplied patterns, and
//! provider-index failures.

use thiserror::Error;

/// Convenience result type for this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during an inference run
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error reading a supplied artifact (build log, descriptor file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid pattern in an exception set or scan rule
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Provider index query failed
    #[error("Provider index error: {0}")]
    Index(#[from] rusqlite::Error),
}
