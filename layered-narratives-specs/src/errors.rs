//! Error types for the fixture harness.

use thiserror::Error;

/// Errors that can occur while loading or running fixtures.
#[derive(Debug, Error)]
pub enum SpecError {
    /// A fixture document is not valid TOML or has the wrong shape.
    #[error("parse error in {fixture}: {message}")]
    Parse { fixture: String, message: String },

    /// A fixture or ledger file could not be read.
    #[error("failed to load fixture: {path}: {message}")]
    Load { path: String, message: String },

    /// A fixture sentence could not be turned into a valid record.
    #[error("invalid fixture sentence {sentence}: {message}")]
    Sentence { sentence: String, message: String },

    /// An expected-failure entry points at something that does not exist.
    #[error("stale expected failure {fixture}:{sentence}: {message}")]
    Ledger {
        fixture: String,
        sentence: String,
        message: String,
    },
}

/// Result type for harness operations.
pub type SpecResult<T> = Result<T, SpecError>;
