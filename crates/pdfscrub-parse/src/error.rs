//! Error types for the content-stream layer.
//!
//! [`BackendError`] covers failures from the tokenizer, the lopdf object
//! graph and font loading. It converts into the core [`Error`] so it can be
//! propagated through a protected scope with `?`.

use pdfscrub_core::{Error, ErrorCode};
use thiserror::Error;

/// Error type for content-stream parsing and object-graph access.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Malformed content-stream syntax.
    #[error("content stream syntax error: {0}")]
    Parse(String),

    /// Failure reported by the lopdf object graph.
    #[error("object graph error: {0}")]
    Lopdf(#[from] lopdf::Error),

    /// Error resolving font or encoding information.
    #[error("font error: {0}")]
    Font(String),

    /// An operator or resource that could not be interpreted.
    #[error("interpreter error: {0}")]
    Interpreter(String),

    /// A core error passed through unchanged.
    #[error(transparent)]
    Core(#[from] Error),
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Parse(_) => Error::new(ErrorCode::Syntax, err.to_string()),
            BackendError::Lopdf(_) => Error::new(ErrorCode::Format, err.to_string()),
            BackendError::Font(_) => Error::new(ErrorCode::Font, err.to_string()),
            BackendError::Interpreter(_) => Error::new(ErrorCode::Format, err.to_string()),
            BackendError::Core(e) => e,
        }
    }
}
