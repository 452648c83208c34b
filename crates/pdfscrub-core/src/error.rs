//! Error values carried through protected scopes.
//!
//! Every fallible operation in pdfscrub returns [`Error`]: a machine-readable
//! [`ErrorCode`] plus a bounded diagnostic message. The [`fault`](crate::fault)
//! module records the most recent error per execution context so callers can
//! inspect it after a scope has been caught.

use std::fmt;

use thiserror::Error;

/// Machine-readable category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorCode {
    /// Any failure not covered by a more specific code.
    Generic,
    /// Malformed content-stream or object syntax.
    Syntax,
    /// A structurally valid object with unexpected contents.
    Format,
    /// Font or encoding failure.
    Font,
    /// A caller passed an invalid argument.
    Argument,
    /// A configured limit was exceeded.
    Limit,
    /// The requested feature is not supported.
    Unsupported,
    /// Deliberate cancellation; never echoed to diagnostics.
    Abort,
    /// Too many nested protected scopes.
    FrameStackExhausted,
}

impl ErrorCode {
    /// Returns the string tag for this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Generic => "GENERIC",
            ErrorCode::Syntax => "SYNTAX",
            ErrorCode::Format => "FORMAT",
            ErrorCode::Font => "FONT",
            ErrorCode::Argument => "ARGUMENT",
            ErrorCode::Limit => "LIMIT",
            ErrorCode::Unsupported => "UNSUPPORTED",
            ErrorCode::Abort => "ABORT",
            ErrorCode::FrameStackExhausted => "FRAME_STACK_EXHAUSTED",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recoverable failure raised through the error state.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct Error {
    code: ErrorCode,
    message: String,
    /// Already echoed to diagnostics. Not part of equality.
    reported: bool,
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.code == other.code && self.message == other.message
    }
}

impl Eq for Error {}

/// Result alias used throughout pdfscrub.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Create an error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            reported: false,
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Generic, message)
    }

    pub fn syntax(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Syntax, message)
    }

    pub fn format(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Format, message)
    }

    pub fn font(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Font, message)
    }

    pub fn argument(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Argument, message)
    }

    pub fn abort(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Abort, message)
    }

    /// The error category.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// The diagnostic message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Whether a context has already reported this error. Such errors
    /// propagate through scope boundaries without a second report.
    pub fn is_reported(&self) -> bool {
        self.reported
    }

    pub(crate) fn into_reported(mut self) -> Self {
        self.reported = true;
        self
    }

    /// Whether this error is a deliberate abort.
    pub fn is_abort(&self) -> bool {
        self.code == ErrorCode::Abort
    }

    /// Clamp the message to `capacity` bytes (one byte is reserved, like a
    /// terminated fixed buffer), cutting on a char boundary.
    pub fn bounded(mut self, capacity: usize) -> Self {
        bound_message(&mut self.message, capacity);
        self
    }
}

/// Truncate `message` so it fits a buffer of `capacity` bytes including a
/// terminator.
pub(crate) fn bound_message(message: &mut String, capacity: usize) {
    let limit = capacity.saturating_sub(1);
    if message.len() <= limit {
        return;
    }
    let mut cut = limit;
    while cut > 0 && !message.is_char_boundary(cut) {
        cut -= 1;
    }
    message.truncate(cut);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_displays_message_only() {
        let err = Error::syntax("unexpected ']' outside array");
        assert_eq!(err.to_string(), "unexpected ']' outside array");
        assert_eq!(err.code(), ErrorCode::Syntax);
    }

    #[test]
    fn error_code_tags() {
        assert_eq!(ErrorCode::FrameStackExhausted.to_string(), "FRAME_STACK_EXHAUSTED");
        assert_eq!(ErrorCode::Abort.as_str(), "ABORT");
    }

    #[test]
    fn abort_is_flagged() {
        assert!(Error::abort("cancelled").is_abort());
        assert!(!Error::generic("boom").is_abort());
    }

    #[test]
    fn bounded_truncates_to_capacity_minus_one() {
        let err = Error::generic("abcdefgh").bounded(5);
        assert_eq!(err.message(), "abcd");
    }

    #[test]
    fn bounded_respects_char_boundaries() {
        // "é" is two bytes; a cut in the middle must back off.
        let err = Error::generic("aé").bounded(3);
        assert_eq!(err.message(), "a");
    }

    #[test]
    fn bounded_leaves_short_messages() {
        let err = Error::font("missing widths").bounded(256);
        assert_eq!(err.message(), "missing widths");
    }

    #[test]
    fn equality_ignores_reported_flag() {
        let fresh = Error::syntax("bad");
        let reported = fresh.clone().into_reported();
        assert!(reported.is_reported());
        assert!(!fresh.is_reported());
        assert_eq!(fresh, reported);
    }

    #[test]
    fn error_implements_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(Error::format("bad dict"));
        assert!(err.to_string().contains("bad dict"));
    }
}
