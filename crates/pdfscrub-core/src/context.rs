//! The execution context: error state, warnings, and the diagnostic sink.
//!
//! A [`Context`] is passed explicitly to everything that can fail or warn.
//! Failures travel as ordinary `Err(Error)` values; a protected scope
//! ([`Context::protect`], [`Context::protect_with_cleanup`]) is where they
//! are caught and classified by the frame's resume code.
//!
//! An error that is raised with [`Context::throw`] while no scope is open
//! cannot be caught by anything: the context reports it and exits the
//! process.

use crate::diagnostic::{DiagnosticSink, StderrSink};
use crate::error::{Error, ErrorCode, Result};
use crate::fault::{Caught, ErrorState};
use crate::options::ContextOptions;
use crate::warning::WarningBuffer;

type Cleanup<'a> = Box<dyn FnOnce(&mut Context) -> Result<()> + 'a>;

pub struct Context {
    errors: ErrorState,
    warnings: WarningBuffer,
    sink: Box<dyn DiagnosticSink>,
    options: ContextOptions,
    /// Every warning raised, repeats included.
    warnings_raised: usize,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("errors", &self.errors)
            .field("warnings", &self.warnings)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// A context with default options reporting to stderr.
    pub fn new() -> Self {
        Self::with_options(ContextOptions::default())
    }

    pub fn with_options(options: ContextOptions) -> Self {
        Self::with_sink(options, StderrSink)
    }

    /// A context reporting to a custom sink.
    pub fn with_sink(options: ContextOptions, sink: impl DiagnosticSink + 'static) -> Self {
        Self {
            errors: ErrorState::with_capacity(options.max_scope_depth),
            warnings: WarningBuffer::new(options.message_capacity),
            sink: Box::new(sink),
            options,
            warnings_raised: 0,
        }
    }

    pub fn options(&self) -> &ContextOptions {
        &self.options
    }

    /// The underlying exception-frame state.
    pub fn errors(&self) -> &ErrorState {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ErrorState {
        &mut self.errors
    }

    /// Code of the last recorded error.
    pub fn caught(&self) -> Option<ErrorCode> {
        self.errors.caught()
    }

    /// Message of the last recorded error, or `""`.
    pub fn caught_message(&self) -> &str {
        self.errors.caught_message()
    }

    // --- warnings ---

    /// Raise a warning through the deduplicating channel.
    pub fn warn(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        #[cfg(feature = "tracing")]
        tracing::warn!(message, "pdfscrub warning");
        self.warnings_raised += 1;
        self.warnings.warn(message, self.sink.as_mut());
    }

    /// Number of warnings raised so far, counting suppressed repeats.
    pub fn warnings_raised(&self) -> usize {
        self.warnings_raised
    }

    /// Emit the pending repeat summary, if any.
    pub fn flush_warnings(&mut self) {
        self.warnings.flush(self.sink.as_mut());
    }

    // --- throwing ---

    /// Raise a new error.
    ///
    /// The error is recorded and reported, then returned so the caller can
    /// propagate it with `return Err(..)`. With no protected scope open the
    /// process is terminated instead.
    pub fn throw(&mut self, code: ErrorCode, message: impl Into<String>) -> Error {
        self.throw_error(Error::new(code, message))
    }

    /// Raise an existing error value. See [`throw`](Self::throw).
    pub fn throw_error(&mut self, err: Error) -> Error {
        let err = err.bounded(self.options.message_capacity);
        if !self.errors.is_protected() {
            self.fatal(&err);
        }
        self.report(&err);
        let err = err.into_reported();
        self.errors.record(err.clone());
        err
    }

    /// Re-raise the currently recorded error without reporting it again.
    ///
    /// Calling this with nothing recorded is a caller bug; it yields an
    /// `Argument` error.
    pub fn rethrow(&mut self) -> Error {
        match self.errors.current() {
            Some(err) => {
                let err = err.clone();
                if !self.errors.is_protected() {
                    self.fatal(&err);
                }
                err
            }
            None => self.throw(ErrorCode::Argument, "rethrow with no current error"),
        }
    }

    /// Re-raise the current error only if it carries `code`.
    pub fn rethrow_if(&mut self, code: ErrorCode) -> Result<()> {
        if self.errors.caught() == Some(code) {
            return Err(self.rethrow());
        }
        Ok(())
    }

    // --- protected scopes ---

    /// Run `body` in a protected scope with no cleanup phase.
    pub fn protect<T, F>(&mut self, body: F) -> Caught<T>
    where
        F: FnOnce(&mut Context) -> Result<T>,
    {
        self.run_scope(body, None)
    }

    /// Run `body` in a protected scope, then `cleanup` on every exit path.
    ///
    /// `cleanup` runs whether or not `body` failed; a failure inside
    /// `cleanup` is recorded as well and never reruns it.
    pub fn protect_with_cleanup<T, F, C>(&mut self, body: F, cleanup: C) -> Caught<T>
    where
        F: FnOnce(&mut Context) -> Result<T>,
        C: FnOnce(&mut Context) -> Result<()>,
    {
        self.run_scope(body, Some(Box::new(cleanup)))
    }

    fn run_scope<T, F>(&mut self, body: F, cleanup: Option<Cleanup<'_>>) -> Caught<T>
    where
        F: FnOnce(&mut Context) -> Result<T>,
    {
        let body_result = match self.errors.enter_scope() {
            Ok(()) => match body(self) {
                Ok(value) => Ok(value),
                Err(err) => Err(self.catch_at_boundary(err)),
            },
            Err(exhausted) => {
                self.report(&exhausted);
                let exhausted = exhausted.into_reported();
                self.errors.record(exhausted.clone());
                Err(exhausted)
            }
        };

        let cleanup_result = match cleanup {
            Some(cleanup) if self.errors.enter_cleanup() => Some(match cleanup(self) {
                Ok(()) => Ok(()),
                Err(err) => Err(self.catch_at_boundary(err)),
            }),
            _ => None,
        };

        let code = self.errors.leave_scope();
        let outcome = Caught::from_phases(body_result, cleanup_result);
        debug_assert_eq!(code, outcome.resume_code());
        outcome
    }

    /// An `Err` leaving a scope phase. Errors not yet reported (plain `Err`
    /// values from `?`) are reported here.
    fn catch_at_boundary(&mut self, err: Error) -> Error {
        let err = err.bounded(self.options.message_capacity);
        if !err.is_reported() {
            self.report(&err);
        }
        let err = err.into_reported();
        self.errors.note_throw(err.clone());
        err
    }

    fn report(&mut self, err: &Error) {
        self.flush_warnings();
        if err.is_abort() || !self.options.echo_errors {
            return;
        }
        #[cfg(feature = "tracing")]
        tracing::error!(code = %err.code(), message = err.message(), "pdfscrub error");
        self.sink.error(err.message());
    }

    fn fatal(&mut self, err: &Error) -> ! {
        self.flush_warnings();
        #[cfg(feature = "tracing")]
        tracing::error!(code = %err.code(), message = err.message(), "uncaught pdfscrub error");
        self.sink.uncaught(err.message());
        std::process::exit(1);
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.flush_warnings();
    }
}
