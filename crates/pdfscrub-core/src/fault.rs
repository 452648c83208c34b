//! Exception frames and the resume-code state machine.
//!
//! A protected scope owns one [`ExceptionFrame`]. The frame's resume code
//! records what happened inside the scope:
//!
//! | path                                   | code |
//! |----------------------------------------|------|
//! | body completed, no cleanup             | 0    |
//! | body completed, cleanup ran            | 1    |
//! | body failed, no cleanup                | 2    |
//! | body failed, cleanup ran               | 3    |
//! | body completed, cleanup failed         | 3    |
//! | body failed, cleanup failed            | 5    |
//!
//! A failure adds 2 to the code. Cleanup runs only while the code is below
//! 3 and adds 1 when it starts. [`Caught`] keeps the two code-3 paths apart.

use crate::error::{Error, ErrorCode};

/// Default number of exception frames per context.
pub const DEFAULT_FRAME_CAPACITY: usize = 256;

/// One entry on the exception-frame stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExceptionFrame {
    resume_code: u8,
}

impl ExceptionFrame {
    pub fn resume_code(&self) -> u8 {
        self.resume_code
    }
}

/// Per-context exception state: the frame stack plus the last recorded error.
///
/// One frame of headroom is always kept free so that running out of frames
/// can itself be recorded on a frame and caught.
#[derive(Debug, Clone)]
pub struct ErrorState {
    frames: Vec<ExceptionFrame>,
    capacity: usize,
    current: Option<Error>,
}

impl Default for ErrorState {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FRAME_CAPACITY)
    }
}

impl ErrorState {
    /// Create an error state holding at most `capacity` frames.
    ///
    /// Capacities below 2 are raised to 2, the minimum that leaves room for
    /// the exhaustion frame.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            frames: Vec::with_capacity(capacity),
            capacity,
            current: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of open protected scopes.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Whether a failure right now would be caught by an enclosing scope.
    pub fn is_protected(&self) -> bool {
        !self.frames.is_empty()
    }

    /// The innermost frame, if any scope is open.
    pub fn top(&self) -> Option<&ExceptionFrame> {
        self.frames.last()
    }

    /// Open a protected scope.
    ///
    /// When fewer than two frames of headroom remain, the frame is still
    /// pushed (using the reserved slot) but starts out failed with code 2,
    /// the exhaustion error is recorded, and it is returned so the caller
    /// skips the body. [`leave_scope`](Self::leave_scope) must be called in
    /// both cases.
    pub fn enter_scope(&mut self) -> Result<(), Error> {
        if self.frames.len() + 1 >= self.capacity {
            let err = Error::new(
                ErrorCode::FrameStackExhausted,
                "exception stack overflow!",
            );
            self.frames.push(ExceptionFrame { resume_code: 2 });
            self.current = Some(err.clone());
            return Err(err);
        }
        self.frames.push(ExceptionFrame::default());
        Ok(())
    }

    /// Record a failure against the innermost frame.
    ///
    /// Returns `false` when no scope is open, meaning the failure is
    /// unrecoverable.
    pub fn note_throw(&mut self, err: Error) -> bool {
        self.current = Some(err);
        match self.frames.last_mut() {
            Some(frame) => {
                frame.resume_code += 2;
                true
            }
            None => false,
        }
    }

    /// Record `err` as current without touching any frame. The frame is
    /// charged when the error leaves the scope phase.
    pub fn record(&mut self, err: Error) {
        self.current = Some(err);
    }

    /// Decide whether the innermost scope's cleanup phase runs.
    ///
    /// Cleanup runs when the code is below 3; the code is bumped by one.
    pub fn enter_cleanup(&mut self) -> bool {
        match self.frames.last_mut() {
            Some(frame) if frame.resume_code < 3 => {
                frame.resume_code += 1;
                true
            }
            _ => false,
        }
    }

    /// Close the innermost scope and return its final resume code.
    ///
    /// Returns 0 if no scope was open.
    pub fn leave_scope(&mut self) -> u8 {
        self.frames.pop().map(|f| f.resume_code).unwrap_or(0)
    }

    /// The last recorded error, if any.
    pub fn current(&self) -> Option<&Error> {
        self.current.as_ref()
    }

    /// Code of the last recorded error, or `None` if nothing failed yet.
    pub fn caught(&self) -> Option<ErrorCode> {
        self.current.as_ref().map(Error::code)
    }

    /// Message of the last recorded error, or `""`.
    pub fn caught_message(&self) -> &str {
        self.current.as_ref().map(Error::message).unwrap_or("")
    }

    /// Clear the recorded error.
    pub fn clear(&mut self) {
        self.current = None;
    }
}

/// Outcome of a protected scope.
///
/// Each variant is one path through the resume-code state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Caught<T> {
    /// Body completed and there was no cleanup phase.
    Completed(T),
    /// Body completed and the cleanup phase ran cleanly.
    CleanedUp(T),
    /// Body failed and there was no cleanup phase.
    Failed(Error),
    /// Body failed, then the cleanup phase ran cleanly.
    FailedThenCleaned(Error),
    /// Body completed but the cleanup phase failed.
    CleanupFailed { value: T, error: Error },
    /// Body failed and the cleanup phase failed too.
    FailedInBoth { body: Error, cleanup: Error },
}

impl<T> Caught<T> {
    /// The resume code this path leaves on its frame.
    pub fn resume_code(&self) -> u8 {
        match self {
            Caught::Completed(_) => 0,
            Caught::CleanedUp(_) => 1,
            Caught::Failed(_) => 2,
            Caught::FailedThenCleaned(_) | Caught::CleanupFailed { .. } => 3,
            Caught::FailedInBoth { .. } => 5,
        }
    }

    /// Whether a catch phase is entered for this path (non-zero code).
    pub fn enters_catch(&self) -> bool {
        self.resume_code() != 0
    }

    /// Whether something failed.
    pub fn is_caught(&self) -> bool {
        self.error().is_some()
    }

    /// The error current when the scope exited: the most recent failure.
    pub fn error(&self) -> Option<&Error> {
        match self {
            Caught::Completed(_) | Caught::CleanedUp(_) => None,
            Caught::Failed(err) | Caught::FailedThenCleaned(err) => Some(err),
            Caught::CleanupFailed { error, .. } => Some(error),
            Caught::FailedInBoth { cleanup, .. } => Some(cleanup),
        }
    }

    /// Collapse into a `Result`, keeping the most recent failure.
    pub fn into_result(self) -> Result<T, Error> {
        match self {
            Caught::Completed(v) | Caught::CleanedUp(v) => Ok(v),
            Caught::Failed(err) | Caught::FailedThenCleaned(err) => Err(err),
            Caught::CleanupFailed { error, .. } => Err(error),
            Caught::FailedInBoth { cleanup, .. } => Err(cleanup),
        }
    }

    /// Assemble the outcome from what the body and cleanup phases produced.
    pub(crate) fn from_phases(
        body: Result<T, Error>,
        cleanup: Option<Result<(), Error>>,
    ) -> Self {
        match (body, cleanup) {
            (Ok(v), None) => Caught::Completed(v),
            (Ok(v), Some(Ok(()))) => Caught::CleanedUp(v),
            (Err(e), None) => Caught::Failed(e),
            (Err(e), Some(Ok(()))) => Caught::FailedThenCleaned(e),
            (Ok(value), Some(Err(error))) => Caught::CleanupFailed { value, error },
            (Err(body), Some(Err(cleanup))) => Caught::FailedInBoth { body, cleanup },
        }
    }
}
