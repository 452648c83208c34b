//! Where warnings and error reports go.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Receiver for the context's diagnostic lines.
pub trait DiagnosticSink {
    /// A new (non-repeated) warning.
    fn warning(&mut self, message: &str);
    /// Summary of a warning that was suppressed `count - 1` times.
    fn repeated(&mut self, count: usize);
    /// An error recorded by a throw.
    fn error(&mut self, message: &str);
    /// An error thrown with no protected scope open, right before exit.
    fn uncaught(&mut self, message: &str);
}

/// Writes diagnostics to standard error.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn warning(&mut self, message: &str) {
        eprintln!("{}", Diagnostic::Warning(message.to_string()));
    }

    fn repeated(&mut self, count: usize) {
        eprintln!("{}", Diagnostic::Repeated(count));
    }

    fn error(&mut self, message: &str) {
        eprintln!("{}", Diagnostic::Error(message.to_string()));
    }

    fn uncaught(&mut self, message: &str) {
        eprintln!("{}", Diagnostic::Uncaught(message.to_string()));
    }
}

/// A single diagnostic line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Warning(String),
    Repeated(usize),
    Error(String),
    Uncaught(String),
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::Warning(msg) => write!(f, "warning: {msg}"),
            Diagnostic::Repeated(count) => write!(f, "warning: ... repeated {count} times ..."),
            Diagnostic::Error(msg) => write!(f, "error: {msg}"),
            Diagnostic::Uncaught(msg) => write!(f, "uncaught error: {msg}"),
        }
    }
}

/// Records diagnostics in memory.
///
/// Clones share the same log, so a test can keep one handle and give the
/// other to a [`Context`](crate::Context).
#[derive(Debug, Default, Clone)]
pub struct CollectingSink {
    log: Rc<RefCell<Vec<Diagnostic>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.log.borrow().clone()
    }

    /// Recorded lines rendered as they would appear on stderr.
    pub fn lines(&self) -> Vec<String> {
        self.log.borrow().iter().map(ToString::to_string).collect()
    }

    /// Number of recorded warnings, counting suppressed repeats.
    pub fn warning_count(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .map(|d| match d {
                Diagnostic::Warning(_) => 1,
                Diagnostic::Repeated(n) => n.saturating_sub(1),
                _ => 0,
            })
            .sum()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().clear();
    }

    fn push(&self, diagnostic: Diagnostic) {
        self.log.borrow_mut().push(diagnostic);
    }
}

impl DiagnosticSink for CollectingSink {
    fn warning(&mut self, message: &str) {
        self.push(Diagnostic::Warning(message.to_string()));
    }

    fn repeated(&mut self, count: usize) {
        self.push(Diagnostic::Repeated(count));
    }

    fn error(&mut self, message: &str) {
        self.push(Diagnostic::Error(message.to_string()));
    }

    fn uncaught(&mut self, message: &str) {
        self.push(Diagnostic::Uncaught(message.to_string()));
    }
}
