//! pdfscrub-core: execution context and backend-independent types.
//!
//! This crate provides the error state every pdfscrub operation reports
//! through (protected scopes, the resume-code state machine, the
//! deduplicating warning channel) together with the geometry shared by the
//! content-stream layer. It has no PDF object-graph dependency.

pub mod context;
pub mod diagnostic;
pub mod error;
pub mod fault;
pub mod geometry;
pub mod options;
pub mod warning;

pub use context::Context;
pub use diagnostic::{CollectingSink, Diagnostic, DiagnosticSink, StderrSink};
pub use error::{Error, ErrorCode, Result};
pub use fault::{Caught, ErrorState, ExceptionFrame};
pub use geometry::{Matrix, Point, Rect};
pub use options::ContextOptions;
pub use warning::WarningBuffer;
