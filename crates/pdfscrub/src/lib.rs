//! pdfscrub: rewrite the content streams of PDF pages.
//!
//! This is the public API facade crate for pdfscrub-rs. It re-exports the
//! lower crates and adds page-level operations over a `lopdf::Document`.
//!
//! # Architecture
//!
//! - **pdfscrub-core**: error state, warning channel and geometry
//! - **pdfscrub-parse**: content-stream tokenizer, interpreter, filter and writer
//! - **pdfscrub** (this crate): page-level operations tying them together
//!
//! # Example
//!
//! ```no_run
//! use pdfscrub::{Context, redact_text};
//!
//! let mut doc = lopdf::Document::load("input.pdf").unwrap();
//! let mut ctx = Context::new();
//! let report = redact_text(&mut ctx, &mut doc, |text| text == ['@']).unwrap();
//! println!("{} pages rewritten", report.pages.len());
//! doc.save("output.pdf").unwrap();
//! ```

pub mod page;
pub mod scrub;

pub use pdfscrub_core;
pub use pdfscrub_core::{Context, ContextOptions, Error, ErrorCode, Matrix, Result};
pub use pdfscrub_parse;
pub use pdfscrub_parse::{GlyphInfo, Operator};
pub use scrub::{
    FilterPageOptions, FilterReport, PageReport, filter_document, filter_page, filter_pages,
    redact_text,
};
