//! pdfscrub-parse: content stream tokenizer, interpreter and filter.
//!
//! This crate turns raw content-stream bytes into typed [`Operator`]s
//! (tokenizer and interpreter, resolving names against a page's resources
//! through lopdf), rewrites operator streams with the [`ContentFilter`],
//! and serializes them back with the [`ContentWriter`]. It depends on
//! pdfscrub-core for the execution context and geometry.

pub mod color_space;
pub mod encoding;
pub mod error;
pub mod filter;
pub mod font;
pub mod interpreter;
pub mod operator;
pub mod resources;
pub mod sink;
pub mod standard_fonts;
pub mod to_unicode;
pub mod tokenizer;
pub mod writer;

pub use color_space::{ColorSpace, Pattern, PatternKind, Shading};
pub use error::BackendError;
pub use filter::{AfterTextHook, ContentFilter, FlushFlags, GlyphInfo, TextFilter};
pub use font::{FontDescriptor, FontLoader, FontRef, LopdfFontLoader, WritingMode};
pub use interpreter::Interpreter;
pub use operator::{FontSelection, Operator, TextItem, XObjectKind};
pub use pdfscrub_core;
pub use resources::{ResourceCategory, ResourceRemap};
pub use sink::{ContentSink, Recorder};
pub use tokenizer::{InlineImage, Operand, RawOperator, tokenize};
pub use writer::ContentWriter;
