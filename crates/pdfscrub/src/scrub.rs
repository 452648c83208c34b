//! Page-level content rewriting.
//!
//! Each page's content stream is interpreted, passed through a
//! [`ContentFilter`] and serialized back into a single new stream. Every
//! page runs inside its own protected scope on the caller's [`Context`], so
//! a failure is reported once and leaves the page untouched.

use lopdf::{Document, ObjectId};
use pdfscrub_core::{Context, Error, Matrix, Result};
use pdfscrub_parse::{
    AfterTextHook, ContentFilter, ContentWriter, GlyphInfo, Interpreter, Operator, ResourceRemap,
    TextFilter,
};

use crate::page;

/// Options for [`filter_page`] and friends.
pub struct FilterPageOptions<'f> {
    text_filter: Option<TextFilter<'f>>,
    after_text: Option<AfterTextHook<'f>>,
    minimize_resources: bool,
}

impl Default for FilterPageOptions<'_> {
    fn default() -> Self {
        Self {
            text_filter: None,
            after_text: None,
            minimize_resources: true,
        }
    }
}

impl std::fmt::Debug for FilterPageOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPageOptions")
            .field("text_filter", &self.text_filter.is_some())
            .field("after_text", &self.after_text.is_some())
            .field("minimize_resources", &self.minimize_resources)
            .finish()
    }
}

impl<'f> FilterPageOptions<'f> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every glyph for which `filter` returns true.
    pub fn with_text_filter(mut self, filter: impl FnMut(&GlyphInfo<'_>) -> bool + 'f) -> Self {
        self.text_filter = Some(Box::new(filter));
        self
    }

    /// Insert the hook's operators after each text object.
    pub fn with_after_text(mut self, hook: impl FnMut(&Matrix) -> Vec<Operator> + 'f) -> Self {
        self.after_text = Some(Box::new(hook));
        self
    }

    /// Leave the page's `/Resources` as they are instead of replacing them
    /// with the entries the rewritten stream uses.
    pub fn keep_resources(mut self) -> Self {
        self.minimize_resources = false;
        self
    }

    pub fn minimize_resources(&self) -> bool {
        self.minimize_resources
    }
}

/// What filtering one page did.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageReport {
    /// 1-based page number.
    pub page_number: u32,
    pub object_id: ObjectId,
    /// Warnings raised while filtering this page, repeats included.
    pub warnings: usize,
    pub bytes_in: usize,
    pub bytes_out: usize,
}

/// Per-page results of a multi-page run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterReport {
    pub pages: Vec<PageReport>,
}

impl FilterReport {
    pub fn total_warnings(&self) -> usize {
        self.pages.iter().map(|p| p.warnings).sum()
    }

    pub fn bytes_saved(&self) -> isize {
        self.pages
            .iter()
            .map(|p| p.bytes_in as isize - p.bytes_out as isize)
            .sum()
    }
}

/// Rewrite one page's content stream through a [`ContentFilter`].
///
/// `page_number` is 1-based, as returned by `Document::get_pages`.
///
/// # Errors
///
/// Any error raised while reading the page, interpreting its content or
/// writing the result. The error has already been reported through `ctx`;
/// the document is unchanged when this fails.
pub fn filter_page(
    ctx: &mut Context,
    doc: &mut Document,
    page_number: u32,
    options: &mut FilterPageOptions<'_>,
) -> Result<PageReport> {
    let page_id = doc
        .get_pages()
        .get(&page_number)
        .copied()
        .ok_or_else(|| Error::argument(format!("page {page_number} does not exist")))?;

    let warnings_before = ctx.warnings_raised();
    let outcome = ctx
        .protect(|ctx| rewrite(ctx, doc, page_id, options))
        .into_result();
    let (content, resources, bytes_in) = outcome?;

    let bytes_out = content.len();
    page::replace_contents(doc, page_id, content)?;
    if let Some(resources) = resources {
        page::replace_resources(doc, page_id, resources)?;
    }

    Ok(PageReport {
        page_number,
        object_id: page_id,
        warnings: ctx.warnings_raised() - warnings_before,
        bytes_in,
        bytes_out,
    })
}

type Rewritten = (Vec<u8>, Option<lopdf::Dictionary>, usize);

fn rewrite(
    ctx: &mut Context,
    doc: &Document,
    page_id: ObjectId,
    options: &mut FilterPageOptions<'_>,
) -> Result<Rewritten> {
    let content = page::content_bytes(doc, page_id)?;
    let old_resources = page::resources(doc, page_id)?;

    let mut filter = ContentFilter::new(
        ContentWriter::new(),
        ResourceRemap::new(Some(doc), old_resources),
    );
    if let Some(text_filter) = options.text_filter.as_mut() {
        filter = filter.with_text_filter(move |g: &GlyphInfo<'_>| text_filter(g));
    }
    if let Some(after_text) = options.after_text.as_mut() {
        filter = filter.with_after_text(move |ctm: &Matrix| after_text(ctm));
    }

    Interpreter::new(Some(doc), old_resources).run(ctx, &content, &mut filter)?;

    let (writer, remap) = filter.into_parts();
    let resources = options
        .minimize_resources
        .then(|| remap.into_new_resources());
    Ok((writer.into_bytes(), resources, content.len()))
}

/// Filter the listed pages (1-based) in order.
///
/// Stops at the first page that fails; pages before it stay rewritten.
///
/// # Errors
///
/// `Argument` for a page number outside the document, otherwise whatever
/// [`filter_page`] reports.
pub fn filter_pages(
    ctx: &mut Context,
    doc: &mut Document,
    page_numbers: &[u32],
    options: &mut FilterPageOptions<'_>,
) -> Result<FilterReport> {
    let mut report = FilterReport::default();
    for &number in page_numbers {
        report.pages.push(filter_page(ctx, doc, number, options)?);
    }
    Ok(report)
}

/// Filter every page of the document.
///
/// # Errors
///
/// Whatever [`filter_page`] reports for the first failing page.
pub fn filter_document(
    ctx: &mut Context,
    doc: &mut Document,
    options: &mut FilterPageOptions<'_>,
) -> Result<FilterReport> {
    let numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    filter_pages(ctx, doc, &numbers, options)
}

/// Remove, on every page, the glyphs whose Unicode text `predicate`
/// accepts. Spacing of the remaining text is preserved.
///
/// # Errors
///
/// Whatever [`filter_page`] reports for the first failing page.
pub fn redact_text(
    ctx: &mut Context,
    doc: &mut Document,
    mut predicate: impl FnMut(&[char]) -> bool,
) -> Result<FilterReport> {
    let mut options =
        FilterPageOptions::new().with_text_filter(|g: &GlyphInfo<'_>| predicate(g.unicode));
    filter_document(ctx, doc, &mut options)
}
