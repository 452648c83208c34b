//! Text object tracking and glyph removal.
//!
//! Removing a glyph must not move the glyphs after it, so the advance of
//! every removed glyph is accumulated and re-emitted as a `TJ` adjustment in
//! front of the next glyph that is kept.

use pdfscrub_core::{Context, Matrix, Rect, Result};

use super::ContentFilter;
use super::gstate::TextState;
use crate::font::{FontRef, WritingMode};
use crate::operator::{Operator, TextItem};
use crate::sink::ContentSink;

/// Text matrix and text line matrix of the current text object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextObject {
    pub tm: Matrix,
    pub tlm: Matrix,
}

impl Default for TextObject {
    fn default() -> Self {
        Self {
            tm: Matrix::identity(),
            tlm: Matrix::identity(),
        }
    }
}

impl TextObject {
    /// `Td`: move to the start of the next line, offset from the current
    /// line start.
    pub fn move_to_next_line(&mut self, tx: f64, ty: f64) {
        self.tlm = self.tlm.pre_translate(tx, ty);
        self.tm = self.tlm;
    }

    pub fn set_matrix(&mut self, m: Matrix) {
        self.tm = m;
        self.tlm = m;
    }
}

/// What the text filter sees for each shown glyph.
#[derive(Debug, Clone, Copy)]
pub struct GlyphInfo<'g> {
    /// Character code as read from the string.
    pub code: u32,
    pub cid: u32,
    /// Unicode for the glyph; U+FFFD when the font has no mapping.
    pub unicode: &'g [char],
    /// Text rendering matrix: glyph space scaled to the font size, in user
    /// space.
    pub trm: Matrix,
    pub ctm: Matrix,
    /// Glyph bounds in user space.
    pub bbox: Rect,
}

/// Result of running a string or array through the filter.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Shown {
    /// Nothing was removed; the original operator can be forwarded.
    Unchanged,
    Rewritten(Vec<TextItem>),
    /// No font was selected; the text cannot be shown at all.
    Dropped,
}

/// Output of one show operator being rebuilt.
#[derive(Debug, Default)]
struct TextRun {
    items: Vec<TextItem>,
    current: Vec<u8>,
    /// Distance along the writing direction not yet accounted for, in
    /// unscaled text space.
    skip: f64,
    removed: bool,
}

impl TextRun {
    fn end_segment(&mut self) {
        if !self.current.is_empty() {
            self.items.push(TextItem::Text(std::mem::take(&mut self.current)));
        }
    }

    fn flush_skip(&mut self, ctx: &mut Context, size: f64) {
        if self.skip == 0.0 {
            return;
        }
        if size == 0.0 {
            ctx.warn("cannot preserve text spacing with a zero font size");
        } else {
            self.end_segment();
            self.items.push(TextItem::Adjust(-self.skip / size * 1000.0));
        }
        self.skip = 0.0;
    }
}

impl<S: ContentSink> ContentFilter<'_, S> {
    /// Run the items of a show operator through the text filter, tracking
    /// the text matrix as they are shown.
    pub(super) fn show(&mut self, ctx: &mut Context, items: &[TextItem]) -> Result<Shown> {
        let frame = self.stack.top();
        let text = frame.pending.text.clone();
        let ctm = frame.current_ctm();
        let Some(font) = text.font.clone() else {
            ctx.warn("cannot show text without a font");
            return Ok(Shown::Dropped);
        };
        let vertical = font.writing_mode() == WritingMode::Vertical;

        let mut run = TextRun::default();
        for item in items {
            match item {
                TextItem::Text(bytes) => {
                    self.show_string(ctx, &font, &text, ctm, bytes, vertical, &mut run);
                }
                TextItem::Adjust(n) => {
                    let adj = -n * text.size * 0.001;
                    run.skip += adj;
                    self.text.tm = if vertical {
                        self.text.tm.pre_translate(0.0, adj)
                    } else {
                        self.text.tm.pre_translate(adj * text.scale, 0.0)
                    };
                }
            }
        }
        if !run.removed {
            return Ok(Shown::Unchanged);
        }
        run.flush_skip(ctx, text.size);
        run.end_segment();
        Ok(Shown::Rewritten(run.items))
    }

    #[allow(clippy::too_many_arguments)]
    fn show_string(
        &mut self,
        ctx: &mut Context,
        font: &FontRef,
        text: &TextState,
        ctm: Matrix,
        bytes: &[u8],
        vertical: bool,
        run: &mut TextRun,
    ) {
        let size = text.size;
        let mut pos = 0;
        while pos < bytes.len() {
            let (code, len) = font.decode(&bytes[pos..]);
            let len = len.max(1).min(bytes.len() - pos);
            let raw = &bytes[pos..pos + len];
            pos += len;

            let Some(cid) = font.lookup_cid(code) else {
                ctx.warn("cannot encode character");
                run.flush_skip(ctx, size);
                run.current.extend_from_slice(raw);
                continue;
            };

            let mut tsm = Matrix::new(size * text.scale, 0.0, 0.0, size, 0.0, text.rise);
            let (mut tx, mut ty) = (0.0, 0.0);
            if vertical {
                let v = font.vertical_metrics(cid);
                tsm.e -= v.vx * size.abs() * 0.001;
                tsm.f -= v.vy * size * 0.001;
                ty = v.w1 * 0.001 * size + text.char_space;
            } else {
                tx = font.advance_width(cid) * 0.001 * size + text.char_space;
            }
            if code == 32 && len == 1 {
                if vertical {
                    ty += text.word_space;
                } else {
                    tx += text.word_space;
                }
            }

            let remove = match self.text_filter.as_mut() {
                Some(filter) => {
                    let trm = tsm.concat(&self.text.tm).concat(&ctm);
                    let bbox = Matrix::scale(0.001, 0.001)
                        .concat(&trm)
                        .transform_rect(&font.glyph_bbox(cid));
                    let unicode = glyph_unicode(font, code, cid);
                    filter(&GlyphInfo {
                        code,
                        cid,
                        unicode: &unicode,
                        trm,
                        ctm,
                        bbox,
                    })
                }
                None => false,
            };

            if remove {
                run.removed = true;
                run.end_segment();
                run.skip += if vertical { ty } else { tx };
            } else {
                run.flush_skip(ctx, size);
                run.current.extend_from_slice(raw);
            }

            self.text.tm = if vertical {
                self.text.tm.pre_translate(0.0, ty)
            } else {
                self.text.tm.pre_translate(tx * text.scale, 0.0)
            };
        }
    }
}

/// ToUnicode first, then the font's own CID mapping, then U+FFFD.
fn glyph_unicode(font: &FontRef, code: u32, cid: u32) -> Vec<char> {
    match font.to_unicode(code) {
        Some(u) if !u.is_empty() && u != ['\0'] => u.to_vec(),
        _ => match font.cid_to_ucs(cid) {
            Some(c) if c != '\0' => vec![c],
            _ => vec![char::REPLACEMENT_CHARACTER],
        },
    }
}

/// The operator that shows a rewritten item list, if anything remains.
pub(super) fn rewritten_op(mut items: Vec<TextItem>) -> Option<Operator> {
    match items.as_slice() {
        [] => None,
        [TextItem::Text(_)] => match items.pop() {
            Some(TextItem::Text(s)) => Some(Operator::ShowText(s)),
            _ => None,
        },
        _ => Some(Operator::ShowTextArray(items)),
    }
}
