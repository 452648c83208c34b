//! The content-stream filter.
//!
//! [`ContentFilter`] sits between an operator source and a downstream
//! [`ContentSink`]. State-setting operators only update the pending copy of
//! the current graphics-state frame; nothing reaches the sink until an
//! operator with a visible effect flushes the categories it depends on.
//! The result is the input stream with redundant state changes removed,
//! every named resource copied into a new resource dictionary, and,
//! optionally, selected glyphs cut out of the text without disturbing the
//! position of the glyphs around them.
//!
//! The first state change always happens inside a `q` the filter emits
//! itself, and `finish` closes every frame it opened, so the output can be
//! appended to no matter how unbalanced the input's `q`/`Q` were.

mod flush;
mod gstate;
mod text;

use pdfscrub_core::{Context, Matrix, Result};

pub use flush::FlushFlags;
pub use gstate::{ColorState, Frame, FrameStack, GraphicsState, StrokeParams, TextState};
pub use text::{GlyphInfo, TextObject};

use crate::color_space::ColorSpace;
use crate::operator::{Operator, TextItem};
use crate::resources::{ResourceCategory, ResourceRemap};
use crate::sink::ContentSink;
use crate::tokenizer::Operand;
use text::{Shown, rewritten_op};

/// Decides per glyph whether it is removed (`true`) or kept.
pub type TextFilter<'a> = Box<dyn FnMut(&GlyphInfo<'_>) -> bool + 'a>;

/// Produces operators to append after each text object, given the
/// transform in effect. They are wrapped in their own `q`/`Q`.
pub type AfterTextHook<'a> = Box<dyn FnMut(&Matrix) -> Vec<Operator> + 'a>;

/// Rewrites an operator stream into `sink`. See the module documentation.
pub struct ContentFilter<'a, S> {
    sink: S,
    resources: ResourceRemap<'a>,
    text_filter: Option<TextFilter<'a>>,
    after_text: Option<AfterTextHook<'a>>,
    stack: FrameStack,
    text: TextObject,
    /// Path construction operators held until the painting operator.
    path: Vec<Operator>,
}

impl<'a, S: ContentSink> ContentFilter<'a, S> {
    pub fn new(sink: S, resources: ResourceRemap<'a>) -> Self {
        Self {
            sink,
            resources,
            text_filter: None,
            after_text: None,
            stack: FrameStack::default(),
            text: TextObject::default(),
            path: Vec::new(),
        }
    }

    pub fn with_text_filter(mut self, filter: impl FnMut(&GlyphInfo<'_>) -> bool + 'a) -> Self {
        self.text_filter = Some(Box::new(filter));
        self
    }

    pub fn with_after_text(mut self, hook: impl FnMut(&Matrix) -> Vec<Operator> + 'a) -> Self {
        self.after_text = Some(Box::new(hook));
        self
    }

    /// Number of frames on the stack, the bottom frame included.
    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    /// The frame state operators currently apply to.
    pub fn current_frame(&self) -> &Frame {
        self.stack.top()
    }

    /// The current text matrix.
    pub fn text_matrix(&self) -> Matrix {
        self.text.tm
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn resources(&self) -> &ResourceRemap<'a> {
        &self.resources
    }

    /// Take the sink and the resource table apart. Frames still open are
    /// dropped without emitting `Q`; call `finish` first to close them.
    pub fn into_parts(self) -> (S, ResourceRemap<'a>) {
        (self.sink, self.resources)
    }

    fn emit(&mut self, ctx: &mut Context, op: Operator) -> Result<()> {
        self.sink.process(ctx, op)
    }

    fn copy_resource(&mut self, category: ResourceCategory, name: &str) -> Result<()> {
        self.resources.copy(category, name)?;
        Ok(())
    }

    /// `Q`: drop the top frame, restoring downstream only if it was saved.
    fn pop(&mut self, ctx: &mut Context) -> Result<()> {
        if self.stack.pop().is_some_and(|frame| frame.pushed) {
            self.emit(ctx, Operator::Restore)?;
        }
        Ok(())
    }

    fn drain_path(&mut self, ctx: &mut Context) -> Result<()> {
        for op in std::mem::take(&mut self.path) {
            self.emit(ctx, op)?;
        }
        Ok(())
    }

    /// `Td` family: flush everything, then track and forward the move.
    fn move_text(&mut self, ctx: &mut Context, op: Operator, tx: f64, ty: f64) -> Result<()> {
        self.flush(ctx, FlushFlags::ALL)?;
        self.text.move_to_next_line(tx, ty);
        self.emit(ctx, op)
    }

    fn next_line(&mut self) {
        let leading = self.stack.top().pending.text.leading;
        self.text.move_to_next_line(0.0, -leading);
    }

    /// Run a show operator's items through the glyph filter and emit the
    /// result, or `original` when nothing was removed.
    fn show_items(
        &mut self,
        ctx: &mut Context,
        items: &[TextItem],
        original: Operator,
    ) -> Result<()> {
        match self.show(ctx, items)? {
            Shown::Unchanged => self.emit(ctx, original),
            Shown::Rewritten(items) => match rewritten_op(items) {
                Some(op) => self.emit(ctx, op),
                None => Ok(()),
            },
            Shown::Dropped => Ok(()),
        }
    }

    /// `'` and `"` after their state updates: move to the next line, then
    /// show. The line move is emitted separately when the string changed.
    fn next_line_show(&mut self, ctx: &mut Context, text: Vec<u8>) -> Result<()> {
        self.flush(ctx, FlushFlags::ALL)?;
        self.next_line();
        let items = [TextItem::Text(text)];
        match self.show(ctx, &items)? {
            Shown::Unchanged => {
                let [TextItem::Text(text)] = items else {
                    return Ok(());
                };
                self.emit(ctx, Operator::NextLineShowText(text))
            }
            Shown::Rewritten(items) => {
                self.emit(ctx, Operator::NextLine)?;
                match rewritten_op(items) {
                    Some(op) => self.emit(ctx, op),
                    None => Ok(()),
                }
            }
            Shown::Dropped => self.emit(ctx, Operator::NextLine),
        }
    }

    fn end_text(&mut self, ctx: &mut Context) -> Result<()> {
        self.flush(ctx, FlushFlags::NONE)?;
        self.emit(ctx, Operator::EndText)?;
        let ctm = self.stack.top().current_ctm();
        let extra = match self.after_text.as_mut() {
            Some(hook) => hook(&ctm),
            None => return Ok(()),
        };
        if extra.is_empty() {
            return Ok(());
        }
        self.emit(ctx, Operator::Save)?;
        for op in extra {
            self.emit(ctx, op)?;
        }
        self.emit(ctx, Operator::Restore)
    }

    fn set_color_space(
        &mut self,
        ctx: &mut Context,
        stroke: bool,
        name: &str,
        space: ColorSpace,
    ) -> Result<()> {
        if ColorSpace::from_family_name(name).is_none() {
            self.copy_resource(ResourceCategory::ColorSpace, name)?;
        }
        let state = self.update(ctx)?;
        let color = if stroke { &mut state.stroke } else { &mut state.fill };
        color.set_space(name, space);
        Ok(())
    }

    fn set_device_color(
        &mut self,
        ctx: &mut Context,
        stroke: bool,
        space: ColorSpace,
        components: &[f64],
    ) -> Result<()> {
        let state = self.update(ctx)?;
        let color = if stroke { &mut state.stroke } else { &mut state.fill };
        if let Some(name) = space.device_name() {
            color.set_space(name, space);
        }
        color.set_color(components);
        Ok(())
    }

    fn set_color(&mut self, ctx: &mut Context, stroke: bool, components: &[f64]) -> Result<()> {
        let state = self.update(ctx)?;
        let color = if stroke { &mut state.stroke } else { &mut state.fill };
        color.set_color(components);
        Ok(())
    }

    fn properties(&mut self, properties: &Operand) -> Result<()> {
        match properties {
            Operand::Name(name) => self.copy_resource(ResourceCategory::Properties, name),
            _ => Ok(()),
        }
    }

    /// Flush `flags`, then forward `op`.
    fn forward(&mut self, ctx: &mut Context, flags: FlushFlags, op: Operator) -> Result<()> {
        self.flush(ctx, flags)?;
        self.emit(ctx, op)
    }
}

impl<S: ContentSink> ContentSink for ContentFilter<'_, S> {
    fn process(&mut self, ctx: &mut Context, op: Operator) -> Result<()> {
        if let Some(flags) = paint_flags(&op) {
            self.flush(ctx, flags)?;
            self.drain_path(ctx)?;
            return self.emit(ctx, op);
        }
        if op.is_path_construction() {
            if self.path.is_empty() {
                self.flush(ctx, FlushFlags::CTM)?;
            }
            self.path.push(op);
            return Ok(());
        }
        self.drain_path(ctx)?;

        match op {
            Operator::SetLineWidth(w) => self.update(ctx)?.stroke_params.width = w,
            Operator::SetLineCap(cap) => self.update(ctx)?.stroke_params.cap = cap,
            Operator::SetLineJoin(join) => self.update(ctx)?.stroke_params.join = join,
            Operator::SetMiterLimit(m) => self.update(ctx)?.stroke_params.miter_limit = m,
            Operator::SetDash { .. }
            | Operator::SetRenderingIntent(_)
            | Operator::SetFlatness(_)
            | Operator::SetCharWidth { .. }
            | Operator::SetCacheDevice { .. }
            | Operator::MarkPoint(_)
            | Operator::BeginMarkedContent(_)
            | Operator::EndMarkedContent
            | Operator::BeginCompat
            | Operator::EndCompat => self.forward(ctx, FlushFlags::NONE, op)?,
            Operator::SetExtGState(ref name) => {
                self.copy_resource(ResourceCategory::ExtGState, name)?;
                self.forward(ctx, FlushFlags::ALL, op)?;
            }

            Operator::Save => self.stack.push(),
            Operator::Restore => self.pop(ctx)?,
            Operator::Concat(m) => {
                let state = self.update(ctx)?;
                if !m.is_identity() {
                    state.ctm = m.concat(&state.ctm);
                }
            }

            Operator::BeginText => {
                self.flush(ctx, FlushFlags::NONE)?;
                self.text = TextObject::default();
                self.emit(ctx, op)?;
            }
            Operator::EndText => self.end_text(ctx)?,

            Operator::SetCharSpacing(v) => {
                self.flush(ctx, FlushFlags::NONE)?;
                self.update(ctx)?.text.char_space = v;
            }
            Operator::SetWordSpacing(v) => {
                self.flush(ctx, FlushFlags::NONE)?;
                self.update(ctx)?.text.word_space = v;
            }
            Operator::SetHorizontalScaling(v) => {
                self.flush(ctx, FlushFlags::NONE)?;
                self.update(ctx)?.text.scale = v / 100.0;
            }
            Operator::SetLeading(v) => {
                self.flush(ctx, FlushFlags::NONE)?;
                self.update(ctx)?.text.leading = v;
            }
            Operator::SetFont(selection) => {
                self.flush(ctx, FlushFlags::NONE)?;
                self.copy_resource(ResourceCategory::Font, &selection.name)?;
                let text = &mut self.update(ctx)?.text;
                text.font_name = Some(selection.name);
                text.font = selection.font;
                text.size = selection.size;
            }
            Operator::SetRenderMode(v) => {
                self.flush(ctx, FlushFlags::NONE)?;
                self.update(ctx)?.text.render_mode = v;
            }
            Operator::SetRise(v) => {
                self.flush(ctx, FlushFlags::NONE)?;
                self.update(ctx)?.text.rise = v;
            }

            Operator::MoveText(tx, ty) => self.move_text(ctx, op, tx, ty)?,
            Operator::MoveTextSetLeading(tx, ty) => {
                self.flush(ctx, FlushFlags::ALL)?;
                let frame = self.stack.top_mut();
                frame.pending.text.leading = -ty;
                frame.sent.text.leading = -ty;
                self.text.move_to_next_line(tx, ty);
                self.emit(ctx, op)?;
            }
            Operator::SetTextMatrix(m) => {
                self.text.set_matrix(m);
                self.emit(ctx, op)?;
            }
            Operator::NextLine => {
                self.flush(ctx, FlushFlags::ALL)?;
                self.next_line();
                self.emit(ctx, op)?;
            }

            Operator::ShowText(ref s) => {
                self.flush(ctx, FlushFlags::ALL)?;
                let items = [TextItem::Text(s.clone())];
                self.show_items(ctx, &items, op)?;
            }
            Operator::ShowTextArray(ref items) => {
                self.flush(ctx, FlushFlags::ALL)?;
                let items = items.clone();
                self.show_items(ctx, &items, op)?;
            }
            Operator::NextLineShowText(text) => self.next_line_show(ctx, text)?,
            Operator::NextLineShowTextSpaced {
                word_spacing,
                char_spacing,
                text,
            } => {
                let state = self.update(ctx)?;
                state.text.word_space = word_spacing;
                state.text.char_space = char_spacing;
                self.next_line_show(ctx, text)?;
            }

            Operator::SetStrokeColorSpace { name, space } => {
                self.set_color_space(ctx, true, &name, space)?;
            }
            Operator::SetFillColorSpace { name, space } => {
                self.set_color_space(ctx, false, &name, space)?;
            }
            Operator::SetStrokeColor(c) => self.set_color(ctx, true, &c)?,
            Operator::SetFillColor(c) => self.set_color(ctx, false, &c)?,
            Operator::SetStrokePattern {
                name,
                pattern,
                components,
            } => {
                self.copy_resource(ResourceCategory::Pattern, &name)?;
                self.update(ctx)?.stroke.set_pattern(&name, pattern, &components);
            }
            Operator::SetFillPattern {
                name,
                pattern,
                components,
            } => {
                self.copy_resource(ResourceCategory::Pattern, &name)?;
                self.update(ctx)?.fill.set_pattern(&name, pattern, &components);
            }
            Operator::SetStrokeShade { name, pattern } => {
                self.copy_resource(ResourceCategory::Pattern, &name)?;
                self.update(ctx)?.stroke.set_shade(&name, pattern);
            }
            Operator::SetFillShade { name, pattern } => {
                self.copy_resource(ResourceCategory::Pattern, &name)?;
                self.update(ctx)?.fill.set_shade(&name, pattern);
            }
            Operator::SetStrokeGray(g) => {
                self.set_device_color(ctx, true, ColorSpace::DeviceGray, &[g])?;
            }
            Operator::SetFillGray(g) => {
                self.set_device_color(ctx, false, ColorSpace::DeviceGray, &[g])?;
            }
            Operator::SetStrokeRgb(c) => {
                self.set_device_color(ctx, true, ColorSpace::DeviceRgb, &c)?;
            }
            Operator::SetFillRgb(c) => {
                self.set_device_color(ctx, false, ColorSpace::DeviceRgb, &c)?;
            }
            Operator::SetStrokeCmyk(c) => {
                self.set_device_color(ctx, true, ColorSpace::DeviceCmyk, &c)?;
            }
            Operator::SetFillCmyk(c) => {
                self.set_device_color(ctx, false, ColorSpace::DeviceCmyk, &c)?;
            }

            Operator::PaintShading { ref name, .. } => {
                self.copy_resource(ResourceCategory::Shading, name)?;
                self.forward(ctx, FlushFlags::ALL, op)?;
            }
            Operator::InlineImage(_) => self.forward(ctx, FlushFlags::ALL, op)?,
            Operator::PaintXObject { ref name, .. } => {
                self.copy_resource(ResourceCategory::XObject, name)?;
                self.forward(ctx, FlushFlags::ALL, op)?;
            }

            Operator::MarkPointProperties { ref properties, .. }
            | Operator::BeginMarkedContentProperties { ref properties, .. } => {
                self.properties(properties)?;
                self.forward(ctx, FlushFlags::NONE, op)?;
            }

            // Handled above, before the path buffer is drained.
            Operator::MoveTo(..)
            | Operator::LineTo(..)
            | Operator::CurveTo(_)
            | Operator::CurveToV(_)
            | Operator::CurveToY(_)
            | Operator::ClosePath
            | Operator::Rectangle(_)
            | Operator::Clip
            | Operator::ClipEvenOdd
            | Operator::Stroke
            | Operator::CloseStroke
            | Operator::Fill
            | Operator::FillCompat
            | Operator::FillEvenOdd
            | Operator::FillStroke
            | Operator::FillStrokeEvenOdd
            | Operator::CloseFillStroke
            | Operator::CloseFillStrokeEvenOdd
            | Operator::EndPath => {}
        }
        Ok(())
    }

    /// Close the stream: emit any held path, restore every frame the filter
    /// saved, then finish the sink.
    fn finish(&mut self, ctx: &mut Context) -> Result<()> {
        self.drain_path(ctx)?;
        while !self.stack.is_bottom() {
            self.pop(ctx)?;
        }
        self.sink.finish(ctx)
    }
}

/// The state a painting operator depends on.
fn paint_flags(op: &Operator) -> Option<FlushFlags> {
    Some(match op {
        Operator::Stroke | Operator::CloseStroke => FlushFlags::STROKE,
        Operator::Fill | Operator::FillCompat | Operator::FillEvenOdd => FlushFlags::FILL,
        Operator::FillStroke
        | Operator::FillStrokeEvenOdd
        | Operator::CloseFillStroke
        | Operator::CloseFillStrokeEvenOdd => FlushFlags::ALL,
        Operator::EndPath => FlushFlags::CTM,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::default_font;
    use crate::operator::FontSelection;
    use crate::sink::Recorder;
    use lopdf::{Dictionary, Object, dictionary};
    use pdfscrub_core::{CollectingSink, ContextOptions};
    use std::rc::Rc;

    fn quiet() -> Context {
        Context::with_options(ContextOptions::quiet())
    }

    fn run(ops: Vec<Operator>) -> Vec<Operator> {
        let old = Dictionary::new();
        let mut ctx = quiet();
        let mut filter = ContentFilter::new(Recorder::new(), ResourceRemap::new(None, &old));
        for op in ops {
            filter.process(&mut ctx, op).unwrap();
        }
        filter.finish(&mut ctx).unwrap();
        filter.into_parts().0.into_ops()
    }

    fn keywords(ops: &[Operator]) -> Vec<&'static str> {
        ops.iter().map(Operator::keyword).collect()
    }

    fn font(name: &str, size: f64) -> Operator {
        Operator::SetFont(FontSelection {
            name: name.into(),
            size,
            font: Some(default_font()),
        })
    }

    #[test]
    fn red_rectangle_uses_fill_shorthand_only() {
        let out = run(vec![
            Operator::SetStrokeRgb([1.0, 0.0, 0.0]),
            Operator::SetFillRgb([1.0, 0.0, 0.0]),
            Operator::Rectangle([100.0, 100.0, 200.0, 200.0]),
            Operator::Fill,
        ]);
        assert_eq!(
            out,
            vec![
                Operator::Save,
                Operator::SetFillRgb([1.0, 0.0, 0.0]),
                Operator::Rectangle([100.0, 100.0, 200.0, 200.0]),
                Operator::Fill,
                Operator::Restore,
            ]
        );
    }

    #[test]
    fn excess_restores_are_ignored() {
        let out = run(vec![
            Operator::Restore,
            Operator::Save,
            Operator::SetLineWidth(2.0),
            Operator::Rectangle([0.0, 0.0, 1.0, 1.0]),
            Operator::Stroke,
            Operator::Restore,
            Operator::Restore,
        ]);
        assert_eq!(keywords(&out), ["q", "w", "re", "S", "Q"]);
    }

    #[test]
    fn unclosed_saves_are_closed_at_finish() {
        let out = run(vec![
            Operator::Save,
            Operator::Save,
            Operator::Rectangle([0.0, 0.0, 1.0, 1.0]),
            Operator::Fill,
        ]);
        assert_eq!(keywords(&out), ["q", "re", "f", "Q"]);
    }

    #[test]
    fn untouched_explicit_frame_emits_nothing() {
        let out = run(vec![Operator::Save, Operator::Restore]);
        assert!(out.is_empty());
    }

    #[test]
    fn transform_is_flushed_before_the_path() {
        let m = Matrix::new(2.0, 0.0, 0.0, 2.0, 10.0, 10.0);
        let out = run(vec![
            Operator::Concat(m),
            Operator::MoveTo(0.0, 0.0),
            Operator::LineTo(1.0, 1.0),
            Operator::Stroke,
        ]);
        assert_eq!(keywords(&out), ["q", "cm", "m", "l", "S", "Q"]);
        assert_eq!(out[1], Operator::Concat(m));
    }

    #[test]
    fn identity_concat_is_dropped() {
        let out = run(vec![
            Operator::Concat(Matrix::identity()),
            Operator::Rectangle([0.0, 0.0, 1.0, 1.0]),
            Operator::EndPath,
        ]);
        assert_eq!(keywords(&out), ["q", "re", "n", "Q"]);
    }

    #[test]
    fn stroke_parameters_only_for_stroking() {
        let out = run(vec![
            Operator::SetLineWidth(3.0),
            Operator::SetLineCap(1),
            Operator::SetMiterLimit(10.0),
            Operator::Rectangle([0.0, 0.0, 1.0, 1.0]),
            Operator::Fill,
            Operator::Rectangle([0.0, 0.0, 1.0, 1.0]),
            Operator::Stroke,
        ]);
        assert_eq!(keywords(&out), ["q", "re", "f", "w", "J", "re", "S", "Q"]);
    }

    #[test]
    fn repeated_color_is_not_re_emitted() {
        let out = run(vec![
            Operator::SetFillGray(0.5),
            Operator::Rectangle([0.0, 0.0, 1.0, 1.0]),
            Operator::Fill,
            Operator::SetFillGray(0.5),
            Operator::Rectangle([0.0, 0.0, 1.0, 1.0]),
            Operator::Fill,
        ]);
        assert_eq!(keywords(&out), ["q", "g", "re", "f", "re", "f", "Q"]);
    }

    #[test]
    fn restore_brings_back_parent_state() {
        let out = run(vec![
            Operator::SetFillGray(0.5),
            Operator::Save,
            Operator::SetFillGray(0.2),
            Operator::Rectangle([0.0, 0.0, 1.0, 1.0]),
            Operator::Fill,
            Operator::Restore,
            Operator::Rectangle([0.0, 0.0, 1.0, 1.0]),
            Operator::Fill,
        ]);
        assert_eq!(
            keywords(&out),
            ["q", "q", "g", "re", "f", "Q", "g", "re", "f", "Q"]
        );
        assert_eq!(out[2], Operator::SetFillGray(0.2));
        assert_eq!(out[6], Operator::SetFillGray(0.5));
    }

    #[test]
    fn text_state_flushed_at_show() {
        let out = run(vec![
            Operator::BeginText,
            font("F1", 12.0),
            Operator::SetCharSpacing(1.0),
            Operator::SetHorizontalScaling(50.0),
            Operator::ShowText(b"Hi".to_vec()),
            Operator::EndText,
        ]);
        assert_eq!(keywords(&out), ["q", "BT", "Tc", "Tz", "Tf", "Tj", "ET", "Q"]);
        assert_eq!(out[3], Operator::SetHorizontalScaling(50.0));
    }

    #[test]
    fn glyphs_removed_with_spacing_preserved() {
        let old = Dictionary::new();
        let mut ctx = quiet();
        let mut filter = ContentFilter::new(Recorder::new(), ResourceRemap::new(None, &old))
            .with_text_filter(|g: &GlyphInfo<'_>| g.unicode == ['B']);
        for op in [
            Operator::BeginText,
            font("F1", 10.0),
            Operator::ShowText(b"ABC".to_vec()),
        ] {
            filter.process(&mut ctx, op).unwrap();
        }
        // Helvetica: A and B are 667 units wide, C is 722.
        let expected_x = (667.0 + 667.0 + 722.0) * 0.01;
        assert!((filter.text_matrix().e - expected_x).abs() < 1e-9);
        filter.finish(&mut ctx).unwrap();
        let out = filter.into_parts().0.into_ops();
        let Operator::ShowTextArray(items) = &out[3] else {
            panic!("expected TJ, got {:?}", out[3]);
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], TextItem::Text(b"A".to_vec()));
        assert!(matches!(items[1], TextItem::Adjust(n) if (n + 667.0).abs() < 1e-6));
        assert_eq!(items[2], TextItem::Text(b"C".to_vec()));
    }

    #[test]
    fn removing_every_glyph_emits_no_show() {
        let old = Dictionary::new();
        let mut ctx = quiet();
        let mut filter = ContentFilter::new(Recorder::new(), ResourceRemap::new(None, &old))
            .with_text_filter(|_: &GlyphInfo<'_>| true);
        for op in [
            Operator::BeginText,
            font("F1", 10.0),
            Operator::ShowText(b"AB".to_vec()),
            Operator::EndText,
        ] {
            filter.process(&mut ctx, op).unwrap();
        }
        filter.finish(&mut ctx).unwrap();
        let out = filter.into_parts().0;
        assert_eq!(out.keywords(), ["q", "BT", "Tf", "TJ", "ET", "Q"]);
    }

    #[test]
    fn next_line_show_rewritten_splits_the_move() {
        let old = Dictionary::new();
        let mut ctx = quiet();
        let mut filter = ContentFilter::new(Recorder::new(), ResourceRemap::new(None, &old))
            .with_text_filter(|g: &GlyphInfo<'_>| g.unicode == ['x']);
        for op in [
            Operator::BeginText,
            font("F1", 10.0),
            Operator::NextLineShowText(b"ax".to_vec()),
            Operator::NextLineShowText(b"ab".to_vec()),
        ] {
            filter.process(&mut ctx, op).unwrap();
        }
        let out = filter.sink().keywords();
        // The skip left by the trailing "x" keeps the rewritten string a TJ.
        assert_eq!(out, ["q", "BT", "Tf", "T*", "TJ", "'"]);
    }

    #[test]
    fn text_without_font_is_dropped_with_warning() {
        let sink = CollectingSink::new();
        let old = Dictionary::new();
        let mut ctx = Context::with_sink(ContextOptions::quiet(), sink.clone());
        let mut filter = ContentFilter::new(Recorder::new(), ResourceRemap::new(None, &old));
        filter.process(&mut ctx, Operator::BeginText).unwrap();
        filter.process(&mut ctx, Operator::ShowText(b"A".to_vec())).unwrap();
        ctx.flush_warnings();
        assert_eq!(filter.sink().keywords(), ["q", "BT"]);
        assert_eq!(sink.warning_count(), 1);
    }

    #[test]
    fn after_text_hook_wrapped_in_save_restore() {
        let old = Dictionary::new();
        let mut ctx = quiet();
        let mut seen = Vec::new();
        {
            let mut filter = ContentFilter::new(Recorder::new(), ResourceRemap::new(None, &old))
                .with_after_text(|ctm: &Matrix| {
                    seen.push(*ctm);
                    vec![Operator::Rectangle([0.0, 0.0, 5.0, 5.0]), Operator::Fill]
                });
            for op in [
                Operator::Concat(Matrix::translate(3.0, 4.0)),
                Operator::BeginText,
                Operator::EndText,
            ] {
                filter.process(&mut ctx, op).unwrap();
            }
            assert_eq!(
                filter.sink().keywords(),
                ["q", "BT", "ET", "q", "re", "f", "Q"]
            );
        }
        assert_eq!(seen, vec![Matrix::translate(3.0, 4.0)]);
    }

    #[test]
    fn resources_are_copied_once() {
        let old = dictionary! {
            "Font" => dictionary! { "F1" => Object::Reference((4, 0)) },
            "XObject" => dictionary! { "Im1" => Object::Reference((7, 0)) },
        };
        let mut ctx = quiet();
        let mut filter = ContentFilter::new(Recorder::new(), ResourceRemap::new(None, &old));
        for op in [
            font("F1", 9.0),
            font("F1", 10.0),
            Operator::PaintXObject {
                name: "Im1".into(),
                kind: crate::operator::XObjectKind::Image,
            },
        ] {
            filter.process(&mut ctx, op).unwrap();
        }
        assert_eq!(filter.resources().count(ResourceCategory::Font), 1);
        assert_eq!(filter.resources().count(ResourceCategory::XObject), 1);
    }

    #[test]
    fn font_references_released_after_finish() {
        let handle = default_font();
        let old = Dictionary::new();
        let mut ctx = quiet();
        let mut filter = ContentFilter::new(Recorder::new(), ResourceRemap::new(None, &old));
        let select = Operator::SetFont(FontSelection {
            name: "F1".into(),
            size: 12.0,
            font: Some(handle.clone()),
        });
        for op in [Operator::Save, select, Operator::BeginText, Operator::ShowText(b"A".to_vec())] {
            filter.process(&mut ctx, op).unwrap();
        }
        assert!(Rc::strong_count(&handle) > 1);
        filter.finish(&mut ctx).unwrap();
        let (recorder, _) = filter.into_parts();
        // Only the recorded Tf still holds the font.
        drop(recorder);
        assert_eq!(Rc::strong_count(&handle), 1);
    }
}
