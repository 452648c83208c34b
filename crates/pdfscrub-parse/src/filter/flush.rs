//! Bringing the downstream state up to date with the pending state.

use std::ops::BitOr;
use std::rc::Rc;

use pdfscrub_core::{Context, Matrix, Result};

use super::ContentFilter;
use super::gstate::{ColorState, GraphicsState, Shorthand};
use crate::operator::{FontSelection, Operator};
use crate::sink::ContentSink;

/// Which parts of the pending state a flush sends downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlushFlags(u8);

impl FlushFlags {
    pub const NONE: FlushFlags = FlushFlags(0);
    pub const CTM: FlushFlags = FlushFlags(1);
    pub const FILL_COLOR: FlushFlags = FlushFlags(2);
    pub const STROKE_COLOR: FlushFlags = FlushFlags(4);
    pub const TEXT: FlushFlags = FlushFlags(8);
    /// Everything stroking depends on, line style included.
    pub const STROKE: FlushFlags = FlushFlags(1 | 4);
    pub const FILL: FlushFlags = FlushFlags(1 | 2);
    pub const ALL: FlushFlags = FlushFlags(1 | 2 | 4 | 8);

    pub fn contains(self, other: FlushFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for FlushFlags {
    type Output = FlushFlags;

    fn bitor(self, rhs: FlushFlags) -> FlushFlags {
        FlushFlags(self.0 | rhs.0)
    }
}

impl<S: ContentSink> ContentFilter<'_, S> {
    /// Make sure a state change never lands in the bottom frame: the first
    /// one pushes a protective frame and emits `q`.
    pub(super) fn protect_bottom(&mut self, ctx: &mut Context) -> Result<()> {
        if self.stack.is_bottom() {
            #[cfg(feature = "tracing")]
            tracing::trace!("pushing protective frame");
            self.stack.push();
            self.stack.top_mut().pushed = true;
            self.emit(ctx, Operator::Save)?;
        }
        Ok(())
    }

    /// The pending state of the frame a state-setting operator updates.
    pub(super) fn update(&mut self, ctx: &mut Context) -> Result<&mut GraphicsState> {
        self.protect_bottom(ctx)?;
        Ok(&mut self.stack.top_mut().pending)
    }

    /// Emit the minimal operators that bring the selected parts of the
    /// downstream state in line with the pending state.
    ///
    /// Flushing twice with no intervening change emits nothing the second
    /// time, apart from a `q` owed by a lazily pushed frame.
    pub fn flush(&mut self, ctx: &mut Context, flags: FlushFlags) -> Result<()> {
        self.protect_bottom(ctx)?;
        if !self.stack.top().pushed {
            self.stack.top_mut().pushed = true;
            self.emit(ctx, Operator::Save)?;
        }

        let mut out = Vec::new();
        let frame = self.stack.top_mut();
        let (pending, sent) = (&mut frame.pending, &mut frame.sent);

        if flags.contains(FlushFlags::CTM) && !pending.ctm.is_identity() {
            out.push(Operator::Concat(pending.ctm));
            sent.ctm = pending.ctm.concat(&sent.ctm);
            pending.ctm = Matrix::identity();
        }
        if flags.contains(FlushFlags::FILL_COLOR) {
            diff_color(&pending.fill, &mut sent.fill, false, &mut out);
        }
        if flags.contains(FlushFlags::STROKE_COLOR) {
            diff_color(&pending.stroke, &mut sent.stroke, true, &mut out);
        }
        if flags.contains(FlushFlags::STROKE) {
            let (p, s) = (pending.stroke_params, &mut sent.stroke_params);
            if p.width != s.width {
                out.push(Operator::SetLineWidth(p.width));
            }
            if p.cap != s.cap {
                out.push(Operator::SetLineCap(p.cap));
            }
            if p.join != s.join {
                out.push(Operator::SetLineJoin(p.join));
            }
            if p.miter_limit != s.miter_limit {
                out.push(Operator::SetMiterLimit(p.miter_limit));
            }
            *s = p;
        }
        if flags.contains(FlushFlags::TEXT) {
            let (p, s) = (&pending.text, &mut sent.text);
            if p.char_space != s.char_space {
                out.push(Operator::SetCharSpacing(p.char_space));
            }
            if p.word_space != s.word_space {
                out.push(Operator::SetWordSpacing(p.word_space));
            }
            if p.scale != s.scale {
                out.push(Operator::SetHorizontalScaling(p.scale * 100.0));
            }
            if p.leading != s.leading {
                out.push(Operator::SetLeading(p.leading));
            }
            match &p.font_name {
                Some(name) if !p.same_font(s) => out.push(Operator::SetFont(FontSelection {
                    name: name.clone(),
                    size: p.size,
                    font: p.font.clone(),
                })),
                _ => {}
            }
            if p.render_mode != s.render_mode {
                out.push(Operator::SetRenderMode(p.render_mode));
            }
            if p.rise != s.rise {
                out.push(Operator::SetRise(p.rise));
            }
            *s = p.clone();
        }

        #[cfg(feature = "tracing")]
        if !out.is_empty() {
            tracing::trace!(flags = flags.bits(), emitted = out.len(), "flushed state");
        }
        for op in out {
            self.emit(ctx, op)?;
        }
        Ok(())
    }
}

/// Append the operators turning `sent` into `pending`, then record them as
/// sent.
fn diff_color(pending: &ColorState, sent: &mut ColorState, stroke: bool, out: &mut Vec<Operator>) {
    if let Some(shorthand) = pending.shorthand() {
        if !pending.same_color(sent) {
            out.push(shorthand_op(shorthand, &pending.components, stroke));
        }
        *sent = pending.clone();
        // Downstream now has the device space itself, whatever name the
        // input selected it by.
        if let Some(device) = pending.space.device_name() {
            sent.space_name = device.to_string();
        }
        return;
    }

    // Reselecting a space resets its color, so an initial pending color
    // that differs from what was sent needs the space operator again.
    let reset = pending.is_initial() && !pending.same_color(sent);
    let space_changed =
        !pending.space_name.is_empty() && (pending.space_name != sent.space_name || reset);
    if space_changed {
        let (name, space) = (pending.space_name.clone(), pending.space.clone());
        out.push(if stroke {
            Operator::SetStrokeColorSpace { name, space }
        } else {
            Operator::SetFillColorSpace { name, space }
        });
    }

    if let Some(pattern) = &pending.pattern {
        let unchanged = sent.pattern.as_ref().is_some_and(|p| Rc::ptr_eq(p, pattern))
            && pending.pattern_name == sent.pattern_name
            && pending.components == sent.components;
        if space_changed || !unchanged {
            let (name, pattern, components) = (
                pending.pattern_name.clone(),
                pattern.clone(),
                pending.components.clone(),
            );
            out.push(if stroke {
                Operator::SetStrokePattern { name, pattern, components }
            } else {
                Operator::SetFillPattern { name, pattern, components }
            });
        }
    } else if let Some(shade) = &pending.shade {
        let unchanged = sent.shade.as_ref().is_some_and(|p| Rc::ptr_eq(p, shade))
            && pending.pattern_name == sent.pattern_name;
        if space_changed || !unchanged {
            let (name, pattern) = (pending.pattern_name.clone(), shade.clone());
            out.push(if stroke {
                Operator::SetStrokeShade { name, pattern }
            } else {
                Operator::SetFillShade { name, pattern }
            });
        }
    } else if !pending.components.is_empty()
        && (space_changed || !pending.same_color(sent))
    {
        let components = pending.components.clone();
        out.push(if stroke {
            Operator::SetStrokeColor(components)
        } else {
            Operator::SetFillColor(components)
        });
    }
    *sent = pending.clone();
}

fn shorthand_op(kind: Shorthand, c: &[f64], stroke: bool) -> Operator {
    match (kind, stroke) {
        (Shorthand::Gray, false) => Operator::SetFillGray(c[0]),
        (Shorthand::Gray, true) => Operator::SetStrokeGray(c[0]),
        (Shorthand::Rgb, false) => Operator::SetFillRgb([c[0], c[1], c[2]]),
        (Shorthand::Rgb, true) => Operator::SetStrokeRgb([c[0], c[1], c[2]]),
        (Shorthand::Cmyk, false) => Operator::SetFillCmyk([c[0], c[1], c[2], c[3]]),
        (Shorthand::Cmyk, true) => Operator::SetStrokeCmyk([c[0], c[1], c[2], c[3]]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color_space::ColorSpace;

    fn rgb(c: [f64; 3]) -> ColorState {
        let mut color = ColorState::default();
        color.set_space("DeviceRGB", ColorSpace::DeviceRgb);
        color.set_color(&c);
        color
    }

    #[test]
    fn flag_composition() {
        assert!(FlushFlags::ALL.contains(FlushFlags::STROKE));
        assert!(FlushFlags::STROKE.contains(FlushFlags::CTM));
        assert!(!FlushFlags::FILL.contains(FlushFlags::STROKE_COLOR));
        assert_eq!(FlushFlags::CTM | FlushFlags::FILL_COLOR, FlushFlags::FILL);
        assert!(FlushFlags::NONE.contains(FlushFlags::NONE));
    }

    #[test]
    fn device_color_uses_shorthand() {
        let pending = rgb([1.0, 0.0, 0.0]);
        let mut sent = ColorState::default();
        let mut out = Vec::new();
        diff_color(&pending, &mut sent, false, &mut out);
        assert_eq!(out, vec![Operator::SetFillRgb([1.0, 0.0, 0.0])]);
        out.clear();
        diff_color(&pending, &mut sent, false, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn aliased_device_space_still_uses_shorthand() {
        let mut pending = ColorState::default();
        pending.set_space("CS0", ColorSpace::DeviceCmyk);
        pending.set_color(&[0.0, 0.0, 0.0, 1.0]);
        let mut sent = ColorState::default();
        let mut out = Vec::new();
        diff_color(&pending, &mut sent, true, &mut out);
        assert_eq!(out, vec![Operator::SetStrokeCmyk([0.0, 0.0, 0.0, 1.0])]);
        assert_eq!(sent.space_name, "DeviceCMYK");
    }

    #[test]
    fn reselecting_space_after_shorthand_is_emitted() {
        let mut sent = ColorState::default();
        let mut out = Vec::new();
        diff_color(&rgb([1.0, 0.0, 0.0]), &mut sent, false, &mut out);
        out.clear();

        let mut pending = ColorState::default();
        pending.set_space("DeviceRGB", ColorSpace::DeviceRgb);
        diff_color(&pending, &mut sent, false, &mut out);
        assert_eq!(
            out,
            vec![Operator::SetFillColorSpace {
                name: "DeviceRGB".into(),
                space: ColorSpace::DeviceRgb,
            }]
        );
    }

    #[test]
    fn non_device_space_emits_space_then_components() {
        let mut pending = ColorState::default();
        pending.set_space("CS1", ColorSpace::IccBased { components: 3 });
        pending.set_color(&[0.2, 0.4, 0.6]);
        let mut sent = ColorState::default();
        let mut out = Vec::new();
        diff_color(&pending, &mut sent, false, &mut out);
        assert_eq!(out.iter().map(Operator::keyword).collect::<Vec<_>>(), ["cs", "scn"]);

        pending.set_color(&[0.2, 0.4, 0.7]);
        out.clear();
        diff_color(&pending, &mut sent, false, &mut out);
        assert_eq!(out, vec![Operator::SetFillColor(vec![0.2, 0.4, 0.7])]);
    }

    #[test]
    fn initial_state_emits_nothing() {
        let pending = ColorState::default();
        let mut sent = ColorState::default();
        let mut out = Vec::new();
        diff_color(&pending, &mut sent, false, &mut out);
        assert!(out.is_empty());
    }
}
