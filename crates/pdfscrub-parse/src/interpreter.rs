//! Content stream interpreter.
//!
//! Tokenizes a content stream, resolves each raw operator's operands
//! against the page resources into a typed [`Operator`], and feeds the
//! result to a [`ContentSink`]. Fonts, patterns and shadings are cached per
//! resource name for the lifetime of the interpreter.
//!
//! Operators with missing or mistyped operands are skipped with a warning.
//! Unknown operators are skipped silently inside a `BX`/`EX` section and
//! with a warning outside one.

use std::collections::HashMap;
use std::rc::Rc;

use lopdf::{Dictionary, Document, Object};
use pdfscrub_core::{Context, Matrix, Result};

use crate::color_space::{
    ColorSpace, Pattern, PatternKind, Shading, resolve_color_space_name, resolve_pattern,
    resolve_shading,
};
use crate::font::{FontLoader, FontRef, LopdfFontLoader, default_font};
use crate::operator::{FontSelection, Operator, TextItem, XObjectKind};
use crate::sink::ContentSink;
use crate::tokenizer::{Operand, RawOperator, tokenize};

/// Unwrap an operand accessor or report malformed operands.
macro_rules! try_op {
    ($e:expr) => {
        match $e {
            Some(v) => v,
            None => return Converted::Malformed,
        }
    };
}

/// Resolving front end for one resource scope.
pub struct Interpreter<'a, L = LopdfFontLoader<'a>> {
    doc: Option<&'a Document>,
    resources: &'a Dictionary,
    loader: L,
    fonts: HashMap<String, Option<FontRef>>,
    patterns: HashMap<String, Option<Rc<Pattern>>>,
    shadings: HashMap<String, Option<Rc<Shading>>>,
    compat_depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(doc: Option<&'a Document>, resources: &'a Dictionary) -> Self {
        Self::with_loader(doc, resources, LopdfFontLoader::new(doc))
    }
}

impl<'a, L: FontLoader> Interpreter<'a, L> {
    pub fn with_loader(doc: Option<&'a Document>, resources: &'a Dictionary, loader: L) -> Self {
        Self {
            doc,
            resources,
            loader,
            fonts: HashMap::new(),
            patterns: HashMap::new(),
            shadings: HashMap::new(),
            compat_depth: 0,
        }
    }

    /// Interpret a whole content stream into `sink`, then finish it.
    ///
    /// # Errors
    ///
    /// Tokenizer failures (`Syntax`) and any error raised by the sink.
    pub fn run<S: ContentSink + ?Sized>(
        &mut self,
        ctx: &mut Context,
        content: &[u8],
        sink: &mut S,
    ) -> Result<()> {
        let raw_ops = tokenize(content)?;
        for raw in raw_ops {
            if let Some(op) = self.resolve(ctx, raw) {
                sink.process(ctx, op)?;
            }
        }
        sink.finish(ctx)
    }

    /// Resolve one raw operator. `None` means it was skipped.
    pub fn resolve(&mut self, ctx: &mut Context, raw: RawOperator) -> Option<Operator> {
        let keyword = raw.keyword.clone();
        match self.convert(ctx, raw) {
            Converted::Op(op) => Some(op),
            Converted::Skip => None,
            Converted::Malformed => {
                ctx.warn(format!("malformed operands for '{keyword}'"));
                None
            }
            Converted::Unknown => {
                if self.compat_depth == 0 {
                    ctx.warn(format!("unknown operator '{keyword}'"));
                }
                None
            }
        }
    }

    fn convert(&mut self, ctx: &mut Context, raw: RawOperator) -> Converted {
        let ops = &raw.operands;
        let op = match raw.keyword.as_str() {
            // General graphics state.
            "w" => Operator::SetLineWidth(try_op!(num(ops))),
            "J" => Operator::SetLineCap(try_op!(int(ops))),
            "j" => Operator::SetLineJoin(try_op!(int(ops))),
            "M" => Operator::SetMiterLimit(try_op!(num(ops))),
            "d" => {
                let [array, phase] = try_op!(last::<2>(ops));
                let Operand::Array(items) = array else {
                    return Converted::Malformed;
                };
                let array: Option<Vec<f64>> = items.iter().map(Operand::as_number).collect();
                Operator::SetDash {
                    array: try_op!(array),
                    phase: try_op!(phase.as_number()),
                }
            }
            "ri" => Operator::SetRenderingIntent(try_op!(name(ops))),
            "i" => Operator::SetFlatness(try_op!(num(ops))),
            "gs" => Operator::SetExtGState(try_op!(name(ops))),

            // Special graphics state.
            "q" => Operator::Save,
            "Q" => Operator::Restore,
            "cm" => {
                let [a, b, c, d, e, f] = try_op!(nums::<6>(ops));
                Operator::Concat(Matrix::new(a, b, c, d, e, f))
            }

            // Path construction.
            "m" => {
                let [x, y] = try_op!(nums::<2>(ops));
                Operator::MoveTo(x, y)
            }
            "l" => {
                let [x, y] = try_op!(nums::<2>(ops));
                Operator::LineTo(x, y)
            }
            "c" => Operator::CurveTo(try_op!(nums::<6>(ops))),
            "v" => Operator::CurveToV(try_op!(nums::<4>(ops))),
            "y" => Operator::CurveToY(try_op!(nums::<4>(ops))),
            "h" => Operator::ClosePath,
            "re" => Operator::Rectangle(try_op!(nums::<4>(ops))),

            // Path painting and clipping.
            "S" => Operator::Stroke,
            "s" => Operator::CloseStroke,
            "f" => Operator::Fill,
            "F" => Operator::FillCompat,
            "f*" => Operator::FillEvenOdd,
            "B" => Operator::FillStroke,
            "B*" => Operator::FillStrokeEvenOdd,
            "b" => Operator::CloseFillStroke,
            "b*" => Operator::CloseFillStrokeEvenOdd,
            "n" => Operator::EndPath,
            "W" => Operator::Clip,
            "W*" => Operator::ClipEvenOdd,

            // Text.
            "BT" => Operator::BeginText,
            "ET" => Operator::EndText,
            "Tc" => Operator::SetCharSpacing(try_op!(num(ops))),
            "Tw" => Operator::SetWordSpacing(try_op!(num(ops))),
            "Tz" => Operator::SetHorizontalScaling(try_op!(num(ops))),
            "TL" => Operator::SetLeading(try_op!(num(ops))),
            "Tf" => {
                let [font, size] = try_op!(last::<2>(ops));
                let name = try_op!(font.as_name()).to_string();
                let size = try_op!(size.as_number());
                let font = self.font(ctx, &name);
                Operator::SetFont(FontSelection { name, size, font })
            }
            "Tr" => Operator::SetRenderMode(try_op!(int(ops))),
            "Ts" => Operator::SetRise(try_op!(num(ops))),
            "Td" => {
                let [x, y] = try_op!(nums::<2>(ops));
                Operator::MoveText(x, y)
            }
            "TD" => {
                let [x, y] = try_op!(nums::<2>(ops));
                Operator::MoveTextSetLeading(x, y)
            }
            "Tm" => {
                let [a, b, c, d, e, f] = try_op!(nums::<6>(ops));
                Operator::SetTextMatrix(Matrix::new(a, b, c, d, e, f))
            }
            "T*" => Operator::NextLine,
            "Tj" => Operator::ShowText(try_op!(string(ops))),
            "'" => Operator::NextLineShowText(try_op!(string(ops))),
            "\"" => {
                let [aw, ac, text] = try_op!(last::<3>(ops));
                Operator::NextLineShowTextSpaced {
                    word_spacing: try_op!(aw.as_number()),
                    char_spacing: try_op!(ac.as_number()),
                    text: try_op!(text.as_bytes()).to_vec(),
                }
            }
            "TJ" => {
                let Some(Operand::Array(items)) = ops.last() else {
                    return Converted::Malformed;
                };
                let items = items
                    .iter()
                    .filter_map(|item| match item {
                        Operand::LiteralString(s) | Operand::HexString(s) => {
                            Some(TextItem::Text(s.clone()))
                        }
                        other => other.as_number().map(TextItem::Adjust),
                    })
                    .collect();
                Operator::ShowTextArray(items)
            }

            // Type 3 glyph metrics.
            "d0" => {
                let [wx, wy] = try_op!(nums::<2>(ops));
                Operator::SetCharWidth { wx, wy }
            }
            "d1" => {
                let [wx, wy, x0, y0, x1, y1] = try_op!(nums::<6>(ops));
                Operator::SetCacheDevice {
                    wx,
                    wy,
                    bbox: [x0, y0, x1, y1],
                }
            }

            // Color.
            "CS" | "cs" => {
                let name = try_op!(name(ops));
                let space = self.color_space(ctx, &name);
                if raw.keyword == "CS" {
                    Operator::SetStrokeColorSpace { name, space }
                } else {
                    Operator::SetFillColorSpace { name, space }
                }
            }
            "SC" | "SCN" | "sc" | "scn" => {
                let stroke = raw.keyword.starts_with('S');
                return self.color_operator(ctx, ops, stroke);
            }
            "G" => Operator::SetStrokeGray(try_op!(num(ops))),
            "g" => Operator::SetFillGray(try_op!(num(ops))),
            "RG" => Operator::SetStrokeRgb(try_op!(nums::<3>(ops))),
            "rg" => Operator::SetFillRgb(try_op!(nums::<3>(ops))),
            "K" => Operator::SetStrokeCmyk(try_op!(nums::<4>(ops))),
            "k" => Operator::SetFillCmyk(try_op!(nums::<4>(ops))),

            // Shadings, images, XObjects.
            "sh" => {
                let name = try_op!(name(ops));
                let Some(shading) = self.shading(&name) else {
                    ctx.warn(format!("cannot find shading resource '{name}'"));
                    return Converted::Skip;
                };
                Operator::PaintShading { name, shading }
            }
            "BI" => match raw.inline_image {
                Some(image) => Operator::InlineImage(image),
                None => return Converted::Malformed,
            },
            "Do" => {
                let name = try_op!(name(ops));
                let kind = self.xobject_kind(&name);
                if kind == XObjectKind::Unknown {
                    ctx.warn(format!("cannot find XObject resource '{name}'"));
                    return Converted::Skip;
                }
                Operator::PaintXObject { name, kind }
            }

            // Marked content.
            "MP" => Operator::MarkPoint(try_op!(name(ops))),
            "BMC" => Operator::BeginMarkedContent(try_op!(name(ops))),
            "DP" | "BDC" => {
                let [tag, properties] = try_op!(last::<2>(ops));
                let tag = try_op!(tag.as_name()).to_string();
                let properties = properties.clone();
                if raw.keyword == "DP" {
                    Operator::MarkPointProperties { tag, properties }
                } else {
                    Operator::BeginMarkedContentProperties { tag, properties }
                }
            }
            "EMC" => Operator::EndMarkedContent,

            // Compatibility.
            "BX" => {
                self.compat_depth += 1;
                Operator::BeginCompat
            }
            "EX" => {
                self.compat_depth = self.compat_depth.saturating_sub(1);
                Operator::EndCompat
            }

            _ => return Converted::Unknown,
        };
        Converted::Op(op)
    }

    fn color_operator(&mut self, ctx: &mut Context, ops: &[Operand], stroke: bool) -> Converted {
        if let Some(Operand::Name(name)) = ops.last() {
            let components: Option<Vec<f64>> =
                ops[..ops.len() - 1].iter().map(Operand::as_number).collect();
            let components = try_op!(components);
            let Some(pattern) = self.pattern(name) else {
                ctx.warn(format!("cannot find pattern resource '{name}'"));
                return Converted::Skip;
            };
            let name = name.clone();
            return Converted::Op(match (pattern.kind, stroke) {
                (PatternKind::Tiling, true) => Operator::SetStrokePattern {
                    name,
                    pattern,
                    components,
                },
                (PatternKind::Tiling, false) => Operator::SetFillPattern {
                    name,
                    pattern,
                    components,
                },
                (PatternKind::Shading, true) => Operator::SetStrokeShade { name, pattern },
                (PatternKind::Shading, false) => Operator::SetFillShade { name, pattern },
            });
        }
        let components: Option<Vec<f64>> = ops.iter().map(Operand::as_number).collect();
        match components {
            Some(c) if !c.is_empty() => Converted::Op(if stroke {
                Operator::SetStrokeColor(c)
            } else {
                Operator::SetFillColor(c)
            }),
            _ => Converted::Malformed,
        }
    }

    fn font(&mut self, ctx: &mut Context, name: &str) -> Option<FontRef> {
        if let Some(cached) = self.fonts.get(name) {
            return cached.clone();
        }
        let font = match self.font_dict(name) {
            None => {
                ctx.warn(format!("cannot find font resource '{name}'"));
                None
            }
            Some(dict) => match self.loader.load(name, dict) {
                Ok(font) => Some(font),
                Err(err) => {
                    ctx.warn(format!("cannot load font: {err}"));
                    Some(default_font())
                }
            },
        };
        self.fonts.insert(name.to_string(), font.clone());
        font
    }

    fn font_dict(&self, name: &str) -> Option<&'a Dictionary> {
        let doc = self.doc;
        let fonts = resolve(self.resources.get(b"Font").ok()?, doc).as_dict().ok()?;
        resolve(fonts.get(name.as_bytes()).ok()?, doc).as_dict().ok()
    }

    fn color_space(&mut self, ctx: &mut Context, name: &str) -> ColorSpace {
        match resolve_color_space_name(name, self.doc, self.resources) {
            Some(space) => space,
            None => {
                ctx.warn(format!("cannot find color space resource '{name}'"));
                ColorSpace::Unknown
            }
        }
    }

    fn pattern(&mut self, name: &str) -> Option<Rc<Pattern>> {
        let (doc, resources) = (self.doc, self.resources);
        self.patterns
            .entry(name.to_string())
            .or_insert_with(|| resolve_pattern(name, doc, resources))
            .clone()
    }

    fn shading(&mut self, name: &str) -> Option<Rc<Shading>> {
        let (doc, resources) = (self.doc, self.resources);
        self.shadings
            .entry(name.to_string())
            .or_insert_with(|| resolve_shading(name, doc, resources))
            .clone()
    }

    fn xobject_kind(&self, name: &str) -> XObjectKind {
        let doc = self.doc;
        let entry = self
            .resources
            .get(b"XObject")
            .ok()
            .map(|o| resolve(o, doc))
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| d.get(name.as_bytes()).ok())
            .map(|o| resolve(o, doc));
        let dict = match entry {
            Some(Object::Stream(s)) => &s.dict,
            Some(Object::Dictionary(d)) => d,
            // An unresolvable reference still names something.
            Some(Object::Reference(_)) => return XObjectKind::Form,
            _ => return XObjectKind::Unknown,
        };
        match dict.get(b"Subtype").and_then(Object::as_name) {
            Ok(b"Image") => XObjectKind::Image,
            _ => XObjectKind::Form,
        }
    }
}

enum Converted {
    Op(Operator),
    /// Skipped with a warning already issued.
    Skip,
    Malformed,
    Unknown,
}

fn resolve<'d>(obj: &'d Object, doc: Option<&'d Document>) -> &'d Object {
    match (obj, doc) {
        (Object::Reference(id), Some(doc)) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// The last `N` operands. Extra leading operands are ignored.
fn last<const N: usize>(ops: &[Operand]) -> Option<&[Operand; N]> {
    ops.len()
        .checked_sub(N)
        .and_then(|start| ops[start..].try_into().ok())
}

fn nums<const N: usize>(ops: &[Operand]) -> Option<[f64; N]> {
    let tail = last::<N>(ops)?;
    let mut out = [0.0; N];
    for (slot, op) in out.iter_mut().zip(tail) {
        *slot = op.as_number()?;
    }
    Some(out)
}

fn num(ops: &[Operand]) -> Option<f64> {
    ops.last()?.as_number()
}

fn int(ops: &[Operand]) -> Option<i64> {
    match ops.last()? {
        Operand::Integer(i) => Some(*i),
        Operand::Real(r) => Some(*r as i64),
        _ => None,
    }
}

fn name(ops: &[Operand]) -> Option<String> {
    ops.last()?.as_name().map(str::to_string)
}

fn string(ops: &[Operand]) -> Option<Vec<u8>> {
    ops.last()?.as_bytes().map(<[u8]>::to_vec)
}
