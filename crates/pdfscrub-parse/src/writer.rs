//! Serialize operators back into content-stream bytes.

use std::io::Write;

use pdfscrub_core::{Context, Matrix, Result};

use crate::operator::{Operator, TextItem};
use crate::sink::ContentSink;
use crate::tokenizer::{InlineImage, Operand};

/// Sink producing content-stream bytes, one operator per line.
#[derive(Debug, Default, Clone)]
pub struct ContentWriter {
    buf: Vec<u8>,
}

impl ContentWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Append one operator.
    pub fn write_operator(&mut self, op: &Operator) {
        let out = &mut self.buf;
        match op {
            Operator::SetLineWidth(v)
            | Operator::SetMiterLimit(v)
            | Operator::SetFlatness(v)
            | Operator::SetCharSpacing(v)
            | Operator::SetWordSpacing(v)
            | Operator::SetHorizontalScaling(v)
            | Operator::SetLeading(v)
            | Operator::SetRise(v)
            | Operator::SetStrokeGray(v)
            | Operator::SetFillGray(v) => numbers(out, &[*v]),
            Operator::SetLineCap(v) | Operator::SetLineJoin(v) | Operator::SetRenderMode(v) => {
                let _ = write!(out, "{v} ");
            }
            Operator::SetDash { array, phase } => {
                out.push(b'[');
                write_numbers_joined(out, array);
                out.extend_from_slice(b"] ");
                numbers(out, &[*phase]);
            }
            Operator::SetRenderingIntent(name)
            | Operator::SetExtGState(name)
            | Operator::MarkPoint(name)
            | Operator::BeginMarkedContent(name)
            | Operator::PaintShading { name, .. }
            | Operator::PaintXObject { name, .. } => {
                write_name(out, name);
                out.push(b' ');
            }
            Operator::Concat(m) | Operator::SetTextMatrix(m) => matrix(out, m),
            Operator::MoveTo(x, y)
            | Operator::LineTo(x, y)
            | Operator::MoveText(x, y)
            | Operator::MoveTextSetLeading(x, y) => numbers(out, &[*x, *y]),
            Operator::CurveTo(v) => numbers(out, v),
            Operator::CurveToV(v) | Operator::CurveToY(v) | Operator::Rectangle(v) => {
                numbers(out, v)
            }
            Operator::SetStrokeCmyk(v) | Operator::SetFillCmyk(v) => numbers(out, v),
            Operator::SetStrokeRgb(v) | Operator::SetFillRgb(v) => numbers(out, v),
            Operator::SetStrokeColor(v) | Operator::SetFillColor(v) => numbers(out, v),
            Operator::SetStrokePattern {
                name, components, ..
            }
            | Operator::SetFillPattern {
                name, components, ..
            } => {
                numbers(out, components);
                write_name(out, name);
                out.push(b' ');
            }
            Operator::SetStrokeShade { name, .. } | Operator::SetFillShade { name, .. } => {
                write_name(out, name);
                out.push(b' ');
            }
            Operator::SetStrokeColorSpace { name, .. } | Operator::SetFillColorSpace { name, .. } => {
                write_name(out, name);
                out.push(b' ');
            }
            Operator::SetFont(sel) => {
                write_name(out, &sel.name);
                out.push(b' ');
                numbers(out, &[sel.size]);
            }
            Operator::ShowText(text) | Operator::NextLineShowText(text) => {
                write_string(out, text);
                out.push(b' ');
            }
            Operator::NextLineShowTextSpaced {
                word_spacing,
                char_spacing,
                text,
            } => {
                numbers(out, &[*word_spacing, *char_spacing]);
                write_string(out, text);
                out.push(b' ');
            }
            Operator::ShowTextArray(items) => {
                out.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    match item {
                        TextItem::Text(t) => write_string(out, t),
                        TextItem::Adjust(n) => write_number(out, *n),
                    }
                }
                out.extend_from_slice(b"] ");
            }
            Operator::SetCharWidth { wx, wy } => numbers(out, &[*wx, *wy]),
            Operator::SetCacheDevice { wx, wy, bbox } => {
                numbers(out, &[*wx, *wy]);
                numbers(out, bbox);
            }
            Operator::MarkPointProperties { tag, properties }
            | Operator::BeginMarkedContentProperties { tag, properties } => {
                write_name(out, tag);
                out.push(b' ');
                write_operand(out, properties);
                out.push(b' ');
            }
            Operator::InlineImage(image) => {
                write_inline_image(out, image);
                return;
            }
            Operator::Save
            | Operator::Restore
            | Operator::ClosePath
            | Operator::Stroke
            | Operator::CloseStroke
            | Operator::Fill
            | Operator::FillCompat
            | Operator::FillEvenOdd
            | Operator::FillStroke
            | Operator::FillStrokeEvenOdd
            | Operator::CloseFillStroke
            | Operator::CloseFillStrokeEvenOdd
            | Operator::EndPath
            | Operator::Clip
            | Operator::ClipEvenOdd
            | Operator::BeginText
            | Operator::EndText
            | Operator::NextLine
            | Operator::EndMarkedContent
            | Operator::BeginCompat
            | Operator::EndCompat => {}
        }
        out.extend_from_slice(op.keyword().as_bytes());
        out.push(b'\n');
    }
}

impl ContentSink for ContentWriter {
    fn process(&mut self, _ctx: &mut Context, op: Operator) -> Result<()> {
        self.write_operator(&op);
        Ok(())
    }
}

/// Serialize a sequence of operators.
pub fn write_operators<'a>(ops: impl IntoIterator<Item = &'a Operator>) -> Vec<u8> {
    let mut writer = ContentWriter::new();
    for op in ops {
        writer.write_operator(op);
    }
    writer.into_bytes()
}

fn numbers(out: &mut Vec<u8>, values: &[f64]) {
    for v in values {
        write_number(out, *v);
        out.push(b' ');
    }
}

fn write_numbers_joined(out: &mut Vec<u8>, values: &[f64]) {
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push(b' ');
        }
        write_number(out, *v);
    }
}

fn matrix(out: &mut Vec<u8>, m: &Matrix) {
    numbers(out, &m.to_array());
}

/// Shortest plain decimal: integers without a fraction, otherwise up to
/// six fractional digits with trailing zeros removed.
pub fn write_number(out: &mut Vec<u8>, v: f64) {
    if !v.is_finite() {
        out.push(b'0');
        return;
    }
    let rounded = (v * 1e6).round() / 1e6;
    if rounded == 0.0 {
        out.push(b'0');
    } else if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        let _ = write!(out, "{}", rounded as i64);
    } else {
        let text = format!("{rounded:.6}");
        let text = text.trim_end_matches('0').trim_end_matches('.');
        out.extend_from_slice(text.as_bytes());
    }
}

fn is_regular_name_byte(b: u8) -> bool {
    (b'!'..=b'~').contains(&b)
        && !matches!(
            b,
            b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
        )
}

pub fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for &b in name.as_bytes() {
        if is_regular_name_byte(b) {
            out.push(b);
        } else {
            let _ = write!(out, "#{b:02X}");
        }
    }
}

/// Literal string when the bytes are mostly printable, hex otherwise.
pub fn write_string(out: &mut Vec<u8>, bytes: &[u8]) {
    let binary = bytes
        .iter()
        .filter(|b| !(b.is_ascii_graphic() || **b == b' '))
        .count();
    if binary * 4 > bytes.len() {
        out.push(b'<');
        for b in bytes {
            let _ = write!(out, "{b:02X}");
        }
        out.push(b'>');
        return;
    }
    out.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0C => out.extend_from_slice(b"\\f"),
            b' ' => out.push(b),
            _ if b.is_ascii_graphic() => out.push(b),
            _ => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
    }
    out.push(b')');
}

pub fn write_operand(out: &mut Vec<u8>, operand: &Operand) {
    match operand {
        Operand::Integer(i) => {
            let _ = write!(out, "{i}");
        }
        Operand::Real(r) => write_number(out, *r),
        Operand::Name(n) => write_name(out, n),
        Operand::LiteralString(s) => write_string(out, s),
        Operand::HexString(s) => {
            out.push(b'<');
            for b in s {
                let _ = write!(out, "{b:02X}");
            }
            out.push(b'>');
        }
        Operand::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_operand(out, item);
            }
            out.push(b']');
        }
        Operand::Boolean(v) => {
            let _ = write!(out, "{v}");
        }
        Operand::Null => out.extend_from_slice(b"null"),
        Operand::Dictionary(entries) => {
            out.extend_from_slice(b"<<");
            for (key, value) in entries {
                write_name(out, key);
                out.push(b' ');
                write_operand(out, value);
                out.push(b' ');
            }
            out.extend_from_slice(b">>");
        }
    }
}

fn write_inline_image(out: &mut Vec<u8>, image: &InlineImage) {
    out.extend_from_slice(b"BI\n");
    for (key, value) in &image.dict {
        write_name(out, key);
        out.push(b' ');
        write_operand(out, value);
        out.push(b'\n');
    }
    out.extend_from_slice(b"ID ");
    out.extend_from_slice(&image.data);
    out.extend_from_slice(b"\nEI\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn text(op: Operator) -> String {
        String::from_utf8(write_operators([&op])).unwrap()
    }

    #[test]
    fn numbers_are_short() {
        let mut out = Vec::new();
        for v in [1.0, 0.5, -0.25, 100.0, 1.0 / 3.0, -0.0, 1e-9] {
            write_number(&mut out, v);
            out.push(b' ');
        }
        assert_eq!(String::from_utf8(out).unwrap(), "1 0.5 -0.25 100 0.333333 0 0 ");
    }

    #[test]
    fn simple_operators() {
        assert_eq!(text(Operator::Save), "q\n");
        assert_eq!(text(Operator::SetFillRgb([1.0, 0.0, 0.0])), "1 0 0 rg\n");
        assert_eq!(text(Operator::Rectangle([100.0, 100.0, 200.0, 200.0])), "100 100 200 200 re\n");
        assert_eq!(text(Operator::SetLineCap(1)), "1 J\n");
        assert_eq!(
            text(Operator::SetDash { array: vec![3.0, 1.0], phase: 0.0 }),
            "[3 1] 0 d\n"
        );
    }

    #[test]
    fn names_are_escaped() {
        assert_eq!(text(Operator::SetExtGState("GS 1".into())), "/GS#201 gs\n");
    }

    #[test]
    fn strings_are_escaped() {
        assert_eq!(text(Operator::ShowText(b"a(b)\\".to_vec())), "(a\\(b\\)\\\\) Tj\n");
        assert_eq!(text(Operator::ShowText(vec![0, 1, 2, 65])), "<00010241> Tj\n");
    }

    #[test]
    fn text_array() {
        let op = Operator::ShowTextArray(vec![
            TextItem::Text(b"A".to_vec()),
            TextItem::Adjust(-250.0),
            TextItem::Text(b"C".to_vec()),
        ]);
        assert_eq!(text(op), "[(A) -250 (C)] TJ\n");
    }

    #[test]
    fn marked_content_properties() {
        let op = Operator::BeginMarkedContentProperties {
            tag: "Span".into(),
            properties: Operand::Dictionary(vec![("MCID".into(), Operand::Integer(3))]),
        };
        assert_eq!(text(op), "/Span <</MCID 3 >> BDC\n");
    }

    #[test]
    fn output_tokenizes_back() {
        let ops = [
            Operator::Save,
            Operator::Concat(Matrix::new(2.0, 0.0, 0.0, 2.0, 10.0, 20.5)),
            Operator::ShowText(b"Hi (there)".to_vec()),
            Operator::Restore,
        ];
        let bytes = write_operators(ops.iter());
        let raw = tokenize(&bytes).unwrap();
        let keywords: Vec<&str> = raw.iter().map(|r| r.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["q", "cm", "Tj", "Q"]);
        assert_eq!(raw[2].operands[0].as_bytes(), Some(&b"Hi (there)"[..]));
    }

    #[test]
    fn inline_image_round_trip() {
        let image = InlineImage {
            dict: vec![
                ("W".into(), Operand::Integer(1)),
                ("H".into(), Operand::Integer(1)),
                ("BPC".into(), Operand::Integer(8)),
                ("CS".into(), Operand::Name("G".into())),
            ],
            data: vec![0x7F],
        };
        let bytes = write_operators([&Operator::InlineImage(image.clone())]);
        let raw = tokenize(&bytes).unwrap();
        assert_eq!(raw.len(), 1);
        assert_eq!(raw[0].inline_image.as_ref(), Some(&image));
    }
}
