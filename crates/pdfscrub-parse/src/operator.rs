//! The closed set of content-stream operators, with resolved operands.
//!
//! Resource names stay attached to the values they resolved to so a sink
//! can re-emit the operator verbatim.

use std::rc::Rc;

use pdfscrub_core::Matrix;

use crate::color_space::{ColorSpace, Pattern, Shading};
use crate::font::FontRef;
use crate::tokenizer::{InlineImage, Operand};

/// One element of a `TJ` array.
#[derive(Debug, Clone, PartialEq)]
pub enum TextItem {
    /// A string to show.
    Text(Vec<u8>),
    /// A positioning adjustment in thousandths of text space, subtracted
    /// from the current position along the writing direction.
    Adjust(f64),
}

/// What a `Do` operand names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XObjectKind {
    Image,
    Form,
    /// Missing from the resources or without a recognizable `/Subtype`.
    Unknown,
}

/// A font selection as carried by `Tf`.
#[derive(Debug, Clone)]
pub struct FontSelection {
    /// Resource name the stream used.
    pub name: String,
    pub size: f64,
    /// `None` when the name has no `/Font` resource entry.
    pub font: Option<FontRef>,
}

impl PartialEq for FontSelection {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.size == other.size
            && match (&self.font, &other.font) {
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

/// A content-stream operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    // General graphics state.
    /// `w`
    SetLineWidth(f64),
    /// `J`
    SetLineCap(i64),
    /// `j`
    SetLineJoin(i64),
    /// `M`
    SetMiterLimit(f64),
    /// `d`
    SetDash { array: Vec<f64>, phase: f64 },
    /// `ri`
    SetRenderingIntent(String),
    /// `i`
    SetFlatness(f64),
    /// `gs`
    SetExtGState(String),

    // Special graphics state.
    /// `q`
    Save,
    /// `Q`
    Restore,
    /// `cm`
    Concat(Matrix),

    // Path construction.
    /// `m`
    MoveTo(f64, f64),
    /// `l`
    LineTo(f64, f64),
    /// `c`
    CurveTo([f64; 6]),
    /// `v`: first control point is the current point.
    CurveToV([f64; 4]),
    /// `y`: second control point is the end point.
    CurveToY([f64; 4]),
    /// `h`
    ClosePath,
    /// `re`
    Rectangle([f64; 4]),

    // Path painting.
    /// `S`
    Stroke,
    /// `s`
    CloseStroke,
    /// `f`
    Fill,
    /// `F`
    FillCompat,
    /// `f*`
    FillEvenOdd,
    /// `B`
    FillStroke,
    /// `B*`
    FillStrokeEvenOdd,
    /// `b`
    CloseFillStroke,
    /// `b*`
    CloseFillStrokeEvenOdd,
    /// `n`
    EndPath,

    // Clipping.
    /// `W`
    Clip,
    /// `W*`
    ClipEvenOdd,

    // Text objects.
    /// `BT`
    BeginText,
    /// `ET`
    EndText,

    // Text state.
    /// `Tc`
    SetCharSpacing(f64),
    /// `Tw`
    SetWordSpacing(f64),
    /// `Tz`, in percent.
    SetHorizontalScaling(f64),
    /// `TL`
    SetLeading(f64),
    /// `Tf`
    SetFont(FontSelection),
    /// `Tr`
    SetRenderMode(i64),
    /// `Ts`
    SetRise(f64),

    // Text positioning.
    /// `Td`
    MoveText(f64, f64),
    /// `TD`
    MoveTextSetLeading(f64, f64),
    /// `Tm`
    SetTextMatrix(Matrix),
    /// `T*`
    NextLine,

    // Text showing.
    /// `Tj`
    ShowText(Vec<u8>),
    /// `TJ`
    ShowTextArray(Vec<TextItem>),
    /// `'`
    NextLineShowText(Vec<u8>),
    /// `"`
    NextLineShowTextSpaced {
        word_spacing: f64,
        char_spacing: f64,
        text: Vec<u8>,
    },

    // Type 3 glyph metrics.
    /// `d0`
    SetCharWidth { wx: f64, wy: f64 },
    /// `d1`
    SetCacheDevice { wx: f64, wy: f64, bbox: [f64; 4] },

    // Color.
    /// `CS`
    SetStrokeColorSpace { name: String, space: ColorSpace },
    /// `cs`
    SetFillColorSpace { name: String, space: ColorSpace },
    /// `SC`/`SCN` with numeric operands.
    SetStrokeColor(Vec<f64>),
    /// `sc`/`scn` with numeric operands.
    SetFillColor(Vec<f64>),
    /// `SCN` naming a tiling pattern.
    SetStrokePattern {
        name: String,
        pattern: Rc<Pattern>,
        components: Vec<f64>,
    },
    /// `scn` naming a tiling pattern.
    SetFillPattern {
        name: String,
        pattern: Rc<Pattern>,
        components: Vec<f64>,
    },
    /// `SCN` naming a shading pattern.
    SetStrokeShade { name: String, pattern: Rc<Pattern> },
    /// `scn` naming a shading pattern.
    SetFillShade { name: String, pattern: Rc<Pattern> },
    /// `G`
    SetStrokeGray(f64),
    /// `g`
    SetFillGray(f64),
    /// `RG`
    SetStrokeRgb([f64; 3]),
    /// `rg`
    SetFillRgb([f64; 3]),
    /// `K`
    SetStrokeCmyk([f64; 4]),
    /// `k`
    SetFillCmyk([f64; 4]),

    // Shadings, images and XObjects.
    /// `sh`
    PaintShading { name: String, shading: Rc<Shading> },
    /// `BI … ID … EI`
    InlineImage(InlineImage),
    /// `Do`
    PaintXObject { name: String, kind: XObjectKind },

    // Marked content.
    /// `MP`
    MarkPoint(String),
    /// `DP`
    MarkPointProperties { tag: String, properties: Operand },
    /// `BMC`
    BeginMarkedContent(String),
    /// `BDC`
    BeginMarkedContentProperties { tag: String, properties: Operand },
    /// `EMC`
    EndMarkedContent,

    // Compatibility.
    /// `BX`
    BeginCompat,
    /// `EX`
    EndCompat,
}

impl Operator {
    /// The keyword this operator is written with.
    pub fn keyword(&self) -> &'static str {
        match self {
            Operator::SetLineWidth(_) => "w",
            Operator::SetLineCap(_) => "J",
            Operator::SetLineJoin(_) => "j",
            Operator::SetMiterLimit(_) => "M",
            Operator::SetDash { .. } => "d",
            Operator::SetRenderingIntent(_) => "ri",
            Operator::SetFlatness(_) => "i",
            Operator::SetExtGState(_) => "gs",
            Operator::Save => "q",
            Operator::Restore => "Q",
            Operator::Concat(_) => "cm",
            Operator::MoveTo(..) => "m",
            Operator::LineTo(..) => "l",
            Operator::CurveTo(_) => "c",
            Operator::CurveToV(_) => "v",
            Operator::CurveToY(_) => "y",
            Operator::ClosePath => "h",
            Operator::Rectangle(_) => "re",
            Operator::Stroke => "S",
            Operator::CloseStroke => "s",
            Operator::Fill => "f",
            Operator::FillCompat => "F",
            Operator::FillEvenOdd => "f*",
            Operator::FillStroke => "B",
            Operator::FillStrokeEvenOdd => "B*",
            Operator::CloseFillStroke => "b",
            Operator::CloseFillStrokeEvenOdd => "b*",
            Operator::EndPath => "n",
            Operator::Clip => "W",
            Operator::ClipEvenOdd => "W*",
            Operator::BeginText => "BT",
            Operator::EndText => "ET",
            Operator::SetCharSpacing(_) => "Tc",
            Operator::SetWordSpacing(_) => "Tw",
            Operator::SetHorizontalScaling(_) => "Tz",
            Operator::SetLeading(_) => "TL",
            Operator::SetFont(_) => "Tf",
            Operator::SetRenderMode(_) => "Tr",
            Operator::SetRise(_) => "Ts",
            Operator::MoveText(..) => "Td",
            Operator::MoveTextSetLeading(..) => "TD",
            Operator::SetTextMatrix(_) => "Tm",
            Operator::NextLine => "T*",
            Operator::ShowText(_) => "Tj",
            Operator::ShowTextArray(_) => "TJ",
            Operator::NextLineShowText(_) => "'",
            Operator::NextLineShowTextSpaced { .. } => "\"",
            Operator::SetCharWidth { .. } => "d0",
            Operator::SetCacheDevice { .. } => "d1",
            Operator::SetStrokeColorSpace { .. } => "CS",
            Operator::SetFillColorSpace { .. } => "cs",
            Operator::SetStrokeColor(_)
            | Operator::SetStrokePattern { .. }
            | Operator::SetStrokeShade { .. } => "SCN",
            Operator::SetFillColor(_)
            | Operator::SetFillPattern { .. }
            | Operator::SetFillShade { .. } => "scn",
            Operator::SetStrokeGray(_) => "G",
            Operator::SetFillGray(_) => "g",
            Operator::SetStrokeRgb(_) => "RG",
            Operator::SetFillRgb(_) => "rg",
            Operator::SetStrokeCmyk(_) => "K",
            Operator::SetFillCmyk(_) => "k",
            Operator::PaintShading { .. } => "sh",
            Operator::InlineImage(_) => "BI",
            Operator::PaintXObject { .. } => "Do",
            Operator::MarkPoint(_) => "MP",
            Operator::MarkPointProperties { .. } => "DP",
            Operator::BeginMarkedContent(_) => "BMC",
            Operator::BeginMarkedContentProperties { .. } => "BDC",
            Operator::EndMarkedContent => "EMC",
            Operator::BeginCompat => "BX",
            Operator::EndCompat => "EX",
        }
    }

    /// Path construction and clipping operators, which must stay between
    /// the start of a path and its painting operator.
    pub fn is_path_construction(&self) -> bool {
        matches!(
            self,
            Operator::MoveTo(..)
                | Operator::LineTo(..)
                | Operator::CurveTo(_)
                | Operator::CurveToV(_)
                | Operator::CurveToY(_)
                | Operator::ClosePath
                | Operator::Rectangle(_)
                | Operator::Clip
                | Operator::ClipEvenOdd
        )
    }
}
