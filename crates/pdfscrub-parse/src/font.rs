//! Font descriptors: the metrics and code mappings the text filter needs.
//!
//! A [`FontDescriptor`] splits shown strings into character codes, maps
//! codes to CIDs, reports advances and glyph boxes, and offers Unicode for
//! each glyph. Descriptors are shared as [`FontRef`] (`Rc<dyn …>`) between
//! the interpreter's font cache and every graphics-state frame that selects
//! them.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use lopdf::{Dictionary, Document, Object};
use pdfscrub_core::{Matrix, Rect};

use crate::encoding::SimpleEncoding;
use crate::error::BackendError;
use crate::standard_fonts::{self, StandardFontMetrics};
use crate::to_unicode::ToUnicodeMap;

/// Direction in which glyphs advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritingMode {
    #[default]
    Horizontal,
    Vertical,
}

/// Vertical-mode metrics for one glyph, in glyph units (1/1000 em).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalMetrics {
    /// Position vector from the horizontal origin to the vertical origin.
    pub vx: f64,
    pub vy: f64,
    /// Vertical advance; negative moves down the page.
    pub w1: f64,
}

/// Everything the filter asks of a font.
pub trait FontDescriptor: fmt::Debug {
    /// `/BaseFont`, for diagnostics.
    fn base_font(&self) -> &str;

    fn writing_mode(&self) -> WritingMode {
        WritingMode::Horizontal
    }

    /// Split the next character code off `bytes` (non-empty).
    ///
    /// Returns the code and the number of bytes it used, always at least 1.
    fn decode(&self, bytes: &[u8]) -> (u32, usize);

    /// CID for a character code, `None` when the code cannot be encoded.
    fn lookup_cid(&self, code: u32) -> Option<u32>;

    /// `/ToUnicode` entry for a character code.
    fn to_unicode(&self, code: u32) -> Option<&[char]>;

    /// Built-in Unicode for a CID, used when `/ToUnicode` has nothing.
    fn cid_to_ucs(&self, cid: u32) -> Option<char>;

    /// Horizontal advance in glyph units.
    fn advance_width(&self, cid: u32) -> f64;

    fn vertical_metrics(&self, cid: u32) -> VerticalMetrics {
        VerticalMetrics {
            vx: self.advance_width(cid) / 2.0,
            vy: 880.0,
            w1: -1000.0,
        }
    }

    /// Glyph bounding box in glyph units.
    fn glyph_bbox(&self, cid: u32) -> Rect;
}

/// Shared handle to a loaded font.
pub type FontRef = Rc<dyn FontDescriptor>;

/// Loads fonts named in a resource dictionary.
pub trait FontLoader {
    /// Build a descriptor from a font dictionary.
    fn load(&mut self, name: &str, dict: &Dictionary) -> Result<FontRef, BackendError>;
}

/// [`FontLoader`] reading font dictionaries through a lopdf document.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfFontLoader<'a> {
    doc: Option<&'a Document>,
}

impl<'a> LopdfFontLoader<'a> {
    pub fn new(doc: Option<&'a Document>) -> Self {
        Self { doc }
    }
}

impl FontLoader for LopdfFontLoader<'_> {
    fn load(&mut self, name: &str, dict: &Dictionary) -> Result<FontRef, BackendError> {
        load_font(self.doc, dict).map_err(|e| match e {
            BackendError::Font(msg) => BackendError::Font(format!("{name}: {msg}")),
            other => other,
        })
    }
}

/// Build a descriptor from a font dictionary.
///
/// # Errors
///
/// Returns [`BackendError::Font`] for a `/Type0` font without a usable
/// descendant and for malformed `/ToUnicode` data.
pub fn load_font(doc: Option<&Document>, dict: &Dictionary) -> Result<FontRef, BackendError> {
    let subtype = dict.get(b"Subtype").and_then(Object::as_name).unwrap_or(b"Type1");
    if subtype == b"Type0" {
        Ok(Rc::new(Type0Font::from_dict(doc, dict)?))
    } else {
        Ok(Rc::new(SimpleFont::from_dict(doc, dict)?))
    }
}

/// Font used when a font resource cannot be loaded at all.
pub fn default_font() -> FontRef {
    Rc::new(SimpleFont::standard(standard_fonts::fallback()))
}

fn resolve<'a>(obj: &'a Object, doc: Option<&'a Document>) -> &'a Object {
    match (obj, doc) {
        (Object::Reference(id), Some(doc)) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

fn get<'a>(dict: &'a Dictionary, key: &[u8], doc: Option<&'a Document>) -> Option<&'a Object> {
    dict.get(key).ok().map(|o| resolve(o, doc))
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(f64::from(*r)),
        _ => None,
    }
}

fn rect_from_array(obj: Option<&Object>) -> Option<Rect> {
    let arr = obj?.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let v: Vec<f64> = arr.iter().filter_map(number).collect();
    (v.len() == 4).then(|| {
        Rect::new(v[0].min(v[2]), v[1].min(v[3]), v[0].max(v[2]), v[1].max(v[3]))
    })
}

fn load_to_unicode(
    dict: &Dictionary,
    doc: Option<&Document>,
) -> Result<Option<ToUnicodeMap>, BackendError> {
    let Some(Object::Stream(stream)) = get(dict, b"ToUnicode", doc) else {
        return Ok(None);
    };
    let data = if stream.dict.has(b"Filter") {
        stream.decompressed_content()?
    } else {
        stream.content.clone()
    };
    ToUnicodeMap::parse(&data).map(Some)
}

fn base_font_name(dict: &Dictionary) -> String {
    dict.get(b"BaseFont")
        .and_then(Object::as_name)
        .map(|n| String::from_utf8_lossy(n).into_owned())
        .unwrap_or_else(|_| "Unnamed".to_string())
}

/// Type1, TrueType, MMType1 or Type3 font: one byte per code.
#[derive(Debug, Clone)]
pub struct SimpleFont {
    base_font: String,
    first_char: u32,
    widths: Vec<f64>,
    missing_width: f64,
    standard: Option<&'static StandardFontMetrics>,
    bbox: Rect,
    encoding: SimpleEncoding,
    to_unicode: Option<ToUnicodeMap>,
}

impl SimpleFont {
    /// A font backed entirely by built-in metrics.
    pub fn standard(metrics: &'static StandardFontMetrics) -> Self {
        Self {
            base_font: metrics.name.to_string(),
            first_char: 0,
            widths: Vec::new(),
            missing_width: 0.0,
            standard: Some(metrics),
            bbox: metrics.bbox(),
            encoding: SimpleEncoding::win_ansi(),
            to_unicode: None,
        }
    }

    pub fn from_dict(doc: Option<&Document>, dict: &Dictionary) -> Result<Self, BackendError> {
        let base_font = base_font_name(dict);
        let descriptor = get(dict, b"FontDescriptor", doc).and_then(|o| o.as_dict().ok());

        // Type3 glyph space is mapped by /FontMatrix; everything else is
        // already in 1/1000 em.
        let glyph_scale = match get(dict, b"FontMatrix", doc).and_then(|o| o.as_array().ok()) {
            Some(fm) => fm.first().and_then(number).map_or(1.0, |a| a * 1000.0),
            None => 1.0,
        };

        let first_char = get(dict, b"FirstChar", doc)
            .and_then(number)
            .map_or(0, |n| n.max(0.0) as u32);
        let widths: Vec<f64> = get(dict, b"Widths", doc)
            .and_then(|o| o.as_array().ok())
            .map(|arr| {
                arr.iter()
                    .map(|w| number(resolve(w, doc)).unwrap_or(0.0) * glyph_scale)
                    .collect()
            })
            .unwrap_or_default();
        let missing_width = descriptor
            .and_then(|d| get(d, b"MissingWidth", doc))
            .and_then(number)
            .unwrap_or(0.0)
            * glyph_scale;

        let standard = if widths.is_empty() {
            standard_fonts::lookup(&base_font).or(Some(standard_fonts::fallback()))
        } else {
            standard_fonts::lookup(&base_font)
        };

        let font_bbox = rect_from_array(get(dict, b"FontBBox", doc))
            .or_else(|| descriptor.and_then(|d| rect_from_array(get(d, b"FontBBox", doc))));
        let bbox = match font_bbox {
            Some(b) if glyph_scale != 1.0 => {
                Matrix::scale(glyph_scale, glyph_scale).transform_rect(&b)
            }
            Some(b) => b,
            None => standard.map_or_else(|| standard_fonts::fallback().bbox(), |m| m.bbox()),
        };

        Ok(Self {
            base_font,
            first_char,
            widths,
            missing_width,
            standard,
            bbox,
            encoding: SimpleEncoding::from_object(dict.get(b"Encoding").ok(), doc),
            to_unicode: load_to_unicode(dict, doc)?,
        })
    }
}

impl FontDescriptor for SimpleFont {
    fn base_font(&self) -> &str {
        &self.base_font
    }

    fn decode(&self, bytes: &[u8]) -> (u32, usize) {
        (u32::from(bytes[0]), 1)
    }

    fn lookup_cid(&self, code: u32) -> Option<u32> {
        Some(code)
    }

    fn to_unicode(&self, code: u32) -> Option<&[char]> {
        self.to_unicode.as_ref()?.get(code)
    }

    fn cid_to_ucs(&self, cid: u32) -> Option<char> {
        self.encoding.decode(cid)
    }

    fn advance_width(&self, cid: u32) -> f64 {
        if let Some(index) = cid.checked_sub(self.first_char) {
            if let Some(w) = self.widths.get(index as usize) {
                return *w;
            }
        }
        match self.standard {
            Some(m) if self.widths.is_empty() => m.width(cid),
            _ => self.missing_width,
        }
    }

    fn glyph_bbox(&self, _cid: u32) -> Rect {
        self.bbox
    }
}

/// How a Type0 font maps codes to CIDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CidEncoding {
    /// `Identity-H` / `Identity-V`: two-byte codes equal to CIDs.
    Identity,
    /// Any other CMap. Codes are still split as two bytes but cannot be
    /// mapped to CIDs.
    Unsupported(String),
}

/// Composite font with a single CIDFont descendant.
#[derive(Debug, Clone)]
pub struct Type0Font {
    base_font: String,
    encoding: CidEncoding,
    writing_mode: WritingMode,
    default_width: f64,
    widths: HashMap<u32, f64>,
    /// `/DW2`: default vertical origin y and advance.
    default_vertical: (f64, f64),
    vertical: HashMap<u32, VerticalMetrics>,
    bbox: Rect,
    to_unicode: Option<ToUnicodeMap>,
}

impl Type0Font {
    pub fn from_dict(doc: Option<&Document>, dict: &Dictionary) -> Result<Self, BackendError> {
        let base_font = base_font_name(dict);

        let (encoding, writing_mode) = match get(dict, b"Encoding", doc) {
            Some(Object::Name(n)) if n == b"Identity-H" => {
                (CidEncoding::Identity, WritingMode::Horizontal)
            }
            Some(Object::Name(n)) if n == b"Identity-V" => {
                (CidEncoding::Identity, WritingMode::Vertical)
            }
            Some(Object::Name(n)) => {
                let name = String::from_utf8_lossy(n).into_owned();
                let mode = if name.ends_with("-V") {
                    WritingMode::Vertical
                } else {
                    WritingMode::Horizontal
                };
                (CidEncoding::Unsupported(name), mode)
            }
            Some(Object::Stream(s)) => {
                let mode = match s.dict.get(b"WMode").and_then(Object::as_i64) {
                    Ok(1) => WritingMode::Vertical,
                    _ => WritingMode::Horizontal,
                };
                (CidEncoding::Unsupported("embedded CMap".to_string()), mode)
            }
            _ => (CidEncoding::Identity, WritingMode::Horizontal),
        };

        let descendant = get(dict, b"DescendantFonts", doc)
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| arr.first())
            .map(|o| resolve(o, doc))
            .and_then(|o| o.as_dict().ok())
            .ok_or_else(|| BackendError::Font("Type0 font without a descendant".to_string()))?;

        let default_width = get(descendant, b"DW", doc).and_then(number).unwrap_or(1000.0);
        let widths = get(descendant, b"W", doc)
            .and_then(|o| o.as_array().ok())
            .map(|arr| parse_w_array(arr, doc))
            .unwrap_or_default();

        let default_vertical = get(descendant, b"DW2", doc)
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| match arr.as_slice() {
                [vy, w1] => Some((number(vy)?, number(w1)?)),
                _ => None,
            })
            .unwrap_or((880.0, -1000.0));
        let vertical = get(descendant, b"W2", doc)
            .and_then(|o| o.as_array().ok())
            .map(|arr| parse_w2_array(arr, doc))
            .unwrap_or_default();

        let bbox = get(descendant, b"FontDescriptor", doc)
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| rect_from_array(get(d, b"FontBBox", doc)))
            .unwrap_or_else(|| Rect::new(0.0, -200.0, 1000.0, 900.0));

        Ok(Self {
            base_font,
            encoding,
            writing_mode,
            default_width,
            widths,
            default_vertical,
            vertical,
            bbox,
            to_unicode: load_to_unicode(dict, doc)?,
        })
    }

    pub fn encoding(&self) -> &CidEncoding {
        &self.encoding
    }
}

impl FontDescriptor for Type0Font {
    fn base_font(&self) -> &str {
        &self.base_font
    }

    fn writing_mode(&self) -> WritingMode {
        self.writing_mode
    }

    fn decode(&self, bytes: &[u8]) -> (u32, usize) {
        match bytes {
            [hi, lo, ..] => ((u32::from(*hi) << 8) | u32::from(*lo), 2),
            [b] => (u32::from(*b), 1),
            [] => (0, 1),
        }
    }

    fn lookup_cid(&self, code: u32) -> Option<u32> {
        match self.encoding {
            CidEncoding::Identity => Some(code),
            CidEncoding::Unsupported(_) => None,
        }
    }

    fn to_unicode(&self, code: u32) -> Option<&[char]> {
        self.to_unicode.as_ref()?.get(code)
    }

    fn cid_to_ucs(&self, _cid: u32) -> Option<char> {
        None
    }

    fn advance_width(&self, cid: u32) -> f64 {
        self.widths.get(&cid).copied().unwrap_or(self.default_width)
    }

    fn vertical_metrics(&self, cid: u32) -> VerticalMetrics {
        self.vertical.get(&cid).copied().unwrap_or(VerticalMetrics {
            vx: self.advance_width(cid) / 2.0,
            vy: self.default_vertical.0,
            w1: self.default_vertical.1,
        })
    }

    fn glyph_bbox(&self, _cid: u32) -> Rect {
        self.bbox
    }
}

/// Largest CID a two-byte code can select.
pub const MAX_CID: u32 = 0xFFFF;

/// CID for a `/W` or `/W2` operand, `None` outside `0..=MAX_CID`.
fn cid_operand(n: f64) -> Option<u32> {
    (0.0..=f64::from(MAX_CID)).contains(&n).then_some(n as u32)
}

/// CIDs of a `cfirst clast` run, clamped to the CID space.
fn cid_range(first: f64, last: f64) -> std::ops::RangeInclusive<u32> {
    match cid_operand(first) {
        Some(first) if last >= f64::from(first) => first..=(last.min(f64::from(MAX_CID)) as u32),
        #[allow(clippy::reversed_empty_ranges)]
        _ => 1..=0,
    }
}

/// CIDs of a `c [..]` run of `len` entries, stopping at the CID space end.
fn cid_list(first: f64, len: usize) -> impl Iterator<Item = u32> {
    let first = cid_operand(first);
    (0..len).map_while(move |j| {
        let j = u32::try_from(j).ok()?;
        first?.checked_add(j).filter(|&cid| cid <= MAX_CID)
    })
}

/// Parse a CIDFont `/W` array: `c [w1 w2 …]` and `cfirst clast w` runs.
///
/// Entries outside the two-byte CID space are dropped.
pub fn parse_w_array(objects: &[Object], doc: Option<&Document>) -> HashMap<u32, f64> {
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < objects.len() {
        let Some(start) = number(resolve(&objects[i], doc)) else {
            i += 1;
            continue;
        };
        let Some(next) = objects.get(i + 1).map(|o| resolve(o, doc)) else {
            break;
        };
        if let Ok(arr) = next.as_array() {
            for (cid, w) in cid_list(start, arr.len()).zip(arr) {
                if let Some(w) = number(resolve(w, doc)) {
                    widths.insert(cid, w);
                }
            }
            i += 2;
        } else if let (Some(end), Some(w)) = (
            number(next),
            objects.get(i + 2).and_then(|o| number(resolve(o, doc))),
        ) {
            for cid in cid_range(start, end) {
                widths.insert(cid, w);
            }
            i += 3;
        } else {
            i += 2;
        }
    }
    widths
}

/// Parse a CIDFont `/W2` array: `c [w1y vx vy …]` and
/// `cfirst clast w1y vx vy` runs.
pub fn parse_w2_array(objects: &[Object], doc: Option<&Document>) -> HashMap<u32, VerticalMetrics> {
    let mut out = HashMap::new();
    let mut i = 0;
    while i < objects.len() {
        let Some(start) = number(resolve(&objects[i], doc)) else {
            i += 1;
            continue;
        };
        let Some(next) = objects.get(i + 1).map(|o| resolve(o, doc)) else {
            break;
        };
        if let Ok(arr) = next.as_array() {
            let values: Vec<f64> = arr.iter().filter_map(|o| number(resolve(o, doc))).collect();
            let triples = values.chunks_exact(3);
            for (cid, triple) in cid_list(start, triples.len()).zip(triples) {
                out.insert(
                    cid,
                    VerticalMetrics {
                        w1: triple[0],
                        vx: triple[1],
                        vy: triple[2],
                    },
                );
            }
            i += 2;
        } else {
            let values: Vec<f64> = objects
                .iter()
                .skip(i + 1)
                .take(4)
                .filter_map(|o| number(resolve(o, doc)))
                .collect();
            if let [end, w1, vx, vy] = values[..] {
                for cid in cid_range(start, end) {
                    out.insert(cid, VerticalMetrics { vx, vy, w1 });
                }
            }
            i += 5;
        }
    }
    out
}
