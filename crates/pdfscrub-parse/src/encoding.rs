//! Single-byte encodings for simple fonts.
//!
//! Used only as the last Unicode fallback when a font carries no
//! `/ToUnicode` map, so coverage is deliberately narrow: WinAnsi (Latin-1
//! with the Windows 0x80..0x9F block) and `/Differences` entries whose glyph
//! names are either `uniXXXX`/`uXXXX[XX]` forms or in a short list of common
//! names.

use lopdf::{Document, Object};

const WIN_ANSI_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

static GLYPH_NAMES: &[(&str, char)] = &[
    ("space", ' '),
    ("period", '.'),
    ("comma", ','),
    ("colon", ':'),
    ("semicolon", ';'),
    ("hyphen", '-'),
    ("quotesingle", '\''),
    ("quotedbl", '"'),
    ("parenleft", '('),
    ("parenright", ')'),
    ("slash", '/'),
    ("bullet", '\u{2022}'),
    ("endash", '\u{2013}'),
    ("emdash", '\u{2014}'),
    ("quoteleft", '\u{2018}'),
    ("quoteright", '\u{2019}'),
    ("quotedblleft", '\u{201C}'),
    ("quotedblright", '\u{201D}'),
    ("ellipsis", '\u{2026}'),
    ("fi", '\u{FB01}'),
    ("fl", '\u{FB02}'),
    ("ff", '\u{FB00}'),
    ("ffi", '\u{FB03}'),
    ("ffl", '\u{FB04}'),
    ("Euro", '\u{20AC}'),
    ("degree", '\u{00B0}'),
    ("copyright", '\u{00A9}'),
    ("registered", '\u{00AE}'),
    ("trademark", '\u{2122}'),
];

/// Unicode for a glyph name, as far as this table knows it.
pub fn glyph_name_to_char(name: &str) -> Option<char> {
    if name.len() == 1 {
        return name.chars().next().filter(char::is_ascii_alphanumeric);
    }
    if let Some(hex) = name.strip_prefix("uni").filter(|h| h.len() == 4) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(hex) = name.strip_prefix('u').filter(|h| (4..=6).contains(&h.len())) {
        if let Ok(v) = u32::from_str_radix(hex, 16) {
            return char::from_u32(v);
        }
    }
    if let Some(digit) = digit_name(name) {
        return Some(digit);
    }
    GLYPH_NAMES.iter().find(|(n, _)| *n == name).map(|(_, c)| *c)
}

fn digit_name(name: &str) -> Option<char> {
    const DIGITS: [&str; 10] = [
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
    ];
    let pos = DIGITS.iter().position(|d| *d == name)?;
    char::from_digit(pos as u32, 10)
}

/// Code → Unicode table for one simple font.
#[derive(Debug, Clone)]
pub struct SimpleEncoding {
    table: [Option<char>; 256],
}

impl SimpleEncoding {
    /// WinAnsi over a Latin-1 base. Also used when no encoding is named.
    pub fn win_ansi() -> Self {
        let mut table = [None; 256];
        for (code, slot) in table.iter_mut().enumerate() {
            *slot = match code {
                0x20..=0x7E | 0xA0..=0xFF => char::from_u32(code as u32),
                0x80..=0x9F => WIN_ANSI_HIGH[code - 0x80],
                _ => None,
            };
        }
        Self { table }
    }

    /// Build from a font's `/Encoding` entry (name or dictionary).
    pub fn from_object(obj: Option<&Object>, doc: Option<&Document>) -> Self {
        let mut enc = Self::win_ansi();
        let obj = match (obj, doc) {
            (Some(Object::Reference(id)), Some(doc)) => doc.get_object(*id).ok(),
            (other, _) => other,
        };
        if let Some(Object::Dictionary(dict)) = obj {
            if let Ok(Object::Array(diffs)) = dict.get(b"Differences") {
                enc.apply_differences(diffs);
            }
        }
        enc
    }

    /// Apply a `/Differences` array: a code followed by glyph names for
    /// consecutive codes.
    pub fn apply_differences(&mut self, diffs: &[Object]) {
        let mut code: usize = 0;
        for item in diffs {
            match item {
                Object::Integer(n) => code = (*n).clamp(0, 255) as usize,
                Object::Name(name) => {
                    if code < 256 {
                        let name = String::from_utf8_lossy(name);
                        self.table[code] = glyph_name_to_char(&name);
                    }
                    code += 1;
                }
                _ => {}
            }
        }
    }

    pub fn decode(&self, code: u32) -> Option<char> {
        self.table.get(code as usize).copied().flatten()
    }
}
