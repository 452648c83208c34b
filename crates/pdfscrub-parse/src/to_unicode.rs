//! `/ToUnicode` CMap parsing.
//!
//! Only the `bfchar` and `bfrange` sections matter for text filtering; the
//! codespace ranges are implied by the owning font's byte width.

use std::collections::HashMap;

use crate::error::BackendError;

/// Character code → Unicode sequence table from a `/ToUnicode` stream.
#[derive(Debug, Clone, Default)]
pub struct ToUnicodeMap {
    map: HashMap<u32, Vec<char>>,
}

impl ToUnicodeMap {
    /// Parse the decoded bytes of a `/ToUnicode` stream.
    pub fn parse(data: &[u8]) -> Result<Self, BackendError> {
        let text = String::from_utf8_lossy(data);
        let mut map = HashMap::new();
        for body in sections(&text, "beginbfchar", "endbfchar") {
            parse_bfchar(body, &mut map)?;
        }
        for body in sections(&text, "beginbfrange", "endbfrange") {
            parse_bfrange(body, &mut map)?;
        }
        Ok(Self { map })
    }

    pub fn get(&self, code: u32) -> Option<&[char]> {
        self.map.get(&code).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Bodies of every `begin … end` section, in order.
fn sections<'t>(text: &'t str, begin: &str, end: &str) -> Vec<&'t str> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(begin) {
        let after = &rest[start + begin.len()..];
        let Some(stop) = after.find(end) else { break };
        out.push(&after[..stop]);
        rest = &after[stop + end.len()..];
    }
    out
}

/// `<hex>` tokens of a section in order, plus whether each one sits inside
/// a `[ … ]` array.
fn hex_tokens(body: &str) -> Vec<(&str, bool)> {
    let mut out = Vec::new();
    let mut in_array = false;
    let mut chars = body.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '[' => in_array = true,
            ']' => in_array = false,
            '<' => {
                let start = i + 1;
                let stop = body[start..].find('>').map(|n| start + n);
                let Some(stop) = stop else { break };
                out.push((&body[start..stop], in_array));
                // Resume after '>'.
                for (j, _) in chars.by_ref() {
                    if j >= stop {
                        break;
                    }
                }
            }
            _ => {}
        }
    }
    out
}

fn parse_code(hex: &str) -> Result<u32, BackendError> {
    let digits: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    u32::from_str_radix(&digits, 16)
        .map_err(|e| BackendError::Font(format!("invalid ToUnicode code <{hex}>: {e}")))
}

/// Decode a destination string (UTF-16BE in hex) into UTF-16 code units.
fn utf16_units(hex: &str) -> Result<Vec<u16>, BackendError> {
    let digits: Vec<u8> = hex.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    // A two-digit destination is a single byte; widen it to one code unit.
    if digits.len() <= 2 {
        let v = parse_code(hex)?;
        return Ok(vec![v as u16]);
    }
    digits
        .chunks(4)
        .map(|chunk| {
            let s = std::str::from_utf8(chunk).unwrap_or("");
            u16::from_str_radix(s, 16)
                .map_err(|e| BackendError::Font(format!("invalid ToUnicode value <{hex}>: {e}")))
        })
        .collect()
}

fn decode_units(units: &[u16]) -> Vec<char> {
    char::decode_utf16(units.iter().copied())
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

fn parse_bfchar(body: &str, map: &mut HashMap<u32, Vec<char>>) -> Result<(), BackendError> {
    let tokens = hex_tokens(body);
    for pair in tokens.chunks_exact(2) {
        let code = parse_code(pair[0].0)?;
        let units = utf16_units(pair[1].0)?;
        map.insert(code, decode_units(&units));
    }
    Ok(())
}

fn parse_bfrange(body: &str, map: &mut HashMap<u32, Vec<char>>) -> Result<(), BackendError> {
    let tokens = hex_tokens(body);
    let mut i = 0;
    while i + 2 < tokens.len() {
        let low = parse_code(tokens[i].0)?;
        let high = parse_code(tokens[i + 1].0)?;
        i += 2;
        if tokens.get(i).is_some_and(|t| t.1) {
            // <low> <high> [<dst> <dst> …]
            let mut code = low;
            while let Some(&(hex, true)) = tokens.get(i) {
                if code <= high {
                    map.insert(code, decode_units(&utf16_units(hex)?));
                }
                code = code.saturating_add(1);
                i += 1;
            }
        } else if let Some(&(hex, false)) = tokens.get(i) {
            // <low> <high> <dst>: the last code unit increments.
            let base = utf16_units(hex)?;
            for (offset, code) in (low..=high).enumerate() {
                let mut units = base.clone();
                if let Some(last) = units.last_mut() {
                    *last = last.wrapping_add(offset as u16);
                }
                map.insert(code, decode_units(&units));
            }
            i += 1;
        }
    }
    Ok(())
}
