//! Content stream tokenizer.
//!
//! Splits raw content-stream bytes into [`RawOperator`]s: an operator
//! keyword together with the operands that preceded it. Comments are
//! stripped and inline images (`BI … ID … EI`) are captured whole.

use crate::error::BackendError;

/// A content-stream operand value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Integer(i64),
    Real(f64),
    /// Name without the leading `/`.
    Name(String),
    /// `( … )` string, escapes already decoded.
    LiteralString(Vec<u8>),
    /// `< … >` string, already decoded to bytes.
    HexString(Vec<u8>),
    Array(Vec<Operand>),
    Boolean(bool),
    Null,
    /// `<< … >>`; entry order is preserved.
    Dictionary(Vec<(String, Operand)>),
}

impl Operand {
    /// Numeric value of an integer or real operand.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Operand::Integer(i) => Some(*i as f64),
            Operand::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Operand::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Bytes of a literal or hex string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Operand::LiteralString(s) | Operand::HexString(s) => Some(s),
            _ => None,
        }
    }
}

/// An inline image: its abbreviated dictionary and raw sample data.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineImage {
    pub dict: Vec<(String, Operand)>,
    pub data: Vec<u8>,
}

/// An operator keyword and the operands collected before it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOperator {
    pub keyword: String,
    pub operands: Vec<Operand>,
    /// Set only for `BI`.
    pub inline_image: Option<InlineImage>,
}

impl RawOperator {
    pub fn new(keyword: impl Into<String>, operands: Vec<Operand>) -> Self {
        Self {
            keyword: keyword.into(),
            operands,
            inline_image: None,
        }
    }
}

/// Tokenize a whole content stream.
///
/// # Errors
///
/// Returns [`BackendError::Parse`] for unterminated strings, arrays,
/// dictionaries or inline images, and for stray `]` / `>>`.
pub fn tokenize(input: &[u8]) -> Result<Vec<RawOperator>, BackendError> {
    Lexer::new(input).run()
}

/// Deepest array/dictionary nesting accepted in an operand.
pub const MAX_NESTING: usize = 256;

struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    /// Arrays and dictionaries currently open.
    depth: usize,
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

fn is_delimiter(b: u8) -> bool {
    matches!(
        b,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

fn hex_value(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn syntax(msg: impl Into<String>) -> BackendError {
    BackendError::Parse(msg.into())
}

impl<'a> Lexer<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn skip_blank(&mut self) {
        while let Some(b) = self.peek() {
            if is_whitespace(b) {
                self.pos += 1;
            } else if b == b'%' {
                while let Some(c) = self.peek() {
                    if c == b'\n' || c == b'\r' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn run(mut self) -> Result<Vec<RawOperator>, BackendError> {
        let mut ops = Vec::new();
        let mut stack = Vec::new();

        loop {
            self.skip_blank();
            let Some(b) = self.peek() else { break };
            match b {
                b']' => return Err(syntax("unexpected ']' outside array")),
                b'>' if self.peek_at(1) == Some(b'>') => {
                    return Err(syntax("unexpected '>>' outside dictionary"));
                }
                b'{' | b'}' | b')' | b'>' => {
                    // Stray delimiters carry no meaning in a content stream.
                    self.pos += 1;
                }
                _ if b.is_ascii_alphabetic() || b == b'\'' || b == b'"' || b == b'*' => {
                    let keyword = self.keyword();
                    match keyword.as_str() {
                        "true" => stack.push(Operand::Boolean(true)),
                        "false" => stack.push(Operand::Boolean(false)),
                        "null" => stack.push(Operand::Null),
                        "BI" => {
                            stack.clear();
                            let image = self.inline_image()?;
                            ops.push(RawOperator {
                                keyword,
                                operands: Vec::new(),
                                inline_image: Some(image),
                            });
                        }
                        _ => ops.push(RawOperator::new(keyword, std::mem::take(&mut stack))),
                    }
                }
                _ => {
                    let value = self.value()?;
                    stack.push(value);
                }
            }
        }

        Ok(ops)
    }

    /// Parse one operand starting at the current byte.
    fn value(&mut self) -> Result<Operand, BackendError> {
        let Some(b) = self.peek() else {
            return Err(syntax("unexpected end of content stream"));
        };
        match b {
            b'(' => self.literal_string().map(Operand::LiteralString),
            b'<' if self.peek_at(1) == Some(b'<') => self.dictionary().map(Operand::Dictionary),
            b'<' => self.hex_string().map(Operand::HexString),
            b'[' => self.array().map(Operand::Array),
            b'/' => Ok(Operand::Name(self.name())),
            b'0'..=b'9' | b'+' | b'-' | b'.' => self.number(),
            _ if is_regular(b) => {
                let word = self.keyword();
                Ok(match word.as_str() {
                    "true" => Operand::Boolean(true),
                    "false" => Operand::Boolean(false),
                    "null" => Operand::Null,
                    _ => Operand::Name(word),
                })
            }
            _ => Err(syntax(format!("unexpected byte 0x{b:02X}"))),
        }
    }

    fn keyword(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(is_regular) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.input[start..self.pos]).into_owned()
    }

    fn name(&mut self) -> String {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(is_regular) {
            self.pos += 1;
        }
        let raw = &self.input[start..self.pos];
        let mut out = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'#' && i + 2 < raw.len() {
                if let (Some(hi), Some(lo)) = (hex_value(raw[i + 1]), hex_value(raw[i + 2])) {
                    out.push((hi << 4) | lo);
                    i += 3;
                    continue;
                }
            }
            out.push(raw[i]);
            i += 1;
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    fn number(&mut self) -> Result<Operand, BackendError> {
        let start = self.pos;
        if matches!(self.peek(), Some(b'+' | b'-')) {
            self.pos += 1;
        }
        let mut real = false;
        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                self.pos += 1;
            } else if b == b'.' && !real {
                real = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        let token = std::str::from_utf8(&self.input[start..self.pos])
            .map_err(|_| syntax("invalid number token"))?;
        if real {
            // "-." and "." read as zero.
            let digits = token.trim_start_matches(['+', '-']);
            if digits == "." {
                return Ok(Operand::Real(0.0));
            }
            token
                .parse::<f64>()
                .map(Operand::Real)
                .map_err(|_| syntax(format!("invalid real number: {token}")))
        } else {
            token
                .parse::<i64>()
                .map(Operand::Integer)
                .map_err(|_| syntax(format!("invalid integer: {token}")))
        }
    }

    fn literal_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut out = Vec::new();
        let mut depth = 1u32;
        while let Some(b) = self.peek() {
            self.pos += 1;
            match b {
                b'(' => {
                    depth += 1;
                    out.push(b);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                    out.push(b);
                }
                b'\\' => self.escape(&mut out)?,
                _ => out.push(b),
            }
        }
        Err(syntax("unterminated literal string"))
    }

    fn escape(&mut self, out: &mut Vec<u8>) -> Result<(), BackendError> {
        let Some(b) = self.peek() else {
            return Err(syntax("unterminated escape in literal string"));
        };
        self.pos += 1;
        match b {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'\r' => {
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            b'\n' => {}
            b'0'..=b'7' => {
                let mut value = u32::from(b - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            }
            // \( \) \\ and unknown escapes keep the character itself.
            _ => out.push(b),
        }
        Ok(())
    }

    fn hex_string(&mut self) -> Result<Vec<u8>, BackendError> {
        self.pos += 1;
        let mut out = Vec::new();
        let mut high: Option<u8> = None;
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'>' {
                if let Some(h) = high {
                    out.push(h << 4);
                }
                return Ok(out);
            }
            if is_whitespace(b) {
                continue;
            }
            let v = hex_value(b)
                .ok_or_else(|| syntax(format!("invalid hex digit: {:?}", b as char)))?;
            match high.take() {
                Some(h) => out.push((h << 4) | v),
                None => high = Some(v),
            }
        }
        Err(syntax("unterminated hex string"))
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, BackendError>,
    ) -> Result<T, BackendError> {
        if self.depth >= MAX_NESTING {
            return Err(syntax(format!(
                "arrays and dictionaries nested deeper than {MAX_NESTING}"
            )));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn array(&mut self) -> Result<Vec<Operand>, BackendError> {
        self.nested(Self::array_items)
    }

    fn array_items(&mut self) -> Result<Vec<Operand>, BackendError> {
        self.pos += 1;
        let mut items = Vec::new();
        loop {
            self.skip_blank();
            match self.peek() {
                None => return Err(syntax("unterminated array")),
                Some(b']') => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => items.push(self.value()?),
            }
        }
    }

    fn dictionary(&mut self) -> Result<Vec<(String, Operand)>, BackendError> {
        self.nested(Self::dictionary_entries)
    }

    fn dictionary_entries(&mut self) -> Result<Vec<(String, Operand)>, BackendError> {
        self.pos += 2;
        let mut entries = Vec::new();
        loop {
            self.skip_blank();
            match self.peek() {
                None => return Err(syntax("unterminated dictionary")),
                Some(b'>') if self.peek_at(1) == Some(b'>') => {
                    self.pos += 2;
                    return Ok(entries);
                }
                Some(b'/') => {
                    let key = self.name();
                    self.skip_blank();
                    if self.peek().is_none() {
                        return Err(syntax("unterminated dictionary"));
                    }
                    let value = self.value()?;
                    entries.push((key, value));
                }
                Some(_) => return Err(syntax("expected name key in dictionary")),
            }
        }
    }

    /// Parse `<entries> ID <data> EI` after the `BI` keyword.
    fn inline_image(&mut self) -> Result<InlineImage, BackendError> {
        let mut dict = Vec::new();
        loop {
            self.skip_blank();
            match self.peek() {
                None => return Err(syntax("unterminated inline image (missing ID)")),
                Some(b'I')
                    if self.peek_at(1) == Some(b'D')
                        && self.peek_at(2).is_none_or(|b| !is_regular(b)) =>
                {
                    self.pos += 2;
                    if self.peek().is_some_and(is_whitespace) {
                        self.pos += 1;
                    }
                    break;
                }
                Some(b'/') => {
                    let key = self.name();
                    self.skip_blank();
                    let value = self.value()?;
                    dict.push((key, value));
                }
                Some(_) => {
                    return Err(syntax("expected name key in inline image dictionary"));
                }
            }
        }

        let start = self.pos;
        let input = self.input;
        let mut i = start;
        while i + 1 < input.len() {
            let preceded = i == start || is_whitespace(input[i - 1]);
            let followed = input.get(i + 2).is_none_or(|&b| !is_regular(b));
            if preceded && followed && input[i] == b'E' && input[i + 1] == b'I' {
                let mut end = i;
                if end > start && is_whitespace(input[end - 1]) {
                    end -= 1;
                }
                self.pos = i + 2;
                return Ok(InlineImage {
                    dict,
                    data: input[start..end].to_vec(),
                });
            }
            i += 1;
        }
        Err(syntax("unterminated inline image (missing EI)"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(input: &[u8]) -> RawOperator {
        let mut ops = tokenize(input).unwrap();
        assert_eq!(ops.len(), 1, "expected one operator in {input:?}");
        ops.remove(0)
    }

    #[test]
    fn numbers() {
        let op = single(b"42 -7 3.5 .5 -.25 +3 0 cm");
        assert_eq!(op.keyword, "cm");
        assert_eq!(
            op.operands,
            vec![
                Operand::Integer(42),
                Operand::Integer(-7),
                Operand::Real(3.5),
                Operand::Real(0.5),
                Operand::Real(-0.25),
                Operand::Integer(3),
                Operand::Integer(0),
            ]
        );
    }

    #[test]
    fn names_decode_hex_escapes() {
        let op = single(b"/F#201 12 Tf");
        assert_eq!(op.operands[0], Operand::Name("F 1".to_string()));
    }

    #[test]
    fn literal_string_escapes() {
        let op = single(b"(a\\(b\\)c\\n\\101\\\\) Tj");
        assert_eq!(op.operands[0], Operand::LiteralString(b"a(b)c\nA\\".to_vec()));
    }

    #[test]
    fn literal_string_balanced_parens() {
        let op = single(b"(x (y) z) Tj");
        assert_eq!(op.operands[0], Operand::LiteralString(b"x (y) z".to_vec()));
    }

    #[test]
    fn literal_string_line_continuation() {
        let op = single(b"(ab\\\ncd) Tj");
        assert_eq!(op.operands[0], Operand::LiteralString(b"abcd".to_vec()));
    }

    #[test]
    fn hex_strings_pad_odd_digits() {
        let op = single(b"<48 65 6C6C 6F> Tj");
        assert_eq!(op.operands[0], Operand::HexString(b"Hello".to_vec()));
        let ops = tokenize(b"<4> Tj").unwrap();
        assert_eq!(ops[0].operands[0], Operand::HexString(vec![0x40]));
    }

    #[test]
    fn tj_array_with_adjustments() {
        let op = single(b"[(A) -120 (B) 30.5] TJ");
        assert_eq!(
            op.operands[0],
            Operand::Array(vec![
                Operand::LiteralString(b"A".to_vec()),
                Operand::Integer(-120),
                Operand::LiteralString(b"B".to_vec()),
                Operand::Real(30.5),
            ])
        );
    }

    #[test]
    fn dictionary_operand_for_bdc() {
        let op = single(b"/Span << /MCID 3 /Alt (x) /Nested << /K true >> >> BDC");
        assert_eq!(op.keyword, "BDC");
        assert_eq!(
            op.operands[1],
            Operand::Dictionary(vec![
                ("MCID".to_string(), Operand::Integer(3)),
                ("Alt".to_string(), Operand::LiteralString(b"x".to_vec())),
                (
                    "Nested".to_string(),
                    Operand::Dictionary(vec![("K".to_string(), Operand::Boolean(true))])
                ),
            ])
        );
    }

    #[test]
    fn comments_are_stripped() {
        let ops = tokenize(b"q % save\n1 0 0 1 0 0 cm %% more\nQ").unwrap();
        let keywords: Vec<&str> = ops.iter().map(|o| o.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["q", "cm", "Q"]);
    }

    #[test]
    fn quote_operators() {
        let ops = tokenize(b"(a) ' 1 2 (b) \"").unwrap();
        assert_eq!(ops[0].keyword, "'");
        assert_eq!(ops[1].keyword, "\"");
        assert_eq!(ops[1].operands.len(), 3);
    }

    #[test]
    fn star_operators() {
        let ops = tokenize(b"f* B* b* W* T*").unwrap();
        let keywords: Vec<&str> = ops.iter().map(|o| o.keyword.as_str()).collect();
        assert_eq!(keywords, vec!["f*", "B*", "b*", "W*", "T*"]);
    }

    #[test]
    fn booleans_and_null_are_operands() {
        let op = single(b"true false null foo");
        assert_eq!(op.keyword, "foo");
        assert_eq!(
            op.operands,
            vec![Operand::Boolean(true), Operand::Boolean(false), Operand::Null]
        );
    }

    #[test]
    fn inline_image_captured() {
        let ops = tokenize(b"q BI /W 2 /H 1 /CS /G /BPC 8 ID \x00\xFF EI Q").unwrap();
        assert_eq!(ops.len(), 3);
        let image = ops[1].inline_image.as_ref().unwrap();
        assert_eq!(ops[1].keyword, "BI");
        assert_eq!(image.dict[0], ("W".to_string(), Operand::Integer(2)));
        assert_eq!(image.dict.len(), 4);
        assert_eq!(image.data, vec![0x00, 0xFF]);
        assert_eq!(ops[2].keyword, "Q");
    }

    #[test]
    fn inline_image_missing_ei() {
        assert!(tokenize(b"BI /W 1 ID abc").is_err());
    }

    #[test]
    fn unterminated_constructs_fail() {
        assert!(tokenize(b"(abc Tj").is_err());
        assert!(tokenize(b"[1 2 TJ").is_err());
        assert!(tokenize(b"<< /A 1 BDC").is_err());
        assert!(tokenize(b"<4G> Tj").is_err());
    }

    #[test]
    fn runaway_nesting_is_a_syntax_error() {
        let mut input = vec![b'['; 500_000];
        input.extend_from_slice(b" TJ");
        assert!(matches!(tokenize(&input), Err(BackendError::Parse(_))));

        let mut input = b"/Span ".to_vec();
        input.extend(std::iter::repeat_n(&b"<< /A "[..], MAX_NESTING + 1).flatten());
        input.extend_from_slice(b"1 BDC");
        assert!(matches!(tokenize(&input), Err(BackendError::Parse(_))));
    }

    #[test]
    fn nesting_up_to_the_limit_is_accepted() {
        let mut input = vec![b'['; MAX_NESTING];
        input.extend(std::iter::repeat_n(b']', MAX_NESTING));
        input.extend_from_slice(b" TJ");
        let ops = tokenize(&input).unwrap();
        assert_eq!(ops[0].keyword, "TJ");
    }

    #[test]
    fn stray_array_close_fails() {
        assert!(matches!(tokenize(b"1 ] w"), Err(BackendError::Parse(_))));
    }

    #[test]
    fn empty_input() {
        assert!(tokenize(b"").unwrap().is_empty());
        assert!(tokenize(b"  \n\t % only a comment").unwrap().is_empty());
    }

    #[test]
    fn operand_accessors() {
        assert_eq!(Operand::Integer(3).as_number(), Some(3.0));
        assert_eq!(Operand::Real(0.5).as_number(), Some(0.5));
        assert_eq!(Operand::Name("F1".into()).as_name(), Some("F1"));
        assert_eq!(Operand::HexString(vec![1]).as_bytes(), Some(&[1u8][..]));
        assert_eq!(Operand::Null.as_number(), None);
    }
}
