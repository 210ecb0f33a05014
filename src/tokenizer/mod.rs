//! Phase 0: character tokenizer.
//!
//! Classifies a raw byte stream into regular/whitespace/comment/string
//! lexemes with 1-based line/column spans. Operates on bytes rather than
//! decoded characters so column numbers stay meaningful regardless of the
//! caller's chosen encoding (see [`crate::config::EncodingLabel`]) — payload
//! bytes are only decoded into text on demand, never by the tokenizer itself.
//!
//! Used directly by the preprocessor ([`crate::preprocessor`]) to drive the
//! A2L stream, and again (conceptually; see [`crate::if_data`]) to lex
//! IF_DATA bodies under the reconstructed AML grammar.

use serde::Serialize;

const BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Which of the four lexical classes a [`Token`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenClass {
    Regular,
    Whitespace,
    Comment,
    String,
}

/// 1-based, inclusive source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    pub fn new(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Translates this span into the combined (post-include) line numbering
    /// the preprocessor assigns to a file at `absolute_line_offset`.
    pub fn shifted(self, absolute_line_offset: i64) -> Self {
        Self {
            start_line: (self.start_line as i64 + absolute_line_offset) as usize,
            end_line: (self.end_line as i64 + absolute_line_offset) as usize,
            ..self
        }
    }
}

/// One lexeme. `bytes` is the raw, undecoded payload — for strings, the A2L
/// `""`/`\"` escapes have already been collapsed to a single `"` byte, but no
/// encoding has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub class: TokenClass,
    pub span: Span,
    pub bytes: Vec<u8>,
}

impl Token {
    /// Lossily decodes the payload as UTF-8, for diagnostics/JSON output only.
    /// Parsing code should use [`crate::config::EncodingLabel::decode`] with
    /// the caller's chosen encoding instead.
    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl Serialize for Token {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Token", 3)?;
        state.serialize_field("class", &self.class)?;
        state.serialize_field("span", &self.span)?;
        state.serialize_field("text", &self.text_lossy())?;
        state.end()
    }
}

impl TokenClass {
    pub fn as_u8(self) -> u8 {
        match self {
            TokenClass::Regular => 0,
            TokenClass::Whitespace => 1,
            TokenClass::Comment => 2,
            TokenClass::String => 3,
        }
    }

    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(TokenClass::Regular),
            1 => Some(TokenClass::Whitespace),
            2 => Some(TokenClass::Comment),
            3 => Some(TokenClass::String),
            _ => None,
        }
    }

    /// Whether a token of this class is insignificant to the A2L parser's
    /// grammar (skipped when looking for the next token to match).
    pub fn is_skippable(self) -> bool {
        matches!(self, TokenClass::Whitespace | TokenClass::Comment)
    }
}

fn is_whitespace_byte(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

/// Byte-oriented cursor tracking 1-based line/column as it advances.
///
/// `last_pos` is the (line, col) of the byte most recently returned by
/// [`Cursor::advance`] — i.e. exactly the span-end a token wants once it
/// stops consuming — so scan functions never need to reconstruct it after
/// the fact.
struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
    last_pos: (usize, usize),
}

impl<'a> Cursor<'a> {
    fn new(input: &'a [u8]) -> Self {
        let input = if input.starts_with(&BOM) {
            &input[BOM.len()..]
        } else {
            input
        };
        Self {
            input,
            pos: 0,
            line: 1,
            col: 1,
            last_pos: (1, 1),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Advances one byte, updating line/col/last_pos, and returns it.
    fn advance(&mut self) -> u8 {
        let b = self.input[self.pos];
        self.pos += 1;
        self.last_pos = (self.line, self.col);
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        b
    }

    fn position(&self) -> (usize, usize) {
        (self.line, self.col)
    }
}

/// Tokenizes a full byte slice into a vector of [`Token`]s.
///
/// Unterminated strings/comments are not an error here: the partial token is
/// emitted with whatever payload was scanned and end-of-stream is reached
/// normally, matching the source's "detected downstream" failure policy.
pub fn tokenize(input: &[u8]) -> Vec<Token> {
    let mut cursor = Cursor::new(input);
    let mut tokens = Vec::new();

    while !cursor.eof() {
        let b = cursor.peek().unwrap();
        if is_whitespace_byte(b) {
            tokens.push(scan_whitespace(&mut cursor));
        } else if b == b'/' && cursor.peek_at(1) == Some(b'*') {
            tokens.push(scan_block_comment(&mut cursor));
        } else if b == b'/' && cursor.peek_at(1) == Some(b'/') {
            tokens.push(scan_line_comment(&mut cursor));
        } else if b == b'"' {
            tokens.push(scan_string(&mut cursor));
        } else {
            tokens.push(scan_regular(&mut cursor));
        }
    }

    tokens
}

fn scan_whitespace(cursor: &mut Cursor) -> Token {
    let (start_line, start_col) = cursor.position();
    let mut bytes = Vec::new();
    while let Some(b) = cursor.peek() {
        if !is_whitespace_byte(b) {
            break;
        }
        bytes.push(cursor.advance());
    }
    let end = cursor.last_pos;
    Token {
        class: TokenClass::Whitespace,
        span: Span::new(start_line, start_col, end.0, end.1),
        bytes,
    }
}

fn scan_block_comment(cursor: &mut Cursor) -> Token {
    let (start_line, start_col) = cursor.position();
    let mut bytes = Vec::new();
    bytes.push(cursor.advance()); // '/'
    bytes.push(cursor.advance()); // '*'
    loop {
        if cursor.eof() {
            break;
        }
        if cursor.peek() == Some(b'*') && cursor.peek_at(1) == Some(b'/') {
            bytes.push(cursor.advance());
            bytes.push(cursor.advance());
            break;
        }
        bytes.push(cursor.advance());
    }
    let end = cursor.last_pos;
    Token {
        class: TokenClass::Comment,
        span: Span::new(start_line, start_col, end.0, end.1),
        bytes,
    }
}

fn scan_line_comment(cursor: &mut Cursor) -> Token {
    let (start_line, start_col) = cursor.position();
    let mut bytes = Vec::new();
    bytes.push(cursor.advance()); // '/'
    bytes.push(cursor.advance()); // '/'
    while let Some(b) = cursor.peek() {
        if b == b'\n' {
            break;
        }
        bytes.push(cursor.advance());
    }
    let end = cursor.last_pos;
    Token {
        class: TokenClass::Comment,
        span: Span::new(start_line, start_col, end.0, end.1),
        bytes,
    }
}

fn scan_string(cursor: &mut Cursor) -> Token {
    let (start_line, start_col) = cursor.position();
    let mut bytes = Vec::new();
    cursor.advance(); // opening '"'
    loop {
        match cursor.peek() {
            None => break,
            Some(b'"') => {
                if cursor.peek_at(1) == Some(b'"') {
                    // A2L-escaped quote: "" -> "
                    cursor.advance();
                    cursor.advance();
                    bytes.push(b'"');
                } else {
                    cursor.advance(); // closing quote
                    break;
                }
            }
            Some(b'\\') if cursor.peek_at(1) == Some(b'"') => {
                // \" synonym for an embedded quote.
                cursor.advance();
                cursor.advance();
                bytes.push(b'"');
            }
            Some(_) => {
                bytes.push(cursor.advance());
            }
        }
    }
    let end = cursor.last_pos;
    Token {
        class: TokenClass::String,
        span: Span::new(start_line, start_col, end.0, end.1),
        bytes,
    }
}

fn scan_regular(cursor: &mut Cursor) -> Token {
    let (start_line, start_col) = cursor.position();
    let mut bytes = Vec::new();
    while let Some(b) = cursor.peek() {
        if is_whitespace_byte(b) || b == b'"' {
            break;
        }
        if b == b'/' && matches!(cursor.peek_at(1), Some(b'*') | Some(b'/')) {
            break;
        }
        bytes.push(cursor.advance());
    }
    let end = cursor.last_pos;
    Token {
        class: TokenClass::Regular,
        span: Span::new(start_line, start_col, end.0, end.1),
        bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classes(tokens: &[Token]) -> Vec<TokenClass> {
        tokens.iter().map(|t| t.class).collect()
    }

    fn texts(tokens: &[Token]) -> Vec<String> {
        tokens.iter().map(|t| t.text_lossy()).collect()
    }

    #[test]
    fn concatenation_round_trips_the_original_bytes_for_simple_input() {
        let input = b"ASAP2_VERSION 1 60";
        let tokens = tokenize(input);
        let mut rebuilt = Vec::new();
        for t in &tokens {
            rebuilt.extend_from_slice(&t.bytes);
        }
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn strips_leading_bom() {
        let mut input = BOM.to_vec();
        input.extend_from_slice(b"X");
        let tokens = tokenize(&input);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].bytes, b"X");
    }

    #[test]
    fn classifies_regular_whitespace_runs() {
        let tokens = tokenize(b"FOO BAR");
        assert_eq!(
            classes(&tokens),
            vec![TokenClass::Regular, TokenClass::Whitespace, TokenClass::Regular]
        );
        assert_eq!(texts(&tokens), vec!["FOO", " ", "BAR"]);
    }

    #[test]
    fn block_comment_spans_up_to_and_including_closing_delimiter() {
        let tokens = tokenize(b"/* hi */X");
        assert_eq!(tokens[0].class, TokenClass::Comment);
        assert_eq!(tokens[0].text_lossy(), "/* hi */");
    }

    #[test]
    fn line_comment_terminates_before_newline() {
        let tokens = tokenize(b"// hi\nX");
        assert_eq!(tokens[0].class, TokenClass::Comment);
        assert_eq!(tokens[0].text_lossy(), "// hi");
        assert_eq!(tokens[1].class, TokenClass::Whitespace);
        assert_eq!(tokens[2].text_lossy(), "X");
    }

    #[test]
    fn escaped_double_quote_collapses_to_single_quote() {
        let tokens = tokenize(br#""He said ""hi""""#);
        assert_eq!(tokens[0].class, TokenClass::String);
        assert_eq!(tokens[0].text_lossy(), r#"He said "hi""#);
    }

    #[test]
    fn backslash_quote_synonym_collapses_to_single_quote() {
        let tokens = tokenize(br#""a\"b""#);
        assert_eq!(tokens[0].text_lossy(), r#"a"b"#);
    }

    #[test]
    fn multiline_string_tracks_line_numbers() {
        let tokens = tokenize(b"\"line1\nline2\"");
        assert_eq!(tokens[0].span.start_line, 1);
        assert_eq!(tokens[0].span.end_line, 2);
    }

    #[test]
    fn every_token_has_non_decreasing_span() {
        let tokens = tokenize(b"/begin PROJECT p \"demo\" /end PROJECT");
        for t in &tokens {
            assert!(t.span.start_line <= t.span.end_line);
            if t.span.start_line == t.span.end_line {
                assert!(t.span.start_col <= t.span.end_col);
            }
        }
    }

    #[test]
    fn slash_not_starting_a_comment_stays_in_a_regular_token() {
        let tokens = tokenize(b"/include \"x.a2l\"");
        assert_eq!(tokens[0].class, TokenClass::Regular);
        assert_eq!(tokens[0].text_lossy(), "/include");
    }

    #[test]
    fn token_class_byte_encoding_round_trips() {
        for class in [
            TokenClass::Regular,
            TokenClass::Whitespace,
            TokenClass::Comment,
            TokenClass::String,
        ] {
            assert_eq!(TokenClass::from_u8(class.as_u8()), Some(class));
        }
    }

    #[test]
    fn span_shift_offsets_both_line_endpoints() {
        let span = Span::new(3, 1, 4, 5);
        let shifted = span.shifted(10);
        assert_eq!((shifted.start_line, shifted.end_line), (13, 14));
        assert_eq!((shifted.start_col, shifted.end_col), (1, 5));
    }
}
