//! Lexer for the AML text blob: keywords (`/begin`, `/end`, `block`, `enum`,
//! `taggedstruct`, `taggedunion`, `struct`), the eleven predefined-type
//! names, quoted tags, numeric literals, identifiers, and punctuation.

use std::fmt;

use super::ast::AmlPredefinedType;

#[derive(Debug, Clone, PartialEq)]
pub enum AmlTokenKind {
    Ident,
    Float,
    Int,
    /// Never constructed: comments are elided during lexing, like whitespace.
    Comment,
    Tag,
    Begin,
    End,
    Enum,
    Struct,
    TaggedStruct,
    TaggedUnion,
    PredefinedType(AmlPredefinedType),
    Block,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LSq,
    RSq,
    Eq,
    Semi,
    Comma,
    Star,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AmlToken {
    pub kind: AmlTokenKind,
    /// Raw text for idents/tags, the literal spelling for numbers.
    pub text: String,
    pub int_value: Option<i64>,
    pub float_value: Option<f64>,
    pub pos: usize,
}

impl AmlToken {
    fn simple(kind: AmlTokenKind, text: impl Into<String>, pos: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            int_value: None,
            float_value: None,
            pos,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AmlLexError {
    UnterminatedTag { pos: usize },
    UnterminatedComment { pos: usize },
    InvalidNumber { pos: usize, text: String },
}

impl fmt::Display for AmlLexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmlLexError::UnterminatedTag { pos } => write!(f, "unterminated tag at offset {}", pos),
            AmlLexError::UnterminatedComment { pos } => {
                write!(f, "unterminated comment at offset {}", pos)
            }
            AmlLexError::InvalidNumber { pos, text } => {
                write!(f, "invalid numeric literal '{}' at offset {}", text, pos)
            }
        }
    }
}

impl std::error::Error for AmlLexError {}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn aml_lex(input: &str) -> Result<Vec<AmlToken>, AmlLexError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'*') {
            let start = i;
            i += 2;
            loop {
                if i >= chars.len() {
                    return Err(AmlLexError::UnterminatedComment { pos: start });
                }
                if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                    i += 2;
                    break;
                }
                i += 1;
            }
            continue;
        }
        if c == '/' && chars.get(i + 1) == Some(&'/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
            continue;
        }
        if c == '/' && matches_keyword_at(&chars, i + 1, "begin") {
            tokens.push(AmlToken::simple(AmlTokenKind::Begin, "/begin", i));
            i += 1 + "begin".len();
            continue;
        }
        if c == '/' && matches_keyword_at(&chars, i + 1, "end") {
            tokens.push(AmlToken::simple(AmlTokenKind::End, "/end", i));
            i += 1 + "end".len();
            continue;
        }
        if c == '"' {
            let start = i;
            i += 1;
            let tag_start = i;
            while i < chars.len() && chars[i] != '"' {
                i += 1;
            }
            if i >= chars.len() {
                return Err(AmlLexError::UnterminatedTag { pos: start });
            }
            let tag: String = chars[tag_start..i].iter().collect();
            i += 1; // closing quote
            tokens.push(AmlToken::simple(AmlTokenKind::Tag, tag, start));
            continue;
        }
        match c {
            '{' => {
                tokens.push(AmlToken::simple(AmlTokenKind::LBrace, "{", i));
                i += 1;
                continue;
            }
            '}' => {
                tokens.push(AmlToken::simple(AmlTokenKind::RBrace, "}", i));
                i += 1;
                continue;
            }
            '(' => {
                tokens.push(AmlToken::simple(AmlTokenKind::LParen, "(", i));
                i += 1;
                continue;
            }
            ')' => {
                tokens.push(AmlToken::simple(AmlTokenKind::RParen, ")", i));
                i += 1;
                continue;
            }
            '[' => {
                tokens.push(AmlToken::simple(AmlTokenKind::LSq, "[", i));
                i += 1;
                continue;
            }
            ']' => {
                tokens.push(AmlToken::simple(AmlTokenKind::RSq, "]", i));
                i += 1;
                continue;
            }
            '=' => {
                tokens.push(AmlToken::simple(AmlTokenKind::Eq, "=", i));
                i += 1;
                continue;
            }
            ';' => {
                tokens.push(AmlToken::simple(AmlTokenKind::Semi, ";", i));
                i += 1;
                continue;
            }
            ',' => {
                tokens.push(AmlToken::simple(AmlTokenKind::Comma, ",", i));
                i += 1;
                continue;
            }
            '*' => {
                tokens.push(AmlToken::simple(AmlTokenKind::Star, "*", i));
                i += 1;
                continue;
            }
            _ => {}
        }
        if c.is_ascii_digit() || ((c == '-' || c == '+') && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) {
            let (token, next) = scan_number(&chars, i)?;
            tokens.push(token);
            i = next;
            continue;
        }
        if is_ident_start(c) {
            let start = i;
            let mut j = i + 1;
            while j < chars.len() && is_ident_continue(chars[j]) {
                j += 1;
            }
            let word: String = chars[start..j].iter().collect();
            let kind = classify_word(&word);
            tokens.push(AmlToken::simple(kind, word, start));
            i = j;
            continue;
        }
        // Unrecognized byte: treat as a one-character identifier fragment
        // rather than failing the whole lex; the parser will reject it in
        // context with a precise error.
        tokens.push(AmlToken::simple(AmlTokenKind::Ident, c.to_string(), i));
        i += 1;
    }

    Ok(tokens)
}

fn matches_keyword_at(chars: &[char], start: usize, word: &str) -> bool {
    let word_chars: Vec<char> = word.chars().collect();
    let end = start + word_chars.len();
    if end > chars.len() {
        return false;
    }
    if chars[start..end] != word_chars[..] {
        return false;
    }
    !chars.get(end).is_some_and(|c| is_ident_continue(*c))
}

fn classify_word(word: &str) -> AmlTokenKind {
    match word {
        "enum" => AmlTokenKind::Enum,
        "struct" => AmlTokenKind::Struct,
        "taggedstruct" => AmlTokenKind::TaggedStruct,
        "taggedunion" => AmlTokenKind::TaggedUnion,
        "block" => AmlTokenKind::Block,
        _ => match AmlPredefinedType::from_keyword(word) {
            Some(pdt) => AmlTokenKind::PredefinedType(pdt),
            None => AmlTokenKind::Ident,
        },
    }
}

fn scan_number(chars: &[char], start: usize) -> Result<(AmlToken, usize), AmlLexError> {
    let mut i = start;
    if matches!(chars.get(i), Some('-') | Some('+')) {
        i += 1;
    }
    if chars.get(i) == Some(&'0') && matches!(chars.get(i + 1), Some('x') | Some('X')) {
        let hex_start = i + 2;
        let mut j = hex_start;
        while j < chars.len() && chars[j].is_ascii_hexdigit() {
            j += 1;
        }
        let text: String = chars[start..j].iter().collect();
        let hex_digits: String = chars[hex_start..j].iter().collect();
        let value = i64::from_str_radix(&hex_digits, 16)
            .map_err(|_| AmlLexError::InvalidNumber { pos: start, text: text.clone() })?;
        let value = if chars.get(start) == Some(&'-') { -value } else { value };
        return Ok((
            AmlToken {
                kind: AmlTokenKind::Int,
                text,
                int_value: Some(value),
                float_value: None,
                pos: start,
            },
            j,
        ));
    }
    let mut j = i;
    while j < chars.len() && chars[j].is_ascii_digit() {
        j += 1;
    }
    let mut is_float = false;
    if chars.get(j) == Some(&'.') {
        is_float = true;
        j += 1;
        while j < chars.len() && chars[j].is_ascii_digit() {
            j += 1;
        }
    }
    if matches!(chars.get(j), Some('e') | Some('E')) {
        is_float = true;
        j += 1;
        if matches!(chars.get(j), Some('-') | Some('+')) {
            j += 1;
        }
        while j < chars.len() && chars[j].is_ascii_digit() {
            j += 1;
        }
    }
    let text: String = chars[start..j].iter().collect();
    if is_float {
        let value = text
            .parse::<f64>()
            .map_err(|_| AmlLexError::InvalidNumber { pos: start, text: text.clone() })?;
        Ok((
            AmlToken {
                kind: AmlTokenKind::Float,
                text,
                int_value: None,
                float_value: Some(value),
                pos: start,
            },
            j,
        ))
    } else {
        let value = text
            .parse::<i64>()
            .map_err(|_| AmlLexError::InvalidNumber { pos: start, text: text.clone() })?;
        Ok((
            AmlToken {
                kind: AmlTokenKind::Int,
                text,
                int_value: Some(value),
                float_value: None,
                pos: start,
            },
            j,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[AmlToken]) -> Vec<AmlTokenKind> {
        tokens.iter().map(|t| t.kind.clone()).collect()
    }

    #[test]
    fn recognizes_begin_end_and_struct_keyword() {
        let tokens = aml_lex("/begin IF_DATA struct X { int a; }; /end IF_DATA").unwrap();
        assert_eq!(tokens[0].kind, AmlTokenKind::Begin);
        assert!(kinds(&tokens).contains(&AmlTokenKind::Struct));
        assert_eq!(tokens.last().unwrap().kind, AmlTokenKind::End);
    }

    #[test]
    fn recognizes_all_eleven_predefined_types() {
        for t in AmlPredefinedType::ALL {
            let tokens = aml_lex(t.keyword()).unwrap();
            assert_eq!(tokens[0].kind, AmlTokenKind::PredefinedType(t));
        }
    }

    #[test]
    fn quoted_tag_strips_quotes() {
        let tokens = aml_lex("\"XCP\"").unwrap();
        assert_eq!(tokens[0].kind, AmlTokenKind::Tag);
        assert_eq!(tokens[0].text, "XCP");
    }

    #[test]
    fn hex_and_decimal_integers_parse_to_the_same_value() {
        let hex = aml_lex("0x10").unwrap();
        let dec = aml_lex("16").unwrap();
        assert_eq!(hex[0].int_value, Some(16));
        assert_eq!(dec[0].int_value, Some(16));
    }

    #[test]
    fn negative_and_exponent_floats_parse() {
        let tokens = aml_lex("-3.5e2").unwrap();
        assert_eq!(tokens[0].kind, AmlTokenKind::Float);
        assert_eq!(tokens[0].float_value, Some(-350.0));
    }

    #[test]
    fn array_brackets_and_punctuation_tokenize_individually() {
        let tokens = aml_lex("int[4][2];").unwrap();
        assert_eq!(
            kinds(&tokens),
            vec![
                AmlTokenKind::PredefinedType(AmlPredefinedType::Int),
                AmlTokenKind::LSq,
                AmlTokenKind::Int,
                AmlTokenKind::RSq,
                AmlTokenKind::LSq,
                AmlTokenKind::Int,
                AmlTokenKind::RSq,
                AmlTokenKind::Semi,
            ]
        );
    }
}
