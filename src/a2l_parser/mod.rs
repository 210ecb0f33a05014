//! The A2L parser driver: recursive descent over the static
//! [`crate::schema::SCHEMA_ROOT`] tree, consuming the preprocessor's stored
//! token stream and building a [`ValueContainer`] tree.
//!
//! `/begin KEYWORD` opens a block-shaped schema node; a bare keyword token
//! invokes a flat (single-line) one. Both consume their declared parameter
//! list the same way; only block nodes recurse into nested keywords and
//! expect a matching `/end KEYWORD`. `IF_DATA` is the one keyword whose body
//! this driver does not itself grammar-check: it reads the block's name
//! token, skips the opaque (already-blanked) body up to the literal `/end`,
//! then looks the raw text up in the side-channel [`IfDataStore`] and hands
//! it to [`crate::if_data::parse_if_data`] against the AML grammar
//! discovered earlier in the same file, if any.

use std::fmt;

use crate::aml::AmlFile;
use crate::config::ParserConfig;
use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::preprocessor::ifdata_store::IfDataStore;
use crate::preprocessor::line_map::LineMap;
use crate::preprocessor::token_store::StoredToken;
use crate::schema::keywords::{Parameter, SchemaNode, SCHEMA_ROOT};
use crate::schema::types::PredefinedType;
use crate::tokenizer::{Span, TokenClass};
use crate::value::ValueContainer;

#[derive(Debug, Clone, PartialEq)]
pub enum A2lParseError {
    UnexpectedToken {
        file: String,
        line: usize,
        col: usize,
        found: String,
        expected: Vec<String>,
    },
    UnexpectedEof {
        file: String,
        line: usize,
        col: usize,
        expected: String,
    },
    InvalidParameterValue {
        file: String,
        line: usize,
        col: usize,
        found: String,
        expected_range: String,
    },
    MismatchedEnd {
        file: String,
        line: usize,
        col: usize,
        opened: String,
        found: String,
    },
    IfData {
        file: String,
        line: usize,
        col: usize,
        message: String,
    },
    Io(String),
}

impl fmt::Display for A2lParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            A2lParseError::UnexpectedToken { file, line, col, found, expected } => write!(
                f,
                "{}:{}:{}: unexpected token '{}', expected one of {:?}",
                file, line, col, found, expected
            ),
            A2lParseError::UnexpectedEof { file, line, col, expected } => {
                write!(f, "{}:{}:{}: unexpected end of input, expected {}", file, line, col, expected)
            }
            A2lParseError::InvalidParameterValue { file, line, col, found, expected_range } => write!(
                f,
                "{}:{}:{}: '{}' is not a valid value ({})",
                file, line, col, found, expected_range
            ),
            A2lParseError::MismatchedEnd { file, line, col, opened, found } => write!(
                f,
                "{}:{}:{}: /end {} does not match /begin {}",
                file, line, col, found, opened
            ),
            A2lParseError::IfData { file, line, col, message } => {
                write!(f, "{}:{}:{}: IF_DATA: {}", file, line, col, message)
            }
            A2lParseError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for A2lParseError {}

/// Parses a preprocessed A2L token stream into its `ValueContainer` tree.
///
/// `grammar` is the compiled AML grammar discovered in the same file's
/// `A2ML` block, if any; it is required to interpret `IF_DATA` bodies.
pub fn parse(
    tokens: &[StoredToken],
    if_data: &mut IfDataStore,
    grammar: Option<&AmlFile>,
    config: &ParserConfig,
    line_map: &LineMap,
) -> Result<(ValueContainer, Vec<Diagnostic>), A2lParseError> {
    A2lParser {
        config,
        line_map,
        if_data,
        grammar,
        warnings: Vec::new(),
    }
    .parse(tokens)
}

struct SigTok {
    text: String,
    span: Span,
}

struct Cur<'t> {
    toks: &'t [SigTok],
    pos: usize,
}

impl<'t> Cur<'t> {
    fn peek(&self) -> Option<&'t SigTok> {
        self.toks.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'t SigTok> {
        let t = self.toks.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn last_span(&self) -> Span {
        self.toks
            .get(self.pos.saturating_sub(1))
            .or_else(|| self.toks.last())
            .map(|t| t.span)
            .unwrap_or_else(|| Span::new(1, 1, 1, 1))
    }
}

struct A2lParser<'a> {
    config: &'a ParserConfig,
    line_map: &'a LineMap,
    if_data: &'a mut IfDataStore,
    grammar: Option<&'a AmlFile>,
    warnings: Vec<Diagnostic>,
}

impl<'a> A2lParser<'a> {
    fn parse(mut self, tokens: &[StoredToken]) -> Result<(ValueContainer, Vec<Diagnostic>), A2lParseError> {
        let sig: Vec<SigTok> = tokens
            .iter()
            .filter(|t| !TokenClass::from_u8(t.token_type_id).is_some_and(TokenClass::is_skippable))
            .map(|t| SigTok {
                text: self.config.encoding.decode(&t.payload),
                span: t.span,
            })
            .collect();
        let mut cur = Cur { toks: &sig, pos: 0 };
        let root = self.parse_root(&mut cur)?;
        Ok((root, self.warnings))
    }

    fn pos_of(&self, span: Span) -> (String, usize, usize) {
        match self.line_map.lookup(span.start_line) {
            Some((file, line)) => (file.to_string(), line, span.start_col),
            None => ("<input>".to_string(), span.start_line, span.start_col),
        }
    }

    fn err_unexpected(&self, cur: &Cur, expected: Vec<String>) -> A2lParseError {
        match cur.peek() {
            Some(t) => {
                let (file, line, col) = self.pos_of(t.span);
                A2lParseError::UnexpectedToken { file, line, col, found: t.text.clone(), expected }
            }
            None => self.err_eof(cur, &expected.join(", ")),
        }
    }

    fn err_eof(&self, cur: &Cur, expected: &str) -> A2lParseError {
        let (file, line, col) = self.pos_of(cur.last_span());
        A2lParseError::UnexpectedEof { file, line, col, expected: expected.to_string() }
    }

    fn err_unknown_keyword(&self, cur: &Cur, schema: &SchemaNode) -> A2lParseError {
        let mut expected: Vec<String> = schema.children.keys().map(|k| k.to_string()).collect();
        expected.sort();
        if schema.is_block {
            expected.push("/end".to_string());
        }
        self.err_unexpected(cur, expected)
    }

    fn err_bad_value(&self, cur: &Cur, found: &str, ty: PredefinedType) -> A2lParseError {
        let (file, line, col) = self.pos_of(cur.last_span());
        A2lParseError::InvalidParameterValue {
            file,
            line,
            col,
            found: found.to_string(),
            expected_range: ty.valid_range(),
        }
    }

    fn parse_root(&mut self, cur: &mut Cur) -> Result<ValueContainer, A2lParseError> {
        let mut root = ValueContainer::new(SCHEMA_ROOT.name);
        loop {
            match cur.peek() {
                None => return Ok(root),
                Some(t) if t.text == "/begin" => {
                    let child = self.parse_begin_block(&SCHEMA_ROOT, cur)?;
                    root.keywords.push(child);
                }
                Some(t) => {
                    let name = t.text.clone();
                    match SCHEMA_ROOT.child(&name) {
                        Some(schema) if !schema.is_block => {
                            cur.bump();
                            let child = self.parse_flat_node(schema, cur)?;
                            root.keywords.push(child);
                        }
                        _ => return Err(self.err_unknown_keyword(cur, &SCHEMA_ROOT)),
                    }
                }
            }
        }
    }

    fn parse_flat_node(&mut self, schema: &SchemaNode, cur: &mut Cur) -> Result<ValueContainer, A2lParseError> {
        let mut container = ValueContainer::new(schema.name);
        self.consume_parameters(schema, &mut container, cur)?;
        Ok(container)
    }

    fn parse_begin_block(&mut self, parent: &SchemaNode, cur: &mut Cur) -> Result<ValueContainer, A2lParseError> {
        let begin_span = cur.bump().expect("caller already peeked /begin").span;
        let name_tok_text;
        match cur.bump() {
            Some(t) => {
                name_tok_text = t.text.clone();
            }
            None => return Err(self.err_eof(cur, "keyword after /begin")),
        }

        let schema = match parent.child(&name_tok_text) {
            Some(s) if s.is_block => s,
            _ => return Err(self.err_unknown_keyword(cur, parent)),
        };

        let mut container = ValueContainer::new(schema.name);

        if schema.name == "IF_DATA" {
            self.consume_if_data_body(begin_span, &mut container, cur)?;
        } else {
            self.consume_parameters(schema, &mut container, cur)?;
            loop {
                match cur.peek() {
                    None => return Err(self.err_eof(cur, "/end")),
                    Some(t) if t.text == "/end" => break,
                    Some(t) if t.text == "/begin" => {
                        let child = self.parse_begin_block(schema, cur)?;
                        container.keywords.push(child);
                    }
                    Some(t) => {
                        let child_name = t.text.clone();
                        match schema.child(&child_name) {
                            Some(child_schema) if !child_schema.is_block => {
                                cur.bump();
                                let child = self.parse_flat_node(child_schema, cur)?;
                                container.keywords.push(child);
                            }
                            _ => return Err(self.err_unknown_keyword(cur, schema)),
                        }
                    }
                }
            }
        }

        cur.bump(); // "/end"
        match cur.bump() {
            Some(end_name) if end_name.text == schema.name => {}
            Some(end_name) => {
                let (file, line, col) = self.pos_of(end_name.span);
                return Err(A2lParseError::MismatchedEnd {
                    file,
                    line,
                    col,
                    opened: schema.name.to_string(),
                    found: end_name.text.clone(),
                });
            }
            None => return Err(self.err_eof(cur, "keyword after /end")),
        }
        Ok(container)
    }

    fn consume_parameters(
        &mut self,
        schema: &SchemaNode,
        container: &mut ValueContainer,
        cur: &mut Cur,
    ) -> Result<(), A2lParseError> {
        for param in &schema.parameters {
            match param {
                Parameter::Simple { ty, repeats, .. } => {
                    if *repeats {
                        loop {
                            let Some(t) = cur.peek() else { break };
                            if t.text == "/begin" || t.text == "/end" {
                                break;
                            }
                            match ty.validate(&t.text) {
                                Some(v) => {
                                    container.multiple_values.push(v);
                                    cur.bump();
                                }
                                None => break,
                            }
                        }
                    } else {
                        let t = cur.bump().ok_or_else(|| self.err_eof(cur, "parameter"))?;
                        let text = t.text.clone();
                        let value = ty
                            .validate(&text)
                            .ok_or_else(|| self.err_bad_value(cur, &text, *ty))?;
                        container.parameters.push(value);
                    }
                }
                Parameter::Tuple { counter_name, elements } => {
                    // The counter already went through the stream as its own
                    // preceding `Simple` parameter; look its value up in
                    // `container.parameters` by position instead of reading a
                    // second token, since the wire syntax only states the
                    // count once.
                    let count_index = schema
                        .parameters
                        .iter()
                        .take_while(|p| !matches!(p, Parameter::Simple { name, .. } if name == counter_name))
                        .filter(|p| matches!(p, Parameter::Simple { repeats: false, .. }))
                        .count();
                    let count = container
                        .parameters
                        .get(count_index)
                        .and_then(|v| v.as_uint())
                        .ok_or_else(|| self.err_eof(cur, "tuple counter value"))?;
                    for _ in 0..count {
                        for (_, elem_ty) in elements {
                            let t = cur.bump().ok_or_else(|| self.err_eof(cur, "tuple element"))?;
                            let text = t.text.clone();
                            let value = elem_ty
                                .validate(&text)
                                .ok_or_else(|| self.err_bad_value(cur, &text, *elem_ty))?;
                            container.multiple_values.push(value);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// `begin_span` is the position of the `/begin` token that opened this
    /// `IF_DATA` block, the key [`IfDataStore`] indexed it under.
    fn consume_if_data_body(
        &mut self,
        begin_span: Span,
        container: &mut ValueContainer,
        cur: &mut Cur,
    ) -> Result<(), A2lParseError> {
        let name_tok = cur.bump().ok_or_else(|| self.err_eof(cur, "IF_DATA name"))?;
        container
            .parameters
            .push(crate::value::AsamValue::Str(name_tok.text.clone()));

        loop {
            match cur.peek() {
                None => return Err(self.err_eof(cur, "/end IF_DATA")),
                Some(t) if t.text == "/end" => break,
                Some(_) => {
                    cur.bump();
                }
            }
        }

        let key = (begin_span.start_line, begin_span.start_col);
        let raw = self
            .if_data
            .get(key)
            .map_err(|e| A2lParseError::Io(e.to_string()))?;
        let Some(bytes) = raw else {
            return Ok(());
        };
        let text = self.config.encoding.decode(&bytes);
        let (file, line, col) = self.pos_of(begin_span);

        match self.grammar {
            Some(grammar) => match crate::if_data::parse_if_data(&text, grammar) {
                Ok(value) => container.if_data = Some(value),
                Err(e) => {
                    if self.config.strict_if_data {
                        return Err(A2lParseError::IfData { file, line, col, message: e.to_string() });
                    }
                    self.warnings
                        .push(Diagnostic::new(file, line, col, DiagnosticKind::IfData, e.to_string()));
                }
            },
            None => {
                let message = "no AML grammar available to interpret this IF_DATA block".to_string();
                if self.config.strict_if_data {
                    return Err(A2lParseError::IfData { file, line, col, message });
                }
                self.warnings.push(Diagnostic::new(file, line, col, DiagnosticKind::IfData, message));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocessor::Preprocessor;
    use std::io::Write;

    fn run(src: &str, config: &ParserConfig) -> Result<(ValueContainer, Vec<Diagnostic>), A2lParseError> {
        let mut file = tempfile::Builder::new().suffix(".a2l").tempfile().unwrap();
        file.write_all(src.as_bytes()).unwrap();
        let pre = Preprocessor::new(config);
        let mut result = pre.process(file.path()).unwrap();
        let tokens = result.tokens.read_all().unwrap();
        parse(&tokens, &mut result.if_data, None, config, &result.line_map)
    }

    #[test]
    fn parses_a_minimal_project_with_a_nested_module() {
        let config = ParserConfig::default();
        let (root, warnings) = run(
            "ASAP2_VERSION 1 60\n\
             /begin PROJECT P \"proj\"\n\
             /begin MODULE M \"mod\"\n\
             /end MODULE\n\
             /end PROJECT\n",
            &config,
        )
        .unwrap();
        assert!(warnings.is_empty());
        assert!(root.child("ASAP2_VERSION").is_some());
        let project = root.child("PROJECT").unwrap();
        assert_eq!(project.parameters[0].as_str(), Some("P"));
        assert!(project.child("MODULE").is_some());
    }

    #[test]
    fn rejects_an_unknown_keyword() {
        let config = ParserConfig::default();
        let err = run("BOGUS_KEYWORD 1\n", &config).unwrap_err();
        assert!(matches!(err, A2lParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn rejects_an_out_of_range_parameter() {
        let config = ParserConfig::default();
        let err = run("ASAP2_VERSION 999999 60\n", &config).unwrap_err();
        assert!(matches!(err, A2lParseError::InvalidParameterValue { .. }));
    }

    #[test]
    fn rejects_a_mismatched_end_keyword() {
        let config = ParserConfig::default();
        let err = run(
            "/begin PROJECT P \"proj\"\n/end MODULE\n",
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, A2lParseError::MismatchedEnd { .. }));
    }

    #[test]
    fn reports_premature_end_of_file() {
        let config = ParserConfig::default();
        let err = run("/begin PROJECT P \"proj\"\n", &config).unwrap_err();
        assert!(matches!(err, A2lParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn unresolvable_if_data_without_a_grammar_is_a_lenient_warning() {
        let config = ParserConfig::default();
        let (root, warnings) = run(
            "/begin PROJECT P \"proj\"\n\
             /begin MODULE M \"mod\"\n\
             /begin IF_DATA XCP some raw payload here /end IF_DATA\n\
             /end MODULE\n\
             /end PROJECT\n",
            &config,
        )
        .unwrap();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, DiagnosticKind::IfData);
        let module = root.child("PROJECT").unwrap().child("MODULE").unwrap();
        let if_data = module.child("IF_DATA").unwrap();
        assert!(if_data.if_data.is_none());
        assert_eq!(if_data.parameters[0].as_str(), Some("XCP"));
    }

    #[test]
    fn unresolvable_if_data_is_fatal_under_strict_mode() {
        let mut config = ParserConfig::default();
        config.strict_if_data = true;
        let err = run(
            "/begin PROJECT P \"proj\"\n\
             /begin MODULE M \"mod\"\n\
             /begin IF_DATA XCP some raw payload here /end IF_DATA\n\
             /end MODULE\n\
             /end PROJECT\n",
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, A2lParseError::IfData { .. }));
    }
}
