//! Interprets a stored `IF_DATA` block's raw text against an AML grammar
//! reconstructed via [`crate::aml::unmarshal`] (or produced directly by
//! [`crate::aml::compile`]).
//!
//! The source stubs the `struct_type`, `enumeration_type`, and `pdt_type`
//! descent branches; per the spec's Open Question resolution (§9.1) they are
//! fully implemented here rather than replicated as gaps.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::aml::ast::*;
use crate::tokenizer::{tokenize, TokenClass};
use crate::value::AsamValue;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IfDataValue {
    Scalar(AsamValue),
    Array(Vec<AsamValue>),
    Enum(String),
    Struct(Vec<IfDataValue>),
    TaggedStruct(Vec<(String, IfDataValue)>),
    TaggedUnion(String, Box<IfDataValue>),
    Block { tag: String, values: Vec<IfDataValue> },
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IfDataError {
    MissingIfDataBlock,
    UnresolvedReferrer { category: &'static str, name: String },
    UnexpectedEnd { expected: &'static str },
    UnexpectedTag { found: String },
    MalformedNumber { text: String },
    UnknownEnumerator { text: String },
    MismatchedBlockEnd { expected: String, found: String },
}

impl fmt::Display for IfDataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IfDataError::MissingIfDataBlock => {
                write!(f, "AML grammar has no block declaration tagged IF_DATA")
            }
            IfDataError::UnresolvedReferrer { category, name } => {
                write!(f, "unresolved {} referrer '{}'", category, name)
            }
            IfDataError::UnexpectedEnd { expected } => {
                write!(f, "unexpected end of IF_DATA text, expected {}", expected)
            }
            IfDataError::UnexpectedTag { found } => write!(f, "unexpected tag '{}'", found),
            IfDataError::MalformedNumber { text } => write!(f, "malformed numeric literal '{}'", text),
            IfDataError::UnknownEnumerator { text } => write!(f, "unknown enumerator literal '{}'", text),
            IfDataError::MismatchedBlockEnd { expected, found } => {
                write!(f, "/end {} does not match /begin {}", found, expected)
            }
        }
    }
}

impl std::error::Error for IfDataError {}

/// Lexes and interprets `text` (a stored IF_DATA block's raw payload) against
/// the AML block declaration tagged `IF_DATA` in `grammar`.
pub fn parse_if_data(text: &str, grammar: &AmlFile) -> Result<IfDataValue, IfDataError> {
    let root = grammar
        .declarations
        .iter()
        .find_map(|d| match d {
            Declaration::Block(b) if b.tag == "IF_DATA" => Some(b),
            _ => None,
        })
        .ok_or(IfDataError::MissingIfDataBlock)?;
    let ty = root.ty.as_ref().ok_or(IfDataError::MissingIfDataBlock)?;

    let index = GrammarIndex::build(grammar);
    let sig_tokens = significant_tokens(text);
    let mut cursor = Cursor {
        toks: &sig_tokens,
        pos: 0,
    };
    interpret_type(ty, &mut cursor, &index)
}

struct SigTok {
    text: String,
    class: TokenClass,
}

fn significant_tokens(text: &str) -> Vec<SigTok> {
    tokenize(text.as_bytes())
        .into_iter()
        .filter(|t| !t.class.is_skippable())
        .map(|t| SigTok {
            text: t.text_lossy(),
            class: t.class,
        })
        .collect()
}

struct Cursor<'t> {
    toks: &'t [SigTok],
    pos: usize,
}

impl<'t> Cursor<'t> {
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

    fn at_end_keyword(&self) -> bool {
        self.peek().is_some_and(|t| t.text == "/end")
    }

    fn expect_text(&mut self, expected: &'static str) -> Result<(), IfDataError> {
        match self.bump() {
            Some(t) if t.text == expected => Ok(()),
            _ => Err(IfDataError::UnexpectedEnd { expected }),
        }
    }
}

struct GrammarIndex<'a> {
    structs: HashMap<&'a str, &'a Struct>,
    tagged_structs: HashMap<&'a str, &'a TaggedStruct>,
    tagged_unions: HashMap<&'a str, &'a TaggedUnion>,
    enums: HashMap<&'a str, &'a Enumeration>,
}

impl<'a> GrammarIndex<'a> {
    fn build(file: &'a AmlFile) -> Self {
        let mut index = GrammarIndex {
            structs: HashMap::new(),
            tagged_structs: HashMap::new(),
            tagged_unions: HashMap::new(),
            enums: HashMap::new(),
        };
        for decl in &file.declarations {
            index.visit_declaration(decl);
        }
        index
    }

    fn visit_declaration(&mut self, decl: &'a Declaration) {
        match decl {
            Declaration::Block(b) => self.visit_block(b),
            Declaration::Type(t) => self.visit_type(t),
        }
    }

    fn visit_type(&mut self, ty: &'a Type) {
        match ty {
            Type::Predefined(_) => {}
            Type::Enum(EnumerationOrReferrer::Enumeration(e)) => {
                if let Some(name) = &e.name {
                    self.enums.insert(name.as_str(), e);
                }
            }
            Type::Enum(EnumerationOrReferrer::Referrer(_)) => {}
            Type::Struct(StructOrReferrer::Struct(s)) => {
                if let Some(name) = &s.name {
                    self.structs.insert(name.as_str(), s);
                }
                for member in &s.members {
                    self.visit_member(member);
                }
            }
            Type::Struct(StructOrReferrer::Referrer(_)) => {}
            Type::TaggedStruct(TaggedStructOrReferrer::TaggedStruct(ts)) => {
                if let Some(name) = &ts.name {
                    self.tagged_structs.insert(name.as_str(), ts);
                }
                for (_, member) in &ts.members {
                    match &member.inner {
                        TaggedStructMemberInner::Block(b) => self.visit_block(b),
                        TaggedStructMemberInner::Definition(d) => {
                            if let Some(m) = &d.member {
                                self.visit_member(m);
                            }
                        }
                    }
                }
            }
            Type::TaggedStruct(TaggedStructOrReferrer::Referrer(_)) => {}
            Type::TaggedUnion(TaggedUnionOrReferrer::TaggedUnion(tu)) => {
                if let Some(name) = &tu.name {
                    self.tagged_unions.insert(name.as_str(), tu);
                }
                for (_, member) in &tu.members {
                    if let Some(m) = &member.member {
                        self.visit_member(m);
                    }
                    if let Some(b) = &member.block {
                        self.visit_block(b);
                    }
                }
            }
            Type::TaggedUnion(TaggedUnionOrReferrer::Referrer(_)) => {}
        }
    }

    fn visit_member(&mut self, member: &'a Member) {
        if let Some(ty) = &member.ty {
            self.visit_type(ty);
        }
        if let Some(block) = &member.block {
            self.visit_block(block);
        }
    }

    fn visit_block(&mut self, block: &'a BlockDefinition) {
        if let Some(ty) = &block.ty {
            self.visit_type(ty);
        }
    }

    fn resolve_struct(&self, sr: &'a StructOrReferrer) -> Result<&'a Struct, IfDataError> {
        match sr {
            StructOrReferrer::Struct(s) => Ok(s),
            StructOrReferrer::Referrer(r) => {
                self.structs
                    .get(r.name.as_str())
                    .copied()
                    .ok_or(IfDataError::UnresolvedReferrer {
                        category: "struct",
                        name: r.name.clone(),
                    })
            }
        }
    }

    fn resolve_tagged_struct(&self, tr: &'a TaggedStructOrReferrer) -> Result<&'a TaggedStruct, IfDataError> {
        match tr {
            TaggedStructOrReferrer::TaggedStruct(ts) => Ok(ts),
            TaggedStructOrReferrer::Referrer(r) => self
                .tagged_structs
                .get(r.name.as_str())
                .copied()
                .ok_or(IfDataError::UnresolvedReferrer {
                    category: "taggedstruct",
                    name: r.name.clone(),
                }),
        }
    }

    fn resolve_tagged_union(&self, tr: &'a TaggedUnionOrReferrer) -> Result<&'a TaggedUnion, IfDataError> {
        match tr {
            TaggedUnionOrReferrer::TaggedUnion(tu) => Ok(tu),
            TaggedUnionOrReferrer::Referrer(r) => self
                .tagged_unions
                .get(r.name.as_str())
                .copied()
                .ok_or(IfDataError::UnresolvedReferrer {
                    category: "taggedunion",
                    name: r.name.clone(),
                }),
        }
    }

    fn resolve_enum(&self, er: &'a EnumerationOrReferrer) -> Result<&'a Enumeration, IfDataError> {
        match er {
            EnumerationOrReferrer::Enumeration(e) => Ok(e),
            EnumerationOrReferrer::Referrer(r) => {
                self.enums
                    .get(r.name.as_str())
                    .copied()
                    .ok_or(IfDataError::UnresolvedReferrer {
                        category: "enum",
                        name: r.name.clone(),
                    })
            }
        }
    }
}

fn interpret_type(ty: &Type, cursor: &mut Cursor, index: &GrammarIndex) -> Result<IfDataValue, IfDataError> {
    match ty {
        Type::Predefined(pdt) => interpret_predefined(pdt, cursor),
        Type::Enum(er) => interpret_enum(er, cursor, index),
        Type::Struct(sr) => interpret_struct(sr, cursor, index),
        Type::TaggedStruct(tr) => interpret_tagged_struct(tr, cursor, index),
        Type::TaggedUnion(tr) => interpret_tagged_union(tr, cursor, index),
    }
}

fn interpret_predefined(pdt: &PredefinedType, cursor: &mut Cursor) -> Result<IfDataValue, IfDataError> {
    let count: u32 = pdt.array_spec.iter().product::<u32>().max(1);
    if pdt.array_spec.is_empty() {
        Ok(IfDataValue::Scalar(read_scalar(pdt.base, cursor)?))
    } else {
        let mut values = Vec::with_capacity(count as usize);
        for _ in 0..count {
            values.push(read_scalar(pdt.base, cursor)?);
        }
        Ok(IfDataValue::Array(values))
    }
}

fn read_scalar(base: AmlPredefinedType, cursor: &mut Cursor) -> Result<AsamValue, IfDataError> {
    let tok = cursor.bump().ok_or(IfDataError::UnexpectedEnd { expected: "value" })?;
    let text = tok.text.as_str();
    match base {
        AmlPredefinedType::Double | AmlPredefinedType::Float | AmlPredefinedType::Float16 => text
            .parse::<f64>()
            .map(AsamValue::Float)
            .map_err(|_| IfDataError::MalformedNumber { text: text.to_string() }),
        AmlPredefinedType::UChar | AmlPredefinedType::UInt | AmlPredefinedType::ULong | AmlPredefinedType::UInt64 => {
            parse_int(text)
                .filter(|v| *v >= 0)
                .map(|v| AsamValue::UInt(v as u64))
                .ok_or_else(|| IfDataError::MalformedNumber { text: text.to_string() })
        }
        AmlPredefinedType::Char | AmlPredefinedType::Int | AmlPredefinedType::Long | AmlPredefinedType::Int64 => {
            parse_int(text)
                .map(AsamValue::Int)
                .ok_or_else(|| IfDataError::MalformedNumber { text: text.to_string() })
        }
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let (sign, rest) = match text.strip_prefix('-') {
        Some(rest) => (-1i64, rest),
        None => (1i64, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        rest.parse::<i64>().ok()?
    };
    Some(sign * magnitude)
}

fn interpret_enum(er: &EnumerationOrReferrer, cursor: &mut Cursor, index: &GrammarIndex) -> Result<IfDataValue, IfDataError> {
    let e = index.resolve_enum(er)?;
    let tok = cursor.bump().ok_or(IfDataError::UnexpectedEnd { expected: "enumerator" })?;
    if e.enumerators.iter().any(|en| en.tag == tok.text) {
        Ok(IfDataValue::Enum(tok.text.clone()))
    } else {
        Err(IfDataError::UnknownEnumerator { text: tok.text.clone() })
    }
}

fn interpret_struct(sr: &StructOrReferrer, cursor: &mut Cursor, index: &GrammarIndex) -> Result<IfDataValue, IfDataError> {
    let s = index.resolve_struct(sr)?;
    let mut values = Vec::with_capacity(s.members.len());
    for member in &s.members {
        values.push(interpret_member(member, cursor, index)?);
    }
    Ok(IfDataValue::Struct(values))
}

fn interpret_member(member: &Member, cursor: &mut Cursor, index: &GrammarIndex) -> Result<IfDataValue, IfDataError> {
    if member.is_empty() {
        return Ok(IfDataValue::Empty);
    }
    if let Some(ty) = &member.ty {
        interpret_type(ty, cursor, index)
    } else if let Some(block) = &member.block {
        interpret_block(block, cursor, index)
    } else {
        Ok(IfDataValue::Empty)
    }
}

fn interpret_block(block: &BlockDefinition, cursor: &mut Cursor, index: &GrammarIndex) -> Result<IfDataValue, IfDataError> {
    cursor.expect_text("/begin")?;
    let tag_tok = cursor.bump().ok_or(IfDataError::UnexpectedEnd { expected: "block tag" })?;
    if tag_tok.text != block.tag {
        return Err(IfDataError::UnexpectedTag { found: tag_tok.text.clone() });
    }
    let ty = block.ty.as_ref().ok_or(IfDataError::UnexpectedEnd { expected: "block body type" })?;

    let mut values = Vec::new();
    if block.multiple {
        while !cursor.at_end_keyword() {
            values.push(interpret_type(ty, cursor, index)?);
        }
    } else {
        values.push(interpret_type(ty, cursor, index)?);
    }

    cursor.expect_text("/end")?;
    let end_tag = cursor.bump().ok_or(IfDataError::UnexpectedEnd { expected: "end tag" })?;
    if end_tag.text != block.tag {
        return Err(IfDataError::MismatchedBlockEnd {
            expected: block.tag.clone(),
            found: end_tag.text.clone(),
        });
    }
    Ok(IfDataValue::Block {
        tag: block.tag.clone(),
        values,
    })
}

fn interpret_tagged_struct(tr: &TaggedStructOrReferrer, cursor: &mut Cursor, index: &GrammarIndex) -> Result<IfDataValue, IfDataError> {
    let ts = index.resolve_tagged_struct(tr)?;
    let mut values = Vec::new();
    loop {
        match cursor.peek() {
            None => break,
            Some(t) if t.text == "/end" => break,
            Some(t) if t.text == "/begin" => {
                cursor.bump();
                let tag_tok = cursor.bump().ok_or(IfDataError::UnexpectedEnd { expected: "block tag" })?;
                let tag = tag_tok.text.clone();
                let found = ts.members.iter().find(|(k, m)| {
                    *k == tag && matches!(m.inner, TaggedStructMemberInner::Block(_))
                });
                let Some((_, member)) = found else {
                    return Err(IfDataError::UnexpectedTag { found: tag });
                };
                let TaggedStructMemberInner::Block(block) = &member.inner else {
                    unreachable!()
                };
                cursor.pos -= 2; // rewind so interpret_block sees /begin TAG itself
                let value = interpret_block(block, cursor, index)?;
                values.push((tag, value));
            }
            Some(t) => {
                let tag = t.text.clone();
                let found = ts
                    .members
                    .iter()
                    .find(|(k, m)| *k == tag && matches!(m.inner, TaggedStructMemberInner::Definition(_)));
                let Some((_, member)) = found else {
                    break;
                };
                cursor.bump();
                let TaggedStructMemberInner::Definition(def) = &member.inner else {
                    unreachable!()
                };
                let value = match &def.member {
                    Some(inner) => interpret_member(inner, cursor, index)?,
                    None => IfDataValue::Empty,
                };
                values.push((tag, value));
            }
        }
    }
    Ok(IfDataValue::TaggedStruct(values))
}

fn interpret_tagged_union(tr: &TaggedUnionOrReferrer, cursor: &mut Cursor, index: &GrammarIndex) -> Result<IfDataValue, IfDataError> {
    let tu = index.resolve_tagged_union(tr)?;
    let is_block_form = cursor.peek().is_some_and(|t| t.text == "/begin");
    let tag = if is_block_form {
        cursor
            .toks
            .get(cursor.pos + 1)
            .map(|t| t.text.clone())
            .ok_or(IfDataError::UnexpectedEnd { expected: "block tag" })?
    } else {
        cursor
            .peek()
            .map(|t| t.text.clone())
            .ok_or(IfDataError::UnexpectedEnd { expected: "union tag" })?
    };

    let found = tu.members.iter().find(|(k, _)| *k == tag);
    let Some((_, member)) = found else {
        return Err(IfDataError::UnexpectedTag { found: tag });
    };

    let value = if let Some(block) = &member.block {
        interpret_block(block, cursor, index)?
    } else {
        cursor.bump(); // bare tag token
        match &member.member {
            Some(inner) => interpret_member(inner, cursor, index)?,
            None => IfDataValue::Empty,
        }
    };
    Ok(IfDataValue::TaggedUnion(tag, Box::new(value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aml::compile;

    fn grammar(src: &str) -> AmlFile {
        compile(src).unwrap()
    }

    #[test]
    fn interprets_a_flat_struct_body() {
        let g = grammar("/begin IF_DATA block \"IF_DATA\" struct { uint; uint; } /end IF_DATA");
        let value = parse_if_data("1 2", &g).unwrap();
        assert_eq!(
            value,
            IfDataValue::Block {
                tag: "IF_DATA".to_string(),
                values: vec![IfDataValue::Struct(vec![
                    IfDataValue::Scalar(AsamValue::UInt(1)),
                    IfDataValue::Scalar(AsamValue::UInt(2)),
                ])],
            }
        );
    }

    #[test]
    fn interprets_a_taggedstruct_with_a_nested_block() {
        let g = grammar(
            "/begin IF_DATA block \"IF_DATA\" taggedstruct { block \"PROTOCOL\" struct { uint; }; } /end IF_DATA",
        );
        let value = parse_if_data("/begin PROTOCOL 7 /end PROTOCOL", &g).unwrap();
        let IfDataValue::Block { values, .. } = value else {
            panic!("expected outer block");
        };
        assert!(matches!(&values[0], IfDataValue::TaggedStruct(entries) if entries.len() == 1));
    }

    #[test]
    fn unknown_enumerator_literal_is_an_error() {
        let g = grammar(
            r#"/begin IF_DATA block "IF_DATA" enum Color { "RED", "GREEN" } /end IF_DATA"#,
        );
        let err = parse_if_data("BLUE", &g).unwrap_err();
        assert!(matches!(err, IfDataError::UnknownEnumerator { .. }));
    }

    #[test]
    fn missing_if_data_block_is_reported() {
        let g = grammar("/begin X struct { uint; } /end X");
        let err = parse_if_data("1", &g).unwrap_err();
        assert_eq!(err, IfDataError::MissingIfDataBlock);
    }
}
