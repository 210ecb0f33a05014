//! Recursive-descent parser over the AML token stream, plus a post-pass
//! resolving named referrers against the declarations collected from the
//! whole file (a referrer may point forward or backward).

use std::collections::HashSet;
use std::fmt;

use super::ast::*;
use super::lexer::{AmlToken, AmlTokenKind};

#[derive(Debug, Clone, PartialEq)]
pub enum AmlParseError {
    UnexpectedEof { expected: &'static str },
    UnexpectedToken {
        pos: usize,
        found: String,
        expected: &'static str,
    },
    UnresolvedReferrer { category: &'static str, name: String },
}

impl fmt::Display for AmlParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmlParseError::UnexpectedEof { expected } => {
                write!(f, "unexpected end of AML input, expected {}", expected)
            }
            AmlParseError::UnexpectedToken { pos, found, expected } => write!(
                f,
                "offset {}: unexpected token '{}', expected {}",
                pos, found, expected
            ),
            AmlParseError::UnresolvedReferrer { category, name } => {
                write!(f, "unresolved {} referrer '{}'", category, name)
            }
        }
    }
}

impl std::error::Error for AmlParseError {}

pub struct AmlParser<'t> {
    tokens: &'t [AmlToken],
    pos: usize,
}

impl<'t> AmlParser<'t> {
    pub fn new(tokens: &'t [AmlToken]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(mut self) -> Result<AmlFile, AmlParseError> {
        let file = self.parse_file()?;
        let names = collect_names(&file);
        for decl in &file.declarations {
            verify_declaration(decl, &names)?;
        }
        Ok(file)
    }

    fn current(&self) -> Option<AmlToken> {
        self.tokens.get(self.pos).cloned()
    }

    fn bump(&mut self) -> Option<AmlToken> {
        let t = self.current();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn err_unexpected(&self, expected: &'static str) -> AmlParseError {
        match self.current() {
            Some(t) => AmlParseError::UnexpectedToken {
                pos: t.pos,
                found: t.text,
                expected,
            },
            None => AmlParseError::UnexpectedEof { expected },
        }
    }

    fn expect(&mut self, pred: impl Fn(&AmlTokenKind) -> bool, expected: &'static str) -> Result<AmlToken, AmlParseError> {
        match self.current() {
            Some(t) if pred(&t.kind) => {
                self.pos += 1;
                Ok(t)
            }
            _ => Err(self.err_unexpected(expected)),
        }
    }

    fn eat(&mut self, pred: impl Fn(&AmlTokenKind) -> bool) -> bool {
        if self.current().is_some_and(|t| pred(&t.kind)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_tag(&mut self) -> Result<String, AmlParseError> {
        Ok(self.expect(|k| matches!(k, AmlTokenKind::Tag), "tag")?.text)
    }

    fn expect_ident(&mut self) -> Result<String, AmlParseError> {
        Ok(self.expect(|k| matches!(k, AmlTokenKind::Ident), "identifier")?.text)
    }

    fn expect_int(&mut self) -> Result<i64, AmlParseError> {
        let t = self.expect(|k| matches!(k, AmlTokenKind::Int), "integer")?;
        Ok(t.int_value.unwrap())
    }

    fn peek_is(&self, pred: impl Fn(&AmlTokenKind) -> bool) -> bool {
        self.current().is_some_and(|t| pred(&t.kind))
    }

    fn is_type_name_start(&self) -> bool {
        self.peek_is(|k| {
            matches!(
                k,
                AmlTokenKind::PredefinedType(_)
                    | AmlTokenKind::Struct
                    | AmlTokenKind::TaggedStruct
                    | AmlTokenKind::TaggedUnion
                    | AmlTokenKind::Enum
            )
        })
    }

    fn is_member_start(&self) -> bool {
        self.peek_is(|k| matches!(k, AmlTokenKind::Block)) || self.is_type_name_start()
    }

    fn parse_file(&mut self) -> Result<AmlFile, AmlParseError> {
        self.expect(|k| matches!(k, AmlTokenKind::Begin), "/begin")?;
        let name = self.expect_ident()?;
        let mut declarations = Vec::new();
        while !self.peek_is(|k| matches!(k, AmlTokenKind::End)) {
            if self.current().is_none() {
                return Err(AmlParseError::UnexpectedEof { expected: "/end" });
            }
            declarations.push(self.parse_declaration()?);
        }
        self.expect(|k| matches!(k, AmlTokenKind::End), "/end")?;
        self.expect_ident()?;
        Ok(AmlFile { name, declarations })
    }

    fn parse_declaration(&mut self) -> Result<Declaration, AmlParseError> {
        let decl = if self.peek_is(|k| matches!(k, AmlTokenKind::Block)) {
            Declaration::Block(self.parse_block_definition()?)
        } else if self.is_type_name_start() {
            Declaration::Type(self.parse_type_name()?)
        } else {
            return Err(self.err_unexpected("declaration"));
        };
        self.eat(|k| matches!(k, AmlTokenKind::Semi));
        Ok(decl)
    }

    fn parse_type_name(&mut self) -> Result<Type, AmlParseError> {
        match self.current().map(|t| t.kind) {
            Some(AmlTokenKind::PredefinedType(pdt)) => {
                self.bump();
                let array_spec = self.parse_array_spec()?;
                Ok(Type::Predefined(PredefinedType { base: pdt, array_spec }))
            }
            Some(AmlTokenKind::Struct) => self.parse_struct(),
            Some(AmlTokenKind::TaggedStruct) => self.parse_tagged_struct(),
            Some(AmlTokenKind::TaggedUnion) => self.parse_tagged_union(),
            Some(AmlTokenKind::Enum) => self.parse_enum(),
            _ => Err(self.err_unexpected("type name")),
        }
    }

    fn parse_array_spec(&mut self) -> Result<Vec<u32>, AmlParseError> {
        let mut dims = Vec::new();
        while self.eat(|k| matches!(k, AmlTokenKind::LSq)) {
            let n = self.expect_int()?;
            self.expect(|k| matches!(k, AmlTokenKind::RSq), "]")?;
            dims.push(n as u32);
        }
        Ok(dims)
    }

    fn optional_name(&mut self) -> Option<String> {
        if self.peek_is(|k| matches!(k, AmlTokenKind::Ident)) {
            self.bump().map(|t| t.text)
        } else {
            None
        }
    }

    fn parse_enum(&mut self) -> Result<Type, AmlParseError> {
        self.bump();
        let name = self.optional_name();
        if self.eat(|k| matches!(k, AmlTokenKind::LBrace)) {
            let mut enumerators = Vec::new();
            loop {
                enumerators.push(self.parse_enumerator()?);
                if !self.eat(|k| matches!(k, AmlTokenKind::Comma)) {
                    break;
                }
            }
            self.expect(|k| matches!(k, AmlTokenKind::RBrace), "}")?;
            Ok(Type::Enum(EnumerationOrReferrer::Enumeration(Enumeration {
                name,
                enumerators,
            })))
        } else {
            let name = name.ok_or_else(|| self.err_unexpected("enum body or referrer name"))?;
            Ok(Type::Enum(EnumerationOrReferrer::Referrer(Referrer {
                category: ReferrerCategory::Enumeration,
                name,
            })))
        }
    }

    fn parse_enumerator(&mut self) -> Result<Enumerator, AmlParseError> {
        let tag = self.expect_tag()?;
        let value = if self.eat(|k| matches!(k, AmlTokenKind::Eq)) {
            Some(self.expect_int()?)
        } else {
            None
        };
        Ok(Enumerator { tag, value })
    }

    fn parse_struct(&mut self) -> Result<Type, AmlParseError> {
        self.bump();
        let name = self.optional_name();
        if self.eat(|k| matches!(k, AmlTokenKind::LBrace)) {
            let mut members = Vec::new();
            while !self.peek_is(|k| matches!(k, AmlTokenKind::RBrace)) {
                members.push(self.parse_member()?);
                self.eat(|k| matches!(k, AmlTokenKind::Semi));
            }
            self.expect(|k| matches!(k, AmlTokenKind::RBrace), "}")?;
            Ok(Type::Struct(StructOrReferrer::Struct(Struct { name, members })))
        } else {
            let name = name.ok_or_else(|| self.err_unexpected("struct body or referrer name"))?;
            Ok(Type::Struct(StructOrReferrer::Referrer(Referrer {
                category: ReferrerCategory::Struct,
                name,
            })))
        }
    }

    fn parse_member(&mut self) -> Result<Member, AmlParseError> {
        if self.peek_is(|k| matches!(k, AmlTokenKind::Block)) {
            let block = self.parse_block_definition()?;
            Ok(Member {
                ty: None,
                block: Some(Box::new(block)),
            })
        } else if self.is_type_name_start() {
            let ty = self.parse_type_name()?;
            Ok(Member { ty: Some(ty), block: None })
        } else {
            Ok(Member { ty: None, block: None })
        }
    }

    fn parse_block_definition(&mut self) -> Result<BlockDefinition, AmlParseError> {
        self.expect(|k| matches!(k, AmlTokenKind::Block), "block")?;
        let tag = self.expect_tag()?;
        if self.eat(|k| matches!(k, AmlTokenKind::LParen)) {
            let ty = self.parse_type_name()?;
            self.expect(|k| matches!(k, AmlTokenKind::RParen), ")")?;
            self.expect(|k| matches!(k, AmlTokenKind::Star), "*")?;
            Ok(BlockDefinition {
                tag,
                ty: Some(ty),
                multiple: true,
            })
        } else {
            let ty = self.parse_type_name()?;
            Ok(BlockDefinition {
                tag,
                ty: Some(ty),
                multiple: false,
            })
        }
    }

    fn parse_tagged_struct(&mut self) -> Result<Type, AmlParseError> {
        self.bump();
        let name = self.optional_name();
        if self.eat(|k| matches!(k, AmlTokenKind::LBrace)) {
            let mut members = Vec::new();
            while !self.peek_is(|k| matches!(k, AmlTokenKind::RBrace)) {
                members.push(self.parse_ts_member()?);
            }
            self.expect(|k| matches!(k, AmlTokenKind::RBrace), "}")?;
            Ok(Type::TaggedStruct(TaggedStructOrReferrer::TaggedStruct(
                TaggedStruct { name, members },
            )))
        } else {
            let name = name.ok_or_else(|| self.err_unexpected("taggedstruct body or referrer name"))?;
            Ok(Type::TaggedStruct(TaggedStructOrReferrer::Referrer(Referrer {
                category: ReferrerCategory::TaggedStruct,
                name,
            })))
        }
    }

    fn parse_ts_member(&mut self) -> Result<(String, TaggedStructMember), AmlParseError> {
        if self.eat(|k| matches!(k, AmlTokenKind::LParen)) {
            let (tag, inner) = if self.peek_is(|k| matches!(k, AmlTokenKind::Block)) {
                let block = self.parse_block_definition()?;
                (block.tag.clone(), TaggedStructMemberInner::Block(block))
            } else {
                let (tag, tsd) = self.parse_ts_def()?;
                (tag, TaggedStructMemberInner::Definition(tsd))
            };
            self.eat(|k| matches!(k, AmlTokenKind::Semi));
            self.expect(|k| matches!(k, AmlTokenKind::RParen), ")")?;
            self.expect(|k| matches!(k, AmlTokenKind::Star), "*")?;
            Ok((
                tag,
                TaggedStructMember {
                    multiple: true,
                    inner,
                },
            ))
        } else if self.peek_is(|k| matches!(k, AmlTokenKind::Block)) {
            let block = self.parse_block_definition()?;
            self.eat(|k| matches!(k, AmlTokenKind::Semi));
            Ok((
                block.tag.clone(),
                TaggedStructMember {
                    multiple: false,
                    inner: TaggedStructMemberInner::Block(block),
                },
            ))
        } else {
            let (tag, tsd) = self.parse_ts_def()?;
            self.eat(|k| matches!(k, AmlTokenKind::Semi));
            Ok((
                tag,
                TaggedStructMember {
                    multiple: false,
                    inner: TaggedStructMemberInner::Definition(tsd),
                },
            ))
        }
    }

    fn parse_ts_def(&mut self) -> Result<(String, TaggedStructDefinition), AmlParseError> {
        let tag = self.expect_tag()?;
        if self.eat(|k| matches!(k, AmlTokenKind::LParen)) {
            let member = self.parse_member()?;
            self.eat(|k| matches!(k, AmlTokenKind::Semi));
            self.expect(|k| matches!(k, AmlTokenKind::RParen), ")")?;
            self.expect(|k| matches!(k, AmlTokenKind::Star), "*")?;
            Ok((
                tag,
                TaggedStructDefinition {
                    member: Some(member),
                    multiple: true,
                },
            ))
        } else if self.is_member_start() {
            let member = self.parse_member()?;
            Ok((
                tag,
                TaggedStructDefinition {
                    member: Some(member),
                    multiple: false,
                },
            ))
        } else {
            Ok((
                tag,
                TaggedStructDefinition {
                    member: None,
                    multiple: false,
                },
            ))
        }
    }

    fn parse_tagged_union(&mut self) -> Result<Type, AmlParseError> {
        self.bump();
        let name = self.optional_name();
        if self.eat(|k| matches!(k, AmlTokenKind::LBrace)) {
            let mut members = Vec::new();
            while !self.peek_is(|k| matches!(k, AmlTokenKind::RBrace)) {
                members.push(self.parse_tu_member()?);
            }
            self.expect(|k| matches!(k, AmlTokenKind::RBrace), "}")?;
            Ok(Type::TaggedUnion(TaggedUnionOrReferrer::TaggedUnion(
                TaggedUnion { name, members },
            )))
        } else {
            let name = name.ok_or_else(|| self.err_unexpected("taggedunion body or referrer name"))?;
            Ok(Type::TaggedUnion(TaggedUnionOrReferrer::Referrer(Referrer {
                category: ReferrerCategory::TaggedUnion,
                name,
            })))
        }
    }

    fn parse_tu_member(&mut self) -> Result<(String, TaggedUnionMember), AmlParseError> {
        if self.peek_is(|k| matches!(k, AmlTokenKind::Block)) {
            let block = self.parse_block_definition()?;
            self.eat(|k| matches!(k, AmlTokenKind::Semi));
            Ok((
                block.tag.clone(),
                TaggedUnionMember {
                    member: None,
                    block: Some(block),
                },
            ))
        } else {
            let tag = self.expect_tag()?;
            let member = if self.is_member_start() {
                Some(self.parse_member()?)
            } else {
                None
            };
            self.eat(|k| matches!(k, AmlTokenKind::Semi));
            Ok((tag, TaggedUnionMember { member, block: None }))
        }
    }
}

#[derive(Default)]
struct Names {
    enumerations: HashSet<String>,
    structs: HashSet<String>,
    tagged_structs: HashSet<String>,
    tagged_unions: HashSet<String>,
}

fn collect_names(file: &AmlFile) -> Names {
    let mut names = Names::default();
    for decl in &file.declarations {
        collect_declaration(decl, &mut names);
    }
    names
}

fn collect_declaration(decl: &Declaration, names: &mut Names) {
    match decl {
        Declaration::Block(b) => collect_block(b, names),
        Declaration::Type(t) => collect_type(t, names),
    }
}

fn collect_type(ty: &Type, names: &mut Names) {
    match ty {
        Type::Predefined(_) => {}
        Type::Enum(EnumerationOrReferrer::Enumeration(e)) => {
            if let Some(name) = &e.name {
                names.enumerations.insert(name.clone());
            }
        }
        Type::Enum(EnumerationOrReferrer::Referrer(_)) => {}
        Type::Struct(StructOrReferrer::Struct(s)) => {
            if let Some(name) = &s.name {
                names.structs.insert(name.clone());
            }
            for member in &s.members {
                collect_member(member, names);
            }
        }
        Type::Struct(StructOrReferrer::Referrer(_)) => {}
        Type::TaggedStruct(TaggedStructOrReferrer::TaggedStruct(ts)) => {
            if let Some(name) = &ts.name {
                names.tagged_structs.insert(name.clone());
            }
            for (_, member) in &ts.members {
                match &member.inner {
                    TaggedStructMemberInner::Block(b) => collect_block(b, names),
                    TaggedStructMemberInner::Definition(d) => {
                        if let Some(m) = &d.member {
                            collect_member(m, names);
                        }
                    }
                }
            }
        }
        Type::TaggedStruct(TaggedStructOrReferrer::Referrer(_)) => {}
        Type::TaggedUnion(TaggedUnionOrReferrer::TaggedUnion(tu)) => {
            if let Some(name) = &tu.name {
                names.tagged_unions.insert(name.clone());
            }
            for (_, member) in &tu.members {
                if let Some(m) = &member.member {
                    collect_member(m, names);
                }
                if let Some(b) = &member.block {
                    collect_block(b, names);
                }
            }
        }
        Type::TaggedUnion(TaggedUnionOrReferrer::Referrer(_)) => {}
    }
}

fn collect_member(member: &Member, names: &mut Names) {
    if let Some(ty) = &member.ty {
        collect_type(ty, names);
    }
    if let Some(block) = &member.block {
        collect_block(block, names);
    }
}

fn collect_block(block: &BlockDefinition, names: &mut Names) {
    if let Some(ty) = &block.ty {
        collect_type(ty, names);
    }
}

fn verify_declaration(decl: &Declaration, names: &Names) -> Result<(), AmlParseError> {
    match decl {
        Declaration::Block(b) => verify_block(b, names),
        Declaration::Type(t) => verify_type(t, names),
    }
}

fn verify_type(ty: &Type, names: &Names) -> Result<(), AmlParseError> {
    match ty {
        Type::Predefined(_) => Ok(()),
        Type::Enum(EnumerationOrReferrer::Referrer(r)) => verify_referrer(r, &names.enumerations, "enum"),
        Type::Enum(_) => Ok(()),
        Type::Struct(StructOrReferrer::Referrer(r)) => verify_referrer(r, &names.structs, "struct"),
        Type::Struct(StructOrReferrer::Struct(s)) => {
            for member in &s.members {
                verify_member(member, names)?;
            }
            Ok(())
        }
        Type::TaggedStruct(TaggedStructOrReferrer::Referrer(r)) => {
            verify_referrer(r, &names.tagged_structs, "taggedstruct")
        }
        Type::TaggedStruct(TaggedStructOrReferrer::TaggedStruct(ts)) => {
            for (_, member) in &ts.members {
                match &member.inner {
                    TaggedStructMemberInner::Block(b) => verify_block(b, names)?,
                    TaggedStructMemberInner::Definition(d) => {
                        if let Some(m) = &d.member {
                            verify_member(m, names)?;
                        }
                    }
                }
            }
            Ok(())
        }
        Type::TaggedUnion(TaggedUnionOrReferrer::Referrer(r)) => {
            verify_referrer(r, &names.tagged_unions, "taggedunion")
        }
        Type::TaggedUnion(TaggedUnionOrReferrer::TaggedUnion(tu)) => {
            for (_, member) in &tu.members {
                if let Some(m) = &member.member {
                    verify_member(m, names)?;
                }
                if let Some(b) = &member.block {
                    verify_block(b, names)?;
                }
            }
            Ok(())
        }
    }
}

fn verify_member(member: &Member, names: &Names) -> Result<(), AmlParseError> {
    if let Some(ty) = &member.ty {
        verify_type(ty, names)?;
    }
    if let Some(block) = &member.block {
        verify_block(block, names)?;
    }
    Ok(())
}

fn verify_block(block: &BlockDefinition, names: &Names) -> Result<(), AmlParseError> {
    if let Some(ty) = &block.ty {
        verify_type(ty, names)?;
    }
    Ok(())
}

fn verify_referrer(r: &Referrer, known: &HashSet<String>, category: &'static str) -> Result<(), AmlParseError> {
    if known.contains(&r.name) {
        Ok(())
    } else {
        Err(AmlParseError::UnresolvedReferrer {
            category,
            name: r.name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aml::lexer::aml_lex;

    fn parse(src: &str) -> Result<AmlFile, AmlParseError> {
        let tokens = aml_lex(src).unwrap();
        AmlParser::new(&tokens).parse()
    }

    #[test]
    fn parses_minimal_struct_declaration() {
        let file = parse("/begin IF_DATA struct X { int; } /end IF_DATA").unwrap();
        assert_eq!(file.name, "IF_DATA");
        assert_eq!(file.declarations.len(), 1);
        assert!(matches!(
            file.declarations[0],
            Declaration::Type(Type::Struct(StructOrReferrer::Struct(_)))
        ));
    }

    #[test]
    fn parses_enum_with_explicit_values() {
        let file =
            parse(r#"/begin X enum Color { "RED" = 1, "GREEN" = 2 } /end X"#).unwrap();
        let Declaration::Type(Type::Enum(EnumerationOrReferrer::Enumeration(e))) =
            &file.declarations[0]
        else {
            panic!("expected enumeration");
        };
        assert_eq!(e.name.as_deref(), Some("Color"));
        assert_eq!(e.enumerators.len(), 2);
        assert_eq!(e.enumerators[1].value, Some(2));
    }

    #[test]
    fn referrer_resolves_to_a_sibling_declaration() {
        let file = parse(
            "/begin X enum Color { \"RED\" } struct Y { enum Color; } /end X",
        )
        .unwrap();
        assert_eq!(file.declarations.len(), 2);
    }

    #[test]
    fn unresolved_referrer_is_an_error() {
        let err = parse("/begin X struct Y { enum Missing; } /end X").unwrap_err();
        assert!(matches!(err, AmlParseError::UnresolvedReferrer { .. }));
    }

    #[test]
    fn parses_block_definition_with_multiple_flag() {
        let file = parse("/begin X block \"SEG\" (struct { int; })* /end X").unwrap();
        assert!(matches!(file.declarations[0], Declaration::Block(ref b) if b.multiple));
    }

    #[test]
    fn parses_taggedstruct_with_repeating_member() {
        let file = parse(
            "/begin X taggedstruct { (\"ITEM\" int;)* \"SINGLE\" int; } /end X",
        )
        .unwrap();
        let Declaration::Type(Type::TaggedStruct(TaggedStructOrReferrer::TaggedStruct(ts))) =
            &file.declarations[0]
        else {
            panic!("expected taggedstruct");
        };
        assert_eq!(ts.members.len(), 2);
        assert!(ts.members[0].1.multiple);
        assert!(!ts.members[1].1.multiple);
    }
}
