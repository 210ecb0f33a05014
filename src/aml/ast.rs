//! The AML abstract syntax tree: predefined types, structs, tagged structs,
//! tagged unions, enumerations, and block definitions, plus named-referrer
//! forward references between them.

use serde::Serialize;

/// The eleven predefined scalar types the AML lexer recognizes. The source's
/// own `AMLPredefinedType` enum only names eight (`CHAR`/`INT`/`LONG`/
/// `UCHAR`/`UINT`/`ULONG`/`DOUBLE`/`FLOAT`); `Int64`/`UInt64`/`Float16` are
/// promoted to first-class members here rather than left as lexer-only
/// token kinds with no AST representation (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmlPredefinedType {
    Char,
    Int,
    Long,
    UChar,
    UInt,
    ULong,
    Int64,
    UInt64,
    Double,
    Float,
    Float16,
}

impl AmlPredefinedType {
    pub const ALL: [AmlPredefinedType; 11] = [
        AmlPredefinedType::Char,
        AmlPredefinedType::Int,
        AmlPredefinedType::Long,
        AmlPredefinedType::UChar,
        AmlPredefinedType::UInt,
        AmlPredefinedType::ULong,
        AmlPredefinedType::Int64,
        AmlPredefinedType::UInt64,
        AmlPredefinedType::Double,
        AmlPredefinedType::Float,
        AmlPredefinedType::Float16,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            AmlPredefinedType::Char => "char",
            AmlPredefinedType::Int => "int",
            AmlPredefinedType::Long => "long",
            AmlPredefinedType::UChar => "uchar",
            AmlPredefinedType::UInt => "uint",
            AmlPredefinedType::ULong => "ulong",
            AmlPredefinedType::Int64 => "int64",
            AmlPredefinedType::UInt64 => "uint64",
            AmlPredefinedType::Double => "double",
            AmlPredefinedType::Float => "float",
            AmlPredefinedType::Float16 => "float16",
        }
    }

    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.keyword() == word)
    }

    pub fn code(self) -> u8 {
        Self::ALL.iter().position(|t| *t == self).unwrap() as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredefinedType {
    pub base: AmlPredefinedType,
    /// One entry per `[N]` array dimension, outermost first.
    pub array_spec: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferrerCategory {
    Enumeration,
    Struct,
    TaggedStruct,
    TaggedUnion,
}

impl ReferrerCategory {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ReferrerCategory::Enumeration),
            1 => Some(ReferrerCategory::Struct),
            2 => Some(ReferrerCategory::TaggedStruct),
            3 => Some(ReferrerCategory::TaggedUnion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Referrer {
    pub category: ReferrerCategory,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enumerator {
    pub tag: String,
    pub value: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Enumeration {
    pub name: Option<String>,
    pub enumerators: Vec<Enumerator>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnumerationOrReferrer {
    Enumeration(Enumeration),
    Referrer(Referrer),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Member {
    pub ty: Option<Type>,
    pub block: Option<Box<BlockDefinition>>,
}

impl Member {
    pub fn is_empty(&self) -> bool {
        self.ty.is_none() && self.block.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDefinition {
    pub tag: String,
    pub ty: Option<Type>,
    pub multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Struct {
    pub name: Option<String>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StructOrReferrer {
    Struct(Struct),
    Referrer(Referrer),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedStructDefinition {
    pub member: Option<Member>,
    pub multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TaggedStructMemberInner {
    Block(BlockDefinition),
    Definition(TaggedStructDefinition),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedStructMember {
    pub multiple: bool,
    pub inner: TaggedStructMemberInner,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedStruct {
    pub name: Option<String>,
    pub members: Vec<(String, TaggedStructMember)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaggedStructOrReferrer {
    TaggedStruct(TaggedStruct),
    Referrer(Referrer),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedUnionMember {
    pub member: Option<Member>,
    pub block: Option<BlockDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedUnion {
    pub name: Option<String>,
    pub members: Vec<(String, TaggedUnionMember)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaggedUnionOrReferrer {
    TaggedUnion(TaggedUnion),
    Referrer(Referrer),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Type {
    Predefined(PredefinedType),
    Enum(EnumerationOrReferrer),
    Struct(StructOrReferrer),
    TaggedStruct(TaggedStructOrReferrer),
    TaggedUnion(TaggedUnionOrReferrer),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Declaration {
    Block(BlockDefinition),
    Type(Type),
}

/// One fully parsed `/begin <name> ... /end <name>` AML section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmlFile {
    pub name: String,
    pub declarations: Vec<Declaration>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predefined_type_code_round_trips_through_all_eleven_members() {
        for t in AmlPredefinedType::ALL {
            assert_eq!(AmlPredefinedType::from_code(t.code()), Some(t));
            assert_eq!(AmlPredefinedType::from_keyword(t.keyword()), Some(t));
        }
    }

    #[test]
    fn member_is_empty_only_with_neither_type_nor_block() {
        let empty = Member { ty: None, block: None };
        assert!(empty.is_empty());
        let with_type = Member {
            ty: Some(Type::Predefined(PredefinedType {
                base: AmlPredefinedType::Int,
                array_spec: vec![],
            })),
            block: None,
        };
        assert!(!with_type.is_empty());
    }
}
