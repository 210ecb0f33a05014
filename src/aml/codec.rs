//! Deterministic binary marshal/unmarshal of the AML AST.
//!
//! Grounded on `aml/marshal.cpp`'s `dumps()` cascade: every node is prefixed
//! with a length-prefixed discriminator string (`"PD"`, `"EN"`, `"ST"`, `"TS"`,
//! `"TU"`, `"B"`, `"T"`, `"M"`, `"R"`, `"BL"`, `"TY"`, inner `"S"`/`"U"`/`"E"`),
//! booleans are the length-prefixed strings `"true"`/`"false"`, and strings
//! and counts are length-prefixed. Two deviations from the source, both
//! needed to satisfy `unmarshal(marshal(x)) == x` for *this* AST rather than
//! the source's (see DESIGN.md):
//!
//! - `AmlFile.name` is written and read back; the source's `dumps(AmlFile)`
//!   never serializes a file-level name at all.
//! - Every `Option<String>`/`Option<i64>` (struct/enum/union names,
//!   enumerator values) is written with an explicit presence flag rather than
//!   falling back to an empty string or a default `0`, because this AST keeps
//!   `None` as a distinct case the source's plain `std::string`/`uint32_t`
//!   fields don't represent.

use std::fmt;

use super::ast::*;

#[derive(Debug, Clone, PartialEq)]
pub enum CodecError {
    UnexpectedEof,
    UnknownTag { expected: &'static str, found: String },
    InvalidDiscriminator { context: &'static str, value: u8 },
    InvalidUtf8,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::UnexpectedEof => write!(f, "unexpected end of AML binary stream"),
            CodecError::UnknownTag { expected, found } => {
                write!(f, "expected tag '{}', found '{}'", expected, found)
            }
            CodecError::InvalidDiscriminator { context, value } => {
                write!(f, "invalid {} discriminator byte {}", context, value)
            }
            CodecError::InvalidUtf8 => write!(f, "invalid UTF-8 in AML binary string"),
        }
    }
}

impl std::error::Error for CodecError {}

pub fn marshal(file: &AmlFile) -> Vec<u8> {
    let mut w = Writer::new();
    w.write_str(&file.name);
    w.write_u64(file.declarations.len() as u64);
    for decl in &file.declarations {
        write_declaration(&mut w, decl);
    }
    w.into_bytes()
}

pub fn unmarshal(bytes: &[u8]) -> Result<AmlFile, CodecError> {
    let mut r = Reader::new(bytes);
    let name = r.read_str()?;
    let count = r.read_u64()?;
    let mut declarations = Vec::with_capacity(count as usize);
    for _ in 0..count {
        declarations.push(read_declaration(&mut r)?);
    }
    Ok(AmlFile { name, declarations })
}

struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_str(&mut self, s: &str) {
        self.write_u64(s.len() as u64);
        self.buf.extend_from_slice(s.as_bytes());
    }

    fn write_tag(&mut self, tag: &str) {
        self.write_str(tag);
    }

    fn write_bool(&mut self, b: bool) {
        self.write_str(if b { "true" } else { "false" });
    }

    fn write_opt_str(&mut self, v: &Option<String>) {
        self.write_bool(v.is_some());
        if let Some(s) = v {
            self.write_str(s);
        }
    }

    fn write_opt_i64(&mut self, v: Option<i64>) {
        self.write_bool(v.is_some());
        if let Some(n) = v {
            self.write_i64(n);
        }
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.pos + n > self.bytes.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_i64(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn read_str(&mut self) -> Result<String, CodecError> {
        let len = self.read_u64()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    fn expect_tag(&mut self, expected: &'static str) -> Result<(), CodecError> {
        let found = self.read_str()?;
        if found == expected {
            Ok(())
        } else {
            Err(CodecError::UnknownTag { expected, found })
        }
    }

    fn read_bool(&mut self) -> Result<bool, CodecError> {
        let s = self.read_str()?;
        match s.as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(CodecError::UnknownTag {
                expected: "true|false",
                found: s,
            }),
        }
    }

    fn read_opt_str(&mut self) -> Result<Option<String>, CodecError> {
        if self.read_bool()? {
            Ok(Some(self.read_str()?))
        } else {
            Ok(None)
        }
    }

    fn read_opt_i64(&mut self) -> Result<Option<i64>, CodecError> {
        if self.read_bool()? {
            Ok(Some(self.read_i64()?))
        } else {
            Ok(None)
        }
    }
}

fn write_declaration(w: &mut Writer, decl: &Declaration) {
    match decl {
        Declaration::Block(b) => {
            w.write_tag("BL");
            write_block(w, b);
        }
        Declaration::Type(t) => {
            w.write_tag("TY");
            write_type(w, t);
        }
    }
}

fn read_declaration(r: &mut Reader) -> Result<Declaration, CodecError> {
    let tag = r.read_str()?;
    match tag.as_str() {
        "BL" => Ok(Declaration::Block(read_block(r)?)),
        "TY" => Ok(Declaration::Type(read_type(r)?)),
        other => Err(CodecError::UnknownTag {
            expected: "BL|TY",
            found: other.to_string(),
        }),
    }
}

fn write_type(w: &mut Writer, ty: &Type) {
    match ty {
        Type::Predefined(pdt) => write_predefined(w, pdt),
        Type::Enum(er) => write_enum_or_referrer(w, er),
        Type::Struct(sr) => write_struct_or_referrer(w, sr),
        Type::TaggedStruct(tr) => write_tagged_struct_or_referrer(w, tr),
        Type::TaggedUnion(tr) => write_tagged_union_or_referrer(w, tr),
    }
}

fn read_type(r: &mut Reader) -> Result<Type, CodecError> {
    let tag = r.read_str()?;
    match tag.as_str() {
        "PD" => Ok(Type::Predefined(read_predefined_body(r)?)),
        "EN" => Ok(Type::Enum(read_enum_or_referrer_body(r)?)),
        "ST" => Ok(Type::Struct(read_struct_or_referrer_body(r)?)),
        "TS" => Ok(Type::TaggedStruct(read_tagged_struct_or_referrer_body(r)?)),
        "TU" => Ok(Type::TaggedUnion(read_tagged_union_or_referrer_body(r)?)),
        other => Err(CodecError::UnknownTag {
            expected: "PD|EN|ST|TS|TU",
            found: other.to_string(),
        }),
    }
}

fn write_predefined(w: &mut Writer, pdt: &PredefinedType) {
    w.write_tag("PD");
    w.write_u8(pdt.base.code());
    w.write_u64(pdt.array_spec.len() as u64);
    for dim in &pdt.array_spec {
        w.write_u32(*dim);
    }
}

fn read_predefined_body(r: &mut Reader) -> Result<PredefinedType, CodecError> {
    let code = r.read_u8()?;
    let base = AmlPredefinedType::from_code(code).ok_or(CodecError::InvalidDiscriminator {
        context: "predefined type",
        value: code,
    })?;
    let dim_count = r.read_u64()?;
    let mut array_spec = Vec::with_capacity(dim_count as usize);
    for _ in 0..dim_count {
        array_spec.push(r.read_u32()?);
    }
    Ok(PredefinedType { base, array_spec })
}

fn write_referrer(w: &mut Writer, r: &Referrer) {
    w.write_tag("R");
    w.write_u8(r.category.code());
    w.write_str(&r.name);
}

fn read_referrer_body(r: &mut Reader) -> Result<Referrer, CodecError> {
    let code = r.read_u8()?;
    let category = ReferrerCategory::from_code(code).ok_or(CodecError::InvalidDiscriminator {
        context: "referrer category",
        value: code,
    })?;
    let name = r.read_str()?;
    Ok(Referrer { category, name })
}

fn write_block(w: &mut Writer, b: &BlockDefinition) {
    w.write_tag("B");
    w.write_str(&b.tag);
    w.write_bool(b.multiple);
    if let Some(ty) = &b.ty {
        w.write_tag("T");
        write_type(w, ty);
    }
}

fn read_block(r: &mut Reader) -> Result<BlockDefinition, CodecError> {
    let tag = r.read_str()?;
    let multiple = r.read_bool()?;
    r.expect_tag("T")?;
    let ty = read_type(r)?;
    Ok(BlockDefinition {
        tag,
        ty: Some(ty),
        multiple,
    })
}

fn write_member(w: &mut Writer, m: &Member) {
    if m.is_empty() {
        w.write_bool(false);
        return;
    }
    w.write_bool(true);
    if let Some(ty) = &m.ty {
        w.write_tag("T");
        write_type(w, ty);
    } else if let Some(block) = &m.block {
        write_block(w, block);
    }
}

fn read_member(r: &mut Reader) -> Result<Member, CodecError> {
    if !r.read_bool()? {
        return Ok(Member { ty: None, block: None });
    }
    let tag = r.read_str()?;
    match tag.as_str() {
        "T" => Ok(Member {
            ty: Some(read_type(r)?),
            block: None,
        }),
        "B" => Ok(Member {
            ty: None,
            block: Some(Box::new(read_block_body(r)?)),
        }),
        other => Err(CodecError::UnknownTag {
            expected: "T|B",
            found: other.to_string(),
        }),
    }
}

fn read_block_body(r: &mut Reader) -> Result<BlockDefinition, CodecError> {
    read_block(r)
}

fn write_tagged_struct_definition(w: &mut Writer, d: &TaggedStructDefinition) {
    w.write_bool(d.multiple);
    match &d.member {
        Some(member) => {
            w.write_bool(true);
            write_member(w, member);
        }
        None => w.write_bool(false),
    }
}

fn read_tagged_struct_definition(r: &mut Reader) -> Result<TaggedStructDefinition, CodecError> {
    let multiple = r.read_bool()?;
    let has_member = r.read_bool()?;
    let member = if has_member { Some(read_member(r)?) } else { None };
    Ok(TaggedStructDefinition { member, multiple })
}

fn write_ts_member(w: &mut Writer, tsm: &TaggedStructMember) {
    w.write_bool(tsm.multiple);
    match &tsm.inner {
        TaggedStructMemberInner::Block(b) => write_block(w, b),
        TaggedStructMemberInner::Definition(d) => {
            w.write_tag("T");
            write_tagged_struct_definition(w, d);
        }
    }
}

fn read_ts_member(r: &mut Reader) -> Result<TaggedStructMember, CodecError> {
    let multiple = r.read_bool()?;
    let tag = r.read_str()?;
    let inner = match tag.as_str() {
        "B" => TaggedStructMemberInner::Block(read_block_body(r)?),
        "T" => TaggedStructMemberInner::Definition(read_tagged_struct_definition(r)?),
        other => {
            return Err(CodecError::UnknownTag {
                expected: "B|T",
                found: other.to_string(),
            })
        }
    };
    Ok(TaggedStructMember { multiple, inner })
}

fn write_tagged_union_member(w: &mut Writer, tum: &TaggedUnionMember) {
    match &tum.block {
        Some(block) => write_block(w, block),
        None => {
            w.write_tag("M");
            let empty = Member { ty: None, block: None };
            write_member(w, tum.member.as_ref().unwrap_or(&empty));
        }
    }
}

fn read_tagged_union_member(r: &mut Reader) -> Result<TaggedUnionMember, CodecError> {
    let tag = r.read_str()?;
    match tag.as_str() {
        "B" => Ok(TaggedUnionMember {
            member: None,
            block: Some(read_block_body(r)?),
        }),
        "M" => Ok(TaggedUnionMember {
            member: Some(read_member(r)?),
            block: None,
        }),
        other => Err(CodecError::UnknownTag {
            expected: "B|M",
            found: other.to_string(),
        }),
    }
}

fn write_struct_or_referrer(w: &mut Writer, sr: &StructOrReferrer) {
    w.write_tag("ST");
    match sr {
        StructOrReferrer::Struct(s) => {
            w.write_tag("S");
            w.write_opt_str(&s.name);
            w.write_u64(s.members.len() as u64);
            for member in &s.members {
                write_member(w, member);
            }
        }
        StructOrReferrer::Referrer(referrer) => write_referrer(w, referrer),
    }
}

fn read_struct_or_referrer_body(r: &mut Reader) -> Result<StructOrReferrer, CodecError> {
    let tag = r.read_str()?;
    match tag.as_str() {
        "S" => {
            let name = r.read_opt_str()?;
            let count = r.read_u64()?;
            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                members.push(read_member(r)?);
            }
            Ok(StructOrReferrer::Struct(Struct { name, members }))
        }
        "R" => Ok(StructOrReferrer::Referrer(read_referrer_body(r)?)),
        other => Err(CodecError::UnknownTag {
            expected: "S|R",
            found: other.to_string(),
        }),
    }
}

fn write_enum_or_referrer(w: &mut Writer, er: &EnumerationOrReferrer) {
    w.write_tag("EN");
    match er {
        EnumerationOrReferrer::Enumeration(e) => {
            w.write_tag("E");
            w.write_opt_str(&e.name);
            w.write_u64(e.enumerators.len() as u64);
            for enumerator in &e.enumerators {
                w.write_str(&enumerator.tag);
                w.write_opt_i64(enumerator.value);
            }
        }
        EnumerationOrReferrer::Referrer(referrer) => write_referrer(w, referrer),
    }
}

fn read_enum_or_referrer_body(r: &mut Reader) -> Result<EnumerationOrReferrer, CodecError> {
    let tag = r.read_str()?;
    match tag.as_str() {
        "E" => {
            let name = r.read_opt_str()?;
            let count = r.read_u64()?;
            let mut enumerators = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let tag = r.read_str()?;
                let value = r.read_opt_i64()?;
                enumerators.push(Enumerator { tag, value });
            }
            Ok(EnumerationOrReferrer::Enumeration(Enumeration { name, enumerators }))
        }
        "R" => Ok(EnumerationOrReferrer::Referrer(read_referrer_body(r)?)),
        other => Err(CodecError::UnknownTag {
            expected: "E|R",
            found: other.to_string(),
        }),
    }
}

fn write_tagged_struct_or_referrer(w: &mut Writer, tr: &TaggedStructOrReferrer) {
    w.write_tag("TS");
    match tr {
        TaggedStructOrReferrer::TaggedStruct(ts) => {
            w.write_tag("S");
            w.write_opt_str(&ts.name);
            w.write_u64(ts.members.len() as u64);
            for (tag, member) in &ts.members {
                w.write_str(tag);
                write_ts_member(w, member);
            }
        }
        TaggedStructOrReferrer::Referrer(referrer) => write_referrer(w, referrer),
    }
}

fn read_tagged_struct_or_referrer_body(r: &mut Reader) -> Result<TaggedStructOrReferrer, CodecError> {
    let tag = r.read_str()?;
    match tag.as_str() {
        "S" => {
            let name = r.read_opt_str()?;
            let count = r.read_u64()?;
            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let member_tag = r.read_str()?;
                let member = read_ts_member(r)?;
                members.push((member_tag, member));
            }
            Ok(TaggedStructOrReferrer::TaggedStruct(TaggedStruct { name, members }))
        }
        "R" => Ok(TaggedStructOrReferrer::Referrer(read_referrer_body(r)?)),
        other => Err(CodecError::UnknownTag {
            expected: "S|R",
            found: other.to_string(),
        }),
    }
}

fn write_tagged_union_or_referrer(w: &mut Writer, tr: &TaggedUnionOrReferrer) {
    w.write_tag("TU");
    match tr {
        TaggedUnionOrReferrer::TaggedUnion(tu) => {
            w.write_tag("U");
            w.write_opt_str(&tu.name);
            w.write_u64(tu.members.len() as u64);
            for (tag, member) in &tu.members {
                w.write_str(tag);
                write_tagged_union_member(w, member);
            }
        }
        TaggedUnionOrReferrer::Referrer(referrer) => write_referrer(w, referrer),
    }
}

fn read_tagged_union_or_referrer_body(r: &mut Reader) -> Result<TaggedUnionOrReferrer, CodecError> {
    let tag = r.read_str()?;
    match tag.as_str() {
        "U" => {
            let name = r.read_opt_str()?;
            let count = r.read_u64()?;
            let mut members = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let member_tag = r.read_str()?;
                let member = read_tagged_union_member(r)?;
                members.push((member_tag, member));
            }
            Ok(TaggedUnionOrReferrer::TaggedUnion(TaggedUnion { name, members }))
        }
        "R" => Ok(TaggedUnionOrReferrer::Referrer(read_referrer_body(r)?)),
        other => Err(CodecError::UnknownTag {
            expected: "U|R",
            found: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_file() -> AmlFile {
        AmlFile {
            name: "IF_DATA".to_string(),
            declarations: vec![
                Declaration::Type(Type::Struct(StructOrReferrer::Struct(Struct {
                    name: Some("S".to_string()),
                    members: vec![
                        Member {
                            ty: Some(Type::Predefined(PredefinedType {
                                base: AmlPredefinedType::UInt,
                                array_spec: vec![],
                            })),
                            block: None,
                        },
                        Member { ty: None, block: None },
                    ],
                }))),
                Declaration::Type(Type::Enum(EnumerationOrReferrer::Enumeration(Enumeration {
                    name: None,
                    enumerators: vec![
                        Enumerator {
                            tag: "RED".to_string(),
                            value: Some(1),
                        },
                        Enumerator {
                            tag: "GREEN".to_string(),
                            value: None,
                        },
                    ],
                }))),
                Declaration::Block(BlockDefinition {
                    tag: "SEG".to_string(),
                    ty: Some(Type::Predefined(PredefinedType {
                        base: AmlPredefinedType::Int64,
                        array_spec: vec![4, 2],
                    })),
                    multiple: true,
                }),
            ],
        }
    }

    #[test]
    fn round_trips_a_representative_file() {
        let file = sample_file();
        let bytes = marshal(&file);
        let back = unmarshal(&bytes).unwrap();
        assert_eq!(file, back);
    }

    #[test]
    fn round_trips_a_referrer_typed_struct_member() {
        let file = AmlFile {
            name: "X".to_string(),
            declarations: vec![Declaration::Type(Type::TaggedStruct(
                TaggedStructOrReferrer::Referrer(Referrer {
                    category: ReferrerCategory::TaggedStruct,
                    name: "Other".to_string(),
                }),
            ))],
        };
        let back = unmarshal(&marshal(&file)).unwrap();
        assert_eq!(file, back);
    }

    #[test]
    fn rejects_truncated_input() {
        let bytes = marshal(&sample_file());
        let truncated = &bytes[..bytes.len() - 3];
        assert!(unmarshal(truncated).is_err());
    }

    #[test]
    fn rejects_an_unrecognized_predefined_type_code() {
        let file = AmlFile {
            name: "X".to_string(),
            declarations: vec![Declaration::Type(Type::Predefined(PredefinedType {
                base: AmlPredefinedType::UInt,
                array_spec: vec![],
            }))],
        };
        let mut bytes = marshal(&file);
        let code_byte = bytes.len() - 1 - 8; // trailing dim-count(8) then code(1) before it
        bytes[code_byte] = 0xFF;
        let err = unmarshal(&bytes).unwrap_err();
        assert!(matches!(err, CodecError::InvalidDiscriminator { .. }));
    }
}
