//! The ASAM predefined-type catalog used to validate individual A2L
//! parameters, plus the six named enumerations the schema table's
//! parameters reference by literal token set.

use crate::value::AsamValue;

/// Which lexical token class a parameter accepts, coarser than the full
/// tokenizer classification — digits/sign/hex-prefix are examined in
/// [`PredefinedType::validate`], not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenShape {
    IntegerDecimal,
    IntegerHex,
    Float,
    Identifier,
    StringLiteral,
}

/// A fixed catalog entry: signed/unsigned integer widths, float, string,
/// identifier, or "one of these named enumeration literals".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredefinedType {
    Int,
    UInt,
    Long,
    ULong,
    Float,
    String,
    Ident,
    Enum(NamedEnum),
}

impl PredefinedType {
    pub fn accepted_shapes(self) -> &'static [TokenShape] {
        use TokenShape::*;
        match self {
            PredefinedType::Int | PredefinedType::Long => &[IntegerDecimal, IntegerHex],
            PredefinedType::UInt | PredefinedType::ULong => &[IntegerDecimal, IntegerHex],
            PredefinedType::Float => &[Float, IntegerDecimal],
            PredefinedType::String => &[StringLiteral],
            PredefinedType::Ident => &[Identifier],
            PredefinedType::Enum(_) => &[Identifier],
        }
    }

    /// Validates already-tokenized text and produces the normalized value,
    /// or `None` if the text is out of range / not a recognized literal.
    pub fn validate(self, text: &str) -> Option<AsamValue> {
        match self {
            PredefinedType::Int => parse_signed(text, i16::MIN as i64, i16::MAX as i64),
            PredefinedType::Long => parse_signed(text, i32::MIN as i64, i32::MAX as i64),
            PredefinedType::UInt => parse_unsigned(text, u16::MAX as u64),
            PredefinedType::ULong => parse_unsigned(text, u32::MAX as u64),
            PredefinedType::Float => text.parse::<f64>().ok().map(AsamValue::Float),
            PredefinedType::String => Some(AsamValue::Str(text.to_string())),
            PredefinedType::Ident => Some(AsamValue::Str(text.to_string())),
            PredefinedType::Enum(e) => e
                .literals()
                .contains(&text)
                .then(|| AsamValue::Str(text.to_string())),
        }
    }

    pub fn valid_range(self) -> String {
        match self {
            PredefinedType::Int => format!("{}..={}", i16::MIN, i16::MAX),
            PredefinedType::Long => format!("{}..={}", i32::MIN, i32::MAX),
            PredefinedType::UInt => format!("0..={}", u16::MAX),
            PredefinedType::ULong => format!("0..={}", u32::MAX),
            PredefinedType::Float => "any finite double".to_string(),
            PredefinedType::String => "any quoted string".to_string(),
            PredefinedType::Ident => "any identifier".to_string(),
            PredefinedType::Enum(e) => format!("one of {:?}", e.literals()),
        }
    }
}

fn parse_signed(text: &str, min: i64, max: i64) -> Option<AsamValue> {
    let value = parse_int_literal(text)?;
    (min..=max).contains(&value).then_some(AsamValue::Int(value))
}

fn parse_unsigned(text: &str, max: u64) -> Option<AsamValue> {
    let value = parse_int_literal(text)?;
    if value < 0 {
        return None;
    }
    let value = value as u64;
    (value <= max).then_some(AsamValue::UInt(value))
}

/// Accepts optional leading `-`/`+` and an optional `0x`/`0X` hex prefix,
/// matching the tokenizer's "regular run" shape rather than `str::parse`'s
/// stricter Rust integer-literal grammar.
fn parse_int_literal(text: &str) -> Option<i64> {
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

/// The named enumerations referenced by schema-table parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedEnum {
    Datatype,
    IndexOrder,
    AddrType,
    ByteOrder,
    DataSize,
    LinkType,
    CalibrationAccess,
    DepositMode,
    CharacteristicType,
    AxisDescrAttribute,
    Monotony,
    FncValuesIndexMode,
    LayoutIndexMode,
    CompuMethodConversionType,
    CompuTabConversionType,
    CompuVtabConversionType,
    MemoryLayoutPrgType,
    MemorySegmentPrgType,
    MemoryType,
    MemorySegmentAttribute,
    VarNamingTag,
}

impl NamedEnum {
    pub fn literals(self) -> &'static [&'static str] {
        match self {
            NamedEnum::Datatype => &[
                "UBYTE",
                "SBYTE",
                "UWORD",
                "SWORD",
                "ULONG",
                "SLONG",
                "A_UINT64",
                "A_INT64",
                "FLOAT16_IEEE",
                "FLOAT32_IEEE",
                "FLOAT64_IEEE",
            ],
            NamedEnum::IndexOrder => &["INDEX_INCR", "INDEX_DECR"],
            NamedEnum::AddrType => &["PBYTE", "PWORD", "PLONG", "DIRECT"],
            NamedEnum::ByteOrder => &["LITTLE_ENDIAN", "BIG_ENDIAN", "MSB_LAST", "MSB_FIRST"],
            NamedEnum::DataSize => &["BYTE", "WORD", "LONG"],
            NamedEnum::LinkType => &["SYMBOL_TYPE_LINK"],
            NamedEnum::CalibrationAccess => &[
                "CALIBRATION",
                "NO_CALIBRATION",
                "NOT_IN_MCD_SYSTEM",
                "OFFLINE_CALIBRATION",
            ],
            NamedEnum::DepositMode => &["ABSOLUTE", "DIFFERENCE"],
            NamedEnum::CharacteristicType => &[
                "ASCII", "CURVE", "MAP", "CUBOID", "CUBE_4", "CUBE_5", "VAL_BLK", "VALUE",
            ],
            NamedEnum::AxisDescrAttribute => {
                &["CURVE_AXIS", "COM_AXIS", "FIX_AXIS", "RES_AXIS", "STD_AXIS"]
            }
            NamedEnum::Monotony => &[
                "MON_DECREASE",
                "MON_INCREASE",
                "STRICT_DECREASE",
                "STRICT_INCREASE",
                "MONOTONOUS",
                "STRICT_MON",
                "NOT_MON",
            ],
            NamedEnum::FncValuesIndexMode => &[
                "ALTERNATE_CURVES",
                "ALTERNATE_WITH_X",
                "ALTERNATE_WITH_Y",
                "COLUMN_DIR",
                "ROW_DIR",
            ],
            NamedEnum::LayoutIndexMode => &["ROW_DIR", "COLUMN_DIR"],
            NamedEnum::CompuMethodConversionType => &[
                "IDENTICAL", "FORM", "LINEAR", "RAT_FUNC", "TAB_INTP", "TAB_NOINTP", "TAB_VERB",
            ],
            NamedEnum::CompuTabConversionType => &["TAB_INTP", "TAB_NOINTP"],
            NamedEnum::CompuVtabConversionType => &["TAB_VERB"],
            NamedEnum::MemoryLayoutPrgType => &["PRG_CODE", "PRG_DATA", "PRG_RESERVED"],
            NamedEnum::MemorySegmentPrgType => &[
                "CALIBRATION_VARIABLES",
                "CODE",
                "DATA",
                "EXCLUDE_FROM_FLASH",
                "OFFLINE_DATA",
                "RESERVED",
                "SERAM",
                "VARIABLES",
            ],
            NamedEnum::MemoryType => {
                &["EEPROM", "EPROM", "FLASH", "RAM", "ROM", "REGISTER", "NOT_IN_ECU"]
            }
            NamedEnum::MemorySegmentAttribute => &["INTERN", "EXTERN"],
            NamedEnum::VarNamingTag => &["NUMERIC", "APLHA"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uint_rejects_values_above_u16_max() {
        assert!(PredefinedType::UInt.validate("65536").is_none());
        assert_eq!(
            PredefinedType::UInt.validate("65535"),
            Some(AsamValue::UInt(65535))
        );
    }

    #[test]
    fn int_accepts_hex_and_negative_decimal() {
        assert_eq!(PredefinedType::Int.validate("0x10"), Some(AsamValue::Int(16)));
        assert_eq!(PredefinedType::Int.validate("-5"), Some(AsamValue::Int(-5)));
    }

    #[test]
    fn enum_validates_against_literal_set_only() {
        let e = PredefinedType::Enum(NamedEnum::ByteOrder);
        assert!(e.validate("LITTLE_ENDIAN").is_some());
        assert!(e.validate("MIDDLE_ENDIAN").is_none());
    }

    #[test]
    fn float_accepts_plain_integer_text_too() {
        assert_eq!(PredefinedType::Float.validate("3.5"), Some(AsamValue::Float(3.5)));
        assert_eq!(PredefinedType::Float.validate("3"), Some(AsamValue::Float(3.0)));
    }
}
