//! The parsed-output tree: a plain recursive struct, not a generic tree crate.
//!
//! AML's referrer indirection is resolved through a lookup table at parse
//! time (see [`crate::aml::parser`]), so there is no need for back-pointers
//! or shared ownership here — every container owns its children outright.

use serde::Serialize;

use crate::if_data::IfDataValue;

/// A single parameter or repeated-value slot. Mirrors the source's
/// `AsamVariantType` tagged union exactly: string, unsigned, signed, float.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AsamValue {
    Str(String),
    UInt(u64),
    Int(i64),
    Float(f64),
}

impl AsamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AsamValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u64> {
        match self {
            AsamValue::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AsamValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AsamValue::Float(v) => Some(*v),
            _ => None,
        }
    }
}

/// One node of the parsed A2L tree: a keyword's name, its parameter values,
/// its nested keywords, and (for tuple-tailed keywords) the repeated rows
/// that followed the fixed parameter list.
#[derive(Debug, Clone, Serialize)]
pub struct ValueContainer {
    pub name: String,
    pub parameters: Vec<AsamValue>,
    pub keywords: Vec<ValueContainer>,
    pub multiple_values: Vec<AsamValue>,
    pub if_data: Option<IfDataValue>,
}

impl ValueContainer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            keywords: Vec::new(),
            multiple_values: Vec::new(),
            if_data: None,
        }
    }

    /// First direct child keyword with the given class name, if any.
    pub fn child(&self, name: &str) -> Option<&ValueContainer> {
        self.keywords.iter().find(|k| k.name == name)
    }

    /// All direct child keywords with the given class name.
    pub fn children(&self, name: &str) -> impl Iterator<Item = &ValueContainer> {
        self.keywords.iter().filter(move |k| k.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_lookup_finds_first_match_by_name() {
        let mut root = ValueContainer::new("MODULE");
        root.keywords.push(ValueContainer::new("MEASUREMENT"));
        root.keywords.push(ValueContainer::new("MEASUREMENT"));
        root.keywords.push(ValueContainer::new("CHARACTERISTIC"));
        assert_eq!(root.children("MEASUREMENT").count(), 2);
        assert!(root.child("CHARACTERISTIC").is_some());
        assert!(root.child("UNIT").is_none());
    }

    #[test]
    fn asam_value_accessors_only_match_their_own_variant() {
        let v = AsamValue::UInt(7);
        assert_eq!(v.as_uint(), Some(7));
        assert_eq!(v.as_int(), None);
        assert_eq!(v.as_str(), None);
    }
}
