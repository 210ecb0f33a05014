//! The static A2L keyword schema and the ASAM predefined-type catalog it
//! validates parameters against.

pub mod keywords;
pub mod types;

pub use keywords::{Parameter, SchemaNode, SCHEMA_ROOT};
pub use types::{NamedEnum, PredefinedType, TokenShape};

use std::fmt;

/// Raised only while the static tree in [`keywords`] is being built; a
/// duplicate child name under one parent is a bug in that table, not a
/// runtime condition `a2lparser::parse_file` can hit, so this never appears
/// in [`crate::Error`] — it exists for the table's own `#[cfg(test)]`
/// invariant checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    DuplicateChild { parent: &'static str, child: &'static str },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::DuplicateChild { parent, child } => {
                write!(f, "duplicate child '{child}' under '{parent}'")
            }
        }
    }
}

impl std::error::Error for SchemaError {}
