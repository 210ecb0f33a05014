//! The AML (ASAM Meta Language) sub-language compiler: lexer, recursive-
//! descent parser, and binary marshal/unmarshal codec. Together these persist
//! the IF_DATA grammar discovered while preprocessing an A2L file so that
//! IF_DATA blocks found later in the same file can be parsed against it
//! (see [`crate::if_data`]).

pub mod ast;
pub mod codec;
pub mod lexer;
pub mod parser;

pub use ast::AmlFile;
pub use codec::{unmarshal, marshal, CodecError};
pub use lexer::{aml_lex, AmlLexError, AmlToken};
pub use parser::{AmlParseError, AmlParser};

/// Lexes and parses an AML blob (the text between `/begin A2ML` and
/// `/end A2ML`, inclusive) into its AST, resolving referrers in the process.
pub fn compile(blob: &str) -> Result<AmlFile, CompileError> {
    let tokens = aml_lex(blob)?;
    let file = AmlParser::new(&tokens).parse()?;
    Ok(file)
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    Lex(AmlLexError),
    Parse(AmlParseError),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Lex(e) => write!(f, "{}", e),
            CompileError::Parse(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CompileError {}

impl From<AmlLexError> for CompileError {
    fn from(e: AmlLexError) -> Self {
        CompileError::Lex(e)
    }
}

impl From<AmlParseError> for CompileError {
    fn from(e: AmlParseError) -> Self {
        CompileError::Parse(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_minimal_aml_blob() {
        let file = compile("/begin A2ML struct S { uint; } /end A2ML").unwrap();
        assert_eq!(file.name, "A2ML");
        assert_eq!(file.declarations.len(), 1);
    }
}
