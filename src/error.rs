//! Crate-level error aggregation.
//!
//! Each pipeline stage (see `preprocessor`, `aml::lexer`, `aml::parser`,
//! `aml::codec`, `a2l_parser`, `if_data`) owns a small `Debug + Clone` error
//! enum with a hand-rolled `Display`, the way the teacher's
//! `src/parser/infrastructure/error.rs::ParserError` and
//! `src/api.rs::ProcessError` do it — no `thiserror`/`anyhow`. This module
//! composes them behind one public enum so [`crate::parse_file`] can
//! propagate any stage's failure with `?`.

use std::fmt;
use std::io;

use crate::a2l_parser::A2lParseError;
use crate::aml::codec::CodecError;
use crate::aml::lexer::AmlLexError;
use crate::aml::parser::AmlParseError;
use crate::if_data::IfDataError;
use crate::preprocessor::PreprocessorError;

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Preprocess(PreprocessorError),
    AmlLex(AmlLexError),
    AmlParse(AmlParseError),
    Codec(CodecError),
    A2l(A2lParseError),
    IfData(IfDataError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Preprocess(e) => write!(f, "preprocessor error: {}", e),
            Error::AmlLex(e) => write!(f, "AML lexer error: {}", e),
            Error::AmlParse(e) => write!(f, "AML parser error: {}", e),
            Error::Codec(e) => write!(f, "AML codec error: {}", e),
            Error::A2l(e) => write!(f, "A2L parser error: {}", e),
            Error::IfData(e) => write!(f, "IF_DATA error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Preprocess(e) => Some(e),
            Error::AmlLex(e) => Some(e),
            Error::AmlParse(e) => Some(e),
            Error::Codec(e) => Some(e),
            Error::A2l(e) => Some(e),
            Error::IfData(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<PreprocessorError> for Error {
    fn from(e: PreprocessorError) -> Self {
        Error::Preprocess(e)
    }
}

impl From<AmlLexError> for Error {
    fn from(e: AmlLexError) -> Self {
        Error::AmlLex(e)
    }
}

impl From<AmlParseError> for Error {
    fn from(e: AmlParseError) -> Self {
        Error::AmlParse(e)
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        Error::Codec(e)
    }
}

impl From<A2lParseError> for Error {
    fn from(e: A2lParseError) -> Self {
        Error::A2l(e)
    }
}

impl From<IfDataError> for Error {
    fn from(e: IfDataError) -> Self {
        Error::IfData(e)
    }
}
