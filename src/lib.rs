//! A parser for ASAM MCD-2 MC (A2L) description files: tokenizer,
//! `/include`-resolving preprocessor, AML (ASAM Meta Language) grammar
//! compiler with a binary marshal/unmarshal codec, table-driven A2L parser,
//! and IF_DATA interpreter.
//!
//! [`parse_file`] is the entry point most callers want: it runs the full
//! pipeline and returns a [`ParseOutcome`] holding the parsed value tree, the
//! line map used for diagnostics, the raw IF_DATA store, and any non-fatal
//! warnings. [`compile_aml`], [`marshal`]/[`unmarshal`], and [`parse_if_data`]
//! expose the AML and IF_DATA subsystems on their own for callers that
//! already have a grammar or token stream in hand.

use std::path::Path;

pub mod a2l_parser;
pub mod aml;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod if_data;
pub mod preprocessor;
pub mod schema;
pub mod tokenizer;
pub mod value;

pub use aml::AmlFile;
pub use config::ParserConfig;
pub use diagnostic::{Diagnostic, DiagnosticKind};
pub use error::Error;
pub use if_data::IfDataValue;
pub use preprocessor::ifdata_store::IfDataStore;
pub use preprocessor::line_map::LineMap;
pub use value::{AsamValue, ValueContainer};

/// Everything a completed parse of one A2L file produces.
pub struct ParseOutcome {
    pub root: ValueContainer,
    pub line_map: LineMap,
    pub if_data_store: IfDataStore,
    pub warnings: Vec<Diagnostic>,
}

/// Preprocesses `path` (resolving `/include`, segregating `A2ML`/`IF_DATA`
/// content), compiles any embedded AML grammar, and parses the result
/// against the static A2L schema table.
pub fn parse_file(path: &Path, config: &ParserConfig) -> Result<ParseOutcome, Error> {
    let pre = preprocessor::Preprocessor::new(config);
    let mut result = pre.process(path)?;

    let blob = result.aml_blob.read()?;
    let grammar = if blob.trim().is_empty() {
        None
    } else {
        Some(compile_aml(&blob)?)
    };

    let tokens = result.tokens.read_all()?;
    let (root, warnings) = a2l_parser::parse(
        &tokens,
        &mut result.if_data,
        grammar.as_ref(),
        config,
        &result.line_map,
    )?;

    Ok(ParseOutcome {
        root,
        line_map: result.line_map,
        if_data_store: result.if_data,
        warnings,
    })
}

/// Lexes and parses an AML blob (`/begin A2ML ... /end A2ML`, inclusive)
/// into its AST, resolving referrers in the process.
pub fn compile_aml(blob: &str) -> Result<AmlFile, Error> {
    aml::compile(blob).map_err(|e| match e {
        aml::CompileError::Lex(e) => Error::AmlLex(e),
        aml::CompileError::Parse(e) => Error::AmlParse(e),
    })
}

/// Serializes an AML AST to its binary wire format.
pub fn marshal(file: &AmlFile) -> Vec<u8> {
    aml::marshal(file)
}

/// Deserializes an AML AST from its binary wire format.
pub fn unmarshal(bytes: &[u8]) -> Result<AmlFile, Error> {
    aml::unmarshal(bytes).map_err(Error::Codec)
}

/// Interprets one `IF_DATA` block's raw text against a compiled AML grammar.
pub fn parse_if_data(text: &str, grammar: &AmlFile) -> Result<IfDataValue, Error> {
    if_data::parse_if_data(text, grammar).map_err(Error::IfData)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::Builder::new().suffix(".a2l").tempfile().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn parses_a_minimal_file_end_to_end() {
        let file = write_temp(
            "ASAP2_VERSION 1 60\n\
             /begin PROJECT P \"proj\"\n\
             /begin MODULE M \"mod\"\n\
             /end MODULE\n\
             /end PROJECT\n",
        );
        let config = ParserConfig::default();
        let outcome = parse_file(file.path(), &config).unwrap();
        assert!(outcome.warnings.is_empty());
        assert!(outcome.root.child("PROJECT").is_some());
    }

    #[test]
    fn compiles_and_round_trips_an_aml_grammar_through_the_binary_codec() {
        let file = compile_aml("/begin A2ML struct S { uint; } /end A2ML").unwrap();
        let bytes = marshal(&file);
        let back = unmarshal(&bytes).unwrap();
        assert_eq!(file, back);
    }
}
