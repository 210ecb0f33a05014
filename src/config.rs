//! Run configuration threaded explicitly through the pipeline.
//!
//! The source reaches for process-wide mutable state (a static `encoding`
//! string on `ValueContainer`, an environment lookup inlined in the include
//! resolver). We keep the equivalent knobs but pass them in through a single
//! struct, the way the teacher threads `ProcessArgs` into its pure `process()`
//! function instead of reading ambient globals.

use std::env;
use std::path::PathBuf;

/// Caller-selected label for decoding string payload bytes. The tokenizer and
/// parser never decode text themselves (see [`crate::value::AsamValue`]); this
/// label is only consulted when a caller asks for a decoded `String`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingLabel {
    Latin1,
    Utf8,
}

impl EncodingLabel {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            EncodingLabel::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            EncodingLabel::Latin1 => bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

/// Environment variable the preprocessor consults for extra include directories.
pub const ASAP_INCLUDE_VAR: &str = "ASAP_INCLUDE";

#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// How to decode `AsamValue::Str` payload bytes when a caller asks for text.
    pub encoding: EncodingLabel,
    /// Extra directories searched for `/include`, after cwd and the including
    /// file's own directory. Normally populated from `ASAP_INCLUDE`.
    pub include_path: Vec<PathBuf>,
    /// When true (default), AML comments are blanked to equal-length
    /// whitespace rather than preserved verbatim in the AML blob.
    pub suppress_comments: bool,
    /// Promote IF_DATA parse failures from warnings to fatal errors.
    pub strict_if_data: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            encoding: EncodingLabel::Latin1,
            include_path: Vec::new(),
            suppress_comments: true,
            strict_if_data: false,
        }
    }
}

impl ParserConfig {
    /// Builds a config with `include_path` populated from `ASAP_INCLUDE`
    /// (colon-separated on POSIX, semicolon-separated on Windows).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(value) = env::var(ASAP_INCLUDE_VAR) {
            cfg.include_path = split_include_path(&value);
        }
        cfg
    }
}

fn split_include_path(value: &str) -> Vec<PathBuf> {
    let sep = if cfg!(windows) { ';' } else { ':' };
    value
        .split(sep)
        .filter(|segment| !segment.is_empty())
        .map(PathBuf::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_blanked_comments_and_lenient_if_data() {
        let cfg = ParserConfig::default();
        assert!(cfg.suppress_comments);
        assert!(!cfg.strict_if_data);
        assert!(cfg.include_path.is_empty());
    }

    #[test]
    fn include_path_splits_on_platform_separator() {
        let sep = if cfg!(windows) { ";" } else { ":" };
        let joined = format!("a{sep}b{sep}c");
        let parts = split_include_path(&joined);
        assert_eq!(parts, vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]);
    }

    #[test]
    fn latin1_decodes_high_bytes_one_to_one() {
        let decoded = EncodingLabel::Latin1.decode(&[0xE9]);
        assert_eq!(decoded, "\u{e9}");
    }
}
