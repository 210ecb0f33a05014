//! Structured diagnostics shared by every pipeline stage.
//!
//! Each fatal error and non-fatal warning in the crate carries enough typed
//! data to build one of these without re-parsing a formatted string; see
//! `error.rs` for how stage-specific error enums expose a `Diagnostic`.

use serde::Serialize;
use std::fmt;

/// The kind of condition a [`Diagnostic`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Io,
    Lexical,
    Syntactic,
    Semantic,
    IfData,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiagnosticKind::Io => "io",
            DiagnosticKind::Lexical => "lexical",
            DiagnosticKind::Syntactic => "syntactic",
            DiagnosticKind::Semantic => "semantic",
            DiagnosticKind::IfData => "if_data",
        };
        write!(f, "{}", label)
    }
}

/// One `file:line:col` diagnostic, fatal or not depending on where it's raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub col: usize,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        file: impl Into<String>,
        line: usize,
        col: usize,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line,
            col,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {}",
            self.file, self.line, self.col, self.kind, self.message
        )
    }
}
