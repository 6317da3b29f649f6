//! Structured diagnostics (§3, §6). The core never prints to a terminal
//! itself beyond the default `TextFormatter`; rendering with carets and
//! squiggles for an editor/LSP surface is explicitly out of scope (§1).

mod format;

pub use format::TextFormatter;

use serde::{Deserialize, Serialize};

/// Zero-indexed line + character + byte offset, matching LSP's `Position`
/// convention. §8 property 5 requires `offset(position(doc, o)) == o` for
/// every valid offset — see [`Position::from_offset`] and
/// [`Position::to_offset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Position {
    pub line: usize,
    pub character: usize,
    pub byte_offset: usize,
}

impl Position {
    /// Computes the zero-indexed line/character for a byte offset into
    /// `document`. `character` counts UTF-8 scalar values since the prior
    /// newline (or start of document), not UTF-16 code units — this core
    /// has no LSP client boundary to respect UTF-16 for.
    pub fn from_offset(document: &str, offset: usize) -> Self {
        let offset = offset.min(document.len());
        let mut line = 0usize;
        let mut line_start = 0usize;
        for (i, b) in document.as_bytes()[..offset].iter().enumerate() {
            if *b == b'\n' {
                line += 1;
                line_start = i + 1;
            }
        }
        let character = document[line_start..offset].chars().count();
        Self {
            line,
            character,
            byte_offset: offset,
        }
    }

    pub fn to_offset(&self) -> usize {
        self.byte_offset
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(document: &str, start_offset: usize, end_offset: usize) -> Self {
        Self {
            start: Position::from_offset(document, start_offset),
            end: Position::from_offset(document, end_offset),
        }
    }

    /// A zero-width range at a single offset, used when a diagnostic has no
    /// natural span (e.g. a whole-file error).
    pub fn point(document: &str, offset: usize) -> Self {
        let pos = Position::from_offset(document, offset);
        Self { start: pos, end: pos }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        };
        f.write_str(s)
    }
}

/// LSP's own tag vocabulary (§3 expansion): used for strike-through
/// rendering of diagnostics that don't change severity (e.g. a redundant
/// `IF NOT EXISTS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticTag {
    Unnecessary,
    Deprecated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelatedLocation {
    pub file: String,
    pub range: Range,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Diagnostic {
    pub range: Range,
    pub severity: Severity,
    /// Stable identifier, e.g. `"syntax_error"`, `"dangerous_drop_table"`.
    pub code: String,
    pub source: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<RelatedLocation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<DiagnosticTag>,
}

/// Source identifier used for every diagnostic the DDL Parser emits.
pub const PARSER_SOURCE: &str = "pg-schema-sync";

impl Diagnostic {
    pub fn error(range: Range, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Error,
            code: code.into(),
            source: PARSER_SOURCE.to_string(),
            message: message.into(),
            related: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn warning(range: Range, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(range, code, message)
        }
    }

    pub fn hint(range: Range, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Hint,
            ..Self::error(range, code, message)
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}
