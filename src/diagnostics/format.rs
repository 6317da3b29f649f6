//! Default text formatter for diagnostics (§6).
//!
//! Groups by file, sorts by `(line, character)`, converts zero-indexed
//! positions to one-indexed on emission, and renders a three-line code
//! context excerpt capped at 80 columns with a `→` marker on the offending
//! line and a `~` underline across the range.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::Diagnostic;

const MAX_EXCERPT_WIDTH: usize = 80;

pub struct TextFormatter;

impl TextFormatter {
    /// Renders diagnostics grouped by file, sorted `(line, character)`
    /// within each file. `sources` maps file path to its full document text,
    /// used to build the code-context excerpt.
    pub fn format(diagnostics: &[(String, Diagnostic)], sources: &BTreeMap<String, String>) -> String {
        let mut by_file: BTreeMap<&str, Vec<&Diagnostic>> = BTreeMap::new();
        for (file, diag) in diagnostics {
            by_file.entry(file.as_str()).or_default().push(diag);
        }

        let mut out = String::new();
        for (file, mut diags) in by_file {
            diags.sort_by_key(|d| (d.range.start.line, d.range.start.character));
            let source = sources.get(file).map(String::as_str).unwrap_or("");
            for diag in diags {
                format_one(&mut out, file, diag, source);
            }
        }
        out
    }
}

fn format_one(out: &mut String, file: &str, diag: &Diagnostic, source: &str) {
    let line_1based = diag.range.start.line + 1;
    let col_1based = diag.range.start.character + 1;
    let _ = writeln!(
        out,
        "{file}:{line_1based}:{col_1based}: {}: {}",
        diag.severity, diag.message
    );
    if let Some(excerpt) = code_context(source, diag) {
        out.push_str(&excerpt);
    }
}

/// Three physical lines around `diag.range.start.line` (the line itself plus
/// one neighbor on each side where present), with a `→` gutter on the
/// offending line and a `~` underline spanning the range on that line.
fn code_context(source: &str, diag: &Diagnostic) -> Option<String> {
    if source.is_empty() {
        return None;
    }
    let lines: Vec<&str> = source.lines().collect();
    let target = diag.range.start.line;
    if target >= lines.len() {
        return None;
    }

    let mut out = String::new();
    let start = target.saturating_sub(1);
    let end = (target + 1).min(lines.len() - 1);

    for (idx, line) in lines.iter().enumerate().take(end + 1).skip(start) {
        let capped = cap_line(line);
        let gutter = if idx == target { "→ " } else { "  " };
        let _ = writeln!(out, "{gutter}{:>4} | {}", idx + 1, capped);
        if idx == target {
            let underline_start = diag.range.start.character.min(MAX_EXCERPT_WIDTH);
            let span = if diag.range.end.line == diag.range.start.line {
                diag.range
                    .end
                    .character
                    .saturating_sub(diag.range.start.character)
                    .max(1)
            } else {
                1
            };
            let underline_len = span.min(MAX_EXCERPT_WIDTH.saturating_sub(underline_start)).max(1);
            let prefix_width = "  ".len() + 4 + 3; // gutter + line-number field + " | "
            let _ = writeln!(
                out,
                "{}{}{}",
                " ".repeat(prefix_width + underline_start),
                "~".repeat(underline_len),
                ""
            );
        }
    }
    Some(out)
}

fn cap_line(line: &str) -> String {
    if line.chars().count() <= MAX_EXCERPT_WIDTH {
        line.to_string()
    } else {
        line.chars().take(MAX_EXCERPT_WIDTH).collect()
    }
}
