//! Error-recovery cascade (§4.2 "Error recovery") run when `pg_query` fails
//! to parse a statement. Each analyzer inspects the raw statement text for a
//! specific known failure shape and, if it matches, returns a diagnostic
//! with a more actionable message than libpg_query's own parse error. The
//! first analyzer to match wins; if none match, the raw parser message is
//! used as a fallback.

use crate::diagnostics::{Diagnostic, Range};

/// Catalog of common typos seeded from real migration authoring mistakes
/// (§4.2 expansion). Checked case-insensitively as a whole word.
const KEYWORD_TYPOS: &[(&str, &str)] = &[
    ("UNQUE", "UNIQUE"),
    ("PRIMAR KEY", "PRIMARY KEY"),
    ("FORIEGN KEY", "FOREIGN KEY"),
    ("REFRENCES", "REFERENCES"),
    ("DEFUALT", "DEFAULT"),
    ("NUL", "NULL"),
    ("VARCHR", "VARCHAR"),
    ("INTEGR", "INTEGER"),
];

const FOREIGN_DIALECT_MARKERS: &[(&str, &str)] = &[
    ("AUTO_INCREMENT", "AUTO_INCREMENT is a MySQL-ism; use a SERIAL/IDENTITY column instead"),
    ("`", "backtick-quoted identifiers are a MySQL-ism; PostgreSQL uses double quotes"),
];

/// Attempts each recovery analyzer in order and returns the first match,
/// falling back to `raw_parser_message` with a whole-statement range.
pub fn recover(source: &str, stmt_text: &str, stmt_offset: usize, raw_parser_message: &str) -> Diagnostic {
    if let Some(d) = check_foreign_dialect(source, stmt_text, stmt_offset) {
        return d;
    }
    if let Some(d) = check_keyword_typo(source, stmt_text, stmt_offset) {
        return d;
    }
    if let Some(d) = check_missing_comma(source, stmt_text, stmt_offset) {
        return d;
    }
    if let Some(d) = check_trailing_comma(source, stmt_text, stmt_offset) {
        return d;
    }
    if let Some(d) = check_missing_semicolon(source, stmt_text, stmt_offset) {
        return d;
    }
    if let Some(d) = check_missing_opening_paren(source, stmt_text, stmt_offset) {
        return d;
    }
    if let Some(d) = check_unbalanced_parens(source, stmt_text, stmt_offset) {
        return d;
    }
    if let Some(d) = check_missing_on_clause(source, stmt_text, stmt_offset) {
        return d;
    }

    Diagnostic::error(
        Range::new(source, stmt_offset, stmt_offset + stmt_text.len()),
        "syntax_error",
        raw_parser_message.to_string(),
    )
}

fn check_foreign_dialect(source: &str, stmt_text: &str, stmt_offset: usize) -> Option<Diagnostic> {
    let upper = stmt_text.to_uppercase();
    for (marker, message) in FOREIGN_DIALECT_MARKERS {
        if let Some(pos) = upper.find(marker) {
            return Some(Diagnostic::error(
                Range::new(source, stmt_offset + pos, stmt_offset + pos + marker.len()),
                "foreign_dialect_feature",
                message.to_string(),
            ));
        }
    }
    None
}

fn check_keyword_typo(source: &str, stmt_text: &str, stmt_offset: usize) -> Option<Diagnostic> {
    let upper = stmt_text.to_uppercase();
    for (typo, correct) in KEYWORD_TYPOS {
        if let Some(pos) = find_word(&upper, typo) {
            return Some(Diagnostic::error(
                Range::new(source, stmt_offset + pos, stmt_offset + pos + typo.len()),
                "syntax_error",
                format!("unexpected {typo}, did you mean {correct}?"),
            ));
        }
    }
    None
}

/// Heuristic: two identifiers/types separated only by whitespace inside a
/// column list, e.g. `id integer name text` missing the comma.
fn check_missing_comma(source: &str, stmt_text: &str, stmt_offset: usize) -> Option<Diagnostic> {
    let paren_start = stmt_text.find('(')?;
    let paren_end = stmt_text.rfind(')')?;
    if paren_end <= paren_start {
        return None;
    }
    let body = &stmt_text[paren_start + 1..paren_end];
    for line in body.split(',') {
        let words: Vec<&str> = line.split_whitespace().collect();
        // A column def is `name type [constraints...]`; four or more bare
        // words with no comma between them usually means two column defs
        // got smashed together, e.g. "id integer name text".
        if words.len() >= 4 && words.iter().all(|w| w.chars().all(|c| c.is_alphanumeric() || c == '_')) {
            let pos = stmt_text.find(line)?;
            return Some(Diagnostic::error(
                Range::point(source, stmt_offset + pos),
                "missing_comma",
                "expected a comma between column definitions",
            ));
        }
    }
    None
}

fn check_trailing_comma(source: &str, stmt_text: &str, stmt_offset: usize) -> Option<Diagnostic> {
    let trimmed_idx = stmt_text.rfind(')')?;
    let before_paren = stmt_text[..trimmed_idx].trim_end();
    if before_paren.ends_with(',') {
        let pos = before_paren.len() - 1;
        return Some(Diagnostic::error(
            Range::point(source, stmt_offset + pos),
            "trailing_comma",
            "trailing comma before closing parenthesis",
        ));
    }
    None
}

/// A statement's closing `)` followed by a blank-ish line and the next
/// statement's `CREATE` usually means the semicolon between them was
/// dropped, so the splitter handed the parser two statements as one blob.
fn check_missing_semicolon(source: &str, stmt_text: &str, stmt_offset: usize) -> Option<Diagnostic> {
    let chars: Vec<(usize, char)> = stmt_text.char_indices().collect();
    for (idx, c) in chars.iter().enumerate() {
        if c.1 != ')' {
            continue;
        }
        let mut k = idx + 1;
        let mut saw_newline = false;
        while k < chars.len() && chars[k].1.is_whitespace() {
            saw_newline |= chars[k].1 == '\n';
            k += 1;
        }
        if !saw_newline || k >= chars.len() {
            continue;
        }
        let rest = &stmt_text[chars[k].0..];
        if rest.get(..6).is_some_and(|head| head.eq_ignore_ascii_case("CREATE")) {
            return Some(Diagnostic::error(
                Range::point(source, stmt_offset + chars[k].0),
                "missing_semicolon",
                "statements must be separated by a semicolon",
            ));
        }
    }
    None
}

/// `CREATE TABLE name` with no `(` following means the column list's
/// opening paren was dropped.
fn check_missing_opening_paren(source: &str, stmt_text: &str, stmt_offset: usize) -> Option<Diagnostic> {
    let upper = stmt_text.to_uppercase();
    let create_pos = upper.find("CREATE TABLE")?;
    let mut rest = stmt_text[create_pos + "CREATE TABLE".len()..].trim_start();
    if rest.to_uppercase().starts_with("IF NOT EXISTS") {
        rest = rest["IF NOT EXISTS".len()..].trim_start();
    }
    let name_len = rest.find(|c: char| c.is_whitespace() || c == '(').unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let after_name = rest[name_len..].trim_start();
    if after_name.starts_with('(') {
        return None;
    }
    let pos = stmt_text.len() - after_name.len();
    Some(Diagnostic::error(
        Range::point(source, stmt_offset + pos),
        "missing_opening_paren",
        "expected '(' after the table name",
    ))
}

fn check_unbalanced_parens(source: &str, stmt_text: &str, stmt_offset: usize) -> Option<Diagnostic> {
    let mut depth: i32 = 0;
    for (i, c) in stmt_text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return Some(Diagnostic::error(
                Range::point(source, stmt_offset + i),
                "unbalanced_parens",
                "unexpected closing parenthesis with no matching open",
            ));
        }
    }
    if depth > 0 {
        return Some(Diagnostic::error(
            Range::point(source, stmt_offset + stmt_text.len()),
            "unbalanced_parens",
            "statement ends with unclosed parenthesis",
        ));
    }
    None
}

fn check_missing_on_clause(source: &str, stmt_text: &str, stmt_offset: usize) -> Option<Diagnostic> {
    let upper = stmt_text.to_uppercase();
    if upper.trim_start().starts_with("CREATE INDEX") || upper.contains("CREATE UNIQUE INDEX") {
        if !upper.contains(" ON ") {
            return Some(Diagnostic::error(
                Range::new(source, stmt_offset, stmt_offset + stmt_text.len()),
                "incomplete_statement",
                "CREATE INDEX is missing its ON <table> clause",
            ));
        }
    }
    if upper.contains("REFERENCES") {
        let after = upper.split("REFERENCES").nth(1).unwrap_or("");
        if after.trim().is_empty() {
            return Some(Diagnostic::error(
                Range::new(source, stmt_offset, stmt_offset + stmt_text.len()),
                "incomplete_statement",
                "REFERENCES is missing its target table",
            ));
        }
    }
    None
}

fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut start = 0;
    while let Some(rel) = haystack[start..].find(needle) {
        let pos = start + rel;
        let before_ok = pos == 0 || !is_ident_byte(bytes[pos - 1]);
        let after = pos + needle.len();
        let after_ok = after >= bytes.len() || !is_ident_byte(bytes[after]);
        if before_ok && after_ok {
            return Some(pos);
        }
        start = pos + 1;
    }
    None
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
