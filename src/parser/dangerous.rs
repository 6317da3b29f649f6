//! Text-based dangerous-pattern checks (§4.2 "Dangerous pattern validation").
//!
//! These run over the raw statement text rather than the AST: some of the
//! patterns here (typmod typos, transaction control) are rejected before
//! `pg_query` would even attempt to parse them, and running text scans ahead
//! of parsing keeps the diagnostics for them independent of parser recovery.
//! All scans are quote/comment-aware via [`super::statement_split`] so a
//! `DROP TABLE` mentioned inside a string literal or comment is never
//! flagged.

use crate::diagnostics::{Diagnostic, Range};

/// Returns diagnostics for one already-isolated statement. `stmt_offset` is
/// the statement's byte offset into `source`, used to translate in-statement
/// match positions back into document-relative ranges.
pub fn check_statement(source: &str, stmt_text: &str, stmt_offset: usize) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let upper = stmt_text.to_uppercase();

    check_keyword_prefix(source, stmt_text, &upper, stmt_offset, "DROP TABLE", "dangerous_drop_table", "DROP TABLE is irreversible without a prior backup; review before applying", &mut diagnostics);
    check_keyword_prefix(source, stmt_text, &upper, stmt_offset, "TRUNCATE", "dangerous_truncate", "TRUNCATE discards all rows and is not reversible", &mut diagnostics);

    if let Some(pos) = find_word(&upper, "DROP COLUMN") {
        diagnostics.push(make(source, stmt_offset, pos, "DROP COLUMN".len(), "dangerous_drop_column", "dropping a column discards its data irreversibly"));
    }

    if contains_delete_without_where(&upper) {
        let pos = find_word(&upper, "DELETE").unwrap_or(0);
        diagnostics.push(make(source, stmt_offset, pos, "DELETE".len(), "dangerous_delete_all", "DELETE without a WHERE clause removes every row in the table"));
    }

    if let Some(pos) = find_word(&upper, "IF NOT EXISTS") {
        diagnostics.push(Diagnostic::warning(
            Range::point(source, stmt_offset + pos),
            "conditional_ddl_rejected",
            "IF NOT EXISTS masks schema drift; the desired schema must describe an exact target state",
        ));
    }

    for keyword in ["BEGIN", "COMMIT", "ROLLBACK", "SAVEPOINT"] {
        if let Some(pos) = find_word(&upper, keyword) {
            diagnostics.push(make(source, stmt_offset, pos, keyword.len(), "transaction_control_rejected", "transaction control statements are not allowed in desired-schema files; the Executor manages transactions"));
        }
    }

    if let Some(pos) = find_word(&upper, "CREATE OR REPLACE") {
        diagnostics.push(make(source, stmt_offset, pos, "CREATE OR REPLACE".len(), "create_or_replace_rejected", "CREATE OR REPLACE hides what changed; declare the object once and let the Differ compute the change"));
    }

    if let Some(pos) = find_word(&upper, "TIMESTAMPZ") {
        diagnostics.push(Diagnostic::hint(
            Range::new(source, stmt_offset + pos, stmt_offset + pos + "TIMESTAMPZ".len()),
            "likely_typo_timestampz",
            "TIMESTAMPZ is not a PostgreSQL type; did you mean TIMESTAMPTZ?",
        ));
    }

    diagnostics
}

fn check_keyword_prefix(
    source: &str,
    stmt_text: &str,
    upper: &str,
    stmt_offset: usize,
    keyword: &str,
    code: &str,
    message: &str,
    out: &mut Vec<Diagnostic>,
) {
    let _ = stmt_text;
    if let Some(pos) = find_word(upper, keyword) {
        out.push(make(source, stmt_offset, pos, keyword.len(), code, message));
    }
}

fn make(source: &str, stmt_offset: usize, local_pos: usize, len: usize, code: &str, message: &str) -> Diagnostic {
    Diagnostic::error(
        Range::new(source, stmt_offset + local_pos, stmt_offset + local_pos + len),
        code,
        message,
    )
}

/// Finds `needle` as a whole-word match (not embedded in a longer
/// identifier) in `haystack`, both assumed uppercase.
fn find_word(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let needle_bytes = needle.as_bytes();
    let mut start = 0;
    while let Some(rel) = haystack[start..].find(needle) {
        let pos = start + rel;
        let before_ok = pos == 0 || !is_ident_byte(bytes[pos - 1]);
        let after = pos + needle_bytes.len();
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

fn contains_delete_without_where(upper: &str) -> bool {
    find_word(upper, "DELETE").is_some() && find_word(upper, "WHERE").is_none()
}
