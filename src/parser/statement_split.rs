//! Statement splitter (§4.2 "Statement splitting").
//!
//! A small state machine that finds top-level `;` boundaries while
//! respecting single-quoted strings, double-quoted identifiers, line
//! comments (`-- ...\n`), and non-nesting block comments (`/* ... */`).
//! Shared by the DDL Parser's per-statement diagnostics, the reverse
//! planner's textual statement-kind dispatch (§4.5), and the desired-schema
//! loader's `-- File:` boundary tracking (§6).

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    /// 1-based line number of the statement's first non-whitespace token.
    pub line: usize,
    pub start_offset: usize,
    pub end_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    DollarQuoted,
    LineComment,
    BlockComment,
}

/// Split `source` into top-level statements, each tagged with the 1-based
/// line number of its first non-whitespace character.
pub fn split_statements(source: &str) -> Vec<Statement> {
    let bytes = source.as_bytes();
    let mut state = State::Normal;
    let mut statements = Vec::new();
    let mut stmt_start = 0usize;
    let mut i = 0usize;
    let mut dollar_tag: Option<String> = None;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match state {
            State::Normal => {
                if c == '\'' {
                    state = State::SingleQuoted;
                    i += 1;
                } else if c == '"' {
                    state = State::DoubleQuoted;
                    i += 1;
                } else if c == '-' && bytes.get(i + 1) == Some(&b'-') {
                    state = State::LineComment;
                    i += 2;
                } else if c == '/' && bytes.get(i + 1) == Some(&b'*') {
                    state = State::BlockComment;
                    i += 2;
                } else if c == '$' {
                    if let Some((tag, len)) = match_dollar_tag(&source[i..]) {
                        dollar_tag = Some(tag);
                        state = State::DollarQuoted;
                        i += len;
                    } else {
                        i += 1;
                    }
                } else if c == ';' {
                    push_statement(&mut statements, source, stmt_start, i + 1);
                    stmt_start = i + 1;
                    i += 1;
                } else {
                    i += 1;
                }
            }
            State::SingleQuoted => {
                if c == '\'' {
                    // `''` is an escaped quote, not a terminator.
                    if bytes.get(i + 1) == Some(&b'\'') {
                        i += 2;
                    } else {
                        state = State::Normal;
                        i += 1;
                    }
                } else {
                    i += 1;
                }
            }
            State::DoubleQuoted => {
                if c == '"' {
                    if bytes.get(i + 1) == Some(&b'"') {
                        i += 2;
                    } else {
                        state = State::Normal;
                        i += 1;
                    }
                } else {
                    i += 1;
                }
            }
            State::DollarQuoted => {
                let tag = dollar_tag.clone().unwrap_or_default();
                if source[i..].starts_with(&tag) {
                    state = State::Normal;
                    i += tag.len();
                } else {
                    i += 1;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Normal;
                }
                i += 1;
            }
            State::BlockComment => {
                if c == '*' && bytes.get(i + 1) == Some(&b'/') {
                    state = State::Normal;
                    i += 2;
                } else {
                    i += 1;
                }
            }
        }
    }

    if stmt_start < source.len() {
        push_statement(&mut statements, source, stmt_start, source.len());
    }

    statements
}

fn push_statement(out: &mut Vec<Statement>, source: &str, start: usize, end: usize) {
    let raw = &source[start..end];
    if raw.trim().is_empty() {
        return;
    }
    let leading_ws = raw.len() - raw.trim_start().len();
    let token_start = start + leading_ws;
    let line = 1 + source[..token_start].matches('\n').count();
    out.push(Statement {
        text: raw.to_string(),
        line,
        start_offset: start,
        end_offset: end,
    });
}

/// Matches a dollar-quote tag (`$$` or `$tag$`) at the start of `s`. Returns
/// the full tag text (including both `$` delimiters) and its byte length.
fn match_dollar_tag(s: &str) -> Option<(String, usize)> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'$') {
        return None;
    }
    let mut end = 1;
    while end < bytes.len() {
        let c = bytes[end] as char;
        if c == '$' {
            return Some((s[..=end].to_string(), end + 1));
        }
        if !(c.is_alphanumeric() || c == '_') {
            return None;
        }
        end += 1;
    }
    None
}
