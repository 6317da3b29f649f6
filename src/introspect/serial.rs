//! SERIAL detection and default normalization (§4.3).
//!
//! A column's default is reclassified to the `smallserial/serial/bigserial`
//! pseudo-type only when all three conditions hold: `NOT NULL`, an integer
//! family type, and a `pg_depend` join proving the sequence is *owned by*
//! this column (not just referenced by its default). Otherwise the raw
//! `nextval(...)` string is preserved so manually owned sequences round-trip.

use std::collections::HashSet;

use sqlx::{PgConnection, Row};

use crate::schema::{DefaultKind, Table};

/// Strips a trailing `::type` cast when the text immediately before it is a
/// balanced single-quoted literal, e.g. `'{}'::jsonb` -> `'{}'`.
pub fn normalize_default(raw: &str) -> (String, DefaultKind) {
    let trimmed = raw.trim();

    if let Some(quote_end) = balanced_quote_end(trimmed) {
        let after = trimmed[quote_end..].trim_start();
        if let Some(rest) = after.strip_prefix("::") {
            if !rest.is_empty() && rest.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == '[' || c == ']' || c == '"') {
                return (trimmed[..quote_end].to_string(), DefaultKind::Literal);
            }
        }
        return (trimmed.to_string(), DefaultKind::Literal);
    }

    if trimmed.starts_with("nextval(") {
        return (trimmed.to_string(), DefaultKind::Sequence);
    }

    if trimmed.contains('(') && trimmed.ends_with(')') {
        return (trimmed.to_string(), DefaultKind::Function);
    }

    (trimmed.to_string(), DefaultKind::Other)
}

fn balanced_quote_end(text: &str) -> Option<usize> {
    if !text.starts_with('\'') {
        return None;
    }
    let bytes = text.as_bytes();
    let mut i = 1;
    while i < bytes.len() {
        if bytes[i] == b'\'' {
            if bytes.get(i + 1) == Some(&b'\'') {
                i += 2;
                continue;
            }
            return Some(i + 1);
        }
        i += 1;
    }
    None
}

/// `(table_name, column_name)` pairs where `pg_depend` proves the sequence
/// backing the column's default is *owned by* that column (`deptype = 'a'`),
/// as opposed to merely referenced by a manually-written `nextval(...)`.
pub async fn fetch_owned_columns(conn: &mut PgConnection, namespace: &str) -> Result<HashSet<(String, String)>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT c.relname AS table_name, a.attname AS column_name \
         FROM pg_depend d \
         JOIN pg_class seq ON d.objid = seq.oid AND seq.relkind = 'S' \
         JOIN pg_attribute a ON d.refobjid = a.attrelid AND d.refobjsubid = a.attnum \
         JOIN pg_class c ON a.attrelid = c.oid \
         JOIN pg_namespace n ON c.relnamespace = n.oid \
         WHERE d.deptype = 'a' AND d.refclassid = 'pg_class'::regclass AND n.nspname = $1",
    )
    .bind(namespace)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| (r.get::<String, _>("table_name"), r.get::<String, _>("column_name")))
        .collect())
}

/// Applies the reclassification decision once ownership has been proven.
pub fn reclassify(tables: &mut [Table], owned_columns: &HashSet<(String, String)>) {
    for table in tables.iter_mut() {
        for col in table.columns.iter_mut() {
            let is_integer_family = matches!(col.type_name.as_str(), "smallint" | "integer" | "bigint");
            let is_sequence_default = col.default.as_deref().is_some_and(|d| d.starts_with("nextval("));
            let owned = owned_columns.contains(&(table.name.clone(), col.name.clone()));

            if !col.nullable && is_integer_family && is_sequence_default && owned {
                col.type_name = match col.type_name.as_str() {
                    "smallint" => "smallserial",
                    "integer" => "serial",
                    "bigint" => "bigserial",
                    other => other,
                }
                .to_string();
                col.default = None;
                col.default_metadata = None;
            }
        }
    }
}
