//! DDL Parser (§4.2): turns a desired-schema SQL document into a [`Schema`]
//! plus structured [`Diagnostic`]s. A single statement failing to parse does
//! not abort the document — the error-recovery cascade in [`recovery`]
//! produces a best-effort diagnostic for it and parsing continues with the
//! next statement, so a document with N independent mistakes reports up to
//! N diagnostics in one pass rather than stopping at the first.

mod dangerous;
mod defaults;
mod lower;
mod recovery;
mod statement_split;
mod types;
mod validate;

pub use statement_split::{split_statements, Statement};

use crate::diagnostics::Diagnostic;
use crate::schema::Schema;
use lower::TableSet;

pub struct ParseOutcome {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_blocking)
    }
}

/// Parses a desired-schema document end to end: split into statements, lower
/// each via `pg_query`, recover from per-statement parse failures, then run
/// whole-document structural validation once every table is known.
pub fn parse(source: &str) -> ParseOutcome {
    let mut tables = TableSet::default();
    let mut diagnostics = Vec::new();

    for stmt in split_statements(source) {
        let trimmed = stmt.text.trim();
        if trimmed.is_empty() {
            continue;
        }
        match pg_query::parse(&stmt.text) {
            Ok(result) => {
                for raw_stmt in &result.protobuf.stmts {
                    let Some(node) = raw_stmt.stmt.as_ref().and_then(|n| n.node.as_ref()) else {
                        continue;
                    };
                    lower::apply_statement(&mut tables, node, source, stmt.start_offset, stmt.end_offset, &mut diagnostics);
                }
                diagnostics.extend(dangerous::check_statement(source, &stmt.text, stmt.start_offset));
            }
            Err(err) => {
                diagnostics.push(recovery::recover(source, &stmt.text, stmt.start_offset, &err.to_string()));
            }
        }
    }

    let schema = match Schema::new(tables.tables) {
        Ok(schema) => schema,
        Err(err) => {
            diagnostics.push(Diagnostic::error(
                crate::diagnostics::Range::point(source, 0),
                "duplicate_table",
                err.to_string(),
            ));
            Schema::empty()
        }
    };

    diagnostics.extend(validate::validate(&schema, source));

    ParseOutcome { schema, diagnostics }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_document_with_no_diagnostics_of_error_severity() {
        let outcome = parse("CREATE TABLE users (id integer PRIMARY KEY, name text NOT NULL);");
        assert!(!outcome.has_errors());
        assert!(outcome.schema.has_table("public.users"));
    }

    #[test]
    fn one_bad_statement_does_not_prevent_parsing_the_rest() {
        let outcome = parse(
            "CREATE TABLE a (id integer PRIMARY KEY);\n\
             CREATE TBLE b (id integer);\n\
             CREATE TABLE c (id integer PRIMARY KEY);",
        );
        assert!(outcome.schema.has_table("public.a"));
        assert!(outcome.schema.has_table("public.c"));
        assert!(outcome.has_errors());
    }

    #[test]
    fn dangerous_statement_is_still_flagged_after_parsing_successfully() {
        let outcome = parse("DROP TABLE users;");
        assert!(outcome.diagnostics.iter().any(|d| d.code == "dangerous_drop_table"));
    }

    #[test]
    fn cross_statement_foreign_key_validates_against_full_schema() {
        let outcome = parse(
            "CREATE TABLE users (id integer PRIMARY KEY);\n\
             CREATE TABLE orders (id integer PRIMARY KEY, user_id integer, \
             CONSTRAINT orders_user_fkey FOREIGN KEY (user_id) REFERENCES users (id));",
        );
        assert!(!outcome.has_errors());
    }
}
