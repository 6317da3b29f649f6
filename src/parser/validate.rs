//! Structural validation over a fully-lowered [`Schema`] (§4.2 "Structural
//! validation"). This runs after all statements in a document have been
//! lowered, so it sees cross-table references (foreign keys, index columns)
//! that individual statement lowering cannot check in isolation.

use crate::diagnostics::{Diagnostic, Range};
use crate::schema::Schema;

pub fn validate(schema: &Schema, source: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let whole_doc = Range::point(source, 0);

    for table in &schema.tables {
        if table.columns.is_empty() {
            diagnostics.push(Diagnostic::warning(
                whole_doc,
                "empty_table",
                format!("table {} has no columns", table.qualified_name()),
            ));
        }

        if table.primary_key_columns().is_empty() {
            diagnostics.push(Diagnostic::warning(
                whole_doc,
                "no_primary_key",
                format!("table {} has no primary key", table.qualified_name()),
            ));
        }

        for index in &table.indexes {
            for col in &index.columns {
                if table.column(col).is_none() {
                    diagnostics.push(Diagnostic::error(
                        whole_doc,
                        "invalid_index_column",
                        format!("index {} on {} references unknown column {col}", index.name, table.qualified_name()),
                    ));
                }
            }
        }

        let mut seen_index_names = std::collections::HashSet::new();
        for index in &table.indexes {
            if !seen_index_names.insert(&index.name) {
                diagnostics.push(Diagnostic::warning(
                    whole_doc,
                    "duplicate_index",
                    format!("index {} is declared more than once on {}", index.name, table.qualified_name()),
                ));
            }
        }

        for fk in &table.foreign_keys {
            match schema.table(&fk.referenced_table) {
                None => diagnostics.push(Diagnostic::error(
                    whole_doc,
                    "invalid_fk_table",
                    format!("foreign key {} on {} references unknown table {}", fk.name, table.qualified_name(), fk.referenced_table),
                )),
                Some(referenced) => {
                    for col in &fk.referenced_columns {
                        if referenced.column(col).is_none() {
                            diagnostics.push(Diagnostic::error(
                                whole_doc,
                                "invalid_fk_column",
                                format!(
                                    "foreign key {} on {} references unknown column {} on {}",
                                    fk.name, table.qualified_name(), col, fk.referenced_table
                                ),
                            ));
                        }
                    }
                }
            }
        }
    }

    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Column, ColumnBuilder, ForeignKey, Index, Table};

    fn pk_table(name: &str) -> Table {
        Table::builder(name)
            .column(ColumnBuilder::new("id", "integer").primary_key().build())
            .build()
    }

    fn with_column(table: Table, column: Column) -> Table {
        let mut t = table;
        t.columns.push(column);
        t
    }

    #[test]
    fn warns_on_missing_primary_key() {
        let schema = Schema::new(vec![Table::builder("t").column(ColumnBuilder::new("a", "text").build()).build()]).unwrap();
        let diags = validate(&schema, "");
        assert!(diags.iter().any(|d| d.code == "no_primary_key"));
    }

    #[test]
    fn warns_on_empty_table() {
        let schema = Schema::new(vec![Table::builder("t").build()]).unwrap();
        let diags = validate(&schema, "");
        assert!(diags.iter().any(|d| d.code == "empty_table"));
    }

    #[test]
    fn errors_on_index_referencing_unknown_column() {
        let mut table = pk_table("t");
        table.indexes.push(Index::new("idx", vec!["missing".to_string()], false));
        let schema = Schema::new(vec![table]).unwrap();
        let diags = validate(&schema, "");
        assert!(diags.iter().any(|d| d.code == "invalid_index_column"));
    }

    #[test]
    fn errors_on_foreign_key_to_unknown_table() {
        let mut table = pk_table("orders");
        table = with_column(table, ColumnBuilder::new("user_id", "integer").build());
        table.foreign_keys.push(ForeignKey {
            name: "orders_user_fkey".to_string(),
            columns: vec!["user_id".to_string()],
            referenced_table: "public.users".to_string(),
            referenced_columns: vec!["id".to_string()],
            on_delete: None,
            on_update: None,
        });
        let schema = Schema::new(vec![table]).unwrap();
        let diags = validate(&schema, "");
        assert!(diags.iter().any(|d| d.code == "invalid_fk_table"));
    }

    #[test]
    fn no_diagnostics_for_well_formed_schema() {
        let users = pk_table("users");
        let mut orders = pk_table("orders");
        orders = with_column(orders, ColumnBuilder::new("user_id", "integer").build());
        orders.foreign_keys.push(ForeignKey {
            name: "orders_user_fkey".to_string(),
            columns: vec!["user_id".to_string()],
            referenced_table: "public.users".to_string(),
            referenced_columns: vec!["id".to_string()],
            on_delete: None,
            on_update: None,
        });
        let schema = Schema::new(vec![users, orders]).unwrap();
        assert!(validate(&schema, "").is_empty());
    }
}
