//! Per-operation SQL generators (§4.5). Each function renders the canonical
//! SQL for one kind of change; the Planner composes these into `PlanStep`s.

use crate::schema::{Column, ColumnChange, ColumnDiff, ForeignKey, Index, Table};

/// Postgres resolves an unqualified name against `search_path`, whose first
/// entry is `public` by default; §8's literal scenarios render `public`-schema
/// tables bare (`CREATE TABLE users`, not `CREATE TABLE public.users`). Every
/// generator below renders its table/referenced-table name through this so
/// the only schema-qualified SQL is for a genuinely non-default namespace.
fn render_name(qualified_name: &str) -> &str {
    qualified_name.strip_prefix("public.").unwrap_or(qualified_name)
}

/// `name type [NOT NULL] [DEFAULT expr] [PRIMARY KEY]`, in that order
/// (§4.5's per-operation generators).
pub fn column_def(col: &Column) -> String {
    let mut def = format!("{} {}", col.name, col.type_name);
    if !col.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(default) = &col.default {
        def.push_str(&format!(" DEFAULT {default}"));
    }
    if col.is_primary_key {
        def.push_str(" PRIMARY KEY");
    }
    def
}

pub fn create_table(table: &Table) -> String {
    let cols: Vec<String> = table.columns.iter().map(column_def).collect();
    format!("CREATE TABLE {} (\n  {}\n)", render_name(&table.qualified_name()), cols.join(",\n  "))
}

pub fn drop_table(qualified_name: &str) -> String {
    format!("DROP TABLE {} CASCADE", render_name(qualified_name))
}

pub fn add_column(qualified_table: &str, col: &Column) -> String {
    format!("ALTER TABLE {} ADD COLUMN {}", render_name(qualified_table), column_def(col))
}

pub fn drop_column(qualified_table: &str, column: &str) -> String {
    format!("ALTER TABLE {} DROP COLUMN {column}", render_name(qualified_table))
}

/// Up to three sub-statements for one column change, grouped by the caller
/// into a single PlanStep so the three execute atomically (§4.5).
pub fn alter_column(qualified_table: &str, diff: &ColumnDiff) -> Vec<String> {
    let table = render_name(qualified_table);
    let mut statements = Vec::new();
    if diff.changes.contains(&ColumnChange::Type) {
        statements.push(format!("ALTER TABLE {table} ALTER COLUMN {} TYPE {}", diff.column_name, diff.new.type_name));
    }
    if diff.changes.contains(&ColumnChange::Nullable) {
        let clause = if diff.new.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
        statements.push(format!("ALTER TABLE {table} ALTER COLUMN {} {clause}", diff.column_name));
    }
    if diff.changes.contains(&ColumnChange::Default) {
        match &diff.new.default {
            Some(expr) => statements.push(format!("ALTER TABLE {table} ALTER COLUMN {} SET DEFAULT {expr}", diff.column_name)),
            None => statements.push(format!("ALTER TABLE {table} ALTER COLUMN {} DROP DEFAULT", diff.column_name)),
        }
    }
    statements
}

pub fn create_index(qualified_table: &str, index: &Index) -> String {
    let unique = if index.unique { "UNIQUE " } else { "" };
    format!("CREATE {unique}INDEX {} ON {} ({})", index.name, render_name(qualified_table), index.columns.join(", "))
}

pub fn drop_index(index_name: &str) -> String {
    format!("DROP INDEX {index_name}")
}

pub fn add_foreign_key(qualified_table: &str, fk: &ForeignKey) -> String {
    let mut sql = format!(
        "ALTER TABLE {} ADD CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        render_name(qualified_table),
        fk.name,
        fk.columns.join(", "),
        render_name(&fk.referenced_table),
        fk.referenced_columns.join(", ")
    );
    if let Some(on_delete) = fk.on_delete {
        sql.push_str(&format!(" ON DELETE {on_delete}"));
    }
    if let Some(on_update) = fk.on_update {
        sql.push_str(&format!(" ON UPDATE {on_update}"));
    }
    sql
}

pub fn drop_constraint(qualified_table: &str, constraint_name: &str) -> String {
    format!("ALTER TABLE {} DROP CONSTRAINT {constraint_name}", render_name(qualified_table))
}

pub fn set_rls(qualified_table: &str, enabled: bool) -> String {
    let verb = if enabled { "ENABLE" } else { "DISABLE" };
    format!("ALTER TABLE {} {verb} ROW LEVEL SECURITY", render_name(qualified_table))
}
