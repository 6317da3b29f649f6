//! Foreign-key introspection (§4.3) via `information_schema.table_constraints`
//! / `key_column_usage` / `constraint_column_usage`, plus `pg_constraint`'s
//! `confupdtype`/`confdeltype` single-letter action codes.

use sqlx::{PgConnection, Row};
use std::collections::BTreeMap;

use crate::schema::{ForeignKey, ReferentialAction};

use super::table_index;

pub async fn populate(conn: &mut PgConnection, namespace: &str, tables: &mut [crate::schema::Table]) -> Result<(), sqlx::Error> {
    let rows = sqlx::query(
        "SELECT \
            con.conname AS constraint_name, \
            tc.relname AS table_name, \
            a.attname AS column_name, \
            ft.relname AS referenced_table, \
            fn.nspname AS referenced_namespace, \
            fa.attname AS referenced_column, \
            con.confupdtype AS on_update, \
            con.confdeltype AS on_delete, \
            array_position(con.conkey, a.attnum) AS position \
         FROM pg_constraint con \
         JOIN pg_class tc ON tc.oid = con.conrelid \
         JOIN pg_namespace n ON tc.relnamespace = n.oid \
         JOIN pg_class ft ON ft.oid = con.confrelid \
         JOIN pg_namespace fn ON ft.relnamespace = fn.oid \
         JOIN pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = ANY(con.conkey) \
         JOIN pg_attribute fa ON fa.attrelid = con.confrelid AND fa.attnum = con.confkey[array_position(con.conkey, a.attnum)] \
         WHERE con.contype = 'f' AND n.nspname = $1 \
         ORDER BY tc.relname, con.conname, position",
    )
    .bind(namespace)
    .fetch_all(&mut *conn)
    .await?;

    let mut grouped: BTreeMap<(String, String), ForeignKeyBuilder> = BTreeMap::new();

    for row in rows {
        let table_name: String = row.get("table_name");
        let constraint_name: String = row.get("constraint_name");
        let column_name: String = row.get("column_name");
        let referenced_namespace: String = row.get("referenced_namespace");
        let referenced_table: String = row.get("referenced_table");
        let referenced_column: String = row.get("referenced_column");
        let on_update: i8 = row.get::<i8, _>("on_update");
        let on_delete: i8 = row.get::<i8, _>("on_delete");

        let entry = grouped
            .entry((table_name.clone(), constraint_name.clone()))
            .or_insert_with(|| ForeignKeyBuilder {
                referenced_table: format!("{referenced_namespace}.{referenced_table}"),
                on_update: action_from_code(on_update as u8 as char),
                on_delete: action_from_code(on_delete as u8 as char),
                columns: Vec::new(),
                referenced_columns: Vec::new(),
            });
        entry.columns.push(column_name);
        entry.referenced_columns.push(referenced_column);
    }

    for ((table_name, constraint_name), built) in grouped {
        if let Some(table) = table_index(tables, namespace, &table_name) {
            table.foreign_keys.push(ForeignKey {
                name: constraint_name,
                columns: built.columns,
                referenced_table: built.referenced_table,
                referenced_columns: built.referenced_columns,
                on_delete: built.on_delete,
                on_update: built.on_update,
            });
        }
    }

    for table in tables.iter_mut() {
        table.foreign_keys.sort_by(|a, b| a.name.cmp(&b.name));
    }

    Ok(())
}

struct ForeignKeyBuilder {
    referenced_table: String,
    referenced_columns: Vec<String>,
    columns: Vec<String>,
    on_update: Option<ReferentialAction>,
    on_delete: Option<ReferentialAction>,
}

/// `pg_constraint.confupdtype`/`confdeltype` use `a,r,c,n,d` (§4.2's same
/// table). Postgres' own default, `a` (no action), maps to `None` here since
/// that is the common unset case and the Planner's generators omit the
/// clause entirely when it's absent.
fn action_from_code(code: char) -> Option<ReferentialAction> {
    match ReferentialAction::from_code(code) {
        Some(ReferentialAction::NoAction) => None,
        other => other,
    }
}
