//! Index introspection (§4.3) via `pg_class`/`pg_index`/`pg_attribute`,
//! excluding the primary key's own backing index (already represented by
//! `Column::is_primary_key`) and any constraint-backed unique index whose
//! name matches a foreign-key or primary-key constraint.

use sqlx::{PgConnection, Row};

use crate::schema::Index;

use super::table_index;

pub async fn populate(conn: &mut PgConnection, namespace: &str, tables: &mut [crate::schema::Table]) -> Result<(), sqlx::Error> {
    let rows = sqlx::query(
        "SELECT t.relname AS table_name, i.relname AS index_name, ix.indisunique AS is_unique, \
                array_agg(a.attname ORDER BY array_position(ix.indkey, a.attnum)) AS columns \
         FROM pg_index ix \
         JOIN pg_class t ON t.oid = ix.indrelid \
         JOIN pg_class i ON i.oid = ix.indexrelid \
         JOIN pg_namespace n ON t.relnamespace = n.oid \
         JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = ANY(ix.indkey) \
         LEFT JOIN pg_constraint con ON con.conindid = i.oid \
         WHERE n.nspname = $1 AND NOT ix.indisprimary AND con.oid IS NULL \
         GROUP BY t.relname, i.relname, ix.indisunique \
         ORDER BY t.relname, i.relname",
    )
    .bind(namespace)
    .fetch_all(&mut *conn)
    .await?;

    for row in rows {
        let table_name: String = row.get("table_name");
        let index_name: String = row.get("index_name");
        let is_unique: bool = row.get("is_unique");
        let columns: Vec<String> = row.get("columns");

        if let Some(table) = table_index(tables, namespace, &table_name) {
            table.indexes.push(Index::new(index_name, columns, is_unique));
        }
    }

    for table in tables.iter_mut() {
        table.indexes.sort_by(|a, b| a.name.cmp(&b.name));
    }

    Ok(())
}
