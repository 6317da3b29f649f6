//! Base-table, column, and primary-key introspection (§4.3), grounded in
//! `gdpotter-pgmt`'s `pg_catalog`-driven column reader but run via
//! `sqlx::query` (runtime) rather than the `query!` compile-time macro.

use sqlx::{PgConnection, Row};
use tracing::{debug, info_span, Instrument};

use crate::schema::{Column, ColumnBuilder, Table, TableBuilder};

use super::IntrospectError;

pub async fn fetch_tables(conn: &mut PgConnection, namespace: &str) -> Result<Vec<Table>, IntrospectError> {
    let span = info_span!("introspect.table", namespace);
    async move {
        let table_names = fetch_table_names(conn, namespace).await?;
        let mut tables = Vec::with_capacity(table_names.len());
        for name in table_names {
            let columns = fetch_columns(conn, namespace, &name).await?;
            let pk_columns = fetch_primary_key_columns(conn, namespace, &name).await?;
            let rls_enabled = fetch_rls_enabled(conn, namespace, &name).await?;

            let mut builder = TableBuilder::new(&name).namespace(namespace).rls_enabled(rls_enabled);
            for mut col in columns {
                if pk_columns.contains(&col.name) {
                    col.is_primary_key = true;
                    col.nullable = false;
                }
                builder = builder.column(col);
            }
            tables.push(
                builder
                    .try_build()
                    .map_err(|e| IntrospectError::Table(format!("{namespace}.{name}: {e}")))?,
            );
        }
        Ok(tables)
    }
    .instrument(span)
    .await
}

async fn fetch_table_names(conn: &mut PgConnection, namespace: &str) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = $1 AND table_type = 'BASE TABLE' \
         ORDER BY table_name",
    )
    .bind(namespace)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(|r| r.get::<String, _>("table_name")).collect())
}

async fn fetch_columns(conn: &mut PgConnection, namespace: &str, table: &str) -> Result<Vec<Column>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT column_name, data_type, udt_name, is_nullable, column_default, \
                character_maximum_length, numeric_precision, numeric_scale \
         FROM information_schema.columns \
         WHERE table_schema = $1 AND table_name = $2 \
         ORDER BY ordinal_position",
    )
    .bind(namespace)
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.get("column_name");
        let data_type: String = row.get("data_type");
        let udt_name: String = row.get("udt_name");
        let is_nullable: String = row.get("is_nullable");
        let column_default: Option<String> = row.get("column_default");
        let max_len: Option<i32> = row.get("character_maximum_length");
        let precision: Option<i32> = row.get("numeric_precision");
        let scale: Option<i32> = row.get("numeric_scale");

        let type_name = render_type(&data_type, &udt_name, max_len, precision, scale);
        debug!(column = %name, %type_name, "introspected column");

        let mut builder = ColumnBuilder::new(name, type_name).nullable(is_nullable == "YES");
        if let Some(raw_default) = column_default {
            let (normalized, kind) = super::serial::normalize_default(&raw_default);
            builder = builder.default_expr(normalized, kind);
        }
        columns.push(builder.build());
    }
    Ok(columns)
}

fn render_type(data_type: &str, udt_name: &str, max_len: Option<i32>, precision: Option<i32>, scale: Option<i32>) -> String {
    match data_type {
        "ARRAY" => format!("{}[]", udt_name.trim_start_matches('_')),
        "character varying" => match max_len {
            Some(len) => format!("varchar({len})"),
            None => "varchar".to_string(),
        },
        "character" => match max_len {
            Some(len) => format!("char({len})"),
            None => "char".to_string(),
        },
        "numeric" => match (precision, scale) {
            (Some(p), Some(s)) => format!("numeric({p},{s})"),
            (Some(p), None) => format!("numeric({p})"),
            _ => "numeric".to_string(),
        },
        other => other.to_string(),
    }
}

async fn fetch_primary_key_columns(conn: &mut PgConnection, namespace: &str, table: &str) -> Result<Vec<String>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT kcu.column_name \
         FROM information_schema.table_constraints tc \
         JOIN information_schema.key_column_usage kcu \
           ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
         WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = $1 AND tc.table_name = $2 \
         ORDER BY kcu.ordinal_position",
    )
    .bind(namespace)
    .bind(table)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(|r| r.get::<String, _>("column_name")).collect())
}

async fn fetch_rls_enabled(conn: &mut PgConnection, namespace: &str, table: &str) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        "SELECT c.relrowsecurity AS enabled \
         FROM pg_class c JOIN pg_namespace n ON c.relnamespace = n.oid \
         WHERE n.nspname = $1 AND c.relname = $2",
    )
    .bind(namespace)
    .bind(table)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(|r| r.get::<bool, _>("enabled")).unwrap_or(false))
}
