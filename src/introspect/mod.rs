//! Introspector (§4.3): reads a live Postgres catalog into a [`Schema`].
//!
//! Grounded in the teacher's connection-lifecycle discipline (every query
//! path releases its handle on every exit, per §5) and in the pack's
//! `gdpotter-pgmt` catalog readers for the `pg_catalog` join shapes. Unlike
//! `gdpotter-pgmt`, queries here run through `sqlx::query`/`query_as` at
//! runtime rather than the `sqlx::query!` compile-time macro, since this
//! crate has no `DATABASE_URL`/offline cache to check query shapes against.

mod connect;
mod foreign_keys;
mod indexes;
mod policies;
mod serial;
mod tables;

pub use connect::{connect_and_ping, ConnectError};

use sqlx::PgConnection;
use thiserror::Error;
use tracing::{info, info_span, Instrument};

use crate::schema::{Schema, SchemaError, Table};

#[derive(Debug, Error)]
pub enum IntrospectError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("introspected schema violated an invariant: {0}")]
    Invalid(#[from] SchemaError),
    #[error("introspected table violated an invariant: {0}")]
    Table(String),
}

/// `introspect(conn, namespace) -> Schema` (§4.3). Reads tables, columns,
/// primary keys, indexes, foreign keys, RLS, and policies for one namespace.
pub async fn introspect(conn: &mut PgConnection, namespace: &str) -> Result<Schema, IntrospectError> {
    let span = info_span!("introspect.namespace", namespace);
    async move {
        info!("introspecting namespace");
        let mut tables = tables::fetch_tables(conn, namespace).await?;
        indexes::populate(conn, namespace, &mut tables).await?;
        foreign_keys::populate(conn, namespace, &mut tables).await?;
        policies::populate(conn, namespace, &mut tables).await?;
        let owned_columns = serial::fetch_owned_columns(conn, namespace).await?;
        serial::reclassify(&mut tables, &owned_columns);
        Schema::new(tables).map_err(IntrospectError::from)
    }
    .instrument(span)
    .await
}

pub(crate) fn table_index<'a>(tables: &'a mut [Table], schema: &str, name: &str) -> Option<&'a mut Table> {
    tables.iter_mut().find(|t| t.namespace == schema && t.name == name)
}
