//! Normalized, dialect-tagged representation of a PostgreSQL schema.
//!
//! Values here are produced by the DDL Parser or the Introspector and are
//! immutable once constructed: there is no mutating API after a `Schema` is
//! built. Equality is structural (derived `PartialEq`), which is what the
//! Differ and the test suite's "diff idempotence" property rely on.

mod column;
mod diff;
mod foreign_key;
mod hash;
mod index;
mod policy;
mod table;

pub use column::{Column, ColumnBuilder, DefaultKind, DefaultMetadata, TypeMetadata};
pub use diff::{ColumnChange, ColumnDiff, SchemaDiff, TableDiff};
pub use foreign_key::{ForeignKey, ReferentialAction};
pub use hash::canonical_hash;
pub use index::Index;
pub use policy::{Policy, PolicyCommand};
pub use table::Table;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The only dialect in scope. Kept as an enum (rather than erased entirely)
/// because §4.9's dialect abstraction expects a per-dialect capability set
/// even though only one variant is populated today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::Postgres
    }
}

/// Aggregate root: a normalized schema, independent of where it came from
/// (parsed DDL or a live introspected database).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    #[serde(default)]
    pub dialect: Dialect,
    /// Source order preserved — this is what makes tie-broken diff output
    /// deterministic (§4.4 "Determinism").
    pub tables: Vec<Table>,
}

/// Schema invariants were violated during construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("duplicate table name: {0}")]
    DuplicateTable(String),
}

impl Schema {
    pub fn new(tables: Vec<Table>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::new();
        for table in &tables {
            if !seen.insert(table.qualified_name()) {
                return Err(SchemaError::DuplicateTable(table.qualified_name()));
            }
        }
        Ok(Self {
            dialect: Dialect::Postgres,
            tables,
        })
    }

    pub fn empty() -> Self {
        Self {
            dialect: Dialect::Postgres,
            tables: Vec::new(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.qualified_name() == name)
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.table(name).is_some()
    }
}
