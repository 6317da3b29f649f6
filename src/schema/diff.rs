//! `SchemaDiff` / `TableDiff` / `ColumnDiff` value types (§3). These are pure
//! data — the Differ (`crate::differ`) is what computes them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Column, ForeignKey, Index, Table};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnChange {
    Type,
    Nullable,
    Default,
    IsPrimaryKey,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDiff {
    pub column_name: String,
    pub old: Column,
    pub new: Column,
    pub changes: HashSet<ColumnChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableDiff {
    pub table_name: String,
    #[serde(default)]
    pub added_columns: Vec<Column>,
    #[serde(default)]
    pub removed_columns: Vec<Column>,
    #[serde(default)]
    pub modified_columns: Vec<ColumnDiff>,
    #[serde(default)]
    pub added_indexes: Vec<Index>,
    #[serde(default)]
    pub removed_indexes: Vec<Index>,
    #[serde(default)]
    pub added_foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub removed_foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub rls_changed: bool,
    #[serde(default)]
    pub rls_enabled: bool,
}

impl TableDiff {
    pub fn is_empty(&self) -> bool {
        self.added_columns.is_empty()
            && self.removed_columns.is_empty()
            && self.modified_columns.is_empty()
            && self.added_indexes.is_empty()
            && self.removed_indexes.is_empty()
            && self.added_foreign_keys.is_empty()
            && self.removed_foreign_keys.is_empty()
            && !self.rls_changed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct SchemaDiff {
    #[serde(default)]
    pub added_tables: Vec<Table>,
    #[serde(default)]
    pub removed_tables: Vec<Table>,
    #[serde(default)]
    pub modified_tables: Vec<TableDiff>,
}

impl SchemaDiff {
    pub fn is_empty(&self) -> bool {
        self.added_tables.is_empty() && self.removed_tables.is_empty() && self.modified_tables.is_empty()
    }
}
