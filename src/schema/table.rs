use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Column, ForeignKey, Index, Policy};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Table {
    pub name: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    pub columns: Vec<Column>,
    /// Keyed by name; serialized sorted for deterministic diffs (§4.4).
    #[serde(default)]
    pub indexes: Vec<Index>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    #[serde(default)]
    pub rls_enabled: bool,
    #[serde(default)]
    pub policies: Vec<Policy>,
}

fn default_namespace() -> String {
    "public".to_string()
}

impl Table {
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder::new(name)
    }

    /// `namespace.name`, the key used for schema-level lookups and for
    /// foreign-key `referenced_table` strings (§9 "cross-references by name").
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn foreign_key(&self, name: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|f| f.name == name)
    }

    pub fn primary_key_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),
    #[error("index {index} references unknown column {column}")]
    UnknownIndexColumn { index: String, column: String },
    #[error("more than one primary key column declared")]
    MultiplePrimaryKeys,
}

pub struct TableBuilder {
    name: String,
    namespace: String,
    columns: Vec<Column>,
    indexes: Vec<Index>,
    foreign_keys: Vec<ForeignKey>,
    rls_enabled: bool,
    policies: Vec<Policy>,
}

impl TableBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: default_namespace(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            rls_enabled: false,
            policies: Vec::new(),
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    pub fn foreign_key(mut self, fk: ForeignKey) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn rls_enabled(mut self, enabled: bool) -> Self {
        self.rls_enabled = enabled;
        self
    }

    pub fn policy(mut self, policy: Policy) -> Self {
        self.policies.push(policy);
        self
    }

    /// Builds without validating invariants. Use [`TableBuilder::try_build`]
    /// when the caller needs the §3 invariants enforced (e.g. in the parser's
    /// structural-validation pass, which reports violations as diagnostics
    /// instead of panicking).
    pub fn build(self) -> Table {
        Table {
            name: self.name,
            namespace: self.namespace,
            columns: self.columns,
            indexes: self.indexes,
            foreign_keys: self.foreign_keys,
            rls_enabled: self.rls_enabled,
            policies: self.policies,
        }
    }

    pub fn try_build(self) -> Result<Table, TableError> {
        let mut seen_columns = HashSet::new();
        for col in &self.columns {
            if !seen_columns.insert(col.name.clone()) {
                return Err(TableError::DuplicateColumn(col.name.clone()));
            }
        }
        if self.columns.iter().filter(|c| c.is_primary_key).count() > 1 {
            return Err(TableError::MultiplePrimaryKeys);
        }
        for index in &self.indexes {
            for col in &index.columns {
                if !seen_columns.contains(col) {
                    return Err(TableError::UnknownIndexColumn {
                        index: index.name.clone(),
                        column: col.clone(),
                    });
                }
            }
        }
        Ok(self.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::column::ColumnBuilder;

    #[test]
    fn qualified_name_defaults_to_public() {
        let t = Table::builder("users")
            .column(ColumnBuilder::new("id", "integer").build())
            .build();
        assert_eq!(t.qualified_name(), "public.users");
    }

    #[test]
    fn duplicate_columns_rejected_by_try_build() {
        let err = Table::builder("t")
            .column(ColumnBuilder::new("id", "integer").build())
            .column(ColumnBuilder::new("id", "text").build())
            .try_build()
            .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("id".to_string()));
    }

    #[test]
    fn index_referencing_unknown_column_rejected() {
        let err = Table::builder("t")
            .column(ColumnBuilder::new("id", "integer").build())
            .index(Index::new("idx", vec!["missing".to_string()], false))
            .try_build()
            .unwrap_err();
        assert!(matches!(err, TableError::UnknownIndexColumn { .. }));
    }

    #[test]
    fn multiple_primary_keys_rejected() {
        let err = Table::builder("t")
            .column(ColumnBuilder::new("a", "integer").primary_key().build())
            .column(ColumnBuilder::new("b", "integer").primary_key().build())
            .try_build()
            .unwrap_err();
        assert_eq!(err, TableError::MultiplePrimaryKeys);
    }
}
