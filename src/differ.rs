//! Differ (§4.4): pure computation of a [`SchemaDiff`] between a current and
//! a desired [`Schema`]. No I/O; a lookup hashmap of tables/columns/indexes
//! is built transiently here and discarded (§9 "Cross-references by name,
//! not pointer" — backrefs are never materialized onto the Schema itself).

use std::collections::{HashMap, HashSet};

use crate::schema::{Column, ColumnChange, ColumnDiff, ForeignKey, Index, Schema, SchemaDiff, Table, TableDiff};

pub fn diff(current: &Schema, desired: &Schema) -> SchemaDiff {
    let current_by_name: HashMap<String, &Table> = current.tables.iter().map(|t| (t.qualified_name(), t)).collect();
    let desired_by_name: HashMap<String, &Table> = desired.tables.iter().map(|t| (t.qualified_name(), t)).collect();

    let mut added_tables = Vec::new();
    let mut modified_tables = Vec::new();

    for table in &desired.tables {
        match current_by_name.get(&table.qualified_name()) {
            None => added_tables.push(table.clone()),
            Some(existing) => {
                let table_diff = diff_table(existing, table);
                if !table_diff.is_empty() {
                    modified_tables.push(table_diff);
                }
            }
        }
    }

    let mut removed_tables = Vec::new();
    for table in &current.tables {
        if !desired_by_name.contains_key(&table.qualified_name()) {
            removed_tables.push(table.clone());
        }
    }

    SchemaDiff {
        added_tables,
        removed_tables,
        modified_tables,
    }
}

fn diff_table(current: &Table, desired: &Table) -> TableDiff {
    let current_cols: HashMap<&str, &Column> = current.columns.iter().map(|c| (c.name.as_str(), c)).collect();
    let desired_cols: HashMap<&str, &Column> = desired.columns.iter().map(|c| (c.name.as_str(), c)).collect();

    let mut added_columns = Vec::new();
    let mut modified_columns = Vec::new();
    for col in &desired.columns {
        match current_cols.get(col.name.as_str()) {
            None => added_columns.push(col.clone()),
            Some(existing) => {
                let changes = column_changes(existing, col);
                if !changes.is_empty() {
                    modified_columns.push(ColumnDiff {
                        column_name: col.name.clone(),
                        old: (*existing).clone(),
                        new: col.clone(),
                        changes,
                    });
                }
            }
        }
    }
    let mut removed_columns = Vec::new();
    for col in &current.columns {
        if !desired_cols.contains_key(col.name.as_str()) {
            removed_columns.push(col.clone());
        }
    }

    let (added_indexes, removed_indexes) = diff_named_set(&current.indexes, &desired.indexes, |i: &Index| i.name.clone());
    let (added_foreign_keys, removed_foreign_keys) =
        diff_named_set(&current.foreign_keys, &desired.foreign_keys, |f: &ForeignKey| f.name.clone());

    TableDiff {
        table_name: desired.qualified_name(),
        added_columns,
        removed_columns,
        modified_columns,
        added_indexes,
        removed_indexes,
        added_foreign_keys,
        removed_foreign_keys,
        rls_changed: current.rls_enabled != desired.rls_enabled,
        rls_enabled: desired.rls_enabled,
    }
}

fn column_changes(old: &Column, new: &Column) -> HashSet<ColumnChange> {
    let mut changes = HashSet::new();
    if old.logical_type() != new.logical_type() {
        changes.insert(ColumnChange::Type);
    }
    if old.nullable != new.nullable {
        changes.insert(ColumnChange::Nullable);
    }
    if old.default != new.default {
        changes.insert(ColumnChange::Default);
    }
    if old.is_primary_key != new.is_primary_key {
        changes.insert(ColumnChange::IsPrimaryKey);
    }
    changes
}

/// Name-indexed added/removed set, sorted by name on emission for
/// determinism (§4.4 "Determinism").
fn diff_named_set<T: Clone>(current: &[T], desired: &[T], name_of: impl Fn(&T) -> String) -> (Vec<T>, Vec<T>) {
    let current_names: HashSet<String> = current.iter().map(&name_of).collect();
    let desired_names: HashSet<String> = desired.iter().map(&name_of).collect();

    let mut added: Vec<T> = desired.iter().filter(|item| !current_names.contains(&name_of(item))).cloned().collect();
    let mut removed: Vec<T> = current.iter().filter(|item| !desired_names.contains(&name_of(item))).cloned().collect();
    added.sort_by_key(|item| name_of(item));
    removed.sort_by_key(|item| name_of(item));
    (added, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnBuilder, Table};

    fn users(extra_column: Option<Column>) -> Schema {
        let mut builder = Table::builder("users").column(ColumnBuilder::new("id", "integer").primary_key().build());
        if let Some(col) = extra_column {
            builder = builder.column(col);
        }
        Schema::new(vec![builder.build()]).unwrap()
    }

    #[test]
    fn diff_of_identical_schemas_is_empty() {
        let a = users(None);
        assert!(diff(&a, &a).is_empty());
    }

    #[test]
    fn added_table_is_snapshotted_whole() {
        let current = Schema::empty();
        let desired = users(None);
        let d = diff(&current, &desired);
        assert_eq!(d.added_tables.len(), 1);
        assert_eq!(d.added_tables[0].qualified_name(), "public.users");
    }

    #[test]
    fn removed_table_is_detected() {
        let current = users(None);
        let desired = Schema::empty();
        let d = diff(&current, &desired);
        assert_eq!(d.removed_tables.len(), 1);
    }

    #[test]
    fn added_column_is_detected() {
        let current = users(None);
        let desired = users(Some(ColumnBuilder::new("age", "integer").build()));
        let d = diff(&current, &desired);
        assert_eq!(d.modified_tables.len(), 1);
        assert_eq!(d.modified_tables[0].added_columns.len(), 1);
    }

    #[test]
    fn type_change_uses_logical_type_not_raw_spelling() {
        let current = Schema::new(vec![Table::builder("t")
            .column(ColumnBuilder::new("n", "INT4").type_metadata("INT4", "integer").build())
            .build()])
        .unwrap();
        let desired = Schema::new(vec![Table::builder("t")
            .column(ColumnBuilder::new("n", "integer").build())
            .build()])
        .unwrap();
        assert!(diff(&current, &desired).is_empty());
    }

    #[test]
    fn index_sets_are_sorted_by_name() {
        let current = Schema::new(vec![Table::builder("t").column(ColumnBuilder::new("a", "integer").build()).build()]).unwrap();
        let mut t = Table::builder("t").column(ColumnBuilder::new("a", "integer").build()).build();
        t.indexes.push(Index::new("z_idx", vec!["a".to_string()], false));
        t.indexes.push(Index::new("a_idx", vec!["a".to_string()], false));
        let desired = Schema::new(vec![t]).unwrap();
        let d = diff(&current, &desired);
        let names: Vec<&str> = d.modified_tables[0].added_indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a_idx", "z_idx"]);
    }
}
