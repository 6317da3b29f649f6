//! Planner (§4.5): turns a [`SchemaDiff`] into an ordered, safety-annotated
//! [`Plan`]. Pure aside from hashing; no database access.

mod sql;

pub mod reverse;

use crate::plan::{Plan, PlanStep, SafetyClass};
use crate::safety;
use crate::schema::{self, Schema, SchemaDiff, Table};

pub use reverse::reverse;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanGenerationError {
    #[error("cannot add NOT NULL column {column} to {table} without a DEFAULT: {alternatives:?}")]
    UnsafeNotNullWithoutDefault {
        table: String,
        column: String,
        alternatives: Vec<String>,
    },
}

pub fn plan(diff: &SchemaDiff, source: &Schema) -> Result<Plan, PlanGenerationError> {
    let source_hash = schema::canonical_hash(source);
    let mut steps = Vec::new();

    for table in &diff.added_tables {
        steps.push(make_step(format!("create table {}", table.qualified_name()), vec![sql::create_table(table)], SafetyClass::Safe));
        for index in &table.indexes {
            steps.push(make_step(
                format!("create index {} on {}", index.name, table.qualified_name()),
                vec![sql::create_index(&table.qualified_name(), index)],
                SafetyClass::Safe,
            ));
        }
        for fk in &table.foreign_keys {
            steps.push(make_step(
                format!("add foreign key {} on {}", fk.name, table.qualified_name()),
                vec![sql::add_foreign_key(&table.qualified_name(), fk)],
                SafetyClass::Safe,
            ));
        }
    }

    for table_diff in &diff.modified_tables {
        let qualified = table_diff.table_name.clone();

        for col in &table_diff.added_columns {
            if !col.nullable && col.default.is_none() {
                return Err(PlanGenerationError::UnsafeNotNullWithoutDefault {
                    table: qualified.clone(),
                    column: col.name.clone(),
                    alternatives: vec![
                        "make the column nullable first".to_string(),
                        "provide a DEFAULT expression".to_string(),
                        "split into expand -> backfill -> enforce phases".to_string(),
                    ],
                });
            }
            steps.push(make_step(
                format!("add column {} to {qualified}", col.name),
                vec![sql::add_column(&qualified, col)],
                SafetyClass::Safe,
            ));
        }

        for col_diff in &table_diff.modified_columns {
            let statements = sql::alter_column(&qualified, col_diff);
            if statements.is_empty() {
                continue;
            }
            let safety_class = column_change_safety(col_diff);
            let mut step = make_step(format!("alter column {} on {qualified}", col_diff.column_name), statements, safety_class);
            if safety_class == SafetyClass::Lossy || safety_class == SafetyClass::Dangerous {
                step.data_loss_warning = Some(format!(
                    "reverting {}.{} may not be exact if the narrower type already truncated data",
                    qualified, col_diff.column_name
                ));
            }
            steps.push(step);
        }

        for fk in &table_diff.added_foreign_keys {
            steps.push(make_step(
                format!("add foreign key {} on {qualified}", fk.name),
                vec![sql::add_foreign_key(&qualified, fk)],
                SafetyClass::Safe,
            ));
        }

        for index in &table_diff.added_indexes {
            steps.push(make_step(
                format!("create index {} on {qualified}", index.name),
                vec![sql::create_index(&qualified, index)],
                SafetyClass::Safe,
            ));
        }

        for index in &table_diff.removed_indexes {
            steps.push(make_step(format!("drop index {}", index.name), vec![sql::drop_index(&index.name)], SafetyClass::Safe));
        }

        for fk in &table_diff.removed_foreign_keys {
            steps.push(make_step(
                format!("drop foreign key {} on {qualified}", fk.name),
                vec![sql::drop_constraint(&qualified, &fk.name)],
                SafetyClass::Safe,
            ));
        }

        if table_diff.rls_changed {
            steps.push(make_step(
                format!("{} row level security on {qualified}", if table_diff.rls_enabled { "enable" } else { "disable" }),
                vec![sql::set_rls(&qualified, table_diff.rls_enabled)],
                SafetyClass::Safe,
            ));
        }

        for col in &table_diff.removed_columns {
            let mut step = make_step(
                format!("drop column {} on {qualified}", col.name),
                vec![sql::drop_column(&qualified, &col.name)],
                SafetyClass::Dangerous,
            );
            step.data_loss_warning = Some(format!("dropping {}.{} discards its data irreversibly", qualified, col.name));
            steps.push(step);
        }
    }

    for table in &diff.removed_tables {
        let mut step = make_step(format!("drop table {}", table.qualified_name()), vec![sql::drop_table(&table.qualified_name())], SafetyClass::Dangerous);
        step.data_loss_warning = Some(format!("dropping {} discards all of its data irreversibly", table.qualified_name()));
        steps.push(step);
    }

    for step in &mut steps {
        safety::annotate(step);
    }

    Ok(Plan::new(source_hash, steps))
}

fn column_change_safety(diff: &schema::ColumnDiff) -> SafetyClass {
    use schema::ColumnChange;
    if diff.changes.contains(&ColumnChange::Type) {
        let widening = is_known_widening(&diff.old.logical_type(), &diff.new.logical_type());
        return if widening { SafetyClass::Safe } else { SafetyClass::Dangerous };
    }
    SafetyClass::Safe
}

fn is_known_widening(old: &str, new: &str) -> bool {
    let old_base = old.split('(').next().unwrap_or(old);
    let new_base = new.split('(').next().unwrap_or(new);
    const WIDENINGS: &[(&str, &str)] = &[
        ("smallint", "integer"),
        ("smallint", "bigint"),
        ("integer", "bigint"),
        ("real", "double precision"),
        ("varchar", "text"),
        ("char", "text"),
        ("date", "timestamp"),
        ("date", "timestamp with time zone"),
        ("timestamp", "timestamp with time zone"),
    ];
    old_base == new_base || WIDENINGS.iter().any(|(from, to)| *from == old_base && *to == new_base)
}

fn make_step(description: String, sql: Vec<String>, safety_class: SafetyClass) -> PlanStep {
    let mut step = PlanStep::new(description, sql);
    step.safety = Some(safety_class);
    step
}

/// Used by [`reverse`] to reconstruct a dropped table's `CREATE TABLE` from
/// the pre-migration Schema.
pub(crate) fn table_from_source<'a>(source: &'a Schema, qualified_name: &str) -> Option<&'a Table> {
    source.table(qualified_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::differ::diff;
    use crate::schema::ColumnBuilder;

    #[test]
    fn plan_creates_table_then_indexes_then_foreign_keys() {
        let mut table = Table::builder("orders").column(ColumnBuilder::new("id", "integer").primary_key().build()).build();
        table.indexes.push(crate::schema::Index::new("orders_idx", vec!["id".to_string()], false));
        let desired = Schema::new(vec![table]).unwrap();
        let d = diff(&Schema::empty(), &desired);
        let p = plan(&d, &desired).unwrap();
        assert_eq!(p.steps.len(), 2);
        assert!(p.steps[0].sql[0].starts_with("CREATE TABLE"));
        assert!(p.steps[1].sql[0].starts_with("CREATE INDEX"));
    }

    #[test]
    fn plan_rejects_not_null_column_without_default() {
        let current = Schema::new(vec![Table::builder("t").column(ColumnBuilder::new("id", "integer").primary_key().build()).build()]).unwrap();
        let desired = Schema::new(vec![Table::builder("t")
            .column(ColumnBuilder::new("id", "integer").primary_key().build())
            .column(ColumnBuilder::new("n", "integer").not_null().build())
            .build()])
        .unwrap();
        let d = diff(&current, &desired);
        assert!(plan(&d, &desired).is_err());
    }

    #[test]
    fn plan_allows_nullable_added_column() {
        let current = Schema::new(vec![Table::builder("t").column(ColumnBuilder::new("id", "integer").primary_key().build()).build()]).unwrap();
        let desired = Schema::new(vec![Table::builder("t")
            .column(ColumnBuilder::new("id", "integer").primary_key().build())
            .column(ColumnBuilder::new("age", "integer").build())
            .build()])
        .unwrap();
        let d = diff(&current, &desired);
        let p = plan(&d, &desired).unwrap();
        assert_eq!(p.steps.len(), 1);
        assert_eq!(p.steps[0].safety, Some(SafetyClass::Safe));
    }

    #[test]
    fn source_hash_matches_canonical_hash_of_desired_schema() {
        let desired = Schema::new(vec![Table::builder("t").column(ColumnBuilder::new("id", "integer").primary_key().build()).build()]).unwrap();
        let d = diff(&Schema::empty(), &desired);
        let p = plan(&d, &desired).unwrap();
        assert_eq!(p.source_hash, schema::canonical_hash(&desired));
    }
}
