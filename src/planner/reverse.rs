//! Reverse-plan generation (§4.5). Walks a forward [`Plan`]'s steps in
//! reverse and emits the inverse of each, using textual statement-kind
//! dispatch rather than re-parsing — acceptable because the forward SQL is
//! generator-produced and canonical (never user-authored).

use crate::plan::{Plan, PlanStep, SafetyClass};
use crate::schema::Schema;

use super::sql;
use super::table_from_source;

/// `reverse(plan, pre_migration_schema) -> Plan`. The returned Plan's
/// `source_hash` is recomputed from `pre_migration_schema` since applying it
/// is meant to restore that prior state.
pub fn reverse(plan: &Plan, pre_migration_schema: &Schema) -> Plan {
    let mut steps = Vec::new();

    for step in plan.steps.iter().rev() {
        steps.push(reverse_step(step, pre_migration_schema));
    }

    Plan::new(crate::schema::canonical_hash(pre_migration_schema), steps)
}

/// The forward SQL generators render `public`-schema tables without a
/// prefix (§4.5); re-qualify a name extracted from generated SQL before
/// looking it up in a Schema, whose tables are keyed by `namespace.name`.
fn qualify(name: &str) -> String {
    if name.contains('.') {
        name.to_string()
    } else {
        format!("public.{name}")
    }
}

/// True when every statement in a step is one `ALTER COLUMN` sub-clause —
/// the shape [`sql::alter_column`] groups TYPE / NOT NULL / DEFAULT changes
/// into, up to three statements sharing one [`PlanStep`] (§4.5).
fn is_alter_column_group(sql: &[String]) -> bool {
    !sql.is_empty() && sql.iter().all(|s| s.to_uppercase().contains("ALTER COLUMN"))
}

/// Reverses each sub-statement of a grouped column-alter step independently,
/// looking up the pre-migration column for the TYPE and DEFAULT it had
/// before the forward change (§4.5: "`ALTER COLUMN TYPE` reverts to the old
/// type"; "`SET/DROP DEFAULT` restores the previous default, or drops it if
/// previously absent").
fn reverse_alter_column_group(statements: &[String], pre_migration_schema: &Schema) -> PlanStep {
    let (table, column) = extract_table_and_ident(&statements[0], "ALTER COLUMN");
    let old_column = table_from_source(pre_migration_schema, &qualify(&table)).and_then(|t| t.column(&column));

    let mut reversed = Vec::new();
    for stmt in statements {
        let upper = stmt.to_uppercase();
        if upper.contains(" TYPE ") {
            match old_column {
                Some(col) => reversed.push(format!("ALTER TABLE {table} ALTER COLUMN {column} TYPE {}", col.type_name)),
                None => reversed.push(format!("-- cannot restore type of {table}.{column}: not found in pre-migration schema")),
            }
        } else if upper.contains("SET NOT NULL") {
            reversed.push(format!("ALTER TABLE {table} ALTER COLUMN {column} DROP NOT NULL"));
        } else if upper.contains("DROP NOT NULL") {
            reversed.push(format!("ALTER TABLE {table} ALTER COLUMN {column} SET NOT NULL"));
        } else if upper.contains("SET DEFAULT") || upper.contains("DROP DEFAULT") {
            match old_column.and_then(|col| col.default.as_ref()) {
                Some(expr) => reversed.push(format!("ALTER TABLE {table} ALTER COLUMN {column} SET DEFAULT {expr}")),
                None => reversed.push(format!("ALTER TABLE {table} ALTER COLUMN {column} DROP DEFAULT")),
            }
        }
    }
    // Undo sub-clauses in the opposite order they were applied.
    reversed.reverse();

    let safety = if old_column.is_some() { SafetyClass::Review } else { SafetyClass::Dangerous };
    let data_loss_warning = Some(format!(
        "reverting {table}.{column} may not be exact if a narrower type or an enforced NOT NULL already discarded data"
    ));
    mirrored_step(format!("reverse: alter column {column} on {table}"), reversed, safety, data_loss_warning)
}

fn reverse_step(step: &PlanStep, pre_migration_schema: &Schema) -> PlanStep {
    if is_alter_column_group(&step.sql) {
        return reverse_alter_column_group(&step.sql, pre_migration_schema);
    }

    let first = step.sql.first().map(String::as_str).unwrap_or("");
    let upper = first.to_uppercase();

    if upper.contains("CREATE TABLE") {
        let table_name = extract_after(first, "CREATE TABLE").unwrap_or_default();
        let qualified = table_name.split_whitespace().next().unwrap_or("").to_string();
        return mirrored_step(format!("reverse: drop table {qualified}"), vec![sql::drop_table(&qualified)], SafetyClass::Dangerous, Some(format!("restoring {qualified} after reversal would lose any rows inserted since the forward migration")));
    }

    if upper.starts_with("DROP TABLE") {
        let qualified = extract_after(first, "DROP TABLE")
            .map(|rest| rest.split_whitespace().next().unwrap_or("").to_string())
            .unwrap_or_default();
        return match table_from_source(pre_migration_schema, &qualify(&qualified)) {
            Some(table) => mirrored_step(format!("reverse: recreate table {qualified}"), vec![sql::create_table(table)], SafetyClass::Safe, None),
            None => mirrored_step(format!("reverse: cannot recreate table {qualified}"), vec![format!("-- table {qualified} not found in pre-migration schema")], SafetyClass::Dangerous, Some("pre-migration schema did not contain this table; structure cannot be reconstructed".to_string())),
        };
    }

    if upper.contains("ADD COLUMN") {
        let (table, column) = extract_table_and_ident(first, "ADD COLUMN");
        mirrored_step(format!("reverse: drop column {column} on {table}"), vec![sql::drop_column(&table, &column)], SafetyClass::Dangerous, Some(format!("data in {table}.{column} since the forward migration would be lost")))
    } else if upper.contains("DROP COLUMN") {
        let (table, column) = extract_table_and_ident(first, "DROP COLUMN");
        match table_from_source(pre_migration_schema, &qualify(&table)).and_then(|t| t.column(&column)) {
            Some(col) => mirrored_step(format!("reverse: re-add column {column} on {table}"), vec![sql::add_column(&table, col)], SafetyClass::Lossy, Some(format!("values previously in {table}.{column} cannot be restored, only its structure"))),
            None => mirrored_step(format!("reverse: cannot restore column {column} on {table}"), vec![format!("-- column {table}.{column} not found in pre-migration schema")], SafetyClass::Dangerous, None),
        }
    } else if upper.contains("CREATE") && upper.contains("INDEX") {
        let index_name = extract_index_name(first);
        mirrored_step(format!("reverse: drop index {index_name}"), vec![sql::drop_index(&index_name)], SafetyClass::Safe, None)
    } else if upper.starts_with("DROP INDEX") {
        mirrored_step("reverse: recreate index (structure only, not available from SQL text)".to_string(), vec![format!("-- {first} cannot be reversed without the pre-migration index definition")], SafetyClass::Dangerous, None)
    } else if upper.contains("ADD CONSTRAINT") && upper.contains("FOREIGN KEY") {
        let (table, constraint) = extract_constraint(first);
        mirrored_step(format!("reverse: drop constraint {constraint} on {table}"), vec![sql::drop_constraint(&table, &constraint)], SafetyClass::Safe, None)
    } else if upper.contains("DROP CONSTRAINT") {
        mirrored_step("reverse: cannot recreate constraint from SQL text alone".to_string(), vec![format!("-- {first} requires the pre-migration foreign key definition")], SafetyClass::Dangerous, None)
    } else if upper.contains("ENABLE ROW LEVEL SECURITY") {
        let table = extract_table_before(first, "ENABLE ROW LEVEL SECURITY");
        mirrored_step(format!("reverse: disable row level security on {table}"), vec![sql::set_rls(&table, false)], SafetyClass::Safe, None)
    } else if upper.contains("DISABLE ROW LEVEL SECURITY") {
        let table = extract_table_before(first, "DISABLE ROW LEVEL SECURITY");
        mirrored_step(format!("reverse: enable row level security on {table}"), vec![sql::set_rls(&table, true)], SafetyClass::Safe, None)
    } else {
        mirrored_step(format!("reverse: manual review required for: {first}"), vec![format!("-- no automatic reverse known for: {first}")], SafetyClass::Dangerous, Some("this step has no known automatic reverse".to_string()))
    }
}

fn mirrored_step(description: String, sql: Vec<String>, safety: SafetyClass, data_loss_warning: Option<String>) -> PlanStep {
    let mut step = PlanStep::new(description, sql);
    step.safety = Some(safety);
    step.data_loss_warning = data_loss_warning;
    crate::safety::annotate(&mut step);
    step
}

fn extract_after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    let upper = text.to_uppercase();
    let pos = upper.find(marker)?;
    Some(text[pos + marker.len()..].trim())
}

fn extract_table_before<'a>(text: &'a str, marker: &str) -> String {
    let upper = text.to_uppercase();
    let Some(pos) = upper.find("ALTER TABLE") else {
        return String::new();
    };
    let after_alter = text[pos + "ALTER TABLE".len()..].trim();
    let end = after_alter.to_uppercase().find(&marker.to_uppercase()).unwrap_or(after_alter.len());
    after_alter[..end].trim().to_string()
}

fn extract_table_and_ident(text: &str, marker: &str) -> (String, String) {
    let table = extract_table_before(text, marker);
    let ident = extract_after(text, marker)
        .map(|rest| rest.split_whitespace().next().unwrap_or("").to_string())
        .unwrap_or_default();
    (table, ident)
}

fn extract_index_name(text: &str) -> String {
    let upper = text.to_uppercase();
    let after_index = if let Some(pos) = upper.find("CREATE UNIQUE INDEX") {
        &text[pos + "CREATE UNIQUE INDEX".len()..]
    } else if let Some(pos) = upper.find("CREATE INDEX") {
        &text[pos + "CREATE INDEX".len()..]
    } else {
        ""
    };
    after_index.trim().split_whitespace().next().unwrap_or("").to_string()
}

fn extract_constraint(text: &str) -> (String, String) {
    let table = extract_table_before(text, "ADD CONSTRAINT");
    let constraint = extract_after(text, "ADD CONSTRAINT")
        .map(|rest| rest.split_whitespace().next().unwrap_or("").to_string())
        .unwrap_or_default();
    (table, constraint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanStep;
    use crate::schema::{ColumnBuilder, Table};

    #[test]
    fn reverse_of_create_table_is_drop_table() {
        let table = Table::builder("t").column(ColumnBuilder::new("id", "integer").primary_key().build()).build();
        let step = PlanStep::new("create", vec![format!("CREATE TABLE {} (\n  id integer NOT NULL PRIMARY KEY\n)", table.qualified_name())]);
        let plan = Plan::new("a".repeat(64), vec![step]);
        let rev = reverse(&plan, &Schema::empty());
        assert!(rev.steps[0].sql[0].starts_with("DROP TABLE"));
    }

    #[test]
    fn reverse_of_add_column_is_drop_column() {
        let step = PlanStep::new("add", vec!["ALTER TABLE public.t ADD COLUMN age integer".to_string()]);
        let plan = Plan::new("a".repeat(64), vec![step]);
        let rev = reverse(&plan, &Schema::empty());
        assert_eq!(rev.steps[0].sql[0], "ALTER TABLE public.t DROP COLUMN age");
    }

    #[test]
    fn reverse_preserves_total_order_by_reversing_step_order() {
        let steps = vec![
            PlanStep::new("create", vec!["CREATE TABLE public.t (\n  id integer\n)".to_string()]),
            PlanStep::new("index", vec!["CREATE INDEX t_idx ON public.t (id)".to_string()]),
        ];
        let plan = Plan::new("a".repeat(64), steps);
        let rev = reverse(&plan, &Schema::empty());
        assert!(rev.steps[0].sql[0].starts_with("DROP INDEX"));
        assert!(rev.steps[1].sql[0].starts_with("DROP TABLE"));
    }

    fn table_with_column(col: crate::schema::Column) -> Schema {
        Schema::new(vec![Table::builder("t").column(col).build()]).unwrap()
    }

    #[test]
    fn reverse_of_alter_column_type_restores_old_type() {
        let pre = table_with_column(ColumnBuilder::new("n", "integer").build());
        let step = PlanStep::new("alter", vec!["ALTER TABLE t ALTER COLUMN n TYPE bigint".to_string()]);
        let plan = Plan::new("a".repeat(64), vec![step]);
        let rev = reverse(&plan, &pre);
        assert_eq!(rev.steps[0].sql, vec!["ALTER TABLE t ALTER COLUMN n TYPE integer".to_string()]);
    }

    #[test]
    fn reverse_of_set_default_restores_previous_default() {
        let pre = table_with_column(ColumnBuilder::new("n", "integer").default_expr("0", crate::schema::DefaultKind::Literal).build());
        let step = PlanStep::new("alter", vec!["ALTER TABLE t ALTER COLUMN n SET DEFAULT 1".to_string()]);
        let plan = Plan::new("a".repeat(64), vec![step]);
        let rev = reverse(&plan, &pre);
        assert_eq!(rev.steps[0].sql, vec!["ALTER TABLE t ALTER COLUMN n SET DEFAULT 0".to_string()]);
    }

    #[test]
    fn reverse_of_drop_default_reapplies_previous_default_when_one_existed() {
        let pre = table_with_column(ColumnBuilder::new("n", "integer").default_expr("0", crate::schema::DefaultKind::Literal).build());
        let step = PlanStep::new("alter", vec!["ALTER TABLE t ALTER COLUMN n DROP DEFAULT".to_string()]);
        let plan = Plan::new("a".repeat(64), vec![step]);
        let rev = reverse(&plan, &pre);
        assert_eq!(rev.steps[0].sql, vec!["ALTER TABLE t ALTER COLUMN n SET DEFAULT 0".to_string()]);
    }

    #[test]
    fn reverse_of_set_default_drops_it_when_previously_absent() {
        let pre = table_with_column(ColumnBuilder::new("n", "integer").build());
        let step = PlanStep::new("alter", vec!["ALTER TABLE t ALTER COLUMN n SET DEFAULT 1".to_string()]);
        let plan = Plan::new("a".repeat(64), vec![step]);
        let rev = reverse(&plan, &pre);
        assert_eq!(rev.steps[0].sql, vec!["ALTER TABLE t ALTER COLUMN n DROP DEFAULT".to_string()]);
    }

    #[test]
    fn reverse_of_grouped_column_alter_reverses_every_sub_statement_in_opposite_order() {
        let pre = table_with_column(ColumnBuilder::new("n", "integer").build());
        let step = PlanStep::new(
            "alter",
            vec![
                "ALTER TABLE t ALTER COLUMN n TYPE bigint".to_string(),
                "ALTER TABLE t ALTER COLUMN n SET NOT NULL".to_string(),
                "ALTER TABLE t ALTER COLUMN n SET DEFAULT 5".to_string(),
            ],
        );
        let plan = Plan::new("a".repeat(64), vec![step]);
        let rev = reverse(&plan, &pre);
        assert_eq!(
            rev.steps[0].sql,
            vec![
                "ALTER TABLE t ALTER COLUMN n DROP DEFAULT".to_string(),
                "ALTER TABLE t ALTER COLUMN n DROP NOT NULL".to_string(),
                "ALTER TABLE t ALTER COLUMN n TYPE integer".to_string(),
            ],
        );
    }
}
