//! Safety Analyzer (§4.6). `annotate` mutates only a [`PlanStep`]'s safety
//! metadata fields; `classify` gives the Planner (and any ahead-of-plan
//! caller) a warning list keyed by diff entity rather than source span,
//! since a `SchemaDiff` has no source spans of its own.

mod lock_mode;
mod rewrite;

use serde::{Deserialize, Serialize};

use crate::plan::{PlanStep, SafetyClass};
use crate::schema::{ColumnChange, SchemaDiff};

pub use lock_mode::infer_lock_mode;
pub use rewrite::{rewrite_create_index_concurrently, rewrite_add_constraint_not_valid};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationResult {
    pub entity: String,
    pub class: SafetyClass,
    pub message: String,
    #[serde(default)]
    pub suggested_alternatives: Vec<String>,
}

/// Sets `lock_mode`/`blocks_reads`/`blocks_writes`/`rewritable` on a step
/// purely from its `sql` text. Safety classification (`safety` field) is set
/// by the Planner at the point a step is generated, since only the Planner
/// knows which diff entity produced it; this function only derives what is
/// knowable from SQL shape alone.
pub fn annotate(step: &mut PlanStep) {
    let mode = step.sql.iter().map(|s| infer_lock_mode(s)).reduce(|a, b| a.max(b));
    if let Some(mode) = mode {
        step.lock_mode = Some(mode);
        step.blocks_reads = mode.blocks_reads();
        step.blocks_writes = mode.blocks_writes();
    }
    step.rewritable = step.sql.iter().any(|s| rewrite::is_rewritable(s));
}

/// Ahead-of-plan warning list over a [`SchemaDiff`], independent of any
/// particular Plan. Used by callers that want to warn a user before even
/// generating SQL (§4.6 "ahead-of-plan warning").
pub fn classify(diff: &SchemaDiff) -> Vec<ValidationResult> {
    let mut results = Vec::new();

    for table in &diff.added_tables {
        let _ = table;
    }

    for table_diff in &diff.modified_tables {
        for col in &table_diff.added_columns {
            if !col.nullable && col.default.is_none() {
                results.push(ValidationResult {
                    entity: format!("{}.{}", table_diff.table_name, col.name),
                    class: SafetyClass::Dangerous,
                    message: format!(
                        "adding NOT NULL column {} without a DEFAULT on a possibly non-empty table {} will fail if rows exist",
                        col.name, table_diff.table_name
                    ),
                    suggested_alternatives: vec![
                        "make the column nullable first".to_string(),
                        "provide a DEFAULT expression".to_string(),
                        "split into expand -> backfill -> enforce phases".to_string(),
                    ],
                });
            }
        }

        for col_diff in &table_diff.modified_columns {
            if col_diff.changes.contains(&ColumnChange::Type) {
                let widening = is_widening(&col_diff.old.logical_type(), &col_diff.new.logical_type());
                if !widening {
                    results.push(ValidationResult {
                        entity: format!("{}.{}", table_diff.table_name, col_diff.column_name),
                        class: SafetyClass::Dangerous,
                        message: format!(
                            "changing {}.{} from {} to {} is not a known-safe widening",
                            table_diff.table_name, col_diff.column_name, col_diff.old.logical_type(), col_diff.new.logical_type()
                        ),
                        suggested_alternatives: vec!["split into expand -> backfill -> enforce phases".to_string()],
                    });
                }
            }
        }

        for col in &table_diff.removed_columns {
            results.push(ValidationResult {
                entity: format!("{}.{}", table_diff.table_name, col.name),
                class: SafetyClass::Dangerous,
                message: format!("dropping column {} on {} discards its data irreversibly", col.name, table_diff.table_name),
                suggested_alternatives: vec!["consider a deprecation window before dropping".to_string()],
            });
        }
    }

    for table in &diff.removed_tables {
        results.push(ValidationResult {
            entity: table.qualified_name(),
            class: SafetyClass::Dangerous,
            message: format!("dropping table {} discards all of its data irreversibly", table.qualified_name()),
            suggested_alternatives: vec!["consider a deprecation window before dropping".to_string()],
        });
    }

    results
}

/// Known-safe type widenings (§4.6): small -> big integer, real -> double,
/// varchar -> text, date -> timestamp, and similar. Anything else is treated
/// as unsafe and flagged for multi-phase migration.
fn is_widening(old: &str, new: &str) -> bool {
    const WIDENINGS: &[(&str, &str)] = &[
        ("smallint", "integer"),
        ("smallint", "bigint"),
        ("integer", "bigint"),
        ("real", "double precision"),
        ("varchar", "text"),
        ("character varying", "text"),
        ("char", "text"),
        ("date", "timestamp"),
        ("date", "timestamp with time zone"),
        ("timestamp", "timestamp with time zone"),
        ("numeric", "numeric"),
    ];
    let old_base = old.split('(').next().unwrap_or(old);
    let new_base = new.split('(').next().unwrap_or(new);
    old_base == new_base
        || WIDENINGS.iter().any(|(from, to)| *from == old_base && *to == new_base)
        || (old_base == "varchar" && new_base == "varchar" && varchar_widens(old, new))
}

fn varchar_widens(old: &str, new: &str) -> bool {
    let extract = |s: &str| -> Option<u32> { s.split('(').nth(1)?.trim_end_matches(')').parse().ok() };
    match (extract(old), extract(new)) {
        (Some(o), Some(n)) => n >= o,
        _ => false,
    }
}
