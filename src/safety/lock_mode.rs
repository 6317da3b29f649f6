//! Lock-mode inference (§4.6): maps a single SQL statement's shape to the
//! Postgres lock mode it takes on the table it targets. Matching is textual
//! because, as in the Planner's reverse-plan dispatch, this SQL is always
//! generator-produced and canonical — there is no foreign input to parse.

use crate::plan::LockMode;

pub fn infer_lock_mode(sql: &str) -> LockMode {
    let upper = sql.to_uppercase();

    if upper.contains("CREATE INDEX CONCURRENTLY") || upper.contains("CREATE UNIQUE INDEX CONCURRENTLY") {
        return LockMode::ShareUpdateExclusive;
    }
    if upper.contains("CREATE INDEX") || upper.contains("CREATE UNIQUE INDEX") {
        return LockMode::Share;
    }
    if upper.contains("VALIDATE CONSTRAINT") {
        return LockMode::ShareUpdateExclusive;
    }
    if upper.contains("ADD CONSTRAINT") && upper.contains("NOT VALID") {
        return LockMode::ShareUpdateExclusive;
    }
    if upper.contains("CREATE TABLE")
        || upper.contains("DROP TABLE")
        || upper.contains("ALTER TABLE")
        || upper.contains("DROP INDEX")
    {
        return LockMode::AccessExclusive;
    }

    LockMode::AccessShare
}
