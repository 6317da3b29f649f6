//! Rewritable-flag logic (§4.6): statements with a known lock-safer
//! alternative. The rewrites themselves are applied by the Planner when the
//! caller opts in; this module only decides *whether* a rewrite exists and
//! produces the rewritten SQL on request.

pub fn is_rewritable(sql: &str) -> bool {
    let upper = sql.to_uppercase();
    (upper.contains("CREATE INDEX") || upper.contains("CREATE UNIQUE INDEX")) && !upper.contains("CONCURRENTLY")
        || (upper.contains("ADD CONSTRAINT") && upper.contains("FOREIGN KEY") && !upper.contains("NOT VALID"))
}

/// `CREATE INDEX i ON t (cols)` -> `CREATE INDEX CONCURRENTLY i ON t (cols)`.
pub fn rewrite_create_index_concurrently(sql: &str) -> Option<String> {
    let upper = sql.to_uppercase();
    if upper.contains("CONCURRENTLY") {
        return None;
    }
    if let Some(pos) = upper.find("CREATE UNIQUE INDEX") {
        let insert_at = pos + "CREATE UNIQUE INDEX".len();
        let mut out = sql.to_string();
        out.insert_str(insert_at, " CONCURRENTLY");
        return Some(out);
    }
    if let Some(pos) = upper.find("CREATE INDEX") {
        let insert_at = pos + "CREATE INDEX".len();
        let mut out = sql.to_string();
        out.insert_str(insert_at, " CONCURRENTLY");
        return Some(out);
    }
    None
}

/// Splits `ALTER TABLE t ADD CONSTRAINT fk FOREIGN KEY (...) REFERENCES r (...)`
/// into the `NOT VALID` form plus a trailing `VALIDATE CONSTRAINT` statement,
/// matching §4.6's two-step, each-`SHARE UPDATE EXCLUSIVE` rewrite.
pub fn rewrite_add_constraint_not_valid(sql: &str, table: &str, constraint_name: &str) -> Option<Vec<String>> {
    let upper = sql.to_uppercase();
    if !upper.contains("ADD CONSTRAINT") || !upper.contains("FOREIGN KEY") || upper.contains("NOT VALID") {
        return None;
    }
    let not_valid = format!("{} NOT VALID", sql.trim_end_matches(';').trim_end());
    let validate = format!("ALTER TABLE {table} VALIDATE CONSTRAINT {constraint_name}");
    Some(vec![not_valid, validate])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_create_index_is_rewritable() {
        assert!(is_rewritable("CREATE INDEX i ON t (a)"));
    }

    #[test]
    fn concurrent_index_is_not_rewritable_again() {
        assert!(!is_rewritable("CREATE INDEX CONCURRENTLY i ON t (a)"));
    }

    #[test]
    fn rewrite_inserts_concurrently_after_create_index() {
        let rewritten = rewrite_create_index_concurrently("CREATE INDEX i ON t (a)").unwrap();
        assert_eq!(rewritten, "CREATE INDEX CONCURRENTLY i ON t (a)");
    }

    #[test]
    fn rewrite_foreign_key_splits_into_two_statements() {
        let steps = rewrite_add_constraint_not_valid(
            "ALTER TABLE orders ADD CONSTRAINT orders_user_fkey FOREIGN KEY (user_id) REFERENCES users (id)",
            "orders",
            "orders_user_fkey",
        )
        .unwrap();
        assert_eq!(steps.len(), 2);
        assert!(steps[0].ends_with("NOT VALID"));
        assert!(steps[1].contains("VALIDATE CONSTRAINT"));
    }
}
