//! Property-based tests for the quantified invariants of §8: diff
//! idempotence (2), hash stability under child-set reordering (4), position
//! round-trip (5), and totality of dangerous-pattern detection (6).
//!
//! Property 1 (diff soundness) and half of S1/S6 require a live Postgres
//! database to round-trip through introspection; those are written as
//! `#[ignore]`-gated integration tests in `tests/e2e.rs` instead, following
//! the teacher's pattern of keeping pure-computation properties separate
//! from database-touching ones.

use pg_schema_sync::diagnostics::Position;
use pg_schema_sync::schema::{Column, ColumnBuilder, ForeignKey, Index, Schema, Table};
use proptest::prelude::*;

fn ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,8}".prop_map(|s| s)
}

fn pg_type() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("integer"),
        Just("bigint"),
        Just("text"),
        Just("boolean"),
        Just("timestamp with time zone"),
    ]
}

fn column_strategy() -> impl Strategy<Value = Column> {
    (ident(), pg_type(), any::<bool>()).prop_map(|(name, ty, nullable)| {
        let mut builder = ColumnBuilder::new(name, ty);
        if !nullable {
            builder = builder.not_null();
        }
        builder.build()
    })
}

fn table_strategy() -> impl Strategy<Value = Table> {
    (ident(), prop::collection::vec(column_strategy(), 1..5)).prop_map(|(name, mut columns)| {
        let mut seen = std::collections::HashSet::new();
        columns.retain(|c| seen.insert(c.name.clone()));
        if columns.is_empty() {
            columns.push(ColumnBuilder::new("id", "integer").build());
        }
        let mut builder = Table::builder(name);
        for col in columns {
            builder = builder.column(col);
        }
        builder.build()
    })
}

fn schema_strategy() -> impl Strategy<Value = Schema> {
    prop::collection::vec(table_strategy(), 0..4).prop_map(|mut tables| {
        let mut seen = std::collections::HashSet::new();
        tables.retain(|t| seen.insert(t.qualified_name()));
        Schema::new(tables).unwrap()
    })
}

proptest! {
    /// §8 property 2: `diff(A, A)` is empty for every Schema `A`.
    #[test]
    fn diff_of_a_schema_with_itself_is_empty(schema in schema_strategy()) {
        let delta = pg_schema_sync::differ::diff(&schema, &schema);
        prop_assert!(delta.is_empty());
    }

    /// §8 property 4: hash is identical across orderings of a table's
    /// index/foreign-key child sets (only those, not table/column order,
    /// per `schema::hash`'s doc comment on what counts as "ordering").
    #[test]
    fn hash_is_stable_under_index_reordering(
        base in table_strategy(),
        a_name in ident(),
        b_name in ident(),
    ) {
        prop_assume!(a_name != b_name);
        prop_assume!(!base.columns.is_empty());
        let col_name = base.columns[0].name.clone();

        let mut forward = base.clone();
        forward.indexes.push(Index::new(&a_name, vec![col_name.clone()], false));
        forward.indexes.push(Index::new(&b_name, vec![col_name.clone()], false));

        let mut reversed = base;
        reversed.indexes.push(Index::new(&b_name, vec![col_name.clone()], false));
        reversed.indexes.push(Index::new(&a_name, vec![col_name], false));

        let schema_forward = Schema::new(vec![forward]).unwrap();
        let schema_reversed = Schema::new(vec![reversed]).unwrap();
        prop_assert_eq!(
            pg_schema_sync::schema::canonical_hash(&schema_forward),
            pg_schema_sync::schema::canonical_hash(&schema_reversed),
        );
    }

    /// §8 property 5: `offset(position(D, o)) == o` for every valid offset.
    #[test]
    fn position_round_trips_every_offset_in_arbitrary_documents(doc in "[ -~\\n]{0,200}") {
        for offset in 0..=doc.len() {
            if !doc.is_char_boundary(offset) {
                continue;
            }
            let pos = Position::from_offset(&doc, offset);
            prop_assert_eq!(pos.to_offset(), offset);
        }
    }

    /// §8 property 6: every `DROP TABLE` outside strings/comments is
    /// detected, for arbitrary table names.
    #[test]
    fn drop_table_is_always_detected_for_any_identifier(name in ident()) {
        let source = format!("DROP TABLE {name};");
        let outcome = pg_schema_sync::parser::parse(&source);
        prop_assert!(outcome.diagnostics.iter().any(|d| d.code == "dangerous_drop_table"));
    }

    /// §8 property 6, TRUNCATE variant.
    #[test]
    fn truncate_is_always_detected_for_any_identifier(name in ident()) {
        let source = format!("TRUNCATE {name};");
        let outcome = pg_schema_sync::parser::parse(&source);
        prop_assert!(outcome.diagnostics.iter().any(|d| d.code == "dangerous_truncate"));
    }

    /// §8 property 6: a `DROP TABLE` mentioned only inside a string literal
    /// or comment must NOT be flagged (the scan is quote/comment-aware).
    #[test]
    fn drop_table_inside_a_comment_is_not_flagged(name in ident()) {
        let source = format!("-- DROP TABLE {name};\nCREATE TABLE t (id integer PRIMARY KEY);");
        let outcome = pg_schema_sync::parser::parse(&source);
        prop_assert!(!outcome.diagnostics.iter().any(|d| d.code == "dangerous_drop_table"));
    }
}

#[test]
fn foreign_key_round_trips_through_json() {
    let fk = ForeignKey {
        name: "fk_user".to_string(),
        columns: vec!["user_id".to_string()],
        referenced_table: "public.users".to_string(),
        referenced_columns: vec!["id".to_string()],
        on_delete: None,
        on_update: None,
    };
    let json = serde_json::to_string(&fk).unwrap();
    let back: ForeignKey = serde_json::from_str(&json).unwrap();
    assert_eq!(fk, back);
}
