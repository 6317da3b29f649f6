//! End-to-end scenarios from §8 (S1-S6), using literal inputs and literal
//! expected outputs as specified.
//!
//! S1 and S6's introspection half require a live Postgres database and are
//! gated behind `#[ignore]` + `DATABASE_URL`, following the teacher's
//! pattern of keeping DB-touching tests separately runnable from the pure
//! unit suite (`cargo test -- --ignored` with `DATABASE_URL` set).

use pg_schema_sync::plan::{LockMode, SafetyClass};
use pg_schema_sync::schema::Schema;
use pg_schema_sync::{differ, parser, planner};

fn parse_ok(sql: &str) -> Schema {
    let outcome = parser::parse(sql);
    assert!(!outcome.has_errors(), "unexpected diagnostics: {:?}", outcome.diagnostics);
    outcome.schema
}

/// S1 (pure-parser half): `CREATE TABLE users (id integer PRIMARY KEY, email
/// text NOT NULL);` lowers to exactly one table with two columns, no
/// indexes, no foreign keys. The introspection round-trip half of S1 is
/// `introspection_of_created_table_matches_s1` below, `#[ignore]`-gated.
#[test]
fn s1_parses_to_one_table_two_columns() {
    let schema = parse_ok("CREATE TABLE users (id integer PRIMARY KEY, email text NOT NULL);");
    assert_eq!(schema.tables.len(), 1);
    let users = schema.table("public.users").expect("users table");
    assert_eq!(users.columns.len(), 2);
    assert_eq!(users.columns[0].name, "id");
    assert_eq!(users.columns[0].type_name, "integer");
    assert!(!users.columns[0].nullable);
    assert!(users.columns[0].is_primary_key);
    assert_eq!(users.columns[1].name, "email");
    assert_eq!(users.columns[1].type_name, "text");
    assert!(!users.columns[1].nullable);
    assert!(users.indexes.is_empty());
    assert!(users.foreign_keys.is_empty());
}

/// S2: desired schema S1 against an empty database yields a Plan with
/// exactly one step, `CREATE TABLE` with the exact rendered SQL, ACCESS
/// EXCLUSIVE lock, safe.
#[test]
fn s2_plan_against_empty_database_is_one_create_table_step() {
    let desired = parse_ok("CREATE TABLE users (id integer PRIMARY KEY, email text NOT NULL);");
    let delta = differ::diff(&Schema::empty(), &desired);
    let plan = planner::plan(&delta, &desired).unwrap();

    assert_eq!(plan.steps.len(), 1);
    assert_eq!(
        plan.steps[0].sql,
        vec!["CREATE TABLE users (\n  id integer NOT NULL PRIMARY KEY,\n  email text NOT NULL\n)".to_string()],
    );
    assert_eq!(plan.steps[0].lock_mode, Some(LockMode::AccessExclusive));
    assert_eq!(plan.steps[0].safety, Some(SafetyClass::Safe));
}

/// S3: desired adds a nullable column `age integer` to S1; plan is one
/// `ADD COLUMN` step, safe, and its reverse is `DROP COLUMN` with a
/// data-loss warning.
#[test]
fn s3_added_nullable_column_plans_and_reverses() {
    let current = parse_ok("CREATE TABLE users (id integer PRIMARY KEY, email text NOT NULL);");
    let desired = parse_ok("CREATE TABLE users (id integer PRIMARY KEY, email text NOT NULL, age integer);");

    let delta = differ::diff(&current, &desired);
    let plan = planner::plan(&delta, &desired).unwrap();
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].sql, vec!["ALTER TABLE users ADD COLUMN age integer".to_string()]);
    assert_eq!(plan.steps[0].safety, Some(SafetyClass::Safe));

    let reverse_plan = planner::reverse(&plan, &current);
    assert_eq!(reverse_plan.steps.len(), 1);
    assert_eq!(reverse_plan.steps[0].sql, vec!["ALTER TABLE users DROP COLUMN age".to_string()]);
    assert!(reverse_plan.steps[0].data_loss_warning.is_some());
}

/// S4: `CREATE TABLE t (id INTEGER, name TEXT UNQUE);` yields one
/// `syntax_error` diagnostic at line 1 mentioning `UNQUE` and suggesting
/// `UNIQUE`.
#[test]
fn s4_keyword_typo_suggests_correction_at_line_one() {
    let outcome = parser::parse("CREATE TABLE t (id INTEGER, name TEXT UNQUE);");
    let diag = outcome
        .diagnostics
        .iter()
        .find(|d| d.code == "syntax_error")
        .expect("expected a syntax_error diagnostic");
    assert_eq!(diag.range.start.line, 0); // zero-indexed; line 1 in 1-based form
    assert!(diag.message.contains("UNQUE"));
    assert!(diag.message.contains("UNIQUE"));
}

/// S5: `CREATE TABLE a (id INT); DROP TABLE a;` yields a
/// `dangerous_drop_table` diagnostic on the second statement's line.
#[test]
fn s5_drop_table_flagged_on_its_own_line() {
    let source = "CREATE TABLE a (id INT);\nDROP TABLE a;";
    let outcome = parser::parse(source);
    let diag = outcome
        .diagnostics
        .iter()
        .find(|d| d.code == "dangerous_drop_table")
        .expect("expected a dangerous_drop_table diagnostic");
    assert_eq!(diag.range.start.line, 1); // zero-indexed second line
}

/// S6 (pure-computation half): introspecting a column created as `id
/// INTEGER NOT NULL DEFAULT nextval('manual_seq')` where `manual_seq` is not
/// owned by the column should preserve the raw default and report type
/// `integer` rather than reclassifying to `serial` — exercised directly
/// against the introspector's default-normalization logic in
/// `introspect::serial`'s own unit tests (see src/introspect/serial.rs),
/// since reproducing it here would require a live database. The
/// database-touching half is `s6_introspects_manual_sequence_default`,
/// `#[ignore]`-gated below.
#[test]
fn s6_parser_half_treats_nextval_default_as_function_kind() {
    let schema = parse_ok("CREATE TABLE t (id integer NOT NULL DEFAULT nextval('manual_seq'));");
    let col = schema.table("public.t").unwrap().column("id").unwrap();
    assert_eq!(col.type_name, "integer");
    assert!(!col.nullable);
    assert!(col.default.as_deref().unwrap().contains("nextval"));
}

fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

/// S1, database half: introspecting the table created by S1's DDL against a
/// real Postgres database yields the same shape the parser produced.
#[tokio::test]
#[ignore = "requires a live Postgres database; run with DATABASE_URL set and --ignored"]
async fn introspection_of_created_table_matches_s1() {
    let Some(url) = database_url() else { return };
    use sqlx::postgres::PgConnectOptions;
    use std::str::FromStr;

    let options = PgConnectOptions::from_str(&url).unwrap();
    let mut conn = pg_schema_sync::introspect::connect_and_ping(options).await.unwrap();
    sqlx::query("DROP TABLE IF EXISTS users").execute(&mut conn).await.unwrap();
    sqlx::query("CREATE TABLE users (id integer PRIMARY KEY, email text NOT NULL)").execute(&mut conn).await.unwrap();

    let schema = pg_schema_sync::introspect::introspect(&mut conn, "public").await.unwrap();
    let users = schema.table("public.users").unwrap();
    assert_eq!(users.columns.len(), 2);
    assert!(users.columns[0].is_primary_key);

    sqlx::query("DROP TABLE users").execute(&mut conn).await.unwrap();
}

/// S6, database half: a `SERIAL PRIMARY KEY` column reclassifies to
/// `serial`; a manually-owned sequence default is preserved verbatim.
#[tokio::test]
#[ignore = "requires a live Postgres database; run with DATABASE_URL set and --ignored"]
async fn s6_introspects_manual_sequence_default() {
    let Some(url) = database_url() else { return };
    use sqlx::postgres::PgConnectOptions;
    use std::str::FromStr;

    let options = PgConnectOptions::from_str(&url).unwrap();
    let mut conn = pg_schema_sync::introspect::connect_and_ping(options).await.unwrap();
    sqlx::query("DROP TABLE IF EXISTS serial_t, manual_t CASCADE").execute(&mut conn).await.unwrap();
    sqlx::query("DROP SEQUENCE IF EXISTS manual_seq").execute(&mut conn).await.unwrap();
    sqlx::query("CREATE TABLE serial_t (id SERIAL PRIMARY KEY)").execute(&mut conn).await.unwrap();
    sqlx::query("CREATE SEQUENCE manual_seq").execute(&mut conn).await.unwrap();
    sqlx::query("CREATE TABLE manual_t (id INTEGER NOT NULL DEFAULT nextval('manual_seq'))").execute(&mut conn).await.unwrap();

    let schema = pg_schema_sync::introspect::introspect(&mut conn, "public").await.unwrap();
    let serial_col = schema.table("public.serial_t").unwrap().column("id").unwrap();
    assert_eq!(serial_col.type_name, "serial");
    assert!(serial_col.default.is_none());

    let manual_col = schema.table("public.manual_t").unwrap().column("id").unwrap();
    assert_eq!(manual_col.type_name, "integer");
    assert_eq!(manual_col.default.as_deref(), Some("nextval('manual_seq'::regclass)"));

    sqlx::query("DROP TABLE serial_t, manual_t CASCADE").execute(&mut conn).await.unwrap();
    sqlx::query("DROP SEQUENCE manual_seq").execute(&mut conn).await.unwrap();
}
