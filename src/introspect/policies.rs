//! Row-level-security policy introspection (§4.3) via `pg_policy`, rendering
//! the `USING`/`WITH CHECK` expression trees with `pg_get_expr`.

use sqlx::{PgConnection, Row};

use crate::schema::{Policy, PolicyCommand};

use super::table_index;

pub async fn populate(conn: &mut PgConnection, namespace: &str, tables: &mut [crate::schema::Table]) -> Result<(), sqlx::Error> {
    let rows = sqlx::query(
        "SELECT \
            c.relname AS table_name, \
            p.polname AS policy_name, \
            p.polcmd AS command, \
            p.polpermissive AS permissive, \
            COALESCE(array(SELECT rolname FROM pg_roles WHERE oid = ANY(p.polroles)), '{}') AS roles, \
            pg_get_expr(p.polqual, p.polrelid) AS using_expr, \
            pg_get_expr(p.polwithcheck, p.polrelid) AS with_check_expr \
         FROM pg_policy p \
         JOIN pg_class c ON c.oid = p.polrelid \
         JOIN pg_namespace n ON c.relnamespace = n.oid \
         WHERE n.nspname = $1 \
         ORDER BY c.relname, p.polname",
    )
    .bind(namespace)
    .fetch_all(&mut *conn)
    .await?;

    for row in rows {
        let table_name: String = row.get("table_name");
        let policy_name: String = row.get("policy_name");
        let command_code: i8 = row.get::<i8, _>("command");
        let permissive: bool = row.get("permissive");
        let roles: Vec<String> = row.get("roles");
        let using_expr: Option<String> = row.get("using_expr");
        let with_check_expr: Option<String> = row.get("with_check_expr");

        if let Some(table) = table_index(tables, namespace, &table_name) {
            table.policies.push(Policy {
                name: policy_name,
                command: command_from_code(command_code as u8 as char),
                permissive,
                roles,
                using: using_expr,
                with_check: with_check_expr,
            });
        }
    }

    for table in tables.iter_mut() {
        table.policies.sort_by(|a, b| a.name.cmp(&b.name));
    }

    Ok(())
}

/// `pg_policy.polcmd`: `r`=SELECT, `a`=INSERT, `w`=UPDATE, `d`=DELETE, `*`=ALL.
fn command_from_code(code: char) -> PolicyCommand {
    match code {
        'r' => PolicyCommand::Select,
        'a' => PolicyCommand::Insert,
        'w' => PolicyCommand::Update,
        'd' => PolicyCommand::Delete,
        _ => PolicyCommand::All,
    }
}
