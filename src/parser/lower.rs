//! Lowers a single parsed statement's `pg_query` AST node onto a working set
//! of [`Table`] values (§4.2 "AST lowering"). `CREATE TABLE`, `CREATE INDEX`,
//! and the `ALTER TABLE` subcommands used in desired-schema files are
//! covered; everything else is reported as an unsupported-statement
//! diagnostic rather than silently ignored.

use pg_query::NodeEnum;
use pg_query::protobuf::{AlterTableType, ConstrType};

use crate::diagnostics::{Diagnostic, Range};
use crate::schema::{Column, ColumnBuilder, ForeignKey, Index, ReferentialAction, Table};

use super::defaults::{deparse_node, lower_default_expr};
use super::types::{normalize_base_type, render_logical_type, render_raw_type};

/// Mutable working set of tables being built up statement-by-statement,
/// keyed by `namespace.name`. A plain `Vec` is enough at parser scale
/// (desired-schema files are hand-authored, not thousands of tables).
#[derive(Debug, Default)]
pub struct TableSet {
    pub tables: Vec<Table>,
}

impl TableSet {
    pub fn find(&self, qualified: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.qualified_name() == qualified)
    }

    fn find_mut(&mut self, qualified: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.qualified_name() == qualified)
    }

    fn remove(&mut self, qualified: &str) -> Option<Table> {
        let idx = self.tables.iter().position(|t| t.qualified_name() == qualified)?;
        Some(self.tables.remove(idx))
    }
}

/// Applies one top-level statement's AST to `tables`, emitting diagnostics
/// (document-relative ranges, resolved against `source` by the caller) on
/// anything unsupported rather than failing the whole document.
pub fn apply_statement(
    tables: &mut TableSet,
    node: &NodeEnum,
    source: &str,
    stmt_offset: usize,
    stmt_end: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let whole_stmt_range = Range::new(source, stmt_offset, stmt_end);
    match node {
        NodeEnum::CreateStmt(create) => lower_create_table(tables, create, source, whole_stmt_range, diagnostics),
        NodeEnum::IndexStmt(index) => lower_create_index(tables, index, whole_stmt_range, diagnostics),
        NodeEnum::AlterTableStmt(alter) => lower_alter_table(tables, alter, whole_stmt_range, diagnostics),
        _ => diagnostics.push(Diagnostic::hint(
            whole_stmt_range,
            "unsupported_statement",
            "statement type is not part of the desired-schema DDL subset and was ignored",
        )),
    }
}

fn qualified_name(rel: Option<&pg_query::protobuf::RangeVar>) -> String {
    match rel {
        Some(r) if !r.schemaname.is_empty() => format!("{}.{}", r.schemaname, r.relname),
        Some(r) => format!("public.{}", r.relname),
        None => "public.<unknown>".to_string(),
    }
}

fn lower_create_table(
    tables: &mut TableSet,
    create: &pg_query::protobuf::CreateStmt,
    source: &str,
    stmt_range: Range,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let qualified = qualified_name(create.relation.as_ref());
    let (namespace, name) = match qualified.split_once('.') {
        Some((ns, n)) => (ns.to_string(), n.to_string()),
        None => ("public".to_string(), qualified.clone()),
    };

    if tables.find(&qualified).is_some() {
        if create.if_not_exists {
            diagnostics.push(Diagnostic::hint(
                stmt_range,
                "redundant_if_not_exists",
                format!("table {qualified} is already declared earlier in this document"),
            ));
            return;
        }
        diagnostics.push(Diagnostic::error(
            stmt_range,
            "duplicate_table",
            format!("table {qualified} is declared more than once"),
        ));
        return;
    }

    let mut columns: Vec<Column> = Vec::new();
    let mut pending_foreign_keys: Vec<ForeignKey> = Vec::new();
    let mut pending_unique: Vec<(String, Vec<String>)> = Vec::new();
    let mut pending_pk_columns: Option<Vec<String>> = None;

    for elt in &create.table_elts {
        match elt.node.as_ref() {
            Some(NodeEnum::ColumnDef(col)) => {
                let (column, inline_pk, inline_unique, inline_fk) = lower_column_def(col, source);
                if inline_pk {
                    pending_pk_columns.get_or_insert_with(Vec::new).push(column.name.clone());
                }
                if inline_unique {
                    pending_unique.push((format!("{name}_{}_key", column.name), vec![column.name.clone()]));
                }
                if let Some(fk) = inline_fk {
                    pending_foreign_keys.push(fk);
                }
                columns.push(column);
            }
            Some(NodeEnum::Constraint(con)) => {
                lower_table_constraint(con, &mut pending_pk_columns, &mut pending_unique, &mut pending_foreign_keys, &name);
            }
            _ => {}
        }
    }

    if let Some(pk_cols) = pending_pk_columns {
        for col in &mut columns {
            if pk_cols.contains(&col.name) {
                col.is_primary_key = true;
                col.nullable = false;
            }
        }
    }

    let mut builder = Table::builder(name).namespace(namespace);
    for col in columns {
        builder = builder.column(col);
    }
    for (uname, ucols) in pending_unique {
        builder = builder.index(Index::new(uname, ucols, true));
    }
    for fk in pending_foreign_keys {
        builder = builder.foreign_key(fk);
    }

    match builder.try_build() {
        Ok(table) => tables.tables.push(table),
        Err(err) => diagnostics.push(Diagnostic::error(stmt_range, "invalid_table", err.to_string())),
    }
}

/// Returns `(column, is_inline_pk, is_inline_unique, inline_foreign_key)`.
fn lower_column_def(
    col: &pg_query::protobuf::ColumnDef,
    source: &str,
) -> (Column, bool, bool, Option<ForeignKey>) {
    let (raw_base, modifiers, is_array) = extract_type_name(col.type_name.as_ref());
    let logical = render_logical_type(&raw_base, &modifiers, is_array);
    let raw = render_raw_type(&raw_base, &modifiers, is_array);

    let mut builder = ColumnBuilder::new(col.colname.clone(), raw.clone()).type_metadata(raw, logical);
    let mut is_pk = false;
    let mut is_unique = false;
    let mut fk = None;
    let mut not_null = false;

    for con_node in &col.constraints {
        let Some(NodeEnum::Constraint(con)) = con_node.node.as_ref() else {
            continue;
        };
        match con.contype() {
            ConstrType::ConstrNotnull => not_null = true,
            ConstrType::ConstrPrimary => is_pk = true,
            ConstrType::ConstrUnique => is_unique = true,
            ConstrType::ConstrDefault => {
                if let Some(expr) = con.raw_expr.as_ref() {
                    let lowered = lower_default_expr(expr);
                    builder = builder.default_expr(lowered.rendered, lowered.kind);
                }
            }
            ConstrType::ConstrForeign => {
                fk = Some(lower_inline_foreign_key(con, &col.colname));
            }
            _ => {}
        }
    }

    if not_null || is_pk {
        builder = builder.not_null();
    }
    if is_pk {
        builder = builder.primary_key();
    }

    let _ = source;
    (builder.build(), is_pk, is_unique, fk)
}

fn lower_inline_foreign_key(con: &pg_query::protobuf::Constraint, column: &str) -> ForeignKey {
    let referenced_table = qualified_name(con.pktable.as_ref());
    let referenced_columns: Vec<String> = con
        .pk_attrs
        .iter()
        .filter_map(|n| match n.node.as_ref() {
            Some(NodeEnum::String(s)) => Some(s.sval.clone()),
            _ => None,
        })
        .collect();
    ForeignKey {
        name: format!("{column}_fkey"),
        columns: vec![column.to_string()],
        referenced_table,
        referenced_columns,
        on_delete: ReferentialAction::from_code(fk_action_char(con.fk_del_action())),
        on_update: ReferentialAction::from_code(fk_action_char(con.fk_upd_action())),
    }
}

fn fk_action_char(action: pg_query::protobuf::ConstrAction) -> char {
    use pg_query::protobuf::ConstrAction;
    match action {
        ConstrAction::ConstrActionNone | ConstrAction::Undefined => 'a',
        ConstrAction::ConstrActionRestrict => 'r',
        ConstrAction::ConstrActionCascade => 'c',
        ConstrAction::ConstrActionSetnull => 'n',
        ConstrAction::ConstrActionSetdefault => 'd',
    }
}

fn lower_table_constraint(
    con: &pg_query::protobuf::Constraint,
    pending_pk_columns: &mut Option<Vec<String>>,
    pending_unique: &mut Vec<(String, Vec<String>)>,
    pending_foreign_keys: &mut Vec<ForeignKey>,
    table_name: &str,
) {
    let cols = || -> Vec<String> {
        con.keys
            .iter()
            .filter_map(|n| match n.node.as_ref() {
                Some(NodeEnum::String(s)) => Some(s.sval.clone()),
                _ => None,
            })
            .collect()
    };
    match con.contype() {
        ConstrType::ConstrPrimary => {
            *pending_pk_columns = Some(cols());
        }
        ConstrType::ConstrUnique => {
            let columns = cols();
            let cname = if con.conname.is_empty() {
                format!("{table_name}_{}_key", columns.join("_"))
            } else {
                con.conname.clone()
            };
            pending_unique.push((cname, columns));
        }
        ConstrType::ConstrForeign => {
            let columns = cols();
            let referenced_table = qualified_name(con.pktable.as_ref());
            let referenced_columns: Vec<String> = con
                .pk_attrs
                .iter()
                .filter_map(|n| match n.node.as_ref() {
                    Some(NodeEnum::String(s)) => Some(s.sval.clone()),
                    _ => None,
                })
                .collect();
            let cname = if con.conname.is_empty() {
                format!("{table_name}_{}_fkey", columns.join("_"))
            } else {
                con.conname.clone()
            };
            pending_foreign_keys.push(ForeignKey {
                name: cname,
                columns,
                referenced_table,
                referenced_columns,
                on_delete: ReferentialAction::from_code(fk_action_char(con.fk_del_action())),
                on_update: ReferentialAction::from_code(fk_action_char(con.fk_upd_action())),
            });
        }
        _ => {}
    }
}

/// Last element of a `TypeName`'s qualified name list is the canonical type
/// name (mirrors how Postgres itself resolves `pg_catalog.int4` vs `int4`).
fn extract_type_name(tn: Option<&pg_query::protobuf::TypeName>) -> (String, Vec<i64>, bool) {
    let Some(tn) = tn else {
        return ("text".to_string(), Vec::new(), false);
    };
    let base = tn
        .names
        .last()
        .and_then(|n| match n.node.as_ref() {
            Some(NodeEnum::String(s)) => Some(s.sval.clone()),
            _ => None,
        })
        .unwrap_or_else(|| "text".to_string());

    let modifiers: Vec<i64> = tn
        .typmods
        .iter()
        .filter_map(|m| match m.node.as_ref() {
            Some(NodeEnum::AConst(ac)) => match ac.val.as_ref() {
                Some(pg_query::protobuf::a_const::Val::Ival(i)) => Some(i.ival as i64),
                _ => None,
            },
            _ => None,
        })
        .collect();

    let is_array = !tn.array_bounds.is_empty();
    (normalize_base_type(&base), modifiers, is_array)
}

fn lower_create_index(
    tables: &mut TableSet,
    index: &pg_query::protobuf::IndexStmt,
    stmt_range: Range,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let qualified = qualified_name(index.relation.as_ref());
    let Some(table) = tables.find_mut(&qualified) else {
        diagnostics.push(Diagnostic::error(
            stmt_range,
            "invalid_index_table",
            format!("CREATE INDEX references unknown table {qualified}"),
        ));
        return;
    };

    let columns: Vec<String> = index
        .index_params
        .iter()
        .filter_map(|p| match p.node.as_ref() {
            Some(NodeEnum::IndexElem(elem)) if !elem.name.is_empty() => Some(elem.name.clone()),
            _ => None,
        })
        .collect();

    let name = if index.idxname.is_empty() {
        format!("{}_{}_idx", table.name, columns.join("_"))
    } else {
        index.idxname.clone()
    };

    if table.index(&name).is_some() {
        diagnostics.push(Diagnostic::error(
            stmt_range,
            "duplicate_index",
            format!("index {name} is declared more than once"),
        ));
        return;
    }

    table.indexes.push(Index::new(name, columns, index.unique));
}

fn lower_alter_table(
    tables: &mut TableSet,
    alter: &pg_query::protobuf::AlterTableStmt,
    stmt_range: Range,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let qualified = qualified_name(alter.relation.as_ref());
    let table_name = match tables.find(&qualified) {
        Some(t) => t.name.clone(),
        None => {
            diagnostics.push(Diagnostic::error(
                stmt_range,
                "invalid_alter_table",
                format!("ALTER TABLE references unknown table {qualified}"),
            ));
            return;
        }
    };

    for cmd_node in &alter.cmds {
        let Some(NodeEnum::AlterTableCmd(cmd)) = cmd_node.node.as_ref() else {
            continue;
        };
        apply_alter_cmd(tables, &qualified, &table_name, cmd, stmt_range, diagnostics);
    }
}

fn apply_alter_cmd(
    tables: &mut TableSet,
    qualified: &str,
    table_name: &str,
    cmd: &pg_query::protobuf::AlterTableCmd,
    stmt_range: Range,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(table) = tables.find_mut(qualified) else {
        return;
    };

    match cmd.subtype() {
        AlterTableType::AtAddColumn => {
            if let Some(NodeEnum::ColumnDef(col)) = cmd.def.as_ref().and_then(|n| n.node.as_ref()) {
                let (column, is_pk, is_unique, fk) = lower_column_def(col, "");
                if table.column(&column.name).is_some() {
                    diagnostics.push(Diagnostic::error(
                        stmt_range,
                        "duplicate_column",
                        format!("column {} already exists on {qualified}", column.name),
                    ));
                    return;
                }
                if is_unique {
                    table
                        .indexes
                        .push(Index::new(format!("{table_name}_{}_key", column.name), vec![column.name.clone()], true));
                }
                if let Some(fk) = fk {
                    table.foreign_keys.push(fk);
                }
                table.columns.push(column);
                let _ = is_pk;
            }
        }
        AlterTableType::AtDropColumn => {
            let col_name = cmd.name.clone();
            if table.column(&col_name).is_none() {
                if !cmd.missing_ok {
                    diagnostics.push(Diagnostic::error(
                        stmt_range,
                        "unknown_column",
                        format!("cannot drop unknown column {col_name} on {qualified}"),
                    ));
                }
                return;
            }
            table.columns.retain(|c| c.name != col_name);
            table.indexes.retain(|i| !i.columns.contains(&col_name));
            table.foreign_keys.retain(|f| !f.columns.contains(&col_name));
        }
        AlterTableType::AtSetNotNull => {
            if let Some(col) = table.columns.iter_mut().find(|c| c.name == cmd.name) {
                col.nullable = false;
            }
        }
        AlterTableType::AtDropNotNull => {
            if let Some(col) = table.columns.iter_mut().find(|c| c.name == cmd.name) {
                col.nullable = col.nullable || !col.is_primary_key;
                if !col.is_primary_key {
                    col.nullable = true;
                }
            }
        }
        AlterTableType::AtAlterColumnType => {
            if let Some(NodeEnum::ColumnDef(def)) = cmd.def.as_ref().and_then(|n| n.node.as_ref())
                && let Some(col) = table.columns.iter_mut().find(|c| c.name == cmd.name)
            {
                let (raw_base, modifiers, is_array) = extract_type_name(def.type_name.as_ref());
                col.type_name = render_raw_type(&raw_base, &modifiers, is_array);
                col.type_metadata = Some(crate::schema::TypeMetadata {
                    raw: col.type_name.clone(),
                    logical: render_logical_type(&raw_base, &modifiers, is_array),
                });
            }
        }
        AlterTableType::AtColumnDefault => {
            if let Some(col) = table.columns.iter_mut().find(|c| c.name == cmd.name) {
                match cmd.def.as_ref() {
                    Some(expr) => {
                        let lowered = lower_default_expr(expr);
                        col.default = Some(lowered.rendered.clone());
                        col.default_metadata = Some(crate::schema::DefaultMetadata {
                            raw: lowered.rendered,
                            kind: lowered.kind,
                        });
                    }
                    None => {
                        col.default = None;
                        col.default_metadata = None;
                    }
                }
            }
        }
        AlterTableType::AtAddConstraint => {
            if let Some(NodeEnum::Constraint(con)) = cmd.def.as_ref().and_then(|n| n.node.as_ref()) {
                let mut pk_cols = None;
                let mut unique = Vec::new();
                let mut fks = Vec::new();
                lower_table_constraint(con, &mut pk_cols, &mut unique, &mut fks, table_name);
                if let Some(cols) = pk_cols {
                    for col in &mut table.columns {
                        if cols.contains(&col.name) {
                            col.is_primary_key = true;
                            col.nullable = false;
                        }
                    }
                }
                for (name, columns) in unique {
                    table.indexes.push(Index::new(name, columns, true));
                }
                table.foreign_keys.extend(fks);
            }
        }
        AlterTableType::AtDropConstraint => {
            let cname = cmd.name.clone();
            table.foreign_keys.retain(|f| f.name != cname);
            table.indexes.retain(|i| i.name != cname);
        }
        AlterTableType::AtEnableRowSecurity => table.rls_enabled = true,
        AlterTableType::AtDisableRowSecurity => table.rls_enabled = false,
        _ => diagnostics.push(Diagnostic::hint(
            stmt_range,
            "unsupported_alter_subcommand",
            format!("ALTER TABLE subcommand on {qualified} is not part of the desired-schema DDL subset and was ignored"),
        )),
    }
}

/// Removes a table entirely; used by the `DROP TABLE` lowering path invoked
/// from [`super::mod`]'s statement dispatcher.
pub fn drop_table(tables: &mut TableSet, qualified: &str) -> bool {
    tables.remove(qualified).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lower_sql(sql: &str) -> (TableSet, Vec<Diagnostic>) {
        let result = pg_query::parse(sql).expect("parse");
        let mut tables = TableSet::default();
        let mut diagnostics = Vec::new();
        for stmt in &result.protobuf.stmts {
            if let Some(node) = stmt.stmt.as_ref().and_then(|s| s.node.as_ref()) {
                apply_statement(&mut tables, node, sql, 0, sql.len(), &mut diagnostics);
            }
        }
        (tables, diagnostics)
    }

    #[test]
    fn creates_table_with_primary_key() {
        let (tables, diags) = lower_sql("CREATE TABLE users (id integer PRIMARY KEY, name text NOT NULL);");
        assert!(diags.is_empty());
        let t = tables.find("public.users").unwrap();
        assert_eq!(t.primary_key_columns(), vec!["id"]);
        assert!(!t.column("name").unwrap().nullable);
    }

    #[test]
    fn table_level_foreign_key_is_lowered() {
        let (tables, _) = lower_sql(
            "CREATE TABLE orders (id integer PRIMARY KEY, user_id integer, \
             CONSTRAINT orders_user_fkey FOREIGN KEY (user_id) REFERENCES users (id));",
        );
        let t = tables.find("public.orders").unwrap();
        let fk = t.foreign_key("orders_user_fkey").unwrap();
        assert_eq!(fk.referenced_table, "public.users");
    }

    #[test]
    fn create_index_attaches_to_existing_table() {
        let (tables, diags) = lower_sql(
            "CREATE TABLE t (id integer); CREATE INDEX t_id_idx ON t (id);",
        );
        assert!(diags.is_empty());
        let t = tables.find("public.t").unwrap();
        assert!(t.index("t_id_idx").is_some());
    }

    #[test]
    fn create_index_on_unknown_table_is_an_error() {
        let (_, diags) = lower_sql("CREATE INDEX idx ON ghost (id);");
        assert_eq!(diags[0].code, "invalid_index_table");
    }

    #[test]
    fn alter_table_add_column() {
        let (tables, _) = lower_sql("CREATE TABLE t (id integer); ALTER TABLE t ADD COLUMN name text;");
        let t = tables.find("public.t").unwrap();
        assert!(t.column("name").is_some());
    }

    #[test]
    fn alter_table_drop_column_cascades_to_indexes() {
        let (tables, _) = lower_sql(
            "CREATE TABLE t (id integer, name text); CREATE INDEX t_name_idx ON t (name); \
             ALTER TABLE t DROP COLUMN name;",
        );
        let t = tables.find("public.t").unwrap();
        assert!(t.column("name").is_none());
        assert!(t.index("t_name_idx").is_none());
    }

    #[test]
    fn alter_table_enable_row_level_security() {
        let (tables, _) = lower_sql("CREATE TABLE t (id integer); ALTER TABLE t ENABLE ROW LEVEL SECURITY;");
        assert!(tables.find("public.t").unwrap().rls_enabled);
    }

    #[test]
    fn duplicate_create_table_is_an_error() {
        let (_, diags) = lower_sql("CREATE TABLE t (id integer); CREATE TABLE t (id integer);");
        assert!(diags.iter().any(|d| d.code == "duplicate_table"));
    }

    #[test]
    fn create_table_if_not_exists_when_already_declared_is_a_hint() {
        let (_, diags) = lower_sql("CREATE TABLE t (id integer); CREATE TABLE IF NOT EXISTS t (id integer);");
        assert_eq!(diags[0].code, "redundant_if_not_exists");
    }

    #[test]
    fn deparse_node_helper_is_reachable_from_lower_module() {
        let result = pg_query::parse("SELECT 1 + 1").unwrap();
        let stmt = result.protobuf.stmts[0].stmt.clone().unwrap();
        if let Some(NodeEnum::SelectStmt(select)) = stmt.node {
            let target = &select.target_list[0];
            if let Some(NodeEnum::ResTarget(res)) = target.node.as_ref() {
                let rendered = deparse_node(res.val.as_ref().unwrap());
                assert!(rendered.contains('1'));
            }
        }
    }
}
