//! Default-expression lowering (§4.2 "Default-expression lowering").
//!
//! Literal constants render as their value (strings single-quoted), function
//! calls render as `name(arg1, arg2, …)`, type casts are transparent, and
//! SQL-value functions (`CURRENT_TIMESTAMP`, …) map by op-code to their
//! canonical upper-case spelling. Anything else renders as the
//! `UNDEFINED_EXPRESSION` sentinel and the caller is told to emit a hint
//! diagnostic rather than fail.

use pg_query::NodeEnum;
use pg_query::protobuf::SqlValueFunctionOp;

use crate::schema::DefaultKind;

pub const UNDEFINED_EXPRESSION: &str = "UNDEFINED_EXPRESSION";

pub struct LoweredDefault {
    pub rendered: String,
    pub kind: DefaultKind,
    /// True when `rendered == UNDEFINED_EXPRESSION`; the parser emits a hint
    /// diagnostic for these rather than failing (§4.2).
    pub is_undefined: bool,
}

impl LoweredDefault {
    fn defined(rendered: String, kind: DefaultKind) -> Self {
        Self {
            rendered,
            kind,
            is_undefined: false,
        }
    }

    fn undefined() -> Self {
        Self {
            rendered: UNDEFINED_EXPRESSION.to_string(),
            kind: DefaultKind::Other,
            is_undefined: true,
        }
    }
}

pub fn lower_default_expr(node: &pg_query::protobuf::Node) -> LoweredDefault {
    match node.node.as_ref() {
        Some(NodeEnum::AConst(ac)) => lower_literal(ac),
        Some(NodeEnum::FuncCall(fc)) => lower_func_call(fc),
        Some(NodeEnum::TypeCast(cast)) => match cast.arg.as_deref() {
            Some(inner) => lower_default_expr(inner),
            None => LoweredDefault::undefined(),
        },
        Some(NodeEnum::SqlValueFunction(svf)) => lower_sql_value_function(svf),
        Some(NodeEnum::ColumnRef(_)) | Some(NodeEnum::AExpr(_)) => {
            LoweredDefault::defined(deparse_node(node), DefaultKind::Other)
        }
        _ => LoweredDefault::undefined(),
    }
}

fn lower_literal(ac: &pg_query::protobuf::AConst) -> LoweredDefault {
    use pg_query::protobuf::a_const::Val;
    let rendered = match ac.val.as_ref() {
        Some(Val::Ival(i)) => i.ival.to_string(),
        Some(Val::Fval(f)) => f.fval.clone(),
        Some(Val::Boolval(b)) => if b.boolval { "true" } else { "false" }.to_string(),
        Some(Val::Sval(s)) => format!("'{}'", s.sval.replace('\'', "''")),
        Some(Val::Bsval(s)) => format!("'{}'", s.bsval.replace('\'', "''")),
        None => "NULL".to_string(),
    };
    LoweredDefault::defined(rendered, DefaultKind::Literal)
}

fn lower_func_call(fc: &pg_query::protobuf::FuncCall) -> LoweredDefault {
    let name = fc
        .funcname
        .iter()
        .rev()
        .find_map(|n| match n.node.as_ref() {
            Some(NodeEnum::String(s)) => Some(s.sval.clone()),
            _ => None,
        })
        .unwrap_or_else(|| "unknown".to_string());

    let args: Vec<String> = fc.args.iter().map(deparse_node).collect();
    let rendered = format!("{name}({})", args.join(", "));

    let kind = if name == "nextval" {
        DefaultKind::Sequence
    } else {
        DefaultKind::Function
    };
    LoweredDefault::defined(rendered, kind)
}

/// Maps a `SQLValueFunction` op-code to its canonical upper-case spelling
/// (§4.2: `CURRENT_TIMESTAMP`, `CURRENT_DATE`, `SESSION_USER`, …).
fn lower_sql_value_function(svf: &pg_query::protobuf::SqlValueFunction) -> LoweredDefault {
    let op = SqlValueFunctionOp::try_from(svf.op).unwrap_or(SqlValueFunctionOp::Undefined);
    let rendered = match op {
        SqlValueFunctionOp::SvfnCurrentDate => "CURRENT_DATE",
        SqlValueFunctionOp::SvfnCurrentTime | SqlValueFunctionOp::SvfnCurrentTimeN => "CURRENT_TIME",
        SqlValueFunctionOp::SvfnCurrentTimestamp | SqlValueFunctionOp::SvfnCurrentTimestampN => {
            "CURRENT_TIMESTAMP"
        }
        SqlValueFunctionOp::SvfnLocaltime | SqlValueFunctionOp::SvfnLocaltimeN => "LOCALTIME",
        SqlValueFunctionOp::SvfnLocaltimestamp | SqlValueFunctionOp::SvfnLocaltimestampN => "LOCALTIMESTAMP",
        SqlValueFunctionOp::SvfnCurrentRole => "CURRENT_ROLE",
        SqlValueFunctionOp::SvfnCurrentUser => "CURRENT_USER",
        SqlValueFunctionOp::SvfnUser => "USER",
        SqlValueFunctionOp::SvfnSessionUser => "SESSION_USER",
        SqlValueFunctionOp::SvfnCurrentCatalog => "CURRENT_CATALOG",
        SqlValueFunctionOp::SvfnCurrentSchema => "CURRENT_SCHEMA",
        SqlValueFunctionOp::Undefined => return LoweredDefault::undefined(),
    };
    LoweredDefault::defined(rendered.to_string(), DefaultKind::Function)
}

/// Deparse an arbitrary expression node back to SQL text by splicing it into
/// a throwaway `SELECT` target and deparsing the whole statement, then
/// stripping the `SELECT ` prefix. This is the same trick the teacher uses
/// for CHECK-constraint expression rendering; it is exact because it reuses
/// Postgres's own deparser rather than hand-rolling one.
pub fn deparse_node(node: &pg_query::protobuf::Node) -> String {
    let mut parse_result = match pg_query::parse("SELECT NULL") {
        Ok(pr) => pr,
        Err(_) => return UNDEFINED_EXPRESSION.to_string(),
    };

    if let Some(stmt) = parse_result.protobuf.stmts.first_mut()
        && let Some(ref mut stmt_node) = stmt.stmt
        && let Some(NodeEnum::SelectStmt(ref mut select)) = stmt_node.node
        && let Some(first_target) = select.target_list.first_mut()
        && let Some(NodeEnum::ResTarget(ref mut res)) = first_target.node
    {
        res.val = Some(Box::new(node.clone()));
    }

    match pg_query::deparse(&parse_result.protobuf) {
        Ok(sql) => sql.strip_prefix("SELECT ").unwrap_or(&sql).to_string(),
        Err(_) => UNDEFINED_EXPRESSION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_default_expr(sql: &str) -> pg_query::protobuf::Node {
        let result = pg_query::parse(sql).expect("parse");
        let stmt = result.protobuf.stmts[0].stmt.clone().unwrap();
        if let Some(NodeEnum::CreateStmt(create)) = stmt.node {
            for elt in &create.table_elts {
                if let Some(NodeEnum::ColumnDef(col)) = elt.node.as_ref() {
                    for con_node in &col.constraints {
                        if let Some(NodeEnum::Constraint(con)) = con_node.node.as_ref()
                            && con.contype() == pg_query::protobuf::ConstrType::ConstrDefault
                        {
                            return *con.raw_expr.clone().unwrap();
                        }
                    }
                }
            }
        }
        panic!("no default expr found in {sql}");
    }

    #[test]
    fn literal_integer_renders_bare() {
        let node = first_default_expr("CREATE TABLE t (n integer DEFAULT 0)");
        let lowered = lower_default_expr(&node);
        assert_eq!(lowered.rendered, "0");
        assert_eq!(lowered.kind, DefaultKind::Literal);
    }

    #[test]
    fn literal_string_is_single_quoted() {
        let node = first_default_expr("CREATE TABLE t (s text DEFAULT 'active')");
        let lowered = lower_default_expr(&node);
        assert_eq!(lowered.rendered, "'active'");
    }

    #[test]
    fn function_call_renders_with_args() {
        let node = first_default_expr("CREATE TABLE t (s text DEFAULT concat('a', 'b'))");
        let lowered = lower_default_expr(&node);
        assert_eq!(lowered.rendered, "concat('a', 'b')");
        assert_eq!(lowered.kind, DefaultKind::Function);
    }

    #[test]
    fn nextval_is_classified_as_sequence() {
        let node = first_default_expr("CREATE TABLE t (id integer DEFAULT nextval('t_id_seq'))");
        let lowered = lower_default_expr(&node);
        assert_eq!(lowered.kind, DefaultKind::Sequence);
    }

    #[test]
    fn type_cast_is_transparent() {
        let node = first_default_expr("CREATE TABLE t (j jsonb DEFAULT '{}'::jsonb)");
        let lowered = lower_default_expr(&node);
        assert_eq!(lowered.rendered, "'{}'");
    }

    #[test]
    fn current_timestamp_maps_to_canonical_name() {
        let node = first_default_expr("CREATE TABLE t (ts timestamp DEFAULT CURRENT_TIMESTAMP)");
        let lowered = lower_default_expr(&node);
        assert_eq!(lowered.rendered, "CURRENT_TIMESTAMP");
    }
}
