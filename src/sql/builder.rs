//! Builds parameterized SELECT, INSERT, UPDATE, DELETE over JSONB document tables.
//!
//! Every collection is a table `(id TEXT PRIMARY KEY, doc JSONB NOT NULL)`; the document
//! also carries its `id`. Field names come from validated configuration or are checked
//! with `query::is_valid_field` before they get here.

use crate::query::{Condition, Direction, Filter, FindOptions, Populate, Sort};
use crate::sql::SqlParam;
use serde_json::{Map, Value};

const MAIN_ALIAS: &str = "main";

/// Quote identifier for PostgreSQL.
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Quote a field name as a SQL string literal (used with `->` / `->>`).
fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Name of the unique index backing `field` on `collection`.
pub fn unique_index_name(collection: &str, field: &str) -> String {
    format!("{}_{}_key", collection, field)
}

/// Recover the field from a unique index name built by `unique_index_name`.
pub fn field_from_index_name<'a>(collection: &str, index: &'a str) -> Option<&'a str> {
    index
        .strip_prefix(collection)?
        .strip_prefix('_')?
        .strip_suffix("_key")
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: SqlParam) -> u32 {
        self.params.push(v);
        self.params.len() as u32
    }
}

pub fn create_table(collection: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (id TEXT PRIMARY KEY, doc JSONB NOT NULL)",
        quoted(collection)
    )
}

pub fn create_unique_index(collection: &str, field: &str) -> String {
    format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ((doc->>{}))",
        quoted(&unique_index_name(collection, field)),
        quoted(collection),
        literal(field)
    )
}

fn json_path(field: &str) -> String {
    format!("{}.doc->{}", MAIN_ALIAS, literal(field))
}

fn text_path(field: &str) -> String {
    format!("({}.doc->>{})", MAIN_ALIAS, literal(field))
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn render_condition(cond: &Condition, q: &mut QueryBuf) -> String {
    match cond {
        Condition::Eq(f, Value::String(s)) if f == "id" => {
            let n = q.push_param(SqlParam::Text(s.clone()));
            format!("{}.id = ${}", MAIN_ALIAS, n)
        }
        Condition::Eq(f, v) => {
            let n = q.push_param(SqlParam::Json(v.clone()));
            format!("{} = ${}::jsonb", json_path(f), n)
        }
        Condition::IsNull(f) => format!("{} IS NULL", text_path(f)),
        Condition::NotNull(f) => format!("{} IS NOT NULL", text_path(f)),
        Condition::Contains(f, needle) => {
            let n = q.push_param(SqlParam::Text(format!("%{}%", escape_like(needle))));
            format!(
                "(jsonb_typeof({}) = 'string' AND {} ILIKE ${})",
                json_path(f),
                text_path(f),
                n
            )
        }
        Condition::Gt(f, v) => render_range(f, ">", v, q),
        Condition::Gte(f, v) => render_range(f, ">=", v, q),
        Condition::Lt(f, v) => render_range(f, "<", v, q),
        Condition::Lte(f, v) => render_range(f, "<=", v, q),
        Condition::In(f, values) => {
            if values.is_empty() {
                return "FALSE".into();
            }
            let placeholders: Vec<String> = values
                .iter()
                .map(|v| format!("${}::jsonb", q.push_param(SqlParam::Json(v.clone()))))
                .collect();
            format!("{} IN ({})", json_path(f), placeholders.join(", "))
        }
        Condition::Any(conds) => {
            if conds.is_empty() {
                return "FALSE".into();
            }
            let parts: Vec<String> = conds.iter().map(|c| render_condition(c, q)).collect();
            format!("({})", parts.join(" OR "))
        }
    }
}

/// Comparisons only hold between values of the same JSON type.
fn render_range(field: &str, op: &str, v: &Value, q: &mut QueryBuf) -> String {
    let n = q.push_param(SqlParam::Json(v.clone()));
    format!(
        "(jsonb_typeof({path}) = jsonb_typeof(${n}::jsonb) AND {path} {op} ${n}::jsonb)",
        path = json_path(field),
        n = n,
        op = op
    )
}

fn where_clause(filter: &Filter, q: &mut QueryBuf) -> String {
    if filter.conditions.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = filter.conditions.iter().map(|c| render_condition(c, q)).collect();
    format!(" WHERE {}", parts.join(" AND "))
}

fn order_clause(sort: &[Sort]) -> String {
    let mut parts: Vec<String> = sort
        .iter()
        .map(|s| {
            let dir = match s.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            };
            if s.field == "id" {
                format!("{}.id {}", MAIN_ALIAS, dir)
            } else {
                // JSON null sorts with missing keys, after every value.
                format!("NULLIF({}, 'null'::jsonb) {} NULLS LAST", json_path(&s.field), dir)
            }
        })
        .collect();
    parts.push(format!("{}.id ASC", MAIN_ALIAS));
    format!(" ORDER BY {}", parts.join(", "))
}

/// `main.doc` merged with each populated reference, via scalar subqueries.
fn doc_expr(populate: &[Populate]) -> String {
    let mut expr = format!("{}.doc", MAIN_ALIAS);
    for (i, p) in populate.iter().enumerate() {
        let alias = format!("p{}", i);
        expr.push_str(&format!(
            " || COALESCE((SELECT jsonb_build_object({field}, {a}.doc) FROM {table} {a} WHERE {a}.id = {path}), '{{}}'::jsonb)",
            field = literal(&p.field),
            a = alias,
            table = quoted(&p.collection),
            path = text_path(&p.field),
        ));
    }
    expr
}

/// SELECT documents matching `filter` with sort, pagination and populated references.
pub fn select(collection: &str, filter: &Filter, opts: &FindOptions) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(filter, &mut q);
    let limit_clause = opts.limit.map(|n| format!(" LIMIT {}", n)).unwrap_or_default();
    let offset_clause = if opts.skip > 0 {
        format!(" OFFSET {}", opts.skip)
    } else {
        String::new()
    };
    q.sql = format!(
        "SELECT {} AS doc FROM {} {}{}{}{}{}",
        doc_expr(&opts.populate),
        quoted(collection),
        MAIN_ALIAS,
        where_sql,
        order_clause(&opts.sort),
        limit_clause,
        offset_clause
    );
    q
}

pub fn count(collection: &str, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(filter, &mut q);
    q.sql = format!(
        "SELECT COUNT(*) FROM {} {}{}",
        quoted(collection),
        MAIN_ALIAS,
        where_sql
    );
    q
}

pub fn insert(collection: &str, id: &str, doc: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let id_param = q.push_param(SqlParam::Text(id.to_string()));
    let doc_param = q.push_param(SqlParam::Json(Value::Object(doc.clone())));
    q.sql = format!(
        "INSERT INTO {} (id, doc) VALUES (${}, ${}::jsonb)",
        quoted(collection),
        id_param,
        doc_param
    );
    q
}

/// UPDATE the first document matching `filter`: merge `set`, then drop `unset` keys.
/// Single-document semantics: the target is resolved by a LIMIT 1 subquery.
pub fn update_one(
    collection: &str,
    filter: &Filter,
    set: &Map<String, Value>,
    unset: &[String],
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let set_param = q.push_param(SqlParam::Json(Value::Object(set.clone())));
    let unset_param = q.push_param(SqlParam::TextArray(unset.to_vec()));
    let where_sql = where_clause(filter, &mut q);
    let table = quoted(collection);
    q.sql = format!(
        "UPDATE {table} SET doc = (doc || ${set}::jsonb) - ${unset}::text[] \
         WHERE id = (SELECT {a}.id FROM {table} {a}{where_sql} LIMIT 1)",
        table = table,
        set = set_param,
        unset = unset_param,
        a = MAIN_ALIAS,
        where_sql = where_sql
    );
    q
}

pub fn delete_one(collection: &str, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(filter, &mut q);
    let table = quoted(collection);
    q.sql = format!(
        "DELETE FROM {table} WHERE id = (SELECT {a}.id FROM {table} {a}{where_sql} LIMIT 1)",
        table = table,
        a = MAIN_ALIAS,
        where_sql = where_sql
    );
    q
}
