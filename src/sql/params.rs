//! Parameters collected while building a statement, bound in order.

use serde_json::Value;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value that can be bound to a PostgreSQL query.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlParam {
    Text(String),
    TextArray(Vec<String>),
    /// Bound as JSONB.
    Json(Value),
}

impl SqlParam {
    pub fn bind<'q>(&'q self, query: Query<'q, Postgres, PgArguments>) -> Query<'q, Postgres, PgArguments> {
        match self {
            SqlParam::Text(s) => query.bind(s.as_str()),
            SqlParam::TextArray(v) => query.bind(v.as_slice()),
            SqlParam::Json(v) => query.bind(sqlx::types::Json(v)),
        }
    }
}

/// Bind every parameter of `params` onto `query`.
pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlParam],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = p.bind(query);
    }
    query
}
