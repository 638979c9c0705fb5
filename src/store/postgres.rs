//! PostgreSQL document store: one `(id TEXT PRIMARY KEY, doc JSONB)` table per collection.

use crate::error::AppError;
use crate::query::{Filter, FindOptions};
use crate::sql::{self, bind_all, QueryBuf};
use crate::store::{CollectionSpec, DocumentStore};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{ConnectOptions, PgPool, Row};
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn execute(&self, collection: &str, q: &QueryBuf) -> Result<u64, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let result = bind_all(sqlx::query(&q.sql), &q.params)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(collection, e))?;
        Ok(result.rows_affected())
    }
}

/// Unique violations become `Conflict` naming the field behind the violated index.
fn map_write_error(collection: &str, err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let field = db
                .constraint()
                .and_then(|c| {
                    if c == format!("{}_pkey", collection) {
                        Some("id")
                    } else {
                        sql::field_from_index_name(collection, c)
                    }
                })
                .unwrap_or("value")
                .to_string();
            return AppError::Conflict { field };
        }
    }
    AppError::from(err)
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), AppError> {
        sqlx::query(&sql::create_table(&spec.name))
            .execute(&self.pool)
            .await?;
        for field in &spec.unique_fields {
            sqlx::query(&sql::create_unique_index(&spec.name, field))
                .execute(&self.pool)
                .await?;
        }
        tracing::debug!(collection = %spec.name, unique = ?spec.unique_fields, "collection ready");
        Ok(())
    }

    async fn insert(&self, collection: &str, doc: Map<String, Value>) -> Result<(), AppError> {
        let id = doc
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AppError::Internal("document without id".into()))?
            .to_string();
        let q = sql::insert(collection, &id, &doc);
        self.execute(collection, &q).await?;
        Ok(())
    }

    async fn find(&self, collection: &str, filter: &Filter, opts: &FindOptions) -> Result<Vec<Value>, AppError> {
        let q = sql::select(collection, filter, opts);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|r| {
                r.try_get::<sqlx::types::Json<Value>, _>("doc")
                    .map(|j| j.0)
                    .map_err(AppError::from)
            })
            .collect()
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        let q = sql::count(collection, filter);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_one(&self.pool)
            .await?;
        let n: i64 = row.try_get(0)?;
        Ok(n.max(0) as u64)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Map<String, Value>,
        unset: &[String],
    ) -> Result<u64, AppError> {
        let q = sql::update_one(collection, filter, &set, unset);
        self.execute(collection, &q).await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64, AppError> {
        let q = sql::delete_one(collection, filter);
        self.execute(collection, &q).await
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").fetch_optional(&self.pool).await?;
        Ok(())
    }
}

/// Create the database named in `database_url` if it does not exist (connects to the `postgres` admin DB).
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::Configuration(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", sql::quoted(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let scheme_end = url.find("://").map(|i| i + 3).unwrap_or(0);
    let path_start = url[scheme_end..]
        .find('/')
        .map(|i| scheme_end + i + 1)
        .ok_or_else(|| AppError::Configuration("DATABASE_URL: no database path".into()))?;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let mut split = path_and_query.splitn(2, '?');
    let db_name = split.next().unwrap_or("").trim().to_string();
    let query = split.next().map(|q| format!("?{}", q)).unwrap_or_default();
    let base = url.get(..path_start).unwrap_or(url);
    Ok((format!("{}postgres{}", base, query), db_name))
}
