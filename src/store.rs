//! Schema-less document storage on top of SQLite.
//!
//! Every document is a JSON object kept in the `body` column of a single
//! `documents` table, tagged with the collection it belongs to. Filters are
//! top-level equality constraints evaluated with `json_extract`, and unique
//! indexes are partial expression indexes scoped to one collection.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use sqlx::{sqlite::SqlitePoolOptions, Row, Sqlite, SqlitePool};

/// Top-level field equality constraints. An empty filter matches everything.
pub type Filter = Map<String, Value>;

type SqliteQuery<'q> = sqlx::query::Query<'q, Sqlite, <Sqlite as sqlx::Database>::Arguments<'q>>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unique index on {collection}.{field} rejected the document")]
    UniqueViolation { collection: String, field: String },

    #[error("invalid collection or field name {0:?}")]
    InvalidName(String),

    #[error("filter on {0} must be a string, number, bool or null")]
    UnsupportedFilter(String),

    #[error("documents must be JSON objects")]
    NotAnObject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

impl Direction {
    fn sql(self) -> &'static str {
        match self {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Sort {
    pub field: String,
    pub direction: Direction,
}

impl Sort {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Ascending }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Descending }
    }
}

#[derive(Debug, Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub async fn open(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                body TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS documents_collection ON documents (collection)")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    /// A private in-memory store. The pool is pinned to one connection that
    /// never idles out, since every SQLite memory connection is its own database.
    pub async fn memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::open(pool).await
    }

    pub fn collection(&self, name: &str) -> Result<Collection, StoreError> {
        check_name(name)?;
        Ok(Collection {
            pool: self.pool.clone(),
            name: name.into(),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Debug, Clone)]
pub struct Collection {
    pool: SqlitePool,
    name: Arc<str>,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn ensure_unique_index(&self, field: &str) -> Result<(), StoreError> {
        check_name(field)?;
        let sql = format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS \"{collection}_{field}_unique\" \
             ON documents (json_extract(body, '$.{field}')) \
             WHERE collection = '{collection}'",
            collection = self.name,
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        tracing::debug!(collection = %self.name, field, "unique index ready");
        Ok(())
    }

    pub async fn find(&self, filter: &Filter, sort: Option<&Sort>) -> Result<Vec<Value>, StoreError> {
        let (clause, binds) = where_clause(filter)?;
        let order = match sort {
            Some(Sort { field, direction }) => {
                check_name(field)?;
                let dir = direction.sql();
                format!("json_extract(body, '$.{field}') {dir}, id {dir}")
            }
            None => "id ASC".to_owned(),
        };
        let sql = format!("SELECT body FROM documents WHERE {clause} ORDER BY {order}");

        let query = sqlx::query(&sql).bind(self.name.to_string());
        let rows = bind_all(query, &binds).fetch_all(&self.pool).await?;

        rows.iter()
            .map(|row| -> Result<Value, StoreError> {
                let body: String = row.try_get("body")?;
                Ok(serde_json::from_str(&body)?)
            })
            .collect()
    }

    pub async fn find_as<T: DeserializeOwned>(
        &self,
        filter: &Filter,
        sort: Option<&Sort>,
    ) -> Result<Vec<T>, StoreError> {
        self.find(filter, sort)
            .await?
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        let (clause, binds) = where_clause(filter)?;
        let sql = format!("SELECT COUNT(*) FROM documents WHERE {clause}");

        let query = sqlx::query(&sql).bind(self.name.to_string());
        let row = bind_all(query, &binds).fetch_one(&self.pool).await?;
        let count: i64 = row.try_get(0)?;

        Ok(count as u64)
    }

    pub async fn insert(&self, doc: Value) -> Result<Value, StoreError> {
        if !doc.is_object() {
            return Err(StoreError::NotAnObject);
        }

        sqlx::query("INSERT INTO documents (collection, body) VALUES (?, ?)")
            .bind(self.name.to_string())
            .bind(serde_json::to_string(&doc)?)
            .execute(&self.pool)
            .await
            .map_err(|err| self.classify(err))?;

        Ok(doc)
    }

    pub async fn insert_as<T: Serialize>(&self, doc: &T) -> Result<Value, StoreError> {
        self.insert(serde_json::to_value(doc)?).await
    }

    /// Replaces the given top-level fields of every matching document and
    /// returns how many documents matched.
    pub async fn update(&self, filter: &Filter, set: Map<String, Value>) -> Result<u64, StoreError> {
        let mut expr = "body".to_owned();
        let mut binds = Vec::with_capacity(set.len() * 2);
        for (field, value) in set {
            check_name(&field)?;
            expr = format!("json_set({expr}, ?, json(?))");
            binds.push(Bound::Text(format!("$.{field}")));
            binds.push(Bound::Text(serde_json::to_string(&value)?));
        }

        let (clause, filter_binds) = where_clause(filter)?;
        let sql = format!("UPDATE documents SET body = {expr} WHERE {clause}");

        let query = bind_all(sqlx::query(&sql), &binds).bind(self.name.to_string());
        let result = bind_all(query, &filter_binds)
            .execute(&self.pool)
            .await
            .map_err(|err| self.classify(err))?;

        Ok(result.rows_affected())
    }

    pub async fn remove(&self, filter: &Filter) -> Result<u64, StoreError> {
        let (clause, binds) = where_clause(filter)?;
        let sql = format!("DELETE FROM documents WHERE {clause}");

        let query = sqlx::query(&sql).bind(self.name.to_string());
        let result = bind_all(query, &binds).execute(&self.pool).await?;

        Ok(result.rows_affected())
    }

    fn classify(&self, err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                // sqlite reports "UNIQUE constraint failed: index '<collection>_<field>_unique'"
                let prefix = format!("'{}_", self.name);
                let field = db_err
                    .message()
                    .split_once(&prefix)
                    .and_then(|(_, rest)| rest.split_once("_unique'"))
                    .map(|(field, _)| field.to_owned())
                    .unwrap_or_else(|| "unknown".to_owned());
                return StoreError::UniqueViolation {
                    collection: self.name.to_string(),
                    field,
                };
            }
        }
        StoreError::Sqlx(err)
    }
}

/// Builds an equality filter from field/value pairs.
pub fn filter<I, K, V>(pairs: I) -> Filter
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}

enum Bound {
    Text(String),
    Int(i64),
    Real(f64),
}

fn bind_all<'q>(mut query: SqliteQuery<'q>, binds: &[Bound]) -> SqliteQuery<'q> {
    for bound in binds {
        query = match bound {
            Bound::Text(text) => query.bind(text.clone()),
            Bound::Int(int) => query.bind(*int),
            Bound::Real(real) => query.bind(*real),
        };
    }
    query
}

fn where_clause(filter: &Filter) -> Result<(String, Vec<Bound>), StoreError> {
    let mut clause = "collection = ?".to_owned();
    let mut binds = Vec::new();

    for (field, value) in filter {
        check_name(field)?;
        let path = Bound::Text(format!("$.{field}"));
        let bound = match value {
            Value::Null => {
                clause += " AND json_extract(body, ?) IS NULL";
                binds.push(path);
                continue;
            }
            Value::Bool(b) => Bound::Int(*b as i64),
            Value::Number(n) => match n.as_i64() {
                Some(int) => Bound::Int(int),
                None => Bound::Real(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Bound::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => {
                return Err(StoreError::UnsupportedFilter(field.clone()));
            }
        };
        clause += " AND json_extract(body, ?) = ?";
        binds.push(path);
        binds.push(bound);
    }

    Ok((clause, binds))
}

fn check_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_owned()))
    }
}
