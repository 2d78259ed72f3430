//! PostgreSQL relational backend.
//!
//! Rows are `(id BIGINT PRIMARY KEY, data TEXT)`. Statements are prepared
//! once per connection and values are always bound, never interpolated.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::config::RelationalConfig;
use crate::error::{Error, Result};
use crate::fixtures::JobRecord;
use crate::selection::BackendKind;

use super::Backend;

/// PostgreSQL backend for benchmarks.
pub struct RelationalBackend {
    pool: PgPool,
    table: String,
    insert_sql: String,
    select_sql: String,
}

impl RelationalBackend {
    /// Connect to the database at `config.url`.
    ///
    /// A single pooled connection keeps the workload sequential and lets the
    /// statement cache serve every call after the first.
    pub async fn connect(config: &RelationalConfig) -> Result<Self> {
        let table = jobbench_sql::validate_identifier(&config.table)
            .map_err(|e| Error::Configuration(e.to_string()))?
            .to_string();

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect(&config.url)
            .await
            .map_err(|e| Error::connection(BackendKind::Relational, e))?;

        Ok(Self {
            pool,
            insert_sql: format!("INSERT INTO {} (id, data) VALUES ($1, $2)", table),
            select_sql: format!("SELECT data FROM {} WHERE id = $1", table),
            table,
        })
    }
}

#[async_trait]
impl Backend for RelationalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Relational
    }

    async fn prepare(&self) -> Result<()> {
        let drop_sql = format!("DROP TABLE IF EXISTS {}", self.table);
        let create_sql = format!(
            "CREATE TABLE {} (id BIGINT PRIMARY KEY, data TEXT NOT NULL)",
            self.table
        );

        for sql in [&drop_sql, &create_sql] {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| Error::connection(BackendKind::Relational, e))?;
        }
        Ok(())
    }

    async fn insert(&self, record: &JobRecord) -> Result<()> {
        sqlx::query(&self.insert_sql)
            .bind(record.id() as i64)
            .bind(record.to_json())
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(Error::write)
    }

    async fn get(&self, job_id: u64) -> Result<String> {
        let row = sqlx::query(&self.select_sql)
            .bind(job_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::read)?
            .ok_or_else(|| Error::NotFound(format!("{}.id = {}", self.table, job_id)))?;

        row.try_get::<String, _>("data").map_err(Error::read)
    }
}
