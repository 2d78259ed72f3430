//! SQL-over-KV overlay backend.
//!
//! Statements travel as text over the key-value server's custom-command
//! channel and come back as bare row tuples. Column names are recovered from
//! the statement with `jobbench_sql` and paired with each row.
//!
//! Two channels speak the same command set: [`RedisChannel`] for a Redis
//! server with the RediSQL module, and [`EmbeddedChannel`], an in-process
//! SQLite used when no server is available.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use redis::aio::MultiplexedConnection;
use rusqlite::types::ValueRef;
use thiserror::Error;

use jobbench_sql::{
    columns_from_schema, create_id_index, create_table, extract_columns, insert_job, select_job,
    source_table, validate_identifier, Cell, ColumnList, OverlayCommand, Row,
    SCHEMA_DISCOVERY_QUERY,
};

use crate::config::{OverlayEndpoint, SqlOverlayConfig};
use crate::error::{Error, Result};
use crate::fixtures::JobRecord;
use crate::selection::BackendKind;

use super::Backend;

/// Errors raised by an overlay channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("database {0} does not exist")]
    NoSuchDatabase(String),

    #[error("database {0} already exists")]
    DatabaseExists(String),
}

/// Transport for overlay commands.
#[async_trait]
pub trait OverlayChannel: Send + Sync {
    /// Send one command and return the reply rows.
    async fn execute(&self, command: &OverlayCommand) -> std::result::Result<Vec<Vec<Cell>>, ChannelError>;
}

/// Overlay commands over a Redis connection.
pub struct RedisChannel {
    conn: MultiplexedConnection,
    prefix: String,
}

impl RedisChannel {
    pub async fn connect(url: &str, prefix: impl Into<String>) -> std::result::Result<Self, ChannelError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self {
            conn,
            prefix: prefix.into(),
        })
    }
}

#[async_trait]
impl OverlayChannel for RedisChannel {
    async fn execute(&self, command: &OverlayCommand) -> std::result::Result<Vec<Vec<Cell>>, ChannelError> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd(&command.name(&self.prefix));
        for arg in command.args() {
            cmd.arg(arg);
        }
        let reply: redis::Value = cmd.query_async(&mut conn).await?;
        Ok(rows_from_reply(reply))
    }
}

/// Flatten a reply into rows. Arrays of arrays are result sets; any other
/// shape (`OK`, `DONE`, a count) becomes rows of single cells.
fn rows_from_reply(reply: redis::Value) -> Vec<Vec<Cell>> {
    match reply {
        redis::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                redis::Value::Array(cells) => cells.into_iter().map(cell_from_reply).collect(),
                scalar => vec![cell_from_reply(scalar)],
            })
            .collect(),
        redis::Value::Nil => Vec::new(),
        scalar => vec![vec![cell_from_reply(scalar)]],
    }
}

fn cell_from_reply(value: redis::Value) -> Cell {
    match value {
        redis::Value::Nil => Cell::Null,
        redis::Value::Int(i) => Cell::Integer(i),
        redis::Value::Double(f) => Cell::Real(f),
        redis::Value::Boolean(b) => Cell::Integer(i64::from(b)),
        redis::Value::SimpleString(s) => Cell::Text(s),
        redis::Value::Okay => Cell::Text("OK".to_string()),
        redis::Value::BulkString(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Cell::Text(text),
            Err(err) => Cell::Blob(err.into_bytes()),
        },
        _ => Cell::Null,
    }
}

/// In-process SQLite serving the overlay command set.
///
/// Each logical database is a separate in-memory connection.
#[derive(Default)]
pub struct EmbeddedChannel {
    databases: Mutex<HashMap<String, rusqlite::Connection>>,
}

impl EmbeddedChannel {
    pub fn new() -> Self {
        Self::default()
    }

    fn exec(conn: &rusqlite::Connection, sql: &str) -> std::result::Result<Vec<Vec<Cell>>, ChannelError> {
        let mut stmt = conn.prepare(sql)?;
        let width = stmt.column_count();

        if width == 0 {
            let changed = stmt.execute([])?;
            return Ok(vec![
                vec![Cell::Text("DONE".to_string())],
                vec![Cell::Integer(changed as i64)],
            ]);
        }

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut cells = Vec::with_capacity(width);
            for i in 0..width {
                cells.push(cell_from_sqlite(row.get_ref(i)?));
            }
            out.push(cells);
        }
        Ok(out)
    }
}

fn cell_from_sqlite(value: ValueRef<'_>) -> Cell {
    match value {
        ValueRef::Null => Cell::Null,
        ValueRef::Integer(i) => Cell::Integer(i),
        ValueRef::Real(f) => Cell::Real(f),
        ValueRef::Text(bytes) => Cell::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Cell::Blob(bytes.to_vec()),
    }
}

#[async_trait]
impl OverlayChannel for EmbeddedChannel {
    async fn execute(&self, command: &OverlayCommand) -> std::result::Result<Vec<Vec<Cell>>, ChannelError> {
        let mut databases = self.databases.lock();
        match command {
            OverlayCommand::DropDatabase { database } => {
                let removed = databases.remove(database).is_some();
                Ok(vec![vec![Cell::Integer(i64::from(removed))]])
            }
            OverlayCommand::CreateDatabase { database } => {
                if databases.contains_key(database) {
                    return Err(ChannelError::DatabaseExists(database.clone()));
                }
                databases.insert(database.clone(), rusqlite::Connection::open_in_memory()?);
                Ok(vec![vec![Cell::Text("OK".to_string())]])
            }
            OverlayCommand::Exec { database, sql } => {
                let conn = databases
                    .get(database)
                    .ok_or_else(|| ChannelError::NoSuchDatabase(database.clone()))?;
                Self::exec(conn, sql)
            }
        }
    }
}

/// SQL overlay backend for benchmarks.
pub struct SqlOverlayBackend {
    channel: Box<dyn OverlayChannel>,
    database: String,
    table: String,
}

impl SqlOverlayBackend {
    /// Connect to the endpoint named in `config`.
    pub async fn connect(config: &SqlOverlayConfig) -> Result<Self> {
        let channel: Box<dyn OverlayChannel> = match &config.endpoint {
            OverlayEndpoint::Redis(url) => Box::new(
                RedisChannel::connect(url, config.command_prefix.clone())
                    .await
                    .map_err(|e| Error::connection(BackendKind::SqlOverlay, e))?,
            ),
            OverlayEndpoint::Embedded => Box::new(EmbeddedChannel::new()),
        };
        Self::with_channel(channel, &config.database, &config.table)
    }

    /// Build a backend over an existing channel.
    pub fn with_channel(
        channel: Box<dyn OverlayChannel>,
        database: &str,
        table: &str,
    ) -> Result<Self> {
        for name in [database, table] {
            validate_identifier(name).map_err(|e| Error::Configuration(e.to_string()))?;
        }
        Ok(Self {
            channel,
            database: database.to_string(),
            table: table.to_string(),
        })
    }

    async fn send(&self, command: OverlayCommand) -> std::result::Result<Vec<Vec<Cell>>, ChannelError> {
        tracing::trace!(command = %command, "overlay command");
        self.channel.execute(&command).await
    }

    /// Run a SELECT and pair every reply row with its column names.
    ///
    /// `SELECT *` resolves names through a schema discovery query. Statements
    /// that are not SELECTs are executed and yield no rows.
    pub async fn query(&self, sql: &str) -> Result<Vec<Row>> {
        let columns = match extract_columns(sql)? {
            Some(ColumnList::Named(columns)) => columns,
            Some(ColumnList::Wildcard) => self.discover_columns(source_table(sql)?).await?,
            None => {
                self.send(OverlayCommand::exec(&self.database, sql))
                    .await
                    .map_err(Error::read)?;
                return Ok(Vec::new());
            }
        };

        let reply = self
            .send(OverlayCommand::exec(&self.database, sql))
            .await
            .map_err(Error::read)?;

        reply
            .into_iter()
            .map(|values| Row::pair(&columns, values).map_err(Error::from))
            .collect()
    }

    async fn discover_columns(&self, table: &str) -> Result<Vec<String>> {
        let schema = self
            .send(OverlayCommand::exec(&self.database, SCHEMA_DISCOVERY_QUERY))
            .await
            .map_err(Error::read)?;
        Ok(columns_from_schema(&schema, table)?)
    }
}

#[async_trait]
impl Backend for SqlOverlayBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SqlOverlay
    }

    /// Drop and recreate the logical database, then create the job table and
    /// its id index.
    async fn prepare(&self) -> Result<()> {
        let setup = [
            OverlayCommand::drop_database(&self.database),
            OverlayCommand::create_database(&self.database),
            OverlayCommand::exec(&self.database, create_table(&self.table)?),
            OverlayCommand::exec(&self.database, create_id_index(&self.table)?),
        ];

        for command in setup {
            self.send(command)
                .await
                .map_err(|e| Error::connection(BackendKind::SqlOverlay, e))?;
        }
        Ok(())
    }

    async fn insert(&self, record: &JobRecord) -> Result<()> {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let sql = insert_job(&self.table, record.id(), &record.to_json(), &timestamp)?;
        self.send(OverlayCommand::exec(&self.database, sql))
            .await
            .map(|_| ())
            .map_err(Error::write)
    }

    async fn get(&self, job_id: u64) -> Result<String> {
        let sql = select_job(&self.table, job_id)?;
        let rows = self.query(&sql).await?;

        rows.first()
            .and_then(|row| row.get("data"))
            .and_then(Cell::as_text)
            .map(str::to_string)
            .ok_or_else(|| Error::NotFound(format!("{}.id = {}", self.table, job_id)))
    }
}
