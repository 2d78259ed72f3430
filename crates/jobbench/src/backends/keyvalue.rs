//! Redis key-value backend.
//!
//! Each record is stored as its JSON text under `<prefix><job id>`.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::config::KeyValueConfig;
use crate::error::{Error, Result};
use crate::fixtures::JobRecord;
use crate::selection::BackendKind;

use super::Backend;

/// Redis backend for benchmarks.
pub struct KeyValueBackend {
    conn: MultiplexedConnection,
    key_prefix: String,
}

impl KeyValueBackend {
    /// Connect to the Redis server at `config.url`.
    pub async fn connect(config: &KeyValueConfig) -> Result<Self> {
        let client = redis::Client::open(config.url.as_str())
            .map_err(|e| Error::connection(BackendKind::KeyValueStore, e))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| Error::connection(BackendKind::KeyValueStore, e))?;

        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, job_id: u64) -> String {
        format!("{}{}", self.key_prefix, job_id)
    }
}

#[async_trait]
impl Backend for KeyValueBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::KeyValueStore
    }

    async fn insert(&self, record: &JobRecord) -> Result<()> {
        // Multiplexed connections are cheap handles onto one socket.
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(self.key(record.id()), record.to_json())
            .await
            .map_err(Error::write)
    }

    async fn get(&self, job_id: u64) -> Result<String> {
        let mut conn = self.conn.clone();
        let key = self.key(job_id);
        let value: Option<String> = conn.get(&key).await.map_err(Error::read)?;
        value.ok_or(Error::NotFound(key))
    }
}
