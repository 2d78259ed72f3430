//! Data store adapters.
//!
//! Every store is driven through the same [`Backend`] capability set so the
//! runner can measure them with one timing discipline:
//!
//! - [`DocumentStoreBackend`]: MongoDB, concurrent inserts
//! - [`KeyValueBackend`]: Redis, `jobId:<id>` string keys
//! - [`RelationalBackend`]: PostgreSQL through sqlx with bound parameters
//! - [`NativeKvBackend`]: embedded sled, `(namespace, set, key)` addressing
//! - [`SqlOverlayBackend`]: SQLite behind a custom-command channel (RediSQL)

pub mod document;
pub mod keyvalue;
pub mod native_kv;
pub mod relational;
pub mod sql_overlay;

pub use document::DocumentStoreBackend;
pub use keyvalue::KeyValueBackend;
pub use native_kv::NativeKvBackend;
pub use relational::RelationalBackend;
pub use sql_overlay::{EmbeddedChannel, OverlayChannel, RedisChannel, SqlOverlayBackend};

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::BackendsConfig;
use crate::error::{Error, Result};
use crate::fixtures::JobRecord;
use crate::selection::{BackendKind, BackendSet};

/// Capabilities every benchmarked store provides.
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Schema and data reset before a write phase. Never timed.
    async fn prepare(&self) -> Result<()> {
        Ok(())
    }

    /// One-off call that absorbs lazy client initialization. Never timed.
    async fn warm_up(&self) -> Result<()> {
        Ok(())
    }

    /// Insert a single record keyed by its job id.
    async fn insert(&self, record: &JobRecord) -> Result<()>;

    /// Insert a batch, one result per record in input order.
    ///
    /// Sequential unless the store overrides it. Each insert carries its own
    /// deadline.
    async fn insert_many(&self, records: &[JobRecord], timeout: Duration) -> Vec<Result<()>> {
        let mut results = Vec::with_capacity(records.len());
        for record in records {
            results.push(write_deadline(timeout, self.insert(record)).await);
        }
        results
    }

    /// Point lookup by job id, returning the stored JSON document.
    async fn get(&self, job_id: u64) -> Result<String>;
}

/// Opens backend connections for a run.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Reject settings that would fail for any selected backend. Called once
    /// before the first connection.
    fn validate(&self, _selection: &BackendSet) -> Result<()> {
        Ok(())
    }

    async fn connect(&self, kind: BackendKind) -> Result<Box<dyn Backend>>;
}

/// Connector backed by real client libraries.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredConnector {
    config: BackendsConfig,
}

impl ConfiguredConnector {
    pub fn new(config: BackendsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connector for ConfiguredConnector {
    fn validate(&self, selection: &BackendSet) -> Result<()> {
        self.config.validate(selection)
    }

    async fn connect(&self, kind: BackendKind) -> Result<Box<dyn Backend>> {
        let backend: Box<dyn Backend> = match kind {
            BackendKind::DocumentStore => {
                Box::new(DocumentStoreBackend::connect(&self.config.document).await?)
            }
            BackendKind::KeyValueStore => {
                Box::new(KeyValueBackend::connect(&self.config.key_value).await?)
            }
            BackendKind::Relational => {
                Box::new(RelationalBackend::connect(&self.config.relational).await?)
            }
            BackendKind::NativeKv => Box::new(NativeKvBackend::open(&self.config.native_kv)?),
            BackendKind::SqlOverlay => {
                Box::new(SqlOverlayBackend::connect(&self.config.sql_overlay).await?)
            }
        };
        Ok(backend)
    }
}

/// Bound a write by `timeout`; an elapsed deadline is a write error.
pub async fn write_deadline<F>(timeout: Duration, op: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    tokio::time::timeout(timeout, op)
        .await
        .unwrap_or_else(|_| Err(Error::Write(format!("timed out after {:?}", timeout))))
}

/// Bound a read by `timeout`; an elapsed deadline is a read error.
pub async fn read_deadline<T, F>(timeout: Duration, op: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, op)
        .await
        .unwrap_or_else(|_| Err(Error::Read(format!("timed out after {:?}", timeout))))
}
