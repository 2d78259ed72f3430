//! Embedded sled backend.
//!
//! Records are addressed by a `(namespace, set, key)` triple: the namespace
//! and set select a tree, the key is the job id's decimal text. Values are
//! bins `{"Id": "<id>", "Data": "<json>"}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sled::{Db, Tree};

use crate::config::NativeKvConfig;
use crate::error::{Error, Result};
use crate::fixtures::JobRecord;
use crate::selection::BackendKind;

use super::Backend;

/// Fully qualified record address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    pub namespace: String,
    pub set: String,
    pub key: String,
}

impl RecordKey {
    /// Name of the tree holding this key's set.
    pub fn tree_name(&self) -> String {
        format!("{}.{}", self.namespace, self.set)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Bins {
    id: String,
    data: String,
}

/// sled backend for benchmarks.
pub struct NativeKvBackend {
    _db: Db,
    tree: Tree,
    namespace: String,
    set: String,
}

impl NativeKvBackend {
    /// Open the engine at `config.path`, or a temporary one.
    pub fn open(config: &NativeKvConfig) -> Result<Self> {
        let db = match &config.path {
            Some(path) => sled::Config::new().path(path).open(),
            None => sled::Config::new().temporary(true).open(),
        }
        .map_err(|e| Error::connection(BackendKind::NativeKv, e))?;

        let address = RecordKey {
            namespace: config.namespace.clone(),
            set: config.set.clone(),
            key: String::new(),
        };
        let tree = db
            .open_tree(address.tree_name())
            .map_err(|e| Error::connection(BackendKind::NativeKv, e))?;

        Ok(Self {
            _db: db,
            tree,
            namespace: config.namespace.clone(),
            set: config.set.clone(),
        })
    }

    pub fn record_key(&self, job_id: u64) -> RecordKey {
        RecordKey {
            namespace: self.namespace.clone(),
            set: self.set.clone(),
            key: job_id.to_string(),
        }
    }

    /// Number of records in the set.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

#[async_trait]
impl Backend for NativeKvBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::NativeKv
    }

    async fn prepare(&self) -> Result<()> {
        self.tree
            .clear()
            .map_err(|e| Error::connection(BackendKind::NativeKv, e))
    }

    async fn insert(&self, record: &JobRecord) -> Result<()> {
        let key = self.record_key(record.id());
        let bins = Bins {
            id: key.key.clone(),
            data: record.to_json(),
        };
        let value = serde_json::to_vec(&bins).map_err(Error::write)?;
        self.tree
            .insert(key.key.as_bytes(), value)
            .map(|_| ())
            .map_err(Error::write)
    }

    async fn get(&self, job_id: u64) -> Result<String> {
        let key = self.record_key(job_id);
        let raw = self
            .tree
            .get(key.key.as_bytes())
            .map_err(Error::read)?
            .ok_or_else(|| Error::NotFound(format!("{}:{}", key.tree_name(), key.key)))?;

        let bins: Bins = serde_json::from_slice(&raw).map_err(Error::read)?;
        Ok(bins.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{JobGenerator, NamePools, Template};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn records(count: usize) -> Vec<JobRecord> {
        let template = Template::from_json_str(r#"{"JobId":0,"CustomerName":""}"#).unwrap();
        let names = NamePools::new(vec!["Ann".into()], vec!["Lee".into()]).unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        JobGenerator::new(template, names).generate(count, &mut rng)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let backend = NativeKvBackend::open(&NativeKvConfig::default()).unwrap();
        backend.prepare().await.unwrap();

        for record in records(10) {
            backend.insert(&record).await.unwrap();
        }
        assert_eq!(backend.len(), 10);

        let stored = backend.get(7).await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&stored).unwrap();
        assert_eq!(value["JobId"], 7);
        assert_eq!(value["CustomerName"], "Ann Lee");

        assert!(backend.get(10).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_prepare_clears_set() {
        let backend = NativeKvBackend::open(&NativeKvConfig::default()).unwrap();
        for record in records(3) {
            backend.insert(&record).await.unwrap();
        }
        backend.prepare().await.unwrap();
        assert!(backend.is_empty());
    }

    #[test]
    fn test_record_key_addressing() {
        let backend = NativeKvBackend::open(&NativeKvConfig::default()).unwrap();
        let key = backend.record_key(42);
        assert_eq!(key.namespace, "test");
        assert_eq!(key.set, "cache");
        assert_eq!(key.key, "42");
        assert_eq!(key.tree_name(), "test.cache");
    }
}
