//! MongoDB document store backend.
//!
//! Documents are stored whole with `_id` set to the job id. The protocol
//! pipelines requests over pooled connections, so this is the only backend
//! whose write phase issues inserts concurrently.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use mongodb::bson::{self, doc, Bson, Document};
use mongodb::{Client, Collection};

use crate::config::DocumentStoreConfig;
use crate::error::{Error, Result};
use crate::fixtures::JobRecord;
use crate::selection::BackendKind;

use super::{write_deadline, Backend};

/// Id of the throwaway document used for warm-up. Never a generated job id.
const WARM_UP_ID: i64 = -1;

/// MongoDB backend for benchmarks.
pub struct DocumentStoreBackend {
    collection: Collection<Document>,
}

impl DocumentStoreBackend {
    /// Connect and verify the server answers a ping.
    pub async fn connect(config: &DocumentStoreConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.uri)
            .await
            .map_err(|e| Error::connection(BackendKind::DocumentStore, e))?;

        // Client construction is lazy; force a round trip so an unreachable
        // server is reported here and not during the timed phase.
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| Error::connection(BackendKind::DocumentStore, e))?;

        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);

        Ok(Self { collection })
    }

    fn to_document(record: &JobRecord) -> Result<Document> {
        let mut document = bson::to_document(record.document()).map_err(Error::write)?;
        document.insert("_id", record.id() as i64);
        Ok(document)
    }
}

#[async_trait]
impl Backend for DocumentStoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::DocumentStore
    }

    /// Drop the collection. A missing collection is not an error.
    async fn prepare(&self) -> Result<()> {
        self.collection
            .drop()
            .await
            .map_err(|e| Error::connection(BackendKind::DocumentStore, e))
    }

    async fn warm_up(&self) -> Result<()> {
        self.collection
            .insert_one(doc! { "_id": WARM_UP_ID, "warmup": true })
            .await
            .map_err(|e| Error::connection(BackendKind::DocumentStore, e))?;
        self.collection
            .delete_one(doc! { "_id": WARM_UP_ID })
            .await
            .map(|_| ())
            .map_err(|e| Error::connection(BackendKind::DocumentStore, e))
    }

    async fn insert(&self, record: &JobRecord) -> Result<()> {
        let document = Self::to_document(record)?;
        self.collection
            .insert_one(document)
            .await
            .map(|_| ())
            .map_err(Error::write)
    }

    /// Dispatch every insert at once and wait for all of them.
    async fn insert_many(&self, records: &[JobRecord], timeout: Duration) -> Vec<Result<()>> {
        join_all(
            records
                .iter()
                .map(|record| write_deadline(timeout, self.insert(record))),
        )
        .await
    }

    async fn get(&self, job_id: u64) -> Result<String> {
        let found = self
            .collection
            .find_one(doc! { "_id": job_id as i64 })
            .await
            .map_err(Error::read)?;

        match found {
            Some(document) => Ok(Bson::Document(document).into_relaxed_extjson().to_string()),
            None => Err(Error::NotFound(format!("_id {}", job_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{JobGenerator, NamePools, Template};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[tokio::test]
    #[ignore = "needs a MongoDB server at JOBBENCH_MONGO_URI"]
    async fn test_prepare_drops_collection() {
        let config = DocumentStoreConfig {
            uri: std::env::var("JOBBENCH_MONGO_URI")
                .unwrap_or_else(|_| crate::config::DEFAULT_MONGO_URI.to_string()),
            database: "jobbench_test".to_string(),
            collection: "prepare_drop".to_string(),
        };
        let backend = DocumentStoreBackend::connect(&config).await.unwrap();

        // Twice: the second drop hits a missing collection.
        backend.prepare().await.unwrap();
        backend.prepare().await.unwrap();

        let template = Template::from_json_str(r#"{"JobId":0,"CustomerName":""}"#).unwrap();
        let names = NamePools::new(vec!["Ann".into()], vec!["Lee".into()]).unwrap();
        let record = JobGenerator::new(template, names).produce(3, &mut StdRng::seed_from_u64(0));
        backend.insert(&record).await.unwrap();
        assert!(backend.get(3).await.is_ok());

        backend.prepare().await.unwrap();
        let names = Client::with_uri_str(&config.uri)
            .await
            .unwrap()
            .database(&config.database)
            .list_collection_names()
            .await
            .unwrap();
        assert!(!names.contains(&config.collection));
        assert!(backend.get(3).await.unwrap_err().is_not_found());
    }
}
