use super::{Document, DocumentStore, Filter, Update, UpsertOutcome, apply_update};
use anyhow::{Context, Result};
use async_trait::async_trait;
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

/// Document store on a fjall keyspace, one partition per collection.
///
/// Values are JSON documents keyed by the filter's natural key. Updates are
/// read-modify-write and serialized through a single lock.
pub struct FjallDocumentStore {
    keyspace: Keyspace,
    partitions: Mutex<HashMap<String, PartitionHandle>>,
}

impl FjallDocumentStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path)
            .open()
            .with_context(|| format!("Failed to open document store at {}", path.display()))?;
        debug!("Opened document store at {}", path.display());

        Ok(Self {
            keyspace,
            partitions: Mutex::new(HashMap::new()),
        })
    }

    fn partition(
        &self,
        partitions: &mut HashMap<String, PartitionHandle>,
        collection: &str,
    ) -> Result<PartitionHandle> {
        if let Some(partition) = partitions.get(collection) {
            return Ok(partition.clone());
        }
        let partition = self
            .keyspace
            .open_partition(collection, PartitionCreateOptions::default())
            .with_context(|| format!("Failed to open collection: {collection}"))?;
        partitions.insert(collection.to_string(), partition.clone());
        Ok(partition)
    }

    fn read(partition: &PartitionHandle, key: &str) -> Result<Option<Document>> {
        match partition.get(key)? {
            Some(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).context("Failed to decode stored document")?,
            )),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl DocumentStore for FjallDocumentStore {
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: Update,
    ) -> Result<UpsertOutcome> {
        let mut partitions = self.partitions.lock().await;
        let partition = self.partition(&mut partitions, collection)?;
        let key = filter.storage_key();

        let existing = Self::read(&partition, &key)?;
        let (doc, outcome) = apply_update(existing, filter, update);
        partition.insert(&key, serde_json::to_vec(&doc)?)?;
        self.keyspace.persist(PersistMode::Buffer)?;
        debug!("Disk store PUT {} in {}", filter.value, collection);
        Ok(outcome)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        let mut partitions = self.partitions.lock().await;
        let partition = self.partition(&mut partitions, collection)?;
        Self::read(&partition, &filter.storage_key())
    }
}
