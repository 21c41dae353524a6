use super::{Document, DocumentStore, Filter, Update, UpsertOutcome, apply_update};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

type Collection = HashMap<String, Document>;

/// In-process document store keyed by collection name
#[derive(Clone, Default)]
pub struct MemoryDocumentStore {
    inner: Arc<Mutex<HashMap<String, Collection>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        let collections = self.inner.lock().await;
        collections.get(collection).map_or(0, HashMap::len)
    }

    pub async fn documents(&self, collection: &str) -> Vec<Document> {
        let collections = self.inner.lock().await;
        collections
            .get(collection)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: Update,
    ) -> Result<UpsertOutcome> {
        let mut collections = self.inner.lock().await;
        let docs = collections.entry(collection.to_string()).or_default();
        let key = filter.storage_key();

        let (doc, outcome) = apply_update(docs.remove(&key), filter, update);
        docs.insert(key, doc);
        debug!("Memory store PUT {} in {}", filter.value, collection);
        Ok(outcome)
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        let collections = self.inner.lock().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(&filter.storage_key()))
            .cloned())
    }
}
