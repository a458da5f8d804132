use super::DocumentSet;
use crate::common::{DocumentRef, DocumentStore, FieldUpdates, Filter, StoreResult, WriteBatch};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

/// In-memory document store for tests, demos and single-process use.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<DocumentSet>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(DocumentSet::new()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, doc: &DocumentRef) -> StoreResult<Option<Value>> {
        Ok(self.documents.read().await.get(doc).cloned())
    }

    async fn update(&self, doc: &DocumentRef, fields: FieldUpdates) -> StoreResult<()> {
        self.documents.write().await.update(doc, &fields)
    }

    async fn set(&self, doc: &DocumentRef, data: Value) -> StoreResult<()> {
        self.documents.write().await.set(doc, data)
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<(String, Value)>> {
        Ok(self.documents.read().await.query(collection, filters))
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut documents = self.documents.write().await;
        documents.apply_all(batch.ops())
    }
}
