use super::DocumentSet;
use crate::common::{DocumentRef, DocumentStore, FieldUpdates, Filter, StoreResult, WriteBatch};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// File-backed document store.
///
/// All collections live in a single JSON file. Every write loads the file,
/// applies the ops to a copy and replaces the file through a temporary sibling
/// plus rename, so a crash mid-write leaves either the old or the new content.
/// Writers in this process are serialized; separate processes sharing the file
/// are not coordinated.
pub struct FileDocumentStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileDocumentStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<DocumentSet> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(DocumentSet::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(DocumentSet::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, documents: &DocumentSet) -> StoreResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(documents)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn mutate<F>(&self, change: F) -> StoreResult<()>
    where
        F: FnOnce(&mut DocumentSet) -> StoreResult<()> + Send,
    {
        let _guard = self.write_lock.lock().await;
        let mut documents = self.load().await?;
        change(&mut documents)?;
        self.save(&documents).await
    }
}

#[async_trait]
impl DocumentStore for FileDocumentStore {
    async fn get(&self, doc: &DocumentRef) -> StoreResult<Option<Value>> {
        Ok(self.load().await?.get(doc).cloned())
    }

    async fn update(&self, doc: &DocumentRef, fields: FieldUpdates) -> StoreResult<()> {
        self.mutate(|documents| documents.update(doc, &fields)).await
    }

    async fn set(&self, doc: &DocumentRef, data: Value) -> StoreResult<()> {
        self.mutate(|documents| documents.set(doc, data)).await
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<(String, Value)>> {
        Ok(self.load().await?.query(collection, filters))
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        self.mutate(|documents| documents.apply_all(batch.ops())).await
    }
}
