use crate::common::StoreResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Address of a single document inside a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    pub collection: String,
    pub id: String,
}

impl DocumentRef {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Partial update of a document. Keys are field paths; a dotted path
/// (`stageProgress.lavagem.status`) targets an entry of a nested map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdates {
    fields: BTreeMap<String, Value>,
}

impl FieldUpdates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(path, value);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(path.into(), value.into());
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.fields.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

/// Equality predicate used by [`DocumentStore::query`].
///
/// A field missing from a document compares equal to `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq(String, Value),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::Eq(field, expected) => {
                let actual = document.get(field.as_str()).unwrap_or(&Value::Null);
                actual == expected
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Update { doc: DocumentRef, fields: FieldUpdates },
    Set { doc: DocumentRef, data: Value },
}

impl WriteOp {
    pub fn target(&self) -> &DocumentRef {
        match self {
            WriteOp::Update { doc, .. } | WriteOp::Set { doc, .. } => doc,
        }
    }
}

/// Ordered set of writes that a store applies all-or-nothing.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, doc: DocumentRef, fields: FieldUpdates) -> &mut Self {
        self.ops.push(WriteOp::Update { doc, fields });
        self
    }

    pub fn set(&mut self, doc: DocumentRef, data: Value) -> &mut Self {
        self.ops.push(WriteOp::Set { doc, data });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }
}

/// Port for the backing document database.
///
/// The only consistency primitive the assignment core relies on is `commit`:
/// either every staged write becomes visible or none does.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, doc: &DocumentRef) -> StoreResult<Option<Value>>;

    async fn update(&self, doc: &DocumentRef, fields: FieldUpdates) -> StoreResult<()>;

    async fn set(&self, doc: &DocumentRef, data: Value) -> StoreResult<()>;

    /// Returns `(id, document)` pairs of every document in `collection` matching all filters.
    async fn query(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<(String, Value)>>;

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_field_matches_null_filter() {
        let doc = json!({"workerId": "w1"});
        assert!(Filter::eq("endedAt", Value::Null).matches(&doc));
        assert!(Filter::eq("workerId", "w1").matches(&doc));
        assert!(!Filter::eq("workerId", "w2").matches(&doc));
    }

    #[test]
    fn batch_keeps_insertion_order() {
        let mut batch = WriteBatch::new();
        batch
            .set(DocumentRef::new("a", "1"), json!({}))
            .update(DocumentRef::new("b", "2"), FieldUpdates::new().with("x", 1));
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.ops()[0].target().collection, "a");
        assert_eq!(batch.ops()[1].target().to_string(), "b/2");
    }
}
