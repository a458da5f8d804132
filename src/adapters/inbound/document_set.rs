use crate::common::{DocumentRef, FieldUpdates, Filter, StoreError, StoreResult, WriteOp};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Plain collection → id → document map shared by the in-memory and file stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct DocumentSet {
    collections: BTreeMap<String, BTreeMap<String, Value>>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, doc: &DocumentRef) -> Option<&Value> {
        self.collections.get(&doc.collection)?.get(&doc.id)
    }

    pub fn query(&self, collection: &str, filters: &[Filter]) -> Vec<(String, Value)> {
        self.collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, data)| filters.iter().all(|f| f.matches(data)))
                    .map(|(id, data)| (id.clone(), data.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn count(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.collections.values().all(BTreeMap::is_empty)
    }

    pub fn set(&mut self, doc: &DocumentRef, data: Value) -> StoreResult<()> {
        if !data.is_object() {
            return Err(invalid(doc, "document body must be a JSON object"));
        }
        self.collections
            .entry(doc.collection.clone())
            .or_default()
            .insert(doc.id.clone(), data);
        Ok(())
    }

    pub fn update(&mut self, doc: &DocumentRef, fields: &FieldUpdates) -> StoreResult<()> {
        let existing = self
            .collections
            .get_mut(&doc.collection)
            .and_then(|docs| docs.get_mut(&doc.id))
            .ok_or_else(|| StoreError::MissingDocument {
                collection: doc.collection.clone(),
                id: doc.id.clone(),
            })?;
        let map = existing
            .as_object_mut()
            .ok_or_else(|| invalid(doc, "stored document is not a JSON object"))?;

        for (path, value) in fields.iter() {
            set_path(map, path, value.clone()).map_err(|reason| invalid(doc, &reason))?;
        }
        Ok(())
    }

    pub fn apply(&mut self, op: &WriteOp) -> StoreResult<()> {
        match op {
            WriteOp::Update { doc, fields } => self.update(doc, fields),
            WriteOp::Set { doc, data } => self.set(doc, data.clone()),
        }
    }

    /// Applies every op or none: on error `self` is left untouched.
    pub fn apply_all(&mut self, ops: &[WriteOp]) -> StoreResult<()> {
        let mut staged = self.clone();
        for op in ops {
            staged.apply(op)?;
        }
        *self = staged;
        Ok(())
    }
}

/// Writes `value` at a dotted `path`, creating intermediate maps and replacing
/// non-map intermediates.
fn set_path(root: &mut Map<String, Value>, path: &str, value: Value) -> Result<(), String> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(format!("invalid field path '{}'", path));
    }
    let (last, parents) = segments
        .split_last()
        .ok_or_else(|| format!("invalid field path '{}'", path))?;

    let mut current = root;
    for segment in parents {
        let slot = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !slot.is_object() {
            *slot = Value::Object(Map::new());
        }
        current = match slot {
            Value::Object(map) => map,
            _ => return Err(format!("cannot descend into '{}'", segment)),
        };
    }
    current.insert(last.to_string(), value);
    Ok(())
}

fn invalid(doc: &DocumentRef, reason: &str) -> StoreError {
    StoreError::InvalidDocument {
        collection: doc.collection.clone(),
        id: doc.id.clone(),
        reason: reason.to_string(),
    }
}
