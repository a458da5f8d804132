#![allow(dead_code)]

use assignment_sync::adapters::inbound::MemoryDocumentStore;
use assignment_sync::adapters::outbound::init_noop_logger;
use assignment_sync::common::{
    DocumentRef, DocumentStore, FieldUpdates, Filter, ManualClock, StoreError, StoreResult,
    WriteBatch,
};
use assignment_sync::domains::assignment::ActivityRecord;
use assignment_sync::domains::notifier::Notifier;
use assignment_sync::{AssignmentContext, AssignmentEngine, Config, EngineSettings};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Memory store that counts calls and can be told to fail reads or commits.
#[derive(Default)]
pub struct CountingStore {
    pub inner: MemoryDocumentStore,
    pub gets: AtomicUsize,
    pub queries: AtomicUsize,
    pub updates: AtomicUsize,
    pub sets: AtomicUsize,
    pub commits: AtomicUsize,
    pub fail_reads: AtomicBool,
    pub fail_commits: AtomicBool,
}

impl CountingStore {
    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.gets() + self.queries.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
            + self.sets.load(Ordering::SeqCst)
            + self.commits.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    fn read_guard(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("read refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn get(&self, doc: &DocumentRef) -> StoreResult<Option<Value>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.read_guard()?;
        self.inner.get(doc).await
    }

    async fn update(&self, doc: &DocumentRef, fields: FieldUpdates) -> StoreResult<()> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.inner.update(doc, fields).await
    }

    async fn set(&self, doc: &DocumentRef, data: Value) -> StoreResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.inner.set(doc, data).await
    }

    async fn query(&self, collection: &str, filters: &[Filter]) -> StoreResult<Vec<(String, Value)>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.read_guard()?;
        self.inner.query(collection, filters).await
    }

    async fn commit(&self, batch: WriteBatch) -> StoreResult<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("commit refused".to_string()));
        }
        self.inner.commit(batch).await
    }
}

#[derive(Default)]
pub struct CaptureNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl CaptureNotifier {
    pub fn errors(&self) -> Vec<String> {
        self.with_prefix("ERR:")
    }

    pub fn successes(&self) -> Vec<String> {
        self.with_prefix("OK:")
    }

    fn with_prefix(&self, prefix: &str) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| m.strip_prefix(prefix).map(str::to_string))
            .collect()
    }
}

impl Notifier for CaptureNotifier {
    fn error(&self, message: &str) {
        self.messages.lock().unwrap().push(format!("ERR:{}", message));
    }
    fn info(&self, message: &str) {
        self.messages.lock().unwrap().push(format!("INFO:{}", message));
    }
    fn success(&self, message: &str) {
        self.messages.lock().unwrap().push(format!("OK:{}", message));
    }
}

/// Engine wired to a counting memory store, a manual clock and a capturing notifier.
pub struct Harness {
    pub config: Config,
    pub store: Arc<CountingStore>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<CaptureNotifier>,
    pub context: Arc<AssignmentContext>,
    pub engine: AssignmentEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(CountingStore::default());
        let clock = Arc::new(ManualClock::default());
        let notifier = Arc::new(CaptureNotifier::default());
        let logger = init_noop_logger();
        let context = Arc::new(AssignmentContext::with_clock(
            &config,
            store.clone(),
            clock.clone(),
            logger.clone(),
        ));
        let engine = AssignmentEngine::new(
            store.clone(),
            context.clone(),
            notifier.clone(),
            logger,
            EngineSettings::from_config(&config),
        );
        Self {
            config,
            store,
            clock,
            notifier,
            context,
            engine,
        }
    }

    fn workers(&self) -> &str {
        &self.config.collections.workers
    }

    fn orders(&self) -> &str {
        &self.config.collections.orders
    }

    fn activities(&self) -> &str {
        &self.config.collections.activities
    }

    pub async fn seed_worker(&self, id: &str, name: &str) {
        self.store
            .inner
            .set(
                &DocumentRef::new(self.workers(), id),
                json!({"name": name, "busy": false, "active": true, "specialties": ["lavagem"]}),
            )
            .await
            .unwrap();
    }

    pub async fn seed_order(&self, id: &str) {
        self.store
            .inner
            .set(
                &DocumentRef::new(self.orders(), id),
                json!({"plate": "ABC1D23", "stageProgress": {}}),
            )
            .await
            .unwrap();
    }

    pub async fn worker(&self, id: &str) -> Value {
        self.store
            .inner
            .get(&DocumentRef::new(self.workers(), id))
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn order(&self, id: &str) -> Value {
        self.store
            .inner
            .get(&DocumentRef::new(self.orders(), id))
            .await
            .unwrap()
            .unwrap()
    }

    pub async fn activities_of(&self, worker_id: &str) -> Vec<Value> {
        self.store
            .inner
            .query(self.activities(), &[Filter::eq("workerId", worker_id)])
            .await
            .unwrap()
            .into_iter()
            .map(|(_, doc)| doc)
            .collect()
    }

    pub async fn open_activities_of(&self, worker_id: &str) -> Vec<Value> {
        self.activities_of(worker_id)
            .await
            .into_iter()
            .filter(|doc| {
                serde_json::from_value::<ActivityRecord>(doc.clone())
                    .map(|record| record.is_open())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Drops cached documents so the next read sees committed state.
    pub async fn refresh(&self) {
        self.context.cache.invalidate(None).await;
    }
}

pub fn assigned_ids(order: &Value, stage_key: &str) -> Vec<String> {
    order["stageProgress"][stage_key]["assignedWorkers"]
        .as_array()
        .map(|workers| {
            workers
                .iter()
                .filter_map(|w| w["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
