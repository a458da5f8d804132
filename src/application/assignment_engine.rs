//! Assignment engine: starts, stops, force-releases and lists worker-to-stage
//! assignments while keeping three denormalized views in step:
//!
//! - the worker document (`busy`, `lastActivity`)
//! - the service order's `stageProgress.<stageKey>` entry
//! - the append-only activity log
//!
//! Every mutation is composed into a single [`WriteBatch`] and committed
//! atomically. There is no locking across calls: two concurrent calls for the
//! same worker or stage can both read stale state and the later commit wins.
//! `force_release` is the one path that uses two commits.

use super::AssignmentContext;
use crate::common::{
    normalize_timestamp, DocumentRef, DocumentStore, DomainError, DomainResult, FieldUpdates,
    Filter, WriteBatch,
};
use crate::config::{CollectionNames, Config};
use crate::domains::assignment::{
    fields, stage_field, ActivityRecord, AssignedWorker, LastActivity, StageKeyPolicy, StageState,
    StageStatus, Worker,
};
use crate::domains::{messages, DynLogger, DynNotifier};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSettings {
    pub collections: CollectionNames,
    pub stage_keys: StageKeyPolicy,
    /// Off: `assign_many` only touches `lastActivity` and the stage's assignee list.
    /// On: it also sets `busy`, opens activity records and marks the stage in progress.
    pub unify_assign_many: bool,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            collections: config.collections.clone(),
            stage_keys: StageKeyPolicy::new(config.stages.kind_qualified.iter().cloned()),
            unify_assign_many: config.engine.unify_assign_many,
        }
    }
}

pub struct AssignmentEngine {
    store: Arc<dyn DocumentStore>,
    context: Arc<AssignmentContext>,
    notifier: DynNotifier,
    logger: DynLogger,
    settings: EngineSettings,
}

impl AssignmentEngine {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        context: Arc<AssignmentContext>,
        notifier: DynNotifier,
        logger: DynLogger,
        settings: EngineSettings,
    ) -> Self {
        Self {
            store,
            context,
            notifier,
            logger,
            settings,
        }
    }

    pub fn context(&self) -> &AssignmentContext {
        &self.context
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn stage_key(&self, stage: &str, service_kind: Option<&str>) -> String {
        self.settings.stage_keys.key_for(stage, service_kind)
    }

    /// Assign one worker to a stage. Overwrites whatever the stage entry held before.
    pub async fn assign_one(
        &self,
        worker_id: &str,
        order_id: &str,
        stage: &str,
        service_kind: Option<&str>,
    ) -> bool {
        match self
            .try_assign_one(worker_id, order_id, stage, service_kind)
            .await
        {
            Ok(()) => {
                self.logger.info(&format!(
                    "Worker {} assigned to order {} stage {}",
                    worker_id,
                    order_id,
                    self.stage_key(stage, service_kind)
                ));
                self.notifier.success(messages::ASSIGNED);
                true
            }
            Err(e) => {
                self.report("assign_one", &e);
                false
            }
        }
    }

    /// Replace the stage's assignee list with the workers in `worker_ids` that exist.
    ///
    /// With `unify_assign_many` off this path neither opens activity records nor sets
    /// `busy`; a later `release` still closes whatever is open and clears `busy`.
    pub async fn assign_many<S>(
        &self,
        worker_ids: &[S],
        order_id: &str,
        stage: &str,
        service_kind: Option<&str>,
    ) -> bool
    where
        S: AsRef<str> + Sync,
    {
        let ids = distinct_ids(worker_ids);
        if ids.len() == 1 {
            return self.assign_one(ids[0], order_id, stage, service_kind).await;
        }

        match self.try_assign_many(&ids, order_id, stage, service_kind).await {
            Ok(count) => {
                self.logger.info(&format!(
                    "{} workers assigned to order {} stage {}",
                    count,
                    order_id,
                    self.stage_key(stage, service_kind)
                ));
                self.notifier.success(messages::ASSIGNED_MANY);
                true
            }
            Err(e) => {
                self.report("assign_many", &e);
                false
            }
        }
    }

    /// Stop one worker's engagement in one stage, reconciling all three stores in one batch.
    pub async fn release(
        &self,
        worker_id: &str,
        order_id: &str,
        stage: &str,
        service_kind: Option<&str>,
    ) -> bool {
        match self
            .try_release(worker_id, order_id, stage, service_kind)
            .await
        {
            Ok(()) => {
                self.logger.info(&format!(
                    "Worker {} released from order {} stage {}",
                    worker_id,
                    order_id,
                    self.stage_key(stage, service_kind)
                ));
                self.notifier.success(messages::RELEASED);
                true
            }
            Err(e) => {
                self.report("release", &e);
                false
            }
        }
    }

    /// Release whatever the worker is doing, closing every open activity record.
    pub async fn force_release(&self, worker_id: &str) -> bool {
        match self.try_force_release(worker_id).await {
            Ok(true) => {
                self.logger.info(&format!("Worker {} force-released", worker_id));
                self.notifier.success(messages::FORCE_RELEASED);
                true
            }
            Ok(false) => true,
            Err(e) => {
                self.report("force_release", &e);
                false
            }
        }
    }

    /// Workers currently assigned to a stage. Never fails: unknown or malformed data yields an empty list.
    pub async fn list_assigned(
        &self,
        order_id: &str,
        stage: &str,
        service_kind: Option<&str>,
    ) -> Vec<AssignedWorker> {
        if order_id.trim().is_empty() || stage.trim().is_empty() {
            return Vec::new();
        }
        let stage_key = self.stage_key(stage, service_kind);
        let Some(order) = self
            .context
            .cache
            .get(&self.settings.collections.orders, order_id)
            .await
            .data
        else {
            return Vec::new();
        };

        stage_assignees(&order, &stage_key)
    }

    async fn try_assign_one(
        &self,
        worker_id: &str,
        order_id: &str,
        stage: &str,
        service_kind: Option<&str>,
    ) -> DomainResult<()> {
        require("worker id", worker_id)?;
        require("order id", order_id)?;
        require("stage", stage)?;
        let service_kind = service_kind.filter(|k| !k.is_empty());
        let stage_key = self.stage_key(stage, service_kind);

        let worker = self.fetch_worker(worker_id).await?;
        self.fetch_order(order_id).await?;

        let now = self.context.clock.now();
        let mut batch = WriteBatch::new();

        batch.update(
            self.worker_ref(worker_id),
            FieldUpdates::new().with(fields::BUSY, true).with(
                fields::LAST_ACTIVITY,
                serde_json::to_value(last_activity(order_id, stage, service_kind, now))?,
            ),
        );

        let state = StageState {
            worker_id: worker_id.to_string(),
            worker_name: worker.name.clone(),
            assigned_workers: vec![AssignedWorker {
                id: worker_id.to_string(),
                name: worker.name,
                started_at: Some(now),
            }],
            started_at: now,
            completed: false,
            finished_at: None,
            service_kind: service_kind.map(str::to_string),
            status: StageStatus::InProgress,
        };
        batch.update(
            self.order_ref(order_id),
            FieldUpdates::new().with(stage_field(&stage_key, None), serde_json::to_value(&state)?),
        );

        batch.set(
            self.new_activity_ref(),
            serde_json::to_value(ActivityRecord::open(
                worker_id,
                order_id,
                stage,
                service_kind,
                now,
            ))?,
        );

        self.store.commit(batch).await?;
        Ok(())
    }

    async fn try_assign_many(
        &self,
        worker_ids: &[&str],
        order_id: &str,
        stage: &str,
        service_kind: Option<&str>,
    ) -> DomainResult<usize> {
        if worker_ids.is_empty() {
            return Err(DomainError::validation("at least one worker id is required"));
        }
        require("order id", order_id)?;
        require("stage", stage)?;
        let service_kind = service_kind.filter(|k| !k.is_empty());
        let stage_key = self.stage_key(stage, service_kind);
        let unify = self.settings.unify_assign_many;

        self.fetch_order(order_id).await?;

        let lookups = join_all(
            worker_ids
                .iter()
                .map(|id| self.context.cache.get(&self.settings.collections.workers, id)),
        )
        .await;

        let now = self.context.clock.now();
        let activity = serde_json::to_value(last_activity(order_id, stage, service_kind, now))?;
        let mut batch = WriteBatch::new();
        let mut assigned = Vec::with_capacity(worker_ids.len());

        for (id, lookup) in worker_ids.iter().zip(lookups) {
            let Some(data) = lookup.data else {
                self.logger.warn(&format!("assign_many: worker {} not found, skipping", id));
                continue;
            };
            let worker: Worker = serde_json::from_value(data)?;

            let mut updates = FieldUpdates::new().with(fields::LAST_ACTIVITY, activity.clone());
            if unify {
                updates.insert(fields::BUSY, true);
                batch.set(
                    self.new_activity_ref(),
                    serde_json::to_value(ActivityRecord::open(
                        id,
                        order_id,
                        stage,
                        service_kind,
                        now,
                    ))?,
                );
            }
            batch.update(self.worker_ref(id), updates);

            assigned.push(AssignedWorker {
                id: id.to_string(),
                name: worker.name,
                started_at: Some(now),
            });
        }

        if assigned.is_empty() {
            return Err(DomainError::not_found(
                &self.settings.collections.workers,
                &worker_ids.join(","),
            ));
        }

        let mut order_updates = FieldUpdates::new()
            .with(
                stage_field(&stage_key, Some(fields::ASSIGNED_WORKERS)),
                serde_json::to_value(&assigned)?,
            )
            .with(
                stage_field(&stage_key, Some(fields::STARTED_AT)),
                serde_json::to_value(now)?,
            );
        if unify {
            order_updates.insert(
                stage_field(&stage_key, Some(fields::STATUS)),
                StageStatus::InProgress.as_str(),
            );
        }
        batch.update(self.order_ref(order_id), order_updates);

        self.store.commit(batch).await?;
        Ok(assigned.len())
    }

    async fn try_release(
        &self,
        worker_id: &str,
        order_id: &str,
        stage: &str,
        service_kind: Option<&str>,
    ) -> DomainResult<()> {
        require("worker id", worker_id)?;
        require("order id", order_id)?;
        require("stage", stage)?;
        let service_kind = service_kind.filter(|k| !k.is_empty());
        let stage_key = self.stage_key(stage, service_kind);
        let activities = &self.settings.collections.activities;

        let worker = self.load_worker(worker_id).await?;

        // All reads happen before anything is staged.
        let mut filters = vec![
            Filter::eq(fields::WORKER_ID, worker_id),
            Filter::eq(fields::ORDER_ID, order_id),
            Filter::eq(fields::STAGE, stage),
            Filter::eq(fields::ENDED_AT, Value::Null),
        ];
        if let Some(kind) = service_kind {
            filters.push(Filter::eq(fields::SERVICE_KIND, kind));
        }
        let matching = self.store.query(activities, &filters).await?;
        let open = self.store.query(activities, &open_activity_filters(worker_id)).await?;
        // The assignee list is rewritten from this read, so bypass the cache.
        let order = self.store.get(&self.order_ref(order_id)).await?;

        let now = serde_json::to_value(self.context.clock.now())?;
        let mut batch = WriteBatch::new();

        let closing: HashSet<&str> = matching.iter().map(|(id, _)| id.as_str()).collect();
        for id in &closing {
            batch.update(
                self.activity_ref(id),
                FieldUpdates::new().with(fields::ENDED_AT, now.clone()),
            );
        }

        let still_open = open
            .iter()
            .filter(|(id, _)| !closing.contains(id.as_str()))
            .count();
        if still_open == 0 {
            let mut updates = FieldUpdates::new().with(fields::BUSY, false);
            if worker.last_activity.is_some() {
                updates.insert(fields::LAST_ACTIVITY_ENDED_AT, now.clone());
            }
            batch.update(self.worker_ref(worker_id), updates);
        }

        if let Some(updates) = order
            .as_ref()
            .and_then(|order| release_stage_updates(order, &stage_key, worker_id))
        {
            batch.update(self.order_ref(order_id), updates);
        }

        if batch.is_empty() {
            return Ok(());
        }
        self.store.commit(batch).await?;
        Ok(())
    }

    /// `Ok(false)` when the worker had no recorded activity and nothing was written.
    async fn try_force_release(&self, worker_id: &str) -> DomainResult<bool> {
        require("worker id", worker_id)?;
        let worker = self.load_worker(worker_id).await?;

        let Some(activity) = worker
            .last_activity
            .filter(|a| a.order_id.as_deref().is_some_and(|id| !id.is_empty()))
        else {
            self.logger.info(&format!("force_release: worker {} has no activity", worker_id));
            return Ok(false);
        };

        let order_id = activity.order_id.unwrap_or_default();
        let stage = activity.stage.unwrap_or_default();
        if let Err(e) = self
            .try_release(worker_id, &order_id, &stage, activity.service_kind.as_deref())
            .await
        {
            self.logger.warn(&format!(
                "force_release: targeted release of worker {} failed ({}), closing open activities anyway",
                worker_id, e
            ));
        }

        // Second commit: close anything still open and clear the busy flag regardless.
        let activities = &self.settings.collections.activities;
        let open = self
            .store
            .query(activities, &open_activity_filters(worker_id))
            .await?;
        let now = serde_json::to_value(self.context.clock.now())?;

        let mut batch = WriteBatch::new();
        for (id, _) in &open {
            batch.update(
                self.activity_ref(id),
                FieldUpdates::new().with(fields::ENDED_AT, now.clone()),
            );
        }
        batch.update(
            self.worker_ref(worker_id),
            FieldUpdates::new().with(fields::BUSY, false),
        );
        self.store.commit(batch).await?;
        Ok(true)
    }

    async fn fetch_worker(&self, worker_id: &str) -> DomainResult<Worker> {
        let collection = &self.settings.collections.workers;
        let data = self
            .context
            .cache
            .get(collection, worker_id)
            .await
            .data
            .ok_or_else(|| DomainError::not_found(collection, worker_id))?;
        Ok(serde_json::from_value(data)?)
    }

    /// Reads the worker straight from the store. Release paths decide on `lastActivity`,
    /// which a cached copy from an earlier assign would not show yet.
    async fn load_worker(&self, worker_id: &str) -> DomainResult<Worker> {
        let data = self
            .store
            .get(&self.worker_ref(worker_id))
            .await?
            .ok_or_else(|| DomainError::not_found(&self.settings.collections.workers, worker_id))?;
        Ok(serde_json::from_value(data)?)
    }

    async fn fetch_order(&self, order_id: &str) -> DomainResult<Value> {
        let collection = &self.settings.collections.orders;
        self.context
            .cache
            .get(collection, order_id)
            .await
            .data
            .ok_or_else(|| DomainError::not_found(collection, order_id))
    }

    fn report(&self, operation: &str, error: &DomainError) {
        match error {
            DomainError::Validation { reason } => {
                self.logger.warn(&format!("{} rejected: {}", operation, reason));
            }
            DomainError::NotFound { collection, id } => {
                self.logger.warn(&format!("{}: {}/{} not found", operation, collection, id));
                if *collection == self.settings.collections.orders {
                    self.alert(messages::ORDER_NOT_FOUND);
                } else {
                    self.alert(messages::WORKER_NOT_FOUND);
                }
            }
            DomainError::Store(_) | DomainError::Serialization(_) => {
                self.logger.error(&format!("{} failed: {}", operation, error));
                self.alert(messages::STORE_FAILURE);
            }
        }
    }

    fn alert(&self, message: &str) {
        if self.context.throttle.should_notify_default(message) {
            self.notifier.error(message);
        }
    }

    fn worker_ref(&self, id: &str) -> DocumentRef {
        DocumentRef::new(&self.settings.collections.workers, id)
    }

    fn order_ref(&self, id: &str) -> DocumentRef {
        DocumentRef::new(&self.settings.collections.orders, id)
    }

    fn activity_ref(&self, id: &str) -> DocumentRef {
        DocumentRef::new(&self.settings.collections.activities, id)
    }

    fn new_activity_ref(&self) -> DocumentRef {
        self.activity_ref(&Uuid::new_v4().to_string())
    }
}

fn require(label: &str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{} is required", label)));
    }
    Ok(())
}

/// Non-empty ids in first-seen order without repeats.
fn distinct_ids<S: AsRef<str>>(worker_ids: &[S]) -> Vec<&str> {
    let mut seen = HashSet::new();
    worker_ids
        .iter()
        .map(|id| id.as_ref())
        .filter(|id| !id.trim().is_empty())
        .filter(|id| seen.insert(*id))
        .collect()
}

fn open_activity_filters(worker_id: &str) -> [Filter; 2] {
    [
        Filter::eq(fields::WORKER_ID, worker_id),
        Filter::eq(fields::ENDED_AT, Value::Null),
    ]
}

fn last_activity(
    order_id: &str,
    stage: &str,
    service_kind: Option<&str>,
    started_at: DateTime<Utc>,
) -> LastActivity {
    LastActivity {
        order_id: order_id.to_string(),
        stage: stage.to_string(),
        service_kind: service_kind.map(str::to_string),
        started_at,
        ended_at: None,
    }
}

/// Updates that drop `worker_id` from the stage's assignee list, or `None` when the stage has no entry.
fn release_stage_updates(order: &Value, stage_key: &str, worker_id: &str) -> Option<FieldUpdates> {
    let entry = order
        .get(fields::STAGE_PROGRESS)?
        .get(stage_key)?
        .as_object()?;

    let remaining: Vec<Value> = entry
        .get(fields::ASSIGNED_WORKERS)
        .and_then(Value::as_array)
        .map(|workers| {
            workers
                .iter()
                .filter(|w| w.get("id").and_then(Value::as_str) != Some(worker_id))
                .cloned()
                .collect()
        })
        .unwrap_or_default();
    let completed = entry
        .get(fields::COMPLETED)
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let mut updates = FieldUpdates::new();
    if remaining.is_empty() && !completed {
        updates.insert(
            stage_field(stage_key, Some(fields::STATUS)),
            StageStatus::Stopped.as_str(),
        );
    }
    updates.insert(
        stage_field(stage_key, Some(fields::ASSIGNED_WORKERS)),
        Value::Array(remaining),
    );
    Some(updates)
}

/// Reads the assignee list of `stageProgress[stage_key]`, accepting the legacy
/// single-worker shape (`workerId`/`workerName`) when no list is stored.
fn stage_assignees(order: &Value, stage_key: &str) -> Vec<AssignedWorker> {
    let Some(entry) = order
        .get(fields::STAGE_PROGRESS)
        .and_then(|progress| progress.get(stage_key))
        .and_then(Value::as_object)
    else {
        return Vec::new();
    };
    let stage_started = entry.get(fields::STARTED_AT).and_then(normalize_timestamp);

    match entry.get(fields::ASSIGNED_WORKERS) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| {
                let id = item.get("id").and_then(Value::as_str).filter(|id| !id.is_empty())?;
                Some(AssignedWorker {
                    id: id.to_string(),
                    name: item
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    started_at: item
                        .get(fields::STARTED_AT)
                        .and_then(normalize_timestamp)
                        .or(stage_started),
                })
            })
            .collect(),
        Some(_) => Vec::new(),
        None => entry
            .get(fields::WORKER_ID)
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(|id| {
                vec![AssignedWorker {
                    id: id.to_string(),
                    name: entry
                        .get(fields::WORKER_NAME)
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    started_at: stage_started,
                }]
            })
            .unwrap_or_default(),
    }
}
