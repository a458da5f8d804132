use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Stored field names. Nested paths are built with [`stage_field`].
pub mod fields {
    pub const BUSY: &str = "busy";
    pub const LAST_ACTIVITY: &str = "lastActivity";
    pub const LAST_ACTIVITY_ENDED_AT: &str = "lastActivity.endedAt";
    pub const STAGE_PROGRESS: &str = "stageProgress";
    pub const ASSIGNED_WORKERS: &str = "assignedWorkers";
    pub const STARTED_AT: &str = "startedAt";
    pub const STATUS: &str = "status";
    pub const COMPLETED: &str = "completed";
    pub const WORKER_ID: &str = "workerId";
    pub const WORKER_NAME: &str = "workerName";
    pub const ORDER_ID: &str = "orderId";
    pub const STAGE: &str = "stage";
    pub const SERVICE_KIND: &str = "serviceKind";
    pub const ENDED_AT: &str = "endedAt";
}

/// `stageProgress.<stage_key>` or `stageProgress.<stage_key>.<field>`.
pub fn stage_field(stage_key: &str, field: Option<&str>) -> String {
    match field {
        Some(field) => format!("{}.{}.{}", fields::STAGE_PROGRESS, stage_key, field),
        None => format!("{}.{}", fields::STAGE_PROGRESS, stage_key),
    }
}

fn default_true() -> bool {
    true
}

/// Missing and `null` both read as `T::default()`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn null_as_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(true))
}

/// Worker document as read back from the store. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Worker {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub busy: bool,
    #[serde(default = "default_true", deserialize_with = "null_as_true")]
    pub active: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub last_activity: Option<StoredActivity>,
}

/// `lastActivity` as stored. Lenient: any part may be missing and timestamps stay raw.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredActivity {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub service_kind: Option<String>,
    #[serde(default)]
    pub started_at: Option<Value>,
    #[serde(default)]
    pub ended_at: Option<Value>,
}

/// `lastActivity` as written by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastActivity {
    pub order_id: String,
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_kind: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    InProgress,
    Stopped,
    Completed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::InProgress => "in_progress",
            StageStatus::Stopped => "stopped",
            StageStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssignedWorker {
    pub id: String,
    pub name: String,
    pub started_at: Option<DateTime<Utc>>,
}

/// Full stage entry written by the single-worker assign path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StageState {
    pub worker_id: String,
    pub worker_name: String,
    pub assigned_workers: Vec<AssignedWorker>,
    pub started_at: DateTime<Utc>,
    pub completed: bool,
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_kind: Option<String>,
    pub status: StageStatus,
}

/// Append-only log entry bracketing one worker's engagement in one stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub worker_id: String,
    pub order_id: String,
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_kind: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl ActivityRecord {
    pub fn open(
        worker_id: &str,
        order_id: &str,
        stage: &str,
        service_kind: Option<&str>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            worker_id: worker_id.to_string(),
            order_id: order_id.to_string(),
            stage: stage.to_string(),
            service_kind: service_kind.map(str::to_string),
            started_at,
            ended_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}
