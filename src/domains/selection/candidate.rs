use crate::domains::assignment::Worker;
use serde::{Deserialize, Serialize};

/// Read-only status projection of a worker record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Available,
    Busy,
    Inactive,
}

impl From<&Worker> for WorkerStatus {
    fn from(worker: &Worker) -> Self {
        if !worker.active {
            WorkerStatus::Inactive
        } else if worker.busy {
            WorkerStatus::Busy
        } else {
            WorkerStatus::Available
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkerCandidate {
    pub id: String,
    pub name: String,
    pub specialties: Vec<String>,
    pub status: WorkerStatus,
}

impl WorkerCandidate {
    pub fn from_worker(id: &str, worker: &Worker) -> Self {
        Self {
            id: id.to_string(),
            name: worker.name.clone(),
            specialties: worker.specialties.clone(),
            status: WorkerStatus::from(worker),
        }
    }

    pub fn has_specialty(&self, specialty: &str) -> bool {
        self.specialties.iter().any(|s| s == specialty)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateFilter {
    pub specialty: Option<String>,
    pub only_available: bool,
}

impl CandidateFilter {
    pub fn accepts(&self, candidate: &WorkerCandidate) -> bool {
        if let Some(specialty) = &self.specialty {
            if !candidate.has_specialty(specialty) {
                return false;
            }
        }
        !self.only_available || candidate.status == WorkerStatus::Available
    }
}
