use crate::common::{DocumentStore, DomainResult};
use crate::domains::assignment::Worker;
use crate::domains::selection::{CandidateFilter, WorkerCandidate};
use crate::domains::{messages, DynNotifier};

/// Tentative worker selection held by a caller before it confirms an assignment.
pub struct SelectionState {
    initial: Vec<String>,
    selected: Vec<String>,
    notifier: DynNotifier,
}

impl SelectionState {
    pub fn new(initial: &[String], notifier: DynNotifier) -> Self {
        Self {
            initial: initial.to_vec(),
            selected: dedup(initial),
            notifier,
        }
    }

    /// Resets the selection when the externally supplied initial list changes.
    /// Returns `true` if a resync happened.
    pub fn sync_initial(&mut self, initial: &[String]) -> bool {
        if self.initial.as_slice() == initial {
            return false;
        }
        self.initial = initial.to_vec();
        self.selected = dedup(initial);
        true
    }

    pub fn toggle(&mut self, id: &str) {
        if let Some(pos) = self.selected.iter().position(|s| s == id) {
            self.selected.remove(pos);
        } else {
            self.selected.push(id.to_string());
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.iter().any(|s| s == id)
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn filter<'a>(
        &self,
        candidates: &'a [WorkerCandidate],
        filter: &CandidateFilter,
    ) -> Vec<&'a WorkerCandidate> {
        candidates.iter().filter(|c| filter.accepts(c)).collect()
    }

    /// Hands the selection to `on_confirm` as parallel id and display-name lists.
    /// Ids without a matching candidate are passed with the id as their name.
    pub fn confirm<F>(&self, candidates: &[WorkerCandidate], on_confirm: Option<F>) -> bool
    where
        F: FnOnce(Vec<String>, Vec<String>),
    {
        if self.selected.is_empty() {
            self.notifier.error(messages::NOTHING_SELECTED);
            return false;
        }
        let Some(on_confirm) = on_confirm else {
            self.notifier.error(messages::NO_CONFIRM_HANDLER);
            return false;
        };

        let names = self
            .selected
            .iter()
            .map(|id| {
                candidates
                    .iter()
                    .find(|c| &c.id == id)
                    .map(|c| c.name.clone())
                    .unwrap_or_else(|| id.clone())
            })
            .collect();
        on_confirm(self.selected.clone(), names);
        true
    }
}

/// Reads every worker and projects it into a selectable candidate.
pub async fn load_candidates(
    store: &dyn DocumentStore,
    workers_collection: &str,
) -> DomainResult<Vec<WorkerCandidate>> {
    let mut candidates = store
        .query(workers_collection, &[])
        .await?
        .into_iter()
        .map(|(id, data)| {
            let worker: Worker = serde_json::from_value(data)?;
            Ok(WorkerCandidate::from_worker(&id, &worker))
        })
        .collect::<DomainResult<Vec<_>>>()?;
    candidates.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    Ok(candidates)
}

fn dedup(ids: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}
