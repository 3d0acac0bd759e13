// src/dag/state.rs

//! Per-batch submission status table.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dag::batch::Batch;
use crate::job::JobName;

/// Submission state of one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Not dispatched yet.
    Pending,
    /// Handed to the queueing system. Terminal.
    Submitted,
    /// Dispatch was attempted and failed. Terminal.
    Failed,
    /// Never dispatched because a dependency failed or was skipped. Terminal.
    Skipped,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

/// Mapping from job name to [`JobStatus`] for one batch.
///
/// Every job starts `Pending` and moves at most once, to one of the terminal
/// states. Illegal transitions are refused and logged.
#[derive(Debug, Clone)]
pub struct BatchState {
    statuses: HashMap<JobName, JobStatus>,
}

impl BatchState {
    pub fn new(batch: &Batch) -> Self {
        let statuses = batch
            .jobs()
            .iter()
            .map(|job| (job.name().to_string(), JobStatus::Pending))
            .collect();
        Self { statuses }
    }

    pub fn status_of(&self, name: &str) -> Option<JobStatus> {
        self.statuses.get(name).copied()
    }

    pub fn is_submitted(&self, name: &str) -> bool {
        self.status_of(name) == Some(JobStatus::Submitted)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        self.status_of(name) == Some(JobStatus::Pending)
    }

    /// Whether no job is left `Pending`.
    pub fn all_settled(&self) -> bool {
        self.statuses.values().all(|s| s.is_terminal())
    }

    pub fn count(&self, status: JobStatus) -> usize {
        self.statuses.values().filter(|&&s| s == status).count()
    }

    pub fn mark_submitted(&mut self, name: &str) -> bool {
        self.transition(name, JobStatus::Submitted)
    }

    pub fn mark_failed(&mut self, name: &str) -> bool {
        self.transition(name, JobStatus::Failed)
    }

    pub fn mark_skipped(&mut self, name: &str) -> bool {
        self.transition(name, JobStatus::Skipped)
    }

    /// Move `name` from `Pending` to `to`. Returns `false` (and changes
    /// nothing) if the job is unknown or already terminal.
    fn transition(&mut self, name: &str, to: JobStatus) -> bool {
        match self.statuses.get_mut(name) {
            Some(status @ JobStatus::Pending) => {
                debug!(job = %name, ?to, "job status updated");
                *status = to;
                true
            }
            Some(current) => {
                warn!(job = %name, ?current, ?to, "refusing status change of settled job");
                false
            }
            None => {
                warn!(job = %name, "status change for unknown job; ignoring");
                false
            }
        }
    }
}
