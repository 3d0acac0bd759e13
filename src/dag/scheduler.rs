// src/dag/scheduler.rs

use tracing::{debug, info, warn};

use crate::dag::batch::Batch;
use crate::dag::graph::DagGraph;
use crate::dag::state::{BatchState, JobStatus};
use crate::errors::{BatchError, Result};
use crate::job::{Job, JobName};

/// Wave-based dependency scheduler for one batch.
///
/// The scheduler itself is immutable: all progress lives in the
/// [`BatchState`] passed in by the caller. It is responsible for:
/// - computing the next wave of jobs whose dependencies are all submitted
/// - reporting a deadlock when pending jobs exist but none is ready
/// - recording dispatch outcomes in the status table
/// - skipping dependents of a job whose dispatch failed
#[derive(Debug)]
pub struct Scheduler<'a> {
    batch: &'a Batch,
    graph: DagGraph,
}

impl<'a> Scheduler<'a> {
    pub fn new(batch: &'a Batch) -> Self {
        Self {
            batch,
            graph: DagGraph::from_batch(batch),
        }
    }

    /// Whether every dependency of `job` has been submitted.
    pub fn deps_satisfied(&self, job: &Job, state: &BatchState) -> bool {
        job.dependencies().iter().all(|dep| state.is_submitted(dep))
    }

    /// Jobs eligible for dispatch right now, in batch declaration order.
    ///
    /// Returns `Ok(None)` once nothing is pending. Fails with
    /// [`BatchError::SchedulingDeadlock`] when jobs are pending but none of
    /// them can become ready.
    pub fn next_wave(&self, state: &BatchState) -> Result<Option<Vec<&'a Job>>> {
        let mut pending = 0usize;
        let mut ready = Vec::new();

        for job in self.batch.jobs() {
            if !state.is_pending(job.name()) {
                continue;
            }
            pending += 1;
            if self.deps_satisfied(job, state) {
                ready.push(job);
            }
        }

        if pending == 0 {
            return Ok(None);
        }

        if ready.is_empty() {
            return Err(self.deadlock(state));
        }

        debug!(
            ready = ready.len(),
            pending, "computed next wave of dispatchable jobs"
        );
        Ok(Some(ready))
    }

    /// Record a successful dispatch.
    pub fn record_submitted(&self, state: &mut BatchState, name: &str) {
        if state.mark_submitted(name) {
            info!(job = %name, "job submitted");
        }
    }

    /// Record a failed dispatch and skip everything downstream of it.
    ///
    /// Returns the jobs newly marked `Skipped`.
    pub fn record_failed(&self, state: &mut BatchState, name: &str) -> Vec<JobName> {
        if !state.mark_failed(name) {
            return Vec::new();
        }

        let mut skipped = Vec::new();
        for dependent in self.graph.transitive_dependents(name) {
            if state.mark_skipped(&dependent) {
                warn!(
                    job = %dependent,
                    failed = %name,
                    "skipping job because an upstream dispatch failed"
                );
                skipped.push(dependent);
            }
        }
        skipped
    }

    /// The full sequence of waves assuming every dispatch succeeds.
    ///
    /// Used for dry runs and diagnostics; runs the same readiness and
    /// deadlock logic as a real submission.
    pub fn plan(&self) -> Result<Vec<Vec<&'a Job>>> {
        let mut state = BatchState::new(self.batch);
        let mut waves = Vec::new();

        while let Some(wave) = self.next_wave(&state)? {
            for job in &wave {
                state.mark_submitted(job.name());
            }
            waves.push(wave);
        }

        Ok(waves)
    }

    fn deadlock(&self, state: &BatchState) -> BatchError {
        let mut stuck: Vec<JobName> = self
            .batch
            .jobs()
            .iter()
            .filter(|job| state.status_of(job.name()) == Some(JobStatus::Pending))
            .map(|job| job.name().to_string())
            .collect();
        stuck.sort();

        let cycles = self.graph.cycles_among(&stuck);
        warn!(?stuck, ?cycles, "no pending job can become ready; giving up");

        BatchError::SchedulingDeadlock { stuck, cycles }
    }
}
