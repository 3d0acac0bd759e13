// src/engine/runtime.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::dag::{Batch, BatchState, Scheduler};
use crate::errors::{BatchError, Result};
use crate::job::JobName;
use crate::submit::{DispatchError, DispatchRequest, DispatchResult, SubmissionPort};
use crate::types::DispatchFailurePolicy;

use super::{BatchReport, SubmitOptions};

/// Drives the wave scheduler for one batch and delegates every dispatch to a
/// `SubmissionPort`.
///
/// All dispatches of a wave are joined before the next wave is computed, and
/// the status table is only touched here, after the join, so the ordering
/// guarantee holds even when a wave is dispatched in parallel.
pub struct Runtime<P: SubmissionPort + 'static> {
    port: Arc<P>,
    options: SubmitOptions,
}

impl<P: SubmissionPort + 'static> fmt::Debug for Runtime<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<P: SubmissionPort + 'static> Runtime<P> {
    pub fn new(port: P, options: SubmitOptions) -> Self {
        Self::with_shared_port(Arc::new(port), options)
    }

    /// Use a port the caller keeps a handle to (e.g. to inspect it later).
    pub fn with_shared_port(port: Arc<P>, options: SubmitOptions) -> Self {
        Self { port, options }
    }

    /// Submit the whole batch.
    ///
    /// - Fails with `SchedulingDeadlock` if pending jobs can never become
    ///   ready; jobs dispatched in earlier waves stay submitted.
    /// - With `DispatchFailurePolicy::Abort`, the first failed dispatch of a
    ///   wave is returned once the wave has been fully observed.
    /// - With `DispatchFailurePolicy::Continue`, failures and the jobs skipped
    ///   because of them are collected in the returned report.
    pub async fn run(&self, batch: &Batch) -> Result<BatchReport> {
        info!(jobs = batch.len(), "starting batch submission");

        let scheduler = Scheduler::new(batch);
        let mut state = BatchState::new(batch);
        let mut report = BatchReport::default();

        while let Some(wave) = scheduler.next_wave(&state)? {
            let wave_no = report.waves.len() + 1;
            let names: Vec<JobName> = wave.iter().map(|job| job.name().to_string()).collect();
            info!(wave = wave_no, jobs = ?names, "dispatching wave");

            let requests: Vec<DispatchRequest> =
                wave.iter().map(|job| DispatchRequest::from_job(job)).collect();
            report.waves.push(names);

            let results = self.dispatch_wave(requests).await;

            let mut first_failure: Option<DispatchError> = None;
            for (name, result) in results {
                match result {
                    Ok(handle) => {
                        scheduler.record_submitted(&mut state, &name);
                        report.handles.push(handle);
                    }
                    Err(err) => {
                        error!(job = %name, error = %err, "dispatch failed");
                        match self.options.on_dispatch_failure {
                            DispatchFailurePolicy::Abort => {
                                state.mark_failed(&name);
                                first_failure.get_or_insert(err);
                            }
                            DispatchFailurePolicy::Continue => {
                                let skipped = scheduler.record_failed(&mut state, &name);
                                report.skipped.extend(skipped);
                                report.failed.push(err);
                            }
                        }
                    }
                }
            }

            if let Some(err) = first_failure {
                warn!(
                    wave = wave_no,
                    submitted = report.handles.len(),
                    "aborting batch after failed dispatch"
                );
                return Err(BatchError::Dispatch(err));
            }
        }

        info!(
            waves = report.waves.len(),
            submitted = report.handles.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "batch submission finished"
        );
        Ok(report)
    }

    /// Dispatch one wave and return the outcomes in request order.
    async fn dispatch_wave(&self, requests: Vec<DispatchRequest>) -> Vec<(JobName, DispatchResult)> {
        let limit = self.options.max_parallel_dispatch.max(1);

        if limit == 1 || requests.len() == 1 {
            let mut results = Vec::with_capacity(requests.len());
            for req in requests {
                let result = self.port.dispatch(&req).await;
                results.push((req.name, result));
            }
            return results;
        }

        let order: Vec<JobName> = requests.iter().map(|r| r.name.clone()).collect();
        let mut outcomes: HashMap<JobName, DispatchResult> = HashMap::with_capacity(requests.len());
        let mut queue = requests.into_iter();

        loop {
            let chunk: Vec<DispatchRequest> = queue.by_ref().take(limit).collect();
            if chunk.is_empty() {
                break;
            }
            debug!(in_flight = chunk.len(), "dispatching chunk concurrently");

            let mut set = JoinSet::new();
            let mut ids = HashMap::with_capacity(chunk.len());

            for req in chunk {
                let port = Arc::clone(&self.port);
                let name = req.name.clone();
                let handle = set.spawn(async move {
                    let result = port.dispatch(&req).await;
                    (req.name, result)
                });
                ids.insert(handle.id(), name);
            }

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((name, result)) => {
                        outcomes.insert(name, result);
                    }
                    Err(join_err) => {
                        let name = ids.get(&join_err.id()).cloned().unwrap_or_default();
                        error!(job = %name, error = %join_err, "dispatch task did not finish");
                        outcomes.insert(
                            name.clone(),
                            Err(DispatchError::new(name, format!("dispatch task failed: {join_err}"))),
                        );
                    }
                }
            }
        }

        order
            .into_iter()
            .filter_map(|name| outcomes.remove(&name).map(|r| (name, r)))
            .collect()
    }
}
