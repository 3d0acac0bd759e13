// src/submit/port.rs

//! Pluggable submission port abstraction.
//!
//! The runtime hands every ready job to a `SubmissionPort` instead of
//! talking to the queueing system directly. This makes it easy to swap in a
//! recording port in tests while keeping the production implementation in
//! [`super::sge`].
//!
//! A dispatch is atomic from the runtime's point of view: it either returns a
//! [`DispatchHandle`] or a [`DispatchError`]. Retries, timeouts and the
//! formatting of scheduler flags are the port's business.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::job::{Job, JobName, ResourceSpec};

/// Everything a port needs to know to submit one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub name: JobName,
    /// Script body (for sweeps, including the decode preamble).
    pub script: String,
    pub resources: ResourceSpec,
    /// Names of jobs to hold on, all already submitted.
    pub dependencies: Vec<JobName>,
    pub task_count: u64,
    /// Submit as an indexed array `1..=task_count`.
    pub is_array: bool,
}

impl DispatchRequest {
    pub fn from_job(job: &Job) -> Self {
        Self {
            name: job.name().to_string(),
            script: job.script().to_string(),
            resources: job.resources().clone(),
            dependencies: job.dependencies().to_vec(),
            task_count: job.task_count(),
            is_array: job.is_array(),
        }
    }
}

/// Receipt for a dispatched job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchHandle {
    pub job: JobName,
    /// Identifier assigned by the queueing system, if it reported one.
    pub external_id: Option<String>,
    /// Command line used for the submission, for logs and dry runs.
    pub command_line: String,
}

/// The port failed to hand a job to the queueing system.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("dispatch of job '{job}' failed: {message}")]
pub struct DispatchError {
    pub job: JobName,
    pub message: String,
}

impl DispatchError {
    pub fn new(job: impl Into<JobName>, message: impl Into<String>) -> Self {
        Self {
            job: job.into(),
            message: message.into(),
        }
    }
}

pub type DispatchResult = std::result::Result<DispatchHandle, DispatchError>;

/// Boxed future returned by [`SubmissionPort::dispatch`].
pub type DispatchFuture<'a> = Pin<Box<dyn Future<Output = DispatchResult> + Send + 'a>>;

/// Trait abstracting how a ready job reaches the queueing system.
///
/// Production code uses [`super::SgeSubmitter`]; dry runs use
/// [`super::DryRunSubmitter`]; tests can record or fail dispatches.
pub trait SubmissionPort: Send + Sync {
    /// Dispatch one job whose dependencies have all been dispatched.
    fn dispatch<'a>(&'a self, request: &'a DispatchRequest) -> DispatchFuture<'a>;
}
