// src/engine/mod.rs

//! Submission engine.
//!
//! The pure wave logic lives in [`crate::dag::Scheduler`]; the async shell in
//! [`runtime`] drives it: compute a wave, dispatch every job of the wave
//! through a [`crate::submit::SubmissionPort`], record the outcomes, repeat.

use crate::job::JobName;
use crate::submit::{DispatchError, DispatchHandle};
use crate::types::DispatchFailurePolicy;

pub mod runtime;

pub use runtime::Runtime;

/// Options used by the runtime for one batch.
#[derive(Debug, Clone, Copy)]
pub struct SubmitOptions {
    pub on_dispatch_failure: DispatchFailurePolicy,
    /// Maximum number of dispatches of one wave in flight at once.
    pub max_parallel_dispatch: usize,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            on_dispatch_failure: DispatchFailurePolicy::default(),
            max_parallel_dispatch: 1,
        }
    }
}

/// What happened to a batch that ran to the end.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Job names per wave, in dispatch order.
    pub waves: Vec<Vec<JobName>>,
    /// Successful dispatches, in the order they were recorded.
    pub handles: Vec<DispatchHandle>,
    /// Failed dispatches (only with `DispatchFailurePolicy::Continue`).
    pub failed: Vec<DispatchError>,
    /// Jobs never dispatched because something upstream failed.
    pub skipped: Vec<JobName>,
}

impl BatchReport {
    pub fn submitted(&self) -> impl Iterator<Item = &str> {
        self.handles.iter().map(|h| h.job.as_str())
    }

    /// Whether every job of the batch was submitted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}
