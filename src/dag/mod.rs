// src/dag/mod.rs

//! Batch representation and dependency scheduling.
//!
//! - [`batch`] owns the jobs of one run and performs pre-flight validation.
//! - [`state`] is the job → status table for that run.
//! - [`graph`] holds dependency adjacency and cycle diagnostics.
//! - [`scheduler`] computes dispatch waves and records outcomes.

pub mod batch;
pub mod graph;
pub mod scheduler;
pub mod state;

pub use batch::Batch;
pub use graph::DagGraph;
pub use scheduler::Scheduler;
pub use state::{BatchState, JobStatus};
