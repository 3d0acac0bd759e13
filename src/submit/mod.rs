// src/submit/mod.rs

//! Submission layer: how a ready job reaches the queueing system.
//!
//! - [`port`] provides the `SubmissionPort` trait and the request, handle
//!   and error types exchanged with the runtime.
//! - [`layout`] describes the batch directory (script and log locations).
//! - [`sge`] is the Grid Engine port that writes scripts and runs `qsub`.
//! - [`dry_run`] prints the `qsub` commands without running anything.

pub mod dry_run;
pub mod layout;
pub mod port;
pub mod sge;

pub use dry_run::DryRunSubmitter;
pub use layout::BatchLayout;
pub use port::{
    DispatchError, DispatchFuture, DispatchHandle, DispatchRequest, DispatchResult,
    SubmissionPort,
};
pub use sge::{SgeOptions, SgeSubmitter};
