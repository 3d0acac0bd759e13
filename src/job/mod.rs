// src/job/mod.rs

//! Job entities.
//!
//! - [`entity`] defines [`Job`], its resource requests and its kind
//!   (plain or sweep).
//! - [`sweep`] holds the mixed-radix encoding of parameter sweeps and the
//!   bash decode preamble generated for array jobs.

pub mod entity;
pub mod sweep;

pub use entity::{Job, JobKind, JobName, ResourceSpec};
pub use sweep::{Sweep, SweepError, SweepVariable};
