// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::job::SweepError;
use crate::submit::DispatchError;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid sweep for job '{job}': {reason}")]
    InvalidSweep { job: String, reason: SweepError },

    #[error("Invalid job name '{0}' (expected letters, digits, '_', '.', '-', not starting with a digit)")]
    InvalidJobName(String),

    #[error("Duplicate job name in batch: {0}")]
    DuplicateJob(String),

    #[error("Job '{job}' depends on '{dependency}', which is not part of the batch")]
    DanglingDependency { job: String, dependency: String },

    #[error("Scheduling deadlock: no progress possible for jobs [{}]{}", .stuck.join(", "), format_cycles(.cycles))]
    SchedulingDeadlock {
        /// Every job still pending when the scheduler stopped, sorted.
        stuck: Vec<String>,
        /// Dependency cycles found among the stuck jobs.
        cycles: Vec<Vec<String>>,
    },

    #[error("Task index {index} outside of 1..={task_count}")]
    TaskIndexOutOfRange { index: u64, task_count: u64 },

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_cycles(cycles: &[Vec<String>]) -> String {
    if cycles.is_empty() {
        return String::new();
    }
    let rendered: Vec<String> = cycles
        .iter()
        .map(|c| format!("{{{}}}", c.join(", ")))
        .collect();
    format!("; cycles: {}", rendered.join("; "))
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BatchError>;
