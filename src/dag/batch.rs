// src/dag/batch.rs

//! The set of jobs submitted together in one scheduling run.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::model::ConfigFile;
use crate::errors::{BatchError, Result};
use crate::job::{Job, JobName};

static JOB_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.-]*$").expect("static regex"));

/// Whether `name` is acceptable as a job name (and script file name).
pub fn is_valid_job_name(name: &str) -> bool {
    JOB_NAME.is_match(name)
}

/// Owns every job of one batch, in declaration order.
///
/// Construction is the pre-flight check: names must be valid and unique, and
/// every dependency must name a job of the same batch. Cycles are *not*
/// rejected here; the scheduler reports them as a deadlock.
#[derive(Debug, Clone)]
pub struct Batch {
    jobs: Vec<Job>,
    index: HashMap<JobName, usize>,
}

impl Batch {
    pub fn new(jobs: Vec<Job>) -> Result<Self> {
        let mut index = HashMap::with_capacity(jobs.len());

        for (pos, job) in jobs.iter().enumerate() {
            if !is_valid_job_name(job.name()) {
                return Err(BatchError::InvalidJobName(job.name().to_string()));
            }
            if index.insert(job.name().to_string(), pos).is_some() {
                return Err(BatchError::DuplicateJob(job.name().to_string()));
            }
        }

        for job in &jobs {
            for dep in job.dependencies() {
                if !index.contains_key(dep) {
                    return Err(BatchError::DanglingDependency {
                        job: job.name().to_string(),
                        dependency: dep.clone(),
                    });
                }
            }
        }

        debug!(jobs = jobs.len(), "batch passed pre-flight checks");
        Ok(Self { jobs, index })
    }

    /// Build the batch described by a validated [`ConfigFile`].
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut jobs = Vec::with_capacity(cfg.job.len());

        for (name, jc) in cfg.job.iter() {
            let resources = jc.resource_spec(&cfg.default);
            let mut job = match jc.sweep_variables()? {
                Some(vars) => Job::sweep(name.clone(), jc.cmd.clone(), resources, vars)?,
                None => Job::plain(name.clone(), jc.cmd.clone(), resources),
            };
            for dep in &jc.after {
                job.depends_on(dep.clone());
            }
            jobs.push(job);
        }

        Self::new(jobs)
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn get(&self, name: &str) -> Option<&Job> {
        self.index.get(name).map(|&pos| &self.jobs[pos])
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
