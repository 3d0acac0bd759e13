// src/job/entity.rs

use crate::errors::{BatchError, Result};
use crate::job::sweep::{Sweep, SweepVariable};

/// Canonical job name type; also the name handed to the queueing system.
pub type JobName = String;

/// Resource requests passed through untouched to the submission port.
///
/// The scheduler never looks inside; only the port decides how these map onto
/// command-line flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSpec {
    pub queue: Option<String>,
    pub mem_free: Option<String>,
    pub priority: Option<i32>,
    pub project: Option<String>,
    /// Free-form resource strings, each passed as its own `-l` request.
    pub resources: Vec<String>,
}

/// Whether a job runs once or as an indexed array over a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    Plain,
    Sweep(Sweep),
}

/// One submittable unit of a batch.
///
/// Dependencies are stored by name; the batch owns every job and resolves
/// the names before anything is dispatched. Submission status is not stored
/// here but in the batch's status table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    name: JobName,
    command: String,
    resources: ResourceSpec,
    dependencies: Vec<JobName>,
    kind: JobKind,
    /// Script body, computed once at construction.
    script: String,
}

impl Job {
    pub fn plain(
        name: impl Into<JobName>,
        command: impl Into<String>,
        resources: ResourceSpec,
    ) -> Self {
        let command = command.into();
        Self {
            name: name.into(),
            script: command.clone(),
            command,
            resources,
            dependencies: Vec::new(),
            kind: JobKind::Plain,
        }
    }

    /// Build an array job over `variables`.
    ///
    /// Fails with [`BatchError::InvalidSweep`] if any variable has no values.
    pub fn sweep(
        name: impl Into<JobName>,
        command: impl Into<String>,
        resources: ResourceSpec,
        variables: Vec<SweepVariable>,
    ) -> Result<Self> {
        let name = name.into();
        let command = command.into();

        let sweep = Sweep::new(variables).map_err(|reason| BatchError::InvalidSweep {
            job: name.clone(),
            reason,
        })?;

        Ok(Self {
            script: sweep.expand(&command),
            name,
            command,
            resources,
            dependencies: Vec::new(),
            kind: JobKind::Sweep(sweep),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn resources(&self) -> &ResourceSpec {
        &self.resources
    }

    pub fn dependencies(&self) -> &[JobName] {
        &self.dependencies
    }

    pub fn sweep_spec(&self) -> Option<&Sweep> {
        match &self.kind {
            JobKind::Plain => None,
            JobKind::Sweep(sweep) => Some(sweep),
        }
    }

    /// Number of tasks the queueing system will run for this job.
    pub fn task_count(&self) -> u64 {
        match &self.kind {
            JobKind::Plain => 1,
            JobKind::Sweep(sweep) => sweep.task_count(),
        }
    }

    /// Whether the job is submitted as an indexed array (`-t 1:N`).
    pub fn is_array(&self) -> bool {
        matches!(self.kind, JobKind::Sweep(_))
    }

    /// Script body to materialize: the command itself, or for a sweep the
    /// decode preamble followed by the command.
    pub fn script(&self) -> &str {
        &self.script
    }

    /// Make this job wait for `other`. No cycle check happens here.
    pub fn add_dependency(&mut self, other: &Job) {
        self.depends_on(other.name.clone());
    }

    /// Same as [`Job::add_dependency`], by name. Repeated names are kept once.
    pub fn depends_on(&mut self, name: impl Into<JobName>) {
        let name = name.into();
        if !self.dependencies.contains(&name) {
            self.dependencies.push(name);
        }
    }
}
