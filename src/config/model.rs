// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::errors::{BatchError, Result};
use crate::job::{ResourceSpec, SweepVariable};
use crate::types::DispatchFailurePolicy;

/// Batch file exactly as deserialized from TOML, before validation.
///
/// ```toml
/// [config]
/// qsub = "qsub"
/// on_dispatch_failure = "abort"
///
/// [default]
/// queue = "my.q"
/// mem_free = "20M"
///
/// [job.prepare]
/// cmd = "echo prepare"
///
/// [job.greet]
/// cmd = "echo $a $b"
/// after = ["prepare"]
/// sweep = { a = ["Hello", "Goodbye"], b = ["World", "Earth"] }
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Submission behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Resource defaults from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// All jobs from `[job.<name>]`, keyed by job name.
    #[serde(default)]
    pub job: BTreeMap<String, JobConfig>,
}

/// Validated batch file. Only obtainable through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub default: DefaultSection,
    pub job: BTreeMap<String, JobConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        default: DefaultSection,
        job: BTreeMap<String, JobConfig>,
    ) -> Self {
        Self {
            config,
            default,
            job,
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Program invoked to submit a job script.
    #[serde(default = "default_qsub")]
    pub qsub: String,

    /// Optional architecture request, passed as `-l arch=<arch>`.
    #[serde(default)]
    pub arch: Option<String>,

    /// Extra arguments appended verbatim to every submission.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// `"abort"` (default) or `"continue"`.
    #[serde(default)]
    pub on_dispatch_failure: DispatchFailurePolicy,

    /// How many dispatches of one wave may be in flight at once.
    #[serde(default = "default_max_parallel_dispatch")]
    pub max_parallel_dispatch: usize,
}

fn default_qsub() -> String {
    "qsub".to_string()
}

fn default_max_parallel_dispatch() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            qsub: default_qsub(),
            arch: None,
            extra_args: Vec::new(),
            on_dispatch_failure: DispatchFailurePolicy::default(),
            max_parallel_dispatch: default_max_parallel_dispatch(),
        }
    }
}

/// `[default]` section: resource requests for jobs that do not set their own.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DefaultSection {
    #[serde(default)]
    pub queue: Option<String>,

    #[serde(default)]
    pub mem_free: Option<String>,

    #[serde(default)]
    pub priority: Option<i32>,

    #[serde(default)]
    pub project: Option<String>,

    #[serde(default)]
    pub resources: Vec<String>,
}

/// `[job.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    /// The command (script body) to execute.
    pub cmd: String,

    /// Jobs that must be submitted before this one.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub queue: Option<String>,

    #[serde(default)]
    pub mem_free: Option<String>,

    #[serde(default)]
    pub priority: Option<i32>,

    #[serde(default)]
    pub project: Option<String>,

    /// If set, replaces `default.resources` entirely.
    #[serde(default)]
    pub resources: Option<Vec<String>>,

    /// Sweep variables in declaration order. Presence turns the job into an
    /// array job, even if the table is empty.
    #[serde(default)]
    pub sweep: Option<toml::Table>,
}

impl JobConfig {
    /// Effective resource requests given the `[default]` section.
    pub fn resource_spec(&self, defaults: &DefaultSection) -> ResourceSpec {
        ResourceSpec {
            queue: self.queue.clone().or_else(|| defaults.queue.clone()),
            mem_free: self.mem_free.clone().or_else(|| defaults.mem_free.clone()),
            priority: self.priority.or(defaults.priority),
            project: self.project.clone().or_else(|| defaults.project.clone()),
            resources: self
                .resources
                .clone()
                .unwrap_or_else(|| defaults.resources.clone()),
        }
    }

    /// Sweep variables with values rendered as text, in declaration order.
    ///
    /// Returns `Ok(None)` for a plain job. Every variable must map to an
    /// array of strings, integers, floats or booleans.
    pub fn sweep_variables(&self) -> Result<Option<Vec<SweepVariable>>> {
        let Some(table) = &self.sweep else {
            return Ok(None);
        };

        let mut vars = Vec::with_capacity(table.len());
        for (name, value) in table.iter() {
            let toml::Value::Array(items) = value else {
                return Err(BatchError::ConfigError(format!(
                    "sweep variable '{name}' must be an array of values"
                )));
            };

            let values = items
                .iter()
                .map(|item| scalar_to_string(item).ok_or_else(|| {
                    BatchError::ConfigError(format!(
                        "sweep variable '{name}' contains a non-scalar value: {item}"
                    ))
                }))
                .collect::<Result<Vec<_>>>()?;

            vars.push(SweepVariable::new(name.clone(), values));
        }

        Ok(Some(vars))
    }
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}
