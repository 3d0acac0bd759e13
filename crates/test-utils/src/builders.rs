#![allow(dead_code)]

use std::collections::BTreeMap;

use qbatch::config::{ConfigFile, ConfigSection, DefaultSection, JobConfig, RawConfigFile};
use qbatch::dag::Batch;
use qbatch::job::{Job, ResourceSpec, SweepVariable};
use qbatch::types::DispatchFailurePolicy;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                default: DefaultSection::default(),
                job: BTreeMap::new(),
            },
        }
    }

    pub fn with_job(mut self, name: &str, job: JobConfig) -> Self {
        self.config.job.insert(name.to_string(), job);
        self
    }

    pub fn with_default_queue(mut self, queue: &str) -> Self {
        self.config.default.queue = Some(queue.to_string());
        self
    }

    pub fn with_default_mem_free(mut self, mem: &str) -> Self {
        self.config.default.mem_free = Some(mem.to_string());
        self
    }

    pub fn with_policy(mut self, policy: DispatchFailurePolicy) -> Self {
        self.config.config.on_dispatch_failure = policy;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `JobConfig`.
pub struct JobConfigBuilder {
    job: JobConfig,
}

impl JobConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            job: JobConfig {
                cmd: cmd.to_string(),
                after: vec![],
                queue: None,
                mem_free: None,
                priority: None,
                project: None,
                resources: None,
                sweep: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.job.after.push(dep.to_string());
        self
    }

    pub fn queue(mut self, queue: &str) -> Self {
        self.job.queue = Some(queue.to_string());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.job.priority = Some(priority);
        self
    }

    pub fn resource(mut self, rsc: &str) -> Self {
        self.job
            .resources
            .get_or_insert_with(Vec::new)
            .push(rsc.to_string());
        self
    }

    /// Append a sweep variable; declaration order is kept.
    pub fn sweep(mut self, name: &str, values: &[&str]) -> Self {
        let values = values
            .iter()
            .map(|v| toml::Value::String(v.to_string()))
            .collect();
        self.job
            .sweep
            .get_or_insert_with(toml::Table::new)
            .insert(name.to_string(), toml::Value::Array(values));
        self
    }

    pub fn build(self) -> JobConfig {
        self.job
    }
}

/// Builder for a `Batch` of plain jobs given as `(name, deps)` pairs.
///
/// Skips config validation so that cycles and self-references reach the
/// scheduler.
pub struct BatchBuilder {
    jobs: Vec<Job>,
}

impl BatchBuilder {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    pub fn plain(mut self, name: &str, deps: &[&str]) -> Self {
        let mut job = Job::plain(name, format!("echo {name}"), ResourceSpec::default());
        for dep in deps {
            job.depends_on(*dep);
        }
        self.jobs.push(job);
        self
    }

    pub fn sweep(mut self, name: &str, deps: &[&str], vars: &[(&str, &[&str])]) -> Self {
        let vars = vars
            .iter()
            .map(|(n, vals)| SweepVariable::new(*n, vals.iter().copied()))
            .collect();
        let mut job = Job::sweep(name, format!("echo {name}"), ResourceSpec::default(), vars)
            .expect("valid sweep");
        for dep in deps {
            job.depends_on(*dep);
        }
        self.jobs.push(job);
        self
    }

    pub fn jobs(self) -> Vec<Job> {
        self.jobs
    }

    pub fn build(self) -> Batch {
        Batch::new(self.jobs).expect("Failed to build valid batch from builder")
    }
}

impl Default for BatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}
