// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::dag::batch::is_valid_job_name;
use crate::errors::{BatchError, Result};
use crate::job::Sweep;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::BatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.default, raw.job))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_jobs(cfg)?;
    validate_global_config(cfg)?;
    validate_job_names(cfg)?;
    validate_job_dependencies(cfg)?;
    validate_sweeps(cfg)?;
    Ok(())
}

fn ensure_has_jobs(cfg: &RawConfigFile) -> Result<()> {
    if cfg.job.is_empty() {
        return Err(BatchError::ConfigError(
            "batch file must contain at least one [job.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    // on_dispatch_failure is strongly typed and validated during
    // deserialization.

    if cfg.config.qsub.trim().is_empty() {
        return Err(BatchError::ConfigError(
            "[config].qsub must name a program".to_string(),
        ));
    }

    if cfg.config.max_parallel_dispatch == 0 {
        return Err(BatchError::ConfigError(
            "[config].max_parallel_dispatch must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_job_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.job.keys() {
        if !is_valid_job_name(name) {
            return Err(BatchError::InvalidJobName(name.clone()));
        }
    }
    Ok(())
}

/// Every `after` entry must name a job of this file. Self-references and
/// cycles are left to the scheduler, which reports them as a deadlock.
fn validate_job_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, job) in cfg.job.iter() {
        for dep in job.after.iter() {
            if !cfg.job.contains_key(dep) {
                return Err(BatchError::DanglingDependency {
                    job: name.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_sweeps(cfg: &RawConfigFile) -> Result<()> {
    for (name, job) in cfg.job.iter() {
        if let Some(vars) = job.sweep_variables()? {
            Sweep::new(vars).map_err(|reason| BatchError::InvalidSweep {
                job: name.clone(),
                reason,
            })?;
        }
    }
    Ok(())
}
