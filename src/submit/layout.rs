// src/submit/layout.rs

//! On-disk layout of a batch directory.
//!
//! ```text
//! <root>/
//!   output/   program output, by convention of the job commands
//!   stderr/   standard error of every task
//!   stdout/   standard output of every task
//!   jobs/     generated job scripts, one per job name
//! ```

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::fs::FileSystem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLayout {
    root: PathBuf,
}

impl BatchLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }

    pub fn stdout_dir(&self) -> PathBuf {
        self.root.join("stdout")
    }

    pub fn stderr_dir(&self) -> PathBuf {
        self.root.join("stderr")
    }

    pub fn jobs_dir(&self) -> PathBuf {
        self.root.join("jobs")
    }

    pub fn script_path(&self, job: &str) -> PathBuf {
        self.jobs_dir().join(job)
    }

    /// Create whichever subdirectories do not exist yet.
    pub fn prepare(&self, fs: &dyn FileSystem) -> Result<()> {
        let dirs = [
            self.output_dir(),
            self.stderr_dir(),
            self.stdout_dir(),
            self.jobs_dir(),
        ];
        for dir in dirs {
            if !fs.is_dir(&dir) {
                debug!(dir = %dir.display(), "creating batch directory");
                fs.create_dir_all(&dir)?;
            }
        }
        Ok(())
    }

    /// Write the executable script for `job` and return its path.
    pub fn write_script(&self, fs: &dyn FileSystem, job: &str, body: &str) -> Result<PathBuf> {
        let path = self.script_path(job);
        fs.write(&path, render_script(body).as_bytes())?;
        fs.set_executable(&path)?;
        Ok(path)
    }
}

/// Full script file text: bash shebang plus the Grid Engine shell directive.
pub fn render_script(body: &str) -> String {
    format!("#!/bin/bash\n#$ -S /bin/bash\n{body}\n")
}
