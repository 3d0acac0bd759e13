// src/submit/sge.rs

//! Grid Engine submission through `qsub`.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, LazyLock};

use anyhow::Context;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::model::ConfigSection;
use crate::fs::FileSystem;
use crate::submit::layout::BatchLayout;
use crate::submit::port::{
    DispatchError, DispatchFuture, DispatchHandle, DispatchRequest, DispatchResult,
    SubmissionPort,
};

/// `Your job 123 ("name") has been submitted` or
/// `Your job-array 123.1-6:1 ("name") has been submitted`.
static SUBMITTED_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Your job(?:-array)? (\d+)").expect("static regex"));

/// Settings shared by every `qsub` invocation of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SgeOptions {
    /// Program to run, normally `qsub`.
    pub qsub: String,
    /// Optional `-l arch=<arch>` request.
    pub arch: Option<String>,
    /// Appended verbatim after the generated flags.
    pub extra_args: Vec<String>,
}

impl Default for SgeOptions {
    fn default() -> Self {
        Self {
            qsub: "qsub".to_string(),
            arch: None,
            extra_args: Vec::new(),
        }
    }
}

impl From<&ConfigSection> for SgeOptions {
    fn from(cfg: &ConfigSection) -> Self {
        Self {
            qsub: cfg.qsub.clone(),
            arch: cfg.arch.clone(),
            extra_args: cfg.extra_args.clone(),
        }
    }
}

/// Build the `qsub` argument list for one job, script path last.
pub fn qsub_args(
    request: &DispatchRequest,
    layout: &BatchLayout,
    options: &SgeOptions,
    script_path: &Path,
) -> Vec<String> {
    let res = &request.resources;
    let mut args = vec![
        "-N".to_string(),
        request.name.clone(),
        "-o".to_string(),
        layout.stdout_dir().display().to_string(),
        "-e".to_string(),
        layout.stderr_dir().display().to_string(),
    ];

    if let Some(mem) = &res.mem_free {
        args.push("-l".to_string());
        args.push(format!("mem_free={mem}"));
    }
    if let Some(arch) = &options.arch {
        args.push("-l".to_string());
        args.push(format!("arch={arch}"));
    }
    if let Some(queue) = &res.queue {
        args.push("-q".to_string());
        args.push(queue.clone());
    }
    if request.is_array {
        args.push("-t".to_string());
        args.push(format!("1:{}", request.task_count));
    }
    if !request.dependencies.is_empty() {
        args.push("-hold_jid".to_string());
        args.push(request.dependencies.join(","));
    }
    if let Some(priority) = res.priority {
        args.push("-p".to_string());
        args.push(priority.to_string());
    }
    if let Some(project) = &res.project {
        args.push("-P".to_string());
        args.push(project.clone());
    }
    for rsc in &res.resources {
        args.push("-l".to_string());
        args.push(rsc.clone());
    }

    args.extend(options.extra_args.iter().cloned());
    args.push(script_path.display().to_string());
    args
}

/// Human-readable command line, quoting arguments that need it.
pub fn render_command_line(program: &str, args: &[String]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(program.to_string());
    for arg in args {
        let plain = !arg.is_empty()
            && arg
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "-_.,:=/+@%".contains(c));
        if plain {
            parts.push(arg.clone());
        } else {
            parts.push(format!("'{}'", arg.replace('\'', r"'\''")));
        }
    }
    parts.join(" ")
}

/// Extract the job id from `qsub` output, if present.
pub fn parse_job_id(stdout: &str) -> Option<String> {
    SUBMITTED_ID
        .captures(stdout)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Production submission port: writes the job script into the batch layout
/// and runs `qsub` on it.
#[derive(Debug, Clone)]
pub struct SgeSubmitter {
    layout: BatchLayout,
    options: SgeOptions,
    fs: Arc<dyn FileSystem>,
}

impl SgeSubmitter {
    pub fn new(layout: BatchLayout, options: SgeOptions, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            layout,
            options,
            fs,
        }
    }

    async fn submit(&self, request: &DispatchRequest) -> DispatchResult {
        let script_path = self
            .layout
            .write_script(self.fs.as_ref(), &request.name, &request.script)
            .map_err(|e| DispatchError::new(&request.name, format!("{e:#}")))?;

        let args = qsub_args(request, &self.layout, &self.options, &script_path);
        let command_line = render_command_line(&self.options.qsub, &args);

        info!(job = %request.name, cmd = %command_line, "submitting job");

        let output = Command::new(&self.options.qsub)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("spawning '{}'", self.options.qsub))
            .map_err(|e| DispatchError::new(&request.name, format!("{e:#}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            warn!(
                job = %request.name,
                exit_code = code,
                stderr = %stderr.trim(),
                "qsub rejected job"
            );
            return Err(DispatchError::new(
                &request.name,
                format!("{} exited with code {code}: {}", self.options.qsub, stderr.trim()),
            ));
        }

        let external_id = parse_job_id(&stdout);
        if external_id.is_none() {
            debug!(job = %request.name, stdout = %stdout.trim(), "no job id in qsub output");
        }

        Ok(DispatchHandle {
            job: request.name.clone(),
            external_id,
            command_line,
        })
    }
}

impl SubmissionPort for SgeSubmitter {
    fn dispatch<'a>(&'a self, request: &'a DispatchRequest) -> DispatchFuture<'a> {
        Box::pin(self.submit(request))
    }
}
