// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::default_config_path;
use crate::types::DispatchFailurePolicy;

/// Command-line arguments for `qbatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "qbatch",
    version,
    about = "Submit dependent jobs and parameter sweeps to Grid Engine.",
    long_about = None
)]
pub struct CliArgs {
    /// Batch directory; receives `output/`, `stdout/`, `stderr/` and `jobs/`.
    #[arg(value_name = "DIRECTORY")]
    pub directory: PathBuf,

    /// Path to the batch file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Default queue for jobs that do not name one (overrides `[default]`).
    #[arg(long, value_name = "QUEUE")]
    pub queue: Option<String>,

    /// Default `mem_free` request (overrides `[default]`).
    #[arg(long, value_name = "MEM")]
    pub mem_free: Option<String>,

    /// Architecture request passed as `-l arch=...` (overrides `[config]`).
    #[arg(long, value_name = "ARCH")]
    pub arch: Option<String>,

    /// What to do when a job cannot be submitted.
    ///
    /// If omitted, `QBATCH_ON_DISPATCH_FAILURE` or the batch file is used.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub on_dispatch_failure: Option<DispatchFailurePolicy>,

    /// Maximum number of concurrent `qsub` calls within one wave.
    #[arg(long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `QBATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Validate, print the waves and `qsub` commands, but submit nothing.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Parse the process arguments.
pub fn parse() -> CliArgs {
    parse_from(std::env::args_os())
}

/// Parse an explicit argument list (first item is the program name).
pub fn parse_from<I, T>(args: I) -> CliArgs
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    CliArgs::parse_from(args)
}
