// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod job;
pub mod logging;
pub mod submit;
pub mod types;

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{Batch, Scheduler};
use crate::engine::{Runtime, SubmitOptions};
use crate::fs::RealFileSystem;
use crate::submit::{BatchLayout, DryRunSubmitter, SgeOptions, SgeSubmitter};
use crate::types::{DispatchFailurePolicy, ON_DISPATCH_FAILURE_ENV};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - batch file loading and CLI overrides
/// - batch pre-flight checks
/// - batch directory layout
/// - the submission runtime with the `qsub` (or dry-run) port
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = load_and_validate(&args.config)?;
    apply_cli_overrides(&mut cfg, &args);

    let batch = Batch::from_config(&cfg)?;
    let layout = BatchLayout::new(&args.directory);
    let sge_options = SgeOptions::from(&cfg.config);
    let options = submit_options(&cfg, &args);

    if args.dry_run {
        print_dry_run(&cfg, &batch, &options)?;
        let runtime = Runtime::new(DryRunSubmitter::new(layout, sge_options), options);
        runtime.run(&batch).await?;
        return Ok(());
    }

    layout.prepare(&RealFileSystem)?;
    info!(dir = %layout.root().display(), "batch directory ready");

    let port = SgeSubmitter::new(layout, sge_options, Arc::new(RealFileSystem));
    let report = Runtime::new(port, options).run(&batch).await?;

    for handle in &report.handles {
        match &handle.external_id {
            Some(id) => println!("{}\t{}", handle.job, id),
            None => println!("{}", handle.job),
        }
    }

    if !report.is_complete() {
        for err in &report.failed {
            warn!(error = %err, "job not submitted");
        }
        bail!(
            "{} job(s) failed to dispatch, {} job(s) skipped",
            report.failed.len(),
            report.skipped.len()
        );
    }

    Ok(())
}

/// CLI flags take precedence over the batch file. Job-level settings still
/// win over `[default]`.
fn apply_cli_overrides(cfg: &mut ConfigFile, args: &CliArgs) {
    if let Some(queue) = &args.queue {
        cfg.default.queue = Some(queue.clone());
    }
    if let Some(mem) = &args.mem_free {
        cfg.default.mem_free = Some(mem.clone());
    }
    if let Some(arch) = &args.arch {
        cfg.config.arch = Some(arch.clone());
    }
}

/// Priority: CLI flag, then environment, then `[config]`.
fn submit_options(cfg: &ConfigFile, args: &CliArgs) -> SubmitOptions {
    let from_env = std::env::var(ON_DISPATCH_FAILURE_ENV).ok();
    let on_dispatch_failure = DispatchFailurePolicy::resolve(
        args.on_dispatch_failure,
        from_env.as_deref(),
        cfg.config.on_dispatch_failure,
    );

    SubmitOptions {
        on_dispatch_failure,
        max_parallel_dispatch: args
            .parallel
            .unwrap_or(cfg.config.max_parallel_dispatch)
            .max(1),
    }
}

/// Print jobs, sweeps and the planned waves.
fn print_dry_run(cfg: &ConfigFile, batch: &Batch, options: &SubmitOptions) -> Result<()> {
    println!("qbatch dry-run");
    println!("  config.qsub = {}", cfg.config.qsub);
    println!(
        "  config.on_dispatch_failure = {:?}",
        options.on_dispatch_failure
    );
    println!(
        "  config.max_parallel_dispatch = {}",
        options.max_parallel_dispatch
    );
    println!();

    println!("jobs ({}):", batch.len());
    for job in batch.jobs() {
        println!("  - {}", job.name());
        println!("      cmd: {}", job.command().trim());
        if !job.dependencies().is_empty() {
            println!("      after: {:?}", job.dependencies());
        }
        if let Some(sweep) = job.sweep_spec() {
            println!("      tasks: {}", sweep.task_count());
            for var in sweep.variables() {
                println!("      sweep {}: {:?}", var.name, var.values);
            }
        }
    }
    println!();

    let waves = Scheduler::new(batch).plan()?;
    println!("waves ({}):", waves.len());
    for (i, wave) in waves.iter().enumerate() {
        let names: Vec<&str> = wave.iter().map(|job| job.name()).collect();
        println!("  {}: {}", i + 1, names.join(", "));
    }
    println!();

    debug!("dry-run plan printed");
    Ok(())
}
