// tests/config_loading.rs

use std::io::Write;

use tempfile::NamedTempFile;
use qbatch::config::{load_and_validate, load_from_str, ConfigFile};
use qbatch::dag::{Batch, Scheduler};
use qbatch::errors::BatchError;
use qbatch::job::SweepError;
use qbatch::types::DispatchFailurePolicy;
use qbatch_test_utils::builders::{ConfigFileBuilder, JobConfigBuilder};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", contents).unwrap();
    file
}

#[test]
fn full_batch_file_is_loaded_with_defaults_applied() {
    let file = write_config(
        r#"
[config]
qsub = "/opt/sge/bin/qsub"
arch = "lx24-amd64"
on_dispatch_failure = "continue"
max_parallel_dispatch = 4

[default]
queue = "my.q"
mem_free = "20M"
resources = ["h_rt=01:00:00"]

[job.prepare]
cmd = "mkdir -p data"
queue = "fast.q"

[job.greet]
cmd = "echo $a $b > $outdir/$a.$b.txt"
after = ["prepare"]
priority = -10
sweep = { b = ["World", "Earth"], a = ["Hello", "Goodbye", "Tschus"], outdir = ["/tmp/out"] }
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.config.qsub, "/opt/sge/bin/qsub");
    assert_eq!(cfg.config.on_dispatch_failure, DispatchFailurePolicy::Continue);
    assert_eq!(cfg.config.max_parallel_dispatch, 4);

    let batch = Batch::from_config(&cfg).unwrap();

    let prepare = batch.get("prepare").unwrap();
    assert_eq!(prepare.resources().queue.as_deref(), Some("fast.q"));
    assert_eq!(prepare.resources().mem_free.as_deref(), Some("20M"));
    assert_eq!(prepare.resources().resources, vec!["h_rt=01:00:00".to_string()]);

    let greet = batch.get("greet").unwrap();
    assert_eq!(greet.resources().queue.as_deref(), Some("my.q"));
    assert_eq!(greet.resources().priority, Some(-10));
    assert_eq!(greet.dependencies(), &["prepare".to_string()]);
    assert_eq!(greet.task_count(), 6);

    // Declaration order from the file is kept: b, a, outdir.
    let sweep = greet.sweep_spec().unwrap();
    let names: Vec<&str> = sweep.variables().iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["b", "a", "outdir"]);
    assert_eq!(
        sweep.decode(2).unwrap(),
        vec![("b", "Earth"), ("a", "Hello"), ("outdir", "/tmp/out")]
    );

    let waves = Scheduler::new(&batch).plan().unwrap();
    assert_eq!(waves.len(), 2);
}

#[test]
fn non_string_sweep_values_are_rendered_as_text() {
    let raw = load_from_str(
        r#"
[job.scan]
cmd = "run --n $n --rate $rate --fast $fast"
sweep = { n = [1, 2, 3], rate = [0.5], fast = [true, false] }
"#,
    )
    .unwrap();
    let cfg = ConfigFile::try_from(raw).unwrap();
    let batch = Batch::from_config(&cfg).unwrap();

    let sweep = batch.get("scan").unwrap().sweep_spec().unwrap();
    assert_eq!(sweep.task_count(), 6);
    assert_eq!(sweep.variables()[0].values, vec!["1", "2", "3"]);
    assert_eq!(sweep.variables()[1].values, vec!["0.5"]);
    assert_eq!(sweep.variables()[2].values, vec!["true", "false"]);
}

#[test]
fn empty_sweep_table_is_a_single_task_array_job() {
    let raw = load_from_str(
        r#"
[job.once]
cmd = "echo once"
sweep = {}
"#,
    )
    .unwrap();
    let cfg = ConfigFile::try_from(raw).unwrap();
    let batch = Batch::from_config(&cfg).unwrap();
    let job = batch.get("once").unwrap();

    assert!(job.is_array());
    assert_eq!(job.task_count(), 1);
}

#[test]
fn unknown_dependency_returns_dangling_error() {
    let file = write_config(
        r#"
[job.A]
cmd = "echo A"

[job.C]
cmd = "echo C"
after = ["NonExistent"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(BatchError::DanglingDependency { job, dependency }) => {
            assert_eq!(job, "C");
            assert_eq!(dependency, "NonExistent");
        }
        Err(e) => panic!("Expected DanglingDependency, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn empty_value_list_returns_invalid_sweep() {
    let file = write_config(
        r#"
[job.grid]
cmd = "echo $a"
sweep = { a = [] }
"#,
    );

    match load_and_validate(file.path()) {
        Err(BatchError::InvalidSweep { job, reason }) => {
            assert_eq!(job, "grid");
            assert_eq!(reason, SweepError::EmptyValues("a".to_string()));
        }
        Err(e) => panic!("Expected InvalidSweep, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn malformed_sweep_values_are_config_errors() {
    let raw = load_from_str(
        r#"
[job.grid]
cmd = "echo $a"
sweep = { a = "not-a-list" }
"#,
    )
    .unwrap();
    assert!(matches!(ConfigFile::try_from(raw), Err(BatchError::ConfigError(_))));

    let raw = load_from_str(
        r#"
[job.grid]
cmd = "echo $a"
sweep = { a = [[1, 2]] }
"#,
    )
    .unwrap();
    assert!(matches!(ConfigFile::try_from(raw), Err(BatchError::ConfigError(_))));
}

#[test]
fn invalid_job_name_is_rejected() {
    let raw = ConfigFileBuilder::new()
        .with_job("2fast", JobConfigBuilder::new("true").build())
        .raw();
    assert!(matches!(
        ConfigFile::try_from(raw),
        Err(BatchError::InvalidJobName(name)) if name == "2fast"
    ));
}

#[test]
fn empty_file_and_zero_parallelism_are_rejected() {
    let raw = load_from_str("").unwrap();
    assert!(matches!(ConfigFile::try_from(raw), Err(BatchError::ConfigError(_))));

    let raw = load_from_str(
        r#"
[config]
max_parallel_dispatch = 0

[job.A]
cmd = "true"
"#,
    )
    .unwrap();
    assert!(matches!(ConfigFile::try_from(raw), Err(BatchError::ConfigError(_))));
}

#[test]
fn unknown_failure_policy_fails_to_parse() {
    let result = load_from_str(
        r#"
[config]
on_dispatch_failure = "retry"

[job.A]
cmd = "true"
"#,
    );
    assert!(matches!(result, Err(BatchError::TomlError(_))));
}

#[test]
fn cycles_pass_validation_and_deadlock_in_scheduler() {
    let cfg = ConfigFileBuilder::new()
        .with_job("A", JobConfigBuilder::new("echo A").after("B").build())
        .with_job("B", JobConfigBuilder::new("echo B").after("A").build())
        .build();
    let batch = Batch::from_config(&cfg).unwrap();

    assert!(matches!(
        Scheduler::new(&batch).plan(),
        Err(BatchError::SchedulingDeadlock { .. })
    ));
}

#[test]
fn builder_sweeps_keep_declaration_order() {
    let cfg = ConfigFileBuilder::new()
        .with_default_queue("all.q")
        .with_job(
            "grid",
            JobConfigBuilder::new("echo $z $a")
                .sweep("z", &["1", "2"])
                .sweep("a", &["x", "y", "w"])
                .build(),
        )
        .build();
    let batch = Batch::from_config(&cfg).unwrap();
    let job = batch.get("grid").unwrap();

    assert_eq!(job.resources().queue.as_deref(), Some("all.q"));
    let sweep = job.sweep_spec().unwrap();
    assert_eq!(sweep.variables()[0].name, "z");
    assert_eq!(sweep.decode(2).unwrap(), vec![("z", "2"), ("a", "x")]);
}
