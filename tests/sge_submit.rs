// tests/sge_submit.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use qbatch::fs::mock::MockFileSystem;
use qbatch::fs::{FileSystem, RealFileSystem};
use qbatch::job::{Job, ResourceSpec, SweepVariable};
use qbatch::submit::sge::{parse_job_id, qsub_args, render_command_line};
use qbatch::submit::{
    BatchLayout, DispatchRequest, DryRunSubmitter, SgeOptions, SgeSubmitter, SubmissionPort,
};
use qbatch_test_utils::init_tracing;

fn sweep_request() -> DispatchRequest {
    let resources = ResourceSpec {
        queue: Some("my.q".to_string()),
        mem_free: Some("20M".to_string()),
        priority: Some(-5),
        project: Some("lab".to_string()),
        resources: vec!["h_rt=01:00:00".to_string()],
    };
    let mut job = Job::sweep(
        "greet",
        "echo $a $b",
        resources,
        vec![
            SweepVariable::new("a", ["Hello", "Goodbye", "Tschus"]),
            SweepVariable::new("b", ["World", "Earth"]),
        ],
    )
    .unwrap();
    job.depends_on("prepare");
    job.depends_on("fetch");
    DispatchRequest::from_job(&job)
}

#[test]
fn qsub_args_follow_grid_engine_flag_order() {
    let layout = BatchLayout::new("/data/run");
    let options = SgeOptions {
        qsub: "qsub".to_string(),
        arch: Some("lx24-amd64".to_string()),
        extra_args: vec!["-V".to_string()],
    };
    let script = layout.script_path("greet");

    let args = qsub_args(&sweep_request(), &layout, &options, &script);

    assert_eq!(
        args,
        vec![
            "-N", "greet",
            "-o", "/data/run/stdout",
            "-e", "/data/run/stderr",
            "-l", "mem_free=20M",
            "-l", "arch=lx24-amd64",
            "-q", "my.q",
            "-t", "1:6",
            "-hold_jid", "prepare,fetch",
            "-p", "-5",
            "-P", "lab",
            "-l", "h_rt=01:00:00",
            "-V",
            "/data/run/jobs/greet",
        ]
    );
}

#[test]
fn plain_job_without_resources_gets_minimal_flags() {
    let job = Job::plain("single", "echo hi", ResourceSpec::default());
    let layout = BatchLayout::new("/b");
    let args = qsub_args(
        &DispatchRequest::from_job(&job),
        &layout,
        &SgeOptions::default(),
        Path::new("/b/jobs/single"),
    );
    assert_eq!(
        args,
        vec!["-N", "single", "-o", "/b/stdout", "-e", "/b/stderr", "/b/jobs/single"]
    );
}

#[test]
fn command_line_quotes_only_when_needed() {
    let args = vec!["-l".to_string(), "h_rt=1:00:00".to_string(), "two words".to_string()];
    assert_eq!(
        render_command_line("qsub", &args),
        "qsub -l h_rt=1:00:00 'two words'"
    );
}

#[test]
fn job_ids_are_parsed_from_qsub_output() {
    assert_eq!(
        parse_job_id("Your job 4711 (\"single\") has been submitted\n").as_deref(),
        Some("4711")
    );
    assert_eq!(
        parse_job_id("Your job-array 42.1-6:1 (\"greet\") has been submitted\n").as_deref(),
        Some("42")
    );
    assert_eq!(parse_job_id("something else"), None);
}

#[test]
fn layout_prepare_creates_missing_directories() {
    let fs = MockFileSystem::new();
    let layout = BatchLayout::new("/batch");
    fs.create_dir_all(Path::new("/batch/stdout")).unwrap();

    layout.prepare(&fs).unwrap();

    for dir in ["output", "stderr", "stdout", "jobs"] {
        assert!(fs.is_dir(&PathBuf::from("/batch").join(dir)), "{dir} missing");
    }
}

#[test]
fn scripts_are_written_executable_with_header() {
    let fs = MockFileSystem::new();
    let layout = BatchLayout::new("/batch");

    let path = layout.write_script(&fs, "greet", "echo hi").unwrap();

    assert_eq!(path, PathBuf::from("/batch/jobs/greet"));
    assert_eq!(
        fs.read_to_string(&path).unwrap(),
        "#!/bin/bash\n#$ -S /bin/bash\necho hi\n"
    );
    assert!(fs.is_executable(&path));
}

#[tokio::test]
async fn dry_run_port_renders_commands_without_writing() {
    init_tracing();

    let port = DryRunSubmitter::new(BatchLayout::new("/batch"), SgeOptions::default());
    let handle = port.dispatch(&sweep_request()).await.unwrap();

    assert_eq!(handle.job, "greet");
    assert!(handle.external_id.is_none());
    assert!(handle.command_line.starts_with("qsub -N greet "));
    assert!(handle.command_line.contains("-t 1:6"));
    assert!(handle.command_line.ends_with("/batch/jobs/greet"));
}

#[cfg(unix)]
fn fake_qsub(dir: &Path, body: &str) -> String {
    let path = dir.join("fake-qsub");
    let fs = RealFileSystem;
    fs.write(&path, format!("#!/bin/sh\n{body}\n").as_bytes()).unwrap();
    fs.set_executable(&path).unwrap();
    path.display().to_string()
}

#[cfg(unix)]
#[tokio::test]
async fn sge_submitter_writes_script_and_parses_job_id() {
    init_tracing();

    let tmp = tempfile::tempdir().unwrap();
    let qsub = fake_qsub(
        tmp.path(),
        r#"echo "Your job-array 42.1-6:1 (\"greet\") has been submitted""#,
    );

    let fs = MockFileSystem::new();
    let options = SgeOptions {
        qsub: qsub.clone(),
        ..SgeOptions::default()
    };
    let port = SgeSubmitter::new(BatchLayout::new("/batch"), options, Arc::new(fs.clone()));

    let request = sweep_request();
    let handle = port.dispatch(&request).await.unwrap();

    assert_eq!(handle.external_id.as_deref(), Some("42"));
    assert!(handle.command_line.starts_with(&qsub));

    let script = fs.read_to_string(Path::new("/batch/jobs/greet")).unwrap();
    assert!(script.starts_with("#!/bin/bash\n#$ -S /bin/bash\n"));
    assert!(script.contains(&request.script));
}

#[cfg(unix)]
#[tokio::test]
async fn sge_submitter_reports_rejected_submission() {
    init_tracing();

    let tmp = tempfile::tempdir().unwrap();
    let qsub = fake_qsub(tmp.path(), "echo 'Unable to run job: unknown queue' >&2\nexit 1");

    let options = SgeOptions {
        qsub,
        ..SgeOptions::default()
    };
    let port = SgeSubmitter::new(
        BatchLayout::new("/batch"),
        options,
        Arc::new(MockFileSystem::new()),
    );

    let err = port.dispatch(&sweep_request()).await.unwrap_err();
    assert_eq!(err.job, "greet");
    assert!(err.message.contains("unknown queue"));
}

#[tokio::test]
async fn sge_submitter_reports_missing_program() {
    init_tracing();

    let options = SgeOptions {
        qsub: "/nonexistent/qsub-for-tests".to_string(),
        ..SgeOptions::default()
    };
    let port = SgeSubmitter::new(
        BatchLayout::new("/batch"),
        options,
        Arc::new(MockFileSystem::new()),
    );

    let err = port.dispatch(&sweep_request()).await.unwrap_err();
    assert_eq!(err.job, "greet");
    assert!(err.message.contains("/nonexistent/qsub-for-tests"));
}
