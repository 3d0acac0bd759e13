// tests/runtime_fake_port.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use qbatch::dag::Batch;
use qbatch::engine::{Runtime, SubmitOptions};
use qbatch::errors::BatchError;
use qbatch::types::DispatchFailurePolicy;
use qbatch_test_utils::builders::BatchBuilder;
use qbatch_test_utils::fake_port::RecordingPort;
use qbatch_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

/// prepare -> {left, right} -> merge, plus an independent job.
fn diamond() -> Batch {
    BatchBuilder::new()
        .plain("prepare", &[])
        .plain("left", &["prepare"])
        .plain("right", &["prepare"])
        .plain("merge", &["left", "right"])
        .plain("solo", &[])
        .build()
}

fn options(policy: DispatchFailurePolicy, parallel: usize) -> SubmitOptions {
    SubmitOptions {
        on_dispatch_failure: policy,
        max_parallel_dispatch: parallel,
    }
}

fn position(order: &[String], name: &str) -> usize {
    order.iter().position(|n| n == name).unwrap()
}

#[tokio::test]
async fn every_job_is_dispatched_after_its_dependencies() -> TestResult {
    init_tracing();

    let batch = diamond();
    let port = Arc::new(RecordingPort::new());
    let runtime = Runtime::with_shared_port(Arc::clone(&port), SubmitOptions::default());

    let report = with_timeout(runtime.run(&batch)).await?;

    let order = port.dispatched_names();
    assert_eq!(order, vec!["prepare", "solo", "left", "right", "merge"]);
    assert!(report.is_complete());
    assert_eq!(report.waves.len(), 3);
    assert_eq!(report.submitted().count(), 5);
    assert!(report.handles.iter().all(|h| h.external_id.is_some()));

    Ok(())
}

#[tokio::test]
async fn dispatch_requests_carry_dependencies_and_task_counts() -> TestResult {
    init_tracing();

    let batch = BatchBuilder::new()
        .plain("prepare", &[])
        .sweep("grid", &["prepare"], &[("a", &["X", "Y", "Z"]), ("b", &["P", "Q"])])
        .build();
    let port = Arc::new(RecordingPort::new());
    let runtime = Runtime::with_shared_port(Arc::clone(&port), SubmitOptions::default());

    with_timeout(runtime.run(&batch)).await?;

    let requests = port.requests();
    assert_eq!(requests.len(), 2);

    let grid = &requests[1];
    assert_eq!(grid.name, "grid");
    assert!(grid.is_array);
    assert_eq!(grid.task_count, 6);
    assert_eq!(grid.dependencies, vec!["prepare".to_string()]);
    assert!(grid.script.contains("a_ARRAY=('X' 'Y' 'Z')"));

    let prepare = &requests[0];
    assert!(!prepare.is_array);
    assert_eq!(prepare.task_count, 1);

    Ok(())
}

#[tokio::test]
async fn cycle_fails_without_dispatching_stuck_jobs() -> TestResult {
    init_tracing();

    let batch = BatchBuilder::new()
        .plain("free", &[])
        .plain("A", &["B"])
        .plain("B", &["A"])
        .build();
    let port = Arc::new(RecordingPort::new());
    let runtime = Runtime::with_shared_port(Arc::clone(&port), SubmitOptions::default());

    let result = with_timeout(runtime.run(&batch)).await;

    match result {
        Err(BatchError::SchedulingDeadlock { stuck, .. }) => {
            assert_eq!(stuck, vec!["A", "B"]);
        }
        other => panic!("Expected SchedulingDeadlock, got: {:?}", other),
    }
    assert_eq!(port.dispatched_names(), vec!["free"]);

    Ok(())
}

#[tokio::test]
async fn abort_policy_stops_after_the_failing_wave() -> TestResult {
    init_tracing();

    let batch = diamond();
    let port = Arc::new(RecordingPort::new().failing(&["prepare"]));
    let runtime = Runtime::with_shared_port(
        Arc::clone(&port),
        options(DispatchFailurePolicy::Abort, 1),
    );

    let result = with_timeout(runtime.run(&batch)).await;

    match result {
        Err(BatchError::Dispatch(err)) => assert_eq!(err.job, "prepare"),
        other => panic!("Expected Dispatch error, got: {:?}", other),
    }
    // The rest of the failing wave is still observed, nothing after it.
    assert_eq!(port.dispatched_names(), vec!["prepare", "solo"]);

    Ok(())
}

#[tokio::test]
async fn continue_policy_skips_dependents_and_submits_the_rest() -> TestResult {
    init_tracing();

    let batch = diamond();
    let port = Arc::new(RecordingPort::new().failing(&["left"]));
    let runtime = Runtime::with_shared_port(
        Arc::clone(&port),
        options(DispatchFailurePolicy::Continue, 1),
    );

    let report = with_timeout(runtime.run(&batch)).await?;

    assert!(!report.is_complete());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].job, "left");
    assert_eq!(report.skipped, vec!["merge".to_string()]);

    let mut submitted: Vec<&str> = report.submitted().collect();
    submitted.sort();
    assert_eq!(submitted, vec!["prepare", "right", "solo"]);
    assert!(!port.dispatched_names().contains(&"merge".to_string()));

    Ok(())
}

#[tokio::test]
async fn parallel_dispatch_respects_limit_and_wave_order() -> TestResult {
    init_tracing();

    let mut builder = BatchBuilder::new().plain("root", &[]);
    let leaves: Vec<String> = (0..6).map(|i| format!("leaf_{i}")).collect();
    for leaf in &leaves {
        builder = builder.plain(leaf, &["root"]);
    }
    let deps: Vec<&str> = leaves.iter().map(String::as_str).collect();
    let batch = builder.plain("gather", &deps).build();

    let port = Arc::new(RecordingPort::new().with_delay(Duration::from_millis(20)));
    let runtime = Runtime::with_shared_port(
        Arc::clone(&port),
        options(DispatchFailurePolicy::Abort, 3),
    );

    let report = with_timeout(runtime.run(&batch)).await?;

    assert!(report.is_complete());
    assert!(port.max_in_flight() <= 3);
    assert!(port.max_in_flight() >= 2);

    let order = port.dispatched_names();
    assert_eq!(order.len(), 8);
    assert_eq!(order[0], "root");
    assert_eq!(order[7], "gather");
    for leaf in &leaves {
        assert!(position(&order, leaf) < position(&order, "gather"));
    }

    // Report keeps wave declaration order regardless of completion order.
    assert_eq!(report.waves[1], leaves);

    Ok(())
}
