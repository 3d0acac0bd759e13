use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use qbatch::submit::{
    DispatchError, DispatchFuture, DispatchHandle, DispatchRequest, SubmissionPort,
};

/// A fake submission port that:
/// - records every dispatch request, in the order dispatches started
/// - fails the jobs named in `failing`
/// - tracks the highest number of dispatches in flight at once.
#[derive(Default)]
pub struct RecordingPort {
    dispatched: Mutex<Vec<DispatchRequest>>,
    failing: HashSet<String>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_id: AtomicUsize,
}

impl RecordingPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the dispatch of every job in `names`.
    pub fn failing(mut self, names: &[&str]) -> Self {
        self.failing = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Sleep this long inside every dispatch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn dispatched_names(&self) -> Vec<String> {
        self.dispatched
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.name.clone())
            .collect()
    }

    pub fn requests(&self) -> Vec<DispatchRequest> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl SubmissionPort for RecordingPort {
    fn dispatch<'a>(&'a self, request: &'a DispatchRequest) -> DispatchFuture<'a> {
        Box::pin(async move {
            self.dispatched.lock().unwrap().push(request.clone());

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.failing.contains(&request.name) {
                return Err(DispatchError::new(&request.name, "rejected by fake port"));
            }

            let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(DispatchHandle {
                job: request.name.clone(),
                external_id: Some(id.to_string()),
                command_line: format!("fake-qsub {}", request.name),
            })
        })
    }
}
