//! Runner state machine tests. Backoff waits run on paused time.

use std::future::{ready, Ready};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::*;
use crate::classify::{ErrorKind, RawFailure};

/// Work that fails with `status` for the first `failures` calls, then returns `value`.
fn flaky(
    failures: u32,
    status: u16,
    value: u32,
) -> (
    Arc<AtomicU32>,
    impl FnMut() -> Ready<Result<u32, RawFailure>> + Send + 'static,
) {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let work = move || {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        if n < failures {
            ready(Err(RawFailure::http(status)))
        } else {
            ready(Ok(value))
        }
    };
    (calls, work)
}

#[derive(Default, Clone)]
struct Recorder {
    successes: Arc<Mutex<Vec<u32>>>,
    retries: Arc<Mutex<Vec<(u32, Duration, ErrorKind)>>>,
    failures: Arc<Mutex<Vec<OperationError>>>,
}

impl Recorder {
    fn options(&self, retry: RetryOptions) -> RunOptions<u32> {
        let successes = Arc::clone(&self.successes);
        let retries = Arc::clone(&self.retries);
        let failures = Arc::clone(&self.failures);
        RunOptions::new(retry)
            .on_success(move |v| successes.lock().unwrap().push(*v))
            .on_retry_scheduled(move |n, d, e| retries.lock().unwrap().push((n, d, e.kind)))
            .on_failure(move |e| failures.lock().unwrap().push(e.clone()))
    }

    fn successes(&self) -> Vec<u32> {
        self.successes.lock().unwrap().clone()
    }

    fn retries(&self) -> Vec<(u32, Duration, ErrorKind)> {
        self.retries.lock().unwrap().clone()
    }

    fn failures(&self) -> Vec<OperationError> {
        self.failures.lock().unwrap().clone()
    }
}

fn with_retries(max_retries: u32) -> RetryOptions {
    RetryOptions {
        max_retries,
        ..RetryOptions::default()
    }
}

#[tokio::test(start_paused = true)]
async fn succeeds_on_first_attempt() {
    let runner = Runner::new();
    let rec = Recorder::default();
    let (calls, work) = flaky(0, 503, 7);

    let outcome = runner
        .start(work, rec.options(RetryOptions::default()))
        .await
        .unwrap();

    assert_eq!(outcome, RunOutcome::Succeeded(7));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let state = runner.snapshot();
    assert_eq!(state.attempts_made, 1);
    assert!(!state.is_running);
    assert_eq!(state.last_result, Some(7));
    assert_eq!(rec.successes(), vec![7]);
    assert!(rec.failures().is_empty());
    assert!(rec.retries().is_empty());
}

#[tokio::test(start_paused = true)]
async fn retries_server_errors_with_doubling_delay() {
    let runner = Runner::new();
    let rec = Recorder::default();
    let (_, work) = flaky(2, 503, 42);
    let started = tokio::time::Instant::now();

    let outcome = runner.start(work, rec.options(with_retries(3))).await.unwrap();

    assert_eq!(outcome, RunOutcome::Succeeded(42));
    assert_eq!(runner.snapshot().attempts_made, 3);
    assert_eq!(
        rec.retries(),
        vec![
            (1, Duration::from_millis(1000), ErrorKind::Server),
            (2, Duration::from_millis(2000), ErrorKind::Server),
        ]
    );
    assert_eq!(rec.successes(), vec![42]);
    assert!(rec.failures().is_empty());
    assert!(started.elapsed() >= Duration::from_millis(3000));
}

#[tokio::test(start_paused = true)]
async fn exhausts_retries_and_reports_once() {
    let runner = Runner::new();
    let rec = Recorder::default();
    let (calls, work) = flaky(u32::MAX, 503, 0);

    let outcome = runner.start(work, rec.options(with_retries(2))).await.unwrap();

    let RunOutcome::Failed(err) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(err.error.kind, ErrorKind::Server);
    assert!(err.error.is_retryable);
    assert!(err.retries_exhausted());
    assert_eq!(err.attempts, 3);

    let state = runner.snapshot();
    assert_eq!(state.attempts_made, 3);
    assert!(!state.is_running);
    assert!(!state.is_waiting_to_retry);
    assert_eq!(state.last_error.as_ref(), Some(&err));
    assert_eq!(rec.failures(), vec![err]);
    assert_eq!(rec.retries().len(), 2);
    assert!(rec.successes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn not_found_fails_without_retry() {
    let runner = Runner::new();
    let rec = Recorder::default();
    let (_, work) = flaky(u32::MAX, 404, 0);

    let outcome = runner
        .start(work, rec.options(RetryOptions::default()))
        .await
        .unwrap();

    let RunOutcome::Failed(err) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(err.error.kind, ErrorKind::NotFound);
    assert!(!err.error.is_retryable);
    assert_eq!(err.reason, StopReason::NotRetryable);
    assert_eq!(runner.snapshot().attempts_made, 1);
    assert!(rec.retries().is_empty());
    assert_eq!(rec.failures().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn reset_after_run_restores_initial_state() {
    let runner = Runner::new();
    let (_, work) = flaky(u32::MAX, 400, 0);
    runner.start(work, RunOptions::default()).await.unwrap();
    assert!(runner.snapshot().last_error.is_some());

    runner.reset().unwrap();

    assert_eq!(runner.snapshot(), OperationState::default());
}

#[tokio::test(start_paused = true)]
async fn clear_error_keeps_attempts() {
    let runner = Runner::new();
    let (_, work) = flaky(u32::MAX, 401, 0);
    runner.start(work, RunOptions::default()).await.unwrap();

    runner.clear_error();

    let state = runner.snapshot();
    assert!(state.last_error.is_none());
    assert_eq!(state.attempts_made, 1);
    assert!(!state.is_running);
}

#[tokio::test(start_paused = true)]
async fn retry_clears_previous_error_and_attempts() {
    let runner = Runner::new();
    let (_, failing) = flaky(u32::MAX, 404, 0);
    runner.start(failing, RunOptions::default()).await.unwrap();

    let mut rx = runner.subscribe();
    let (_, work) = flaky(1, 502, 9);
    let outcome = {
        let run = runner.retry(work, RunOptions::default());
        // The first published transition already has the error cleared.
        let first = async {
            rx.changed().await.unwrap();
            let s = rx.borrow_and_update().clone();
            assert!(s.last_error.is_none());
            assert!(s.is_running);
        };
        let (outcome, ()) = tokio::join!(run, first);
        outcome
    };

    assert_eq!(outcome.unwrap(), RunOutcome::Succeeded(9));
    assert_eq!(runner.snapshot().attempts_made, 2);
}

#[tokio::test(start_paused = true)]
async fn second_start_while_running_is_rejected() {
    let runner = Arc::new(Runner::new());
    let mut rx = runner.subscribe();
    let (_, work) = flaky(u32::MAX, 503, 0);

    let task = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move { runner.start(work, RunOptions::default()).await })
    };
    rx.wait_for(|s| s.is_waiting_to_retry).await.unwrap();

    let (_, other) = flaky(0, 200, 1);
    let second = runner.start(other, RunOptions::default()).await;
    assert_eq!(second, Err(RunnerError::AlreadyRunning));
    assert_eq!(runner.reset(), Err(RunnerError::ResetWhileRunning));

    assert!(runner.cancel());
    assert_eq!(task.await.unwrap(), Ok(RunOutcome::Cancelled));
}

#[tokio::test(start_paused = true)]
async fn cancel_during_backoff_stops_everything() {
    let runner = Arc::new(Runner::new());
    let rec = Recorder::default();
    let mut rx = runner.subscribe();
    let (calls, work) = flaky(u32::MAX, 503, 0);

    let task = {
        let runner = Arc::clone(&runner);
        let options = rec.options(with_retries(5));
        tokio::spawn(async move { runner.start(work, options).await })
    };
    rx.wait_for(|s| s.is_waiting_to_retry).await.unwrap();

    assert!(runner.cancel());
    // Idle as soon as cancel returns, before the task observes it.
    let state = runner.snapshot();
    assert!(!state.is_running);
    assert!(!state.is_waiting_to_retry);

    let outcome = task.await.unwrap().unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(outcome, RunOutcome::Cancelled);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(runner.snapshot(), state);
    assert_eq!(state.attempts_made, 1);
    assert!(state.last_error.is_none());
    assert_eq!(rec.retries().len(), 1);
    assert!(rec.failures().is_empty());
    assert!(rec.successes().is_empty());

    // A cancelled runner can be reset and reused.
    runner.reset().unwrap();
    let (_, ok) = flaky(0, 200, 5);
    let again = runner.start(ok, RunOptions::default()).await.unwrap();
    assert_eq!(again, RunOutcome::Succeeded(5));
}

#[tokio::test(start_paused = true)]
async fn cancel_aborts_in_flight_attempt() {
    let runner = Arc::new(Runner::<u32>::new());
    let mut rx = runner.subscribe();
    let task = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move {
            runner
                .start(
                    || async {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok::<u32, RawFailure>(1)
                    },
                    RunOptions::default(),
                )
                .await
        })
    };
    rx.wait_for(|s| s.attempts_made == 1).await.unwrap();

    assert!(runner.cancel());
    assert!(!runner.cancel());

    assert_eq!(task.await.unwrap(), Ok(RunOutcome::Cancelled));
    let state = runner.snapshot();
    assert!(!state.is_running);
    assert!(state.last_result.is_none());
    assert_eq!(runner.reset(), Ok(()));
}

#[tokio::test(start_paused = true)]
async fn dropping_start_future_marks_runner_idle() {
    let runner = Runner::<u32>::new();
    let mut rx = runner.subscribe();
    let (_, work) = flaky(u32::MAX, 503, 0);

    {
        let run = runner.start(work, RunOptions::default());
        tokio::pin!(run);
        tokio::select! {
            _ = &mut run => panic!("run should still be waiting"),
            r = rx.wait_for(|s| s.is_waiting_to_retry) => { r.unwrap(); }
        }
    }

    let state = runner.snapshot();
    assert!(!state.is_running);
    assert!(!state.is_waiting_to_retry);
    assert!(!runner.cancel());
}

#[tokio::test(start_paused = true)]
async fn cancel_from_work_suppresses_success_callback() {
    let runner = Arc::new(Runner::new());
    let rec = Recorder::default();
    let work = {
        let runner = Arc::clone(&runner);
        move || {
            runner.cancel();
            ready(Ok::<u32, RawFailure>(3))
        }
    };

    let outcome = runner.start(work, rec.options(RetryOptions::default())).await;

    assert_eq!(outcome, Ok(RunOutcome::Cancelled));
    assert!(rec.successes().is_empty());
    let state = runner.snapshot();
    assert!(!state.is_running);
    assert!(state.last_result.is_none());
}

#[tokio::test(start_paused = true)]
async fn cancel_from_work_suppresses_retry_and_failure_callbacks() {
    let runner = Arc::new(Runner::new());
    let rec = Recorder::default();
    let calls = Arc::new(AtomicU32::new(0));
    let work = {
        let runner = Arc::clone(&runner);
        let calls = Arc::clone(&calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            runner.cancel();
            ready(Err::<u32, RawFailure>(RawFailure::http(503)))
        }
    };

    let outcome = runner.start(work, rec.options(with_retries(3))).await;

    assert_eq!(outcome, Ok(RunOutcome::Cancelled));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(rec.retries().is_empty());
    assert!(rec.failures().is_empty());
    let state = runner.snapshot();
    assert!(!state.is_running);
    assert!(!state.is_waiting_to_retry);
    assert!(state.last_error.is_none());
}

#[tokio::test(start_paused = true)]
async fn waiting_flag_is_published() {
    let runner = Runner::new();
    let mut rx = runner.subscribe();
    let (_, work) = flaky(1, 429, 3);

    let observer = async {
        rx.wait_for(|s| s.is_waiting_to_retry).await.unwrap();
        rx.wait_for(|s| !s.is_running).await.unwrap();
    };
    let (outcome, ()) = tokio::join!(runner.start(work, RunOptions::default()), observer);

    assert_eq!(outcome.unwrap(), RunOutcome::Succeeded(3));
    assert!(!runner.snapshot().is_waiting_to_retry);
}

#[tokio::test(start_paused = true)]
async fn delays_are_capped() {
    let runner = Runner::new();
    let rec = Recorder::default();
    let (_, work) = flaky(u32::MAX, 500, 0);
    let retry = RetryOptions {
        max_retries: 6,
        initial_delay_ms: 1000,
        max_delay_ms: 5000,
        backoff_multiplier: 3.0,
    };

    runner.start(work, rec.options(retry)).await.unwrap();

    let delays: Vec<u128> = rec.retries().iter().map(|(_, d, _)| d.as_millis()).collect();
    assert_eq!(delays, vec![1000, 3000, 5000, 5000, 5000, 5000]);
}

#[tokio::test]
async fn invalid_options_are_rejected_before_running() {
    let runner = Runner::new();
    let (calls, work) = flaky(0, 200, 1);
    let retry = RetryOptions {
        backoff_multiplier: 0.5,
        ..RetryOptions::default()
    };

    let result = runner.start(work, RunOptions::new(retry)).await;

    assert!(matches!(result, Err(RunnerError::InvalidOptions(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(runner.snapshot(), OperationState::default());
}

#[tokio::test(start_paused = true)]
async fn network_failures_are_classified_before_retry() {
    let runner = Runner::<u32>::new();
    let rec = Recorder::default();
    let outcome = runner
        .start(
            || ready(Err::<u32, _>(std::io::Error::from(std::io::ErrorKind::ConnectionRefused))),
            rec.options(with_retries(1)),
        )
        .await
        .unwrap();

    let RunOutcome::Failed(err) = outcome else {
        panic!("expected failure");
    };
    assert_eq!(err.error.kind, ErrorKind::Network);
    assert!(err.retries_exhausted());
    assert_eq!(rec.retries().len(), 1);
}
