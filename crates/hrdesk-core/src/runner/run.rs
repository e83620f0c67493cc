//! Retry loop: run an async unit of work until it succeeds, fails for good,
//! or is cancelled, publishing state at every step.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;

use super::cancel::CancelToken;
use super::options::{OptionsError, RetryDecision, RetryOptions};
use super::state::{OperationError, OperationState, RunOutcome};
use crate::classify::{classify, ClassifiedError, RawFailure};

type SuccessHook<T> = Box<dyn FnOnce(&T) + Send>;
type RetryHook = Box<dyn FnMut(u32, Duration, &ClassifiedError) + Send>;
type FailureHook = Box<dyn FnOnce(&OperationError) + Send>;

/// Misuse of a runner.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RunnerError {
    #[error("an operation is already running on this runner")]
    AlreadyRunning,
    #[error("cannot reset while an operation is running")]
    ResetWhileRunning,
    #[error("invalid retry options: {0}")]
    InvalidOptions(#[from] OptionsError),
}

/// Retry parameters plus lifecycle callbacks for one run.
pub struct RunOptions<T> {
    pub retry: RetryOptions,
    on_success: Option<SuccessHook<T>>,
    on_retry_scheduled: Option<RetryHook>,
    on_failure: Option<FailureHook>,
}

impl<T> RunOptions<T> {
    pub fn new(retry: RetryOptions) -> Self {
        Self {
            retry,
            on_success: None,
            on_retry_scheduled: None,
            on_failure: None,
        }
    }

    /// Called once with the result when the run succeeds.
    pub fn on_success(mut self, f: impl FnOnce(&T) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// Called with `(attempt, delay, error)` before each backoff wait.
    pub fn on_retry_scheduled(
        mut self,
        f: impl FnMut(u32, Duration, &ClassifiedError) + Send + 'static,
    ) -> Self {
        self.on_retry_scheduled = Some(Box::new(f));
        self
    }

    /// Called once with the final error when the run gives up.
    pub fn on_failure(mut self, f: impl FnOnce(&OperationError) + Send + 'static) -> Self {
        self.on_failure = Some(Box::new(f));
        self
    }
}

impl<T> Default for RunOptions<T> {
    fn default() -> Self {
        Self::new(RetryOptions::default())
    }
}

impl<T> From<RetryOptions> for RunOptions<T> {
    fn from(retry: RetryOptions) -> Self {
        Self::new(retry)
    }
}

/// Executes async work with classified retries. At most one run is in flight
/// per runner; a second `start` while one is active is rejected.
pub struct Runner<T> {
    state: watch::Sender<OperationState<T>>,
    /// Token of the active run, if any.
    active: Mutex<Option<CancelToken>>,
}

/// Clears the active slot when a run ends, however it ends (including the
/// `start` future being dropped mid-run).
struct RunGuard<'a, T> {
    runner: &'a Runner<T>,
    token: CancelToken,
}

impl<T> Drop for RunGuard<'_, T> {
    fn drop(&mut self) {
        let mut slot = self.runner.slot();
        if slot.as_ref().is_some_and(|t| t.same_as(&self.token)) {
            if !self.token.is_cancelled() {
                self.runner.settle();
            }
            *slot = None;
        }
        self.token.cancel();
    }
}

impl<T> Runner<T> {
    fn slot(&self) -> MutexGuard<'_, Option<CancelToken>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mark the state idle. Callers hold the slot lock.
    fn settle(&self) {
        self.state.send_if_modified(|s| {
            let changed = s.is_running || s.is_waiting_to_retry;
            s.is_running = false;
            s.is_waiting_to_retry = false;
            changed
        });
    }
}

impl<T: Clone> Runner<T> {
    pub fn new() -> Self {
        let (state, _) = watch::channel(OperationState::default());
        Self {
            state,
            active: Mutex::new(None),
        }
    }

    /// Current state.
    pub fn snapshot(&self) -> OperationState<T> {
        self.state.borrow().clone()
    }

    /// Receiver that sees every state transition.
    pub fn subscribe(&self) -> watch::Receiver<OperationState<T>> {
        self.state.subscribe()
    }

    /// Run `work` with automatic retries.
    pub async fn start<W, Fut, E>(
        &self,
        work: W,
        options: RunOptions<T>,
    ) -> Result<RunOutcome<T>, RunnerError>
    where
        W: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        self.run(work, options, false).await
    }

    /// Like `start`, but clears the previous error before the first attempt.
    pub async fn retry<W, Fut, E>(
        &self,
        work: W,
        options: RunOptions<T>,
    ) -> Result<RunOutcome<T>, RunnerError>
    where
        W: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        self.run(work, options, true).await
    }

    /// Forget the last error. Running state and attempt count are untouched.
    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.last_error = None);
    }

    /// Restore the initial state. Refused (and logged) while a run is active.
    pub fn reset(&self) -> Result<(), RunnerError> {
        let slot = self.slot();
        if slot.as_ref().is_some_and(|t| !t.is_cancelled()) {
            tracing::warn!("reset() called while an operation is running; ignored");
            return Err(RunnerError::ResetWhileRunning);
        }
        self.state.send_modify(|s| *s = OperationState::default());
        Ok(())
    }

    /// Cancel the active run, if any. Returns whether there was one.
    ///
    /// The state is marked idle (`is_running` and `is_waiting_to_retry` false)
    /// and otherwise kept as it was. After this returns the run makes no
    /// further attempts or state changes, and no callback that has not
    /// already started will fire.
    pub fn cancel(&self) -> bool {
        match self.slot().as_ref() {
            Some(token) if !token.is_cancelled() => {
                self.settle();
                token.cancel();
                tracing::debug!("operation cancelled");
                true
            }
            _ => false,
        }
    }

    fn claim(&self) -> Result<CancelToken, RunnerError> {
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|t| !t.is_cancelled()) {
            tracing::warn!("start() called while an operation is running; rejected");
            return Err(RunnerError::AlreadyRunning);
        }
        let token = CancelToken::new();
        *slot = Some(token.clone());
        Ok(token)
    }

    /// Apply `f` to the state unless `token` has been cancelled. The slot lock
    /// orders this against `cancel` and `reset`.
    fn update(&self, token: &CancelToken, f: impl FnOnce(&mut OperationState<T>)) -> bool {
        let _slot = self.slot();
        if token.is_cancelled() {
            return false;
        }
        self.state.send_modify(f);
        true
    }

    async fn run<W, Fut, E>(
        &self,
        work: W,
        options: RunOptions<T>,
        clear_error: bool,
    ) -> Result<RunOutcome<T>, RunnerError>
    where
        W: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        options.retry.validate()?;
        let token = self.claim()?;
        let guard = RunGuard {
            runner: self,
            token,
        };
        self.update(&guard.token, |s| {
            s.is_running = true;
            s.is_waiting_to_retry = false;
            s.attempts_made = 0;
            if clear_error {
                s.last_error = None;
            }
        });
        let outcome = self.drive(&guard.token, work, options).await;
        drop(guard);
        Ok(outcome)
    }

    async fn drive<W, Fut, E>(
        &self,
        token: &CancelToken,
        mut work: W,
        mut options: RunOptions<T>,
    ) -> RunOutcome<T>
    where
        W: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Into<RawFailure>,
    {
        let policy = options.retry;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            if !self.update(token, |s| s.attempts_made = attempt) {
                return RunOutcome::Cancelled;
            }

            let result = tokio::select! {
                biased;
                () = token.cancelled() => return RunOutcome::Cancelled,
                r = work() => r,
            };

            let error = match result {
                Ok(value) => {
                    let stored = value.clone();
                    let recorded = self.update(token, move |s| {
                        s.is_running = false;
                        s.is_waiting_to_retry = false;
                        s.last_error = None;
                        s.last_result = Some(stored);
                    });
                    if !recorded {
                        return RunOutcome::Cancelled;
                    }
                    tracing::debug!(attempt, "operation succeeded");
                    // A cancel that lands after the result is recorded only
                    // suppresses the callback.
                    if !token.is_cancelled() {
                        if let Some(hook) = options.on_success.take() {
                            hook(&value);
                        }
                    }
                    return RunOutcome::Succeeded(value);
                }
                Err(e) => classify(&e.into()),
            };

            match policy.decide(attempt, &error) {
                RetryDecision::RetryAfter(delay) => {
                    if !self.update(token, |s| s.is_waiting_to_retry = true) {
                        return RunOutcome::Cancelled;
                    }
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        kind = %error.kind,
                        "attempt failed, retrying: {}",
                        error.message
                    );
                    if token.is_cancelled() {
                        return RunOutcome::Cancelled;
                    }
                    if let Some(hook) = options.on_retry_scheduled.as_mut() {
                        hook(attempt, delay, &error);
                    }
                    tokio::select! {
                        biased;
                        () = token.cancelled() => return RunOutcome::Cancelled,
                        () = tokio::time::sleep(delay) => {}
                    }
                    if !self.update(token, |s| s.is_waiting_to_retry = false) {
                        return RunOutcome::Cancelled;
                    }
                }
                RetryDecision::Stop(reason) => {
                    let failure = OperationError {
                        error,
                        reason,
                        attempts: attempt,
                    };
                    let stored = failure.clone();
                    let recorded = self.update(token, move |s| {
                        s.is_running = false;
                        s.is_waiting_to_retry = false;
                        s.last_error = Some(stored);
                    });
                    if !recorded {
                        return RunOutcome::Cancelled;
                    }
                    failure.error.log(&format!("operation failed ({reason})"));
                    if !token.is_cancelled() {
                        if let Some(hook) = options.on_failure.take() {
                            hook(&failure);
                        }
                    }
                    return RunOutcome::Failed(failure);
                }
            }
        }
    }
}

impl<T: Clone> Default for Runner<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for Runner<T> {
    fn drop(&mut self) {
        let slot = self.active.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = slot.take() {
            token.cancel();
        }
    }
}
