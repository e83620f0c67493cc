use serde::Serialize;
use std::fmt;

use crate::classify::ClassifiedError;

/// Why a run gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The last failure was of a kind that retrying will not fix.
    NotRetryable,
    /// The failure was retryable but the retry budget ran out.
    RetriesExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::NotRetryable => f.write_str("not retryable"),
            StopReason::RetriesExhausted => f.write_str("retries exhausted"),
        }
    }
}

/// Final failure of a run: the classified error plus how the run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{error} ({reason} after {attempts} attempt(s))")]
pub struct OperationError {
    pub error: ClassifiedError,
    pub reason: StopReason,
    pub attempts: u32,
}

impl OperationError {
    pub fn retries_exhausted(&self) -> bool {
        self.reason == StopReason::RetriesExhausted
    }
}

/// Observable snapshot of a runner.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationState<T> {
    pub is_running: bool,
    pub last_error: Option<OperationError>,
    pub last_result: Option<T>,
    /// Executions of the work function in the current (or last) run.
    pub attempts_made: u32,
    pub is_waiting_to_retry: bool,
}

impl<T> Default for OperationState<T> {
    fn default() -> Self {
        Self {
            is_running: false,
            last_error: None,
            last_result: None,
            attempts_made: 0,
            is_waiting_to_retry: false,
        }
    }
}

/// How a call to `start` / `retry` ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome<T> {
    Succeeded(T),
    Failed(OperationError),
    /// The run was cancelled; nothing was recorded and no callback fired.
    Cancelled,
}

impl<T> RunOutcome<T> {
    /// Convert into a `Result`, treating cancellation as `None`.
    pub fn into_result(self) -> Option<Result<T, OperationError>> {
        match self {
            RunOutcome::Succeeded(v) => Some(Ok(v)),
            RunOutcome::Failed(e) => Some(Err(e)),
            RunOutcome::Cancelled => None,
        }
    }
}
