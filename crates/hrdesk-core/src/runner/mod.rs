//! Async operation runner.
//!
//! A [`Runner`] executes a caller-supplied async unit of work, classifies
//! every failure, and retries retryable ones with capped exponential backoff.
//! Its [`OperationState`] is published on every transition so callers can
//! render loading / error / retrying without polling.

mod cancel;
mod options;
mod run;
mod state;

pub use cancel::CancelToken;
pub use options::{OptionsError, RetryDecision, RetryOptions};
pub use run::{RunOptions, Runner, RunnerError};
pub use state::{OperationError, OperationState, RunOutcome, StopReason};

#[cfg(test)]
mod tests;
