use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::state::StopReason;
use crate::classify::ClassifiedError;

/// Invalid retry configuration, rejected before a run starts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptionsError {
    #[error("initial_delay_ms must be greater than zero")]
    ZeroInitialDelay,
    #[error("max_delay_ms must be greater than zero")]
    ZeroMaxDelay,
    #[error("backoff_multiplier must be a finite number greater than 1 (got {0})")]
    BadMultiplier(f64),
}

/// Decision returned by the retry policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Give up; the reason says why.
    Stop(StopReason),
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff parameters.
///
/// Also the `[retry]` table of `config.toml`; missing keys take the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
    /// Growth factor between consecutive delays.
    pub backoff_multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryOptions {
    pub fn validate(&self) -> Result<(), OptionsError> {
        if self.initial_delay_ms == 0 {
            return Err(OptionsError::ZeroInitialDelay);
        }
        if self.max_delay_ms == 0 {
            return Err(OptionsError::ZeroMaxDelay);
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier <= 1.0 {
            return Err(OptionsError::BadMultiplier(self.backoff_multiplier));
        }
        Ok(())
    }

    /// Delay after failed attempt `attempt` (1-based):
    /// `initial * multiplier^(attempt-1)`, never above `max_delay_ms`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let raw = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(exp);
        let cap = self.max_delay_ms as f64;
        // Overflow to inf (or NaN from a bad multiplier) also lands on the cap.
        let ms = if raw.is_finite() { raw.min(cap) } else { cap };
        Duration::from_millis(ms as u64)
    }

    /// Decide what to do after attempt `attempt` (1-based) failed with `error`.
    pub fn decide(&self, attempt: u32, error: &ClassifiedError) -> RetryDecision {
        if !error.is_retryable {
            return RetryDecision::Stop(StopReason::NotRetryable);
        }
        if attempt > self.max_retries {
            return RetryDecision::Stop(StopReason::RetriesExhausted);
        }
        RetryDecision::RetryAfter(self.delay_for(attempt))
    }
}
