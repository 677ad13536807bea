use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Upper bound for a single pause; keeps large multipliers from overflowing `Duration`.
const MAX_DELAY: Duration = Duration::from_secs(3600);

/// Deterministic retry schedule for control-plane calls.
///
/// After the n-th failed attempt the caller waits `first_delay * factor^(n-1)` before
/// attempt n+1. There is no jitter; the schedule is the same on every run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Always at least 1.
    pub attempts: u32,
    /// Pause after the first failed attempt, in milliseconds.
    pub first_delay_ms: u64,
    /// Multiplier applied to the pause after every failed attempt.
    pub factor: f64,
}

impl RetryPolicy {
    pub fn new(attempts: u32, first_delay: Duration, factor: f64) -> ModelResult<Self> {
        let policy = Self {
            attempts,
            first_delay_ms: u64::try_from(first_delay.as_millis()).unwrap_or(u64::MAX),
            factor,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Rules:
    /// - `attempts >= 1`;
    /// - `factor` is finite and not negative.
    pub fn validate(&self) -> ModelResult<()> {
        if self.attempts == 0 {
            return Err(ModelError::InvalidRetry("attempts must be at least 1".into()));
        }
        if !self.factor.is_finite() || self.factor < 0.0 {
            return Err(ModelError::InvalidRetry(format!(
                "backoff factor must be a finite non-negative number, got {}",
                self.factor
            )));
        }
        Ok(())
    }

    pub fn first_delay(&self) -> Duration {
        Duration::from_millis(self.first_delay_ms)
    }

    /// Pause that follows the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.first_delay().as_secs_f64() * self.factor.powi(exp);
        Duration::try_from_secs_f64(secs)
            .map(|d| d.min(MAX_DELAY))
            .unwrap_or(MAX_DELAY)
    }

    /// Every pause the policy can produce, in order (`attempts - 1` entries).
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.attempts).map(|n| self.delay_after(n)).collect()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 6,
            first_delay_ms: 1_000,
            factor: 2.0,
        }
    }
}
