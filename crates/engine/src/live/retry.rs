//! Bounded exponential backoff for push reconnection

use crate::config::LiveConfig;
use backoff::backoff::Backoff as _;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;

const BACKOFF_MULTIPLIER: f64 = 2.0;

/// Outcome of asking the budget for another attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Reconnect after `delay`; `attempt` is 1-based
    Retry { attempt: u32, delay: Duration },
    /// No attempts left, give up on push
    Exhausted,
}

/// Reconnect attempt counter with a doubling delay.
///
/// Attempt `n` waits `base_delay * 2^(n-1)`, capped at `max_delay`. No jitter.
pub struct RetryBudget {
    attempts: u32,
    max_attempts: u32,
    max_delay: Duration,
    backoff: ExponentialBackoff,
}

impl RetryBudget {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        let backoff = ExponentialBackoffBuilder::default()
            .with_initial_interval(base_delay.min(max_delay))
            .with_max_interval(max_delay)
            .with_multiplier(BACKOFF_MULTIPLIER)
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None) // Attempts are bounded separately
            .build();

        Self {
            attempts: 0,
            max_attempts,
            max_delay,
            backoff,
        }
    }

    pub fn from_config(config: &LiveConfig) -> Self {
        Self::new(
            config.max_reconnect_attempts,
            config.reconnect_delay(),
            config.max_reconnect_delay(),
        )
    }

    /// Consume one attempt, if any are left
    pub fn next(&mut self) -> RetryDecision {
        if self.attempts >= self.max_attempts {
            return RetryDecision::Exhausted;
        }

        self.attempts += 1;
        let delay = self.backoff.next_backoff().unwrap_or(self.max_delay);
        RetryDecision::Retry {
            attempt: self.attempts,
            delay,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Called after a successful connection
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.backoff.reset();
    }
}
