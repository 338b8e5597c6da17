//! Bounded retry with exponential backoff and jitter.
//!
//! A [`RetryPolicy`] is created fresh for every logical call, so attempt
//! counters never leak between calls.

use rand::Rng;
use std::time::Duration;

/// Configuration for transient-failure retries.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on any single computed delay.
    pub max_delay: Duration,
    /// Backoff strategy to use.
    pub backoff: BackoffStrategy,
    /// Whether to honor `Retry-After` on 429/503 responses.
    pub respect_retry_after: bool,
    /// Cap on a server-supplied `Retry-After`.
    pub max_retry_after: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff: BackoffStrategy::ExponentialWithJitter { factor: 2.0 },
            respect_retry_after: true,
            max_retry_after: Duration::from_secs(60),
        }
    }
}

impl RetryConfig {
    /// Set the retry ceiling.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay before the first retry.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the cap on computed delays.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff strategy.
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Never retry transient failures.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }
}

/// How retry delays grow between attempts.
#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    /// Same delay every time.
    Constant,
    /// `initial * (attempt + 1)`.
    Linear,
    /// `initial * factor^attempt`.
    Exponential { factor: f64 },
    /// Exponential plus up to 100% random jitter.
    ExponentialWithJitter { factor: f64 },
}

impl BackoffStrategy {
    /// Delay for a 0-indexed attempt, capped at `max_delay`.
    pub fn delay(&self, attempt: u32, initial_delay: Duration, max_delay: Duration) -> Duration {
        let delay = match self {
            BackoffStrategy::Constant => initial_delay,
            BackoffStrategy::Linear => initial_delay.saturating_mul(attempt + 1),
            BackoffStrategy::Exponential { factor } => {
                scale(initial_delay, factor.powi(attempt as i32))
            }
            BackoffStrategy::ExponentialWithJitter { factor } => {
                let base = scale(initial_delay, factor.powi(attempt as i32)).min(max_delay);
                let jitter: f64 = rand::rng().random();
                base.saturating_add(scale(base, jitter))
            }
        };

        std::cmp::min(delay, max_delay)
    }
}

fn scale(delay: Duration, multiplier: f64) -> Duration {
    let secs = delay.as_secs_f64() * multiplier;
    if secs.is_finite() && secs < u32::MAX as f64 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::MAX
    }
}

/// Per-call retry state.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
    attempt: u32,
}

impl RetryPolicy {
    /// Create a new retry policy from config.
    pub fn new(config: RetryConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Number of retries already granted.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns true while the ceiling has not been reached.
    pub fn should_retry(&self) -> bool {
        self.attempt < self.config.max_attempts
    }

    /// Consume one retry and return the delay before it, or `None` once the
    /// ceiling is reached.
    pub fn next_delay(&mut self, retry_after: Option<Duration>) -> Option<Duration> {
        if !self.should_retry() {
            return None;
        }

        let computed = || {
            self.config.backoff.delay(
                self.attempt,
                self.config.initial_delay,
                self.config.max_delay,
            )
        };

        let delay = match retry_after {
            Some(hint) if self.config.respect_retry_after => {
                std::cmp::min(hint, self.config.max_retry_after)
            }
            _ => computed(),
        };

        self.attempt += 1;
        Some(delay)
    }
}
