//! Retry policy for soft-blocked pages.
//!
//! Backoff is exponential in the configured factor with jitter on top, so
//! concurrent jobs that hit a block together do not retry in lockstep.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ConfigurationError;

/// Jitter applied on top of the computed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter.
    None,
    /// Random from 0 to delay.
    Full,
    /// Half fixed, half random.
    Equal,
    /// Delay plus a random amount up to `jitter_max_ms`.
    #[default]
    Additive,
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// No more retries, give up.
    GiveUp,
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_backoff_factor() -> f64 {
    1.5
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_jitter_max_ms() -> u64 {
    500
}

fn default_rotate_user_agent() -> bool {
    true
}

/// How a page is retried after a soft block.
///
/// `max_retries` counts retries only: a page is fetched at most
/// `max_retries + 1` times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Retries after the first fetch.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Multiplier applied per further retry.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    /// Cap on the computed delay, before jitter.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Jitter strategy.
    #[serde(default)]
    pub jitter: JitterStrategy,
    /// Upper bound of additive jitter, in milliseconds.
    #[serde(default = "default_jitter_max_ms")]
    pub jitter_max_ms: u64,
    /// Send a different User-Agent on every retry.
    #[serde(default = "default_rotate_user_agent")]
    pub rotate_user_agent: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            backoff_factor: default_backoff_factor(),
            max_delay_ms: default_max_delay_ms(),
            jitter: JitterStrategy::default(),
            jitter_max_ms: default_jitter_max_ms(),
            rotate_user_agent: default_rotate_user_agent(),
        }
    }
}

impl RetryPolicy {
    /// Creates the default policy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    #[must_use]
    pub fn no_retries() -> Self {
        Self::default().with_max_retries(0)
    }

    /// Sets the retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the backoff factor.
    #[must_use]
    pub fn with_backoff_factor(mut self, factor: f64) -> Self {
        self.backoff_factor = factor;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return Err(ConfigurationError::Invalid(format!(
                "backoffFactor must be >= 1.0, got {}",
                self.backoff_factor
            )));
        }
        if self.max_delay_ms < self.base_delay_ms {
            return Err(ConfigurationError::Invalid(format!(
                "maxDelayMs ({}) is below baseDelayMs ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }
        Ok(())
    }

    /// Backoff without jitter for the `retry`-th retry (1-based).
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn base_delay_for_retry(&self, retry: u32) -> u64 {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let scaled = self.base_delay_ms as f64 * self.backoff_factor.powi(exponent);
        if scaled.is_finite() && scaled < self.max_delay_ms as f64 {
            scaled.round() as u64
        } else {
            self.max_delay_ms
        }
    }

    /// Delay to wait before the `retry`-th retry (1-based), jitter included.
    #[must_use]
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let delay = self.base_delay_for_retry(retry);
        let jittered = match self.jitter {
            JitterStrategy::None => delay,
            JitterStrategy::Full => {
                if delay == 0 {
                    0
                } else {
                    rand::thread_rng().gen_range(0..=delay)
                }
            }
            JitterStrategy::Equal => {
                let half = delay / 2;
                if half == 0 {
                    delay
                } else {
                    half + rand::thread_rng().gen_range(0..=half)
                }
            }
            JitterStrategy::Additive => {
                if self.jitter_max_ms == 0 {
                    delay
                } else {
                    delay.saturating_add(rand::thread_rng().gen_range(0..=self.jitter_max_ms))
                }
            }
        };
        Duration::from_millis(jittered)
    }

    /// Decides whether to retry after `retries_done` retries have been spent.
    #[must_use]
    pub fn decide(&self, retries_done: u32) -> RetryDecision {
        if retries_done >= self.max_retries {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry(self.delay_for_retry(retries_done + 1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact() -> RetryPolicy {
        RetryPolicy::new().with_jitter(JitterStrategy::None)
    }

    #[test]
    fn test_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.base_delay_ms, 1000);
        assert!((policy.backoff_factor - 1.5).abs() < f64::EPSILON);
        assert_eq!(policy.jitter, JitterStrategy::Additive);

        let parsed: RetryPolicy = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, policy);
    }

    #[test]
    fn test_exponential_delays() {
        let policy = exact();
        assert_eq!(policy.delay_for_retry(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_retry(2), Duration::from_millis(1500));
        assert_eq!(policy.delay_for_retry(3), Duration::from_millis(2250));
    }

    #[test]
    fn test_delay_capped() {
        let policy = exact().with_max_delay_ms(2000);
        assert_eq!(policy.delay_for_retry(10), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_retry(u32::MAX), Duration::from_millis(2000));
    }

    #[test]
    fn test_additive_jitter_bounds() {
        let policy = RetryPolicy::new().with_base_delay_ms(100);
        for _ in 0..20 {
            let delay = policy.delay_for_retry(1).as_millis();
            assert!((100..=600).contains(&delay), "delay {delay}");
        }
    }

    #[test]
    fn test_full_and_equal_jitter_bounds() {
        let full = RetryPolicy::new()
            .with_base_delay_ms(100)
            .with_jitter(JitterStrategy::Full);
        let equal = full.clone().with_jitter(JitterStrategy::Equal);
        for _ in 0..20 {
            assert!(full.delay_for_retry(1).as_millis() <= 100);
            let d = equal.delay_for_retry(1).as_millis();
            assert!((50..=100).contains(&d));
        }
    }

    #[test]
    fn test_decide_spends_budget() {
        let policy = exact().with_max_retries(2);
        assert!(matches!(policy.decide(0), RetryDecision::Retry(_)));
        assert!(matches!(policy.decide(1), RetryDecision::Retry(_)));
        assert_eq!(policy.decide(2), RetryDecision::GiveUp);
        assert_eq!(RetryPolicy::no_retries().decide(0), RetryDecision::GiveUp);
    }

    #[test]
    fn test_validate() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(RetryPolicy::default().with_backoff_factor(0.5).validate().is_err());
        assert!(RetryPolicy::default()
            .with_base_delay_ms(5000)
            .with_max_delay_ms(10)
            .validate()
            .is_err());
    }
}
