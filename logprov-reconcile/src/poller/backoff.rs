//! Delay growth between convergence attempts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    Fixed,
    Linear,
    #[default]
    Exponential,
}

/// Backoff parameters. Delays are in milliseconds so the struct reads
/// naturally from JSON config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Backoff {
    pub strategy: BackoffStrategy,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Growth factor for [`BackoffStrategy::Exponential`].
    pub multiplier: f64,
}

impl Default for Backoff {
    /// Exponential, 500ms doubling up to 10s.
    fn default() -> Self {
        Self {
            strategy: BackoffStrategy::Exponential,
            initial_delay_ms: 500,
            max_delay_ms: 10_000,
            multiplier: 2.0,
        }
    }
}

impl Backoff {
    pub fn fixed(delay: Duration) -> Self {
        let ms = millis(delay);
        Self {
            strategy: BackoffStrategy::Fixed,
            initial_delay_ms: ms,
            max_delay_ms: ms,
            multiplier: 1.0,
        }
    }

    pub fn exponential(initial: Duration, max: Duration) -> Self {
        Self {
            strategy: BackoffStrategy::Exponential,
            initial_delay_ms: millis(initial),
            max_delay_ms: millis(max),
            multiplier: 2.0,
        }
    }

    /// Delay before retry number `retry` (0 = the wait after the first
    /// unsuccessful attempt). Never exceeds `max_delay_ms`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let ms = match self.strategy {
            BackoffStrategy::Fixed => self.initial_delay_ms,
            BackoffStrategy::Linear => self
                .initial_delay_ms
                .saturating_mul(u64::from(retry).saturating_add(1)),
            BackoffStrategy::Exponential => {
                let exp = i32::try_from(retry).unwrap_or(i32::MAX);
                let grown = self.initial_delay_ms as f64 * self.multiplier.powi(exp);
                // f64 -> u64 casts saturate, infinity included
                grown.min(self.max_delay_ms as f64) as u64
            }
        };
        Duration::from_millis(ms.min(self.max_delay_ms))
    }
}

fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}
