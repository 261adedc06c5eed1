//! Reconciliation configuration.
//!
//! Every field has a default, so an empty JSON object is a valid config:
//!
//! ```json
//! {
//!   "poll": { "max_attempts": 8, "backoff": { "strategy": "exponential", "initial_delay_ms": 250 } },
//!   "search": { "max_pages": 50, "scan": "exhaustive" }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::matcher::SearchConfig;
use crate::poller::PollPolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub poll: PollPolicy,
    pub search: SearchConfig,
}

impl ReconcileConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let backoff = &self.poll.backoff;
        if self.poll.max_attempts == 0 {
            return Err(ConfigError::Invalid("poll.max_attempts must be at least 1".into()));
        }
        if backoff.multiplier.is_nan() || backoff.multiplier < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "poll.backoff.multiplier must be >= 1.0, got {}",
                backoff.multiplier
            )));
        }
        if backoff.initial_delay_ms > backoff.max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "poll.backoff.initial_delay_ms ({}) exceeds max_delay_ms ({})",
                backoff.initial_delay_ms, backoff.max_delay_ms
            )));
        }
        if self.search.max_pages == 0 {
            return Err(ConfigError::Invalid("search.max_pages must be at least 1".into()));
        }
        if self.search.layout.attribute.is_empty() {
            return Err(ConfigError::Invalid("search.layout.attribute is required".into()));
        }
        Ok(())
    }
}
