use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::Error;

const MAX_GRACE_BUFFER_MS: u64 = 24 * 60 * 60 * 1000;

/// Attempt timing policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttemptPolicy {
    /// Grace buffer granted after the hard deadline when none is given explicitly
    pub grace_buffer_ms: u64,
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self {
            grace_buffer_ms: 5_000,
        }
    }
}

impl AttemptPolicy {
    pub fn from_toml_str(content: &str) -> Result<Self, Error> {
        let policy: AttemptPolicy = toml::from_str(content)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.grace_buffer_ms > MAX_GRACE_BUFFER_MS {
            return Err(Error::Config(format!(
                "grace_buffer_ms must not exceed {}",
                MAX_GRACE_BUFFER_MS
            )));
        }
        Ok(())
    }

    pub fn grace_buffer(&self) -> TimeDelta {
        TimeDelta::milliseconds(self.grace_buffer_ms.min(MAX_GRACE_BUFFER_MS) as i64)
    }

    pub fn with_grace_buffer(mut self, grace: Duration) -> Self {
        self.grace_buffer_ms = grace.as_millis() as u64;
        self
    }
}
