//! Coordinator configuration.
//!
//! Defaults work for tests and the demo. `from_env` is for deployments where
//! several processes must agree on the namespace.

use std::time::Duration;

use crate::domain::{CoordError, Result};

pub const ENV_NAMESPACE: &str = "LOOM_NAMESPACE";
pub const ENV_POLL_TIMEOUT_MS: &str = "LOOM_POLL_TIMEOUT_MS";
pub const ENV_SHUTDOWN_POLL_MS: &str = "LOOM_SHUTDOWN_POLL_MS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Prepended to every key, isolating this coordinator's data.
    pub namespace: String,

    /// Upper bound on one blocking pop. A waiter notices shutdown within
    /// this long.
    pub poll_timeout: Duration,

    /// How often `shutdown` re-checks the waiter count.
    pub shutdown_poll_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            namespace: "loom".to_string(),
            poll_timeout: Duration::from_secs(1),
            shutdown_poll_interval: Duration::from_millis(50),
        }
    }
}

impl CoordinatorConfig {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn with_shutdown_poll_interval(mut self, interval: Duration) -> Self {
        self.shutdown_poll_interval = interval;
        self
    }

    /// Load from environment variables, falling back to defaults for any
    /// that are unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            namespace: lookup(ENV_NAMESPACE).unwrap_or(defaults.namespace),
            poll_timeout: millis_var(&lookup, ENV_POLL_TIMEOUT_MS)?
                .unwrap_or(defaults.poll_timeout),
            shutdown_poll_interval: millis_var(&lookup, ENV_SHUTDOWN_POLL_MS)?
                .unwrap_or(defaults.shutdown_poll_interval),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(CoordError::InvalidInput("namespace must not be empty".into()));
        }
        if self.poll_timeout.is_zero() {
            return Err(CoordError::InvalidInput("poll_timeout must be positive".into()));
        }
        if self.shutdown_poll_interval.is_zero() {
            return Err(CoordError::InvalidInput(
                "shutdown_poll_interval must be positive".into(),
            ));
        }
        Ok(())
    }
}

fn millis_var(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<Duration>> {
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| CoordError::InvalidInput(format!("{name}={raw:?}: {e}")))
        })
        .transpose()
}
