//! Coordinator configuration.

use crate::routing::domain::LoadBalanceStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_MAX_CONCURRENT_TASKS: usize = 10;
const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_HEARTBEAT_CHECK_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(300);

/// Errors returned by [`CoordinatorConfig::validate`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_concurrent_tasks` is zero.
    #[error("max_concurrent_tasks must be greater than zero")]
    ZeroConcurrency,

    /// `heartbeat_timeout` is zero.
    #[error("heartbeat_timeout must be greater than zero")]
    ZeroHeartbeatTimeout,

    /// `heartbeat_check_interval` is zero.
    #[error("heartbeat_check_interval must be greater than zero")]
    ZeroCheckInterval,

    /// `default_task_timeout` is set to zero.
    #[error("default_task_timeout must be greater than zero when set")]
    ZeroTaskTimeout,
}

/// Tunables for a [`Coordinator`](crate::coordinator::Coordinator).
///
/// Missing fields deserialise to their defaults.
///
/// # Examples
///
/// ```
/// use conductor::config::CoordinatorConfig;
/// use conductor::routing::domain::LoadBalanceStrategy;
/// use std::time::Duration;
///
/// let config = CoordinatorConfig::default()
///     .with_max_concurrent_tasks(4)
///     .with_load_balancing(LoadBalanceStrategy::LeastLoaded)
///     .with_default_task_timeout(Duration::from_secs(30));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Upper bound on workflow tasks in flight across all runs.
    pub max_concurrent_tasks: usize,
    /// Heartbeat age after which an agent is considered unhealthy.
    pub heartbeat_timeout: Duration,
    /// Period of the health monitor loop.
    pub heartbeat_check_interval: Duration,
    /// Deadline for workflow tasks that declare none; `None` waits forever.
    pub default_task_timeout: Option<Duration>,
    /// Strategy for capability-addressed requests.
    pub load_balancing: LoadBalanceStrategy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: DEFAULT_MAX_CONCURRENT_TASKS,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            heartbeat_check_interval: DEFAULT_HEARTBEAT_CHECK_INTERVAL,
            default_task_timeout: Some(DEFAULT_TASK_TIMEOUT),
            load_balancing: LoadBalanceStrategy::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Sets the global concurrency width.
    #[must_use]
    pub const fn with_max_concurrent_tasks(mut self, max_concurrent_tasks: usize) -> Self {
        self.max_concurrent_tasks = max_concurrent_tasks;
        self
    }

    /// Sets the heartbeat timeout.
    #[must_use]
    pub const fn with_heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// Sets the health monitor period.
    #[must_use]
    pub const fn with_heartbeat_check_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_check_interval = interval;
        self
    }

    /// Sets the default task deadline.
    #[must_use]
    pub const fn with_default_task_timeout(mut self, timeout: Duration) -> Self {
        self.default_task_timeout = Some(timeout);
        self
    }

    /// Lets tasks without a declared deadline wait indefinitely.
    #[must_use]
    pub const fn without_default_task_timeout(mut self) -> Self {
        self.default_task_timeout = None;
        self
    }

    /// Sets the load-balancing strategy.
    #[must_use]
    pub const fn with_load_balancing(mut self, strategy: LoadBalanceStrategy) -> Self {
        self.load_balancing = strategy;
        self
    }

    /// Checks that every bound is usable.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] naming the first zero value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_tasks == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.heartbeat_timeout.is_zero() {
            return Err(ConfigError::ZeroHeartbeatTimeout);
        }
        if self.heartbeat_check_interval.is_zero() {
            return Err(ConfigError::ZeroCheckInterval);
        }
        if self.default_task_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::ZeroTaskTimeout);
        }
        Ok(())
    }
}
