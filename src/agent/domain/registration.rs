//! Registry-owned runtime record for a registered agent.

use super::{AgentIdentity, AgentName};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Registration record wrapping an identity with heartbeat and counters.
///
/// Only the agent registry mutates registrations; callers receive clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRegistration {
    identity: AgentIdentity,
    registered_at: DateTime<Utc>,
    last_heartbeat: DateTime<Utc>,
    message_count: u64,
    error_count: u64,
    total_execution_time: Duration,
}

impl AgentRegistration {
    /// Creates a registration with zeroed counters and a fresh heartbeat.
    #[must_use]
    pub fn new<C: Clock + ?Sized>(identity: AgentIdentity, clock: &C) -> Self {
        let timestamp = clock.utc();
        Self {
            identity,
            registered_at: timestamp,
            last_heartbeat: timestamp,
            message_count: 0,
            error_count: 0,
            total_execution_time: Duration::ZERO,
        }
    }

    /// Returns the agent name.
    #[must_use]
    pub const fn name(&self) -> &AgentName {
        self.identity.name()
    }

    /// Returns the registered identity.
    #[must_use]
    pub const fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    /// Returns the registration timestamp.
    #[must_use]
    pub const fn registered_at(&self) -> DateTime<Utc> {
        self.registered_at
    }

    /// Returns the most recent heartbeat.
    #[must_use]
    pub const fn last_heartbeat(&self) -> DateTime<Utc> {
        self.last_heartbeat
    }

    /// Returns the number of dispatched messages, successful or not.
    #[must_use]
    pub const fn message_count(&self) -> u64 {
        self.message_count
    }

    /// Returns the number of failed dispatches.
    #[must_use]
    pub const fn error_count(&self) -> u64 {
        self.error_count
    }

    /// Returns the accumulated handler time.
    #[must_use]
    pub const fn total_execution_time(&self) -> Duration {
        self.total_execution_time
    }

    /// Returns the mean handler time, or `None` before the first dispatch.
    #[must_use]
    pub fn average_execution_time(&self) -> Option<Duration> {
        let count = u32::try_from(self.message_count).unwrap_or(u32::MAX);
        self.total_execution_time.checked_div(count)
    }

    /// Refreshes the heartbeat timestamp.
    pub fn heartbeat<C: Clock + ?Sized>(&mut self, clock: &C) {
        self.last_heartbeat = clock.utc();
    }

    /// Returns `true` while `now - last_heartbeat < timeout`.
    #[must_use]
    pub fn is_healthy<C: Clock + ?Sized>(&self, timeout: Duration, clock: &C) -> bool {
        let Ok(limit) = chrono::Duration::from_std(timeout) else {
            return true;
        };
        clock.utc().signed_duration_since(self.last_heartbeat) < limit
    }

    /// Records one dispatch outcome.
    pub fn record(&mut self, execution_time: Duration, success: bool) {
        self.message_count = self.message_count.saturating_add(1);
        if !success {
            self.error_count = self.error_count.saturating_add(1);
        }
        self.total_execution_time = self.total_execution_time.saturating_add(execution_time);
    }
}
