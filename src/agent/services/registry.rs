//! Shared agent registry with capability index and health tracking.
//!
//! All registry state sits behind a single mutex. The lock is never held
//! across an await point, so dispatch can look up an agent handle and
//! release the lock before calling into the agent.

use crate::{
    agent::{
        domain::{AgentIdentity, AgentName, AgentRegistration, AgentStatus},
        ports::Agent,
    },
    clock::SharedClock,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Errors returned by the agent registry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// An agent with the same name is already registered.
    #[error("duplicate agent: {0}")]
    DuplicateAgent(AgentName),
}

impl RegistryError {
    /// Registration conflicts are caller errors and never retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        false
    }
}

/// Point-in-time view of one registered agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSnapshot {
    registration: AgentRegistration,
    status: AgentStatus,
}

impl AgentSnapshot {
    /// Returns the agent name.
    #[must_use]
    pub const fn name(&self) -> &AgentName {
        self.registration.name()
    }

    /// Returns the registered identity.
    #[must_use]
    pub const fn identity(&self) -> &AgentIdentity {
        self.registration.identity()
    }

    /// Returns the status reported by the agent when the snapshot was taken.
    #[must_use]
    pub const fn status(&self) -> AgentStatus {
        self.status
    }

    /// Returns the registration timestamp.
    #[must_use]
    pub const fn registered_at(&self) -> DateTime<Utc> {
        self.registration.registered_at()
    }

    /// Returns the most recent heartbeat.
    #[must_use]
    pub const fn last_heartbeat(&self) -> DateTime<Utc> {
        self.registration.last_heartbeat()
    }

    /// Returns the number of dispatched messages.
    #[must_use]
    pub const fn message_count(&self) -> u64 {
        self.registration.message_count()
    }

    /// Returns the number of failed dispatches.
    #[must_use]
    pub const fn error_count(&self) -> u64 {
        self.registration.error_count()
    }

    /// Returns the accumulated handler time.
    #[must_use]
    pub const fn total_execution_time(&self) -> Duration {
        self.registration.total_execution_time()
    }

    /// Returns the mean handler time, if any message was dispatched.
    #[must_use]
    pub fn average_execution_time(&self) -> Option<Duration> {
        self.registration.average_execution_time()
    }
}

struct RegistryEntry {
    registration: AgentRegistration,
    handle: Arc<dyn Agent>,
}

#[derive(Default)]
struct RegistryState {
    agents: HashMap<AgentName, RegistryEntry>,
    order: Vec<AgentName>,
    capability_index: HashMap<String, Vec<AgentName>>,
}

/// Thread-safe registry of agents indexed by name and capability.
pub struct AgentRegistry {
    clock: SharedClock,
    state: Mutex<RegistryState>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            state: Mutex::new(RegistryState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `agent` and indexes each of its capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateAgent`] when the name is taken; the
    /// existing registration and index entries are left untouched.
    pub fn register(&self, agent: Arc<dyn Agent>) -> RegistryResult<AgentRegistration> {
        let identity = agent.identity().clone();
        let name = identity.name().clone();
        let mut state = self.state();

        if state.agents.contains_key(&name) {
            return Err(RegistryError::DuplicateAgent(name));
        }

        for capability in identity.capabilities() {
            state
                .capability_index
                .entry(capability.name().to_owned())
                .or_default()
                .push(name.clone());
        }
        let registration = AgentRegistration::new(identity, &*self.clock);
        state.order.push(name.clone());
        state.agents.insert(
            name.clone(),
            RegistryEntry {
                registration: registration.clone(),
                handle: agent,
            },
        );
        drop(state);

        info!(agent = %name, "agent registered");
        Ok(registration)
    }

    /// Removes `name` and purges it from every capability index entry.
    ///
    /// Returns the removed agent handle, or `None` when the agent was not
    /// registered.
    pub fn deregister(&self, name: &AgentName) -> Option<Arc<dyn Agent>> {
        let mut state = self.state();
        let entry = state.agents.remove(name)?;
        state.order.retain(|registered| registered != name);
        state.capability_index.retain(|_, providers| {
            providers.retain(|provider| provider != name);
            !providers.is_empty()
        });
        drop(state);

        info!(agent = %name, "agent deregistered");
        Some(entry.handle)
    }

    /// Returns the agents offering `capability`, in registration order.
    #[must_use]
    pub fn find_agents(&self, capability: &str) -> Vec<AgentName> {
        self.state()
            .capability_index
            .get(capability)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns each provider of `capability` with its dispatched message
    /// count, in registration order.
    #[must_use]
    pub fn provider_loads(&self, capability: &str) -> Vec<(AgentName, u64)> {
        let state = self.state();
        state
            .capability_index
            .get(capability)
            .map(|providers| {
                providers
                    .iter()
                    .filter_map(|name| {
                        state
                            .agents
                            .get(name)
                            .map(|entry| (name.clone(), entry.registration.message_count()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the handle of a registered agent.
    #[must_use]
    pub fn agent(&self, name: &AgentName) -> Option<Arc<dyn Agent>> {
        self.state()
            .agents
            .get(name)
            .map(|entry| Arc::clone(&entry.handle))
    }

    /// Returns whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &AgentName) -> bool {
        self.state().agents.contains_key(name)
    }

    /// Refreshes the heartbeat of `name`. Returns `false` when the agent is
    /// not registered.
    pub fn heartbeat(&self, name: &AgentName) -> bool {
        let mut state = self.state();
        let Some(entry) = state.agents.get_mut(name) else {
            return false;
        };
        entry.registration.heartbeat(&*self.clock);
        debug!(agent = %name, "heartbeat received");
        true
    }

    /// Returns `true` iff `name` is registered and its last heartbeat is
    /// younger than `timeout`.
    #[must_use]
    pub fn is_healthy(&self, name: &AgentName, timeout: Duration) -> bool {
        self.state()
            .agents
            .get(name)
            .is_some_and(|entry| entry.registration.is_healthy(timeout, &*self.clock))
    }

    /// Records a dispatch outcome against `name`. Unknown names are ignored.
    pub fn record(&self, name: &AgentName, execution_time: Duration, success: bool) {
        if let Some(entry) = self.state().agents.get_mut(name) {
            entry.registration.record(execution_time, success);
        }
    }

    /// Returns the agents whose heartbeat is older than `timeout`.
    #[must_use]
    pub fn stale_agents(&self, timeout: Duration) -> Vec<AgentName> {
        let state = self.state();
        state
            .order
            .iter()
            .filter(|name| {
                state
                    .agents
                    .get(*name)
                    .is_some_and(|entry| !entry.registration.is_healthy(timeout, &*self.clock))
            })
            .cloned()
            .collect()
    }

    /// Returns how many registered agents have a fresh heartbeat.
    #[must_use]
    pub fn healthy_count(&self, timeout: Duration) -> usize {
        self.state()
            .agents
            .values()
            .filter(|entry| entry.registration.is_healthy(timeout, &*self.clock))
            .count()
    }

    /// Returns a snapshot of `name`.
    #[must_use]
    pub fn get(&self, name: &AgentName) -> Option<AgentSnapshot> {
        let (registration, handle) = {
            let state = self.state();
            let entry = state.agents.get(name)?;
            (entry.registration.clone(), Arc::clone(&entry.handle))
        };
        Some(AgentSnapshot {
            registration,
            status: handle.status(),
        })
    }

    /// Returns snapshots of every agent in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<AgentSnapshot> {
        let entries: Vec<(AgentRegistration, Arc<dyn Agent>)> = {
            let state = self.state();
            state
                .order
                .iter()
                .filter_map(|name| state.agents.get(name))
                .map(|entry| (entry.registration.clone(), Arc::clone(&entry.handle)))
                .collect()
        };
        entries
            .into_iter()
            .map(|(registration, handle)| AgentSnapshot {
                registration,
                status: handle.status(),
            })
            .collect()
    }

    /// Returns registered names in registration order.
    #[must_use]
    pub fn agent_names(&self) -> Vec<AgentName> {
        self.state().order.clone()
    }

    /// Returns the number of registered agents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().agents.len()
    }

    /// Returns whether no agent is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().agents.is_empty()
    }
}
