//! Background loop that deregisters agents with stale heartbeats.

use crate::agent::{domain::AgentName, ports::Agent, services::AgentRegistry};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Errors returned while controlling the monitor loop.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HealthMonitorError {
    /// `start` was called while the loop is running.
    #[error("health monitor is already running")]
    AlreadyRunning,

    /// The check interval is zero.
    #[error("health check interval must be greater than zero")]
    ZeroInterval,
}

/// Periodically evicts agents whose heartbeat is older than the timeout.
///
/// Evicted agents are deregistered and then shut down.
///
/// The loop is started and stopped explicitly. Dropping the monitor aborts
/// a loop that was never stopped.
pub struct HealthMonitor {
    registry: Arc<AgentRegistry>,
    check_interval: Duration,
    heartbeat_timeout: Duration,
    worker: Mutex<Option<Worker>>,
}

struct Worker {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl HealthMonitor {
    /// Creates a stopped monitor.
    #[must_use]
    pub const fn new(
        registry: Arc<AgentRegistry>,
        check_interval: Duration,
        heartbeat_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            check_interval,
            heartbeat_timeout,
            worker: Mutex::new(None),
        }
    }

    /// Returns the interval between sweeps.
    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Returns the heartbeat age after which agents are evicted.
    #[must_use]
    pub const fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    /// Evicts every stale agent once and returns the evicted names.
    pub async fn sweep(&self) -> Vec<AgentName> {
        evict_stale(&self.registry, self.heartbeat_timeout).await
    }

    /// Spawns the monitor loop on the current tokio runtime.
    ///
    /// The first sweep runs one interval after the call.
    ///
    /// # Errors
    ///
    /// Returns [`HealthMonitorError::AlreadyRunning`] when a loop is active
    /// and [`HealthMonitorError::ZeroInterval`] for a zero interval.
    pub fn start(&self) -> Result<(), HealthMonitorError> {
        if self.check_interval.is_zero() {
            return Err(HealthMonitorError::ZeroInterval);
        }
        let mut worker = self.worker();
        if worker.as_ref().is_some_and(|active| !active.task.is_finished()) {
            return Err(HealthMonitorError::AlreadyRunning);
        }

        let (shutdown, mut stop_signal) = oneshot::channel();
        let registry = Arc::clone(&self.registry);
        let period = self.check_interval;
        let timeout = self.heartbeat_timeout;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop_signal => break,
                    _ = ticker.tick() => {
                        let evicted = evict_stale(&registry, timeout).await;
                        debug!(evicted = evicted.len(), "health sweep finished");
                    }
                }
            }
        });
        *worker = Some(Worker { shutdown, task });
        drop(worker);

        info!(
            interval_ms = period.as_millis(),
            timeout_ms = timeout.as_millis(),
            "health monitor started"
        );
        Ok(())
    }

    /// Stops the loop and waits for it to exit.
    ///
    /// Returns `false` when the monitor was not running.
    pub async fn stop(&self) -> bool {
        let Some(active) = self.worker().take() else {
            return false;
        };
        if active.shutdown.send(()).is_err() {
            debug!("health monitor loop already exited");
        }
        if let Err(err) = active.task.await {
            warn!(error = %err, "health monitor loop ended abnormally");
        }
        info!("health monitor stopped");
        true
    }

    /// Returns whether the loop is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.worker()
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    fn worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        if let Some(active) = self.worker().take() {
            active.task.abort();
        }
    }
}

async fn evict_stale(registry: &AgentRegistry, timeout: Duration) -> Vec<AgentName> {
    let evicted: Vec<(AgentName, Arc<dyn Agent>)> = registry
        .stale_agents(timeout)
        .into_iter()
        .filter(|name| !registry.is_healthy(name, timeout))
        .filter_map(|name| registry.deregister(&name).map(|agent| (name, agent)))
        .collect();

    let mut names = Vec::with_capacity(evicted.len());
    for (name, agent) in evicted {
        warn!(agent = %name, "evicted agent with stale heartbeat");
        if let Err(err) = agent.shutdown().await {
            warn!(agent = %name, error = %err, "evicted agent failed to shut down");
        }
        names.push(name);
    }
    names
}
