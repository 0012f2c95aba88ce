//! The coordinator object tying registry, router, executor and monitor
//! together.
//!
//! A process builds one [`Coordinator`], registers its agents, calls
//! [`Coordinator::start`] and hands references to whoever needs to send
//! requests or run workflows. [`Coordinator::shutdown`] undoes all of it.

use crate::{
    agent::{
        domain::{AgentName, AgentRegistration},
        ports::{Agent, AgentError},
        services::{AgentRegistry, AgentSnapshot, RegistryError},
    },
    clock::SharedClock,
    config::{ConfigError, CoordinatorConfig},
    health::{HealthMonitor, HealthMonitorError},
    message::domain::Message,
    metrics::{CoordinatorMetrics, MetricsSnapshot},
    routing::{
        domain::{DispatchError, DispatchRequest},
        services::MessageRouter,
    },
    workflow::{
        domain::{WorkflowDefinition, WorkflowExecution, WorkflowId},
        ports::ProgressReporter,
        services::{WorkflowError, WorkflowExecutor},
    },
};
use mockable::DefaultClock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Result type for coordinator operations.
pub type CoordinatorResult<T> = Result<T, CoordinatorError>;

/// Errors surfaced by the coordinator facade.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoordinatorError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An agent refused to initialise.
    #[error("agent '{agent}' failed to initialise: {source}")]
    Initialization {
        /// Agent being registered.
        agent: AgentName,
        /// Initialisation failure.
        #[source]
        source: AgentError,
    },

    /// A direct or capability-addressed request failed.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// A workflow run or query failed.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// The health monitor could not be started.
    #[error(transparent)]
    Health(#[from] HealthMonitorError),
}

impl CoordinatorError {
    /// Returns whether the failed call may succeed if repeated.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Registry(err) => err.is_retryable(),
            Self::Initialization { source, .. } => source.is_retryable(),
            Self::Dispatch(err) => err.is_retryable(),
            Self::Workflow(err) => err.is_retryable(),
            Self::Config(_) | Self::Health(_) => false,
        }
    }
}

/// In-process agent coordinator.
pub struct Coordinator {
    config: CoordinatorConfig,
    registry: Arc<AgentRegistry>,
    router: Arc<MessageRouter>,
    executor: Arc<WorkflowExecutor>,
    monitor: HealthMonitor,
    metrics: Arc<CoordinatorMetrics>,
}

impl Coordinator {
    /// Builds a stopped coordinator using `clock` for timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Config`] when `config` is invalid.
    pub fn new(config: CoordinatorConfig, clock: SharedClock) -> CoordinatorResult<Self> {
        config.validate()?;
        let metrics = Arc::new(CoordinatorMetrics::new());
        let registry = Arc::new(AgentRegistry::new(Arc::clone(&clock)));
        let router = Arc::new(MessageRouter::new(
            Arc::clone(&registry),
            Arc::clone(&metrics),
            Arc::clone(&clock),
        ));
        let executor = WorkflowExecutor::new(
            Arc::clone(&router),
            Arc::clone(&metrics),
            clock,
            config.max_concurrent_tasks,
        )
        .with_default_task_timeout(config.default_task_timeout);
        let monitor = HealthMonitor::new(
            Arc::clone(&registry),
            config.heartbeat_check_interval,
            config.heartbeat_timeout,
        );
        Ok(Self {
            config,
            registry,
            router,
            executor: Arc::new(executor),
            monitor,
            metrics,
        })
    }

    /// Builds a stopped coordinator on the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Config`] when `config` is invalid.
    pub fn with_system_clock(config: CoordinatorConfig) -> CoordinatorResult<Self> {
        Self::new(config, Arc::new(DefaultClock))
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Returns the agent registry.
    #[must_use]
    pub const fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Returns the message router.
    #[must_use]
    pub const fn router(&self) -> &Arc<MessageRouter> {
        &self.router
    }

    /// Returns the workflow executor.
    #[must_use]
    pub const fn executor(&self) -> &Arc<WorkflowExecutor> {
        &self.executor
    }

    /// Starts the health monitor.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Health`] when the monitor is already
    /// running.
    pub fn start(&self) -> CoordinatorResult<()> {
        self.monitor.start()?;
        info!(
            max_concurrent_tasks = self.config.max_concurrent_tasks,
            load_balancing = %self.config.load_balancing,
            "coordinator started"
        );
        Ok(())
    }

    /// Returns whether the health monitor is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.monitor.is_running()
    }

    /// Stops the monitor, cancels unfinished workflows and shuts down and
    /// deregisters every agent.
    pub async fn shutdown(&self) {
        self.monitor.stop().await;
        let cancelled = self.executor.cancel_all();
        let mut stopped = 0_usize;
        for name in self.registry.agent_names() {
            if self.deregister_agent(&name).await {
                stopped = stopped.saturating_add(1);
            }
        }
        info!(cancelled, agents = stopped, "coordinator shut down");
    }

    /// Initialises `agent` and registers it.
    ///
    /// Declared dependencies that are not registered yet are logged, not
    /// rejected, so agents may be registered in any order.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Registry`] for duplicate names and
    /// [`CoordinatorError::Initialization`] when the agent fails to
    /// initialise. A name taken by a concurrent registration while this
    /// agent initialised is reported as a duplicate, after shutting the
    /// agent down again.
    pub async fn register_agent(
        &self,
        agent: Arc<dyn Agent>,
    ) -> CoordinatorResult<AgentRegistration> {
        let name = agent.name().clone();
        if self.registry.contains(&name) {
            return Err(RegistryError::DuplicateAgent(name).into());
        }
        agent
            .initialize()
            .await
            .map_err(|source| CoordinatorError::Initialization {
                agent: name.clone(),
                source,
            })?;

        for dependency in agent.dependencies() {
            if !self.registry.contains(dependency) {
                warn!(agent = %name, dependency = %dependency, "agent dependency is not registered");
            }
        }
        match self.registry.register(Arc::clone(&agent)) {
            Ok(registration) => Ok(registration),
            Err(err) => {
                if let Err(shutdown) = agent.shutdown().await {
                    warn!(agent = %name, error = %shutdown, "agent shutdown failed");
                }
                Err(err.into())
            }
        }
    }

    /// Deregisters `name` and shuts the agent down.
    ///
    /// Returns `false` when no such agent was registered.
    pub async fn deregister_agent(&self, name: &AgentName) -> bool {
        let Some(agent) = self.registry.deregister(name) else {
            return false;
        };
        if let Err(err) = agent.shutdown().await {
            warn!(agent = %name, error = %err, "agent shutdown failed");
        }
        true
    }

    /// Records a heartbeat for `name`; returns `false` for unknown agents.
    pub fn heartbeat(&self, name: &AgentName) -> bool {
        self.registry.heartbeat(name)
    }

    /// Returns a snapshot of the agent named `name`.
    #[must_use]
    pub fn agent(&self, name: &AgentName) -> Option<AgentSnapshot> {
        self.registry.get(name)
    }

    /// Returns snapshots of every agent in registration order.
    #[must_use]
    pub fn agents(&self) -> Vec<AgentSnapshot> {
        self.registry.list()
    }

    /// Sends a fully specified request and returns the raw reply.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Dispatch`] on any dispatch failure.
    pub async fn send(&self, request: DispatchRequest) -> CoordinatorResult<Message> {
        Ok(self.router.dispatch(request).await?)
    }

    /// Asks the agent `receiver` to run `capability` and returns the result.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Dispatch`] on any dispatch failure.
    pub async fn send_request(
        &self,
        receiver: &AgentName,
        capability: &str,
        parameters: Value,
        timeout: Option<Duration>,
    ) -> CoordinatorResult<Value> {
        let request =
            DispatchRequest::new(receiver.clone(), capability, parameters).with_timeout(timeout);
        let reply = self.router.dispatch(request).await?;
        Ok(reply.into_body().into_result().unwrap_or(Value::Null))
    }

    /// Runs `capability` on an agent picked by the configured strategy.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Dispatch`] when nobody offers the
    /// capability or the dispatch fails.
    pub async fn send_to_capability(
        &self,
        capability: &str,
        parameters: Value,
        timeout: Option<Duration>,
    ) -> CoordinatorResult<Value> {
        let reply = self
            .router
            .route(capability, parameters, self.config.load_balancing, timeout)
            .await?;
        Ok(reply.into_body().into_result().unwrap_or(Value::Null))
    }

    /// Runs `workflow` to completion.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Workflow`]; see
    /// [`WorkflowExecutor::execute_workflow_with_progress`].
    pub async fn execute_workflow(
        &self,
        workflow: WorkflowDefinition,
    ) -> CoordinatorResult<BTreeMap<String, Value>> {
        Ok(self.executor.execute_workflow(workflow).await?)
    }

    /// Runs `workflow`, reporting stage progress to `reporter`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Workflow`]; see
    /// [`WorkflowExecutor::execute_workflow_with_progress`].
    pub async fn execute_workflow_with_progress(
        &self,
        workflow: WorkflowDefinition,
        reporter: &dyn ProgressReporter,
    ) -> CoordinatorResult<BTreeMap<String, Value>> {
        Ok(self
            .executor
            .execute_workflow_with_progress(workflow, reporter)
            .await?)
    }

    /// Returns a snapshot of the run `workflow_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Workflow`] for unknown runs.
    pub fn workflow_status(&self, workflow_id: WorkflowId) -> CoordinatorResult<WorkflowExecution> {
        Ok(self.executor.get_status(workflow_id)?)
    }

    /// Cancels the run `workflow_id`; `false` when it had already finished.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Workflow`] for unknown runs.
    pub fn cancel_workflow(&self, workflow_id: WorkflowId) -> CoordinatorResult<bool> {
        Ok(self.executor.cancel(workflow_id)?)
    }

    /// Returns a point-in-time view of the coordinator counters.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(
            self.registry.len(),
            self.registry.healthy_count(self.config.heartbeat_timeout),
        )
    }
}
