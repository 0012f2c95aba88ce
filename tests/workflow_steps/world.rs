//! Shared world state for workflow execution BDD scenarios.

#![expect(
    clippy::expect_used,
    reason = "Test code uses expect for assertion clarity"
)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use conductor::{
    agent::adapters::{ManagedAgent, Script, ScriptedAgent},
    config::CoordinatorConfig,
    coordinator::{Coordinator, CoordinatorResult},
    workflow::domain::{WorkflowDefinition, WorkflowExecution, WorkflowTask},
};
use mockable::DefaultClock;
use rstest::fixture;
use serde_json::{Value, json};

/// Scenario world for workflow execution behaviour tests.
pub struct WorkflowWorld {
    /// Coordinator under test.
    pub coordinator: Coordinator,
    /// Registered agents by name, kept for call assertions.
    pub agents: HashMap<String, Arc<ManagedAgent<ScriptedAgent>>>,
    /// Tasks declared so far.
    pub tasks: Vec<WorkflowTask>,
    /// Definition that was executed.
    pub workflow: Option<WorkflowDefinition>,
    /// Outcome of the last execution.
    pub outcome: Option<CoordinatorResult<BTreeMap<String, Value>>>,
}

impl WorkflowWorld {
    /// Creates a world around a coordinator on the system clock.
    ///
    /// # Panics
    ///
    /// Panics when the default configuration is rejected.
    #[must_use]
    pub fn new() -> Self {
        let coordinator = Coordinator::new(CoordinatorConfig::default(), Arc::new(DefaultClock))
            .expect("default configuration is valid");
        Self {
            coordinator,
            agents: HashMap::new(),
            tasks: Vec::new(),
            workflow: None,
            outcome: None,
        }
    }

    /// Registers a scripted agent offering one capability.
    ///
    /// # Errors
    ///
    /// Returns an error when the agent cannot be built or registered.
    pub fn register(
        &mut self,
        name: &str,
        capability: &str,
        script: Script,
    ) -> Result<(), eyre::Report> {
        let handler = ScriptedAgent::with_capabilities(name, &[capability])?.on(capability, script);
        let agent = Arc::new(ManagedAgent::new(handler, Arc::new(DefaultClock)));
        run_async(self.coordinator.register_agent(agent.clone()))?;
        self.agents.insert(name.to_owned(), agent);
        Ok(())
    }

    /// Returns the execution snapshot of the executed workflow.
    ///
    /// # Errors
    ///
    /// Returns an error when nothing was executed or the run is unknown.
    pub fn status(&self) -> Result<WorkflowExecution, eyre::Report> {
        let workflow = self
            .workflow
            .as_ref()
            .ok_or_else(|| eyre::eyre!("no workflow was executed"))?;
        Ok(self.coordinator.workflow_status(workflow.id())?)
    }
}

impl Default for WorkflowWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> WorkflowWorld {
    WorkflowWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

/// Result every scripted agent in the scenarios replies with.
#[must_use]
pub fn reply_for(agent: &str) -> Value {
    json!({ "agent": agent })
}
