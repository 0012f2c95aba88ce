//! Workflow task declaration.

use super::WorkflowDomainError;
use crate::agent::domain::AgentName;
use crate::message::domain::MessagePriority;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// One node of a workflow graph, pinned to an agent capability.
///
/// # Examples
///
/// ```
/// use conductor::workflow::domain::WorkflowTask;
/// use serde_json::json;
///
/// let task = WorkflowTask::new("storyboard", "illustrator", "draw")?
///     .with_parameters(json!({"panels": 6}))
///     .depends_on("script");
/// assert_eq!(task.dependencies(), ["script".to_owned()]);
/// # Ok::<(), conductor::workflow::domain::WorkflowDomainError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTask {
    name: String,
    agent: AgentName,
    capability: String,
    parameters: Value,
    dependencies: Vec<String>,
    priority: MessagePriority,
    timeout: Option<Duration>,
}

impl WorkflowTask {
    /// Creates a task with empty parameters, no dependencies and medium
    /// priority.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyTaskName`],
    /// [`WorkflowDomainError::EmptyCapability`] or
    /// [`WorkflowDomainError::InvalidAgent`] when the respective value is
    /// blank or invalid.
    pub fn new(
        name: impl Into<String>,
        agent: &str,
        capability: impl Into<String>,
    ) -> Result<Self, WorkflowDomainError> {
        let task_name = name.into().trim().to_owned();
        if task_name.is_empty() {
            return Err(WorkflowDomainError::EmptyTaskName);
        }
        let capability_name = capability.into().trim().to_owned();
        if capability_name.is_empty() {
            return Err(WorkflowDomainError::EmptyCapability(task_name));
        }
        Ok(Self {
            name: task_name,
            agent: AgentName::new(agent)?,
            capability: capability_name,
            parameters: Value::Object(serde_json::Map::new()),
            dependencies: Vec::new(),
            priority: MessagePriority::default(),
            timeout: None,
        })
    }

    /// Sets the request parameters.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Adds a dependency on the task named `task`. Repeats are ignored.
    #[must_use]
    pub fn depends_on(mut self, task: impl Into<String>) -> Self {
        let dependency = task.into().trim().to_owned();
        if !self.dependencies.contains(&dependency) {
            self.dependencies.push(dependency);
        }
        self
    }

    /// Sets the request priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: MessagePriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the per-task deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the target agent.
    #[must_use]
    pub const fn agent(&self) -> &AgentName {
        &self.agent
    }

    /// Returns the capability to invoke.
    #[must_use]
    pub fn capability(&self) -> &str {
        &self.capability
    }

    /// Returns the request parameters.
    #[must_use]
    pub const fn parameters(&self) -> &Value {
        &self.parameters
    }

    /// Returns the names of tasks that must complete first.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Returns the request priority.
    #[must_use]
    pub const fn priority(&self) -> MessagePriority {
        self.priority
    }

    /// Returns the declared deadline, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}
