//! Workflow definition, validation and stage layering.

use super::{WorkflowDomainError, WorkflowId, WorkflowTask};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// A named graph of tasks.
///
/// Every dependency must name a task of the same workflow and the
/// dependency relation must be acyclic; [`WorkflowDefinition::validate`]
/// and [`WorkflowDefinition::execution_order`] check both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    id: WorkflowId,
    name: String,
    tasks: Vec<WorkflowTask>,
    metadata: Map<String, Value>,
}

impl WorkflowDefinition {
    /// Creates a definition with a fresh identifier.
    #[must_use]
    pub fn new(name: impl Into<String>, tasks: Vec<WorkflowTask>) -> Self {
        Self {
            id: WorkflowId::new(),
            name: name.into(),
            tasks,
            metadata: Map::new(),
        }
    }

    /// Replaces the identifier.
    #[must_use]
    pub const fn with_id(mut self, id: WorkflowId) -> Self {
        self.id = id;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> WorkflowId {
        self.id
    }

    /// Returns the workflow name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tasks in declaration order.
    #[must_use]
    pub fn tasks(&self) -> &[WorkflowTask] {
        &self.tasks
    }

    /// Returns the task named `name`.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<&WorkflowTask> {
        self.tasks.iter().find(|task| task.name() == name)
    }

    /// Returns the metadata map.
    #[must_use]
    pub const fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Checks names and dependency references.
    ///
    /// Cycles are not detected here; see
    /// [`WorkflowDefinition::execution_order`].
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyWorkflowName`],
    /// [`WorkflowDomainError::DuplicateTaskName`] or
    /// [`WorkflowDomainError::UnknownDependency`].
    pub fn validate(&self) -> Result<(), WorkflowDomainError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowDomainError::EmptyWorkflowName);
        }
        let mut names = HashSet::with_capacity(self.tasks.len());
        for task in &self.tasks {
            if !names.insert(task.name()) {
                return Err(WorkflowDomainError::DuplicateTaskName(task.name().to_owned()));
            }
        }
        for task in &self.tasks {
            if let Some(missing) = task
                .dependencies()
                .iter()
                .find(|dependency| !names.contains(dependency.as_str()))
            {
                return Err(WorkflowDomainError::UnknownDependency {
                    task: task.name().to_owned(),
                    dependency: missing.clone(),
                });
            }
        }
        Ok(())
    }

    /// Returns whether [`WorkflowDefinition::validate`] accepts the graph.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Layers the graph into stages of mutually independent tasks.
    ///
    /// Each stage holds every not-yet-scheduled task whose dependencies all
    /// sit in earlier stages, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns any [`WorkflowDefinition::validate`] error, or
    /// [`WorkflowDomainError::CyclicDependency`] naming the tasks that can
    /// never become ready.
    pub fn execution_order(&self) -> Result<Vec<Vec<String>>, WorkflowDomainError> {
        self.validate()?;

        let mut scheduled: HashSet<&str> = HashSet::with_capacity(self.tasks.len());
        let mut pending: Vec<&WorkflowTask> = self.tasks.iter().collect();
        let mut stages = Vec::new();

        while !pending.is_empty() {
            let (ready, blocked): (Vec<&WorkflowTask>, Vec<&WorkflowTask>) =
                pending.into_iter().partition(|task| {
                    task.dependencies()
                        .iter()
                        .all(|dependency| scheduled.contains(dependency.as_str()))
                });
            if ready.is_empty() {
                return Err(WorkflowDomainError::CyclicDependency {
                    tasks: blocked.iter().map(|task| task.name().to_owned()).collect(),
                });
            }
            scheduled.extend(ready.iter().map(|task| task.name()));
            stages.push(ready.iter().map(|task| task.name().to_owned()).collect());
            pending = blocked;
        }

        Ok(stages)
    }
}
