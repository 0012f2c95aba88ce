//! Error types for workflow validation and state transitions.

use super::WorkflowState;
use crate::agent::domain::AgentDomainError;
use thiserror::Error;

/// Errors returned while building, validating or advancing workflows.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowDomainError {
    /// The workflow name is empty after trimming.
    #[error("workflow name must not be empty")]
    EmptyWorkflowName,

    /// A task name is empty after trimming.
    #[error("workflow task name must not be empty")]
    EmptyTaskName,

    /// A task names an empty capability.
    #[error("workflow task '{0}' must name a capability")]
    EmptyCapability(String),

    /// A task targets an invalid agent name.
    #[error(transparent)]
    InvalidAgent(#[from] AgentDomainError),

    /// Two tasks share one name.
    #[error("duplicate workflow task name: {0}")]
    DuplicateTaskName(String),

    /// A task depends on a name no task in the workflow carries.
    #[error("task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency {
        /// Declaring task.
        task: String,
        /// Missing dependency name.
        dependency: String,
    },

    /// The dependency relation contains a cycle.
    #[error("cyclic dependency among tasks: {}", .tasks.join(", "))]
    CyclicDependency {
        /// Tasks that could not be scheduled.
        tasks: Vec<String>,
    },

    /// The execution cannot move between the two states.
    #[error("workflow cannot move from {from} to {to}")]
    InvalidTransition {
        /// Current state.
        from: WorkflowState,
        /// Requested state.
        to: WorkflowState,
    },
}

impl WorkflowDomainError {
    /// Returns whether the error describes a malformed dependency graph.
    #[must_use]
    pub const fn is_cycle(&self) -> bool {
        matches!(self, Self::CyclicDependency { .. })
    }
}

/// Error returned while parsing workflow or task states.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown workflow state: {0}")]
pub struct ParseWorkflowStateError(pub String);
