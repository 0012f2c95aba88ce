//! Errors returned by the workflow executor.

use crate::routing::domain::DispatchError;
use crate::workflow::domain::{WorkflowDomainError, WorkflowId};
use thiserror::Error;

/// Result type for workflow executor operations.
pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Errors raised while running or querying workflows.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowError {
    /// The definition failed validation; nothing was dispatched.
    #[error("invalid workflow: {0}")]
    InvalidWorkflow(WorkflowDomainError),

    /// The dependency graph contains a cycle; nothing was dispatched.
    #[error("cyclic dependency among tasks: {}", .tasks.join(", "))]
    CyclicDependency {
        /// Tasks that could never become ready.
        tasks: Vec<String>,
    },

    /// A run with the same identifier has not finished yet.
    #[error("workflow {0} is already running")]
    AlreadyRunning(WorkflowId),

    /// No execution is known under the identifier.
    #[error("workflow {0} not found")]
    NotFound(WorkflowId),

    /// A task failed and aborted the run.
    #[error("task '{task}' failed: {source}")]
    TaskFailed {
        /// Failing task.
        task: String,
        /// Dispatch failure.
        #[source]
        source: DispatchError,
    },

    /// A task runner terminated without reporting an outcome.
    #[error("task runner aborted: {0}")]
    TaskAborted(String),

    /// The run was cancelled before it finished.
    #[error("workflow {0} was cancelled")]
    Cancelled(WorkflowId),

    /// The concurrency limiter was closed.
    #[error("task concurrency limiter is closed")]
    LimiterClosed,
}

impl WorkflowError {
    /// Returns whether re-running the workflow may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::TaskFailed { source, .. } => source.is_retryable(),
            Self::TaskAborted(_) => true,
            Self::InvalidWorkflow(_)
            | Self::CyclicDependency { .. }
            | Self::AlreadyRunning(_)
            | Self::NotFound(_)
            | Self::Cancelled(_)
            | Self::LimiterClosed => false,
        }
    }
}

impl From<WorkflowDomainError> for WorkflowError {
    fn from(err: WorkflowDomainError) -> Self {
        match err {
            WorkflowDomainError::CyclicDependency { tasks } => Self::CyclicDependency { tasks },
            other => Self::InvalidWorkflow(other),
        }
    }
}
