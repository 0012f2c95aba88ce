//! Domain types for workflow definition and execution tracking.

mod definition;
mod error;
mod execution;
mod ids;
mod progress;
mod task;

pub use definition::WorkflowDefinition;
pub use error::{ParseWorkflowStateError, WorkflowDomainError};
pub use execution::{TaskRecord, TaskState, WorkflowExecution, WorkflowState};
pub use ids::WorkflowId;
pub use progress::ProgressUpdate;
pub use task::WorkflowTask;
