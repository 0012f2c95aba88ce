//! Progress notifications emitted at stage boundaries.

use super::WorkflowId;
use serde::{Deserialize, Serialize};

/// Progress notification handed to a
/// [`ProgressReporter`](crate::workflow::ports::ProgressReporter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProgressUpdate {
    /// A stage is about to start.
    Stage {
        /// Workflow run.
        workflow_id: WorkflowId,
        /// Zero-based stage index.
        stage: usize,
        /// Number of stages in the run.
        total_stages: usize,
        /// Tasks launched in this stage.
        task_names: Vec<String>,
        /// Completed fraction before the stage starts.
        progress: f64,
    },
    /// Every stage completed.
    Completed {
        /// Workflow run.
        workflow_id: WorkflowId,
        /// Always `1.0`.
        progress: f64,
    },
}

impl ProgressUpdate {
    /// Returns the workflow run the update belongs to.
    #[must_use]
    pub const fn workflow_id(&self) -> WorkflowId {
        match self {
            Self::Stage { workflow_id, .. } | Self::Completed { workflow_id, .. } => *workflow_id,
        }
    }

    /// Returns the reported progress.
    #[must_use]
    pub const fn progress(&self) -> f64 {
        match self {
            Self::Stage { progress, .. } | Self::Completed { progress, .. } => *progress,
        }
    }
}
