//! Runtime state of one workflow run.

use super::{ParseWorkflowStateError, WorkflowDefinition, WorkflowDomainError, WorkflowId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Lifecycle state of a workflow run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Created but not started.
    #[default]
    Pending,
    /// Stages are being executed.
    Running,
    /// Every stage completed.
    Completed,
    /// A task failed or the run could not proceed.
    Failed,
    /// The run was cancelled.
    Cancelled,
}

impl WorkflowState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether the state can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    const fn can_move_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Pending | Self::Running, Self::Failed | Self::Cancelled)
        )
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for WorkflowState {
    type Error = ParseWorkflowStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseWorkflowStateError(value.to_owned())),
        }
    }
}

/// Lifecycle state of one task within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Not dispatched yet.
    #[default]
    Pending,
    /// Dispatched and awaiting its agent.
    Running,
    /// Finished with a result.
    Completed,
    /// Finished with an error.
    Failed,
    /// Abandoned before producing an outcome.
    Cancelled,
}

impl TaskState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether the state can no longer change.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-task progress within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    name: String,
    state: TaskState,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl TaskRecord {
    fn pending(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            state: TaskState::Pending,
            started_at: None,
            completed_at: None,
        }
    }

    /// Returns the task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the task state.
    #[must_use]
    pub const fn state(&self) -> TaskState {
        self.state
    }

    /// Returns when the task was dispatched.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when the task reached a terminal state.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}

/// Snapshot of one workflow run.
///
/// State only moves forward: `Pending -> Running -> {Completed | Failed |
/// Cancelled}`. Once terminal, task updates are ignored so late replies from
/// detached tasks cannot rewrite the recorded outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    workflow: WorkflowDefinition,
    state: WorkflowState,
    tasks: Vec<TaskRecord>,
    results: BTreeMap<String, Value>,
    errors: BTreeMap<String, String>,
    failure: Option<String>,
    progress: f64,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl WorkflowExecution {
    /// Creates a pending execution of `workflow`.
    #[must_use]
    pub fn new<C: Clock + ?Sized>(workflow: WorkflowDefinition, clock: &C) -> Self {
        let tasks = workflow
            .tasks()
            .iter()
            .map(|task| TaskRecord::pending(task.name()))
            .collect();
        Self {
            workflow,
            state: WorkflowState::Pending,
            tasks,
            results: BTreeMap::new(),
            errors: BTreeMap::new(),
            failure: None,
            progress: 0.0,
            created_at: clock.utc(),
            started_at: None,
            completed_at: None,
        }
    }

    /// Returns the workflow identifier.
    #[must_use]
    pub const fn id(&self) -> WorkflowId {
        self.workflow.id()
    }

    /// Returns the executed definition.
    #[must_use]
    pub const fn workflow(&self) -> &WorkflowDefinition {
        &self.workflow
    }

    /// Returns the run state.
    #[must_use]
    pub const fn state(&self) -> WorkflowState {
        self.state
    }

    /// Returns whether the run has finished.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Returns per-task records in declaration order.
    #[must_use]
    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    /// Returns the record of the task named `name`.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|record| record.name == name)
    }

    /// Returns the state of the task named `name`.
    #[must_use]
    pub fn task_state(&self, name: &str) -> Option<TaskState> {
        self.task(name).map(TaskRecord::state)
    }

    /// Returns results of completed tasks.
    #[must_use]
    pub const fn results(&self) -> &BTreeMap<String, Value> {
        &self.results
    }

    /// Returns errors of failed tasks.
    #[must_use]
    pub const fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Returns the error that failed the run, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Returns the completed fraction in `0.0..=1.0`.
    #[must_use]
    pub const fn progress(&self) -> f64 {
        self.progress
    }

    /// Returns when the execution was created.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the run started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Returns when the run reached a terminal state.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Moves the run to `Running`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidTransition`] unless the run is
    /// pending.
    pub fn start<C: Clock + ?Sized>(&mut self, clock: &C) -> Result<(), WorkflowDomainError> {
        self.transition(WorkflowState::Running)?;
        self.started_at = Some(clock.utc());
        Ok(())
    }

    /// Moves the run to `Completed` and sets progress to `1.0`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidTransition`] unless the run is
    /// running.
    pub fn complete<C: Clock + ?Sized>(&mut self, clock: &C) -> Result<(), WorkflowDomainError> {
        self.transition(WorkflowState::Completed)?;
        self.progress = 1.0;
        self.completed_at = Some(clock.utc());
        Ok(())
    }

    /// Moves the run to `Failed`, recording `error`.
    ///
    /// Tasks still running are detached and recorded as cancelled. This
    /// includes tasks whose replies arrived but were never committed.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidTransition`] when the run is
    /// already terminal.
    pub fn fail<C: Clock + ?Sized>(
        &mut self,
        error: impl Into<String>,
        clock: &C,
    ) -> Result<(), WorkflowDomainError> {
        self.transition(WorkflowState::Failed)?;
        let now = clock.utc();
        self.failure = Some(error.into());
        self.completed_at = Some(now);
        for record in &mut self.tasks {
            if record.state == TaskState::Running {
                record.state = TaskState::Cancelled;
                record.completed_at = Some(now);
            }
        }
        Ok(())
    }

    /// Moves the run to `Cancelled` and cancels every unfinished task.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::InvalidTransition`] when the run is
    /// already terminal.
    pub fn cancel<C: Clock + ?Sized>(&mut self, clock: &C) -> Result<(), WorkflowDomainError> {
        self.transition(WorkflowState::Cancelled)?;
        let now = clock.utc();
        self.completed_at = Some(now);
        for record in &mut self.tasks {
            if !record.state.is_terminal() {
                record.state = TaskState::Cancelled;
                record.completed_at = Some(now);
            }
        }
        Ok(())
    }

    /// Records that `task` was dispatched.
    pub fn task_started<C: Clock + ?Sized>(&mut self, task: &str, clock: &C) {
        if let Some(record) = self.open_record(task)
            && record.state == TaskState::Pending
        {
            record.state = TaskState::Running;
            record.started_at = Some(clock.utc());
        }
    }

    /// Records the result of `task` and refreshes progress.
    pub fn task_completed<C: Clock + ?Sized>(&mut self, task: &str, result: Value, clock: &C) {
        if self.finish_task(task, TaskState::Completed, clock) {
            self.results.insert(task.to_owned(), result);
            let done = self
                .tasks
                .iter()
                .filter(|record| record.state == TaskState::Completed)
                .count();
            self.progress = ratio(done, self.tasks.len());
        }
    }

    /// Records the failure of `task`.
    pub fn task_failed<C: Clock + ?Sized>(
        &mut self,
        task: &str,
        error: impl Into<String>,
        clock: &C,
    ) {
        if self.finish_task(task, TaskState::Failed, clock) {
            self.errors.insert(task.to_owned(), error.into());
        }
    }

    /// Records that `task` was abandoned.
    pub fn task_cancelled<C: Clock + ?Sized>(&mut self, task: &str, clock: &C) {
        self.finish_task(task, TaskState::Cancelled, clock);
    }

    fn finish_task<C: Clock + ?Sized>(&mut self, task: &str, outcome: TaskState, clock: &C) -> bool {
        let Some(record) = self.open_record(task) else {
            return false;
        };
        if record.state.is_terminal() {
            return false;
        }
        record.state = outcome;
        record.completed_at = Some(clock.utc());
        true
    }

    fn open_record(&mut self, task: &str) -> Option<&mut TaskRecord> {
        if self.state.is_terminal() {
            return None;
        }
        self.tasks.iter_mut().find(|record| record.name == task)
    }

    fn transition(&mut self, next: WorkflowState) -> Result<(), WorkflowDomainError> {
        if !self.state.can_move_to(next) {
            return Err(WorkflowDomainError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

#[expect(
    clippy::float_arithmetic,
    reason = "progress is reported as a fraction of completed tasks"
)]
fn ratio(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let done_count = f64::from(u32::try_from(done).unwrap_or(u32::MAX));
    let total_count = f64::from(u32::try_from(total).unwrap_or(u32::MAX));
    (done_count / total_count).clamp(0.0, 1.0)
}
