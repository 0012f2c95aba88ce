//! Staged workflow execution.

use super::{WorkflowError, WorkflowResult};
use crate::{
    clock::SharedClock,
    metrics::{CoordinatorMetrics, WorkflowOutcome},
    routing::{domain::DispatchRequest, services::MessageRouter},
    workflow::{
        domain::{
            ProgressUpdate, WorkflowDefinition, WorkflowExecution, WorkflowId, WorkflowState,
            WorkflowTask,
        },
        ports::{NoopProgressReporter, ProgressReporter},
    },
};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Runs workflows stage by stage through the message router.
///
/// All runs share one semaphore, so `max_concurrent_tasks` bounds the tasks
/// in flight across every workflow, not per stage. Execution snapshots are
/// retained after completion for status queries until
/// [`WorkflowExecutor::purge_finished`] drops them.
pub struct WorkflowExecutor {
    router: Arc<MessageRouter>,
    metrics: Arc<CoordinatorMetrics>,
    clock: SharedClock,
    limiter: Arc<Semaphore>,
    executions: Executions,
    default_task_timeout: Option<Duration>,
}

impl WorkflowExecutor {
    /// Creates an executor allowing `max_concurrent_tasks` dispatches at
    /// once. A width of zero is raised to one.
    #[must_use]
    pub fn new(
        router: Arc<MessageRouter>,
        metrics: Arc<CoordinatorMetrics>,
        clock: SharedClock,
        max_concurrent_tasks: usize,
    ) -> Self {
        Self {
            router,
            metrics,
            clock,
            limiter: Arc::new(Semaphore::new(max_concurrent_tasks.max(1))),
            executions: Executions::default(),
            default_task_timeout: None,
        }
    }

    /// Sets the deadline applied to tasks that declare none.
    #[must_use]
    pub const fn with_default_task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_task_timeout = timeout;
        self
    }

    /// Runs `workflow` without progress reporting.
    ///
    /// # Errors
    ///
    /// See [`WorkflowExecutor::execute_workflow_with_progress`].
    pub async fn execute_workflow(
        &self,
        workflow: WorkflowDefinition,
    ) -> WorkflowResult<BTreeMap<String, Value>> {
        self.execute_workflow_with_progress(workflow, &NoopProgressReporter)
            .await
    }

    /// Runs `workflow`, reporting each stage to `reporter`, and returns the
    /// result of every task keyed by task name.
    ///
    /// Results are committed a stage at a time, once every task of the stage
    /// has succeeded. The first failing task fails the run: siblings still
    /// in flight are detached, siblings that already replied are recorded as
    /// cancelled and later stages never start. Dropping the returned future
    /// cancels the run.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::InvalidWorkflow`] or
    /// [`WorkflowError::CyclicDependency`] before anything is dispatched,
    /// [`WorkflowError::AlreadyRunning`] when a run with the same id is
    /// unfinished, [`WorkflowError::TaskFailed`] on the first task failure
    /// and [`WorkflowError::Cancelled`] when the run is cancelled meanwhile.
    pub async fn execute_workflow_with_progress(
        &self,
        workflow: WorkflowDefinition,
        reporter: &dyn ProgressReporter,
    ) -> WorkflowResult<BTreeMap<String, Value>> {
        let stages = workflow.execution_order()?;
        let workflow_id = workflow.id();
        let tasks: HashMap<String, WorkflowTask> = workflow
            .tasks()
            .iter()
            .map(|task| (task.name().to_owned(), task.clone()))
            .collect();
        let guard = self.begin(workflow)?;
        let run = guard.run;
        info!(
            workflow_id = %workflow_id,
            stages = stages.len(),
            tasks = tasks.len(),
            "workflow started"
        );

        let runner = TaskRunner {
            run,
            router: Arc::clone(&self.router),
            metrics: Arc::clone(&self.metrics),
            clock: Arc::clone(&self.clock),
            limiter: Arc::clone(&self.limiter),
            executions: self.executions.clone(),
        };
        let total_stages = stages.len();

        for (index, stage) in stages.into_iter().enumerate() {
            let Some(progress) = self.progress_if_active(run) else {
                info!(workflow_id = %workflow_id, stage = index, "run stopped before stage");
                return Err(WorkflowError::Cancelled(workflow_id));
            };

            debug!(workflow_id = %workflow_id, stage = index, tasks = ?stage, "starting stage");
            reporter.report(&ProgressUpdate::Stage {
                workflow_id,
                stage: index,
                total_stages,
                task_names: stage.clone(),
                progress,
            });

            let mut running = JoinSet::new();
            for name in &stage {
                if let Some(task) = tasks.get(name) {
                    let timeout = task.timeout().or(self.default_task_timeout);
                    running.spawn(runner.clone().run(task.clone(), timeout));
                }
            }

            let mut replies = Vec::with_capacity(stage.len());
            while let Some(joined) = running.join_next().await {
                let failure = match joined {
                    Ok(Ok(reply)) => {
                        replies.push(reply);
                        continue;
                    }
                    Ok(Err(err)) => err,
                    Err(join_error) => WorkflowError::TaskAborted(join_error.to_string()),
                };
                running.detach_all();
                return Err(self.fail(run, failure));
            }
            self.commit_stage(run, replies);
        }

        self.finish(run, reporter)
    }

    fn progress_if_active(&self, run: RunKey) -> Option<f64> {
        self.executions
            .update_run(run, |execution| {
                (!execution.is_terminal()).then_some(execution.progress())
            })
            .flatten()
    }

    fn begin(&self, workflow: WorkflowDefinition) -> WorkflowResult<RunGuard> {
        let workflow_id = workflow.id();
        let mut execution = WorkflowExecution::new(workflow, &*self.clock);
        execution.start(&*self.clock)?;

        let mut table = self.executions.lock();
        if table
            .runs
            .get(&workflow_id)
            .is_some_and(|tracked| !tracked.execution.is_terminal())
        {
            return Err(WorkflowError::AlreadyRunning(workflow_id));
        }
        let generation = table.next_generation;
        table.next_generation = generation.wrapping_add(1);
        table.runs.insert(
            workflow_id,
            Tracked {
                generation,
                execution,
            },
        );
        drop(table);

        self.metrics.workflow_started();
        Ok(RunGuard {
            run: RunKey {
                workflow_id,
                generation,
            },
            executions: self.executions.clone(),
            metrics: Arc::clone(&self.metrics),
            clock: Arc::clone(&self.clock),
        })
    }

    fn commit_stage(&self, run: RunKey, replies: Vec<(String, Value)>) {
        self.executions.update_run(run, |execution| {
            for (task, result) in replies {
                execution.task_completed(&task, result, &*self.clock);
            }
        });
    }

    fn finish(
        &self,
        run: RunKey,
        reporter: &dyn ProgressReporter,
    ) -> WorkflowResult<BTreeMap<String, Value>> {
        let workflow_id = run.workflow_id;
        let results = self
            .executions
            .update_run(run, |execution| {
                execution
                    .complete(&*self.clock)
                    .ok()
                    .map(|()| execution.results().clone())
            })
            .flatten()
            .ok_or(WorkflowError::Cancelled(workflow_id))?;

        self.metrics.workflow_finished(WorkflowOutcome::Completed);
        info!(workflow_id = %workflow_id, tasks = results.len(), "workflow completed");
        reporter.report(&ProgressUpdate::Completed {
            workflow_id,
            progress: 1.0,
        });
        Ok(results)
    }

    fn fail(&self, run: RunKey, failure: WorkflowError) -> WorkflowError {
        let workflow_id = run.workflow_id;
        let failed = self
            .executions
            .update_run(run, |execution| {
                execution.fail(failure.to_string(), &*self.clock).is_ok()
            })
            .unwrap_or(false);
        if !failed {
            return WorkflowError::Cancelled(workflow_id);
        }
        self.metrics.workflow_finished(WorkflowOutcome::Failed);
        warn!(workflow_id = %workflow_id, error = %failure, "workflow failed");
        failure
    }

    /// Returns a snapshot of the execution of `workflow_id`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] for unknown identifiers.
    pub fn get_status(&self, workflow_id: WorkflowId) -> WorkflowResult<WorkflowExecution> {
        self.executions
            .lock()
            .runs
            .get(&workflow_id)
            .map(|tracked| tracked.execution.clone())
            .ok_or(WorkflowError::NotFound(workflow_id))
    }

    /// Marks an unfinished run as cancelled.
    ///
    /// In-flight dispatches are not interrupted; the run stops before its
    /// next stage. Returns `false` when the run had already finished.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::NotFound`] for unknown identifiers.
    pub fn cancel(&self, workflow_id: WorkflowId) -> WorkflowResult<bool> {
        let cancelled = self
            .executions
            .update(workflow_id, |execution| execution.cancel(&*self.clock).is_ok())
            .ok_or(WorkflowError::NotFound(workflow_id))?;
        if cancelled {
            self.metrics.workflow_finished(WorkflowOutcome::Cancelled);
            info!(workflow_id = %workflow_id, "workflow cancelled");
        }
        Ok(cancelled)
    }

    /// Cancels every unfinished run and returns how many were cancelled.
    pub fn cancel_all(&self) -> usize {
        let mut table = self.executions.lock();
        let mut cancelled = 0_usize;
        for tracked in table.runs.values_mut() {
            if tracked.execution.cancel(&*self.clock).is_ok() {
                cancelled = cancelled.saturating_add(1);
                self.metrics.workflow_finished(WorkflowOutcome::Cancelled);
            }
        }
        drop(table);
        if cancelled > 0 {
            info!(cancelled, "cancelled unfinished workflows");
        }
        cancelled
    }

    /// Returns snapshots of every retained execution, oldest first.
    #[must_use]
    pub fn list_executions(&self) -> Vec<WorkflowExecution> {
        let mut snapshots: Vec<WorkflowExecution> = self
            .executions
            .lock()
            .runs
            .values()
            .map(|tracked| tracked.execution.clone())
            .collect();
        snapshots.sort_by_key(WorkflowExecution::created_at);
        snapshots
    }

    /// Drops finished executions and returns how many were removed.
    pub fn purge_finished(&self) -> usize {
        let mut table = self.executions.lock();
        let before = table.runs.len();
        table
            .runs
            .retain(|_, tracked| !tracked.execution.is_terminal());
        before.saturating_sub(table.runs.len())
    }

    /// Returns the number of runs that have not finished.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.executions
            .lock()
            .runs
            .values()
            .filter(|tracked| tracked.execution.state() == WorkflowState::Running)
            .count()
    }
}

/// Execution snapshots shared between the executor and its task runners.
#[derive(Clone, Default)]
struct Executions(Arc<Mutex<ExecutionTable>>);

#[derive(Default)]
struct ExecutionTable {
    next_generation: u64,
    runs: HashMap<WorkflowId, Tracked>,
}

/// A retained execution and the generation of the run that created it.
///
/// Resubmitting a finished workflow id replaces the entry, so writes from
/// the earlier run are matched on generation and dropped.
struct Tracked {
    generation: u64,
    execution: WorkflowExecution,
}

/// Identifies one run of a workflow id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RunKey {
    workflow_id: WorkflowId,
    generation: u64,
}

impl Executions {
    fn lock(&self) -> MutexGuard<'_, ExecutionTable> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<R>(
        &self,
        workflow_id: WorkflowId,
        apply: impl FnOnce(&mut WorkflowExecution) -> R,
    ) -> Option<R> {
        self.lock()
            .runs
            .get_mut(&workflow_id)
            .map(|tracked| apply(&mut tracked.execution))
    }

    fn update_run<R>(
        &self,
        run: RunKey,
        apply: impl FnOnce(&mut WorkflowExecution) -> R,
    ) -> Option<R> {
        self.lock()
            .runs
            .get_mut(&run.workflow_id)
            .filter(|tracked| tracked.generation == run.generation)
            .map(|tracked| apply(&mut tracked.execution))
    }
}

/// Cancels a run whose driving future is dropped before it finishes.
///
/// A run that reached a terminal state is left untouched.
struct RunGuard {
    run: RunKey,
    executions: Executions,
    metrics: Arc<CoordinatorMetrics>,
    clock: SharedClock,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let abandoned = self
            .executions
            .update_run(self.run, |execution| execution.cancel(&*self.clock).is_ok())
            .unwrap_or(false);
        if abandoned {
            self.metrics.workflow_finished(WorkflowOutcome::Cancelled);
            warn!(workflow_id = %self.run.workflow_id, "workflow abandoned before finishing");
        }
    }
}

/// Everything one spawned task needs to dispatch and record its outcome.
#[derive(Clone)]
struct TaskRunner {
    run: RunKey,
    router: Arc<MessageRouter>,
    metrics: Arc<CoordinatorMetrics>,
    clock: SharedClock,
    limiter: Arc<Semaphore>,
    executions: Executions,
}

impl TaskRunner {
    /// Dispatches `task` and returns its result for the stage to commit.
    async fn run(
        self,
        task: WorkflowTask,
        timeout: Option<Duration>,
    ) -> WorkflowResult<(String, Value)> {
        let workflow_id = self.run.workflow_id;
        let queued = self.metrics.enqueue();
        let _permit = Arc::clone(&self.limiter)
            .acquire_owned()
            .await
            .map_err(|_| WorkflowError::LimiterClosed)?;
        let _running = queued.start();

        let active = self
            .executions
            .update_run(self.run, |execution| {
                let open = !execution.is_terminal();
                if open {
                    execution.task_started(task.name(), &*self.clock);
                }
                open
            })
            .unwrap_or(false);
        if !active {
            return Err(WorkflowError::Cancelled(workflow_id));
        }

        let request = DispatchRequest::new(
            task.agent().clone(),
            task.capability(),
            task.parameters().clone(),
        )
        .with_sender(format!("workflow:{workflow_id}"))
        .with_priority(task.priority())
        .with_timeout(timeout);

        match self.router.dispatch(request).await {
            Ok(reply) => {
                let result = reply.into_body().into_result().unwrap_or(Value::Null);
                Ok((task.name().to_owned(), result))
            }
            Err(err) => {
                self.executions.update_run(self.run, |execution| {
                    execution.task_failed(task.name(), err.to_string(), &*self.clock);
                });
                Err(WorkflowError::TaskFailed {
                    task: task.name().to_owned(),
                    source: err,
                })
            }
        }
    }
}
