//! Aggregate coordinator counters.
//!
//! Counters are lock-free atomics shared by the router and the workflow
//! executor. [`MetricsSnapshot`] is the serialisable view handed to
//! external reporting.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Shared coordinator counters.
#[derive(Debug, Default)]
pub struct CoordinatorMetrics {
    messages_processed: AtomicU64,
    messages_failed: AtomicU64,
    workflows_started: AtomicU64,
    workflows_completed: AtomicU64,
    workflows_failed: AtomicU64,
    workflows_cancelled: AtomicU64,
    tasks_queued: AtomicUsize,
    tasks_in_flight: AtomicUsize,
}

/// Serialisable point-in-time view of the coordinator counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Successful dispatches.
    pub messages_processed: u64,
    /// Failed or timed-out dispatches.
    pub messages_failed: u64,
    /// Workflow runs started.
    pub workflows_started: u64,
    /// Workflow runs that completed.
    pub workflows_completed: u64,
    /// Workflow runs that failed.
    pub workflows_failed: u64,
    /// Workflow runs that were cancelled.
    pub workflows_cancelled: u64,
    /// Workflow tasks waiting for a concurrency permit.
    pub queue_depth: usize,
    /// Workflow tasks currently dispatched.
    pub tasks_in_flight: usize,
    /// Registered agents.
    pub agents_registered: usize,
    /// Registered agents with a fresh heartbeat.
    pub agents_healthy: usize,
}

/// Terminal outcome of one workflow run, for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowOutcome {
    /// Every stage completed.
    Completed,
    /// A task failed or the run could not proceed.
    Failed,
    /// The run was cancelled.
    Cancelled,
}

impl CoordinatorMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts one dispatch outcome.
    pub fn record_message(&self, success: bool) {
        let counter = if success {
            &self.messages_processed
        } else {
            &self.messages_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a workflow run start.
    pub fn workflow_started(&self) {
        self.workflows_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a workflow run end.
    pub fn workflow_finished(&self, outcome: WorkflowOutcome) {
        let counter = match outcome {
            WorkflowOutcome::Completed => &self.workflows_completed,
            WorkflowOutcome::Failed => &self.workflows_failed,
            WorkflowOutcome::Cancelled => &self.workflows_cancelled,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks a workflow task as waiting for a permit.
    ///
    /// The returned guard keeps the queue gauge raised until it is started
    /// or dropped.
    #[must_use]
    pub fn enqueue(self: &Arc<Self>) -> QueuedTask {
        self.tasks_queued.fetch_add(1, Ordering::Relaxed);
        QueuedTask {
            metrics: Arc::clone(self),
        }
    }

    /// Returns successful dispatches so far.
    #[must_use]
    pub fn messages_processed(&self) -> u64 {
        self.messages_processed.load(Ordering::Relaxed)
    }

    /// Returns the number of tasks waiting for a permit.
    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.tasks_queued.load(Ordering::Relaxed)
    }

    /// Takes a snapshot, adding agent counts supplied by the caller.
    #[must_use]
    pub fn snapshot(&self, agents_registered: usize, agents_healthy: usize) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            messages_failed: self.messages_failed.load(Ordering::Relaxed),
            workflows_started: self.workflows_started.load(Ordering::Relaxed),
            workflows_completed: self.workflows_completed.load(Ordering::Relaxed),
            workflows_failed: self.workflows_failed.load(Ordering::Relaxed),
            workflows_cancelled: self.workflows_cancelled.load(Ordering::Relaxed),
            queue_depth: self.tasks_queued.load(Ordering::Relaxed),
            tasks_in_flight: self.tasks_in_flight.load(Ordering::Relaxed),
            agents_registered,
            agents_healthy,
        }
    }
}

/// Guard for a task waiting on the concurrency limiter.
#[derive(Debug)]
pub struct QueuedTask {
    metrics: Arc<CoordinatorMetrics>,
}

impl QueuedTask {
    /// Moves the task from the queue gauge to the in-flight gauge.
    #[must_use]
    pub fn start(self) -> RunningTask {
        self.metrics.tasks_in_flight.fetch_add(1, Ordering::Relaxed);
        RunningTask {
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl Drop for QueuedTask {
    fn drop(&mut self) {
        self.metrics.tasks_queued.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Guard for a dispatched task; lowers the in-flight gauge on drop.
#[derive(Debug)]
pub struct RunningTask {
    metrics: Arc<CoordinatorMetrics>,
}

impl Drop for RunningTask {
    fn drop(&mut self) {
        self.metrics.tasks_in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}
