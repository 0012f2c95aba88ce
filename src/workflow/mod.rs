//! Workflow graphs and their staged execution.
//!
//! A [`domain::WorkflowDefinition`] is a named DAG of tasks pinned to agent
//! capabilities. The [`services::WorkflowExecutor`] validates it, layers it
//! into stages and runs each stage concurrently through the message router.

pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
