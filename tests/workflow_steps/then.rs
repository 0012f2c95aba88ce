//! Then steps for workflow execution BDD scenarios.

use super::world::WorkflowWorld;
use conductor::{
    coordinator::CoordinatorError,
    routing::domain::DispatchError,
    workflow::{
        domain::{TaskState, WorkflowState},
        services::WorkflowError,
    },
};
use rstest_bdd_macros::then;

fn workflow_error(world: &WorkflowWorld) -> Result<&WorkflowError, eyre::Report> {
    match world.outcome.as_ref() {
        Some(Err(CoordinatorError::Workflow(err))) => Ok(err),
        Some(Err(other)) => Err(eyre::eyre!("expected a workflow error, got {other}")),
        Some(Ok(_)) => Err(eyre::eyre!("expected the workflow to fail")),
        None => Err(eyre::eyre!("the workflow was not executed")),
    }
}

#[then("the workflow runs in {count:usize} stages")]
fn runs_in_stages(world: &WorkflowWorld, count: usize) -> Result<(), eyre::Report> {
    let workflow = world
        .workflow
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no workflow was executed"))?;
    let stages = workflow.execution_order()?;
    if stages.len() != count {
        return Err(eyre::eyre!("expected {count} stages, found {stages:?}"));
    }
    Ok(())
}

#[then(r#"the workflow state is "{state}""#)]
fn workflow_state_is(world: &WorkflowWorld, state: String) -> Result<(), eyre::Report> {
    let expected = WorkflowState::try_from(state.as_str())?;
    let actual = world.status()?.state();
    if actual != expected {
        return Err(eyre::eyre!("expected workflow state {expected}, found {actual}"));
    }
    Ok(())
}

#[then("the workflow returns {count:usize} results")]
fn workflow_returns_results(world: &WorkflowWorld, count: usize) -> Result<(), eyre::Report> {
    match world.outcome.as_ref() {
        Some(Ok(results)) if results.len() == count => Ok(()),
        Some(Ok(results)) => Err(eyre::eyre!(
            "expected {count} results, found {}",
            results.len()
        )),
        Some(Err(err)) => Err(eyre::eyre!("workflow failed: {err}")),
        None => Err(eyre::eyre!("the workflow was not executed")),
    }
}

#[then(r#"task "{task}" is "{state}""#)]
fn task_is(world: &WorkflowWorld, task: String, state: String) -> Result<(), eyre::Report> {
    let actual = world
        .status()?
        .task_state(&task)
        .ok_or_else(|| eyre::eyre!("unknown task '{task}'"))?;
    if actual.as_str() != state {
        return Err(eyre::eyre!("expected task '{task}' to be {state}, found {actual}"));
    }
    Ok(())
}

#[then(r#"task "{task}" did not complete"#)]
fn task_did_not_complete(world: &WorkflowWorld, task: String) -> Result<(), eyre::Report> {
    let actual = world.status()?.task_state(&task);
    if actual == Some(TaskState::Completed) {
        return Err(eyre::eyre!("task '{task}' unexpectedly completed"));
    }
    Ok(())
}

#[then(r#"the workflow fails on task "{task}""#)]
fn workflow_fails_on_task(world: &WorkflowWorld, task: String) -> Result<(), eyre::Report> {
    match workflow_error(world)? {
        WorkflowError::TaskFailed { task: failed, .. } if *failed == task => Ok(()),
        other => Err(eyre::eyre!("expected task '{task}' to fail the run, got {other}")),
    }
}

#[then("the workflow fails with a timeout")]
fn workflow_fails_with_timeout(world: &WorkflowWorld) -> Result<(), eyre::Report> {
    match workflow_error(world)? {
        WorkflowError::TaskFailed {
            source: DispatchError::TaskTimedOut { .. },
            ..
        } => Ok(()),
        other => Err(eyre::eyre!("expected a timeout, got {other}")),
    }
}

#[then("the workflow is rejected as cyclic")]
fn workflow_rejected_as_cyclic(world: &WorkflowWorld) -> Result<(), eyre::Report> {
    match workflow_error(world)? {
        WorkflowError::CyclicDependency { .. } => Ok(()),
        other => Err(eyre::eyre!("expected a cycle error, got {other}")),
    }
}

#[then(r#"agent "{name}" received {count:usize} requests"#)]
fn agent_received(world: &WorkflowWorld, name: String, count: usize) -> Result<(), eyre::Report> {
    let agent = world
        .agents
        .get(&name)
        .ok_or_else(|| eyre::eyre!("unknown agent '{name}'"))?;
    let received = agent.handler().calls().len();
    if received != count {
        return Err(eyre::eyre!(
            "expected agent '{name}' to receive {count} requests, found {received}"
        ));
    }
    Ok(())
}
