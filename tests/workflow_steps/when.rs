//! When steps for workflow execution BDD scenarios.

use super::world::{WorkflowWorld, run_async};
use conductor::workflow::domain::WorkflowDefinition;
use rstest_bdd_macros::when;

#[when("the workflow is executed")]
fn execute_workflow(world: &mut WorkflowWorld) {
    let definition = WorkflowDefinition::new("scenario", world.tasks.clone());
    world.workflow = Some(definition.clone());
    world.outcome = Some(run_async(world.coordinator.execute_workflow(definition)));
}
