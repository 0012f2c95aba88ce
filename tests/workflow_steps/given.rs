//! Given steps for workflow execution BDD scenarios.

use std::time::Duration;

use super::world::{WorkflowWorld, reply_for};
use conductor::agent::adapters::Script;
use conductor::workflow::domain::WorkflowTask;
use rstest_bdd_macros::given;

#[given(r#"an agent "{name}" offering "{capability}""#)]
fn an_agent(world: &mut WorkflowWorld, name: String, capability: String) -> Result<(), eyre::Report> {
    world.register(&name, &capability, Script::reply(reply_for(&name)))
}

#[given(r#"a failing agent "{name}" offering "{capability}""#)]
fn a_failing_agent(
    world: &mut WorkflowWorld,
    name: String,
    capability: String,
) -> Result<(), eyre::Report> {
    world.register(&name, &capability, Script::fail("render crashed"))
}

#[given(r#"a slow agent "{name}" offering "{capability}" that replies after {millis:u64} milliseconds"#)]
fn a_slow_agent(
    world: &mut WorkflowWorld,
    name: String,
    capability: String,
    millis: u64,
) -> Result<(), eyre::Report> {
    let script = Script::reply(reply_for(&name)).after(Duration::from_millis(millis));
    world.register(&name, &capability, script)
}

#[given(r#"a root task "{task}" on "{agent}" using "{capability}""#)]
fn a_root_task(
    world: &mut WorkflowWorld,
    task: String,
    agent: String,
    capability: String,
) -> Result<(), eyre::Report> {
    world
        .tasks
        .push(WorkflowTask::new(task, &agent, capability)?);
    Ok(())
}

#[given(r#"a task "{task}" on "{agent}" using "{capability}" after "{dependency}""#)]
fn a_dependent_task(
    world: &mut WorkflowWorld,
    task: String,
    agent: String,
    capability: String,
    dependency: String,
) -> Result<(), eyre::Report> {
    world
        .tasks
        .push(WorkflowTask::new(task, &agent, capability)?.depends_on(dependency));
    Ok(())
}

#[given(
    r#"a timed task "{task}" on "{agent}" using "{capability}" with a {millis:u64} millisecond timeout"#
)]
fn a_timed_task(
    world: &mut WorkflowWorld,
    task: String,
    agent: String,
    capability: String,
    millis: u64,
) -> Result<(), eyre::Report> {
    world.tasks.push(
        WorkflowTask::new(task, &agent, capability)?.with_timeout(Duration::from_millis(millis)),
    );
    Ok(())
}
