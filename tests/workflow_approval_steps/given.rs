//! Given steps for workflow approval BDD scenarios.

use super::world::{ApprovalWorld, list_items, run_async};
use eyre::WrapErr;
use reunion::workflow::{
    domain::{DefinitionChanges, DefinitionStatus, StepSpec},
    services::CreateDefinitionRequest,
};
use rstest_bdd_macros::given;

fn author_definition(
    world: &mut ApprovalWorld,
    code: &str,
    steps: &str,
) -> Result<(), eyre::Report> {
    let definition = run_async(world.service.create_definition(CreateDefinitionRequest::new(
        "Case intake",
        code,
        "case",
        world.coordinator,
    )))
    .wrap_err("create workflow definition")?;
    for name in list_items(steps) {
        run_async(
            world
                .service
                .add_step(definition.id(), StepSpec::new(name, "review")),
        )
        .wrap_err("add workflow step")?;
    }
    world.definition = Some(definition);
    Ok(())
}

#[given(r#"an active workflow "{code}" with steps "{steps}""#)]
fn active_workflow(
    world: &mut ApprovalWorld,
    code: String,
    steps: String,
) -> Result<(), eyre::Report> {
    author_definition(world, &code, &steps)?;
    let draft = world
        .definition
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing definition in scenario world"))?;
    let active = run_async(world.service.update_definition(
        draft.id(),
        DefinitionChanges {
            status: Some(DefinitionStatus::Active),
            ..DefinitionChanges::default()
        },
    ))
    .wrap_err("activate workflow definition")?;
    world.definition = Some(active);
    Ok(())
}

#[given(r#"a draft workflow "{code}" with steps "{steps}""#)]
fn draft_workflow(
    world: &mut ApprovalWorld,
    code: String,
    steps: String,
) -> Result<(), eyre::Report> {
    author_definition(world, &code, &steps)
}

#[given("an instance has been started for a new case")]
fn instance_started(world: &mut ApprovalWorld) -> Result<(), eyre::Report> {
    let started = world.start_case()?.wrap_err("start workflow instance")?;
    world.instance = Some(started);
    Ok(())
}

#[given("the instance has been cancelled")]
fn instance_cancelled(world: &mut ApprovalWorld) -> Result<(), eyre::Report> {
    let instance_id = world.started()?.id();
    let cancelled = run_async(world.service.cancel_instance(
        instance_id,
        world.coordinator,
        "family withdrew the report",
    ))
    .wrap_err("cancel workflow instance")?;
    world.instance = Some(cancelled);
    Ok(())
}
