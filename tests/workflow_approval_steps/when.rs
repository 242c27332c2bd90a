//! When steps for workflow approval BDD scenarios.

use super::world::{ApprovalWorld, run_async};
use reunion::workflow::{domain::Decision, services::ApproveRequest};
use rstest_bdd_macros::when;

fn decide(world: &mut ApprovalWorld, request: ApproveRequest) {
    let result = run_async(world.service.approve(request));
    if let Ok(ref updated) = result {
        world.instance = Some(updated.clone());
    }
    world.last_decision_result = Some(result);
}

#[when("an instance is started for a new case")]
fn start_instance(world: &mut ApprovalWorld) -> Result<(), eyre::Report> {
    world.last_start_result = Some(world.start_case()?);
    Ok(())
}

#[when("the current step is approved")]
fn current_step_approved(world: &mut ApprovalWorld) -> Result<(), eyre::Report> {
    let instance_id = world.started()?.id();
    let request = ApproveRequest::new(instance_id, world.coordinator, Decision::Approve);
    decide(world, request);
    Ok(())
}

#[when(r#"the current step is rejected with comment "{comment}""#)]
fn current_step_rejected(world: &mut ApprovalWorld, comment: String) -> Result<(), eyre::Report> {
    let instance_id = world.started()?.id();
    let request = ApproveRequest::new(instance_id, world.coordinator, Decision::Reject)
        .with_comment(comment);
    decide(world, request);
    Ok(())
}
