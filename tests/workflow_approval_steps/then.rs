//! Then steps for workflow approval BDD scenarios.

use super::world::{ApprovalWorld, list_items, run_async};
use reunion::workflow::{
    domain::{HistoryAction, InstanceStatus, WorkflowDomainError},
    services::WorkflowServiceError,
};
use rstest_bdd_macros::then;

#[then(r#"the instance status is "{status}""#)]
fn instance_status_is(world: &ApprovalWorld, status: String) -> Result<(), eyre::Report> {
    let expected = InstanceStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let instance = world.started()?;
    if instance.status() != expected {
        return Err(eyre::eyre!(
            "expected status {}, found {}",
            expected.as_str(),
            instance.status().as_str()
        ));
    }
    Ok(())
}

#[then(r#"the history records "{actions}""#)]
fn history_records(world: &ApprovalWorld, actions: String) -> Result<(), eyre::Report> {
    let expected = list_items(&actions)
        .iter()
        .map(|raw| HistoryAction::try_from(raw.as_str()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| eyre::eyre!("invalid expected action in scenario: {err}"))?;
    let history = run_async(world.service.instance_history(world.started()?.id()))?;
    let recorded: Vec<_> = history.iter().map(|row| row.action()).collect();
    if recorded != expected {
        return Err(eyre::eyre!("expected history {expected:?}, found {recorded:?}"));
    }
    Ok(())
}

#[then("the decision fails because the instance is terminal")]
fn decision_fails_terminal(world: &ApprovalWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_decision_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing decision result"))?;
    if !matches!(
        result,
        Err(WorkflowServiceError::Domain(
            WorkflowDomainError::AlreadyTerminal(_)
        ))
    ) {
        return Err(eyre::eyre!("expected AlreadyTerminal error, got {result:?}"));
    }
    Ok(())
}

#[then("the start fails because the workflow is not active")]
fn start_fails_not_active(world: &ApprovalWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_start_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing start result"))?;
    if !matches!(
        result,
        Err(WorkflowServiceError::Domain(WorkflowDomainError::NotActive(_)))
    ) {
        return Err(eyre::eyre!("expected NotActive error, got {result:?}"));
    }
    Ok(())
}
