//! In-memory integration tests for approval workflows.

use super::helpers::{Network, network};
use reunion::directory::domain::Role;
use reunion::error::ErrorKind;
use reunion::workflow::{
    domain::{
        BusinessId, Decision, DefinitionChanges, DefinitionStatus, HistoryAction, InstanceStatus,
        StepSpec, WorkflowDefinition, WorkflowStep,
    },
    services::{ApproveRequest, CreateDefinitionRequest, StartInstanceRequest},
};
use rstest::rstest;

async fn active_definition(
    network: &Network,
    code: &str,
    steps: &[&str],
) -> (WorkflowDefinition, Vec<WorkflowStep>) {
    let definition = network
        .workflows
        .create_definition(
            CreateDefinitionRequest::new("Case intake", code, "case", network.coordinator)
                .with_description("Checks a new missing-person report"),
        )
        .await
        .expect("definition creation");
    let mut added = Vec::with_capacity(steps.len());
    for name in steps {
        added.push(
            network
                .workflows
                .add_step(definition.id(), StepSpec::new(*name, "review"))
                .await
                .expect("step creation"),
        );
    }
    let active = network
        .workflows
        .update_definition(
            definition.id(),
            DefinitionChanges {
                status: Some(DefinitionStatus::Active),
                ..DefinitionChanges::default()
            },
        )
        .await
        .expect("activation");
    (active, added)
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn case_report_passes_every_step_with_a_handover(network: Network) {
    let reviewer = network.join("Reviewer", Role::Volunteer).expect("reviewer");
    let (definition, steps) = active_definition(&network, "INTAKE", &["screen", "verify"]).await;
    assert_eq!(definition.version(), 3);

    let business = BusinessId::new();
    let instance = network
        .workflows
        .start_instance(StartInstanceRequest::new(
            definition.id(),
            business,
            "case",
            "Report from the harbour district",
            network.coordinator,
        ))
        .await
        .expect("start");
    let first = steps.first().expect("first step");
    assert_eq!(instance.current_step_id(), Some(first.id()));

    network
        .workflows
        .approve(
            ApproveRequest::new(instance.id(), network.coordinator, Decision::Transfer)
                .with_transfer_to(reviewer)
                .with_comment("please take this one"),
        )
        .await
        .expect("transfer");
    let moved = network
        .workflows
        .approve(ApproveRequest::new(instance.id(), reviewer, Decision::Approve))
        .await
        .expect("approve first step");
    let second = steps.get(1).expect("second step");
    assert_eq!(moved.current_step_id(), Some(second.id()));

    let finished = network
        .workflows
        .approve(ApproveRequest::new(instance.id(), reviewer, Decision::Approve))
        .await
        .expect("approve last step");
    assert_eq!(finished.status(), InstanceStatus::Completed);
    assert_eq!(finished.current_step_id(), None);
    assert!(finished.end_time().is_some());

    let history = network
        .workflows
        .instance_history(instance.id())
        .await
        .expect("history");
    let actions: Vec<_> = history.iter().map(|row| row.action()).collect();
    assert_eq!(
        actions,
        [
            HistoryAction::Start,
            HistoryAction::Transfer,
            HistoryAction::Approve,
            HistoryAction::Complete,
        ]
    );
    assert!(history.iter().all(|row| row.duration_minutes() >= 0));
    assert_eq!(
        history.get(1).and_then(|row| row.transfer_to()),
        Some(reviewer)
    );
    let bound = network
        .workflows
        .instances_for_business(business)
        .await
        .expect("instances for business");
    assert_eq!(bound.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_instance_accepts_no_further_decisions(network: Network) {
    let (definition, _) = active_definition(&network, "INTAKE-R", &["screen", "verify"]).await;
    let instance = network
        .workflows
        .start_instance(StartInstanceRequest::new(
            definition.id(),
            BusinessId::new(),
            "case",
            "Duplicate report",
            network.coordinator,
        ))
        .await
        .expect("start");

    let rejected = network
        .workflows
        .approve(
            ApproveRequest::new(instance.id(), network.coordinator, Decision::Reject)
                .with_comment("duplicate of an open case"),
        )
        .await
        .expect("reject");
    assert_eq!(rejected.status(), InstanceStatus::Rejected);

    let late = network
        .workflows
        .approve(ApproveRequest::new(
            instance.id(),
            network.coordinator,
            Decision::Approve,
        ))
        .await
        .expect_err("terminal instance");
    assert_eq!(late.kind(), ErrorKind::InvalidState);
    let history = network
        .workflows
        .instance_history(instance.id())
        .await
        .expect("history");
    assert_eq!(history.len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn draft_definition_cannot_be_started(network: Network) {
    let draft = network
        .workflows
        .create_definition(CreateDefinitionRequest::new(
            "Sighting check",
            "SIGHT",
            "sighting",
            network.coordinator,
        ))
        .await
        .expect("definition creation");
    network
        .workflows
        .add_step(draft.id(), StepSpec::new("confirm", "review"))
        .await
        .expect("step creation");

    let refused = network
        .workflows
        .start_instance(StartInstanceRequest::new(
            draft.id(),
            BusinessId::new(),
            "sighting",
            "Sighting at the station",
            network.coordinator,
        ))
        .await
        .expect_err("draft definitions do not start");

    assert_eq!(refused.kind(), ErrorKind::InvalidState);
}
