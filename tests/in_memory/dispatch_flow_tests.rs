//! In-memory integration tests for task dispatch flows.

use super::helpers::{Network, network};
use reunion::directory::domain::Role;
use reunion::error::ErrorKind;
use reunion::task::{
    domain::{CompletionReport, Progress, TaskAction, TaskPriority, TaskStatus},
    services::{AddCommentRequest, BatchAssignRequest, CreateTaskRequest},
};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn pending_task_is_auto_assigned_worked_and_completed(network: Network) {
    let volunteer = network.join("Li Wei", Role::Volunteer).expect("volunteer");
    network
        .dispatch
        .create_task(
            CreateTaskRequest::new(
                network.coordinator,
                network.details("Coordinate shifts", TaskPriority::Low),
            )
            .with_assignee(network.coordinator),
        )
        .await
        .expect("coordinator task");
    let task = network
        .dispatch
        .create_task(CreateTaskRequest::new(
            network.coordinator,
            network.details("Walk the riverbank", TaskPriority::Urgent),
        ))
        .await
        .expect("task creation should succeed");

    let report = network
        .dispatch
        .auto_assign_tasks(network.org, 5)
        .await
        .expect("auto assignment should run");
    assert_eq!(report.assigned.len(), 1);
    assert_eq!(
        report.assigned.first().map(|assignment| assignment.assignee_id),
        Some(volunteer)
    );

    network
        .dispatch
        .update_progress(task.id(), volunteer, 50)
        .await
        .expect("progress update");
    let done = network
        .dispatch
        .complete_task(
            task.id(),
            volunteer,
            CompletionReport {
                feedback: "Searched both banks".to_owned(),
                result: "Found a dropped scarf".to_owned(),
                attachments: vec!["scarf.jpg".to_owned()],
                actual_hours: 3,
            },
        )
        .await
        .expect("completion");

    assert_eq!(done.status(), TaskStatus::Completed);
    assert_eq!(done.progress(), Progress::COMPLETE);
    let trail: Vec<_> = network
        .dispatch
        .task_logs(task.id())
        .await
        .expect("logs")
        .iter()
        .map(|log| log.action())
        .collect();
    assert_eq!(
        trail,
        [
            TaskAction::Complete,
            TaskAction::Progress,
            TaskAction::AutoAssign,
            TaskAction::Create,
        ]
    );

    let stats = network
        .dispatch
        .statistics(Some(network.org))
        .await
        .expect("statistics");
    assert_eq!(stats.total, 2);
    assert_eq!(stats.count(TaskStatus::Completed), 1);
    assert_eq!(stats.count(TaskStatus::Assigned), 1);
    assert_eq!(stats.completed_today, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn batch_assigned_work_can_be_handed_over(network: Network) {
    let first = network.join("Li Wei", Role::Volunteer).expect("first");
    let second = network.join("Ana Souza", Role::Volunteer).expect("second");
    let mut ids = Vec::new();
    for title in ["Poster run north", "Poster run south"] {
        let task = network
            .dispatch
            .create_task(CreateTaskRequest::new(
                network.coordinator,
                network.details(title, TaskPriority::Normal),
            ))
            .await
            .expect("task creation");
        ids.push(task.id());
    }

    let assigned = network
        .dispatch
        .batch_assign(
            network.coordinator,
            BatchAssignRequest::new(ids.iter().map(ToString::to_string), first),
        )
        .await
        .expect("batch assignment");
    assert_eq!(assigned.len(), 2);

    let handed = ids.first().copied().expect("first task");
    let moved = network
        .dispatch
        .transfer_task(handed, first, second, "twisted ankle")
        .await
        .expect("transfer");
    assert_eq!(moved.assignee_id(), Some(second));

    let refused = network
        .dispatch
        .update_progress(handed, first, 10)
        .await
        .expect_err("previous holder may not report");
    assert_eq!(refused.kind(), ErrorKind::PermissionDenied);

    let mine = network
        .dispatch
        .my_tasks(second, None)
        .await
        .expect("my tasks");
    assert_eq!(mine.len(), 1);
    assert_eq!(
        network
            .dispatch
            .my_tasks(first, Some(TaskStatus::Assigned))
            .await
            .expect("my tasks")
            .len(),
        1
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn cancelled_task_keeps_its_discussion(network: Network) {
    let task = network
        .dispatch
        .create_task(CreateTaskRequest::new(
            network.coordinator,
            network.details("Check the bus depot", TaskPriority::High),
        ))
        .await
        .expect("task creation");
    let question = network
        .dispatch
        .add_comment(AddCommentRequest::new(
            task.id(),
            network.coordinator,
            "Depot manager is on leave until Monday",
        ))
        .await
        .expect("comment");

    let cancelled = network
        .dispatch
        .cancel_task(task.id(), network.coordinator, "person returned home")
        .await
        .expect("cancellation");
    network
        .dispatch
        .add_comment(
            AddCommentRequest::new(task.id(), network.coordinator, "Closing this one")
                .replying_to(question.id()),
        )
        .await
        .expect("reply");

    assert_eq!(cancelled.status(), TaskStatus::Cancelled);
    assert_eq!(cancelled.result(), "person returned home");
    let thread = network.dispatch.comments(task.id()).await.expect("comments");
    assert_eq!(thread.len(), 2);
    assert!(
        thread
            .last()
            .is_some_and(|reply| reply.parent_id() == Some(question.id()))
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn deleted_task_disappears_from_reads(network: Network) {
    let task = network
        .dispatch
        .create_task(CreateTaskRequest::new(
            network.coordinator,
            network.details("Draft leaflet", TaskPriority::Low),
        ))
        .await
        .expect("task creation");

    network
        .dispatch
        .delete_task(task.id(), network.coordinator)
        .await
        .expect("deletion");

    let missing = network
        .dispatch
        .task(task.id())
        .await
        .expect_err("deleted task is hidden");
    assert_eq!(missing.kind(), ErrorKind::NotFound);
    assert!(
        network
            .dispatch
            .created_tasks(network.coordinator)
            .await
            .expect("created tasks")
            .is_empty()
    );
}
