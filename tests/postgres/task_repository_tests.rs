//! `PostgreSQL` task repository tests.

use super::cluster::{PostgresCluster, postgres_cluster};
use super::helpers::{DispatchDesk, ScriptedNumbers, TestDatabase};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::{Nullable, Timestamptz, Uuid as SqlUuid};
use mockable::DefaultClock;
use reunion::task::{
    domain::{Task, TaskAction, TaskLog, TaskStatus},
    ports::{TaskRepository, TaskRepositoryError},
    services::{CreateTaskRequest, TaskDispatchError},
};
use rstest::rstest;
use uuid::Uuid;

#[derive(QueryableByName)]
struct AssignmentColumns {
    #[diesel(sql_type = Nullable<SqlUuid>)]
    assignee_id: Option<Uuid>,
    #[diesel(sql_type = Nullable<Timestamptz>)]
    start_time: Option<DateTime<Utc>>,
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn colliding_number_is_regenerated(postgres_cluster: PostgresCluster) {
    let database = TestDatabase::create(postgres_cluster).expect("test database");
    let desk = DispatchDesk::open(
        database.task_repository(),
        ScriptedNumbers::queue(&["TK20250301AAAAAA", "TK20250301AAAAAA", "TK20250301BBBBBB"]),
        3,
    )
    .expect("desk");

    let first = desk
        .dispatch
        .create_task(CreateTaskRequest::new(
            desk.coordinator,
            desk.details("Search the boatyard"),
        ))
        .await
        .expect("first task");
    let second = desk
        .dispatch
        .create_task(CreateTaskRequest::new(
            desk.coordinator,
            desk.details("Check the ferry terminal"),
        ))
        .await
        .expect("collision is retried");

    assert_eq!(first.number().as_str(), "TK20250301AAAAAA");
    assert_eq!(second.number().as_str(), "TK20250301BBBBBB");
    let logs = desk.dispatch.task_logs(second.id()).await.expect("logs");
    assert_eq!(logs.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn creation_gives_up_after_the_configured_attempts(postgres_cluster: PostgresCluster) {
    let database = TestDatabase::create(postgres_cluster).expect("test database");
    let desk = DispatchDesk::open(
        database.task_repository(),
        ScriptedNumbers::queue(&["TK-TAKEN", "TK-TAKEN", "TK-TAKEN"]),
        2,
    )
    .expect("desk");
    desk.dispatch
        .create_task(CreateTaskRequest::new(
            desk.coordinator,
            desk.details("Search the boatyard"),
        ))
        .await
        .expect("first task");

    let err = desk
        .dispatch
        .create_task(CreateTaskRequest::new(
            desk.coordinator,
            desk.details("Check the ferry terminal"),
        ))
        .await
        .expect_err("every candidate collides");
    assert!(matches!(
        err,
        TaskDispatchError::GenerationExhausted { attempts: 2 }
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repository_reports_duplicate_numbers(postgres_cluster: PostgresCluster) {
    let database = TestDatabase::create(postgres_cluster).expect("test database");
    let repository = database.task_repository();
    let desk = DispatchDesk::open(
        database.task_repository(),
        ScriptedNumbers::queue(&["TK-SHARED"]),
        1,
    )
    .expect("desk");
    let stored = desk
        .dispatch
        .create_task(CreateTaskRequest::new(
            desk.coordinator,
            desk.details("Search the boatyard"),
        ))
        .await
        .expect("stored task");

    let clock = DefaultClock;
    let copy = Task::create(
        stored.number().clone(),
        desk.coordinator,
        desk.details("Same number, different task"),
        None,
        &clock,
    )
    .expect("task");
    let log = TaskLog::record(&copy, desk.coordinator, TaskAction::Create, None, "", &clock);
    let err = repository
        .create_task(&copy, &log)
        .await
        .expect_err("number is taken");
    assert!(matches!(
        err,
        TaskRepositoryError::DuplicateNumber(ref number) if number == "TK-SHARED"
    ));
    assert!(repository.find_task(copy.id()).await.expect("lookup").is_none());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_task_write_is_rejected(postgres_cluster: PostgresCluster) {
    let database = TestDatabase::create(postgres_cluster).expect("test database");
    let repository = database.task_repository();
    let desk = DispatchDesk::open(database.task_repository(), ScriptedNumbers::default(), 1)
        .expect("desk");
    let task = desk
        .dispatch
        .create_task(CreateTaskRequest::new(
            desk.coordinator,
            desk.details("Search the boatyard"),
        ))
        .await
        .expect("task");

    let mut stale = repository
        .find_task(task.id())
        .await
        .expect("lookup")
        .expect("task");
    desk.dispatch
        .assign_task(task.id(), desk.coordinator, desk.volunteer, "")
        .await
        .expect("first writer wins");

    let clock = DefaultClock;
    let old_status = stale.status();
    stale
        .assign(desk.coordinator, &clock)
        .expect("stale copy is still pending");
    let log = TaskLog::record(
        &stale,
        desk.coordinator,
        TaskAction::Assign,
        Some(old_status),
        "",
        &clock,
    );
    let err = repository
        .record(&stale, &log)
        .await
        .expect_err("second writer must lose");
    assert!(matches!(err, TaskRepositoryError::RevisionConflict(id) if id == task.id()));

    let current = repository
        .find_task(task.id())
        .await
        .expect("lookup")
        .expect("task");
    assert_eq!(current.assignee_id(), Some(desk.volunteer));
    let logs = repository.task_logs(task.id()).await.expect("logs");
    assert_eq!(logs.len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unassign_clears_assignee_and_start_time(postgres_cluster: PostgresCluster) {
    let database = TestDatabase::create(postgres_cluster).expect("test database");
    let repository = database.task_repository();
    let desk = DispatchDesk::open(database.task_repository(), ScriptedNumbers::default(), 1)
        .expect("desk");
    let task = desk
        .dispatch
        .create_task(
            CreateTaskRequest::new(desk.coordinator, desk.details("Search the boatyard"))
                .with_assignee(desk.volunteer),
        )
        .await
        .expect("task");
    assert!(task.start_time().is_some());

    desk.dispatch
        .unassign_task(task.id(), desk.coordinator, "volunteer unavailable")
        .await
        .expect("unassign");

    let reloaded = repository
        .find_task(task.id())
        .await
        .expect("lookup")
        .expect("task");
    assert_eq!(reloaded.status(), TaskStatus::Pending);
    assert_eq!(reloaded.assignee_id(), None);
    assert_eq!(reloaded.start_time(), None);

    let mut connection = database.pool.get().expect("connection");
    let columns = diesel::sql_query("SELECT assignee_id, start_time FROM tasks WHERE id = $1")
        .bind::<SqlUuid, _>(task.id().into_inner())
        .get_result::<AssignmentColumns>(&mut connection)
        .expect("raw row");
    assert!(columns.assignee_id.is_none());
    assert!(columns.start_time.is_none());
}
