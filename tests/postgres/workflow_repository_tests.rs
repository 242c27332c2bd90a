//! `PostgreSQL` workflow repository tests.

use super::cluster::{PostgresCluster, postgres_cluster};
use super::helpers::{PgWorkflows, TestDatabase, workflow_service};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use mockable::DefaultClock;
use reunion::directory::domain::UserId;
use reunion::error::ErrorKind;
use reunion::workflow::{
    domain::{
        BusinessId, DefinitionChanges, DefinitionStatus, HistoryAction, HistoryEntry,
        InstanceStatus, NewDefinition, StepSpec, WorkflowDefinition, WorkflowDomainError,
        WorkflowHistory, WorkflowInstance, WorkflowStep,
    },
    ports::{WorkflowRepository, WorkflowRepositoryError},
    services::{CreateDefinitionRequest, StartInstanceRequest, WorkflowServiceError},
};
use rstest::rstest;
use uuid::Uuid;

async fn definition_with_steps(
    service: &PgWorkflows,
    code: &str,
    steps: &[&str],
) -> (WorkflowDefinition, Vec<WorkflowStep>) {
    let definition = service
        .create_definition(CreateDefinitionRequest::new(
            "Case review",
            code,
            "case",
            UserId::new(),
        ))
        .await
        .expect("definition creation");
    let mut added = Vec::with_capacity(steps.len());
    for name in steps {
        added.push(
            service
                .add_step(definition.id(), StepSpec::new(*name, "review"))
                .await
                .expect("step creation"),
        );
    }
    let stored = service
        .definition(definition.id())
        .await
        .expect("definition lookup")
        .definition;
    (stored, added)
}

async fn running_instance(
    service: &PgWorkflows,
    definition: &WorkflowDefinition,
) -> WorkflowInstance {
    service
        .update_definition(
            definition.id(),
            DefinitionChanges {
                status: Some(DefinitionStatus::Active),
                ..DefinitionChanges::default()
            },
        )
        .await
        .expect("activation");
    service
        .start_instance(StartInstanceRequest::new(
            definition.id(),
            BusinessId::new(),
            "case",
            "Sighting near the station",
            UserId::new(),
        ))
        .await
        .expect("instance start")
}

fn orders(steps: &[WorkflowStep]) -> Vec<(String, i32)> {
    steps
        .iter()
        .map(|step| (step.name().to_owned(), step.order()))
        .collect()
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reorder_with_a_foreign_step_changes_nothing(postgres_cluster: PostgresCluster) {
    let database = TestDatabase::create(postgres_cluster).expect("test database");
    let repository = database.workflow_repository();
    let service = workflow_service(&repository);
    let (definition, steps) =
        definition_with_steps(&service, "REVIEW", &["screen", "verify", "close"]).await;
    let (other, foreign) = definition_with_steps(&service, "OTHER", &["triage"]).await;

    let clock = DefaultClock;
    let mut reordered: Vec<WorkflowStep> = steps.iter().rev().cloned().collect();
    reordered.extend(foreign.iter().cloned());
    for (position, step) in (1_i32..).zip(reordered.iter_mut()) {
        step.set_order(position, &clock);
    }
    let mut bumped = definition.clone();
    bumped.bump_version(&clock);

    let err = repository
        .reorder_steps(&bumped, &reordered)
        .await
        .expect_err("a step of another definition must abort the reorder");
    let foreign_id = foreign.first().expect("foreign step").id();
    assert!(matches!(err, WorkflowRepositoryError::StepNotFound(id) if id == foreign_id));

    let kept = repository
        .list_steps(definition.id())
        .await
        .expect("step listing");
    assert_eq!(
        orders(&kept),
        vec![
            ("screen".to_owned(), 1),
            ("verify".to_owned(), 2),
            ("close".to_owned(), 3),
        ]
    );
    let untouched = repository.list_steps(other.id()).await.expect("listing");
    assert_eq!(orders(&untouched), vec![("triage".to_owned(), 1)]);
    let stored = repository
        .find_definition(definition.id())
        .await
        .expect("lookup")
        .expect("definition");
    assert_eq!(stored.version(), definition.version());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reorder_through_the_service_persists_every_position(postgres_cluster: PostgresCluster) {
    let database = TestDatabase::create(postgres_cluster).expect("test database");
    let repository = database.workflow_repository();
    let service = workflow_service(&repository);
    let (definition, steps) =
        definition_with_steps(&service, "SWAP", &["screen", "verify"]).await;
    let ids: Vec<_> = steps.iter().rev().map(WorkflowStep::id).collect();

    service
        .reorder_steps(definition.id(), &ids)
        .await
        .expect("reorder");

    let stored = repository.list_steps(definition.id()).await.expect("listing");
    assert_eq!(
        orders(&stored),
        vec![("verify".to_owned(), 1), ("screen".to_owned(), 2)]
    );
    let reloaded = repository
        .find_definition(definition.id())
        .await
        .expect("lookup")
        .expect("definition");
    assert_eq!(reloaded.version(), definition.version() + 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn live_codes_are_unique_but_deleted_codes_are_reusable(postgres_cluster: PostgresCluster) {
    let database = TestDatabase::create(postgres_cluster).expect("test database");
    let repository = database.workflow_repository();
    let service = workflow_service(&repository);
    let clock = DefaultClock;
    let draft = |name: &str| {
        WorkflowDefinition::new(
            NewDefinition {
                name: name.to_owned(),
                code: "SHARED".to_owned(),
                workflow_type: "case".to_owned(),
                description: String::new(),
                creator_id: UserId::new(),
            },
            &clock,
        )
        .expect("definition")
    };

    let first = draft("First");
    repository
        .store_definition(&first)
        .await
        .expect("first store");
    let err = repository
        .store_definition(&draft("Second"))
        .await
        .expect_err("second live definition with the same code");
    assert!(matches!(err, WorkflowRepositoryError::DuplicateCode(ref code) if code == "SHARED"));

    let service_err = service
        .create_definition(CreateDefinitionRequest::new(
            "Third",
            "SHARED",
            "case",
            UserId::new(),
        ))
        .await
        .expect_err("service rejects the duplicate");
    assert!(matches!(service_err, WorkflowServiceError::DuplicateCode(_)));

    service
        .delete_definition(first.id())
        .await
        .expect("soft delete");
    let reused = service
        .create_definition(CreateDefinitionRequest::new(
            "Fourth",
            "SHARED",
            "case",
            UserId::new(),
        ))
        .await
        .expect("code is free once the holder is deleted");
    assert_eq!(reused.code(), "SHARED");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_stores_of_one_code_admit_a_single_definition(
    postgres_cluster: PostgresCluster,
) {
    let database = TestDatabase::create(postgres_cluster).expect("test database");
    let repository = database.workflow_repository();
    let clock = DefaultClock;
    let racers: Vec<WorkflowDefinition> = ["East", "West"]
        .into_iter()
        .map(|name| {
            WorkflowDefinition::new(
                NewDefinition {
                    name: name.to_owned(),
                    code: "RACED".to_owned(),
                    workflow_type: "case".to_owned(),
                    description: String::new(),
                    creator_id: UserId::new(),
                },
                &clock,
            )
            .expect("definition")
        })
        .collect();
    let (east, west) = (racers.first().expect("east"), racers.get(1).expect("west"));

    let (first, second) = tokio::join!(
        repository.store_definition(east),
        repository.store_definition(west)
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes.iter().any(|outcome| matches!(
        outcome,
        Err(WorkflowRepositoryError::DuplicateCode(code)) if code == "RACED"
    )));
}

#[rstest]
fn live_code_index_rejects_a_second_live_row(postgres_cluster: PostgresCluster) {
    let database = TestDatabase::create(postgres_cluster).expect("test database");
    let mut connection = database.pool.get().expect("connection");
    let insert = |connection: &mut PgConnection, deleted: bool| {
        diesel::sql_query(
            "INSERT INTO workflows \
             (id, name, code, workflow_type, status, creator_id, \
             created_at, updated_at, deleted_at) \
             VALUES ($1, 'Raw', 'RAW', 'case', 'draft', $2, NOW(), NOW(), \
             CASE WHEN $3 THEN NOW() END)",
        )
        .bind::<diesel::sql_types::Uuid, _>(Uuid::new_v4())
        .bind::<diesel::sql_types::Uuid, _>(Uuid::new_v4())
        .bind::<diesel::sql_types::Bool, _>(deleted)
        .execute(connection)
    };

    insert(&mut connection, true).expect("deleted row");
    insert(&mut connection, false).expect("first live row");
    let err = insert(&mut connection, false).expect_err("second live row");
    let DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) = &err else {
        panic!("expected a unique violation, got {err:?}");
    };
    assert_eq!(info.constraint_name(), Some("idx_workflows_code_live"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn stale_instance_transition_is_rejected(postgres_cluster: PostgresCluster) {
    let database = TestDatabase::create(postgres_cluster).expect("test database");
    let repository = database.workflow_repository();
    let service = workflow_service(&repository);
    let (definition, steps) = definition_with_steps(&service, "RACE", &["screen"]).await;
    let instance = running_instance(&service, &definition).await;
    let step = steps.first().expect("step");

    let mut stale = repository
        .find_instance(instance.id())
        .await
        .expect("lookup")
        .expect("instance");
    service
        .cancel_instance(instance.id(), UserId::new(), "duplicate report")
        .await
        .expect("first writer wins");

    let clock = DefaultClock;
    let entered_at = stale.step_entered_at();
    stale.cancel(&clock).expect("stale copy is still running");
    let history = WorkflowHistory::record(
        stale.id(),
        HistoryEntry::new(step, UserId::new(), HistoryAction::Cancel, entered_at),
        &clock,
    );
    let err = repository
        .record_transition(&stale, &history)
        .await
        .expect_err("second writer must lose");
    assert!(matches!(err, WorkflowRepositoryError::RevisionConflict(id) if id == instance.id()));

    let entries = repository.history(instance.id()).await.expect("history");
    assert_eq!(entries.len(), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn step_with_a_waiting_instance_is_kept(postgres_cluster: PostgresCluster) {
    let database = TestDatabase::create(postgres_cluster).expect("test database");
    let repository = database.workflow_repository();
    let service = workflow_service(&repository);
    let (definition, steps) =
        definition_with_steps(&service, "HOLD", &["screen", "verify"]).await;
    let instance = running_instance(&service, &definition).await;
    let current = steps.first().expect("current step").id();

    let err = service
        .delete_step(current)
        .await
        .expect_err("current step must stay");
    assert!(matches!(
        err,
        WorkflowServiceError::Domain(WorkflowDomainError::StepInUse(id)) if id == current
    ));
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert!(
        repository
            .find_step(current)
            .await
            .expect("lookup")
            .is_some()
    );

    let cancelled = service
        .cancel_instance(instance.id(), UserId::new(), "withdrawn")
        .await
        .expect("cancel");
    assert_eq!(cancelled.status(), InstanceStatus::Cancelled);
    service
        .delete_step(current)
        .await
        .expect("step is free once no instance waits on it");
}
