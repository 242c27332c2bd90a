//! Builders shared by the `PostgreSQL` adapter tests.

use super::cluster::{BoxError, PostgresCluster, TemporaryDatabase};
use chrono::{DateTime, Utc};
use diesel::pg::PgConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use mockable::DefaultClock;
use reunion::directory::{
    adapters::memory::InMemoryDirectory,
    domain::{Organization, OrganizationId, Role, User, UserId},
};
use reunion::task::{
    adapters::postgres::PostgresTaskRepository,
    domain::{Location, NewTask, TaskNumber, TaskPriority, TaskType},
    ports::TaskNumberGenerator,
    services::TaskDispatchService,
};
use reunion::workflow::{adapters::postgres::PostgresWorkflowRepository, services::WorkflowService};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Connection pool over a test database.
pub type TestPool = Pool<ConnectionManager<PgConnection>>;

/// Workflow service backed by `PostgreSQL`.
pub type PgWorkflows = WorkflowService<PostgresWorkflowRepository, DefaultClock>;

/// Dispatch service with `PostgreSQL` tasks and an in-memory directory.
pub type PgDispatch = TaskDispatchService<
    PostgresTaskRepository,
    InMemoryDirectory,
    InMemoryDirectory,
    ScriptedNumbers,
    DefaultClock,
>;

/// A migrated throwaway database and a pool connected to it.
///
/// The pool is declared first so its connections close before the database
/// is dropped.
pub struct TestDatabase {
    pub pool: TestPool,
    _database: TemporaryDatabase,
}

impl TestDatabase {
    /// Clones the template into a new database and opens a small pool.
    ///
    /// # Errors
    ///
    /// Returns an error when the database or the pool cannot be created.
    pub fn create(cluster: PostgresCluster) -> Result<Self, BoxError> {
        let database = cluster.temporary_database()?;
        let pool = Pool::builder()
            .max_size(4)
            .build(ConnectionManager::<PgConnection>::new(database.url()))?;
        Ok(Self {
            pool,
            _database: database,
        })
    }

    /// Workflow repository over this database.
    #[must_use]
    pub fn workflow_repository(&self) -> Arc<PostgresWorkflowRepository> {
        Arc::new(PostgresWorkflowRepository::new(self.pool.clone()))
    }

    /// Task repository over this database.
    #[must_use]
    pub fn task_repository(&self) -> Arc<PostgresTaskRepository> {
        Arc::new(PostgresTaskRepository::new(self.pool.clone()))
    }
}

/// Builds a workflow service over `repository`.
#[must_use]
pub fn workflow_service(repository: &Arc<PostgresWorkflowRepository>) -> PgWorkflows {
    WorkflowService::new(Arc::clone(repository), Arc::new(DefaultClock))
}

/// Hands out queued numbers first, then unique random ones.
#[derive(Default)]
pub struct ScriptedNumbers {
    queued: Mutex<VecDeque<TaskNumber>>,
}

impl ScriptedNumbers {
    /// Queues `numbers` to be returned in order.
    #[must_use]
    pub fn queue(numbers: &[&str]) -> Self {
        Self {
            queued: Mutex::new(numbers.iter().copied().map(TaskNumber::new).collect()),
        }
    }
}

impl TaskNumberGenerator for ScriptedNumbers {
    fn generate(&self, _issued_at: DateTime<Utc>) -> TaskNumber {
        self.queued
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or_else(|| TaskNumber::new(format!("TK{}", Uuid::new_v4().simple())))
    }
}

/// One organization with a coordinator and a volunteer, plus dispatch.
pub struct DispatchDesk {
    pub dispatch: PgDispatch,
    pub org: OrganizationId,
    pub coordinator: UserId,
    pub volunteer: UserId,
}

impl DispatchDesk {
    /// Wires dispatch over `repository` with the given number source.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory rejects the seeded records.
    pub fn open(
        repository: Arc<PostgresTaskRepository>,
        numbers: ScriptedNumbers,
        attempts: u32,
    ) -> Result<Self, eyre::Report> {
        let directory = Arc::new(InMemoryDirectory::new());
        let org = OrganizationId::new();
        directory.insert_organization(Organization::new(org, "Harbour volunteers", None)?)?;
        let coordinator = UserId::new();
        directory.insert_user(User::new(coordinator, "Coordinator", Role::Manager, Some(org))?)?;
        let volunteer = UserId::new();
        directory.insert_user(User::new(volunteer, "Volunteer", Role::Volunteer, Some(org))?)?;
        let dispatch = TaskDispatchService::new(
            repository,
            Arc::clone(&directory),
            directory,
            Arc::new(numbers),
            Arc::new(DefaultClock),
        )
        .with_number_attempts(attempts);
        Ok(Self {
            dispatch,
            org,
            coordinator,
            volunteer,
        })
    }

    /// Task details for the desk's organization.
    #[must_use]
    pub fn details(&self, title: &str) -> NewTask {
        NewTask {
            title: title.to_owned(),
            description: format!("{title} near the harbour"),
            task_type: TaskType::Search,
            priority: TaskPriority::High,
            case_id: None,
            org_id: self.org,
            deadline: None,
            estimated_hours: 3,
            location: Location {
                name: "North pier".to_owned(),
                address: "Quay Street".to_owned(),
                coordinates: None,
            },
            requirements: String::new(),
            materials: vec!["torch".to_owned()],
            notes: String::new(),
        }
    }
}
