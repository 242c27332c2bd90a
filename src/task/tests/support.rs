//! Shared wiring for task service tests.

use crate::directory::{
    adapters::memory::InMemoryDirectory,
    domain::{Organization, OrganizationId, Role, User, UserId},
};
use crate::task::{
    adapters::{memory::InMemoryTaskRepository, number::RandomTaskNumberGenerator},
    domain::{Location, NewTask, Task, TaskPriority, TaskType},
    services::{CreateTaskRequest, TaskDispatchService},
};
use crate::test_support::ManualClock;
use eyre::Result;
use rstest::fixture;
use std::sync::Arc;

pub type Service = TaskDispatchService<
    InMemoryTaskRepository,
    InMemoryDirectory,
    InMemoryDirectory,
    RandomTaskNumberGenerator,
    ManualClock,
>;

pub struct Harness {
    pub repository: Arc<InMemoryTaskRepository>,
    pub directory: Arc<InMemoryDirectory>,
    pub clock: Arc<ManualClock>,
    pub service: Service,
    pub org: OrganizationId,
    pub coordinator: UserId,
}

impl Harness {
    pub fn new() -> Result<Self> {
        let repository = Arc::new(InMemoryTaskRepository::new());
        let directory = Arc::new(InMemoryDirectory::new());
        let clock = Arc::new(ManualClock::morning());
        let service = TaskDispatchService::new(
            Arc::clone(&repository),
            Arc::clone(&directory),
            Arc::clone(&directory),
            Arc::new(RandomTaskNumberGenerator::default()),
            Arc::clone(&clock),
        );
        let org = OrganizationId::new();
        directory.insert_organization(Organization::new(org, "Riverside district", None)?)?;
        let mut harness = Self {
            repository,
            directory,
            clock,
            service,
            org,
            coordinator: UserId::new(),
        };
        harness.coordinator = harness.member("Coordinator", Role::Manager)?;
        Ok(harness)
    }

    /// Adds a user to the harness organization.
    pub fn member(&self, name: &str, role: Role) -> Result<UserId> {
        let id = UserId::new();
        self.directory
            .insert_user(User::new(id, name, role, Some(self.org))?)?;
        Ok(id)
    }

    /// Adds a user who belongs to no organization.
    pub fn outsider(&self, name: &str, role: Role) -> Result<UserId> {
        let id = UserId::new();
        self.directory.insert_user(User::new(id, name, role, None)?)?;
        Ok(id)
    }

    pub fn details(&self, title: &str, priority: TaskPriority) -> NewTask {
        task_details(self.org, title, priority)
    }

    /// Creates a pending task owned by the coordinator.
    pub async fn pending(&self, title: &str, priority: TaskPriority) -> Result<Task> {
        let request = CreateTaskRequest::new(self.coordinator, self.details(title, priority));
        Ok(self.service.create_task(request).await?)
    }

    /// Creates a task assigned to `assignee` at creation.
    pub async fn assigned_to(&self, title: &str, assignee: UserId) -> Result<Task> {
        let request = CreateTaskRequest::new(
            self.coordinator,
            self.details(title, TaskPriority::Normal),
        )
        .with_assignee(assignee);
        Ok(self.service.create_task(request).await?)
    }
}

/// Builds search-task details for `org`.
pub fn task_details(org: OrganizationId, title: &str, priority: TaskPriority) -> NewTask {
    NewTask {
        title: title.to_owned(),
        description: format!("{title} near the old bus station"),
        task_type: TaskType::Search,
        priority,
        case_id: None,
        org_id: org,
        deadline: None,
        estimated_hours: 4,
        location: Location {
            name: "Old bus station".to_owned(),
            address: "12 Station Road".to_owned(),
            coordinates: None,
        },
        requirements: "Bring a torch".to_owned(),
        materials: vec!["flyers".to_owned()],
        notes: String::new(),
    }
}

#[fixture]
pub fn harness() -> Harness {
    Harness::new().expect("harness wiring")
}
