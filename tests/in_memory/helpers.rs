//! Shared test helpers for in-memory integration tests.

use std::sync::Arc;

use mockable::DefaultClock;
use reunion::directory::{
    adapters::memory::InMemoryDirectory,
    domain::{Organization, OrganizationId, Role, User, UserId},
};
use reunion::task::{
    adapters::{memory::InMemoryTaskRepository, number::RandomTaskNumberGenerator},
    domain::{Location, NewTask, TaskPriority, TaskType},
    services::TaskDispatchService,
};
use reunion::workflow::{adapters::memory::InMemoryWorkflowRepository, services::WorkflowService};
use rstest::fixture;

/// Dispatch service wired to in-memory adapters.
pub type Dispatch = TaskDispatchService<
    InMemoryTaskRepository,
    InMemoryDirectory,
    InMemoryDirectory,
    RandomTaskNumberGenerator,
    DefaultClock,
>;

/// Workflow service wired to the in-memory repository.
pub type Workflows = WorkflowService<InMemoryWorkflowRepository, DefaultClock>;

/// One organization with a coordinator, plus both services.
pub struct Network {
    pub directory: Arc<InMemoryDirectory>,
    pub dispatch: Dispatch,
    pub workflows: Workflows,
    pub org: OrganizationId,
    pub coordinator: UserId,
}

impl Network {
    /// Adds a member of the network's organization.
    ///
    /// # Errors
    ///
    /// Returns an error if the user is rejected by the directory.
    pub fn join(&self, name: &str, role: Role) -> Result<UserId, eyre::Report> {
        let id = UserId::new();
        self.directory
            .insert_user(User::new(id, name, role, Some(self.org))?)?;
        Ok(id)
    }

    /// Builds task details for the network's organization.
    #[must_use]
    pub fn details(&self, title: &str, priority: TaskPriority) -> NewTask {
        NewTask {
            title: title.to_owned(),
            description: format!("{title}, reported by a family member"),
            task_type: TaskType::Search,
            priority,
            case_id: None,
            org_id: self.org,
            deadline: None,
            estimated_hours: 2,
            location: Location {
                name: "Riverside park".to_owned(),
                address: "Park Lane".to_owned(),
                coordinates: None,
            },
            requirements: String::new(),
            materials: Vec::new(),
            notes: String::new(),
        }
    }
}

/// Provides a fresh network for each test.
#[fixture]
pub fn network() -> Network {
    let directory = Arc::new(InMemoryDirectory::new());
    let org = OrganizationId::new();
    directory
        .insert_organization(Organization::new(org, "Volunteer network", None).expect("org"))
        .expect("insert org");
    let coordinator = UserId::new();
    directory
        .insert_user(
            User::new(coordinator, "Coordinator", Role::Manager, Some(org)).expect("user"),
        )
        .expect("insert coordinator");

    let dispatch = TaskDispatchService::new(
        Arc::new(InMemoryTaskRepository::new()),
        Arc::clone(&directory),
        Arc::clone(&directory),
        Arc::new(RandomTaskNumberGenerator::default()),
        Arc::new(DefaultClock),
    );
    let workflows = WorkflowService::new(
        Arc::new(InMemoryWorkflowRepository::new()),
        Arc::new(DefaultClock),
    );
    Network {
        directory,
        dispatch,
        workflows,
        org,
        coordinator,
    }
}
