//! Shared world state for automatic assignment BDD scenarios.

use std::collections::HashMap;
use std::sync::Arc;

use mockable::DefaultClock;
use reunion::directory::{
    adapters::memory::InMemoryDirectory,
    domain::{Organization, OrganizationId, UserId},
};
use reunion::task::{
    adapters::{memory::InMemoryTaskRepository, number::RandomTaskNumberGenerator},
    domain::{Location, NewTask, TaskId, TaskPriority, TaskType},
    services::{AutoAssignReport, TaskDispatchError, TaskDispatchService},
};
use rstest::fixture;

/// Dispatch service type used by the BDD world.
pub type TestDispatchService = TaskDispatchService<
    InMemoryTaskRepository,
    InMemoryDirectory,
    InMemoryDirectory,
    RandomTaskNumberGenerator,
    DefaultClock,
>;

/// Scenario world for automatic assignment behaviour tests.
pub struct AutoAssignWorld {
    pub directory: Arc<InMemoryDirectory>,
    pub service: TestDispatchService,
    pub org: OrganizationId,
    pub reporter: UserId,
    pub members: HashMap<String, UserId>,
    pub tasks: HashMap<String, TaskId>,
    pub last_report: Option<Result<AutoAssignReport, TaskDispatchError>>,
}

impl AutoAssignWorld {
    /// Creates a world with a registered organization and no members.
    ///
    /// # Errors
    ///
    /// Returns an error if the organization cannot be registered.
    pub fn new() -> Result<Self, eyre::Report> {
        let directory = Arc::new(InMemoryDirectory::new());
        let org = OrganizationId::new();
        directory.insert_organization(Organization::new(org, "Harbour search team", None)?)?;
        let service = TaskDispatchService::new(
            Arc::new(InMemoryTaskRepository::new()),
            Arc::clone(&directory),
            Arc::clone(&directory),
            Arc::new(RandomTaskNumberGenerator::default()),
            Arc::new(DefaultClock),
        );
        Ok(Self {
            directory,
            service,
            org,
            reporter: UserId::new(),
            members: HashMap::new(),
            tasks: HashMap::new(),
            last_report: None,
        })
    }

    /// Looks up a member registered by name.
    ///
    /// # Errors
    ///
    /// Returns an error when the scenario never registered the member.
    pub fn member(&self, name: &str) -> Result<UserId, eyre::Report> {
        self.members
            .get(name)
            .copied()
            .ok_or_else(|| eyre::eyre!("unknown member in scenario: {name}"))
    }

    /// Looks up a task created by title.
    ///
    /// # Errors
    ///
    /// Returns an error when the scenario never created the task.
    pub fn task(&self, title: &str) -> Result<TaskId, eyre::Report> {
        self.tasks
            .get(title)
            .copied()
            .ok_or_else(|| eyre::eyre!("unknown task in scenario: {title}"))
    }

    /// Builds search task details for the world's organization.
    #[must_use]
    pub fn details(&self, title: &str, priority: TaskPriority) -> NewTask {
        NewTask {
            title: title.to_owned(),
            description: format!("{title} for the harbour search"),
            task_type: TaskType::Search,
            priority,
            case_id: None,
            org_id: self.org,
            deadline: None,
            estimated_hours: 1,
            location: Location {
                name: "Harbour".to_owned(),
                address: "Quay Street".to_owned(),
                coordinates: None,
            },
            requirements: String::new(),
            materials: Vec::new(),
            notes: String::new(),
        }
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> AutoAssignWorld {
    AutoAssignWorld::new().expect("scenario world should initialise")
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
