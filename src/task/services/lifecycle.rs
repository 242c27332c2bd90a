//! Task creation, editing and deletion.

use super::dispatch::{TaskDispatchError, TaskDispatchResult, TaskDispatchService};
use crate::directory::{
    domain::{Capability, UserId},
    ports::{OrganizationDirectory, UserDirectory},
};
use crate::task::{
    domain::{NewTask, Task, TaskAction, TaskChanges, TaskId, TaskLog},
    ports::{TaskNumberGenerator, TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use tracing::{info, warn};

/// Request payload for creating a task.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTaskRequest {
    creator_id: UserId,
    details: NewTask,
    assignee_id: Option<UserId>,
}

impl CreateTaskRequest {
    /// Creates a request for an unassigned task.
    #[must_use]
    pub const fn new(creator_id: UserId, details: NewTask) -> Self {
        Self {
            creator_id,
            details,
            assignee_id: None,
        }
    }

    /// Names the user who receives the task immediately.
    #[must_use]
    pub const fn with_assignee(mut self, assignee_id: UserId) -> Self {
        self.assignee_id = Some(assignee_id);
        self
    }
}

impl<R, U, O, N, C> TaskDispatchService<R, U, O, N, C>
where
    R: TaskRepository,
    U: UserDirectory,
    O: OrganizationDirectory,
    N: TaskNumberGenerator,
    C: Clock + Send + Sync,
{
    /// Creates a task with a freshly generated number and logs `create`.
    ///
    /// With an assignee the task starts `assigned`; without one it starts
    /// `pending`. A number collision draws a new number, up to the
    /// configured number of attempts.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::OrgNotFound`] or
    /// [`TaskDispatchError::UserNotFound`] for unknown references,
    /// [`TaskDispatchError::Domain`] for a blank title and
    /// [`TaskDispatchError::GenerationExhausted`] when every number
    /// collided.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskDispatchResult<Task> {
        let CreateTaskRequest {
            creator_id,
            details,
            assignee_id,
        } = request;
        let org_id = details.org_id;
        if self
            .organizations
            .find_organization(org_id)
            .await?
            .is_none()
        {
            return Err(TaskDispatchError::OrgNotFound(org_id));
        }
        if let Some(assignee) = assignee_id {
            self.require_user(assignee).await?;
        }

        for attempt in 1..=self.number_attempts {
            let number = self.numbers.generate(self.clock.utc());
            let task = Task::create(
                number,
                creator_id,
                details.clone(),
                assignee_id,
                &*self.clock,
            )?;
            let log = TaskLog::record(
                &task,
                creator_id,
                TaskAction::Create,
                None,
                "task created",
                &*self.clock,
            );
            match self.repository.create_task(&task, &log).await {
                Ok(()) => {
                    info!(
                        task_id = %task.id(),
                        number = %task.number(),
                        status = task.status().as_str(),
                        "task created"
                    );
                    return Ok(task);
                }
                Err(TaskRepositoryError::DuplicateNumber(number)) => {
                    warn!(%number, attempt, "task number collision, regenerating");
                }
                Err(other) => return Err(other.into()),
            }
        }
        Err(TaskDispatchError::GenerationExhausted {
            attempts: self.number_attempts,
        })
    }

    /// Applies a partial edit to a draft or pending task and logs `update`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::TaskNotFound`] when absent and
    /// [`TaskDispatchError::Domain`] once the task is no longer editable.
    pub async fn update_task(
        &self,
        task_id: TaskId,
        operator_id: UserId,
        changes: TaskChanges,
    ) -> TaskDispatchResult<Task> {
        let mut task = self.require_task(task_id).await?;
        task.edit(changes, &*self.clock)?;
        let log = TaskLog::record(
            &task,
            operator_id,
            TaskAction::Update,
            None,
            "task details updated",
            &*self.clock,
        );
        self.repository.record(&task, &log).await?;
        info!(task_id = %task_id, "task updated");
        Ok(task)
    }

    /// Soft-deletes a draft or pending task. Only the creator or an
    /// administrator may delete.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::PermissionDenied`] for other users and
    /// [`TaskDispatchError::Domain`] once work has been handed out.
    pub async fn delete_task(&self, task_id: TaskId, user_id: UserId) -> TaskDispatchResult<()> {
        let mut task = self.require_task(task_id).await?;
        self.authorize(
            user_id,
            task.creator_id() == user_id,
            Capability::Administer,
            "delete",
        )
        .await?;
        task.mark_deleted(&*self.clock)?;
        self.repository.save_task(&task).await?;
        info!(task_id = %task_id, user_id = %user_id, "task deleted");
        Ok(())
    }
}
