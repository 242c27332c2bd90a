//! Read-side task operations.

use super::dispatch::{TaskDispatchError, TaskDispatchResult, TaskDispatchService};
use crate::directory::{
    domain::{OrganizationId, UserId},
    ports::{OrganizationDirectory, UserDirectory},
};
use crate::paging::{Page, PageRequest};
use crate::task::{
    domain::{Task, TaskId, TaskLog, TaskStatistics, TaskStatus},
    ports::{TaskFilter, TaskNumberGenerator, TaskRepository},
};
use mockable::Clock;
use tracing::debug;

impl<R, U, O, N, C> TaskDispatchService<R, U, O, N, C>
where
    R: TaskRepository,
    U: UserDirectory,
    O: OrganizationDirectory,
    N: TaskNumberGenerator,
    C: Clock + Send + Sync,
{
    /// Returns a live task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::TaskNotFound`] when absent or deleted.
    pub async fn task(&self, id: TaskId) -> TaskDispatchResult<Task> {
        let task = self
            .repository
            .find_task(id)
            .await?
            .ok_or(TaskDispatchError::TaskNotFound(id))?;
        debug!(task_id = %id, status = task.status().as_str(), "loaded task");
        Ok(task)
    }

    /// Lists live tasks matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::Repository`] when the lookup fails.
    pub async fn list_tasks(
        &self,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> TaskDispatchResult<Page<Task>> {
        Ok(self.repository.list_tasks(filter, page).await?)
    }

    /// Lists the tasks held by `user_id`, optionally in one status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::Repository`] when the lookup fails.
    pub async fn my_tasks(
        &self,
        user_id: UserId,
        status: Option<TaskStatus>,
    ) -> TaskDispatchResult<Vec<Task>> {
        let filter = TaskFilter {
            assignee_id: Some(user_id),
            status,
            ..TaskFilter::default()
        };
        Ok(self.repository.tasks_matching(&filter).await?)
    }

    /// Lists the tasks created by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::Repository`] when the lookup fails.
    pub async fn created_tasks(&self, user_id: UserId) -> TaskDispatchResult<Vec<Task>> {
        let filter = TaskFilter {
            creator_id: Some(user_id),
            ..TaskFilter::default()
        };
        Ok(self.repository.tasks_matching(&filter).await?)
    }

    /// Returns the log of a task, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::Repository`] when the lookup fails.
    pub async fn task_logs(&self, task_id: TaskId) -> TaskDispatchResult<Vec<TaskLog>> {
        Ok(self.repository.task_logs(task_id).await?)
    }

    /// Counts live tasks, across all organizations or within one. "Today"
    /// is the current UTC day.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::Repository`] when the lookup fails.
    pub async fn statistics(
        &self,
        org_id: Option<OrganizationId>,
    ) -> TaskDispatchResult<TaskStatistics> {
        Ok(self.repository.statistics(org_id, self.clock.utc()).await?)
    }
}
