//! Repository port for tasks, their logs and comments.

use crate::directory::domain::{OrganizationId, UserId};
use crate::paging::{Page, PageRequest};
use crate::task::domain::{
    CaseId, Task, TaskComment, TaskCommentId, TaskId, TaskLog, TaskPriority, TaskStatistics,
    TaskStatus, TaskType,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task repository operations.
pub type TaskRepositoryResult<T> = Result<T, TaskRepositoryError>;

/// Criteria for task listings. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only tasks in this status.
    pub status: Option<TaskStatus>,
    /// Only tasks held by this user.
    pub assignee_id: Option<UserId>,
    /// Only tasks created by this user.
    pub creator_id: Option<UserId>,
    /// Only tasks of this organization.
    pub org_id: Option<OrganizationId>,
    /// Only tasks of this type.
    pub task_type: Option<TaskType>,
    /// Only tasks of this priority.
    pub priority: Option<TaskPriority>,
    /// Only tasks linked to this case.
    pub case_id: Option<CaseId>,
    /// Case-insensitive substring of title or description.
    pub keyword: Option<String>,
}

impl TaskFilter {
    /// Whether `task` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, task: &Task) -> bool {
        self.status.is_none_or(|status| task.status() == status)
            && self
                .assignee_id
                .is_none_or(|assignee| task.assignee_id() == Some(assignee))
            && self.creator_id.is_none_or(|creator| task.creator_id() == creator)
            && self.org_id.is_none_or(|org| task.org_id() == org)
            && self.task_type.is_none_or(|kind| task.task_type() == kind)
            && self.priority.is_none_or(|priority| task.priority() == priority)
            && self.case_id.is_none_or(|case| task.case_id() == Some(case))
            && self.keyword.as_deref().is_none_or(|keyword| {
                let needle = keyword.to_lowercase();
                task.title().to_lowercase().contains(&needle)
                    || task.description().to_lowercase().contains(&needle)
            })
    }
}

/// Task persistence contract.
///
/// Every write that changes a stored task checks its revision: the stored
/// revision must be exactly one behind the task being written.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new task with its creation log row.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::DuplicateNumber`] when the task number
    /// is already taken.
    async fn create_task(&self, task: &Task, log: &TaskLog) -> TaskRepositoryResult<()>;

    /// Persists a changed task together with its log row.
    ///
    /// # Errors
    ///
    /// Returns [`TaskRepositoryError::NotFound`] when the task is absent and
    /// [`TaskRepositoryError::RevisionConflict`] when another writer got
    /// there first.
    async fn record(&self, task: &Task, log: &TaskLog) -> TaskRepositoryResult<()>;

    /// Persists several changed tasks and their log rows, all or nothing.
    ///
    /// # Errors
    ///
    /// As [`TaskRepository::record`] for any entry; nothing is written then.
    async fn record_many(&self, changes: &[(Task, TaskLog)]) -> TaskRepositoryResult<()>;

    /// Persists a changed task without a log row.
    ///
    /// # Errors
    ///
    /// As [`TaskRepository::record`].
    async fn save_task(&self, task: &Task) -> TaskRepositoryResult<()>;

    /// Finds a live task.
    async fn find_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>>;

    /// Finds the live tasks among `ids`, in the order given. Unknown ids are
    /// skipped.
    async fn find_tasks(&self, ids: &[TaskId]) -> TaskRepositoryResult<Vec<Task>>;

    /// Lists live tasks matching `filter`, newest first.
    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> TaskRepositoryResult<Page<Task>>;

    /// Returns every live task matching `filter`, newest first.
    async fn tasks_matching(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>>;

    /// Returns up to `limit` pending tasks of an organization, most urgent
    /// first and oldest first within a priority.
    async fn pending_tasks(
        &self,
        org_id: OrganizationId,
        limit: u32,
    ) -> TaskRepositoryResult<Vec<Task>>;

    /// Counts the live `assigned` and `processing` tasks held by a user.
    async fn workload(&self, user_id: UserId) -> TaskRepositoryResult<u64>;

    /// Counts live tasks, optionally restricted to one organization.
    async fn statistics(
        &self,
        org_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> TaskRepositoryResult<TaskStatistics>;

    /// Returns the log of a task, newest first.
    async fn task_logs(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<TaskLog>>;

    /// Stores a comment.
    async fn add_comment(&self, comment: &TaskComment) -> TaskRepositoryResult<()>;

    /// Finds a comment.
    async fn find_comment(&self, id: TaskCommentId) -> TaskRepositoryResult<Option<TaskComment>>;

    /// Returns the comments on a task, oldest first.
    async fn comments(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<TaskComment>>;
}

/// Errors returned by task repository implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskRepositoryError {
    /// The task number is already in use.
    #[error("duplicate task number: {0}")]
    DuplicateNumber(String),

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The stored task changed since it was read.
    #[error("task {0} was modified concurrently")]
    RevisionConflict(TaskId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
