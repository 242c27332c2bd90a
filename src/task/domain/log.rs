//! Append-only task transition log.

use super::{ParseTaskValueError, Task, TaskId, TaskLogId, TaskStatus};
use crate::directory::domain::UserId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// What happened to a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskAction {
    /// Task created.
    Create,
    /// Details edited.
    Update,
    /// Given to an assignee.
    Assign,
    /// Returned to the pending pool.
    Unassign,
    /// Handed to another assignee.
    Transfer,
    /// Completed.
    Complete,
    /// Cancelled.
    Cancel,
    /// Progress reported.
    Progress,
    /// Assigned as part of a batch.
    BatchAssign,
    /// Assigned by the load balancer.
    AutoAssign,
}

impl TaskAction {
    const ALL: [Self; 10] = [
        Self::Create,
        Self::Update,
        Self::Assign,
        Self::Unassign,
        Self::Transfer,
        Self::Complete,
        Self::Cancel,
        Self::Progress,
        Self::BatchAssign,
        Self::AutoAssign,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Assign => "assign",
            Self::Unassign => "unassign",
            Self::Transfer => "transfer",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::Progress => "progress",
            Self::BatchAssign => "batch_assign",
            Self::AutoAssign => "auto_assign",
        }
    }
}

impl TryFrom<&str> for TaskAction {
    type Error = ParseTaskValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| ParseTaskValueError::new("task action", value))
    }
}

/// One immutable log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLog {
    id: TaskLogId,
    task_id: TaskId,
    user_id: UserId,
    action: TaskAction,
    old_status: Option<TaskStatus>,
    new_status: TaskStatus,
    content: String,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskLogData {
    /// Persisted identifier.
    pub id: TaskLogId,
    /// Persisted task.
    pub task_id: TaskId,
    /// Persisted acting user.
    pub user_id: UserId,
    /// Persisted action.
    pub action: TaskAction,
    /// Persisted prior status.
    pub old_status: Option<TaskStatus>,
    /// Persisted resulting status.
    pub new_status: TaskStatus,
    /// Persisted content.
    pub content: String,
    /// Persisted timestamp.
    pub created_at: DateTime<Utc>,
}

impl TaskLog {
    /// Records `action` by `user_id` on `task`, which must already reflect
    /// the change.
    #[must_use]
    pub fn record(
        task: &Task,
        user_id: UserId,
        action: TaskAction,
        old_status: Option<TaskStatus>,
        content: impl Into<String>,
        clock: &impl Clock,
    ) -> Self {
        Self {
            id: TaskLogId::new(),
            task_id: task.id(),
            user_id,
            action,
            old_status,
            new_status: task.status(),
            content: content.into(),
            created_at: clock.utc(),
        }
    }

    /// Reconstructs a log row from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskLogData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            user_id: data.user_id,
            action: data.action,
            old_status: data.old_status,
            new_status: data.new_status,
            content: data.content,
            created_at: data.created_at,
        }
    }

    /// Returns the log identifier.
    #[must_use]
    pub const fn id(&self) -> TaskLogId {
        self.id
    }

    /// Returns the task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the acting user.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns the action.
    #[must_use]
    pub const fn action(&self) -> TaskAction {
        self.action
    }

    /// Returns the status before the action, when known.
    #[must_use]
    pub const fn old_status(&self) -> Option<TaskStatus> {
        self.old_status
    }

    /// Returns the status after the action.
    #[must_use]
    pub const fn new_status(&self) -> TaskStatus {
        self.new_status
    }

    /// Returns the human-readable content.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
