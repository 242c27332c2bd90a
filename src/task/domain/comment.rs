//! Discussion threads on tasks.

use super::{TaskCommentId, TaskDomainError, TaskId};
use crate::directory::domain::UserId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// A comment or a one-level reply on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskComment {
    id: TaskCommentId,
    task_id: TaskId,
    author_id: UserId,
    content: String,
    attachments: Vec<String>,
    parent_id: Option<TaskCommentId>,
    created_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedCommentData {
    /// Persisted identifier.
    pub id: TaskCommentId,
    /// Persisted task.
    pub task_id: TaskId,
    /// Persisted author.
    pub author_id: UserId,
    /// Persisted text.
    pub content: String,
    /// Persisted attachment references.
    pub attachments: Vec<String>,
    /// Persisted parent comment.
    pub parent_id: Option<TaskCommentId>,
    /// Persisted timestamp.
    pub created_at: DateTime<Utc>,
}

impl TaskComment {
    /// Writes a comment on `task_id`, optionally replying to `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyField`] for blank content,
    /// [`TaskDomainError::ParentOnOtherTask`] when `parent` belongs to a
    /// different task, and [`TaskDomainError::NestedReply`] when `parent` is
    /// itself a reply.
    pub fn new(
        task_id: TaskId,
        author_id: UserId,
        content: &str,
        attachments: Vec<String>,
        parent: Option<&Self>,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        let text = content.trim();
        if text.is_empty() {
            return Err(TaskDomainError::EmptyField("comment"));
        }
        if let Some(reply_to) = parent {
            if reply_to.task_id != task_id {
                return Err(TaskDomainError::ParentOnOtherTask(reply_to.id));
            }
            if reply_to.parent_id.is_some() {
                return Err(TaskDomainError::NestedReply(reply_to.id));
            }
        }
        Ok(Self {
            id: TaskCommentId::new(),
            task_id,
            author_id,
            content: text.to_owned(),
            attachments,
            parent_id: parent.map(|reply_to| reply_to.id),
            created_at: clock.utc(),
        })
    }

    /// Reconstructs a comment from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedCommentData) -> Self {
        Self {
            id: data.id,
            task_id: data.task_id,
            author_id: data.author_id,
            content: data.content,
            attachments: data.attachments,
            parent_id: data.parent_id,
            created_at: data.created_at,
        }
    }

    /// Returns the comment identifier.
    #[must_use]
    pub const fn id(&self) -> TaskCommentId {
        self.id
    }

    /// Returns the task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the author.
    #[must_use]
    pub const fn author_id(&self) -> UserId {
        self.author_id
    }

    /// Returns the text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the attachment references.
    #[must_use]
    pub fn attachments(&self) -> &[String] {
        &self.attachments
    }

    /// Returns the parent comment, for replies.
    #[must_use]
    pub const fn parent_id(&self) -> Option<TaskCommentId> {
        self.parent_id
    }

    /// Returns the timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
