//! Task discussion threads.

use super::dispatch::{TaskDispatchError, TaskDispatchResult, TaskDispatchService};
use crate::directory::{
    domain::UserId,
    ports::{OrganizationDirectory, UserDirectory},
};
use crate::task::{
    domain::{TaskComment, TaskCommentId, TaskId},
    ports::{TaskNumberGenerator, TaskRepository},
};
use mockable::Clock;
use tracing::info;

/// Request payload for commenting on a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddCommentRequest {
    task_id: TaskId,
    author_id: UserId,
    content: String,
    attachments: Vec<String>,
    parent_id: Option<TaskCommentId>,
}

impl AddCommentRequest {
    /// Creates a top-level comment request.
    #[must_use]
    pub fn new(task_id: TaskId, author_id: UserId, content: impl Into<String>) -> Self {
        Self {
            task_id,
            author_id,
            content: content.into(),
            attachments: Vec::new(),
            parent_id: None,
        }
    }

    /// Sets attachment references.
    #[must_use]
    pub fn with_attachments(mut self, attachments: impl IntoIterator<Item = String>) -> Self {
        self.attachments = attachments.into_iter().collect();
        self
    }

    /// Makes the comment a reply to `parent_id`.
    #[must_use]
    pub const fn replying_to(mut self, parent_id: TaskCommentId) -> Self {
        self.parent_id = Some(parent_id);
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
    /// Adds a comment to a live task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::TaskNotFound`] or
    /// [`TaskDispatchError::CommentNotFound`] for unknown references and
    /// [`TaskDispatchError::Domain`] for blank content or an invalid parent.
    pub async fn add_comment(&self, request: AddCommentRequest) -> TaskDispatchResult<TaskComment> {
        let AddCommentRequest {
            task_id,
            author_id,
            content,
            attachments,
            parent_id,
        } = request;
        self.require_task(task_id).await?;
        let parent = match parent_id {
            Some(id) => Some(
                self.repository
                    .find_comment(id)
                    .await?
                    .ok_or(TaskDispatchError::CommentNotFound(id))?,
            ),
            None => None,
        };

        let comment = TaskComment::new(
            task_id,
            author_id,
            &content,
            attachments,
            parent.as_ref(),
            &*self.clock,
        )?;
        self.repository.add_comment(&comment).await?;
        info!(task_id = %task_id, comment_id = %comment.id(), "task comment added");
        Ok(comment)
    }

    /// Returns the comments on a task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::Repository`] when the lookup fails.
    pub async fn comments(&self, task_id: TaskId) -> TaskDispatchResult<Vec<TaskComment>> {
        Ok(self.repository.comments(task_id).await?)
    }
}
