//! Task dispatch service handle and its error type.

use crate::directory::{
    domain::{Capability, OrganizationId, User, UserId},
    ports::{DirectoryError, OrganizationDirectory, UserDirectory},
};
use crate::error::ErrorKind;
use crate::task::{
    domain::{Task, TaskCommentId, TaskDomainError, TaskId},
    ports::{TaskNumberGenerator, TaskRepository, TaskRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Number of task numbers tried before creation gives up.
pub const DEFAULT_NUMBER_ATTEMPTS: u32 = 10;

/// Service-level errors for task dispatch operations.
#[derive(Debug, Error)]
pub enum TaskDispatchError {
    /// Domain validation or a state rule failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] TaskRepositoryError),
    /// Directory lookup failed.
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    /// The task does not exist or was deleted.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    /// The user does not exist.
    #[error("user not found: {0}")]
    UserNotFound(UserId),
    /// The organization does not exist.
    #[error("organization not found: {0}")]
    OrgNotFound(OrganizationId),
    /// The parent comment does not exist.
    #[error("comment not found: {0}")]
    CommentNotFound(TaskCommentId),
    /// The acting user may not perform the action.
    #[error("user {user} may not {action} this task")]
    PermissionDenied {
        /// Acting user.
        user: UserId,
        /// Refused action.
        action: &'static str,
    },
    /// Every generated task number collided with an existing one.
    #[error("no unique task number after {attempts} attempts")]
    GenerationExhausted {
        /// Attempts made.
        attempts: u32,
    },
    /// A batch named no well-formed task identifiers.
    #[error("no valid task ids in batch")]
    NoValidTaskIds,
    /// The organization has no members to assign work to.
    #[error("organization {0} has no members available for assignment")]
    NoAvailableMembers(OrganizationId),
}

impl TaskDispatchError {
    /// Classifies the error for outer layers.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => match err {
                TaskDomainError::InvalidTransition { .. }
                | TaskDomainError::AlreadyCompleted(_) => ErrorKind::InvalidState,
                TaskDomainError::EmptyField(_)
                | TaskDomainError::InvalidProgress(_)
                | TaskDomainError::ParentOnOtherTask(_)
                | TaskDomainError::NestedReply(_) => ErrorKind::InvalidInput,
            },
            Self::Repository(err) => match err {
                TaskRepositoryError::NotFound(_) => ErrorKind::NotFound,
                TaskRepositoryError::DuplicateNumber(_)
                | TaskRepositoryError::RevisionConflict(_) => ErrorKind::Conflict,
                TaskRepositoryError::Persistence(_) => ErrorKind::Internal,
            },
            Self::Directory(_) => ErrorKind::Internal,
            Self::TaskNotFound(_)
            | Self::UserNotFound(_)
            | Self::OrgNotFound(_)
            | Self::CommentNotFound(_) => ErrorKind::NotFound,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::GenerationExhausted { .. } => ErrorKind::Conflict,
            Self::NoValidTaskIds => ErrorKind::InvalidInput,
            Self::NoAvailableMembers(_) => ErrorKind::InvalidState,
        }
    }
}

/// Result type for task dispatch operations.
pub type TaskDispatchResult<T> = Result<T, TaskDispatchError>;

/// Task creation, assignment and tracking service.
#[derive(Clone)]
pub struct TaskDispatchService<R, U, O, N, C>
where
    R: TaskRepository,
    U: UserDirectory,
    O: OrganizationDirectory,
    N: TaskNumberGenerator,
    C: Clock + Send + Sync,
{
    pub(super) repository: Arc<R>,
    pub(super) users: Arc<U>,
    pub(super) organizations: Arc<O>,
    pub(super) numbers: Arc<N>,
    pub(super) clock: Arc<C>,
    pub(super) number_attempts: u32,
}

impl<R, U, O, N, C> TaskDispatchService<R, U, O, N, C>
where
    R: TaskRepository,
    U: UserDirectory,
    O: OrganizationDirectory,
    N: TaskNumberGenerator,
    C: Clock + Send + Sync,
{
    /// Creates a new dispatch service.
    #[must_use]
    pub const fn new(
        repository: Arc<R>,
        users: Arc<U>,
        organizations: Arc<O>,
        numbers: Arc<N>,
        clock: Arc<C>,
    ) -> Self {
        Self {
            repository,
            users,
            organizations,
            numbers,
            clock,
            number_attempts: DEFAULT_NUMBER_ATTEMPTS,
        }
    }

    /// Sets how many task numbers are tried before creation fails. At least
    /// one attempt is always made.
    #[must_use]
    pub const fn with_number_attempts(mut self, attempts: u32) -> Self {
        self.number_attempts = if attempts == 0 { 1 } else { attempts };
        self
    }

    pub(super) async fn require_task(&self, id: TaskId) -> TaskDispatchResult<Task> {
        self.repository
            .find_task(id)
            .await?
            .ok_or(TaskDispatchError::TaskNotFound(id))
    }

    pub(super) async fn require_user(&self, id: UserId) -> TaskDispatchResult<User> {
        self.users
            .find_user(id)
            .await?
            .ok_or(TaskDispatchError::UserNotFound(id))
    }

    /// Allows `user_id` when `owns` holds, otherwise only when the user
    /// exists and holds `capability`.
    pub(super) async fn authorize(
        &self,
        user_id: UserId,
        owns: bool,
        capability: Capability,
        action: &'static str,
    ) -> TaskDispatchResult<()> {
        if owns {
            return Ok(());
        }
        let privileged = self
            .users
            .find_user(user_id)
            .await?
            .is_some_and(|user| user.can(capability));
        if privileged {
            Ok(())
        } else {
            Err(TaskDispatchError::PermissionDenied {
                user: user_id,
                action,
            })
        }
    }
}

/// Appends a labelled note to a log message when the note is not blank.
pub(super) fn with_note(base: String, label: &str, note: &str) -> String {
    let trimmed = note.trim();
    if trimmed.is_empty() {
        base
    } else {
        format!("{base}; {label}: {trimmed}")
    }
}
