//! Error types for task domain validation and state transitions.

use super::{TaskCommentId, TaskId, TaskStatus};
use thiserror::Error;

/// Errors returned by task domain operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// A required text field is empty after trimming.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// The task status does not permit the requested action.
    #[error("task {task} cannot {action} while {status}")]
    InvalidTransition {
        /// Task acted on.
        task: TaskId,
        /// Status at the time of the request.
        status: TaskStatus,
        /// Rejected action.
        action: &'static str,
    },

    /// Completed tasks cannot be cancelled.
    #[error("task {0} is already completed")]
    AlreadyCompleted(TaskId),

    /// Progress outside `0..=100`.
    #[error("progress must be between 0 and 100, got {0}")]
    InvalidProgress(i64),

    /// A reply names a parent comment on a different task.
    #[error("comment {0} belongs to another task")]
    ParentOnOtherTask(TaskCommentId),

    /// A reply names a parent that is itself a reply.
    #[error("comment {0} is a reply and cannot be replied to")]
    NestedReply(TaskCommentId),
}

/// Error returned while parsing task enumerations from persistence or
/// requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseTaskValueError {
    /// Name of the enumeration being parsed.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
}

impl ParseTaskValueError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}
