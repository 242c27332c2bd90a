//! Task status machine.

use super::ParseTaskValueError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a task.
///
/// `draft`/`pending` tasks are editable and assignable; `assigned` and
/// `processing` tasks count toward their assignee's workload and may be
/// completed. `processing` and `timeout` are set by processes outside this
/// crate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created but not yet released for assignment.
    Draft,
    /// Waiting for an assignee.
    Pending,
    /// Assigned, work not yet reported as started.
    Assigned,
    /// Work in progress.
    Processing,
    /// Finished with feedback.
    Completed,
    /// Abandoned by its creator or an administrator.
    Cancelled,
    /// Marked as timed out.
    Timeout,
}

impl TaskStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Draft,
        Self::Pending,
        Self::Assigned,
        Self::Processing,
        Self::Completed,
        Self::Cancelled,
        Self::Timeout,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
        }
    }

    /// Whether task details may still be edited.
    #[must_use]
    pub const fn can_edit(self) -> bool {
        matches!(self, Self::Draft | Self::Pending)
    }

    /// Whether the task may be given to an assignee.
    #[must_use]
    pub const fn can_assign(self) -> bool {
        matches!(self, Self::Draft | Self::Pending)
    }

    /// Whether the task may be completed.
    #[must_use]
    pub const fn can_complete(self) -> bool {
        matches!(self, Self::Assigned | Self::Processing)
    }

    /// Whether the task counts toward its assignee's workload.
    #[must_use]
    pub const fn is_active_work(self) -> bool {
        matches!(self, Self::Assigned | Self::Processing)
    }

    /// Whether the task has been closed and can no longer become overdue.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| ParseTaskValueError::new("task status", value))
    }
}
