//! Task type and priority tags.

use super::ParseTaskValueError;
use serde::{Deserialize, Serialize};

/// Kind of field work a task describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// On-site search.
    Search,
    /// Verification by phone.
    Call,
    /// Information gathering.
    InfoCollect,
    /// Dialect recording session.
    DialectRecord,
    /// Coordination between teams or agencies.
    Coordination,
    /// Anything else.
    Other,
}

impl TaskType {
    const ALL: [Self; 6] = [
        Self::Search,
        Self::Call,
        Self::InfoCollect,
        Self::DialectRecord,
        Self::Coordination,
        Self::Other,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Call => "call",
            Self::InfoCollect => "info_collect",
            Self::DialectRecord => "dialect_record",
            Self::Coordination => "coordination",
            Self::Other => "other",
        }
    }
}

impl TryFrom<&str> for TaskType {
    type Error = ParseTaskValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseTaskValueError::new("task type", value))
    }
}

/// Urgency of a task. Automatic assignment serves higher ranks first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Drop everything.
    Urgent,
    /// Ahead of routine work.
    High,
    /// Routine work.
    #[default]
    Normal,
    /// When time allows.
    Low,
}

impl TaskPriority {
    const ALL: [Self; 4] = [Self::Urgent, Self::High, Self::Normal, Self::Low];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }

    /// Ordering weight; larger is more urgent.
    #[must_use]
    pub const fn rank(self) -> i16 {
        match self {
            Self::Urgent => 3,
            Self::High => 2,
            Self::Normal => 1,
            Self::Low => 0,
        }
    }
}

impl TryFrom<&str> for TaskPriority {
    type Error = ParseTaskValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|priority| priority.as_str() == normalized)
            .ok_or_else(|| ParseTaskValueError::new("task priority", value))
    }
}
