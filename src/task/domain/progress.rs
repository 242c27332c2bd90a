//! Completion percentage.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};

/// Percentage of a task reported as done, always within `0..=100`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "i64", into = "i64")]
pub struct Progress(u8);

impl Progress {
    /// Nothing done yet.
    pub const NONE: Self = Self(0);
    /// Fully done.
    pub const COMPLETE: Self = Self(100);

    /// Validates a percentage.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidProgress`] outside `0..=100`.
    pub fn new(value: i64) -> Result<Self, TaskDomainError> {
        u8::try_from(value)
            .ok()
            .filter(|percent| *percent <= 100)
            .map(Self)
            .ok_or(TaskDomainError::InvalidProgress(value))
    }

    /// Returns the percentage.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Progress {
    type Error = TaskDomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Progress> for i64 {
    fn from(progress: Progress) -> Self {
        Self::from(progress.0)
    }
}
