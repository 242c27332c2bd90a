//! Task-number generation port.

use crate::task::domain::TaskNumber;
use chrono::{DateTime, Utc};

/// Produces candidate task numbers. Uniqueness is enforced by the
/// repository; callers retry on collision.
#[cfg_attr(test, mockall::automock)]
pub trait TaskNumberGenerator: Send + Sync {
    /// Returns a fresh candidate number for a task issued at `issued_at`.
    fn generate(&self, issued_at: DateTime<Utc>) -> TaskNumber;
}
