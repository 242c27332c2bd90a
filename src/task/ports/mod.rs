//! Port contracts for task persistence and task-number generation.

mod number;
mod repository;

pub use number::TaskNumberGenerator;
#[cfg(test)]
pub use number::MockTaskNumberGenerator;
pub use repository::{TaskFilter, TaskRepository, TaskRepositoryError, TaskRepositoryResult};
