//! Task domain: the task aggregate, its status machine, log rows and
//! comments.

mod classification;
mod comment;
mod error;
mod ids;
mod log;
mod number;
mod progress;
mod statistics;
mod status;
mod task;

pub use classification::{TaskPriority, TaskType};
pub use comment::{PersistedCommentData, TaskComment};
pub use error::{ParseTaskValueError, TaskDomainError};
pub use ids::{CaseId, TaskCommentId, TaskId, TaskLogId};
pub use log::{PersistedTaskLogData, TaskAction, TaskLog};
pub use number::TaskNumber;
pub use progress::Progress;
pub use statistics::TaskStatistics;
pub use status::TaskStatus;
pub use task::{
    CompletionReport, Coordinates, FieldUpdate, Location, NewTask, PersistedTaskData, Task,
    TaskChanges, WorkflowLink,
};
