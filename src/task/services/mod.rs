//! Application services for task dispatch.

mod assignment;
mod comments;
mod completion;
mod dispatch;
mod lifecycle;
mod queries;

pub use assignment::{AutoAssignReport, AutoAssignment, BatchAssignRequest};
pub use comments::AddCommentRequest;
pub use dispatch::{
    DEFAULT_NUMBER_ATTEMPTS, TaskDispatchError, TaskDispatchResult, TaskDispatchService,
};
pub use lifecycle::CreateTaskRequest;
