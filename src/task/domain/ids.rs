//! Identifier types for the task domain.

use crate::ids::uuid_id;

uuid_id!(
    /// Unique identifier for a task.
    TaskId
);
uuid_id!(
    /// Unique identifier for a task log row.
    TaskLogId
);
uuid_id!(
    /// Unique identifier for a task comment.
    TaskCommentId
);
uuid_id!(
    /// Identifier of the missing-person case a task works on.
    CaseId
);
