//! Diesel row models for task persistence.

use super::schema::{task_comments, task_logs, tasks};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Row model for tasks, used for reads, inserts and updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct TaskRow {
    /// Task identifier.
    pub id: uuid::Uuid,
    /// Task number.
    pub task_no: String,
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Type tag.
    pub task_type: String,
    /// Priority tag.
    pub priority: String,
    /// Priority sort weight.
    pub priority_rank: i16,
    /// Lifecycle status.
    pub status: String,
    /// Linked case.
    pub case_id: Option<uuid::Uuid>,
    /// Creating user.
    pub creator_id: uuid::Uuid,
    /// Current assignee.
    pub assignee_id: Option<uuid::Uuid>,
    /// Owning organization.
    pub org_id: uuid::Uuid,
    /// Assignment start.
    pub start_time: Option<DateTime<Utc>>,
    /// Deadline.
    pub deadline: Option<DateTime<Utc>>,
    /// Completion time.
    pub completed_time: Option<DateTime<Utc>>,
    /// Estimated hours.
    pub estimated_hours: i32,
    /// Actual hours.
    pub actual_hours: i32,
    /// Location document.
    pub location: Value,
    /// Requirements text.
    pub requirements: String,
    /// Materials list.
    pub materials: Value,
    /// Notes.
    pub notes: String,
    /// Linked workflow definition.
    pub workflow_id: Option<uuid::Uuid>,
    /// Step index within the linked workflow.
    pub current_step: Option<i32>,
    /// Completion feedback.
    pub feedback: String,
    /// Completion result.
    pub result: String,
    /// Attachment references.
    pub attachments: Value,
    /// Progress percentage.
    pub progress: i16,
    /// Concurrency revision.
    pub revision: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Query result row for task logs.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskLogRow {
    /// Log row identifier.
    pub id: uuid::Uuid,
    /// Task.
    pub task_id: uuid::Uuid,
    /// Acting user.
    pub user_id: uuid::Uuid,
    /// Action tag.
    pub action: String,
    /// Status before.
    pub old_status: Option<String>,
    /// Status after.
    pub new_status: String,
    /// Content.
    pub content: String,
    /// Timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for task logs; `seq` is assigned by the database.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_logs)]
pub struct NewTaskLogRow {
    /// Log row identifier.
    pub id: uuid::Uuid,
    /// Task.
    pub task_id: uuid::Uuid,
    /// Acting user.
    pub user_id: uuid::Uuid,
    /// Action tag.
    pub action: String,
    /// Status before.
    pub old_status: Option<String>,
    /// Status after.
    pub new_status: String,
    /// Content.
    pub content: String,
    /// Timestamp.
    pub created_at: DateTime<Utc>,
}

/// Query result row for comments.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = task_comments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CommentRow {
    /// Comment identifier.
    pub id: uuid::Uuid,
    /// Task.
    pub task_id: uuid::Uuid,
    /// Author.
    pub user_id: uuid::Uuid,
    /// Text.
    pub content: String,
    /// Attachment references.
    pub attachments: Value,
    /// Parent comment.
    pub parent_id: Option<uuid::Uuid>,
    /// Timestamp.
    pub created_at: DateTime<Utc>,
}

/// Insert model for comments; `seq` is assigned by the database.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = task_comments)]
pub struct NewCommentRow {
    /// Comment identifier.
    pub id: uuid::Uuid,
    /// Task.
    pub task_id: uuid::Uuid,
    /// Author.
    pub user_id: uuid::Uuid,
    /// Text.
    pub content: String,
    /// Attachment references.
    pub attachments: Value,
    /// Parent comment.
    pub parent_id: Option<uuid::Uuid>,
    /// Timestamp.
    pub created_at: DateTime<Utc>,
}
