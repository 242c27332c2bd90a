//! Diesel schema for task persistence.

diesel::table! {
    /// Task records.
    tasks (id) {
        /// Task identifier.
        id -> Uuid,
        /// Human-readable number, unique across all tasks.
        #[max_length = 50]
        task_no -> Varchar,
        /// Title.
        #[max_length = 200]
        title -> Varchar,
        /// Description.
        description -> Text,
        /// Type tag.
        #[max_length = 30]
        task_type -> Varchar,
        /// Priority tag.
        #[max_length = 20]
        priority -> Varchar,
        /// Sort weight derived from the priority.
        priority_rank -> Int2,
        /// Lifecycle status.
        #[max_length = 20]
        status -> Varchar,
        /// Linked case.
        case_id -> Nullable<Uuid>,
        /// Creating user.
        creator_id -> Uuid,
        /// Current assignee.
        assignee_id -> Nullable<Uuid>,
        /// Owning organization.
        org_id -> Uuid,
        /// When the current assignee received the task.
        start_time -> Nullable<Timestamptz>,
        /// Deadline.
        deadline -> Nullable<Timestamptz>,
        /// Completion time.
        completed_time -> Nullable<Timestamptz>,
        /// Estimated hours.
        estimated_hours -> Int4,
        /// Actual hours.
        actual_hours -> Int4,
        /// Place name, address and coordinates.
        location -> Jsonb,
        /// Requirements text.
        requirements -> Text,
        /// Materials list.
        materials -> Jsonb,
        /// Notes.
        notes -> Text,
        /// Linked workflow definition.
        workflow_id -> Nullable<Uuid>,
        /// Step index within the linked workflow.
        current_step -> Nullable<Int4>,
        /// Completion feedback.
        feedback -> Text,
        /// Completion result or cancellation reason.
        result -> Text,
        /// Attachment references.
        attachments -> Jsonb,
        /// Progress percentage.
        progress -> Int2,
        /// Concurrency revision.
        revision -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
        /// Soft-delete marker.
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    /// Append-only task transition log.
    task_logs (id) {
        /// Log row identifier.
        id -> Uuid,
        /// Task the row belongs to.
        task_id -> Uuid,
        /// Acting user.
        user_id -> Uuid,
        /// Action tag.
        #[max_length = 50]
        action -> Varchar,
        /// Status before the action.
        #[max_length = 20]
        old_status -> Nullable<Varchar>,
        /// Status after the action.
        #[max_length = 20]
        new_status -> Varchar,
        /// Human-readable content.
        content -> Text,
        /// Insertion sequence.
        seq -> Int8,
        /// Timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Task discussion comments.
    task_comments (id) {
        /// Comment identifier.
        id -> Uuid,
        /// Task the comment belongs to.
        task_id -> Uuid,
        /// Author.
        user_id -> Uuid,
        /// Text.
        content -> Text,
        /// Attachment references.
        attachments -> Jsonb,
        /// Parent comment for replies.
        parent_id -> Nullable<Uuid>,
        /// Insertion sequence.
        seq -> Int8,
        /// Timestamp.
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(tasks, task_logs, task_comments);
