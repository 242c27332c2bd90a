//! Diesel row models for workflow persistence.

use super::schema::{workflow_histories, workflow_instances, workflow_steps, workflows};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

/// Row model for definitions, used for reads, inserts and updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = workflows)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct DefinitionRow {
    /// Definition identifier.
    pub id: uuid::Uuid,
    /// Display name.
    pub name: String,
    /// Unique code.
    pub code: String,
    /// Type tag.
    pub workflow_type: String,
    /// Description.
    pub description: String,
    /// Lifecycle status.
    pub status: String,
    /// Version counter.
    pub version: i32,
    /// Default flag.
    pub is_default: bool,
    /// Creating user.
    pub creator_id: uuid::Uuid,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Row model for steps, used for reads, inserts and updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = workflow_steps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct StepRow {
    /// Step identifier.
    pub id: uuid::Uuid,
    /// Owning definition.
    pub workflow_id: uuid::Uuid,
    /// Step name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Order index.
    pub step_order: i32,
    /// Type tag.
    pub step_type: String,
    /// Assignee mode.
    pub assignee_mode: String,
    /// Target role.
    pub assignee_role: Option<String>,
    /// Expected duration in hours.
    pub duration_hours: i32,
    /// Timeout policy.
    pub skip_on_timeout: bool,
    /// Form configuration.
    pub form_config: Value,
    /// Transition conditions.
    pub conditions: Value,
    /// Available actions.
    pub actions: Value,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Row model for instances, used for reads, inserts and updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = workflow_instances)]
#[diesel(check_for_backend(diesel::pg::Pg))]
#[diesel(treat_none_as_null = true)]
pub struct InstanceRow {
    /// Instance identifier.
    pub id: uuid::Uuid,
    /// Executed definition.
    pub workflow_id: uuid::Uuid,
    /// Bound business object.
    pub business_id: uuid::Uuid,
    /// Business type tag.
    pub business_type: String,
    /// Title.
    pub title: String,
    /// Execution status.
    pub status: String,
    /// Current step.
    pub current_step_id: Option<uuid::Uuid>,
    /// Starting user.
    pub starter_id: uuid::Uuid,
    /// Start time.
    pub start_time: DateTime<Utc>,
    /// End time.
    pub end_time: Option<DateTime<Utc>>,
    /// Time the current step was entered.
    pub step_entered_at: DateTime<Utc>,
    /// Revision.
    pub revision: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Query result row for history.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = workflow_histories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HistoryRow {
    /// Row identifier.
    pub id: uuid::Uuid,
    /// Owning instance.
    pub instance_id: uuid::Uuid,
    /// Step acted on.
    pub step_id: uuid::Uuid,
    /// Step name snapshot.
    pub step_name: String,
    /// Operator.
    pub operator_id: uuid::Uuid,
    /// Action.
    pub action: String,
    /// Comment.
    pub comment: String,
    /// Form-data snapshot.
    pub form_data: Value,
    /// Transfer target.
    pub transfer_to: Option<uuid::Uuid>,
    /// Step entry time.
    pub start_time: DateTime<Utc>,
    /// Commit time.
    pub end_time: DateTime<Utc>,
    /// Minutes spent.
    pub duration_minutes: i64,
}

/// Insert model for history; `seq` is assigned by the database.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = workflow_histories)]
pub struct NewHistoryRow {
    /// Row identifier.
    pub id: uuid::Uuid,
    /// Owning instance.
    pub instance_id: uuid::Uuid,
    /// Step acted on.
    pub step_id: uuid::Uuid,
    /// Step name snapshot.
    pub step_name: String,
    /// Operator.
    pub operator_id: uuid::Uuid,
    /// Action.
    pub action: String,
    /// Comment.
    pub comment: String,
    /// Form-data snapshot.
    pub form_data: Value,
    /// Transfer target.
    pub transfer_to: Option<uuid::Uuid>,
    /// Step entry time.
    pub start_time: DateTime<Utc>,
    /// Commit time.
    pub end_time: DateTime<Utc>,
    /// Minutes spent.
    pub duration_minutes: i64,
}
