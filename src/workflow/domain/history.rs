//! Append-only audit rows for workflow instance transitions.

use super::{
    JsonObject, ParseWorkflowValueError, WorkflowHistoryId, WorkflowInstanceId, WorkflowStep,
    WorkflowStepId,
};
use crate::directory::domain::UserId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Transition recorded by a history row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    /// Instance started.
    Start,
    /// Step approved and the instance advanced.
    Approve,
    /// Instance rejected.
    Reject,
    /// Step handed to another user.
    Transfer,
    /// Instance cancelled.
    Cancel,
    /// Last step approved and the instance completed.
    Complete,
}

impl HistoryAction {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Transfer => "transfer",
            Self::Cancel => "cancel",
            Self::Complete => "complete",
        }
    }
}

impl TryFrom<&str> for HistoryAction {
    type Error = ParseWorkflowValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "start" => Ok(Self::Start),
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "transfer" => Ok(Self::Transfer),
            "cancel" => Ok(Self::Cancel),
            "complete" => Ok(Self::Complete),
            _ => Err(ParseWorkflowValueError::new("history action", value)),
        }
    }
}

/// Details of one transition, captured before the row is stamped.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    step_id: WorkflowStepId,
    step_name: String,
    operator_id: UserId,
    action: HistoryAction,
    comment: String,
    form_data: JsonObject,
    transfer_to: Option<UserId>,
    started_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Describes `action` taken on `step`, timed from `started_at`.
    ///
    /// The step name is copied so later renames do not rewrite history.
    #[must_use]
    pub fn new(
        step: &WorkflowStep,
        operator_id: UserId,
        action: HistoryAction,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            step_id: step.id(),
            step_name: step.name().to_owned(),
            operator_id,
            action,
            comment: String::new(),
            form_data: JsonObject::new(),
            transfer_to: None,
            started_at,
        }
    }

    /// Sets the operator comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Sets the form-data snapshot.
    #[must_use]
    pub fn with_form_data(mut self, form_data: JsonObject) -> Self {
        self.form_data = form_data;
        self
    }

    /// Sets the transfer target.
    #[must_use]
    pub const fn with_transfer_to(mut self, target: Option<UserId>) -> Self {
        self.transfer_to = target;
        self
    }
}

/// Immutable record of one instance transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowHistory {
    id: WorkflowHistoryId,
    instance_id: WorkflowInstanceId,
    step_id: WorkflowStepId,
    step_name: String,
    operator_id: UserId,
    action: HistoryAction,
    comment: String,
    form_data: JsonObject,
    transfer_to: Option<UserId>,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_minutes: i64,
}

/// Parameter object for reconstructing a persisted history row.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedHistoryData {
    /// Persisted identifier.
    pub id: WorkflowHistoryId,
    /// Persisted instance.
    pub instance_id: WorkflowInstanceId,
    /// Persisted step.
    pub step_id: WorkflowStepId,
    /// Persisted step-name snapshot.
    pub step_name: String,
    /// Persisted operator.
    pub operator_id: UserId,
    /// Persisted action.
    pub action: HistoryAction,
    /// Persisted comment.
    pub comment: String,
    /// Persisted form-data snapshot.
    pub form_data: JsonObject,
    /// Persisted transfer target.
    pub transfer_to: Option<UserId>,
    /// Persisted start time.
    pub start_time: DateTime<Utc>,
    /// Persisted end time.
    pub end_time: DateTime<Utc>,
    /// Persisted duration in minutes.
    pub duration_minutes: i64,
}

impl WorkflowHistory {
    /// Stamps `entry` with the current time as its end.
    #[must_use]
    pub fn record(
        instance_id: WorkflowInstanceId,
        entry: HistoryEntry,
        clock: &impl Clock,
    ) -> Self {
        let end_time = clock.utc();
        let duration_minutes = (end_time - entry.started_at).num_minutes().max(0);
        Self {
            id: WorkflowHistoryId::new(),
            instance_id,
            step_id: entry.step_id,
            step_name: entry.step_name,
            operator_id: entry.operator_id,
            action: entry.action,
            comment: entry.comment,
            form_data: entry.form_data,
            transfer_to: entry.transfer_to,
            start_time: entry.started_at,
            end_time,
            duration_minutes,
        }
    }

    /// Reconstructs a history row from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedHistoryData) -> Self {
        Self {
            id: data.id,
            instance_id: data.instance_id,
            step_id: data.step_id,
            step_name: data.step_name,
            operator_id: data.operator_id,
            action: data.action,
            comment: data.comment,
            form_data: data.form_data,
            transfer_to: data.transfer_to,
            start_time: data.start_time,
            end_time: data.end_time,
            duration_minutes: data.duration_minutes,
        }
    }

    /// Returns the row identifier.
    #[must_use]
    pub const fn id(&self) -> WorkflowHistoryId {
        self.id
    }

    /// Returns the instance this row belongs to.
    #[must_use]
    pub const fn instance_id(&self) -> WorkflowInstanceId {
        self.instance_id
    }

    /// Returns the step acted on.
    #[must_use]
    pub const fn step_id(&self) -> WorkflowStepId {
        self.step_id
    }

    /// Returns the step name as it was when the action was taken.
    #[must_use]
    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// Returns the operator.
    #[must_use]
    pub const fn operator_id(&self) -> UserId {
        self.operator_id
    }

    /// Returns the recorded action.
    #[must_use]
    pub const fn action(&self) -> HistoryAction {
        self.action
    }

    /// Returns the operator comment.
    #[must_use]
    pub fn comment(&self) -> &str {
        &self.comment
    }

    /// Returns the form-data snapshot.
    #[must_use]
    pub const fn form_data(&self) -> &JsonObject {
        &self.form_data
    }

    /// Returns the transfer target for transfer rows.
    #[must_use]
    pub const fn transfer_to(&self) -> Option<UserId> {
        self.transfer_to
    }

    /// Returns when the step was entered.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Returns when the action was committed.
    #[must_use]
    pub const fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    /// Returns the time spent on the step in whole minutes.
    #[must_use]
    pub const fn duration_minutes(&self) -> i64 {
        self.duration_minutes
    }
}
