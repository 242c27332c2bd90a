//! Workflow instance aggregate and its transition state machine.

use super::{
    BusinessId, ParseWorkflowValueError, WorkflowDefinition, WorkflowDefinitionId,
    WorkflowDomainError, WorkflowInstanceId, WorkflowStep, WorkflowStepId,
    text::require_text,
};
use crate::directory::domain::UserId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Execution status of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    /// Waiting on the current step.
    Running,
    /// Approved past the last step.
    Completed,
    /// Rejected at some step.
    Rejected,
    /// Withdrawn before completion.
    Cancelled,
}

impl InstanceStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns whether no further transition can leave this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl TryFrom<&str> for InstanceStatus {
    type Error = ParseWorkflowValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(ParseWorkflowValueError::new("instance status", value)),
        }
    }
}

/// Decision taken by an operator on the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Move to the next step, or complete after the last one.
    Approve,
    /// Terminate the instance as rejected.
    Reject,
    /// Hand the current step to another user.
    Transfer,
}

impl Decision {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Transfer => "transfer",
        }
    }
}

impl TryFrom<&str> for Decision {
    type Error = ParseWorkflowValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "approve" => Ok(Self::Approve),
            "reject" => Ok(Self::Reject),
            "transfer" => Ok(Self::Transfer),
            _ => Err(ParseWorkflowValueError::new("decision", value)),
        }
    }
}

/// Input for starting an instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInstance {
    /// Business object the instance is bound to.
    pub business_id: BusinessId,
    /// Free-form business type tag, for example `case`.
    pub business_type: String,
    /// Human-readable title.
    pub title: String,
    /// User starting the instance.
    pub starter_id: UserId,
}

/// One execution of a definition against a business object.
///
/// `current_step_id` is present exactly while the status is
/// [`InstanceStatus::Running`]. Every mutation increments `revision`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    id: WorkflowInstanceId,
    definition_id: WorkflowDefinitionId,
    business_id: BusinessId,
    business_type: String,
    title: String,
    status: InstanceStatus,
    current_step_id: Option<WorkflowStepId>,
    starter_id: UserId,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    step_entered_at: DateTime<Utc>,
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedInstanceData {
    /// Persisted identifier.
    pub id: WorkflowInstanceId,
    /// Persisted definition.
    pub definition_id: WorkflowDefinitionId,
    /// Persisted business object.
    pub business_id: BusinessId,
    /// Persisted business type tag.
    pub business_type: String,
    /// Persisted title.
    pub title: String,
    /// Persisted status.
    pub status: InstanceStatus,
    /// Persisted current step.
    pub current_step_id: Option<WorkflowStepId>,
    /// Persisted starter.
    pub starter_id: UserId,
    /// Persisted start time.
    pub start_time: DateTime<Utc>,
    /// Persisted end time.
    pub end_time: Option<DateTime<Utc>>,
    /// Persisted time the current step was entered.
    pub step_entered_at: DateTime<Utc>,
    /// Persisted revision.
    pub revision: u64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
    /// Starts a running instance positioned on `first_step`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::NotActive`] unless the definition is
    /// active, [`WorkflowDomainError::StepNotInDefinition`] when the step
    /// belongs elsewhere, and [`WorkflowDomainError::EmptyField`] for a blank
    /// title or business type.
    pub fn start(
        definition: &WorkflowDefinition,
        first_step: &WorkflowStep,
        input: NewInstance,
        clock: &impl Clock,
    ) -> Result<Self, WorkflowDomainError> {
        definition.ensure_active()?;
        if first_step.definition_id() != definition.id() {
            return Err(WorkflowDomainError::StepNotInDefinition {
                step: first_step.id(),
                definition: definition.id(),
            });
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: WorkflowInstanceId::new(),
            definition_id: definition.id(),
            business_id: input.business_id,
            business_type: require_text("business type", input.business_type)?,
            title: require_text("title", input.title)?,
            status: InstanceStatus::Running,
            current_step_id: Some(first_step.id()),
            starter_id: input.starter_id,
            start_time: timestamp,
            end_time: None,
            step_entered_at: timestamp,
            revision: 0,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs an instance from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedInstanceData) -> Self {
        Self {
            id: data.id,
            definition_id: data.definition_id,
            business_id: data.business_id,
            business_type: data.business_type,
            title: data.title,
            status: data.status,
            current_step_id: data.current_step_id,
            starter_id: data.starter_id,
            start_time: data.start_time,
            end_time: data.end_time,
            step_entered_at: data.step_entered_at,
            revision: data.revision,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the instance identifier.
    #[must_use]
    pub const fn id(&self) -> WorkflowInstanceId {
        self.id
    }

    /// Returns the definition being executed.
    #[must_use]
    pub const fn definition_id(&self) -> WorkflowDefinitionId {
        self.definition_id
    }

    /// Returns the bound business object.
    #[must_use]
    pub const fn business_id(&self) -> BusinessId {
        self.business_id
    }

    /// Returns the business type tag.
    #[must_use]
    pub fn business_type(&self) -> &str {
        &self.business_type
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the execution status.
    #[must_use]
    pub const fn status(&self) -> InstanceStatus {
        self.status
    }

    /// Returns the current step while running.
    #[must_use]
    pub const fn current_step_id(&self) -> Option<WorkflowStepId> {
        self.current_step_id
    }

    /// Returns the user who started the instance.
    #[must_use]
    pub const fn starter_id(&self) -> UserId {
        self.starter_id
    }

    /// Returns the start time.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Returns the end time once terminal.
    #[must_use]
    pub const fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Returns when the current step was entered.
    #[must_use]
    pub const fn step_entered_at(&self) -> DateTime<Utc> {
        self.step_entered_at
    }

    /// Returns the optimistic concurrency revision.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the current step, failing when the instance is terminal.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::AlreadyTerminal`] unless running.
    pub const fn running_step(&self) -> Result<WorkflowStepId, WorkflowDomainError> {
        match (self.status, self.current_step_id) {
            (InstanceStatus::Running, Some(step_id)) => Ok(step_id),
            _ => Err(WorkflowDomainError::AlreadyTerminal(self.id)),
        }
    }

    /// Moves to `next_step` and restarts the step timer.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::AlreadyTerminal`] unless running.
    pub fn advance_to(
        &mut self,
        next_step: WorkflowStepId,
        clock: &impl Clock,
    ) -> Result<(), WorkflowDomainError> {
        self.running_step()?;
        let timestamp = clock.utc();
        self.current_step_id = Some(next_step);
        self.step_entered_at = timestamp;
        self.touch(timestamp);
        Ok(())
    }

    /// Records a transfer of the current step; position is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::AlreadyTerminal`] unless running.
    pub fn record_transfer(&mut self, clock: &impl Clock) -> Result<(), WorkflowDomainError> {
        self.running_step()?;
        self.touch(clock.utc());
        Ok(())
    }

    /// Completes the instance after its last step.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::AlreadyTerminal`] unless running.
    pub fn complete(&mut self, clock: &impl Clock) -> Result<(), WorkflowDomainError> {
        self.finish(InstanceStatus::Completed, clock)
    }

    /// Rejects the instance.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::AlreadyTerminal`] unless running.
    pub fn reject(&mut self, clock: &impl Clock) -> Result<(), WorkflowDomainError> {
        self.finish(InstanceStatus::Rejected, clock)
    }

    /// Cancels the instance.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::AlreadyTerminal`] unless running.
    pub fn cancel(&mut self, clock: &impl Clock) -> Result<(), WorkflowDomainError> {
        self.finish(InstanceStatus::Cancelled, clock)
    }

    fn finish(
        &mut self,
        status: InstanceStatus,
        clock: &impl Clock,
    ) -> Result<(), WorkflowDomainError> {
        self.running_step()?;
        let timestamp = clock.utc();
        self.status = status;
        self.current_step_id = None;
        self.end_time = Some(timestamp);
        self.touch(timestamp);
        Ok(())
    }

    const fn touch(&mut self, timestamp: DateTime<Utc>) {
        self.updated_at = timestamp;
        self.revision = self.revision.saturating_add(1);
    }
}
