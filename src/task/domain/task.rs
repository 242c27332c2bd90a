//! Task aggregate root.

use super::{
    CaseId, Progress, TaskDomainError, TaskId, TaskNumber, TaskPriority, TaskStatus, TaskType,
};
use crate::directory::domain::{OrganizationId, UserId};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// East-west position.
    pub longitude: f64,
    /// North-south position.
    pub latitude: f64,
}

/// Where the work takes place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Short place name.
    pub name: String,
    /// Street address.
    pub address: String,
    /// Position, when known.
    pub coordinates: Option<Coordinates>,
}

/// Link from a task to a workflow definition and step index.
///
/// Stored and returned as-is; no task operation advances it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowLink {
    /// Linked workflow definition.
    pub workflow_id: Uuid,
    /// Step index within that definition.
    pub current_step: i32,
}

/// Three-way edit of an optional field: leave, replace or clear.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum FieldUpdate<T> {
    /// Leave the stored value alone.
    #[default]
    Keep,
    /// Replace the stored value.
    Set(T),
    /// Remove the stored value.
    Clear,
}

impl<T> FieldUpdate<T> {
    fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Set(value) => *slot = Some(value),
            Self::Clear => *slot = None,
        }
    }
}

/// Details supplied when creating a task.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: String,
    /// Kind of work.
    pub task_type: TaskType,
    /// Urgency.
    pub priority: TaskPriority,
    /// Linked case, if any.
    pub case_id: Option<CaseId>,
    /// Owning organization.
    pub org_id: OrganizationId,
    /// Due date, if any.
    pub deadline: Option<DateTime<Utc>>,
    /// Expected effort in hours.
    pub estimated_hours: u32,
    /// Where the work happens.
    pub location: Location,
    /// Instructions for the assignee.
    pub requirements: String,
    /// Materials to bring.
    pub materials: Vec<String>,
    /// Free-form notes.
    pub notes: String,
}

/// Partial edit of task details.
///
/// Blank strings and a zero estimate mean "unchanged"; optional fields are
/// cleared only through [`FieldUpdate::Clear`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New kind of work.
    pub task_type: Option<TaskType>,
    /// New urgency.
    pub priority: Option<TaskPriority>,
    /// Case link edit.
    pub case_id: FieldUpdate<CaseId>,
    /// Deadline edit.
    pub deadline: FieldUpdate<DateTime<Utc>>,
    /// New estimate in hours.
    pub estimated_hours: Option<u32>,
    /// New place name.
    pub location_name: Option<String>,
    /// New street address.
    pub address: Option<String>,
    /// Coordinates edit.
    pub coordinates: FieldUpdate<Coordinates>,
    /// New instructions.
    pub requirements: Option<String>,
    /// Replacement materials list.
    pub materials: Option<Vec<String>>,
    /// New notes.
    pub notes: Option<String>,
}

/// Outcome reported when a task is completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionReport {
    /// What the assignee observed.
    pub feedback: String,
    /// What came of it.
    pub result: String,
    /// Attachment references.
    pub attachments: Vec<String>,
    /// Effort actually spent; zero leaves the stored value.
    pub actual_hours: u32,
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    number: TaskNumber,
    title: String,
    description: String,
    task_type: TaskType,
    priority: TaskPriority,
    status: TaskStatus,
    case_id: Option<CaseId>,
    creator_id: UserId,
    assignee_id: Option<UserId>,
    org_id: OrganizationId,
    start_time: Option<DateTime<Utc>>,
    deadline: Option<DateTime<Utc>>,
    completed_time: Option<DateTime<Utc>>,
    estimated_hours: u32,
    actual_hours: u32,
    location: Location,
    requirements: String,
    materials: Vec<String>,
    notes: String,
    workflow: Option<WorkflowLink>,
    feedback: String,
    result: String,
    attachments: Vec<String>,
    progress: Progress,
    revision: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedTaskData {
    /// Persisted identifier.
    pub id: TaskId,
    /// Persisted number.
    pub number: TaskNumber,
    /// Persisted title.
    pub title: String,
    /// Persisted description.
    pub description: String,
    /// Persisted type.
    pub task_type: TaskType,
    /// Persisted priority.
    pub priority: TaskPriority,
    /// Persisted status.
    pub status: TaskStatus,
    /// Persisted case link.
    pub case_id: Option<CaseId>,
    /// Persisted creator.
    pub creator_id: UserId,
    /// Persisted assignee.
    pub assignee_id: Option<UserId>,
    /// Persisted organization.
    pub org_id: OrganizationId,
    /// Persisted start time.
    pub start_time: Option<DateTime<Utc>>,
    /// Persisted deadline.
    pub deadline: Option<DateTime<Utc>>,
    /// Persisted completion time.
    pub completed_time: Option<DateTime<Utc>>,
    /// Persisted estimate.
    pub estimated_hours: u32,
    /// Persisted actual effort.
    pub actual_hours: u32,
    /// Persisted location.
    pub location: Location,
    /// Persisted requirements.
    pub requirements: String,
    /// Persisted materials.
    pub materials: Vec<String>,
    /// Persisted notes.
    pub notes: String,
    /// Persisted workflow link.
    pub workflow: Option<WorkflowLink>,
    /// Persisted feedback.
    pub feedback: String,
    /// Persisted result.
    pub result: String,
    /// Persisted attachments.
    pub attachments: Vec<String>,
    /// Persisted progress.
    pub progress: Progress,
    /// Persisted revision.
    pub revision: u64,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a task. With an assignee it starts `assigned` and timed from
    /// now; without one it starts `pending` with no start time.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyField`] for a blank title.
    pub fn create(
        number: TaskNumber,
        creator_id: UserId,
        input: NewTask,
        assignee_id: Option<UserId>,
        clock: &impl Clock,
    ) -> Result<Self, TaskDomainError> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(TaskDomainError::EmptyField("title"));
        }
        let timestamp = clock.utc();
        let (status, start_time) = match assignee_id {
            Some(_) => (TaskStatus::Assigned, Some(timestamp)),
            None => (TaskStatus::Pending, None),
        };
        Ok(Self {
            id: TaskId::new(),
            number,
            title: title.to_owned(),
            description: input.description,
            task_type: input.task_type,
            priority: input.priority,
            status,
            case_id: input.case_id,
            creator_id,
            assignee_id,
            org_id: input.org_id,
            start_time,
            deadline: input.deadline,
            completed_time: None,
            estimated_hours: input.estimated_hours,
            actual_hours: 0,
            location: input.location,
            requirements: input.requirements,
            materials: input.materials,
            notes: input.notes,
            workflow: None,
            feedback: String::new(),
            result: String::new(),
            attachments: Vec::new(),
            progress: Progress::NONE,
            revision: 0,
            created_at: timestamp,
            updated_at: timestamp,
            deleted_at: None,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            number: data.number,
            title: data.title,
            description: data.description,
            task_type: data.task_type,
            priority: data.priority,
            status: data.status,
            case_id: data.case_id,
            creator_id: data.creator_id,
            assignee_id: data.assignee_id,
            org_id: data.org_id,
            start_time: data.start_time,
            deadline: data.deadline,
            completed_time: data.completed_time,
            estimated_hours: data.estimated_hours,
            actual_hours: data.actual_hours,
            location: data.location,
            requirements: data.requirements,
            materials: data.materials,
            notes: data.notes,
            workflow: data.workflow,
            feedback: data.feedback,
            result: data.result,
            attachments: data.attachments,
            progress: data.progress,
            revision: data.revision,
            created_at: data.created_at,
            updated_at: data.updated_at,
            deleted_at: data.deleted_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task number.
    #[must_use]
    pub const fn number(&self) -> &TaskNumber {
        &self.number
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the kind of work.
    #[must_use]
    pub const fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// Returns the urgency.
    #[must_use]
    pub const fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the linked case, if any.
    #[must_use]
    pub const fn case_id(&self) -> Option<CaseId> {
        self.case_id
    }

    /// Returns the creator.
    #[must_use]
    pub const fn creator_id(&self) -> UserId {
        self.creator_id
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub const fn assignee_id(&self) -> Option<UserId> {
        self.assignee_id
    }

    /// Returns the owning organization.
    #[must_use]
    pub const fn org_id(&self) -> OrganizationId {
        self.org_id
    }

    /// Returns when the current assignee received the task.
    #[must_use]
    pub const fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Returns the deadline, if any.
    #[must_use]
    pub const fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Returns when the task was completed.
    #[must_use]
    pub const fn completed_time(&self) -> Option<DateTime<Utc>> {
        self.completed_time
    }

    /// Returns the estimate in hours.
    #[must_use]
    pub const fn estimated_hours(&self) -> u32 {
        self.estimated_hours
    }

    /// Returns the effort reported on completion.
    #[must_use]
    pub const fn actual_hours(&self) -> u32 {
        self.actual_hours
    }

    /// Returns the location.
    #[must_use]
    pub const fn location(&self) -> &Location {
        &self.location
    }

    /// Returns the requirements text.
    #[must_use]
    pub fn requirements(&self) -> &str {
        &self.requirements
    }

    /// Returns the materials list.
    #[must_use]
    pub fn materials(&self) -> &[String] {
        &self.materials
    }

    /// Returns the notes.
    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Returns the workflow link, if any.
    #[must_use]
    pub const fn workflow(&self) -> Option<WorkflowLink> {
        self.workflow
    }

    /// Returns the completion feedback.
    #[must_use]
    pub fn feedback(&self) -> &str {
        &self.feedback
    }

    /// Returns the completion result or cancellation reason.
    #[must_use]
    pub fn result(&self) -> &str {
        &self.result
    }

    /// Returns the attachment references.
    #[must_use]
    pub fn attachments(&self) -> &[String] {
        &self.attachments
    }

    /// Returns the reported progress.
    #[must_use]
    pub const fn progress(&self) -> Progress {
        self.progress
    }

    /// Returns the concurrency revision.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest modification timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the soft-delete timestamp, if deleted.
    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Whether `now` is past the deadline of an open task.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_closed() && self.deadline.is_some_and(|deadline| now > deadline)
    }

    /// Applies a partial edit.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task is
    /// editable.
    pub fn edit(
        &mut self,
        changes: TaskChanges,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.require(self.status.can_edit(), "edit")?;
        replace_text(&mut self.title, changes.title);
        replace_text(&mut self.description, changes.description);
        replace_text(&mut self.location.name, changes.location_name);
        replace_text(&mut self.location.address, changes.address);
        replace_text(&mut self.requirements, changes.requirements);
        replace_text(&mut self.notes, changes.notes);
        if let Some(task_type) = changes.task_type {
            self.task_type = task_type;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if let Some(hours) = changes.estimated_hours.filter(|hours| *hours > 0) {
            self.estimated_hours = hours;
        }
        if let Some(materials) = changes.materials {
            self.materials = materials;
        }
        changes.case_id.apply_to(&mut self.case_id);
        changes.deadline.apply_to(&mut self.deadline);
        changes.coordinates.apply_to(&mut self.location.coordinates);
        self.touch(clock);
        Ok(())
    }

    /// Gives the task to `assignee_id` and starts its clock.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task is
    /// assignable.
    pub fn assign(
        &mut self,
        assignee_id: UserId,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.require(self.status.can_assign(), "assign")?;
        self.status = TaskStatus::Assigned;
        self.assignee_id = Some(assignee_id);
        self.start_time = Some(clock.utc());
        self.touch(clock);
        Ok(())
    }

    /// Returns an assigned task to the pending pool.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task is
    /// exactly `assigned`.
    pub fn unassign(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.require(self.status == TaskStatus::Assigned, "unassign")?;
        self.status = TaskStatus::Pending;
        self.assignee_id = None;
        self.start_time = None;
        self.touch(clock);
        Ok(())
    }

    /// Hands the task to another assignee without changing its status.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task is
    /// currently held by someone.
    pub fn transfer(&mut self, to: UserId, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.require(self.status.is_active_work(), "transfer")?;
        self.assignee_id = Some(to);
        self.touch(clock);
        Ok(())
    }

    /// Marks the task completed with the reported outcome.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] unless the task can be
    /// completed.
    pub fn complete(
        &mut self,
        report: CompletionReport,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        self.require(self.status.can_complete(), "complete")?;
        self.status = TaskStatus::Completed;
        self.progress = Progress::COMPLETE;
        self.completed_time = Some(clock.utc());
        self.feedback = report.feedback;
        self.result = report.result;
        self.attachments = report.attachments;
        if report.actual_hours > 0 {
            self.actual_hours = report.actual_hours;
        }
        self.touch(clock);
        Ok(())
    }

    /// Cancels the task, storing `reason` as its result.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::AlreadyCompleted`] for completed tasks.
    pub fn cancel(&mut self, reason: &str, clock: &impl Clock) -> Result<(), TaskDomainError> {
        if self.status == TaskStatus::Completed {
            return Err(TaskDomainError::AlreadyCompleted(self.id));
        }
        self.status = TaskStatus::Cancelled;
        reason.clone_into(&mut self.result);
        self.touch(clock);
        Ok(())
    }

    /// Records reported progress. Status is unchanged.
    pub fn set_progress(&mut self, progress: Progress, clock: &impl Clock) {
        self.progress = progress;
        self.touch(clock);
    }

    /// Soft-deletes the task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidTransition`] once work has been
    /// handed out.
    pub fn mark_deleted(&mut self, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.require(self.status.can_edit(), "delete")?;
        self.deleted_at = Some(clock.utc());
        self.touch(clock);
        Ok(())
    }

    const fn require(&self, allowed: bool, action: &'static str) -> Result<(), TaskDomainError> {
        if allowed {
            return Ok(());
        }
        Err(TaskDomainError::InvalidTransition {
            task: self.id,
            status: self.status,
            action,
        })
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
        self.revision = self.revision.saturating_add(1);
    }
}

fn replace_text(slot: &mut String, candidate: Option<String>) {
    if let Some(text) = candidate.filter(|text| !text.trim().is_empty()) {
        *slot = text;
    }
}
