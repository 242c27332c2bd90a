//! Workflow definition aggregate.

use super::{
    ParseWorkflowValueError, WorkflowDefinitionId, WorkflowDomainError,
    text::{non_blank, require_text},
};
use crate::directory::domain::UserId;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a workflow definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionStatus {
    /// Being authored; instances cannot start.
    Draft,
    /// Published; instances may start.
    Active,
    /// Retired; instances cannot start.
    Inactive,
}

impl DefinitionStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

impl TryFrom<&str> for DefinitionStatus {
    type Error = ParseWorkflowValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            _ => Err(ParseWorkflowValueError::new("definition status", value)),
        }
    }
}

/// Input for creating a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDefinition {
    /// Display name.
    pub name: String,
    /// Globally unique code such as `CV-01`.
    pub code: String,
    /// Free-form type tag used to pick default definitions.
    pub workflow_type: String,
    /// Optional long description.
    pub description: String,
    /// User creating the definition.
    pub creator_id: UserId,
}

/// Partial update of definition metadata.
///
/// Empty strings and `None` leave the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionChanges {
    /// Replacement name.
    pub name: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement type tag.
    pub workflow_type: Option<String>,
    /// Replacement status.
    pub status: Option<DefinitionStatus>,
    /// Replacement default flag.
    pub is_default: Option<bool>,
}

/// Workflow definition aggregate root.
///
/// Steps are stored separately and addressed by definition identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    id: WorkflowDefinitionId,
    name: String,
    code: String,
    workflow_type: String,
    description: String,
    status: DefinitionStatus,
    version: u32,
    is_default: bool,
    creator_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

/// Parameter object for reconstructing a persisted definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedDefinitionData {
    /// Persisted identifier.
    pub id: WorkflowDefinitionId,
    /// Persisted name.
    pub name: String,
    /// Persisted unique code.
    pub code: String,
    /// Persisted type tag.
    pub workflow_type: String,
    /// Persisted description.
    pub description: String,
    /// Persisted status.
    pub status: DefinitionStatus,
    /// Persisted version counter.
    pub version: u32,
    /// Persisted default flag.
    pub is_default: bool,
    /// Persisted creator.
    pub creator_id: UserId,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl WorkflowDefinition {
    /// Creates a draft definition at version 1.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyField`] when the name, code or
    /// type is blank.
    pub fn new(input: NewDefinition, clock: &impl Clock) -> Result<Self, WorkflowDomainError> {
        let timestamp = clock.utc();
        Ok(Self {
            id: WorkflowDefinitionId::new(),
            name: require_text("name", input.name)?,
            code: require_text("code", input.code)?,
            workflow_type: require_text("type", input.workflow_type)?,
            description: input.description.trim().to_owned(),
            status: DefinitionStatus::Draft,
            version: 1,
            is_default: false,
            creator_id: input.creator_id,
            created_at: timestamp,
            updated_at: timestamp,
            deleted_at: None,
        })
    }

    /// Reconstructs a definition from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedDefinitionData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            code: data.code,
            workflow_type: data.workflow_type,
            description: data.description,
            status: data.status,
            version: data.version,
            is_default: data.is_default,
            creator_id: data.creator_id,
            created_at: data.created_at,
            updated_at: data.updated_at,
            deleted_at: data.deleted_at,
        }
    }

    /// Returns the definition identifier.
    #[must_use]
    pub const fn id(&self) -> WorkflowDefinitionId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the unique code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the type tag.
    #[must_use]
    pub fn workflow_type(&self) -> &str {
        &self.workflow_type
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> DefinitionStatus {
        self.status
    }

    /// Returns the structural version counter.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns whether this is the default definition for its type.
    #[must_use]
    pub const fn is_default(&self) -> bool {
        self.is_default
    }

    /// Returns the creator.
    #[must_use]
    pub const fn creator_id(&self) -> UserId {
        self.creator_id
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

    /// Returns the soft-delete timestamp, if deleted.
    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns whether the definition has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Ensures instances may be started from this definition.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::NotActive`] unless the status is
    /// [`DefinitionStatus::Active`].
    pub fn ensure_active(&self) -> Result<(), WorkflowDomainError> {
        if self.status == DefinitionStatus::Active {
            Ok(())
        } else {
            Err(WorkflowDomainError::NotActive(self.id))
        }
    }

    /// Records a structural step edit by incrementing the version.
    pub fn bump_version(&mut self, clock: &impl Clock) {
        self.version = self.version.saturating_add(1);
        self.touch(clock);
    }

    /// Applies a metadata update. Blank strings are ignored.
    pub fn apply(&mut self, changes: DefinitionChanges, clock: &impl Clock) {
        if let Some(name) = non_blank(changes.name) {
            self.name = name;
        }
        if let Some(description) = non_blank(changes.description) {
            self.description = description;
        }
        if let Some(workflow_type) = non_blank(changes.workflow_type) {
            self.workflow_type = workflow_type;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(is_default) = changes.is_default {
            self.is_default = is_default;
        }
        self.touch(clock);
    }

    /// Marks the definition as deleted.
    pub fn mark_deleted(&mut self, clock: &impl Clock) {
        let timestamp = clock.utc();
        self.deleted_at = Some(timestamp);
        self.updated_at = timestamp;
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
