//! Workflow step entity and its assignee-resolution policy.

use super::{
    JsonObject, ParseWorkflowValueError, WorkflowDefinitionId, WorkflowDomainError,
    WorkflowStepId, text::{non_blank, require_text},
};
use crate::directory::domain::Role;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// How the handler of a step is resolved by the authorization layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssigneeMode {
    /// Resolved automatically by an external collaborator.
    #[default]
    Auto,
    /// Picked by a person when the step is reached.
    Manual,
    /// Any holder of the step's target role.
    Role,
}

impl AssigneeMode {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Manual => "manual",
            Self::Role => "role",
        }
    }
}

impl TryFrom<&str> for AssigneeMode {
    type Error = ParseWorkflowValueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "auto" => Ok(Self::Auto),
            "manual" => Ok(Self::Manual),
            "role" => Ok(Self::Role),
            _ => Err(ParseWorkflowValueError::new("assignee mode", value)),
        }
    }
}

/// Input describing a new step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSpec {
    name: String,
    description: String,
    step_type: String,
    assignee_mode: AssigneeMode,
    assignee_role: Option<Role>,
    duration_hours: u32,
    skip_on_timeout: bool,
    form_config: JsonObject,
    conditions: JsonObject,
    actions: JsonObject,
}

impl StepSpec {
    /// Creates a step description with the given name and type tag.
    #[must_use]
    pub fn new(name: impl Into<String>, step_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            step_type: step_type.into(),
            assignee_mode: AssigneeMode::Auto,
            assignee_role: None,
            duration_hours: 0,
            skip_on_timeout: false,
            form_config: JsonObject::new(),
            conditions: JsonObject::new(),
            actions: JsonObject::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the assignee mode and, for [`AssigneeMode::Role`], its role.
    #[must_use]
    pub const fn with_assignee(mut self, mode: AssigneeMode, role: Option<Role>) -> Self {
        self.assignee_mode = mode;
        self.assignee_role = role;
        self
    }

    /// Sets the expected duration and timeout policy.
    #[must_use]
    pub const fn with_duration(mut self, hours: u32, skip_on_timeout: bool) -> Self {
        self.duration_hours = hours;
        self.skip_on_timeout = skip_on_timeout;
        self
    }

    /// Sets the opaque form configuration.
    #[must_use]
    pub fn with_form_config(mut self, form_config: JsonObject) -> Self {
        self.form_config = form_config;
        self
    }

    /// Sets the opaque transition conditions.
    #[must_use]
    pub fn with_conditions(mut self, conditions: JsonObject) -> Self {
        self.conditions = conditions;
        self
    }

    /// Sets the opaque available actions.
    #[must_use]
    pub fn with_actions(mut self, actions: JsonObject) -> Self {
        self.actions = actions;
        self
    }
}

/// Partial update of a step.
///
/// `None` and blank strings leave the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepChanges {
    /// Replacement name.
    pub name: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Replacement type tag.
    pub step_type: Option<String>,
    /// Replacement assignee mode.
    pub assignee_mode: Option<AssigneeMode>,
    /// Replacement target role.
    pub assignee_role: Option<Role>,
    /// Replacement expected duration.
    pub duration_hours: Option<u32>,
    /// Replacement timeout policy.
    pub skip_on_timeout: Option<bool>,
    /// Replacement form configuration.
    pub form_config: Option<JsonObject>,
    /// Replacement conditions.
    pub conditions: Option<JsonObject>,
    /// Replacement actions.
    pub actions: Option<JsonObject>,
}

/// One stage of a workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    id: WorkflowStepId,
    definition_id: WorkflowDefinitionId,
    name: String,
    description: String,
    order: i32,
    step_type: String,
    assignee_mode: AssigneeMode,
    assignee_role: Option<Role>,
    duration_hours: u32,
    skip_on_timeout: bool,
    form_config: JsonObject,
    conditions: JsonObject,
    actions: JsonObject,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted step.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedStepData {
    /// Persisted identifier.
    pub id: WorkflowStepId,
    /// Owning definition.
    pub definition_id: WorkflowDefinitionId,
    /// Persisted name.
    pub name: String,
    /// Persisted description.
    pub description: String,
    /// Persisted order index.
    pub order: i32,
    /// Persisted type tag.
    pub step_type: String,
    /// Persisted assignee mode.
    pub assignee_mode: AssigneeMode,
    /// Persisted target role.
    pub assignee_role: Option<Role>,
    /// Persisted expected duration in hours.
    pub duration_hours: u32,
    /// Persisted timeout policy.
    pub skip_on_timeout: bool,
    /// Persisted form configuration.
    pub form_config: JsonObject,
    /// Persisted conditions.
    pub conditions: JsonObject,
    /// Persisted actions.
    pub actions: JsonObject,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl WorkflowStep {
    /// Creates a step at `order` within `definition_id`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::EmptyField`] for a blank name or type
    /// and [`WorkflowDomainError::MissingAssigneeRole`] when role assignment
    /// has no target role.
    pub fn new(
        definition_id: WorkflowDefinitionId,
        order: i32,
        spec: StepSpec,
        clock: &impl Clock,
    ) -> Result<Self, WorkflowDomainError> {
        ensure_role_target(spec.assignee_mode, spec.assignee_role)?;
        let timestamp = clock.utc();
        Ok(Self {
            id: WorkflowStepId::new(),
            definition_id,
            name: require_text("step name", spec.name)?,
            description: spec.description.trim().to_owned(),
            order,
            step_type: require_text("step type", spec.step_type)?,
            assignee_mode: spec.assignee_mode,
            assignee_role: spec.assignee_role,
            duration_hours: spec.duration_hours,
            skip_on_timeout: spec.skip_on_timeout,
            form_config: spec.form_config,
            conditions: spec.conditions,
            actions: spec.actions,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a step from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedStepData) -> Self {
        Self {
            id: data.id,
            definition_id: data.definition_id,
            name: data.name,
            description: data.description,
            order: data.order,
            step_type: data.step_type,
            assignee_mode: data.assignee_mode,
            assignee_role: data.assignee_role,
            duration_hours: data.duration_hours,
            skip_on_timeout: data.skip_on_timeout,
            form_config: data.form_config,
            conditions: data.conditions,
            actions: data.actions,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the step identifier.
    #[must_use]
    pub const fn id(&self) -> WorkflowStepId {
        self.id
    }

    /// Returns the owning definition.
    #[must_use]
    pub const fn definition_id(&self) -> WorkflowDefinitionId {
        self.definition_id
    }

    /// Returns the step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the order index within the definition.
    #[must_use]
    pub const fn order(&self) -> i32 {
        self.order
    }

    /// Returns the type tag.
    #[must_use]
    pub fn step_type(&self) -> &str {
        &self.step_type
    }

    /// Returns the assignee mode.
    #[must_use]
    pub const fn assignee_mode(&self) -> AssigneeMode {
        self.assignee_mode
    }

    /// Returns the target role for role-resolved steps.
    #[must_use]
    pub const fn assignee_role(&self) -> Option<Role> {
        self.assignee_role
    }

    /// Returns the expected duration in hours.
    #[must_use]
    pub const fn duration_hours(&self) -> u32 {
        self.duration_hours
    }

    /// Returns whether the step is skipped when it times out.
    #[must_use]
    pub const fn skip_on_timeout(&self) -> bool {
        self.skip_on_timeout
    }

    /// Returns the opaque form configuration.
    #[must_use]
    pub const fn form_config(&self) -> &JsonObject {
        &self.form_config
    }

    /// Returns the opaque transition conditions.
    #[must_use]
    pub const fn conditions(&self) -> &JsonObject {
        &self.conditions
    }

    /// Returns the opaque available actions.
    #[must_use]
    pub const fn actions(&self) -> &JsonObject {
        &self.actions
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

    /// Moves the step to a new order index.
    pub fn set_order(&mut self, order: i32, clock: &impl Clock) {
        self.order = order;
        self.updated_at = clock.utc();
    }

    /// Applies a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::MissingAssigneeRole`] when the result
    /// would be a role-resolved step without a role. The step is unchanged
    /// on error.
    pub fn apply(
        &mut self,
        changes: StepChanges,
        clock: &impl Clock,
    ) -> Result<(), WorkflowDomainError> {
        let mode = changes.assignee_mode.unwrap_or(self.assignee_mode);
        let role = changes.assignee_role.or(self.assignee_role);
        ensure_role_target(mode, role)?;

        if let Some(name) = non_blank(changes.name) {
            self.name = name;
        }
        if let Some(description) = non_blank(changes.description) {
            self.description = description;
        }
        if let Some(step_type) = non_blank(changes.step_type) {
            self.step_type = step_type;
        }
        self.assignee_mode = mode;
        self.assignee_role = role;
        if let Some(hours) = changes.duration_hours {
            self.duration_hours = hours;
        }
        if let Some(skip) = changes.skip_on_timeout {
            self.skip_on_timeout = skip;
        }
        if let Some(form_config) = changes.form_config {
            self.form_config = form_config;
        }
        if let Some(conditions) = changes.conditions {
            self.conditions = conditions;
        }
        if let Some(actions) = changes.actions {
            self.actions = actions;
        }
        self.updated_at = clock.utc();
        Ok(())
    }
}

const fn ensure_role_target(
    mode: AssigneeMode,
    role: Option<Role>,
) -> Result<(), WorkflowDomainError> {
    if matches!(mode, AssigneeMode::Role) && role.is_none() {
        return Err(WorkflowDomainError::MissingAssigneeRole);
    }
    Ok(())
}
