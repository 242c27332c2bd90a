//! Definition authoring: metadata, steps and ordering.

use super::engine::{WorkflowService, WorkflowServiceError, WorkflowServiceResult};
use crate::directory::domain::UserId;
use crate::paging::{Page, PageRequest};
use crate::workflow::{
    domain::{
        DefinitionChanges, InstanceStatus, NewDefinition, StepChanges, StepSpec,
        WorkflowDefinition, WorkflowDefinitionId, WorkflowDomainError, WorkflowStep,
        WorkflowStepId,
    },
    ports::{DefinitionFilter, InstanceFilter, WorkflowRepository, WorkflowRepositoryError},
};
use mockable::Clock;
use std::collections::HashSet;
use tracing::{debug, info};

/// Request payload for creating a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDefinitionRequest {
    name: String,
    code: String,
    workflow_type: String,
    description: String,
    creator_id: UserId,
}

impl CreateDefinitionRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        code: impl Into<String>,
        workflow_type: impl Into<String>,
        creator_id: UserId,
    ) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            workflow_type: workflow_type.into(),
            description: String::new(),
            creator_id,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A definition together with its steps in order.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionDetail {
    /// Definition metadata.
    pub definition: WorkflowDefinition,
    /// Steps ordered by order index.
    pub steps: Vec<WorkflowStep>,
}

impl<R, C> WorkflowService<R, C>
where
    R: WorkflowRepository,
    C: Clock + Send + Sync,
{
    /// Creates a draft definition at version 1.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::DuplicateCode`] when a live definition
    /// already uses the code and [`WorkflowServiceError::Domain`] for blank
    /// fields.
    pub async fn create_definition(
        &self,
        request: CreateDefinitionRequest,
    ) -> WorkflowServiceResult<WorkflowDefinition> {
        let definition = WorkflowDefinition::new(
            NewDefinition {
                name: request.name,
                code: request.code,
                workflow_type: request.workflow_type,
                description: request.description,
                creator_id: request.creator_id,
            },
            &*self.clock,
        )?;

        if self
            .repository
            .find_definition_by_code(definition.code())
            .await?
            .is_some()
        {
            return Err(WorkflowServiceError::DuplicateCode(
                definition.code().to_owned(),
            ));
        }

        self.repository
            .store_definition(&definition)
            .await
            .map_err(|err| match err {
                WorkflowRepositoryError::DuplicateCode(code) => {
                    WorkflowServiceError::DuplicateCode(code)
                }
                other => WorkflowServiceError::Repository(other),
            })?;
        info!(
            definition_id = %definition.id(),
            code = definition.code(),
            "workflow definition created"
        );
        Ok(definition)
    }

    /// Returns a definition with its ordered steps.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::DefinitionNotFound`] when absent.
    pub async fn definition(
        &self,
        id: WorkflowDefinitionId,
    ) -> WorkflowServiceResult<DefinitionDetail> {
        let definition = self.require_definition(id).await?;
        let steps = self.repository.list_steps(id).await?;
        debug!(definition_id = %id, steps = steps.len(), "loaded workflow definition");
        Ok(DefinitionDetail { definition, steps })
    }

    /// Lists live definitions matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::Repository`] when the lookup fails.
    pub async fn list_definitions(
        &self,
        filter: &DefinitionFilter,
        page: PageRequest,
    ) -> WorkflowServiceResult<Page<WorkflowDefinition>> {
        Ok(self.repository.list_definitions(filter, page).await?)
    }

    /// Returns the active default definition for a type tag, if any.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::Repository`] when the lookup fails.
    pub async fn default_definition(
        &self,
        workflow_type: &str,
    ) -> WorkflowServiceResult<Option<WorkflowDefinition>> {
        Ok(self
            .repository
            .find_default_definition(workflow_type)
            .await?)
    }

    /// Updates definition metadata. Blank fields are left unchanged.
    ///
    /// Status changes are allowed at any time; existing instances keep
    /// running against the definition they started from.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::DefinitionNotFound`] when absent.
    pub async fn update_definition(
        &self,
        id: WorkflowDefinitionId,
        changes: DefinitionChanges,
    ) -> WorkflowServiceResult<WorkflowDefinition> {
        let mut definition = self.require_definition(id).await?;
        definition.apply(changes, &*self.clock);
        self.repository.update_definition(&definition).await?;
        info!(
            definition_id = %id,
            status = definition.status().as_str(),
            "workflow definition updated"
        );
        Ok(definition)
    }

    /// Soft-deletes a definition. Its steps stay readable so running
    /// instances can still record history against them.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::DefinitionNotFound`] when absent.
    pub async fn delete_definition(&self, id: WorkflowDefinitionId) -> WorkflowServiceResult<()> {
        let mut definition = self.require_definition(id).await?;
        definition.mark_deleted(&*self.clock);
        self.repository.update_definition(&definition).await?;
        info!(definition_id = %id, "workflow definition deleted");
        Ok(())
    }

    /// Appends a step after the current highest order index and bumps the
    /// definition version.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::DefinitionNotFound`] when absent and
    /// [`WorkflowServiceError::Domain`] for an invalid step description.
    pub async fn add_step(
        &self,
        definition_id: WorkflowDefinitionId,
        spec: StepSpec,
    ) -> WorkflowServiceResult<WorkflowStep> {
        let mut definition = self.require_definition(definition_id).await?;
        let existing = self.repository.list_steps(definition_id).await?;
        let next_order = existing
            .iter()
            .map(WorkflowStep::order)
            .max()
            .unwrap_or(0)
            .saturating_add(1);

        let step = WorkflowStep::new(definition_id, next_order, spec, &*self.clock)?;
        definition.bump_version(&*self.clock);
        self.repository.insert_step(&definition, &step).await?;
        info!(
            definition_id = %definition_id,
            step_id = %step.id(),
            order = next_order,
            version = definition.version(),
            "workflow step added"
        );
        Ok(step)
    }

    /// Applies a partial update to a step and bumps the definition version.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::StepNotFound`] when absent and
    /// [`WorkflowServiceError::Domain`] for an invalid result.
    pub async fn update_step(
        &self,
        step_id: WorkflowStepId,
        changes: StepChanges,
    ) -> WorkflowServiceResult<WorkflowStep> {
        let mut step = self.require_step(step_id).await?;
        let mut definition = self.require_definition(step.definition_id()).await?;
        step.apply(changes, &*self.clock)?;
        definition.bump_version(&*self.clock);
        self.repository.save_step(&definition, &step).await?;
        info!(step_id = %step_id, version = definition.version(), "workflow step updated");
        Ok(step)
    }

    /// Removes a step and bumps the definition version. Remaining order
    /// indices are not compacted. A step that a running instance is waiting
    /// on cannot be removed.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::StepNotFound`] when absent and
    /// [`WorkflowServiceError::Domain`] while a running instance is on it.
    pub async fn delete_step(&self, step_id: WorkflowStepId) -> WorkflowServiceResult<()> {
        let step = self.require_step(step_id).await?;
        let waiting = InstanceFilter {
            status: Some(InstanceStatus::Running),
            current_step_id: Some(step_id),
            ..InstanceFilter::default()
        };
        let holders = self
            .repository
            .list_instances(&waiting, PageRequest::new(1, 1))
            .await?;
        if holders.total > 0 {
            return Err(WorkflowDomainError::StepInUse(step_id).into());
        }
        let mut definition = self.require_definition(step.definition_id()).await?;
        definition.bump_version(&*self.clock);
        self.repository.remove_step(&definition, step_id).await?;
        info!(step_id = %step_id, version = definition.version(), "workflow step deleted");
        Ok(())
    }

    /// Rewrites the order index of each listed step to its one-based
    /// position in `ordered`, atomically, and bumps the definition version.
    ///
    /// Steps not listed keep their previous order index.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::DefinitionNotFound`] when absent,
    /// [`WorkflowServiceError::StepNotFound`] for unknown steps, and
    /// [`WorkflowServiceError::Domain`] when a step belongs to another
    /// definition or is listed twice. Nothing is written on error.
    pub async fn reorder_steps(
        &self,
        definition_id: WorkflowDefinitionId,
        ordered: &[WorkflowStepId],
    ) -> WorkflowServiceResult<Vec<WorkflowStep>> {
        let mut definition = self.require_definition(definition_id).await?;
        let current = self.repository.list_steps(definition_id).await?;

        let mut seen = HashSet::with_capacity(ordered.len());
        let mut reordered = Vec::with_capacity(ordered.len());
        for (position, step_id) in (1_i32..).zip(ordered.iter().copied()) {
            if !seen.insert(step_id) {
                return Err(WorkflowDomainError::DuplicateStep(step_id).into());
            }
            let Some(found) = current.iter().find(|step| step.id() == step_id) else {
                self.require_step(step_id).await?;
                return Err(WorkflowDomainError::StepNotInDefinition {
                    step: step_id,
                    definition: definition_id,
                }
                .into());
            };
            let mut step = found.clone();
            step.set_order(position, &*self.clock);
            reordered.push(step);
        }

        definition.bump_version(&*self.clock);
        self.repository
            .reorder_steps(&definition, &reordered)
            .await?;
        info!(
            definition_id = %definition_id,
            steps = reordered.len(),
            version = definition.version(),
            "workflow steps reordered"
        );
        Ok(reordered)
    }
}
