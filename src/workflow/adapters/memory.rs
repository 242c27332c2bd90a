//! In-memory workflow repository for tests and local runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::paging::{Page, PageRequest};
use crate::workflow::{
    domain::{
        BusinessId, DefinitionStatus, WorkflowDefinition, WorkflowDefinitionId, WorkflowHistory,
        WorkflowInstance, WorkflowInstanceId, WorkflowStep, WorkflowStepId,
    },
    ports::{
        DefinitionFilter, InstanceFilter, WorkflowRepository, WorkflowRepositoryError,
        WorkflowRepositoryResult,
    },
};

/// Thread-safe in-memory workflow repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWorkflowRepository {
    state: Arc<RwLock<InMemoryWorkflowState>>,
}

#[derive(Debug, Default)]
struct InMemoryWorkflowState {
    definitions: Vec<WorkflowDefinition>,
    steps: HashMap<WorkflowStepId, WorkflowStep>,
    instances: Vec<WorkflowInstance>,
    history: Vec<WorkflowHistory>,
}

impl InMemoryWorkflowRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> WorkflowRepositoryError {
    WorkflowRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

impl InMemoryWorkflowState {
    fn live_definition(&self, id: WorkflowDefinitionId) -> Option<&WorkflowDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.id() == id && !definition.is_deleted())
    }

    fn replace_definition(
        &mut self,
        definition: &WorkflowDefinition,
    ) -> WorkflowRepositoryResult<()> {
        let slot = self
            .definitions
            .iter_mut()
            .find(|stored| stored.id() == definition.id() && !stored.is_deleted())
            .ok_or(WorkflowRepositoryError::DefinitionNotFound(definition.id()))?;
        *slot = definition.clone();
        Ok(())
    }

    fn ensure_step(&self, id: WorkflowStepId) -> WorkflowRepositoryResult<()> {
        if self.steps.contains_key(&id) {
            Ok(())
        } else {
            Err(WorkflowRepositoryError::StepNotFound(id))
        }
    }

    fn ensure_definition(&self, id: WorkflowDefinitionId) -> WorkflowRepositoryResult<()> {
        self.live_definition(id)
            .map(|_| ())
            .ok_or(WorkflowRepositoryError::DefinitionNotFound(id))
    }
}

fn matches_definition(definition: &WorkflowDefinition, filter: &DefinitionFilter) -> bool {
    let status_matches = filter
        .status
        .is_none_or(|status| definition.status() == status);
    let type_matches = filter
        .workflow_type
        .as_deref()
        .is_none_or(|workflow_type| definition.workflow_type() == workflow_type);
    let keyword_matches = filter.keyword.as_deref().is_none_or(|keyword| {
        let needle = keyword.to_lowercase();
        definition.name().to_lowercase().contains(&needle)
            || definition.code().to_lowercase().contains(&needle)
    });
    status_matches && type_matches && keyword_matches
}

fn matches_instance(instance: &WorkflowInstance, filter: &InstanceFilter) -> bool {
    filter.status.is_none_or(|status| instance.status() == status)
        && filter
            .definition_id
            .is_none_or(|id| instance.definition_id() == id)
        && filter
            .starter_id
            .is_none_or(|starter| instance.starter_id() == starter)
        && filter
            .business_type
            .as_deref()
            .is_none_or(|business_type| instance.business_type() == business_type)
        && filter
            .current_step_id
            .is_none_or(|step_id| instance.current_step_id() == Some(step_id))
}

#[async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn store_definition(
        &self,
        definition: &WorkflowDefinition,
    ) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let code_taken = state
            .definitions
            .iter()
            .any(|stored| !stored.is_deleted() && stored.code() == definition.code());
        if code_taken {
            return Err(WorkflowRepositoryError::DuplicateCode(
                definition.code().to_owned(),
            ));
        }
        state.definitions.push(definition.clone());
        Ok(())
    }

    async fn update_definition(
        &self,
        definition: &WorkflowDefinition,
    ) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.replace_definition(definition)
    }

    async fn find_definition(
        &self,
        id: WorkflowDefinitionId,
    ) -> WorkflowRepositoryResult<Option<WorkflowDefinition>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.live_definition(id).cloned())
    }

    async fn find_definition_by_code(
        &self,
        code: &str,
    ) -> WorkflowRepositoryResult<Option<WorkflowDefinition>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .definitions
            .iter()
            .find(|definition| !definition.is_deleted() && definition.code() == code)
            .cloned())
    }

    async fn find_default_definition(
        &self,
        workflow_type: &str,
    ) -> WorkflowRepositoryResult<Option<WorkflowDefinition>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .definitions
            .iter()
            .rev()
            .find(|definition| {
                !definition.is_deleted()
                    && definition.is_default()
                    && definition.status() == DefinitionStatus::Active
                    && definition.workflow_type() == workflow_type
            })
            .cloned())
    }

    async fn list_definitions(
        &self,
        filter: &DefinitionFilter,
        page: PageRequest,
    ) -> WorkflowRepositoryResult<Page<WorkflowDefinition>> {
        let state = self.state.read().map_err(poisoned)?;
        let matching = state
            .definitions
            .iter()
            .rev()
            .filter(|definition| {
                !definition.is_deleted() && matches_definition(definition, filter)
            })
            .cloned()
            .collect();
        Ok(Page::from_sorted(matching, page))
    }

    async fn list_steps(
        &self,
        definition_id: WorkflowDefinitionId,
    ) -> WorkflowRepositoryResult<Vec<WorkflowStep>> {
        let state = self.state.read().map_err(poisoned)?;
        let mut steps: Vec<WorkflowStep> = state
            .steps
            .values()
            .filter(|step| step.definition_id() == definition_id)
            .cloned()
            .collect();
        steps.sort_by_key(|step| (step.order(), step.created_at()));
        Ok(steps)
    }

    async fn find_step(
        &self,
        id: WorkflowStepId,
    ) -> WorkflowRepositoryResult<Option<WorkflowStep>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.steps.get(&id).cloned())
    }

    async fn insert_step(
        &self,
        definition: &WorkflowDefinition,
        step: &WorkflowStep,
    ) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.replace_definition(definition)?;
        state.steps.insert(step.id(), step.clone());
        Ok(())
    }

    async fn save_step(
        &self,
        definition: &WorkflowDefinition,
        step: &WorkflowStep,
    ) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.ensure_step(step.id())?;
        state.replace_definition(definition)?;
        state.steps.insert(step.id(), step.clone());
        Ok(())
    }

    async fn remove_step(
        &self,
        definition: &WorkflowDefinition,
        step_id: WorkflowStepId,
    ) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.ensure_step(step_id)?;
        state.replace_definition(definition)?;
        state.steps.remove(&step_id);
        Ok(())
    }

    async fn reorder_steps(
        &self,
        definition: &WorkflowDefinition,
        steps: &[WorkflowStep],
    ) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.ensure_definition(definition.id())?;
        for step in steps {
            state.ensure_step(step.id())?;
        }
        state.replace_definition(definition)?;
        for step in steps {
            state.steps.insert(step.id(), step.clone());
        }
        Ok(())
    }

    async fn start_instance(
        &self,
        instance: &WorkflowInstance,
        history: &WorkflowHistory,
    ) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.instances.push(instance.clone());
        state.history.push(history.clone());
        Ok(())
    }

    async fn record_transition(
        &self,
        instance: &WorkflowInstance,
        history: &WorkflowHistory,
    ) -> WorkflowRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let stored = state
            .instances
            .iter_mut()
            .find(|stored| stored.id() == instance.id())
            .ok_or(WorkflowRepositoryError::InstanceNotFound(instance.id()))?;
        if stored.revision().checked_add(1) != Some(instance.revision()) {
            return Err(WorkflowRepositoryError::RevisionConflict(instance.id()));
        }
        *stored = instance.clone();
        state.history.push(history.clone());
        Ok(())
    }

    async fn find_instance(
        &self,
        id: WorkflowInstanceId,
    ) -> WorkflowRepositoryResult<Option<WorkflowInstance>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .instances
            .iter()
            .find(|instance| instance.id() == id)
            .cloned())
    }

    async fn list_instances(
        &self,
        filter: &InstanceFilter,
        page: PageRequest,
    ) -> WorkflowRepositoryResult<Page<WorkflowInstance>> {
        let state = self.state.read().map_err(poisoned)?;
        let matching = state
            .instances
            .iter()
            .rev()
            .filter(|instance| matches_instance(instance, filter))
            .cloned()
            .collect();
        Ok(Page::from_sorted(matching, page))
    }

    async fn instances_for_business(
        &self,
        business_id: BusinessId,
    ) -> WorkflowRepositoryResult<Vec<WorkflowInstance>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .instances
            .iter()
            .rev()
            .filter(|instance| instance.business_id() == business_id)
            .cloned()
            .collect())
    }

    async fn history(
        &self,
        instance_id: WorkflowInstanceId,
    ) -> WorkflowRepositoryResult<Vec<WorkflowHistory>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .history
            .iter()
            .filter(|row| row.instance_id() == instance_id)
            .cloned()
            .collect())
    }
}
