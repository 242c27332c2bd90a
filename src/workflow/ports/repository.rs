//! Repository port for workflow definitions, steps, instances and history.

use crate::directory::domain::UserId;
use crate::paging::{Page, PageRequest};
use crate::workflow::domain::{
    BusinessId, DefinitionStatus, InstanceStatus, WorkflowDefinition, WorkflowDefinitionId,
    WorkflowHistory, WorkflowInstance, WorkflowInstanceId, WorkflowStep, WorkflowStepId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for workflow repository operations.
pub type WorkflowRepositoryResult<T> = Result<T, WorkflowRepositoryError>;

/// Criteria for listing definitions. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DefinitionFilter {
    /// Only definitions in this status.
    pub status: Option<DefinitionStatus>,
    /// Only definitions with this type tag.
    pub workflow_type: Option<String>,
    /// Case-insensitive substring of the name or code.
    pub keyword: Option<String>,
}

/// Criteria for listing instances. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceFilter {
    /// Only instances in this status.
    pub status: Option<InstanceStatus>,
    /// Only instances of this definition.
    pub definition_id: Option<WorkflowDefinitionId>,
    /// Only instances started by this user.
    pub starter_id: Option<UserId>,
    /// Only instances bound to this business type.
    pub business_type: Option<String>,
    /// Only instances whose current step is this one.
    pub current_step_id: Option<WorkflowStepId>,
}

/// Workflow persistence contract.
///
/// Soft-deleted definitions are invisible to every lookup. Methods that take
/// a definition alongside a step change persist both in one transaction.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// Stores a new definition.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::DuplicateCode`] when a live
    /// definition already uses the code.
    async fn store_definition(
        &self,
        definition: &WorkflowDefinition,
    ) -> WorkflowRepositoryResult<()>;

    /// Persists metadata, version and soft-delete changes of a definition.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::DefinitionNotFound`] when the
    /// definition does not exist.
    async fn update_definition(
        &self,
        definition: &WorkflowDefinition,
    ) -> WorkflowRepositoryResult<()>;

    /// Finds a live definition by identifier.
    async fn find_definition(
        &self,
        id: WorkflowDefinitionId,
    ) -> WorkflowRepositoryResult<Option<WorkflowDefinition>>;

    /// Finds a live definition by its unique code.
    async fn find_definition_by_code(
        &self,
        code: &str,
    ) -> WorkflowRepositoryResult<Option<WorkflowDefinition>>;

    /// Finds the active default definition for a type tag.
    async fn find_default_definition(
        &self,
        workflow_type: &str,
    ) -> WorkflowRepositoryResult<Option<WorkflowDefinition>>;

    /// Lists live definitions, newest first.
    async fn list_definitions(
        &self,
        filter: &DefinitionFilter,
        page: PageRequest,
    ) -> WorkflowRepositoryResult<Page<WorkflowDefinition>>;

    /// Returns the steps of a definition ordered by order index.
    async fn list_steps(
        &self,
        definition_id: WorkflowDefinitionId,
    ) -> WorkflowRepositoryResult<Vec<WorkflowStep>>;

    /// Finds a step by identifier.
    async fn find_step(
        &self,
        id: WorkflowStepId,
    ) -> WorkflowRepositoryResult<Option<WorkflowStep>>;

    /// Inserts a step and saves its definition's new version.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::DefinitionNotFound`] when the
    /// definition does not exist.
    async fn insert_step(
        &self,
        definition: &WorkflowDefinition,
        step: &WorkflowStep,
    ) -> WorkflowRepositoryResult<()>;

    /// Saves a changed step and its definition's new version.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::StepNotFound`] or
    /// [`WorkflowRepositoryError::DefinitionNotFound`] for missing records.
    async fn save_step(
        &self,
        definition: &WorkflowDefinition,
        step: &WorkflowStep,
    ) -> WorkflowRepositoryResult<()>;

    /// Removes a step and saves its definition's new version.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::StepNotFound`] or
    /// [`WorkflowRepositoryError::DefinitionNotFound`] for missing records.
    async fn remove_step(
        &self,
        definition: &WorkflowDefinition,
        step_id: WorkflowStepId,
    ) -> WorkflowRepositoryResult<()>;

    /// Saves the order index of every given step and the definition's new
    /// version. Either all writes apply or none do.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::StepNotFound`] when any step is
    /// missing, leaving every stored order unchanged.
    async fn reorder_steps(
        &self,
        definition: &WorkflowDefinition,
        steps: &[WorkflowStep],
    ) -> WorkflowRepositoryResult<()>;

    /// Stores a new instance together with its start history row.
    async fn start_instance(
        &self,
        instance: &WorkflowInstance,
        history: &WorkflowHistory,
    ) -> WorkflowRepositoryResult<()>;

    /// Saves a transitioned instance together with its history row.
    ///
    /// The stored revision must be exactly one less than the instance's.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowRepositoryError::RevisionConflict`] when another
    /// writer advanced the instance first, and
    /// [`WorkflowRepositoryError::InstanceNotFound`] when it does not exist.
    async fn record_transition(
        &self,
        instance: &WorkflowInstance,
        history: &WorkflowHistory,
    ) -> WorkflowRepositoryResult<()>;

    /// Finds an instance by identifier.
    async fn find_instance(
        &self,
        id: WorkflowInstanceId,
    ) -> WorkflowRepositoryResult<Option<WorkflowInstance>>;

    /// Lists instances, newest first.
    async fn list_instances(
        &self,
        filter: &InstanceFilter,
        page: PageRequest,
    ) -> WorkflowRepositoryResult<Page<WorkflowInstance>>;

    /// Returns every instance bound to a business object, newest first.
    async fn instances_for_business(
        &self,
        business_id: BusinessId,
    ) -> WorkflowRepositoryResult<Vec<WorkflowInstance>>;

    /// Returns the history of an instance in the order it was recorded.
    async fn history(
        &self,
        instance_id: WorkflowInstanceId,
    ) -> WorkflowRepositoryResult<Vec<WorkflowHistory>>;
}

/// Errors returned by workflow repository implementations.
#[derive(Debug, Clone, Error)]
pub enum WorkflowRepositoryError {
    /// A live definition already uses the code.
    #[error("duplicate workflow code: {0}")]
    DuplicateCode(String),

    /// The definition was not found.
    #[error("workflow definition not found: {0}")]
    DefinitionNotFound(WorkflowDefinitionId),

    /// The step was not found.
    #[error("workflow step not found: {0}")]
    StepNotFound(WorkflowStepId),

    /// The instance was not found.
    #[error("workflow instance not found: {0}")]
    InstanceNotFound(WorkflowInstanceId),

    /// Another writer changed the instance since it was read.
    #[error("workflow instance {0} was modified concurrently")]
    RevisionConflict(WorkflowInstanceId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorkflowRepositoryError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
