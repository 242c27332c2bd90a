//! Workflow service handle and its error type.

use crate::error::ErrorKind;
use crate::workflow::{
    domain::{
        WorkflowDefinition, WorkflowDefinitionId, WorkflowDomainError, WorkflowInstance,
        WorkflowInstanceId, WorkflowStep, WorkflowStepId,
    },
    ports::{WorkflowRepository, WorkflowRepositoryError},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;

/// Service-level errors for workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowServiceError {
    /// Domain validation or a state rule failed.
    #[error(transparent)]
    Domain(#[from] WorkflowDomainError),
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] WorkflowRepositoryError),
    /// The definition does not exist or was deleted.
    #[error("workflow definition not found: {0}")]
    DefinitionNotFound(WorkflowDefinitionId),
    /// The step does not exist.
    #[error("workflow step not found: {0}")]
    StepNotFound(WorkflowStepId),
    /// The instance does not exist.
    #[error("workflow instance not found: {0}")]
    InstanceNotFound(WorkflowInstanceId),
    /// A live definition already uses the code.
    #[error("workflow code already registered: {0}")]
    DuplicateCode(String),
}

impl WorkflowServiceError {
    /// Classifies the error for outer layers.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(err) => match err {
                WorkflowDomainError::NotActive(_)
                | WorkflowDomainError::NoSteps(_)
                | WorkflowDomainError::AlreadyTerminal(_)
                | WorkflowDomainError::StepInUse(_) => ErrorKind::InvalidState,
                WorkflowDomainError::EmptyField(_)
                | WorkflowDomainError::MissingAssigneeRole
                | WorkflowDomainError::MissingTransferTarget
                | WorkflowDomainError::StepNotInDefinition { .. }
                | WorkflowDomainError::DuplicateStep(_) => ErrorKind::InvalidInput,
            },
            Self::Repository(err) => match err {
                WorkflowRepositoryError::DefinitionNotFound(_)
                | WorkflowRepositoryError::StepNotFound(_)
                | WorkflowRepositoryError::InstanceNotFound(_) => ErrorKind::NotFound,
                WorkflowRepositoryError::DuplicateCode(_)
                | WorkflowRepositoryError::RevisionConflict(_) => ErrorKind::Conflict,
                WorkflowRepositoryError::Persistence(_) => ErrorKind::Internal,
            },
            Self::DefinitionNotFound(_) | Self::StepNotFound(_) | Self::InstanceNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::DuplicateCode(_) => ErrorKind::Conflict,
        }
    }
}

/// Result type for workflow service operations.
pub type WorkflowServiceResult<T> = Result<T, WorkflowServiceError>;

/// Workflow authoring and execution service.
#[derive(Clone)]
pub struct WorkflowService<R, C>
where
    R: WorkflowRepository,
    C: Clock + Send + Sync,
{
    pub(super) repository: Arc<R>,
    pub(super) clock: Arc<C>,
}

impl<R, C> WorkflowService<R, C>
where
    R: WorkflowRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new workflow service.
    #[must_use]
    pub const fn new(repository: Arc<R>, clock: Arc<C>) -> Self {
        Self { repository, clock }
    }

    pub(super) async fn require_definition(
        &self,
        id: WorkflowDefinitionId,
    ) -> WorkflowServiceResult<WorkflowDefinition> {
        self.repository
            .find_definition(id)
            .await?
            .ok_or(WorkflowServiceError::DefinitionNotFound(id))
    }

    pub(super) async fn require_step(
        &self,
        id: WorkflowStepId,
    ) -> WorkflowServiceResult<WorkflowStep> {
        self.repository
            .find_step(id)
            .await?
            .ok_or(WorkflowServiceError::StepNotFound(id))
    }

    pub(super) async fn require_instance(
        &self,
        id: WorkflowInstanceId,
    ) -> WorkflowServiceResult<WorkflowInstance> {
        self.repository
            .find_instance(id)
            .await?
            .ok_or(WorkflowServiceError::InstanceNotFound(id))
    }
}
