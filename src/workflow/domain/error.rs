//! Error types for workflow domain validation and state transitions.

use super::{WorkflowDefinitionId, WorkflowInstanceId, WorkflowStepId};
use thiserror::Error;

/// Errors returned by workflow domain operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkflowDomainError {
    /// A required text field is empty after trimming.
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    /// A role-resolved step was configured without a target role.
    #[error("role assignment requires a target role")]
    MissingAssigneeRole,

    /// The definition must be active before instances can start.
    #[error("workflow definition {0} is not active")]
    NotActive(WorkflowDefinitionId),

    /// The definition has no steps to start from.
    #[error("workflow definition {0} has no steps")]
    NoSteps(WorkflowDefinitionId),

    /// The instance has already reached a terminal status.
    #[error("workflow instance {0} is no longer running")]
    AlreadyTerminal(WorkflowInstanceId),

    /// A transfer was requested without naming who receives it.
    #[error("transfer requires a target user")]
    MissingTransferTarget,

    /// A step named by the caller belongs to another definition.
    #[error("step {step} does not belong to workflow definition {definition}")]
    StepNotInDefinition {
        /// Offending step.
        step: WorkflowStepId,
        /// Definition the caller operated on.
        definition: WorkflowDefinitionId,
    },

    /// A step appears more than once in a reorder request.
    #[error("step {0} is listed more than once")]
    DuplicateStep(WorkflowStepId),

    /// A running instance is waiting on the step.
    #[error("step {0} is the current step of a running instance")]
    StepInUse(WorkflowStepId),
}

/// Error returned while parsing workflow enumerations from persistence or
/// requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind}: {value}")]
pub struct ParseWorkflowValueError {
    /// Name of the enumeration being parsed.
    pub kind: &'static str,
    /// Rejected input.
    pub value: String,
}

impl ParseWorkflowValueError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}
