//! Domain model for approval workflows.
//!
//! Step configuration (`form_config`, `conditions`, `actions`) and form
//! snapshots are carried as opaque JSON objects and never interpreted here.

mod definition;
mod error;
mod history;
mod ids;
mod instance;
mod step;
mod text;

pub use definition::{
    DefinitionChanges, DefinitionStatus, NewDefinition, PersistedDefinitionData,
    WorkflowDefinition,
};
pub use error::{ParseWorkflowValueError, WorkflowDomainError};
pub use history::{HistoryAction, HistoryEntry, PersistedHistoryData, WorkflowHistory};
pub use ids::{
    BusinessId, WorkflowDefinitionId, WorkflowHistoryId, WorkflowInstanceId, WorkflowStepId,
};
pub use instance::{
    Decision, InstanceStatus, NewInstance, PersistedInstanceData, WorkflowInstance,
};
pub use step::{AssigneeMode, PersistedStepData, StepChanges, StepSpec, WorkflowStep};

/// Uninterpreted JSON object stored and returned verbatim.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;
