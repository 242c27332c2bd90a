//! Application services for workflow authoring and execution.

mod definitions;
mod engine;
mod instances;

pub use definitions::{CreateDefinitionRequest, DefinitionDetail};
pub use engine::{WorkflowService, WorkflowServiceError, WorkflowServiceResult};
pub use instances::{ApproveRequest, StartInstanceRequest};
