//! Port contracts for workflow persistence.

pub mod repository;

pub use repository::{
    DefinitionFilter, InstanceFilter, WorkflowRepository, WorkflowRepositoryError,
    WorkflowRepositoryResult,
};
