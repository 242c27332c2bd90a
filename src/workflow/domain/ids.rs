//! Identifier types for the workflow domain.

use crate::ids::uuid_id;

uuid_id!(
    /// Unique identifier of a workflow definition.
    WorkflowDefinitionId
);

uuid_id!(
    /// Unique identifier of a step within a definition.
    WorkflowStepId
);

uuid_id!(
    /// Unique identifier of a running or terminated workflow instance.
    WorkflowInstanceId
);

uuid_id!(
    /// Unique identifier of a history row.
    WorkflowHistoryId
);

uuid_id!(
    /// Identifier of the business object (case, record) an instance is bound to.
    BusinessId
);
