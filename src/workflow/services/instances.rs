//! Instance execution: start, approve/reject/transfer, cancel and reads.

use super::engine::{WorkflowService, WorkflowServiceError, WorkflowServiceResult};
use crate::directory::domain::UserId;
use crate::paging::{Page, PageRequest};
use crate::workflow::{
    domain::{
        BusinessId, Decision, HistoryAction, HistoryEntry, InstanceStatus, JsonObject,
        NewInstance, WorkflowDefinitionId, WorkflowDomainError, WorkflowHistory,
        WorkflowInstance, WorkflowInstanceId, WorkflowStep, WorkflowStepId,
    },
    ports::{InstanceFilter, WorkflowRepository},
};
use mockable::Clock;
use tracing::{debug, info};

const START_COMMENT: &str = "workflow started";

/// Request payload for starting an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct StartInstanceRequest {
    definition_id: WorkflowDefinitionId,
    business_id: BusinessId,
    business_type: String,
    title: String,
    starter_id: UserId,
    form_data: JsonObject,
}

impl StartInstanceRequest {
    /// Creates a request with the required fields.
    #[must_use]
    pub fn new(
        definition_id: WorkflowDefinitionId,
        business_id: BusinessId,
        business_type: impl Into<String>,
        title: impl Into<String>,
        starter_id: UserId,
    ) -> Self {
        Self {
            definition_id,
            business_id,
            business_type: business_type.into(),
            title: title.into(),
            starter_id,
            form_data: JsonObject::new(),
        }
    }

    /// Sets the initial form data recorded on the start history row.
    #[must_use]
    pub fn with_form_data(mut self, form_data: JsonObject) -> Self {
        self.form_data = form_data;
        self
    }
}

/// Request payload for acting on the current step of an instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ApproveRequest {
    instance_id: WorkflowInstanceId,
    operator_id: UserId,
    decision: Decision,
    comment: String,
    form_data: JsonObject,
    next_step: Option<WorkflowStepId>,
    transfer_to: Option<UserId>,
}

impl ApproveRequest {
    /// Creates a request for `decision` on the instance's current step.
    #[must_use]
    pub fn new(instance_id: WorkflowInstanceId, operator_id: UserId, decision: Decision) -> Self {
        Self {
            instance_id,
            operator_id,
            decision,
            comment: String::new(),
            form_data: JsonObject::new(),
            next_step: None,
            transfer_to: None,
        }
    }

    /// Sets the operator comment.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// Sets the form-data snapshot.
    #[must_use]
    pub fn with_form_data(mut self, form_data: JsonObject) -> Self {
        self.form_data = form_data;
        self
    }

    /// Names the step to advance to instead of the next by order.
    #[must_use]
    pub const fn with_next_step(mut self, step_id: WorkflowStepId) -> Self {
        self.next_step = Some(step_id);
        self
    }

    /// Names the user receiving a transfer.
    #[must_use]
    pub const fn with_transfer_to(mut self, user_id: UserId) -> Self {
        self.transfer_to = Some(user_id);
        self
    }
}

impl<R, C> WorkflowService<R, C>
where
    R: WorkflowRepository,
    C: Clock + Send + Sync,
{
    /// Starts an instance on the lowest-ordered step of an active
    /// definition and records a `start` history row.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::DefinitionNotFound`] when absent and
    /// [`WorkflowServiceError::Domain`] with
    /// [`WorkflowDomainError::NotActive`] or [`WorkflowDomainError::NoSteps`]
    /// when the definition cannot be started. Nothing is stored on error.
    pub async fn start_instance(
        &self,
        request: StartInstanceRequest,
    ) -> WorkflowServiceResult<WorkflowInstance> {
        let definition = self.require_definition(request.definition_id).await?;
        definition.ensure_active()?;
        let steps = self.repository.list_steps(definition.id()).await?;
        let first_step = steps
            .first()
            .ok_or(WorkflowDomainError::NoSteps(definition.id()))?;

        let instance = WorkflowInstance::start(
            &definition,
            first_step,
            NewInstance {
                business_id: request.business_id,
                business_type: request.business_type,
                title: request.title,
                starter_id: request.starter_id,
            },
            &*self.clock,
        )?;
        let entry = HistoryEntry::new(
            first_step,
            request.starter_id,
            HistoryAction::Start,
            instance.start_time(),
        )
        .with_comment(START_COMMENT)
        .with_form_data(request.form_data);
        let history = WorkflowHistory::record(instance.id(), entry, &*self.clock);

        self.repository.start_instance(&instance, &history).await?;
        info!(
            instance_id = %instance.id(),
            definition_id = %definition.id(),
            step = first_step.name(),
            "workflow instance started"
        );
        Ok(instance)
    }

    /// Applies an approve, reject or transfer decision to the current step
    /// and records one history row.
    ///
    /// Approving advances to the explicit next step when given, otherwise to
    /// the step with the next greater order index, and completes the
    /// instance when there is none.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::InstanceNotFound`] or
    /// [`WorkflowServiceError::StepNotFound`] for missing records,
    /// [`WorkflowServiceError::Domain`] for a terminal instance, a foreign
    /// next step or a transfer without target, and
    /// [`WorkflowServiceError::Repository`] on a concurrent modification.
    pub async fn approve(
        &self,
        request: ApproveRequest,
    ) -> WorkflowServiceResult<WorkflowInstance> {
        let mut instance = self.require_instance(request.instance_id).await?;
        let current = self.require_step(instance.running_step()?).await?;
        let entered_at = instance.step_entered_at();

        let action = match request.decision {
            Decision::Approve => {
                match self
                    .resolve_next_step(&instance, &current, request.next_step)
                    .await?
                {
                    Some(next) => {
                        instance.advance_to(next.id(), &*self.clock)?;
                        HistoryAction::Approve
                    }
                    None => {
                        instance.complete(&*self.clock)?;
                        HistoryAction::Complete
                    }
                }
            }
            Decision::Reject => {
                instance.reject(&*self.clock)?;
                HistoryAction::Reject
            }
            Decision::Transfer => {
                if request.transfer_to.is_none() {
                    return Err(WorkflowDomainError::MissingTransferTarget.into());
                }
                instance.record_transfer(&*self.clock)?;
                HistoryAction::Transfer
            }
        };

        let transfer_to = match action {
            HistoryAction::Transfer => request.transfer_to,
            _ => None,
        };
        let entry = HistoryEntry::new(&current, request.operator_id, action, entered_at)
            .with_comment(request.comment)
            .with_form_data(request.form_data)
            .with_transfer_to(transfer_to);
        let history = WorkflowHistory::record(instance.id(), entry, &*self.clock);

        self.repository
            .record_transition(&instance, &history)
            .await?;
        info!(
            instance_id = %instance.id(),
            action = action.as_str(),
            status = instance.status().as_str(),
            "workflow instance advanced"
        );
        Ok(instance)
    }

    /// Cancels a running instance and records a `cancel` history row on
    /// its current step.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::InstanceNotFound`] when absent and
    /// [`WorkflowServiceError::Domain`] when it is already terminal.
    pub async fn cancel_instance(
        &self,
        instance_id: WorkflowInstanceId,
        operator_id: UserId,
        reason: &str,
    ) -> WorkflowServiceResult<WorkflowInstance> {
        let mut instance = self.require_instance(instance_id).await?;
        let current = self.require_step(instance.running_step()?).await?;
        let entered_at = instance.step_entered_at();
        instance.cancel(&*self.clock)?;

        let entry = HistoryEntry::new(&current, operator_id, HistoryAction::Cancel, entered_at)
            .with_comment(reason);
        let history = WorkflowHistory::record(instance.id(), entry, &*self.clock);
        self.repository
            .record_transition(&instance, &history)
            .await?;
        info!(instance_id = %instance_id, "workflow instance cancelled");
        Ok(instance)
    }

    /// Returns an instance.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::InstanceNotFound`] when absent.
    pub async fn instance(
        &self,
        instance_id: WorkflowInstanceId,
    ) -> WorkflowServiceResult<WorkflowInstance> {
        self.require_instance(instance_id).await
    }

    /// Returns the full history of an instance in recording order.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::InstanceNotFound`] when absent.
    pub async fn instance_history(
        &self,
        instance_id: WorkflowInstanceId,
    ) -> WorkflowServiceResult<Vec<WorkflowHistory>> {
        self.require_instance(instance_id).await?;
        let rows = self.repository.history(instance_id).await?;
        debug!(instance_id = %instance_id, rows = rows.len(), "loaded workflow history");
        Ok(rows)
    }

    /// Lists instances matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::Repository`] when the lookup fails.
    pub async fn list_instances(
        &self,
        filter: &InstanceFilter,
        page: PageRequest,
    ) -> WorkflowServiceResult<Page<WorkflowInstance>> {
        Ok(self.repository.list_instances(filter, page).await?)
    }

    /// Lists the instances awaiting action, which is every running
    /// instance. Narrowing to those `user_id` may act on is left to the
    /// authorization layer.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::Repository`] when the lookup fails.
    pub async fn my_instances(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> WorkflowServiceResult<Page<WorkflowInstance>> {
        let filter = InstanceFilter {
            status: Some(InstanceStatus::Running),
            ..InstanceFilter::default()
        };
        debug!(user_id = %user_id, "listing running workflow instances");
        Ok(self.repository.list_instances(&filter, page).await?)
    }

    /// Returns every instance bound to a business object, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowServiceError::Repository`] when the lookup fails.
    pub async fn instances_for_business(
        &self,
        business_id: BusinessId,
    ) -> WorkflowServiceResult<Vec<WorkflowInstance>> {
        Ok(self.repository.instances_for_business(business_id).await?)
    }

    async fn resolve_next_step(
        &self,
        instance: &WorkflowInstance,
        current: &WorkflowStep,
        explicit: Option<WorkflowStepId>,
    ) -> WorkflowServiceResult<Option<WorkflowStep>> {
        if let Some(step_id) = explicit {
            let step = self.require_step(step_id).await?;
            if step.definition_id() != instance.definition_id() {
                return Err(WorkflowServiceError::Domain(
                    WorkflowDomainError::StepNotInDefinition {
                        step: step_id,
                        definition: instance.definition_id(),
                    },
                ));
            }
            return Ok(Some(step));
        }
        let steps = self.repository.list_steps(instance.definition_id()).await?;
        Ok(steps
            .into_iter()
            .find(|step| step.order() > current.order()))
    }
}
