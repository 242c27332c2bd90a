//! `PostgreSQL` repository implementation for workflow storage.

use super::{
    models::{DefinitionRow, HistoryRow, InstanceRow, NewHistoryRow, StepRow},
    schema::{workflow_histories, workflow_instances, workflow_steps, workflows},
};
use crate::directory::domain::{Role, UserId};
use crate::paging::{Page, PageRequest};
use crate::workflow::{
    domain::{
        AssigneeMode, BusinessId, DefinitionStatus, HistoryAction, InstanceStatus, JsonObject,
        PersistedDefinitionData, PersistedHistoryData, PersistedInstanceData, PersistedStepData,
        WorkflowDefinition, WorkflowDefinitionId, WorkflowHistory, WorkflowHistoryId,
        WorkflowInstance, WorkflowInstanceId, WorkflowStep, WorkflowStepId,
    },
    ports::{
        DefinitionFilter, InstanceFilter, WorkflowRepository, WorkflowRepositoryError,
        WorkflowRepositoryResult,
    },
};
use async_trait::async_trait;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use serde_json::Value;
use thiserror::Error;

/// `PostgreSQL` connection pool type used by workflow adapters.
pub type WorkflowPgPool = Pool<ConnectionManager<PgConnection>>;

const LIVE_CODE_INDEX: &str = "idx_workflows_code_live";

/// `PostgreSQL`-backed workflow repository.
#[derive(Debug, Clone)]
pub struct PostgresWorkflowRepository {
    pool: WorkflowPgPool,
}

impl PostgresWorkflowRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: WorkflowPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, operation: F) -> WorkflowRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> WorkflowRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(WorkflowRepositoryError::persistence)?;
            operation(&mut connection)
        })
        .await
        .map_err(WorkflowRepositoryError::persistence)?
    }
}

impl From<DieselError> for WorkflowRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[derive(Debug, Error)]
#[error("column {0} does not hold a JSON object")]
struct NotAnObject(&'static str);

#[async_trait]
impl WorkflowRepository for PostgresWorkflowRepository {
    async fn store_definition(
        &self,
        definition: &WorkflowDefinition,
    ) -> WorkflowRepositoryResult<()> {
        let code = definition.code().to_owned();
        let row = definition_to_row(definition)?;

        self.run_blocking(move |connection| {
            let existing = live_definitions()
                .filter(workflows::code.eq(code.clone()))
                .count()
                .get_result::<i64>(connection)?;
            if existing > 0 {
                return Err(WorkflowRepositoryError::DuplicateCode(code));
            }

            diesel::insert_into(workflows::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                        if is_live_code_violation(info.as_ref()) =>
                    {
                        WorkflowRepositoryError::DuplicateCode(code.clone())
                    }
                    _ => WorkflowRepositoryError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update_definition(
        &self,
        definition: &WorkflowDefinition,
    ) -> WorkflowRepositoryResult<()> {
        let row = definition_to_row(definition)?;
        self.run_blocking(move |connection| save_definition_row(connection, &row))
            .await
    }

    async fn find_definition(
        &self,
        id: WorkflowDefinitionId,
    ) -> WorkflowRepositoryResult<Option<WorkflowDefinition>> {
        self.run_blocking(move |connection| {
            let row = live_definitions()
                .filter(workflows::id.eq(id.into_inner()))
                .select(DefinitionRow::as_select())
                .first::<DefinitionRow>(connection)
                .optional()?;
            row.map(row_to_definition).transpose()
        })
        .await
    }

    async fn find_definition_by_code(
        &self,
        code: &str,
    ) -> WorkflowRepositoryResult<Option<WorkflowDefinition>> {
        let lookup_code = code.to_owned();
        self.run_blocking(move |connection| {
            let row = live_definitions()
                .filter(workflows::code.eq(lookup_code))
                .select(DefinitionRow::as_select())
                .first::<DefinitionRow>(connection)
                .optional()?;
            row.map(row_to_definition).transpose()
        })
        .await
    }

    async fn find_default_definition(
        &self,
        workflow_type: &str,
    ) -> WorkflowRepositoryResult<Option<WorkflowDefinition>> {
        let lookup_type = workflow_type.to_owned();
        self.run_blocking(move |connection| {
            let row = live_definitions()
                .filter(workflows::workflow_type.eq(lookup_type))
                .filter(workflows::is_default.eq(true))
                .filter(workflows::status.eq(DefinitionStatus::Active.as_str()))
                .order(workflows::created_at.desc())
                .select(DefinitionRow::as_select())
                .first::<DefinitionRow>(connection)
                .optional()?;
            row.map(row_to_definition).transpose()
        })
        .await
    }

    async fn list_definitions(
        &self,
        filter: &DefinitionFilter,
        page: PageRequest,
    ) -> WorkflowRepositoryResult<Page<WorkflowDefinition>> {
        let criteria = filter.clone();
        let (limit, offset) = page_bounds(page)?;
        self.run_blocking(move |connection| {
            let total = filtered_definitions(&criteria)
                .count()
                .get_result::<i64>(connection)?;
            let rows = filtered_definitions(&criteria)
                .order((workflows::created_at.desc(), workflows::id.desc()))
                .limit(limit)
                .offset(offset)
                .select(DefinitionRow::as_select())
                .load::<DefinitionRow>(connection)?;
            let items = rows
                .into_iter()
                .map(row_to_definition)
                .collect::<WorkflowRepositoryResult<Vec<_>>>()?;
            Ok(Page {
                items,
                total: count_to_total(total)?,
            })
        })
        .await
    }

    async fn list_steps(
        &self,
        definition_id: WorkflowDefinitionId,
    ) -> WorkflowRepositoryResult<Vec<WorkflowStep>> {
        self.run_blocking(move |connection| {
            let rows = workflow_steps::table
                .filter(workflow_steps::workflow_id.eq(definition_id.into_inner()))
                .order((
                    workflow_steps::step_order.asc(),
                    workflow_steps::created_at.asc(),
                ))
                .select(StepRow::as_select())
                .load::<StepRow>(connection)?;
            rows.into_iter().map(row_to_step).collect()
        })
        .await
    }

    async fn find_step(
        &self,
        id: WorkflowStepId,
    ) -> WorkflowRepositoryResult<Option<WorkflowStep>> {
        self.run_blocking(move |connection| {
            let row = workflow_steps::table
                .filter(workflow_steps::id.eq(id.into_inner()))
                .select(StepRow::as_select())
                .first::<StepRow>(connection)
                .optional()?;
            row.map(row_to_step).transpose()
        })
        .await
    }

    async fn insert_step(
        &self,
        definition: &WorkflowDefinition,
        step: &WorkflowStep,
    ) -> WorkflowRepositoryResult<()> {
        let definition_row = definition_to_row(definition)?;
        let step_row = step_to_row(step)?;
        self.run_blocking(move |connection| {
            connection.transaction::<_, WorkflowRepositoryError, _>(|tx| {
                save_definition_row(tx, &definition_row)?;
                diesel::insert_into(workflow_steps::table)
                    .values(&step_row)
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn save_step(
        &self,
        definition: &WorkflowDefinition,
        step: &WorkflowStep,
    ) -> WorkflowRepositoryResult<()> {
        let definition_row = definition_to_row(definition)?;
        let step_row = step_to_row(step)?;
        self.run_blocking(move |connection| {
            connection.transaction::<_, WorkflowRepositoryError, _>(|tx| {
                let updated = diesel::update(workflow_steps::table.find(step_row.id))
                    .set(&step_row)
                    .execute(tx)?;
                if updated == 0 {
                    return Err(WorkflowRepositoryError::StepNotFound(
                        WorkflowStepId::from_uuid(step_row.id),
                    ));
                }
                save_definition_row(tx, &definition_row)
            })
        })
        .await
    }

    async fn remove_step(
        &self,
        definition: &WorkflowDefinition,
        step_id: WorkflowStepId,
    ) -> WorkflowRepositoryResult<()> {
        let definition_row = definition_to_row(definition)?;
        self.run_blocking(move |connection| {
            connection.transaction::<_, WorkflowRepositoryError, _>(|tx| {
                let deleted =
                    diesel::delete(workflow_steps::table.find(step_id.into_inner())).execute(tx)?;
                if deleted == 0 {
                    return Err(WorkflowRepositoryError::StepNotFound(step_id));
                }
                save_definition_row(tx, &definition_row)
            })
        })
        .await
    }

    async fn reorder_steps(
        &self,
        definition: &WorkflowDefinition,
        steps: &[WorkflowStep],
    ) -> WorkflowRepositoryResult<()> {
        let definition_row = definition_to_row(definition)?;
        let orders: Vec<(uuid::Uuid, i32, chrono::DateTime<chrono::Utc>)> = steps
            .iter()
            .map(|step| (step.id().into_inner(), step.order(), step.updated_at()))
            .collect();
        self.run_blocking(move |connection| {
            connection.transaction::<_, WorkflowRepositoryError, _>(|tx| {
                save_definition_row(tx, &definition_row)?;
                for (step_id, order, updated_at) in &orders {
                    let updated = diesel::update(
                        workflow_steps::table
                            .filter(workflow_steps::id.eq(step_id))
                            .filter(workflow_steps::workflow_id.eq(definition_row.id)),
                    )
                    .set((
                        workflow_steps::step_order.eq(order),
                        workflow_steps::updated_at.eq(updated_at),
                    ))
                    .execute(tx)?;
                    if updated == 0 {
                        return Err(WorkflowRepositoryError::StepNotFound(
                            WorkflowStepId::from_uuid(*step_id),
                        ));
                    }
                }
                Ok(())
            })
        })
        .await
    }

    async fn start_instance(
        &self,
        instance: &WorkflowInstance,
        history: &WorkflowHistory,
    ) -> WorkflowRepositoryResult<()> {
        let instance_row = instance_to_row(instance)?;
        let history_row = history_to_row(history);
        self.run_blocking(move |connection| {
            connection.transaction::<_, WorkflowRepositoryError, _>(|tx| {
                diesel::insert_into(workflow_instances::table)
                    .values(&instance_row)
                    .execute(tx)?;
                diesel::insert_into(workflow_histories::table)
                    .values(&history_row)
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn record_transition(
        &self,
        instance: &WorkflowInstance,
        history: &WorkflowHistory,
    ) -> WorkflowRepositoryResult<()> {
        let instance_id = instance.id();
        let instance_row = instance_to_row(instance)?;
        let expected_revision = instance_row.revision.saturating_sub(1);
        let history_row = history_to_row(history);
        self.run_blocking(move |connection| {
            connection.transaction::<_, WorkflowRepositoryError, _>(|tx| {
                let updated = diesel::update(
                    workflow_instances::table
                        .filter(workflow_instances::id.eq(instance_row.id))
                        .filter(workflow_instances::revision.eq(expected_revision)),
                )
                .set(&instance_row)
                .execute(tx)?;
                if updated == 0 {
                    let exists = workflow_instances::table
                        .find(instance_row.id)
                        .count()
                        .get_result::<i64>(tx)?;
                    return Err(if exists == 0 {
                        WorkflowRepositoryError::InstanceNotFound(instance_id)
                    } else {
                        WorkflowRepositoryError::RevisionConflict(instance_id)
                    });
                }
                diesel::insert_into(workflow_histories::table)
                    .values(&history_row)
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn find_instance(
        &self,
        id: WorkflowInstanceId,
    ) -> WorkflowRepositoryResult<Option<WorkflowInstance>> {
        self.run_blocking(move |connection| {
            let row = workflow_instances::table
                .find(id.into_inner())
                .select(InstanceRow::as_select())
                .first::<InstanceRow>(connection)
                .optional()?;
            row.map(row_to_instance).transpose()
        })
        .await
    }

    async fn list_instances(
        &self,
        filter: &InstanceFilter,
        page: PageRequest,
    ) -> WorkflowRepositoryResult<Page<WorkflowInstance>> {
        let criteria = filter.clone();
        let (limit, offset) = page_bounds(page)?;
        self.run_blocking(move |connection| {
            let total = filtered_instances(&criteria)
                .count()
                .get_result::<i64>(connection)?;
            let rows = filtered_instances(&criteria)
                .order((
                    workflow_instances::created_at.desc(),
                    workflow_instances::id.desc(),
                ))
                .limit(limit)
                .offset(offset)
                .select(InstanceRow::as_select())
                .load::<InstanceRow>(connection)?;
            let items = rows
                .into_iter()
                .map(row_to_instance)
                .collect::<WorkflowRepositoryResult<Vec<_>>>()?;
            Ok(Page {
                items,
                total: count_to_total(total)?,
            })
        })
        .await
    }

    async fn instances_for_business(
        &self,
        business_id: BusinessId,
    ) -> WorkflowRepositoryResult<Vec<WorkflowInstance>> {
        self.run_blocking(move |connection| {
            let rows = workflow_instances::table
                .filter(workflow_instances::business_id.eq(business_id.into_inner()))
                .order(workflow_instances::created_at.desc())
                .select(InstanceRow::as_select())
                .load::<InstanceRow>(connection)?;
            rows.into_iter().map(row_to_instance).collect()
        })
        .await
    }

    async fn history(
        &self,
        instance_id: WorkflowInstanceId,
    ) -> WorkflowRepositoryResult<Vec<WorkflowHistory>> {
        self.run_blocking(move |connection| {
            let rows = workflow_histories::table
                .filter(workflow_histories::instance_id.eq(instance_id.into_inner()))
                .order(workflow_histories::seq.asc())
                .select(HistoryRow::as_select())
                .load::<HistoryRow>(connection)?;
            rows.into_iter().map(row_to_history).collect()
        })
        .await
    }
}

fn live_definitions() -> workflows::BoxedQuery<'static, Pg> {
    workflows::table
        .filter(workflows::deleted_at.is_null())
        .into_boxed()
}

fn filtered_definitions(filter: &DefinitionFilter) -> workflows::BoxedQuery<'static, Pg> {
    let mut query = live_definitions();
    if let Some(status) = filter.status {
        query = query.filter(workflows::status.eq(status.as_str()));
    }
    if let Some(workflow_type) = filter.workflow_type.clone() {
        query = query.filter(workflows::workflow_type.eq(workflow_type));
    }
    if let Some(keyword) = filter.keyword.as_deref() {
        let pattern = format!("%{}%", keyword.trim());
        query = query.filter(
            workflows::name
                .ilike(pattern.clone())
                .or(workflows::code.ilike(pattern)),
        );
    }
    query
}

fn filtered_instances(filter: &InstanceFilter) -> workflow_instances::BoxedQuery<'static, Pg> {
    let mut query = workflow_instances::table.into_boxed();
    if let Some(status) = filter.status {
        query = query.filter(workflow_instances::status.eq(status.as_str()));
    }
    if let Some(definition_id) = filter.definition_id {
        query = query.filter(workflow_instances::workflow_id.eq(definition_id.into_inner()));
    }
    if let Some(starter_id) = filter.starter_id {
        query = query.filter(workflow_instances::starter_id.eq(starter_id.into_inner()));
    }
    if let Some(business_type) = filter.business_type.clone() {
        query = query.filter(workflow_instances::business_type.eq(business_type));
    }
    if let Some(step_id) = filter.current_step_id {
        query = query.filter(workflow_instances::current_step_id.eq(step_id.into_inner()));
    }
    query
}

fn save_definition_row(
    connection: &mut PgConnection,
    row: &DefinitionRow,
) -> WorkflowRepositoryResult<()> {
    let updated = diesel::update(
        workflows::table
            .filter(workflows::id.eq(row.id))
            .filter(workflows::deleted_at.is_null()),
    )
    .set(row)
    .execute(connection)?;
    if updated == 0 {
        return Err(WorkflowRepositoryError::DefinitionNotFound(
            WorkflowDefinitionId::from_uuid(row.id),
        ));
    }
    Ok(())
}

fn is_live_code_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == LIVE_CODE_INDEX)
}

fn page_bounds(page: PageRequest) -> WorkflowRepositoryResult<(i64, i64)> {
    let offset = i64::try_from(page.offset()).map_err(WorkflowRepositoryError::persistence)?;
    Ok((i64::from(page.size()), offset))
}

fn count_to_total(count: i64) -> WorkflowRepositoryResult<u64> {
    u64::try_from(count).map_err(WorkflowRepositoryError::persistence)
}

fn json_object(column: &'static str, value: Value) -> WorkflowRepositoryResult<JsonObject> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(JsonObject::new()),
        _ => Err(WorkflowRepositoryError::persistence(NotAnObject(column))),
    }
}

fn definition_to_row(
    definition: &WorkflowDefinition,
) -> WorkflowRepositoryResult<DefinitionRow> {
    Ok(DefinitionRow {
        id: definition.id().into_inner(),
        name: definition.name().to_owned(),
        code: definition.code().to_owned(),
        workflow_type: definition.workflow_type().to_owned(),
        description: definition.description().to_owned(),
        status: definition.status().as_str().to_owned(),
        version: i32::try_from(definition.version())
            .map_err(WorkflowRepositoryError::persistence)?,
        is_default: definition.is_default(),
        creator_id: definition.creator_id().into_inner(),
        created_at: definition.created_at(),
        updated_at: definition.updated_at(),
        deleted_at: definition.deleted_at(),
    })
}

fn row_to_definition(row: DefinitionRow) -> WorkflowRepositoryResult<WorkflowDefinition> {
    let status = DefinitionStatus::try_from(row.status.as_str())
        .map_err(WorkflowRepositoryError::persistence)?;
    let version = u32::try_from(row.version).map_err(WorkflowRepositoryError::persistence)?;
    Ok(WorkflowDefinition::from_persisted(PersistedDefinitionData {
        id: WorkflowDefinitionId::from_uuid(row.id),
        name: row.name,
        code: row.code,
        workflow_type: row.workflow_type,
        description: row.description,
        status,
        version,
        is_default: row.is_default,
        creator_id: UserId::from_uuid(row.creator_id),
        created_at: row.created_at,
        updated_at: row.updated_at,
        deleted_at: row.deleted_at,
    }))
}

fn step_to_row(step: &WorkflowStep) -> WorkflowRepositoryResult<StepRow> {
    Ok(StepRow {
        id: step.id().into_inner(),
        workflow_id: step.definition_id().into_inner(),
        name: step.name().to_owned(),
        description: step.description().to_owned(),
        step_order: step.order(),
        step_type: step.step_type().to_owned(),
        assignee_mode: step.assignee_mode().as_str().to_owned(),
        assignee_role: step.assignee_role().map(|role| role.as_str().to_owned()),
        duration_hours: i32::try_from(step.duration_hours())
            .map_err(WorkflowRepositoryError::persistence)?,
        skip_on_timeout: step.skip_on_timeout(),
        form_config: Value::Object(step.form_config().clone()),
        conditions: Value::Object(step.conditions().clone()),
        actions: Value::Object(step.actions().clone()),
        created_at: step.created_at(),
        updated_at: step.updated_at(),
    })
}

fn row_to_step(row: StepRow) -> WorkflowRepositoryResult<WorkflowStep> {
    let assignee_mode = AssigneeMode::try_from(row.assignee_mode.as_str())
        .map_err(WorkflowRepositoryError::persistence)?;
    let assignee_role = row
        .assignee_role
        .as_deref()
        .map(Role::try_from)
        .transpose()
        .map_err(WorkflowRepositoryError::persistence)?;
    let duration_hours =
        u32::try_from(row.duration_hours).map_err(WorkflowRepositoryError::persistence)?;
    Ok(WorkflowStep::from_persisted(PersistedStepData {
        id: WorkflowStepId::from_uuid(row.id),
        definition_id: WorkflowDefinitionId::from_uuid(row.workflow_id),
        name: row.name,
        description: row.description,
        order: row.step_order,
        step_type: row.step_type,
        assignee_mode,
        assignee_role,
        duration_hours,
        skip_on_timeout: row.skip_on_timeout,
        form_config: json_object("form_config", row.form_config)?,
        conditions: json_object("conditions", row.conditions)?,
        actions: json_object("actions", row.actions)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

fn instance_to_row(instance: &WorkflowInstance) -> WorkflowRepositoryResult<InstanceRow> {
    Ok(InstanceRow {
        id: instance.id().into_inner(),
        workflow_id: instance.definition_id().into_inner(),
        business_id: instance.business_id().into_inner(),
        business_type: instance.business_type().to_owned(),
        title: instance.title().to_owned(),
        status: instance.status().as_str().to_owned(),
        current_step_id: instance.current_step_id().map(WorkflowStepId::into_inner),
        starter_id: instance.starter_id().into_inner(),
        start_time: instance.start_time(),
        end_time: instance.end_time(),
        step_entered_at: instance.step_entered_at(),
        revision: i64::try_from(instance.revision())
            .map_err(WorkflowRepositoryError::persistence)?,
        created_at: instance.created_at(),
        updated_at: instance.updated_at(),
    })
}

fn row_to_instance(row: InstanceRow) -> WorkflowRepositoryResult<WorkflowInstance> {
    let status = InstanceStatus::try_from(row.status.as_str())
        .map_err(WorkflowRepositoryError::persistence)?;
    let revision = u64::try_from(row.revision).map_err(WorkflowRepositoryError::persistence)?;
    Ok(WorkflowInstance::from_persisted(PersistedInstanceData {
        id: WorkflowInstanceId::from_uuid(row.id),
        definition_id: WorkflowDefinitionId::from_uuid(row.workflow_id),
        business_id: BusinessId::from_uuid(row.business_id),
        business_type: row.business_type,
        title: row.title,
        status,
        current_step_id: row.current_step_id.map(WorkflowStepId::from_uuid),
        starter_id: UserId::from_uuid(row.starter_id),
        start_time: row.start_time,
        end_time: row.end_time,
        step_entered_at: row.step_entered_at,
        revision,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

fn history_to_row(history: &WorkflowHistory) -> NewHistoryRow {
    NewHistoryRow {
        id: history.id().into_inner(),
        instance_id: history.instance_id().into_inner(),
        step_id: history.step_id().into_inner(),
        step_name: history.step_name().to_owned(),
        operator_id: history.operator_id().into_inner(),
        action: history.action().as_str().to_owned(),
        comment: history.comment().to_owned(),
        form_data: Value::Object(history.form_data().clone()),
        transfer_to: history.transfer_to().map(UserId::into_inner),
        start_time: history.start_time(),
        end_time: history.end_time(),
        duration_minutes: history.duration_minutes(),
    }
}

fn row_to_history(row: HistoryRow) -> WorkflowRepositoryResult<WorkflowHistory> {
    let action = HistoryAction::try_from(row.action.as_str())
        .map_err(WorkflowRepositoryError::persistence)?;
    Ok(WorkflowHistory::from_persisted(PersistedHistoryData {
        id: WorkflowHistoryId::from_uuid(row.id),
        instance_id: WorkflowInstanceId::from_uuid(row.instance_id),
        step_id: WorkflowStepId::from_uuid(row.step_id),
        step_name: row.step_name,
        operator_id: UserId::from_uuid(row.operator_id),
        action,
        comment: row.comment,
        form_data: json_object("form_data", row.form_data)?,
        transfer_to: row.transfer_to.map(UserId::from_uuid),
        start_time: row.start_time,
        end_time: row.end_time,
        duration_minutes: row.duration_minutes,
    }))
}
