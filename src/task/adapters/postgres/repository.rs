//! `PostgreSQL` repository implementation for tasks.

use super::{
    models::{CommentRow, NewCommentRow, NewTaskLogRow, TaskLogRow, TaskRow},
    schema::{task_comments, task_logs, tasks},
};
use crate::directory::domain::{OrganizationId, UserId};
use crate::paging::{Page, PageRequest};
use crate::task::{
    domain::{
        CaseId, Location, PersistedCommentData, PersistedTaskData, PersistedTaskLogData,
        Progress, Task, TaskAction, TaskComment, TaskCommentId, TaskId, TaskLog, TaskLogId,
        TaskNumber, TaskPriority, TaskStatistics, TaskStatus, TaskType, WorkflowLink,
    },
    ports::{TaskFilter, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorInformation, DatabaseErrorKind, Error as DieselError};
use serde_json::Value;
use std::collections::HashMap;

/// `PostgreSQL` connection pool type used by task adapters.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

const TASK_NUMBER_INDEX: &str = "idx_tasks_number";

/// `PostgreSQL`-backed task repository.
#[derive(Debug, Clone)]
pub struct PostgresTaskRepository {
    pool: TaskPgPool,
}

impl PostgresTaskRepository {
    /// Creates a new repository from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    async fn run_blocking<F, T>(&self, operation: F) -> TaskRepositoryResult<T>
    where
        F: FnOnce(&mut PgConnection) -> TaskRepositoryResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(TaskRepositoryError::persistence)?;
            operation(&mut connection)
        })
        .await
        .map_err(TaskRepositoryError::persistence)?
    }
}

impl From<DieselError> for TaskRepositoryError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskRepository {
    async fn create_task(&self, task: &Task, log: &TaskLog) -> TaskRepositoryResult<()> {
        let number = task.number().as_str().to_owned();
        let task_row = task_to_row(task)?;
        let log_row = log_to_row(log);
        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                diesel::insert_into(tasks::table)
                    .values(&task_row)
                    .execute(tx)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, ref info)
                            if is_number_violation(info.as_ref()) =>
                        {
                            TaskRepositoryError::DuplicateNumber(number.clone())
                        }
                        _ => TaskRepositoryError::persistence(err),
                    })?;
                diesel::insert_into(task_logs::table)
                    .values(&log_row)
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn record(&self, task: &Task, log: &TaskLog) -> TaskRepositoryResult<()> {
        let task_row = task_to_row(task)?;
        let log_row = log_to_row(log);
        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                save_task_row(tx, &task_row)?;
                diesel::insert_into(task_logs::table)
                    .values(&log_row)
                    .execute(tx)?;
                Ok(())
            })
        })
        .await
    }

    async fn record_many(&self, changes: &[(Task, TaskLog)]) -> TaskRepositoryResult<()> {
        let rows = changes
            .iter()
            .map(|(task, log)| Ok((task_to_row(task)?, log_to_row(log))))
            .collect::<TaskRepositoryResult<Vec<_>>>()?;
        self.run_blocking(move |connection| {
            connection.transaction::<_, TaskRepositoryError, _>(|tx| {
                for (task_row, log_row) in &rows {
                    save_task_row(tx, task_row)?;
                    diesel::insert_into(task_logs::table)
                        .values(log_row)
                        .execute(tx)?;
                }
                Ok(())
            })
        })
        .await
    }

    async fn save_task(&self, task: &Task) -> TaskRepositoryResult<()> {
        let task_row = task_to_row(task)?;
        self.run_blocking(move |connection| save_task_row(connection, &task_row))
            .await
    }

    async fn find_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = live_tasks()
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn find_tasks(&self, ids: &[TaskId]) -> TaskRepositoryResult<Vec<Task>> {
        let wanted: Vec<uuid::Uuid> = ids.iter().copied().map(TaskId::into_inner).collect();
        self.run_blocking(move |connection| {
            let rows = live_tasks()
                .filter(tasks::id.eq_any(wanted.clone()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            let mut by_id = rows
                .into_iter()
                .map(|row| Ok((row.id, row_to_task(row)?)))
                .collect::<TaskRepositoryResult<HashMap<_, _>>>()?;
            Ok(wanted.iter().filter_map(|id| by_id.remove(id)).collect())
        })
        .await
    }

    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> TaskRepositoryResult<Page<Task>> {
        let criteria = filter.clone();
        let (limit, offset) = page_bounds(page)?;
        self.run_blocking(move |connection| {
            let total = filtered_tasks(&criteria)
                .count()
                .get_result::<i64>(connection)?;
            let rows = filtered_tasks(&criteria)
                .order((tasks::created_at.desc(), tasks::id.desc()))
                .limit(limit)
                .offset(offset)
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            let items = rows
                .into_iter()
                .map(row_to_task)
                .collect::<TaskRepositoryResult<Vec<_>>>()?;
            Ok(Page {
                items,
                total: count_to_total(total)?,
            })
        })
        .await
    }

    async fn tasks_matching(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        let criteria = filter.clone();
        self.run_blocking(move |connection| {
            let rows = filtered_tasks(&criteria)
                .order((tasks::created_at.desc(), tasks::id.desc()))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn pending_tasks(
        &self,
        org_id: OrganizationId,
        limit: u32,
    ) -> TaskRepositoryResult<Vec<Task>> {
        self.run_blocking(move |connection| {
            let rows = live_tasks()
                .filter(tasks::org_id.eq(org_id.into_inner()))
                .filter(tasks::status.eq(TaskStatus::Pending.as_str()))
                .order((tasks::priority_rank.desc(), tasks::created_at.asc()))
                .limit(i64::from(limit))
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }

    async fn workload(&self, user_id: UserId) -> TaskRepositoryResult<u64> {
        self.run_blocking(move |connection| {
            let count = live_tasks()
                .filter(tasks::assignee_id.eq(user_id.into_inner()))
                .filter(tasks::status.eq_any([
                    TaskStatus::Assigned.as_str(),
                    TaskStatus::Processing.as_str(),
                ]))
                .count()
                .get_result::<i64>(connection)?;
            count_to_total(count)
        })
        .await
    }

    async fn statistics(
        &self,
        org_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> TaskRepositoryResult<TaskStatistics> {
        let criteria = TaskFilter {
            org_id,
            ..TaskFilter::default()
        };
        self.run_blocking(move |connection| {
            let rows = filtered_tasks(&criteria)
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            let live = rows
                .into_iter()
                .map(row_to_task)
                .collect::<TaskRepositoryResult<Vec<_>>>()?;
            Ok(TaskStatistics::tally(&live, now))
        })
        .await
    }

    async fn task_logs(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<TaskLog>> {
        self.run_blocking(move |connection| {
            let rows = task_logs::table
                .filter(task_logs::task_id.eq(task_id.into_inner()))
                .order(task_logs::seq.desc())
                .select(TaskLogRow::as_select())
                .load::<TaskLogRow>(connection)?;
            rows.into_iter().map(row_to_log).collect()
        })
        .await
    }

    async fn add_comment(&self, comment: &TaskComment) -> TaskRepositoryResult<()> {
        let row = comment_to_row(comment)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(task_comments::table)
                .values(&row)
                .execute(connection)?;
            Ok(())
        })
        .await
    }

    async fn find_comment(&self, id: TaskCommentId) -> TaskRepositoryResult<Option<TaskComment>> {
        self.run_blocking(move |connection| {
            let row = task_comments::table
                .find(id.into_inner())
                .select(CommentRow::as_select())
                .first::<CommentRow>(connection)
                .optional()?;
            row.map(row_to_comment).transpose()
        })
        .await
    }

    async fn comments(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<TaskComment>> {
        self.run_blocking(move |connection| {
            let rows = task_comments::table
                .filter(task_comments::task_id.eq(task_id.into_inner()))
                .order(task_comments::seq.asc())
                .select(CommentRow::as_select())
                .load::<CommentRow>(connection)?;
            rows.into_iter().map(row_to_comment).collect()
        })
        .await
    }
}

fn live_tasks() -> tasks::BoxedQuery<'static, Pg> {
    tasks::table.filter(tasks::deleted_at.is_null()).into_boxed()
}

fn filtered_tasks(filter: &TaskFilter) -> tasks::BoxedQuery<'static, Pg> {
    let mut query = live_tasks();
    if let Some(status) = filter.status {
        query = query.filter(tasks::status.eq(status.as_str()));
    }
    if let Some(assignee_id) = filter.assignee_id {
        query = query.filter(tasks::assignee_id.eq(assignee_id.into_inner()));
    }
    if let Some(creator_id) = filter.creator_id {
        query = query.filter(tasks::creator_id.eq(creator_id.into_inner()));
    }
    if let Some(org_id) = filter.org_id {
        query = query.filter(tasks::org_id.eq(org_id.into_inner()));
    }
    if let Some(task_type) = filter.task_type {
        query = query.filter(tasks::task_type.eq(task_type.as_str()));
    }
    if let Some(priority) = filter.priority {
        query = query.filter(tasks::priority.eq(priority.as_str()));
    }
    if let Some(case_id) = filter.case_id {
        query = query.filter(tasks::case_id.eq(case_id.into_inner()));
    }
    if let Some(keyword) = filter.keyword.as_deref() {
        let pattern = format!("%{}%", keyword.trim());
        query = query.filter(
            tasks::title
                .ilike(pattern.clone())
                .or(tasks::description.ilike(pattern)),
        );
    }
    query
}

/// Writes `row` if the stored revision is exactly one behind it.
fn save_task_row(connection: &mut PgConnection, row: &TaskRow) -> TaskRepositoryResult<()> {
    let task_id = TaskId::from_uuid(row.id);
    let expected_revision = row.revision.saturating_sub(1);
    let updated = diesel::update(
        tasks::table
            .filter(tasks::id.eq(row.id))
            .filter(tasks::deleted_at.is_null())
            .filter(tasks::revision.eq(expected_revision)),
    )
    .set(row)
    .execute(connection)?;
    if updated > 0 {
        return Ok(());
    }
    let exists = tasks::table
        .filter(tasks::id.eq(row.id))
        .filter(tasks::deleted_at.is_null())
        .count()
        .get_result::<i64>(connection)?;
    Err(if exists == 0 {
        TaskRepositoryError::NotFound(task_id)
    } else {
        TaskRepositoryError::RevisionConflict(task_id)
    })
}

fn is_number_violation(info: &dyn DatabaseErrorInformation) -> bool {
    info.constraint_name()
        .is_some_and(|name| name == TASK_NUMBER_INDEX)
}

fn page_bounds(page: PageRequest) -> TaskRepositoryResult<(i64, i64)> {
    let offset = i64::try_from(page.offset()).map_err(TaskRepositoryError::persistence)?;
    Ok((i64::from(page.size()), offset))
}

fn count_to_total(count: i64) -> TaskRepositoryResult<u64> {
    u64::try_from(count).map_err(TaskRepositoryError::persistence)
}

fn to_json<T: serde::Serialize>(value: &T) -> TaskRepositoryResult<Value> {
    serde_json::to_value(value).map_err(TaskRepositoryError::persistence)
}

fn from_json<T: serde::de::DeserializeOwned>(value: Value) -> TaskRepositoryResult<T> {
    serde_json::from_value(value).map_err(TaskRepositoryError::persistence)
}

fn task_to_row(task: &Task) -> TaskRepositoryResult<TaskRow> {
    let link = task.workflow();
    Ok(TaskRow {
        id: task.id().into_inner(),
        task_no: task.number().as_str().to_owned(),
        title: task.title().to_owned(),
        description: task.description().to_owned(),
        task_type: task.task_type().as_str().to_owned(),
        priority: task.priority().as_str().to_owned(),
        priority_rank: task.priority().rank(),
        status: task.status().as_str().to_owned(),
        case_id: task.case_id().map(CaseId::into_inner),
        creator_id: task.creator_id().into_inner(),
        assignee_id: task.assignee_id().map(UserId::into_inner),
        org_id: task.org_id().into_inner(),
        start_time: task.start_time(),
        deadline: task.deadline(),
        completed_time: task.completed_time(),
        estimated_hours: i32::try_from(task.estimated_hours())
            .map_err(TaskRepositoryError::persistence)?,
        actual_hours: i32::try_from(task.actual_hours())
            .map_err(TaskRepositoryError::persistence)?,
        location: to_json(task.location())?,
        requirements: task.requirements().to_owned(),
        materials: to_json(&task.materials())?,
        notes: task.notes().to_owned(),
        workflow_id: link.map(|link| link.workflow_id),
        current_step: link.map(|link| link.current_step),
        feedback: task.feedback().to_owned(),
        result: task.result().to_owned(),
        attachments: to_json(&task.attachments())?,
        progress: i16::from(task.progress().value()),
        revision: i64::try_from(task.revision()).map_err(TaskRepositoryError::persistence)?,
        created_at: task.created_at(),
        updated_at: task.updated_at(),
        deleted_at: task.deleted_at(),
    })
}

fn row_to_task(row: TaskRow) -> TaskRepositoryResult<Task> {
    let task_type =
        TaskType::try_from(row.task_type.as_str()).map_err(TaskRepositoryError::persistence)?;
    let priority =
        TaskPriority::try_from(row.priority.as_str()).map_err(TaskRepositoryError::persistence)?;
    let status =
        TaskStatus::try_from(row.status.as_str()).map_err(TaskRepositoryError::persistence)?;
    let workflow = match (row.workflow_id, row.current_step) {
        (Some(workflow_id), Some(current_step)) => Some(WorkflowLink {
            workflow_id,
            current_step,
        }),
        _ => None,
    };
    let location: Location = from_json(row.location)?;
    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(row.id),
        number: TaskNumber::new(row.task_no),
        title: row.title,
        description: row.description,
        task_type,
        priority,
        status,
        case_id: row.case_id.map(CaseId::from_uuid),
        creator_id: UserId::from_uuid(row.creator_id),
        assignee_id: row.assignee_id.map(UserId::from_uuid),
        org_id: OrganizationId::from_uuid(row.org_id),
        start_time: row.start_time,
        deadline: row.deadline,
        completed_time: row.completed_time,
        estimated_hours: u32::try_from(row.estimated_hours)
            .map_err(TaskRepositoryError::persistence)?,
        actual_hours: u32::try_from(row.actual_hours).map_err(TaskRepositoryError::persistence)?,
        location,
        requirements: row.requirements,
        materials: from_json(row.materials)?,
        notes: row.notes,
        workflow,
        feedback: row.feedback,
        result: row.result,
        attachments: from_json(row.attachments)?,
        progress: Progress::new(i64::from(row.progress))
            .map_err(TaskRepositoryError::persistence)?,
        revision: u64::try_from(row.revision).map_err(TaskRepositoryError::persistence)?,
        created_at: row.created_at,
        updated_at: row.updated_at,
        deleted_at: row.deleted_at,
    }))
}

fn log_to_row(log: &TaskLog) -> NewTaskLogRow {
    NewTaskLogRow {
        id: log.id().into_inner(),
        task_id: log.task_id().into_inner(),
        user_id: log.user_id().into_inner(),
        action: log.action().as_str().to_owned(),
        old_status: log.old_status().map(|status| status.as_str().to_owned()),
        new_status: log.new_status().as_str().to_owned(),
        content: log.content().to_owned(),
        created_at: log.created_at(),
    }
}

fn row_to_log(row: TaskLogRow) -> TaskRepositoryResult<TaskLog> {
    let action =
        TaskAction::try_from(row.action.as_str()).map_err(TaskRepositoryError::persistence)?;
    let old_status = row
        .old_status
        .as_deref()
        .map(TaskStatus::try_from)
        .transpose()
        .map_err(TaskRepositoryError::persistence)?;
    let new_status =
        TaskStatus::try_from(row.new_status.as_str()).map_err(TaskRepositoryError::persistence)?;
    Ok(TaskLog::from_persisted(PersistedTaskLogData {
        id: TaskLogId::from_uuid(row.id),
        task_id: TaskId::from_uuid(row.task_id),
        user_id: UserId::from_uuid(row.user_id),
        action,
        old_status,
        new_status,
        content: row.content,
        created_at: row.created_at,
    }))
}

fn comment_to_row(comment: &TaskComment) -> TaskRepositoryResult<NewCommentRow> {
    Ok(NewCommentRow {
        id: comment.id().into_inner(),
        task_id: comment.task_id().into_inner(),
        user_id: comment.author_id().into_inner(),
        content: comment.content().to_owned(),
        attachments: to_json(&comment.attachments())?,
        parent_id: comment.parent_id().map(TaskCommentId::into_inner),
        created_at: comment.created_at(),
    })
}

fn row_to_comment(row: CommentRow) -> TaskRepositoryResult<TaskComment> {
    Ok(TaskComment::from_persisted(PersistedCommentData {
        id: TaskCommentId::from_uuid(row.id),
        task_id: TaskId::from_uuid(row.task_id),
        author_id: UserId::from_uuid(row.user_id),
        content: row.content,
        attachments: from_json(row.attachments)?,
        parent_id: row.parent_id.map(TaskCommentId::from_uuid),
        created_at: row.created_at,
    }))
}
