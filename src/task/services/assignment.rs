//! Manual, batch and load-balanced assignment.

use super::dispatch::{TaskDispatchError, TaskDispatchResult, TaskDispatchService, with_note};
use crate::directory::{
    domain::{Capability, OrganizationId, User, UserId},
    ports::{OrganizationDirectory, UserDirectory},
};
use crate::task::{
    domain::{Task, TaskAction, TaskId, TaskLog},
    ports::{TaskNumberGenerator, TaskRepository},
};
use mockable::Clock;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Request payload for assigning several tasks to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchAssignRequest {
    task_ids: Vec<String>,
    assignee_id: UserId,
    comment: String,
}

impl BatchAssignRequest {
    /// Creates a request. Task identifiers are raw text; malformed ones are
    /// dropped when the batch runs.
    #[must_use]
    pub fn new(task_ids: impl IntoIterator<Item = impl Into<String>>, assignee_id: UserId) -> Self {
        Self {
            task_ids: task_ids.into_iter().map(Into::into).collect(),
            assignee_id,
            comment: String::new(),
        }
    }

    /// Sets the comment appended to each log row.
    #[must_use]
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

fn parse_task_ids(raw_ids: &[String]) -> Vec<TaskId> {
    let mut seen = HashSet::with_capacity(raw_ids.len());
    raw_ids
        .iter()
        .filter_map(|raw| raw.trim().parse::<TaskId>().ok())
        .filter(|id| seen.insert(*id))
        .collect()
}

/// One task handed out by automatic assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoAssignment {
    /// Task assigned.
    pub task_id: TaskId,
    /// Member who received it.
    pub assignee_id: UserId,
}

/// Outcome of an automatic assignment run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoAssignReport {
    /// Tasks assigned, in processing order.
    pub assigned: Vec<AutoAssignment>,
    /// Tasks left pending because no member could be selected or the write
    /// failed.
    pub skipped: Vec<TaskId>,
}

impl<R, U, O, N, C> TaskDispatchService<R, U, O, N, C>
where
    R: TaskRepository,
    U: UserDirectory,
    O: OrganizationDirectory,
    N: TaskNumberGenerator,
    C: Clock + Send + Sync,
{
    /// Gives a draft or pending task to `assignee_id` and logs `assign`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::TaskNotFound`] or
    /// [`TaskDispatchError::UserNotFound`] for unknown references and
    /// [`TaskDispatchError::Domain`] when the task is not assignable.
    pub async fn assign_task(
        &self,
        task_id: TaskId,
        operator_id: UserId,
        assignee_id: UserId,
        comment: &str,
    ) -> TaskDispatchResult<Task> {
        let mut task = self.require_task(task_id).await?;
        let old_status = task.status();
        task.assign(assignee_id, &*self.clock)?;
        self.require_user(assignee_id).await?;

        let content = with_note(format!("assigned to {assignee_id}"), "comment", comment);
        let log = TaskLog::record(
            &task,
            operator_id,
            TaskAction::Assign,
            Some(old_status),
            content,
            &*self.clock,
        );
        self.repository.record(&task, &log).await?;
        info!(task_id = %task_id, assignee_id = %assignee_id, "task assigned");
        Ok(task)
    }

    /// Returns an assigned task to the pending pool and logs `unassign`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::Domain`] unless the task is exactly
    /// `assigned`.
    pub async fn unassign_task(
        &self,
        task_id: TaskId,
        operator_id: UserId,
        reason: &str,
    ) -> TaskDispatchResult<Task> {
        let mut task = self.require_task(task_id).await?;
        let old_status = task.status();
        task.unassign(&*self.clock)?;
        let log = TaskLog::record(
            &task,
            operator_id,
            TaskAction::Unassign,
            Some(old_status),
            with_note("assignment withdrawn".to_owned(), "reason", reason),
            &*self.clock,
        );
        self.repository.record(&task, &log).await?;
        info!(task_id = %task_id, "task unassigned");
        Ok(task)
    }

    /// Hands a held task to another user and logs `transfer`. The current
    /// assignee or a manager may transfer.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::PermissionDenied`] for other users,
    /// [`TaskDispatchError::UserNotFound`] for an unknown target and
    /// [`TaskDispatchError::Domain`] unless the task is assigned or
    /// processing.
    pub async fn transfer_task(
        &self,
        task_id: TaskId,
        from_user: UserId,
        to_user: UserId,
        reason: &str,
    ) -> TaskDispatchResult<Task> {
        let mut task = self.require_task(task_id).await?;
        self.authorize(
            from_user,
            task.assignee_id() == Some(from_user),
            Capability::Manage,
            "transfer",
        )
        .await?;
        self.require_user(to_user).await?;

        let old_status = task.status();
        task.transfer(to_user, &*self.clock)?;
        let log = TaskLog::record(
            &task,
            from_user,
            TaskAction::Transfer,
            Some(old_status),
            with_note(format!("transferred to {to_user}"), "reason", reason),
            &*self.clock,
        );
        self.repository.record(&task, &log).await?;
        info!(task_id = %task_id, from = %from_user, to = %to_user, "task transferred");
        Ok(task)
    }

    /// Assigns every still-assignable task in the batch to one user in a
    /// single write, logging `batch_assign` per task.
    ///
    /// Malformed identifiers are dropped; unknown, deleted or already
    /// assigned tasks are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::UserNotFound`] for an unknown assignee
    /// and [`TaskDispatchError::NoValidTaskIds`] when no identifier parses.
    pub async fn batch_assign(
        &self,
        operator_id: UserId,
        request: BatchAssignRequest,
    ) -> TaskDispatchResult<Vec<Task>> {
        let BatchAssignRequest {
            task_ids,
            assignee_id,
            comment,
        } = request;
        self.require_user(assignee_id).await?;
        let ids = parse_task_ids(&task_ids);
        if ids.is_empty() {
            return Err(TaskDispatchError::NoValidTaskIds);
        }

        let content = with_note(
            format!("batch assigned to {assignee_id}"),
            "comment",
            &comment,
        );
        let mut changes = Vec::with_capacity(ids.len());
        for mut task in self.repository.find_tasks(&ids).await? {
            if !task.status().can_assign() {
                debug!(
                    task_id = %task.id(),
                    status = task.status().as_str(),
                    "batch assignment skipped task"
                );
                continue;
            }
            task.assign(assignee_id, &*self.clock)?;
            let log = TaskLog::record(
                &task,
                operator_id,
                TaskAction::BatchAssign,
                None,
                content.clone(),
                &*self.clock,
            );
            changes.push((task, log));
        }

        if !changes.is_empty() {
            self.repository.record_many(&changes).await?;
        }
        info!(
            assignee_id = %assignee_id,
            requested = task_ids.len(),
            assigned = changes.len(),
            "tasks batch assigned"
        );
        Ok(changes.into_iter().map(|(task, _)| task).collect())
    }

    /// Hands up to `limit` pending tasks of an organization to its members,
    /// most urgent and oldest first, each to the member with the smallest
    /// current workload.
    ///
    /// Workload is recomputed for every task, so earlier assignments in the
    /// same run count. Ties go to the member listed first by the directory.
    /// A task whose assignment fails is skipped and reported, not retried.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::NoAvailableMembers`] when the
    /// organization has no members.
    pub async fn auto_assign_tasks(
        &self,
        org_id: OrganizationId,
        limit: u32,
    ) -> TaskDispatchResult<AutoAssignReport> {
        let members = self.users.list_by_organization(org_id).await?;
        if members.is_empty() {
            return Err(TaskDispatchError::NoAvailableMembers(org_id));
        }
        let pending = self.repository.pending_tasks(org_id, limit).await?;

        let mut report = AutoAssignReport::default();
        for task in pending {
            let task_id = task.id();
            let Some(member) = self.least_loaded(&members).await else {
                warn!(task_id = %task_id, "no member workload available, task skipped");
                report.skipped.push(task_id);
                continue;
            };
            match self.auto_assign_one(task, member).await {
                Ok(()) => report.assigned.push(AutoAssignment {
                    task_id,
                    assignee_id: member.id(),
                }),
                Err(err) => {
                    warn!(task_id = %task_id, error = %err, "automatic assignment skipped task");
                    report.skipped.push(task_id);
                }
            }
        }
        info!(
            org_id = %org_id,
            assigned = report.assigned.len(),
            skipped = report.skipped.len(),
            "automatic assignment finished"
        );
        Ok(report)
    }

    async fn least_loaded<'a>(&self, members: &'a [User]) -> Option<&'a User> {
        let mut best: Option<(&User, u64)> = None;
        for member in members {
            let workload = match self.repository.workload(member.id()).await {
                Ok(count) => count,
                Err(err) => {
                    warn!(user_id = %member.id(), error = %err, "workload lookup failed");
                    continue;
                }
            };
            if best.is_none_or(|(_, lowest)| workload < lowest) {
                best = Some((member, workload));
            }
        }
        best.map(|(member, _)| member)
    }

    async fn auto_assign_one(&self, mut task: Task, member: &User) -> TaskDispatchResult<()> {
        let old_status = task.status();
        task.assign(member.id(), &*self.clock)?;
        let log = TaskLog::record(
            &task,
            member.id(),
            TaskAction::AutoAssign,
            Some(old_status),
            format!("automatically assigned to {}", member.display_name()),
            &*self.clock,
        );
        self.repository.record(&task, &log).await?;
        Ok(())
    }
}
