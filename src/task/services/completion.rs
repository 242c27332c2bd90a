//! Completion, cancellation and progress reporting.

use super::dispatch::{TaskDispatchError, TaskDispatchResult, TaskDispatchService, with_note};
use crate::directory::{
    domain::{Capability, UserId},
    ports::{OrganizationDirectory, UserDirectory},
};
use crate::task::{
    domain::{CompletionReport, Progress, Task, TaskAction, TaskId, TaskLog},
    ports::{TaskNumberGenerator, TaskRepository},
};
use mockable::Clock;
use tracing::info;

impl<R, U, O, N, C> TaskDispatchService<R, U, O, N, C>
where
    R: TaskRepository,
    U: UserDirectory,
    O: OrganizationDirectory,
    N: TaskNumberGenerator,
    C: Clock + Send + Sync,
{
    /// Completes a held task with the reported outcome and logs `complete`.
    /// The assignee or a manager may complete.
    ///
    /// Feedback, result, attachments and actual hours land in the same
    /// write as the status change.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::Domain`] unless the task is assigned or
    /// processing and [`TaskDispatchError::PermissionDenied`] for other
    /// users.
    pub async fn complete_task(
        &self,
        task_id: TaskId,
        user_id: UserId,
        report: CompletionReport,
    ) -> TaskDispatchResult<Task> {
        let mut task = self.require_task(task_id).await?;
        let old_status = task.status();
        let holder = task.assignee_id();
        task.complete(report, &*self.clock)?;
        self.authorize(
            user_id,
            holder == Some(user_id),
            Capability::Manage,
            "complete",
        )
        .await?;

        let log = TaskLog::record(
            &task,
            user_id,
            TaskAction::Complete,
            Some(old_status),
            "task completed",
            &*self.clock,
        );
        self.repository.record(&task, &log).await?;
        info!(task_id = %task_id, user_id = %user_id, "task completed");
        Ok(task)
    }

    /// Cancels a task that is not yet completed, storing `reason` as its
    /// result, and logs `cancel`. The creator or an administrator may
    /// cancel.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::PermissionDenied`] for other users and
    /// [`TaskDispatchError::Domain`] for completed tasks.
    pub async fn cancel_task(
        &self,
        task_id: TaskId,
        user_id: UserId,
        reason: &str,
    ) -> TaskDispatchResult<Task> {
        let mut task = self.require_task(task_id).await?;
        self.authorize(
            user_id,
            task.creator_id() == user_id,
            Capability::Administer,
            "cancel",
        )
        .await?;

        let old_status = task.status();
        task.cancel(reason, &*self.clock)?;
        let log = TaskLog::record(
            &task,
            user_id,
            TaskAction::Cancel,
            Some(old_status),
            with_note("task cancelled".to_owned(), "reason", reason),
            &*self.clock,
        );
        self.repository.record(&task, &log).await?;
        info!(task_id = %task_id, user_id = %user_id, "task cancelled");
        Ok(task)
    }

    /// Records reported progress and logs `progress`. Only the current
    /// assignee may report; the status is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDispatchError::Domain`] for a value outside `0..=100`
    /// and [`TaskDispatchError::PermissionDenied`] for anyone but the
    /// assignee. The stored progress is unchanged on error.
    pub async fn update_progress(
        &self,
        task_id: TaskId,
        user_id: UserId,
        percent: i64,
    ) -> TaskDispatchResult<Task> {
        let progress = Progress::new(percent)?;
        let mut task = self.require_task(task_id).await?;
        if task.assignee_id() != Some(user_id) {
            return Err(TaskDispatchError::PermissionDenied {
                user: user_id,
                action: "update progress of",
            });
        }

        let old_status = task.status();
        task.set_progress(progress, &*self.clock);
        let log = TaskLog::record(
            &task,
            user_id,
            TaskAction::Progress,
            Some(old_status),
            format!("progress set to {}%", progress.value()),
            &*self.clock,
        );
        self.repository.record(&task, &log).await?;
        info!(task_id = %task_id, progress = progress.value(), "task progress updated");
        Ok(task)
    }
}
