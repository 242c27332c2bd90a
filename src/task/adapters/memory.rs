//! In-memory task repository for tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::sync::{Arc, RwLock};

use crate::directory::domain::{OrganizationId, UserId};
use crate::paging::{Page, PageRequest};
use crate::task::{
    domain::{Task, TaskComment, TaskCommentId, TaskId, TaskLog, TaskStatistics, TaskStatus},
    ports::{TaskFilter, TaskRepository, TaskRepositoryError, TaskRepositoryResult},
};

/// Thread-safe in-memory task repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskRepository {
    state: Arc<RwLock<InMemoryTaskState>>,
}

#[derive(Debug, Default)]
struct InMemoryTaskState {
    tasks: Vec<Task>,
    logs: Vec<TaskLog>,
    comments: Vec<TaskComment>,
}

impl InMemoryTaskRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(err: std::sync::PoisonError<T>) -> TaskRepositoryError {
    TaskRepositoryError::persistence(std::io::Error::other(err.to_string()))
}

impl InMemoryTaskState {
    fn live(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter().filter(|task| task.deleted_at().is_none())
    }

    /// Returns the slot index of the stored copy `task` was derived from.
    fn slot_for(&self, task: &Task) -> TaskRepositoryResult<usize> {
        let (index, stored) = self
            .tasks
            .iter()
            .enumerate()
            .find(|(_, stored)| stored.id() == task.id() && stored.deleted_at().is_none())
            .ok_or(TaskRepositoryError::NotFound(task.id()))?;
        if stored.revision().checked_add(1) != Some(task.revision()) {
            return Err(TaskRepositoryError::RevisionConflict(task.id()));
        }
        Ok(index)
    }

    fn replace(&mut self, index: usize, task: &Task) {
        if let Some(slot) = self.tasks.get_mut(index) {
            *slot = task.clone();
        }
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    async fn create_task(&self, task: &Task, log: &TaskLog) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        if state
            .tasks
            .iter()
            .any(|stored| stored.number() == task.number())
        {
            return Err(TaskRepositoryError::DuplicateNumber(
                task.number().as_str().to_owned(),
            ));
        }
        state.tasks.push(task.clone());
        state.logs.push(log.clone());
        Ok(())
    }

    async fn record(&self, task: &Task, log: &TaskLog) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let index = state.slot_for(task)?;
        state.replace(index, task);
        state.logs.push(log.clone());
        Ok(())
    }

    async fn record_many(&self, changes: &[(Task, TaskLog)]) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let slots = changes
            .iter()
            .map(|(task, _)| state.slot_for(task))
            .collect::<TaskRepositoryResult<Vec<usize>>>()?;
        for (index, (task, log)) in slots.into_iter().zip(changes) {
            state.replace(index, task);
            state.logs.push(log.clone());
        }
        Ok(())
    }

    async fn save_task(&self, task: &Task) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        let index = state.slot_for(task)?;
        state.replace(index, task);
        Ok(())
    }

    async fn find_task(&self, id: TaskId) -> TaskRepositoryResult<Option<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state.live().find(|task| task.id() == id).cloned())
    }

    async fn find_tasks(&self, ids: &[TaskId]) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(ids
            .iter()
            .filter_map(|id| state.live().find(|task| task.id() == *id).cloned())
            .collect())
    }

    async fn list_tasks(
        &self,
        filter: &TaskFilter,
        page: PageRequest,
    ) -> TaskRepositoryResult<Page<Task>> {
        let matching = self.tasks_matching(filter).await?;
        Ok(Page::from_sorted(matching, page))
    }

    async fn tasks_matching(&self, filter: &TaskFilter) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        let mut matching: Vec<Task> = state
            .live()
            .filter(|task| filter.matches(task))
            .cloned()
            .collect();
        matching.reverse();
        matching.sort_by_key(|task| Reverse(task.created_at()));
        Ok(matching)
    }

    async fn pending_tasks(
        &self,
        org_id: OrganizationId,
        limit: u32,
    ) -> TaskRepositoryResult<Vec<Task>> {
        let state = self.state.read().map_err(poisoned)?;
        let mut pending: Vec<Task> = state
            .live()
            .filter(|task| task.status() == TaskStatus::Pending && task.org_id() == org_id)
            .cloned()
            .collect();
        pending.sort_by_key(|task| (Reverse(task.priority().rank()), task.created_at()));
        pending.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(pending)
    }

    async fn workload(&self, user_id: UserId) -> TaskRepositoryResult<u64> {
        let state = self.state.read().map_err(poisoned)?;
        let held = state
            .live()
            .filter(|task| task.assignee_id() == Some(user_id) && task.status().is_active_work())
            .count();
        Ok(u64::try_from(held).unwrap_or(u64::MAX))
    }

    async fn statistics(
        &self,
        org_id: Option<OrganizationId>,
        now: DateTime<Utc>,
    ) -> TaskRepositoryResult<TaskStatistics> {
        let state = self.state.read().map_err(poisoned)?;
        let scoped = state
            .live()
            .filter(|task| org_id.is_none_or(|org| task.org_id() == org));
        Ok(TaskStatistics::tally(scoped, now))
    }

    async fn task_logs(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<TaskLog>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .logs
            .iter()
            .rev()
            .filter(|log| log.task_id() == task_id)
            .cloned()
            .collect())
    }

    async fn add_comment(&self, comment: &TaskComment) -> TaskRepositoryResult<()> {
        let mut state = self.state.write().map_err(poisoned)?;
        state.comments.push(comment.clone());
        Ok(())
    }

    async fn find_comment(&self, id: TaskCommentId) -> TaskRepositoryResult<Option<TaskComment>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .comments
            .iter()
            .find(|comment| comment.id() == id)
            .cloned())
    }

    async fn comments(&self, task_id: TaskId) -> TaskRepositoryResult<Vec<TaskComment>> {
        let state = self.state.read().map_err(poisoned)?;
        Ok(state
            .comments
            .iter()
            .filter(|comment| comment.task_id() == task_id)
            .cloned()
            .collect())
    }
}
