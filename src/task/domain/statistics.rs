//! Task counters for dashboards.

use super::{Task, TaskStatus};
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Snapshot of task counts at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatistics {
    /// Live tasks in scope.
    pub total: u64,
    /// Live tasks per status; every status is present.
    pub by_status: BTreeMap<TaskStatus, u64>,
    /// Tasks created since midnight UTC.
    pub created_today: u64,
    /// Tasks completed since midnight UTC.
    pub completed_today: u64,
    /// Open tasks past their deadline.
    pub overdue: u64,
}

impl TaskStatistics {
    /// Counts `tasks` as seen at `now`.
    #[must_use]
    pub fn tally<'a>(tasks: impl IntoIterator<Item = &'a Task>, now: DateTime<Utc>) -> Self {
        let today = day_containing(now);
        let mut stats = Self {
            by_status: TaskStatus::ALL.into_iter().map(|status| (status, 0)).collect(),
            ..Self::default()
        };
        for task in tasks {
            stats.total += 1;
            *stats.by_status.entry(task.status()).or_default() += 1;
            if today.contains(task.created_at()) {
                stats.created_today += 1;
            }
            let finished_today = task
                .completed_time()
                .is_some_and(|finished| today.contains(finished));
            if task.status() == TaskStatus::Completed && finished_today {
                stats.completed_today += 1;
            }
            if task.is_overdue(now) {
                stats.overdue += 1;
            }
        }
        stats
    }

    /// Returns the count for one status.
    #[must_use]
    pub fn count(&self, status: TaskStatus) -> u64 {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

struct Day {
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
}

impl Day {
    fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && self.end.is_none_or(|end| instant < end)
    }
}

fn day_containing(now: DateTime<Utc>) -> Day {
    let start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
    Day {
        start,
        end: start.checked_add_signed(TimeDelta::days(1)),
    }
}
