use crate::domain::Task;
use chrono::{Duration, NaiveDateTime};

/// Grace window before a soft-deleted task is purged
pub const DEFAULT_PENDING_DELETE_DELAY_SECS: u64 = 3;

/// How long a completed task stays visible
pub const DEFAULT_COMPLETED_RETENTION_SECS: u64 = 60;

/// Decides when soft-deleted and completed tasks leave the list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeletionPolicy {
    pub pending_delete_delay: Duration,
    pub completed_retention: Duration,
}

impl Default for DeletionPolicy {
    fn default() -> Self {
        Self::from_secs(
            DEFAULT_PENDING_DELETE_DELAY_SECS,
            DEFAULT_COMPLETED_RETENTION_SECS,
        )
    }
}

impl DeletionPolicy {
    pub fn from_secs(pending_delete_delay: u64, completed_retention: u64) -> Self {
        Self {
            pending_delete_delay: secs(pending_delete_delay),
            completed_retention: secs(completed_retention),
        }
    }

    /// `force` skips the grace windows but still only applies to
    /// pending-delete or done tasks. Pending delete is checked first.
    pub fn should_remove(&self, task: &Task, now: NaiveDateTime, force: bool) -> bool {
        if force {
            return task.is_pending_delete() || task.is_done();
        }

        if let Some(marked) = task.delete_marked_at() {
            return now.signed_duration_since(marked) >= self.pending_delete_delay;
        }

        if let Some(completed) = task.completed_at() {
            return now.signed_duration_since(completed) >= self.completed_retention;
        }

        false
    }

    /// Still inside the soft-delete window, so an undo is allowed
    pub fn can_undo(&self, task: &Task, now: NaiveDateTime) -> bool {
        task.is_pending_delete() && !self.should_remove(task, now, false)
    }
}

fn secs(value: u64) -> Duration {
    i64::try_from(value)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}
