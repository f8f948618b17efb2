use super::recurrence::{RecurrenceRule, SkipRule};
use super::time::add_span;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("{unit} must not be negative (got {value})")]
    NegativeDuration { unit: &'static str, value: i64 },
    #[error("{unit} is too large (got {value})")]
    DurationTooLarge { unit: &'static str, value: i64 },
    #[error("account must not be empty")]
    EmptyAccount,
}

/// How long a task runs from its start to its finish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDuration {
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
}

impl TaskDuration {
    /// Validate raw components; negative values are rejected here, never inside the engine
    pub fn new(days: i64, hours: i64, minutes: i64) -> Result<Self, TaskError> {
        Ok(Self {
            days: component("days", days)?,
            hours: component("hours", hours)?,
            minutes: component("minutes", minutes)?,
        })
    }

    /// A zero duration is allowed; such a task is due immediately
    pub fn is_zero(&self) -> bool {
        self.days == 0 && self.hours == 0 && self.minutes == 0
    }

    pub fn to_chrono(&self) -> Duration {
        Duration::days(i64::from(self.days))
            + Duration::hours(i64::from(self.hours))
            + Duration::minutes(i64::from(self.minutes))
    }

    fn end_from(&self, start: NaiveDateTime) -> NaiveDateTime {
        add_span(
            start,
            u64::from(self.days),
            u64::from(self.hours),
            u64::from(self.minutes),
            0,
        )
    }
}

fn component(unit: &'static str, value: i64) -> Result<u32, TaskError> {
    if value < 0 {
        return Err(TaskError::NegativeDuration { unit, value });
    }
    u32::try_from(value).map_err(|_| TaskError::DurationTooLarge { unit, value })
}

/// A tracked upgrade: runs from `start` for `duration`, then waits to be completed.
///
/// Lifecycle fields are private so the paired flags and timestamps only change
/// together: `done` with `completed_at`, `pending_delete` with `delete_marked_at`,
/// and `finish` with `start`/`duration`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredTask", into = "StoredTask")]
pub struct Task {
    /// Stable identity for addressing a task
    pub id: Uuid,
    /// Account the upgrade belongs to
    pub account: String,
    /// Upgrade name (may be empty)
    pub name: String,
    start: NaiveDateTime,
    duration: TaskDuration,
    finish: NaiveDateTime,
    notified: bool,
    done: bool,
    completed_at: Option<NaiveDateTime>,
    pending_delete: bool,
    delete_marked_at: Option<NaiveDateTime>,
    /// Occurrence already spawned from this task; survives uncomplete
    regenerated: Option<Uuid>,
    /// Regeneration rule applied on completion
    pub recurrence: RecurrenceRule,
    /// No occurrence starts after this moment
    pub repeat_until: Option<NaiveDateTime>,
    /// Defers regenerated occurrences that land on unwanted days
    pub skip: SkipRule,
}

impl Task {
    pub fn new(
        account: impl Into<String>,
        name: impl Into<String>,
        start: NaiveDateTime,
        duration: TaskDuration,
    ) -> Result<Self, TaskError> {
        let account = account.into();
        if account.trim().is_empty() {
            return Err(TaskError::EmptyAccount);
        }

        Ok(Self {
            id: Uuid::new_v4(),
            account,
            name: name.into(),
            start,
            duration,
            finish: duration.end_from(start),
            notified: false,
            done: false,
            completed_at: None,
            pending_delete: false,
            delete_marked_at: None,
            regenerated: None,
            recurrence: RecurrenceRule::None,
            repeat_until: None,
            skip: SkipRule::None,
        })
    }

    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = rule;
        self
    }

    pub fn with_repeat_until(mut self, until: Option<NaiveDateTime>) -> Self {
        self.repeat_until = until;
        self
    }

    pub fn with_skip(mut self, skip: SkipRule) -> Self {
        self.skip = skip;
        self
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn duration(&self) -> TaskDuration {
        self.duration
    }

    pub fn finish(&self) -> NaiveDateTime {
        self.finish
    }

    pub fn is_notified(&self) -> bool {
        self.notified
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn completed_at(&self) -> Option<NaiveDateTime> {
        self.completed_at
    }

    pub fn is_pending_delete(&self) -> bool {
        self.pending_delete
    }

    pub fn delete_marked_at(&self) -> Option<NaiveDateTime> {
        self.delete_marked_at
    }

    pub fn regenerated(&self) -> Option<Uuid> {
        self.regenerated
    }

    /// Finish has passed but the task is still open
    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        !self.done && !self.pending_delete && self.finish <= now
    }

    /// Time left until finish (negative once due)
    pub fn remaining(&self, now: NaiveDateTime) -> Duration {
        self.finish.signed_duration_since(now)
    }

    /// Short display id (first block of the UUID)
    pub fn short_id(&self) -> String {
        short_id(self.id)
    }

    pub(crate) fn set_schedule(&mut self, start: NaiveDateTime, duration: TaskDuration) {
        self.start = start;
        self.duration = duration;
        self.finish = duration.end_from(start);
    }

    pub(crate) fn mark_notified(&mut self) {
        self.notified = true;
    }

    pub(crate) fn reset_notified(&mut self) {
        self.notified = false;
    }

    pub(crate) fn mark_done(&mut self, now: NaiveDateTime) {
        self.done = true;
        self.completed_at = Some(now);
    }

    pub(crate) fn clear_done(&mut self) {
        self.done = false;
        self.completed_at = None;
    }

    pub(crate) fn set_regenerated(&mut self, next: Uuid) {
        self.regenerated = Some(next);
    }

    pub(crate) fn mark_pending_delete(&mut self, now: NaiveDateTime) {
        self.pending_delete = true;
        self.delete_marked_at = Some(now);
    }

    pub(crate) fn clear_pending_delete(&mut self) {
        self.pending_delete = false;
        self.delete_marked_at = None;
    }

    /// Fresh open task for the next occurrence: same account, name, duration and rules
    pub(crate) fn next_occurrence(&self, start: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            account: self.account.clone(),
            name: self.name.clone(),
            start,
            duration: self.duration,
            finish: self.duration.end_from(start),
            notified: false,
            done: false,
            completed_at: None,
            pending_delete: false,
            delete_marked_at: None,
            regenerated: None,
            recurrence: self.recurrence,
            repeat_until: self.repeat_until,
            skip: self.skip,
        }
    }
}

/// First block of a UUID, as shown in listings and accepted as an id prefix
pub fn short_id(id: Uuid) -> String {
    id.simple().to_string()[..8].to_string()
}

/// On-disk shape of a task; converting back restores the invariants
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredTask {
    id: Uuid,
    account: String,
    #[serde(default)]
    name: String,
    start: NaiveDateTime,
    #[serde(default)]
    duration: TaskDuration,
    #[serde(default)]
    finish: Option<NaiveDateTime>,
    #[serde(default)]
    notified: bool,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    completed_at: Option<NaiveDateTime>,
    #[serde(default)]
    pending_delete: bool,
    #[serde(default)]
    delete_marked_at: Option<NaiveDateTime>,
    #[serde(default)]
    regenerated: Option<Uuid>,
    #[serde(default)]
    recurrence: RecurrenceRule,
    #[serde(default)]
    repeat_until: Option<NaiveDateTime>,
    #[serde(default)]
    skip: SkipRule,
}

impl From<StoredTask> for Task {
    fn from(stored: StoredTask) -> Self {
        let finish = stored.duration.end_from(stored.start);
        // A flag without its timestamp falls back to the finish time
        let completed_at = stored
            .done
            .then(|| stored.completed_at.unwrap_or(finish));
        let delete_marked_at = stored
            .pending_delete
            .then(|| stored.delete_marked_at.unwrap_or(finish));

        Self {
            id: stored.id,
            account: stored.account,
            name: stored.name,
            start: stored.start,
            duration: stored.duration,
            finish,
            notified: stored.notified,
            done: stored.done,
            completed_at,
            pending_delete: stored.pending_delete,
            delete_marked_at,
            regenerated: stored.regenerated,
            recurrence: stored.recurrence,
            repeat_until: stored.repeat_until,
            skip: stored.skip,
        }
    }
}

impl From<Task> for StoredTask {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            account: task.account,
            name: task.name,
            start: task.start,
            duration: task.duration,
            finish: Some(task.finish),
            notified: task.notified,
            done: task.done,
            completed_at: task.completed_at,
            pending_delete: task.pending_delete,
            delete_marked_at: task.delete_marked_at,
            regenerated: task.regenerated,
            recurrence: task.recurrence,
            repeat_until: task.repeat_until,
            skip: task.skip,
        }
    }
}
