use super::deletion::DeletionPolicy;
use super::sort::SortStrategy;
use crate::domain::{next_start, Task, TaskDuration};
use chrono::NaiveDateTime;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("no task with id {0}")]
    TaskNotFound(Uuid),
    #[error("undo window for task {0} has passed")]
    UndoExpired(Uuid),
    #[error("task {0} is not marked for deletion")]
    NotPendingDelete(Uuid),
}

/// Result of one tick over the task list
#[derive(Debug, Default)]
pub struct TickOutcome {
    /// Snapshots of tasks that became due during this tick
    pub notifications: Vec<Task>,
    /// Any task changed or was removed
    pub mutated: bool,
}

/// Result of completing a task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Id of the next occurrence, when recurrence produced one
    pub regenerated: Option<Uuid>,
    /// The task was already done; nothing changed
    pub already_done: bool,
}

/// Drives tasks through due, completion, regeneration, soft delete and purge.
///
/// The engine never holds the task list; every operation borrows it for the
/// duration of the call.
pub struct Engine {
    policy: DeletionPolicy,
    strategy: Box<dyn SortStrategy>,
}

impl Engine {
    pub fn new(policy: DeletionPolicy, strategy: Box<dyn SortStrategy>) -> Self {
        Self { policy, strategy }
    }

    pub fn policy(&self) -> &DeletionPolicy {
        &self.policy
    }

    /// Evaluate every task against `now`: flag newly due tasks once, then purge
    /// whatever the deletion policy releases.
    pub fn tick(&self, tasks: &mut Vec<Task>, now: NaiveDateTime, force: bool) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        for task in tasks.iter_mut() {
            if task.is_due(now) && !task.is_notified() {
                task.mark_notified();
                tracing::debug!(
                    id = %task.id,
                    account = %task.account,
                    name = %task.name,
                    "task due"
                );
                outcome.notifications.push(task.clone());
                outcome.mutated = true;
            }
        }

        let before = tasks.len();
        tasks.retain(|task| {
            let remove = self.policy.should_remove(task, now, force);
            if remove {
                tracing::debug!(id = %task.id, done = task.is_done(), "purging task");
            }
            !remove
        });
        let purged = before - tasks.len();
        if purged > 0 {
            tracing::info!(purged, force, "removed finished tasks");
            outcome.mutated = true;
        }

        outcome
    }

    /// Insert a new task at its sorted position
    pub fn add(&self, tasks: &mut Vec<Task>, task: Task) -> Uuid {
        let id = task.id;
        tracing::debug!(%id, account = %task.account, finish = %task.finish(), "adding task");
        self.strategy.insert(tasks, task);
        id
    }

    /// Full reorder, e.g. after loading from storage
    pub fn resort(&self, tasks: &mut [Task]) {
        self.strategy.sort(tasks);
    }

    /// Mark a task done. A repeating task whose end boundary lies beyond `now`
    /// regenerates its next occurrence, inserted in order. Completing a task
    /// that is already done changes nothing.
    pub fn complete(
        &self,
        tasks: &mut Vec<Task>,
        id: Uuid,
        now: NaiveDateTime,
    ) -> Result<Completion, EngineError> {
        let task = find_mut(tasks, id)?;
        if task.is_done() {
            return Ok(Completion {
                regenerated: None,
                already_done: true,
            });
        }

        task.mark_done(now);
        tracing::info!(%id, account = %task.account, name = %task.name, "task completed");

        let boundary_open = task.repeat_until.map_or(true, |end| end > now);
        // Reopened and completed again: its next occurrence already exists
        let pending = task.regenerated().is_none();
        let next = if task.recurrence.is_active() && boundary_open && pending {
            next_start(&task.recurrence, task.finish(), task.repeat_until, &task.skip)
                .map(|start| task.next_occurrence(start))
        } else {
            None
        };

        let regenerated = next.map(|next| {
            tracing::info!(
                from = %id,
                id = %next.id,
                start = %next.start(),
                rule = %next.recurrence,
                "scheduled next occurrence"
            );
            self.add(tasks, next)
        });
        if let Some(next) = regenerated {
            find_mut(tasks, id)?.set_regenerated(next);
        }

        Ok(Completion {
            regenerated,
            already_done: false,
        })
    }

    /// Reverse a completion. Any occurrence already regenerated stays in the list
    /// and is not spawned a second time on the next completion.
    pub fn uncomplete(&self, tasks: &mut [Task], id: Uuid) -> Result<bool, EngineError> {
        let task = find_mut(tasks, id)?;
        if !task.is_done() {
            return Ok(false);
        }
        task.clear_done();
        Ok(true)
    }

    /// Soft delete; the task stays until the grace window passes
    pub fn mark_pending_delete(
        &self,
        tasks: &mut [Task],
        id: Uuid,
        now: NaiveDateTime,
    ) -> Result<(), EngineError> {
        let task = find_mut(tasks, id)?;
        if !task.is_pending_delete() {
            task.mark_pending_delete(now);
            tracing::debug!(%id, "marked for deletion");
        }
        Ok(())
    }

    /// Cancel a soft delete while its grace window is still open
    pub fn undo_delete(
        &self,
        tasks: &mut [Task],
        id: Uuid,
        now: NaiveDateTime,
    ) -> Result<(), EngineError> {
        let task = find_mut(tasks, id)?;
        if !task.is_pending_delete() {
            return Err(EngineError::NotPendingDelete(id));
        }
        if !self.policy.can_undo(task, now) {
            return Err(EngineError::UndoExpired(id));
        }
        task.clear_pending_delete();
        tracing::debug!(%id, "deletion undone");
        Ok(())
    }

    /// Change start and/or duration, then move the task to its new position.
    /// A task pushed back into the future will notify again when it comes due.
    pub fn reschedule(
        &self,
        tasks: &mut Vec<Task>,
        id: Uuid,
        start: Option<NaiveDateTime>,
        duration: Option<TaskDuration>,
        now: NaiveDateTime,
    ) -> Result<(), EngineError> {
        let index = tasks
            .iter()
            .position(|task| task.id == id)
            .ok_or(EngineError::TaskNotFound(id))?;

        let mut task = tasks.remove(index);
        let start = start.unwrap_or(task.start());
        let duration = duration.unwrap_or(task.duration());
        task.set_schedule(start, duration);
        if task.finish() > now {
            task.reset_notified();
        }
        tracing::debug!(%id, finish = %task.finish(), "rescheduled task");
        self.strategy.insert(tasks, task);
        Ok(())
    }
}

fn find_mut(tasks: &mut [Task], id: Uuid) -> Result<&mut Task, EngineError> {
    tasks
        .iter_mut()
        .find(|task| task.id == id)
        .ok_or(EngineError::TaskNotFound(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Period, RecurrenceRule};
    use crate::engine::sort::ByFinish;
    use crate::locale::English;
    use chrono::{Duration, NaiveDate};
    use std::sync::Arc;

    fn engine() -> Engine {
        Engine::new(
            DeletionPolicy::default(),
            Box::new(ByFinish::new(Arc::new(English))),
        )
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn task(name: &str, start: NaiveDateTime, hours: i64) -> Task {
        Task::new("main", name, start, TaskDuration::new(0, hours, 0).unwrap()).unwrap()
    }

    #[test]
    fn test_tick_notifies_once() {
        let engine = engine();
        let t = at(2025, 1, 1, 8, 0);
        let mut tasks = Vec::new();
        engine.add(&mut tasks, task("Lab", t, 1));

        let early = engine.tick(&mut tasks, t + Duration::minutes(59), false);
        assert!(early.notifications.is_empty());
        assert!(!early.mutated);

        let now = t + Duration::minutes(61);
        let first = engine.tick(&mut tasks, now, false);
        assert_eq!(first.notifications.len(), 1);
        assert!(first.mutated);
        assert!(tasks[0].is_notified());

        let second = engine.tick(&mut tasks, now, false);
        assert!(second.notifications.is_empty());
        assert!(!second.mutated);
    }

    #[test]
    fn test_pending_delete_task_is_not_notified() {
        let engine = engine();
        let t = at(2025, 1, 1, 8, 0);
        let mut tasks = Vec::new();
        let id = engine.add(&mut tasks, task("Lab", t, 1));
        let marked = t + Duration::hours(2);
        engine.mark_pending_delete(&mut tasks, id, marked).unwrap();

        let outcome = engine.tick(&mut tasks, marked + Duration::seconds(2), false);
        assert!(outcome.notifications.is_empty());
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn test_complete_sets_done_once() {
        let engine = engine();
        let t = at(2025, 1, 1, 8, 0);
        let mut tasks = Vec::new();
        let id = engine.add(&mut tasks, task("Lab", t, 1).with_recurrence(RecurrenceRule::Daily));

        let now = t + Duration::hours(2);
        let first = engine.complete(&mut tasks, id, now).unwrap();
        assert!(first.regenerated.is_some());
        assert_eq!(tasks.len(), 2);

        let again = engine.complete(&mut tasks, id, now + Duration::seconds(5)).unwrap();
        assert_eq!(
            again,
            Completion {
                regenerated: None,
                already_done: true
            }
        );
        assert_eq!(tasks.len(), 2);
        let done = tasks.iter().find(|t| t.id == id).unwrap();
        assert_eq!(done.completed_at(), Some(now));
    }

    #[test]
    fn test_daily_regeneration_keeps_duration() {
        let engine = engine();
        let start = at(2025, 1, 31, 8, 0);
        let mut tasks = Vec::new();
        let id = engine.add(
            &mut tasks,
            task("Mine", start, 2).with_recurrence(RecurrenceRule::Daily),
        );

        let completion = engine.complete(&mut tasks, id, at(2025, 1, 31, 10, 5)).unwrap();
        let next_id = completion.regenerated.unwrap();
        let next = tasks.iter().find(|t| t.id == next_id).unwrap();
        assert_eq!(next.start(), at(2025, 2, 1, 10, 0));
        assert_eq!(next.finish(), at(2025, 2, 1, 12, 0));
        assert!(!next.is_done() && !next.is_notified() && !next.is_pending_delete());
    }

    #[test]
    fn test_no_regeneration_past_end_boundary() {
        let engine = engine();
        let start = at(2025, 1, 1, 8, 0);
        let mut tasks = Vec::new();
        let id = engine.add(
            &mut tasks,
            task("Mine", start, 1)
                .with_recurrence(RecurrenceRule::Daily)
                .with_repeat_until(Some(at(2025, 1, 1, 12, 0))),
        );

        let completion = engine.complete(&mut tasks, id, at(2025, 1, 1, 13, 0)).unwrap();
        assert_eq!(completion.regenerated, None);
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn test_end_boundary_equal_to_now_stops_regeneration() {
        let engine = engine();
        let start = at(2025, 1, 1, 8, 0);
        let end = at(2025, 1, 1, 9, 0);
        let mut tasks = Vec::new();
        let id = engine.add(
            &mut tasks,
            task("Mine", start, 1)
                .with_recurrence(RecurrenceRule::Daily)
                .with_repeat_until(Some(end)),
        );

        let completion = engine.complete(&mut tasks, id, end).unwrap();
        assert_eq!(completion.regenerated, None);
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn test_recomplete_keeps_single_occurrence() {
        let engine = engine();
        let t = at(2025, 1, 1, 8, 0);
        let mut tasks = Vec::new();
        let id = engine.add(&mut tasks, task("Lab", t, 1).with_recurrence(RecurrenceRule::Daily));

        let now = t + Duration::hours(2);
        let first = engine.complete(&mut tasks, id, now).unwrap();
        let next_id = first.regenerated.unwrap();
        assert!(engine.uncomplete(&mut tasks, id).unwrap());

        let second = engine.complete(&mut tasks, id, now + Duration::minutes(1)).unwrap();
        assert_eq!(second.regenerated, None);
        assert!(!second.already_done);

        let occurrences: Vec<_> = tasks.iter().filter(|t| t.id != id).map(|t| t.id).collect();
        assert_eq!(occurrences, vec![next_id]);
        let original = tasks.iter().find(|t| t.id == id).unwrap();
        assert!(original.is_done());
        assert_eq!(original.regenerated(), Some(next_id));
    }

    #[test]
    fn test_empty_custom_rule_does_not_regenerate() {
        let engine = engine();
        let start = at(2025, 1, 1, 8, 0);
        let mut tasks = Vec::new();
        let id = engine.add(
            &mut tasks,
            task("Mine", start, 1).with_recurrence(RecurrenceRule::Custom(Period::default())),
        );
        let completion = engine.complete(&mut tasks, id, start + Duration::hours(1)).unwrap();
        assert_eq!(completion.regenerated, None);
    }

    #[test]
    fn test_completed_task_purged_after_retention() {
        let engine = engine();
        let t = at(2025, 1, 1, 8, 0);
        let mut tasks = Vec::new();
        let id = engine.add(&mut tasks, task("Lab", t, 1));
        let done_at = t + Duration::hours(1);
        engine.complete(&mut tasks, id, done_at).unwrap();

        engine.tick(&mut tasks, done_at + Duration::seconds(59), false);
        assert_eq!(tasks.len(), 1);
        let outcome = engine.tick(&mut tasks, done_at + Duration::seconds(60), false);
        assert!(outcome.mutated);
        assert!(tasks.is_empty());
    }

    #[test]
    fn test_force_purges_done_and_pending_only() {
        let engine = engine();
        let t = at(2025, 1, 1, 8, 0);
        let mut tasks = Vec::new();
        let done = engine.add(&mut tasks, task("A", t, 1));
        let deleted = engine.add(&mut tasks, task("B", t, 2));
        let open = engine.add(&mut tasks, task("C", t, 3));
        engine.complete(&mut tasks, done, t).unwrap();
        engine.mark_pending_delete(&mut tasks, deleted, t).unwrap();

        engine.tick(&mut tasks, t, true);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, open);
    }

    #[test]
    fn test_undo_delete_within_window() {
        let engine = engine();
        let t = at(2025, 1, 1, 8, 0);
        let mut tasks = Vec::new();
        let id = engine.add(&mut tasks, task("Lab", t, 1));

        engine.mark_pending_delete(&mut tasks, id, t).unwrap();
        engine.undo_delete(&mut tasks, id, t + Duration::seconds(2)).unwrap();
        assert!(!tasks[0].is_pending_delete());
        assert!(tasks[0].delete_marked_at().is_none());

        engine.mark_pending_delete(&mut tasks, id, t).unwrap();
        assert_eq!(
            engine.undo_delete(&mut tasks, id, t + Duration::seconds(3)),
            Err(EngineError::UndoExpired(id))
        );
    }

    #[test]
    fn test_undo_requires_pending_delete() {
        let engine = engine();
        let t = at(2025, 1, 1, 8, 0);
        let mut tasks = Vec::new();
        let id = engine.add(&mut tasks, task("Lab", t, 1));
        assert_eq!(
            engine.undo_delete(&mut tasks, id, t),
            Err(EngineError::NotPendingDelete(id))
        );
    }

    #[test]
    fn test_unknown_id() {
        let engine = engine();
        let mut tasks = Vec::new();
        let id = Uuid::new_v4();
        assert_eq!(
            engine.complete(&mut tasks, id, at(2025, 1, 1, 0, 0)),
            Err(EngineError::TaskNotFound(id))
        );
    }

    #[test]
    fn test_reschedule_moves_and_rearms() {
        let engine = engine();
        let t = at(2025, 1, 1, 8, 0);
        let mut tasks = Vec::new();
        let first = engine.add(&mut tasks, task("A", t, 1));
        let second = engine.add(&mut tasks, task("B", t, 3));

        let now = t + Duration::hours(2);
        engine.tick(&mut tasks, now, false);
        assert!(tasks[0].is_notified());

        engine
            .reschedule(&mut tasks, first, None, Some(TaskDuration::new(0, 5, 0).unwrap()), now)
            .unwrap();
        assert_eq!(tasks[0].id, second);
        assert_eq!(tasks[1].id, first);
        assert_eq!(tasks[1].finish(), t + Duration::hours(5));
        assert!(!tasks[1].is_notified());
    }

    #[test]
    fn test_uncomplete() {
        let engine = engine();
        let t = at(2025, 1, 1, 8, 0);
        let mut tasks = Vec::new();
        let id = engine.add(&mut tasks, task("A", t, 1));
        engine.complete(&mut tasks, id, t).unwrap();
        assert!(engine.uncomplete(&mut tasks, id).unwrap());
        assert!(!tasks[0].is_done());
        assert!(tasks[0].completed_at().is_none());
        assert!(!engine.uncomplete(&mut tasks, id).unwrap());
    }
}
