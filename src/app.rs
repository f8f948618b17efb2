use crate::clock::Clock;
use crate::domain::{Task, TaskDuration};
use crate::engine::{Completion, Engine};
use crate::locale::{Breakdown, Locale};
use crate::notifications::Notifier;
use crate::persistence::{Config, TaskStore};
use anyhow::{bail, Result};
use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Owns the task list and every collaborator the engine talks to.
///
/// All user actions and ticks go through `&mut self`, so they are serialized
/// with each other.
pub struct Tracker {
    tasks: Vec<Task>,
    engine: Engine,
    store: Box<dyn TaskStore>,
    notifier: Box<dyn Notifier>,
    clock: Arc<dyn Clock>,
    locale: Arc<dyn Locale>,
    notify_timeout: Duration,
    pub needs_save: bool,
}

impl Tracker {
    pub fn new(
        config: &Config,
        store: Box<dyn TaskStore>,
        notifier: Box<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let locale = config.language.locale();
        let engine = Engine::new(config.deletion_policy(), config.sort.strategy(locale.clone()));

        let mut tasks = store.load();
        engine.resort(&mut tasks);
        tracing::debug!(count = tasks.len(), "loaded tasks");

        Self {
            tasks,
            engine,
            store,
            notifier,
            clock,
            locale,
            notify_timeout: config.notify_timeout(),
            needs_save: false,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn locale(&self) -> &dyn Locale {
        self.locale.as_ref()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Find a task by full id or unique id prefix
    pub fn resolve_id(&self, prefix: &str) -> Result<Uuid> {
        let needle = prefix.trim().to_lowercase().replace('-', "");
        if needle.is_empty() {
            bail!("Task id must not be empty");
        }

        let mut matches = self
            .tasks
            .iter()
            .filter(|task| task.id.simple().to_string().starts_with(&needle));

        match (matches.next(), matches.next()) {
            (Some(task), None) => Ok(task.id),
            (None, _) => bail!("No task matches id '{}'", prefix),
            (Some(_), Some(_)) => bail!("Id '{}' is ambiguous, use more characters", prefix),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn add(&mut self, task: Task) -> Uuid {
        let id = self.engine.add(&mut self.tasks, task);
        self.needs_save = true;
        id
    }

    pub fn complete(&mut self, id: Uuid) -> Result<Completion> {
        let now = self.clock.now();
        let completion = self.engine.complete(&mut self.tasks, id, now)?;
        if !completion.already_done {
            self.needs_save = true;
        }
        Ok(completion)
    }

    pub fn uncomplete(&mut self, id: Uuid) -> Result<bool> {
        let changed = self.engine.uncomplete(&mut self.tasks, id)?;
        self.needs_save |= changed;
        Ok(changed)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<()> {
        let now = self.clock.now();
        self.engine.mark_pending_delete(&mut self.tasks, id, now)?;
        self.needs_save = true;
        Ok(())
    }

    pub fn undo_delete(&mut self, id: Uuid) -> Result<()> {
        let now = self.clock.now();
        self.engine.undo_delete(&mut self.tasks, id, now)?;
        self.needs_save = true;
        Ok(())
    }

    pub fn reschedule(
        &mut self,
        id: Uuid,
        start: Option<NaiveDateTime>,
        duration: Option<TaskDuration>,
    ) -> Result<()> {
        let now = self.clock.now();
        self.engine.reschedule(&mut self.tasks, id, start, duration, now)?;
        self.needs_save = true;
        Ok(())
    }

    /// Periodic pass: deliver due notifications and purge expired tasks.
    /// Returns the number of notifications sent.
    pub fn tick(&mut self) -> usize {
        self.run_tick(false)
    }

    /// Purge every completed and soft-deleted task right away
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.run_tick(true);
        before.saturating_sub(self.tasks.len())
    }

    fn run_tick(&mut self, force: bool) -> usize {
        let now = self.clock.now();
        let outcome = self.engine.tick(&mut self.tasks, now, force);

        for task in &outcome.notifications {
            let (title, body) = self.locale.due_notification(&task.account, &task.name);
            self.notifier.notify(&title, &body, self.notify_timeout);
        }

        if outcome.mutated {
            self.needs_save = true;
        }
        outcome.notifications.len()
    }

    /// Status column: lifecycle label, or time left while counting down
    pub fn status_label(&self, task: &Task, now: NaiveDateTime, with_seconds: bool) -> String {
        if task.is_pending_delete() {
            self.locale.deleting_label().to_string()
        } else if task.is_done() {
            self.locale.done_label().to_string()
        } else if task.is_due(now) {
            self.locale.due_label().to_string()
        } else {
            self.locale
                .format_remaining(Breakdown::from_duration(task.remaining(now)), with_seconds)
        }
    }

    pub fn save(&mut self) {
        self.store.save(&self.tasks);
        self.needs_save = false;
    }

    pub fn save_if_needed(&mut self) {
        if self.needs_save {
            self.save();
        }
    }
}
