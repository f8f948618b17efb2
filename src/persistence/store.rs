use super::files::{atomic_write, read_file};
use crate::domain::Task;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persistence for the task list.
///
/// Neither operation reports failure to the caller: a missing or corrupt store
/// loads as an empty list, and a failed save is logged and dropped.
pub trait TaskStore {
    fn load(&self) -> Vec<Task>;
    fn save(&self, tasks: &[Task]);
}

/// Tasks as a pretty-printed JSON array, replaced atomically on save
#[derive(Debug, Clone)]
pub struct JsonTaskStore {
    path: PathBuf,
}

impl JsonTaskStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskStore for JsonTaskStore {
    fn load(&self) -> Vec<Task> {
        let content = match read_file(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(error = %e, "could not read task store, starting empty");
                return Vec::new();
            }
        };
        if content.trim().is_empty() {
            return Vec::new();
        }

        match serde_json::from_str(&content) {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "corrupt task store, starting empty"
                );
                Vec::new()
            }
        }
    }

    fn save(&self, tasks: &[Task]) {
        let result = serde_json::to_string_pretty(tasks)
            .map_err(anyhow::Error::from)
            .and_then(|json| atomic_write(&self.path, &json));

        match result {
            Ok(()) => tracing::debug!(count = tasks.len(), "saved tasks"),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to save tasks")
            }
        }
    }
}

/// In-memory store for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    tasks: Mutex<Vec<Task>>,
}

impl MemoryStore {
    pub fn new(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Mutex::new(tasks),
        }
    }

    /// Current stored contents
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl TaskStore for MemoryStore {
    fn load(&self) -> Vec<Task> {
        self.snapshot()
    }

    fn save(&self, tasks: &[Task]) {
        *self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = tasks.to_vec();
    }
}
