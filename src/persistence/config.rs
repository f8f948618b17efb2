use crate::engine::{
    DeletionPolicy, SortKind, DEFAULT_COMPLETED_RETENTION_SECS, DEFAULT_PENDING_DELETE_DELAY_SECS,
};
use crate::locale::Language;
use crate::ticker::DEFAULT_TICK_MS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.json";
pub const TASKS_FILE: &str = "tasks.json";

/// Settings stored in config.json
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub language: Language,
    pub pending_delete_delay_secs: u64,
    pub completed_retention_secs: u64,
    pub tick_ms: u64,
    pub notify_timeout_secs: u64,
    pub sort: SortKind,
    /// Task file, relative to the data directory unless absolute
    pub tasks_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: Language::En,
            pending_delete_delay_secs: DEFAULT_PENDING_DELETE_DELAY_SECS,
            completed_retention_secs: DEFAULT_COMPLETED_RETENTION_SECS,
            tick_ms: DEFAULT_TICK_MS,
            notify_timeout_secs: 10,
            sort: SortKind::ByFinish,
            tasks_file: PathBuf::from(TASKS_FILE),
        }
    }
}

impl Config {
    pub fn deletion_policy(&self) -> DeletionPolicy {
        DeletionPolicy::from_secs(self.pending_delete_delay_secs, self.completed_retention_secs)
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    /// Absolute path of the task file inside `data_dir`
    pub fn tasks_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.tasks_file)
    }
}

/// Load config.json; a missing file yields the defaults
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    let config: Config = serde_json::from_str(&content)
        .with_context(|| format!("Invalid config: {}", path.display()))?;
    Ok(config)
}

/// Save config.json
pub fn save_config<P: AsRef<Path>>(path: P, config: &Config) -> Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    crate::persistence::atomic_write(path, &json)?;
    Ok(())
}
