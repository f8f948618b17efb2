pub mod config;
pub mod files;
pub mod store;

pub use config::{load_config, save_config, Config, CONFIG_FILE, TASKS_FILE};
pub use files::{atomic_write, ensure_dir, read_file, resolve_data_dir, DATA_DIR_ENV};
pub use store::{JsonTaskStore, MemoryStore, TaskStore};
