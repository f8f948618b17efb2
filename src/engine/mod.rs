pub mod deletion;
pub mod lifecycle;
pub mod sort;

pub use deletion::{
    DeletionPolicy, DEFAULT_COMPLETED_RETENTION_SECS, DEFAULT_PENDING_DELETE_DELAY_SECS,
};
pub use lifecycle::{Completion, Engine, EngineError, TickOutcome};
pub use sort::{ByAccount, ByFinish, SortKind, SortStrategy};
