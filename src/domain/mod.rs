pub mod recurrence;
pub mod task;
pub mod time;

pub use recurrence::{
    next_start, Period, RecurrenceError, RecurrenceRule, SkipPredicate, SkipRule,
    MAX_SKIP_ITERATIONS,
};
pub use task::{short_id, Task, TaskDuration, TaskError};
pub use time::MAX_TIMESTAMP;
